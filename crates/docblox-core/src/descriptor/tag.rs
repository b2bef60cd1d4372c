//! Doc-block tags.
//!
//! A tag is a closed sum type over the shapes a doc-block tag can take.
//! Consumers switch on [`TagBody`] instead of probing for capabilities.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::DescriptorRef;

/// Tag names whose body is a reference to another element.
pub const REFERENCE_TAGS: &[&str] = &["see", "uses", "used-by", "covers"];

/// A textual reference to another element, optionally resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// Target as written (or as emitted by the reflector).
    pub target: String,
    /// Filled in by the linker once the target is known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<DescriptorRef>,
}

impl Reference {
    /// Create an unresolved reference.
    pub fn new(target: impl Into<String>) -> Self {
        Reference {
            target: target.into(),
            resolved: None,
        }
    }

    /// Create a reference that is already resolved.
    pub fn resolved(target: impl Into<String>, to: DescriptorRef) -> Self {
        Reference {
            target: target.into(),
            resolved: Some(to),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }
}

/// Shape of a tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum TagBody {
    /// Free text only (`@author`, `@todo`, `@internal`, ...).
    Generic,
    /// Carries a type list (`@return`, `@throws`).
    Typed { types: Vec<String> },
    /// Carries a type list and a variable name (`@param`, `@var`, `@property`).
    Variable { types: Vec<String>, variable: String },
    /// Points at another element (`@see`, `@uses`, `@used-by`, `@covers`).
    Reference { reference: Reference },
    /// Describes a magic method (`@method`).
    MethodNamed {
        method_name: String,
        return_types: Vec<String>,
        arguments: Vec<String>,
        is_static: bool,
    },
}

/// One parsed doc-block tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub body: TagBody,
}

impl TagDescriptor {
    pub fn generic(name: impl Into<String>, description: impl Into<String>) -> Self {
        TagDescriptor {
            name: name.into(),
            description: description.into(),
            body: TagBody::Generic,
        }
    }

    pub fn typed(
        name: impl Into<String>,
        types: Vec<String>,
        description: impl Into<String>,
    ) -> Self {
        TagDescriptor {
            name: name.into(),
            description: description.into(),
            body: TagBody::Typed { types },
        }
    }

    pub fn variable(
        name: impl Into<String>,
        types: Vec<String>,
        variable: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        TagDescriptor {
            name: name.into(),
            description: description.into(),
            body: TagBody::Variable {
                types,
                variable: variable.into(),
            },
        }
    }

    pub fn reference(
        name: impl Into<String>,
        reference: Reference,
        description: impl Into<String>,
    ) -> Self {
        TagDescriptor {
            name: name.into(),
            description: description.into(),
            body: TagBody::Reference { reference },
        }
    }

    /// The reference carried by this tag, if it has one.
    pub fn as_reference(&self) -> Option<&Reference> {
        match &self.body {
            TagBody::Reference { reference } => Some(reference),
            _ => None,
        }
    }

    pub fn as_reference_mut(&mut self) -> Option<&mut Reference> {
        match &mut self.body {
            TagBody::Reference { reference } => Some(reference),
            _ => None,
        }
    }

    /// The type list carried by this tag (empty for untyped shapes).
    pub fn types(&self) -> &[String] {
        match &self.body {
            TagBody::Typed { types } | TagBody::Variable { types, .. } => types,
            TagBody::MethodNamed { return_types, .. } => return_types,
            TagBody::Generic | TagBody::Reference { .. } => &[],
        }
    }
}

/// Tags of one element, keyed by tag name in declaration order per name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(BTreeMap<String, Vec<TagDescriptor>>);

impl Tags {
    pub fn new() -> Self {
        Tags::default()
    }

    /// Append a tag under its own name.
    pub fn push(&mut self, tag: TagDescriptor) {
        self.0.entry(tag.name.clone()).or_default().push(tag);
    }

    /// Tags with the given name (empty when absent).
    pub fn get(&self, name: &str) -> &[TagDescriptor] {
        self.0.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Vec<TagDescriptor>> {
        self.0.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.get(name).is_some_and(|tags| !tags.is_empty())
    }

    pub fn remove(&mut self, name: &str) -> Vec<TagDescriptor> {
        self.0.remove(name).unwrap_or_default()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// All tags, grouped by name in name order.
    pub fn iter(&self) -> impl Iterator<Item = &TagDescriptor> {
        self.0.values().flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TagDescriptor> {
        self.0.values_mut().flatten()
    }

    /// Total number of tags.
    pub fn len(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
