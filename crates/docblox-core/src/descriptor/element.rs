//! Structural element descriptors, one struct per kind.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Element, ElementKind, Reference, Tags, Visibility};
use crate::fqsen::{Fqsen, MemberKind};

/// Fields shared by every structural element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementInfo {
    pub fqsen: Fqsen,
    pub name: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    pub line: u32,
    #[serde(default)]
    pub tags: Tags,
    /// Package the element was filed under; assigned by the package tree pass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
}

impl ElementInfo {
    /// Create the info for an element; the short name is derived from the FQSEN.
    pub fn new(fqsen: Fqsen, line: u32) -> Self {
        let name = fqsen.name().to_string();
        ElementInfo {
            fqsen,
            name,
            summary: String::new(),
            description: String::new(),
            line,
            tags: Tags::new(),
            package: None,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }
}

macro_rules! impl_element {
    ($ty:ty, $kind:expr) => {
        impl Element for $ty {
            fn info(&self) -> &ElementInfo {
                &self.info
            }

            fn info_mut(&mut self) -> &mut ElementInfo {
                &mut self.info
            }

            fn kind(&self) -> ElementKind {
                $kind
            }
        }
    };
    ($ty:ty, $kind:expr, visibility) => {
        impl Element for $ty {
            fn info(&self) -> &ElementInfo {
                &self.info
            }

            fn info_mut(&mut self) -> &mut ElementInfo {
                &mut self.info
            }

            fn kind(&self) -> ElementKind {
                $kind
            }

            fn visibility(&self) -> Option<Visibility> {
                Some(self.visibility)
            }
        }
    };
}

// ============================================================================
// Members
// ============================================================================

/// Members owned by a class, interface or trait, keyed by short name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Members {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub methods: BTreeMap<String, MethodDescriptor>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, PropertyDescriptor>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub constants: BTreeMap<String, ConstantDescriptor>,
}

impl Members {
    pub fn add_method(&mut self, method: MethodDescriptor) {
        self.methods.insert(method.info.name.clone(), method);
    }

    pub fn add_property(&mut self, property: PropertyDescriptor) {
        self.properties.insert(property.info.name.clone(), property);
    }

    pub fn add_constant(&mut self, constant: ConstantDescriptor) {
        self.constants.insert(constant.info.name.clone(), constant);
    }

    /// Look up a member by kind and short name.
    pub fn get(&self, kind: ElementKind, name: &str) -> Option<&dyn Element> {
        match kind {
            ElementKind::Method => self.methods.get(name).map(|m| m as &dyn Element),
            ElementKind::Property => self.properties.get(name).map(|p| p as &dyn Element),
            ElementKind::Constant => self.constants.get(name).map(|c| c as &dyn Element),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, kind: ElementKind, name: &str) -> Option<&mut dyn Element> {
        match kind {
            ElementKind::Method => self.methods.get_mut(name).map(|m| m as &mut dyn Element),
            ElementKind::Property => self
                .properties
                .get_mut(name)
                .map(|p| p as &mut dyn Element),
            ElementKind::Constant => self
                .constants
                .get_mut(name)
                .map(|c| c as &mut dyn Element),
            _ => None,
        }
    }

    /// Remove a member by kind and short name.
    pub fn remove(&mut self, kind: ElementKind, name: &str) -> bool {
        match kind {
            ElementKind::Method => self.methods.remove(name).is_some(),
            ElementKind::Property => self.properties.remove(name).is_some(),
            ElementKind::Constant => self.constants.remove(name).is_some(),
            _ => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty() && self.properties.is_empty() && self.constants.is_empty()
    }
}

// ============================================================================
// Containers
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDescriptor {
    #[serde(flatten)]
    pub info: ElementInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Reference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interfaces: Vec<Reference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub used_traits: Vec<Reference>,
    #[serde(default)]
    pub is_abstract: bool,
    #[serde(default)]
    pub is_final: bool,
    #[serde(default)]
    pub members: Members,
}

impl ClassDescriptor {
    pub fn new(fqsen: Fqsen, line: u32) -> Self {
        ClassDescriptor {
            info: ElementInfo::new(fqsen, line),
            parent: None,
            interfaces: Vec::new(),
            used_traits: Vec::new(),
            is_abstract: false,
            is_final: false,
            members: Members::default(),
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(Reference::new(parent));
        self
    }

    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(Reference::new(interface));
        self
    }

    pub fn with_method(mut self, method: MethodDescriptor) -> Self {
        self.members.add_method(method);
        self
    }

    pub fn with_property(mut self, property: PropertyDescriptor) -> Self {
        self.members.add_property(property);
        self
    }

    pub fn with_constant(mut self, constant: ConstantDescriptor) -> Self {
        self.members.add_constant(constant);
        self
    }
}

impl_element!(ClassDescriptor, ElementKind::Class);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceDescriptor {
    #[serde(flatten)]
    pub info: ElementInfo,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<Reference>,
    #[serde(default)]
    pub members: Members,
}

impl InterfaceDescriptor {
    pub fn new(fqsen: Fqsen, line: u32) -> Self {
        InterfaceDescriptor {
            info: ElementInfo::new(fqsen, line),
            parents: Vec::new(),
            members: Members::default(),
        }
    }
}

impl_element!(InterfaceDescriptor, ElementKind::Interface);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraitDescriptor {
    #[serde(flatten)]
    pub info: ElementInfo,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub used_traits: Vec<Reference>,
    #[serde(default)]
    pub members: Members,
}

impl TraitDescriptor {
    pub fn new(fqsen: Fqsen, line: u32) -> Self {
        TraitDescriptor {
            info: ElementInfo::new(fqsen, line),
            used_traits: Vec::new(),
            members: Members::default(),
        }
    }
}

impl_element!(TraitDescriptor, ElementKind::Trait);

// ============================================================================
// Functions, constants and members
// ============================================================================

/// One argument of a function or method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default)]
    pub by_reference: bool,
    #[serde(default)]
    pub is_variadic: bool,
    #[serde(default)]
    pub description: String,
    pub line: u32,
}

impl ArgumentDescriptor {
    pub fn new(name: impl Into<String>, line: u32) -> Self {
        ArgumentDescriptor {
            name: name.into(),
            types: Vec::new(),
            default: None,
            by_reference: false,
            is_variadic: false,
            description: String::new(),
            line,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    #[serde(flatten)]
    pub info: ElementInfo,
    #[serde(default)]
    pub arguments: Vec<ArgumentDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub return_types: Vec<String>,
}

impl FunctionDescriptor {
    pub fn new(fqsen: Fqsen, line: u32) -> Self {
        FunctionDescriptor {
            info: ElementInfo::new(fqsen, line),
            arguments: Vec::new(),
            return_types: Vec::new(),
        }
    }
}

impl_element!(FunctionDescriptor, ElementKind::Function);

/// A global constant or a class constant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstantDescriptor {
    #[serde(flatten)]
    pub info: ElementInfo,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub visibility: Visibility,
}

impl ConstantDescriptor {
    pub fn new(fqsen: Fqsen, line: u32) -> Self {
        ConstantDescriptor {
            info: ElementInfo::new(fqsen, line),
            value: String::new(),
            visibility: Visibility::Public,
        }
    }

    /// Class constant `name` of `owner`.
    pub fn member(owner: &Fqsen, name: &str, line: u32) -> Self {
        ConstantDescriptor::new(Fqsen::member(owner, MemberKind::Constant, name), line)
    }
}

impl Element for ConstantDescriptor {
    fn info(&self) -> &ElementInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut ElementInfo {
        &mut self.info
    }

    fn kind(&self) -> ElementKind {
        ElementKind::Constant
    }

    fn visibility(&self) -> Option<Visibility> {
        // Only class constants carry a modifier.
        self.info.fqsen.is_member().then_some(self.visibility)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDescriptor {
    #[serde(flatten)]
    pub info: ElementInfo,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub is_abstract: bool,
    #[serde(default)]
    pub is_final: bool,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub arguments: Vec<ArgumentDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub return_types: Vec<String>,
}

impl MethodDescriptor {
    pub fn new(owner: &Fqsen, name: &str, line: u32) -> Self {
        MethodDescriptor {
            info: ElementInfo::new(Fqsen::member(owner, MemberKind::Method, name), line),
            visibility: Visibility::Public,
            is_abstract: false,
            is_final: false,
            is_static: false,
            arguments: Vec::new(),
            return_types: Vec::new(),
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }
}

impl_element!(MethodDescriptor, ElementKind::Method, visibility);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    #[serde(flatten)]
    pub info: ElementInfo,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl PropertyDescriptor {
    pub fn new(owner: &Fqsen, name: &str, line: u32) -> Self {
        PropertyDescriptor {
            info: ElementInfo::new(Fqsen::member(owner, MemberKind::Property, name), line),
            visibility: Visibility::Public,
            is_static: false,
            types: Vec::new(),
            default: None,
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }
}

impl_element!(PropertyDescriptor, ElementKind::Property, visibility);
