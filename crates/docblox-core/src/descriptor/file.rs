//! File descriptors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{
    ClassDescriptor, ConstantDescriptor, Element, ElementKind, FunctionDescriptor,
    InterfaceDescriptor, Members, Tags, TraitDescriptor,
};
use crate::fqsen::Fqsen;
use crate::hash::ContentHash;

/// A flagged keyword (`TODO`, `FIXME`, ...) found in a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub line: u32,
}

/// A problem reported by the reflector for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseError {
    pub line: u32,
    pub message: String,
}

/// One analyzed source file.
///
/// Created by a reflector, replaced wholesale on re-parse and reused as-is by
/// the incremental cache when the content hash is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    /// Path relative to the project root, `/` separated.
    pub path: String,
    pub hash: ContentHash,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Tags,
    /// Package declared by the file-level doc-block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    /// `use` aliases: alias → fully qualified name.
    #[serde(default)]
    pub namespace_aliases: BTreeMap<String, Fqsen>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub includes: Vec<String>,
    #[serde(default)]
    pub classes: BTreeMap<Fqsen, ClassDescriptor>,
    #[serde(default)]
    pub interfaces: BTreeMap<Fqsen, InterfaceDescriptor>,
    #[serde(default)]
    pub traits: BTreeMap<Fqsen, TraitDescriptor>,
    #[serde(default)]
    pub functions: BTreeMap<Fqsen, FunctionDescriptor>,
    #[serde(default)]
    pub constants: BTreeMap<Fqsen, ConstantDescriptor>,
    #[serde(default)]
    pub markers: Vec<Marker>,
    #[serde(default)]
    pub errors: Vec<ParseError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl FileDescriptor {
    pub fn new(path: impl Into<String>, hash: ContentHash) -> Self {
        FileDescriptor {
            path: path.into(),
            hash,
            summary: String::new(),
            description: String::new(),
            tags: Tags::new(),
            package: None,
            namespace_aliases: BTreeMap::new(),
            includes: Vec::new(),
            classes: BTreeMap::new(),
            interfaces: BTreeMap::new(),
            traits: BTreeMap::new(),
            functions: BTreeMap::new(),
            constants: BTreeMap::new(),
            markers: Vec::new(),
            errors: Vec::new(),
            source: None,
        }
    }

    /// File name without directories.
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    pub fn add_class(&mut self, class: ClassDescriptor) {
        self.classes.insert(class.info.fqsen.clone(), class);
    }

    pub fn add_interface(&mut self, interface: InterfaceDescriptor) {
        self.interfaces.insert(interface.info.fqsen.clone(), interface);
    }

    pub fn add_trait(&mut self, descriptor: TraitDescriptor) {
        self.traits.insert(descriptor.info.fqsen.clone(), descriptor);
    }

    pub fn add_function(&mut self, function: FunctionDescriptor) {
        self.functions.insert(function.info.fqsen.clone(), function);
    }

    pub fn add_constant(&mut self, constant: ConstantDescriptor) {
        self.constants.insert(constant.info.fqsen.clone(), constant);
    }

    /// Top-level elements of every kind, in kind then FQSEN order.
    pub fn top_level(&self) -> Vec<&dyn Element> {
        let mut out: Vec<&dyn Element> = Vec::new();
        out.extend(self.constants.values().map(|e| e as &dyn Element));
        out.extend(self.functions.values().map(|e| e as &dyn Element));
        out.extend(self.classes.values().map(|e| e as &dyn Element));
        out.extend(self.interfaces.values().map(|e| e as &dyn Element));
        out.extend(self.traits.values().map(|e| e as &dyn Element));
        out
    }

    /// Members of the class, interface or trait named `fqsen`.
    pub fn members_of(&self, fqsen: &Fqsen) -> Option<(ElementKind, &Members)> {
        if let Some(class) = self.classes.get(fqsen) {
            return Some((ElementKind::Class, &class.members));
        }
        if let Some(interface) = self.interfaces.get(fqsen) {
            return Some((ElementKind::Interface, &interface.members));
        }
        self.traits
            .get(fqsen)
            .map(|t| (ElementKind::Trait, &t.members))
    }

    pub fn members_of_mut(&mut self, fqsen: &Fqsen) -> Option<&mut Members> {
        if let Some(class) = self.classes.get_mut(fqsen) {
            return Some(&mut class.members);
        }
        if let Some(interface) = self.interfaces.get_mut(fqsen) {
            return Some(&mut interface.members);
        }
        self.traits.get_mut(fqsen).map(|t| &mut t.members)
    }

    /// Find an element declared in this file.
    pub fn element(&self, kind: ElementKind, fqsen: &Fqsen) -> Option<&dyn Element> {
        match kind {
            ElementKind::Class => self.classes.get(fqsen).map(|e| e as &dyn Element),
            ElementKind::Interface => self.interfaces.get(fqsen).map(|e| e as &dyn Element),
            ElementKind::Trait => self.traits.get(fqsen).map(|e| e as &dyn Element),
            ElementKind::Function => self.functions.get(fqsen).map(|e| e as &dyn Element),
            ElementKind::Constant if !fqsen.is_member() => {
                self.constants.get(fqsen).map(|e| e as &dyn Element)
            }
            ElementKind::Constant | ElementKind::Method | ElementKind::Property => {
                let owner = fqsen.owner()?;
                let (_, members) = self.members_of(&owner)?;
                members.get(kind, fqsen.name())
            }
        }
    }

    pub fn element_mut(&mut self, kind: ElementKind, fqsen: &Fqsen) -> Option<&mut dyn Element> {
        match kind {
            ElementKind::Class => self.classes.get_mut(fqsen).map(|e| e as &mut dyn Element),
            ElementKind::Interface => self
                .interfaces
                .get_mut(fqsen)
                .map(|e| e as &mut dyn Element),
            ElementKind::Trait => self.traits.get_mut(fqsen).map(|e| e as &mut dyn Element),
            ElementKind::Function => self
                .functions
                .get_mut(fqsen)
                .map(|e| e as &mut dyn Element),
            ElementKind::Constant if !fqsen.is_member() => self
                .constants
                .get_mut(fqsen)
                .map(|e| e as &mut dyn Element),
            ElementKind::Constant | ElementKind::Method | ElementKind::Property => {
                let owner = fqsen.owner()?;
                let name = fqsen.name().to_string();
                self.members_of_mut(&owner)?.get_mut(kind, &name)
            }
        }
    }

    /// Remove an element (and, for containers, all of its members).
    pub fn remove_element(&mut self, kind: ElementKind, fqsen: &Fqsen) -> bool {
        match kind {
            ElementKind::Class => self.classes.remove(fqsen).is_some(),
            ElementKind::Interface => self.interfaces.remove(fqsen).is_some(),
            ElementKind::Trait => self.traits.remove(fqsen).is_some(),
            ElementKind::Function => self.functions.remove(fqsen).is_some(),
            ElementKind::Constant if !fqsen.is_member() => self.constants.remove(fqsen).is_some(),
            ElementKind::Constant | ElementKind::Method | ElementKind::Property => {
                let (Some(owner), name) = (fqsen.owner(), fqsen.name().to_string()) else {
                    return false;
                };
                self.members_of_mut(&owner)
                    .is_some_and(|members| members.remove(kind, &name))
            }
        }
    }
}
