//! Descriptor model: the in-memory project tree consumed by renderers.
//!
//! Ownership is tree shaped:
//!
//! - [`Project`] owns [`VersionDescriptor`]s, which own documentation sets.
//! - An [`ApiSetDescriptor`] owns [`FileDescriptor`]s (behind `Arc`, shared
//!   copy-on-write with the incremental cache), the namespace and package
//!   [`Taxonomy`] arenas, the named indexes and the tables of contents.
//! - Files own their top-level elements; classes, interfaces and traits own
//!   their [`Members`].
//!
//! Everything else points into that tree with a [`DescriptorRef`]: indexes,
//! taxonomy nodes, resolved tag references. A reference is an address (file id
//! plus FQSEN, or node id), never a copy, so the `elements` index stays the
//! single source of truth for name lookup.

mod element;
mod file;
mod project;
mod tag;
mod toc;
mod tree;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::fqsen::Fqsen;

pub use element::{
    ArgumentDescriptor, ClassDescriptor, ConstantDescriptor, ElementInfo, FunctionDescriptor,
    InterfaceDescriptor, Members, MethodDescriptor, PropertyDescriptor, TraitDescriptor,
};
pub use file::{FileDescriptor, Marker, ParseError};
pub use project::{
    ApiSetDescriptor, DocumentationSet, GuideDocument, GuideSetDescriptor, Index, Indexes,
    Project, VersionDescriptor, INDEX_CLASSES, INDEX_CONSTANTS, INDEX_ELEMENTS, INDEX_FUNCTIONS,
    INDEX_INTERFACES, INDEX_NAMESPACES, INDEX_PACKAGES, INDEX_TRAITS,
};
pub use tag::{Reference, TagBody, TagDescriptor, Tags, REFERENCE_TAGS};
pub use toc::{Entry, TocDescriptor};
pub use tree::{NodeId, Taxonomy, TaxonomyKind, TreeNode};

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for a file within an API set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct FileId(pub u32);

impl FileId {
    /// Create a new file ID.
    pub fn new(id: u32) -> Self {
        FileId(id)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file_{}", self.0)
    }
}

// ============================================================================
// Kinds
// ============================================================================

/// Kind of a structural element.
///
/// Class constants share [`ElementKind::Constant`] with global constants; the
/// two are told apart by whether the FQSEN has an owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Class,
    Interface,
    Trait,
    Function,
    Constant,
    Method,
    Property,
}

impl ElementKind {
    /// Lowercase name used in logs, errors and JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Class => "class",
            ElementKind::Interface => "interface",
            ElementKind::Trait => "trait",
            ElementKind::Function => "function",
            ElementKind::Constant => "constant",
            ElementKind::Method => "method",
            ElementKind::Property => "property",
        }
    }

    /// Returns true for kinds that can own members.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            ElementKind::Class | ElementKind::Interface | ElementKind::Trait
        )
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Declared visibility of a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

impl Visibility {
    /// Parse a modifier keyword.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "public" => Some(Visibility::Public),
            "protected" => Some(Visibility::Protected),
            "private" => Some(Visibility::Private),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Protected => "protected",
            Visibility::Private => "private",
        }
    }
}

// ============================================================================
// Element capability
// ============================================================================

/// Capabilities shared by every structural element: it is named (FQSEN and
/// short name), documented (summary, description, tags) and located (line).
pub trait Element {
    fn info(&self) -> &ElementInfo;
    fn info_mut(&mut self) -> &mut ElementInfo;
    fn kind(&self) -> ElementKind;

    /// Declared visibility; `None` for elements without modifiers.
    fn visibility(&self) -> Option<Visibility> {
        None
    }

    fn fqsen(&self) -> &Fqsen {
        &self.info().fqsen
    }

    fn name(&self) -> &str {
        &self.info().name
    }

    fn tags(&self) -> &Tags {
        &self.info().tags
    }

    fn tags_mut(&mut self) -> &mut Tags {
        &mut self.info_mut().tags
    }

    fn line(&self) -> u32 {
        self.info().line
    }
}

// ============================================================================
// References
// ============================================================================

/// Address of an element inside an API set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct ElementRef {
    /// File that declares the element (or its container).
    pub file: FileId,
    pub kind: ElementKind,
    pub fqsen: Fqsen,
}

impl ElementRef {
    pub fn new(file: FileId, kind: ElementKind, fqsen: Fqsen) -> Self {
        ElementRef { file, kind, fqsen }
    }
}

/// Non-owning reference to any descriptor held by an API set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DescriptorRef {
    File(FileId),
    Element(ElementRef),
    Namespace(NodeId),
    Package(NodeId),
}

impl DescriptorRef {
    pub fn as_element(&self) -> Option<&ElementRef> {
        match self {
            DescriptorRef::Element(element) => Some(element),
            _ => None,
        }
    }
}

/// Borrowed view of a descriptor, used by the router and by exporters.
#[derive(Clone, Copy)]
pub enum DescriptorView<'a> {
    File(&'a FileDescriptor),
    Namespace(&'a TreeNode),
    Package(&'a TreeNode),
    Element(&'a dyn Element),
    /// A document of a guide set.
    Document(&'a GuideDocument),
    /// A literal URL (e.g. the target of `{@link https://...}`).
    Url(&'a str),
}

impl DescriptorView<'_> {
    /// Node type name, used in routing errors.
    pub fn node_type(&self) -> &'static str {
        match self {
            DescriptorView::File(_) => "file",
            DescriptorView::Namespace(_) => "namespace",
            DescriptorView::Package(_) => "package",
            DescriptorView::Element(element) => element.kind().as_str(),
            DescriptorView::Document(_) => "document",
            DescriptorView::Url(_) => "url",
        }
    }

    /// Display name (path, full name, FQSEN or URL).
    pub fn display_name(&self) -> String {
        match self {
            DescriptorView::File(file) => file.path.clone(),
            DescriptorView::Namespace(node) | DescriptorView::Package(node) => {
                node.full_name.to_string()
            }
            DescriptorView::Element(element) => element.fqsen().to_string(),
            DescriptorView::Document(document) => document.path.clone(),
            DescriptorView::Url(url) => url.to_string(),
        }
    }
}

impl fmt::Debug for DescriptorView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DescriptorView({} {})", self.node_type(), self.display_name())
    }
}
