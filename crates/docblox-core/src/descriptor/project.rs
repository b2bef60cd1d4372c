//! Project, versions and documentation sets.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{
    DescriptorRef, DescriptorView, Element, ElementRef, FileDescriptor, FileId, Taxonomy,
    TaxonomyKind, TocDescriptor,
};
use crate::error::{DocbloxError, DocbloxResult};
use crate::settings::Settings;

// ============================================================================
// Indexes
// ============================================================================

pub const INDEX_ELEMENTS: &str = "elements";
pub const INDEX_NAMESPACES: &str = "namespaces";
pub const INDEX_PACKAGES: &str = "packages";
pub const INDEX_CLASSES: &str = "classes";
pub const INDEX_INTERFACES: &str = "interfaces";
pub const INDEX_TRAITS: &str = "traits";
pub const INDEX_FUNCTIONS: &str = "functions";
pub const INDEX_CONSTANTS: &str = "constants";

/// One named index: key → reference.
pub type Index = BTreeMap<String, DescriptorRef>;

/// Named indexes of an API set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Indexes(BTreeMap<String, Index>);

impl Indexes {
    pub fn get(&self, name: &str) -> Option<&Index> {
        self.0.get(name)
    }

    /// Get an index, creating it empty when missing.
    pub fn fetch(&mut self, name: &str) -> &mut Index {
        self.0.entry(name.to_string()).or_default()
    }

    pub fn set(&mut self, name: &str, index: Index) {
        self.0.insert(name.to_string(), index);
    }

    /// Look up one key in one index.
    pub fn lookup(&self, name: &str, key: &str) -> Option<&DescriptorRef> {
        self.0.get(name)?.get(key)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Index)> {
        self.0.iter().map(|(name, index)| (name.as_str(), index))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Index)> {
        self.0.iter_mut().map(|(name, index)| (name.as_str(), index))
    }
}

// ============================================================================
// API set
// ============================================================================

/// One analyzed source tree's worth of documentation.
///
/// Files are held behind `Arc` and shared with the incremental cache. Compiler
/// passes obtain mutable access through [`ApiSetDescriptor::file_mut`], which
/// copies a shared file on first write and leaves the cached original intact.
#[derive(Debug, Clone)]
pub struct ApiSetDescriptor {
    pub name: String,
    files: BTreeMap<FileId, Arc<FileDescriptor>>,
    paths: BTreeMap<String, FileId>,
    next_file_id: u32,
    pub indexes: Indexes,
    pub namespaces: Taxonomy,
    pub packages: Taxonomy,
    tables_of_contents: Vec<TocDescriptor>,
}

impl ApiSetDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        ApiSetDescriptor {
            name: name.into(),
            files: BTreeMap::new(),
            paths: BTreeMap::new(),
            next_file_id: 0,
            indexes: Indexes::default(),
            namespaces: Taxonomy::new(TaxonomyKind::Namespace),
            packages: Taxonomy::new(TaxonomyKind::Package),
            tables_of_contents: Vec::new(),
        }
    }

    // ------------------------------------------------------------------------
    // Files
    // ------------------------------------------------------------------------

    /// Add a file, replacing any file with the same path (which keeps its id).
    pub fn add_file(&mut self, file: Arc<FileDescriptor>) -> FileId {
        let id = match self.paths.get(&file.path) {
            Some(id) => *id,
            None => {
                let id = FileId::new(self.next_file_id);
                self.next_file_id += 1;
                self.paths.insert(file.path.clone(), id);
                id
            }
        };
        self.files.insert(id, file);
        id
    }

    pub fn file(&self, id: FileId) -> Option<&FileDescriptor> {
        self.files.get(&id).map(Arc::as_ref)
    }

    /// The shared handle for a file.
    pub fn file_arc(&self, id: FileId) -> Option<&Arc<FileDescriptor>> {
        self.files.get(&id)
    }

    /// Mutable access to a file, copying it first if it is shared.
    pub fn file_mut(&mut self, id: FileId) -> Option<&mut FileDescriptor> {
        self.files.get_mut(&id).map(Arc::make_mut)
    }

    pub fn file_id(&self, path: &str) -> Option<FileId> {
        self.paths.get(path).copied()
    }

    pub fn files(&self) -> impl Iterator<Item = (FileId, &FileDescriptor)> {
        self.files.iter().map(|(id, file)| (*id, file.as_ref()))
    }

    pub fn file_ids(&self) -> Vec<FileId> {
        self.files.keys().copied().collect()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    // ------------------------------------------------------------------------
    // Elements
    // ------------------------------------------------------------------------

    pub fn element(&self, element: &ElementRef) -> Option<&dyn Element> {
        self.file(element.file)?
            .element(element.kind, &element.fqsen)
    }

    pub fn element_mut(&mut self, element: &ElementRef) -> Option<&mut dyn Element> {
        self.file_mut(element.file)?
            .element_mut(element.kind, &element.fqsen)
    }

    /// Look up a key in the `elements` index.
    pub fn lookup(&self, key: &str) -> Option<&DescriptorRef> {
        self.indexes.lookup(INDEX_ELEMENTS, key)
    }

    /// Resolve a reference to a borrowed view.
    pub fn view(&self, reference: &DescriptorRef) -> Option<DescriptorView<'_>> {
        match reference {
            DescriptorRef::File(id) => self.file(*id).map(DescriptorView::File),
            DescriptorRef::Element(element) => self.element(element).map(DescriptorView::Element),
            DescriptorRef::Namespace(id) => self.namespaces.get(*id).map(DescriptorView::Namespace),
            DescriptorRef::Package(id) => self.packages.get(*id).map(DescriptorView::Package),
        }
    }

    /// Returns true if the reference still points at a descriptor.
    pub fn resolves(&self, reference: &DescriptorRef) -> bool {
        self.view(reference).is_some()
    }

    // ------------------------------------------------------------------------
    // Tables of contents
    // ------------------------------------------------------------------------

    /// Add a table of contents, replacing one with the same name.
    pub fn add_table_of_contents(&mut self, toc: TocDescriptor) {
        self.tables_of_contents.retain(|t| t.name != toc.name);
        self.tables_of_contents.push(toc);
    }

    pub fn tables_of_contents(&self) -> &[TocDescriptor] {
        &self.tables_of_contents
    }

    pub fn table_of_contents(&self, name: &str) -> Option<&TocDescriptor> {
        self.tables_of_contents.iter().find(|t| t.name == name)
    }
}

// ============================================================================
// Guide set
// ============================================================================

/// One hand-written document of a guide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuideDocument {
    /// Path relative to the guide root, without extension.
    pub path: String,
    pub title: String,
    /// Paths of documents listed by this document's table of contents.
    #[serde(default)]
    pub toc: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct GuideSetDescriptor {
    pub name: String,
    pub documents: BTreeMap<String, GuideDocument>,
    tables_of_contents: Vec<TocDescriptor>,
}

impl GuideSetDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        GuideSetDescriptor {
            name: name.into(),
            documents: BTreeMap::new(),
            tables_of_contents: Vec::new(),
        }
    }

    pub fn add_document(&mut self, document: GuideDocument) {
        self.documents.insert(document.path.clone(), document);
    }

    pub fn add_table_of_contents(&mut self, toc: TocDescriptor) {
        self.tables_of_contents.retain(|t| t.name != toc.name);
        self.tables_of_contents.push(toc);
    }

    pub fn tables_of_contents(&self) -> &[TocDescriptor] {
        &self.tables_of_contents
    }
}

/// A documentation set of a version.
#[derive(Debug, Clone)]
pub enum DocumentationSet {
    Api(ApiSetDescriptor),
    Guide(GuideSetDescriptor),
}

impl DocumentationSet {
    pub fn name(&self) -> &str {
        match self {
            DocumentationSet::Api(set) => &set.name,
            DocumentationSet::Guide(set) => &set.name,
        }
    }
}

// ============================================================================
// Versions and project
// ============================================================================

#[derive(Debug, Clone)]
pub struct VersionDescriptor {
    pub number: String,
    pub sets: Vec<DocumentationSet>,
}

impl VersionDescriptor {
    pub fn new(number: impl Into<String>) -> Self {
        VersionDescriptor {
            number: number.into(),
            sets: Vec::new(),
        }
    }

    pub fn with_set(mut self, set: DocumentationSet) -> Self {
        self.sets.push(set);
        self
    }

    pub fn api_sets(&self) -> impl Iterator<Item = &ApiSetDescriptor> {
        self.sets.iter().filter_map(|set| match set {
            DocumentationSet::Api(api) => Some(api),
            DocumentationSet::Guide(_) => None,
        })
    }

    pub fn api_sets_mut(&mut self) -> impl Iterator<Item = &mut ApiSetDescriptor> {
        self.sets.iter_mut().filter_map(|set| match set {
            DocumentationSet::Api(api) => Some(api),
            DocumentationSet::Guide(_) => None,
        })
    }

    pub fn guide_sets_mut(&mut self) -> impl Iterator<Item = &mut GuideSetDescriptor> {
        self.sets.iter_mut().filter_map(|set| match set {
            DocumentationSet::Guide(guide) => Some(guide),
            DocumentationSet::Api(_) => None,
        })
    }
}

/// Root of the descriptor tree.
#[derive(Debug, Clone)]
pub struct Project {
    pub title: String,
    pub settings: Settings,
    versions: Vec<VersionDescriptor>,
}

impl Project {
    pub fn new(title: impl Into<String>, settings: Settings) -> Self {
        Project {
            title: title.into(),
            settings,
            versions: Vec::new(),
        }
    }

    /// Register a version; version numbers are unique within a project.
    pub fn add_version(&mut self, version: VersionDescriptor) -> DocbloxResult<()> {
        if self.versions.iter().any(|v| v.number == version.number) {
            return Err(DocbloxError::DuplicateVersion {
                number: version.number,
            });
        }
        self.versions.push(version);
        Ok(())
    }

    pub fn versions(&self) -> &[VersionDescriptor] {
        &self.versions
    }

    pub fn version(&self, number: &str) -> Option<&VersionDescriptor> {
        self.versions.iter().find(|v| v.number == number)
    }

    pub fn version_mut(&mut self, number: &str) -> Option<&mut VersionDescriptor> {
        self.versions.iter_mut().find(|v| v.number == number)
    }

    /// Split borrow: settings alongside mutable versions, for compiler passes.
    pub fn parts_mut(&mut self) -> (&Settings, &mut [VersionDescriptor]) {
        (&self.settings, &mut self.versions)
    }

    /// Every API set of every version.
    pub fn api_sets(&self) -> impl Iterator<Item = &ApiSetDescriptor> {
        self.versions.iter().flat_map(VersionDescriptor::api_sets)
    }

    pub fn api_sets_mut(&mut self) -> impl Iterator<Item = &mut ApiSetDescriptor> {
        self.versions.iter_mut().flat_map(VersionDescriptor::api_sets_mut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ClassDescriptor, ElementKind};
    use crate::fqsen::Fqsen;
    use crate::hash::ContentHash;

    fn file(path: &str) -> Arc<FileDescriptor> {
        Arc::new(FileDescriptor::new(path, ContentHash::compute(path.as_bytes())))
    }

    #[test]
    fn duplicate_version_is_rejected() {
        let mut project = Project::new("Acme", Settings::default());
        assert!(project.add_version(VersionDescriptor::new("1.0")).is_ok());
        let err = project.add_version(VersionDescriptor::new("1.0"));
        assert!(matches!(err, Err(DocbloxError::DuplicateVersion { number }) if number == "1.0"));
        assert_eq!(project.versions().len(), 1);
    }

    #[test]
    fn replacing_a_file_keeps_its_id() {
        let mut set = ApiSetDescriptor::new("api");
        let first = set.add_file(file("a.php"));
        let second = set.add_file(file("b.php"));
        let replaced = set.add_file(file("a.php"));
        assert_ne!(first, second);
        assert_eq!(first, replaced);
        assert_eq!(set.file_count(), 2);
    }

    #[test]
    fn file_mut_copies_shared_files() {
        let mut set = ApiSetDescriptor::new("api");
        let shared = file("a.php");
        let id = set.add_file(Arc::clone(&shared));
        assert!(set.file_arc(id).is_some_and(|f| Arc::ptr_eq(f, &shared)));

        if let Some(file) = set.file_mut(id) {
            file.summary = "changed".to_string();
        }
        assert!(shared.summary.is_empty());
        assert_eq!(set.file(id).map(|f| f.summary.as_str()), Some("changed"));
    }

    #[test]
    fn view_resolves_element_refs() {
        let mut set = ApiSetDescriptor::new("api");
        let mut descriptor = FileDescriptor::new("a.php", ContentHash::compute(b""));
        descriptor.add_class(ClassDescriptor::new(Fqsen::new("\\Acme\\Foo"), 3));
        let id = set.add_file(Arc::new(descriptor));

        let present = DescriptorRef::Element(ElementRef::new(
            id,
            ElementKind::Class,
            Fqsen::new("\\Acme\\Foo"),
        ));
        let missing = DescriptorRef::Element(ElementRef::new(
            id,
            ElementKind::Class,
            Fqsen::new("\\Acme\\Bar"),
        ));
        assert!(set.resolves(&present));
        assert!(!set.resolves(&missing));
        assert!(set.resolves(&DescriptorRef::Namespace(crate::descriptor::NodeId::ROOT)));
    }
}
