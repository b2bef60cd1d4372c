//! The multi-pass compiler.
//!
//! Raw file descriptors become a linked project by running a fixed sequence
//! of [`CompilerPass`]es in descending priority:
//!
//! | Priority | Pass |
//! |---------:|------|
//! | 15000 | [`ElementsIndexBuilder`] |
//! | 10000 | [`Linker`] |
//! | 9000 | [`NamespaceTreeBuilder`] |
//! | 8900 | [`PackageTreeBuilder`] |
//! | 8800 | [`MarkerFromTagsExtractor`] |
//! | 8700 | [`ExampleTagsEnricher`] |
//! | 8600 | [`ResolveInlineLinkAndSeeTags`] |
//! | 8000 | [`UsedByBuilder`] |
//! | 7000 | [`TableOfContentsBuilder`] |
//! | 1000 | [`VisibilityFilterPass`] |
//!
//! Passes run one at a time. The first pass error aborts the build.

mod elements_index;
mod example_tags;
mod inline_links;
mod linker;
mod markers;
mod namespace_tree;
mod package_tree;
mod toc;
mod used_by;
mod visibility;

use std::time::Instant;

use crate::descriptor::{ApiSetDescriptor, ElementKind, ElementRef, FileDescriptor, FileId, Project};
use crate::error::DocbloxResult;
use crate::example::ExampleFinder;
use crate::observer::BuildObserver;
use crate::router::Router;

pub use elements_index::ElementsIndexBuilder;
pub use example_tags::ExampleTagsEnricher;
pub use inline_links::ResolveInlineLinkAndSeeTags;
pub use linker::Linker;
pub use markers::MarkerFromTagsExtractor;
pub use namespace_tree::NamespaceTreeBuilder;
pub use package_tree::{normalize_package_name, PackageTreeBuilder};
pub use toc::TableOfContentsBuilder;
pub use used_by::UsedByBuilder;
pub use visibility::VisibilityFilterPass;

// ============================================================================
// Pass contract
// ============================================================================

/// Services available to every pass.
pub struct PassContext<'a> {
    pub router: &'a dyn Router,
    pub examples: &'a dyn ExampleFinder,
    pub observer: &'a dyn BuildObserver,
}

/// One step of the compiler.
pub trait CompilerPass {
    /// Human-readable description used in logs.
    fn description(&self) -> &'static str;

    /// Higher runs earlier.
    fn priority(&self) -> i32;

    fn execute(&self, project: &mut Project, context: &PassContext<'_>) -> DocbloxResult<()>;
}

// ============================================================================
// Compiler
// ============================================================================

/// Ordered set of passes.
pub struct Compiler {
    passes: Vec<Box<dyn CompilerPass>>,
}

impl Compiler {
    /// Compiler with the standard passes.
    pub fn new() -> Self {
        let mut compiler = Compiler::empty();
        compiler.insert(Box::new(ElementsIndexBuilder));
        compiler.insert(Box::new(Linker));
        compiler.insert(Box::new(NamespaceTreeBuilder));
        compiler.insert(Box::new(PackageTreeBuilder));
        compiler.insert(Box::new(MarkerFromTagsExtractor));
        compiler.insert(Box::new(ExampleTagsEnricher));
        compiler.insert(Box::new(ResolveInlineLinkAndSeeTags));
        compiler.insert(Box::new(UsedByBuilder));
        compiler.insert(Box::new(TableOfContentsBuilder));
        compiler.insert(Box::new(VisibilityFilterPass));
        compiler
    }

    pub fn empty() -> Self {
        Compiler { passes: Vec::new() }
    }

    /// Add a pass; passes of equal priority keep insertion order.
    pub fn insert(&mut self, pass: Box<dyn CompilerPass>) {
        let at = self
            .passes
            .iter()
            .position(|p| p.priority() < pass.priority())
            .unwrap_or(self.passes.len());
        self.passes.insert(at, pass);
    }

    /// Pass descriptions in execution order.
    pub fn descriptions(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.description()).collect()
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Run every pass in order.
    pub fn compile(&self, project: &mut Project, context: &PassContext<'_>) -> DocbloxResult<()> {
        for pass in &self.passes {
            let description = pass.description();
            context.observer.pass_started(description);
            let started = Instant::now();
            pass.execute(project, context)?;
            context.observer.pass_finished(description, started.elapsed());
        }
        Ok(())
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Compiler::new()
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Address of every element of a set, members included.
///
/// Files in id order; per file, top-level elements in kind then FQSEN order,
/// each container followed by its constants, properties and methods.
pub(crate) fn all_elements(set: &ApiSetDescriptor) -> Vec<ElementRef> {
    let mut out = Vec::new();
    for (id, file) in set.files() {
        push_file_elements(&mut out, id, file);
    }
    out
}

fn push_file_elements(out: &mut Vec<ElementRef>, id: FileId, file: &FileDescriptor) {
    for element in file.top_level() {
        let kind = element.kind();
        out.push(ElementRef::new(id, kind, element.fqsen().clone()));
        if !kind.is_container() {
            continue;
        }
        if let Some((_, members)) = file.members_of(element.fqsen()) {
            for constant in members.constants.values() {
                out.push(ElementRef::new(
                    id,
                    ElementKind::Constant,
                    constant.info.fqsen.clone(),
                ));
            }
            for property in members.properties.values() {
                out.push(ElementRef::new(
                    id,
                    ElementKind::Property,
                    property.info.fqsen.clone(),
                ));
            }
            for method in members.methods.values() {
                out.push(ElementRef::new(id, ElementKind::Method, method.info.fqsen.clone()));
            }
        }
    }
}

/// Text edits computed for one file or element.
struct TextEdit {
    file: FileId,
    element: Option<ElementRef>,
    summary: Option<String>,
    description: Option<String>,
}

/// Apply `edit` to the summary and description of every file and element of
/// the set. `edit` returns `None` to keep a text unchanged.
///
/// Edits are computed against the unmodified set, then applied.
pub(crate) fn rewrite_texts(
    set: &mut ApiSetDescriptor,
    mut edit: impl FnMut(&ApiSetDescriptor, &str, FileId, Option<&ElementRef>) -> Option<String>,
) {
    let mut edits = Vec::new();
    for (id, file) in set.files() {
        let summary = edit(set, &file.summary, id, None);
        let description = edit(set, &file.description, id, None);
        if summary.is_some() || description.is_some() {
            edits.push(TextEdit {
                file: id,
                element: None,
                summary,
                description,
            });
        }
    }
    for element in all_elements(set) {
        let Some(current) = set.element(&element) else {
            continue;
        };
        let summary = edit(set, &current.info().summary, element.file, Some(&element));
        let description = edit(
            set,
            &current.info().description,
            element.file,
            Some(&element),
        );
        if summary.is_some() || description.is_some() {
            edits.push(TextEdit {
                file: element.file,
                element: Some(element),
                summary,
                description,
            });
        }
    }

    for text in edits {
        let (summary, description) = match &text.element {
            Some(element) => match set.element_mut(element) {
                Some(target) => {
                    let info = target.info_mut();
                    (&mut info.summary, &mut info.description)
                }
                None => continue,
            },
            None => match set.file_mut(text.file) {
                Some(file) => (&mut file.summary, &mut file.description),
                None => continue,
            },
        };
        if let Some(value) = text.summary {
            *summary = value;
        }
        if let Some(value) = text.description {
            *description = value;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DocbloxError;
    use crate::example::NoExamples;
    use crate::observer::{BuildEvent, CollectingObserver};
    use crate::router::StandardRouter;
    use crate::settings::Settings;

    struct Failing;

    impl CompilerPass for Failing {
        fn description(&self) -> &'static str {
            "Always fails"
        }

        fn priority(&self) -> i32 {
            9500
        }

        fn execute(&self, _: &mut Project, _: &PassContext<'_>) -> DocbloxResult<()> {
            Err(DocbloxError::internal("boom"))
        }
    }

    #[test]
    fn standard_passes_run_by_descending_priority() {
        let compiler = Compiler::new();
        let priorities: Vec<i32> = compiler.passes.iter().map(|p| p.priority()).collect();
        assert_eq!(
            priorities,
            vec![15000, 10000, 9000, 8900, 8800, 8700, 8600, 8000, 7000, 1000]
        );
        assert_eq!(compiler.descriptions()[0], "Build \"elements\" index");
    }

    #[test]
    fn inserted_pass_lands_by_priority() {
        let mut compiler = Compiler::new();
        compiler.insert(Box::new(Failing));
        assert_eq!(compiler.descriptions()[2], "Always fails");
        assert_eq!(compiler.len(), 11);
    }

    #[test]
    fn pass_error_aborts_compile() {
        let mut compiler = Compiler::empty();
        compiler.insert(Box::new(ElementsIndexBuilder));
        compiler.insert(Box::new(Failing));
        compiler.insert(Box::new(TableOfContentsBuilder));

        let observer = CollectingObserver::new();
        let router = StandardRouter::new();
        let context = PassContext {
            router: &router,
            examples: &NoExamples,
            observer: &observer,
        };
        let mut project = Project::new("Acme", Settings::default());
        assert!(compiler.compile(&mut project, &context).is_err());

        let started: Vec<String> = observer
            .events()
            .into_iter()
            .filter_map(|e| match e {
                BuildEvent::PassStarted { description } => Some(description),
                _ => None,
            })
            .collect();
        assert_eq!(started, vec!["Build \"elements\" index", "Always fails"]);
    }
}
