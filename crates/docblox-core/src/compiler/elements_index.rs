//! Builds the `elements` index and the per-kind indexes.

use std::collections::BTreeMap;

use super::{all_elements, CompilerPass, PassContext};
use crate::descriptor::{
    ApiSetDescriptor, DescriptorRef, ElementKind, ElementRef, Index, Project, INDEX_CLASSES,
    INDEX_CONSTANTS, INDEX_ELEMENTS, INDEX_FUNCTIONS, INDEX_INTERFACES, INDEX_TRAITS,
};
use crate::error::{DocbloxError, DocbloxResult};
use crate::observer::BuildObserver;

/// Indexes every element of every API set by FQSEN.
///
/// Top-level classes, interfaces, traits, functions and constants also go
/// into their kind's index. Members are only in `elements`, keyed
/// `\Owner::method()`, `\Owner::$property` and `\Owner::CONSTANT`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElementsIndexBuilder;

impl CompilerPass for ElementsIndexBuilder {
    fn description(&self) -> &'static str {
        "Build \"elements\" index"
    }

    fn priority(&self) -> i32 {
        15000
    }

    fn execute(&self, project: &mut Project, context: &PassContext<'_>) -> DocbloxResult<()> {
        let (settings, versions) = project.parts_mut();
        for version in versions {
            for set in version.api_sets_mut() {
                build_indexes(set, settings.strict_fqsen, context.observer)?;
            }
        }
        Ok(())
    }
}

fn kind_index(kind: ElementKind, is_member: bool) -> Option<&'static str> {
    if is_member {
        return None;
    }
    match kind {
        ElementKind::Class => Some(INDEX_CLASSES),
        ElementKind::Interface => Some(INDEX_INTERFACES),
        ElementKind::Trait => Some(INDEX_TRAITS),
        ElementKind::Function => Some(INDEX_FUNCTIONS),
        ElementKind::Constant => Some(INDEX_CONSTANTS),
        ElementKind::Method | ElementKind::Property => None,
    }
}

fn build_indexes(
    set: &mut ApiSetDescriptor,
    strict: bool,
    observer: &dyn BuildObserver,
) -> DocbloxResult<()> {
    let mut elements = Index::new();
    let mut by_kind: BTreeMap<&'static str, Index> = [
        INDEX_CLASSES,
        INDEX_INTERFACES,
        INDEX_TRAITS,
        INDEX_FUNCTIONS,
        INDEX_CONSTANTS,
    ]
    .into_iter()
    .map(|name| (name, Index::new()))
    .collect();

    for element in all_elements(set) {
        let key = element.fqsen.to_string();
        let reference = DescriptorRef::Element(element.clone());
        if let Some(DescriptorRef::Element(previous)) = elements.get(&key) {
            report_collision(set, &key, previous, &element, strict, observer)?;
        }
        elements.insert(key.clone(), reference.clone());
        if let Some(index) = kind_index(element.kind, element.fqsen.is_member()) {
            by_kind.entry(index).or_default().insert(key, reference);
        }
    }

    set.indexes.set(INDEX_ELEMENTS, elements);
    for (name, index) in by_kind {
        set.indexes.set(name, index);
    }
    Ok(())
}

fn report_collision(
    set: &ApiSetDescriptor,
    fqsen: &str,
    previous: &ElementRef,
    current: &ElementRef,
    strict: bool,
    observer: &dyn BuildObserver,
) -> DocbloxResult<()> {
    let path = |element: &ElementRef| {
        set.file(element.file)
            .map(|f| f.path.clone())
            .unwrap_or_else(|| element.file.to_string())
    };
    let (first, second) = (path(previous), path(current));
    if strict {
        return Err(DocbloxError::DuplicateFqsen {
            fqsen: fqsen.to_string(),
            first,
            second,
        });
    }
    observer.debug(&format!(
        "{} declared in {} is replaced by the declaration in {}",
        fqsen, first, second
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{
        ClassDescriptor, ConstantDescriptor, DocumentationSet, FileDescriptor, FunctionDescriptor,
        InterfaceDescriptor, MethodDescriptor, PropertyDescriptor, TraitDescriptor,
        VersionDescriptor,
    };
    use crate::example::NoExamples;
    use crate::fqsen::Fqsen;
    use crate::hash::ContentHash;
    use crate::observer::CollectingObserver;
    use crate::router::StandardRouter;
    use crate::settings::Settings;
    use std::sync::Arc;

    fn run(project: &mut Project) -> DocbloxResult<()> {
        let router = StandardRouter::new();
        let observer = CollectingObserver::new();
        let context = PassContext {
            router: &router,
            examples: &NoExamples,
            observer: &observer,
        };
        ElementsIndexBuilder.execute(project, &context)
    }

    fn project_with(files: Vec<FileDescriptor>, settings: Settings) -> Project {
        let mut set = ApiSetDescriptor::new("api");
        for file in files {
            set.add_file(Arc::new(file));
        }
        let mut project = Project::new("Acme", settings);
        project
            .add_version(VersionDescriptor::new("1.0").with_set(DocumentationSet::Api(set)))
            .unwrap();
        project
    }

    fn sample_file() -> FileDescriptor {
        let owner = Fqsen::new("\\NS\\Foo");
        let mut file = FileDescriptor::new("src/Foo.php", ContentHash::compute(b"foo"));
        file.add_class(
            ClassDescriptor::new(owner.clone(), 3)
                .with_method(MethodDescriptor::new(&owner, "bar", 5))
                .with_property(PropertyDescriptor::new(&owner, "baz", 4))
                .with_constant(ConstantDescriptor::member(&owner, "QUX", 4)),
        );
        file.add_interface(InterfaceDescriptor::new(Fqsen::new("\\NS\\Contract"), 10));
        file.add_trait(TraitDescriptor::new(Fqsen::new("\\NS\\Helper"), 12));
        file.add_function(FunctionDescriptor::new(Fqsen::new("\\NS\\run()"), 14));
        file.add_constant(ConstantDescriptor::new(Fqsen::new("\\NS\\VERSION"), 16));
        file
    }

    fn keys(project: &Project, index: &str) -> Vec<String> {
        let set = project.api_sets().next().unwrap();
        set.indexes
            .get(index)
            .map(|i| i.keys().cloned().collect())
            .unwrap_or_default()
    }

    #[test]
    fn members_are_only_in_elements() {
        let mut project = project_with(vec![sample_file()], Settings::default());
        run(&mut project).unwrap();

        assert_eq!(
            keys(&project, INDEX_ELEMENTS),
            vec![
                "\\NS\\Contract",
                "\\NS\\Foo",
                "\\NS\\Foo::$baz",
                "\\NS\\Foo::QUX",
                "\\NS\\Foo::bar()",
                "\\NS\\Helper",
                "\\NS\\VERSION",
                "\\NS\\run()",
            ]
        );
        assert_eq!(keys(&project, INDEX_CLASSES), vec!["\\NS\\Foo"]);
        assert_eq!(keys(&project, INDEX_INTERFACES), vec!["\\NS\\Contract"]);
        assert_eq!(keys(&project, INDEX_TRAITS), vec!["\\NS\\Helper"]);
        assert_eq!(keys(&project, INDEX_FUNCTIONS), vec!["\\NS\\run()"]);
        assert_eq!(keys(&project, INDEX_CONSTANTS), vec!["\\NS\\VERSION"]);
    }

    #[test]
    fn every_kind_index_entry_is_in_elements() {
        let mut project = project_with(vec![sample_file()], Settings::default());
        run(&mut project).unwrap();
        let set = project.api_sets().next().unwrap();
        let elements = set.indexes.get(INDEX_ELEMENTS).unwrap();
        for name in [INDEX_CLASSES, INDEX_INTERFACES, INDEX_TRAITS, INDEX_FUNCTIONS, INDEX_CONSTANTS] {
            for (key, reference) in set.indexes.get(name).unwrap() {
                assert_eq!(elements.get(key), Some(reference));
                assert!(set.resolves(reference));
            }
        }
    }

    #[test]
    fn rerun_is_idempotent() {
        let mut project = project_with(vec![sample_file()], Settings::default());
        run(&mut project).unwrap();
        let first = project.api_sets().next().unwrap().indexes.clone();
        run(&mut project).unwrap();
        assert_eq!(project.api_sets().next().unwrap().indexes, first);
    }

    #[test]
    fn duplicate_fqsen_last_write_wins() {
        let mut a = FileDescriptor::new("a.php", ContentHash::compute(b"a"));
        a.add_class(ClassDescriptor::new(Fqsen::new("\\Dup"), 1));
        let mut b = FileDescriptor::new("b.php", ContentHash::compute(b"b"));
        b.add_class(ClassDescriptor::new(Fqsen::new("\\Dup"), 7));
        let mut project = project_with(vec![a, b], Settings::default());
        run(&mut project).unwrap();

        let set = project.api_sets().next().unwrap();
        let winner = set.lookup("\\Dup").and_then(|r| r.as_element()).unwrap();
        assert_eq!(set.file(winner.file).unwrap().path, "b.php");
    }

    #[test]
    fn duplicate_fqsen_is_an_error_in_strict_mode() {
        let mut a = FileDescriptor::new("a.php", ContentHash::compute(b"a"));
        a.add_class(ClassDescriptor::new(Fqsen::new("\\Dup"), 1));
        let mut b = FileDescriptor::new("b.php", ContentHash::compute(b"b"));
        b.add_class(ClassDescriptor::new(Fqsen::new("\\Dup"), 7));
        let settings = Settings {
            strict_fqsen: true,
            ..Settings::default()
        };
        let mut project = project_with(vec![a, b], settings);

        match run(&mut project) {
            Err(DocbloxError::DuplicateFqsen { fqsen, first, second }) => {
                assert_eq!(fqsen, "\\Dup");
                assert_eq!(first, "a.php");
                assert_eq!(second, "b.php");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
