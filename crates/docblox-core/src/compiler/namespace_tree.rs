//! Builds the namespace tree.

use super::{CompilerPass, PassContext};
use crate::descriptor::{
    ApiSetDescriptor, DescriptorRef, Project, INDEX_CLASSES, INDEX_CONSTANTS, INDEX_ELEMENTS,
    INDEX_FUNCTIONS, INDEX_INTERFACES, INDEX_NAMESPACES, INDEX_TRAITS,
};
use crate::error::DocbloxResult;

/// Index names whose entries are attached to taxonomy nodes.
pub(crate) const TOP_LEVEL_INDEXES: [&str; 5] = [
    INDEX_CLASSES,
    INDEX_INTERFACES,
    INDEX_TRAITS,
    INDEX_FUNCTIONS,
    INDEX_CONSTANTS,
];

/// Places every top-level element under the node of its namespace.
///
/// Intermediate namespaces are created on demand. Running the pass again
/// creates no new nodes and attaches nothing twice. Each node is registered
/// in `elements` under `~` + its full name and in `namespaces` under its full
/// name.
#[derive(Debug, Clone, Copy, Default)]
pub struct NamespaceTreeBuilder;

impl CompilerPass for NamespaceTreeBuilder {
    fn description(&self) -> &'static str {
        "Build \"namespaces\" index and add namespaces to \"elements\""
    }

    fn priority(&self) -> i32 {
        9000
    }

    fn execute(&self, project: &mut Project, _context: &PassContext<'_>) -> DocbloxResult<()> {
        for set in project.api_sets_mut() {
            build_namespace_tree(set);
        }
        Ok(())
    }
}

fn build_namespace_tree(set: &mut ApiSetDescriptor) {
    let mut attachments = Vec::new();
    for name in TOP_LEVEL_INDEXES {
        let Some(index) = set.indexes.get(name) else {
            continue;
        };
        attachments.extend(index.values().filter_map(|r| r.as_element()).cloned());
    }

    for element in attachments {
        let (node, _) = set.namespaces.ensure(&element.fqsen.namespace());
        if let Some(node) = set.namespaces.get_mut(node) {
            node.attach(element);
        }
    }

    let nodes: Vec<(String, DescriptorRef)> = set
        .namespaces
        .nodes()
        .map(|node| (node.full_name.to_string(), DescriptorRef::Namespace(node.id)))
        .collect();
    for (full_name, reference) in nodes {
        set.indexes
            .fetch(INDEX_ELEMENTS)
            .insert(format!("~{}", full_name), reference.clone());
        set.indexes
            .fetch(INDEX_NAMESPACES)
            .insert(full_name, reference);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::ElementsIndexBuilder;
    use crate::descriptor::{
        ClassDescriptor, DocumentationSet, FileDescriptor, FunctionDescriptor, NodeId,
        VersionDescriptor,
    };
    use crate::example::NoExamples;
    use crate::fqsen::Fqsen;
    use crate::hash::ContentHash;
    use crate::observer::CollectingObserver;
    use crate::router::StandardRouter;
    use crate::settings::Settings;
    use std::sync::Arc;

    fn project() -> Project {
        let mut file = FileDescriptor::new("a.php", ContentHash::compute(b"a"));
        file.add_class(ClassDescriptor::new(Fqsen::new("\\My\\Space\\Foo"), 1));
        file.add_class(ClassDescriptor::new(Fqsen::new("\\My\\Space\\Bar"), 9));
        file.add_function(FunctionDescriptor::new(Fqsen::new("\\helper()"), 20));
        let mut set = ApiSetDescriptor::new("api");
        set.add_file(Arc::new(file));
        let mut project = Project::new("Acme", Settings::default());
        project
            .add_version(VersionDescriptor::new("1.0").with_set(DocumentationSet::Api(set)))
            .unwrap();
        project
    }

    fn run(project: &mut Project, passes: &[&dyn CompilerPass]) {
        let router = StandardRouter::new();
        let observer = CollectingObserver::new();
        let context = PassContext {
            router: &router,
            examples: &NoExamples,
            observer: &observer,
        };
        for pass in passes {
            pass.execute(project, &context).unwrap();
        }
    }

    #[test]
    fn builds_intermediate_nodes() {
        let mut project = project();
        run(&mut project, &[&ElementsIndexBuilder, &NamespaceTreeBuilder]);
        let set = project.api_sets().next().unwrap();

        let my = set.namespaces.find(&Fqsen::new("\\My")).unwrap();
        let space = set.namespaces.find(&Fqsen::new("\\My\\Space")).unwrap();
        let space_node = set.namespaces.get(space).unwrap();
        assert_eq!(space_node.parent, Some(my));
        assert_eq!(space_node.classes.len(), 2);
        assert_eq!(set.namespaces.root().functions.len(), 1);

        assert_eq!(set.lookup("~\\My\\Space"), Some(&DescriptorRef::Namespace(space)));
        assert_eq!(set.lookup("~\\"), Some(&DescriptorRef::Namespace(NodeId::ROOT)));
        assert_eq!(
            set.indexes.lookup(INDEX_NAMESPACES, "\\"),
            Some(&DescriptorRef::Namespace(NodeId::ROOT))
        );
        assert!(set.indexes.lookup(INDEX_NAMESPACES, "\\My").is_some());
    }

    #[test]
    fn rerun_is_idempotent() {
        let mut project = project();
        run(&mut project, &[&ElementsIndexBuilder, &NamespaceTreeBuilder]);
        let first = project.api_sets().next().unwrap().namespaces.clone();
        run(&mut project, &[&NamespaceTreeBuilder]);
        let set = project.api_sets().next().unwrap();
        assert_eq!(set.namespaces, first);
        assert_eq!(set.namespaces.len(), 3);
    }
}
