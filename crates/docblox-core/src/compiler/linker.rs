//! Resolves textual references into descriptor references.

use super::{all_elements, CompilerPass, PassContext};
use crate::descriptor::{
    ApiSetDescriptor, DescriptorRef, ElementKind, ElementRef, FileId, Project, Reference, Tags,
    REFERENCE_TAGS,
};
use crate::error::DocbloxResult;
use crate::fqsen::Fqsen;
use crate::linker::{DescriptorRepository, Resolution, ResolutionContext};

/// Links class parents, implemented interfaces, used traits and the
/// `@see`, `@uses` and `@covers` tags of every element to their targets.
///
/// Targets are rewritten to their fully qualified form. Targets that do not
/// resolve keep `resolved == None`; URLs are left alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct Linker;

impl CompilerPass for Linker {
    fn description(&self) -> &'static str {
        "Replace textual FQSENs with references to the elements they name"
    }

    fn priority(&self) -> i32 {
        10000
    }

    fn execute(&self, project: &mut Project, context: &PassContext<'_>) -> DocbloxResult<()> {
        for set in project.api_sets_mut() {
            let links = collect_links(set);
            let unresolved = links.iter().filter(|l| l.resolved.is_none()).count();
            apply_links(set, links);
            if unresolved > 0 {
                context
                    .observer
                    .debug(&format!("{} references in {} did not resolve", unresolved, set.name));
            }
        }
        Ok(())
    }
}

/// Where a reference lives inside its element.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    Parent,
    Interface(usize),
    UsedTrait(usize),
    Tag(String, usize),
}

#[derive(Debug, Clone)]
struct Link {
    file: FileId,
    /// `None` for tags of the file itself.
    element: Option<ElementRef>,
    slot: Slot,
    target: String,
    resolved: Option<DescriptorRef>,
}

pub(crate) fn is_url(target: &str) -> bool {
    match target.split_once("://") {
        Some((scheme, _)) => {
            !scheme.is_empty() && scheme.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    }
}

fn resolve(
    repository: &DescriptorRepository<'_>,
    target: &str,
    context: &ResolutionContext<'_>,
) -> (String, Option<DescriptorRef>) {
    let resolution = repository.find_alias(target, context);
    let text = resolution.fqsen_text().to_string();
    match resolution {
        Resolution::Resolved { reference, .. } => (text, Some(reference)),
        Resolution::Unresolved(_) => (text, None),
    }
}

fn structural_references<'a>(
    set: &'a ApiSetDescriptor,
    element: &ElementRef,
) -> Vec<(Slot, &'a Reference)> {
    let Some(file) = set.file(element.file) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    match element.kind {
        ElementKind::Class => {
            if let Some(class) = file.classes.get(&element.fqsen) {
                if let Some(parent) = &class.parent {
                    out.push((Slot::Parent, parent));
                }
                for (i, r) in class.interfaces.iter().enumerate() {
                    out.push((Slot::Interface(i), r));
                }
                for (i, r) in class.used_traits.iter().enumerate() {
                    out.push((Slot::UsedTrait(i), r));
                }
            }
        }
        ElementKind::Interface => {
            if let Some(interface) = file.interfaces.get(&element.fqsen) {
                for (i, r) in interface.parents.iter().enumerate() {
                    out.push((Slot::Interface(i), r));
                }
            }
        }
        ElementKind::Trait => {
            if let Some(descriptor) = file.traits.get(&element.fqsen) {
                for (i, r) in descriptor.used_traits.iter().enumerate() {
                    out.push((Slot::UsedTrait(i), r));
                }
            }
        }
        _ => {}
    }
    out
}

fn tag_references(tags: &Tags) -> Vec<(Slot, &Reference)> {
    let mut out = Vec::new();
    for name in REFERENCE_TAGS.iter().filter(|name| **name != "used-by") {
        for (i, tag) in tags.get(name).iter().enumerate() {
            if let Some(reference) = tag.as_reference() {
                out.push((Slot::Tag(name.to_string(), i), reference));
            }
        }
    }
    out
}

fn collect_links(set: &ApiSetDescriptor) -> Vec<Link> {
    let repository = DescriptorRepository::new(set);
    let mut links = Vec::new();

    for (id, file) in set.files() {
        let context = ResolutionContext {
            namespace: Fqsen::root(),
            aliases: Some(&file.namespace_aliases),
            container: None,
        };
        for (slot, reference) in tag_references(&file.tags) {
            if is_url(&reference.target) {
                continue;
            }
            let (target, resolved) = resolve(&repository, &reference.target, &context);
            links.push(Link {
                file: id,
                element: None,
                slot,
                target,
                resolved,
            });
        }
    }

    for element in all_elements(set) {
        let (Some(file), Some(descriptor)) = (set.file(element.file), set.element(&element)) else {
            continue;
        };
        let context = ResolutionContext::for_element(file, element.kind, &element.fqsen);
        let mut references = structural_references(set, &element);
        references.extend(tag_references(descriptor.tags()));
        for (slot, reference) in references {
            if is_url(&reference.target) {
                continue;
            }
            let (target, resolved) = resolve(&repository, &reference.target, &context);
            links.push(Link {
                file: element.file,
                element: Some(element.clone()),
                slot,
                target,
                resolved,
            });
        }
    }
    links
}

fn slot_mut<'a>(set: &'a mut ApiSetDescriptor, link: &Link) -> Option<&'a mut Reference> {
    if let Slot::Tag(name, index) = &link.slot {
        let tags = match &link.element {
            Some(element) => set.element_mut(element)?.tags_mut(),
            None => &mut set.file_mut(link.file)?.tags,
        };
        return tags.get_mut(name)?.get_mut(*index)?.as_reference_mut();
    }
    let element = link.element.as_ref()?;
    let file = set.file_mut(element.file)?;
    match (element.kind, &link.slot) {
        (ElementKind::Class, Slot::Parent) => file.classes.get_mut(&element.fqsen)?.parent.as_mut(),
        (ElementKind::Class, Slot::Interface(i)) => {
            file.classes.get_mut(&element.fqsen)?.interfaces.get_mut(*i)
        }
        (ElementKind::Class, Slot::UsedTrait(i)) => {
            file.classes.get_mut(&element.fqsen)?.used_traits.get_mut(*i)
        }
        (ElementKind::Interface, Slot::Interface(i)) => {
            file.interfaces.get_mut(&element.fqsen)?.parents.get_mut(*i)
        }
        (ElementKind::Trait, Slot::UsedTrait(i)) => {
            file.traits.get_mut(&element.fqsen)?.used_traits.get_mut(*i)
        }
        _ => None,
    }
}

fn apply_links(set: &mut ApiSetDescriptor, links: Vec<Link>) {
    for link in links {
        if let Some(reference) = slot_mut(set, &link) {
            reference.target = link.target;
            reference.resolved = link.resolved;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::ElementsIndexBuilder;
    use crate::descriptor::{
        ClassDescriptor, DocumentationSet, FileDescriptor, InterfaceDescriptor, MethodDescriptor,
        TagDescriptor, VersionDescriptor,
    };
    use crate::example::NoExamples;
    use crate::hash::ContentHash;
    use crate::observer::CollectingObserver;
    use crate::router::StandardRouter;
    use crate::settings::Settings;
    use std::sync::Arc;

    fn compile(files: Vec<FileDescriptor>) -> Project {
        let mut set = ApiSetDescriptor::new("api");
        for file in files {
            set.add_file(Arc::new(file));
        }
        let mut project = Project::new("Acme", Settings::default());
        project
            .add_version(VersionDescriptor::new("1.0").with_set(DocumentationSet::Api(set)))
            .unwrap();
        let router = StandardRouter::new();
        let observer = CollectingObserver::new();
        let context = PassContext {
            router: &router,
            examples: &NoExamples,
            observer: &observer,
        };
        ElementsIndexBuilder.execute(&mut project, &context).unwrap();
        Linker.execute(&mut project, &context).unwrap();
        project
    }

    fn set(project: &Project) -> &ApiSetDescriptor {
        project.api_sets().next().unwrap()
    }

    #[test]
    fn links_parent_and_interfaces() {
        let mut file = FileDescriptor::new("a.php", ContentHash::compute(b"a"));
        file.add_interface(InterfaceDescriptor::new(Fqsen::new("\\NS\\Contract"), 1));
        file.add_class(ClassDescriptor::new(Fqsen::new("\\NS\\Base"), 2));
        file.add_class(
            ClassDescriptor::new(Fqsen::new("\\NS\\Child"), 3)
                .with_parent("\\NS\\Base")
                .with_interface("\\NS\\Contract")
                .with_interface("\\Vendor\\Missing"),
        );
        let project = compile(vec![file]);
        let set = set(&project);
        let (_, child) = set.files().next().unwrap();
        let child = &child.classes[&Fqsen::new("\\NS\\Child")];

        assert_eq!(
            child.parent.as_ref().and_then(|p| p.resolved.clone()),
            set.lookup("\\NS\\Base").cloned()
        );
        assert!(child.interfaces[0].is_resolved());
        assert!(!child.interfaces[1].is_resolved());
        assert_eq!(child.interfaces[1].target, "\\Vendor\\Missing");
    }

    #[test]
    fn resolves_relative_see_and_uses_tags() {
        let owner = Fqsen::new("\\NS\\Foo");
        let mut method = MethodDescriptor::new(&owner, "run", 4);
        method.info.tags.push(TagDescriptor::reference("uses", Reference::new("Bar::go()"), ""));
        method.info.tags.push(TagDescriptor::reference("see", Reference::new("self::stop()"), ""));
        method.info.tags.push(TagDescriptor::reference(
            "see",
            Reference::new("https://example.com"),
            "docs",
        ));

        let bar = Fqsen::new("\\NS\\Bar");
        let mut file = FileDescriptor::new("a.php", ContentHash::compute(b"a"));
        file.add_class(
            ClassDescriptor::new(owner.clone(), 1)
                .with_method(method)
                .with_method(MethodDescriptor::new(&owner, "stop", 9)),
        );
        file.add_class(
            ClassDescriptor::new(bar.clone(), 20).with_method(MethodDescriptor::new(&bar, "go", 21)),
        );

        let project = compile(vec![file]);
        let set = set(&project);
        let method_ref = set.lookup("\\NS\\Foo::run()").and_then(|r| r.as_element()).unwrap();
        let tags = set.element(method_ref).unwrap().tags();

        let uses = tags.get("uses")[0].as_reference().unwrap();
        assert_eq!(uses.target, "\\NS\\Bar::go()");
        assert!(uses.is_resolved());

        let see = tags.get("see");
        assert_eq!(see[0].as_reference().unwrap().target, "\\NS\\Foo::stop()");
        assert!(see[0].as_reference().unwrap().is_resolved());
        assert_eq!(see[1].as_reference().unwrap().target, "https://example.com");
        assert!(!see[1].as_reference().unwrap().is_resolved());
    }

    #[test]
    fn is_url_detects_schemes() {
        assert!(is_url("http://x.org"));
        assert!(is_url("ftp://x"));
        assert!(!is_url("\\Foo::bar()"));
        assert!(!is_url("://x"));
    }
}
