//! Final filtering: source code, visibility and internal documentation.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use super::{all_elements, rewrite_texts, CompilerPass, PassContext};
use crate::descriptor::{
    ApiSetDescriptor, DescriptorRef, Element, ElementKind, ElementRef, FileDescriptor, FileId,
    Project, Reference, Tags,
};
use crate::error::DocbloxResult;
use crate::settings::VisibilityFilter;

/// `{@internal text}}`, closed by a double brace.
static INTERNAL_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\{@internal\s(.+?)\}\}").expect("internal text pattern is valid")
});

const TAG_INTERNAL: &str = "internal";
const TAG_API: &str = "api";
const TAG_USED_BY: &str = "used-by";

/// Removes what the project settings exclude from the output.
///
/// - Raw file source is dropped unless `include_source` is set.
/// - Elements whose visibility is not allowed are removed.
/// - `@internal` elements are removed and `{@internal ...}}` text is stripped,
///   unless `internal` is allowed, in which case the text is unwrapped.
/// - With `api`, only elements tagged `@api` (and containers of such
///   members) are kept.
///
/// Index entries and taxonomy attachments that no longer resolve are pruned.
/// References to removed elements are unlinked, and `@used-by` tags pointing
/// at them are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct VisibilityFilterPass;

impl CompilerPass for VisibilityFilterPass {
    fn description(&self) -> &'static str {
        "Filter elements by visibility and remove source code"
    }

    fn priority(&self) -> i32 {
        1000
    }

    fn execute(&self, project: &mut Project, context: &PassContext<'_>) -> DocbloxResult<()> {
        let (settings, versions) = project.parts_mut();
        for version in versions {
            for set in version.api_sets_mut() {
                if !settings.include_source {
                    drop_source(set);
                }
                let removed = remove_filtered(set, settings.visibility);
                rewrite_texts(set, |_, text, _, _| {
                    rewrite_internal(text, settings.visibility.allows_internal())
                });
                let pruned = prune_dangling(set) + unlink_removed(set);
                if removed + pruned > 0 {
                    context.observer.debug(&format!(
                        "removed {} elements and {} stale references from {}",
                        removed, pruned, set.name
                    ));
                }
            }
        }
        Ok(())
    }
}

fn drop_source(set: &mut ApiSetDescriptor) {
    let with_source: Vec<_> = set
        .files()
        .filter(|(_, file)| file.source.is_some())
        .map(|(id, _)| id)
        .collect();
    for id in with_source {
        if let Some(file) = set.file_mut(id) {
            file.source = None;
        }
    }
}

/// Whether an element survives the filter, ignoring the `api` restriction.
fn is_visible(element: &dyn Element, filter: VisibilityFilter) -> bool {
    if element.visibility().is_some_and(|v| !filter.allows(v)) {
        return false;
    }
    filter.allows_internal() || !element.tags().contains(TAG_INTERNAL)
}

/// Remove filtered elements; returns how many were removed.
fn remove_filtered(set: &mut ApiSetDescriptor, filter: VisibilityFilter) -> usize {
    let elements = all_elements(set);

    // Containers with an `@api` member stay in api-only mode.
    let mut api_containers = BTreeSet::new();
    if filter.is_api_only() {
        for element in &elements {
            let tagged = set
                .element(element)
                .is_some_and(|e| e.tags().contains(TAG_API));
            if let (true, Some(owner)) = (tagged, element.fqsen.owner()) {
                api_containers.insert(owner);
            }
        }
    }

    let mut doomed: Vec<ElementRef> = Vec::new();
    for element in elements {
        let Some(descriptor) = set.element(&element) else {
            continue;
        };
        let mut keep = is_visible(descriptor, filter);
        if keep && filter.is_api_only() && !descriptor.tags().contains(TAG_API) {
            keep = element.kind.is_container() && api_containers.contains(&element.fqsen);
        }
        if keep {
            continue;
        }
        // Members go with their container.
        let owner_doomed = element
            .fqsen
            .owner()
            .is_some_and(|owner| doomed.iter().any(|d| d.fqsen == owner));
        if !owner_doomed {
            doomed.push(element);
        }
    }

    let mut removed = 0;
    for element in doomed {
        if let Some(file) = set.file_mut(element.file) {
            if file.remove_element(element.kind, &element.fqsen) {
                removed += 1;
            }
        }
    }
    removed
}

/// Strip `{@internal ...}}` text, or unwrap it when internal text is allowed.
fn rewrite_internal(text: &str, allow_internal: bool) -> Option<String> {
    if !INTERNAL_TEXT.is_match(text) {
        return None;
    }
    let replacement = if allow_internal { "$1" } else { "" };
    Some(INTERNAL_TEXT.replace_all(text, replacement).into_owned())
}

/// Drop index entries and taxonomy attachments that no longer resolve;
/// returns how many were dropped.
fn prune_dangling(set: &mut ApiSetDescriptor) -> usize {
    let mut stale_keys: Vec<(String, String)> = Vec::new();
    for (name, index) in set.indexes.iter() {
        for (key, reference) in index {
            if !set.resolves(reference) {
                stale_keys.push((name.to_string(), key.clone()));
            }
        }
    }
    let mut pruned = stale_keys.len();
    for (name, key) in stale_keys {
        set.indexes.fetch(&name).remove(&key);
    }

    let mut stale_refs: BTreeSet<ElementRef> = BTreeSet::new();
    for taxonomy in [&set.namespaces, &set.packages] {
        for node in taxonomy.nodes() {
            for element in node.elements() {
                if !set.resolves(&DescriptorRef::Element(element.clone())) {
                    stale_refs.insert(element.clone());
                }
            }
        }
    }
    if !stale_refs.is_empty() {
        for taxonomy in [&mut set.namespaces, &mut set.packages] {
            for node in taxonomy.nodes_mut() {
                node.retain_elements(|element| !stale_refs.contains(element));
            }
        }
        pruned += stale_refs.len();
    }
    pruned
}

/// Unlink references whose target was removed and drop `@used-by` tags
/// pointing at removed elements; returns how many references changed.
fn unlink_removed(set: &mut ApiSetDescriptor) -> usize {
    let mut owners: Vec<(FileId, Option<ElementRef>)> =
        set.files().map(|(id, _)| (id, None)).collect();
    owners.extend(all_elements(set).into_iter().map(|e| (e.file, Some(e))));

    let mut changed = 0;
    for (file, element) in owners {
        let stale: BTreeSet<DescriptorRef> = {
            let Some(descriptor) = set.file(file) else {
                continue;
            };
            let (tags, bases) = match &element {
                Some(element) => match set.element(element) {
                    Some(current) => (current.tags(), structural(descriptor, element)),
                    None => continue,
                },
                None => (&descriptor.tags, Vec::new()),
            };
            tags.iter()
                .filter_map(|tag| tag.as_reference())
                .chain(bases)
                .filter_map(|reference| reference.resolved.clone())
                .filter(|resolved| !set.resolves(resolved))
                .collect()
        };
        if stale.is_empty() {
            continue;
        }

        let Some(descriptor) = set.file_mut(file) else {
            continue;
        };
        let is_stale =
            |reference: &Reference| reference.resolved.as_ref().is_some_and(|r| stale.contains(r));
        if let Some(element) = &element {
            for reference in structural_mut(descriptor, element) {
                if is_stale(&*reference) {
                    reference.resolved = None;
                    changed += 1;
                }
            }
        }
        let tags = match &element {
            Some(element) => match descriptor.element_mut(element.kind, &element.fqsen) {
                Some(current) => current.tags_mut(),
                None => continue,
            },
            None => &mut descriptor.tags,
        };
        changed += unlink_tags(tags, &is_stale);
    }
    changed
}

fn unlink_tags(tags: &mut Tags, is_stale: &dyn Fn(&Reference) -> bool) -> usize {
    let mut changed = 0;
    if let Some(used_by) = tags.get_mut(TAG_USED_BY) {
        let before = used_by.len();
        used_by.retain(|tag| !tag.as_reference().is_some_and(is_stale));
        changed += before - used_by.len();
        if used_by.is_empty() {
            tags.remove(TAG_USED_BY);
        }
    }
    for reference in tags.iter_mut().filter_map(|tag| tag.as_reference_mut()) {
        if is_stale(&*reference) {
            reference.resolved = None;
            changed += 1;
        }
    }
    changed
}

/// Parent, interface and trait references of a class-like element.
fn structural<'a>(file: &'a FileDescriptor, element: &ElementRef) -> Vec<&'a Reference> {
    match element.kind {
        ElementKind::Class => file.classes.get(&element.fqsen).map_or_else(Vec::new, |class| {
            class
                .parent
                .iter()
                .chain(&class.interfaces)
                .chain(&class.used_traits)
                .collect()
        }),
        ElementKind::Interface => file
            .interfaces
            .get(&element.fqsen)
            .map_or_else(Vec::new, |interface| interface.parents.iter().collect()),
        ElementKind::Trait => file
            .traits
            .get(&element.fqsen)
            .map_or_else(Vec::new, |descriptor| descriptor.used_traits.iter().collect()),
        _ => Vec::new(),
    }
}

fn structural_mut<'a>(
    file: &'a mut FileDescriptor,
    element: &ElementRef,
) -> Vec<&'a mut Reference> {
    match element.kind {
        ElementKind::Class => file
            .classes
            .get_mut(&element.fqsen)
            .map_or_else(Vec::new, |class| {
                class
                    .parent
                    .iter_mut()
                    .chain(&mut class.interfaces)
                    .chain(&mut class.used_traits)
                    .collect()
            }),
        ElementKind::Interface => file
            .interfaces
            .get_mut(&element.fqsen)
            .map_or_else(Vec::new, |interface| interface.parents.iter_mut().collect()),
        ElementKind::Trait => file
            .traits
            .get_mut(&element.fqsen)
            .map_or_else(Vec::new, |descriptor| descriptor.used_traits.iter_mut().collect()),
        _ => Vec::new(),
    }
}
