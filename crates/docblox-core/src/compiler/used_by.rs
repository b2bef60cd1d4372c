//! Inverts `@uses` into `@used-by`.

use super::{CompilerPass, PassContext};
use crate::descriptor::{
    ApiSetDescriptor, DescriptorRef, ElementRef, Project, Reference, TagDescriptor,
    INDEX_ELEMENTS,
};
use crate::error::DocbloxResult;

const USES: &str = "uses";
const USED_BY: &str = "used-by";

/// For every resolved `@uses` edge A → B, adds one `@used-by` tag to B that
/// points back at A. The `@uses` side is left as is.
#[derive(Debug, Clone, Copy, Default)]
pub struct UsedByBuilder;

impl CompilerPass for UsedByBuilder {
    fn description(&self) -> &'static str {
        "Adds used-by tags to elements referenced by uses tags"
    }

    fn priority(&self) -> i32 {
        8000
    }

    fn execute(&self, project: &mut Project, context: &PassContext<'_>) -> DocbloxResult<()> {
        for set in project.api_sets_mut() {
            let added = invert_uses(set);
            if added > 0 {
                context
                    .observer
                    .debug(&format!("added {} used-by tags to {}", added, set.name));
            }
        }
        Ok(())
    }
}

/// Returns the number of tags added.
fn invert_uses(set: &mut ApiSetDescriptor) -> usize {
    let Some(elements) = set.indexes.get(INDEX_ELEMENTS) else {
        return 0;
    };

    let mut edges: Vec<(ElementRef, ElementRef, String)> = Vec::new();
    for source in elements.values().filter_map(DescriptorRef::as_element) {
        let Some(descriptor) = set.element(source) else {
            continue;
        };
        for tag in descriptor.tags().get(USES) {
            let Some(DescriptorRef::Element(target)) =
                tag.as_reference().and_then(|r| r.resolved.as_ref())
            else {
                continue;
            };
            edges.push((source.clone(), target.clone(), tag.description.clone()));
        }
    }

    let mut added = 0;
    for (source, target, description) in edges {
        let back = DescriptorRef::Element(source.clone());
        let present = set.element(&target).is_some_and(|descriptor| {
            descriptor
                .tags()
                .get(USED_BY)
                .iter()
                .any(|tag| tag.as_reference().and_then(|r| r.resolved.as_ref()) == Some(&back))
        });
        if present {
            continue;
        }
        if let Some(descriptor) = set.element_mut(&target) {
            descriptor.tags_mut().push(TagDescriptor::reference(
                USED_BY,
                Reference::resolved(source.fqsen.to_string(), back),
                description,
            ));
            added += 1;
        }
    }
    added
}
