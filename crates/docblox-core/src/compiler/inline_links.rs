//! Resolves inline `{@see}` and `{@link}` tags.

use super::linker::is_url;
use super::{rewrite_texts, CompilerPass, PassContext};
use crate::descriptor::{ApiSetDescriptor, DescriptorView, ElementRef, FileId, Project};
use crate::error::DocbloxResult;
use crate::fqsen::Fqsen;
use crate::inline::{self, InlineTag};
use crate::linker::{DescriptorRepository, Resolution, ResolutionContext};
use crate::router::Router;

/// Rewrites `{@see target [description]}` and `{@link target [description]}`
/// into Markdown links.
///
/// - A URL target becomes `[description](url)`, or `[url](url)` without a
///   description.
/// - A name that resolves and routes becomes `[description](url)`, or
///   `[\Fully\Qualified](url)` without a description.
/// - A name that does not resolve or has no route becomes its fully qualified
///   form, unlinked.
///
/// Other inline tags are left untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveInlineLinkAndSeeTags;

impl CompilerPass for ResolveInlineLinkAndSeeTags {
    fn description(&self) -> &'static str {
        "Resolve @link and @see tags in descriptions"
    }

    fn priority(&self) -> i32 {
        8600
    }

    fn execute(&self, project: &mut Project, context: &PassContext<'_>) -> DocbloxResult<()> {
        for set in project.api_sets_mut() {
            rewrite_texts(set, |set, text, file, element| {
                resolve_links(set, text, file, element, context.router)
            });
        }
        Ok(())
    }
}

const LINK_TAGS: &[&str] = &["see", "link"];

fn resolution_context<'a>(
    set: &'a ApiSetDescriptor,
    file: FileId,
    element: Option<&ElementRef>,
) -> Option<ResolutionContext<'a>> {
    let descriptor = set.file(file)?;
    Some(match element {
        Some(element) => ResolutionContext::for_element(descriptor, element.kind, &element.fqsen),
        None => ResolutionContext {
            namespace: Fqsen::root(),
            aliases: Some(&descriptor.namespace_aliases),
            container: None,
        },
    })
}

/// Rewrite the link tags of one text; `None` when it has none.
fn resolve_links(
    set: &ApiSetDescriptor,
    text: &str,
    file: FileId,
    element: Option<&ElementRef>,
    router: &dyn Router,
) -> Option<String> {
    if !text.contains("{@see") && !text.contains("{@link") {
        return None;
    }
    let context = resolution_context(set, file, element)?;
    let repository = DescriptorRepository::new(set);
    let mut changed = false;
    let rewritten = inline::rewrite(text, |tag| {
        let replacement = render_link(tag, set, &repository, &context, router)?;
        changed = true;
        Some(replacement)
    });
    changed.then_some(rewritten)
}

fn render_link(
    tag: &InlineTag<'_>,
    set: &ApiSetDescriptor,
    repository: &DescriptorRepository<'_>,
    context: &ResolutionContext<'_>,
    router: &dyn Router,
) -> Option<String> {
    if !LINK_TAGS.contains(&tag.name) {
        return None;
    }
    let (target, description) = tag.split_argument();
    if target.is_empty() {
        return None;
    }
    let label = |fallback: &str| {
        if description.is_empty() {
            fallback.to_string()
        } else {
            description.to_string()
        }
    };

    if is_url(target) {
        let url = router
            .generate(&DescriptorView::Url(target))
            .unwrap_or_else(|_| target.to_string());
        return Some(format!("[{}]({})", label(target), url));
    }

    let resolution = repository.find_alias(target, context);
    let fqsen = resolution.fqsen_text().to_string();
    let url = match &resolution {
        Resolution::Resolved { reference, .. } => set
            .view(reference)
            .and_then(|view| router.generate(&view).ok()),
        Resolution::Unresolved(_) => None,
    };
    Some(match url {
        Some(url) => format!("[{}]({})", label(&fqsen), url),
        None => fqsen,
    })
}
