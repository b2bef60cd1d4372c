//! Inlines the files referenced by `{@example}` tags.

use std::collections::BTreeMap;

use super::{rewrite_texts, CompilerPass, PassContext};
use crate::descriptor::Project;
use crate::error::DocbloxResult;
use crate::example::{ExampleFinder, ExampleRequest};
use crate::inline;
use crate::observer::BuildObserver;

/// Replaces `{@example path [start [length]] [description]}` with the
/// example's content as inline code, prefixed by the description in italics.
///
/// Each distinct tag is looked up once. A file that cannot be found is
/// reported as a warning and replaced by `** File not found : path **`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExampleTagsEnricher;

impl CompilerPass for ExampleTagsEnricher {
    fn description(&self) -> &'static str {
        "Enriches inline example tags with their sources"
    }

    fn priority(&self) -> i32 {
        8700
    }

    fn execute(&self, project: &mut Project, context: &PassContext<'_>) -> DocbloxResult<()> {
        let mut cache: BTreeMap<String, String> = BTreeMap::new();
        for set in project.api_sets_mut() {
            rewrite_texts(set, |_, text, _, _| {
                replace_examples(text, context.examples, context.observer, &mut cache)
            });
        }
        Ok(())
    }
}

/// Rewrite the example tags of one text; `None` when it has none.
fn replace_examples(
    text: &str,
    finder: &dyn ExampleFinder,
    observer: &dyn BuildObserver,
    cache: &mut BTreeMap<String, String>,
) -> Option<String> {
    if !text.contains("{@example") {
        return None;
    }
    let mut changed = false;
    let rewritten = inline::rewrite(text, |tag| {
        if tag.name != "example" {
            return None;
        }
        let raw = &text[tag.span.clone()];
        if let Some(done) = cache.get(raw) {
            changed = true;
            return Some(done.clone());
        }
        let request = ExampleRequest::parse(tag.argument)?;
        let replacement = render_example(&request, finder, observer);
        cache.insert(raw.to_string(), replacement.clone());
        changed = true;
        Some(replacement)
    });
    changed.then_some(rewritten)
}

fn render_example(
    request: &ExampleRequest,
    finder: &dyn ExampleFinder,
    observer: &dyn BuildObserver,
) -> String {
    match finder.find(request) {
        Ok(content) => {
            let prefix = if request.description.is_empty() {
                String::new()
            } else {
                format!("*{}*", request.description)
            };
            format!("{}`{}`", prefix, content)
        }
        Err(e) => {
            observer.warning(&format!("unable to include example {}: {}", request.path, e));
            format!("** File not found : {} **", request.path)
        }
    }
}
