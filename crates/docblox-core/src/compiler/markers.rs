//! Collects `@todo`/`@fixme` style markers into their files.

use regex::Regex;

use super::{CompilerPass, PassContext};
use crate::descriptor::{ApiSetDescriptor, DescriptorRef, Marker, Project, INDEX_ELEMENTS};
use crate::error::{DocbloxError, DocbloxResult};

/// Turns marker tags and marker keywords into file markers.
///
/// For every configured marker (`TODO`, `FIXME` by default) an element
/// contributes one marker per tag of that name in lowercase (`@todo`) and one
/// per line of its summary or description mentioning the keyword. Markers
/// carry the element's line.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkerFromTagsExtractor;

impl CompilerPass for MarkerFromTagsExtractor {
    fn description(&self) -> &'static str {
        "Add markers from tags and descriptions to files"
    }

    fn priority(&self) -> i32 {
        8800
    }

    fn execute(&self, project: &mut Project, _context: &PassContext<'_>) -> DocbloxResult<()> {
        let (settings, versions) = project.parts_mut();
        let Some(keywords) = keyword_pattern(&settings.markers) else {
            return Ok(());
        };
        for version in versions {
            for set in version.api_sets_mut() {
                extract_markers(set, &settings.markers, &keywords)?;
            }
        }
        Ok(())
    }
}

/// `\b(TODO|FIXME)\b:?\s*(.*)` over the configured markers.
fn keyword_pattern(markers: &[String]) -> Option<Regex> {
    if markers.is_empty() {
        return None;
    }
    let alternatives: Vec<String> = markers.iter().map(|m| regex::escape(m)).collect();
    Regex::new(&format!(r"\b({})\b:?\s*(.*)", alternatives.join("|"))).ok()
}

fn extract_markers(
    set: &mut ApiSetDescriptor,
    markers: &[String],
    keywords: &Regex,
) -> DocbloxResult<()> {
    let Some(elements) = set.indexes.get(INDEX_ELEMENTS) else {
        return Ok(());
    };

    let mut found = Vec::new();
    for reference in elements.values() {
        let DescriptorRef::Element(element) = reference else {
            continue;
        };
        if set.file(element.file).is_none() {
            return Err(DocbloxError::OrphanedElement {
                fqsen: element.fqsen.to_string(),
            });
        }
        let Some(descriptor) = set.element(element) else {
            continue;
        };
        let line = descriptor.line();

        for marker in markers {
            for tag in descriptor.tags().get(&marker.to_lowercase()) {
                found.push((element.file, marker_at(marker, &tag.description, line)));
            }
        }
        let info = descriptor.info();
        for text in [&info.summary, &info.description] {
            for text_line in text.lines() {
                if let Some(captures) = keywords.captures(text_line) {
                    found.push((
                        element.file,
                        marker_at(&captures[1], captures[2].trim(), line),
                    ));
                }
            }
        }
    }

    for (file, marker) in found {
        if let Some(file) = set.file(file) {
            if file.markers.contains(&marker) {
                continue;
            }
        }
        if let Some(file) = set.file_mut(file) {
            file.markers.push(marker);
        }
    }
    Ok(())
}

fn marker_at(kind: &str, message: &str, line: u32) -> Marker {
    Marker {
        kind: kind.to_string(),
        message: message.to_string(),
        line,
    }
}
