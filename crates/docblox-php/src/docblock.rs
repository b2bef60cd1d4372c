//! Doc-block parsing.
//!
//! A doc-block is split into a summary, a long description and tags. The
//! summary ends at the first blank line or at the first line ending in a
//! period. Tags start at the first line beginning with `@`; each tag runs
//! until the next one.

use std::sync::LazyLock;

use docblox_core::descriptor::{Reference, TagBody, TagDescriptor, Tags, REFERENCE_TAGS};
use regex::Regex;

/// Tags carrying a type list and a variable name.
const VARIABLE_TAGS: &[&str] = &["param", "var", "property", "property-read", "property-write"];

/// Tags carrying a type list only.
const TYPED_TAGS: &[&str] = &["return", "throws"];

/// `@method [static] [ReturnType] name(args) description`
static METHOD_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^(?:(static)\s+)?(?:(\S+)\s+)?([A-Za-z_][A-Za-z0-9_]*)\s*\(([^)]*)\)\s*(.*)$")
        .expect("valid method tag pattern")
});

/// A parsed doc-block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocBlock {
    pub summary: String,
    pub description: String,
    pub tags: Tags,
    /// Line of the opening `/**`.
    pub line: u32,
}

impl DocBlock {
    /// The first `@package` value, if any.
    pub fn package(&self) -> Option<&str> {
        self.tags
            .get("package")
            .first()
            .map(|tag| tag.description.trim())
            .filter(|name| !name.is_empty())
    }
}

/// Parse the raw text of a `/** ... */` comment.
pub fn parse(raw: &str, line: u32) -> DocBlock {
    let mut text: Vec<&str> = Vec::new();
    let mut tag_texts: Vec<String> = Vec::new();
    for content in comment_lines(raw) {
        if content.starts_with('@') {
            tag_texts.push(content.to_string());
        } else if let Some(current) = tag_texts.last_mut() {
            current.push('\n');
            current.push_str(content.trim_start());
        } else {
            text.push(content);
        }
    }

    let (summary, description) = split_summary(&text);
    let mut tags = Tags::new();
    for tag_text in &tag_texts {
        if let Some(tag) = parse_tag(tag_text.trim_end()) {
            tags.push(tag);
        }
    }
    DocBlock {
        summary,
        description,
        tags,
        line,
    }
}

/// Comment lines with the delimiters and leading `*` removed.
fn comment_lines(raw: &str) -> impl Iterator<Item = &str> {
    let inner = raw
        .trim()
        .trim_start_matches("/**")
        .trim_end_matches("*/");
    inner.lines().map(|line| {
        let line = line.trim_start();
        let line = line.strip_prefix('*').unwrap_or(line);
        line.strip_prefix(' ').unwrap_or(line).trim_end()
    })
}

fn split_summary(lines: &[&str]) -> (String, String) {
    let lines: Vec<&str> = lines
        .iter()
        .copied()
        .skip_while(|line| line.is_empty())
        .collect();
    let mut summary_end = lines.len();
    for (i, line) in lines.iter().enumerate() {
        if line.is_empty() {
            summary_end = i;
            break;
        }
        if line.ends_with('.') {
            summary_end = i + 1;
            break;
        }
    }
    let summary = lines[..summary_end].join("\n");
    let description = lines[summary_end..].join("\n").trim().to_string();
    (summary.trim().to_string(), description)
}

/// Split `@name rest` and build the matching tag shape.
pub fn parse_tag(text: &str) -> Option<TagDescriptor> {
    let text = text.strip_prefix('@')?;
    let (name, rest) = split_word(text);
    if name.is_empty() {
        return None;
    }
    let rest = rest.trim();

    if VARIABLE_TAGS.contains(&name) {
        return Some(variable_tag(name, rest));
    }
    if TYPED_TAGS.contains(&name) {
        let (types, description) = split_word(rest);
        return Some(TagDescriptor::typed(name, split_types(types), description));
    }
    if REFERENCE_TAGS.contains(&name) {
        let (target, description) = split_word(rest);
        return Some(TagDescriptor::reference(
            name,
            Reference::new(target),
            description,
        ));
    }
    if name == "method" {
        if let Some(tag) = method_tag(rest) {
            return Some(tag);
        }
    }
    Some(TagDescriptor::generic(name, rest))
}

/// `@param Type $name text`, `@param $name text` or `@var Type text`.
fn variable_tag(name: &str, rest: &str) -> TagDescriptor {
    let (first, after_first) = split_word(rest);
    if is_variable(first) {
        return TagDescriptor::variable(name, Vec::new(), first, after_first);
    }
    let (second, after_second) = split_word(after_first);
    if is_variable(second) {
        TagDescriptor::variable(name, split_types(first), second, after_second)
    } else {
        TagDescriptor::variable(name, split_types(first), "", after_first)
    }
}

fn method_tag(rest: &str) -> Option<TagDescriptor> {
    let caps = METHOD_TAG.captures(rest)?;
    let arguments = caps
        .get(4)
        .map(|m| m.as_str())
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|arg| !arg.is_empty())
        .map(str::to_string)
        .collect();
    Some(TagDescriptor {
        name: "method".to_string(),
        description: caps.get(5).map_or("", |m| m.as_str().trim()).to_string(),
        body: TagBody::MethodNamed {
            method_name: caps[3].to_string(),
            return_types: caps.get(2).map(|m| split_types(m.as_str())).unwrap_or_default(),
            arguments,
            is_static: caps.get(1).is_some(),
        },
    })
}

fn is_variable(word: &str) -> bool {
    word.trim_start_matches('&').trim_start_matches("...").starts_with('$')
}

fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.find(char::is_whitespace) {
        Some(idx) => (&text[..idx], text[idx..].trim()),
        None => (text, ""),
    }
}

/// `int|string[]|null` → `["int", "string[]", "null"]`
pub fn split_types(types: &str) -> Vec<String> {
    types
        .split('|')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    mod text_tests {
        use super::*;

        #[test]
        fn summary_ends_at_period() {
            let doc = parse(
                "/**\n * Sends the invoice.\n * Uses the configured\n * transport.\n */",
                1,
            );
            assert_eq!(doc.summary, "Sends the invoice.");
            assert_eq!(doc.description, "Uses the configured\ntransport.");
        }

        #[test]
        fn summary_ends_at_blank_line() {
            let doc = parse(
                "/**\n * Sends the invoice\n * by mail\n *\n * Long text.\n */",
                1,
            );
            assert_eq!(doc.summary, "Sends the invoice\nby mail");
            assert_eq!(doc.description, "Long text.");
        }

        #[test]
        fn single_line_block() {
            let doc = parse("/** @var int */", 4);
            assert_eq!(doc.summary, "");
            assert_eq!(doc.line, 4);
            assert_eq!(doc.tags.get("var")[0].types(), ["int".to_string()]);
        }

        #[test]
        fn inline_tags_stay_in_text() {
            let doc = parse("/**\n * See {@see Mailer} for details.\n */", 1);
            assert_eq!(doc.summary, "See {@see Mailer} for details.");
        }
    }

    mod tag_tests {
        use super::*;

        #[test]
        fn param_with_type_and_variable() {
            let tag = parse_tag("@param int|null $amount The amount").unwrap();
            assert_eq!(
                tag.body,
                TagBody::Variable {
                    types: vec!["int".to_string(), "null".to_string()],
                    variable: "$amount".to_string(),
                }
            );
            assert_eq!(tag.description, "The amount");
        }

        #[test]
        fn param_without_type() {
            let tag = parse_tag("@param $amount").unwrap();
            assert_eq!(
                tag.body,
                TagBody::Variable {
                    types: Vec::new(),
                    variable: "$amount".to_string(),
                }
            );
        }

        #[test]
        fn var_without_variable() {
            let tag = parse_tag("@var string[] Names").unwrap();
            assert_eq!(tag.types(), ["string[]".to_string()]);
            assert_eq!(tag.description, "Names");
        }

        #[test]
        fn return_and_throws_are_typed() {
            let tag = parse_tag("@return Invoice|false").unwrap();
            assert_eq!(tag.types().len(), 2);
            let tag = parse_tag("@throws \\RuntimeException when offline").unwrap();
            assert_eq!(tag.types(), ["\\RuntimeException".to_string()]);
            assert_eq!(tag.description, "when offline");
        }

        #[test]
        fn reference_tags_keep_target_as_written() {
            let tag = parse_tag("@uses Mailer::send() to deliver").unwrap();
            let reference = tag.as_reference().unwrap();
            assert_eq!(reference.target, "Mailer::send()");
            assert!(!reference.is_resolved());
            assert_eq!(tag.description, "to deliver");
        }

        #[test]
        fn method_tag() {
            let tag = parse_tag("@method static Invoice create(int $id, $name) Factory").unwrap();
            assert_eq!(
                tag.body,
                TagBody::MethodNamed {
                    method_name: "create".to_string(),
                    return_types: vec!["Invoice".to_string()],
                    arguments: vec!["int $id".to_string(), "$name".to_string()],
                    is_static: true,
                }
            );
            assert_eq!(tag.description, "Factory");
        }

        #[test]
        fn malformed_method_tag_falls_back_to_generic() {
            let tag = parse_tag("@method nonsense").unwrap();
            assert_eq!(tag.body, TagBody::Generic);
            assert_eq!(tag.description, "nonsense");
        }

        #[test]
        fn multi_line_tag_description() {
            let doc = parse("/**\n * @todo first\n *       second\n * @author Jane\n */", 1);
            assert_eq!(doc.tags.get("todo")[0].description, "first\nsecond");
            assert_eq!(doc.tags.get("author")[0].description, "Jane");
        }

        #[test]
        fn package_value() {
            let doc = parse("/**\n * @package Billing\n */", 1);
            assert_eq!(doc.package(), Some("Billing"));
            assert_eq!(parse("/** x */", 1).package(), None);
        }
    }
}
