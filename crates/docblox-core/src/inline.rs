//! Inline tag scanner.
//!
//! Recognizes inline doc-block tags inside free text:
//!
//! ```text
//! <inline-tag> := "{@" <name> (<ws> <argument>)? "}"
//! <name>       := [A-Za-z0-9_-]+
//! <argument>   := text with balanced braces
//! ```
//!
//! The scanner only locates tags. Callers decide per tag whether to replace
//! it; tags they do not handle are left byte-for-byte untouched.

use std::ops::Range;

use winnow::ascii::{multispace0, multispace1};
use winnow::combinator::{alt, peek, preceded};
use winnow::error::{ErrMode, ParserError};
use winnow::prelude::*;
use winnow::token::take_while;
use winnow::ModalResult;

/// One inline tag found in a text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineTag<'a> {
    pub name: &'a str,
    /// Argument text, trimmed.
    pub argument: &'a str,
    /// Byte range of the whole tag, braces included.
    pub span: Range<usize>,
}

impl<'a> InlineTag<'a> {
    /// Split the argument into its first word and the remaining text.
    pub fn split_argument(&self) -> (&'a str, &'a str) {
        split_first_word(self.argument)
    }
}

/// Split `text` at the first run of whitespace.
pub fn split_first_word(text: &str) -> (&str, &str) {
    let text = text.trim();
    match text.find(char::is_whitespace) {
        Some(idx) => (&text[..idx], text[idx..].trim()),
        None => (text, ""),
    }
}

/// Find every well-formed inline tag in `text`, outermost only.
pub fn scan(text: &str) -> Vec<InlineTag<'_>> {
    let mut tags = Vec::new();
    let mut offset = 0;
    while let Some(found) = text[offset..].find("{@") {
        let start = offset + found;
        let mut input = &text[start..];
        match parse_inline_tag(&mut input) {
            Ok((name, argument)) => {
                let end = text.len() - input.len();
                tags.push(InlineTag {
                    name,
                    argument,
                    span: start..end,
                });
                offset = end;
            }
            Err(_) => offset = start + 2,
        }
    }
    tags
}

/// Replace inline tags in `text`.
///
/// `replace` is called for every tag in order; returning `None` keeps the
/// original tag text.
pub fn rewrite(text: &str, mut replace: impl FnMut(&InlineTag<'_>) -> Option<String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for tag in scan(text) {
        if let Some(replacement) = replace(&tag) {
            out.push_str(&text[last..tag.span.start]);
            out.push_str(&replacement);
            last = tag.span.end;
        }
    }
    out.push_str(&text[last..]);
    out
}

// ============================================================================
// Parser implementation using winnow
// ============================================================================

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Parse `{@name argument}` and return `(name, argument)`.
fn parse_inline_tag<'a>(input: &mut &'a str) -> ModalResult<(&'a str, &'a str)> {
    let name = preceded("{@", take_while(1.., is_name_char)).parse_next(input)?;
    // The name ends at whitespace or at the closing brace.
    peek(alt((multispace1, "}"))).parse_next(input)?;
    let _ = multispace0.parse_next(input)?;
    let argument = parse_balanced(input)?;
    Ok((name, argument.trim()))
}

/// Consume text up to the unmatched closing brace, which is consumed too.
fn parse_balanced<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    let mut depth = 0usize;
    for (idx, c) in input.char_indices() {
        match c {
            '{' => depth += 1,
            '}' if depth == 0 => {
                let body = &input[..idx];
                *input = &input[idx + 1..];
                return Ok(body);
            }
            '}' => depth -= 1,
            _ => {}
        }
    }
    Err(ErrMode::from_input(input))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_simple_tags() {
        let tags = scan("See {@see Bar} and {@link http://x.org docs}.");
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].name, "see");
        assert_eq!(tags[0].argument, "Bar");
        assert_eq!(tags[1].name, "link");
        assert_eq!(tags[1].split_argument(), ("http://x.org", "docs"));
    }

    #[test]
    fn spans_cover_braces() {
        let text = "a {@see Bar} b";
        let tags = scan(text);
        assert_eq!(&text[tags[0].span.clone()], "{@see Bar}");
    }

    #[test]
    fn balanced_braces_in_argument() {
        let tags = scan("{@example a.php {with} braces} tail");
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].argument, "a.php {with} braces");
    }

    #[test]
    fn tag_without_argument() {
        let tags = scan("{@inheritdoc}");
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "inheritdoc");
        assert_eq!(tags[0].argument, "");
    }

    #[test]
    fn malformed_tags_are_ignored() {
        assert!(scan("{@see Bar").is_empty());
        assert!(scan("{@ see Bar}").is_empty());
        assert!(scan("{@see:Bar}").is_empty());
        assert!(scan("plain {braces}").is_empty());
    }

    #[test]
    fn rewrite_leaves_declined_tags_untouched() {
        let out = rewrite("{@author Jane} wrote {@see Bar}", |tag| {
            (tag.name == "see").then(|| format!("<{}>", tag.argument))
        });
        assert_eq!(out, "{@author Jane} wrote <Bar>");
    }

    #[test]
    fn split_first_word_trims() {
        assert_eq!(split_first_word("  Foo::bar()   the bar "), ("Foo::bar()", "the bar"));
        assert_eq!(split_first_word("Foo"), ("Foo", ""));
        assert_eq!(split_first_word(""), ("", ""));
    }
}
