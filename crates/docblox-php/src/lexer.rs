//! A coarse PHP token scanner.
//!
//! Only the shapes the reflector needs are distinguished: doc comments,
//! names (including `\` qualified ones), variables, literals and punctuation.
//! Plain comments, whitespace and inline HTML are dropped. Strings, heredocs
//! and attributes are consumed whole so their content never looks like code.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct LexError {
    pub line: u32,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `/** ... */`
    DocComment,
    /// Identifier, keyword or qualified name.
    Name,
    /// `$name`
    Variable,
    /// String, heredoc or nowdoc.
    Literal,
    Number,
    Punct,
    /// `?>`, which also ends a statement.
    CloseTag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'s> {
    pub kind: TokenKind,
    pub text: &'s str,
    pub line: u32,
    /// Byte offsets into the source.
    pub start: usize,
    pub end: usize,
}

impl Token<'_> {
    pub fn is(&self, text: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == text
    }

    /// Case-insensitive keyword check.
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Name && self.text.eq_ignore_ascii_case(keyword)
    }

    pub fn ends_statement(&self) -> bool {
        self.is(";") || self.kind == TokenKind::CloseTag
    }
}

/// Punctuation longer than one byte, longest first.
const COMPOUND_PUNCT: &[&str] = &["?->", "...", "::", "->", "=>", "??"];

pub fn tokenize(source: &str) -> Result<Vec<Token<'_>>, LexError> {
    Lexer {
        source,
        bytes: source.as_bytes(),
        pos: 0,
        line: 1,
    }
    .run()
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

fn is_ident_char(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit()
}

struct Lexer<'s> {
    source: &'s str,
    bytes: &'s [u8],
    pos: usize,
    line: u32,
}

impl<'s> Lexer<'s> {
    fn run(mut self) -> Result<Vec<Token<'s>>, LexError> {
        let mut tokens = Vec::new();
        self.skip_inline_html();
        while let Some(&b) = self.bytes.get(self.pos) {
            let start = self.pos;
            let line = self.line;
            let kind = match b {
                b'\n' => {
                    self.advance_to(start + 1);
                    continue;
                }
                b' ' | b'\t' | b'\r' => {
                    self.pos += 1;
                    continue;
                }
                b'?' if self.starts_with("?>") => {
                    self.pos += 2;
                    tokens.push(self.token(TokenKind::CloseTag, start, line));
                    self.skip_inline_html();
                    continue;
                }
                b'#' if self.starts_with("#[") => {
                    self.skip_attribute()?;
                    continue;
                }
                b'#' => {
                    self.skip_line_comment();
                    continue;
                }
                b'/' if self.starts_with("//") => {
                    self.skip_line_comment();
                    continue;
                }
                b'/' if self.starts_with("/**") && !self.starts_with("/**/") => {
                    self.block_comment()?;
                    TokenKind::DocComment
                }
                b'/' if self.starts_with("/*") => {
                    self.block_comment()?;
                    continue;
                }
                b'\'' | b'"' | b'`' => {
                    self.quoted(b)?;
                    TokenKind::Literal
                }
                b'<' if self.starts_with("<<<") => {
                    self.heredoc()?;
                    TokenKind::Literal
                }
                b'$' if self.bytes.get(start + 1).copied().is_some_and(is_ident_start) => {
                    self.pos += 1;
                    self.take_while(is_ident_char);
                    TokenKind::Variable
                }
                b'\\' => {
                    self.take_while(|b| is_ident_char(b) || b == b'\\');
                    TokenKind::Name
                }
                b if is_ident_start(b) => {
                    self.take_while(|b| is_ident_char(b) || b == b'\\');
                    TokenKind::Name
                }
                b'0'..=b'9' => {
                    self.take_while(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'_');
                    TokenKind::Number
                }
                _ => {
                    let width = COMPOUND_PUNCT
                        .iter()
                        .find(|p| self.starts_with(p))
                        .map_or(1, |p| p.len());
                    self.pos += width;
                    TokenKind::Punct
                }
            };
            tokens.push(self.token(kind, start, line));
        }
        Ok(tokens)
    }

    fn token(&self, kind: TokenKind, start: usize, line: u32) -> Token<'s> {
        Token {
            kind,
            text: &self.source[start..self.pos],
            line,
            start,
            end: self.pos,
        }
    }

    fn error(&self, line: u32, message: &str) -> LexError {
        LexError {
            line,
            message: message.to_string(),
        }
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.bytes[self.pos..].starts_with(prefix.as_bytes())
    }

    /// Move to `end`, counting the newlines crossed.
    fn advance_to(&mut self, end: usize) {
        let end = end.min(self.bytes.len());
        self.line += self.bytes[self.pos..end]
            .iter()
            .filter(|&&b| b == b'\n')
            .count() as u32;
        self.pos = end;
    }

    fn take_while(&mut self, pred: impl Fn(u8) -> bool) {
        while self.bytes.get(self.pos).copied().is_some_and(&pred) {
            self.pos += 1;
        }
    }

    fn find(&self, needle: &str) -> Option<usize> {
        self.source[self.pos..].find(needle).map(|i| self.pos + i)
    }

    fn skip_inline_html(&mut self) {
        match self.find("<?") {
            Some(open) => {
                self.advance_to(open);
                let tag = if self.starts_with("<?php") {
                    5
                } else if self.starts_with("<?=") {
                    3
                } else {
                    2
                };
                self.pos += tag;
            }
            None => self.advance_to(self.bytes.len()),
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(&b) = self.bytes.get(self.pos) {
            if b == b'\n' || self.starts_with("?>") {
                return;
            }
            self.pos += 1;
        }
    }

    fn block_comment(&mut self) -> Result<(), LexError> {
        let line = self.line;
        self.pos += 2;
        let close = self
            .find("*/")
            .ok_or_else(|| self.error(line, "unterminated comment"))?;
        self.advance_to(close + 2);
        Ok(())
    }

    fn quoted(&mut self, quote: u8) -> Result<(), LexError> {
        let line = self.line;
        let mut i = self.pos + 1;
        while let Some(&b) = self.bytes.get(i) {
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == quote {
                self.advance_to(i + 1);
                return Ok(());
            }
            i += 1;
        }
        Err(self.error(line, "unterminated string"))
    }

    fn heredoc(&mut self) -> Result<(), LexError> {
        let line = self.line;
        self.pos += 3;
        self.take_while(|b| b == b' ' || b == b'\t');
        let quote = match self.bytes.get(self.pos) {
            Some(&b) if b == b'\'' || b == b'"' => Some(b),
            _ => None,
        };
        if quote.is_some() {
            self.pos += 1;
        }
        let label_start = self.pos;
        self.take_while(is_ident_char);
        let label = &self.source[label_start..self.pos];
        if label.is_empty() {
            return Err(self.error(line, "heredoc without label"));
        }
        if let Some(quote) = quote {
            if self.bytes.get(self.pos) != Some(&quote) {
                return Err(self.error(line, "unterminated heredoc"));
            }
            self.pos += 1;
        }

        // The closing label is the first line that starts with it, ignoring
        // indentation, and is not followed by an identifier character.
        let mut cursor = self.pos;
        while let Some(newline) = self.source[cursor..].find('\n') {
            let body = cursor + newline + 1;
            let rest = &self.source[body..];
            let indent = rest.len() - rest.trim_start_matches([' ', '\t']).len();
            let after = body + indent + label.len();
            if rest[indent..].starts_with(label)
                && !self.bytes.get(after).copied().is_some_and(is_ident_char)
            {
                self.advance_to(after);
                return Ok(());
            }
            cursor = body;
        }
        Err(self.error(line, "unterminated heredoc"))
    }

    fn skip_attribute(&mut self) -> Result<(), LexError> {
        let line = self.line;
        self.pos += 2;
        let mut depth = 1;
        while let Some(&b) = self.bytes.get(self.pos) {
            match b {
                b'\'' | b'"' => {
                    self.quoted(b)?;
                    continue;
                }
                b'[' => depth += 1,
                b']' => {
                    depth -= 1;
                    if depth == 0 {
                        self.pos += 1;
                        return Ok(());
                    }
                }
                b'\n' => self.line += 1,
                _ => {}
            }
            self.pos += 1;
        }
        Err(self.error(line, "unterminated attribute"))
    }
}
