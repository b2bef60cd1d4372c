//! The PHP [`FileReflector`].
//!
//! Walks the token stream once, tracking the current namespace and the
//! pending doc-block. Declarations it understands become descriptors;
//! function and method bodies are skipped. Class names in `extends`,
//! `implements` and trait `use` clauses are qualified against the namespace
//! and the file's `use` aliases the way PHP itself does. Doc-block references
//! are kept as written and resolved later by the compiler.

use docblox_core::descriptor::{
    ArgumentDescriptor, ClassDescriptor, ConstantDescriptor, ElementInfo, FileDescriptor,
    FunctionDescriptor, InterfaceDescriptor, Members, MethodDescriptor, ParseError,
    PropertyDescriptor, Reference, TagBody, TraitDescriptor, Visibility,
};
use docblox_core::fqsen::{Fqsen, SEPARATOR};
use docblox_core::reflector::{FileReflector, ReflectError, SourceFile};
use tracing::debug;

use crate::docblock::{self, split_types, DocBlock};
use crate::lexer::{tokenize, Token, TokenKind};

/// Keywords that start a documentable declaration.
const DECLARATION_KEYWORDS: &[&str] = &[
    "abstract",
    "class",
    "const",
    "define",
    "enum",
    "final",
    "function",
    "interface",
    "readonly",
    "trait",
];

/// Names that are never qualified with a namespace.
const RESERVED_NAMES: &[&str] = &["self", "static", "parent"];

/// Reflects PHP source files.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhpReflector;

impl PhpReflector {
    pub fn new() -> Self {
        PhpReflector
    }
}

impl FileReflector for PhpReflector {
    fn reflect(&self, file: &SourceFile) -> Result<FileDescriptor, ReflectError> {
        let tokens = tokenize(&file.content).map_err(|err| ReflectError::Syntax {
            path: file.path.clone(),
            line: err.line,
            message: err.message,
        })?;

        let mut parser = Parser::new(
            &file.content,
            &tokens,
            FileDescriptor::new(file.path.clone(), file.hash.clone()),
        );
        parser.statements(false);
        let descriptor = parser.file;

        debug!(
            path = %descriptor.path,
            classes = descriptor.classes.len(),
            interfaces = descriptor.interfaces.len(),
            traits = descriptor.traits.len(),
            functions = descriptor.functions.len(),
            constants = descriptor.constants.len(),
            errors = descriptor.errors.len(),
            "reflected file"
        );
        Ok(descriptor)
    }
}

// ============================================================================
// Parser state
// ============================================================================

/// Members and trait uses collected from a class-like body.
#[derive(Debug, Default)]
struct Body {
    members: Members,
    traits: Vec<Reference>,
}

/// Modifiers and declared type seen so far for one member declaration.
#[derive(Debug, Default)]
struct Modifiers {
    line: Option<u32>,
    visibility: Option<Visibility>,
    is_static: bool,
    is_abstract: bool,
    is_final: bool,
    types: String,
}

impl Modifiers {
    fn start(&mut self, line: u32) {
        self.line.get_or_insert(line);
    }
}

struct Parser<'s, 't> {
    source: &'s str,
    tokens: &'t [Token<'s>],
    pos: usize,
    file: FileDescriptor,
    namespace: Fqsen,
    pending: Option<DocBlock>,
    /// Whether the file-level doc-block has been decided on.
    file_doc_seen: bool,
}

impl<'s, 't> Parser<'s, 't> {
    fn new(source: &'s str, tokens: &'t [Token<'s>], file: FileDescriptor) -> Self {
        Parser {
            source,
            tokens,
            pos: 0,
            file,
            namespace: Fqsen::root(),
            pending: None,
            file_doc_seen: false,
        }
    }

    // ------------------------------------------------------------------------
    // Token cursor
    // ------------------------------------------------------------------------

    fn peek(&self) -> Option<Token<'s>> {
        self.tokens.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<Token<'s>> {
        self.tokens.get(self.pos + offset).copied()
    }

    fn previous(&self) -> Option<Token<'s>> {
        self.pos.checked_sub(1).and_then(|i| self.tokens.get(i)).copied()
    }

    fn bump(&mut self) -> Option<Token<'s>> {
        let token = self.peek()?;
        self.pos += 1;
        Some(token)
    }

    fn bump_kind(&mut self, kind: TokenKind) -> Option<Token<'s>> {
        if self.peek()?.kind == kind {
            self.bump()
        } else {
            None
        }
    }

    fn eat(&mut self, punct: &str) -> bool {
        let matched = self.peek().is_some_and(|t| t.is(punct));
        if matched {
            self.pos += 1;
        }
        matched
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        let matched = self.peek().is_some_and(|t| t.is_keyword(keyword));
        if matched {
            self.pos += 1;
        }
        matched
    }

    fn eat_statement_end(&mut self) {
        if self.peek().is_some_and(|t| t.ends_statement()) {
            self.pos += 1;
        }
    }

    fn error(&mut self, line: u32, message: String) {
        debug!(path = %self.file.path, line, %message, "parse problem");
        self.file.errors.push(ParseError { line, message });
    }

    // ------------------------------------------------------------------------
    // Skipping
    // ------------------------------------------------------------------------

    /// Skip to the `}` matching an already consumed `{`.
    fn skip_block(&mut self, line: u32) {
        let mut depth = 1usize;
        while let Some(token) = self.bump() {
            if token.is("{") {
                depth += 1;
            } else if token.is("}") {
                depth -= 1;
                if depth == 0 {
                    return;
                }
            }
        }
        self.error(line, "unclosed block".to_string());
    }

    /// Skip past the end of the current statement without leaving the
    /// enclosing block.
    fn skip_statement(&mut self) {
        let mut depth = 0usize;
        while let Some(token) = self.peek() {
            if token.is("(") || token.is("[") || token.is("{") {
                depth += 1;
            } else if token.is(")") || token.is("]") || token.is("}") {
                if depth == 0 {
                    return;
                }
                depth -= 1;
            } else if depth == 0 && token.ends_statement() {
                self.pos += 1;
                return;
            }
            self.pos += 1;
        }
    }

    /// Skip a declaration header and its `{ ... }` body.
    fn skip_declaration(&mut self) {
        let mut depth = 0usize;
        while let Some(token) = self.bump() {
            if token.is("(") {
                depth += 1;
            } else if token.is(")") {
                depth = depth.saturating_sub(1);
            } else if depth == 0 && token.is("{") {
                self.skip_block(token.line);
                return;
            } else if depth == 0 && token.ends_statement() {
                return;
            }
        }
    }

    /// Source text up to (not including) the first top-level token in
    /// `stops`, the end of the statement or an unbalanced closing bracket.
    fn expression(&mut self, stops: &[&str]) -> String {
        let Some(first) = self.peek() else {
            return String::new();
        };
        let mut end = first.start;
        let mut depth = 0usize;
        while let Some(token) = self.peek() {
            if token.is("(") || token.is("[") || token.is("{") {
                depth += 1;
            } else if token.is(")") || token.is("]") || token.is("}") {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            } else if depth == 0 && (token.ends_statement() || stops.contains(&token.text)) {
                break;
            }
            end = token.end;
            self.pos += 1;
        }
        self.source[first.start..end].trim().to_string()
    }

    // ------------------------------------------------------------------------
    // Names
    // ------------------------------------------------------------------------

    /// Qualify a class name as PHP resolves it at compile time.
    fn qualify(&self, name: &str) -> String {
        if name.starts_with(SEPARATOR) {
            return name.to_string();
        }
        let (first, rest) = match name.split_once(SEPARATOR) {
            Some((first, rest)) => (first, Some(rest)),
            None => (name, None),
        };
        if first.eq_ignore_ascii_case("namespace") {
            if let Some(rest) = rest {
                return self.namespace.join(rest).to_string();
            }
        }
        if let Some(target) = self.alias(first) {
            return match rest {
                Some(rest) => target.join(rest).to_string(),
                None => target.to_string(),
            };
        }
        if rest.is_none() && RESERVED_NAMES.iter().any(|r| r.eq_ignore_ascii_case(name)) {
            return name.to_string();
        }
        self.namespace.join(name).to_string()
    }

    fn alias(&self, name: &str) -> Option<&Fqsen> {
        self.file
            .namespace_aliases
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(name))
            .map(|(_, target)| target)
    }

    /// `A, B\C, \D` qualified.
    fn name_list(&mut self) -> Vec<Reference> {
        let mut names = Vec::new();
        while let Some(name) = self.bump_kind(TokenKind::Name) {
            names.push(Reference::new(self.qualify(name.text)));
            if !self.eat(",") {
                break;
            }
        }
        names
    }

    // ------------------------------------------------------------------------
    // Doc-blocks
    // ------------------------------------------------------------------------

    fn doc_comment(&mut self, token: Token<'s>) {
        let doc = docblock::parse(token.text, token.line);
        if !self.file_doc_seen {
            self.file_doc_seen = true;
            if self.is_file_doc() {
                self.file.package = doc.package().map(str::to_string);
                self.file.summary = doc.summary;
                self.file.description = doc.description;
                self.file.tags = doc.tags;
                return;
            }
        }
        self.pending = Some(doc);
    }

    /// The first doc-block documents the file unless it directly precedes a
    /// declaration. A second doc-block right after it settles the question.
    fn is_file_doc(&self) -> bool {
        match self.peek() {
            Some(next) if next.kind == TokenKind::DocComment => true,
            Some(next) => !DECLARATION_KEYWORDS.iter().any(|k| next.is_keyword(k)),
            None => true,
        }
    }

    /// Move the pending doc-block onto `info`, returning it for argument
    /// descriptions.
    fn take_doc(&mut self, info: &mut ElementInfo) -> Option<DocBlock> {
        let doc = self.pending.take()?;
        apply_doc(info, &doc);
        Some(doc)
    }

    // ------------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------------

    /// Parse statements until end of input or, when `nested`, the `}` closing
    /// the current block. Blocks of unknown statements are entered so that
    /// conditional declarations are still seen.
    fn statements(&mut self, nested: bool) {
        let open_line = self.previous().map_or(1, |t| t.line);
        while let Some(token) = self.peek() {
            match token.kind {
                TokenKind::DocComment => {
                    self.pos += 1;
                    self.doc_comment(token);
                }
                TokenKind::Name if self.follows_accessor() => {
                    self.pos += 1;
                }
                TokenKind::Name => self.declaration(token),
                TokenKind::Punct if token.is("{") => {
                    self.pos += 1;
                    self.pending = None;
                    self.statements(true);
                }
                TokenKind::Punct if token.is("}") => {
                    self.pos += 1;
                    self.pending = None;
                    if nested {
                        return;
                    }
                }
                _ => {
                    self.pos += 1;
                    if token.ends_statement() {
                        self.pending = None;
                    }
                }
            }
        }
        if nested {
            self.error(open_line, "unclosed block".to_string());
        }
    }

    /// `Foo::class`, `$a->function` and friends are not declarations.
    fn follows_accessor(&self) -> bool {
        self.previous()
            .is_some_and(|t| t.is("::") || t.is("->") || t.is("?->"))
    }

    fn declaration(&mut self, token: Token<'s>) {
        let keyword = token.text.to_ascii_lowercase();
        if DECLARATION_KEYWORDS.contains(&keyword.as_str()) {
            self.file_doc_seen = true;
        }
        match keyword.as_str() {
            "namespace" => self.namespace_declaration(),
            "use" => self.use_declaration(),
            "class" if self.previous().is_some_and(|t| t.is_keyword("new")) => {
                // Anonymous class.
                self.pending = None;
                self.skip_declaration();
            }
            "abstract" | "final" | "readonly" | "class" => self.class_declaration(),
            "interface" => self.interface_declaration(),
            "trait" => self.trait_declaration(),
            "enum" if self.peek_at(1).is_some_and(|t| t.kind == TokenKind::Name) => {
                self.pending = None;
                self.skip_declaration();
            }
            "function" => self.function_declaration(),
            "const" => self.constant_declaration(),
            "define" => self.define(),
            "require" | "require_once" | "include" | "include_once" => self.include(),
            _ => self.pos += 1,
        }
    }

    fn namespace_declaration(&mut self) {
        self.pos += 1;
        let name = match self.bump_kind(TokenKind::Name) {
            Some(name) => Fqsen::new(name.text),
            None => Fqsen::root(),
        };
        self.pending = None;
        if self.eat("{") {
            let outer = std::mem::replace(&mut self.namespace, name);
            self.statements(true);
            self.namespace = outer;
        } else {
            self.namespace = name;
            self.eat_statement_end();
        }
    }

    /// `use A\B;`, `use A\B as C, D;`, `use A\{B, C as D};`
    fn use_declaration(&mut self) {
        self.pos += 1;
        self.pending = None;
        if self
            .peek()
            .is_some_and(|t| t.is_keyword("function") || t.is_keyword("const"))
        {
            self.skip_statement();
            return;
        }
        while let Some(name) = self.bump_kind(TokenKind::Name) {
            if self.eat("{") {
                let prefix = name.text.trim_end_matches(SEPARATOR);
                while let Some(item) = self.bump_kind(TokenKind::Name) {
                    self.import(&format!("{}{}{}", prefix, SEPARATOR, item.text));
                    if !self.eat(",") {
                        break;
                    }
                }
                self.eat("}");
            } else {
                self.import(name.text);
            }
            if !self.eat(",") {
                break;
            }
        }
        self.skip_statement();
    }

    fn import(&mut self, target: &str) {
        let target = Fqsen::new(target);
        let alias = if self.eat_keyword("as") {
            self.bump_kind(TokenKind::Name).map(|t| t.text.to_string())
        } else {
            None
        };
        let alias = alias.unwrap_or_else(|| target.name().to_string());
        self.file.namespace_aliases.insert(alias, target);
    }

    fn include(&mut self) {
        self.pos += 1;
        let expression = self.expression(&[]);
        self.eat_statement_end();
        let expression = expression
            .strip_prefix('(')
            .and_then(|e| e.strip_suffix(')'))
            .map_or(expression.as_str(), str::trim);
        if !expression.is_empty() {
            self.file.includes.push(unquote(expression));
        }
    }

    // ------------------------------------------------------------------------
    // Class-likes
    // ------------------------------------------------------------------------

    fn class_declaration(&mut self) {
        let line = self.peek().map_or(1, |t| t.line);
        let mut is_abstract = false;
        let mut is_final = false;
        while let Some(token) = self.peek() {
            if token.is_keyword("abstract") {
                is_abstract = true;
            } else if token.is_keyword("final") {
                is_final = true;
            } else if !token.is_keyword("readonly") {
                break;
            }
            self.pos += 1;
        }
        if !self.eat_keyword("class") {
            return;
        }
        let Some(name) = self.bump_kind(TokenKind::Name) else {
            return;
        };

        let fqsen = self.namespace.join(name.text);
        let mut class = ClassDescriptor::new(fqsen.clone(), line);
        class.is_abstract = is_abstract;
        class.is_final = is_final;
        self.take_doc(&mut class.info);
        if self.eat_keyword("extends") {
            if let Some(parent) = self.bump_kind(TokenKind::Name) {
                class.parent = Some(Reference::new(self.qualify(parent.text)));
            }
        }
        if self.eat_keyword("implements") {
            class.interfaces = self.name_list();
        }
        let Some(body) = self.body(&fqsen, false) else {
            return;
        };
        class.members = body.members;
        class.used_traits = body.traits;
        self.file.add_class(class);
    }

    fn interface_declaration(&mut self) {
        let line = self.peek().map_or(1, |t| t.line);
        self.pos += 1;
        let Some(name) = self.bump_kind(TokenKind::Name) else {
            return;
        };

        let fqsen = self.namespace.join(name.text);
        let mut interface = InterfaceDescriptor::new(fqsen.clone(), line);
        self.take_doc(&mut interface.info);
        if self.eat_keyword("extends") {
            interface.parents = self.name_list();
        }
        let Some(body) = self.body(&fqsen, true) else {
            return;
        };
        interface.members = body.members;
        self.file.add_interface(interface);
    }

    fn trait_declaration(&mut self) {
        let line = self.peek().map_or(1, |t| t.line);
        self.pos += 1;
        let Some(name) = self.bump_kind(TokenKind::Name) else {
            return;
        };

        let fqsen = self.namespace.join(name.text);
        let mut descriptor = TraitDescriptor::new(fqsen.clone(), line);
        self.take_doc(&mut descriptor.info);
        let Some(body) = self.body(&fqsen, false) else {
            return;
        };
        descriptor.members = body.members;
        descriptor.used_traits = body.traits;
        self.file.add_trait(descriptor);
    }

    fn body(&mut self, owner: &Fqsen, is_interface: bool) -> Option<Body> {
        let line = self.peek().map_or(1, |t| t.line);
        if !self.eat("{") {
            self.error(line, format!("expected body for {}", owner));
            return None;
        }
        Some(self.members(owner, is_interface, line))
    }

    /// Parse the members of a class-like body up to its closing `}`.
    /// Interface methods are abstract.
    fn members(&mut self, owner: &Fqsen, is_interface: bool, open_line: u32) -> Body {
        let mut body = Body::default();
        let mut modifiers = Modifiers::default();
        while let Some(token) = self.bump() {
            match token.kind {
                TokenKind::DocComment => {
                    self.pending = Some(docblock::parse(token.text, token.line));
                }
                TokenKind::Punct if token.is("}") => return body,
                TokenKind::Name => match token.text.to_ascii_lowercase().as_str() {
                    "use" => {
                        body.traits.extend(self.trait_uses());
                        self.pending = None;
                        modifiers = Modifiers::default();
                    }
                    "public" | "protected" | "private" => {
                        modifiers.start(token.line);
                        modifiers.visibility = Visibility::parse(token.text);
                    }
                    "static" => {
                        modifiers.start(token.line);
                        modifiers.is_static = true;
                    }
                    "abstract" => {
                        modifiers.start(token.line);
                        modifiers.is_abstract = true;
                    }
                    "final" => {
                        modifiers.start(token.line);
                        modifiers.is_final = true;
                    }
                    "var" | "readonly" => modifiers.start(token.line),
                    "const" => {
                        modifiers.start(token.line);
                        self.class_constants(owner, &modifiers, &mut body.members);
                        modifiers = Modifiers::default();
                    }
                    "function" => {
                        modifiers.start(token.line);
                        modifiers.is_abstract |= is_interface;
                        self.method(owner, &modifiers, &mut body.members);
                        modifiers = Modifiers::default();
                    }
                    "case" => {
                        self.skip_statement();
                        self.pending = None;
                        modifiers = Modifiers::default();
                    }
                    _ => {
                        modifiers.start(token.line);
                        modifiers.types.push_str(token.text);
                    }
                },
                TokenKind::Variable => {
                    modifiers.start(token.line);
                    self.properties(owner, token, &modifiers, &mut body.members);
                    modifiers = Modifiers::default();
                }
                TokenKind::Punct
                    if token.is("?")
                        || token.is("|")
                        || token.is("&")
                        || token.is("(")
                        || token.is(")") =>
                {
                    modifiers.types.push_str(token.text);
                }
                _ => {
                    if token.ends_statement() {
                        self.pending = None;
                        modifiers = Modifiers::default();
                    }
                }
            }
        }
        self.error(open_line, format!("unclosed body of {}", owner));
        body
    }

    /// Trait names of a `use` clause inside a class-like body.
    fn trait_uses(&mut self) -> Vec<Reference> {
        let traits = self.name_list();
        if self.eat("{") {
            let line = self.previous().map_or(1, |t| t.line);
            self.skip_block(line);
        } else {
            self.eat_statement_end();
        }
        traits
    }

    fn method(&mut self, owner: &Fqsen, modifiers: &Modifiers, members: &mut Members) {
        self.eat("&");
        let Some(name) = self.bump_kind(TokenKind::Name) else {
            self.pending = None;
            return;
        };
        let line = modifiers.line.unwrap_or(name.line);
        let mut method = MethodDescriptor::new(owner, name.text, line);
        method.visibility = modifiers.visibility.unwrap_or_default();
        method.is_static = modifiers.is_static;
        method.is_abstract = modifiers.is_abstract;
        method.is_final = modifiers.is_final;
        let doc = self.take_doc(&mut method.info);
        method.arguments = self.arguments(doc.as_ref());
        method.return_types = self.return_types();
        self.body_or_semicolon();
        members.add_method(method);
    }

    fn properties(
        &mut self,
        owner: &Fqsen,
        first: Token<'s>,
        modifiers: &Modifiers,
        members: &mut Members,
    ) {
        let doc = self.pending.take();
        let types = declared_types(&modifiers.types);
        let mut variable = Some(first);
        while let Some(var) = variable.take() {
            let line = modifiers.line.unwrap_or(var.line);
            let mut property = PropertyDescriptor::new(owner, var.text, line);
            property.visibility = modifiers.visibility.unwrap_or_default();
            property.is_static = modifiers.is_static;
            property.types = types.clone();
            if self.eat("=") {
                property.default = Some(self.expression(&[","]));
            }
            if let Some(doc) = &doc {
                apply_doc(&mut property.info, doc);
            }
            members.add_property(property);
            if self.eat(",") {
                variable = self.bump_kind(TokenKind::Variable);
            }
        }
        self.eat_statement_end();
    }

    fn class_constants(&mut self, owner: &Fqsen, modifiers: &Modifiers, members: &mut Members) {
        let doc = self.pending.take();
        for (name, value) in self.constant_list() {
            let line = modifiers.line.unwrap_or(name.line);
            let mut constant = ConstantDescriptor::member(owner, name.text, line);
            constant.value = value;
            constant.visibility = modifiers.visibility.unwrap_or_default();
            if let Some(doc) = &doc {
                apply_doc(&mut constant.info, doc);
            }
            members.add_constant(constant);
        }
    }

    // ------------------------------------------------------------------------
    // Functions and constants
    // ------------------------------------------------------------------------

    fn function_declaration(&mut self) {
        let line = self.peek().map_or(1, |t| t.line);
        self.pos += 1;
        self.eat("&");
        // Closures have no name.
        let named = self.peek().is_some_and(|t| t.kind == TokenKind::Name)
            && self.peek_at(1).is_some_and(|t| t.is("("));
        if !named {
            return;
        }
        let Some(name) = self.bump() else {
            return;
        };

        let fqsen = self.namespace.join(&format!("{}()", name.text));
        let mut function = FunctionDescriptor::new(fqsen, line);
        let doc = self.take_doc(&mut function.info);
        function.arguments = self.arguments(doc.as_ref());
        function.return_types = self.return_types();
        self.body_or_semicolon();
        self.file.add_function(function);
    }

    fn constant_declaration(&mut self) {
        let line = self.peek().map_or(1, |t| t.line);
        self.pos += 1;
        let doc = self.pending.take();
        for (name, value) in self.constant_list() {
            let mut constant = ConstantDescriptor::new(self.namespace.join(name.text), line);
            constant.value = value;
            if let Some(doc) = &doc {
                apply_doc(&mut constant.info, doc);
            }
            self.file.add_constant(constant);
        }
    }

    /// `[Type] A = 1, B = 2;` after the `const` keyword.
    fn constant_list(&mut self) -> Vec<(Token<'s>, String)> {
        let mut constants = Vec::new();
        loop {
            // The last name before `=` is the constant; earlier ones are its type.
            let mut name = None;
            while let Some(token) = self.bump_kind(TokenKind::Name) {
                name = Some(token);
            }
            let Some(name) = name else {
                break;
            };
            if !self.eat("=") {
                break;
            }
            let value = self.expression(&[","]);
            constants.push((name, value));
            if !self.eat(",") {
                break;
            }
        }
        self.skip_statement();
        constants
    }

    /// `define('NAME', value);`
    fn define(&mut self) {
        let line = self.peek().map_or(1, |t| t.line);
        self.pos += 1;
        let is_call = self.peek().is_some_and(|t| t.is("("))
            && self.peek_at(1).is_some_and(|t| t.kind == TokenKind::Literal)
            && self.peek_at(2).is_some_and(|t| t.is(","));
        if !is_call {
            return;
        }
        let Some(name) = self.peek_at(1) else {
            return;
        };
        self.pos += 3;
        let value = self.expression(&[]);
        self.eat(")");
        self.eat_statement_end();

        let mut constant = ConstantDescriptor::new(Fqsen::new(unquote(name.text)), line);
        constant.value = value;
        self.take_doc(&mut constant.info);
        self.file.add_constant(constant);
    }

    // ------------------------------------------------------------------------
    // Signatures
    // ------------------------------------------------------------------------

    /// Parse a parenthesized parameter list. `@param` tags of `doc` supply
    /// the argument descriptions.
    fn arguments(&mut self, doc: Option<&DocBlock>) -> Vec<ArgumentDescriptor> {
        let Some(open) = self.peek().filter(|t| t.is("(")) else {
            return Vec::new();
        };
        self.pos += 1;

        let tokens = self.tokens;
        let mut depth = 0usize;
        let mut pieces: Vec<&'t [Token<'s>]> = Vec::new();
        let mut piece_start = self.pos;
        loop {
            let Some(token) = self.peek() else {
                self.error(open.line, "unclosed parameter list".to_string());
                break;
            };
            self.pos += 1;
            if token.is("(") || token.is("[") || token.is("{") {
                depth += 1;
            } else if (token.is(")") || token.is("]") || token.is("}")) && depth > 0 {
                depth -= 1;
            } else if token.is(")") {
                pieces.push(&tokens[piece_start..self.pos - 1]);
                break;
            } else if depth == 0 && token.is(",") {
                pieces.push(&tokens[piece_start..self.pos - 1]);
                piece_start = self.pos;
            }
        }

        pieces
            .into_iter()
            .filter_map(|piece| self.argument(piece, doc))
            .collect()
    }

    fn argument(&self, tokens: &[Token<'s>], doc: Option<&DocBlock>) -> Option<ArgumentDescriptor> {
        let mut types = String::new();
        let mut by_reference = false;
        let mut is_variadic = false;
        for (i, token) in tokens.iter().enumerate() {
            match token.kind {
                TokenKind::Variable => {
                    let mut argument = ArgumentDescriptor::new(token.text, token.line);
                    argument.types = declared_types(&types);
                    argument.by_reference = by_reference;
                    argument.is_variadic = is_variadic;
                    if tokens.get(i + 1).is_some_and(|t| t.is("=")) {
                        if let (Some(first), Some(last)) = (tokens.get(i + 2), tokens.last()) {
                            argument.default =
                                Some(self.source[first.start..last.end].trim().to_string());
                        }
                    }
                    if let Some(doc) = doc {
                        argument.description = param_description(doc, token.text);
                    }
                    return Some(argument);
                }
                TokenKind::Name
                    if ["public", "protected", "private", "readonly"]
                        .iter()
                        .any(|m| token.is_keyword(m)) => {}
                TokenKind::Punct if token.is("...") => is_variadic = true,
                TokenKind::Punct
                    if token.is("&")
                        && tokens
                            .get(i + 1)
                            .is_some_and(|t| t.kind == TokenKind::Variable || t.is("...")) =>
                {
                    by_reference = true;
                }
                _ => types.push_str(token.text),
            }
        }
        None
    }

    /// `: Type` after a parameter list.
    fn return_types(&mut self) -> Vec<String> {
        if !self.eat(":") {
            return Vec::new();
        }
        let mut types = String::new();
        while let Some(token) = self.peek() {
            if token.is("{") || token.ends_statement() {
                break;
            }
            types.push_str(token.text);
            self.pos += 1;
        }
        declared_types(&types)
    }

    fn body_or_semicolon(&mut self) {
        if let Some(open) = self.peek().filter(|t| t.is("{")) {
            self.pos += 1;
            self.skip_block(open.line);
        } else {
            self.eat_statement_end();
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn apply_doc(info: &mut ElementInfo, doc: &DocBlock) {
    info.summary = doc.summary.clone();
    info.description = doc.description.clone();
    info.tags = doc.tags.clone();
}

/// Description of the `@param` tag documenting `variable`.
fn param_description(doc: &DocBlock, variable: &str) -> String {
    doc.tags
        .get("param")
        .iter()
        .find(|tag| matches!(&tag.body, TagBody::Variable { variable: v, .. } if v == variable))
        .map(|tag| tag.description.clone())
        .unwrap_or_default()
}

/// `?int` → `["int", "null"]`, `A|B` → `["A", "B"]`.
fn declared_types(text: &str) -> Vec<String> {
    match text.strip_prefix('?') {
        Some(inner) if !inner.is_empty() => vec![inner.to_string(), "null".to_string()],
        _ => split_types(text),
    }
}

/// Strip the quotes of a single string literal; anything else is returned as is.
fn unquote(text: &str) -> String {
    let quoted = text.len() >= 2
        && ((text.starts_with('\'') && text.ends_with('\''))
            || (text.starts_with('"') && text.ends_with('"')));
    if quoted {
        text[1..text.len() - 1].replace("\\\\", "\\")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docblox_core::descriptor::ElementKind;

    fn reflect(source: &str) -> FileDescriptor {
        PhpReflector::new()
            .reflect(&SourceFile::new("src/test.php", source))
            .unwrap()
    }

    fn fqsen(text: &str) -> Fqsen {
        Fqsen::new(text)
    }

    mod namespace_tests {
        use super::*;

        #[test]
        fn declarations_are_qualified_with_the_namespace() {
            let file = reflect("<?php\nnamespace Acme\\Billing;\n\nclass Invoice {}\nfunction total() {}\nconst RATE = 0.2;\n");
            assert!(file.classes.contains_key(&fqsen("\\Acme\\Billing\\Invoice")));
            assert!(file.functions.contains_key(&fqsen("\\Acme\\Billing\\total()")));
            assert_eq!(
                file.constants[&fqsen("\\Acme\\Billing\\RATE")].value,
                "0.2"
            );
        }

        #[test]
        fn braced_namespaces() {
            let file = reflect(
                "<?php\nnamespace A { class X {} }\nnamespace B { class Y {} }\nnamespace { class Z {} }\n",
            );
            let names: Vec<&str> = file.classes.keys().map(Fqsen::as_str).collect();
            assert_eq!(names, vec!["\\A\\X", "\\B\\Y", "\\Z"]);
            assert!(file.errors.is_empty());
        }

        #[test]
        fn use_aliases() {
            let file = reflect(
                "<?php\nnamespace App;\nuse Acme\\Mail\\Sender;\nuse Acme\\Mail\\{Queue, Transport as T};\nuse \\Psr\\Log\\LoggerInterface as Logger, Countable;\nuse function Acme\\helper;\n",
            );
            let aliases: Vec<(&str, &str)> = file
                .namespace_aliases
                .iter()
                .map(|(alias, target)| (alias.as_str(), target.as_str()))
                .collect();
            assert_eq!(
                aliases,
                vec![
                    ("Countable", "\\Countable"),
                    ("Logger", "\\Psr\\Log\\LoggerInterface"),
                    ("Queue", "\\Acme\\Mail\\Queue"),
                    ("Sender", "\\Acme\\Mail\\Sender"),
                    ("T", "\\Acme\\Mail\\Transport"),
                ]
            );
        }

        #[test]
        fn inheritance_names_are_qualified() {
            let file = reflect(
                "<?php\nnamespace App;\nuse Acme\\Mail\\Transport as T;\nclass Mailer extends Base implements \\Countable, T, Sub\\Thing, namespace\\Local {}\n",
            );
            let class = &file.classes[&fqsen("\\App\\Mailer")];
            assert_eq!(class.parent.as_ref().unwrap().target, "\\App\\Base");
            let interfaces: Vec<&str> = class.interfaces.iter().map(|r| r.target.as_str()).collect();
            assert_eq!(
                interfaces,
                vec![
                    "\\Countable",
                    "\\Acme\\Mail\\Transport",
                    "\\App\\Sub\\Thing",
                    "\\App\\Local"
                ]
            );
        }
    }

    mod class_tests {
        use super::*;

        const INVOICE: &str = r#"<?php
namespace Acme;

/**
 * An invoice.
 *
 * Holds lines.
 * @package Billing
 */
abstract class Invoice extends Document
{
    use Timestamps, Sluggable {
        Sluggable::slug as protected;
    }

    /** Draft state. */
    const DRAFT = 'draft', SENT = 'sent';
    private const SECRET = 1;

    /** @var int[] */
    protected array $lines = [], $notes;
    public static ?Invoice $current = null;
    var $legacy;

    /**
     * Sends the invoice.
     *
     * @param string $to Recipient address
     * @param array &$log
     * @return bool
     */
    final public function send(string $to, array &$log = [], int ...$ids): bool
    {
        $fn = function () { return 1; };
        if ($to) { return true; }
        return false;
    }

    abstract protected static function create(?int $id = null);

    private function &ref() {}
}
"#;

        fn invoice() -> ClassDescriptor {
            let file = reflect(INVOICE);
            assert!(file.errors.is_empty(), "{:?}", file.errors);
            assert_eq!(file.classes.len(), 1);
            assert!(file.functions.is_empty());
            file.classes[&fqsen("\\Acme\\Invoice")].clone()
        }

        #[test]
        fn class_header() {
            let class = invoice();
            assert!(class.is_abstract);
            assert!(!class.is_final);
            assert_eq!(class.info.line, 10);
            assert_eq!(class.info.summary, "An invoice.");
            assert_eq!(class.info.description, "Holds lines.");
            assert!(class.info.tags.contains("package"));
            assert_eq!(class.parent.as_ref().unwrap().target, "\\Acme\\Document");
            let traits: Vec<&str> = class.used_traits.iter().map(|r| r.target.as_str()).collect();
            assert_eq!(traits, vec!["\\Acme\\Timestamps", "\\Acme\\Sluggable"]);
        }

        #[test]
        fn constants() {
            let class = invoice();
            let draft = class.members.get(ElementKind::Constant, "DRAFT").unwrap();
            let sent = class.members.get(ElementKind::Constant, "SENT").unwrap();
            let secret = class.members.get(ElementKind::Constant, "SECRET").unwrap();
            assert_eq!(draft.info().summary, "Draft state.");
            assert_eq!(sent.info().summary, "Draft state.");
            assert_eq!(draft.fqsen().as_str(), "\\Acme\\Invoice::DRAFT");
            assert_eq!(secret.visibility(), Some(Visibility::Private));
            assert_eq!(class.members.constants.len(), 3);
            assert_eq!(class.members.constants["DRAFT"].value, "'draft'");
        }

        #[test]
        fn properties() {
            let class = invoice();
            let lines = &class.members.properties["lines"];
            assert_eq!(lines.visibility, Visibility::Protected);
            assert_eq!(lines.types, vec!["array".to_string()]);
            assert_eq!(lines.default.as_deref(), Some("[]"));
            assert!(lines.info.tags.contains("var"));

            let notes = &class.members.properties["notes"];
            assert_eq!(notes.default, None);
            assert_eq!(notes.types, vec!["array".to_string()]);

            let current = &class.members.properties["current"];
            assert!(current.is_static);
            assert_eq!(current.types, vec!["Invoice".to_string(), "null".to_string()]);
            assert_eq!(current.default.as_deref(), Some("null"));

            let legacy = &class.members.properties["legacy"];
            assert_eq!(legacy.visibility, Visibility::Public);
            assert!(legacy.info.summary.is_empty());
        }

        #[test]
        fn methods() {
            let class = invoice();
            let send = &class.members.methods["send"];
            assert!(send.is_final);
            assert_eq!(send.visibility, Visibility::Public);
            assert_eq!(send.info.summary, "Sends the invoice.");
            assert_eq!(send.return_types, vec!["bool".to_string()]);
            assert_eq!(send.arguments.len(), 3);

            let to = &send.arguments[0];
            assert_eq!(to.name, "$to");
            assert_eq!(to.types, vec!["string".to_string()]);
            assert_eq!(to.description, "Recipient address");

            let log = &send.arguments[1];
            assert!(log.by_reference);
            assert_eq!(log.default.as_deref(), Some("[]"));

            let ids = &send.arguments[2];
            assert!(ids.is_variadic);
            assert_eq!(ids.types, vec!["int".to_string()]);

            let create = &class.members.methods["create"];
            assert!(create.is_abstract);
            assert!(create.is_static);
            assert_eq!(create.visibility, Visibility::Protected);
            assert_eq!(create.arguments[0].types, vec!["int".to_string(), "null".to_string()]);
            assert_eq!(create.arguments[0].default.as_deref(), Some("null"));

            assert!(class.members.methods.contains_key("ref"));
            assert_eq!(class.members.methods.len(), 3);
        }

        #[test]
        fn member_lines_start_at_first_modifier() {
            let class = invoice();
            assert_eq!(class.members.methods["send"].info.line, 32);
            assert_eq!(
                class.members.properties["legacy"].info.line,
                23
            );
        }

        #[test]
        fn interfaces_and_traits() {
            let file = reflect(
                "<?php\ninterface Sender extends Countable, \\Stringable {\n    const A = 1;\n    public function send($to);\n}\ntrait Loud {\n    use Voice;\n    public $volume = 11;\n    public function shout() { return strtoupper($this->word); }\n}\n",
            );
            let sender = &file.interfaces[&fqsen("\\Sender")];
            let parents: Vec<&str> = sender.parents.iter().map(|r| r.target.as_str()).collect();
            assert_eq!(parents, vec!["\\Countable", "\\Stringable"]);
            assert!(sender.members.methods["send"].is_abstract);
            assert!(sender.members.constants.contains_key("A"));

            let loud = &file.traits[&fqsen("\\Loud")];
            assert_eq!(loud.used_traits[0].target, "\\Voice");
            assert!(loud.members.properties.contains_key("volume"));
            assert!(loud.members.methods.contains_key("shout"));
        }
    }

    mod function_tests {
        use super::*;

        #[test]
        fn functions_and_constants() {
            let file = reflect(
                "<?php\n/**\n * File.\n */\n\n/**\n * Adds.\n * @param int $a First\n */\nfunction add(int $a, $b = 2): int { return $a + $b; }\ndefine('VERSION', '1.0');\ndefine('Acme\\\\DEBUG', false);\n",
            );
            let add = &file.functions[&fqsen("\\add()")];
            assert_eq!(add.info.summary, "Adds.");
            assert_eq!(add.info.line, 10);
            assert_eq!(add.arguments[0].description, "First");
            assert_eq!(add.arguments[1].default.as_deref(), Some("2"));
            assert_eq!(add.return_types, vec!["int".to_string()]);
            assert_eq!(file.constants[&fqsen("\\VERSION")].value, "'1.0'");
            assert!(file.constants.contains_key(&fqsen("\\Acme\\DEBUG")));
        }

        #[test]
        fn bodies_do_not_leak_declarations() {
            let file = reflect(
                "<?php\nfunction outer() {\n    function inner() {}\n    $c = new class { public function hidden() {} };\n}\n$x = Foo::class;\n$f = function () {};\nenum Suit { case Hearts; public function label() {} }\n",
            );
            let names: Vec<&str> = file.functions.keys().map(Fqsen::as_str).collect();
            assert_eq!(names, vec!["\\outer()"]);
            assert!(file.classes.is_empty());
        }

        #[test]
        fn conditional_declarations_are_seen() {
            let file = reflect("<?php\nif (!class_exists('Shim')) {\n    class Shim {}\n}\n");
            assert!(file.classes.contains_key(&fqsen("\\Shim")));
        }

        #[test]
        fn includes() {
            let file = reflect(
                "<?php\nrequire_once 'vendor/autoload.php';\ninclude(__DIR__ . '/x.php');\n",
            );
            assert_eq!(
                file.includes,
                vec!["vendor/autoload.php".to_string(), "__DIR__ . '/x.php'".to_string()]
            );
        }
    }

    mod file_doc_tests {
        use super::*;

        #[test]
        fn first_doc_before_namespace_is_the_file_doc() {
            let file = reflect(
                "<?php\n/**\n * Billing helpers.\n * @package Billing\n */\nnamespace Acme;\n\n/** A class. */\nclass A {}\n",
            );
            assert_eq!(file.summary, "Billing helpers.");
            assert_eq!(file.package.as_deref(), Some("Billing"));
            assert_eq!(file.classes[&fqsen("\\Acme\\A")].info.summary, "A class.");
        }

        #[test]
        fn doc_directly_before_declaration_belongs_to_it() {
            let file = reflect("<?php\n/** A class. */\nclass A {}\n");
            assert!(file.summary.is_empty());
            assert_eq!(file.package, None);
            assert_eq!(file.classes[&fqsen("\\A")].info.summary, "A class.");
        }

        #[test]
        fn two_leading_docs_split_between_file_and_element() {
            let file = reflect("<?php\n/** The file. */\n/** A class. */\nclass A {}\n");
            assert_eq!(file.summary, "The file.");
            assert_eq!(file.classes[&fqsen("\\A")].info.summary, "A class.");
        }

        #[test]
        fn doc_before_plain_statement_is_dropped() {
            let file = reflect("<?php\nclass A {}\n/** Loose. */\n$x = 1;\nclass B {}\n");
            assert!(file.summary.is_empty());
            assert!(file.classes[&fqsen("\\B")].info.summary.is_empty());
        }
    }

    mod error_tests {
        use super::*;

        #[test]
        fn lexer_errors_become_syntax_errors() {
            let err = PhpReflector::new()
                .reflect(&SourceFile::new("bad.php", "<?php\n\n$a = 'open;"))
                .unwrap_err();
            assert!(matches!(
                err,
                ReflectError::Syntax { ref path, line: 3, .. } if path == "bad.php"
            ));
        }

        #[test]
        fn truncated_nowdoc_is_a_syntax_error() {
            let err = PhpReflector::new()
                .reflect(&SourceFile::new("cut.php", "<?php $x = <<<'EOT"))
                .unwrap_err();
            assert!(matches!(err, ReflectError::Syntax { line: 1, .. }));
        }

        #[test]
        fn unclosed_class_is_recorded() {
            let file = reflect("<?php\nclass A {\n    public function a() {}\n");
            assert_eq!(file.errors.len(), 1);
            assert_eq!(file.errors[0].line, 2);
            assert!(file.classes.contains_key(&fqsen("\\A")));
        }

        #[test]
        fn file_identity_comes_from_source() {
            let source = SourceFile::new("src/a.php", "<?php");
            let file = PhpReflector::new().reflect(&source).unwrap();
            assert_eq!(file.path, "src/a.php");
            assert_eq!(file.hash, source.hash);
            assert!(file.source.is_none());
        }
    }
}
