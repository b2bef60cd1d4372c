//! Name resolution against the `elements` index.
//!
//! Doc-block references are written relative to the place they appear in:
//! `Bar`, `Sub\Bar`, `Aliased`, `self::run()`, `$this->name`, `\Fully\Qualified`.
//! [`DescriptorRepository::find_alias`] expands such a name with the element's
//! namespace, its file's `use` aliases and its container, and looks the
//! candidates up in the `elements` index in order.

use std::collections::BTreeMap;

use crate::descriptor::{ApiSetDescriptor, DescriptorRef, ElementKind, FileDescriptor};
use crate::fqsen::{Fqsen, MEMBER_SEPARATOR, SEPARATOR};

/// Where a name is being resolved from.
#[derive(Debug, Clone)]
pub struct ResolutionContext<'a> {
    /// Namespace of the element carrying the reference.
    pub namespace: Fqsen,
    /// `use` aliases of the file carrying the reference.
    pub aliases: Option<&'a BTreeMap<String, Fqsen>>,
    /// Class, interface or trait the reference appears in, if any.
    pub container: Option<Fqsen>,
}

impl<'a> ResolutionContext<'a> {
    /// Context of the element `fqsen` of kind `kind` declared in `file`.
    pub fn for_element(file: &'a FileDescriptor, kind: ElementKind, fqsen: &Fqsen) -> Self {
        let container = if kind.is_container() {
            Some(fqsen.clone())
        } else {
            fqsen.owner()
        };
        ResolutionContext {
            namespace: fqsen.namespace(),
            aliases: Some(&file.namespace_aliases),
            container,
        }
    }

    /// Context with only a namespace.
    pub fn in_namespace(namespace: Fqsen) -> Self {
        ResolutionContext {
            namespace,
            aliases: None,
            container: None,
        }
    }

    fn alias(&self, name: &str) -> Option<&Fqsen> {
        let aliases = self.aliases?;
        aliases.get(name).or_else(|| {
            aliases
                .iter()
                .find(|(alias, _)| alias.eq_ignore_ascii_case(name))
                .map(|(_, target)| target)
        })
    }
}

/// Outcome of resolving a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Found in the `elements` index under `key`.
    Resolved { key: String, reference: DescriptorRef },
    /// Not found; carries the fully qualified reading of the name.
    Unresolved(Fqsen),
}

impl Resolution {
    /// The FQSEN text: the index key when resolved, the expansion otherwise.
    pub fn fqsen_text(&self) -> &str {
        match self {
            Resolution::Resolved { key, .. } => key.trim_start_matches('~'),
            Resolution::Unresolved(fqsen) => fqsen.as_str(),
        }
    }

    pub fn reference(&self) -> Option<&DescriptorRef> {
        match self {
            Resolution::Resolved { reference, .. } => Some(reference),
            Resolution::Unresolved(_) => None,
        }
    }
}

/// Read access to an API set for name lookups.
#[derive(Debug, Clone, Copy)]
pub struct DescriptorRepository<'a> {
    set: &'a ApiSetDescriptor,
}

impl<'a> DescriptorRepository<'a> {
    pub fn new(set: &'a ApiSetDescriptor) -> Self {
        DescriptorRepository { set }
    }

    /// Resolve `name` as seen from `context`.
    pub fn find_alias(&self, name: &str, context: &ResolutionContext<'_>) -> Resolution {
        let candidates = candidates(name, context);
        for candidate in &candidates {
            if let Some(reference) = self.set.lookup(candidate) {
                return Resolution::Resolved {
                    key: candidate.clone(),
                    reference: reference.clone(),
                };
            }
        }
        // Namespaces are indexed with a `~` prefix.
        for candidate in &candidates {
            let key = format!("~{}", candidate);
            if let Some(reference) = self.set.lookup(&key) {
                return Resolution::Resolved {
                    key,
                    reference: reference.clone(),
                };
            }
        }
        Resolution::Unresolved(primary(name, context))
    }

    /// Look up an already fully qualified name.
    pub fn find_fqsen(&self, fqsen: &str) -> Option<&'a DescriptorRef> {
        self.set.lookup(Fqsen::new(fqsen).as_str())
    }
}

// ============================================================================
// Candidate generation
// ============================================================================

const PSEUDO_TYPES: &[&str] = &["self", "static", "$this"];

/// Replace `self`, `static` and `$this` with the container and normalize
/// `->` member access to `::`.
fn substitute_pseudo_types(name: &str, context: &ResolutionContext<'_>) -> String {
    let name = name.replace("->", MEMBER_SEPARATOR);
    let Some(container) = &context.container else {
        return name;
    };
    let (head, tail) = match name.split_once(MEMBER_SEPARATOR) {
        Some((head, tail)) => (head, Some(tail)),
        None => (name.as_str(), None),
    };
    if !PSEUDO_TYPES.contains(&head.to_ascii_lowercase().as_str()) {
        return name;
    }
    match tail {
        Some(tail) => format!("{}{}{}", container, MEMBER_SEPARATOR, tail),
        None => container.to_string(),
    }
}

/// Qualified readings of a class-like name, best first.
fn qualify(name: &str, context: &ResolutionContext<'_>) -> Vec<String> {
    if name.starts_with(SEPARATOR) {
        return vec![name.to_string()];
    }
    let (first, rest) = match name.split_once(SEPARATOR) {
        Some((first, rest)) => (first, Some(rest)),
        None => (name, None),
    };
    if let Some(target) = context.alias(first) {
        return match rest {
            Some(rest) => vec![target.join(rest).to_string()],
            None => vec![target.to_string()],
        };
    }
    let mut out = vec![context.namespace.join(name).to_string()];
    if !context.namespace.is_root() {
        out.push(Fqsen::root().join(name).to_string());
    }
    out
}

/// Member spellings to try for a member name written without sigils.
fn member_variants(member: &str) -> Vec<String> {
    if member.ends_with("()") || member.starts_with('$') {
        return vec![member.to_string()];
    }
    vec![
        member.to_string(),
        format!("{}()", member),
        format!("${}", member),
    ]
}

fn is_member_like(name: &str) -> bool {
    !name.contains(SEPARATOR) && (name.ends_with("()") || name.starts_with('$'))
}

/// Index keys to try for `name`, best first.
fn candidates(name: &str, context: &ResolutionContext<'_>) -> Vec<String> {
    let name = substitute_pseudo_types(name.trim(), context);
    let mut out = Vec::new();

    if let Some((class, member)) = name.split_once(MEMBER_SEPARATOR) {
        for owner in qualify(class, context) {
            for variant in member_variants(member) {
                out.push(format!("{}{}{}", owner, MEMBER_SEPARATOR, variant));
            }
        }
        return out;
    }

    // A bare `run()` or `$name` first refers to the surrounding container.
    if let Some(container) = &context.container {
        if is_member_like(&name) {
            out.push(format!("{}{}{}", container, MEMBER_SEPARATOR, name));
        }
    }
    out.extend(qualify(&name, context));
    out
}

/// The fully qualified reading of `name` used when nothing matches.
fn primary(name: &str, context: &ResolutionContext<'_>) -> Fqsen {
    let name = substitute_pseudo_types(name.trim(), context);
    if let Some((class, member)) = name.split_once(MEMBER_SEPARATOR) {
        let owner = qualify(class, context)
            .into_iter()
            .next()
            .unwrap_or_else(|| class.to_string());
        return Fqsen::new(format!("{}{}{}", owner, MEMBER_SEPARATOR, member));
    }
    qualify(&name, context)
        .into_iter()
        .next()
        .map(Fqsen::new)
        .unwrap_or_else(|| Fqsen::new(&name))
}

// ============================================================================
// Tests
// ============================================================================
