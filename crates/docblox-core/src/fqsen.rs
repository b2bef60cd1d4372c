//! Fully Qualified Structural Element Names.
//!
//! An FQSEN uniquely identifies a named element within a documentation set.
//! The textual forms are:
//!
//! | Element | Example |
//! |---------|---------|
//! | Namespace | `\Acme\Billing` |
//! | Class / Interface / Trait | `\Acme\Billing\Invoice` |
//! | Function | `\Acme\Billing\total()` |
//! | Constant | `\Acme\Billing\VERSION` |
//! | Method | `\Acme\Billing\Invoice::send()` |
//! | Property | `\Acme\Billing\Invoice::$amount` |
//! | Class constant | `\Acme\Billing\Invoice::STATUS_OPEN` |
//!
//! The root namespace is `\`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Namespace separator.
pub const SEPARATOR: char = '\\';

/// Separator between a container and one of its members.
pub const MEMBER_SEPARATOR: &str = "::";

/// Kind of a container member, used to render member FQSENs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Method,
    Property,
    Constant,
}

/// A fully qualified structural element name.
///
/// Always starts with `\`. Construction normalizes surrounding whitespace and
/// adds the leading separator when missing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fqsen(String);

impl Fqsen {
    /// Create an FQSEN from its textual form.
    pub fn new(value: impl AsRef<str>) -> Self {
        let value = value.as_ref().trim();
        if value.starts_with(SEPARATOR) {
            Fqsen(value.to_string())
        } else {
            Fqsen(format!("{}{}", SEPARATOR, value))
        }
    }

    /// The root namespace (`\`).
    pub fn root() -> Self {
        Fqsen(SEPARATOR.to_string())
    }

    /// Build the FQSEN of a member of `owner`.
    pub fn member(owner: &Fqsen, kind: MemberKind, name: &str) -> Self {
        let name = name.trim_start_matches('$').trim_end_matches("()");
        let member = match kind {
            MemberKind::Method => format!("{}()", name),
            MemberKind::Property => format!("${}", name),
            MemberKind::Constant => name.to_string(),
        };
        Fqsen(format!("{}{}{}", owner.0, MEMBER_SEPARATOR, member))
    }

    /// Append a name to this FQSEN treated as a namespace.
    pub fn join(&self, name: &str) -> Self {
        let name = name.trim_matches(SEPARATOR);
        if self.is_root() {
            Fqsen(format!("{}{}", SEPARATOR, name))
        } else {
            Fqsen(format!("{}{}{}", self.0, SEPARATOR, name))
        }
    }

    /// The textual form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for the root namespace.
    pub fn is_root(&self) -> bool {
        self.0.len() == 1
    }

    /// Returns true if this names a member of a class, interface or trait.
    pub fn is_member(&self) -> bool {
        self.0.contains(MEMBER_SEPARATOR)
    }

    /// The container of a member FQSEN.
    pub fn owner(&self) -> Option<Fqsen> {
        self.0
            .split_once(MEMBER_SEPARATOR)
            .map(|(owner, _)| Fqsen(owner.to_string()))
    }

    /// The short name, without sigils or call parentheses.
    pub fn name(&self) -> &str {
        let tail = match self.0.split_once(MEMBER_SEPARATOR) {
            Some((_, member)) => member.trim_start_matches('$'),
            None => self.0.rsplit(SEPARATOR).next().unwrap_or_default(),
        };
        tail.trim_end_matches("()")
    }

    /// The namespace this element is declared in.
    ///
    /// For members this is the namespace of the container; the namespace of
    /// the root is the root itself.
    pub fn namespace(&self) -> Fqsen {
        if let Some(owner) = self.owner() {
            return owner.namespace();
        }
        match self.0.rfind(SEPARATOR) {
            Some(0) | None => Fqsen::root(),
            Some(idx) => Fqsen(self.0[..idx].to_string()),
        }
    }

    /// Parent namespace, `None` for the root.
    pub fn parent(&self) -> Option<Fqsen> {
        if self.is_root() {
            None
        } else {
            Some(self.namespace())
        }
    }

    /// Namespace path segments, skipping the root.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR).filter(|s| !s.is_empty())
    }
}

impl fmt::Display for Fqsen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Fqsen {
    fn from(value: &str) -> Self {
        Fqsen::new(value)
    }
}

// ============================================================================
// Tests
// ============================================================================
