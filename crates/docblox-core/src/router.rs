//! URL routing for descriptors.
//!
//! A [`Router`] maps a descriptor to the first [`Rule`] that matches it and
//! lets the rule generate a relative URL. The [`StandardRouter`] lays out the
//! default HTML structure:
//!
//! | Descriptor | URL |
//! |------------|-----|
//! | file `src/Acme/Invoice.php` | `/files/src-Acme-Invoice.html` |
//! | namespace `\Acme\Billing` | `/namespaces/Acme.Billing.html` |
//! | root namespace | `/namespaces/default.html` |
//! | package `\Acme\Billing` | `/packages/Acme.Billing.html` |
//! | class, interface, trait `\Acme\Invoice` | `/classes/Acme.Invoice.html` |
//! | method `\Acme\Invoice::send()` | `/classes/Acme.Invoice.html#method_send` |
//! | property `\Acme\Invoice::$total` | `/classes/Acme.Invoice.html#property_total` |
//! | class constant `\Acme\Invoice::OPEN` | `/classes/Acme.Invoice.html#constant_OPEN` |
//! | function `\Acme\total()` | `/namespaces/Acme.html#function_total` |
//! | constant `\Acme\VERSION` | `/namespaces/Acme.html#constant_VERSION` |
//! | guide document `manual/install` | `/manual/install.html` |
//!
//! A descriptor that no rule matches is a [`DocbloxError::NoRoute`].

use crate::descriptor::{DescriptorView, ElementKind};
use crate::error::{DocbloxError, DocbloxResult};
use crate::fqsen::Fqsen;

type Matcher = Box<dyn Fn(&DescriptorView<'_>) -> bool>;
type Generator = Box<dyn Fn(&DescriptorView<'_>) -> Option<String>>;

/// A routing rule: a predicate plus a URL generator.
pub struct Rule {
    matcher: Matcher,
    generator: Generator,
}

impl Rule {
    pub fn new(
        matcher: impl Fn(&DescriptorView<'_>) -> bool + 'static,
        generator: impl Fn(&DescriptorView<'_>) -> Option<String> + 'static,
    ) -> Self {
        Rule {
            matcher: Box::new(matcher),
            generator: Box::new(generator),
        }
    }

    pub fn matches(&self, view: &DescriptorView<'_>) -> bool {
        (self.matcher)(view)
    }

    /// Generate the URL, `None` when the rule cannot produce one.
    pub fn generate(&self, view: &DescriptorView<'_>) -> Option<String> {
        (self.generator)(view)
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Rule")
    }
}

/// Maps descriptors to URLs.
pub trait Router {
    /// The first rule matching `view`.
    fn match_rule(&self, view: &DescriptorView<'_>) -> Option<&Rule>;

    /// Generate the URL for `view`.
    ///
    /// Fails with [`DocbloxError::NoRoute`] naming the node type when no rule
    /// matches or the matching rule produces nothing.
    fn generate(&self, view: &DescriptorView<'_>) -> DocbloxResult<String> {
        let no_route = || DocbloxError::NoRoute {
            node_type: view.node_type().to_string(),
            name: view.display_name(),
        };
        let rule = self.match_rule(view).ok_or_else(no_route)?;
        rule.generate(view).ok_or_else(no_route)
    }
}

/// Ordered rule list with the default HTML layout.
#[derive(Debug)]
pub struct StandardRouter {
    rules: Vec<Rule>,
}

impl StandardRouter {
    /// Router with the standard rules.
    pub fn new() -> Self {
        let mut router = StandardRouter::empty();
        router.push(Rule::new(
            |v| matches!(v, DescriptorView::File(_)),
            |v| match v {
                DescriptorView::File(file) => Some(file_url(&file.path)),
                _ => None,
            },
        ));
        router.push(Rule::new(
            |v| matches!(v, DescriptorView::Namespace(_)),
            |v| match v {
                DescriptorView::Namespace(node) => Some(namespace_url(&node.full_name)),
                _ => None,
            },
        ));
        router.push(Rule::new(
            |v| matches!(v, DescriptorView::Package(_)),
            |v| match v {
                DescriptorView::Package(node) => Some(format!(
                    "/packages/{}.html",
                    slug(&node.full_name)
                )),
                _ => None,
            },
        ));
        router.push(Rule::new(
            |v| matches!(v, DescriptorView::Element(_)),
            |v| match v {
                DescriptorView::Element(element) => {
                    Some(element_url(element.kind(), element.fqsen()))
                }
                _ => None,
            },
        ));
        router.push(Rule::new(
            |v| matches!(v, DescriptorView::Document(_)),
            |v| match v {
                DescriptorView::Document(document) => Some(format!(
                    "/{}.html",
                    document.path.trim_start_matches('/')
                )),
                _ => None,
            },
        ));
        router.push(Rule::new(
            |v| matches!(v, DescriptorView::Url(_)),
            |v| match v {
                DescriptorView::Url(url) => Some(url.to_string()),
                _ => None,
            },
        ));
        router
    }

    /// Router without rules.
    pub fn empty() -> Self {
        StandardRouter { rules: Vec::new() }
    }

    /// Append a rule (checked after existing rules).
    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Insert a rule ahead of all existing rules.
    pub fn prepend(&mut self, rule: Rule) {
        self.rules.insert(0, rule);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for StandardRouter {
    fn default() -> Self {
        StandardRouter::new()
    }
}

impl Router for StandardRouter {
    fn match_rule(&self, view: &DescriptorView<'_>) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.matches(view))
    }
}

// ============================================================================
// URL helpers
// ============================================================================

/// `\Acme\Billing` → `Acme.Billing`, root → `default`.
fn slug(fqsen: &Fqsen) -> String {
    if fqsen.is_root() {
        return "default".to_string();
    }
    fqsen.segments().collect::<Vec<_>>().join(".")
}

fn namespace_url(fqsen: &Fqsen) -> String {
    format!("/namespaces/{}.html", slug(fqsen))
}

fn class_url(fqsen: &Fqsen) -> String {
    format!("/classes/{}.html", slug(fqsen))
}

fn file_url(path: &str) -> String {
    let path = path.trim_start_matches('/');
    let stem = match path.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !stem.ends_with('/') && !ext.contains('/') => {
            stem
        }
        _ => path,
    };
    format!("/files/{}.html", stem.replace(['/', '\\'], "-"))
}

fn element_url(kind: ElementKind, fqsen: &Fqsen) -> String {
    let name = fqsen.name();
    match (kind, fqsen.owner()) {
        (ElementKind::Class | ElementKind::Interface | ElementKind::Trait, _) => class_url(fqsen),
        (ElementKind::Method, Some(owner)) => format!("{}#method_{}", class_url(&owner), name),
        (ElementKind::Property, Some(owner)) => {
            format!("{}#property_{}", class_url(&owner), name)
        }
        (ElementKind::Constant, Some(owner)) => {
            format!("{}#constant_{}", class_url(&owner), name)
        }
        (ElementKind::Constant, None) => {
            format!("{}#constant_{}", namespace_url(&fqsen.namespace()), name)
        }
        (ElementKind::Function, _) => {
            format!("{}#function_{}", namespace_url(&fqsen.namespace()), name)
        }
        // Members without an owner cannot be placed on a page; fall back to the
        // namespace page.
        (ElementKind::Method | ElementKind::Property, None) => namespace_url(&fqsen.namespace()),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{
        ClassDescriptor, ConstantDescriptor, FileDescriptor, FunctionDescriptor, GuideDocument,
        MethodDescriptor, PropertyDescriptor, Taxonomy, TaxonomyKind,
    };
    use crate::hash::ContentHash;

    fn url(view: DescriptorView<'_>) -> String {
        StandardRouter::new().generate(&view).unwrap()
    }

    #[test]
    fn class_route() {
        let class = ClassDescriptor::new(Fqsen::new("\\NS\\Bar"), 1);
        assert_eq!(url(DescriptorView::Element(&class)), "/classes/NS.Bar.html");
    }

    #[test]
    fn member_routes_use_owner_page() {
        let owner = Fqsen::new("\\Acme\\Invoice");
        let method = MethodDescriptor::new(&owner, "send", 1);
        let property = PropertyDescriptor::new(&owner, "total", 1);
        let constant = ConstantDescriptor::member(&owner, "OPEN", 1);
        assert_eq!(
            url(DescriptorView::Element(&method)),
            "/classes/Acme.Invoice.html#method_send"
        );
        assert_eq!(
            url(DescriptorView::Element(&property)),
            "/classes/Acme.Invoice.html#property_total"
        );
        assert_eq!(
            url(DescriptorView::Element(&constant)),
            "/classes/Acme.Invoice.html#constant_OPEN"
        );
    }

    #[test]
    fn functions_and_constants_live_on_namespace_page() {
        let function = FunctionDescriptor::new(Fqsen::new("\\Acme\\total()"), 1);
        let constant = ConstantDescriptor::new(Fqsen::new("\\VERSION"), 1);
        assert_eq!(
            url(DescriptorView::Element(&function)),
            "/namespaces/Acme.html#function_total"
        );
        assert_eq!(
            url(DescriptorView::Element(&constant)),
            "/namespaces/default.html#constant_VERSION"
        );
    }

    #[test]
    fn taxonomy_and_file_routes() {
        let mut namespaces = Taxonomy::new(TaxonomyKind::Namespace);
        let (id, _) = namespaces.ensure(&Fqsen::new("\\My\\Space"));
        let node = namespaces.get(id).unwrap();
        assert_eq!(url(DescriptorView::Namespace(node)), "/namespaces/My.Space.html");
        assert_eq!(url(DescriptorView::Package(node)), "/packages/My.Space.html");
        assert_eq!(
            url(DescriptorView::Namespace(namespaces.root())),
            "/namespaces/default.html"
        );

        let file = FileDescriptor::new("src/Acme/Invoice.php", ContentHash::compute(b""));
        assert_eq!(url(DescriptorView::File(&file)), "/files/src-Acme-Invoice.html");

        let document = GuideDocument {
            path: "manual/install".to_string(),
            title: "Install".to_string(),
            toc: Vec::new(),
        };
        assert_eq!(url(DescriptorView::Document(&document)), "/manual/install.html");
        assert_eq!(url(DescriptorView::Url("https://example.com")), "https://example.com");
    }

    #[test]
    fn no_rule_is_an_error_naming_the_node_type() {
        let router = StandardRouter::empty();
        let mut namespaces = Taxonomy::new(TaxonomyKind::Namespace);
        let (id, _) = namespaces.ensure(&Fqsen::new("\\Acme"));
        let view = DescriptorView::Namespace(namespaces.get(id).unwrap());

        let err = router.generate(&view).unwrap_err();
        match err {
            DocbloxError::NoRoute { node_type, name } => {
                assert_eq!(node_type, "namespace");
                assert_eq!(name, "\\Acme");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn prepended_rules_win() {
        let mut router = StandardRouter::new();
        router.prepend(Rule::new(
            |v| matches!(v, DescriptorView::Element(_)),
            |_| Some("/custom.html".to_string()),
        ));
        let class = ClassDescriptor::new(Fqsen::new("\\NS\\Bar"), 1);
        assert_eq!(
            router.generate(&DescriptorView::Element(&class)).unwrap(),
            "/custom.html"
        );
    }
}
