//! Builds tables of contents.

use std::collections::BTreeSet;

use super::{CompilerPass, PassContext};
use crate::descriptor::{
    ApiSetDescriptor, DescriptorView, DocumentationSet, Entry, GuideSetDescriptor, NodeId,
    Project, Taxonomy, TaxonomyKind, TocDescriptor,
};
use crate::error::DocbloxResult;
use crate::observer::BuildObserver;
use crate::router::Router;

/// Name of the guide document whose table of contents seeds the guide TOC.
const GUIDE_INDEX: &str = "index";

/// Builds the "Namespaces" and "Packages" tables of contents of every API set
/// and the table of contents of every guide set.
///
/// Entry URLs are router URLs without the leading `/`; an entry's parent is
/// the URL of its parent entry. Top-level nodes have no parent.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableOfContentsBuilder;

impl CompilerPass for TableOfContentsBuilder {
    fn description(&self) -> &'static str {
        "Builds table of contents for api documentation sets"
    }

    fn priority(&self) -> i32 {
        7000
    }

    fn execute(&self, project: &mut Project, context: &PassContext<'_>) -> DocbloxResult<()> {
        let (_, versions) = project.parts_mut();
        for version in versions {
            for set in &mut version.sets {
                match set {
                    DocumentationSet::Api(api) => build_api_tocs(api, context.router)?,
                    DocumentationSet::Guide(guide) => {
                        build_guide_toc(guide, context.router, context.observer)?
                    }
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// API sets
// ============================================================================

fn build_api_tocs(set: &mut ApiSetDescriptor, router: &dyn Router) -> DocbloxResult<()> {
    let mut tocs = Vec::new();
    for (name, taxonomy) in [("Namespaces", &set.namespaces), ("Packages", &set.packages)] {
        if taxonomy.is_empty() {
            continue;
        }
        let mut toc = TocDescriptor::new(name);
        for child in taxonomy.children(NodeId::ROOT) {
            add_node_entries(taxonomy, child.id, None, router, &mut toc)?;
        }
        tocs.push(toc);
    }
    for toc in tocs {
        set.add_table_of_contents(toc);
    }
    Ok(())
}

fn node_view(taxonomy: &Taxonomy, id: NodeId) -> Option<DescriptorView<'_>> {
    let node = taxonomy.get(id)?;
    Some(match taxonomy.kind() {
        TaxonomyKind::Namespace => DescriptorView::Namespace(node),
        TaxonomyKind::Package => DescriptorView::Package(node),
    })
}

fn add_node_entries(
    taxonomy: &Taxonomy,
    id: NodeId,
    parent: Option<&str>,
    router: &dyn Router,
    toc: &mut TocDescriptor,
) -> DocbloxResult<()> {
    let Some(view) = node_view(taxonomy, id) else {
        return Ok(());
    };
    let url = router.generate(&view)?.trim_start_matches('/').to_string();
    toc.add_entry(Entry::new(
        url.clone(),
        view.display_name(),
        parent.map(str::to_string),
    ));
    for child in taxonomy.children(id) {
        add_node_entries(taxonomy, child.id, Some(&url), router, toc)?;
    }
    Ok(())
}

// ============================================================================
// Guide sets
// ============================================================================

fn build_guide_toc(
    set: &mut GuideSetDescriptor,
    router: &dyn Router,
    observer: &dyn BuildObserver,
) -> DocbloxResult<()> {
    let Some(index) = set.documents.get(GUIDE_INDEX) else {
        return Ok(());
    };
    let mut toc = TocDescriptor::new(index.title.clone());
    let mut visited = BTreeSet::from([GUIDE_INDEX.to_string()]);
    add_guide_entries(set, GUIDE_INDEX, None, router, observer, &mut visited, &mut toc)?;
    set.add_table_of_contents(toc);
    Ok(())
}

fn add_guide_entries(
    set: &GuideSetDescriptor,
    path: &str,
    parent: Option<&str>,
    router: &dyn Router,
    observer: &dyn BuildObserver,
    visited: &mut BTreeSet<String>,
    toc: &mut TocDescriptor,
) -> DocbloxResult<()> {
    let Some(document) = set.documents.get(path) else {
        return Ok(());
    };
    for listed in &document.toc {
        let key = listed.trim_start_matches('/');
        let Some(child) = set.documents.get(key) else {
            observer.error(&format!("Toc contains a link to a missing document {}", listed));
            continue;
        };
        // A document listed by one of its own descendants would recurse forever.
        if !visited.insert(key.to_string()) {
            continue;
        }
        let url = format!(
            "guide/{}",
            router
                .generate(&DescriptorView::Document(child))?
                .trim_start_matches('/')
        );
        toc.add_entry(Entry::new(
            url.clone(),
            child.title.clone(),
            parent.map(str::to_string),
        ));
        add_guide_entries(set, key, Some(&url), router, observer, visited, toc)?;
    }
    Ok(())
}
