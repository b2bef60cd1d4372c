//! Builds the package tree.

use std::collections::BTreeMap;

use super::namespace_tree::TOP_LEVEL_INDEXES;
use super::{CompilerPass, PassContext};
use crate::descriptor::{
    ApiSetDescriptor, DescriptorRef, ElementRef, FileId, Project, Tags, INDEX_ELEMENTS,
    INDEX_PACKAGES,
};
use crate::error::DocbloxResult;
use crate::fqsen::Fqsen;

/// Groups files and top-level elements by package.
///
/// An element's package is its `@package` tag (joined with `@subpackage`),
/// else the package of its file, else the configured default package. Nodes
/// are registered in `packages` under their full name and in `elements`
/// under `@` + their full name.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackageTreeBuilder;

impl CompilerPass for PackageTreeBuilder {
    fn description(&self) -> &'static str {
        "Build \"packages\" index"
    }

    fn priority(&self) -> i32 {
        8900
    }

    fn execute(&self, project: &mut Project, _context: &PassContext<'_>) -> DocbloxResult<()> {
        let (settings, versions) = project.parts_mut();
        for version in versions {
            for set in version.api_sets_mut() {
                build_package_tree(set, &settings.default_package_name);
            }
        }
        Ok(())
    }
}

/// Turn old-style package separators into `\` and drop everything that is
/// not alphanumeric: `My_Package.Sub` becomes `My\Package\Sub`.
pub fn normalize_package_name(name: &str) -> String {
    let replaced: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '.' | '_' | '-' | '[' | ']' => '\\',
            c => c,
        })
        .collect();
    replaced
        .trim_end_matches('\\')
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '\\')
        .collect()
}

/// Package named by `@package` / `@subpackage`, if any.
fn tagged_package(tags: &Tags) -> Option<String> {
    let package = tags
        .get("package")
        .first()
        .map(|tag| normalize_package_name(&tag.description))
        .unwrap_or_default();
    let subpackage = tags
        .get("subpackage")
        .first()
        .map(|tag| normalize_package_name(&tag.description));
    let name = match subpackage {
        Some(sub) => format!("{}\\{}", package, sub),
        None => package,
    };
    let name = name.trim_matches('\\').to_string();
    (!name.is_empty()).then_some(name)
}

fn package_fqsen(name: &str) -> Fqsen {
    Fqsen::new(format!("\\{}", name.trim_start_matches('\\')))
}

fn build_package_tree(set: &mut ApiSetDescriptor, default_package: &str) {
    let default_package = {
        let normalized = normalize_package_name(default_package);
        if normalized.is_empty() {
            default_package.to_string()
        } else {
            normalized
        }
    };

    // File packages first: elements fall back to them.
    let mut file_packages: BTreeMap<FileId, String> = BTreeMap::new();
    for (id, file) in set.files() {
        let package = tagged_package(&file.tags)
            .or_else(|| file.package.as_deref().map(normalize_package_name))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| default_package.clone());
        file_packages.insert(id, package);
    }

    let mut element_packages: Vec<(ElementRef, String)> = Vec::new();
    for name in TOP_LEVEL_INDEXES {
        let Some(index) = set.indexes.get(name) else {
            continue;
        };
        for element in index.values().filter_map(DescriptorRef::as_element) {
            let Some(descriptor) = set.element(element) else {
                continue;
            };
            let file_package = file_packages.get(&element.file).cloned();
            let package = tagged_package(descriptor.tags())
                .or_else(|| {
                    descriptor
                        .info()
                        .package
                        .as_deref()
                        .map(normalize_package_name)
                        .filter(|name| !name.is_empty())
                })
                .or(file_package)
                .unwrap_or_else(|| default_package.clone());
            element_packages.push((element.clone(), package));
        }
    }

    for (id, package) in file_packages {
        let (node, _) = set.packages.ensure(&package_fqsen(&package));
        let path = set.file(id).map(|f| f.path.clone());
        if let (Some(node), Some(path)) = (set.packages.get_mut(node), path) {
            node.files.insert(path, id);
        }
        if let Some(file) = set.file_mut(id) {
            if file.package.as_deref() != Some(package.as_str()) {
                file.package = Some(package);
            }
        }
    }

    for (element, package) in element_packages {
        let (node, _) = set.packages.ensure(&package_fqsen(&package));
        if let Some(node) = set.packages.get_mut(node) {
            node.attach(element.clone());
        }
        let unchanged = set
            .element(&element)
            .is_some_and(|e| e.info().package.as_deref() == Some(package.as_str()));
        if !unchanged {
            if let Some(descriptor) = set.element_mut(&element) {
                descriptor.info_mut().package = Some(package);
            }
        }
    }

    let nodes: Vec<(String, DescriptorRef)> = set
        .packages
        .nodes()
        .map(|node| (node.full_name.to_string(), DescriptorRef::Package(node.id)))
        .collect();
    for (full_name, reference) in nodes {
        set.indexes
            .fetch(INDEX_ELEMENTS)
            .insert(format!("@{}", full_name), reference.clone());
        set.indexes.fetch(INDEX_PACKAGES).insert(full_name, reference);
    }
}
