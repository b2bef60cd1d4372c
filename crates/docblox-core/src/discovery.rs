//! Source file discovery.
//!
//! Walks the configured source paths below the project root and returns the
//! project-relative paths (`/` separated, sorted, unique) of files with a
//! documented extension that no ignore pattern matches.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use globset::GlobSet;
use walkdir::WalkDir;

use crate::settings::{ConfigError, Settings};

/// Directories never descended into.
const SKIPPED_DIRS: &[&str] = &[".git", ".svn", ".hg", "node_modules", "vendor"];

/// Files selected for documentation.
#[derive(Debug, Clone)]
pub struct SourceSelection {
    extensions: Vec<String>,
    ignore: GlobSet,
}

impl SourceSelection {
    pub fn new(extensions: &[String], ignore: GlobSet) -> Self {
        SourceSelection {
            extensions: extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            ignore,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        Ok(SourceSelection::new(&settings.extensions, settings.ignore_set()?))
    }

    /// Returns true if the project-relative `path` should be documented.
    pub fn accepts(&self, path: &Path) -> bool {
        let extension_ok = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .is_some_and(|ext| self.extensions.contains(&ext));
        extension_ok && !self.ignore.is_match(path)
    }
}

/// Collect the files below `root` selected by `settings`.
///
/// Source paths are relative to `root`; an empty list means `root` itself.
/// Missing source paths are skipped.
pub fn discover(root: &Path, settings: &Settings) -> Result<Vec<String>, ConfigError> {
    let selection = SourceSelection::from_settings(settings)?;
    let sources: Vec<PathBuf> = if settings.source_paths.is_empty() {
        vec![root.to_path_buf()]
    } else {
        settings.source_paths.iter().map(|p| root.join(p)).collect()
    };

    let mut found = BTreeSet::new();
    for source in &sources {
        for entry in WalkDir::new(source)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0
                    || !(e.file_type().is_dir()
                        && SKIPPED_DIRS.contains(&e.file_name().to_string_lossy().as_ref()))
            })
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            if selection.accepts(relative) {
                found.insert(to_slash(relative));
            }
        }
    }
    Ok(found.into_iter().collect())
}

fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
