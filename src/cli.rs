//! Command implementations behind the `docblox` binary.
//!
//! - `parse` - reflect the project's sources and refresh the cache
//! - `run` - parse, compile and export the project structure as JSON
//! - `cache status` / `cache clear` - inspect or drop the on-disk cache
//! - `config` - show the resolved configuration with value sources
//!
//! Every function takes the project root and the CLI overrides, resolves the
//! configuration itself and returns the JSON document to print. Errors are
//! `DocbloxError`s, which the binary maps to exit codes.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::info;

use docblox_core::builder::{ProjectBuilder, API_SET_NAME};
use docblox_core::cache::{CacheStore, FileCache};
use docblox_core::discovery::discover;
use docblox_core::error::DocbloxError;
use docblox_core::observer::{BuildEvent, BuildObserver, TracingObserver};
use docblox_core::settings::{CliOverrides, ResolvedConfig, Settings, CONFIG_FILE_NAME};
use docblox_php::PhpReflector;

use crate::output::{
    collect_problems, element_count, to_json, CacheClearResponse, CacheStatusResponse,
    ConfigResponse, FileProblem, ParseResponse, ProjectExport, RunResponse, SCHEMA_VERSION,
};

// ============================================================================
// Observer
// ============================================================================

/// Logs through `tracing` and remembers files that failed to reflect.
#[derive(Debug, Default)]
struct CliObserver {
    failures: RefCell<Vec<FileProblem>>,
}

impl CliObserver {
    fn failures(&self) -> Vec<FileProblem> {
        self.failures.borrow().clone()
    }
}

impl BuildObserver for CliObserver {
    fn event(&self, event: BuildEvent) {
        if let BuildEvent::FileFailed { path, message } = &event {
            self.failures
                .borrow_mut()
                .push(FileProblem::file(path, message));
        }
        TracingObserver.event(event);
    }

    fn pass_finished(&self, description: &str, elapsed: Duration) {
        TracingObserver.pass_finished(description, elapsed);
    }
}

// ============================================================================
// Configuration
// ============================================================================

fn check_root(root: &Path) -> Result<(), DocbloxError> {
    if root.is_dir() {
        Ok(())
    } else {
        Err(DocbloxError::invalid_args(format!(
            "project root '{}' is not a directory",
            root.display()
        )))
    }
}

/// Resolve and validate the effective settings for `root`.
pub fn resolve_settings(root: &Path, overrides: &CliOverrides) -> Result<Settings, DocbloxError> {
    check_root(root)?;
    let config = ResolvedConfig::resolve(root, overrides)?;
    config.to_settings().map_err(DocbloxError::from)
}

/// Show the resolved configuration.
pub fn show_config(root: &Path, overrides: &CliOverrides) -> Result<String, DocbloxError> {
    check_root(root)?;
    let config = ResolvedConfig::resolve(root, overrides)?;
    // Reject values the build would reject.
    config.to_settings()?;

    let config_path = overrides
        .config_file
        .clone()
        .unwrap_or_else(|| root.join(CONFIG_FILE_NAME));
    let config_file = config_path
        .exists()
        .then(|| config_path.display().to_string());
    to_json(&ConfigResponse::new(config_file, config))
}

// ============================================================================
// Build Commands
// ============================================================================

/// Reflect every source file and refresh the cache without compiling.
pub fn run_parse(
    root: &Path,
    overrides: &CliOverrides,
    use_cache: bool,
) -> Result<String, DocbloxError> {
    let settings = resolve_settings(root, overrides)?;
    let reflector = PhpReflector::new();
    let observer = CliObserver::default();
    let builder = ProjectBuilder::new(root, settings, &reflector, &observer);

    let paths = discover(root, builder.settings())?;
    let store = CacheStore::new(builder.cache_dir());
    let mut cache = if use_cache {
        store.load(API_SET_NAME)?
    } else {
        FileCache::new()
    };

    let (set, mut report) = builder.collect(&paths, &mut cache);
    if use_cache {
        report.cache = Some(store.save(API_SET_NAME, &mut cache)?.into());
    }
    info!(
        parsed = report.parsed,
        skipped = report.skipped,
        failed = report.failed,
        "parse finished"
    );

    let problems = collect_problems(&set, &observer.failures());
    to_json(&ParseResponse::new(report, problems))
}

/// Parse, compile and export the project.
///
/// With `output`, the structure is written there and the response only
/// names the file; otherwise it is embedded in the response.
pub fn run_build(
    root: &Path,
    overrides: &CliOverrides,
    use_cache: bool,
    output: Option<&Path>,
) -> Result<String, DocbloxError> {
    let settings = resolve_settings(root, overrides)?;
    let reflector = PhpReflector::new();
    let observer = CliObserver::default();
    let mut builder = ProjectBuilder::new(root, settings, &reflector, &observer);
    if !use_cache {
        builder = builder.without_cache();
    }

    let outcome = builder.build()?;
    let project = &outcome.project;
    let mut problems = Vec::new();
    for set in project.api_sets() {
        problems.extend(collect_problems(set, &[]));
    }
    problems.extend(observer.failures());
    problems.sort_by(|a, b| (&a.path, a.line).cmp(&(&b.path, b.line)));

    let export = ProjectExport::new(project);
    let (output, project_export) = match output {
        Some(path) => {
            write_export(path, &export)?;
            info!(output = %path.display(), "wrote project structure");
            (Some(path.display().to_string()), None)
        }
        None => (None, Some(export)),
    };

    let response = RunResponse {
        status: "ok".to_string(),
        schema_version: SCHEMA_VERSION.to_string(),
        title: &project.title,
        report: outcome.report.clone(),
        elements: element_count(project),
        problems,
        output,
        project: project_export,
    };
    to_json(&response)
}

fn write_export(path: &Path, export: &ProjectExport<'_>) -> Result<(), DocbloxError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, to_json(export)?)?;
    Ok(())
}

// ============================================================================
// Cache Commands
// ============================================================================

fn cache_store(
    root: &Path,
    overrides: &CliOverrides,
) -> Result<(PathBuf, CacheStore), DocbloxError> {
    let settings = resolve_settings(root, overrides)?;
    let dir = root.join(&settings.cache_dir);
    Ok((dir.clone(), CacheStore::new(dir)))
}

/// Report what the on-disk cache holds.
pub fn cache_status(root: &Path, overrides: &CliOverrides) -> Result<String, DocbloxError> {
    let (dir, store) = cache_store(root, overrides)?;
    let manifest = store.manifest()?;
    to_json(&CacheStatusResponse::new(
        dir.display().to_string(),
        manifest.as_ref(),
    ))
}

/// Remove the on-disk cache.
pub fn cache_clear(root: &Path, overrides: &CliOverrides) -> Result<String, DocbloxError> {
    let (dir, store) = cache_store(root, overrides)?;
    let removed = store.clear()?;
    info!(cache_dir = %dir.display(), removed, "cleared cache");
    to_json(&CacheClearResponse::new(dir.display().to_string(), removed))
}

// ============================================================================
// Tests
// ============================================================================
