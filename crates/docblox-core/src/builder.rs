//! End-to-end project build.
//!
//! [`ProjectBuilder::build`] runs one documentation build:
//!
//! 1. Discover source files under the configured source paths.
//! 2. Load the incremental cache and gate every file on its content hash.
//!    Unchanged files reuse the cached descriptor; changed and new files go
//!    through the [`FileReflector`]. A file that cannot be read or reflected
//!    is reported and left out.
//! 3. Persist the cache (before compiling, so the cache only ever holds raw
//!    reflector output).
//! 4. Run the [`Compiler`] over the assembled project.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::cache::{CacheStore, FileCache, GateDecision, SaveStats};
use crate::compiler::{Compiler, PassContext};
use crate::descriptor::{ApiSetDescriptor, DocumentationSet, Project, VersionDescriptor};
use crate::discovery::discover;
use crate::error::DocbloxResult;
use crate::example::{ExampleFinder, FsExampleFinder};
use crate::observer::BuildObserver;
use crate::reflector::{FileReflector, SourceFile};
use crate::router::{Router, StandardRouter};
use crate::settings::Settings;

/// Name of the API set built from the source paths; also its cache key.
pub const API_SET_NAME: &str = "api";

/// Version number given to the built project.
pub const DEFAULT_VERSION: &str = "latest";

/// Counters for one build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    /// Files found by discovery.
    pub discovered: usize,
    /// Files run through the reflector.
    pub parsed: usize,
    /// Files taken from the cache.
    pub skipped: usize,
    /// Files that could not be read or reflected.
    pub failed: usize,
    /// Cache entries dropped because their file is gone.
    pub removed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheReport>,
}

/// What happened to the persisted cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheReport {
    pub written: usize,
    pub kept: usize,
    pub collected: usize,
}

impl From<SaveStats> for CacheReport {
    fn from(stats: SaveStats) -> Self {
        CacheReport {
            written: stats.written,
            kept: stats.kept,
            collected: stats.collected,
        }
    }
}

/// Result of a successful build.
#[derive(Debug)]
pub struct BuildOutcome {
    pub project: Project,
    pub report: BuildReport,
}

/// Runs builds for one project root.
pub struct ProjectBuilder<'a> {
    root: PathBuf,
    settings: Settings,
    reflector: &'a dyn FileReflector,
    observer: &'a dyn BuildObserver,
    router: Box<dyn Router>,
    examples: Box<dyn ExampleFinder>,
    compiler: Compiler,
    persist_cache: bool,
}

impl<'a> ProjectBuilder<'a> {
    /// Builder with the standard router, compiler and example lookup.
    pub fn new(
        root: impl Into<PathBuf>,
        settings: Settings,
        reflector: &'a dyn FileReflector,
        observer: &'a dyn BuildObserver,
    ) -> Self {
        let root = root.into();
        let examples = default_example_finder(&root, &settings);
        ProjectBuilder {
            root,
            settings,
            reflector,
            observer,
            router: Box::new(StandardRouter::new()),
            examples: Box::new(examples),
            compiler: Compiler::new(),
            persist_cache: true,
        }
    }

    pub fn with_router(mut self, router: Box<dyn Router>) -> Self {
        self.router = router;
        self
    }

    pub fn with_examples(mut self, examples: Box<dyn ExampleFinder>) -> Self {
        self.examples = examples;
        self
    }

    pub fn with_compiler(mut self, compiler: Compiler) -> Self {
        self.compiler = compiler;
        self
    }

    /// Neither read nor write the on-disk cache.
    pub fn without_cache(mut self) -> Self {
        self.persist_cache = false;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The cache directory, resolved against the project root.
    pub fn cache_dir(&self) -> PathBuf {
        self.root.join(&self.settings.cache_dir)
    }

    /// Run a full build.
    pub fn build(&self) -> DocbloxResult<BuildOutcome> {
        let paths = discover(&self.root, &self.settings)?;
        let store = CacheStore::new(self.cache_dir());
        let mut cache = if self.persist_cache {
            store.load(API_SET_NAME)?
        } else {
            FileCache::new()
        };

        let (set, mut report) = self.collect(&paths, &mut cache);
        if self.persist_cache {
            report.cache = Some(store.save(API_SET_NAME, &mut cache)?.into());
        }

        let project = self.compile(set)?;
        Ok(BuildOutcome { project, report })
    }

    /// Assemble the API set for `paths`, consulting and updating `cache`.
    ///
    /// Cache entries for paths not in `paths` are dropped.
    pub fn collect(
        &self,
        paths: &[String],
        cache: &mut FileCache,
    ) -> (ApiSetDescriptor, BuildReport) {
        let mut set = ApiSetDescriptor::new(API_SET_NAME);
        let mut report = BuildReport {
            discovered: paths.len(),
            ..BuildReport::default()
        };

        for path in paths {
            let source = match SourceFile::read(&self.root, path) {
                Ok(source) => source,
                Err(e) => {
                    self.observer.file_failed(path, &e.to_string());
                    cache.remove(path);
                    report.failed += 1;
                    continue;
                }
            };

            match cache.gate(path, &source.hash, self.settings.force) {
                GateDecision::Unchanged(cached) => {
                    self.observer.file_skipped(path);
                    set.add_file(cached);
                    report.skipped += 1;
                }
                GateDecision::Changed => match self.reflector.reflect(&source) {
                    Ok(mut file) => {
                        file.path = source.path.clone();
                        file.hash = source.hash.clone();
                        file.source = Some(source.content);
                        let file = Arc::new(file);
                        cache.insert(Arc::clone(&file));
                        set.add_file(file);
                        self.observer.file_parsed(path);
                        report.parsed += 1;
                    }
                    Err(e) => {
                        self.observer.file_failed(path, &e.to_string());
                        cache.remove(path);
                        report.failed += 1;
                    }
                },
            }
        }

        let present: BTreeSet<String> = paths.iter().cloned().collect();
        report.removed = cache.retain_paths(&present).len();
        (set, report)
    }

    /// Wrap `set` in a project and run the compiler over it.
    pub fn compile(&self, set: ApiSetDescriptor) -> DocbloxResult<Project> {
        let mut project = Project::new(self.settings.title.clone(), self.settings.clone());
        project.add_version(
            VersionDescriptor::new(DEFAULT_VERSION).with_set(DocumentationSet::Api(set)),
        )?;
        let context = PassContext {
            router: self.router.as_ref(),
            examples: self.examples.as_ref(),
            observer: self.observer,
        };
        self.compiler.compile(&mut project, &context)?;
        Ok(project)
    }
}

/// Examples are looked up in the configured examples directory, then next to
/// the first source path.
fn default_example_finder(root: &Path, settings: &Settings) -> FsExampleFinder {
    let source_dir = settings.source_paths.first().map(|p| root.join(p));
    let examples_dir = settings.examples_dir.as_ref().map(|p| root.join(p));
    FsExampleFinder::new(source_dir, examples_dir)
}
