//! Build settings and configuration resolution.
//!
//! Settings are resolved from several sources with the following precedence
//! (highest first):
//!
//! 1. CLI flags
//! 2. Environment variables (`DOCBLOX_*`)
//! 3. Project config (`docblox.json` in the project root)
//! 4. Defaults
//!
//! Each resolved value remembers where it came from ([`ConfigSource`]), which
//! the CLI reports in verbose output.

use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::descriptor::Visibility;

/// Name of the project configuration file.
pub const CONFIG_FILE_NAME: &str = "docblox.json";

/// Default cache directory, relative to the project root.
pub const DEFAULT_CACHE_DIR: &str = ".docblox";

/// Default package for elements that declare none.
pub const DEFAULT_PACKAGE_NAME: &str = "Default";

/// Default marker keywords.
pub const DEFAULT_MARKERS: &[&str] = &["TODO", "FIXME"];

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Unknown visibility keyword.
    #[error("unknown visibility '{value}' (expected api, public, protected, private or internal)")]
    UnknownVisibility { value: String },

    /// Invalid ignore pattern.
    #[error("invalid glob pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// Config file could not be read.
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid JSON.
    #[error("invalid config file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Environment variable holds an unusable value.
    #[error("invalid value '{value}' for {name}")]
    InvalidEnvValue { name: String, value: String },
}

// ============================================================================
// Visibility filter
// ============================================================================

/// Set of visibilities to include in the output.
///
/// `api` restricts output to elements tagged `@api`; `internal` keeps
/// elements and text marked internal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct VisibilityFilter(u8);

impl VisibilityFilter {
    pub const API: u8 = 1;
    pub const PUBLIC: u8 = 1 << 1;
    pub const PROTECTED: u8 = 1 << 2;
    pub const PRIVATE: u8 = 1 << 3;
    pub const INTERNAL: u8 = 1 << 4;

    const NAMES: &'static [(&'static str, u8)] = &[
        ("api", Self::API),
        ("public", Self::PUBLIC),
        ("protected", Self::PROTECTED),
        ("private", Self::PRIVATE),
        ("internal", Self::INTERNAL),
    ];

    pub fn from_bits(bits: u8) -> Self {
        VisibilityFilter(bits)
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    /// Parse a list of visibility keywords.
    pub fn parse<S: AsRef<str>>(values: &[S]) -> Result<Self, ConfigError> {
        let mut bits = 0;
        for value in values {
            let value = value.as_ref().trim().to_ascii_lowercase();
            let (_, flag) = Self::NAMES
                .iter()
                .find(|(name, _)| *name == value)
                .ok_or_else(|| ConfigError::UnknownVisibility {
                    value: value.clone(),
                })?;
            bits |= flag;
        }
        Ok(VisibilityFilter(bits))
    }

    pub fn contains(&self, flag: u8) -> bool {
        self.0 & flag == flag
    }

    /// Returns true if members with this declared visibility are kept.
    pub fn allows(&self, visibility: Visibility) -> bool {
        match visibility {
            Visibility::Public => self.contains(Self::PUBLIC),
            Visibility::Protected => self.contains(Self::PROTECTED),
            Visibility::Private => self.contains(Self::PRIVATE),
        }
    }

    pub fn allows_internal(&self) -> bool {
        self.contains(Self::INTERNAL)
    }

    /// Returns true if only `@api` elements are kept.
    pub fn is_api_only(&self) -> bool {
        self.contains(Self::API)
    }

    pub fn names(&self) -> Vec<String> {
        Self::NAMES
            .iter()
            .filter(|(_, flag)| self.contains(*flag))
            .map(|(name, _)| name.to_string())
            .collect()
    }
}

impl Default for VisibilityFilter {
    fn default() -> Self {
        VisibilityFilter(Self::PUBLIC | Self::PROTECTED | Self::PRIVATE)
    }
}

impl TryFrom<Vec<String>> for VisibilityFilter {
    type Error = ConfigError;

    fn try_from(values: Vec<String>) -> Result<Self, Self::Error> {
        VisibilityFilter::parse(&values)
    }
}

impl From<VisibilityFilter> for Vec<String> {
    fn from(filter: VisibilityFilter) -> Self {
        filter.names()
    }
}

// ============================================================================
// Settings
// ============================================================================

/// Effective settings of a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub title: String,
    pub visibility: VisibilityFilter,
    pub markers: Vec<String>,
    pub include_source: bool,
    pub default_package_name: String,
    /// Treat duplicate FQSENs as a build error instead of last-write-wins.
    pub strict_fqsen: bool,
    /// Source directories relative to the project root.
    pub source_paths: Vec<PathBuf>,
    /// Glob patterns (relative paths) excluded from parsing.
    pub ignore: Vec<String>,
    /// File extensions considered source files.
    pub extensions: Vec<String>,
    /// Directory searched for `{@example}` files, relative to the project root.
    pub examples_dir: Option<PathBuf>,
    pub cache_dir: PathBuf,
    /// Re-parse every file regardless of the cache.
    pub force: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            title: "API Documentation".to_string(),
            visibility: VisibilityFilter::default(),
            markers: DEFAULT_MARKERS.iter().map(|m| m.to_string()).collect(),
            include_source: false,
            default_package_name: DEFAULT_PACKAGE_NAME.to_string(),
            strict_fqsen: false,
            source_paths: vec![PathBuf::from(".")],
            ignore: Vec::new(),
            extensions: vec!["php".to_string()],
            examples_dir: None,
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            force: false,
        }
    }
}

impl Settings {
    /// Compile the ignore patterns.
    pub fn ignore_set(&self) -> Result<GlobSet, ConfigError> {
        build_glob_set(&self.ignore)
    }
}

/// Build a GlobSet from a list of pattern strings.
fn build_glob_set(patterns: &[String]) -> Result<GlobSet, ConfigError> {
    let mut builder = GlobSetBuilder::new();

    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| ConfigError::InvalidPattern {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;
        builder.add(glob);
    }

    builder.build().map_err(|e| ConfigError::InvalidPattern {
        pattern: "<combined>".to_string(),
        message: e.to_string(),
    })
}

// ============================================================================
// Configuration Sources
// ============================================================================

/// Configuration value source (for precedence tracking).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    /// Built-in default value.
    Default = 0,
    /// From docblox.json.
    ProjectConfig = 1,
    /// From environment variable.
    EnvVar = 2,
    /// From CLI flag (highest precedence).
    CliFlag = 3,
}

/// A configuration value with its source.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    /// The actual value.
    pub value: T,
    /// Where the value came from.
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    /// Create a new config value with the given source.
    pub fn new(value: T, source: ConfigSource) -> Self {
        ConfigValue { value, source }
    }

    /// Replace with `other` if it has equal or higher precedence.
    pub fn merge(self, other: Self) -> Self {
        if other.source >= self.source {
            other
        } else {
            self
        }
    }

    fn set(&mut self, value: T, source: ConfigSource) {
        if source >= self.source {
            self.value = value;
            self.source = source;
        }
    }
}

/// Shape of `docblox.json`. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub title: Option<String>,
    pub visibility: Option<Vec<String>>,
    pub markers: Option<Vec<String>>,
    pub include_source: Option<bool>,
    pub default_package_name: Option<String>,
    pub strict_fqsen: Option<bool>,
    pub source_paths: Option<Vec<PathBuf>>,
    pub ignore: Option<Vec<String>>,
    pub extensions: Option<Vec<String>>,
    pub examples_dir: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
}

impl FileConfig {
    /// Load a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// CLI configuration overrides.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// --config flag (replaces `<root>/docblox.json`).
    pub config_file: Option<PathBuf>,
    /// --title flag.
    pub title: Option<String>,
    /// --visibility flags.
    pub visibility: Vec<String>,
    /// --source flags.
    pub source_paths: Vec<PathBuf>,
    /// --ignore flags.
    pub ignore: Vec<String>,
    /// --cache-dir flag.
    pub cache_dir: Option<PathBuf>,
    /// --include-source flag.
    pub include_source: bool,
    /// --force flag.
    pub force: bool,
    /// --strict flag.
    pub strict_fqsen: bool,
}

// ============================================================================
// Configuration Resolution
// ============================================================================

/// Resolved configuration with precedence information.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    pub title: ConfigValue<String>,
    pub visibility: ConfigValue<Vec<String>>,
    pub markers: ConfigValue<Vec<String>>,
    pub include_source: ConfigValue<bool>,
    pub default_package_name: ConfigValue<String>,
    pub strict_fqsen: ConfigValue<bool>,
    pub source_paths: ConfigValue<Vec<PathBuf>>,
    pub ignore: ConfigValue<Vec<String>>,
    pub extensions: ConfigValue<Vec<String>>,
    pub examples_dir: ConfigValue<Option<PathBuf>>,
    pub cache_dir: ConfigValue<PathBuf>,
    pub force: ConfigValue<bool>,
}

impl ResolvedConfig {
    /// Configuration holding only defaults.
    pub fn new() -> Self {
        let defaults = Settings::default();
        let d = ConfigSource::Default;
        ResolvedConfig {
            title: ConfigValue::new(defaults.title, d),
            visibility: ConfigValue::new(defaults.visibility.names(), d),
            markers: ConfigValue::new(defaults.markers, d),
            include_source: ConfigValue::new(defaults.include_source, d),
            default_package_name: ConfigValue::new(defaults.default_package_name, d),
            strict_fqsen: ConfigValue::new(defaults.strict_fqsen, d),
            source_paths: ConfigValue::new(defaults.source_paths, d),
            ignore: ConfigValue::new(defaults.ignore, d),
            extensions: ConfigValue::new(defaults.extensions, d),
            examples_dir: ConfigValue::new(defaults.examples_dir, d),
            cache_dir: ConfigValue::new(defaults.cache_dir, d),
            force: ConfigValue::new(defaults.force, d),
        }
    }

    /// Resolve configuration from all sources.
    ///
    /// Precedence (highest to lowest):
    /// 1. CLI flags
    /// 2. Environment variables
    /// 3. Project config (docblox.json)
    /// 4. Defaults
    pub fn resolve(project_root: &Path, cli_overrides: &CliOverrides) -> Result<Self, ConfigError> {
        let mut config = ResolvedConfig::new();

        let config_path = cli_overrides
            .config_file
            .clone()
            .unwrap_or_else(|| project_root.join(CONFIG_FILE_NAME));
        if config_path.exists() {
            config.apply_project_config(&FileConfig::load(&config_path)?);
        }

        config.apply_env_vars(|name| std::env::var(name).ok())?;
        config.apply_cli_overrides(cli_overrides);

        Ok(config)
    }

    pub fn apply_project_config(&mut self, file: &FileConfig) {
        let src = ConfigSource::ProjectConfig;
        if let Some(title) = &file.title {
            self.title.set(title.clone(), src);
        }
        if let Some(visibility) = &file.visibility {
            self.visibility.set(visibility.clone(), src);
        }
        if let Some(markers) = &file.markers {
            self.markers.set(markers.clone(), src);
        }
        if let Some(include_source) = file.include_source {
            self.include_source.set(include_source, src);
        }
        if let Some(name) = &file.default_package_name {
            self.default_package_name.set(name.clone(), src);
        }
        if let Some(strict) = file.strict_fqsen {
            self.strict_fqsen.set(strict, src);
        }
        if let Some(paths) = &file.source_paths {
            self.source_paths.set(paths.clone(), src);
        }
        if let Some(ignore) = &file.ignore {
            self.ignore.set(ignore.clone(), src);
        }
        if let Some(extensions) = &file.extensions {
            self.extensions.set(extensions.clone(), src);
        }
        if let Some(dir) = &file.examples_dir {
            self.examples_dir.set(Some(dir.clone()), src);
        }
        if let Some(dir) = &file.cache_dir {
            self.cache_dir.set(dir.clone(), src);
        }
    }

    /// Apply `DOCBLOX_*` variables read through `lookup`.
    pub fn apply_env_vars(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let src = ConfigSource::EnvVar;
        if let Some(title) = lookup("DOCBLOX_TITLE") {
            self.title.set(title, src);
        }
        if let Some(visibility) = lookup("DOCBLOX_VISIBILITY") {
            self.visibility.set(split_list(&visibility), src);
        }
        if let Some(markers) = lookup("DOCBLOX_MARKERS") {
            self.markers.set(split_list(&markers), src);
        }
        if let Some(dir) = lookup("DOCBLOX_CACHE_DIR") {
            self.cache_dir.set(PathBuf::from(dir), src);
        }
        if let Some(value) = lookup("DOCBLOX_INCLUDE_SOURCE") {
            self.include_source
                .set(parse_bool("DOCBLOX_INCLUDE_SOURCE", &value)?, src);
        }
        if let Some(value) = lookup("DOCBLOX_FORCE") {
            self.force.set(parse_bool("DOCBLOX_FORCE", &value)?, src);
        }
        Ok(())
    }

    pub fn apply_cli_overrides(&mut self, overrides: &CliOverrides) {
        let src = ConfigSource::CliFlag;
        if let Some(title) = &overrides.title {
            self.title.set(title.clone(), src);
        }
        if !overrides.visibility.is_empty() {
            let values = overrides
                .visibility
                .iter()
                .flat_map(|v| split_list(v))
                .collect();
            self.visibility.set(values, src);
        }
        if !overrides.source_paths.is_empty() {
            self.source_paths.set(overrides.source_paths.clone(), src);
        }
        if !overrides.ignore.is_empty() {
            let mut ignore = self.ignore.value.clone();
            ignore.extend(overrides.ignore.iter().cloned());
            self.ignore.set(ignore, src);
        }
        if let Some(dir) = &overrides.cache_dir {
            self.cache_dir.set(dir.clone(), src);
        }
        if overrides.include_source {
            self.include_source.set(true, src);
        }
        if overrides.force {
            self.force.set(true, src);
        }
        if overrides.strict_fqsen {
            self.strict_fqsen.set(true, src);
        }
    }

    /// Validate and convert to effective settings.
    pub fn to_settings(&self) -> Result<Settings, ConfigError> {
        let settings = Settings {
            title: self.title.value.clone(),
            visibility: VisibilityFilter::parse(&self.visibility.value)?,
            markers: self.markers.value.clone(),
            include_source: self.include_source.value,
            default_package_name: self.default_package_name.value.clone(),
            strict_fqsen: self.strict_fqsen.value,
            source_paths: self.source_paths.value.clone(),
            ignore: self.ignore.value.clone(),
            extensions: self.extensions.value.clone(),
            examples_dir: self.examples_dir.value.clone(),
            cache_dir: self.cache_dir.value.clone(),
            force: self.force.value,
        };
        // Validate ignore patterns.
        settings.ignore_set()?;
        Ok(settings)
    }
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        ResolvedConfig::new()
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidEnvValue {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}

// ============================================================================
// Tests
// ============================================================================
