//! JSON output types and serialization for CLI responses.
//!
//! Every command prints exactly one JSON document on stdout. Responses carry
//! `status` first and a `schema_version` so callers can detect format
//! changes. Errors use [`ErrorResponse`] with the numeric code that is also
//! the process exit code.
//!
//! The structure exporter ([`ProjectExport`]) is a read-only view of a
//! compiled project: it borrows the descriptor tree and never changes it.

use std::collections::BTreeMap;
use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use docblox_core::builder::BuildReport;
use docblox_core::cache::CacheManifest;
use docblox_core::descriptor::{
    ApiSetDescriptor, DocumentationSet, FileDescriptor, GuideDocument, GuideSetDescriptor, Index,
    Project, Taxonomy, TocDescriptor, VersionDescriptor, INDEX_ELEMENTS,
};
use docblox_core::error::{DocbloxError, OutputErrorCode};
use docblox_core::settings::ResolvedConfig;

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

// ============================================================================
// Common Types
// ============================================================================

/// A problem found while reading one source file.
///
/// `line` is absent when the whole file could not be reflected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileProblem {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    pub message: String,
}

impl FileProblem {
    pub fn file(path: impl Into<String>, message: impl Into<String>) -> Self {
        FileProblem {
            path: path.into(),
            line: None,
            message: message.into(),
        }
    }

    pub fn at_line(path: impl Into<String>, line: u32, message: impl Into<String>) -> Self {
        FileProblem {
            path: path.into(),
            line: Some(line),
            message: message.into(),
        }
    }
}

/// Sorted problems: reflection failures and per-line parse errors of `set`.
pub fn collect_problems(set: &ApiSetDescriptor, failures: &[FileProblem]) -> Vec<FileProblem> {
    let mut problems: Vec<FileProblem> = failures.to_vec();
    for (_, file) in set.files() {
        for error in &file.errors {
            problems.push(FileProblem::at_line(&file.path, error.line, &error.message));
        }
    }
    problems.sort_by(|a, b| (&a.path, a.line).cmp(&(&b.path, b.line)));
    problems
}

// ============================================================================
// Error Types
// ============================================================================

/// Error information for error responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Numeric error code (also the exit code).
    pub code: u8,
    /// Stable error name, e.g. `DuplicateFqsen`.
    pub kind: String,
    /// Human-readable message.
    pub message: String,
    /// Error-specific structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorInfo {
    /// Create from a DocbloxError.
    pub fn from_error(err: &DocbloxError) -> Self {
        let details = match err {
            DocbloxError::DuplicateFqsen {
                fqsen,
                first,
                second,
            } => Some(serde_json::json!({
                "fqsen": fqsen,
                "files": [first, second],
            })),
            DocbloxError::NoRoute { node_type, name } => Some(serde_json::json!({
                "node_type": node_type,
                "name": name,
            })),
            DocbloxError::DuplicateVersion { number } => {
                Some(serde_json::json!({ "version": number }))
            }
            DocbloxError::OrphanedElement { fqsen } => Some(serde_json::json!({ "fqsen": fqsen })),
            _ => None,
        };

        ErrorInfo {
            code: OutputErrorCode::from(err).code(),
            kind: err.code_name().to_string(),
            message: err.to_string(),
            details,
        }
    }
}

/// Error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Status: "error".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// Error information.
    pub error: ErrorInfo,
}

impl ErrorResponse {
    /// Create an error response from a DocbloxError.
    pub fn from_error(err: &DocbloxError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }
}

// ============================================================================
// Command Responses
// ============================================================================

/// Response for the parse command.
#[derive(Debug, Clone, Serialize)]
pub struct ParseResponse {
    /// Status: "ok".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    pub report: BuildReport,
    /// Reflection failures and parse errors, sorted by path and line.
    pub problems: Vec<FileProblem>,
}

impl ParseResponse {
    pub fn new(report: BuildReport, problems: Vec<FileProblem>) -> Self {
        ParseResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            report,
            problems,
        }
    }
}

/// Response for the run command.
///
/// The project structure is embedded unless it was written to a file.
#[derive(Debug, Serialize)]
pub struct RunResponse<'a> {
    /// Status: "ok".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    pub title: &'a str,
    pub report: BuildReport,
    /// Number of indexed elements across all API sets.
    pub elements: usize,
    pub problems: Vec<FileProblem>,
    /// File the structure was written to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectExport<'a>>,
}

/// Response for the config command: every setting with its source.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigResponse {
    /// Status: "ok".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    pub config_file: Option<String>,
    pub config: ResolvedConfig,
}

impl ConfigResponse {
    pub fn new(config_file: Option<String>, config: ResolvedConfig) -> Self {
        ConfigResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            config_file,
            config,
        }
    }
}

/// Response for `cache status`.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatusResponse {
    /// Status: "ok".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    pub cache_dir: String,
    /// Whether a manifest was found.
    pub exists: bool,
    pub files: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub written_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_schema_version: Option<u32>,
}

impl CacheStatusResponse {
    pub fn new(cache_dir: impl Into<String>, manifest: Option<&CacheManifest>) -> Self {
        CacheStatusResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            cache_dir: cache_dir.into(),
            exists: manifest.is_some(),
            files: manifest.map_or(0, CacheManifest::file_count),
            written_at: manifest.map(|m| m.written_at.clone()),
            cache_schema_version: manifest.map(|m| m.schema_version),
        }
    }
}

/// Response for `cache clear`.
#[derive(Debug, Clone, Serialize)]
pub struct CacheClearResponse {
    /// Status: "ok".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    pub cache_dir: String,
    /// Number of cached file entries removed.
    pub removed: usize,
}

impl CacheClearResponse {
    pub fn new(cache_dir: impl Into<String>, removed: usize) -> Self {
        CacheClearResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            cache_dir: cache_dir.into(),
            removed,
        }
    }
}

// ============================================================================
// Structure Export
// ============================================================================

/// Read-only JSON view of a compiled project.
#[derive(Debug, Serialize)]
pub struct ProjectExport<'a> {
    pub title: &'a str,
    pub versions: Vec<VersionExport<'a>>,
}

#[derive(Debug, Serialize)]
pub struct VersionExport<'a> {
    pub number: &'a str,
    pub sets: Vec<SetExport<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SetExport<'a> {
    Api(ApiSetExport<'a>),
    Guide(GuideSetExport<'a>),
}

#[derive(Debug, Serialize)]
pub struct ApiSetExport<'a> {
    pub name: &'a str,
    /// Files in path order.
    pub files: Vec<&'a FileDescriptor>,
    pub indexes: BTreeMap<&'a str, &'a Index>,
    pub namespaces: &'a Taxonomy,
    pub packages: &'a Taxonomy,
    pub tables_of_contents: &'a [TocDescriptor],
}

#[derive(Debug, Serialize)]
pub struct GuideSetExport<'a> {
    pub name: &'a str,
    pub documents: Vec<&'a GuideDocument>,
    pub tables_of_contents: &'a [TocDescriptor],
}

impl<'a> ProjectExport<'a> {
    pub fn new(project: &'a Project) -> Self {
        ProjectExport {
            title: &project.title,
            versions: project.versions().iter().map(VersionExport::new).collect(),
        }
    }
}

impl<'a> VersionExport<'a> {
    fn new(version: &'a VersionDescriptor) -> Self {
        VersionExport {
            number: &version.number,
            sets: version
                .sets
                .iter()
                .map(|set| match set {
                    DocumentationSet::Api(api) => SetExport::Api(ApiSetExport::new(api)),
                    DocumentationSet::Guide(guide) => SetExport::Guide(GuideSetExport::new(guide)),
                })
                .collect(),
        }
    }
}

impl<'a> ApiSetExport<'a> {
    fn new(set: &'a ApiSetDescriptor) -> Self {
        let mut files: Vec<&FileDescriptor> = set.files().map(|(_, file)| file).collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        ApiSetExport {
            name: &set.name,
            files,
            indexes: set.indexes.iter().collect(),
            namespaces: &set.namespaces,
            packages: &set.packages,
            tables_of_contents: set.tables_of_contents(),
        }
    }
}

impl<'a> GuideSetExport<'a> {
    fn new(set: &'a GuideSetDescriptor) -> Self {
        GuideSetExport {
            name: &set.name,
            documents: set.documents.values().collect(),
            tables_of_contents: set.tables_of_contents(),
        }
    }
}

/// Number of entries in the `elements` index of every API set.
pub fn element_count(project: &Project) -> usize {
    project
        .api_sets()
        .filter_map(|set| set.indexes.get(INDEX_ELEMENTS))
        .map(Index::len)
        .sum()
}

// ============================================================================
// Response Emission
// ============================================================================

/// Serialize a response as pretty-printed JSON.
pub fn to_json<T: Serialize>(response: &T) -> Result<String, DocbloxError> {
    serde_json::to_string_pretty(response)
        .map_err(|e| DocbloxError::internal(format!("JSON serialization error: {}", e)))
}

/// Emit a response as pretty-printed JSON to a writer.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use docblox_core::descriptor::ClassDescriptor;
    use docblox_core::fqsen::Fqsen;
    use docblox_core::hash::ContentHash;
    use docblox_core::settings::Settings;

    mod error_tests {
        use super::*;

        #[test]
        fn duplicate_fqsen_carries_both_files() {
            let err = DocbloxError::DuplicateFqsen {
                fqsen: "\\Foo".to_string(),
                first: "a.php".to_string(),
                second: "b.php".to_string(),
            };
            let response = ErrorResponse::from_error(&err);
            let value = serde_json::to_value(&response).unwrap();
            assert_eq!(value["status"], "error");
            assert_eq!(value["error"]["code"], 3);
            assert_eq!(value["error"]["kind"], "DuplicateFqsen");
            assert_eq!(value["error"]["details"]["files"][1], "b.php");
        }

        #[test]
        fn invalid_arguments_has_no_details() {
            let err = DocbloxError::invalid_args("bad visibility");
            let json = serde_json::to_string(&ErrorInfo::from_error(&err)).unwrap();
            assert!(json.contains("\"code\":2"));
            assert!(!json.contains("details"));
        }

        #[test]
        fn emitted_response_ends_with_newline() {
            let err = DocbloxError::internal("boom");
            let mut buffer = Vec::new();
            emit_response(&ErrorResponse::from_error(&err), &mut buffer).unwrap();
            let text = String::from_utf8(buffer).unwrap();
            assert!(text.ends_with("}\n"));
            assert!(text.contains("\"code\": 10"));
        }
    }

    mod problem_tests {
        use super::*;
        use docblox_core::descriptor::ParseError;

        #[test]
        fn problems_are_sorted_by_path_and_line() {
            let mut file = FileDescriptor::new("b.php", ContentHash::compute(b"b"));
            file.errors.push(ParseError {
                line: 9,
                message: "late".to_string(),
            });
            file.errors.push(ParseError {
                line: 2,
                message: "early".to_string(),
            });
            let mut set = ApiSetDescriptor::new("api");
            set.add_file(Arc::new(file));

            let problems = collect_problems(&set, &[FileProblem::file("a.php", "unreadable")]);
            let order: Vec<(&str, Option<u32>)> = problems
                .iter()
                .map(|p| (p.path.as_str(), p.line))
                .collect();
            assert_eq!(
                order,
                vec![("a.php", None), ("b.php", Some(2)), ("b.php", Some(9))]
            );
        }
    }

    mod export_tests {
        use super::*;

        fn project() -> Project {
            let mut file = FileDescriptor::new("src/foo.php", ContentHash::compute(b"foo"));
            file.add_class(ClassDescriptor::new(Fqsen::new("\\Foo"), 3));
            let mut api = ApiSetDescriptor::new("api");
            api.add_file(Arc::new(file));
            let mut guide = GuideSetDescriptor::new("guide");
            guide.add_document(GuideDocument {
                path: "index".to_string(),
                title: "Welcome".to_string(),
                toc: Vec::new(),
            });

            let mut project = Project::new("Acme", Settings::default());
            project
                .add_version(
                    VersionDescriptor::new("1.0")
                        .with_set(DocumentationSet::Api(api))
                        .with_set(DocumentationSet::Guide(guide)),
                )
                .unwrap();
            project
        }

        #[test]
        fn sets_are_tagged_by_type() {
            let project = project();
            let value = serde_json::to_value(ProjectExport::new(&project)).unwrap();
            assert_eq!(value["title"], "Acme");
            let sets = &value["versions"][0]["sets"];
            assert_eq!(sets[0]["type"], "api");
            assert_eq!(sets[0]["files"][0]["path"], "src/foo.php");
            assert_eq!(sets[1]["type"], "guide");
            assert_eq!(sets[1]["documents"][0]["title"], "Welcome");
        }

        #[test]
        fn uncompiled_project_has_no_elements() {
            assert_eq!(element_count(&project()), 0);
        }
    }
}
