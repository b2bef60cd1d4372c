//! Example file lookup for `{@example}` inline tags.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors from [`ExampleFinder`] implementations.
#[derive(Debug, Error)]
pub enum ExampleError {
    /// No candidate location holds the file.
    #[error("example file not found: {path}")]
    NotFound { path: String },

    /// The requested line range is outside the file.
    #[error("example {path} has {lines} lines, requested start line {start}")]
    OutOfRange { path: String, start: usize, lines: usize },

    #[error("cannot read example {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// The arguments of one `{@example path [start [length]] [description]}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExampleRequest {
    pub path: String,
    /// First line, 1-based.
    pub start: Option<usize>,
    /// Number of lines from `start`.
    pub length: Option<usize>,
    pub description: String,
}

impl ExampleRequest {
    pub fn new(path: impl Into<String>) -> Self {
        ExampleRequest {
            path: path.into(),
            start: None,
            length: None,
            description: String::new(),
        }
    }

    /// Parse the argument text of an `{@example}` tag.
    ///
    /// Numbers directly after the path are the start line and the length;
    /// the remaining words form the description.
    pub fn parse(argument: &str) -> Option<Self> {
        let mut words = argument.split_whitespace().peekable();
        let path = words.next()?;
        let mut request = ExampleRequest::new(path);
        if let Some(start) = words.peek().and_then(|w| w.parse::<usize>().ok()) {
            request.start = Some(start);
            words.next();
            if let Some(length) = words.peek().and_then(|w| w.parse::<usize>().ok()) {
                request.length = Some(length);
                words.next();
            }
        }
        request.description = words.collect::<Vec<_>>().join(" ");
        Some(request)
    }

    /// Cut the requested line range out of `content`.
    pub fn slice(&self, content: &str) -> Result<String, ExampleError> {
        let Some(start) = self.start else {
            return Ok(content.trim_end().to_string());
        };
        let lines: Vec<&str> = content.lines().collect();
        let first = start.max(1) - 1;
        if first >= lines.len() {
            return Err(ExampleError::OutOfRange {
                path: self.path.clone(),
                start,
                lines: lines.len(),
            });
        }
        let last = match self.length {
            Some(length) => first.saturating_add(length).min(lines.len()),
            None => lines.len(),
        };
        Ok(lines[first..last].join("\n"))
    }
}

/// Locates and reads example files.
pub trait ExampleFinder {
    fn find(&self, request: &ExampleRequest) -> Result<String, ExampleError>;
}

/// Looks for examples on disk.
///
/// Candidates, in order: the examples directory, the source directory, an
/// `examples` directory next to the source directory, the working directory.
#[derive(Debug, Clone, Default)]
pub struct FsExampleFinder {
    pub source_dir: Option<PathBuf>,
    pub examples_dir: Option<PathBuf>,
}

impl FsExampleFinder {
    pub fn new(source_dir: Option<PathBuf>, examples_dir: Option<PathBuf>) -> Self {
        FsExampleFinder {
            source_dir,
            examples_dir,
        }
    }

    fn candidates(&self, path: &str) -> Vec<PathBuf> {
        let mut out = Vec::new();
        if let Some(dir) = &self.examples_dir {
            out.push(dir.join(path));
        }
        if let Some(dir) = &self.source_dir {
            out.push(dir.join(path));
            if let Some(parent) = dir.parent() {
                out.push(parent.join("examples").join(path));
            }
        }
        out.push(Path::new(path).to_path_buf());
        out
    }
}

impl ExampleFinder for FsExampleFinder {
    fn find(&self, request: &ExampleRequest) -> Result<String, ExampleError> {
        let found = self
            .candidates(&request.path)
            .into_iter()
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| ExampleError::NotFound {
                path: request.path.clone(),
            })?;
        let content = fs::read_to_string(&found).map_err(|source| ExampleError::Io {
            path: request.path.clone(),
            source,
        })?;
        request.slice(&content)
    }
}

/// Finder that never finds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExamples;

impl ExampleFinder for NoExamples {
    fn find(&self, request: &ExampleRequest) -> Result<String, ExampleError> {
        Err(ExampleError::NotFound {
            path: request.path.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    mod request_tests {
        use super::*;

        #[test]
        fn parse_path_only() {
            let request = ExampleRequest::parse("demo.php").unwrap();
            assert_eq!(request, ExampleRequest::new("demo.php"));
        }

        #[test]
        fn parse_range_and_description() {
            let request = ExampleRequest::parse("demo.php 3 2 shows the setup").unwrap();
            assert_eq!(request.start, Some(3));
            assert_eq!(request.length, Some(2));
            assert_eq!(request.description, "shows the setup");
        }

        #[test]
        fn parse_description_without_range() {
            let request = ExampleRequest::parse("example.txt including description").unwrap();
            assert_eq!(request.start, None);
            assert_eq!(request.description, "including description");
        }

        #[test]
        fn parse_empty_is_none() {
            assert!(ExampleRequest::parse("   ").is_none());
        }

        #[test]
        fn slice_line_range() {
            let mut request = ExampleRequest::new("x");
            request.start = Some(2);
            request.length = Some(2);
            assert_eq!(request.slice("a\nb\nc\nd\n").unwrap(), "b\nc");
        }

        #[test]
        fn slice_with_huge_length_stops_at_end() {
            let request = ExampleRequest::parse("a.txt 2 18446744073709551615").unwrap();
            assert_eq!(request.slice("one\ntwo\nthree\n").unwrap(), "two\nthree");
        }

        #[test]
        fn slice_past_end_is_an_error() {
            let mut request = ExampleRequest::new("x");
            request.start = Some(10);
            assert!(matches!(
                request.slice("a\nb"),
                Err(ExampleError::OutOfRange { lines: 2, .. })
            ));
        }
    }

    mod finder_tests {
        use super::*;

        #[test]
        fn finds_in_examples_dir_first() {
            let temp = TempDir::new().unwrap();
            let examples = temp.path().join("examples");
            let src = temp.path().join("src");
            fs::create_dir_all(&examples).unwrap();
            fs::create_dir_all(&src).unwrap();
            fs::write(examples.join("demo.txt"), "from examples\n").unwrap();
            fs::write(src.join("demo.txt"), "from src\n").unwrap();

            let finder = FsExampleFinder::new(Some(src), Some(examples));
            let found = finder.find(&ExampleRequest::new("demo.txt")).unwrap();
            assert_eq!(found, "from examples");
        }

        #[test]
        fn falls_back_to_sibling_examples_dir() {
            let temp = TempDir::new().unwrap();
            let src = temp.path().join("src");
            fs::create_dir_all(&src).unwrap();
            fs::create_dir_all(temp.path().join("examples")).unwrap();
            fs::write(temp.path().join("examples").join("demo.txt"), "sibling").unwrap();

            let finder = FsExampleFinder::new(Some(src), None);
            assert_eq!(finder.find(&ExampleRequest::new("demo.txt")).unwrap(), "sibling");
        }

        #[test]
        fn missing_file_is_not_found() {
            let temp = TempDir::new().unwrap();
            let finder = FsExampleFinder::new(Some(temp.path().to_path_buf()), None);
            let err = finder
                .find(&ExampleRequest::new("nope-does-not-exist.txt"))
                .unwrap_err();
            assert!(matches!(err, ExampleError::NotFound { .. }));
        }
    }
}
