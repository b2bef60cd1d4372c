//! The File Reflector contract.
//!
//! A reflector turns one source file into a raw [`FileDescriptor`]: elements
//! with their doc-blocks and tags, references left as text. Resolution is
//! the compiler's job.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::descriptor::FileDescriptor;
use crate::hash::ContentHash;

/// Errors from [`FileReflector`] implementations.
#[derive(Debug, Error)]
pub enum ReflectError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not valid UTF-8")]
    Encoding { path: String },

    #[error("syntax error in {path} at line {line}: {message}")]
    Syntax {
        path: String,
        line: u32,
        message: String,
    },
}

/// One source file ready for reflection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path relative to the project root, `/` separated.
    pub path: String,
    pub content: String,
    pub hash: ContentHash,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        let hash = ContentHash::compute(content.as_bytes());
        SourceFile {
            path: path.into(),
            content,
            hash,
        }
    }

    /// Read `root/relative` from disk.
    pub fn read(root: &Path, relative: &str) -> Result<Self, ReflectError> {
        let bytes = fs::read(root.join(relative)).map_err(|source| ReflectError::Io {
            path: relative.to_string(),
            source,
        })?;
        let content = String::from_utf8(bytes).map_err(|_| ReflectError::Encoding {
            path: relative.to_string(),
        })?;
        Ok(SourceFile::new(relative, content))
    }
}

/// Produces raw file descriptors.
pub trait FileReflector {
    fn reflect(&self, file: &SourceFile) -> Result<FileDescriptor, ReflectError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn source_file_hashes_content() {
        let file = SourceFile::new("a.php", "<?php");
        assert_eq!(file.hash, ContentHash::compute(b"<?php"));
    }

    #[test]
    fn read_from_disk() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("src")).unwrap();
        fs::write(temp.path().join("src/a.php"), "<?php echo 1;").unwrap();

        let file = SourceFile::read(temp.path(), "src/a.php").unwrap();
        assert_eq!(file.path, "src/a.php");
        assert_eq!(file.content, "<?php echo 1;");
    }

    #[test]
    fn read_rejects_invalid_utf8() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("bin.php"), [0xff, 0xfe, 0x00]).unwrap();
        let err = SourceFile::read(temp.path(), "bin.php").unwrap_err();
        assert!(matches!(err, ReflectError::Encoding { .. }));
    }
}
