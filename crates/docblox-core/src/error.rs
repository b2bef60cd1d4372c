//! Error types and error code constants for docblox.
//!
//! This module provides the unified build error type (`DocbloxError`) that
//! bridges domain-specific errors from the different subsystems (settings,
//! cache, compiler passes) into a common format suitable for JSON output.
//!
//! ## Error Code Mapping
//!
//! - `2`: Invalid arguments (bad input from caller, bad configuration)
//! - `3`: Resolution errors (duplicate FQSEN in strict mode, missing route)
//! - `4`: Cache/IO errors (unreadable sources, unwritable cache)
//! - `10`: Internal errors (broken descriptor tree invariants)
//!
//! Per-file reflection failures are not represented here: they are logged
//! and the file is left out of the tree.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::cache::CacheError;
use crate::settings::ConfigError;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Error codes for JSON output.
///
/// These codes map to CLI exit codes and appear in JSON error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments or configuration from caller.
    InvalidArguments = 2,
    /// Resolution errors (duplicate names, unroutable nodes).
    ResolutionError = 3,
    /// Cache or filesystem errors.
    CacheError = 4,
    /// Internal errors (bugs, unexpected state).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for a documentation build.
///
/// A compiler pass returning one of these aborts the whole build.
#[derive(Debug, Error)]
pub enum DocbloxError {
    /// Invalid arguments from caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// Configuration could not be resolved.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A version with this number is already registered on the project.
    #[error("version {number} is already registered")]
    DuplicateVersion { number: String },

    /// Two elements share an FQSEN and strict mode is enabled.
    #[error("duplicate FQSEN {fqsen}: declared in {first} and {second}")]
    DuplicateFqsen {
        fqsen: String,
        first: String,
        second: String,
    },

    /// An element could not be traced back to the file that declares it.
    #[error("element {fqsen} is not associated with a file")]
    OrphanedElement { fqsen: String },

    /// The router has no rule for a node that needs a URL.
    #[error("no routing rule matches {node_type} '{name}'")]
    NoRoute { node_type: String, name: String },

    /// Incremental cache failure.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// IO error while reading sources.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    InternalError { message: String },
}

/// Result type for build operations.
pub type DocbloxResult<T> = Result<T, DocbloxError>;

// ============================================================================
// Error Code Mapping
// ============================================================================

impl From<&DocbloxError> for OutputErrorCode {
    fn from(err: &DocbloxError) -> Self {
        match err {
            DocbloxError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            DocbloxError::Config(_) => OutputErrorCode::InvalidArguments,
            DocbloxError::DuplicateVersion { .. } => OutputErrorCode::InvalidArguments,
            DocbloxError::DuplicateFqsen { .. } => OutputErrorCode::ResolutionError,
            DocbloxError::NoRoute { .. } => OutputErrorCode::ResolutionError,
            DocbloxError::Cache(_) => OutputErrorCode::CacheError,
            DocbloxError::Io(_) => OutputErrorCode::CacheError,
            DocbloxError::OrphanedElement { .. } => OutputErrorCode::InternalError,
            DocbloxError::InternalError { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl DocbloxError {
    /// Create an invalid arguments error.
    pub fn invalid_args(message: impl Into<String>) -> Self {
        DocbloxError::InvalidArguments {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        DocbloxError::InternalError {
            message: message.into(),
        }
    }

    /// Stable error code name used in JSON output.
    pub fn code_name(&self) -> &'static str {
        match self {
            DocbloxError::InvalidArguments { .. } => "InvalidArguments",
            DocbloxError::Config(_) => "InvalidConfig",
            DocbloxError::DuplicateVersion { .. } => "DuplicateVersion",
            DocbloxError::DuplicateFqsen { .. } => "DuplicateFqsen",
            DocbloxError::OrphanedElement { .. } => "OrphanedElement",
            DocbloxError::NoRoute { .. } => "NoRoute",
            DocbloxError::Cache(_) => "CacheError",
            DocbloxError::Io(_) => "IoError",
            DocbloxError::InternalError { .. } => "InternalError",
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
