//! Core infrastructure for docblox.
//!
//! This crate provides the language-agnostic documentation pipeline:
//! - Descriptor model (project, versions, API and guide sets, files, elements)
//! - Multi-pass compiler that indexes, links and filters the descriptor tree
//! - Name resolution and inline tag scanning
//! - URL routing for descriptors
//! - Incremental, hash-gated file cache
//! - Source discovery, settings and error types
//! - File reflector contract for pluggable language support

pub mod builder;
pub mod cache;
pub mod compiler;
pub mod descriptor;
pub mod discovery;
pub mod error;
pub mod example;
pub mod fqsen;
pub mod hash;
pub mod inline;
pub mod linker;
pub mod observer;
pub mod reflector;
pub mod router;
pub mod settings;
