//! PHP language support for docblox.
//!
//! This crate provides the PHP implementation of the file reflector contract.
//! It includes:
//! - A coarse token scanner for PHP source
//! - Doc-block parsing into summaries, descriptions and typed tags
//! - The reflector turning one file into a raw file descriptor

pub mod docblock;
pub mod lexer;
pub mod reflector;

pub use reflector::PhpReflector;
