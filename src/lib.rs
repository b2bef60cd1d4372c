//! docblox: documentation generator for PHP projects
//!
//! Builds a fully linked descriptor tree (namespaces, packages, inheritance,
//! used-by back-references, tables of contents) from reflected source files
//! and exports its structure as JSON.

// Core infrastructure - re-exported from docblox-core
pub use docblox_core::builder;
pub use docblox_core::cache;
pub use docblox_core::compiler;
pub use docblox_core::descriptor;
pub use docblox_core::discovery;
pub use docblox_core::error;
pub use docblox_core::example;
pub use docblox_core::fqsen;
pub use docblox_core::hash;
pub use docblox_core::inline;
pub use docblox_core::linker;
pub use docblox_core::observer;
pub use docblox_core::reflector;
pub use docblox_core::router;
pub use docblox_core::settings;

// Language support
pub use docblox_php as php;

// Front door
pub mod cli;
pub mod output;
