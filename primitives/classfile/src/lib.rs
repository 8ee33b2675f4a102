#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! Class-file parsing and resolution.
//!
//! This crate reads compiled JVM class records: the constant pool, field and
//! method tables, runtime-visible annotations, generic signatures and method
//! bytecode, normalized into the instruction stream the simulator consumes.
//! The [`resolver`] module locates records on a search path of directories
//! and archives and caches them by canonical name.

pub mod annotations;
pub mod code;
pub mod constant_pool;
pub mod parser;
pub mod record;
pub mod resolver;
pub mod signature;

#[cfg(feature = "test-utils")]
pub mod testkit;

pub use annotations::{Annotation, AnnotationValue};
pub use code::Instruction;
pub use constant_pool::{Constant, ConstantPool};
pub use record::{ClassAccess, ClassRecord, FieldAccess, FieldRecord, MethodAccess, MethodRecord};
pub use resolver::ClassResolver;

use thiserror::Error;

/// Errors raised while decoding class records.
#[derive(Debug, Error)]
pub enum ClassError {
    /// The byte stream does not follow the class-file grammar.
    #[error("malformed class file: {0}")]
    Malformed(String),
    /// A constant-pool index pointed at a missing or mistyped entry.
    #[error("bad constant pool reference: index {index}, expected {expected}")]
    BadPoolRef {
        /// The offending 1-based pool index.
        index: u16,
        /// What the referencing structure expected to find there.
        expected: &'static str,
    },
    /// A type or method signature did not match the grammar.
    #[error("malformed signature: {0:?}")]
    MalformedSignature(String),
    /// A search-path entry could not be opened or read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The location that failed.
        path: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
    /// An archive entry could not be read.
    #[error("failed to read archive {path}: {message}")]
    Archive {
        /// The archive that failed.
        path: String,
        /// Description from the archive reader.
        message: String,
    },
}

/// Result alias for class decoding.
pub type Result<T> = std::result::Result<T, ClassError>;
