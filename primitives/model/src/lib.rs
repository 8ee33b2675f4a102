#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! The REST surface model.
//!
//! This crate defines the structures handed to the renderers: the set of
//! discovered resources, the per-method verb/media-type/parameter data, the
//! per-status responses, and the structural schemas derived for message
//! bodies. Everything is ordered deterministically so repeated runs render
//! byte-identical documents.

pub mod render;
pub mod rest;
pub mod schema;

pub use render::{DocumentInfo, RenderBackend};
pub use rest::{Body, HttpVerb, ParamKind, Resources, ResourceMethod, Response};
pub use schema::{PrimitiveKind, Schema, SchemaProperty};

use thiserror::Error;

/// Errors raised when dumping or loading a model document.
#[derive(Debug, Error)]
pub enum ModelError {
    /// I/O failure while reading or writing the document.
    #[error("failed to read or write model file: {0}")]
    Io(#[from] std::io::Error),
    /// The document did not parse as a model.
    #[error("failed to parse model file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result alias for model I/O.
pub type Result<T> = std::result::Result<T, ModelError>;
