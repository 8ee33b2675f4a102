//! Structural schemas for message bodies.
//!
//! A schema is a tagged tree: primitive leaves, arrays and objects. Object
//! properties preserve declaration order (fields first, then getters), which
//! is why they are a vector of named properties rather than a sorted map.

use serde::{Deserialize, Serialize};

/// Primitive schema leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    /// Textual values (also UUIDs and enum constants).
    String,
    /// Whole numbers; rendered with sample `0`.
    Integer,
    /// Fractional numbers; rendered with sample `0.0`.
    Number,
    /// Booleans; rendered with sample `false`.
    Boolean,
    /// Dates and times.
    Date,
}

impl PrimitiveKind {
    /// Wire name of the primitive.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Date => "date",
        }
    }
}

/// A named object property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaProperty {
    /// Property name (getter names normalized).
    pub name: String,
    /// Property schema.
    pub schema: Schema,
}

/// A structural schema tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Schema {
    /// A primitive leaf.
    Primitive(PrimitiveKind),
    /// An array of a single element schema.
    Array(Box<Schema>),
    /// An object with ordered properties. A cycle sentinel is an object
    /// with no properties.
    Object(Vec<SchemaProperty>),
}

impl Schema {
    /// The empty-object sentinel used for unresolvable and cyclic types.
    pub fn empty_object() -> Self { Self::Object(Vec::new()) }

    /// Build an object schema from `(name, schema)` pairs.
    pub fn object(props: Vec<(String, Schema)>) -> Self {
        Self::Object(props.into_iter().map(|(name, schema)| SchemaProperty { name, schema }).collect())
    }

    /// Whether this is a primitive leaf.
    pub fn is_primitive(&self) -> bool { matches!(self, Self::Primitive(_)) }
}
