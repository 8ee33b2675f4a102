//! Resources, resource methods and per-status responses.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use types::TypeRef;

use crate::schema::Schema;
use crate::Result;

/// HTTP verbs recognized on resource methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HttpVerb {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
    /// `HEAD`
    Head,
    /// `OPTIONS`
    Options,
    /// `PATCH`
    Patch,
}

impl HttpVerb {
    /// Parse a verb from its annotation simple name.
    pub fn from_annotation(name: &str) -> Option<Self> {
        match name {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "DELETE" => Some(Self::Delete),
            "HEAD" => Some(Self::Head),
            "OPTIONS" => Some(Self::Options),
            "PATCH" => Some(Self::Patch),
            _ => None,
        }
    }

    /// Upper-case wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Patch => "PATCH",
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Parameter binding kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ParamKind {
    /// `PathParam`
    Path,
    /// `QueryParam`
    Query,
    /// `HeaderParam`
    Header,
    /// `FormParam`
    Form,
    /// `CookieParam`
    Cookie,
    /// `MatrixParam`
    Matrix,
}

impl ParamKind {
    /// Parse a kind from its binding-annotation simple name.
    pub fn from_annotation(name: &str) -> Option<Self> {
        match name {
            "PathParam" => Some(Self::Path),
            "QueryParam" => Some(Self::Query),
            "HeaderParam" => Some(Self::Header),
            "FormParam" => Some(Self::Form),
            "CookieParam" => Some(Self::Cookie),
            "MatrixParam" => Some(Self::Matrix),
            _ => None,
        }
    }

    /// Human-readable label used by the text backend.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "header",
            Self::Form => "form",
            Self::Cookie => "cookie",
            Self::Matrix => "matrix",
        }
    }
}

/// A message body: the declared type and its structural schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Body {
    /// Declared type of the body.
    pub type_ref: TypeRef,
    /// Structural schema derived by introspection.
    pub schema: Schema,
}

/// One response entry: declared headers plus an optional body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Response {
    /// Header names declared on this response.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub headers: BTreeSet<String>,
    /// Response body, when one was observed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Body>,
}

/// One resource method: verb, media types, parameter bindings, request body
/// and the status-code → response mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMethod {
    /// HTTP verb.
    pub verb: HttpVerb,
    /// Requested media types (`Consumes`).
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub consumes: BTreeSet<String>,
    /// Produced media types (`Produces`).
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub produces: BTreeSet<String>,
    /// Parameter bindings by kind, then by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<ParamKind, BTreeMap<String, TypeRef>>,
    /// Request body, when an unannotated entity parameter was present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<Body>,
    /// Status code → response mapping.
    pub responses: BTreeMap<u16, Response>,
}

impl ResourceMethod {
    /// A method with the given verb and no other information yet.
    pub fn new(verb: HttpVerb) -> Self {
        Self {
            verb,
            consumes: BTreeSet::new(),
            produces: BTreeSet::new(),
            params: BTreeMap::new(),
            request_body: None,
            responses: BTreeMap::new(),
        }
    }

    /// Record a parameter binding.
    pub fn add_param(&mut self, kind: ParamKind, name: String, type_ref: TypeRef) {
        self.params.entry(kind).or_default().insert(name, type_ref);
    }

    /// Parameter bindings of one kind.
    pub fn params_of(&self, kind: ParamKind) -> Option<&BTreeMap<String, TypeRef>> {
        self.params.get(&kind)
    }
}

/// The discovered REST surface: a base path plus the sub-path → methods
/// mapping, kept sorted for stable rendering.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Resources {
    base_path: String,
    by_path: BTreeMap<String, Vec<ResourceMethod>>,
}

impl Resources {
    /// An empty surface with the given base path.
    pub fn new(base_path: impl Into<String>) -> Self {
        Self { base_path: base_path.into(), by_path: BTreeMap::new() }
    }

    /// The application base path.
    pub fn base_path(&self) -> &str { &self.base_path }

    /// Replace the application base path.
    pub fn set_base_path(&mut self, base_path: impl Into<String>) {
        self.base_path = base_path.into();
    }

    /// Whether no resource method was discovered.
    pub fn is_empty(&self) -> bool { self.by_path.is_empty() }

    /// Number of resource methods across all paths.
    pub fn method_count(&self) -> usize { self.by_path.values().map(Vec::len).sum() }

    /// Append a method under a sub-path.
    pub fn add(&mut self, sub_path: impl Into<String>, method: ResourceMethod) {
        self.by_path.entry(sub_path.into()).or_default().push(method);
    }

    /// Iterate sub-paths and their methods in lexical path order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &[ResourceMethod])> {
        self.by_path.iter().map(|(p, ms)| (p.as_str(), ms.as_slice()))
    }

    /// The methods registered under one sub-path.
    pub fn methods_at(&self, sub_path: &str) -> Option<&[ResourceMethod]> {
        self.by_path.get(sub_path).map(Vec::as_slice)
    }

    /// Sort each path's methods lexically by verb name. Called once by the
    /// assembler so rendering never depends on discovery order.
    pub fn sort_methods(&mut self) {
        for methods in self.by_path.values_mut() {
            methods.sort_by_key(|m| m.verb.as_str());
        }
    }

    /// Load a model dump from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let model = serde_json::from_str(&content)?;
        Ok(model)
    }

    /// Save this model as pretty-printed JSON.
    pub fn to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(&mut file, self)?;
        use std::io::Write;
        writeln!(file)?;
        Ok(())
    }
}
