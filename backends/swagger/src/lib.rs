#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! Swagger schema backend.
//!
//! Renders the discovered surface as a Swagger-2.0-style JSON document:
//! `info` from the project metadata, one `paths` entry per sub-path with
//! per-verb operations, inline body schemas, and response entries keyed by
//! status code. Maps preserve insertion order so the emitted document is
//! stable across runs.

use model::{
    Body, DocumentInfo, ParamKind, PrimitiveKind, RenderBackend, ResourceMethod, Resources,
    Response, Schema,
};
use serde_json::{json, Map, Value};
use types::TypeRef;

/// The Swagger renderer.
#[derive(Debug, Default)]
pub struct SwaggerBackend;

impl SwaggerBackend {
    /// Create the backend.
    pub fn new() -> Self { Self }
}

impl RenderBackend for SwaggerBackend {
    fn render(&self, resources: &Resources, info: &DocumentInfo) -> String {
        let mut paths = Map::new();
        for (sub_path, methods) in resources.entries() {
            let mut operations = Map::new();
            for method in methods {
                operations.insert(
                    method.verb.as_str().to_lowercase(),
                    operation(method),
                );
            }
            paths.insert(format!("/{}", sub_path), Value::Object(operations));
        }

        let document = json!({
            "swagger": "2.0",
            "info": {
                "title": info.project_name,
                "version": info.project_version,
            },
            "host": info.domain,
            "basePath": base_path(resources.base_path()),
            "paths": Value::Object(paths),
        });
        let mut rendered =
            serde_json::to_string_pretty(&document).unwrap_or_else(|_| "{}".to_string());
        rendered.push('\n');
        rendered
    }

    fn name(&self) -> &str { "swagger" }

    fn description(&self) -> &str { "Swagger-style JSON schema document" }
}

fn base_path(base: &str) -> String {
    let trimmed = base.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", trimmed)
    }
}

fn operation(method: &ResourceMethod) -> Value {
    let mut operation = Map::new();
    if !method.consumes.is_empty() {
        operation.insert("consumes".to_string(), json!(method.consumes));
    }
    if !method.produces.is_empty() {
        operation.insert("produces".to_string(), json!(method.produces));
    }

    let mut parameters = Vec::new();
    for (kind, by_name) in &method.params {
        for (name, type_ref) in by_name {
            parameters.push(json!({
                "name": name,
                "in": location(*kind),
                "required": *kind == ParamKind::Path,
                "type": parameter_type(type_ref),
            }));
        }
    }
    if let Some(body) = &method.request_body {
        parameters.push(json!({
            "name": "body",
            "in": "body",
            "required": true,
            "schema": schema_value(&body.schema),
        }));
    }
    if !parameters.is_empty() {
        operation.insert("parameters".to_string(), Value::Array(parameters));
    }

    let mut responses = Map::new();
    for (status, response) in &method.responses {
        responses.insert(status.to_string(), response_value(response));
    }
    operation.insert("responses".to_string(), Value::Object(responses));
    Value::Object(operation)
}

fn response_value(response: &Response) -> Value {
    let mut out = Map::new();
    out.insert("description".to_string(), Value::String(String::new()));
    if !response.headers.is_empty() {
        let mut headers = Map::new();
        for name in &response.headers {
            headers.insert(name.clone(), json!({ "type": "string" }));
        }
        out.insert("headers".to_string(), Value::Object(headers));
    }
    if let Some(Body { schema, .. }) = &response.body {
        out.insert("schema".to_string(), schema_value(schema));
    }
    Value::Object(out)
}

fn location(kind: ParamKind) -> &'static str {
    match kind {
        ParamKind::Path => "path",
        ParamKind::Query => "query",
        ParamKind::Header => "header",
        ParamKind::Form => "formData",
        ParamKind::Cookie => "cookie",
        ParamKind::Matrix => "matrix",
    }
}

fn parameter_type(type_ref: &TypeRef) -> &'static str {
    match type_ref.name() {
        "int" | "long" | "short" | "byte" | "java.lang.Integer" | "java.lang.Long"
        | "java.math.BigInteger" => "integer",
        "float" | "double" | "java.lang.Float" | "java.lang.Double" | "java.math.BigDecimal" => {
            "number"
        }
        "boolean" | "java.lang.Boolean" => "boolean",
        _ => "string",
    }
}

fn schema_value(schema: &Schema) -> Value {
    match schema {
        Schema::Primitive(kind) => primitive_value(*kind),
        Schema::Array(element) => json!({
            "type": "array",
            "items": schema_value(element),
        }),
        Schema::Object(properties) => {
            let mut props = Map::new();
            for property in properties {
                props.insert(property.name.clone(), schema_value(&property.schema));
            }
            json!({
                "type": "object",
                "properties": Value::Object(props),
            })
        }
    }
}

fn primitive_value(kind: PrimitiveKind) -> Value {
    match kind {
        PrimitiveKind::String => json!({ "type": "string" }),
        PrimitiveKind::Integer => json!({ "type": "integer", "example": 0 }),
        PrimitiveKind::Number => json!({ "type": "number", "example": 0.0 }),
        PrimitiveKind::Boolean => json!({ "type": "boolean", "example": false }),
        PrimitiveKind::Date => json!({ "type": "string", "format": "date" }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use model::HttpVerb;

    use super::*;

    fn sample() -> Resources {
        let mut method = ResourceMethod::new(HttpVerb::Get);
        method.produces = BTreeSet::from(["application/json".to_string()]);
        method.add_param(ParamKind::Path, "id".to_string(), TypeRef::new("long"));
        method.responses.insert(
            200,
            Response {
                headers: BTreeSet::from(["X-Request-Id".to_string()]),
                body: Some(Body {
                    type_ref: TypeRef::new("pkg.User"),
                    schema: Schema::object(vec![(
                        "name".to_string(),
                        Schema::Primitive(PrimitiveKind::String),
                    )]),
                }),
            },
        );
        let mut resources = Resources::new("rest");
        resources.add("users/{id}", method);
        resources
    }

    #[test]
    fn renders_a_stable_document() {
        let backend = SwaggerBackend::new();
        let info = DocumentInfo::default();
        let first = backend.render(&sample(), &info);
        let second = backend.render(&sample(), &info);
        assert_eq!(first, second);

        let document: serde_json::Value =
            serde_json::from_str(&first).expect("valid JSON output");
        assert_eq!(document["swagger"], "2.0");
        assert_eq!(document["basePath"], "/rest");
        assert_eq!(document["host"], "example.com");

        let operation = &document["paths"]["/users/{id}"]["get"];
        assert_eq!(operation["produces"][0], "application/json");
        assert_eq!(operation["parameters"][0]["in"], "path");
        assert_eq!(operation["parameters"][0]["type"], "integer");
        assert_eq!(
            operation["responses"]["200"]["schema"]["properties"]["name"]["type"],
            "string"
        );
        assert_eq!(
            operation["responses"]["200"]["headers"]["X-Request-Id"]["type"],
            "string"
        );
    }

    #[test]
    fn empty_base_path_renders_as_root() {
        assert_eq!(base_path(""), "/");
        assert_eq!(base_path("/"), "/");
        assert_eq!(base_path("rest"), "/rest");
        assert_eq!(base_path("/rest/"), "/rest");
    }
}
