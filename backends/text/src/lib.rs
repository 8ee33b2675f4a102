#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! Plain-text backend.
//!
//! A human-readable summary: one block per resource method listing the
//! verb, the joined path, media types, parameter bindings and the
//! discovered responses with compact schema notation.

use std::fmt::Write;

use model::{DocumentInfo, RenderBackend, ResourceMethod, Resources, Schema};

/// The plain-text renderer.
#[derive(Debug, Default)]
pub struct TextBackend;

impl TextBackend {
    /// Create the backend.
    pub fn new() -> Self { Self }
}

impl RenderBackend for TextBackend {
    fn render(&self, resources: &Resources, info: &DocumentInfo) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "REST resources of {} {} ({}):",
            info.project_name, info.project_version, info.domain
        );

        for (sub_path, methods) in resources.entries() {
            for method in methods {
                let _ = writeln!(out);
                render_method(&mut out, resources.base_path(), sub_path, method);
            }
        }
        out
    }

    fn name(&self) -> &str { "plaintext" }

    fn description(&self) -> &str { "Plain-text summary of the discovered surface" }
}

fn render_method(out: &mut String, base: &str, sub_path: &str, method: &ResourceMethod) {
    let full = [base.trim_matches('/'), sub_path]
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/");
    let _ = writeln!(out, "{} /{}", method.verb, full);

    if !method.consumes.is_empty() {
        let _ = writeln!(out, "  consumes: {}", join(&method.consumes));
    }
    if !method.produces.is_empty() {
        let _ = writeln!(out, "  produces: {}", join(&method.produces));
    }
    for (kind, by_name) in &method.params {
        for (name, type_ref) in by_name {
            let _ = writeln!(out, "  {} param {}: {}", kind.label(), name, type_ref);
        }
    }
    if let Some(body) = &method.request_body {
        let _ = writeln!(out, "  request body: {} {}", body.type_ref, describe(&body.schema));
    }
    for (status, response) in &method.responses {
        let _ = writeln!(out, "  status {}", status);
        for header in &response.headers {
            let _ = writeln!(out, "    header: {}", header);
        }
        if let Some(body) = &response.body {
            let _ =
                writeln!(out, "    response body: {} {}", body.type_ref, describe(&body.schema));
        }
    }
}

fn join(items: &std::collections::BTreeSet<String>) -> String {
    items.iter().cloned().collect::<Vec<_>>().join(", ")
}

/// Compact schema notation: `string`, `array<object{...}>`, `object{a:
/// integer, b: string}`.
fn describe(schema: &Schema) -> String {
    match schema {
        Schema::Primitive(kind) => kind.as_str().to_string(),
        Schema::Array(element) => format!("array<{}>", describe(element)),
        Schema::Object(properties) => {
            let inner = properties
                .iter()
                .map(|p| format!("{}: {}", p.name, describe(&p.schema)))
                .collect::<Vec<_>>()
                .join(", ");
            format!("object{{{}}}", inner)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use model::{Body, HttpVerb, ParamKind, PrimitiveKind, Response};
    use types::TypeRef;

    use super::*;

    #[test]
    fn renders_one_block_per_method() {
        let mut method = ResourceMethod::new(HttpVerb::Get);
        method.produces = BTreeSet::from(["application/json".to_string()]);
        method.add_param(ParamKind::Query, "full".to_string(), TypeRef::new("boolean"));
        method.responses.insert(
            200,
            Response {
                headers: BTreeSet::new(),
                body: Some(Body {
                    type_ref: TypeRef::with_args(
                        "java.util.List",
                        vec![TypeRef::new("pkg.User")],
                    ),
                    schema: Schema::Array(Box::new(Schema::object(vec![(
                        "name".to_string(),
                        Schema::Primitive(PrimitiveKind::String),
                    )]))),
                }),
            },
        );

        let mut resources = Resources::new("rest");
        resources.add("users", method);

        let text = TextBackend::new().render(&resources, &DocumentInfo::default());
        assert!(text.contains("GET /rest/users"));
        assert!(text.contains("produces: application/json"));
        assert!(text.contains("query param full: boolean"));
        assert!(text.contains("status 200"));
        assert!(text.contains("array<object{name: string}>"));
    }
}
