//! The model assembler.
//!
//! Combines extractor output with simulator findings and type
//! introspection into the [`Resources`] model handed to renderers. Body
//! types are introspected once per reference (the introspector caches),
//! entries sort lexically by path and by verb.

use std::collections::BTreeSet;

use analysis::Introspector;
use model::{Body, Resources, ResourceMethod, Response};
use semantics::{ExtractedMethod, Extraction};
use types::TypeRef;

/// Assemble the rendered model from an extraction.
pub fn assemble(extraction: Extraction, introspector: &Introspector<'_>) -> Resources {
    let mut resources = Resources::new(extraction.base_path);
    for extracted in extraction.methods {
        let sub_path = extracted.sub_path.clone();
        let method = assemble_method(extracted, introspector);
        resources.add(sub_path, method);
    }
    resources.sort_methods();
    resources
}

fn assemble_method(extracted: ExtractedMethod, introspector: &Introspector<'_>) -> ResourceMethod {
    let mut method = ResourceMethod::new(extracted.verb);
    method.consumes = extracted.consumes;
    method.produces = extracted.produces;
    for (kind, name, type_ref) in extracted.params {
        method.add_param(kind, name, type_ref);
    }
    method.request_body = extracted.request_body.map(|t| body_of(introspector, t));

    // Default status when none was observed: 200, 204 for void methods.
    let default_status: u16 = if extracted.returns_void { 204 } else { 200 };

    if extracted.responses.is_empty() {
        let body = extracted.return_body.map(|t| body_of(introspector, t));
        method.responses.insert(default_status, Response { headers: BTreeSet::new(), body });
        return method;
    }

    for aggregate in extracted.responses {
        let statuses = if aggregate.statuses.is_empty() {
            BTreeSet::from([default_status])
        } else {
            aggregate.statuses.clone()
        };
        let body_type = aggregate.entity_types.iter().next().cloned();
        for status in statuses {
            let entry = method.responses.entry(status).or_default();
            entry.headers.extend(aggregate.headers.iter().cloned());
            if entry.body.is_none() {
                if let Some(type_ref) = &body_type {
                    entry.body = Some(body_of(introspector, type_ref.clone()));
                }
            }
        }
    }
    method
}

fn body_of(introspector: &Introspector<'_>, type_ref: TypeRef) -> Body {
    Body { schema: introspector.introspect(&type_ref), type_ref }
}
