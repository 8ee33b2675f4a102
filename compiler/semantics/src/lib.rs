#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! Resource extraction.
//!
//! Scans every class found in the project locations, recognizes resource
//! roots by their class-level `Path` annotation, and for each resource
//! method recovers the HTTP verb, the effective URI template, media types
//! and parameter bindings from annotations, then submits the method body to
//! the simulator to recover status codes, headers and body types.
//!
//! With the `parallel` feature the per-class scans run on a rayon pool;
//! the resolver and the method pool are shared, everything else is
//! per-scan state.

use std::collections::BTreeSet;

use analysis::{simulate_method, AnalysisEnv};
use classfile::{Annotation, ClassRecord, ClassResolver, MethodRecord};
use log::{debug, info};
use model::{HttpVerb, ParamKind};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use registry::MethodPool;
use types::wellknown;
use types::{HttpResponse, TypeRef};

/// One extracted resource method, before assembly into the rendered model.
#[derive(Debug, Clone)]
pub struct ExtractedMethod {
    /// Effective sub-path (class-level and method-level templates joined).
    pub sub_path: String,
    /// HTTP verb.
    pub verb: HttpVerb,
    /// Requested media types, after class-level fallback.
    pub consumes: BTreeSet<String>,
    /// Produced media types, after class-level fallback.
    pub produces: BTreeSet<String>,
    /// Bound parameters: kind, binding name, declared type.
    pub params: Vec<(ParamKind, String, TypeRef)>,
    /// The request body type, when an unannotated entity parameter exists.
    pub request_body: Option<TypeRef>,
    /// Response aggregates recovered by the simulator.
    pub responses: Vec<HttpResponse>,
    /// Observed (or declared) return body type for plain-return methods;
    /// `None` when the method returns `void` or a response wrapper.
    pub return_body: Option<TypeRef>,
    /// Whether the method's declared return type is `void`.
    pub returns_void: bool,
}

/// The extraction result handed to the assembler.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Application base path (`ApplicationPath` or `/`).
    pub base_path: String,
    /// All extracted resource methods.
    pub methods: Vec<ExtractedMethod>,
    /// Number of resource root classes seen.
    pub resource_classes: usize,
}

/// Per-class scan result, folded into the final [`Extraction`].
struct ClassScan {
    app_path: Option<String>,
    methods: Vec<ExtractedMethod>,
    is_resource: bool,
}

/// Scan the project classes and extract every resource method.
pub fn extract_resources(resolver: &ClassResolver, pool: &MethodPool) -> Extraction {
    let names = resolver.project_classes();

    #[cfg(feature = "parallel")]
    let scans: Vec<ClassScan> =
        names.par_iter().map(|fqcn| scan_class(resolver, pool, fqcn)).collect();
    #[cfg(not(feature = "parallel"))]
    let scans: Vec<ClassScan> = names.iter().map(|fqcn| scan_class(resolver, pool, fqcn)).collect();

    let mut extraction = Extraction { base_path: "/".to_string(), ..Extraction::default() };
    for scan in scans {
        if let Some(app_path) = scan.app_path {
            extraction.base_path = app_path;
        }
        if scan.is_resource {
            extraction.resource_classes += 1;
        }
        extraction.methods.extend(scan.methods);
    }

    info!(
        "extracted {} resource methods from {} resource classes",
        extraction.methods.len(),
        extraction.resource_classes
    );
    extraction
}

fn scan_class(resolver: &ClassResolver, pool: &MethodPool, fqcn: &str) -> ClassScan {
    let mut scan = ClassScan { app_path: None, methods: Vec::new(), is_resource: false };
    let record = resolver.get(fqcn);
    if record.synthetic {
        return scan;
    }

    scan.app_path = ws_annotation(&record.annotations, "ApplicationPath")
        .and_then(Annotation::string_value)
        .map(str::to_string);

    let Some(class_path) =
        ws_annotation(&record.annotations, "Path").map(|a| a.string_value().unwrap_or(""))
    else {
        return scan;
    };
    scan.is_resource = true;
    debug!("resource root {} at {:?}", record.name, class_path);

    let env = AnalysisEnv { resolver, pool };
    for (owner, method) in candidate_methods(resolver, record.as_ref()) {
        if let Some(extracted) = extract_method(&env, record.as_ref(), &owner, &method, class_path)
        {
            scan.methods.push(extracted);
        }
    }
    scan
}

/// The annotation with the given `ws.rs` simple name, from either
/// namespace.
fn ws_annotation<'a>(annotations: &'a [Annotation], simple: &str) -> Option<&'a Annotation> {
    annotations.iter().find(|a| wellknown::ws_rs_name(&a.type_name) == Some(simple))
}

/// Public methods of the resource class, including inherited ones the
/// subclass does not redeclare. Instructions stay attached to the class
/// that declared them.
fn candidate_methods(
    resolver: &ClassResolver,
    record: &ClassRecord,
) -> Vec<(String, MethodRecord)> {
    let mut out: Vec<(String, MethodRecord)> = record
        .methods
        .iter()
        .filter(|m| m.is_public() && !m.name.starts_with('<'))
        .map(|m| (record.name.clone(), m.clone()))
        .collect();

    for ancestor in resolver.superclass_chain(&record.name).into_iter().skip(1) {
        if ancestor == "java.lang.Object" {
            break;
        }
        let ancestor_record = resolver.get(&ancestor);
        for method in &ancestor_record.methods {
            if !method.is_public() || method.name.starts_with('<') {
                continue;
            }
            let redeclared = out
                .iter()
                .any(|(_, m)| m.name == method.name && same_erasure(&m.params, &method.params));
            if !redeclared {
                out.push((ancestor.clone(), method.clone()));
            }
        }
    }
    out
}

fn same_erasure(a: &[TypeRef], b: &[TypeRef]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.name() == y.name())
}

fn extract_method(
    env: &AnalysisEnv<'_>,
    resource: &ClassRecord,
    owner: &str,
    method: &MethodRecord,
    class_path: &str,
) -> Option<ExtractedMethod> {
    let verb = method.annotations.iter().find_map(|a| {
        wellknown::ws_rs_name(&a.type_name).and_then(HttpVerb::from_annotation)
    })?;

    let method_path = ws_annotation(&method.annotations, "Path")
        .and_then(Annotation::string_value)
        .unwrap_or("");
    let sub_path = uri::join(class_path, method_path);

    let consumes = media_types(&method.annotations, &resource.annotations, "Consumes");
    let produces = media_types(&method.annotations, &resource.annotations, "Produces");

    let mut params = Vec::new();
    let mut request_body = None;
    for (index, param_type) in method.params.iter().enumerate() {
        match binding_of(method.annotations_of_param(index)) {
            Some((kind, name)) => params.push((kind, name, param_type.clone())),
            None => {
                if !param_type.is_primitive() && request_body.is_none() {
                    request_body = Some(param_type.clone());
                }
            }
        }
    }

    let id = method.identifier(owner);
    let element = method
        .instructions
        .as_deref()
        .map(|instructions| simulate_method(env, &id, instructions));

    let returns_void = method.ret.is_void();
    let responses: Vec<HttpResponse> =
        element.as_ref().map(|e| e.responses().iter().cloned().collect()).unwrap_or_default();

    // For a method that returns a plain value (not a response wrapper) the
    // body type is the observed element type, the declared type when the
    // body could not be simulated, and absent for void.
    let return_body = if returns_void || wellknown::is_response_like(&method.ret) {
        None
    } else {
        let observed = element
            .as_ref()
            .map(|e| e.type_ref().clone())
            .filter(|t| !t.is_object() && !t.is_void());
        Some(observed.unwrap_or_else(|| method.ret.clone()))
    };

    Some(ExtractedMethod {
        sub_path,
        verb,
        consumes,
        produces,
        params,
        request_body,
        responses,
        return_body,
        returns_void,
    })
}

/// Media types from the method-level annotation, falling back to the
/// class-level one.
fn media_types(
    method_annotations: &[Annotation],
    class_annotations: &[Annotation],
    simple: &str,
) -> BTreeSet<String> {
    ws_annotation(method_annotations, simple)
        .or_else(|| ws_annotation(class_annotations, simple))
        .map(|a| a.string_values().into_iter().collect())
        .unwrap_or_default()
}

/// The first binding annotation on a parameter selects its kind.
fn binding_of(annotations: &[Annotation]) -> Option<(ParamKind, String)> {
    annotations.iter().find_map(|a| {
        let kind = wellknown::ws_rs_name(&a.type_name).and_then(ParamKind::from_annotation)?;
        Some((kind, a.string_value().unwrap_or("").to_string()))
    })
}
