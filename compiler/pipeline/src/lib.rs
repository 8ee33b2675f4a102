#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! Analysis orchestration.
//!
//! Wires the pieces together for one run: open the search path, extract
//! resource methods, assemble the rendered model. Per-unit problems
//! (unresolvable classes, malformed members, uninterpretable bodies) have
//! already been degraded and logged by the lower layers; only opening the
//! search path can fail here.

pub mod assemble;

pub use assemble::assemble;

use std::path::PathBuf;

use analysis::Introspector;
use classfile::ClassResolver;
use log::info;
use model::Resources;
use registry::MethodPool;
use semantics::extract_resources;
use thiserror::Error;

/// Errors raised while setting up an analysis run.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A search-path location could not be opened.
    #[error(transparent)]
    Class(#[from] classfile::ClassError),
    /// I/O failure outside the search path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result alias for analysis runs.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Input locations for one analysis run.
#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    /// Locations scanned for resources (directories or archives).
    pub project: Vec<PathBuf>,
    /// Additional locations searched for type resolution only.
    pub classpath: Vec<PathBuf>,
}

/// Statistics of a completed run.
#[derive(Debug, Clone, Default)]
pub struct AnalysisStats {
    /// Classes found in project locations.
    pub project_classes: usize,
    /// Resource root classes.
    pub resource_classes: usize,
    /// Extracted resource methods.
    pub resource_methods: usize,
    /// Interpreted summaries cached in the method pool.
    pub interpreted_summaries: usize,
}

/// The outcome of one analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    /// The discovered surface.
    pub resources: Resources,
    /// Run statistics.
    pub stats: AnalysisStats,
}

/// Run the full analysis over the given locations.
pub fn analyze(options: &AnalyzeOptions) -> Result<AnalysisReport> {
    let resolver = ClassResolver::open(&options.project, &options.classpath)?;
    let pool = MethodPool::new();

    let extraction = extract_resources(&resolver, &pool);
    let stats = AnalysisStats {
        project_classes: resolver.project_classes().len(),
        resource_classes: extraction.resource_classes,
        resource_methods: extraction.methods.len(),
        interpreted_summaries: pool.summary_count(),
    };

    let introspector = Introspector::new(&resolver);
    let resources = assemble(extraction, &introspector);

    info!(
        "analysis complete: {} methods across {} paths",
        resources.method_count(),
        resources.entries().count()
    );
    Ok(AnalysisReport { resources, stats })
}
