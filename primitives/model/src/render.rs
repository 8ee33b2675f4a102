//! The renderer contract.

use crate::rest::Resources;

/// Document metadata rendered alongside the discovered surface.
#[derive(Debug, Clone)]
pub struct DocumentInfo {
    /// Document title.
    pub project_name: String,
    /// Document version.
    pub project_version: String,
    /// Host domain.
    pub domain: String,
}

impl Default for DocumentInfo {
    fn default() -> Self {
        Self {
            project_name: "project".to_string(),
            project_version: "0.1-SNAPSHOT".to_string(),
            domain: "example.com".to_string(),
        }
    }
}

/// Common trait for all output backends.
pub trait RenderBackend {
    /// Render the discovered surface into the output document.
    fn render(&self, resources: &Resources, info: &DocumentInfo) -> String;

    /// Get backend name
    fn name(&self) -> &str;

    /// Get backend description
    fn description(&self) -> &str;
}
