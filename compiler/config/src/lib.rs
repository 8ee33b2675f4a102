#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! Analyzer configuration.
//!
//! This crate provides configuration management for restscan. It handles
//! loading and saving the TOML configuration file that specifies:
//! - Project metadata rendered into the output document (name, version,
//!   domain)
//! - The output backend and optional output location
//! - Logging verbosity
//!
//! Every field has a sensible default so the analyzer runs without any
//! configuration file at all; command-line flags override file values.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading or saving configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    /// Failed to parse the TOML configuration file
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    /// Failed to serialize configuration to TOML format
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    /// Could not locate the user's configuration directory
    #[error("Could not find user config directory")]
    ConfigDirUnavailable,
    /// The backend name is not recognized
    #[error("Unknown backend '{0}' (expected 'swagger' or 'plaintext')")]
    UnknownBackend(String),
}

/// The output renderer to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Swagger-style JSON schema document.
    #[default]
    Swagger,
    /// Plain-text summary.
    Plaintext,
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "swagger" => Ok(Self::Swagger),
            "plaintext" => Ok(Self::Plaintext),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Project metadata rendered into the output document
    pub project: ProjectConfig,
    /// Output settings
    pub output: OutputConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Project metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name (document title)
    pub name: String,
    /// Project version
    pub version: String,
    /// Host domain rendered into the document
    pub domain: String,
}

/// Output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Renderer selection
    pub backend: BackendKind,
    /// Where to write the document; standard output when absent
    pub location: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (debug, info, warn, error)
    pub level: String,
}

impl Config {
    /// Load configuration from a TOML file at `path`
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save this configuration as a pretty-printed TOML file at `path`
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Returns the default config file path:
    /// `{config_dir()}/restscan/config.toml`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let config_dir =
            dirs::config_dir().ok_or(ConfigError::ConfigDirUnavailable)?.join("restscan");
        Ok(config_dir.join("config.toml"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project: ProjectConfig {
                name: "project".to_string(),
                version: "0.1-SNAPSHOT".to_string(),
                domain: "example.com".to_string(),
            },
            output: OutputConfig { backend: BackendKind::Swagger, location: None },
            logging: LoggingConfig { level: "info".to_string() },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn test_from_file() {
        let temp_file = NamedTempFile::new().expect("Failed to create temporary file");
        let toml_content = r#"
            [project]
            name = "store"
            version = "2.3"
            domain = "api.store.example"

            [output]
            backend = "plaintext"
            location = "surface.txt"

            [logging]
            level = "debug"
        "#;
        fs::write(&temp_file, toml_content)
            .expect("Failed to write TOML content to temporary file");

        let loaded = Config::from_file(&temp_file).expect("Failed to load config");
        assert_eq!(loaded.project.name, "store");
        assert_eq!(loaded.project.version, "2.3");
        assert_eq!(loaded.project.domain, "api.store.example");
        assert_eq!(loaded.output.backend, BackendKind::Plaintext);
        assert_eq!(loaded.output.location, Some(PathBuf::from("surface.txt")));
        assert_eq!(loaded.logging.level, "debug");

        // File not found surfaces as a read error.
        let result = Config::from_file("nonexistent_file.toml");
        assert!(matches!(result, Err(ConfigError::FileRead(_))));

        // Invalid TOML surfaces as a parse error.
        let temp_file = NamedTempFile::new().expect("Failed to create temporary file");
        fs::write(&temp_file, "invalid toml content").expect("Failed to write invalid TOML");
        let result = Config::from_file(&temp_file);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_save_round_trip() {
        let config = Config::default();
        let temp_file = NamedTempFile::new().expect("Failed to create temporary file");

        config.save(&temp_file).expect("Failed to save config");
        let contents = fs::read_to_string(&temp_file).expect("Failed to read saved config");
        assert!(contents.contains("project"));
        assert!(contents.contains("0.1-SNAPSHOT"));
        assert!(contents.contains("example.com"));
        assert!(contents.contains("swagger"));

        let reloaded = Config::from_file(&temp_file).expect("Failed to reload config");
        assert_eq!(reloaded.project.name, config.project.name);
        assert_eq!(reloaded.output.backend, config.output.backend);
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.project.name, "project");
        assert_eq!(config.project.version, "0.1-SNAPSHOT");
        assert_eq!(config.project.domain, "example.com");
        assert_eq!(config.output.backend, BackendKind::Swagger);
        assert_eq!(config.output.location, None);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_backend_parsing() {
        assert_eq!("swagger".parse::<BackendKind>().expect("swagger"), BackendKind::Swagger);
        assert_eq!(
            "plaintext".parse::<BackendKind>().expect("plaintext"),
            BackendKind::Plaintext
        );
        assert!(matches!(
            "xml".parse::<BackendKind>(),
            Err(ConfigError::UnknownBackend(_))
        ));
    }

    #[test]
    fn test_default_path() {
        let path = Config::default_path().expect("Failed to get default config path");
        let path_str = path.to_str().expect("Path should be valid UTF-8");
        assert!(path_str.contains("restscan"));
        assert!(path_str.ends_with("config.toml"));
    }
}
