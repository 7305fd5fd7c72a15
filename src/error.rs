//! Error types for version resolution.

use std::path::PathBuf;
use thiserror::Error;

/// Tree scanning errors
///
/// A scan either returns the full matching file set or one of these; partial
/// results are never surfaced.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Scan root not found: {0}")]
    RootNotFound(PathBuf),

    #[error("Scan root is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Invalid selector pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Failed to walk {path}: {message}")]
    Walk { path: PathBuf, message: String },

    #[error("Failed to read file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Scan task failed: {0}")]
    Task(String),
}

/// Malformed unit descriptors and caller contract violations
#[derive(Debug, Clone, Error)]
pub enum ConfigurationError {
    #[error("Path must be absolute: {0}")]
    NotAbsolute(PathBuf),

    #[error("Invalid selector '{pattern}' on unit '{unit}': {message}")]
    InvalidSelector {
        unit: String,
        pattern: String,
        message: String,
    },

    #[error("Missing version for dependency '{dependency}' of unit '{unit}'")]
    MissingDependencyVersion { unit: String, dependency: String },

    #[error("Dependency cycle detected among units: {}", .0.join(", "))]
    DependencyCycle(Vec<String>),

    #[error("Invalid unit '{name}': {message}")]
    InvalidUnit { name: String, message: String },

    #[error("Configuration error: {0}")]
    Load(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

impl From<config::ConfigError> for ConfigurationError {
    fn from(err: config::ConfigError) -> Self {
        ConfigurationError::Load(err.to_string())
    }
}

/// Errors surfaced while resolving a unit's version
#[derive(Debug, Error)]
pub enum VersionError {
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Unit '{unit}' cannot be resolved: dependency '{dependency}' failed")]
    DependencyFailed { unit: String, dependency: String },

    /// Internal consistency failure. Indicates a bug, never a recoverable state.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

/// File watcher setup failures
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Failed to create file watcher: {0}")]
    Init(String),

    #[error("Failed to watch {path}: {message}")]
    Watch { path: PathBuf, message: String },
}
