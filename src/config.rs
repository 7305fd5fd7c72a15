//! Configuration System
//!
//! Layered configuration for version resolution sessions. Sources, lowest to
//! highest precedence: built-in defaults, the global config file, the project
//! config files, then `STAMP_*` environment variables.

use crate::error::ConfigurationError;
use crate::logging::LoggingConfig;
use crate::path::{normalize_lexically, resolve_relative};
use crate::resolver::ResolverSettings;
use crate::scanner::ScannerKind;
use crate::selector;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

mod merge;
mod sources;

pub use sources::global_file::global_config_path;
pub use sources::project_file::PROJECT_CONFIG_DIR;

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StampConfig {
    /// Project root. Relative values are resolved against the directory the
    /// configuration was loaded for.
    #[serde(default)]
    pub project_root: PathBuf,

    /// Scanner backend
    #[serde(default)]
    pub scanner: ScannerKind,

    /// Extra ignore file name honored by the scanner, e.g. ".stampignore"
    #[serde(default)]
    pub ignore_file: Option<String>,

    /// Excludes applied to units rooted at the project root that declare no
    /// include rules
    #[serde(default = "crate::ignore_rules::default_project_excludes")]
    pub project_excludes: Vec<String>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for StampConfig {
    fn default() -> Self {
        Self {
            project_root: PathBuf::new(),
            scanner: ScannerKind::default(),
            ignore_file: None,
            project_excludes: crate::ignore_rules::default_project_excludes(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    ProjectRoot(String),
    ProjectExclude(String, String),
    IgnoreFile(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::ProjectRoot(msg) => write!(f, "Project root: {}", msg),
            ValidationError::ProjectExclude(pattern, msg) => {
                write!(f, "Project exclude '{}': {}", pattern, msg)
            }
            ValidationError::IgnoreFile(msg) => write!(f, "Ignore file: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl StampConfig {
    /// Validate the entire configuration, reporting every problem found
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if !self.project_root.is_absolute() {
            errors.push(ValidationError::ProjectRoot(format!(
                "must be absolute, got '{}'",
                self.project_root.display()
            )));
        }

        for pattern in &self.project_excludes {
            if let Err(e) = selector::validate_pattern(pattern) {
                errors.push(ValidationError::ProjectExclude(pattern.clone(), e.to_string()));
            }
        }

        if let Some(name) = &self.ignore_file {
            if name.is_empty() || name.contains('/') || name.contains('\\') {
                errors.push(ValidationError::IgnoreFile(format!(
                    "'{}' must be a plain file name",
                    name
                )));
            }
        }

        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Settings the resolver needs from this configuration
    pub fn resolver_settings(&self) -> ResolverSettings {
        ResolverSettings {
            project_root: self.project_root.clone(),
            project_excludes: self.project_excludes.clone(),
        }
    }

    fn anchor(mut self, project_root: &Path) -> Self {
        self.project_root = resolve_relative(project_root, &self.project_root);
        self
    }
}

/// Loads `StampConfig` from the layered sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for the project at `project_root`
    pub fn load(project_root: &Path) -> Result<StampConfig, ConfigurationError> {
        let root = absolute_root(project_root)?;

        let builder = merge::merge_policy::builder_with_defaults()?;
        let builder = sources::global_file::add_to_builder(builder)?;
        let builder = sources::project_file::add_to_builder(builder, &root)?;
        let builder = sources::environment::add_to_builder(builder);

        let config: StampConfig = builder.build()?.try_deserialize()?;
        let config = config.anchor(&root);
        debug!(
            project_root = %config.project_root.display(),
            scanner = %config.scanner,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Load configuration from a single file, on top of the defaults only
    ///
    /// A relative `project_root` in the file is resolved against the file's
    /// directory.
    pub fn load_from_file(path: &Path) -> Result<StampConfig, ConfigurationError> {
        let builder = merge::merge_policy::builder_with_defaults()?
            .add_source(config::File::from(path.to_path_buf()).required(true));
        let config: StampConfig = builder.build()?.try_deserialize()?;

        let dir = path.parent().unwrap_or(Path::new("."));
        Ok(config.anchor(&absolute_root(dir)?))
    }

    /// Load and validate, folding validation errors into one
    pub fn load_validated(project_root: &Path) -> Result<StampConfig, ConfigurationError> {
        let config = Self::load(project_root)?;
        config.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ConfigurationError::Load(format!(
                "Configuration validation failed:\n{}",
                messages.join("\n")
            ))
        })?;
        Ok(config)
    }
}

fn absolute_root(path: &Path) -> Result<PathBuf, ConfigurationError> {
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| ConfigurationError::Load(format!("Cannot determine working directory: {}", e)))?
            .join(path)
    };
    // Kept lexical so the root stays spelled the way unit paths are.
    Ok(normalize_lexically(&path))
}
