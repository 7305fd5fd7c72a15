//! Merge rules: defaults and override order.

use crate::ignore_rules::default_project_excludes;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
///
/// Every later source overrides these; lists are replaced, not appended.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("scanner", "git")?
        .set_default("project_excludes", default_project_excludes())?
        .set_default("logging.level", "info")?
        .set_default("logging.format", "text")?
        .set_default("logging.output", "stderr")
}
