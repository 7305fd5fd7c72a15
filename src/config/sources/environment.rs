//! Environment source: STAMP_* variables, `__` between nested keys.
//!
//! `STAMP_SCANNER=fs`, `STAMP_LOGGING__LEVEL=debug`,
//! `STAMP_PROJECT_EXCLUDES=.git,target`.

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;

pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix("STAMP")
            .prefix_separator("_")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("project_excludes")
            .try_parsing(true),
    )
}
