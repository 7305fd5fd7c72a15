//! Integration tests for version resolution

mod config_integration;
mod end_to_end;
mod scanner_backends;
mod test_utils;
mod tree_version_resolver;
