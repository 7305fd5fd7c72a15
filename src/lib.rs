//! Stamp: deterministic versions for build and deploy units
//!
//! Computes a content-addressable version string for each unit of a project
//! from the files under its source tree, its version-relevant configuration and
//! the versions of its build dependencies. Tree scans are cached per session
//! and invalidated by path.

pub mod cache;
pub mod compose;
pub mod config;
pub mod error;
pub mod hasher;
pub mod ignore_rules;
pub mod logging;
pub mod path;
pub mod resolver;
pub mod scanner;
pub mod selector;
pub mod session;
pub mod types;
pub mod unit;
pub mod watch;

pub use cache::{CacheStats, TreeCache};
pub use compose::{compose_full_version, compose_tree_digest_version};
pub use config::{ConfigLoader, StampConfig};
pub use error::{ConfigurationError, ScanError, VersionError, WatchError};
pub use resolver::{GetTreeVersionOptions, ResolverSettings, TreeVersionResolver};
pub use scanner::{create_scanner, ScanOptions, ScannerKind, TreeScanner};
pub use session::{BatchResult, Session};
pub use types::{ModuleVersion, NamedModuleVersion, NamedTreeVersion, ScannedFile, TreeVersion};
pub use unit::{BuildDependency, CacheKey, UnitConfig};
