//! Catalog Module
//!
//! This module holds the configuration the core consumes from the outside:
//! the schema descriptor used by the parser and the optional per-table
//! statistics used by join ordering.

pub mod config_error;
pub mod schema;
pub mod statistics;

// Re-export key types
pub use self::config_error::{ConfigError, ConfigResult};
pub use self::schema::Schema;
pub use self::statistics::Statistics;
