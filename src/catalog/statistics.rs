// Table Statistics Module
//
// Externally supplied per-table row-count estimates used by join ordering.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::config_error::{ConfigError, ConfigResult};

/// Row estimate for tables without statistics
pub const DEFAULT_ROW_ESTIMATE: u64 = 1000;

/// Estimated fraction of rows kept by one pushed-down predicate
pub const PREDICATE_SELECTIVITY: f64 = 0.1;

/// Per-table cardinality estimates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Statistics {
    pub table_rows: BTreeMap<String, u64>,
    pub default_rows: u64,
}

impl Default for Statistics {
    fn default() -> Self {
        Statistics {
            table_rows: BTreeMap::new(),
            default_rows: DEFAULT_ROW_ESTIMATE,
        }
    }
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the estimated row count of a table
    pub fn with_table(mut self, table: &str, rows: u64) -> Self {
        self.table_rows.insert(table.to_uppercase(), rows);
        self
    }

    /// Load statistics from JSON such as `{"table_rows": {"CURSOS": 50}}`
    pub fn from_json_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let stats: Statistics = serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.display().to_string(),
            source,
        })?;
        if stats.default_rows == 0 {
            return Err(ConfigError::InvalidStatistics("default_rows must be positive".to_string()));
        }
        Ok(Statistics {
            table_rows: stats
                .table_rows
                .into_iter()
                .map(|(t, rows)| (t.to_uppercase(), rows))
                .collect(),
            default_rows: stats.default_rows,
        })
    }

    /// Base row estimate for `table`
    pub fn rows_for(&self, table: &str) -> u64 {
        self.table_rows.get(table).copied().unwrap_or(self.default_rows)
    }

    /// Estimated rows left after `predicates` pushed-down filters
    pub fn estimate_after_filters(&self, table: &str, predicates: usize) -> f64 {
        let exponent = i32::try_from(predicates).unwrap_or(i32::MAX);
        self.rows_for(table) as f64 * PREDICATE_SELECTIVITY.powi(exponent)
    }
}
