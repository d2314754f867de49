#![allow(dead_code)]

use std::io::Write;

use anyhow::{Result, anyhow};
use tempfile::NamedTempFile;

use relopt::query::parser::ast::QueryModel;
use relopt::query::parser::parse;

// Parse a query that is expected to be valid
pub fn parse_ok(sql: &str) -> Result<QueryModel> {
    parse(sql).map_err(|e| anyhow!("Parse error for '{}': {}", sql, e))
}

// Joined tables in build order
pub fn join_order(model: &QueryModel) -> Vec<&str> {
    model.joins.iter().map(|j| j.table.as_str()).collect()
}

// Write JSON configuration to a temporary file
pub fn write_json_file(contents: &str) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    Ok(file)
}
