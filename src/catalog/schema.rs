// Schema Descriptor Module
//
// This module defines the Schema descriptor handed to the parser: reserved
// words plus, optionally, the known tables and their columns.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::config_error::{ConfigError, ConfigResult};

/// Words that can never be used as a column name
pub const DEFAULT_RESERVED_WORDS: &[&str] = &[
    "SELECT", "FROM", "WHERE", "JOIN", "INNER", "LEFT", "RIGHT", "ON", "AS", "AND", "OR", "NOT",
    "INSERT", "UPDATE", "DELETE", "CREATE", "DROP", "TABLE", "VALUES", "INTO", "GROUP", "BY",
    "HAVING", "ORDER",
];

/// Schema descriptor used to validate identifiers.
///
/// An empty `tables` map describes an open schema: any well-formed table or
/// column name is accepted. A table mapped to an empty column set accepts any
/// column of that table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schema {
    pub reserved_words: BTreeSet<String>,
    pub tables: BTreeMap<String, BTreeSet<String>>,
}

impl Default for Schema {
    fn default() -> Self {
        Schema {
            reserved_words: DEFAULT_RESERVED_WORDS.iter().map(|w| w.to_string()).collect(),
            tables: BTreeMap::new(),
        }
    }
}

impl Schema {
    /// Create an open schema with the default reserved words
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table and its columns
    pub fn with_table<I, S>(mut self, table: &str, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let columns = columns.into_iter().map(|c| c.as_ref().to_uppercase()).collect();
        self.tables.insert(table.to_uppercase(), columns);
        self
    }

    /// Load a schema from a JSON file such as
    /// `{"tables": {"ALUNOS": ["ID", "NOME"]}}`
    pub fn from_json_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text).map_err(|err| match err {
            ConfigError::Json { source, .. } => ConfigError::Json {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })
    }

    /// Parse a schema from JSON text
    pub fn from_json_str(text: &str) -> ConfigResult<Self> {
        let schema: Schema = serde_json::from_str(text).map_err(|source| ConfigError::Json {
            path: "<inline>".to_string(),
            source,
        })?;
        schema.normalized()
    }

    /// Uppercase every identifier, since queries are compared uppercase
    fn normalized(self) -> ConfigResult<Self> {
        let mut tables = BTreeMap::new();
        for (table, columns) in self.tables {
            let table = table.to_uppercase();
            if !is_identifier(&table) {
                return Err(ConfigError::InvalidSchema(format!("invalid table name '{}'", table)));
            }
            let columns = columns.into_iter().map(|c| c.to_uppercase()).collect();
            tables.insert(table, columns);
        }
        Ok(Schema {
            reserved_words: self.reserved_words.into_iter().map(|w| w.to_uppercase()).collect(),
            tables,
        })
    }

    /// True when the schema lists its tables
    pub fn is_closed(&self) -> bool {
        !self.tables.is_empty()
    }

    pub fn is_reserved(&self, word: &str) -> bool {
        self.reserved_words.contains(&word.to_uppercase())
    }

    pub fn has_table(&self, table: &str) -> bool {
        !self.is_closed() || self.tables.contains_key(table)
    }

    pub fn has_column(&self, table: &str, column: &str) -> bool {
        if !self.is_closed() {
            return true;
        }
        match self.tables.get(table) {
            Some(columns) => columns.is_empty() || columns.contains(column),
            None => false,
        }
    }

    /// Tables among `candidates` that list `column` explicitly
    pub fn tables_with_column<'a>(&self, column: &str, candidates: &[&'a str]) -> Vec<&'a str> {
        candidates
            .iter()
            .copied()
            .filter(|t| self.tables.get(*t).is_some_and(|cols| cols.contains(column)))
            .collect()
    }
}

/// Identifier rule shared by the parser and the schema loader: a letter or
/// underscore followed by letters, digits or underscores.
pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {
            chars.all(|c| c.is_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
