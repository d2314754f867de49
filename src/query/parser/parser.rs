// SQL Parser Implementation
//
// This module validates a query against the supported SELECT grammar and
// builds the query model. Validation runs in a fixed order and the first
// violated rule is reported; no partial model is ever returned.

use log::{debug, warn};
use thiserror::Error;

use crate::catalog::schema::{Schema, is_identifier};

use super::ast::*;
use super::grammar::{DANGLING_WHERE, JOIN_PATTERN, QUERY_PATTERN, find_malformed_join};
use super::predicate::parse_conjunction;

/// SQL parsing errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Missing ';' statement terminator at the end of the query")]
    MissingTerminator,
    #[error("Query must start with SELECT")]
    MissingSelect,
    #[error("Syntax error: query does not match SELECT ... FROM ... [INNER JOIN ... ON ...] [WHERE ...]")]
    SyntaxError,
    #[error("Invalid column '{column}': {reason}")]
    InvalidColumn { column: String, reason: String },
    #[error("Invalid table '{table}': {reason}")]
    InvalidTable { table: String, reason: String },
    #[error("Invalid INNER JOIN '{clause}': {reason}")]
    InvalidJoin { clause: String, reason: String },
    #[error("WHERE condition is empty")]
    EmptyWhere,
}

/// Result type for parsing operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Parser for the supported SELECT subset
#[derive(Debug, Clone, Default)]
pub struct Parser {
    schema: Schema,
}

/// Parse `query` against an open schema with the default reserved words
pub fn parse(query: &str) -> ParseResult<QueryModel> {
    Parser::new().parse(query)
}

impl Parser {
    /// Create a parser with the default (open) schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parser that validates identifiers against `schema`
    pub fn with_schema(schema: Schema) -> Self {
        Parser { schema }
    }

    /// Parse a SQL query into a query model.
    ///
    /// The whole input is uppercased before matching, so string literals are
    /// uppercased as well.
    pub fn parse(&self, query: &str) -> ParseResult<QueryModel> {
        match self.parse_normalized(&query.trim().to_uppercase()) {
            Ok(model) => {
                debug!(
                    "Query is syntactically valid: FROM {} with {} join(s)",
                    model.from_table,
                    model.joins.len()
                );
                Ok(model)
            }
            Err(err) => {
                warn!("Rejected query: {}", err);
                Err(err)
            }
        }
    }

    fn parse_normalized(&self, query: &str) -> ParseResult<QueryModel> {
        if !query.ends_with(';') {
            return Err(ParseError::MissingTerminator);
        }

        let starts_with_select = query
            .strip_prefix("SELECT")
            .is_some_and(|rest| rest.starts_with(char::is_whitespace));
        if !starts_with_select {
            return Err(ParseError::MissingSelect);
        }

        let clean = query.trim_end_matches(';').trim();
        let Some(captures) = QUERY_PATTERN.captures(clean) else {
            return Err(diagnose_mismatch(clean));
        };

        let select = self.parse_select_list(&captures["select"])?;

        let from_table = captures["from"].to_string();
        self.check_table(&from_table)?;

        let joins = match captures.name("joins") {
            Some(raw) => self.parse_joins(raw.as_str())?,
            None => Vec::new(),
        };

        let where_clause = match captures.name("where") {
            Some(raw) => {
                let text = raw.as_str().trim();
                if text.is_empty() {
                    return Err(ParseError::EmptyWhere);
                }
                parse_conjunction(text)
            }
            None => Conjunction::new(),
        };

        let model = QueryModel::new(select, from_table, joins, where_clause);
        self.check_references(&model)?;
        Ok(model)
    }

    /// Split and validate the SELECT column list
    fn parse_select_list(&self, raw: &str) -> ParseResult<SelectList> {
        let entries: Vec<&str> = raw.split(',').map(str::trim).collect();

        if entries.len() > 1 && entries.contains(&"*") {
            return Err(ParseError::InvalidColumn {
                column: "*".to_string(),
                reason: "'*' cannot be combined with other columns".to_string(),
            });
        }
        if entries == ["*"] {
            return Ok(SelectList::Wildcard);
        }

        let mut columns = Vec::with_capacity(entries.len());
        for entry in entries {
            columns.push(self.parse_column(entry)?);
        }
        Ok(SelectList::Columns(columns))
    }

    fn parse_column(&self, entry: &str) -> ParseResult<ColumnRef> {
        let invalid = |reason: &str| ParseError::InvalidColumn {
            column: entry.to_string(),
            reason: reason.to_string(),
        };

        if self.schema.is_reserved(entry) {
            return Err(invalid("reserved word"));
        }
        if entry.chars().any(char::is_whitespace) {
            return Err(invalid("unexpected whitespace inside the column name"));
        }

        if entry.contains('.') {
            let parts: Vec<&str> = entry.split('.').collect();
            match parts.as_slice() {
                [table, name] if is_identifier(table) && is_identifier(name) => {
                    if self.schema.is_reserved(name) {
                        return Err(invalid("reserved word"));
                    }
                    Ok(ColumnRef::qualified(*table, *name))
                }
                _ => Err(invalid("expected exactly one TABLE.COLUMN pair")),
            }
        } else if is_identifier(entry) {
            Ok(ColumnRef::bare(entry))
        } else {
            Err(invalid("not a valid identifier"))
        }
    }

    fn check_table(&self, table: &str) -> ParseResult<()> {
        if !is_identifier(table) {
            return Err(ParseError::InvalidTable {
                table: table.to_string(),
                reason: "not a valid identifier".to_string(),
            });
        }
        if !self.schema.has_table(table) {
            return Err(ParseError::InvalidTable {
                table: table.to_string(),
                reason: "unknown table".to_string(),
            });
        }
        Ok(())
    }

    /// Extract every INNER JOIN clause in source order
    fn parse_joins(&self, raw: &str) -> ParseResult<Vec<Join>> {
        let mut joins = Vec::new();
        for caps in JOIN_PATTERN.captures_iter(raw) {
            let clause = caps[0].to_string();
            let table = &caps["table"];
            let invalid = |reason: String| ParseError::InvalidJoin {
                clause: clause.clone(),
                reason,
            };

            if !is_identifier(table) {
                return Err(invalid(format!("'{}' is not a valid table name", table)));
            }
            for part in ["lt", "lc", "rt", "rc"] {
                if !is_identifier(&caps[part]) {
                    return Err(invalid(format!("'{}' is not a valid identifier", &caps[part])));
                }
            }
            if !self.schema.has_table(table) {
                return Err(ParseError::InvalidTable {
                    table: table.to_string(),
                    reason: "unknown table".to_string(),
                });
            }

            let left = ColumnRef::qualified(&caps["lt"], &caps["lc"]);
            let right = ColumnRef::qualified(&caps["rt"], &caps["rc"]);
            for col in [&left, &right] {
                let col_table = col.table.as_deref().unwrap_or_default();
                if !self.schema.has_column(col_table, &col.name) {
                    return Err(invalid(format!("unknown column {}", col)));
                }
            }

            let condition = Conjunction::from(vec![Predicate::Comparison(Comparison {
                left: Operand::Column(left),
                op: CompareOp::Eq,
                right: Operand::Column(right),
            })]);
            joins.push(Join::new(table, condition));
        }
        Ok(joins)
    }

    /// Check column references against the schema. Without a closed schema
    /// references to tables outside the query are only reported.
    fn check_references(&self, model: &QueryModel) -> ParseResult<()> {
        let tables = model.tables();
        let selected: Vec<&ColumnRef> = match &model.select {
            SelectList::Wildcard => Vec::new(),
            SelectList::Columns(cols) => cols.iter().collect(),
        };

        for col in selected.into_iter().chain(model.where_clause.columns()) {
            match &col.table {
                Some(table) => {
                    if !tables.contains(&table.as_str()) {
                        warn!("Column {} references table {} which is not part of the query", col, table);
                    }
                    if self.schema.is_closed() && !self.schema.has_column(table, &col.name) {
                        return Err(ParseError::InvalidColumn {
                            column: col.to_string(),
                            reason: "unknown column".to_string(),
                        });
                    }
                }
                None => {
                    if self.schema.is_closed() && !tables.iter().any(|t| self.schema.has_column(t, &col.name)) {
                        return Err(ParseError::InvalidColumn {
                            column: col.to_string(),
                            reason: "column does not belong to any table in the query".to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

/// Pick the most specific diagnostic for text that fails the grammar
fn diagnose_mismatch(query: &str) -> ParseError {
    if DANGLING_WHERE.is_match(query) {
        return ParseError::EmptyWhere;
    }
    if let Some(clause) = find_malformed_join(query) {
        return ParseError::InvalidJoin {
            clause,
            reason: "expected INNER JOIN <table> ON <table>.<column> = <table>.<column>".to_string(),
        };
    }
    ParseError::SyntaxError
}
