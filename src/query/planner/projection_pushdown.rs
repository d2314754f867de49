// Projection Push-Down Heuristic
//
// Annotates every table access with the columns the rest of the query needs
// from it. The annotation must be a superset of what is used, so any column
// that cannot be attributed safely turns the heuristic into a no-op.

use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::Schema;
use crate::query::parser::ast::{ColumnRef, QueryModel, SelectList};
use crate::query::planner::optimizer::{Heuristic, OptimizationWarning, Rewrite};

/// Projection push-down heuristic
#[derive(Default)]
pub struct ProjectionPushdown {
    schema: Option<Schema>,
}

impl ProjectionPushdown {
    /// Without a schema, unqualified columns resolve only in single-table queries
    pub fn new() -> Self {
        ProjectionPushdown { schema: None }
    }

    /// Resolve unqualified columns through the tables the schema lists
    pub fn with_schema(schema: Schema) -> Self {
        ProjectionPushdown { schema: Some(schema) }
    }

    /// Every column reference whose values are read after the scans
    fn referenced_columns(model: &QueryModel) -> Vec<&ColumnRef> {
        let mut columns = Vec::new();
        if let SelectList::Columns(cols) = &model.select {
            columns.extend(cols.iter());
        }
        columns.extend(model.where_clause.columns());
        columns.extend(model.from_access.pushed_selection.columns());
        for join in &model.joins {
            columns.extend(join.condition.columns());
            columns.extend(join.access.pushed_selection.columns());
        }
        columns
    }

    /// Tables that may own an unqualified column
    fn owners<'a>(&self, model: &QueryModel, tables: &[&'a str], column: &str) -> Vec<&'a str> {
        if model.joins.is_empty() {
            return tables.to_vec();
        }
        match &self.schema {
            Some(schema) => schema.tables_with_column(column, tables),
            None => Vec::new(),
        }
    }
}

impl Heuristic for ProjectionPushdown {
    fn name(&self) -> &str {
        "projection_pushdown"
    }

    fn apply(&self, model: &QueryModel) -> Rewrite {
        if model.is_select_all() {
            return Rewrite::unchanged(model).with_note("SELECT * needs every column; nothing to push down");
        }

        let tables = model.tables();
        let mut required: BTreeMap<&str, BTreeSet<String>> =
            tables.iter().map(|t| (*t, BTreeSet::new())).collect();

        for column in Self::referenced_columns(model) {
            match column.table.as_deref() {
                Some(table) => {
                    // Tables outside the query have no access point to annotate
                    if let Some(set) = required.get_mut(table) {
                        set.insert(column.name.clone());
                    }
                }
                None => {
                    let owners = self.owners(model, &tables, &column.name);
                    if owners.is_empty() {
                        return Rewrite::unchanged(model).with_warning(OptimizationWarning::UnresolvedColumn {
                            column: column.name.clone(),
                        });
                    }
                    for owner in owners {
                        if let Some(set) = required.get_mut(owner) {
                            set.insert(column.name.clone());
                        }
                    }
                }
            }
        }

        let mut optimized = model.clone();
        optimized.from_access.pushed_projection = required
            .get(model.from_table.as_str())
            .cloned()
            .unwrap_or_default();
        for join in &mut optimized.joins {
            join.access.pushed_projection = required.get(join.table.as_str()).cloned().unwrap_or_default();
        }

        let mut rewrite = Rewrite::new(optimized);
        for table in &tables {
            if let Some(columns) = required.get(table).filter(|cols| !cols.is_empty()) {
                let names: Vec<&str> = columns.iter().map(String::as_str).collect();
                rewrite.notes.push(format!("columns read from {}: {}", table, names.join(", ")));
            }
        }
        rewrite
    }
}
