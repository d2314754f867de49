// Selection Push-Down Heuristic
//
// Moves every WHERE conjunct that references exactly one table down to that
// table's access point, so rows are filtered before any join sees them.

use crate::query::parser::ast::{Conjunction, Predicate, QueryModel};
use crate::query::planner::optimizer::{Heuristic, OptimizationWarning, Rewrite};

/// Selection push-down heuristic
pub struct SelectionPushdown;

/// The only table a predicate references, if there is exactly one
fn single_table(predicate: &Predicate) -> Option<String> {
    let tables = predicate.tables();
    if tables.len() == 1 {
        tables.into_iter().next().map(str::to_string)
    } else {
        None
    }
}

impl Heuristic for SelectionPushdown {
    fn name(&self) -> &str {
        "selection_pushdown"
    }

    fn apply(&self, model: &QueryModel) -> Rewrite {
        let mut optimized = model.clone();
        let mut warnings = Vec::new();
        let mut notes = Vec::new();
        let mut residual = Conjunction::new();
        let has_joins = !optimized.joins.is_empty();

        for predicate in std::mem::take(&mut optimized.where_clause) {
            let Some(table) = single_table(&predicate) else {
                residual.0.push(predicate);
                continue;
            };

            let access = if optimized.from_table == table {
                Some(&mut optimized.from_access)
            } else {
                optimized
                    .joins
                    .iter_mut()
                    .find(|join| join.table == table)
                    .map(|join| &mut join.access)
            };

            match access {
                Some(access) => {
                    let text = predicate.to_string();
                    if access.pushed_selection.push_unique(predicate) {
                        if has_joins {
                            notes.push(format!("filter applied on {} before the join: {}", table, text));
                        } else {
                            notes.push(format!("filter applied while scanning {}: {}", table, text));
                        }
                    }
                }
                None => {
                    warnings.push(OptimizationWarning::UnknownTable {
                        table,
                        predicate: predicate.to_string(),
                    });
                    residual.0.push(predicate);
                }
            }
        }

        optimized.where_clause = residual;
        Rewrite {
            model: optimized,
            warnings,
            notes,
        }
    }
}
