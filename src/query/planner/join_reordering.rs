// Join Reordering Heuristic
//
// Sorts the joins of a query so the most selective ones are built first.
// Ordering is stable: joins with equal scores keep their relative order unless
// statistics are available to tell them apart.

use std::cmp::Ordering;

use crate::catalog::Statistics;
use crate::query::parser::ast::QueryModel;
use crate::query::planner::cost_model::{CostModel, JoinEstimate};
use crate::query::planner::optimizer::{Heuristic, Rewrite};

/// Join reordering heuristic
#[derive(Default)]
pub struct JoinReordering {
    statistics: Option<Statistics>,
}

impl JoinReordering {
    /// Order by score only
    pub fn new() -> Self {
        JoinReordering { statistics: None }
    }

    /// Break score ties by ascending estimated cardinality
    pub fn with_statistics(statistics: Statistics) -> Self {
        JoinReordering {
            statistics: Some(statistics),
        }
    }

    fn compare(a: &JoinEstimate, b: &JoinEstimate) -> Ordering {
        b.score.cmp(&a.score).then_with(|| match (a.estimated_rows, b.estimated_rows) {
            (Some(ra), Some(rb)) => ra.total_cmp(&rb),
            _ => Ordering::Equal,
        })
    }
}

impl Heuristic for JoinReordering {
    fn name(&self) -> &str {
        "join_reordering"
    }

    fn apply(&self, model: &QueryModel) -> Rewrite {
        if model.joins.len() < 2 {
            return Rewrite::unchanged(model);
        }

        let cost_model = CostModel::new(self.statistics.as_ref());
        let estimates: Vec<JoinEstimate> = model
            .joins
            .iter()
            .map(|join| cost_model.estimate(model, join))
            .collect();

        let mut order: Vec<usize> = (0..model.joins.len()).collect();
        order.sort_by(|&a, &b| Self::compare(&estimates[a], &estimates[b]));

        let mut optimized = model.clone();
        optimized.joins = order.iter().map(|&i| model.joins[i].clone()).collect();

        let scores: Vec<String> = model
            .joins
            .iter()
            .zip(&estimates)
            .map(|(join, estimate)| format!("{}={}", join.table, estimate.score))
            .collect();
        let mut rewrite = Rewrite::new(optimized).with_note(format!("join scores: {}", scores.join(", ")));

        if order.iter().enumerate().any(|(pos, &i)| pos != i) {
            let before: Vec<&str> = model.joins.iter().map(|j| j.table.as_str()).collect();
            let after: Vec<&str> = order.iter().map(|&i| model.joins[i].table.as_str()).collect();
            rewrite
                .notes
                .push(format!("join order: {} -> {}", before.join(", "), after.join(", ")));
        }
        rewrite
    }
}
