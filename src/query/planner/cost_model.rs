// Cost Model for Join Ordering
//
// This module estimates how selective each join of a query is. The score is a
// rough proxy built from how much filtering and projecting a join carries; the
// optional row estimate comes from externally supplied statistics.

use crate::catalog::Statistics;
use crate::query::parser::ast::{Join, QueryModel};

/// Points per predicate pushed onto the joined table
pub const PUSHED_SELECTION_WEIGHT: u32 = 5;

/// Selectivity estimate of one join
#[derive(Debug, Clone, PartialEq)]
pub struct JoinEstimate {
    /// Higher means the join is expected to shrink the result more
    pub score: u32,
    /// Estimated rows read from the joined table, when statistics are known
    pub estimated_rows: Option<f64>,
}

/// Scores joins of a query model
pub struct CostModel<'a> {
    statistics: Option<&'a Statistics>,
}

impl<'a> CostModel<'a> {
    /// Create a cost model, optionally backed by row estimates
    pub fn new(statistics: Option<&'a Statistics>) -> Self {
        CostModel { statistics }
    }

    /// Selectivity score of `join` within `model`
    pub fn score(&self, model: &QueryModel, join: &Join) -> u32 {
        let pushed = join.access.pushed_selection.len() as u32 * PUSHED_SELECTION_WEIGHT;
        let projected = join.access.pushed_projection.len() as u32;

        let mentions = model
            .where_clause
            .columns()
            .into_iter()
            .chain(model.from_access.pushed_selection.columns())
            .chain(join.condition.columns())
            .filter(|col| col.belongs_to(&join.table))
            .count() as u32;

        let equality = u32::from(join.condition.has_equality());

        pushed + projected + mentions + equality
    }

    /// Score plus row estimate for `join`
    pub fn estimate(&self, model: &QueryModel, join: &Join) -> JoinEstimate {
        JoinEstimate {
            score: self.score(model, join),
            estimated_rows: self
                .statistics
                .map(|stats| stats.estimate_after_filters(&join.table, join.access.pushed_selection.len())),
        }
    }
}
