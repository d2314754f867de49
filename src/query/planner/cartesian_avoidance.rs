// Cartesian-Avoidance Heuristic
//
// Join conditions written in WHERE instead of ON turn joins into cartesian
// products followed by a filter. This heuristic moves every equality between
// columns of two different tables into the condition of a join that involves
// one of them, then puts conditioned joins ahead of bare products.

use crate::query::parser::ast::{Conjunction, Join, Predicate, QueryModel};
use crate::query::planner::optimizer::{Heuristic, OptimizationWarning, Rewrite};

/// Cartesian-avoidance heuristic
pub struct CartesianAvoidance;

/// The two tables of a `T1.C1 = T2.C2` conjunct
fn equi_join_tables(predicate: &Predicate) -> Option<(String, String)> {
    let Predicate::Comparison(cmp) = predicate else {
        return None;
    };
    let (left, right) = cmp.as_equi_join()?;
    Some((left.table.clone()?, right.table.clone()?))
}

/// Pick the join that should receive the condition between `t1` and `t2`
fn choose_join(model: &QueryModel, t1: &str, t2: &str) -> Option<usize> {
    let other_of = |join: &Join| if join.table == t1 { t2 } else { t1 };
    let candidates: Vec<usize> = model
        .joins
        .iter()
        .enumerate()
        .filter(|(_, join)| join.table == t1 || join.table == t2)
        .map(|(i, _)| i)
        .collect();

    // A join already linked to the other table
    let linked = candidates.iter().copied().find(|&i| {
        let join = &model.joins[i];
        let other = other_of(join);
        join.condition.iter().any(|p| p.tables().contains(other))
    });
    if linked.is_some() {
        return linked;
    }

    // A join built after the other table is available
    let available = candidates.iter().copied().find(|&i| {
        let other = other_of(&model.joins[i]);
        model.from_table == other || model.joins[..i].iter().any(|j| j.table == other)
    });
    if available.is_some() {
        return available;
    }

    candidates.first().copied()
}

impl Heuristic for CartesianAvoidance {
    fn name(&self) -> &str {
        "cartesian_avoidance"
    }

    fn apply(&self, model: &QueryModel) -> Rewrite {
        if model.joins.is_empty() {
            return Rewrite::unchanged(model);
        }

        let mut optimized = model.clone();
        let mut warnings = Vec::new();
        let mut notes = Vec::new();
        let mut residual = Conjunction::new();

        for predicate in std::mem::take(&mut optimized.where_clause) {
            let Some((t1, t2)) = equi_join_tables(&predicate) else {
                residual.0.push(predicate);
                continue;
            };

            match choose_join(&optimized, &t1, &t2) {
                Some(index) => {
                    let join = &mut optimized.joins[index];
                    let text = predicate.to_string();
                    if join.condition.push_unique(predicate) {
                        notes.push(format!("condition {} moved from WHERE into the join with {}", text, join.table));
                    } else {
                        notes.push(format!("condition {} already joins {}; dropped from WHERE", text, join.table));
                    }
                }
                None => {
                    warnings.push(OptimizationWarning::NoMatchingJoin {
                        predicate: predicate.to_string(),
                    });
                    residual.0.push(predicate);
                }
            }
        }
        optimized.where_clause = residual;

        let before: Vec<String> = optimized.joins.iter().map(|j| j.table.clone()).collect();
        let (mut conditioned, products): (Vec<Join>, Vec<Join>) =
            optimized.joins.into_iter().partition(Join::has_condition);
        conditioned.extend(products);
        optimized.joins = conditioned;

        let after: Vec<String> = optimized.joins.iter().map(|j| j.table.clone()).collect();
        if before != after {
            notes.push(format!(
                "cartesian products moved last: {} -> {}",
                before.join(", "),
                after.join(", ")
            ));
        }

        Rewrite {
            model: optimized,
            warnings,
            notes,
        }
    }
}
