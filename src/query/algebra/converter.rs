// Relational Algebra Converter
//
// This module renders a query model as a relational algebra expression. The
// expression is always assembled in three stages: joins (or cartesian
// products) first, then the residual selection, then the final projection.

use std::fmt;

use linked_hash_map::LinkedHashMap;

use crate::query::parser::ast::{AccessAnnotations, Conjunction, QueryModel, SelectList};

pub const JOIN_SYMBOL: &str = "⋈";
pub const PRODUCT_SYMBOL: &str = "×";
pub const SELECTION_SYMBOL: &str = "σ";
pub const PROJECTION_SYMBOL: &str = "π";

/// Stage keys of [`convert_detailed`], in evaluation order
pub const STAGE_JOIN: &str = "join";
pub const STAGE_SELECTION: &str = "selection";
pub const STAGE_PROJECTION: &str = "projection";
pub const STAGE_FINAL: &str = "final";

/// Relational algebra expression tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlgebraExpr {
    /// Base relation
    Relation(String),
    /// σ_{predicate}(input)
    Selection {
        predicate: Conjunction,
        input: Box<AlgebraExpr>,
    },
    /// π_{columns}(input)
    Projection {
        columns: Vec<String>,
        input: Box<AlgebraExpr>,
    },
    /// (left ⋈_{condition} right)
    Join {
        left: Box<AlgebraExpr>,
        right: Box<AlgebraExpr>,
        condition: Conjunction,
    },
    /// (left × right), a join without condition
    Product {
        left: Box<AlgebraExpr>,
        right: Box<AlgebraExpr>,
    },
}

impl fmt::Display for AlgebraExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlgebraExpr::Relation(name) => write!(f, "{}", name),
            AlgebraExpr::Selection { predicate, input } => {
                write!(f, "{}_{{{}}}({})", SELECTION_SYMBOL, predicate, input)
            }
            AlgebraExpr::Projection { columns, input } => {
                write!(f, "{}_{{{}}}({})", PROJECTION_SYMBOL, columns.join(", "), input)
            }
            AlgebraExpr::Join { left, right, condition } => {
                write!(f, "({} {}_{{{}}} {})", left, JOIN_SYMBOL, condition, right)
            }
            AlgebraExpr::Product { left, right } => {
                write!(f, "({} {} {})", left, PRODUCT_SYMBOL, right)
            }
        }
    }
}

/// The three canonical stages of a conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlgebraStages {
    pub join: AlgebraExpr,
    pub selection: AlgebraExpr,
    pub projection: AlgebraExpr,
}

/// Converts a query model into relational algebra
pub struct AlgebraConverter<'a> {
    model: &'a QueryModel,
}

impl<'a> AlgebraConverter<'a> {
    pub fn new(model: &'a QueryModel) -> Self {
        AlgebraConverter { model }
    }

    /// Build the expression tree for all three stages
    pub fn stages(&self) -> AlgebraStages {
        let join = self.join_stage();
        let selection = self.selection_stage(join.clone());
        let projection = self.projection_stage(selection.clone());
        AlgebraStages { join, selection, projection }
    }

    /// Final expression tree
    pub fn build(&self) -> AlgebraExpr {
        self.stages().projection
    }

    /// Stage 1: fold joins left to right, starting from the FROM table
    fn join_stage(&self) -> AlgebraExpr {
        let mut expr = table_access(&self.model.from_table, &self.model.from_access);

        for join in &self.model.joins {
            let right = Box::new(table_access(&join.table, &join.access));
            expr = if join.has_condition() {
                AlgebraExpr::Join {
                    left: Box::new(expr),
                    right,
                    condition: join.condition.clone(),
                }
            } else {
                AlgebraExpr::Product {
                    left: Box::new(expr),
                    right,
                }
            };
        }
        expr
    }

    /// Stage 2: residual WHERE on top of the joins
    fn selection_stage(&self, input: AlgebraExpr) -> AlgebraExpr {
        if self.model.where_clause.is_empty() {
            return input;
        }
        AlgebraExpr::Selection {
            predicate: self.model.where_clause.clone(),
            input: Box::new(input),
        }
    }

    /// Stage 3: SELECT list, skipped for `*`
    fn projection_stage(&self, input: AlgebraExpr) -> AlgebraExpr {
        match &self.model.select {
            SelectList::Wildcard => input,
            SelectList::Columns(cols) => AlgebraExpr::Projection {
                columns: cols.iter().map(ToString::to_string).collect(),
                input: Box::new(input),
            },
        }
    }
}

/// Table leaf with its pushed-down work: projection outside, selection inside
fn table_access(table: &str, access: &AccessAnnotations) -> AlgebraExpr {
    let mut expr = AlgebraExpr::Relation(table.to_string());
    if !access.pushed_selection.is_empty() {
        expr = AlgebraExpr::Selection {
            predicate: access.pushed_selection.clone(),
            input: Box::new(expr),
        };
    }
    if !access.pushed_projection.is_empty() {
        expr = AlgebraExpr::Projection {
            columns: access.pushed_projection.iter().cloned().collect(),
            input: Box::new(expr),
        };
    }
    expr
}

/// Render `model` as a relational algebra expression
pub fn convert(model: &QueryModel) -> String {
    AlgebraConverter::new(model).build().to_string()
}

/// Render every stage of the conversion, keyed by stage name in evaluation
/// order, followed by the final expression
pub fn convert_detailed(model: &QueryModel) -> LinkedHashMap<String, String> {
    let stages = AlgebraConverter::new(model).stages();
    let mut detailed = LinkedHashMap::new();
    detailed.insert(STAGE_JOIN.to_string(), stages.join.to_string());
    detailed.insert(STAGE_SELECTION.to_string(), stages.selection.to_string());
    let final_expr = stages.projection.to_string();
    detailed.insert(STAGE_PROJECTION.to_string(), final_expr.clone());
    detailed.insert(STAGE_FINAL.to_string(), final_expr);
    detailed
}
