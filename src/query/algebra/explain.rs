// Plan Explanation
//
// Text views of a query model for display: the algebra tree drawn as an
// indented outline, the ordered list of execution steps, and a few summary
// statistics about the query.

use std::fmt;

use serde::Serialize;

use super::converter::{AlgebraConverter, AlgebraExpr, JOIN_SYMBOL, PRODUCT_SYMBOL, PROJECTION_SYMBOL, SELECTION_SYMBOL};
use crate::query::parser::ast::{AccessAnnotations, QueryModel, SelectList};

/// Kind of a single execution step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StepKind {
    Scan,
    Select,
    Join,
    Product,
    Project,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StepKind::Scan => "SCAN",
            StepKind::Select => "SELECT",
            StepKind::Join => "JOIN",
            StepKind::Product => "PRODUCT",
            StepKind::Project => "PROJECT",
        };
        write!(f, "{}", name)
    }
}

/// One step of the canonical evaluation order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionStep {
    pub kind: StepKind,
    pub description: String,
}

/// Summary numbers about a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryStats {
    pub table_count: usize,
    pub join_count: usize,
    pub has_filter: bool,
    pub projection_width: usize,
    pub select_all: bool,
    pub pushed_selections: usize,
    pub pushed_projections: usize,
}

fn push_access_steps(steps: &mut Vec<ExecutionStep>, table: &str, access: &AccessAnnotations) {
    steps.push(ExecutionStep {
        kind: StepKind::Scan,
        description: format!("Table: {}", table),
    });
    if !access.pushed_selection.is_empty() {
        steps.push(ExecutionStep {
            kind: StepKind::Select,
            description: format!("Early filter on {}: {}", table, access.pushed_selection),
        });
    }
    if !access.pushed_projection.is_empty() {
        let cols: Vec<&str> = access.pushed_projection.iter().map(String::as_str).collect();
        steps.push(ExecutionStep {
            kind: StepKind::Project,
            description: format!("Early projection on {}: {}", table, cols.join(", ")),
        });
    }
}

/// Steps in the order a naive evaluator would run them
pub fn execution_steps(model: &QueryModel) -> Vec<ExecutionStep> {
    let mut steps = Vec::new();

    push_access_steps(&mut steps, &model.from_table, &model.from_access);
    for join in &model.joins {
        push_access_steps(&mut steps, &join.table, &join.access);
        if join.has_condition() {
            steps.push(ExecutionStep {
                kind: StepKind::Join,
                description: format!("Join with {}: {}", join.table, join.condition),
            });
        } else {
            steps.push(ExecutionStep {
                kind: StepKind::Product,
                description: format!("Cartesian product with {}", join.table),
            });
        }
    }

    if model.has_where() {
        steps.push(ExecutionStep {
            kind: StepKind::Select,
            description: format!("Filter: {}", model.where_clause),
        });
    }

    let projection = match &model.select {
        SelectList::Wildcard => "Projection: * (all columns)".to_string(),
        cols => format!("Projection: {}", cols),
    };
    steps.push(ExecutionStep {
        kind: StepKind::Project,
        description: projection,
    });

    steps
}

/// Summary statistics of `model`
pub fn query_stats(model: &QueryModel) -> QueryStats {
    let accesses = std::iter::once(&model.from_access).chain(model.joins.iter().map(|j| &j.access));
    let (pushed_selections, pushed_projections) = accesses.fold((0, 0), |(sel, proj), access| {
        (
            sel + usize::from(!access.pushed_selection.is_empty()),
            proj + usize::from(!access.pushed_projection.is_empty()),
        )
    });

    QueryStats {
        table_count: 1 + model.joins.len(),
        join_count: model.joins.len(),
        has_filter: model.has_where(),
        projection_width: match &model.select {
            SelectList::Wildcard => 0,
            SelectList::Columns(cols) => cols.len(),
        },
        select_all: model.is_select_all(),
        pushed_selections,
        pushed_projections,
    }
}

/// Draw the algebra tree of `model`, root first
pub fn render_tree(model: &QueryModel) -> String {
    let expr = AlgebraConverter::new(model).build();
    let mut out = String::new();
    write_node(&expr, "", "", &mut out);
    out
}

fn node_label(expr: &AlgebraExpr) -> String {
    match expr {
        AlgebraExpr::Relation(name) => name.clone(),
        AlgebraExpr::Selection { predicate, .. } => format!("{} {}", SELECTION_SYMBOL, predicate),
        AlgebraExpr::Projection { columns, .. } => format!("{} {}", PROJECTION_SYMBOL, columns.join(", ")),
        AlgebraExpr::Join { condition, .. } => format!("{} {}", JOIN_SYMBOL, condition),
        AlgebraExpr::Product { .. } => PRODUCT_SYMBOL.to_string(),
    }
}

fn write_node(expr: &AlgebraExpr, lead: &str, child_prefix: &str, out: &mut String) {
    out.push_str(lead);
    out.push_str(&node_label(expr));
    out.push('\n');

    let children: Vec<&AlgebraExpr> = match expr {
        AlgebraExpr::Relation(_) => Vec::new(),
        AlgebraExpr::Selection { input, .. } | AlgebraExpr::Projection { input, .. } => vec![input.as_ref()],
        AlgebraExpr::Join { left, right, .. } | AlgebraExpr::Product { left, right } => vec![left.as_ref(), right.as_ref()],
    };

    let count = children.len();
    for (i, child) in children.into_iter().enumerate() {
        let last = i + 1 == count;
        let lead = format!("{}{}", child_prefix, if last { "└── " } else { "├── " });
        let next_prefix = format!("{}{}", child_prefix, if last { "    " } else { "│   " });
        write_node(child, &lead, &next_prefix, out);
    }
}
