// Relational Algebra Module
//
// This module renders query models as relational algebra expressions and
// produces text explanations of the resulting plan.

pub mod converter;
pub mod explain;

// Export key types
pub use self::converter::{AlgebraConverter, AlgebraExpr, AlgebraStages, convert, convert_detailed};
pub use self::explain::{ExecutionStep, QueryStats, StepKind, execution_steps, query_stats, render_tree};
