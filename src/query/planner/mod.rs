// Query Planner Module
//
// This module holds the rewrite heuristics of the optimizer and the pipeline
// that chains them over a query model.

// Re-export public components
pub mod cartesian_avoidance;
pub mod cost_model;
pub mod join_reordering;
pub mod optimizer;
pub mod projection_pushdown;
pub mod selection_pushdown;

// Export key types
pub use self::cartesian_avoidance::CartesianAvoidance;
pub use self::join_reordering::JoinReordering;
pub use self::optimizer::{
    Heuristic, HeuristicKind, OptimizationWarning, OptimizedQuery, Optimizer, OptimizerConfig, Rewrite, StepReport,
};
pub use self::projection_pushdown::ProjectionPushdown;
pub use self::selection_pushdown::SelectionPushdown;
