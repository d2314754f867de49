// relopt: SQL to relational algebra translator and heuristic optimizer

pub mod catalog;
pub mod query;

// Re-export key items for convenient access
pub use catalog::{ConfigError, Schema, Statistics};
pub use query::algebra::{convert, convert_detailed};
pub use query::parser::ast::QueryModel;
pub use query::parser::{ParseError, Parser, parse};
pub use query::planner::{Heuristic, HeuristicKind, OptimizedQuery, Optimizer, OptimizerConfig};
