// Query Processing Module
//
// This module contains components for SQL parsing, relational algebra
// conversion and heuristic optimization.

// Re-export key components
pub mod algebra;
pub mod parser;
pub mod planner;

// Export key public interfaces
pub use algebra::{convert, convert_detailed};
pub use parser::{Parser, parse};
pub use planner::Optimizer;
