// Query Optimizer Implementation
//
// This module chains rewrite heuristics over a query model. Each heuristic
// reads one model and builds a new one; the optimizer records what every step
// produced so the whole rewrite can be explained afterwards.

use std::fmt;
use std::str::FromStr;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{Schema, Statistics};
use crate::query::parser::ast::QueryModel;
use crate::query::planner::cartesian_avoidance::CartesianAvoidance;
use crate::query::planner::join_reordering::JoinReordering;
use crate::query::planner::projection_pushdown::ProjectionPushdown;
use crate::query::planner::selection_pushdown::SelectionPushdown;

/// Situations where a heuristic left part of the model untouched
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum OptimizationWarning {
    #[error("predicate '{predicate}' references table {table}, which is not part of the query")]
    UnknownTable { table: String, predicate: String },

    #[error("column {column} cannot be attributed to a table; projection push-down skipped")]
    UnresolvedColumn { column: String },

    #[error("no join involves the tables of '{predicate}'; it stays in WHERE")]
    NoMatchingJoin { predicate: String },
}

/// Result of applying one heuristic
#[derive(Debug, Clone, PartialEq)]
pub struct Rewrite {
    pub model: QueryModel,
    pub warnings: Vec<OptimizationWarning>,
    /// Human readable description of what moved
    pub notes: Vec<String>,
}

impl Rewrite {
    pub fn new(model: QueryModel) -> Self {
        Rewrite {
            model,
            warnings: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// A rewrite that leaves `model` as it is
    pub fn unchanged(model: &QueryModel) -> Self {
        Self::new(model.clone())
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_warning(mut self, warning: OptimizationWarning) -> Self {
        self.warnings.push(warning);
        self
    }
}

/// A rewrite rule over query models
pub trait Heuristic: Send + Sync {
    /// Stable identifier used in reports
    fn name(&self) -> &str;

    /// Build the rewritten model together with its warnings and notes
    fn apply(&self, model: &QueryModel) -> Rewrite;

    /// Rewritten model only
    fn optimize(&self, model: &QueryModel) -> QueryModel {
        self.apply(model).model
    }
}

/// The heuristics the optimizer knows how to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeuristicKind {
    SelectionPushdown,
    ProjectionPushdown,
    CartesianAvoidance,
    JoinReordering,
}

impl HeuristicKind {
    /// Reference pipeline order
    pub const REFERENCE_ORDER: [HeuristicKind; 4] = [
        HeuristicKind::SelectionPushdown,
        HeuristicKind::ProjectionPushdown,
        HeuristicKind::CartesianAvoidance,
        HeuristicKind::JoinReordering,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            HeuristicKind::SelectionPushdown => "selection_pushdown",
            HeuristicKind::ProjectionPushdown => "projection_pushdown",
            HeuristicKind::CartesianAvoidance => "cartesian_avoidance",
            HeuristicKind::JoinReordering => "join_reordering",
        }
    }
}

impl fmt::Display for HeuristicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for HeuristicKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        match normalized.as_str() {
            "selection_pushdown" | "selection" => Ok(HeuristicKind::SelectionPushdown),
            "projection_pushdown" | "projection" => Ok(HeuristicKind::ProjectionPushdown),
            "cartesian_avoidance" | "cartesian" => Ok(HeuristicKind::CartesianAvoidance),
            "join_reordering" | "reorder" => Ok(HeuristicKind::JoinReordering),
            _ => Err(format!("unknown heuristic '{}'", s)),
        }
    }
}

/// Configuration of an optimizer pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerConfig {
    /// Heuristics in application order
    pub heuristics: Vec<HeuristicKind>,
    /// Row estimates used to break join-ordering ties
    pub statistics: Option<Statistics>,
    /// Column ownership used to resolve unqualified columns
    pub schema: Option<Schema>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig {
            heuristics: HeuristicKind::REFERENCE_ORDER.to_vec(),
            statistics: None,
            schema: None,
        }
    }
}

impl OptimizerConfig {
    pub fn with_heuristics(mut self, heuristics: Vec<HeuristicKind>) -> Self {
        self.heuristics = heuristics;
        self
    }

    pub fn with_statistics(mut self, statistics: Statistics) -> Self {
        self.statistics = Some(statistics);
        self
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }
}

/// Outcome of one pipeline step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepReport {
    pub heuristic: String,
    pub model: QueryModel,
    pub warnings: Vec<OptimizationWarning>,
    pub notes: Vec<String>,
}

/// Result of running the whole pipeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizedQuery {
    pub original: QueryModel,
    pub model: QueryModel,
    pub steps: Vec<StepReport>,
}

impl OptimizedQuery {
    /// Warnings of every step, in order
    pub fn warnings(&self) -> impl Iterator<Item = &OptimizationWarning> {
        self.steps.iter().flat_map(|step| step.warnings.iter())
    }

    /// True when some step changed the model
    pub fn changed(&self) -> bool {
        self.original != self.model
    }
}

/// The main optimizer that applies heuristics in sequence
pub struct Optimizer {
    heuristics: Vec<Box<dyn Heuristic>>,
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Optimizer {
    /// Create an optimizer running the reference pipeline
    pub fn new() -> Self {
        Self::with_config(&OptimizerConfig::default())
    }

    /// Build the heuristics named in `config`
    pub fn with_config(config: &OptimizerConfig) -> Self {
        let heuristics = config
            .heuristics
            .iter()
            .map(|kind| build_heuristic(*kind, config))
            .collect();
        Optimizer { heuristics }
    }

    /// Use caller-supplied heuristics as they are
    pub fn with_heuristics(heuristics: Vec<Box<dyn Heuristic>>) -> Self {
        Optimizer { heuristics }
    }

    pub fn heuristic_names(&self) -> Vec<&str> {
        self.heuristics.iter().map(|h| h.name()).collect()
    }

    /// Run every heuristic, feeding each the previous step's model
    pub fn optimize(&self, model: &QueryModel) -> OptimizedQuery {
        let mut current = model.clone();
        let mut steps = Vec::with_capacity(self.heuristics.len());

        for heuristic in &self.heuristics {
            let rewrite = heuristic.apply(&current);
            for warning in &rewrite.warnings {
                warn!("{}: {}", heuristic.name(), warning);
            }
            for note in &rewrite.notes {
                debug!("{}: {}", heuristic.name(), note);
            }
            current = rewrite.model.clone();
            steps.push(StepReport {
                heuristic: heuristic.name().to_string(),
                model: rewrite.model,
                warnings: rewrite.warnings,
                notes: rewrite.notes,
            });
        }

        info!("Optimized query with {} heuristic(s)", steps.len());
        OptimizedQuery {
            original: model.clone(),
            model: current,
            steps,
        }
    }
}

fn build_heuristic(kind: HeuristicKind, config: &OptimizerConfig) -> Box<dyn Heuristic> {
    match kind {
        HeuristicKind::SelectionPushdown => Box::new(SelectionPushdown),
        HeuristicKind::ProjectionPushdown => match &config.schema {
            Some(schema) => Box::new(ProjectionPushdown::with_schema(schema.clone())),
            None => Box::new(ProjectionPushdown::new()),
        },
        HeuristicKind::CartesianAvoidance => Box::new(CartesianAvoidance),
        HeuristicKind::JoinReordering => match &config.statistics {
            Some(stats) => Box::new(JoinReordering::with_statistics(stats.clone())),
            None => Box::new(JoinReordering::new()),
        },
    }
}
