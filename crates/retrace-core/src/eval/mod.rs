//! Declarative metric evaluation over captured records

mod context;
mod engine;
mod registry;
mod strategies;
mod types;

pub use context::TagContext;
pub use engine::Evaluator;
pub use registry::StrategyRegistry;
pub use strategies::{DagStrategy, EvalStrategy, QagStrategy, StringMatchStrategy};
pub use types::{EvalConfig, EvaluationResult, MetricConfig};
