//! Execution layer: the lookup pipeline and the result aggregator.

#![warn(missing_docs)]

pub mod aggregator;
pub mod engine;

pub use aggregator::aggregate;
pub use engine::{EngineConfig, Orchestrator, RunReport};
