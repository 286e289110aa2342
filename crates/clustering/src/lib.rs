//! Task clustering for scientific workflows.
//!
//! Tasks of a workflow DAG are merged into coarser jobs before scheduling, trading scheduling
//! overhead against load imbalance and resource waste. See [strategies] for available algorithms.

pub mod config;
pub mod error;
pub mod experiment;
pub mod job;
pub mod parser;
pub mod run_stats;
pub mod strategies;
pub mod strategy;
pub mod task_set;
pub mod wastage;
pub mod workflow;
