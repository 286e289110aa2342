//! Errors reported by clustering runs and input loading.

use thiserror::Error;

use crate::workflow::TaskId;

#[derive(Debug, Error)]
pub enum ClusteringError {
    #[error("task {task} is not present in the workflow")]
    UnknownTask { task: TaskId },

    #[error("task {task} at depth {depth} has no parents")]
    MissingParents { task: TaskId, depth: usize },

    #[error("workflow dependencies contain a cycle")]
    Cycle,

    #[error("task {task} has invalid {field}, expected a finite non-negative value")]
    InvalidTask { task: TaskId, field: &'static str },

    #[error("task {child} is not deeper than its parent {parent}")]
    DepthOrder { parent: TaskId, child: TaskId },

    #[error("invalid clustering config: {0}")]
    InvalidConfig(String),

    #[error("can't read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("can't parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("can't write JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ClusteringError>;
