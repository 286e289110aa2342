//! Tools for loading workflows from YAML files.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    workflow::{TaskId, Workflow},
};

fn default_cores() -> f64 {
    1.0
}

/// Struct representing a [Task](crate::workflow::Task), see field description there.
#[derive(Serialize, Deserialize)]
pub struct YamlTask {
    pub length: u64,
    /// Defaults to `length`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec_time: Option<f64>,
    #[serde(default = "default_cores")]
    pub cores: f64,
    /// Ids of parent tasks, i.e. positions in the task list.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<TaskId>,
    /// Depth of the task. If any task has no depth, depths of all tasks are computed from the edges.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<usize>,
}

/// YAML representation of a workflow.
#[derive(Serialize, Deserialize)]
pub struct YamlWorkflow {
    pub tasks: Vec<YamlTask>,
}

impl Workflow {
    /// Read [Workflow] from YAML file.
    pub fn from_yaml<P: AsRef<Path>>(file: P) -> Result<Self> {
        Self::from_yaml_str(&std::fs::read_to_string(file)?)
    }

    /// Parse [Workflow] from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let yaml: YamlWorkflow = serde_yaml::from_str(yaml)?;
        let mut workflow = Workflow::new();
        let all_depths_known = yaml.tasks.iter().all(|task| task.depth.is_some());
        for task in yaml.tasks.iter() {
            workflow.add_task(
                task.depth.unwrap_or(0),
                task.length,
                task.exec_time.unwrap_or(task.length as f64),
                task.cores,
            );
        }
        for (task_id, task) in yaml.tasks.iter().enumerate() {
            for &parent in task.parents.iter() {
                workflow.add_dependency(parent, task_id)?;
            }
        }
        if !all_depths_known {
            workflow.assign_depths()?;
        }
        workflow.validate()?;
        Ok(workflow)
    }
}
