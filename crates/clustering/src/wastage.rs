//! Core-hour wastage: idle core time caused by billing every task of a cluster at the cluster's
//! maximum core demand.

use serde::{Deserialize, Serialize};

use crate::workflow::{TaskId, Workflow};

/// Sum over clusters and their tasks of `exec_time * (max cores in cluster - task cores)`.
///
/// Empty clusters contribute nothing.
pub fn core_hour_wastage<'a, I>(clusters: I, workflow: &Workflow) -> f64
where
    I: IntoIterator<Item = &'a [TaskId]>,
{
    let mut wastage = 0.0;
    for cluster in clusters {
        let Some(max_cores) = cluster
            .iter()
            .map(|&task| workflow.task(task).cores)
            .max_by(|a, b| a.total_cmp(b))
        else {
            continue;
        };
        for &task in cluster.iter() {
            let task = workflow.task(task);
            wastage += task.exec_time * (max_cores - task.cores);
        }
    }
    wastage
}

/// Running wastage total owned by the caller, e.g. across all runs of an experiment.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct WastageAccumulator {
    total: f64,
    levels: usize,
}

impl WastageAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds wastage of one processed level.
    pub fn add(&mut self, wastage: f64) {
        self.total += wastage;
        self.levels += 1;
    }

    /// Accumulated wastage.
    pub fn total(&self) -> f64 {
        self.total
    }

    /// Number of levels which contributed.
    pub fn levels(&self) -> usize {
        self.levels
    }
}
