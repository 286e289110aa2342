//! Some stats from a completed clustering run.

use serde::{Deserialize, Serialize};

use crate::{strategy::Clustering, workflow::Workflow};

/// Some stats from a completed clustering run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunStats {
    /// Number of tasks in the workflow.
    pub task_count: usize,
    /// Number of produced jobs.
    pub job_count: usize,
    /// Minimum total length of a job.
    pub min_job_runtime: u64,
    /// Maximum total length of a job.
    pub max_job_runtime: u64,
    /// Average total length of a job.
    pub average_job_runtime: f64,
    /// Ratio of maximum to average job runtime, 1 for perfectly balanced jobs.
    pub runtime_imbalance: f64,
    /// Core-hour wastage reported by the strategy, summed over levels.
    pub core_hour_wastage: f64,
    /// Number of merges which ignored receiver capacity.
    pub fallbacks: usize,
    /// Number of tasks which ended up in no job.
    pub unassigned_tasks: usize,
}

impl RunStats {
    /// Collects stats from a clustering of the workflow.
    pub fn new(workflow: &Workflow, clustering: &Clustering) -> Self {
        let runtimes = clustering.jobs.iter().map(|job| job.runtime).collect::<Vec<_>>();
        let average_job_runtime = if runtimes.is_empty() {
            0.0
        } else {
            runtimes.iter().sum::<u64>() as f64 / runtimes.len() as f64
        };
        let max_job_runtime = runtimes.iter().copied().max().unwrap_or(0);
        RunStats {
            task_count: workflow.len(),
            job_count: clustering.jobs.len(),
            min_job_runtime: runtimes.iter().copied().min().unwrap_or(0),
            max_job_runtime,
            average_job_runtime,
            runtime_imbalance: if average_job_runtime > 0.0 {
                max_job_runtime as f64 / average_job_runtime
            } else {
                1.0
            },
            core_hour_wastage: clustering.report.total_core_hour_wastage(),
            fallbacks: clustering.report.fallbacks(),
            unassigned_tasks: (0..workflow.len())
                .filter(|&task| clustering.assignment.job_of(task).is_none())
                .count(),
        }
    }
}
