//! Plain horizontal clustering: every level is shuffled and cut into chunks.

use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    job::JobList,
    strategy::{Clustering, ClusteringReport, ClusteringStrategy, LevelReport},
    workflow::Workflow,
};

use super::common::{make_rng, shuffle_twice};

/// Bound on clusters of a level, either their number or their size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClusterLimit {
    /// Fixed number of clusters per level.
    Num(usize),
    /// Fixed number of tasks per cluster.
    Size(usize),
}

pub struct HorizontalClustering {
    limit: ClusterLimit,
    rng: Pcg64,
}

impl HorizontalClustering {
    pub fn new(limit: ClusterLimit, rng: Pcg64) -> Self {
        let limit = match limit {
            ClusterLimit::Num(num) => ClusterLimit::Num(num.max(1)),
            ClusterLimit::Size(size) => ClusterLimit::Size(size.max(1)),
        };
        Self { limit, rng }
    }

    pub fn with_seed(limit: ClusterLimit, seed: Option<u64>) -> Self {
        Self::new(limit, make_rng(seed))
    }
}

/// Sizes of consecutive chunks for `len` tasks under the limit, without empty chunks.
pub fn chunk_sizes(len: usize, limit: ClusterLimit) -> Vec<usize> {
    match limit {
        ClusterLimit::Num(num) => {
            let base = len / num;
            let larger = len - base * num;
            (0..num)
                .map(|i| if i < larger { base + 1 } else { base })
                .filter(|&size| size > 0)
                .collect()
        }
        ClusterLimit::Size(size) => {
            let mut sizes = vec![size; len / size];
            if len % size > 0 {
                sizes.push(len % size);
            }
            sizes
        }
    }
}

impl ClusteringStrategy for HorizontalClustering {
    fn name(&self) -> String {
        match self.limit {
            ClusterLimit::Num(num) => format!("Horizontal[cluster_num={}]", num),
            ClusterLimit::Size(size) => format!("Horizontal[cluster_size={}]", size),
        }
    }

    fn run(&mut self, workflow: &mut Workflow) -> Result<Clustering> {
        workflow.validate()?;
        workflow.reset_assignment();
        let mut jobs = JobList::new();
        let mut report = ClusteringReport::default();
        for (depth, mut level) in workflow.tasks_by_depth() {
            shuffle_twice(&mut self.rng, &mut level);
            let mut start = 0;
            let sizes = chunk_sizes(level.len(), self.limit);
            for &size in sizes.iter() {
                jobs.add_tasks(&level[start..start + size], workflow);
                start += size;
            }
            for &task in level.iter() {
                workflow.task_mut(task).assigned = true;
            }
            report.levels.push(LevelReport {
                depth,
                groups: level.len(),
                receivers: sizes.len(),
                ..Default::default()
            });
        }
        jobs.update_dependencies(workflow);
        let clustering = Clustering::new(jobs, report);
        log::info!(
            "{}: {} tasks clustered into {} jobs",
            self.name(),
            workflow.len(),
            clustering.jobs.len()
        );
        Ok(clustering)
    }
}
