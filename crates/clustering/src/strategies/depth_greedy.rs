//! Depth-first, parent-aware greedy clustering.
//!
//! Going from the deepest level up, each task pulls its parents into clusters whose total length
//! stays below the length of the task's longest parent.

use crate::{
    error::{ClusteringError, Result},
    job::JobList,
    strategy::{Clustering, ClusteringReport, ClusteringStrategy},
    workflow::{TaskId, Workflow},
};

#[derive(Default)]
pub struct DepthGreedyClustering {}

impl DepthGreedyClustering {
    pub fn new() -> Self {
        Self {}
    }

    /// Parent with the maximum length, the first one wins on ties.
    fn longest_parent(workflow: &Workflow, task: TaskId) -> Result<TaskId> {
        let task = workflow.task(task);
        let parents = task.parents();
        let first = *parents.first().ok_or(ClusteringError::MissingParents {
            task: task.id,
            depth: task.depth,
        })?;
        Ok(parents.iter().copied().fold(first, |longest, parent| {
            if workflow.task(longest).length < workflow.task(parent).length {
                parent
            } else {
                longest
            }
        }))
    }

    fn assign_parents(&self, task: TaskId, longest_parent: TaskId, workflow: &mut Workflow, jobs: &mut JobList) {
        let bound = workflow.task(longest_parent).length;
        if !workflow.task(longest_parent).assigned {
            jobs.add_tasks(&[longest_parent], workflow);
            workflow.task_mut(longest_parent).assigned = true;
        }

        let mut candidates = workflow
            .task(task)
            .parents()
            .iter()
            .copied()
            .filter(|&parent| !workflow.task(parent).assigned)
            .collect::<Vec<_>>();
        candidates.sort_by(|&a, &b| workflow.task(b).length.cmp(&workflow.task(a).length));

        let mut cluster = Vec::new();
        let mut cluster_length = 0;
        while let Some(candidate) = candidates.pop() {
            let length = workflow.task(candidate).length;
            if cluster_length + length < bound {
                cluster.push(candidate);
                cluster_length += length;
            } else {
                if !cluster.is_empty() {
                    jobs.add_tasks(&cluster, workflow);
                }
                cluster = vec![candidate];
                cluster_length = length;
            }
            workflow.task_mut(candidate).assigned = true;
        }
        if !cluster.is_empty() {
            jobs.add_tasks(&cluster, workflow);
        }
    }
}

impl ClusteringStrategy for DepthGreedyClustering {
    fn name(&self) -> String {
        "DepthGreedy".to_string()
    }

    fn run(&mut self, workflow: &mut Workflow) -> Result<Clustering> {
        workflow.validate()?;
        workflow.reset_assignment();
        let mut jobs = JobList::new();
        let levels = workflow.tasks_by_depth();
        let Some((&max_depth, deepest)) = levels.iter().next_back() else {
            return Ok(Clustering::new(jobs, ClusteringReport::default()));
        };

        jobs.add_tasks(deepest, workflow);
        for &task in deepest.iter() {
            workflow.task_mut(task).assigned = true;
        }

        for depth in (2..=max_depth).rev() {
            let Some(level) = levels.get(&depth) else {
                continue;
            };
            let mut ordered = level
                .iter()
                .map(|&task| Self::longest_parent(workflow, task).map(|parent| (task, parent)))
                .collect::<Result<Vec<_>>>()?;
            ordered.sort_by_key(|&(_, parent)| workflow.task(parent).length);
            log::debug!("DepthGreedy: level {} with {} tasks", depth, ordered.len());
            for (task, longest_parent) in ordered {
                self.assign_parents(task, longest_parent, workflow, &mut jobs);
            }
        }

        for task in 0..workflow.len() {
            if !workflow.task(task).assigned {
                jobs.add_tasks(&[task], workflow);
                workflow.task_mut(task).assigned = true;
            }
        }

        jobs.update_dependencies(workflow);
        let clustering = Clustering::new(jobs, ClusteringReport::default());
        log::info!(
            "DepthGreedy: {} tasks clustered into {} jobs",
            workflow.len(),
            clustering.jobs.len()
        );
        Ok(clustering)
    }
}
