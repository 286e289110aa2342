use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    job::{ClusterDelay, Job, JobList, TaskAssignmentIndex},
    task_set::{SetId, TaskSetGraph},
    wastage::WastageAccumulator,
    workflow::{TaskId, Workflow},
};

/// What happened on one processed level.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LevelReport {
    pub depth: usize,
    /// Number of non-empty sets found on the level.
    pub groups: usize,
    /// Number of receivers the sets were merged into.
    pub receivers: usize,
    /// Number of merges where no receiver with free capacity was found.
    pub fallbacks: usize,
    /// Core-hour wastage of the receivers after the level was processed, for methods which report it.
    pub core_hour_wastage: Option<f64>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ClusteringReport {
    pub levels: Vec<LevelReport>,
}

impl ClusteringReport {
    /// Wastage summed over all levels of the run.
    pub fn total_core_hour_wastage(&self) -> f64 {
        self.wastage().total()
    }

    /// Per-level wastage collected into an accumulator.
    pub fn wastage(&self) -> WastageAccumulator {
        let mut accumulator = WastageAccumulator::new();
        for wastage in self.levels.iter().filter_map(|level| level.core_hour_wastage) {
            accumulator.add(wastage);
        }
        accumulator
    }

    pub fn fallbacks(&self) -> usize {
        self.levels.iter().map(|level| level.fallbacks).sum()
    }
}

/// Result of a clustering run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Clustering {
    pub jobs: Vec<Job>,
    pub assignment: TaskAssignmentIndex,
    pub report: ClusteringReport,
}

impl Clustering {
    pub fn new(jobs: JobList, report: ClusteringReport) -> Self {
        let (jobs, assignment) = jobs.into_parts();
        Self {
            jobs,
            assignment,
            report,
        }
    }

    /// Job which holds the task.
    pub fn job_of(&self, task: TaskId) -> Option<&Job> {
        self.assignment.job_of(task).map(|job| &self.jobs[job])
    }

    /// Sets the delay of every job using the hook.
    pub fn apply_cluster_delay(&mut self, hook: &dyn ClusterDelay) {
        for job in self.jobs.iter_mut() {
            job.delay = hook.cluster_delay(job);
        }
    }
}

/// Algorithm which groups workflow tasks into jobs.
pub trait ClusteringStrategy {
    /// Short name used in reports.
    fn name(&self) -> String;

    /// Clusters the whole workflow. May update `assigned` and normalized fields of tasks.
    fn run(&mut self, workflow: &mut Workflow) -> Result<Clustering>;
}

/// Horizontal method which merges task sets of one level into a bounded number of receivers.
pub trait BalancingMethod {
    fn method_name(&self) -> String;

    /// Processes non-empty sets of one level. Returns `None` if the level was left as is.
    fn process_level(
        &mut self,
        depth: usize,
        level: Vec<SetId>,
        sets: &mut TaskSetGraph,
        workflow: &mut Workflow,
    ) -> Result<Option<LevelReport>>;
}

impl<T> ClusteringStrategy for T
where
    T: BalancingMethod,
{
    fn name(&self) -> String {
        self.method_name()
    }

    fn run(&mut self, workflow: &mut Workflow) -> Result<Clustering> {
        workflow.validate()?;
        workflow.reset_assignment();
        let (mut sets, levels) = TaskSetGraph::from_workflow(workflow);
        let mut report = ClusteringReport::default();
        for (&depth, level) in levels.iter() {
            let level = level
                .iter()
                .copied()
                .filter(|&set| !sets.set(set).is_empty())
                .collect::<Vec<_>>();
            if let Some(level_report) = self.process_level(depth, level, &mut sets, workflow)? {
                log::debug!(
                    "{}: level {} with {} sets merged into {} receivers",
                    self.method_name(),
                    depth,
                    level_report.groups,
                    level_report.receivers
                );
                report.levels.push(level_report);
            }
        }

        let mut jobs = jobs_from_sets(&sets, workflow);
        jobs.update_dependencies(workflow);
        let clustering = Clustering::new(jobs, report);
        log::info!(
            "{}: {} tasks clustered into {} jobs",
            self.method_name(),
            workflow.len(),
            clustering.jobs.len()
        );
        Ok(clustering)
    }
}

/// One job per non-empty set, ordered by the smallest task id of each set.
pub fn jobs_from_sets(sets: &TaskSetGraph, workflow: &mut Workflow) -> JobList {
    let mut owner = vec![None; workflow.len()];
    for (set_id, set) in sets.live_sets() {
        for &task in set.tasks().iter() {
            owner[task] = Some(set_id);
        }
    }
    let mut jobs = JobList::new();
    let mut emitted = BTreeSet::new();
    for (task, set_id) in owner.into_iter().enumerate() {
        if let Some(set_id) = set_id {
            if emitted.insert(set_id) {
                jobs.add_tasks(sets.set(set_id).tasks(), workflow);
            }
            workflow.task_mut(task).assigned = true;
        }
    }
    jobs
}
