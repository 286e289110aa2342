//! Jobs produced by clustering and the index of task assignments.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::workflow::{TaskId, Workflow};

/// Index of a job inside a [JobList].
pub type JobId = usize;

/// Execution unit handed to a scheduler, a bag of tasks.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Job {
    /// Id of the job.
    pub id: JobId,
    /// Smallest depth among the job's tasks.
    pub depth: usize,
    /// Tasks in the order they were added.
    pub tasks: Vec<TaskId>,
    /// Total length of all tasks.
    pub runtime: u64,
    /// Jobs containing a parent of some task of this job.
    pub parents: Vec<JobId>,
    /// Jobs containing a child of some task of this job.
    pub children: Vec<JobId>,
    /// Scheduling delay set by a [ClusterDelay] hook.
    pub delay: f64,
}

/// Mapping from a task to the job it was finally assigned to.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TaskAssignmentIndex {
    assignment: BTreeMap<TaskId, JobId>,
}

impl TaskAssignmentIndex {
    /// Records assignment and returns the previous job of the task, if any.
    pub fn assign(&mut self, task: TaskId, job: JobId) -> Option<JobId> {
        self.assignment.insert(task, job)
    }

    /// Job of a task.
    pub fn job_of(&self, task: TaskId) -> Option<JobId> {
        self.assignment.get(&task).copied()
    }

    /// Number of assigned tasks.
    pub fn len(&self) -> usize {
        self.assignment.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignment.is_empty()
    }

    /// Iterates over `(task, job)` pairs ordered by task.
    pub fn iter(&self) -> impl Iterator<Item = (TaskId, JobId)> + '_ {
        self.assignment.iter().map(|(&task, &job)| (task, job))
    }
}

/// Hook which decides the per-cluster scheduling delay, implemented by the simulation layer.
pub trait ClusterDelay {
    fn cluster_delay(&self, job: &Job) -> f64;
}

/// Same delay for every job.
pub struct FixedDelay(pub f64);

impl ClusterDelay for FixedDelay {
    fn cluster_delay(&self, _job: &Job) -> f64 {
        self.0
    }
}

/// Growing list of jobs together with the assignment index.
#[derive(Default)]
pub struct JobList {
    jobs: Vec<Job>,
    assignment: TaskAssignmentIndex,
}

impl JobList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new job from `tasks` and records the assignment of each of them.
    pub fn add_tasks(&mut self, tasks: &[TaskId], workflow: &Workflow) -> JobId {
        let id = self.jobs.len();
        for &task in tasks.iter() {
            if let Some(previous) = self.assignment.assign(task, id) {
                log::warn!("task {} moved from job {} to job {}", task, previous, id);
            }
        }
        self.jobs.push(Job {
            id,
            depth: tasks.iter().map(|&task| workflow.task(task).depth).min().unwrap_or(0),
            tasks: tasks.to_vec(),
            runtime: tasks.iter().map(|&task| workflow.task(task).length).sum(),
            parents: Vec::new(),
            children: Vec::new(),
            delay: 0.0,
        });
        id
    }

    /// Jobs created so far.
    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn assignment(&self) -> &TaskAssignmentIndex {
        &self.assignment
    }

    /// Rebuilds job edges from task edges which cross job boundaries.
    pub fn update_dependencies(&mut self, workflow: &Workflow) {
        for job in self.jobs.iter_mut() {
            job.parents.clear();
            job.children.clear();
        }
        for task in workflow.tasks() {
            let Some(from) = self.assignment.job_of(task.id) else {
                continue;
            };
            for &child in task.children().iter() {
                let Some(to) = self.assignment.job_of(child) else {
                    continue;
                };
                if from != to && !self.jobs[from].children.contains(&to) {
                    self.jobs[from].children.push(to);
                    self.jobs[to].parents.push(from);
                }
            }
        }
    }

    pub fn into_parts(self) -> (Vec<Job>, TaskAssignmentIndex) {
        (self.jobs, self.assignment)
    }
}
