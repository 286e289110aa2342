//! Model of a workflow DAG.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::error::{ClusteringError, Result};

/// Index of a task inside its [Workflow].
pub type TaskId = usize;

/// Single workflow task, a vertex of the DAG.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    /// Id of the task, equal to its position in the workflow.
    pub id: TaskId,
    /// Longest-path distance from a root of the DAG.
    pub depth: usize,
    /// Computational size of the task.
    pub length: u64,
    /// Observed or estimated execution time.
    pub exec_time: f64,
    /// Number of cores needed for the task.
    pub cores: f64,
    /// Cores normalized to `[0, 1]` across the task's level.
    pub normalized_cores: f64,
    /// Execution time normalized to `[0, 1]` across the task's level.
    pub normalized_runtime: f64,
    /// Whether the task was already placed into a cluster.
    pub assigned: bool,
    parents: Vec<TaskId>,
    children: Vec<TaskId>,
}

impl Task {
    /// Parents of the task in insertion order.
    pub fn parents(&self) -> &[TaskId] {
        &self.parents
    }

    /// Children of the task in insertion order.
    pub fn children(&self) -> &[TaskId] {
        &self.children
    }
}

/// Workflow DAG, owns all its tasks.
#[derive(Clone, Debug, Default)]
pub struct Workflow {
    tasks: Vec<Task>,
}

impl Workflow {
    /// Creates new empty workflow.
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    /// Adds new task and returns its id.
    pub fn add_task(&mut self, depth: usize, length: u64, exec_time: f64, cores: f64) -> TaskId {
        let id = self.tasks.len();
        self.tasks.push(Task {
            id,
            depth,
            length,
            exec_time,
            cores,
            normalized_cores: 0.0,
            normalized_runtime: 0.0,
            assigned: false,
            parents: Vec::new(),
            children: Vec::new(),
        });
        id
    }

    /// Adds an edge `parent -> child`. Repeated edges are ignored.
    pub fn add_dependency(&mut self, parent: TaskId, child: TaskId) -> Result<()> {
        for task in [parent, child] {
            if task >= self.tasks.len() {
                return Err(ClusteringError::UnknownTask { task });
            }
        }
        if !self.tasks[parent].children.contains(&child) {
            self.tasks[parent].children.push(child);
            self.tasks[child].parents.push(parent);
        }
        Ok(())
    }

    /// Returns task by id.
    pub fn task(&self, task_id: TaskId) -> &Task {
        &self.tasks[task_id]
    }

    /// Returns mutable task by id.
    pub fn task_mut(&mut self, task_id: TaskId) -> &mut Task {
        &mut self.tasks[task_id]
    }

    /// Returns task by id or [ClusteringError::UnknownTask].
    pub fn get(&self, task_id: TaskId) -> Result<&Task> {
        self.tasks
            .get(task_id)
            .ok_or(ClusteringError::UnknownTask { task: task_id })
    }

    /// Returns all tasks ordered by id.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Number of tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the workflow has no tasks.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Greatest depth among all tasks, 0 for an empty workflow.
    pub fn max_depth(&self) -> usize {
        self.tasks.iter().map(|task| task.depth).max().unwrap_or(0)
    }

    /// Groups task ids by depth, keeping id order inside each level.
    pub fn tasks_by_depth(&self) -> BTreeMap<usize, Vec<TaskId>> {
        let mut result: BTreeMap<usize, Vec<TaskId>> = BTreeMap::new();
        for task in self.tasks.iter() {
            result.entry(task.depth).or_default().push(task.id);
        }
        result
    }

    /// Clears `assigned` flags left by a previous run.
    pub fn reset_assignment(&mut self) {
        for task in self.tasks.iter_mut() {
            task.assigned = false;
        }
    }

    /// Sets depth of every task to the longest path from a root. Roots get depth 0.
    pub fn assign_depths(&mut self) -> Result<()> {
        let depths = self.longest_path_depths()?;
        for (task, depth) in self.tasks.iter_mut().zip(depths) {
            task.depth = depth;
        }
        Ok(())
    }

    /// Longest path from a root to every task, computed in topological order.
    fn longest_path_depths(&self) -> Result<Vec<usize>> {
        let mut remaining_parents = self.tasks.iter().map(|task| task.parents.len()).collect::<Vec<_>>();
        let mut queue = self
            .tasks
            .iter()
            .filter(|task| task.parents.is_empty())
            .map(|task| task.id)
            .collect::<VecDeque<_>>();
        let mut depth = vec![0; self.tasks.len()];
        let mut visited = 0;
        while let Some(task_id) = queue.pop_front() {
            visited += 1;
            for &child in self.tasks[task_id].children.iter() {
                depth[child] = depth[child].max(depth[task_id] + 1);
                remaining_parents[child] -= 1;
                if remaining_parents[child] == 0 {
                    queue.push_back(child);
                }
            }
        }
        if visited != self.tasks.len() {
            return Err(ClusteringError::Cycle);
        }
        Ok(depth)
    }

    /// Checks that the workflow is a DAG which strategies can process.
    ///
    /// Tasks at depth 2 or deeper need a parent, cores and execution time must be finite and
    /// non-negative, edges must not form a cycle and every child must lie deeper than its parents.
    pub fn validate(&self) -> Result<()> {
        for task in self.tasks.iter() {
            if task.depth >= 2 && task.parents.is_empty() {
                return Err(ClusteringError::MissingParents {
                    task: task.id,
                    depth: task.depth,
                });
            }
            for (field, value) in [("cores", task.cores), ("exec_time", task.exec_time)] {
                if !value.is_finite() || value < 0.0 {
                    return Err(ClusteringError::InvalidTask { task: task.id, field });
                }
            }
        }
        self.longest_path_depths()?;
        for task in self.tasks.iter() {
            if let Some(&child) = task
                .children
                .iter()
                .find(|&&child| self.tasks[child].depth <= task.depth)
            {
                return Err(ClusteringError::DepthOrder { parent: task.id, child });
            }
        }
        Ok(())
    }
}
