//! Task sets: clusters of tasks connected by their own DAG of set-level edges.
//!
//! Sets live in a [TaskSetGraph] arena and refer to each other by [SetId], so merging two sets
//! is a single update of index lists owned by the arena.

use std::collections::{BTreeMap, VecDeque};

use crate::workflow::{TaskId, Workflow};

/// Index of a set inside its [TaskSetGraph].
pub type SetId = usize;

/// Distance reported for sets which are not eligible for merging yet (either one is empty).
pub const INFINITE_DISTANCE: usize = usize::MAX;

/// Mapping from DAG depth to sets located at that depth.
pub type LevelIndex = BTreeMap<usize, Vec<SetId>>;

/// Mutable cluster of tasks.
#[derive(Clone, Debug, Default)]
pub struct TaskSet {
    tasks: Vec<TaskId>,
    impact_factor: f64,
    runtime: u64,
    parents: Vec<SetId>,
    children: Vec<SetId>,
}

impl TaskSet {
    /// Tasks of the set in the order they were added.
    pub fn tasks(&self) -> &[TaskId] {
        &self.tasks
    }

    /// Impact factor of the set.
    pub fn impact_factor(&self) -> f64 {
        self.impact_factor
    }

    /// Total length of all tasks in the set.
    pub fn runtime(&self) -> u64 {
        self.runtime
    }

    /// Parent sets.
    pub fn parents(&self) -> &[SetId] {
        &self.parents
    }

    /// Child sets.
    pub fn children(&self) -> &[SetId] {
        &self.children
    }

    /// Whether the set holds no tasks, either created empty or emptied by a merge.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Arena of all task sets of a workflow.
#[derive(Clone, Debug, Default)]
pub struct TaskSetGraph {
    sets: Vec<TaskSet>,
}

impl TaskSetGraph {
    /// Builds one singleton set per task with set edges mirroring task edges.
    ///
    /// Set `i` holds task `i`. Returned [LevelIndex] lists the sets of each depth in task id order.
    pub fn from_workflow(workflow: &Workflow) -> (Self, LevelIndex) {
        let impact_factors = impact_factors(workflow);
        let sets = workflow
            .tasks()
            .iter()
            .map(|task| TaskSet {
                tasks: vec![task.id],
                impact_factor: impact_factors[task.id],
                runtime: task.length,
                parents: task.parents().to_vec(),
                children: task.children().to_vec(),
            })
            .collect();
        let levels = workflow.tasks_by_depth();
        (Self { sets }, levels)
    }

    /// Adds new empty set, used as a receiver of merged sets.
    pub fn add_empty(&mut self) -> SetId {
        self.sets.push(TaskSet::default());
        self.sets.len() - 1
    }

    /// Returns set by id.
    pub fn set(&self, set_id: SetId) -> &TaskSet {
        &self.sets[set_id]
    }

    /// Number of sets including empty ones.
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Whether the arena holds no sets.
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Iterates over all non-empty sets in id order.
    pub fn live_sets(&self) -> impl Iterator<Item = (SetId, &TaskSet)> {
        self.sets.iter().enumerate().filter(|(_, set)| !set.is_empty())
    }

    /// Overrides impact factor of a set.
    pub fn set_impact_factor(&mut self, set_id: SetId, impact_factor: f64) {
        self.sets[set_id].impact_factor = impact_factor;
    }

    /// Moves everything from `donor` into `receiver`.
    ///
    /// Receiver gets donor's tasks and impact factor. Every edge touching the donor is redirected to
    /// the receiver, edges between the two are dropped, and the donor is left empty without edges.
    pub fn merge_group(&mut self, donor: SetId, receiver: SetId) {
        if donor == receiver {
            return;
        }
        let donor_set = std::mem::take(&mut self.sets[donor]);

        let target = &mut self.sets[receiver];
        debug_assert!(donor_set.tasks.iter().all(|task| !target.tasks.contains(task)));
        target.tasks.extend_from_slice(&donor_set.tasks);
        target.runtime += donor_set.runtime;
        target.impact_factor = donor_set.impact_factor;
        target.children.retain(|&child| child != donor);
        target.parents.retain(|&parent| parent != donor);

        for &child in donor_set.children.iter() {
            if child == receiver {
                continue;
            }
            replace_edge(&mut self.sets[child].parents, donor, receiver);
            push_unique(&mut self.sets[receiver].children, child);
        }
        for &parent in donor_set.parents.iter() {
            if parent == receiver {
                continue;
            }
            replace_edge(&mut self.sets[parent].children, donor, receiver);
            push_unique(&mut self.sets[receiver].parents, parent);
        }
    }

    /// Distance between two sets of the same level, in child-edge hops.
    ///
    /// Both sets expand their child frontiers in lockstep. The first level where the frontiers
    /// share a set gives `2 * hops`, with hops counted from 0 for direct children. When one frontier
    /// runs out first, the number of expanded levels times two is returned.
    pub fn distance(&self, a: SetId, b: SetId) -> usize {
        if a == b {
            return 0;
        }
        if self.sets[a].is_empty() || self.sets[b].is_empty() {
            return INFINITE_DISTANCE;
        }
        let mut frontier_a = vec![a];
        let mut frontier_b = vec![b];
        let mut distance = 0;
        loop {
            frontier_a = self.expand(&frontier_a);
            frontier_b = self.expand(&frontier_b);
            if frontier_a.iter().any(|set| frontier_b.contains(set)) {
                return distance * 2;
            }
            distance += 1;
            if frontier_a.is_empty() || frontier_b.is_empty() {
                return distance * 2;
            }
        }
    }

    fn expand(&self, frontier: &[SetId]) -> Vec<SetId> {
        let mut next = Vec::new();
        for &set in frontier.iter() {
            for &child in self.sets[set].children.iter() {
                push_unique(&mut next, child);
            }
        }
        next
    }

    /// Checks that set edges are mutual and cover every task edge crossing set boundaries.
    pub fn is_consistent(&self, workflow: &Workflow) -> bool {
        for (id, set) in self.sets.iter().enumerate() {
            if set.children.iter().any(|&child| !self.sets[child].parents.contains(&id)) {
                return false;
            }
            if set.parents.iter().any(|&parent| !self.sets[parent].children.contains(&id)) {
                return false;
            }
        }
        let mut owner = vec![None; workflow.len()];
        for (id, set) in self.live_sets() {
            for &task in set.tasks.iter() {
                owner[task] = Some(id);
            }
        }
        workflow.tasks().iter().all(|task| {
            task.children().iter().all(|&child| match (owner[task.id], owner[child]) {
                (Some(from), Some(to)) => from == to || self.sets[from].children.contains(&to),
                _ => true,
            })
        })
    }
}

fn push_unique(list: &mut Vec<SetId>, set: SetId) {
    if !list.contains(&set) {
        list.push(set);
    }
}

fn replace_edge(list: &mut Vec<SetId>, old: SetId, new: SetId) {
    if let Some(pos) = list.iter().position(|&set| set == old) {
        if list.contains(&new) {
            list.remove(pos);
        } else {
            list[pos] = new;
        }
    }
}

/// Impact factor of every task: exit tasks get 1, others split the impact of each child evenly
/// between all of that child's parents.
fn impact_factors(workflow: &Workflow) -> Vec<f64> {
    let mut remaining_children = workflow
        .tasks()
        .iter()
        .map(|task| task.children().len())
        .collect::<Vec<_>>();
    let mut queue = workflow
        .tasks()
        .iter()
        .filter(|task| task.children().is_empty())
        .map(|task| task.id)
        .collect::<VecDeque<_>>();
    let mut impact = vec![0.0; workflow.len()];
    while let Some(task_id) = queue.pop_front() {
        let task = workflow.task(task_id);
        impact[task_id] = if task.children().is_empty() {
            1.0
        } else {
            task.children()
                .iter()
                .map(|&child| impact[child] / workflow.task(child).parents().len() as f64)
                .sum()
        };
        for &parent in task.parents().iter() {
            remaining_children[parent] -= 1;
            if remaining_children[parent] == 0 {
                queue.push_back(parent);
            }
        }
    }
    impact
}
