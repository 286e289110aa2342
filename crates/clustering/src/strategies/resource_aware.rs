//! Balancing which groups sets with similar core demand and runtime profile.

use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    strategy::{BalancingMethod, LevelReport},
    task_set::{SetId, TaskSetGraph},
    wastage::core_hour_wastage,
    workflow::Workflow,
};

use super::common::{average, cluster_size, create_receivers, normalize, Candidate};

const EPSILON: f64 = 0.1;
const IMPACT_TOLERANCE: f64 = 1.0e-8;

/// How the clustering factor between a set and a receiver is computed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FactorMode {
    /// Cores and execution time normalized across the level, sets taken in level order.
    #[default]
    Normalized,
    /// Raw cores and lengths, sets sorted by impact factor first.
    Raw,
}

pub struct ResourceAwareBalancing {
    cluster_num: usize,
    mode: FactorMode,
}

/// Level-wide profile used to seed the metrics of receivers.
struct LevelProfile {
    cores_avg: f64,
    runtime_avg: f64,
}

impl ResourceAwareBalancing {
    pub fn new(cluster_num: usize, mode: FactorMode) -> Self {
        Self {
            cluster_num: cluster_num.max(1),
            mode,
        }
    }

    /// Writes normalized cores and execution time into every task of the level.
    ///
    /// Each set is represented by its first task, other tasks of the set get the same values.
    fn normalize_level(level: &[SetId], sets: &TaskSetGraph, workflow: &mut Workflow) {
        let representatives = level
            .iter()
            .map(|&set| workflow.task(sets.set(set).tasks()[0]))
            .collect::<Vec<_>>();
        let cores = normalize(&representatives.iter().map(|task| task.cores).collect::<Vec<_>>());
        let runtime = normalize(&representatives.iter().map(|task| task.exec_time).collect::<Vec<_>>());
        for (i, &set) in level.iter().enumerate() {
            for &task in sets.set(set).tasks().iter() {
                let task = workflow.task_mut(task);
                task.normalized_cores = cores[i];
                task.normalized_runtime = runtime[i];
            }
        }
    }

    fn profile(&self, level: &[SetId], sets: &TaskSetGraph, workflow: &Workflow) -> LevelProfile {
        let representatives = level
            .iter()
            .map(|&set| workflow.task(sets.set(set).tasks()[0]))
            .collect::<Vec<_>>();
        let (cores, runtime): (Vec<f64>, Vec<f64>) = match self.mode {
            FactorMode::Normalized => representatives
                .iter()
                .map(|task| (task.normalized_cores, task.normalized_runtime))
                .unzip(),
            FactorMode::Raw => representatives
                .iter()
                .map(|task| (task.cores, task.length as f64))
                .unzip(),
        };
        LevelProfile {
            cores_avg: average(&cores),
            runtime_avg: average(&runtime),
        }
    }

    /// Dissimilarity between a set and a receiver, smaller means better fit.
    fn clustering_factor(
        &self,
        set: SetId,
        receiver: SetId,
        profile: &LevelProfile,
        sets: &TaskSetGraph,
        workflow: &Workflow,
    ) -> f64 {
        let task = workflow.task(sets.set(set).tasks()[0]);
        let receiver_tasks = sets.set(receiver).tasks().iter().map(|&task| workflow.task(task));
        match self.mode {
            FactorMode::Normalized => {
                let max_cores = receiver_tasks
                    .clone()
                    .map(|task| task.normalized_cores)
                    .fold(profile.cores_avg, f64::max);
                let total_runtime = profile.runtime_avg
                    + receiver_tasks.map(|task| task.normalized_runtime).sum::<f64>();
                (EPSILON + (task.normalized_cores - max_cores).abs())
                    * (EPSILON + (task.normalized_runtime - total_runtime).abs())
            }
            FactorMode::Raw => {
                let max_cores = receiver_tasks.clone().map(|task| task.cores).fold(profile.cores_avg, f64::max);
                let total_runtime =
                    (profile.runtime_avg + receiver_tasks.map(|task| task.length as f64).sum::<f64>()) / 1000.;
                (EPSILON * (task.cores - max_cores).abs()) * (EPSILON * (task.length as f64 - total_runtime).abs())
            }
        }
    }

    /// Among receivers of the smallest factor which still have free capacity, the heaviest one.
    fn candidate(
        &self,
        receivers: &[SetId],
        set: SetId,
        capacity: usize,
        profile: &LevelProfile,
        sets: &TaskSetGraph,
        workflow: &Workflow,
    ) -> Candidate {
        let mut factors = receivers
            .iter()
            .map(|&receiver| (self.clustering_factor(set, receiver, profile, sets, workflow), receiver))
            .collect::<Vec<_>>();
        factors.sort_by(|a, b| a.0.total_cmp(&b.0));
        for tier in factors.chunk_by(|a, b| a.0 == b.0) {
            let mut best: Option<SetId> = None;
            for &(_, receiver) in tier.iter() {
                if sets.set(receiver).tasks().len() >= capacity {
                    continue;
                }
                if best.map_or(true, |best| sets.set(receiver).runtime() > sets.set(best).runtime()) {
                    best = Some(receiver);
                }
            }
            if let Some(receiver) = best {
                return Candidate::Found(receiver);
            }
        }
        Candidate::Fallback(receivers[0])
    }
}

/// Sorts sets by impact factor ascending. Runs of sets whose neighbouring impact factors differ by
/// at most 1e-8 are treated as equal and ordered by runtime ascending.
pub fn order_by_impact(level: &mut [SetId], sets: &TaskSetGraph) {
    let impact = |set: SetId| sets.set(set).impact_factor();
    level.sort_by(|&a, &b| impact(a).total_cmp(&impact(b)));
    for run in level.chunk_by_mut(|&a, &b| impact(b) - impact(a) <= IMPACT_TOLERANCE) {
        run.sort_by_key(|&set| sets.set(set).runtime());
    }
}

impl BalancingMethod for ResourceAwareBalancing {
    fn method_name(&self) -> String {
        match self.mode {
            FactorMode::Normalized => "ResourceAware".to_string(),
            FactorMode::Raw => "ResourceAware[raw]".to_string(),
        }
    }

    fn process_level(
        &mut self,
        depth: usize,
        mut level: Vec<SetId>,
        sets: &mut TaskSetGraph,
        workflow: &mut Workflow,
    ) -> Result<Option<LevelReport>> {
        Self::normalize_level(&level, sets, workflow);
        if level.len() <= self.cluster_num {
            return Ok(None);
        }
        let receivers = create_receivers(sets, self.cluster_num);
        let capacity = cluster_size(level.len(), self.cluster_num);
        let profile = self.profile(&level, sets, workflow);
        if self.mode == FactorMode::Raw {
            order_by_impact(&mut level, sets);
        }

        let mut report = LevelReport {
            depth,
            groups: level.len(),
            receivers: receivers.len(),
            ..Default::default()
        };
        for &set in level.iter() {
            let candidate = self.candidate(&receivers, set, capacity, &profile, sets, workflow);
            if candidate.is_fallback() {
                report.fallbacks += 1;
                log::warn!(
                    "{}: level {}: no receiver with free capacity for set {}",
                    self.method_name(),
                    depth,
                    set
                );
            }
            sets.merge_group(set, candidate.receiver());
        }

        let wastage = core_hour_wastage(receivers.iter().map(|&receiver| sets.set(receiver).tasks()), workflow);
        log::debug!("{}: level {} core-hour wastage {}", self.method_name(), depth, wastage);
        report.core_hour_wastage = Some(wastage);
        Ok(Some(report))
    }
}
