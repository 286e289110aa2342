//! Distance and impact factor driven balancing with chain collapsing.

use std::collections::BTreeMap;

use crate::{
    error::Result,
    strategy::{BalancingMethod, LevelReport},
    task_set::{SetId, TaskSetGraph},
    workflow::Workflow,
};

use super::common::{cluster_size, create_receivers, Candidate};

pub struct HybridBalancing {
    cluster_num: usize,
}

impl HybridBalancing {
    pub fn new(cluster_num: usize) -> Self {
        Self {
            cluster_num: cluster_num.max(1),
        }
    }

    /// Positions in `level` of the sets which seed the receivers, at most `count` of them.
    ///
    /// The two farthest sets come first. Each further seed is the set with the largest average
    /// distance to the chosen ones, accepted only if that average equals the farthest-pair distance.
    fn seeds(level: &[SetId], sets: &TaskSetGraph, count: usize) -> Vec<usize> {
        let size = level.len();
        let mut distances = vec![vec![0; size]; size];
        for i in 0..size {
            for j in 0..i {
                let distance = sets.distance(level[i], level[j]);
                distances[i][j] = distance;
                distances[j][i] = distance;
            }
        }

        let (mut max, mut max_i, mut max_j) = (0, 0, 0);
        for (i, row) in distances.iter().enumerate() {
            for (j, &distance) in row.iter().enumerate().take(i) {
                if distance > max {
                    (max, max_i, max_j) = (distance, i, j);
                }
            }
        }
        let mut chosen = vec![max_i];
        if max_j != max_i {
            chosen.push(max_j);
        }

        let mut best = 0;
        for _ in 0..count.saturating_sub(2) {
            let mut max_average = 0.0;
            for i in 0..size {
                let average =
                    chosen.iter().map(|&seed| distances[i][seed] as f64).sum::<f64>() / chosen.len() as f64;
                if max_average < average {
                    max_average = average;
                    best = i;
                }
            }
            if max_average == max as f64 && !chosen.contains(&best) {
                chosen.push(best);
            }
        }
        chosen.truncate(count);
        chosen
    }

    /// Nearest receiver with free capacity, the one with the smallest runtime among equally near.
    fn candidate(receivers: &[SetId], set: SetId, capacity: usize, sets: &TaskSetGraph) -> Candidate {
        let mut tiers: BTreeMap<usize, Vec<SetId>> = BTreeMap::new();
        for &receiver in receivers.iter() {
            tiers.entry(sets.distance(set, receiver)).or_default().push(receiver);
        }
        for tier in tiers.values() {
            let best = tier
                .iter()
                .copied()
                .filter(|&receiver| sets.set(receiver).tasks().len() < capacity)
                .min_by_key(|&receiver| sets.set(receiver).runtime());
            if let Some(receiver) = best {
                return Candidate::Found(receiver);
            }
        }
        Candidate::Fallback(receivers[0])
    }

    /// Merges `set` into `receiver` and keeps absorbing its single child while the edge between them
    /// is the only one on both sides and both have the same impact factor.
    fn merge_chain(set: SetId, receiver: SetId, sets: &mut TaskSetGraph) {
        let mut children = sets.set(set).children().to_vec();
        let mut impact_factor = sets.set(set).impact_factor();
        sets.merge_group(set, receiver);
        while let [child] = children[..] {
            let child_set = sets.set(child);
            if child_set.parents().len() != 1 || child_set.impact_factor() != impact_factor {
                break;
            }
            log::debug!("HY: collapsing chain set {} into receiver {}", child, receiver);
            children = child_set.children().to_vec();
            impact_factor = child_set.impact_factor();
            sets.merge_group(child, receiver);
        }
    }
}

impl BalancingMethod for HybridBalancing {
    fn method_name(&self) -> String {
        "HY".to_string()
    }

    fn process_level(
        &mut self,
        depth: usize,
        level: Vec<SetId>,
        sets: &mut TaskSetGraph,
        _workflow: &mut Workflow,
    ) -> Result<Option<LevelReport>> {
        if level.len() <= self.cluster_num {
            return Ok(None);
        }
        let receivers = create_receivers(sets, self.cluster_num);
        let capacity = cluster_size(level.len(), self.cluster_num);
        let mut report = LevelReport {
            depth,
            groups: level.len(),
            receivers: receivers.len(),
            ..Default::default()
        };

        let seeds = Self::seeds(&level, sets, receivers.len());
        for (&receiver, &seed) in receivers.iter().zip(seeds.iter()) {
            sets.merge_group(level[seed], receiver);
        }

        let pool = level
            .iter()
            .enumerate()
            .filter_map(|(i, &set)| (!seeds.contains(&i)).then_some(set));
        for set in pool {
            let candidate = Self::candidate(&receivers, set, capacity, sets);
            if candidate.is_fallback() {
                report.fallbacks += 1;
                log::warn!("HY: level {}: no receiver with free capacity for set {}", depth, set);
            }
            Self::merge_chain(set, candidate.receiver(), sets);
        }
        Ok(Some(report))
    }
}
