//! Longest-processing-time-first balancing of set runtimes.

use rand_pcg::Pcg64;

use crate::{
    error::Result,
    strategy::{BalancingMethod, LevelReport},
    task_set::{SetId, TaskSetGraph},
    wastage::core_hour_wastage,
    workflow::Workflow,
};

use super::common::{create_receivers, make_rng, shuffle_twice};

pub struct RuntimeBalancing {
    cluster_num: usize,
    rng: Pcg64,
}

impl RuntimeBalancing {
    /// Creates the method with shuffles driven by `rng`.
    pub fn new(cluster_num: usize, rng: Pcg64) -> Self {
        Self {
            cluster_num: cluster_num.max(1),
            rng,
        }
    }

    /// Creates the method with a generator seeded from `seed` or from OS entropy.
    pub fn with_seed(cluster_num: usize, seed: Option<u64>) -> Self {
        Self::new(cluster_num, make_rng(seed))
    }
}

impl BalancingMethod for RuntimeBalancing {
    fn method_name(&self) -> String {
        "RuntimeBalancing".to_string()
    }

    fn process_level(
        &mut self,
        depth: usize,
        mut level: Vec<SetId>,
        sets: &mut TaskSetGraph,
        workflow: &mut Workflow,
    ) -> Result<Option<LevelReport>> {
        shuffle_twice(&mut self.rng, &mut level);
        if level.len() <= self.cluster_num {
            return Ok(None);
        }
        let receivers = create_receivers(sets, self.cluster_num);
        level.sort_by(|&a, &b| sets.set(b).runtime().cmp(&sets.set(a).runtime()));
        for &set in level.iter() {
            let lightest = receivers
                .iter()
                .copied()
                .min_by_key(|&receiver| sets.set(receiver).runtime())
                .unwrap_or(receivers[0]);
            sets.merge_group(set, lightest);
        }

        let wastage = core_hour_wastage(receivers.iter().map(|&receiver| sets.set(receiver).tasks()), workflow);
        log::debug!("RuntimeBalancing: level {} core-hour wastage {}", depth, wastage);
        Ok(Some(LevelReport {
            depth,
            groups: level.len(),
            receivers: receivers.len(),
            fallbacks: 0,
            core_hour_wastage: Some(wastage),
        }))
    }
}
