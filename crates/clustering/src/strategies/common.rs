use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

use crate::task_set::{SetId, TaskSetGraph};

/// Receiver picked for a set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Candidate {
    /// Receiver with free capacity was found.
    Found(SetId),
    /// Every receiver is full, the set goes to the first receiver regardless of its size.
    Fallback(SetId),
}

impl Candidate {
    pub fn receiver(&self) -> SetId {
        match *self {
            Candidate::Found(receiver) | Candidate::Fallback(receiver) => receiver,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Candidate::Fallback(_))
    }
}

/// Maximum number of tasks per receiver when `level_size` sets are split between `cluster_num` receivers.
pub fn cluster_size(level_size: usize, cluster_num: usize) -> usize {
    level_size.div_ceil(cluster_num)
}

/// Appends `count` empty receivers to the arena.
pub fn create_receivers(sets: &mut TaskSetGraph, count: usize) -> Vec<SetId> {
    (0..count).map(|_| sets.add_empty()).collect()
}

pub fn shuffle<T>(rng: &mut Pcg64, data: &mut [T]) {
    for i in 1..data.len() {
        data.swap(i, rng.gen_range(0..=i));
    }
}

/// Shuffles data two times, each time with a generator freshly seeded from `rng`.
pub fn shuffle_twice<T>(rng: &mut Pcg64, data: &mut [T]) {
    for _ in 0..2 {
        let mut shuffle_rng = Pcg64::seed_from_u64(rng.gen());
        shuffle(&mut shuffle_rng, data);
    }
}

/// Generator seeded with `seed`, or from OS entropy if there is none.
pub fn make_rng(seed: Option<u64>) -> Pcg64 {
    Pcg64::seed_from_u64(seed.unwrap_or_else(rand::random))
}

/// Min-max normalization into `[0, 1]`. All values become 0 when they are all equal.
pub fn normalize(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if values.is_empty() || max == min {
        return vec![0.0; values.len()];
    }
    values.iter().map(|value| (value - min) / (max - min)).collect()
}

/// Mean of values, 0 for an empty slice.
pub fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
