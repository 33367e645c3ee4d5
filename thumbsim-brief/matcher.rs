use rayon::prelude::*;
use thumbsim_core::{Descriptor, Match};

/// Number of differing bits between two descriptors
#[inline]
pub fn hamming_distance(a: &Descriptor, b: &Descriptor) -> u32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x ^ y).count_ones()).sum()
}

/// Index and distance of the closest candidate; ties keep the lowest index
fn nearest(query: &Descriptor, candidates: &[Descriptor]) -> Option<(usize, u32)> {
    let mut best: Option<(usize, u32)> = None;
    for (idx, candidate) in candidates.iter().enumerate() {
        let distance = hamming_distance(query, candidate);
        match best {
            Some((_, d)) if d <= distance => {}
            _ => best = Some((idx, distance)),
        }
    }
    best
}

/// Exhaustive Hamming matcher
#[derive(Debug, Clone, Copy)]
pub struct BruteForceMatcher {
    cross_check: bool,
}

impl Default for BruteForceMatcher {
    fn default() -> Self {
        Self { cross_check: true }
    }
}

impl BruteForceMatcher {
    pub fn new(cross_check: bool) -> Self {
        Self { cross_check }
    }

    pub fn cross_check(&self) -> bool {
        self.cross_check
    }

    /// Match every query descriptor to its nearest train descriptor. With
    /// cross-checking a pair survives only if each side is the other's nearest.
    pub fn match_descriptors(&self, query: &[Descriptor], train: &[Descriptor]) -> Vec<Match> {
        if query.is_empty() || train.is_empty() {
            return Vec::new();
        }

        let forward: Vec<(usize, u32)> = query
            .par_iter()
            .filter_map(|d| nearest(d, train))
            .collect();

        if !self.cross_check {
            return forward
                .into_iter()
                .enumerate()
                .map(|(query_idx, (train_idx, distance))| Match { query_idx, train_idx, distance })
                .collect();
        }

        let backward: Vec<usize> = train
            .par_iter()
            .filter_map(|d| nearest(d, query).map(|(idx, _)| idx))
            .collect();

        forward
            .into_iter()
            .enumerate()
            .filter(|&(query_idx, (train_idx, _))| backward[train_idx] == query_idx)
            .map(|(query_idx, (train_idx, distance))| Match { query_idx, train_idx, distance })
            .collect()
    }
}

/// Sort by ascending distance and keep the best `floor(fraction * len)`
pub fn retain_best_fraction(matches: &mut Vec<Match>, fraction: f64) {
    matches.sort_by_key(|m| m.distance);
    let keep = (matches.len() as f64 * fraction.clamp(0.0, 1.0)).floor() as usize;
    matches.truncate(keep);
}
