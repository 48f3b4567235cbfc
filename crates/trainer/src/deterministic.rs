//! Deterministic utilities for reproducible training
//!
//! Provides a seeded LCG and split tie-breaking so that the same dataset and
//! seed always produce the same forest, independent of platform or crate
//! versions.

use std::num::Wrapping;

/// 64-bit Linear Congruential Generator (Knuth MMIX constants).
///
/// Only the high 31 bits of the state are emitted; the low bits of an LCG
/// have short periods.
#[derive(Clone, Debug)]
pub struct LcgRng {
    state: Wrapping<u64>,
}

impl LcgRng {
    const MULTIPLIER: u64 = 6_364_136_223_846_793_005;
    const INCREMENT: u64 = 1_442_695_040_888_963_407;

    pub fn new(seed: u64) -> Self {
        let mut rng = Self {
            state: Wrapping(seed),
        };
        // Advance once so small seeds do not start from a near-zero state
        rng.step();
        rng
    }

    fn step(&mut self) {
        self.state = self.state * Wrapping(Self::MULTIPLIER) + Wrapping(Self::INCREMENT);
    }

    /// Next value in `[0, 2^31)`
    pub fn next_u31(&mut self) -> u32 {
        self.step();
        (self.state.0 >> 33) as u32
    }

    /// Uniform index in `[0, bound)`; returns 0 when `bound == 0`
    pub fn next_index(&mut self, bound: usize) -> usize {
        if bound == 0 {
            return 0;
        }
        // multiply-shift keeps the high bits instead of using `%`
        ((u64::from(self.next_u31()) * bound as u64) >> 31) as usize
    }

    /// Fisher-Yates shuffle
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.next_index(i + 1);
            items.swap(i, j);
        }
    }
}

/// Deterministic tie-breaker for split selection.
///
/// Among equal-gain splits the smallest `(feature_idx, threshold, node_id)`
/// wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SplitTieBreaker {
    pub feature_idx: usize,
    pub threshold: i64,
    pub node_id: usize,
}

impl SplitTieBreaker {
    pub fn new(feature_idx: usize, threshold: i64, node_id: usize) -> Self {
        Self {
            feature_idx,
            threshold,
            node_id,
        }
    }
}
