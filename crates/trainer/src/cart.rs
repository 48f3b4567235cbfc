//! CART (Classification and Regression Tree) builder
//!
//! Implements deterministic exact-greedy classification tree construction
//! with Gini impurity. Split quality is compared as exact integer fractions,
//! so no floating-point rounding can reorder candidates.

use khet_model::{Node, Tree, FEATURE_COUNT};
use std::cmp::Ordering;

use crate::deterministic::{LcgRng, SplitTieBreaker};

/// Training parameters for a single tree
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeConfig {
    /// `None` grows until leaves are pure
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Non-constant features examined per split
    pub max_features: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: FEATURE_COUNT,
        }
    }
}

/// Split score `num / den` = sum over both sides of `sum(count^2) / side_size`.
///
/// Maximizing it minimizes the weighted Gini impurity of the children.
#[derive(Debug, Clone, Copy)]
struct SplitScore {
    num: u128,
    den: u128,
}

impl SplitScore {
    fn new(left_sq: u128, n_left: u128, right_sq: u128, n_right: u128) -> Self {
        Self {
            num: left_sq * n_right + right_sq * n_left,
            den: n_left * n_right,
        }
    }

    fn compare(&self, other: &Self) -> Ordering {
        (self.num * other.den).cmp(&(other.num * self.den))
    }
}

/// Split candidate with score and tie-breaker
#[derive(Debug, Clone)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: i64,
    score: SplitScore,
    tie_breaker: SplitTieBreaker,
}

impl SplitCandidate {
    fn beats(&self, current: &SplitCandidate) -> bool {
        match self.score.compare(&current.score) {
            Ordering::Greater => true,
            Ordering::Equal => self.tie_breaker < current.tie_breaker,
            Ordering::Less => false,
        }
    }
}

/// Builds one classification tree over fixed-point rows
pub struct CartBuilder<'a> {
    config: &'a TreeConfig,
    rows: &'a [[i64; FEATURE_COUNT]],
    labels: &'a [u32],
    n_classes: usize,
}

impl<'a> CartBuilder<'a> {
    pub fn new(
        rows: &'a [[i64; FEATURE_COUNT]],
        labels: &'a [u32],
        n_classes: usize,
        config: &'a TreeConfig,
    ) -> Self {
        Self {
            config,
            rows,
            labels,
            n_classes,
        }
    }

    /// Grow a tree on `sample` (row indices, repeats allowed for bootstraps).
    ///
    /// `rng` only chooses which features are examined at each split.
    pub fn build(&self, sample: &[usize], rng: &mut LcgRng) -> Tree {
        let mut nodes = Vec::new();
        self.build_node(sample, 0, &mut nodes, rng);
        Tree::new(nodes)
    }

    /// Recursively build tree nodes, returning the index of the new node
    fn build_node(
        &self,
        indices: &[usize],
        depth: usize,
        nodes: &mut Vec<Node>,
        rng: &mut LcgRng,
    ) -> i32 {
        let current_idx = nodes.len();
        let counts = self.class_counts(indices);
        let majority = majority_class(&counts);

        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        let depth_reached = self.config.max_depth.is_some_and(|max| depth >= max);

        if pure || depth_reached || indices.len() < self.config.min_samples_split {
            nodes.push(Node::leaf(current_idx as i32, majority));
            return current_idx as i32;
        }

        let Some(split) = self.find_best_split(indices, current_idx, rng) else {
            nodes.push(Node::leaf(current_idx as i32, majority));
            return current_idx as i32;
        };

        let (left_indices, right_indices) =
            self.split_samples(indices, split.feature_idx, split.threshold);

        // Reserve the slot; children are filled in after recursion
        nodes.push(Node::internal(
            current_idx as i32,
            split.feature_idx as i32,
            split.threshold,
            -1,
            -1,
        ));

        let left_idx = self.build_node(&left_indices, depth + 1, nodes, rng);
        let right_idx = self.build_node(&right_indices, depth + 1, nodes, rng);

        nodes[current_idx].left = left_idx;
        nodes[current_idx].right = right_idx;

        current_idx as i32
    }

    /// Best split over a random subset of features.
    ///
    /// Features are visited in shuffled order; constant features do not count
    /// toward `max_features`, so a node only becomes a leaf for lack of splits
    /// when every feature is constant or violates `min_samples_leaf`.
    fn find_best_split(
        &self,
        indices: &[usize],
        node_id: usize,
        rng: &mut LcgRng,
    ) -> Option<SplitCandidate> {
        let mut order: Vec<usize> = (0..FEATURE_COUNT).collect();
        rng.shuffle(&mut order);

        let mut best: Option<SplitCandidate> = None;
        let mut examined = 0usize;

        for feature_idx in order {
            if examined >= self.config.max_features && best.is_some() {
                break;
            }

            let mut sorted: Vec<usize> = indices.to_vec();
            sorted.sort_by_key(|&i| self.rows[i][feature_idx]);

            let first = self.rows[sorted[0]][feature_idx];
            let last = self.rows[sorted[sorted.len() - 1]][feature_idx];
            if first == last {
                continue;
            }
            examined += 1;

            if let Some(candidate) = self.best_threshold(&sorted, feature_idx, node_id) {
                if best.as_ref().map_or(true, |current| candidate.beats(current)) {
                    best = Some(candidate);
                }
            }
        }

        best
    }

    /// Sweep one feature (indices pre-sorted by it) for its best threshold
    fn best_threshold(
        &self,
        sorted: &[usize],
        feature_idx: usize,
        node_id: usize,
    ) -> Option<SplitCandidate> {
        let n = sorted.len();
        let min_leaf = self.config.min_samples_leaf.max(1);

        let mut left_counts = vec![0u128; self.n_classes];
        let mut right_counts = vec![0u128; self.n_classes];
        for &i in sorted {
            right_counts[self.labels[i] as usize] += 1;
        }

        let mut best: Option<SplitCandidate> = None;

        for pos in 0..n - 1 {
            let class = self.labels[sorted[pos]] as usize;
            left_counts[class] += 1;
            right_counts[class] -= 1;

            let value = self.rows[sorted[pos]][feature_idx];
            let next = self.rows[sorted[pos + 1]][feature_idx];
            if value == next {
                continue;
            }

            let n_left = pos + 1;
            let n_right = n - n_left;
            if n_left < min_leaf || n_right < min_leaf {
                continue;
            }

            // value <= threshold < next
            // i128 keeps far-apart neighbours from overflowing
            let threshold =
                (i128::from(value) + (i128::from(next) - i128::from(value)) / 2) as i64;
            let score = SplitScore::new(
                sum_of_squares(&left_counts),
                n_left as u128,
                sum_of_squares(&right_counts),
                n_right as u128,
            );
            let candidate = SplitCandidate {
                feature_idx,
                threshold,
                score,
                tie_breaker: SplitTieBreaker::new(feature_idx, threshold, node_id),
            };

            if best.as_ref().map_or(true, |current| candidate.beats(current)) {
                best = Some(candidate);
            }
        }

        best
    }

    /// Split samples based on threshold
    fn split_samples(
        &self,
        indices: &[usize],
        feature_idx: usize,
        threshold: i64,
    ) -> (Vec<usize>, Vec<usize>) {
        indices
            .iter()
            .partition(|&&idx| self.rows[idx][feature_idx] <= threshold)
    }

    fn class_counts(&self, indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for &idx in indices {
            counts[self.labels[idx] as usize] += 1;
        }
        counts
    }
}

fn sum_of_squares(counts: &[u128]) -> u128 {
    counts.iter().map(|&c| c * c).sum()
}

/// Most frequent class; ties go to the lowest code
fn majority_class(counts: &[usize]) -> u32 {
    let mut best = 0usize;
    for (class, &count) in counts.iter().enumerate() {
        if count > counts[best] {
            best = class;
        }
    }
    best as u32
}
