//! Superposition, entanglement and tokens.
//!
//! A quantum tile holds two candidate resources and a distribution weight
//! (the probability of the first candidate). Quantum tiles always come in
//! entangled pairs that share their candidates and a group id. The weights of
//! a pair sit on a discrete ladder: `(k-1)/k` for the favored tile and `1/k`
//! for its partner, starting from `1/2` each.
//!
//! This module holds the pure parts of the model. The game session in
//! [`crate::game`] decides when to collapse or interfere and updates tiles
//! and players accordingly.

use crate::board::{PlayerId, Resource};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Weight of both tiles of a freshly entangled pair
pub const INITIAL_WEIGHT: f64 = 0.5;

/// A tile at or above this weight draws from the list favoring candidate A
const FAVOR_THRESHOLD: f64 = 0.49;

/// Entanglement group identifier (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub u8);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Pool of unused group ids.
///
/// Ids are handed out lowest-first and returned when their pair collapses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupPool {
    capacity: u8,
    free: BTreeSet<GroupId>,
}

impl GroupPool {
    /// A pool holding ids `1..=capacity`
    pub fn new(capacity: u8) -> Self {
        Self {
            capacity,
            free: (1..=capacity).map(GroupId).collect(),
        }
    }

    /// Take the lowest unused id
    pub fn allocate(&mut self) -> Option<GroupId> {
        self.free.pop_first()
    }

    /// Return an id to the pool. Ids outside the pool's range are ignored.
    pub fn release(&mut self, id: GroupId) {
        if (1..=self.capacity).contains(&id.0) {
            self.free.insert(id);
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.free.is_empty()
    }

    pub fn available(&self) -> usize {
        self.free.len()
    }

    pub fn in_use(&self) -> usize {
        self.capacity as usize - self.free.len()
    }

    pub fn capacity(&self) -> u8 {
        self.capacity
    }

    pub fn is_free(&self, id: GroupId) -> bool {
        self.free.contains(&id)
    }
}

/// Quantum state of a tile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Superposition {
    /// The two resources this tile may become
    pub candidates: [Resource; 2],
    /// Probability weight toward `candidates[0]`
    pub weight: f64,
    /// The pair this tile belongs to
    pub group: GroupId,
}

impl Superposition {
    /// State of a freshly entangled tile
    pub fn entangled(candidates: [Resource; 2], group: GroupId) -> Self {
        Self {
            candidates,
            weight: INITIAL_WEIGHT,
            group,
        }
    }

    /// Whether this tile leans toward `candidates[0]` when collapsing
    pub fn favors_first(&self) -> bool {
        self.weight >= FAVOR_THRESHOLD
    }
}

/// An unresolved resource claim held by a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Group whose collapse resolves this token
    pub group: GroupId,
    /// Tile the token was minted from; it pays whatever that tile becomes
    pub origin_tile: usize,
    /// What the token may become
    pub candidates: [Resource; 2],
}

/// A token converted into a concrete resource by a collapse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConversion {
    pub player: PlayerId,
    pub origin_tile: usize,
    pub resource: Resource,
}

/// Skew factor `k = round(1 / min(w0, w1))` of a pair
pub fn skew_factor(w0: f64, w1: f64) -> u32 {
    let lesser = w0.min(w1);
    if lesser <= 0.0 {
        return 2;
    }
    ((1.0 / lesser).round() as u32).max(2)
}

/// Candidate list for one side of the pair: the favored candidate `k-1`
/// times, the other once.
fn weighted_list(favored: Resource, other: Resource, k: u32) -> Vec<Resource> {
    let mut list = vec![favored; (k - 1) as usize];
    list.push(other);
    list
}

/// Resolve an entangled pair to two distinct concrete resources.
///
/// `weights` are the distribution weights of the two tiles in resolution
/// order. The first tile draws from the list matching the side it favors;
/// the second draws from what is left of both lists, excluding the first
/// tile's result.
pub fn collapse_pair<R: Rng + ?Sized>(
    candidates: [Resource; 2],
    weights: [f64; 2],
    rng: &mut R,
) -> [Resource; 2] {
    let [a, b] = candidates;
    let k = skew_factor(weights[0], weights[1]);

    let mut greater = weighted_list(a, b, k);
    let mut lesser = weighted_list(b, a, k);
    greater.shuffle(rng);
    lesser.shuffle(rng);

    let first_list = if weights[0] >= FAVOR_THRESHOLD {
        &mut greater
    } else {
        &mut lesser
    };
    let pick = rng.gen_range(0..first_list.len());
    let first = first_list.swap_remove(pick);

    let remaining: Vec<Resource> = greater
        .iter()
        .chain(lesser.iter())
        .copied()
        .filter(|r| *r != first)
        .collect();
    let second = match remaining.choose(rng) {
        Some(resource) => *resource,
        None if first == a => b,
        None => a,
    };

    [first, second]
}

/// New weights after interfering with a pair.
///
/// `target` is the weight of the tile being pushed up, `partner` the weight
/// of its sibling. Returns `(target, partner)` after one step on the ladder.
pub fn interfere(target: f64, partner: f64) -> (f64, f64) {
    let lesser = target.min(partner);
    let probnum = (1.0 / lesser).round();
    let target_is_min = target < partner;

    if probnum == 2.0 || !target_is_min {
        (probnum / (probnum + 1.0), 1.0 / (probnum + 1.0))
    } else {
        (1.0 / (probnum - 1.0), (probnum - 2.0) / (probnum - 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_group_pool_hands_out_lowest_first() {
        let mut pool = GroupPool::new(3);
        assert_eq!(pool.allocate(), Some(GroupId(1)));
        assert_eq!(pool.allocate(), Some(GroupId(2)));
        pool.release(GroupId(1));
        assert_eq!(pool.allocate(), Some(GroupId(1)));
        assert_eq!(pool.allocate(), Some(GroupId(3)));
        assert!(pool.is_exhausted());
        assert_eq!(pool.allocate(), None);
        assert_eq!(pool.in_use(), 3);
    }

    #[test]
    fn test_group_pool_ignores_foreign_ids() {
        let mut pool = GroupPool::new(2);
        pool.release(GroupId(9));
        assert_eq!(pool.available(), 2);
        assert!(!pool.is_free(GroupId(9)));
    }

    #[test]
    fn test_interference_from_fresh_pair() {
        let (up, down) = interfere(0.5, 0.5);
        assert!((up - 2.0 / 3.0).abs() < EPS);
        assert!((down - 1.0 / 3.0).abs() < EPS);

        let (up, down) = interfere(up, down);
        assert!((up - 0.75).abs() < EPS);
        assert!((down - 0.25).abs() < EPS);
    }

    #[test]
    fn test_interference_on_lesser_side_steps_back() {
        // Pushing the 0.25 tile of a (0.75, 0.25) pair
        let (up, down) = interfere(0.25, 0.75);
        assert!((up - 1.0 / 3.0).abs() < EPS);
        assert!((down - 2.0 / 3.0).abs() < EPS);

        let (up, down) = interfere(up, down);
        assert!((up - 0.5).abs() < EPS);
        assert!((down - 0.5).abs() < EPS);
    }

    #[test]
    fn test_interference_is_monotonic_for_the_pushed_side() {
        let (mut target, mut partner) = (0.5, 0.5);
        for _ in 0..20 {
            let (t, p) = interfere(target, partner);
            assert!(t >= target - EPS);
            assert!(p <= partner + EPS);
            target = t;
            partner = p;
        }
        assert!(target > 0.95);
    }

    #[test]
    fn test_skew_factor() {
        assert_eq!(skew_factor(0.5, 0.5), 2);
        assert_eq!(skew_factor(2.0 / 3.0, 1.0 / 3.0), 3);
        assert_eq!(skew_factor(0.25, 0.75), 4);
    }

    #[test]
    fn test_collapse_never_repeats_a_resource() {
        let mut rng = StdRng::seed_from_u64(7);
        let candidates = [Resource::Ore, Resource::Wool];
        for weights in [[0.5, 0.5], [0.75, 0.25], [0.2, 0.8], [0.9, 0.1]] {
            for _ in 0..200 {
                let [first, second] = collapse_pair(candidates, weights, &mut rng);
                assert_ne!(first, second);
                assert!(candidates.contains(&first));
                assert!(candidates.contains(&second));
            }
        }
    }

    #[test]
    fn test_collapse_follows_weights() {
        let mut rng = StdRng::seed_from_u64(42);
        let candidates = [Resource::Brick, Resource::Grain];
        let trials = 4000;
        let firsts = (0..trials)
            .filter(|_| collapse_pair(candidates, [0.75, 0.25], &mut rng)[0] == Resource::Brick)
            .count();
        let ratio = firsts as f64 / trials as f64;
        assert!((ratio - 0.75).abs() < 0.05, "ratio was {ratio}");

        let firsts = (0..trials)
            .filter(|_| collapse_pair(candidates, [0.25, 0.75], &mut rng)[0] == Resource::Brick)
            .count();
        let ratio = firsts as f64 / trials as f64;
        assert!((ratio - 0.25).abs() < 0.05, "ratio was {ratio}");
    }

    #[test]
    fn test_fresh_superposition() {
        let state = Superposition::entangled([Resource::Lumber, Resource::Ore], GroupId(4));
        assert_eq!(state.weight, INITIAL_WEIGHT);
        assert!(state.favors_first());
        assert_eq!(state.group.to_string(), "#4");
    }
}
