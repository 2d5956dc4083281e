// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Time-indexed associative store backed by per-key diff lists.
//!
//! [`TimedMap`] records every write with a timestamp and answers "what was
//! the value of key K at time T?" for arbitrary T, forwards or backwards,
//! without keeping a dense snapshot per instant. Each key owns a sorted
//! list of diffs; a point query is a binary search, and a [`TimedView`]
//! projects the whole map at one time for O(1) amortized repeated lookups.
//!
//! Invariants
//! - Per-key diff lists are sorted ascending by time.
//! - No two consecutive entries repeat the same operation (a set of the
//!   value already current, or a delete while already absent, is dropped
//!   before it reaches the list). Rewrites at an existing instant collapse
//!   neighbours that become redundant.
//! - Times are finite. The store is append-mostly: it only shrinks through
//!   [`TimedMap::clear`] or redundancy collapse.

use std::hash::Hash;

use rustc_hash::FxHashMap;

/// A single timestamped operation on one key.
#[derive(Debug, Clone, PartialEq)]
enum DiffOp<V> {
    /// The key holds `V` from this instant on.
    Set(V),
    /// The key is absent from this instant on.
    Delete,
}

#[derive(Debug, Clone)]
struct Diff<V> {
    time: f64,
    op: DiffOp<V>,
}

/// Key → value store where every write is stamped with a time.
///
/// Optimised for "sparse in time, dense in space" access: a simulation
/// touches a handful of keys per event, while consumers later read many
/// keys at a single query time (see [`TimedMap::at`]).
#[derive(Debug, Clone, Default)]
pub struct TimedMap<K, V> {
    diffs: FxHashMap<K, Vec<Diff<V>>>,
}

impl<K, V> TimedMap<K, V>
where
    K: Copy + Eq + Hash,
    V: Clone + PartialEq,
{
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            diffs: FxHashMap::default(),
        }
    }

    /// Index of the latest entry with time ≤ `time`, if any.
    fn update_before(list: &[Diff<V>], time: f64) -> Option<usize> {
        let idx = list.partition_point(|d| d.time <= time);
        idx.checked_sub(1)
    }

    /// Records `value` as current for `key` from `time` on.
    ///
    /// Re-setting the value already current at `time` is a no-op, so diff
    /// lists stay minimal. Writing at the exact instant of an existing set
    /// rewrites that entry in place instead of appending a new one.
    pub fn set(&mut self, key: K, time: f64, value: V) {
        debug_assert!(time.is_finite(), "diff times must be finite");
        let list = self.diffs.entry(key).or_default();
        let idx = list.partition_point(|d| d.time <= time);
        if let Some(prev_idx) = idx.checked_sub(1) {
            if list[prev_idx].time == time {
                if matches!(list[prev_idx].op, DiffOp::Set(_)) {
                    list[prev_idx].op = DiffOp::Set(value);
                    Self::collapse_around(list, prev_idx);
                    return;
                }
                // Latest entry at this instant is a delete: the set lands
                // after it, re-establishing the key within the instant.
            } else if let DiffOp::Set(current) = &list[prev_idx].op {
                if *current == value {
                    return;
                }
            }
        }
        list.insert(
            idx,
            Diff {
                time,
                op: DiffOp::Set(value),
            },
        );
        // A backfilled write can make the following entry redundant.
        Self::collapse_around(list, idx);
        debug_assert!(Self::is_sorted(list), "diff list ordering corrupted");
    }

    /// Records `key` as absent from `time` on.
    ///
    /// Silent no-op when the key has no value at `time`, including keys
    /// that were never set at all.
    pub fn delete(&mut self, key: K, time: f64) {
        debug_assert!(time.is_finite(), "diff times must be finite");
        let Some(list) = self.diffs.get_mut(&key) else {
            return;
        };
        let idx = list.partition_point(|d| d.time <= time);
        let Some(prev_idx) = idx.checked_sub(1) else {
            return;
        };
        if matches!(list[prev_idx].op, DiffOp::Delete) {
            return;
        }
        list.insert(
            idx,
            Diff {
                time,
                op: DiffOp::Delete,
            },
        );
        Self::collapse_around(list, idx);
        debug_assert!(Self::is_sorted(list), "diff list ordering corrupted");
    }

    /// Value of `key` at `time`, or `None` when absent at that instant.
    #[must_use]
    pub fn get(&self, key: K, time: f64) -> Option<&V> {
        let list = self.diffs.get(&key)?;
        let idx = Self::update_before(list, time)?;
        match &list[idx].op {
            DiffOp::Set(v) => Some(v),
            DiffOp::Delete => None,
        }
    }

    /// Projects the whole map at `time`.
    ///
    /// Costs O(keys · log history) once; lookups through the view are then
    /// O(1) amortized, which is the intended access pattern for consumers
    /// reading many keys at one instant.
    #[must_use]
    pub fn at(&self, time: f64) -> TimedView<'_, K, V> {
        let mut projected = FxHashMap::default();
        for (key, list) in &self.diffs {
            if let Some(idx) = Self::update_before(list, time) {
                if matches!(list[idx].op, DiffOp::Set(_)) {
                    projected.insert(*key, idx);
                }
            }
        }
        TimedView {
            diffs: &self.diffs,
            time,
            projected,
        }
    }

    /// Sorted distinct times at which any key changed.
    ///
    /// The map can be queried at any time, not just these; between two
    /// adjacent update times the projection is guaranteed constant.
    #[must_use]
    pub fn updates(&self) -> Vec<f64> {
        let mut times: Vec<f64> = self
            .diffs
            .values()
            .flat_map(|list| list.iter().map(|d| d.time))
            .collect();
        times.sort_unstable_by(f64::total_cmp);
        times.dedup();
        times
    }

    /// Number of distinct transition times.
    #[must_use]
    pub fn transition_count(&self) -> usize {
        self.updates().len()
    }

    /// Keys that hold a value at some time.
    pub fn keys_at_some_time(&self) -> impl Iterator<Item = K> + '_ {
        self.diffs.keys().copied()
    }

    /// Distinct values retrievable at some query time.
    ///
    /// A value overwritten in place within the same instant never became
    /// observable and is excluded.
    #[must_use]
    pub fn values_at_some_time(&self) -> Vec<&V> {
        let mut values: Vec<&V> = Vec::new();
        for list in self.diffs.values() {
            for diff in list {
                if let DiffOp::Set(v) = &diff.op {
                    if !values.contains(&v) {
                        values.push(v);
                    }
                }
            }
        }
        values
    }

    /// Per-key diff rows in list order, as (time, value-or-deletion) pairs.
    ///
    /// Deletions surface as `None`. Used to flatten the store into an
    /// update-triple artifact.
    pub(crate) fn history(&self, key: K) -> impl Iterator<Item = (f64, Option<&V>)> + '_ {
        self.diffs
            .get(&key)
            .into_iter()
            .flatten()
            .map(|d| match &d.op {
                DiffOp::Set(v) => (d.time, Some(v)),
                DiffOp::Delete => (d.time, None),
            })
    }

    /// Returns `true` when no write was ever recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diffs.is_empty()
    }

    /// Explicit reset: drops all history.
    pub fn clear(&mut self) {
        self.diffs.clear();
    }

    /// Drops neighbours of the rewritten entry at `i` that no longer
    /// change the projection at any time.
    fn collapse_around(list: &mut Vec<Diff<V>>, i: usize) {
        if let Some(next) = list.get(i + 1) {
            if next.op == list[i].op {
                list.remove(i + 1);
            }
        }
        if i > 0 && list[i - 1].op == list[i].op {
            list.remove(i);
        }
    }

    fn is_sorted(list: &[Diff<V>]) -> bool {
        list.windows(2).all(|w| w[0].time <= w[1].time)
    }
}

/// Read-only projection of a [`TimedMap`] at one instant.
///
/// Borrows the diff lists; constructing a view copies nothing but the
/// per-key index of the applicable diff.
#[derive(Debug)]
pub struct TimedView<'a, K, V> {
    diffs: &'a FxHashMap<K, Vec<Diff<V>>>,
    time: f64,
    projected: FxHashMap<K, usize>,
}

impl<K, V> TimedView<'_, K, V>
where
    K: Copy + Eq + Hash,
    V: Clone + PartialEq,
{
    /// The instant this view projects.
    #[must_use]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Value of `key` at the view's instant.
    #[must_use]
    pub fn get(&self, key: K) -> Option<&V> {
        let idx = *self.projected.get(&key)?;
        match &self.diffs[&key][idx].op {
            DiffOp::Set(v) => Some(v),
            DiffOp::Delete => None,
        }
    }

    /// Returns `true` when `key` holds a value at the view's instant.
    #[must_use]
    pub fn contains(&self, key: K) -> bool {
        self.projected.contains_key(&key)
    }

    /// Keys present at the view's instant.
    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.projected.keys().copied()
    }

    /// (key, value) pairs present at the view's instant.
    pub fn iter(&self) -> impl Iterator<Item = (K, &V)> + '_ {
        self.projected.iter().filter_map(|(key, &idx)| {
            match &self.diffs[key][idx].op {
                DiffOp::Set(v) => Some((*key, v)),
                DiffOp::Delete => None,
            }
        })
    }

    /// Number of keys present at the view's instant.
    #[must_use]
    pub fn len(&self) -> usize {
        self.projected.len()
    }

    /// Returns `true` when no key is present at the view's instant.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.projected.is_empty()
    }

    /// Materialises the projection as an owned map.
    #[must_use]
    pub fn to_map(&self) -> FxHashMap<K, V> {
        self.iter().map(|(k, v)| (k, v.clone())).collect()
    }
}
