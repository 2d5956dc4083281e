// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Node signals: a timed mapping bound to a network.
//!
//! A [`Signal`] associates, for every point in time, a mapping from the
//! nodes of one network to values. Generators write it while replaying an
//! event stream; afterwards it is a read-only record that can be queried
//! at any historical instant, flattened into per-node time series, or
//! round-tripped through the compact [`UpdateTriples`] artifact.

use std::collections::BTreeMap;
use std::sync::Arc;

use spoor_graph::{Graph, NodeId};

use crate::error::SignalError;
use crate::timed::{TimedMap, TimedView};

/// View of a signal at one instant: node → value.
pub type SignalView<'a, V> = TimedView<'a, NodeId, V>;

/// A time-varying mapping from the nodes of a network to values.
#[derive(Debug, Clone)]
pub struct Signal<V> {
    network: Arc<Graph>,
    name: Option<String>,
    map: TimedMap<NodeId, V>,
}

impl<V> Signal<V>
where
    V: Clone + PartialEq,
{
    /// Creates an empty signal over `network`.
    #[must_use]
    pub fn new(network: Arc<Graph>) -> Self {
        Self {
            network,
            name: None,
            map: TimedMap::new(),
        }
    }

    /// Creates an empty named signal over `network`.
    #[must_use]
    pub fn named(network: Arc<Graph>, name: impl Into<String>) -> Self {
        Self {
            network,
            name: Some(name.into()),
            map: TimedMap::new(),
        }
    }

    /// The signal's name, if it has one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The network this signal is defined over. Set at construction,
    /// immutable afterwards.
    #[must_use]
    pub fn network(&self) -> &Arc<Graph> {
        &self.network
    }

    /// Records `value` for `node` from `time` on.
    ///
    /// Writing the value already current at `time` adds no transition.
    pub fn set(&mut self, node: NodeId, time: f64, value: V) {
        self.map.set(node, time, value);
    }

    /// Value of `node` at `time`, or `None` when the node carries no value
    /// at that instant.
    #[must_use]
    pub fn get(&self, node: NodeId, time: f64) -> Option<&V> {
        self.map.get(node, time)
    }

    /// Projects the signal at `time` for dense reads.
    #[must_use]
    pub fn at(&self, time: f64) -> SignalView<'_, V> {
        self.map.at(time)
    }

    /// Sorted distinct times at which the signal changed.
    #[must_use]
    pub fn transitions(&self) -> Vec<f64> {
        self.map.updates()
    }

    /// Number of distinct transition times.
    #[must_use]
    pub fn transition_count(&self) -> usize {
        self.map.transition_count()
    }

    /// Returns `true` when the signal holds no values at any time.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl<V> Signal<V>
where
    V: Clone + PartialOrd + PartialEq,
{
    /// Minimum and maximum over all ever-retrievable values.
    ///
    /// # Errors
    ///
    /// [`SignalError::EmptySignal`] when no value was ever recorded.
    pub fn value_bounds(&self) -> Result<(V, V), SignalError> {
        let values = self.map.values_at_some_time();
        let mut iter = values.into_iter();
        let first = iter.next().ok_or(SignalError::EmptySignal)?;
        let (mut lo, mut hi) = (first, first);
        for v in iter {
            if v < lo {
                lo = v;
            }
            if v > hi {
                hi = v;
            }
        }
        Ok((lo.clone(), hi.clone()))
    }
}

impl<V> Signal<V>
where
    V: Clone + PartialEq,
{
    /// Per-node value sequences sampled at every transition time.
    ///
    /// Row order is ascending node id; one column per entry of
    /// [`Signal::transitions`], `None` where the node carries no value at
    /// that instant.
    #[must_use]
    pub fn to_time_series(&self) -> BTreeMap<NodeId, Vec<Option<V>>> {
        let times = self.transitions();
        let mut series: BTreeMap<NodeId, Vec<Option<V>>> = self
            .network
            .nodes()
            .map(|n| (n, Vec::with_capacity(times.len())))
            .collect();
        for &t in &times {
            let view = self.at(t);
            for (node, row) in &mut series {
                row.push(view.get(*node).cloned());
            }
        }
        series
    }

    /// Flattens the signal into three parallel change columns.
    ///
    /// Rows are ordered by non-decreasing time; rows at equal times keep
    /// ascending node order (and, within one node, write order). Reloading
    /// with [`Signal::from_update_triples`] reproduces the original query
    /// results at every transition time.
    #[must_use]
    pub fn to_update_triples(&self) -> UpdateTriples<V> {
        let mut keys: Vec<NodeId> = self.map.keys_at_some_time().collect();
        keys.sort_unstable();
        let mut rows: Vec<(f64, NodeId, Option<V>)> = Vec::new();
        for node in keys {
            for (time, value) in self.map.history(node) {
                rows.push((time, node, value.cloned()));
            }
        }
        // Stable: preserves node order at equal times and per-node write order.
        rows.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut triples = UpdateTriples::with_capacity(rows.len());
        for (time, node, value) in rows {
            triples.times.push(time);
            triples.nodes.push(node);
            triples.values.push(value);
        }
        triples
    }

    /// Reconstructs a signal from an [`UpdateTriples`] artifact.
    ///
    /// # Errors
    ///
    /// - [`SignalError::MismatchedColumns`] when the columns disagree in
    ///   length.
    /// - [`SignalError::NonFiniteTime`] / [`SignalError::OutOfOrder`] on a
    ///   malformed time column.
    /// - [`SignalError::UnknownNode`] when a row names a node outside
    ///   `network`.
    pub fn from_update_triples(
        network: Arc<Graph>,
        triples: UpdateTriples<V>,
    ) -> Result<Self, SignalError> {
        if triples.times.len() != triples.nodes.len()
            || triples.times.len() != triples.values.len()
        {
            return Err(SignalError::MismatchedColumns {
                times: triples.times.len(),
                nodes: triples.nodes.len(),
                values: triples.values.len(),
            });
        }
        let mut prev: Option<f64> = None;
        for &t in &triples.times {
            if !t.is_finite() {
                return Err(SignalError::NonFiniteTime(t));
            }
            if let Some(p) = prev {
                if t < p {
                    return Err(SignalError::OutOfOrder { prev: p, next: t });
                }
            }
            prev = Some(t);
        }
        for &n in &triples.nodes {
            if !network.contains(n) {
                return Err(SignalError::UnknownNode(n));
            }
        }

        let mut signal = Self::new(network);
        for ((time, node), value) in triples
            .times
            .into_iter()
            .zip(triples.nodes)
            .zip(triples.values)
        {
            match value {
                Some(v) => signal.map.set(node, time, v),
                None => signal.map.delete(node, time),
            }
        }
        Ok(signal)
    }
}

/// Three parallel change columns describing a signal compactly.
///
/// One row per recorded change: `(times[i], nodes[i], values[i])`, where a
/// `None` value records the node becoming absent at that instant.
/// Generated signals never delete, so their artifacts are fully dense.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UpdateTriples<V> {
    /// Change times, non-decreasing.
    pub times: Vec<f64>,
    /// Changed node per row.
    pub nodes: Vec<NodeId>,
    /// New value per row; `None` records a deletion.
    pub values: Vec<Option<V>>,
}

impl<V> UpdateTriples<V> {
    /// Creates empty columns with room for `rows` entries.
    #[must_use]
    pub fn with_capacity(rows: usize) -> Self {
        Self {
            times: Vec::with_capacity(rows),
            nodes: Vec::with_capacity(rows),
            values: Vec::with_capacity(rows),
        }
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Returns `true` when no rows are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}
