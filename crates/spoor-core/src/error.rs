// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Error taxonomy for signal construction and queries.
//!
//! Three classes, never mixed:
//! - precondition violations: the caller handed us an input the contract
//!   forbids (bad seed state, malformed event stream, wrong source
//!   compartment). Not recoverable; the replay aborts.
//! - invariant violations: internal index desync (a distance shrank where
//!   monotonic growth is required). These signal a bug, never a bad input,
//!   and are never silently corrected.
//! - query shape errors: asking an empty signal for bounds, or loading a
//!   triple artifact whose columns disagree.
//!
//! Missing keys at a query time are *not* errors; they are `None` from
//! the lookup APIs. Unreachable nodes are sentinel values, not errors.

use spoor_graph::NodeId;
use thiserror::Error;

/// Error raised while generating or querying a signal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SignalError {
    /// The initial compartment state contained removed nodes.
    #[error("initial network contains removed nodes")]
    RemovedAtStart,
    /// The event stream did not begin with an infection.
    #[error("first event must be an infection, saw {0:?}")]
    FirstEventNotInfection(crate::event::EventKind),
    /// Timestamps went backwards in an event stream or triple artifact.
    #[error("times must be non-decreasing, saw {prev} then {next}")]
    OutOfOrder {
        /// The earlier timestamp.
        prev: f64,
        /// The offending (smaller) later timestamp.
        next: f64,
    },
    /// A NaN or infinite timestamp.
    #[error("time {0} is not finite")]
    NonFiniteTime(f64),
    /// An event referenced a node outside the signal's network.
    #[error("node {0} is not in the network")]
    UnknownNode(NodeId),
    /// An infection event named a node that is not susceptible.
    #[error("cannot infect node {0}: not susceptible")]
    NotSusceptible(NodeId),
    /// A removal event named a node that is not infected.
    #[error("cannot remove node {0}: not infected")]
    NotInfected(NodeId),
    /// A recomputed distance got smaller after a removal.
    ///
    /// Losing an infection source can only grow distances; shrinkage means
    /// the boundary index has desynchronized from the true shortest-path
    /// structure.
    #[error("distance at node {node} shrank after removal: signal {before} -> {after}")]
    DistanceShrank {
        /// Node whose distance shrank.
        node: NodeId,
        /// Signal value recorded before the recomputation.
        before: i64,
        /// Signal value the recomputation produced.
        after: i64,
    },
    /// Bounds were requested from a signal that has no values.
    #[error("signal has no values")]
    EmptySignal,
    /// An update-triple artifact has columns of different lengths.
    #[error("update triples have mismatched columns: {times} times, {nodes} nodes, {values} values")]
    MismatchedColumns {
        /// Length of the time column.
        times: usize,
        /// Length of the node column.
        nodes: usize,
        /// Length of the value column.
        values: usize,
    },
}
