// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Incremental progress signal for SIR epidemics.
//!
//! The progress signal folds the whole dynamics of an epidemic into one
//! per-node scalar. At time t the value is:
//!
//! - 0 on infected nodes;
//! - on susceptible nodes, the length of the shortest path to an infected
//!   node traversing only susceptible nodes;
//! - on removed nodes, zero minus the length of the shortest path to an
//!   infected node traversing susceptible or removed nodes.
//!
//! Nodes with no reachable infected node under the relevant restriction
//! carry the ±(order + 1) sentinel: a valid value, not an error.
//!
//! Maintenance is incremental. A boundary map records, for every non-
//! infected node, its currently-nearest infected node; two coboundary
//! maps invert it (susceptible and removed footprints tracked
//! separately). An infection relaxes outward from the new source and
//! stops wherever it cannot improve a distance, so work is bounded by the
//! affected region. A removal re-examines exactly the nodes whose
//! boundary pointed at the dying source, via fresh bounded searches.
//!
//! Losing a source can only grow distances. A recomputed distance that
//! shrinks means the boundary index has desynchronized from the true
//! shortest-path structure; that is reported as a fatal
//! [`SignalError::DistanceShrank`], never silently corrected.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use spoor_graph::{Graph, NodeId};
use tracing::{debug, trace};

use crate::compartment::{Compartment, CompartmentSource};
use crate::error::SignalError;
use crate::event::{Element, Event, EventDispatch, EventKind};
use crate::generator::SignalGenerator;
use crate::replay::replay;
use crate::signal::Signal;

/// Which nodes a bounded search may traverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PathClass {
    /// Only susceptible intermediates (susceptible-node distances).
    SusceptibleOnly,
    /// Susceptible or removed intermediates (removed-node distances).
    SusceptibleOrRemoved,
}

/// Incremental generator for the SIR progress signal.
#[derive(Debug)]
pub struct ProgressSignalGenerator {
    signal: Signal<i64>,
    network: Arc<Graph>,
    /// Strictly greater than any attainable finite path length.
    infinity: i64,
    compartment: Vec<Compartment>,
    /// Current signal value per node, mirrored into the timed store on
    /// every write.
    level: Vec<i64>,
    removed_count: usize,
    /// node (S or R) → its currently-nearest infected node.
    boundary: FxHashMap<NodeId, NodeId>,
    /// infected node → susceptible nodes whose boundary it is.
    coboundary_s: FxHashMap<NodeId, FxHashSet<NodeId>>,
    /// infected node → removed nodes whose boundary it is.
    coboundary_r: FxHashMap<NodeId, FxHashSet<NodeId>>,
}

impl ProgressSignalGenerator {
    /// Creates a generator writing into `signal`, with initial
    /// compartments taken from `source`.
    #[must_use]
    pub fn new(signal: Signal<i64>, source: &impl CompartmentSource) -> Self {
        let network = Arc::clone(signal.network());
        let order = network.order();
        let compartment: Vec<Compartment> =
            network.nodes().map(|n| source.compartment(n)).collect();
        let removed_count = compartment
            .iter()
            .filter(|&&c| c == Compartment::Removed)
            .count();
        Self {
            signal,
            network,
            infinity: order as i64 + 1,
            compartment,
            level: vec![0; order],
            removed_count,
            boundary: FxHashMap::default(),
            coboundary_s: FxHashMap::default(),
            coboundary_r: FxHashMap::default(),
        }
    }

    /// Builds the progress signal for a recorded epidemic in one call:
    /// construct, replay the whole stream, return the finished signal.
    ///
    /// # Errors
    ///
    /// Any stream precondition or engine invariant failure aborts the
    /// replay (see [`SignalError`]).
    pub fn build(
        network: Arc<Graph>,
        source: &impl CompartmentSource,
        events: &[Event],
    ) -> Result<Signal<i64>, SignalError> {
        let mut generator = Self::new(Signal::new(network), source);
        replay(&mut generator, events)?;
        Ok(generator.into_signal())
    }

    /// The signal built so far.
    #[must_use]
    pub fn signal(&self) -> &Signal<i64> {
        &self.signal
    }

    /// Consumes the generator, yielding the finished signal.
    #[must_use]
    pub fn into_signal(self) -> Signal<i64> {
        self.signal
    }

    /// The unreachable sentinel: `order + 1`, strictly greater than any
    /// finite path length in the network.
    #[must_use]
    pub fn infinity(&self) -> i64 {
        self.infinity
    }

    /// Writes `value` for `node` at `time`, through the level cache into
    /// the timed store.
    fn write(&mut self, time: f64, node: NodeId, value: i64) {
        self.level[node as usize] = value;
        self.signal.set(node, time, value);
    }

    fn compartment_of(&self, node: NodeId) -> Result<Compartment, SignalError> {
        self.compartment
            .get(node as usize)
            .copied()
            .ok_or(SignalError::UnknownNode(node))
    }

    /// Points `node`'s boundary at `source`, unlinking it from the old
    /// owner's susceptible coboundary.
    fn reassign_boundary_s(&mut self, node: NodeId, source: NodeId) {
        if let Some(old) = self.boundary.insert(node, source) {
            if old != source {
                let unlinked = self
                    .coboundary_s
                    .get_mut(&old)
                    .is_some_and(|set| set.remove(&node));
                debug_assert!(unlinked, "susceptible coboundary desynced for node {node}");
            }
        }
        self.coboundary_s.entry(source).or_default().insert(node);
    }

    /// Points `node`'s boundary at `source`, unlinking it from the old
    /// owner's removed coboundary.
    fn reassign_boundary_r(&mut self, node: NodeId, source: NodeId) {
        if let Some(old) = self.boundary.insert(node, source) {
            if old != source {
                let unlinked = self
                    .coboundary_r
                    .get_mut(&old)
                    .is_some_and(|set| set.remove(&node));
                debug_assert!(unlinked, "removed coboundary desynced for node {node}");
            }
        }
        self.coboundary_r.entry(source).or_default().insert(node);
    }

    /// Pruned relaxation of susceptible distances from a new source.
    ///
    /// Susceptible-node distances admit only susceptible intermediates, so
    /// the search expands through susceptible nodes exclusively. A branch
    /// whose proposal does not strictly improve the node's current level
    /// is pruned; ties never reassign, so the first owner wins.
    fn relax_susceptible(&mut self, time: f64, source: NodeId) {
        let network = Arc::clone(&self.network);
        let mut frontier = BinaryHeap::new();
        let mut visited: FxHashSet<NodeId> = FxHashSet::default();
        frontier.push(Reverse((0i64, source)));
        while let Some(Reverse((d, n))) = frontier.pop() {
            if !visited.insert(n) {
                continue;
            }
            let proposed = d + 1;
            for &m in network.neighbors(n) {
                if visited.contains(&m) {
                    continue;
                }
                if self.compartment[m as usize] == Compartment::Susceptible {
                    if proposed < self.level[m as usize] {
                        trace!(node = m, distance = proposed, "susceptible level updated");
                        self.write(time, m, proposed);
                        self.reassign_boundary_s(m, source);
                        frontier.push(Reverse((proposed, m)));
                    }
                } else {
                    // Infected and removed nodes never relay susceptible
                    // paths.
                    visited.insert(m);
                }
            }
        }
    }

    /// Pruned relaxation of removed distances from a new source.
    ///
    /// Removed-node distances admit susceptible *or* removed
    /// intermediates, so this pass keeps its own distance labels: a
    /// susceptible node can sit on a mixed path at a smaller distance
    /// than its own susceptible-only level. Pruning against current
    /// levels stays safe either way: any node past a non-improving one
    /// already has a path at least as short through the old owner.
    fn relax_removed(&mut self, time: f64, source: NodeId) {
        let network = Arc::clone(&self.network);
        let mut frontier = BinaryHeap::new();
        let mut dist: FxHashMap<NodeId, i64> = FxHashMap::default();
        dist.insert(source, 0);
        frontier.push(Reverse((0i64, source)));
        while let Some(Reverse((d, n))) = frontier.pop() {
            if dist.get(&n).is_some_and(|&best| d > best) {
                continue;
            }
            let proposed = d + 1;
            for &m in network.neighbors(n) {
                if dist.get(&m).is_some_and(|&dm| proposed >= dm) {
                    continue;
                }
                match self.compartment[m as usize] {
                    Compartment::Infected => {}
                    Compartment::Removed => {
                        if proposed < -self.level[m as usize] {
                            trace!(node = m, distance = proposed, "removed level updated");
                            self.write(time, m, -proposed);
                            self.reassign_boundary_r(m, source);
                            dist.insert(m, proposed);
                            frontier.push(Reverse((proposed, m)));
                        }
                    }
                    Compartment::Susceptible => {
                        if proposed < self.level[m as usize] {
                            dist.insert(m, proposed);
                            frontier.push(Reverse((proposed, m)));
                        }
                    }
                }
            }
        }
    }

    /// Shortest path from `from` to any infected node, traversing only
    /// the compartments `class` allows. Returns the target and the hop
    /// count, or `None` when no infected node is reachable.
    fn nearest_infected(&self, from: NodeId, class: PathClass) -> Option<(NodeId, i64)> {
        let mut frontier = BinaryHeap::new();
        let mut visited: FxHashSet<NodeId> = FxHashSet::default();
        frontier.push(Reverse((0i64, from)));
        while let Some(Reverse((d, n))) = frontier.pop() {
            if !visited.insert(n) {
                continue;
            }
            let next = d + 1;
            for &m in self.network.neighbors(n) {
                if visited.contains(&m) {
                    continue;
                }
                match self.compartment[m as usize] {
                    Compartment::Infected => return Some((m, next)),
                    Compartment::Susceptible => frontier.push(Reverse((next, m))),
                    Compartment::Removed if class == PathClass::SusceptibleOrRemoved => {
                        frontier.push(Reverse((next, m)));
                    }
                    Compartment::Removed => {
                        visited.insert(m);
                    }
                }
            }
        }
        None
    }

    /// Infection handler: `node` leaves S, joins I at level 0, and relaxes
    /// outward.
    fn on_infected(&mut self, time: f64, element: Element) -> Result<(), SignalError> {
        let s = element.subject();
        if self.compartment_of(s)? != Compartment::Susceptible {
            return Err(SignalError::NotSusceptible(s));
        }

        // Unlink s from its old owner's footprint. A susceptible node
        // legitimately has no boundary when no infected node is reachable:
        // before the very first infection, or in a cut-off component.
        if let Some(owner) = self.boundary.remove(&s) {
            let unlinked = self
                .coboundary_s
                .get_mut(&owner)
                .is_some_and(|set| set.remove(&s));
            debug_assert!(unlinked, "susceptible coboundary desynced for node {s}");
        }

        self.compartment[s as usize] = Compartment::Infected;
        self.write(time, s, 0);
        self.coboundary_s.insert(s, FxHashSet::default());
        self.coboundary_r.insert(s, FxHashSet::default());

        debug!(node = s, time, "infection: relaxing distances");
        self.relax_susceptible(time, s);
        if self.removed_count > 0 {
            self.relax_removed(time, s);
        }
        Ok(())
    }

    /// Removal handler: `node` leaves I, and every node that pointed at it
    /// as nearest source is re-examined.
    fn on_removed(&mut self, time: f64, element: Element) -> Result<(), SignalError> {
        let s = element.subject();
        if self.compartment_of(s)? != Compartment::Infected {
            return Err(SignalError::NotInfected(s));
        }
        self.compartment[s as usize] = Compartment::Removed;
        self.removed_count += 1;

        // Susceptible nodes that lost their nearest source.
        let mut dependents: Vec<NodeId> = self
            .coboundary_s
            .remove(&s)
            .unwrap_or_default()
            .into_iter()
            .collect();
        dependents.sort_unstable();
        debug!(
            node = s,
            time,
            susceptible_dependents = dependents.len(),
            "removal: recomputing dependents"
        );
        for q in dependents {
            match self.nearest_infected(q, PathClass::SusceptibleOnly) {
                None => {
                    self.write(time, q, self.infinity);
                    self.boundary.remove(&q);
                }
                Some((target, d)) => {
                    let before = self.level[q as usize];
                    if d < before {
                        return Err(SignalError::DistanceShrank {
                            node: q,
                            before,
                            after: d,
                        });
                    }
                    if d != before {
                        self.write(time, q, d);
                    }
                    self.boundary.insert(q, target);
                    self.coboundary_s.entry(target).or_default().insert(q);
                }
            }
        }

        // The dying source's own distance to the surviving front.
        debug_assert!(!self.boundary.contains_key(&s), "infected node had a boundary");
        match self.nearest_infected(s, PathClass::SusceptibleOrRemoved) {
            None => self.write(time, s, -self.infinity),
            Some((target, d)) => {
                self.write(time, s, -d);
                self.boundary.insert(s, target);
                self.coboundary_r.entry(target).or_default().insert(s);
            }
        }

        // Removed nodes that lost their nearest source.
        let mut dependents: Vec<NodeId> = self
            .coboundary_r
            .remove(&s)
            .unwrap_or_default()
            .into_iter()
            .collect();
        dependents.sort_unstable();
        for q in dependents {
            match self.nearest_infected(q, PathClass::SusceptibleOrRemoved) {
                None => {
                    self.write(time, q, -self.infinity);
                    self.boundary.remove(&q);
                }
                Some((target, d)) => {
                    let before = -self.level[q as usize];
                    if d < before {
                        return Err(SignalError::DistanceShrank {
                            node: q,
                            before: self.level[q as usize],
                            after: -d,
                        });
                    }
                    if d != before {
                        self.write(time, q, -d);
                    }
                    self.boundary.insert(q, target);
                    self.coboundary_r.entry(target).or_default().insert(q);
                }
            }
        }
        Ok(())
    }
}

impl SignalGenerator for ProgressSignalGenerator {
    fn bindings(dispatch: &mut EventDispatch<Self>) {
        dispatch.register(EventKind::Infected, Self::on_infected);
        dispatch.register(EventKind::Removed, Self::on_removed);
    }

    /// Seeds the t=0 signal: +infinity everywhere, 0 at the seed set, and
    /// one pruned relaxation per seed (in ascending node order) to lay
    /// down susceptible distances and the boundary index.
    fn initialize(&mut self) -> Result<(), SignalError> {
        if self.removed_count > 0 {
            return Err(SignalError::RemovedAtStart);
        }
        for n in 0..self.compartment.len() as NodeId {
            self.write(0.0, n, self.infinity);
        }
        let mut seeds: Vec<NodeId> = (0..self.compartment.len() as NodeId)
            .filter(|&n| self.compartment[n as usize] == Compartment::Infected)
            .collect();
        seeds.sort_unstable();
        for &seed in &seeds {
            self.write(0.0, seed, 0);
            self.coboundary_s.insert(seed, FxHashSet::default());
            self.coboundary_r.insert(seed, FxHashSet::default());
        }
        debug!(seeds = seeds.len(), "seeding progress signal");
        for &seed in &seeds {
            self.relax_susceptible(0.0, seed);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compartment::{AllSusceptible, SeedInfected};

    /// 1-2, 1-3, 2-3, 2-4, 3-4, 4-5, 4-6 from the reference scenario,
    /// renumbered to dense ids 0..6.
    fn scenario_graph() -> Arc<Graph> {
        Arc::new(
            Graph::from_edges(
                6,
                &[(0, 1), (0, 2), (1, 2), (1, 3), (2, 3), (3, 4), (3, 5)],
            )
            .unwrap(),
        )
    }

    fn levels(signal: &Signal<i64>, t: f64) -> Vec<i64> {
        signal
            .network()
            .nodes()
            .map(|n| *signal.at(t).get(n).unwrap())
            .collect()
    }

    #[test]
    fn seeding_lays_down_susceptible_distances() {
        let g = scenario_graph();
        let mut generator =
            ProgressSignalGenerator::new(Signal::new(g), &SeedInfected::new([0]));
        generator.initialize().unwrap();
        assert_eq!(levels(generator.signal(), 0.0), vec![0, 1, 1, 2, 3, 3]);
    }

    #[test]
    fn removed_nodes_at_start_are_rejected() {
        let g = scenario_graph();
        let mut map: FxHashMap<NodeId, Compartment> = FxHashMap::default();
        map.insert(0, Compartment::Infected);
        map.insert(5, Compartment::Removed);
        let mut generator = ProgressSignalGenerator::new(Signal::new(g), &map);
        assert_eq!(generator.initialize(), Err(SignalError::RemovedAtStart));
    }

    #[test]
    fn first_infection_without_prior_seed_is_legal() {
        let g = scenario_graph();
        let events = vec![Event::infected(0.0, 0, 0)];
        let signal =
            ProgressSignalGenerator::build(g, &AllSusceptible, &events).unwrap();
        assert_eq!(levels(&signal, 0.0), vec![0, 1, 1, 2, 3, 3]);
    }

    #[test]
    fn unreachable_component_stays_at_infinity() {
        // Two components: a triangle and an isolated pair.
        let g = Arc::new(Graph::from_edges(5, &[(0, 1), (1, 2), (2, 0), (3, 4)]).unwrap());
        let signal = ProgressSignalGenerator::build(
            g,
            &AllSusceptible,
            &[Event::infected(0.0, 0, 0)],
        )
        .unwrap();
        let inf = 6;
        assert_eq!(levels(&signal, 0.0), vec![0, 1, 1, inf, inf]);
    }

    #[test]
    fn infecting_an_unreachable_node_needs_no_boundary() {
        let g = Arc::new(Graph::from_edges(5, &[(0, 1), (1, 2), (2, 0), (3, 4)]).unwrap());
        let events = vec![Event::infected(0.0, 0, 0), Event::infected(1.0, 3, 3)];
        let signal = ProgressSignalGenerator::build(g, &AllSusceptible, &events).unwrap();
        assert_eq!(levels(&signal, 1.0), vec![0, 1, 1, 0, 1]);
    }

    #[test]
    fn infecting_a_non_susceptible_node_fails() {
        let g = scenario_graph();
        let events = vec![Event::infected(0.0, 0, 0), Event::infected(1.0, 0, 1)];
        let err =
            ProgressSignalGenerator::build(g, &AllSusceptible, &events).unwrap_err();
        assert_eq!(err, SignalError::NotSusceptible(0));
    }

    #[test]
    fn removing_a_non_infected_node_fails() {
        let g = scenario_graph();
        let events = vec![Event::infected(0.0, 0, 0), Event::removed(1.0, 4)];
        let err =
            ProgressSignalGenerator::build(g, &AllSusceptible, &events).unwrap_err();
        assert_eq!(err, SignalError::NotInfected(4));
    }

    #[test]
    fn events_on_unknown_nodes_fail() {
        let g = scenario_graph();
        let events = vec![Event::infected(0.0, 42, 0)];
        let err =
            ProgressSignalGenerator::build(g, &AllSusceptible, &events).unwrap_err();
        assert_eq!(err, SignalError::UnknownNode(42));
    }

    #[test]
    fn boundary_and_coboundary_stay_inverse() {
        let g = scenario_graph();
        let mut generator =
            ProgressSignalGenerator::new(Signal::new(g), &SeedInfected::new([0]));
        let events = vec![
            Event::infected(1.0, 2, 0),
            Event::removed(2.0, 0),
            Event::infected(3.0, 3, 2),
        ];
        generator.initialize().unwrap();
        let mut dispatch = EventDispatch::new();
        ProgressSignalGenerator::bindings(&mut dispatch);
        for event in &events {
            dispatch.dispatch(&mut generator, event).unwrap();

            for (&q, &owner) in &generator.boundary {
                let q_compartment = generator.compartment[q as usize];
                let coboundary = match q_compartment {
                    Compartment::Susceptible => &generator.coboundary_s,
                    Compartment::Removed => &generator.coboundary_r,
                    Compartment::Infected => {
                        unreachable!("infected node {q} has a boundary")
                    }
                };
                assert!(
                    coboundary[&owner].contains(&q),
                    "node {q} missing from coboundary of {owner}"
                );
            }
            for (&owner, set) in generator
                .coboundary_s
                .iter()
                .chain(generator.coboundary_r.iter())
            {
                for q in set {
                    assert_eq!(
                        generator.boundary.get(q),
                        Some(&owner),
                        "coboundary of {owner} holds {q} without a matching boundary"
                    );
                }
            }
        }
    }

    #[test]
    fn losing_the_last_source_writes_sentinels() {
        // Path 0-1-2: infect 0, then remove it. Nothing infected remains.
        let g = Arc::new(Graph::from_edges(3, &[(0, 1), (1, 2)]).unwrap());
        let events = vec![Event::infected(0.0, 0, 0), Event::removed(1.0, 0)];
        let signal = ProgressSignalGenerator::build(g, &AllSusceptible, &events).unwrap();
        let inf = 4;
        assert_eq!(levels(&signal, 0.0), vec![0, 1, 2]);
        assert_eq!(levels(&signal, 1.0), vec![-inf, inf, inf]);
    }
}
