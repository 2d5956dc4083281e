// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! SIR compartments and initial-state providers.
//!
//! At any instant every node belongs to exactly one compartment, and per
//! node the sequence of compartments over a run is monotonic:
//! S → I → R, never reversed, never skipped. The core tracks compartments
//! itself from the event stream; a [`CompartmentSource`] is consulted only
//! once, at initialization time.

use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};
use spoor_graph::NodeId;

use crate::error::SignalError;
use crate::event::{Element, EventDispatch, EventKind};
use crate::generator::SignalGenerator;
use crate::signal::Signal;

/// SIR compartment of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Compartment {
    /// Never infected; can be.
    Susceptible,
    /// Currently infectious.
    Infected,
    /// Past infection; terminal.
    Removed,
}

impl fmt::Display for Compartment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Susceptible => "S",
            Self::Infected => "I",
            Self::Removed => "R",
        })
    }
}

/// Initial per-node compartment lookup, consulted at initialization only.
pub trait CompartmentSource {
    /// Compartment of `node` at t=0.
    fn compartment(&self, node: NodeId) -> Compartment;
}

/// Every node starts susceptible; the epidemic is seeded by the first
/// infection event.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllSusceptible;

impl CompartmentSource for AllSusceptible {
    fn compartment(&self, _node: NodeId) -> Compartment {
        Compartment::Susceptible
    }
}

/// A fixed set of nodes starts infected; everyone else is susceptible.
#[derive(Debug, Clone, Default)]
pub struct SeedInfected {
    seeds: FxHashSet<NodeId>,
}

impl SeedInfected {
    /// Creates a source seeding exactly `seeds`.
    #[must_use]
    pub fn new(seeds: impl IntoIterator<Item = NodeId>) -> Self {
        Self {
            seeds: seeds.into_iter().collect(),
        }
    }
}

impl CompartmentSource for SeedInfected {
    fn compartment(&self, node: NodeId) -> Compartment {
        if self.seeds.contains(&node) {
            Compartment::Infected
        } else {
            Compartment::Susceptible
        }
    }
}

/// Explicit per-node assignments; absent nodes default to susceptible.
impl CompartmentSource for FxHashMap<NodeId, Compartment> {
    fn compartment(&self, node: NodeId) -> Compartment {
        self.get(&node).copied().unwrap_or(Compartment::Susceptible)
    }
}

/// Generates the compartment-label signal: each node's value at time t is
/// simply its compartment at t.
///
/// Works for any run of the SIR state machine; writes are diff-minimal
/// (one write per transition, the initial capture aside).
#[derive(Debug)]
pub struct CompartmentSignalGenerator {
    signal: Signal<Compartment>,
    state: Vec<Compartment>,
}

impl CompartmentSignalGenerator {
    /// Creates a generator over `signal`'s network, seeded from `source`.
    #[must_use]
    pub fn new(signal: Signal<Compartment>, source: &impl CompartmentSource) -> Self {
        let state = signal
            .network()
            .nodes()
            .map(|n| source.compartment(n))
            .collect();
        Self { signal, state }
    }

    /// The signal built so far.
    #[must_use]
    pub fn signal(&self) -> &Signal<Compartment> {
        &self.signal
    }

    /// Consumes the generator, yielding the finished signal.
    #[must_use]
    pub fn into_signal(self) -> Signal<Compartment> {
        self.signal
    }

    fn transition(
        &mut self,
        time: f64,
        node: NodeId,
        from: Compartment,
        to: Compartment,
    ) -> Result<(), SignalError> {
        let current = *self
            .state
            .get(node as usize)
            .ok_or(SignalError::UnknownNode(node))?;
        if current != from {
            return Err(match from {
                Compartment::Susceptible => SignalError::NotSusceptible(node),
                _ => SignalError::NotInfected(node),
            });
        }
        self.state[node as usize] = to;
        self.signal.set(node, time, to);
        Ok(())
    }

    fn on_infected(&mut self, time: f64, element: Element) -> Result<(), SignalError> {
        self.transition(
            time,
            element.subject(),
            Compartment::Susceptible,
            Compartment::Infected,
        )
    }

    fn on_removed(&mut self, time: f64, element: Element) -> Result<(), SignalError> {
        self.transition(
            time,
            element.subject(),
            Compartment::Infected,
            Compartment::Removed,
        )
    }
}

impl SignalGenerator for CompartmentSignalGenerator {
    fn bindings(dispatch: &mut EventDispatch<Self>) {
        dispatch.register(EventKind::Infected, Self::on_infected);
        dispatch.register(EventKind::Removed, Self::on_removed);
    }

    fn initialize(&mut self) -> Result<(), SignalError> {
        for (idx, compartment) in self.state.iter().enumerate() {
            self.signal.set(idx as NodeId, 0.0, *compartment);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use spoor_graph::Graph;

    use super::*;
    use crate::event::Event;
    use crate::replay::replay;

    fn triangle() -> Arc<Graph> {
        Arc::new(Graph::from_edges(3, &[(0, 1), (1, 2), (2, 0)]).unwrap())
    }

    #[test]
    fn compartment_signal_tracks_transitions() {
        let g = triangle();
        let mut gen =
            CompartmentSignalGenerator::new(Signal::new(g), &SeedInfected::new([0]));
        let events = vec![Event::infected(1.0, 1, 0), Event::removed(2.0, 0)];
        replay(&mut gen, &events).unwrap();

        let signal = gen.into_signal();
        let at0 = signal.at(0.0);
        assert_eq!(at0.get(0), Some(&Compartment::Infected));
        assert_eq!(at0.get(1), Some(&Compartment::Susceptible));
        assert_eq!(at0.get(2), Some(&Compartment::Susceptible));

        let at1 = signal.at(1.5);
        assert_eq!(at1.get(0), Some(&Compartment::Infected));
        assert_eq!(at1.get(1), Some(&Compartment::Infected));

        let at2 = signal.at(2.0);
        assert_eq!(at2.get(0), Some(&Compartment::Removed));
        assert_eq!(at2.get(1), Some(&Compartment::Infected));
        assert_eq!(at2.get(2), Some(&Compartment::Susceptible));
    }

    #[test]
    fn infecting_a_non_susceptible_node_fails() {
        let g = triangle();
        let mut gen =
            CompartmentSignalGenerator::new(Signal::new(g), &SeedInfected::new([0]));
        let events = vec![Event::infected(1.0, 0, 1)];
        let err = replay(&mut gen, &events).unwrap_err();
        assert_eq!(err, SignalError::NotSusceptible(0));
    }

    #[test]
    fn removing_a_non_infected_node_fails() {
        let g = triangle();
        let mut gen = CompartmentSignalGenerator::new(Signal::new(g), &AllSusceptible);
        let events = vec![Event::infected(0.0, 0, 0), Event::removed(1.0, 2)];
        let err = replay(&mut gen, &events).unwrap_err();
        assert_eq!(err, SignalError::NotInfected(2));
    }

    #[test]
    fn map_source_defaults_to_susceptible() {
        let mut map: FxHashMap<NodeId, Compartment> = FxHashMap::default();
        map.insert(1, Compartment::Infected);
        assert_eq!(map.compartment(1), Compartment::Infected);
        assert_eq!(map.compartment(0), Compartment::Susceptible);
    }
}
