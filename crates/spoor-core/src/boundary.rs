// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Infection-boundary signal: per-node incident SI-edge counts.
//!
//! The value at a node is the number of susceptible–infected edges
//! incident on it, so it is nonzero only on nodes sitting on the
//! infection boundary itself. Each event touches one node and its
//! neighbourhood, so maintenance is O(degree) per event.

use std::sync::Arc;

use spoor_graph::{Graph, NodeId};

use crate::compartment::{Compartment, CompartmentSource};
use crate::error::SignalError;
use crate::event::{Element, EventDispatch, EventKind};
use crate::generator::SignalGenerator;
use crate::signal::Signal;

/// Generates the infection-boundary signal of an SIR epidemic.
#[derive(Debug)]
pub struct InfectionBoundarySignalGenerator {
    signal: Signal<i64>,
    network: Arc<Graph>,
    compartment: Vec<Compartment>,
    /// Current SI-edge count per node, mirrored into the timed store.
    level: Vec<i64>,
}

impl InfectionBoundarySignalGenerator {
    /// Creates a generator over `signal`'s network, seeded from `source`.
    #[must_use]
    pub fn new(signal: Signal<i64>, source: &impl CompartmentSource) -> Self {
        let network = Arc::clone(signal.network());
        let order = network.order();
        let compartment = network.nodes().map(|n| source.compartment(n)).collect();
        Self {
            signal,
            network,
            compartment,
            level: vec![0; order],
        }
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

    fn write(&mut self, time: f64, node: NodeId, value: i64) {
        self.level[node as usize] = value;
        self.signal.set(node, time, value);
    }

    fn bump(&mut self, time: f64, node: NodeId, delta: i64) {
        let value = self.level[node as usize] + delta;
        self.write(time, node, value);
    }

    fn compartment_of(&self, node: NodeId) -> Result<Compartment, SignalError> {
        self.compartment
            .get(node as usize)
            .copied()
            .ok_or(SignalError::UnknownNode(node))
    }

    /// Infection: edges to susceptible neighbours become SI, edges to
    /// infected neighbours stop being SI.
    fn on_infected(&mut self, time: f64, element: Element) -> Result<(), SignalError> {
        let s = element.subject();
        if self.compartment_of(s)? != Compartment::Susceptible {
            return Err(SignalError::NotSusceptible(s));
        }
        self.compartment[s as usize] = Compartment::Infected;

        let network = Arc::clone(&self.network);
        let mut si = 0;
        for &m in network.neighbors(s) {
            match self.compartment[m as usize] {
                Compartment::Susceptible => {
                    si += 1;
                    self.bump(time, m, 1);
                }
                Compartment::Infected => self.bump(time, m, -1),
                Compartment::Removed => {}
            }
        }
        self.write(time, s, si);
        Ok(())
    }

    /// Removal: every incident SI edge disappears.
    fn on_removed(&mut self, time: f64, element: Element) -> Result<(), SignalError> {
        let s = element.subject();
        if self.compartment_of(s)? != Compartment::Infected {
            return Err(SignalError::NotInfected(s));
        }
        self.compartment[s as usize] = Compartment::Removed;

        let network = Arc::clone(&self.network);
        for &m in network.neighbors(s) {
            if self.compartment[m as usize] == Compartment::Susceptible {
                self.bump(time, m, -1);
            }
        }
        self.write(time, s, 0);
        Ok(())
    }
}

impl SignalGenerator for InfectionBoundarySignalGenerator {
    fn bindings(dispatch: &mut EventDispatch<Self>) {
        dispatch.register(EventKind::Infected, Self::on_infected);
        dispatch.register(EventKind::Removed, Self::on_removed);
    }

    /// Counts the initial SI edges and writes every node's count at t=0.
    fn initialize(&mut self) -> Result<(), SignalError> {
        let network = Arc::clone(&self.network);
        let mut counts = vec![0i64; network.order()];
        for n in network.nodes() {
            if self.compartment[n as usize] != Compartment::Infected {
                continue;
            }
            for &m in network.neighbors(n) {
                if self.compartment[m as usize] == Compartment::Susceptible {
                    counts[n as usize] += 1;
                    counts[m as usize] += 1;
                }
            }
        }
        for n in network.nodes() {
            self.write(0.0, n, counts[n as usize]);
        }
        Ok(())
    }
}
