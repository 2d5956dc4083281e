// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Epidemic event model and handler dispatch.
//!
//! An external process (a stochastic simulation, or a recorded trace)
//! emits an ordered stream of [`Event`]s. Generators register handlers per
//! [`EventKind`] in an [`EventDispatch`] table; kinds nobody registered
//! for are silently ignored, since a generator may only care about a
//! subset of the stream.

use rustc_hash::FxHashMap;
use spoor_graph::NodeId;

use crate::error::SignalError;

/// Kind of state transition an event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A susceptible node became infected.
    Infected,
    /// An infected node was removed.
    Removed,
}

/// The graph element an event acts on.
///
/// Infections pass over an SI edge whose *first* component is the newly
/// infected node; removals name a bare node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Element {
    /// A single node.
    Node(NodeId),
    /// A directed view of an edge: (newly infected node, source of infection).
    Edge(NodeId, NodeId),
}

impl Element {
    /// The node this element designates: the node itself, or the first
    /// edge component.
    #[must_use]
    pub fn subject(&self) -> NodeId {
        match *self {
            Self::Node(n) | Self::Edge(n, _) => n,
        }
    }
}

/// A timestamped state-transition event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event {
    /// Simulation time of the transition.
    pub time: f64,
    /// What happened.
    pub kind: EventKind,
    /// Which element it happened to.
    pub element: Element,
}

impl Event {
    /// An infection event at `time` for `node`, infected via `source`.
    #[must_use]
    pub fn infected(time: f64, node: NodeId, source: NodeId) -> Self {
        Self {
            time,
            kind: EventKind::Infected,
            element: Element::Edge(node, source),
        }
    }

    /// A removal event at `time` for `node`.
    #[must_use]
    pub fn removed(time: f64, node: NodeId) -> Self {
        Self {
            time,
            kind: EventKind::Removed,
            element: Element::Node(node),
        }
    }
}

/// A handler bound to one event kind on a generator of type `G`.
pub type EventHandler<G> = fn(&mut G, f64, Element) -> Result<(), SignalError>;

/// Registration table: event kind → ordered handler list.
///
/// Handlers fire in registration order. Plain function pointers keep the
/// table `Copy`-cheap and avoid borrowing the generator while iterating.
#[derive(Debug)]
pub struct EventDispatch<G> {
    handlers: FxHashMap<EventKind, Vec<EventHandler<G>>>,
}

impl<G> Default for EventDispatch<G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G> EventDispatch<G> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: FxHashMap::default(),
        }
    }

    /// Appends `handler` to the list for `kind`.
    pub fn register(&mut self, kind: EventKind, handler: EventHandler<G>) {
        self.handlers.entry(kind).or_default().push(handler);
    }

    /// Handlers registered for `kind`, in registration order. Empty for
    /// kinds nobody registered.
    #[must_use]
    pub fn handlers(&self, kind: EventKind) -> &[EventHandler<G>] {
        self.handlers.get(&kind).map_or(&[], Vec::as_slice)
    }

    /// Routes one event through the handlers registered for its kind.
    ///
    /// # Errors
    ///
    /// Propagates the first handler error; later handlers do not run.
    pub fn dispatch(&self, generator: &mut G, event: &Event) -> Result<(), SignalError> {
        for handler in self.handlers(event.kind) {
            handler(generator, event.time, event.element)?;
        }
        Ok(())
    }
}

/// Merges per-node infection ("hitting") and removal ("healing") time
/// sequences into one ordered event stream.
///
/// Both inputs must already be sorted by time; the merge is stable, with
/// infections winning ties so that a node's infection always precedes its
/// removal at the same instant. Timelines carry no infection source, so
/// infection events are emitted with bare-node elements.
#[must_use]
pub fn merge_timeline(hitting: &[(f64, NodeId)], healing: &[(f64, NodeId)]) -> Vec<Event> {
    let infected = |time, node| Event {
        time,
        kind: EventKind::Infected,
        element: Element::Node(node),
    };
    let mut events = Vec::with_capacity(hitting.len() + healing.len());
    let (mut h, mut r) = (0, 0);
    while h < hitting.len() && r < healing.len() {
        let (ht, hn) = hitting[h];
        let (rt, rn) = healing[r];
        if ht <= rt {
            events.push(infected(ht, hn));
            h += 1;
        } else {
            events.push(Event::removed(rt, rn));
            r += 1;
        }
    }
    for &(t, n) in &hitting[h..] {
        events.push(infected(t, n));
    }
    for &(t, n) in &healing[r..] {
        events.push(Event::removed(t, n));
    }
    events
}
