// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Validated replay of a recorded event stream through a generator.
//!
//! One event is fully processed, including all cascading recomputation
//! inside the generator, before the next is accepted. A replay that
//! fails partway leaves the generator's signal valid and queryable as of
//! the last fully-processed event.

use tracing::{debug, trace};

use crate::error::SignalError;
use crate::event::{Event, EventDispatch, EventKind};
use crate::generator::SignalGenerator;

/// Checks the stream preconditions without consuming anything.
///
/// Times must be finite and non-decreasing, and the first event must be
/// an infection (the epidemic has to be seeded before anything can be
/// removed). An empty stream is valid.
///
/// # Errors
///
/// [`SignalError::NonFiniteTime`], [`SignalError::OutOfOrder`] or
/// [`SignalError::FirstEventNotInfection`] on the first offending event.
pub fn validate_stream(events: &[Event]) -> Result<(), SignalError> {
    if let Some(first) = events.first() {
        if first.kind != EventKind::Infected {
            return Err(SignalError::FirstEventNotInfection(first.kind));
        }
    }
    let mut prev: Option<f64> = None;
    for event in events {
        if !event.time.is_finite() {
            return Err(SignalError::NonFiniteTime(event.time));
        }
        if let Some(p) = prev {
            if event.time < p {
                return Err(SignalError::OutOfOrder {
                    prev: p,
                    next: event.time,
                });
            }
        }
        prev = Some(event.time);
    }
    Ok(())
}

/// Drives `generator` over the whole stream: validate, initialize,
/// dispatch every event in order, finalize.
///
/// # Errors
///
/// Stream precondition errors surface before the generator sees anything;
/// handler errors abort the replay at the offending event.
pub fn replay<G: SignalGenerator>(generator: &mut G, events: &[Event]) -> Result<(), SignalError> {
    validate_stream(events)?;
    let mut dispatch = EventDispatch::new();
    G::bindings(&mut dispatch);

    generator.initialize()?;
    debug!(events = events.len(), "replaying event stream");
    for event in events {
        trace!(time = event.time, kind = ?event.kind, "dispatching event");
        dispatch.dispatch(generator, event)?;
    }
    generator.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Element;

    struct Counter {
        initialized: bool,
        finalized: bool,
        seen: Vec<f64>,
    }

    impl Counter {
        fn new() -> Self {
            Self {
                initialized: false,
                finalized: false,
                seen: Vec::new(),
            }
        }

        fn on_any(&mut self, t: f64, _e: Element) -> Result<(), SignalError> {
            self.seen.push(t);
            Ok(())
        }
    }

    impl SignalGenerator for Counter {
        fn bindings(dispatch: &mut EventDispatch<Self>) {
            dispatch.register(EventKind::Infected, Self::on_any);
            dispatch.register(EventKind::Removed, Self::on_any);
        }

        fn initialize(&mut self) -> Result<(), SignalError> {
            self.initialized = true;
            Ok(())
        }

        fn finalize(&mut self) -> Result<(), SignalError> {
            self.finalized = true;
            Ok(())
        }
    }

    #[test]
    fn replay_runs_the_full_lifecycle() {
        let events = vec![
            Event::infected(0.0, 1, 1),
            Event::infected(1.0, 2, 1),
            Event::removed(2.0, 1),
        ];
        let mut gen = Counter::new();
        replay(&mut gen, &events).unwrap();
        assert!(gen.initialized);
        assert!(gen.finalized);
        assert_eq!(gen.seen, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn empty_stream_still_initializes_and_finalizes() {
        let mut gen = Counter::new();
        replay(&mut gen, &[]).unwrap();
        assert!(gen.initialized);
        assert!(gen.finalized);
        assert!(gen.seen.is_empty());
    }

    #[test]
    fn first_event_must_be_an_infection() {
        let events = vec![Event::removed(0.0, 1)];
        let mut gen = Counter::new();
        let err = replay(&mut gen, &events).unwrap_err();
        assert_eq!(err, SignalError::FirstEventNotInfection(EventKind::Removed));
        assert!(!gen.initialized, "validation failures precede initialize");
    }

    #[test]
    fn time_order_is_enforced() {
        let events = vec![Event::infected(1.0, 1, 1), Event::infected(0.5, 2, 1)];
        let err = replay(&mut Counter::new(), &events).unwrap_err();
        assert_eq!(
            err,
            SignalError::OutOfOrder {
                prev: 1.0,
                next: 0.5
            }
        );
    }

    #[test]
    fn non_finite_times_are_rejected() {
        let events = vec![Event::infected(f64::NAN, 1, 1)];
        let err = replay(&mut Counter::new(), &events).unwrap_err();
        assert!(matches!(err, SignalError::NonFiniteTime(_)));
    }

    #[test]
    fn equal_times_are_allowed() {
        let events = vec![Event::infected(1.0, 1, 1), Event::infected(1.0, 2, 1)];
        replay(&mut Counter::new(), &events).unwrap();
    }
}
