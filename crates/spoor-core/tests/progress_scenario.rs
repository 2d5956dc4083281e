// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Reference scenario for the progress signal.
//!
//! Six-node contact network, edges 0-1, 0-2, 1-2, 1-3, 2-3, 3-4, 3-5,
//! seeded by infecting node 0 at t=0. Every checkpoint below was derived
//! by hand from the signal definition: susceptible nodes carry their
//! susceptible-only hop distance to the infected front, removed nodes the
//! negated susceptible-or-removed distance, infected nodes zero.

#![allow(missing_docs)]

use std::sync::Arc;

use spoor_core::{
    AllSusceptible, Event, ProgressSignalGenerator, Signal, SignalError,
};
use spoor_graph::Graph;

fn scenario_graph() -> Arc<Graph> {
    Arc::new(
        Graph::from_edges(
            6,
            &[(0, 1), (0, 2), (1, 2), (1, 3), (2, 3), (3, 4), (3, 5)],
        )
        .unwrap(),
    )
}

fn scenario_events() -> Vec<Event> {
    vec![
        Event::infected(0.0, 0, 0),
        Event::infected(1.0, 2, 0),
        Event::removed(2.0, 0),
        Event::infected(3.0, 3, 2),
        Event::removed(4.0, 2),
    ]
}

fn scenario_signal() -> Signal<i64> {
    ProgressSignalGenerator::build(scenario_graph(), &AllSusceptible, &scenario_events())
        .unwrap()
}

fn levels(signal: &Signal<i64>, t: f64) -> Vec<i64> {
    let view = signal.at(t);
    (0..6).map(|n| *view.get(n).unwrap()).collect()
}

#[test]
fn base_signal_is_correct() {
    let signal = scenario_signal();
    assert_eq!(levels(&signal, 0.0), vec![0, 1, 1, 2, 3, 3]);
}

#[test]
fn times_before_the_first_transition_stay_like_base() {
    let signal = scenario_signal();
    assert_eq!(levels(&signal, 0.2), vec![0, 1, 1, 2, 3, 3]);
    assert_eq!(levels(&signal, 0.999), vec![0, 1, 1, 2, 3, 3]);
}

#[test]
fn every_checkpoint_matches() {
    let signal = scenario_signal();
    assert_eq!(levels(&signal, 1.0), vec![0, 1, 0, 1, 2, 2]);
    assert_eq!(levels(&signal, 2.0), vec![-1, 1, 0, 1, 2, 2]);
    assert_eq!(levels(&signal, 3.0), vec![-1, 1, 0, 0, 1, 1]);
    assert_eq!(levels(&signal, 4.0), vec![-2, 1, -1, 0, 1, 1]);
}

#[test]
fn backward_seek_reproduces_earlier_snapshots() {
    let signal = scenario_signal();
    // Read the end of the epidemic first, then jump back.
    assert_eq!(levels(&signal, 4.0), vec![-2, 1, -1, 0, 1, 1]);
    assert_eq!(levels(&signal, 1.0), vec![0, 1, 0, 1, 2, 2]);
    assert_eq!(levels(&signal, 2.0), vec![-1, 1, 0, 1, 2, 2]);
    assert_eq!(levels(&signal, 0.0), vec![0, 1, 1, 2, 3, 3]);
}

#[test]
fn transitions_and_bounds_cover_the_run() {
    let signal = scenario_signal();
    assert_eq!(signal.transitions(), vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    // The +infinity sentinel is written everywhere at t=0, but the seed
    // relaxes at the same instant: every node here is reachable, so the
    // sentinel is overwritten in place and never observable.
    let (lo, hi) = signal.value_bounds().unwrap();
    assert_eq!(lo, -2);
    assert_eq!(hi, 3);
}

#[test]
fn time_series_has_one_column_per_transition() {
    let signal = scenario_signal();
    let series = signal.to_time_series();
    assert_eq!(series.len(), 6);
    assert_eq!(series[&0], vec![Some(0), Some(0), Some(-1), Some(-1), Some(-2)]);
    assert_eq!(series[&4], vec![Some(3), Some(2), Some(2), Some(1), Some(1)]);
}

#[test]
fn update_triples_round_trip_the_whole_run() {
    let signal = scenario_signal();
    let reloaded =
        Signal::from_update_triples(Arc::clone(signal.network()), signal.to_update_triples())
            .unwrap();
    assert_eq!(reloaded.transitions(), signal.transitions());
    for &t in &signal.transitions() {
        for n in 0..6 {
            assert_eq!(
                reloaded.get(n, t),
                signal.get(n, t),
                "node {n} differs at t={t}"
            );
        }
    }
}

#[test]
fn infected_nodes_sit_at_zero_throughout() {
    let signal = scenario_signal();
    let infected_at: [(f64, &[u32]); 5] = [
        (0.0, &[0]),
        (1.0, &[0, 2]),
        (2.0, &[2]),
        (3.0, &[2, 3]),
        (4.0, &[3]),
    ];
    for (t, infected) in infected_at {
        for &n in infected {
            assert_eq!(signal.get(n, t), Some(&0), "node {n} at t={t}");
        }
    }
}

#[test]
fn neighbours_of_the_front_sit_at_distance_one() {
    let signal = scenario_signal();
    // At t=1 nodes 0 and 2 are infected; susceptible 1 and 3 touch them.
    assert_eq!(signal.get(1, 1.0), Some(&1));
    assert_eq!(signal.get(3, 1.0), Some(&1));
    // At t=2 node 0 is removed adjacent to infected 2.
    assert_eq!(signal.get(0, 2.0), Some(&-1));
}

#[test]
fn replays_reject_streams_that_start_with_a_removal() {
    let events = vec![Event::removed(0.0, 0)];
    let err = ProgressSignalGenerator::build(scenario_graph(), &AllSusceptible, &events)
        .unwrap_err();
    assert!(matches!(err, SignalError::FirstEventNotInfection(_)));
}

#[test]
fn replays_reject_backwards_time() {
    let events = vec![
        Event::infected(0.0, 0, 0),
        Event::infected(2.0, 2, 0),
        Event::infected(1.0, 1, 0),
    ];
    let err = ProgressSignalGenerator::build(scenario_graph(), &AllSusceptible, &events)
        .unwrap_err();
    assert_eq!(
        err,
        SignalError::OutOfOrder {
            prev: 2.0,
            next: 1.0
        }
    );
}

#[test]
fn partial_failure_leaves_earlier_state_queryable() {
    // The third event is invalid (node 4 was never infected); the replay
    // aborts there, but everything up to t=1 stays queryable.
    let g = scenario_graph();
    let events = vec![
        Event::infected(0.0, 0, 0),
        Event::infected(1.0, 2, 0),
        Event::removed(2.0, 4),
    ];
    let mut generator =
        spoor_core::ProgressSignalGenerator::new(Signal::new(g), &AllSusceptible);
    let err = spoor_core::replay(&mut generator, &events).unwrap_err();
    assert_eq!(err, SignalError::NotInfected(4));

    let signal = generator.into_signal();
    let view = signal.at(1.0);
    assert_eq!(*view.get(2).unwrap(), 0);
    assert_eq!(*view.get(3).unwrap(), 1);
}
