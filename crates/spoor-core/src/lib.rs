// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! spoor-core: time-indexed node signals over SIR epidemic event streams.
//!
//! An external epidemic process emits an ordered stream of
//! (time, event, element) transitions. Signal generators consume the
//! stream and maintain per-node scalar signals that can be queried at
//! *any* time, forward or backward, through a compact diff-list store.
//! The flagship generator keeps, for every node, the signed shortest-path
//! distance to the infected front, recomputing only the region each event
//! invalidates.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::many_single_char_names,
    clippy::module_name_repetitions,
    clippy::use_self,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::float_cmp
)]

mod boundary;
mod compartment;
mod error;
mod event;
mod generator;
mod progress;
mod replay;
mod signal;
mod timed;

/// Infection-boundary signal generator (incident SI-edge counts).
pub use boundary::InfectionBoundarySignalGenerator;
/// SIR compartments and initial-state providers.
pub use compartment::{
    AllSusceptible, Compartment, CompartmentSignalGenerator, CompartmentSource, SeedInfected,
};
/// Crate-wide error taxonomy.
pub use error::SignalError;
/// Event model, dispatch table and timeline helpers.
pub use event::{merge_timeline, Element, Event, EventDispatch, EventHandler, EventKind};
/// Generator lifecycle.
pub use generator::SignalGenerator;
/// Incremental progress-signal engine.
pub use progress::ProgressSignalGenerator;
/// Validated event-stream replay.
pub use replay::{replay, validate_stream};
/// Node signals and their persistence artifact.
pub use signal::{Signal, SignalView, UpdateTriples};
/// Time-indexed key/value store.
pub use timed::{TimedMap, TimedView};
