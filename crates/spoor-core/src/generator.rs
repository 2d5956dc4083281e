// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Generator lifecycle.
//!
//! A signal generator consumes an epidemic event stream and writes one
//! signal. Its life has three phases: `initialize` seeds the t=0 state,
//! registered handlers consume events one at a time (see
//! [`crate::replay::replay`]), and `finalize` runs once after the last
//! event.

use crate::error::SignalError;
use crate::event::EventDispatch;

/// A consumer of epidemic events that incrementally builds a signal.
pub trait SignalGenerator: Sized {
    /// Declares this generator's event bindings.
    ///
    /// Called once per replay with a fresh table. Handlers fire in the
    /// order they are registered here; event kinds left unregistered are
    /// ignored.
    fn bindings(dispatch: &mut EventDispatch<Self>);

    /// Seeds the signal with its t=0 state, before any event is consumed.
    ///
    /// # Errors
    ///
    /// Precondition violations in the initial state (for instance removed
    /// nodes present at t=0) abort the replay.
    fn initialize(&mut self) -> Result<(), SignalError>;

    /// Runs once after the last event. Default: nothing to do.
    ///
    /// # Errors
    ///
    /// Implementations may fail if their final state is inconsistent.
    fn finalize(&mut self) -> Result<(), SignalError> {
        Ok(())
    }
}
