// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Interface to an arbiter that grants access to a shared radio.
//!
//! When several protocol stacks share one radio, an arbiter hands out
//! timeslots. A driver enters "continuous mode" to ask for the radio for as
//! long as it needs it and is told through [`TimeslotClient`] when access
//! starts and when it is taken away.

/// How badly the radio driver needs the radio right now.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RadioNeed {
    /// The driver is asleep and does not use the radio.
    None,
    /// The driver is listening; revoking access loses nothing in flight.
    Idle,
    /// A procedure is in progress; revoking access aborts it.
    Active,
}

pub trait TimeslotClient {
    /// Radio access was granted.
    fn timeslot_started(&self);
    /// Radio access was revoked. The radio must be treated as reset.
    fn timeslot_ended(&self);
    /// Current need, used by the arbiter to decide whether revocation is
    /// safe.
    fn radio_need(&self) -> RadioNeed;
}

pub trait TimeslotArbiter<'a> {
    fn set_client(&self, client: &'a dyn TimeslotClient);
    /// Request radio access until `continuous_mode_exit`.
    fn continuous_mode_enter(&self);
    /// Give up radio access.
    fn continuous_mode_exit(&self);
    /// Hold off `TimeslotClient` notifications. Calls nest.
    fn critical_section_enter(&self);
    /// Deliver notifications held off since the outermost enter.
    fn critical_section_exit(&self);
}
