// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2023.

//! Timeslot arbiter for a radio used by a single protocol.
//!
//! Continuous mode is granted as soon as it is requested and never taken
//! away by the arbiter itself. Boards running other protocols on the same
//! radio (or tests) can call [`SinglePhyArbiter::revoke`] and
//! [`SinglePhyArbiter::grant`] to take the radio away and give it back.
//!
//! Notifications raised while the client holds the arbiter's critical
//! section are held back and delivered when the outermost section exits. A
//! start followed by an end inside the same section cancel out.

use core::cell::Cell;

use kernel::hil::timeslot::{TimeslotArbiter, TimeslotClient};
use kernel::utilities::cells::OptionalCell;

pub struct SinglePhyArbiter<'a> {
    client: OptionalCell<&'a dyn TimeslotClient>,
    requested: Cell<bool>,
    granted: Cell<bool>,
    blocked: Cell<bool>,
    nesting: Cell<u8>,
    pending_start: Cell<bool>,
    pending_end: Cell<bool>,
}

impl<'a> SinglePhyArbiter<'a> {
    pub const fn new() -> SinglePhyArbiter<'a> {
        SinglePhyArbiter {
            client: OptionalCell::empty(),
            requested: Cell::new(false),
            granted: Cell::new(false),
            blocked: Cell::new(false),
            nesting: Cell::new(0),
            pending_start: Cell::new(false),
            pending_end: Cell::new(false),
        }
    }

    pub fn is_granted(&self) -> bool {
        self.granted.get()
    }

    /// Take the radio away from the client until `grant` is called.
    pub fn revoke(&self) {
        self.blocked.set(true);
        if self.granted.get() {
            self.granted.set(false);
            self.notify_ended();
        }
    }

    /// Allow the radio to be used again, granting it at once if the client
    /// is in continuous mode.
    pub fn grant(&self) {
        self.blocked.set(false);
        self.try_grant();
    }

    fn try_grant(&self) {
        if self.requested.get() && !self.granted.get() && !self.blocked.get() {
            self.granted.set(true);
            self.notify_started();
        }
    }

    fn notify_started(&self) {
        if self.nesting.get() > 0 {
            self.pending_start.set(true);
        } else {
            self.client.map(|client| client.timeslot_started());
        }
    }

    fn notify_ended(&self) {
        if self.nesting.get() > 0 {
            if self.pending_start.get() {
                self.pending_start.set(false);
            } else {
                self.pending_end.set(true);
            }
        } else {
            self.client.map(|client| client.timeslot_ended());
        }
    }
}

impl<'a> TimeslotArbiter<'a> for SinglePhyArbiter<'a> {
    fn set_client(&self, client: &'a dyn TimeslotClient) {
        self.client.set(client);
    }

    fn continuous_mode_enter(&self) {
        self.requested.set(true);
        self.try_grant();
    }

    fn continuous_mode_exit(&self) {
        // The client gave the radio up and expects no notification.
        self.requested.set(false);
        self.granted.set(false);
        self.pending_start.set(false);
        self.pending_end.set(false);
    }

    fn critical_section_enter(&self) {
        self.nesting.set(self.nesting.get() + 1);
    }

    fn critical_section_exit(&self) {
        let depth = self.nesting.get().saturating_sub(1);
        self.nesting.set(depth);
        if depth > 0 {
            return;
        }
        if self.pending_end.replace(false) {
            self.client.map(|client| client.timeslot_ended());
        }
        if self.pending_start.replace(false) {
            self.client.map(|client| client.timeslot_started());
        }
    }
}
