// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2023.

//! Nesting critical section of the radio FSM.
//!
//! While the section is held, the radio interrupt is masked and the arbiter
//! holds back timeslot notifications, so a request made from thread context
//! cannot interleave with an event handler. Entering again from inside the
//! section only bumps a counter; the outermost exit releases both.

use core::cell::Cell;

use kernel::hil::radio::Transceiver;
use kernel::hil::timeslot::TimeslotArbiter;

pub struct CriticalSection {
    nesting: Cell<u8>,
}

impl CriticalSection {
    pub const fn new() -> CriticalSection {
        CriticalSection {
            nesting: Cell::new(0),
        }
    }

    /// Run `f` inside the section.
    pub fn with<'a, T, A, R, F>(&self, radio: &T, arbiter: &A, f: F) -> R
    where
        T: Transceiver,
        A: TimeslotArbiter<'a>,
        F: FnOnce() -> R,
    {
        let depth = self.nesting.get();
        if depth == 0 {
            arbiter.critical_section_enter();
            radio.mask_interrupts();
        }
        self.nesting.set(depth + 1);

        let result = f();

        self.nesting.set(depth);
        if depth == 0 {
            radio.unmask_interrupts();
            arbiter.critical_section_exit();
        }
        result
    }
}

#[cfg(test)]
mod test {
    use super::CriticalSection;
    use crate::single_phy::SinglePhyArbiter;
    use crate::test::fake::FakeRadio;

    #[test]
    fn only_outermost_exit_unmasks() {
        let radio = FakeRadio::new();
        let arbiter = SinglePhyArbiter::new();
        let section = CriticalSection::new();

        section.with(&radio, &arbiter, || {
            assert!(radio.masked());
            section.with(&radio, &arbiter, || {
                assert!(radio.masked());
            });
            assert!(radio.masked());
        });
        assert!(!radio.masked());
        assert_eq!(radio.mask_count(), 1);
    }

    #[test]
    fn returns_closure_value() {
        let radio = FakeRadio::new();
        let arbiter = SinglePhyArbiter::new();
        let section = CriticalSection::new();
        assert_eq!(section.with(&radio, &arbiter, || 7), 7);
    }
}
