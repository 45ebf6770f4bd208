// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2023.

//! States of the radio FSM and the deferred intents it can carry.

use kernel::hil::timeslot::RadioNeed;

/// Operating state of the radio driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RadioState {
    // Sleep
    /// Ramping down into low power mode.
    Disabling,
    /// Low power mode, radio access released.
    Sleep,

    // Receive
    /// Receive requested, but the radio is not listening because the timeslot
    /// has not been granted or no receive buffer is free.
    WaitingTimeslot,
    /// Listening for a frame.
    WaitingRxFrame,
    /// Start of frame seen, receiving the MAC header.
    RxHeader,
    /// Destination matched, receiving the rest of the frame.
    RxFrame,
    /// Frame received, transmitting its acknowledgment.
    TxAck,

    // Transmit
    /// Assessing the channel before transmission.
    CcaBeforeTx,
    /// Transmitting a frame.
    TxFrame,
    /// Waiting for the acknowledgment of the transmitted frame.
    RxAck,

    /// Measuring channel energy.
    EnergyDetection,
    /// Performing a standalone clear channel assessment.
    Cca,
    /// Emitting an unmodulated carrier.
    ContinuousCarrier,
}

impl RadioState {
    /// Every state, in declaration order.
    pub const ALL: [RadioState; 13] = [
        RadioState::Disabling,
        RadioState::Sleep,
        RadioState::WaitingTimeslot,
        RadioState::WaitingRxFrame,
        RadioState::RxHeader,
        RadioState::RxFrame,
        RadioState::TxAck,
        RadioState::CcaBeforeTx,
        RadioState::TxFrame,
        RadioState::RxAck,
        RadioState::EnergyDetection,
        RadioState::Cca,
        RadioState::ContinuousCarrier,
    ];

    pub fn is_sleep(&self) -> bool {
        match self {
            RadioState::Disabling | RadioState::Sleep => true,
            _ => false,
        }
    }

    /// States reached by `receive()`, including the reception of a frame and
    /// its acknowledgment.
    pub fn is_receive(&self) -> bool {
        match self {
            RadioState::WaitingTimeslot
            | RadioState::WaitingRxFrame
            | RadioState::RxHeader
            | RadioState::RxFrame
            | RadioState::TxAck => true,
            _ => false,
        }
    }

    /// States during which a transmit job is held.
    pub fn is_transmit(&self) -> bool {
        match self {
            RadioState::CcaBeforeTx | RadioState::TxFrame | RadioState::RxAck => true,
            _ => false,
        }
    }

    /// Receive states that another procedure may preempt: nothing has been
    /// accepted yet, so nothing is lost.
    pub fn is_idle_receive(&self) -> bool {
        match self {
            RadioState::WaitingTimeslot | RadioState::WaitingRxFrame | RadioState::RxHeader => true,
            _ => false,
        }
    }

    pub fn need(&self) -> RadioNeed {
        match self {
            RadioState::Disabling | RadioState::Sleep => RadioNeed::None,
            RadioState::WaitingTimeslot | RadioState::WaitingRxFrame => RadioNeed::Idle,
            _ => RadioNeed::Active,
        }
    }
}

/// Procedures that survive a timeslot revocation and are resumed on the next
/// grant. Reception is always resumed and a transmission is always aborted,
/// so neither appears here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Procedure {
    EnergyDetection,
    Cca,
    ContinuousCarrier,
}

/// A request that could not be serviced when it was made.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PendingRequest {
    /// Start listening as soon as a receive buffer is handed back.
    ReceiveOnBufferFree,
    /// Resume the procedure once the timeslot is granted again.
    Resume(Procedure),
}

/// Configuration updates waiting for the radio to become idle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PendingConfig {
    pub channel: bool,
    pub cca: bool,
}

#[cfg(test)]
mod test {
    use super::RadioState;
    use kernel::hil::timeslot::RadioNeed;

    #[test]
    fn families_are_disjoint() {
        for state in RadioState::ALL {
            let families = [state.is_sleep(), state.is_receive(), state.is_transmit()]
                .iter()
                .filter(|f| **f)
                .count();
            assert!(families <= 1, "{:?} in more than one family", state);
        }
    }

    #[test]
    fn idle_receive_is_receive() {
        for state in RadioState::ALL {
            if state.is_idle_receive() {
                assert!(state.is_receive());
            }
        }
    }

    #[test]
    fn need_reflects_activity() {
        assert_eq!(RadioState::Sleep.need(), RadioNeed::None);
        assert_eq!(RadioState::WaitingRxFrame.need(), RadioNeed::Idle);
        assert_eq!(RadioState::RxFrame.need(), RadioNeed::Active);
        assert_eq!(RadioState::ContinuousCarrier.need(), RadioNeed::Active);
    }
}
