// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2023.

//! PHY and MAC information base.
//!
//! Runtime parameters of the radio: the channel and transmit power, the
//! addresses used by the frame filter, how received frames are acknowledged,
//! the CCA configuration, and the acknowledgment timeout. The FSM reads these
//! values when it arms the hardware. Changing the channel or the CCA
//! configuration of a running radio must go through
//! [`RadioFsm::set_channel`](crate::fsm::RadioFsm::set_channel) and
//! [`RadioFsm::set_cca_config`](crate::fsm::RadioFsm::set_cca_config) so the
//! hardware is updated at the right moment.

use core::cell::Cell;

use kernel::hil::radio::CcaConfig;
use kernel::ErrorCode;

pub const MIN_CHANNEL: u8 = 11;
pub const MAX_CHANNEL: u8 = 26;
pub const DEFAULT_CHANNEL: u8 = 11;

pub const MIN_TX_POWER: i8 = -40;
pub const MAX_TX_POWER: i8 = 8;

/// PAN ID and short address value that matches every device.
pub const BROADCAST: u16 = 0xffff;

/// 802.15.4 symbol duration on the 2.4 GHz O-QPSK PHY.
pub const SYMBOL_US: u32 = 16;
/// macAckWaitDuration for the 2.4 GHz O-QPSK PHY, 54 symbols.
pub const DEFAULT_ACK_TIMEOUT_US: u32 = 54 * SYMBOL_US;

pub struct Pib {
    channel: Cell<u8>,
    tx_power: Cell<i8>,
    pan_id: Cell<u16>,
    short_address: Cell<u16>,
    extended_address: Cell<[u8; 8]>,
    pan_coordinator: Cell<bool>,
    promiscuous: Cell<bool>,
    auto_ack: Cell<bool>,
    pending_bit: Cell<bool>,
    cca: Cell<CcaConfig>,
    ack_timeout_us: Cell<u32>,
}

impl Pib {
    pub fn new() -> Pib {
        Pib {
            channel: Cell::new(DEFAULT_CHANNEL),
            tx_power: Cell::new(0),
            pan_id: Cell::new(BROADCAST),
            short_address: Cell::new(BROADCAST),
            extended_address: Cell::new([0; 8]),
            pan_coordinator: Cell::new(false),
            promiscuous: Cell::new(false),
            auto_ack: Cell::new(true),
            pending_bit: Cell::new(false),
            cca: Cell::new(CcaConfig::default()),
            ack_timeout_us: Cell::new(DEFAULT_ACK_TIMEOUT_US),
        }
    }

    pub fn channel(&self) -> u8 {
        self.channel.get()
    }

    /// Only channels of the 2.4 GHz band (11 to 26) are accepted.
    pub fn set_channel(&self, channel: u8) -> Result<(), ErrorCode> {
        if channel < MIN_CHANNEL || channel > MAX_CHANNEL {
            return Err(ErrorCode::INVAL);
        }
        self.channel.set(channel);
        Ok(())
    }

    pub fn tx_power(&self) -> i8 {
        self.tx_power.get()
    }

    pub fn set_tx_power(&self, power: i8) -> Result<(), ErrorCode> {
        if power < MIN_TX_POWER || power > MAX_TX_POWER {
            return Err(ErrorCode::INVAL);
        }
        self.tx_power.set(power);
        Ok(())
    }

    pub fn pan_id(&self) -> u16 {
        self.pan_id.get()
    }

    pub fn set_pan_id(&self, pan_id: u16) {
        self.pan_id.set(pan_id);
    }

    pub fn short_address(&self) -> u16 {
        self.short_address.get()
    }

    pub fn set_short_address(&self, address: u16) {
        self.short_address.set(address);
    }

    /// Extended address in over-the-air (little endian) byte order.
    pub fn extended_address(&self) -> [u8; 8] {
        self.extended_address.get()
    }

    pub fn set_extended_address(&self, address: [u8; 8]) {
        self.extended_address.set(address);
    }

    /// A PAN coordinator accepts frames that carry no destination address.
    pub fn pan_coordinator(&self) -> bool {
        self.pan_coordinator.get()
    }

    pub fn set_pan_coordinator(&self, enabled: bool) {
        self.pan_coordinator.set(enabled);
    }

    /// In promiscuous mode every frame with a valid FCS is delivered and no
    /// acknowledgments are sent.
    pub fn promiscuous(&self) -> bool {
        self.promiscuous.get()
    }

    pub fn set_promiscuous(&self, enabled: bool) {
        self.promiscuous.set(enabled);
    }

    /// Whether received frames requesting an acknowledgment get one.
    pub fn auto_ack(&self) -> bool {
        self.auto_ack.get()
    }

    pub fn set_auto_ack(&self, enabled: bool) {
        self.auto_ack.set(enabled);
    }

    /// Frame pending bit set in outgoing acknowledgments, used by a
    /// coordinator holding data for polling devices.
    pub fn pending_bit(&self) -> bool {
        self.pending_bit.get()
    }

    pub fn set_pending_bit(&self, pending: bool) {
        self.pending_bit.set(pending);
    }

    pub fn cca_config(&self) -> CcaConfig {
        self.cca.get()
    }

    pub fn set_cca_config(&self, config: CcaConfig) {
        self.cca.set(config);
    }

    pub fn ack_timeout_us(&self) -> u32 {
        self.ack_timeout_us.get()
    }

    pub fn set_ack_timeout_us(&self, timeout_us: u32) -> Result<(), ErrorCode> {
        if timeout_us == 0 {
            return Err(ErrorCode::INVAL);
        }
        self.ack_timeout_us.set(timeout_us);
        Ok(())
    }
}
