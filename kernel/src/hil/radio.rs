// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Hardware interface for IEEE 802.15.4 transceivers.
//!
//! The [`Transceiver`] trait is the capability set a chip exposes to the
//! radio operating-mode FSM: power, PHY configuration, one entry point per
//! radio procedure, an acknowledgment timer, interrupt masking, and
//! [`Transceiver::take_event`], which demultiplexes the pending hardware
//! interrupt into an [`Event`].
//!
//! Buffers handed to the transceiver use the PHY layout:
//!
//! ```text
//! +-----+---------------------------------------+-----+
//! | PHR | MHR ... MAC payload                   | FCS |
//! +-----+---------------------------------------+-----+
//!   1B    buf[0] bytes in total, FCS included     2B
//! ```
//!
//! The first byte is the PHY header (frame length including the FCS) and the
//! PSDU follows. The FCS is computed and checked by the hardware, so its two
//! bytes are never written by software.

use crate::ErrorCode;

/// Size of the PHY header (the length byte).
pub const PHR_SIZE: usize = 1;
/// Size of the frame check sequence appended by the hardware.
pub const FCS_SIZE: usize = 2;
/// Largest PSDU allowed by 802.15.4 (aMaxPhyPacketSize).
pub const MAX_FRAME_SIZE: usize = 127;
/// Buffers used for reception or transmission must be at least this long.
pub const MAX_BUF_SIZE: usize = PHR_SIZE + MAX_FRAME_SIZE;

/// Hardware events delivered to the FSM, one at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    /// The radio finished ramping down after [`Transceiver::disable`].
    Disabled,
    /// Start of frame delimiter received.
    FrameStart,
    /// The number of PSDU bytes requested with
    /// [`Transceiver::request_header_bytes`] has arrived.
    HeaderReceived,
    /// A frame was received after [`Transceiver::receive`].
    RxComplete { crc_ok: bool },
    /// The frame passed to [`Transceiver::transmit`] has left the antenna.
    TxComplete,
    /// A frame was received after [`Transceiver::receive_ack`].
    AckReceived { crc_ok: bool },
    /// The timer started with [`Transceiver::start_ack_timer`] expired.
    AckTimeout,
    /// An energy detection run finished with the given level.
    EdComplete { level: u8 },
    /// A clear channel assessment finished.
    CcaComplete { idle: bool },
}

/// Clear channel assessment modes defined by 802.15.4.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CcaMode {
    /// Busy if the energy is above the ED threshold.
    EnergyAboveThreshold,
    /// Busy if an 802.15.4 signal is detected.
    CarrierSense,
    /// Busy if both conditions hold.
    CarrierAndEnergy,
    /// Busy if either condition holds.
    CarrierOrEnergy,
}

/// Parameters of the clear channel assessment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CcaConfig {
    pub mode: CcaMode,
    pub ed_threshold: u8,
    pub corr_threshold: u8,
    pub corr_limit: u8,
}

impl Default for CcaConfig {
    fn default() -> Self {
        CcaConfig {
            mode: CcaMode::EnergyAboveThreshold,
            ed_threshold: 0x2d,
            corr_threshold: 0x2d,
            corr_limit: 0x02,
        }
    }
}

/// An 802.15.4 transceiver as seen by the operating-mode FSM.
///
/// All procedure entry points may be called while another procedure is
/// running; the implementation is responsible for bringing the radio to the
/// disabled state before starting the new one. None of the methods block
/// beyond such a ramp-down.
pub trait Transceiver {
    /// Power up the peripheral and load the 802.15.4 mode configuration.
    fn power_on(&self);
    /// Stop everything and cut power to the peripheral.
    fn power_off(&self);

    /// Tune to an 802.15.4 channel (11 to 26).
    fn set_channel(&self, channel: u8);
    /// Set the transmit power in dBm.
    fn set_tx_power(&self, power: i8);
    fn set_cca_config(&self, config: CcaConfig);

    /// Ramp up the receiver and capture the next frame into `buf`.
    ///
    /// `buf` must stay valid until the frame completes or the radio is
    /// disabled.
    fn receive(&self, buf: &mut [u8]);
    /// Like `receive`, but the completion is reported as
    /// [`Event::AckReceived`].
    fn receive_ack(&self, buf: &mut [u8]);
    /// Raise [`Event::HeaderReceived`] once `bytes` bytes of the PSDU of the
    /// frame being received are in memory.
    fn request_header_bytes(&self, bytes: usize);
    /// Transmit the frame in `buf`. The CCA, if any, has already been done.
    fn transmit(&self, buf: &[u8]);
    /// Perform a single clear channel assessment.
    fn cca(&self);
    /// Start measuring energy for at least `time_us`. Returns the time the
    /// hardware will actually cover, which may be shorter than requested
    /// when the detection window is limited.
    fn energy_detection(&self, time_us: u32) -> u32;
    /// Emit an unmodulated carrier until disabled.
    fn continuous_carrier(&self);
    /// Abort the current procedure and ramp down. Completion is reported
    /// with [`Event::Disabled`].
    fn disable(&self);

    /// Start the acknowledgment timeout.
    fn start_ack_timer(&self, time_us: u32);
    fn stop_ack_timer(&self);

    /// Hold off the radio interrupt.
    fn mask_interrupts(&self);
    /// Re-enable the radio interrupt masked with `mask_interrupts`.
    fn unmask_interrupts(&self);
    /// Return and clear the next pending event, if any.
    fn take_event(&self) -> Option<Event>;
}

/// Pool of receive buffers shared between the FSM and higher layers.
pub trait RxBufferPool {
    /// Take a free buffer out of the pool.
    fn acquire(&self) -> Option<&'static mut [u8]>;
    /// Return a buffer to the pool.
    fn release(&self, buf: &'static mut [u8]);
    /// Number of buffers currently free.
    fn available(&self) -> usize;
}

/// Completion of a transmission.
pub trait TxClient {
    /// `buf` is the frame passed to transmit. `acked` is true if an
    /// acknowledgment was requested and received. `result` is `Err(BUSY)`
    /// when the channel was busy, `Err(NOACK)` when no acknowledgment arrived
    /// in time, and `Err(CANCEL)` when the transmission was superseded or the
    /// radio was revoked.
    fn transmit_done(&self, buf: &'static mut [u8], acked: bool, result: Result<(), ErrorCode>);
}

/// Delivery of received frames.
pub trait RxClient {
    /// `buf` holds the received PSDU after the PHR; its first `frame_len`
    /// bytes are the MAC frame, FCS excluded. The buffer must be handed back
    /// to the driver once it has been consumed.
    fn receive(&self, buf: &'static mut [u8], frame_len: usize);
    /// A frame was received but dropped.
    fn receive_failed(&self, error: ErrorCode);
}

/// Completion of an energy detection request.
pub trait EnergyClient {
    fn energy_detected(&self, result: Result<u8, ErrorCode>);
}

/// Completion of a standalone clear channel assessment. `Ok(true)` means the
/// channel is idle.
pub trait CcaClient {
    fn cca_done(&self, result: Result<bool, ErrorCode>);
}
