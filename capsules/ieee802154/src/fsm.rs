// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2023.

//! Operating-mode state machine of an IEEE 802.15.4 radio.
//!
//! The FSM sequences a [`Transceiver`] through sleep, receive, transmit,
//! energy detection, clear channel assessment and continuous carrier. Higher
//! layers call one of the six transition requests; the hardware interrupt
//! (through [`RadioFsm::irq_handler`]) and the timeslot arbiter (through
//! [`TimeslotClient`]) then drive the FSM through the intermediate states of
//! the procedure until it settles again.
//!
//! ```text
//!             receive()                   grant + buffer
//!   Sleep -------------> WaitingTimeslot ----------------> WaitingRxFrame
//!     ^                                                      |  ^
//!     | disabled                                 frame start |  | reject / done
//!     |                                                      v  |
//!   Disabling <--- sleep()                      RxHeader -> RxFrame -> TxAck
//!
//!   transmit():  CcaBeforeTx -> TxFrame -> RxAck -> receive
//!   energy_detection(), cca(), continuous_carrier() -> receive when done
//! ```
//!
//! Every request and every event runs inside the FSM critical section, which
//! masks the radio interrupt and holds back arbiter notifications. Requests
//! never block. A request that is illegal in the current state fails with
//! `BUSY` (or `ALREADY` when it targets the current stable mode) and leaves
//! the state untouched.
//!
//! Usage
//! -----
//!
//! ```rust,ignore
//! let fsm = static_init!(
//!     RadioFsm<'static, Radio, SinglePhyArbiter<'static>>,
//!     RadioFsm::new(radio, arbiter, pool, pib, ack_buf)
//! );
//! arbiter.set_client(fsm);
//! fsm.set_transmit_client(mac);
//! fsm.set_receive_client(mac);
//! fsm.init();
//! fsm.receive()?;
//! ```

use core::cell::Cell;

use kernel::debug;
use kernel::hil::radio::{
    CcaClient, CcaConfig, EnergyClient, Event, RxBufferPool, RxClient, Transceiver, TxClient,
    FCS_SIZE, MAX_FRAME_SIZE, PHR_SIZE,
};
use kernel::hil::timeslot::{RadioNeed, TimeslotArbiter, TimeslotClient};
use kernel::utilities::cells::{OptionalCell, TakeCell};
use kernel::ErrorCode;

use crate::config::CONFIG;
use crate::critical_section::CriticalSection;
use crate::frame::{self, Filter};
use crate::pib::Pib;
use crate::state::{PendingConfig, PendingRequest, Procedure, RadioState};

/// A transmittable frame fits its buffer and is long enough to carry a frame
/// control field, a sequence number and the FCS.
fn valid_frame(buf: &[u8]) -> bool {
    match buf.get(0) {
        Some(&len) => {
            let len = usize::from(len);
            len >= frame::MIN_HEADER_SIZE + FCS_SIZE
                && len <= MAX_FRAME_SIZE
                && PHR_SIZE + len <= buf.len()
        }
        None => false,
    }
}

pub struct RadioFsm<'a, T: Transceiver, A: TimeslotArbiter<'a>> {
    radio: &'a T,
    arbiter: &'a A,
    pool: &'a dyn RxBufferPool,
    pib: &'a Pib,

    state: Cell<RadioState>,
    pending: OptionalCell<PendingRequest>,
    pending_config: Cell<PendingConfig>,
    timeslot_granted: Cell<bool>,
    critical_section: CriticalSection,

    rx_buf: TakeCell<'static, [u8]>,
    rx_header_bytes: Cell<usize>,
    ack_buf: TakeCell<'static, [u8]>,
    /// Frame handed to `transmit`, held until the procedure completes.
    tx_buf: TakeCell<'static, [u8]>,
    tx_cca: Cell<bool>,

    ed_time_left: Cell<u32>,
    ed_run_us: Cell<u32>,
    ed_level: Cell<u8>,

    tx_client: OptionalCell<&'a dyn TxClient>,
    rx_client: OptionalCell<&'a dyn RxClient>,
    energy_client: OptionalCell<&'a dyn EnergyClient>,
    cca_client: OptionalCell<&'a dyn CcaClient>,
}

impl<'a, T: Transceiver, A: TimeslotArbiter<'a>> RadioFsm<'a, T, A> {
    /// `ack_buf` must be at least `MAX_BUF_SIZE` bytes: it holds outgoing
    /// acknowledgments and receives incoming ones.
    pub fn new(
        radio: &'a T,
        arbiter: &'a A,
        pool: &'a dyn RxBufferPool,
        pib: &'a Pib,
        ack_buf: &'static mut [u8],
    ) -> RadioFsm<'a, T, A> {
        RadioFsm {
            radio,
            arbiter,
            pool,
            pib,
            state: Cell::new(RadioState::Sleep),
            pending: OptionalCell::empty(),
            pending_config: Cell::new(PendingConfig::default()),
            timeslot_granted: Cell::new(false),
            critical_section: CriticalSection::new(),
            rx_buf: TakeCell::empty(),
            rx_header_bytes: Cell::new(frame::MIN_HEADER_SIZE),
            ack_buf: TakeCell::new(ack_buf),
            tx_buf: TakeCell::empty(),
            tx_cca: Cell::new(false),
            ed_time_left: Cell::new(0),
            ed_run_us: Cell::new(0),
            ed_level: Cell::new(0),
            tx_client: OptionalCell::empty(),
            rx_client: OptionalCell::empty(),
            energy_client: OptionalCell::empty(),
            cca_client: OptionalCell::empty(),
        }
    }

    pub fn set_transmit_client(&self, client: &'a dyn TxClient) {
        self.tx_client.set(client);
    }

    pub fn set_receive_client(&self, client: &'a dyn RxClient) {
        self.rx_client.set(client);
    }

    pub fn set_energy_client(&self, client: &'a dyn EnergyClient) {
        self.energy_client.set(client);
    }

    pub fn set_cca_client(&self, client: &'a dyn CcaClient) {
        self.cca_client.set(client);
    }

    pub fn current_state(&self) -> RadioState {
        self.state.get()
    }

    pub fn radio_need(&self) -> RadioNeed {
        self.state.get().need()
    }

    pub fn pib(&self) -> &Pib {
        self.pib
    }

    /// Run `f` with the radio interrupt masked and arbiter notifications
    /// held back. Requests made from inside `f` nest.
    pub fn critical_section<R>(&self, f: impl FnOnce() -> R) -> R {
        self.critical_section.with(self.radio, self.arbiter, f)
    }

    /// Power the transceiver up, load the PIB into it and enter `Sleep`.
    /// Called again on a running radio, it first tears down whatever is in
    /// progress as `deinit` does.
    pub fn init(&self) {
        self.critical_section(|| {
            if !self.state.get().is_sleep() {
                self.teardown();
            }
            self.radio.power_on();
            self.radio.set_channel(self.pib.channel());
            self.radio.set_tx_power(self.pib.tx_power());
            self.radio.set_cca_config(self.pib.cca_config());
            self.pending_config.set(PendingConfig::default());
            self.state_set(RadioState::Sleep);
        });
    }

    /// Force the radio off from any state. A transmission or an ED or CCA
    /// request in progress completes with `CANCEL`.
    pub fn deinit(&self) {
        self.critical_section(|| {
            self.teardown();
            self.radio.power_off();
        });
    }

    /// Change the channel. A receiver that is listening is restarted on the
    /// new channel; a procedure in flight finishes on the old one.
    pub fn set_channel(&self, channel: u8) -> Result<(), ErrorCode> {
        self.pib.set_channel(channel)?;
        self.channel_update();
        Ok(())
    }

    pub fn set_cca_config(&self, config: CcaConfig) {
        self.pib.set_cca_config(config);
        self.cca_cfg_update();
    }

    //
    // Transition requests
    //

    /// Release the radio and enter low power mode.
    pub fn sleep(&self) -> Result<(), ErrorCode> {
        self.critical_section(|| {
            let state = self.state.get();
            if state.is_sleep() {
                return Err(ErrorCode::ALREADY);
            }
            if !state.is_idle_receive() {
                return Err(ErrorCode::BUSY);
            }

            self.cancel_pending();
            // In `WaitingTimeslot` the radio is either not ours or already
            // disabled for lack of a receive buffer, so no DISABLED event
            // would follow.
            let granted = self.timeslot_granted.replace(false);
            if granted && state != RadioState::WaitingTimeslot {
                self.radio.disable();
                self.state_set(RadioState::Disabling);
            } else {
                self.sleep_enter();
            }
            self.arbiter.continuous_mode_exit();
            Ok(())
        })
    }

    /// Start listening. A transmission in progress is aborted and completes
    /// with `CANCEL`.
    pub fn receive(&self) -> Result<(), ErrorCode> {
        self.critical_section(|| match self.state.get() {
            RadioState::Sleep => {
                self.leave_sleep();
                Ok(())
            }
            RadioState::WaitingTimeslot => {
                let resuming = self
                    .pending
                    .map_or(false, |pending| matches!(pending, PendingRequest::Resume(_)));
                if resuming {
                    self.cancel_pending();
                }
                Ok(())
            }
            state if state.is_receive() => Ok(()),
            state if state.is_transmit() => {
                self.radio.stop_ack_timer();
                self.radio.disable();
                self.tx_finish(false, Err(ErrorCode::CANCEL));
                Ok(())
            }
            RadioState::ContinuousCarrier => {
                self.radio.disable();
                self.rx_enter();
                Ok(())
            }
            _ => Err(ErrorCode::BUSY),
        })
    }

    /// Transmit `frame` (PHR included), preceded by a clear channel
    /// assessment if `cca` is set. The buffer comes back through
    /// `TxClient::transmit_done`, or in the `Err` if the request fails.
    pub fn transmit(
        &self,
        frame: &'static mut [u8],
        cca: bool,
    ) -> Result<(), (ErrorCode, &'static mut [u8])> {
        self.critical_section(|| {
            if !self.state.get().is_idle_receive() {
                return Err((ErrorCode::BUSY, frame));
            }
            if !self.timeslot_granted.get() {
                return Err((ErrorCode::RESERVE, frame));
            }
            if !valid_frame(frame) {
                return Err((ErrorCode::SIZE, frame));
            }

            self.pending.clear();
            self.apply_pending_config();
            self.radio.set_tx_power(self.pib.tx_power());
            if cca {
                self.state_set(RadioState::CcaBeforeTx);
                self.radio.cca();
            } else {
                self.state_set(RadioState::TxFrame);
                self.radio.transmit(&*frame);
            }
            self.tx_cca.set(cca);
            self.tx_buf.replace(frame);
            Ok(())
        })
    }

    /// Measure the channel energy for at least `time_us` microseconds. The
    /// maximum level seen is reported through `EnergyClient`.
    pub fn energy_detection(&self, time_us: u32) -> Result<(), ErrorCode> {
        if time_us == 0 {
            return Err(ErrorCode::INVAL);
        }
        self.critical_section(|| {
            self.procedure_request()?;
            self.ed_time_left.set(time_us);
            self.ed_run_us.set(0);
            self.ed_level.set(0);
            self.procedure_start(Procedure::EnergyDetection);
            Ok(())
        })
    }

    /// Perform one clear channel assessment, reported through `CcaClient`.
    pub fn cca(&self) -> Result<(), ErrorCode> {
        self.critical_section(|| {
            self.procedure_request()?;
            self.procedure_start(Procedure::Cca);
            Ok(())
        })
    }

    /// Emit an unmodulated carrier until another request supersedes it.
    pub fn continuous_carrier(&self) -> Result<(), ErrorCode> {
        self.critical_section(|| {
            if self.state.get() == RadioState::ContinuousCarrier {
                return Err(ErrorCode::ALREADY);
            }
            self.procedure_request()?;
            self.procedure_start(Procedure::ContinuousCarrier);
            Ok(())
        })
    }

    //
    // Notifications
    //

    /// Hand a receive buffer back to the driver.
    pub fn notify_buffer_free(&self, buf: &'static mut [u8]) {
        self.critical_section(|| {
            let waiting = self.state.get() == RadioState::WaitingTimeslot
                && self
                    .pending
                    .map_or(false, |pending| *pending == PendingRequest::ReceiveOnBufferFree)
                && self.timeslot_granted.get();
            if waiting {
                self.rx_buf.replace(buf);
                self.rx_enter();
            } else {
                self.pool.release(buf);
            }
        });
    }

    /// The channel in the PIB changed.
    pub fn channel_update(&self) {
        self.critical_section(|| {
            let mut pending = self.pending_config.get();
            pending.channel = true;
            self.pending_config.set(pending);
            self.config_update();
        });
    }

    /// The CCA configuration in the PIB changed.
    pub fn cca_cfg_update(&self) {
        self.critical_section(|| {
            let mut pending = self.pending_config.get();
            pending.cca = true;
            self.pending_config.set(pending);
            self.config_update();
        });
    }

    /// Drain and handle every pending hardware event.
    pub fn irq_handler(&self) {
        self.critical_section(|| {
            while let Some(event) = self.radio.take_event() {
                self.dispatch(event);
            }
        });
    }

    /// Handle a single hardware event.
    pub fn handle_event(&self, event: Event) {
        self.critical_section(|| self.dispatch(event));
    }

    //
    // State entry and bookkeeping
    //

    fn state_set(&self, state: RadioState) {
        if CONFIG.trace_radio_events && self.state.get() != state {
            debug!("radio: {:?} -> {:?}", self.state.get(), state);
        }
        self.state.set(state);
    }

    fn apply_pending_config(&self) {
        let pending = self.pending_config.take();
        if pending.channel {
            self.radio.set_channel(self.pib.channel());
        }
        if pending.cca {
            self.radio.set_cca_config(self.pib.cca_config());
        }
    }

    fn config_update(&self) {
        match self.state.get() {
            RadioState::WaitingRxFrame => self.rx_enter(),
            RadioState::ContinuousCarrier => {
                self.apply_pending_config();
                self.radio.continuous_carrier();
            }
            RadioState::WaitingTimeslot if self.timeslot_granted.get() => {
                self.apply_pending_config();
            }
            state => {
                if CONFIG.trace_radio_events {
                    debug!("radio: config update deferred in {:?}", state);
                }
            }
        }
    }

    /// Drop a deferred request. A procedure that never got to run completes
    /// with `CANCEL`.
    fn cancel_pending(&self) {
        match self.pending.take() {
            Some(PendingRequest::Resume(Procedure::EnergyDetection)) => {
                self.report_energy(Err(ErrorCode::CANCEL))
            }
            Some(PendingRequest::Resume(Procedure::Cca)) => self.report_cca(Err(ErrorCode::CANCEL)),
            _ => {}
        }
    }

    fn leave_sleep(&self) {
        self.pending.clear();
        self.state_set(RadioState::WaitingTimeslot);
        self.arbiter.continuous_mode_enter();
    }

    fn sleep_enter(&self) {
        self.rx_buf.take().map(|buf| self.pool.release(buf));
        self.state_set(RadioState::Sleep);
    }

    /// Stop the radio from any state, give up the timeslot and enter
    /// `Sleep`. A transmission or an ED or CCA request in progress completes
    /// with `CANCEL`.
    fn teardown(&self) {
        let state = self.state.get();
        self.radio.stop_ack_timer();
        self.radio.disable();
        if !state.is_sleep() {
            self.arbiter.continuous_mode_exit();
        }
        self.timeslot_granted.set(false);
        self.cancel_pending();
        self.sleep_enter();

        match state {
            RadioState::EnergyDetection => self.report_energy(Err(ErrorCode::CANCEL)),
            RadioState::Cca => self.report_cca(Err(ErrorCode::CANCEL)),
            _ => {}
        }
        if let Some(frame) = self.tx_buf.take() {
            self.tx_client
                .map(|client| client.transmit_done(frame, false, Err(ErrorCode::CANCEL)));
        }
    }

    /// Arm the receiver, or wait in `WaitingTimeslot` for the timeslot or a
    /// free buffer.
    fn rx_enter(&self) {
        if !self.timeslot_granted.get() {
            self.state_set(RadioState::WaitingTimeslot);
            return;
        }

        self.apply_pending_config();
        match self.rx_buf.take().or_else(|| self.pool.acquire()) {
            Some(buf) => {
                self.radio.receive(buf);
                self.rx_buf.replace(buf);
                self.pending.clear();
                self.state_set(RadioState::WaitingRxFrame);
            }
            None => {
                self.radio.disable();
                self.pending.set(PendingRequest::ReceiveOnBufferFree);
                self.state_set(RadioState::WaitingTimeslot);
            }
        }
    }

    /// Check that a procedure may start from the current state. Leaving
    /// `Sleep` requests the timeslot first.
    fn procedure_request(&self) -> Result<(), ErrorCode> {
        let state = self.state.get();
        if state == RadioState::Sleep {
            self.leave_sleep();
            Ok(())
        } else if state.is_idle_receive() {
            self.cancel_pending();
            Ok(())
        } else {
            Err(ErrorCode::BUSY)
        }
    }

    /// Start `procedure` now if the timeslot is held, or when it is granted.
    fn procedure_start(&self, procedure: Procedure) {
        if !self.timeslot_granted.get() {
            self.pending.set(PendingRequest::Resume(procedure));
            self.state_set(RadioState::WaitingTimeslot);
            return;
        }

        self.pending.clear();
        self.apply_pending_config();
        match procedure {
            Procedure::EnergyDetection => {
                self.state_set(RadioState::EnergyDetection);
                let run = self.radio.energy_detection(self.ed_time_left.get());
                self.ed_run_us.set(run);
            }
            Procedure::Cca => {
                self.state_set(RadioState::Cca);
                self.radio.cca();
            }
            Procedure::ContinuousCarrier => {
                self.state_set(RadioState::ContinuousCarrier);
                self.radio.set_tx_power(self.pib.tx_power());
                self.radio.continuous_carrier();
            }
        }
    }

    /// The timeslot was revoked mid-procedure: resume it on the next grant.
    fn procedure_suspend(&self, procedure: Procedure) {
        self.radio.disable();
        self.pending.set(PendingRequest::Resume(procedure));
        self.state_set(RadioState::WaitingTimeslot);
    }

    //
    // Hardware events
    //

    fn dispatch(&self, event: Event) {
        match (self.state.get(), event) {
            (RadioState::Disabling, Event::Disabled) => self.sleep_enter(),

            (RadioState::WaitingRxFrame, Event::FrameStart) => {
                self.rx_header_bytes.set(frame::MIN_HEADER_SIZE);
                self.state_set(RadioState::RxHeader);
                self.radio.request_header_bytes(frame::MIN_HEADER_SIZE);
            }
            (RadioState::RxHeader, Event::HeaderReceived) => self.rx_header_received(),
            (RadioState::WaitingRxFrame, Event::RxComplete { crc_ok })
            | (RadioState::RxHeader, Event::RxComplete { crc_ok }) => {
                self.rx_short_frame_received(crc_ok)
            }
            (RadioState::RxFrame, Event::RxComplete { crc_ok }) => self.rx_frame_received(crc_ok),
            (RadioState::TxAck, Event::TxComplete) => self.rx_deliver(),

            (RadioState::CcaBeforeTx, Event::CcaComplete { idle }) => self.tx_cca_done(idle),
            (RadioState::TxFrame, Event::TxComplete) => self.tx_frame_sent(),
            (RadioState::RxAck, Event::AckReceived { crc_ok }) => self.tx_ack_received(crc_ok),
            (RadioState::RxAck, Event::AckTimeout) => self.tx_finish(false, Err(ErrorCode::NOACK)),

            (RadioState::EnergyDetection, Event::EdComplete { level }) => self.ed_done(level),
            (RadioState::Cca, Event::CcaComplete { idle }) => {
                self.rx_enter();
                self.report_cca(Ok(idle));
            }

            (state, event) => {
                if CONFIG.trace_radio_events {
                    debug!("radio: ignored {:?} in {:?}", event, state);
                }
            }
        }
    }

    fn rx_header_received(&self) {
        let received = self.rx_header_bytes.get();
        let decision = self
            .rx_buf
            .map(|buf| frame::filter(&buf[PHR_SIZE..], received, self.pib));
        match decision {
            Some(Filter::Accept) => self.state_set(RadioState::RxFrame),
            Some(Filter::NeedMore(bytes)) => {
                self.rx_header_bytes.set(bytes);
                self.radio.request_header_bytes(bytes);
            }
            Some(Filter::Reject) | None => self.rx_enter(),
        }
    }

    /// A frame completed before its header was checked.
    fn rx_short_frame_received(&self, crc_ok: bool) {
        if !crc_ok {
            self.rx_enter();
            return;
        }
        let decision = self.rx_buf.map(|buf| {
            let len = usize::from(buf[0]).saturating_sub(FCS_SIZE);
            frame::filter(&buf[PHR_SIZE..], len, self.pib)
        });
        match decision {
            Some(Filter::Accept) => self.rx_frame_received(true),
            _ => self.rx_enter(),
        }
    }

    fn rx_frame_received(&self, crc_ok: bool) {
        if !crc_ok {
            self.rx_enter();
            self.rx_client
                .map(|client| client.receive_failed(ErrorCode::FAIL));
            return;
        }

        let ack_seq = if self.pib.auto_ack() && !self.pib.promiscuous() {
            self.rx_buf.and_then(|buf| {
                let psdu = &buf[PHR_SIZE..];
                if frame::ack_requested(psdu) {
                    frame::sequence_number(psdu)
                } else {
                    None
                }
            })
        } else {
            None
        };

        let acking = ack_seq.and_then(|seq| {
            self.ack_buf.map(|ack| {
                frame::write_ack(ack, seq, self.pib.pending_bit());
                self.radio.transmit(ack);
            })
        });
        if acking.is_some() {
            self.state_set(RadioState::TxAck);
        } else {
            self.rx_deliver();
        }
    }

    /// Hand the received frame to the client and listen again.
    fn rx_deliver(&self) {
        let buf = self.rx_buf.take();
        self.rx_enter();
        if let Some(buf) = buf {
            let frame_len = usize::from(buf[0]).saturating_sub(FCS_SIZE);
            match self.rx_client.map(|client| *client) {
                Some(client) => client.receive(buf, frame_len),
                None => self.pool.release(buf),
            }
        }
    }

    fn tx_cca_done(&self, idle: bool) {
        if !idle {
            self.tx_finish(false, Err(ErrorCode::BUSY));
            return;
        }
        let sent = self.tx_buf.map(|frame| {
            self.state_set(RadioState::TxFrame);
            self.radio.transmit(frame);
        });
        if sent.is_none() {
            self.rx_enter();
        }
    }

    /// Sequence number of the frame being transmitted, if it requests an
    /// acknowledgment.
    fn tx_ack_seq(&self) -> Option<u8> {
        self.tx_buf.and_then(|frame| {
            let psdu = &frame[PHR_SIZE..];
            if frame::ack_requested(psdu) {
                frame::sequence_number(psdu)
            } else {
                None
            }
        })
    }

    fn tx_frame_sent(&self) {
        if self.tx_ack_seq().is_none() {
            self.tx_finish(false, Ok(()));
            return;
        }
        let armed = self.ack_buf.map(|ack| {
            ack[0] = 0;
            self.radio.receive_ack(ack);
        });
        if armed.is_some() {
            self.state_set(RadioState::RxAck);
            self.radio.start_ack_timer(self.pib.ack_timeout_us());
        } else {
            self.tx_finish(false, Ok(()));
        }
    }

    fn tx_ack_received(&self, crc_ok: bool) {
        let matched = match self.tx_ack_seq() {
            Some(seq) if crc_ok => self.ack_buf.map(|ack| frame::is_ack_for(ack, seq)),
            _ => None,
        };
        if matched == Some(true) {
            self.radio.stop_ack_timer();
            self.tx_finish(true, Ok(()));
        } else {
            // Not our acknowledgment; keep listening until the timer fires.
            self.ack_buf.map(|ack| self.radio.receive_ack(ack));
        }
    }

    /// Release the transmit job to its client and return to receive.
    fn tx_finish(&self, acked: bool, result: Result<(), ErrorCode>) {
        let frame = self.tx_buf.take();
        self.rx_enter();
        if let Some(frame) = frame {
            if CONFIG.trace_radio_events {
                debug!(
                    "radio: tx done cca={} acked={} {:?}",
                    self.tx_cca.get(),
                    acked,
                    result
                );
            }
            self.tx_client
                .map(|client| client.transmit_done(frame, acked, result));
        }
    }

    fn ed_done(&self, level: u8) {
        self.ed_level.set(self.ed_level.get().max(level));
        let run = self.ed_run_us.get();
        let left = self.ed_time_left.get().saturating_sub(run);
        self.ed_time_left.set(left);

        if left > 0 && run > 0 {
            let run = self.radio.energy_detection(left);
            self.ed_run_us.set(run);
        } else {
            let level = self.ed_level.get();
            self.rx_enter();
            self.report_energy(Ok(level));
        }
    }

    fn report_energy(&self, result: Result<u8, ErrorCode>) {
        self.energy_client
            .map(|client| client.energy_detected(result));
    }

    fn report_cca(&self, result: Result<bool, ErrorCode>) {
        self.cca_client.map(|client| client.cca_done(result));
    }
}

impl<'a, T: Transceiver, A: TimeslotArbiter<'a>> TimeslotClient for RadioFsm<'a, T, A> {
    fn timeslot_started(&self) {
        self.critical_section(|| {
            if self.state.get().is_sleep() {
                return;
            }
            self.timeslot_granted.set(true);
            if self.state.get() == RadioState::WaitingTimeslot {
                let resume = self.pending.and_then(|pending| match pending {
                    PendingRequest::Resume(procedure) => Some(procedure),
                    PendingRequest::ReceiveOnBufferFree => None,
                });
                match resume {
                    Some(procedure) => self.procedure_start(procedure),
                    None => self.rx_enter(),
                }
            }
        });
    }

    fn timeslot_ended(&self) {
        self.critical_section(|| {
            let state = self.state.get();
            if state.is_sleep() {
                return;
            }
            self.timeslot_granted.set(false);
            // The radio may be reconfigured by whoever uses it next.
            self.pending_config.set(PendingConfig {
                channel: true,
                cca: true,
            });

            match state {
                RadioState::WaitingRxFrame | RadioState::RxHeader | RadioState::RxFrame => {
                    self.radio.disable();
                    self.state_set(RadioState::WaitingTimeslot);
                }
                RadioState::TxAck => {
                    // The frame itself is complete, only its ACK is lost.
                    self.radio.disable();
                    self.rx_deliver();
                }
                RadioState::CcaBeforeTx | RadioState::TxFrame | RadioState::RxAck => {
                    self.radio.stop_ack_timer();
                    self.radio.disable();
                    self.tx_finish(false, Err(ErrorCode::CANCEL));
                }
                RadioState::EnergyDetection => self.procedure_suspend(Procedure::EnergyDetection),
                RadioState::Cca => self.procedure_suspend(Procedure::Cca),
                RadioState::ContinuousCarrier => {
                    self.procedure_suspend(Procedure::ContinuousCarrier)
                }
                RadioState::WaitingTimeslot | RadioState::Sleep | RadioState::Disabling => {}
            }
        });
    }

    fn radio_need(&self) -> RadioNeed {
        self.state.get().need()
    }
}
