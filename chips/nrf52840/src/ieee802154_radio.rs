// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! IEEE 802.15.4 transceiver for the nRF52840 RADIO peripheral.
//!
//! Implements [`Transceiver`] on top of the RADIO registers and one TIMER
//! instance used for the acknowledgment timeout. Each procedure is armed
//! with a set of shortcuts and a set of interrupts:
//!
//! | procedure          | task  | shortcuts                            | interrupts          |
//! |--------------------|-------|--------------------------------------|---------------------|
//! | receive            | RXEN  | RXREADY_START, FRAMESTART_BCSTART    | FRAMESTART, BCMATCH, END |
//! | receive ACK        | RXEN  | RXREADY_START                        | END                 |
//! | transmit           | TXEN  | TXREADY_START                        | PHYEND              |
//! | CCA                | RXEN  | RXREADY_CCASTART                     | CCAIDLE, CCABUSY    |
//! | energy detection   | RXEN  | READY_EDSTART                        | EDEND               |
//! | continuous carrier | TXEN  | none (no START, unmodulated carrier) | none                |
//! | disable            | DISABLE | none                               | DISABLED            |
//!
//! The radio must be disabled before a new procedure is armed. This driver
//! waits for the ramp-down (a few microseconds) before arming, so callers can
//! switch procedures at any time.
//!
//! The board routes both the RADIO interrupt (1) and the interrupt of the
//! acknowledgment timer (TIMER0 is 8) to the radio FSM. Interrupt masking
//! only touches the INTEN registers; events keep latching and are picked up
//! by [`Transceiver::take_event`] once the FSM looks again.

use core::cell::Cell;

use kernel::hil::radio::{CcaConfig, CcaMode, Event, Transceiver, MAX_FRAME_SIZE, PHR_SIZE};
use kernel::utilities::registers::interfaces::{Readable, Writeable};
use kernel::utilities::registers::{
    register_bitfields, register_structs, Field, FieldValue, LocalRegisterCopy, ReadOnly,
    ReadWrite, WriteOnly,
};
use kernel::utilities::StaticRef;

register_structs! {
    RadioRegisters {
        (0x000 => task_txen: WriteOnly<u32, TASK::Register>),
        (0x004 => task_rxen: WriteOnly<u32, TASK::Register>),
        (0x008 => task_start: WriteOnly<u32, TASK::Register>),
        (0x00C => task_stop: WriteOnly<u32, TASK::Register>),
        (0x010 => task_disable: WriteOnly<u32, TASK::Register>),
        (0x014 => _reserved0),
        (0x024 => task_edstart: WriteOnly<u32, TASK::Register>),
        (0x028 => task_edstop: WriteOnly<u32, TASK::Register>),
        (0x02C => task_ccastart: WriteOnly<u32, TASK::Register>),
        (0x030 => task_ccastop: WriteOnly<u32, TASK::Register>),
        (0x034 => _reserved1),
        (0x100 => event_ready: ReadWrite<u32, EVENT::Register>),
        (0x104 => _reserved2),
        (0x10C => event_end: ReadWrite<u32, EVENT::Register>),
        (0x110 => event_disabled: ReadWrite<u32, EVENT::Register>),
        (0x114 => _reserved3),
        (0x128 => event_bcmatch: ReadWrite<u32, EVENT::Register>),
        (0x12C => _reserved4),
        (0x138 => event_framestart: ReadWrite<u32, EVENT::Register>),
        (0x13C => event_edend: ReadWrite<u32, EVENT::Register>),
        (0x140 => _reserved5),
        (0x144 => event_ccaidle: ReadWrite<u32, EVENT::Register>),
        (0x148 => event_ccabusy: ReadWrite<u32, EVENT::Register>),
        (0x14C => _reserved6),
        (0x16C => event_phyend: ReadWrite<u32, EVENT::Register>),
        (0x170 => _reserved7),
        (0x200 => shorts: ReadWrite<u32, SHORTS::Register>),
        (0x204 => _reserved8),
        (0x304 => intenset: ReadWrite<u32, INTEN::Register>),
        (0x308 => intenclr: ReadWrite<u32, INTEN::Register>),
        (0x30C => _reserved9),
        (0x400 => crcstatus: ReadOnly<u32, CRCSTATUS::Register>),
        (0x404 => _reserved10),
        (0x504 => packetptr: ReadWrite<u32>),
        (0x508 => frequency: ReadWrite<u32, FREQUENCY::Register>),
        (0x50C => txpower: ReadWrite<u32, TXPOWER::Register>),
        (0x510 => mode: ReadWrite<u32, MODE::Register>),
        (0x514 => pcnf0: ReadWrite<u32, PCNF0::Register>),
        (0x518 => pcnf1: ReadWrite<u32, PCNF1::Register>),
        (0x51C => _reserved11),
        (0x534 => crccnf: ReadWrite<u32, CRCCNF::Register>),
        (0x538 => crcpoly: ReadWrite<u32>),
        (0x53C => crcinit: ReadWrite<u32>),
        (0x540 => _reserved12),
        (0x550 => state: ReadOnly<u32, STATE::Register>),
        (0x554 => _reserved13),
        (0x560 => bcc: ReadWrite<u32>),
        (0x564 => _reserved14),
        (0x650 => modecnf0: ReadWrite<u32, MODECNF0::Register>),
        (0x654 => _reserved15),
        (0x664 => edcnt: ReadWrite<u32, EDCNT::Register>),
        (0x668 => edsample: ReadOnly<u32, EDSAMPLE::Register>),
        (0x66C => ccactrl: ReadWrite<u32, CCACTRL::Register>),
        (0x670 => _reserved16),
        (0xFFC => power: ReadWrite<u32, POWER::Register>),
        (0x1000 => @END),
    },

    TimerRegisters {
        (0x000 => task_start: WriteOnly<u32, TASK::Register>),
        (0x004 => task_stop: WriteOnly<u32, TASK::Register>),
        (0x008 => _reserved0),
        (0x00C => task_clear: WriteOnly<u32, TASK::Register>),
        (0x010 => _reserved1),
        (0x140 => event_compare: [ReadWrite<u32, EVENT::Register>; 6]),
        (0x158 => _reserved2),
        (0x200 => shorts: ReadWrite<u32, TIMER_SHORTS::Register>),
        (0x204 => _reserved3),
        (0x304 => intenset: ReadWrite<u32, TIMER_INTEN::Register>),
        (0x308 => intenclr: ReadWrite<u32, TIMER_INTEN::Register>),
        (0x30C => _reserved4),
        (0x504 => mode: ReadWrite<u32, TIMER_MODE::Register>),
        (0x508 => bitmode: ReadWrite<u32, TIMER_BITMODE::Register>),
        (0x50C => _reserved5),
        (0x510 => prescaler: ReadWrite<u32, TIMER_PRESCALER::Register>),
        (0x514 => _reserved6),
        (0x540 => cc: [ReadWrite<u32>; 6]),
        (0x558 => @END),
    }
}

register_bitfields! [u32,
    TASK [
        TASK OFFSET(0) NUMBITS(1) []
    ],
    EVENT [
        EVENT OFFSET(0) NUMBITS(1) []
    ],
    SHORTS [
        READY_START OFFSET(0) NUMBITS(1) [],
        END_DISABLE OFFSET(1) NUMBITS(1) [],
        RXREADY_CCASTART OFFSET(11) NUMBITS(1) [],
        FRAMESTART_BCSTART OFFSET(14) NUMBITS(1) [],
        READY_EDSTART OFFSET(15) NUMBITS(1) [],
        TXREADY_START OFFSET(18) NUMBITS(1) [],
        RXREADY_START OFFSET(19) NUMBITS(1) [],
        PHYEND_DISABLE OFFSET(20) NUMBITS(1) []
    ],
    INTEN [
        READY OFFSET(0) NUMBITS(1) [],
        END OFFSET(3) NUMBITS(1) [],
        DISABLED OFFSET(4) NUMBITS(1) [],
        BCMATCH OFFSET(10) NUMBITS(1) [],
        FRAMESTART OFFSET(14) NUMBITS(1) [],
        EDEND OFFSET(15) NUMBITS(1) [],
        CCAIDLE OFFSET(17) NUMBITS(1) [],
        CCABUSY OFFSET(18) NUMBITS(1) [],
        PHYEND OFFSET(27) NUMBITS(1) []
    ],
    CRCSTATUS [
        CRCSTATUS OFFSET(0) NUMBITS(1) [
            CRCError = 0,
            CRCOk = 1
        ]
    ],
    FREQUENCY [
        FREQUENCY OFFSET(0) NUMBITS(7) [],
        MAP OFFSET(8) NUMBITS(1) [
            Default = 0,
            Low = 1
        ]
    ],
    TXPOWER [
        TXPOWER OFFSET(0) NUMBITS(8) []
    ],
    MODE [
        MODE OFFSET(0) NUMBITS(4) [
            Ieee802154_250Kbit = 15
        ]
    ],
    PCNF0 [
        LFLEN OFFSET(0) NUMBITS(4) [],
        S0LEN OFFSET(8) NUMBITS(1) [],
        S1LEN OFFSET(16) NUMBITS(4) [],
        PLEN OFFSET(24) NUMBITS(2) [
            Bits8 = 0,
            Bits16 = 1,
            Bits32Zero = 2,
            LongRange = 3
        ],
        CRCINC OFFSET(26) NUMBITS(1) [
            Exclude = 0,
            Include = 1
        ]
    ],
    PCNF1 [
        MAXLEN OFFSET(0) NUMBITS(8) [],
        STATLEN OFFSET(8) NUMBITS(8) [],
        BALEN OFFSET(16) NUMBITS(3) [],
        ENDIAN OFFSET(24) NUMBITS(1) [
            Little = 0,
            Big = 1
        ],
        WHITEEN OFFSET(25) NUMBITS(1) []
    ],
    CRCCNF [
        LEN OFFSET(0) NUMBITS(2) [
            Disabled = 0,
            One = 1,
            Two = 2,
            Three = 3
        ],
        SKIPADDR OFFSET(8) NUMBITS(2) [
            Include = 0,
            Skip = 1,
            Ieee802154 = 2
        ]
    ],
    STATE [
        STATE OFFSET(0) NUMBITS(4) [
            Disabled = 0,
            RxRu = 1,
            RxIdle = 2,
            Rx = 3,
            RxDisable = 4,
            TxRu = 9,
            TxIdle = 10,
            Tx = 11,
            TxDisable = 12
        ]
    ],
    MODECNF0 [
        RU OFFSET(0) NUMBITS(1) [
            Default = 0,
            Fast = 1
        ]
    ],
    EDCNT [
        EDCNT OFFSET(0) NUMBITS(21) []
    ],
    EDSAMPLE [
        EDLVL OFFSET(0) NUMBITS(8) []
    ],
    CCACTRL [
        CCAMODE OFFSET(0) NUMBITS(3) [
            EdMode = 0,
            CarrierMode = 1,
            CarrierAndEdMode = 2,
            CarrierOrEdMode = 3
        ],
        CCAEDTHRES OFFSET(8) NUMBITS(8) [],
        CCACORRTHRES OFFSET(16) NUMBITS(8) [],
        CCACORRCNT OFFSET(24) NUMBITS(8) []
    ],
    POWER [
        POWER OFFSET(0) NUMBITS(1) [
            Disabled = 0,
            Enabled = 1
        ]
    ],
    TIMER_SHORTS [
        COMPARE0_CLEAR OFFSET(0) NUMBITS(1) [],
        COMPARE0_STOP OFFSET(8) NUMBITS(1) []
    ],
    TIMER_INTEN [
        COMPARE0 OFFSET(16) NUMBITS(1) []
    ],
    TIMER_MODE [
        MODE OFFSET(0) NUMBITS(2) [
            Timer = 0,
            Counter = 1
        ]
    ],
    TIMER_BITMODE [
        BITMODE OFFSET(0) NUMBITS(2) [
            Bit16 = 0,
            Bit08 = 1,
            Bit24 = 2,
            Bit32 = 3
        ]
    ],
    TIMER_PRESCALER [
        PRESCALER OFFSET(0) NUMBITS(4) []
    ]
];

pub const RADIO_BASE: StaticRef<RadioRegisters> =
    unsafe { StaticRef::new(0x40001000 as *const RadioRegisters) };

pub const TIMER0_BASE: StaticRef<TimerRegisters> =
    unsafe { StaticRef::new(0x40008000 as *const TimerRegisters) };

/// One energy detection unit is 8 symbols.
const ED_UNIT_US: u32 = 128;
/// Largest EDCNT value, i.e. the longest single detection.
const ED_MAX_COUNT: u32 = 0x1F_FFFF;
/// 16 MHz / 2^4: the acknowledgment timer counts microseconds.
const TIMER_PRESCALER_1MHZ: u32 = 4;

const NO_SHORTS: FieldValue<u32, SHORTS::Register> =
    FieldValue::<u32, SHORTS::Register>::new(0, 0, 0);
const NO_INTERRUPTS: FieldValue<u32, INTEN::Register> =
    FieldValue::<u32, INTEN::Register>::new(0, 0, 0);

/// Register value for a transmit power in dBm, rounded down to a level the
/// nRF52840 supports.
fn tx_power_register(power: i8) -> u32 {
    let supported: i8 = match power {
        p if p >= 2 => p.min(8),
        p if p >= 0 => 0,
        p if p >= -4 => -4,
        p if p >= -8 => -8,
        p if p >= -12 => -12,
        p if p >= -16 => -16,
        p if p >= -20 => -20,
        _ => -40,
    };
    u32::from(supported as u8)
}

/// EDCNT value covering at least `time_us`, and the time it covers.
fn ed_count(time_us: u32) -> (u32, u32) {
    let units = time_us.div_ceil(ED_UNIT_US).max(1);
    let count = (units - 1).min(ED_MAX_COUNT);
    (count, (count + 1) * ED_UNIT_US)
}

/// Procedure the peripheral is armed for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Off,
    Idle,
    Rx,
    AckRx,
    Tx,
    Cca,
    EnergyDetection,
    Carrier,
    Disabling,
}

pub struct Radio {
    registers: StaticRef<RadioRegisters>,
    timer: StaticRef<TimerRegisters>,
    mode: Cell<Mode>,
    /// Interrupts enabled for the current procedure, kept while masked.
    inten: Cell<u32>,
    masked: Cell<bool>,
    timer_armed: Cell<bool>,
    /// `disable` was called on an already disabled radio, which raises no
    /// DISABLED event.
    disabled_pending: Cell<bool>,
}

impl Radio {
    pub const fn new(
        registers: StaticRef<RadioRegisters>,
        timer: StaticRef<TimerRegisters>,
    ) -> Radio {
        Radio {
            registers,
            timer,
            mode: Cell::new(Mode::Off),
            inten: Cell::new(0),
            masked: Cell::new(false),
            timer_armed: Cell::new(false),
            disabled_pending: Cell::new(false),
        }
    }

    fn is_disabled(&self) -> bool {
        self.registers.state.matches_all(STATE::STATE::Disabled)
    }

    fn wait_until_disabled(&self) {
        let regs = &*self.registers;
        if self.is_disabled() {
            return;
        }
        regs.event_disabled.write(EVENT::EVENT::CLEAR);
        regs.task_disable.write(TASK::TASK::SET);
        while !regs.event_disabled.is_set(EVENT::EVENT) {}
        regs.event_disabled.write(EVENT::EVENT::CLEAR);
    }

    fn clear_events(&self) {
        let regs = &*self.registers;
        for event in [
            &regs.event_ready,
            &regs.event_end,
            &regs.event_disabled,
            &regs.event_bcmatch,
            &regs.event_framestart,
            &regs.event_edend,
            &regs.event_ccaidle,
            &regs.event_ccabusy,
            &regs.event_phyend,
        ] {
            event.write(EVENT::EVENT::CLEAR);
        }
    }

    fn set_interrupts(&self, inten: FieldValue<u32, INTEN::Register>) {
        let regs = &*self.registers;
        self.inten.set(inten.value);
        regs.intenclr.set(0xffff_ffff);
        if !self.masked.get() {
            regs.intenset.set(inten.value);
        }
    }

    /// Bring the peripheral to DISABLED and prepare it for `mode`.
    fn arm(
        &self,
        mode: Mode,
        shorts: FieldValue<u32, SHORTS::Register>,
        inten: FieldValue<u32, INTEN::Register>,
    ) {
        let regs = &*self.registers;
        self.set_interrupts(NO_INTERRUPTS);
        self.wait_until_disabled();
        self.clear_events();
        self.disabled_pending.set(false);
        regs.shorts.write(shorts);
        self.set_interrupts(inten);
        self.mode.set(mode);
    }

    /// Clear `event` and report it if its interrupt belongs to the current
    /// procedure.
    fn take(
        &self,
        inten: LocalRegisterCopy<u32, INTEN::Register>,
        field: Field<u32, INTEN::Register>,
        event: &ReadWrite<u32, EVENT::Register>,
    ) -> bool {
        if inten.is_set(field) && event.is_set(EVENT::EVENT) {
            event.write(EVENT::EVENT::CLEAR);
            true
        } else {
            false
        }
    }

    fn crc_ok(&self) -> bool {
        self.registers
            .crcstatus
            .matches_all(CRCSTATUS::CRCSTATUS::CRCOk)
    }
}

impl Transceiver for Radio {
    fn power_on(&self) {
        let regs = &*self.registers;
        regs.power.write(POWER::POWER::Enabled);
        regs.mode.write(MODE::MODE::Ieee802154_250Kbit);
        regs.modecnf0.write(MODECNF0::RU::Fast);
        // The length field is the PHR and counts the FCS.
        regs.pcnf0.write(
            PCNF0::LFLEN.val(8)
                + PCNF0::S0LEN.val(0)
                + PCNF0::S1LEN.val(0)
                + PCNF0::PLEN::Bits32Zero
                + PCNF0::CRCINC::Include,
        );
        regs.pcnf1.write(
            PCNF1::MAXLEN.val(MAX_FRAME_SIZE as u32)
                + PCNF1::STATLEN.val(0)
                + PCNF1::BALEN.val(0)
                + PCNF1::ENDIAN::Little
                + PCNF1::WHITEEN.val(0),
        );
        // x^16 + x^12 + x^5 + 1
        regs.crccnf
            .write(CRCCNF::LEN::Two + CRCCNF::SKIPADDR::Ieee802154);
        regs.crcpoly.set(0x11021);
        regs.crcinit.set(0);

        let timer = &*self.timer;
        timer.task_stop.write(TASK::TASK::SET);
        timer.mode.write(TIMER_MODE::MODE::Timer);
        timer.bitmode.write(TIMER_BITMODE::BITMODE::Bit32);
        timer
            .prescaler
            .write(TIMER_PRESCALER::PRESCALER.val(TIMER_PRESCALER_1MHZ));
        timer.shorts.write(TIMER_SHORTS::COMPARE0_STOP::SET);

        self.mode.set(Mode::Idle);
    }

    fn power_off(&self) {
        self.stop_ack_timer();
        self.set_interrupts(NO_INTERRUPTS);
        self.wait_until_disabled();
        self.registers.power.write(POWER::POWER::Disabled);
        self.disabled_pending.set(false);
        self.mode.set(Mode::Off);
    }

    fn set_channel(&self, channel: u8) {
        let offset = u32::from(channel).saturating_sub(10);
        self.registers
            .frequency
            .write(FREQUENCY::FREQUENCY.val(5 * offset) + FREQUENCY::MAP::Default);
    }

    fn set_tx_power(&self, power: i8) {
        self.registers
            .txpower
            .write(TXPOWER::TXPOWER.val(tx_power_register(power)));
    }

    fn set_cca_config(&self, config: CcaConfig) {
        let mode = match config.mode {
            CcaMode::EnergyAboveThreshold => CCACTRL::CCAMODE::EdMode,
            CcaMode::CarrierSense => CCACTRL::CCAMODE::CarrierMode,
            CcaMode::CarrierAndEnergy => CCACTRL::CCAMODE::CarrierAndEdMode,
            CcaMode::CarrierOrEnergy => CCACTRL::CCAMODE::CarrierOrEdMode,
        };
        self.registers.ccactrl.write(
            mode + CCACTRL::CCAEDTHRES.val(u32::from(config.ed_threshold))
                + CCACTRL::CCACORRTHRES.val(u32::from(config.corr_threshold))
                + CCACTRL::CCACORRCNT.val(u32::from(config.corr_limit)),
        );
    }

    fn receive(&self, buf: &mut [u8]) {
        let regs = &*self.registers;
        self.arm(
            Mode::Rx,
            SHORTS::RXREADY_START::SET + SHORTS::FRAMESTART_BCSTART::SET,
            INTEN::FRAMESTART::SET + INTEN::BCMATCH::SET + INTEN::END::SET,
        );
        regs.bcc.set(0);
        regs.packetptr.set(buf.as_mut_ptr() as u32);
        regs.task_rxen.write(TASK::TASK::SET);
    }

    fn receive_ack(&self, buf: &mut [u8]) {
        let regs = &*self.registers;
        self.arm(Mode::AckRx, SHORTS::RXREADY_START::SET, INTEN::END::SET);
        regs.packetptr.set(buf.as_mut_ptr() as u32);
        regs.task_rxen.write(TASK::TASK::SET);
    }

    fn request_header_bytes(&self, bytes: usize) {
        // The bit counter starts at the PHR.
        let regs = &*self.registers;
        regs.event_bcmatch.write(EVENT::EVENT::CLEAR);
        regs.bcc.set(((PHR_SIZE + bytes) * 8) as u32);
    }

    fn transmit(&self, buf: &[u8]) {
        let regs = &*self.registers;
        self.arm(Mode::Tx, SHORTS::TXREADY_START::SET, INTEN::PHYEND::SET);
        regs.packetptr.set(buf.as_ptr() as u32);
        regs.task_txen.write(TASK::TASK::SET);
    }

    fn cca(&self) {
        self.arm(
            Mode::Cca,
            SHORTS::RXREADY_CCASTART::SET,
            INTEN::CCAIDLE::SET + INTEN::CCABUSY::SET,
        );
        self.registers.task_rxen.write(TASK::TASK::SET);
    }

    fn energy_detection(&self, time_us: u32) -> u32 {
        let regs = &*self.registers;
        let (count, covered) = ed_count(time_us);
        self.arm(
            Mode::EnergyDetection,
            SHORTS::READY_EDSTART::SET,
            INTEN::EDEND::SET,
        );
        regs.edcnt.write(EDCNT::EDCNT.val(count));
        regs.task_rxen.write(TASK::TASK::SET);
        covered
    }

    fn continuous_carrier(&self) {
        self.arm(
            Mode::Carrier,
            NO_SHORTS,
            NO_INTERRUPTS,
        );
        self.registers.task_txen.write(TASK::TASK::SET);
    }

    fn disable(&self) {
        let regs = &*self.registers;
        regs.shorts.set(0);
        self.set_interrupts(INTEN::DISABLED::SET);
        regs.event_disabled.write(EVENT::EVENT::CLEAR);
        self.mode.set(Mode::Disabling);
        if self.is_disabled() {
            self.disabled_pending.set(true);
        } else {
            regs.task_disable.write(TASK::TASK::SET);
        }
    }

    fn start_ack_timer(&self, time_us: u32) {
        let timer = &*self.timer;
        timer.task_stop.write(TASK::TASK::SET);
        timer.task_clear.write(TASK::TASK::SET);
        timer.event_compare[0].write(EVENT::EVENT::CLEAR);
        timer.cc[0].set(time_us);
        self.timer_armed.set(true);
        if !self.masked.get() {
            timer.intenset.write(TIMER_INTEN::COMPARE0::SET);
        }
        timer.task_start.write(TASK::TASK::SET);
    }

    fn stop_ack_timer(&self) {
        let timer = &*self.timer;
        timer.task_stop.write(TASK::TASK::SET);
        timer.intenclr.write(TIMER_INTEN::COMPARE0::SET);
        timer.event_compare[0].write(EVENT::EVENT::CLEAR);
        self.timer_armed.set(false);
    }

    fn mask_interrupts(&self) {
        self.masked.set(true);
        self.registers.intenclr.set(0xffff_ffff);
        self.timer.intenclr.write(TIMER_INTEN::COMPARE0::SET);
    }

    fn unmask_interrupts(&self) {
        self.masked.set(false);
        self.registers.intenset.set(self.inten.get());
        if self.timer_armed.get() {
            self.timer.intenset.write(TIMER_INTEN::COMPARE0::SET);
        }
    }

    fn take_event(&self) -> Option<Event> {
        let regs = &*self.registers;

        if self.timer_armed.get() && self.timer.event_compare[0].is_set(EVENT::EVENT) {
            self.stop_ack_timer();
            return Some(Event::AckTimeout);
        }

        let inten = LocalRegisterCopy::new(self.inten.get());
        if self.take(inten, INTEN::FRAMESTART, &regs.event_framestart) {
            return Some(Event::FrameStart);
        }
        if self.take(inten, INTEN::BCMATCH, &regs.event_bcmatch) {
            return Some(Event::HeaderReceived);
        }
        if self.take(inten, INTEN::END, &regs.event_end) {
            let crc_ok = self.crc_ok();
            return match self.mode.get() {
                Mode::AckRx => Some(Event::AckReceived { crc_ok }),
                _ => Some(Event::RxComplete { crc_ok }),
            };
        }
        if self.take(inten, INTEN::PHYEND, &regs.event_phyend) {
            return Some(Event::TxComplete);
        }
        if self.take(inten, INTEN::CCAIDLE, &regs.event_ccaidle) {
            return Some(Event::CcaComplete { idle: true });
        }
        if self.take(inten, INTEN::CCABUSY, &regs.event_ccabusy) {
            return Some(Event::CcaComplete { idle: false });
        }
        if self.take(inten, INTEN::EDEND, &regs.event_edend) {
            let level = regs.edsample.read(EDSAMPLE::EDLVL) as u8;
            return Some(Event::EdComplete { level });
        }
        if self.take(inten, INTEN::DISABLED, &regs.event_disabled)
            || self.disabled_pending.replace(false)
        {
            self.mode.set(Mode::Idle);
            self.set_interrupts(NO_INTERRUPTS);
            return Some(Event::Disabled);
        }
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;

    // A zeroed register block reads as a powered-down radio in the DISABLED
    // state with no events pending.
    fn registers() -> (RadioRegisters, TimerRegisters) {
        unsafe { (core::mem::zeroed(), core::mem::zeroed()) }
    }

    fn radio(regs: &RadioRegisters, timer: &TimerRegisters) -> Radio {
        unsafe {
            Radio::new(
                StaticRef::new(regs as *const RadioRegisters),
                StaticRef::new(timer as *const TimerRegisters),
            )
        }
    }

    #[test]
    fn power_on_selects_802154_mode() {
        let (regs, timer) = registers();
        let radio = radio(&regs, &timer);
        radio.power_on();
        assert!(regs.power.matches_all(POWER::POWER::Enabled));
        assert!(regs.mode.matches_all(MODE::MODE::Ieee802154_250Kbit));
        assert_eq!(regs.pcnf0.read(PCNF0::LFLEN), 8);
        assert!(regs.pcnf0.matches_all(PCNF0::CRCINC::Include));
        assert_eq!(regs.pcnf1.read(PCNF1::MAXLEN), 127);
        assert_eq!(regs.crcpoly.get(), 0x11021);
        assert_eq!(timer.prescaler.get(), 4);
    }

    #[test]
    fn channel_frequency() {
        let (regs, timer) = registers();
        let radio = radio(&regs, &timer);
        radio.set_channel(11);
        assert_eq!(regs.frequency.read(FREQUENCY::FREQUENCY), 5);
        radio.set_channel(26);
        assert_eq!(regs.frequency.read(FREQUENCY::FREQUENCY), 80);
    }

    #[test]
    fn tx_power_rounds_down() {
        assert_eq!(tx_power_register(8), 8);
        assert_eq!(tx_power_register(12), 8);
        assert_eq!(tx_power_register(1), 0);
        assert_eq!(tx_power_register(-3), 0xfc);
        assert_eq!(tx_power_register(-21), 0xd8);
    }

    #[test]
    fn energy_detection_window() {
        assert_eq!(ed_count(1), (0, 128));
        assert_eq!(ed_count(128), (0, 128));
        assert_eq!(ed_count(1000), (7, 1024));
        assert_eq!(ed_count(u32::MAX), (ED_MAX_COUNT, (ED_MAX_COUNT + 1) * 128));

        let (regs, timer) = registers();
        let radio = radio(&regs, &timer);
        assert_eq!(radio.energy_detection(1000), 1024);
        assert_eq!(regs.edcnt.read(EDCNT::EDCNT), 7);
        assert!(regs.shorts.is_set(SHORTS::READY_EDSTART));

        regs.event_edend.set(1);
        assert_eq!(radio.take_event(), Some(Event::EdComplete { level: 0 }));
        assert_eq!(regs.event_edend.get(), 0);
    }

    #[test]
    fn cca_thresholds() {
        let (regs, timer) = registers();
        let radio = radio(&regs, &timer);
        radio.set_cca_config(CcaConfig {
            mode: CcaMode::CarrierOrEnergy,
            ed_threshold: 0x2d,
            corr_threshold: 0x14,
            corr_limit: 2,
        });
        assert!(regs.ccactrl.matches_all(CCACTRL::CCAMODE::CarrierOrEdMode));
        assert_eq!(regs.ccactrl.read(CCACTRL::CCAEDTHRES), 0x2d);
        assert_eq!(regs.ccactrl.read(CCACTRL::CCACORRTHRES), 0x14);
        assert_eq!(regs.ccactrl.read(CCACTRL::CCACORRCNT), 2);
    }

    #[test]
    fn receive_events() {
        let (regs, timer) = registers();
        let radio = radio(&regs, &timer);
        let mut buf = [0u8; 128];
        radio.receive(&mut buf);
        assert_eq!(radio.take_event(), None);

        regs.event_framestart.set(1);
        assert_eq!(radio.take_event(), Some(Event::FrameStart));
        radio.request_header_bytes(3);
        assert_eq!(regs.bcc.get(), 32);

        regs.event_bcmatch.set(1);
        assert_eq!(radio.take_event(), Some(Event::HeaderReceived));
        regs.event_end.set(1);
        assert_eq!(
            radio.take_event(),
            Some(Event::RxComplete { crc_ok: false })
        );
        assert_eq!(radio.take_event(), None);
    }

    #[test]
    fn events_of_other_procedures_are_ignored() {
        let (regs, timer) = registers();
        let radio = radio(&regs, &timer);
        let buf = [5u8, 0x02, 0x00, 0x01, 0, 0];
        radio.transmit(&buf);
        regs.event_framestart.set(1);
        regs.event_ccaidle.set(1);
        assert_eq!(radio.take_event(), None);
        regs.event_phyend.set(1);
        assert_eq!(radio.take_event(), Some(Event::TxComplete));

        radio.cca();
        assert_eq!(radio.take_event(), None);
        regs.event_ccabusy.set(1);
        assert_eq!(radio.take_event(), Some(Event::CcaComplete { idle: false }));
    }

    #[test]
    fn ack_reception_and_timeout() {
        let (regs, timer) = registers();
        let radio = radio(&regs, &timer);
        let mut ack = [0u8; 128];
        radio.receive_ack(&mut ack);
        radio.start_ack_timer(864);
        assert_eq!(timer.cc[0].get(), 864);

        regs.event_end.set(1);
        assert_eq!(
            radio.take_event(),
            Some(Event::AckReceived { crc_ok: false })
        );

        timer.event_compare[0].set(1);
        assert_eq!(radio.take_event(), Some(Event::AckTimeout));
        assert_eq!(timer.event_compare[0].get(), 0);
        timer.event_compare[0].set(1);
        assert_eq!(radio.take_event(), None);
    }

    #[test]
    fn disable_when_already_disabled() {
        let (regs, timer) = registers();
        let radio = radio(&regs, &timer);
        radio.disable();
        assert_eq!(radio.take_event(), Some(Event::Disabled));
        assert_eq!(radio.take_event(), None);
    }

    #[test]
    fn masked_events_are_still_taken() {
        let (regs, timer) = registers();
        let radio = radio(&regs, &timer);
        radio.cca();
        radio.mask_interrupts();
        assert_eq!(regs.intenclr.get(), 0xffff_ffff);
        regs.event_ccaidle.set(1);
        assert_eq!(radio.take_event(), Some(Event::CcaComplete { idle: true }));

        radio.unmask_interrupts();
        assert_eq!(
            regs.intenset.get(),
            (INTEN::CCAIDLE::SET + INTEN::CCABUSY::SET).value
        );
    }
}
