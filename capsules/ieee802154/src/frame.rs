// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2023.

//! The parts of the 802.15.4 MAC header the FSM needs to look at.
//!
//! Only the start of the MHR is interpreted: enough to decide whether a frame
//! is addressed to this device, whether it requests an acknowledgment, and
//! whether a received acknowledgment belongs to the frame just sent.
//!
//! ```text
//! +-------------+-----+----------+----------+-----
//! | Frame ctrl  | Seq | Dest PAN | Dest     | ...
//! | 2 bytes     | 1 B | 0/2 B    | 0/2/8 B  |
//! +-------------+-----+----------+----------+-----
//! ```
//!
//! All functions take the PSDU, i.e. the buffer without its PHR byte.

use kernel::hil::radio::{FCS_SIZE, PHR_SIZE};

use crate::pib::{Pib, BROADCAST};

const FCF_SIZE: usize = 2;
const SEQ_OFFSET: usize = 2;
const DST_PAN_OFFSET: usize = 3;
const PAN_ID_SIZE: usize = 2;
const DST_ADDR_OFFSET: usize = DST_PAN_OFFSET + PAN_ID_SIZE;
const SHORT_ADDR_SIZE: usize = 2;
const EXTENDED_ADDR_SIZE: usize = 8;

const FRAME_TYPE_MASK: u8 = 0x07;
const FRAME_TYPE_ACK: u8 = 0x02;
const FRAME_PENDING_BIT: u8 = 1 << 4;
const ACK_REQUEST_BIT: u8 = 1 << 5;
const DST_ADDR_MODE_SHIFT: u8 = 2;
const ADDR_MODE_MASK: u8 = 0x03;

/// Bytes of the PSDU needed before anything can be decided: frame control
/// and sequence number.
pub const MIN_HEADER_SIZE: usize = FCF_SIZE + 1;

/// PSDU length of an immediate acknowledgment, FCS included.
pub const ACK_LENGTH: u8 = (MIN_HEADER_SIZE + FCS_SIZE) as u8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameType {
    Beacon,
    Data,
    Ack,
    MacCommand,
    Reserved,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressMode {
    None,
    Reserved,
    Short,
    Extended,
}

impl AddressMode {
    fn size(&self) -> usize {
        match self {
            AddressMode::Short => SHORT_ADDR_SIZE,
            AddressMode::Extended => EXTENDED_ADDR_SIZE,
            AddressMode::None | AddressMode::Reserved => 0,
        }
    }
}

/// Outcome of the destination filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Filter {
    /// The frame is for this device, receive the rest of it.
    Accept,
    /// Drop the frame.
    Reject,
    /// Call again once this many PSDU bytes are available.
    NeedMore(usize),
}

pub fn frame_type(psdu: &[u8]) -> Option<FrameType> {
    psdu.get(0).map(|fcf| match fcf & FRAME_TYPE_MASK {
        0 => FrameType::Beacon,
        1 => FrameType::Data,
        FRAME_TYPE_ACK => FrameType::Ack,
        3 => FrameType::MacCommand,
        _ => FrameType::Reserved,
    })
}

pub fn sequence_number(psdu: &[u8]) -> Option<u8> {
    psdu.get(SEQ_OFFSET).copied()
}

/// An acknowledgment is never acknowledged, whatever its control bits say.
pub fn ack_requested(psdu: &[u8]) -> bool {
    match (psdu.get(0), frame_type(psdu)) {
        (Some(fcf), Some(frame_type)) => {
            frame_type != FrameType::Ack && fcf & ACK_REQUEST_BIT != 0
        }
        _ => false,
    }
}

pub fn dst_addr_mode(psdu: &[u8]) -> Option<AddressMode> {
    psdu.get(1)
        .map(|fcf| match (fcf >> DST_ADDR_MODE_SHIFT) & ADDR_MODE_MASK {
            0 => AddressMode::None,
            1 => AddressMode::Reserved,
            2 => AddressMode::Short,
            _ => AddressMode::Extended,
        })
}

fn read_u16(psdu: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([psdu[offset], psdu[offset + 1]])
}

/// Decide whether the frame whose first `received` PSDU bytes are in `psdu`
/// is addressed to this device.
pub fn filter(psdu: &[u8], received: usize, pib: &Pib) -> Filter {
    if received < MIN_HEADER_SIZE || psdu.len() < MIN_HEADER_SIZE {
        return Filter::NeedMore(MIN_HEADER_SIZE);
    }
    if pib.promiscuous() {
        return Filter::Accept;
    }

    match frame_type(psdu) {
        // Beacons carry no destination.
        Some(FrameType::Beacon) => return Filter::Accept,
        Some(FrameType::Data) | Some(FrameType::MacCommand) => {}
        // Acknowledgments are only of interest right after a transmission.
        _ => return Filter::Reject,
    }

    let mode = match dst_addr_mode(psdu) {
        Some(mode) => mode,
        None => return Filter::Reject,
    };
    match mode {
        AddressMode::None => {
            return if pib.pan_coordinator() {
                Filter::Accept
            } else {
                Filter::Reject
            };
        }
        AddressMode::Reserved => return Filter::Reject,
        AddressMode::Short | AddressMode::Extended => {}
    }

    let needed = DST_ADDR_OFFSET + mode.size();
    if received < needed || psdu.len() < needed {
        return Filter::NeedMore(needed);
    }

    let pan_id = read_u16(psdu, DST_PAN_OFFSET);
    if pan_id != pib.pan_id() && pan_id != BROADCAST {
        return Filter::Reject;
    }

    let matched = match mode {
        AddressMode::Short => {
            let address = read_u16(psdu, DST_ADDR_OFFSET);
            address == pib.short_address() || address == BROADCAST
        }
        _ => psdu[DST_ADDR_OFFSET..needed] == pib.extended_address(),
    };
    if matched {
        Filter::Accept
    } else {
        Filter::Reject
    }
}

/// Build an immediate acknowledgment for sequence number `seq` in `buf`
/// (PHR included). The FCS is appended by the hardware.
pub fn write_ack(buf: &mut [u8], seq: u8, frame_pending: bool) {
    let mut fcf0 = FRAME_TYPE_ACK;
    if frame_pending {
        fcf0 |= FRAME_PENDING_BIT;
    }
    buf[0] = ACK_LENGTH;
    buf[PHR_SIZE] = fcf0;
    buf[PHR_SIZE + 1] = 0;
    buf[PHR_SIZE + SEQ_OFFSET] = seq;
}

/// Whether the frame in `buf` (PHR included) acknowledges sequence number
/// `seq`.
pub fn is_ack_for(buf: &[u8], seq: u8) -> bool {
    if buf.len() < PHR_SIZE + MIN_HEADER_SIZE || buf[0] != ACK_LENGTH {
        return false;
    }
    let psdu = &buf[PHR_SIZE..];
    frame_type(psdu) == Some(FrameType::Ack) && sequence_number(psdu) == Some(seq)
}

#[cfg(test)]
mod test {
    use super::*;

    // Data frame, ack requested, PAN ID compression, short destination and
    // source: FCF 0x61 0x88.
    const DATA_SHORT: [u8; 9] = [0x61, 0x88, 0x2a, 0x34, 0x12, 0xcd, 0xab, 0x01, 0x00];

    fn pib() -> Pib {
        let pib = Pib::new();
        pib.set_pan_id(0x1234);
        pib.set_short_address(0xabcd);
        pib.set_extended_address([1, 2, 3, 4, 5, 6, 7, 8]);
        pib
    }

    #[test]
    fn parses_frame_control() {
        assert_eq!(frame_type(&DATA_SHORT), Some(FrameType::Data));
        assert_eq!(dst_addr_mode(&DATA_SHORT), Some(AddressMode::Short));
        assert_eq!(sequence_number(&DATA_SHORT), Some(0x2a));
        assert!(ack_requested(&DATA_SHORT));
        assert_eq!(frame_type(&[]), None);
    }

    #[test]
    fn filter_waits_for_addressing() {
        let pib = pib();
        assert_eq!(filter(&DATA_SHORT, 1, &pib), Filter::NeedMore(3));
        assert_eq!(filter(&DATA_SHORT, 3, &pib), Filter::NeedMore(7));
        assert_eq!(filter(&DATA_SHORT, 7, &pib), Filter::Accept);
    }

    #[test]
    fn filter_checks_pan_and_address() {
        let pib = pib();
        let mut frame = DATA_SHORT;
        frame[3] = 0x00;
        assert_eq!(filter(&frame, 7, &pib), Filter::Reject);

        let mut frame = DATA_SHORT;
        frame[3..7].copy_from_slice(&[0xff, 0xff, 0xff, 0xff]);
        assert_eq!(filter(&frame, 7, &pib), Filter::Accept);

        let mut frame = DATA_SHORT;
        frame[5] = 0x00;
        assert_eq!(filter(&frame, 7, &pib), Filter::Reject);

        pib.set_promiscuous(true);
        assert_eq!(filter(&frame, 3, &pib), Filter::Accept);
    }

    #[test]
    fn filter_extended_destination() {
        let pib = pib();
        let mut frame = [0u8; 13];
        frame[0] = 0x41;
        frame[1] = 0x0c;
        frame[3..5].copy_from_slice(&0x1234u16.to_le_bytes());
        frame[5..13].copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(filter(&frame, 7, &pib), Filter::NeedMore(13));
        assert_eq!(filter(&frame, 13, &pib), Filter::Accept);
        frame[12] = 0;
        assert_eq!(filter(&frame, 13, &pib), Filter::Reject);
    }

    #[test]
    fn filter_frames_without_destination() {
        let pib = pib();
        let beacon = [0x00, 0x80, 0x01];
        assert_eq!(filter(&beacon, 3, &pib), Filter::Accept);

        let data = [0x41, 0x80, 0x01];
        assert_eq!(filter(&data, 3, &pib), Filter::Reject);
        pib.set_pan_coordinator(true);
        assert_eq!(filter(&data, 3, &pib), Filter::Accept);

        let ack = [0x02, 0x00, 0x01];
        assert_eq!(filter(&ack, 3, &pib), Filter::Reject);
    }

    #[test]
    fn ack_frames() {
        let mut buf = [0u8; 8];
        write_ack(&mut buf, 0x2a, true);
        assert_eq!(&buf[..4], &[5, 0x12, 0x00, 0x2a]);
        assert!(is_ack_for(&buf, 0x2a));
        assert!(!is_ack_for(&buf, 0x2b));
        assert!(!ack_requested(&buf[1..]));

        buf[0] = 9;
        assert!(!is_ack_for(&buf, 0x2a));
    }
}
