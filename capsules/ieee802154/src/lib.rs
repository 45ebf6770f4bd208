// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2023.

//! IEEE 802.15.4 radio driver.
//!
//! The heart of this crate is [`fsm::RadioFsm`], the operating-mode state
//! machine that sequences a [`Transceiver`](kernel::hil::radio::Transceiver)
//! through sleep, receive, transmit, energy detection, clear channel
//! assessment and continuous carrier. The remaining modules are the pieces
//! it is built from or wired to: the PHY/MAC information base, the frame
//! filter, a receive buffer pool and an arbiter for single-protocol systems.

#![no_std]

#[cfg(test)]
extern crate std;

pub mod config;
pub mod critical_section;
pub mod frame;
pub mod fsm;
pub mod pib;
pub mod rx_buffer;
pub mod single_phy;
pub mod state;

#[cfg(test)]
mod test;
