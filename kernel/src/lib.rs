// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Core kernel support for the 802.15.4 radio stack.
//!
//! The kernel crate holds the code that chips and capsules share: the
//! Hardware Interface Layer (HIL) definitions the radio FSM is written
//! against, the standard error codes, debug output, and small utilities for
//! memory-mapped register access.

#![warn(unreachable_pub)]
#![no_std]

#[macro_use]
pub mod debug;
pub mod errorcode;
pub mod hil;
pub mod utilities;

pub use crate::errorcode::ErrorCode;
