// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Peripheral drivers for the nRF52840 used by the 802.15.4 radio stack.

#![no_std]

pub mod ieee802154_radio;
