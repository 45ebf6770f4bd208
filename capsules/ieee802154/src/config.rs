// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2023.

//! Compile-time configuration of the radio driver.
//!
//! Options live in a typed `const` object rather than behind `#[cfg]`, so
//! every code path is type-checked whatever the configuration, and disabled
//! branches are folded away by the compiler. This is the only place in the
//! crate where Cargo features are consulted.

/// Data structure holding compile-time configuration options.
pub(crate) struct Config {
    /// Whether the driver should trace its behavior to the debug output.
    ///
    /// If enabled, every state transition, every hardware event the current
    /// state has no use for, and every deferred configuration update is
    /// printed with `debug!`.
    pub(crate) trace_radio_events: bool,
}

/// The configuration of this build.
pub(crate) const CONFIG: Config = Config {
    trace_radio_events: cfg!(feature = "trace_radio_events"),
};
