// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Support for in-kernel debugging.
//!
//! The `debug!` macro formats a message with `core::fmt` and hands the bytes
//! to the writer the board registered with [`set_debug_writer`]. Until a
//! writer is registered, messages are discarded, so chips and capsules can
//! call `debug!` unconditionally.
//!
//! Usage
//! -----
//!
//! ```rust,ignore
//! debug!("Yes the code gets here with value {}", i);
//! debug!("got here");
//! ```

use core::fmt::{write, Arguments, Result, Write};
use core::ptr::{addr_of, addr_of_mut};

/// A sink for debug output, typically a UART or a RAM console.
pub trait IoWrite {
    /// Write `buf`, returning the number of bytes that were accepted.
    fn write(&self, buf: &[u8]) -> usize;
}

// Written once during board setup, before interrupts are enabled, and only
// read afterwards.
static mut DEBUG_WRITER: Option<&'static dyn IoWrite> = None;

/// Register the sink `debug!` writes to.
///
/// # Safety
///
/// Must be called before any other code can run `debug!`, i.e. during board
/// initialization with interrupts disabled.
pub unsafe fn set_debug_writer(writer: &'static dyn IoWrite) {
    *addr_of_mut!(DEBUG_WRITER) = Some(writer);
}

fn debug_writer() -> Option<&'static dyn IoWrite> {
    unsafe { *addr_of!(DEBUG_WRITER) }
}

struct DebugWriter {
    sink: &'static dyn IoWrite,
}

impl Write for DebugWriter {
    fn write_str(&mut self, s: &str) -> Result {
        self.sink.write(s.as_bytes());
        Ok(())
    }
}

/// Write a debug message followed by a line ending.
pub fn debug_println(args: Arguments) {
    if let Some(sink) = debug_writer() {
        let mut writer = DebugWriter { sink };
        let _ = write(&mut writer, args);
        let _ = writer.write_str("\r\n");
    }
}

/// In-kernel `println()` debugging.
#[macro_export]
macro_rules! debug {
    () => ({
        // Allow an empty debug!() to emit a blank line
        $crate::debug!("")
    });
    ($msg:expr $(,)?) => ({
        $crate::debug::debug_println(format_args!($msg));
    });
    ($fmt:expr, $($arg:tt)+) => ({
        $crate::debug::debug_println(format_args!($fmt, $($arg)+));
    });
}

#[cfg(test)]
mod test {
    use super::{set_debug_writer, IoWrite};
    use core::sync::atomic::{AtomicUsize, Ordering};

    struct CountingWriter {
        bytes: AtomicUsize,
    }

    impl IoWrite for CountingWriter {
        fn write(&self, buf: &[u8]) -> usize {
            self.bytes.fetch_add(buf.len(), Ordering::Relaxed);
            buf.len()
        }
    }

    static WRITER: CountingWriter = CountingWriter {
        bytes: AtomicUsize::new(0),
    };

    #[test]
    fn debug_reaches_registered_writer() {
        unsafe { set_debug_writer(&WRITER) };
        debug!("channel {}", 11);
        // "channel 11" plus "\r\n"
        assert_eq!(WRITER.bytes.load(Ordering::Relaxed), 12);
    }
}
