// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2023.

//! Fixed-capacity pool of receive buffers.
//!
//! Boards allocate `N` buffers of at least [`MAX_BUF_SIZE`] bytes with
//! `static_init!` and hand them to the pool. The FSM takes one out whenever it
//! arms the receiver, and a frame delivered to the receive client stays out of
//! the pool until the client gives it back through
//! [`RadioFsm::notify_buffer_free`](crate::fsm::RadioFsm::notify_buffer_free).
//!
//! Usage
//! -----
//!
//! ```rust,ignore
//! let pool = static_init!(FramePool<2>, FramePool::new([rx_buf0, rx_buf1]));
//! ```
//!
//! [`MAX_BUF_SIZE`]: kernel::hil::radio::MAX_BUF_SIZE

use kernel::debug;
use kernel::hil::radio::RxBufferPool;
use kernel::utilities::cells::TakeCell;

pub struct FramePool<const N: usize> {
    slots: [TakeCell<'static, [u8]>; N],
}

impl<const N: usize> FramePool<N> {
    pub fn new(buffers: [&'static mut [u8]; N]) -> FramePool<N> {
        FramePool {
            slots: buffers.map(TakeCell::new),
        }
    }

    /// A pool whose buffers are all lent out. Buffers join it through
    /// `release`.
    pub fn empty() -> FramePool<N> {
        FramePool {
            slots: core::array::from_fn(|_| TakeCell::empty()),
        }
    }
}

impl<const N: usize> RxBufferPool for FramePool<N> {
    fn acquire(&self) -> Option<&'static mut [u8]> {
        self.slots.iter().find_map(|slot| slot.take())
    }

    fn release(&self, buf: &'static mut [u8]) {
        match self.slots.iter().find(|slot| slot.is_none()) {
            Some(slot) => {
                slot.replace(buf);
            }
            // More buffers came back than were ever handed out.
            None => debug!("FramePool: pool full, dropping buffer"),
        }
    }

    fn available(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}

#[cfg(test)]
mod test {
    use super::FramePool;
    use crate::test::fake::buffer;
    use kernel::hil::radio::RxBufferPool;

    #[test]
    fn acquire_until_empty() {
        let pool = FramePool::new([buffer(), buffer()]);
        assert_eq!(pool.available(), 2);
        let first = pool.acquire();
        let second = pool.acquire();
        assert!(first.is_some() && second.is_some());
        assert!(pool.acquire().is_none());
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn released_buffers_are_reused() {
        let pool: FramePool<1> = FramePool::empty();
        assert!(pool.acquire().is_none());

        let buf = buffer();
        buf[0] = 0x42;
        pool.release(buf);
        assert_eq!(pool.available(), 1);
        let buf = pool.acquire().unwrap();
        assert_eq!(buf[0], 0x42);
    }

    #[test]
    fn release_into_full_pool_drops() {
        let pool = FramePool::new([buffer()]);
        pool.release(buffer());
        assert_eq!(pool.available(), 1);
    }
}
