// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 hsdr contributors

//! Single-producer single-consumer I/Q sample ring.
//!
//! The network ingress thread writes, the demodulator reads. The producer
//! never blocks: if the consumer falls more than a full ring behind, old
//! samples are silently overwritten and the read position resynchronized.
//! Only the consumer ever waits, on a condition variable signalled at each
//! write.

use num_complex::Complex;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

struct Inner {
    buf: Box<[Complex<f32>]>,
    /// Monotonic sample counters; the buffer index is `counter & mask`.
    write: u64,
    read: u64,
}

/// The receiver's I/Q ring. Capacity must be a power of two.
pub struct IqRing {
    inner: Mutex<Inner>,
    nonempty: Condvar,
    mask: u64,
}

impl IqRing {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity.is_power_of_two(), "ring capacity must be 2^n");
        IqRing {
            inner: Mutex::new(Inner {
                buf: vec![Complex::default(); capacity].into_boxed_slice(),
                write: 0,
                read: 0,
            }),
            nonempty: Condvar::new(),
            mask: capacity as u64 - 1,
        }
    }

    /// Append samples; never blocks. Overrun silently advances the read
    /// position — keeping up is the consumer's responsibility.
    pub fn push(&self, samples: &[Complex<f32>]) {
        let mut g = self.inner.lock();
        for &s in samples {
            let idx = (g.write & self.mask) as usize;
            g.buf[idx] = s;
            g.write += 1;
        }
        let capacity = self.mask + 1;
        if g.write - g.read > capacity {
            g.read = g.write - capacity;
        }
        drop(g);
        self.nonempty.notify_one();
    }

    /// Fill `out` completely, blocking while the ring is empty. Returns
    /// false without filling when `terminate` goes up.
    pub fn fill(&self, out: &mut [Complex<f32>], terminate: &AtomicBool) -> bool {
        let mut filled = 0;
        let mut g = self.inner.lock();
        while filled < out.len() {
            while g.read == g.write {
                if terminate.load(Ordering::SeqCst) {
                    return false;
                }
                // Timed wait so a terminate raised with no producer running
                // still gets noticed.
                let _ = self.nonempty.wait_for(&mut g, Duration::from_millis(100));
            }
            while filled < out.len() && g.read < g.write {
                let idx = (g.read & self.mask) as usize;
                out[filled] = g.buf[idx];
                g.read += 1;
                filled += 1;
            }
        }
        true
    }

    /// Samples currently buffered.
    pub fn depth(&self) -> usize {
        let g = self.inner.lock();
        (g.write - g.read) as usize
    }
}
