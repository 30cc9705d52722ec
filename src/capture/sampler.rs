// SPDX-License-Identifier: GPL-3.0-only

//! Per-frame sample callback and the front/back buffer hand-off
//!
//! The sampler is the only object shared between the delivery thread (owned
//! by the capture subsystem, cadence set by the device) and the consumer
//! thread. `deliver` runs on the delivery thread and must never block on
//! the consumer; `take_into` runs on the consumer thread and must never
//! wait for a delivery. Both hold the pair lock only for a row copy or a
//! pointer swap.
//!
//! Backpressure is drop-on-contention: while the ready flag is set, new
//! deliveries are discarded, so the consumer always sees the oldest
//! unconsumed frame and at most one undelivered frame exists.

use super::types::{FrameBuffer, FrameGeometry};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::debug;

/// Delivery statistics, readable from any thread
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frames promoted to the front buffer
    pub delivered: u64,
    /// Frames discarded because the previous one was unconsumed
    pub dropped: u64,
}

struct BufferPair {
    front: FrameBuffer,
    back: FrameBuffer,
}

/// Callback object invoked once per delivered frame.
///
/// Shared by `Arc` between the capture session and the graph's delivery
/// callback — the callback's strong reference guarantees an in-flight
/// delivery always completes against live buffers, no matter how it races
/// a stop or teardown request.
pub struct FrameSampler {
    geometry: FrameGeometry,
    pair: Mutex<BufferPair>,
    /// True while the front buffer holds an unconsumed frame
    ready: AtomicBool,
    /// Cleared until the first delivery has warmed the back buffer.
    /// Cameras commonly emit a dark or mid-exposure first sample; it is
    /// copied but never promoted, so the first visible frame is a settled
    /// one.
    primed: AtomicBool,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl FrameSampler {
    /// Allocate both hand-off buffers for the negotiated geometry
    pub fn new(geometry: FrameGeometry) -> Self {
        Self {
            geometry,
            pair: Mutex::new(BufferPair {
                front: FrameBuffer::new(geometry),
                back: FrameBuffer::new(geometry),
            }),
            ready: AtomicBool::new(false),
            primed: AtomicBool::new(false),
            delivered: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    /// Accept one frame from the delivery thread.
    ///
    /// Must not block, allocate, or panic: any failure is swallowed and the
    /// frame skipped, leaving the pair unchanged for the next delivery.
    pub fn deliver(&self, data: &[u8], source_stride: usize) {
        // A poisoned lock means a consumer-side panic; skip the frame
        let Ok(mut pair) = self.pair.lock() else {
            return;
        };

        if self.ready.load(Ordering::Acquire) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        }

        if let Err(err) = pair.back.fill_from(data, source_stride) {
            debug!(%err, "skipping frame");
            return;
        }

        if !self.primed.swap(true, Ordering::AcqRel) {
            // First sample only warms the back buffer
            return;
        }

        let BufferPair { front, back } = &mut *pair;
        std::mem::swap(front, back);
        self.ready.store(true, Ordering::Release);
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// Consume the pending frame, if any: test-and-clear the ready flag and
    /// exchange the front buffer with `present` (a pointer swap, no byte
    /// copy). Returns whether `present` now holds a new frame.
    ///
    /// Consumer-thread API; never waits on the producer.
    pub fn take_into(&self, present: &mut FrameBuffer) -> bool {
        let Ok(mut pair) = self.pair.lock() else {
            return false;
        };

        if !self.ready.swap(false, Ordering::AcqRel) {
            return false;
        }

        std::mem::swap(&mut pair.front, present);
        true
    }

    /// Whether an unconsumed frame is waiting
    pub fn has_pending(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> FrameStats {
        FrameStats {
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sampler(width: u32, height: u32) -> FrameSampler {
        FrameSampler::new(FrameGeometry::new(width, height))
    }

    fn frame(geometry: FrameGeometry, value: u8) -> Vec<u8> {
        vec![value; geometry.buffer_bytes()]
    }

    #[test]
    fn test_first_delivery_only_primes() {
        let s = sampler(4, 4);
        let geometry = s.geometry();

        s.deliver(&frame(geometry, 0x11), geometry.row_bytes());
        assert!(!s.has_pending());

        let mut present = FrameBuffer::new(geometry);
        assert!(!s.take_into(&mut present));
    }

    #[test]
    fn test_second_delivery_promotes() {
        let s = sampler(4, 4);
        let geometry = s.geometry();

        s.deliver(&frame(geometry, 0x11), geometry.row_bytes());
        s.deliver(&frame(geometry, 0x22), geometry.row_bytes());
        assert!(s.has_pending());

        let mut present = FrameBuffer::new(geometry);
        assert!(s.take_into(&mut present));
        assert!(present.bytes().iter().all(|&b| b == 0x22));
    }

    #[test]
    fn test_unconsumed_frame_wins_over_newer() {
        let s = sampler(4, 4);
        let geometry = s.geometry();

        s.deliver(&frame(geometry, 0x01), geometry.row_bytes()); // warm-up
        s.deliver(&frame(geometry, 0x02), geometry.row_bytes()); // held
        s.deliver(&frame(geometry, 0x03), geometry.row_bytes()); // dropped

        let mut present = FrameBuffer::new(geometry);
        assert!(s.take_into(&mut present));
        assert!(present.bytes().iter().all(|&b| b == 0x02));
        assert_eq!(s.stats().dropped, 1);
    }

    #[test]
    fn test_take_is_one_shot() {
        let s = sampler(4, 4);
        let geometry = s.geometry();

        s.deliver(&frame(geometry, 0x01), geometry.row_bytes());
        s.deliver(&frame(geometry, 0x02), geometry.row_bytes());

        let mut present = FrameBuffer::new(geometry);
        assert!(s.take_into(&mut present));
        assert!(!s.take_into(&mut present));
    }

    #[test]
    fn test_padded_source_stride() {
        let s = sampler(2, 2);
        let geometry = s.geometry();
        let stride = 16;
        let mut padded = vec![0xAA; stride * 2];
        padded[..6].fill(0x01);
        padded[stride..stride + 6].fill(0x01);

        s.deliver(&padded, stride); // warm-up
        s.deliver(&padded, stride);

        let mut present = FrameBuffer::new(geometry);
        assert!(s.take_into(&mut present));
        assert!(present.bytes().iter().all(|&b| b == 0x01));
    }

    #[test]
    fn test_undersized_delivery_is_skipped() {
        let s = sampler(4, 4);
        let geometry = s.geometry();

        s.deliver(&frame(geometry, 0x01), geometry.row_bytes());
        // Truncated frame is skipped without promoting anything
        s.deliver(&[0u8; 3], geometry.row_bytes());
        assert!(!s.has_pending());

        s.deliver(&frame(geometry, 0x02), geometry.row_bytes());
        let mut present = FrameBuffer::new(geometry);
        assert!(s.take_into(&mut present));
        assert!(present.bytes().iter().all(|&b| b == 0x02));
    }
}
