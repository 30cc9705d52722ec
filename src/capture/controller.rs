// SPDX-License-Identifier: GPL-3.0-only

//! Capture session facade and state machine
//!
//! The controller composes enumeration, graph construction and the frame
//! hand-off behind one consumer-thread API. Session states:
//!
//! ```text
//! Uninitialized ── initialize ──▶ Configured ── start ──▶ Running
//!       ▲                            │  ▲                   │
//!       └────────── cleanup ─────────┘  └────── stop ───────┘
//! ```
//!
//! All methods are consumer-thread API; only the sampler inside the session
//! is touched by the delivery thread.

use super::sampler::{FrameSampler, FrameStats};
use super::types::{CaptureDevice, ControlId, ControlRange, DeviceHandle, FrameBuffer, FrameGeometry};
use super::{CaptureBackend, CaptureGraph, DeviceControls};
use crate::errors::{CaptureError, CaptureResult};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Uninitialized,
    Configured,
    Running,
}

/// One capture session's resources. Exists iff the controller is
/// initialized; exactly one graph per session.
struct CaptureSession {
    device: DeviceHandle,
    geometry: FrameGeometry,
    /// Exclusively owned; released before the buffers on teardown
    graph: Box<dyn CaptureGraph>,
    /// Shared with the graph's delivery callback
    sampler: Arc<FrameSampler>,
    /// Consumer-owned buffer the front buffer is exchanged into on consume
    present: FrameBuffer,
}

/// Facade over device enumeration, graph lifecycle and frame consumption
pub struct CaptureController {
    backend: Box<dyn CaptureBackend>,
    geometry: FrameGeometry,
    state: SessionState,
    session: Option<CaptureSession>,
}

impl CaptureController {
    /// Create an empty (uninitialized) controller
    pub fn new(backend: Box<dyn CaptureBackend>, geometry: FrameGeometry) -> Self {
        Self {
            backend,
            geometry,
            state: SessionState::Uninitialized,
            session: None,
        }
    }

    /// List capture devices in platform order. Valid in any state; every
    /// call re-enumerates, so indices may go stale across calls.
    pub fn list_available_cameras(&self) -> CaptureResult<Vec<CaptureDevice>> {
        self.backend.list_devices()
    }

    /// Bind a device and build its capture graph and hand-off buffers.
    ///
    /// On any failure everything built so far is released, the controller
    /// stays uninitialized, and the call may be retried with the same or
    /// another index. Calling on an initialized controller is a no-op.
    pub fn initialize(&mut self, device_index: usize) -> CaptureResult<()> {
        if self.session.is_some() {
            debug!("already initialized");
            return Ok(());
        }

        let device = self.backend.bind(device_index)?;
        let sampler = Arc::new(FrameSampler::new(self.geometry));
        // A build failure drops the handle and sampler right here; no
        // partial graph survives
        let graph = self
            .backend
            .build_graph(&device, self.geometry, Arc::clone(&sampler))?;

        info!(
            device = %device.device().name,
            geometry = %self.geometry,
            "capture session configured"
        );

        self.session = Some(CaptureSession {
            device,
            geometry: self.geometry,
            graph,
            sampler,
            present: FrameBuffer::new(self.geometry),
        });
        self.state = SessionState::Configured;
        Ok(())
    }

    /// Start frame delivery. Idempotent while running.
    pub fn start_capture(&mut self) -> CaptureResult<()> {
        match self.state {
            SessionState::Uninitialized => Err(CaptureError::NotInitialized),
            SessionState::Running => {
                debug!("capture already running");
                Ok(())
            }
            SessionState::Configured => {
                let session = self.session.as_mut().ok_or(CaptureError::NotInitialized)?;
                session.graph.run()?;
                self.state = SessionState::Running;
                info!("capture started");
                Ok(())
            }
        }
    }

    /// Halt frame delivery. No-op when not running; safe to call while a
    /// delivery is in flight — the graph quiesces before this returns, and
    /// the delivery path holds its own reference to the buffers.
    pub fn stop_capture(&mut self) -> CaptureResult<()> {
        if self.state != SessionState::Running {
            return Ok(());
        }

        let session = self.session.as_mut().ok_or(CaptureError::NotInitialized)?;
        let result = session.graph.stop();
        // Delivery is down even if the state change reported an error
        self.state = SessionState::Configured;
        info!("capture stopped");
        result
    }

    /// Consume the latest frame, if one is pending: test-and-clear the
    /// ready flag and exchange the front buffer into the session's present
    /// buffer. Never blocks; returns `None` until the next delivery.
    ///
    /// Call once per consumer tick.
    pub fn latest_frame(&mut self) -> Option<&FrameBuffer> {
        let session = self.session.as_mut()?;
        if session.sampler.take_into(&mut session.present) {
            Some(&session.present)
        } else {
            None
        }
    }

    /// Whether a session is configured (graph and buffers exist)
    pub fn is_opened(&self) -> bool {
        self.state != SessionState::Uninitialized
    }

    /// Whether frames are being delivered
    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    /// The device bound by the current session
    pub fn current_device(&self) -> Option<&CaptureDevice> {
        self.session.as_ref().map(|s| s.device.device())
    }

    /// Geometry negotiated for the current session
    pub fn current_geometry(&self) -> Option<FrameGeometry> {
        self.session.as_ref().map(|s| s.geometry)
    }

    /// Delivery statistics for the current session
    pub fn delivery_stats(&self) -> FrameStats {
        self.session
            .as_ref()
            .map(|s| s.sampler.stats())
            .unwrap_or_default()
    }

    /// Supported range of a device control, for presenting a slider
    pub fn property_range(&self, control: ControlId) -> CaptureResult<ControlRange> {
        self.controls(control)?.range(control)
    }

    /// Current value of a device control
    pub fn get_property(&self, control: ControlId) -> CaptureResult<i32> {
        self.controls(control)?.get(control)
    }

    /// Set a device control. Failures are local: capture state is never
    /// affected by a rejected property write.
    pub fn set_property(&self, control: ControlId, value: i32) -> CaptureResult<()> {
        self.controls(control)?.set(control, value)
    }

    /// Release the session: stop delivery, then the graph, then the
    /// buffers, in that order. Idempotent; also runs on drop.
    pub fn cleanup(&mut self) {
        if let Err(err) = self.stop_capture() {
            warn!(%err, "error while stopping capture during cleanup");
        }

        if let Some(session) = self.session.take() {
            // Field order drops the graph before the sampler: delivery is
            // fully torn down before the buffers can go away
            drop(session);
            debug!("capture session released");
        }

        self.state = SessionState::Uninitialized;
    }

    fn controls(&self, control: ControlId) -> CaptureResult<&dyn DeviceControls> {
        let session = self.session.as_ref().ok_or(CaptureError::NotInitialized)?;
        session
            .device
            .controls()
            .ok_or(CaptureError::PropertyUnsupported(control))
    }
}

impl Drop for CaptureController {
    fn drop(&mut self) {
        self.cleanup();
    }
}
