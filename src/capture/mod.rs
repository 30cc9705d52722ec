// SPDX-License-Identifier: GPL-3.0-only

//! Capture backend abstraction
//!
//! This module provides a trait-based abstraction over the platform capture
//! subsystem, so the controller and viewer are identical over the real
//! PipeWire backend and the simulated one used by tests and demo mode.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │  Viewer / CLI shell  │
//! └──────────┬───────────┘
//!            │
//!            ▼
//! ┌──────────────────────┐
//! │  CaptureController   │  ← session state machine, frame consumption
//! └──────────┬───────────┘
//!            │
//!            ▼
//! ┌──────────────────────┐
//! │ CaptureBackend trait │  ← enumerate, bind, build graph
//! └──────────┬───────────┘
//!            │
//!      ┌─────┴──────┐
//!      ▼            ▼
//! ┌─────────┐ ┌───────────┐
//! │PipeWire │ │ Simulated │
//! └─────────┘ └───────────┘
//! ```
//!
//! Every graph delivers frames into a shared [`FrameSampler`] on a thread
//! the application does not control; the controller polls the sampler from
//! the consumer thread. See [`sampler`] for the hand-off contract.

pub mod controller;
pub mod controls;
pub mod pipewire;
pub mod sampler;
pub mod simulated;
pub mod types;

pub use controller::CaptureController;
pub use sampler::{FrameSampler, FrameStats};
pub use types::{CaptureDevice, ControlId, ControlRange, DeviceHandle, FrameBuffer, FrameGeometry};

use crate::errors::CaptureResult;
use std::sync::Arc;

/// Platform capture capability consumed by the controller
pub trait CaptureBackend: Send {
    /// Whether the backend can run on this system at all
    fn is_available(&self) -> bool;

    /// Enumerate capture devices in platform order.
    ///
    /// Re-enumerates on every call — device availability may change between
    /// calls, and indices are stale after any re-enumeration. An empty list
    /// is a valid result, not an error.
    fn list_devices(&self) -> CaptureResult<Vec<CaptureDevice>>;

    /// Resolve an enumeration index to a bound device handle.
    ///
    /// Also resolves the device's control capability once; the handle
    /// caches it for the lifetime of the session.
    fn bind(&self, index: usize) -> CaptureResult<DeviceHandle>;

    /// Construct the capture graph for a bound device:
    /// source → sample interceptor (fixed RGB24, `sampler` as callback) →
    /// inert sink. The returned graph is built but not running.
    fn build_graph(
        &self,
        device: &DeviceHandle,
        geometry: FrameGeometry,
        sampler: Arc<FrameSampler>,
    ) -> CaptureResult<Box<dyn CaptureGraph>>;
}

/// A constructed capture graph, exclusively owned by its session.
///
/// Dropping the graph tears it down; `stop` must quiesce delivery before
/// any buffer it feeds can be released.
pub trait CaptureGraph: Send {
    /// Start (or resume) frame delivery
    fn run(&mut self) -> CaptureResult<()>;

    /// Halt frame delivery. Returns only after any in-flight delivery
    /// callback has completed.
    fn stop(&mut self) -> CaptureResult<()>;
}

/// Control capability of a bound device, resolved once at bind time
pub trait DeviceControls: Send {
    /// Supported numeric range of a control
    fn range(&self, control: ControlId) -> CaptureResult<ControlRange>;

    /// Current value of a control
    fn get(&self, control: ControlId) -> CaptureResult<i32>;

    /// Set a control to a value within its reported range
    fn set(&self, control: ControlId, value: i32) -> CaptureResult<()>;
}

/// Get the production backend for this platform
pub fn default_backend() -> Box<dyn CaptureBackend> {
    Box::new(pipewire::PipeWireBackend::new())
}
