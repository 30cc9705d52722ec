// SPDX-License-Identifier: GPL-3.0-only

//! PipeWire camera backend
//!
//! The production backend: devices come from the PipeWire graph, frames
//! from a GStreamer pipeline, and controls from the V4L2 node backing the
//! camera (resolved once at bind time).

mod enumeration;
mod graph;

pub use enumeration::enumerate_devices;
pub use graph::PipeWireGraph;

use super::controls::V4l2Controls;
use super::sampler::FrameSampler;
use super::types::{CaptureDevice, DeviceHandle, FrameGeometry};
use super::{CaptureBackend, CaptureGraph};
use crate::errors::{CaptureError, CaptureResult};
use std::sync::Arc;
use tracing::{debug, info};

/// Check that GStreamer initializes and the PipeWire source element exists
pub fn is_pipewire_available() -> bool {
    if gstreamer::init().is_err() {
        return false;
    }
    gstreamer::ElementFactory::find("pipewiresrc").is_some()
}

/// PipeWire backend implementation
pub struct PipeWireBackend {
    _private: (),
}

impl PipeWireBackend {
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl Default for PipeWireBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureBackend for PipeWireBackend {
    fn is_available(&self) -> bool {
        is_pipewire_available()
    }

    fn list_devices(&self) -> CaptureResult<Vec<CaptureDevice>> {
        enumeration::enumerate_devices()
    }

    fn bind(&self, index: usize) -> CaptureResult<DeviceHandle> {
        // Fresh enumeration on every bind: the index refers to the list as
        // it is now, not as it was when last shown
        let devices = self.list_devices()?;
        let device = devices
            .get(index)
            .cloned()
            .ok_or(CaptureError::DeviceNotFound {
                index,
                available: devices.len(),
            })?;

        let controls = device
            .control_path
            .as_deref()
            .and_then(V4l2Controls::probe);
        info!(
            device = %device.name,
            has_controls = controls.is_some(),
            "bound capture device"
        );

        Ok(DeviceHandle::new(device, controls))
    }

    fn build_graph(
        &self,
        device: &DeviceHandle,
        geometry: FrameGeometry,
        sampler: Arc<FrameSampler>,
    ) -> CaptureResult<Box<dyn CaptureGraph>> {
        gstreamer::init().map_err(|e| CaptureError::Backend(e.to_string()))?;
        debug!("GStreamer initialized");

        let graph = PipeWireGraph::build(device.device(), geometry, sampler)?;
        Ok(Box::new(graph))
    }
}
