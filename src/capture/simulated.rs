// SPDX-License-Identifier: GPL-3.0-only

//! Simulated capture backend
//!
//! Implements the same traits as the PipeWire backend with no hardware
//! behind them: a fixed device list, a control table, and frame delivery
//! that is either hand-driven through a [`DeliveryProbe`] (tests) or
//! produced by a generator thread (`preview --simulated`).
//!
//! Device 0 exposes the simulated control table; additional devices expose
//! none, mirroring how external capture sticks often lack controls.

use super::sampler::FrameSampler;
use super::types::{CaptureDevice, ControlId, ControlRange, DeviceHandle, FrameGeometry};
use super::{CaptureBackend, CaptureGraph, DeviceControls};
use crate::constants::{pipeline, timing};
use crate::errors::{CaptureError, CaptureResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_DEVICE_NAMES: [&str; 2] = ["Integrated Camera (Simulated)", "USB Camera (Simulated)"];

/// Simulated backend with a deterministic device list.
///
/// Cloning shares the probe slot, so a test can keep a clone and reach the
/// delivery probe after handing the backend to a controller.
#[derive(Clone)]
pub struct SimulatedBackend {
    devices: Vec<CaptureDevice>,
    generator_interval: Option<Duration>,
    /// Probe for the most recently built graph, for hand-driven delivery
    probe_slot: Arc<Mutex<Option<DeliveryProbe>>>,
}

impl SimulatedBackend {
    /// Backend with the default device list and hand-driven delivery
    pub fn new() -> Self {
        Self::with_devices(&DEFAULT_DEVICE_NAMES)
    }

    /// Backend with a caller-defined device list, in the given order
    pub fn with_devices(names: &[&str]) -> Self {
        let devices = names
            .iter()
            .map(|name| CaptureDevice {
                name: (*name).to_string(),
                target: None,
                control_path: None,
            })
            .collect();
        Self {
            devices,
            generator_interval: None,
            probe_slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Backend whose graphs generate test-pattern frames while running
    pub fn with_generator() -> Self {
        Self {
            generator_interval: Some(Duration::from_millis(timing::SIMULATED_FRAME_MS)),
            ..Self::new()
        }
    }

    /// Delivery probe for the most recently built graph.
    ///
    /// Lets a test stand in for the delivery thread and push frames by
    /// hand. `None` until a graph has been built.
    pub fn probe(&self) -> Option<DeliveryProbe> {
        self.probe_slot.lock().ok()?.clone()
    }
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureBackend for SimulatedBackend {
    fn is_available(&self) -> bool {
        true
    }

    fn list_devices(&self) -> CaptureResult<Vec<CaptureDevice>> {
        Ok(self.devices.clone())
    }

    fn bind(&self, index: usize) -> CaptureResult<DeviceHandle> {
        let device = self
            .devices
            .get(index)
            .cloned()
            .ok_or(CaptureError::DeviceNotFound {
                index,
                available: self.devices.len(),
            })?;

        let controls: Option<Box<dyn DeviceControls>> = if index == 0 {
            Some(Box::new(SimulatedControls::new()))
        } else {
            None
        };

        debug!(device = %device.name, "bound simulated device");
        Ok(DeviceHandle::new(device, controls))
    }

    fn build_graph(
        &self,
        _device: &DeviceHandle,
        geometry: FrameGeometry,
        sampler: Arc<FrameSampler>,
    ) -> CaptureResult<Box<dyn CaptureGraph>> {
        let running = Arc::new(AtomicBool::new(false));
        let probe = DeliveryProbe {
            sampler: Arc::clone(&sampler),
            running: Arc::clone(&running),
        };
        if let Ok(mut slot) = self.probe_slot.lock() {
            *slot = Some(probe);
        }

        Ok(Box::new(SimulatedGraph {
            geometry,
            sampler,
            running,
            generator_interval: self.generator_interval,
            worker: None,
        }))
    }
}

/// Stand-in for the capture subsystem's delivery thread.
///
/// Shares the sampler and run flag with the graph; deliveries are accepted
/// only while the graph is running, like a real callback registration.
#[derive(Clone)]
pub struct DeliveryProbe {
    sampler: Arc<FrameSampler>,
    running: Arc<AtomicBool>,
}

impl DeliveryProbe {
    /// Deliver one frame as the capture subsystem would.
    /// Returns false when the graph is not running (frame ignored).
    pub fn deliver(&self, data: &[u8], source_stride: usize) -> bool {
        if !self.running.load(Ordering::Acquire) {
            return false;
        }
        self.sampler.deliver(data, source_stride);
        true
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Simulated capture graph: delivery gate plus optional generator thread
struct SimulatedGraph {
    geometry: FrameGeometry,
    sampler: Arc<FrameSampler>,
    running: Arc<AtomicBool>,
    generator_interval: Option<Duration>,
    worker: Option<JoinHandle<()>>,
}

impl CaptureGraph for SimulatedGraph {
    fn run(&mut self) -> CaptureResult<()> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        if let Some(interval) = self.generator_interval {
            let geometry = self.geometry;
            let sampler = Arc::clone(&self.sampler);
            let running = Arc::clone(&self.running);

            self.worker = Some(std::thread::spawn(move || {
                info!(%geometry, "simulated generator started");
                let mut scratch = vec![0u8; geometry.buffer_bytes()];
                let mut tick: u32 = 0;
                while running.load(Ordering::Acquire) {
                    paint_test_pattern(&mut scratch, geometry, tick);
                    sampler.deliver(&scratch, geometry.row_bytes());
                    tick = tick.wrapping_add(1);
                    std::thread::sleep(interval);
                }
                info!("simulated generator stopped");
            }));
        }

        Ok(())
    }

    fn stop(&mut self) -> CaptureResult<()> {
        self.running.store(false, Ordering::Release);
        // Wait out the generator so no delivery outlives the stop request
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        Ok(())
    }
}

impl Drop for SimulatedGraph {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Paint a moving gradient with a sweeping vertical bar
fn paint_test_pattern(buffer: &mut [u8], geometry: FrameGeometry, tick: u32) {
    let width = geometry.width.max(1);
    let height = geometry.height.max(1);
    let bar = tick.wrapping_mul(4) % width;

    for y in 0..height {
        let row_start = y as usize * geometry.row_bytes();
        for x in 0..width {
            let at = row_start + x as usize * pipeline::BYTES_PER_PIXEL;
            if x == bar {
                buffer[at] = 0xFF;
                buffer[at + 1] = 0xFF;
                buffer[at + 2] = 0xFF;
            } else {
                buffer[at] = (x * 255 / width) as u8;
                buffer[at + 1] = (y * 255 / height) as u8;
                buffer[at + 2] = (tick % 256) as u8;
            }
        }
    }
}

/// Table-backed control capability for the simulated camera
struct SimulatedControls {
    ranges: HashMap<ControlId, ControlRange>,
    values: Mutex<HashMap<ControlId, i32>>,
}

impl SimulatedControls {
    fn new() -> Self {
        let ranges: HashMap<ControlId, ControlRange> = [
            (
                ControlId::Brightness,
                ControlRange {
                    minimum: -64,
                    maximum: 64,
                    step: 1,
                    default_value: 0,
                },
            ),
            (
                ControlId::Contrast,
                ControlRange {
                    minimum: 0,
                    maximum: 95,
                    step: 1,
                    default_value: 32,
                },
            ),
            (
                ControlId::Exposure,
                ControlRange {
                    minimum: 3,
                    maximum: 2047,
                    step: 1,
                    default_value: 250,
                },
            ),
            (
                ControlId::Gain,
                ControlRange {
                    minimum: 0,
                    maximum: 255,
                    step: 1,
                    default_value: 64,
                },
            ),
        ]
        .into_iter()
        .collect();

        let values = ranges
            .iter()
            .map(|(&control, range)| (control, range.default_value))
            .collect();

        Self {
            ranges,
            values: Mutex::new(values),
        }
    }
}

impl DeviceControls for SimulatedControls {
    fn range(&self, control: ControlId) -> CaptureResult<ControlRange> {
        self.ranges
            .get(&control)
            .copied()
            .ok_or(CaptureError::PropertyUnsupported(control))
    }

    fn get(&self, control: ControlId) -> CaptureResult<i32> {
        let values = self
            .values
            .lock()
            .map_err(|_| CaptureError::Backend("control table poisoned".to_string()))?;
        values
            .get(&control)
            .copied()
            .ok_or(CaptureError::PropertyUnsupported(control))
    }

    fn set(&self, control: ControlId, value: i32) -> CaptureResult<()> {
        let range = self.range(control)?;
        // Drivers clamp out-of-range values rather than reject them
        let clamped = value.clamp(range.minimum, range.maximum);
        if clamped != value {
            debug!(%control, requested = value, actual = clamped, "control value clamped");
        }

        let mut values = self
            .values
            .lock()
            .map_err(|_| CaptureError::Backend("control table poisoned".to_string()))?;
        values.insert(control, clamped);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_rejects_delivery_while_stopped() {
        let backend = SimulatedBackend::new();
        let geometry = FrameGeometry::new(4, 4);
        let sampler = Arc::new(FrameSampler::new(geometry));
        let handle = backend.bind(0).unwrap();
        let mut graph = backend
            .build_graph(&handle, geometry, Arc::clone(&sampler))
            .unwrap();

        let probe = backend.probe().unwrap();
        let frame = vec![1u8; geometry.buffer_bytes()];
        assert!(!probe.deliver(&frame, geometry.row_bytes()));

        graph.run().unwrap();
        assert!(probe.deliver(&frame, geometry.row_bytes()));

        graph.stop().unwrap();
        assert!(!probe.deliver(&frame, geometry.row_bytes()));
    }

    #[test]
    fn test_simulated_controls_clamp() {
        let controls = SimulatedControls::new();
        controls.set(ControlId::Brightness, 1000).unwrap();
        assert_eq!(controls.get(ControlId::Brightness).unwrap(), 64);
    }

    #[test]
    fn test_unsupported_control() {
        let controls = SimulatedControls::new();
        assert!(matches!(
            controls.range(ControlId::Focus),
            Err(CaptureError::PropertyUnsupported(ControlId::Focus))
        ));
    }

    #[test]
    fn test_pattern_fits_buffer() {
        let geometry = FrameGeometry::new(17, 9);
        let mut buffer = vec![0u8; geometry.buffer_bytes()];
        paint_test_pattern(&mut buffer, geometry, 123);
    }
}
