// SPDX-License-Identifier: GPL-3.0-only

//! Shared types for capture backends

use super::DeviceControls;
use crate::constants::pipeline;
use crate::errors::{CaptureError, CaptureResult};
use std::fmt;

/// Represents a camera device discovered by enumeration.
///
/// Identity is positional: the index within one enumeration pass. Hot-plug
/// can reorder devices between passes, so indices must not be stored across
/// re-enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureDevice {
    /// Human-readable device name
    pub name: String,
    /// Backend-specific stream target (PipeWire object serial), if known
    pub target: Option<String>,
    /// Control device path (e.g. /dev/video0) for property access, if known
    pub control_path: Option<String>,
}

impl fmt::Display for CaptureDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Negotiated frame geometry for one capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    pub width: u32,
    pub height: u32,
}

impl FrameGeometry {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Packed row length in bytes
    pub fn row_bytes(&self) -> usize {
        self.width as usize * pipeline::BYTES_PER_PIXEL
    }

    /// Total buffer size in bytes
    pub fn buffer_bytes(&self) -> usize {
        self.row_bytes() * self.height as usize
    }
}

impl fmt::Display for FrameGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One raw pixel buffer in the fixed interception format (packed RGB24).
///
/// Two of these form the producer/consumer hand-off pair; they trade roles
/// by pointer exchange (`std::mem::swap` swaps the heap pointers), never by
/// copying pixel data between them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    geometry: FrameGeometry,
    bytes: Vec<u8>,
}

impl FrameBuffer {
    /// Allocate a zeroed buffer for the given geometry
    pub fn new(geometry: FrameGeometry) -> Self {
        Self {
            geometry,
            bytes: vec![0; geometry.buffer_bytes()],
        }
    }

    pub fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// One packed RGB row
    pub fn row(&self, y: u32) -> &[u8] {
        let stride = self.geometry.row_bytes();
        let start = y as usize * stride;
        &self.bytes[start..start + stride]
    }

    /// Copy an incoming frame into this buffer row by row, honoring the
    /// source stride (source rows may be padded; ours are packed).
    ///
    /// Runs on the delivery thread: no allocation, bounded by one frame.
    pub fn fill_from(&mut self, data: &[u8], source_stride: usize) -> CaptureResult<()> {
        let row_len = self.geometry.row_bytes();
        let rows = self.geometry.height as usize;
        if rows == 0 {
            return Ok(());
        }

        let required = source_stride
            .checked_mul(rows - 1)
            .and_then(|n| n.checked_add(row_len))
            .ok_or(CaptureError::FrameCopy {
                expected: usize::MAX,
                actual: data.len(),
            })?;

        if source_stride < row_len || data.len() < required {
            return Err(CaptureError::FrameCopy {
                expected: required.max(row_len * rows),
                actual: data.len(),
            });
        }

        for (y, row) in self.bytes.chunks_exact_mut(row_len).enumerate() {
            let start = y * source_stride;
            row.copy_from_slice(&data[start..start + row_len]);
        }

        Ok(())
    }
}

/// Identifier of a device control exposed through property access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlId {
    Brightness,
    Contrast,
    Saturation,
    Sharpness,
    Gain,
    WhiteBalance,
    Exposure,
    Focus,
}

impl ControlId {
    /// All controls, in the order the probe output lists them
    pub const ALL: [ControlId; 8] = [
        ControlId::Brightness,
        ControlId::Contrast,
        ControlId::Saturation,
        ControlId::Sharpness,
        ControlId::Gain,
        ControlId::WhiteBalance,
        ControlId::Exposure,
        ControlId::Focus,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            ControlId::Brightness => "brightness",
            ControlId::Contrast => "contrast",
            ControlId::Saturation => "saturation",
            ControlId::Sharpness => "sharpness",
            ControlId::Gain => "gain",
            ControlId::WhiteBalance => "white balance",
            ControlId::Exposure => "exposure",
            ControlId::Focus => "focus",
        }
    }
}

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Supported numeric range of a device control, reported before a UI layer
/// presents a slider for it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlRange {
    pub minimum: i32,
    pub maximum: i32,
    pub step: i32,
    pub default_value: i32,
}

/// A bound capture device.
///
/// Produced by `CaptureBackend::bind`; owns the device identity plus the
/// control capability resolved once at bind time. Deliberately not `Clone`:
/// exactly one handle per session.
pub struct DeviceHandle {
    device: CaptureDevice,
    controls: Option<Box<dyn DeviceControls>>,
}

impl DeviceHandle {
    pub fn new(device: CaptureDevice, controls: Option<Box<dyn DeviceControls>>) -> Self {
        Self { device, controls }
    }

    pub fn device(&self) -> &CaptureDevice {
        &self.device
    }

    /// Control capability resolved at bind time, if the device has one
    pub fn controls(&self) -> Option<&dyn DeviceControls> {
        self.controls.as_deref()
    }
}

impl fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("device", &self.device)
            .field("has_controls", &self.controls.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_sizes() {
        let geometry = FrameGeometry::new(640, 480);
        assert_eq!(geometry.row_bytes(), 640 * 3);
        assert_eq!(geometry.buffer_bytes(), 640 * 480 * 3);
    }

    #[test]
    fn test_fill_from_packed_source() {
        let geometry = FrameGeometry::new(4, 2);
        let mut buffer = FrameBuffer::new(geometry);
        let data: Vec<u8> = (0..24).collect();

        buffer.fill_from(&data, geometry.row_bytes()).unwrap();
        assert_eq!(buffer.bytes(), &data[..]);
    }

    #[test]
    fn test_fill_from_padded_source() {
        // Source rows carry 4 bytes of padding past the pixel data
        let geometry = FrameGeometry::new(2, 2);
        let mut buffer = FrameBuffer::new(geometry);
        let source_stride = 10;
        let mut data = vec![0xEE; 20];
        data[..6].copy_from_slice(&[1, 2, 3, 4, 5, 6]);
        data[10..16].copy_from_slice(&[7, 8, 9, 10, 11, 12]);

        buffer.fill_from(&data, source_stride).unwrap();
        assert_eq!(buffer.bytes(), &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
    }

    #[test]
    fn test_fill_from_short_source_is_rejected() {
        let geometry = FrameGeometry::new(4, 2);
        let mut buffer = FrameBuffer::new(geometry);
        let before = buffer.bytes().to_vec();

        let result = buffer.fill_from(&[0u8; 5], geometry.row_bytes());
        assert!(matches!(result, Err(CaptureError::FrameCopy { .. })));
        // Buffer untouched on failure
        assert_eq!(buffer.bytes(), &before[..]);
    }
}
