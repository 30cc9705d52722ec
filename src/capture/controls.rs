// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 control pass-through for bound devices
//!
//! Exposure, brightness and friends are not part of the capture graph: they
//! are set directly on the kernel control device via V4L2 ioctls.
//! Inspired by [cameractrls](https://github.com/soyersoyer/cameractrls).

use super::DeviceControls;
use super::types::{ControlId, ControlRange};
use crate::errors::{CaptureError, CaptureResult};
use std::fs::File;
use std::os::unix::io::AsRawFd;
use tracing::{debug, warn};

// ===== V4L2 Control Class Bases =====
const V4L2_CTRL_CLASS_USER: u32 = 0x0098_0000;
const V4L2_CTRL_CLASS_CAMERA: u32 = 0x009a_0000;

const V4L2_CID_BASE: u32 = V4L2_CTRL_CLASS_USER | 0x900;
const V4L2_CID_CAMERA_CLASS_BASE: u32 = V4L2_CTRL_CLASS_CAMERA | 0x900;

// ===== V4L2 Control IDs =====
const V4L2_CID_BRIGHTNESS: u32 = V4L2_CID_BASE;
const V4L2_CID_CONTRAST: u32 = V4L2_CID_BASE + 1;
const V4L2_CID_SATURATION: u32 = V4L2_CID_BASE + 2;
const V4L2_CID_GAIN: u32 = V4L2_CID_BASE + 19;
const V4L2_CID_WHITE_BALANCE_TEMPERATURE: u32 = V4L2_CID_BASE + 26;
const V4L2_CID_SHARPNESS: u32 = V4L2_CID_BASE + 27;

/// Exposure mode: auto, manual, shutter priority, aperture priority
const V4L2_CID_EXPOSURE_AUTO: u32 = V4L2_CID_CAMERA_CLASS_BASE + 1;
/// Absolute exposure time in 100µs units
const V4L2_CID_EXPOSURE_ABSOLUTE: u32 = V4L2_CID_CAMERA_CLASS_BASE + 2;
const V4L2_CID_FOCUS_ABSOLUTE: u32 = V4L2_CID_CAMERA_CLASS_BASE + 10;

/// Manual exposure time and iris
const V4L2_EXPOSURE_MANUAL: i32 = 1;

// ===== V4L2 Control Flags =====
const V4L2_CTRL_FLAG_DISABLED: u32 = 0x0001;

// ===== V4L2 ioctl Numbers =====
// Calculated as: (dir << 30) | (size << 16) | ('V' << 8) | nr

/// Get control value (v4l2_control: 8 bytes)
const VIDIOC_G_CTRL: libc::c_ulong = 0xC008561B;
/// Set control value (v4l2_control: 8 bytes)
const VIDIOC_S_CTRL: libc::c_ulong = 0xC008561C;
/// Query control info (v4l2_queryctrl: 68 bytes)
const VIDIOC_QUERYCTRL: libc::c_ulong = 0xC0445624;

// ===== V4L2 ioctl Structures =====

#[repr(C)]
struct V4l2Control {
    id: u32,
    value: i32,
}

#[repr(C)]
struct V4l2Queryctrl {
    id: u32,
    ctrl_type: u32,
    name: [u8; 32],
    minimum: i32,
    maximum: i32,
    step: i32,
    default_value: i32,
    flags: u32,
    reserved: [u32; 2],
}

/// Map a control identifier to its V4L2 control ID
fn cid(control: ControlId) -> u32 {
    match control {
        ControlId::Brightness => V4L2_CID_BRIGHTNESS,
        ControlId::Contrast => V4L2_CID_CONTRAST,
        ControlId::Saturation => V4L2_CID_SATURATION,
        ControlId::Sharpness => V4L2_CID_SHARPNESS,
        ControlId::Gain => V4L2_CID_GAIN,
        ControlId::WhiteBalance => V4L2_CID_WHITE_BALANCE_TEMPERATURE,
        ControlId::Exposure => V4L2_CID_EXPOSURE_ABSOLUTE,
        ControlId::Focus => V4L2_CID_FOCUS_ABSOLUTE,
    }
}

/// V4L2-backed control capability for one device node.
///
/// Resolved once when a device is bound; `probe` returns `None` when the
/// node exposes no usable control, so unsupported devices surface as a
/// missing capability instead of per-call ioctl errors.
pub struct V4l2Controls {
    device_path: String,
}

impl V4l2Controls {
    /// Check the device node for at least one supported control
    pub fn probe(device_path: &str) -> Option<Box<dyn DeviceControls>> {
        if File::open(device_path).is_err() {
            debug!(device_path, "control device not accessible");
            return None;
        }

        let controls = V4l2Controls {
            device_path: device_path.to_string(),
        };

        let supported = ControlId::ALL
            .iter()
            .any(|&control| controls.query(control).is_ok());
        if !supported {
            debug!(device_path, "device exposes no supported controls");
            return None;
        }

        Some(Box::new(controls))
    }

    fn query(&self, control: ControlId) -> CaptureResult<V4l2Queryctrl> {
        let file = self.open()?;
        let fd = file.as_raw_fd();

        let mut qctrl = V4l2Queryctrl {
            id: cid(control),
            ctrl_type: 0,
            name: [0; 32],
            minimum: 0,
            maximum: 0,
            step: 0,
            default_value: 0,
            flags: 0,
            reserved: [0; 2],
        };

        let result = unsafe { libc::ioctl(fd, VIDIOC_QUERYCTRL, &mut qctrl as *mut V4l2Queryctrl) };
        if result < 0 || qctrl.flags & V4L2_CTRL_FLAG_DISABLED != 0 {
            return Err(CaptureError::PropertyUnsupported(control));
        }

        Ok(qctrl)
    }

    fn open(&self) -> CaptureResult<File> {
        File::open(&self.device_path).map_err(|e| CaptureError::Backend(e.to_string()))
    }
}

impl DeviceControls for V4l2Controls {
    fn range(&self, control: ControlId) -> CaptureResult<ControlRange> {
        let qctrl = self.query(control)?;
        Ok(ControlRange {
            minimum: qctrl.minimum,
            maximum: qctrl.maximum,
            step: qctrl.step,
            default_value: qctrl.default_value,
        })
    }

    fn get(&self, control: ControlId) -> CaptureResult<i32> {
        // Confirm support first so absent controls report as unsupported,
        // not as an ioctl failure
        self.query(control)?;

        let file = self.open()?;
        let fd = file.as_raw_fd();

        let mut ctrl = V4l2Control {
            id: cid(control),
            value: 0,
        };

        let result = unsafe { libc::ioctl(fd, VIDIOC_G_CTRL, &mut ctrl as *mut V4l2Control) };
        if result < 0 {
            let errno = std::io::Error::last_os_error();
            return Err(CaptureError::Backend(format!(
                "failed to read {}: {}",
                control, errno
            )));
        }

        Ok(ctrl.value)
    }

    fn set(&self, control: ControlId, value: i32) -> CaptureResult<()> {
        self.query(control)?;

        let file = self.open()?;
        let fd = file.as_raw_fd();

        // Manual exposure values are ignored while auto-exposure is active
        if control == ControlId::Exposure {
            let mut mode = V4l2Control {
                id: V4L2_CID_EXPOSURE_AUTO,
                value: V4L2_EXPOSURE_MANUAL,
            };
            let result = unsafe { libc::ioctl(fd, VIDIOC_S_CTRL, &mut mode as *mut V4l2Control) };
            if result < 0 {
                debug!(device_path = %self.device_path, "could not switch to manual exposure");
            }
        }

        let mut ctrl = V4l2Control {
            id: cid(control),
            value,
        };

        let result = unsafe { libc::ioctl(fd, VIDIOC_S_CTRL, &mut ctrl as *mut V4l2Control) };
        if result < 0 {
            let errno = std::io::Error::last_os_error();
            warn!(
                device_path = %self.device_path,
                %control,
                value,
                %errno,
                "failed to set control"
            );
            return Err(CaptureError::Backend(format!(
                "failed to set {}: {}",
                control, errno
            )));
        }

        if ctrl.value != value {
            debug!(
                device_path = %self.device_path,
                %control,
                requested = value,
                actual = ctrl.value,
                "control value was clamped by the driver"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_id_values() {
        assert_eq!(cid(ControlId::Brightness), 0x00980900);
        assert_eq!(cid(ControlId::Gain), 0x00980913);
        assert_eq!(cid(ControlId::Exposure), 0x009a0902);
        assert_eq!(cid(ControlId::Focus), 0x009a090a);
    }

    #[test]
    fn test_probe_missing_device() {
        assert!(V4l2Controls::probe("/dev/nonexistent-video-node").is_none());
    }
}
