// SPDX-License-Identifier: GPL-3.0-only

//! PipeWire camera enumeration
//!
//! Discovers Video/Source nodes by parsing `pw-cli ls Node` output, the
//! same view of the graph the PipeWire tools present. Ordering follows the
//! node listing, which is stable within one daemon run.

use super::is_pipewire_available;
use crate::capture::types::CaptureDevice;
use crate::errors::{CaptureError, CaptureResult};
use tracing::{debug, info};

/// Enumerate cameras visible through PipeWire.
///
/// Fails only when the capture subsystem itself is unavailable; a running
/// PipeWire with no cameras yields an empty list. When the `pw-cli` tool is
/// missing, a single auto-selected device is reported and PipeWire picks
/// the stream target itself.
pub fn enumerate_devices() -> CaptureResult<Vec<CaptureDevice>> {
    if !is_pipewire_available() {
        return Err(CaptureError::Enumeration(
            "PipeWire source element not available".to_string(),
        ));
    }

    match list_video_source_nodes() {
        Some(devices) => {
            debug!(count = devices.len(), "enumerated PipeWire cameras");
            Ok(devices)
        }
        None => {
            info!("pw-cli unavailable, falling back to PipeWire auto-selection");
            Ok(vec![CaptureDevice {
                name: "Default Camera (PipeWire)".to_string(),
                target: None,
                control_path: None,
            }])
        }
    }
}

/// Parse `pw-cli ls Node` for Video/Source nodes
fn list_video_source_nodes() -> Option<Vec<CaptureDevice>> {
    let output = std::process::Command::new("pw-cli")
        .args(["ls", "Node"])
        .output()
        .ok()?;

    if !output.status.success() {
        debug!("pw-cli ls Node failed");
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut devices = Vec::new();
    let mut node = NodeProperties::default();

    for line in stdout.lines() {
        let trimmed = line.trim();

        // Each node block starts with: id 76, type PipeWire:Interface:Node/3
        if trimmed.starts_with("id ") && trimmed.contains("type PipeWire:Interface:Node") {
            if let Some(device) = node.into_device() {
                devices.push(device);
            }
            node = NodeProperties::default();
            continue;
        }

        if trimmed.contains("media.class") && trimmed.contains("\"Video/Source\"") {
            node.is_video_source = true;
        } else if trimmed.contains("object.serial") {
            node.serial = quoted_value(trimmed);
        } else if trimmed.contains("object.path") {
            node.object_path = quoted_value(trimmed);
        } else if trimmed.contains("node.description") {
            node.description = quoted_value(trimmed);
        }
    }

    if let Some(device) = node.into_device() {
        devices.push(device);
    }

    debug!(count = devices.len(), "pw-cli listed video sources");
    Some(devices)
}

/// Properties collected for one node block of pw-cli output
#[derive(Default)]
struct NodeProperties {
    is_video_source: bool,
    serial: Option<String>,
    object_path: Option<String>,
    description: Option<String>,
}

impl NodeProperties {
    fn into_device(self) -> Option<CaptureDevice> {
        if !self.is_video_source {
            return None;
        }

        let name = self.description?;
        Some(CaptureDevice {
            name,
            target: self.serial,
            // object.path is "v4l2:/dev/video0" for V4L2-backed nodes
            control_path: self
                .object_path
                .and_then(|p| p.strip_prefix("v4l2:").map(str::to_string)),
        })
    }
}

/// Extract a quoted value from a property line ('key = "value"' -> "value")
fn quoted_value(line: &str) -> Option<String> {
    let start = line.find('"')?;
    let end = line[start + 1..].find('"')?;
    Some(line[start + 1..start + 1 + end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_value() {
        assert_eq!(
            quoted_value("node.description = \"Laptop Webcam\"").as_deref(),
            Some("Laptop Webcam")
        );
        assert_eq!(quoted_value("no quotes here"), None);
    }

    #[test]
    fn test_node_without_video_class_is_skipped() {
        let node = NodeProperties {
            is_video_source: false,
            serial: Some("2146".to_string()),
            object_path: None,
            description: Some("Speakers".to_string()),
        };
        assert!(node.into_device().is_none());
    }

    #[test]
    fn test_v4l2_object_path_becomes_control_path() {
        let node = NodeProperties {
            is_video_source: true,
            serial: Some("2146".to_string()),
            object_path: Some("v4l2:/dev/video0".to_string()),
            description: Some("Laptop Webcam".to_string()),
        };
        let device = node.into_device().unwrap();
        assert_eq!(device.control_path.as_deref(), Some("/dev/video0"));
        assert_eq!(device.target.as_deref(), Some("2146"));
    }
}
