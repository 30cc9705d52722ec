// SPDX-License-Identifier: GPL-3.0-only

//! Error types for capture operations

use crate::capture::types::ControlId;
use std::fmt;

/// Result type alias for capture operations
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Stage of capture graph construction that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphStage {
    /// Adding the device source node
    AddSource,
    /// Adding the sample interceptor node
    AddInterceptor,
    /// Adding the inert sink node
    AddSink,
    /// Connecting source, interceptor and sink
    Connect,
}

impl fmt::Display for GraphStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphStage::AddSource => write!(f, "add source"),
            GraphStage::AddInterceptor => write!(f, "add interceptor"),
            GraphStage::AddSink => write!(f, "add sink"),
            GraphStage::Connect => write!(f, "connect"),
        }
    }
}

/// Errors surfaced by capture operations
#[derive(Debug, Clone)]
pub enum CaptureError {
    /// Device enumeration could not run (capture subsystem unavailable)
    Enumeration(String),
    /// Requested device index is outside the enumerated range
    DeviceNotFound { index: usize, available: usize },
    /// A device was found but could not be bound
    Bind(String),
    /// Capture graph construction failed at a specific stage
    GraphConstruction { stage: GraphStage, reason: String },
    /// Operation requires an initialized session
    NotInitialized,
    /// The bound device exposes no control capability for this property
    PropertyUnsupported(ControlId),
    /// A delivered frame did not match the negotiated buffer layout.
    /// Never propagated to the consumer; the frame is skipped.
    FrameCopy { expected: usize, actual: usize },
    /// Platform failure while changing the graph run state
    Backend(String),
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::Enumeration(msg) => write!(f, "device enumeration failed: {}", msg),
            CaptureError::DeviceNotFound { index, available } => {
                write!(f, "camera {} not found ({} available)", index, available)
            }
            CaptureError::Bind(msg) => write!(f, "failed to bind device: {}", msg),
            CaptureError::GraphConstruction { stage, reason } => {
                write!(f, "graph construction failed at {}: {}", stage, reason)
            }
            CaptureError::NotInitialized => write!(f, "capture session not initialized"),
            CaptureError::PropertyUnsupported(control) => {
                write!(f, "device does not support the {} control", control)
            }
            CaptureError::FrameCopy { expected, actual } => {
                write!(
                    f,
                    "frame does not fit negotiated layout (need {} bytes, got {})",
                    expected, actual
                )
            }
            CaptureError::Backend(msg) => write!(f, "capture backend error: {}", msg),
        }
    }
}

impl std::error::Error for CaptureError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_stage_in_message() {
        let err = CaptureError::GraphConstruction {
            stage: GraphStage::AddInterceptor,
            reason: "element not found".to_string(),
        };
        assert!(err.to_string().contains("add interceptor"));
    }

    #[test]
    fn test_device_not_found_reports_range() {
        let err = CaptureError::DeviceNotFound {
            index: 3,
            available: 1,
        };
        assert_eq!(err.to_string(), "camera 3 not found (1 available)");
    }
}
