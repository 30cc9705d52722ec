// SPDX-License-Identifier: GPL-3.0-only

//! viewfinder - a webcam viewer for the Linux desktop and terminal
//!
//! The interesting part of a camera viewer is not the drawing; it is moving
//! frames from a capture subsystem that delivers on its own thread to a
//! consumer that presents the latest one. This crate is built around that
//! hand-off.
//!
//! # Architecture
//!
//! - [`capture`]: device enumeration, capture graph construction, the
//!   per-frame sampler and the session controller
//! - [`surface`]: the consumer-side presentation target
//! - [`terminal`]: the terminal viewer (the consumer loop)
//! - [`config`]: user configuration handling
//! - [`errors`]: error types shared across the crate

pub mod capture;
pub mod config;
pub mod constants;
pub mod errors;
pub mod surface;
pub mod terminal;

// Re-export commonly used types
pub use capture::{CaptureController, CaptureDevice, ControlId, FrameBuffer, FrameGeometry};
pub use config::Config;
pub use errors::{CaptureError, CaptureResult, GraphStage};
