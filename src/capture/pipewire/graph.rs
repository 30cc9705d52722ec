// SPDX-License-Identifier: GPL-3.0-only

//! GStreamer capture graph for PipeWire cameras
//!
//! The graph mirrors the classic capture topology: a device source feeding
//! a sample interceptor fixed to packed RGB, terminated by an inert sink
//! that discards every buffer after interception:
//!
//! ```text
//! pipewiresrc → videoconvert → videoscale → capsfilter(RGB) → identity(handoff) → fakesink
//! ```
//!
//! The identity element's handoff signal fires once per buffer on the
//! streaming thread; the registered callback hands the mapped bytes to the
//! shared [`FrameSampler`] and returns. All failure handling on that path
//! is the sampler's: nothing may panic or block across the signal boundary.

use crate::capture::CaptureGraph;
use crate::capture::sampler::FrameSampler;
use crate::capture::types::{CaptureDevice, FrameGeometry};
use crate::constants::{pipeline as consts, timing};
use crate::errors::{CaptureError, CaptureResult, GraphStage};
use gstreamer::glib;
use gstreamer::prelude::*;
use gstreamer_video::VideoInfo;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};

/// A constructed PipeWire capture graph.
///
/// Exclusively owned by its session; stopping sets the pipeline to Null,
/// which returns only after the streaming threads (and any in-flight
/// handoff) have quiesced.
pub struct PipeWireGraph {
    pipeline: gstreamer::Pipeline,
    interceptor: gstreamer::Element,
    handoff_id: Option<glib::SignalHandlerId>,
}

impl PipeWireGraph {
    /// Build the graph for a bound device. Any stage failure drops every
    /// node created so far; no partial graph survives.
    pub fn build(
        device: &CaptureDevice,
        geometry: FrameGeometry,
        sampler: Arc<FrameSampler>,
    ) -> CaptureResult<Self> {
        info!(device = %device.name, %geometry, "building capture graph");

        let pipeline = gstreamer::Pipeline::new();

        let source = make_source(device)?;

        let (convert, scale, capsfilter, interceptor) = make_interceptor(geometry)?;

        let sink = gstreamer::ElementFactory::make("fakesink")
            .name("inert-sink")
            .property("sync", false)
            .build()
            .map_err(|e| construction(GraphStage::AddSink, e))?;

        let elements = [&source, &convert, &scale, &capsfilter, &interceptor, &sink];
        pipeline
            .add_many(elements)
            .map_err(|e| construction(GraphStage::Connect, e))?;
        gstreamer::Element::link_many(elements)
            .map_err(|e| construction(GraphStage::Connect, e))?;

        let handoff_id = register_sampler(&interceptor, geometry, sampler);

        debug!("capture graph assembled");
        Ok(Self {
            pipeline,
            interceptor,
            handoff_id: Some(handoff_id),
        })
    }
}

/// Create and configure the device source node
fn make_source(device: &CaptureDevice) -> CaptureResult<gstreamer::Element> {
    let mut builder = gstreamer::ElementFactory::make("pipewiresrc").name("camera-source");
    if let Some(target) = &device.target {
        builder = builder.property("target-object", target.as_str());
    }
    builder
        .build()
        .map_err(|e| construction(GraphStage::AddSource, e))
}

/// Create the sample interception stage: format conversion and scaling
/// pinned to packed RGB at the negotiated geometry, followed by the
/// buffered handoff point
fn make_interceptor(
    geometry: FrameGeometry,
) -> CaptureResult<(
    gstreamer::Element,
    gstreamer::Element,
    gstreamer::Element,
    gstreamer::Element,
)> {
    let convert = gstreamer::ElementFactory::make("videoconvert")
        .name("convert")
        .build()
        .map_err(|e| construction(GraphStage::AddInterceptor, e))?;

    let scale = gstreamer::ElementFactory::make("videoscale")
        .name("scale")
        .build()
        .map_err(|e| construction(GraphStage::AddInterceptor, e))?;

    let caps = gstreamer::Caps::builder("video/x-raw")
        .field("format", consts::INTERCEPT_FORMAT)
        .field("width", geometry.width as i32)
        .field("height", geometry.height as i32)
        .build();
    let capsfilter = gstreamer::ElementFactory::make("capsfilter")
        .name("intercept-format")
        .property("caps", &caps)
        .build()
        .map_err(|e| construction(GraphStage::AddInterceptor, e))?;

    let interceptor = gstreamer::ElementFactory::make("identity")
        .name(consts::INTERCEPTOR_NAME)
        .property("signal-handoffs", true)
        .build()
        .map_err(|e| construction(GraphStage::AddInterceptor, e))?;

    Ok((convert, scale, capsfilter, interceptor))
}

/// Register the sampler as the interceptor's per-buffer callback.
///
/// Runs on the streaming thread. The closure owns a strong reference to the
/// sampler, so a delivery racing a teardown always finds live buffers.
fn register_sampler(
    interceptor: &gstreamer::Element,
    geometry: FrameGeometry,
    sampler: Arc<FrameSampler>,
) -> glib::SignalHandlerId {
    // Negotiated row stride, resolved from caps on the first buffer
    let stride = Arc::new(AtomicUsize::new(0));

    interceptor.connect("handoff", false, move |values| {
        let Ok(buffer) = values[1].get::<gstreamer::Buffer>() else {
            return None;
        };
        let Ok(map) = buffer.map_readable() else {
            return None;
        };

        let row_stride = match stride.load(Ordering::Relaxed) {
            0 => {
                let resolved = values[0]
                    .get::<gstreamer::Element>()
                    .ok()
                    .and_then(|element| negotiated_stride(&element))
                    .unwrap_or_else(|| fallback_stride(map.as_slice().len(), geometry));
                stride.store(resolved, Ordering::Relaxed);
                resolved
            }
            s => s,
        };

        sampler.deliver(map.as_slice(), row_stride);
        None
    })
}

/// Read the negotiated row stride from the interceptor's src pad caps
fn negotiated_stride(element: &gstreamer::Element) -> Option<usize> {
    let caps = element.static_pad("src")?.current_caps()?;
    let info = VideoInfo::from_caps(&caps).ok()?;
    let stride = info.stride()[0];
    debug!(stride, "resolved negotiated stride");
    usize::try_from(stride).ok()
}

fn fallback_stride(buffer_len: usize, geometry: FrameGeometry) -> usize {
    if geometry.height == 0 {
        return geometry.row_bytes();
    }
    (buffer_len / geometry.height as usize).max(geometry.row_bytes())
}

fn construction(stage: GraphStage, err: impl std::fmt::Display) -> CaptureError {
    CaptureError::GraphConstruction {
        stage,
        reason: err.to_string(),
    }
}

impl CaptureGraph for PipeWireGraph {
    fn run(&mut self) -> CaptureResult<()> {
        debug!("setting pipeline to PLAYING");
        self.pipeline
            .set_state(gstreamer::State::Playing)
            .map_err(|e| CaptureError::Backend(format!("failed to start pipeline: {}", e)))?;

        // Wait for the state change to settle; async completion is accepted
        let (result, state, pending) = self
            .pipeline
            .state(gstreamer::ClockTime::from_seconds(timing::START_TIMEOUT_SECS));
        debug!(?result, ?state, ?pending, "pipeline state after start");
        if state != gstreamer::State::Playing {
            warn!(?state, "pipeline did not reach PLAYING in time");
        }

        Ok(())
    }

    fn stop(&mut self) -> CaptureResult<()> {
        debug!("setting pipeline to NULL");
        // The Null transition deactivates the pads, which waits out any
        // in-flight handoff before returning
        self.pipeline
            .set_state(gstreamer::State::Null)
            .map_err(|e| CaptureError::Backend(format!("failed to stop pipeline: {}", e)))?;

        let (result, state, _) = self
            .pipeline
            .state(gstreamer::ClockTime::from_seconds(timing::STOP_TIMEOUT_SECS));
        match result {
            Ok(_) => info!(?state, "capture graph stopped"),
            Err(e) => debug!(error = ?e, ?state, "state change had issues during stop"),
        }

        Ok(())
    }
}

impl Drop for PipeWireGraph {
    fn drop(&mut self) {
        // Detach the sampler callback before tearing the pipeline down
        if let Some(id) = self.handoff_id.take() {
            self.interceptor.disconnect(id);
        }
        let _ = self.pipeline.set_state(gstreamer::State::Null);
        debug!("capture graph released");
    }
}
