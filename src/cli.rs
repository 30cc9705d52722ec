// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for camera operations
//!
//! This module provides command-line functionality for:
//! - Listing available cameras
//! - Probing device control ranges
//! - Running the preview (terminal UI or headless statistics loop)

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::info;
use viewfinder::capture::simulated::SimulatedBackend;
use viewfinder::capture::{CaptureBackend, CaptureController, ControlId, default_backend};
use viewfinder::config::Config;
use viewfinder::constants::timing;
use viewfinder::{FrameGeometry, terminal};

/// List all available cameras
pub fn list_cameras() -> Result<(), Box<dyn std::error::Error>> {
    let backend = default_backend();
    if !backend.is_available() {
        return Err("capture subsystem unavailable".into());
    }

    let cameras = backend.list_devices()?;
    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras:");
    println!();
    for (index, camera) in cameras.iter().enumerate() {
        println!("  [{}] {}", index, camera.name);
        if let Some(path) = &camera.control_path {
            println!("      Controls: {}", path);
        }
    }

    Ok(())
}

/// Dump supported control ranges and current values for a camera
pub fn probe_device(camera_index: usize) -> Result<(), Box<dyn std::error::Error>> {
    let backend = default_backend();
    if !backend.is_available() {
        return Err("capture subsystem unavailable".into());
    }

    let config = Config::load();
    let mut controller = CaptureController::new(
        backend,
        FrameGeometry::new(config.width, config.height),
    );
    controller.initialize(camera_index)?;

    let device = controller
        .current_device()
        .map(|d| d.name.clone())
        .unwrap_or_default();
    println!("Controls for [{}] {}:", camera_index, device);
    println!();

    let mut any = false;
    for control in ControlId::ALL {
        let Ok(range) = controller.property_range(control) else {
            continue;
        };
        any = true;
        let current = controller
            .get_property(control)
            .map(|v| v.to_string())
            .unwrap_or_else(|_| "?".to_string());
        println!(
            "  {:<14} min = {}, max = {}, step = {}, default = {}, current = {}",
            control.display_name(),
            range.minimum,
            range.maximum,
            range.step,
            range.default_value,
            current
        );
    }

    if !any {
        println!("  (device exposes no controls)");
    }

    Ok(())
}

/// Run the preview, either in the terminal UI or as a headless loop
pub fn preview(
    camera: Option<usize>,
    width: Option<u32>,
    height: Option<u32>,
    simulated: bool,
    no_ui: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load();
    if let Some(width) = width {
        config.width = width;
    }
    if let Some(height) = height {
        config.height = height;
    }
    if let Some(camera) = camera {
        config.last_camera_index = camera;
    }

    let backend: Box<dyn CaptureBackend> = if simulated {
        Box::new(SimulatedBackend::with_generator())
    } else {
        default_backend()
    };
    if !backend.is_available() {
        return Err("capture subsystem unavailable".into());
    }

    let geometry = FrameGeometry::new(config.width, config.height);
    let controller = CaptureController::new(backend, geometry);

    if no_ui {
        preview_headless(controller, config.last_camera_index)
    } else {
        terminal::run(controller, config)
    }
}

/// Poll frames without a UI, logging delivery statistics until Ctrl-C
fn preview_headless(
    mut controller: CaptureController,
    camera_index: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    controller.initialize(camera_index)?;
    controller.start_capture()?;

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = Arc::clone(&running);
    ctrlc::set_handler(move || handler_flag.store(false, Ordering::Release))?;

    println!("Previewing without UI; press Ctrl-C to stop.");

    let mut consumed: u64 = 0;
    let mut window_consumed: u64 = 0;
    let mut window_start = Instant::now();
    let stats_interval = Duration::from_secs(timing::STATS_INTERVAL_SECS);

    while running.load(Ordering::Acquire) {
        if controller.latest_frame().is_some() {
            consumed += 1;
            window_consumed += 1;
        }

        if window_start.elapsed() >= stats_interval {
            let stats = controller.delivery_stats();
            info!(
                fps = window_consumed,
                delivered = stats.delivered,
                dropped = stats.dropped,
                "preview statistics"
            );
            window_consumed = 0;
            window_start = Instant::now();
        }

        std::thread::sleep(Duration::from_millis(timing::POLL_INTERVAL_MS));
    }

    controller.stop_capture()?;
    let stats = controller.delivery_stats();
    println!(
        "Consumed {} frames ({} delivered, {} dropped by backpressure).",
        consumed, stats.delivered, stats.dropped
    );

    Ok(())
}
