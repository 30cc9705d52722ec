// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

/// Capture graph constants
pub mod pipeline {
    /// GStreamer format string for the fixed interception format.
    ///
    /// Every frame that reaches the sampler is packed 24-bit RGB; all format
    /// negotiation happens inside the graph, never in application code.
    pub const INTERCEPT_FORMAT: &str = "RGB";

    /// Bytes per pixel of the interception format
    pub const BYTES_PER_PIXEL: usize = 3;

    /// Element name assigned to the interceptor, for logging and lookup
    pub const INTERCEPTOR_NAME: &str = "frame-interceptor";
}

/// Timing constants
pub mod timing {
    /// Pipeline playing state timeout on start
    pub const START_TIMEOUT_SECS: u64 = 5;

    /// Pipeline state change timeout on stop
    pub const STOP_TIMEOUT_SECS: u64 = 2;

    /// Consumer poll interval (~60 ticks per second)
    pub const POLL_INTERVAL_MS: u64 = 16;

    /// How often the headless preview logs delivery statistics
    pub const STATS_INTERVAL_SECS: u64 = 1;

    /// Frame interval for the simulated generator (~30 fps)
    pub const SIMULATED_FRAME_MS: u64 = 33;
}

/// Default capture geometry when nothing is configured
pub mod defaults {
    pub const WIDTH: u32 = 640;
    pub const HEIGHT: u32 = 480;
}

/// Presentation surface constants
pub mod surface {
    /// Row pitch alignment of the mapped surface, matching the transfer
    /// granularity GPU upload paths require.
    pub const ROW_PITCH_ALIGNMENT: usize = 256;
}

/// Application information utilities
pub mod app_info {
    /// Get the application version from build-time environment
    pub fn version() -> &'static str {
        env!("GIT_VERSION")
    }
}
