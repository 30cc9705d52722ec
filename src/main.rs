// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use viewfinder::constants::app_info;

mod cli;

#[derive(Parser)]
#[command(name = "viewfinder")]
#[command(about = "Webcam viewer for the Linux desktop and terminal")]
#[command(version = app_info::version())]
#[command(subcommand_required = false)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List available cameras
    List,

    /// Show supported control ranges for a camera
    Probe {
        /// Camera index to probe (from 'viewfinder list')
        #[arg(short, long, default_value = "0")]
        camera: usize,
    },

    /// Show the camera preview (default command)
    Preview {
        /// Camera index to use (from 'viewfinder list')
        #[arg(short, long)]
        camera: Option<usize>,

        /// Capture width
        #[arg(long)]
        width: Option<u32>,

        /// Capture height
        #[arg(long)]
        height: Option<u32>,

        /// Use the simulated test-pattern camera instead of real hardware
        #[arg(long)]
        simulated: bool,

        /// Poll frames without drawing, logging statistics until Ctrl-C
        #[arg(long)]
        no_ui: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=viewfinder=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::List) => cli::list_cameras(),
        Some(Commands::Probe { camera }) => cli::probe_device(camera),
        Some(Commands::Preview {
            camera,
            width,
            height,
            simulated,
            no_ui,
        }) => cli::preview(camera, width, height, simulated, no_ui),
        None => cli::preview(None, None, None, false, false),
    }
}
