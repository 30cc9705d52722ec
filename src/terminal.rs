// SPDX-License-Identifier: GPL-3.0-only

//! Terminal-based camera viewer
//!
//! Renders the presentation surface using Unicode half-block characters for
//! improved vertical resolution. This is the consumer loop: it polls the
//! controller once per tick, uploads a consumed frame to the surface, and
//! draws — the capture side never waits on any of it.

use crate::capture::CaptureController;
use crate::config::Config;
use crate::constants::{defaults, timing};
use crate::surface::PresentationSurface;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal, backend::CrosstermBackend, buffer::Buffer, layout::Rect, style::Color,
    widgets::Widget,
};
use std::io::{self, stdout};
use std::time::Duration;
use tracing::{error, info, warn};

/// Run the terminal camera viewer
pub fn run(
    mut controller: CaptureController,
    mut config: Config,
) -> Result<(), Box<dyn std::error::Error>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut controller, &mut config);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = config.save() {
        warn!(%err, "failed to save configuration");
    }

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    controller: &mut CaptureController,
    config: &mut Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let cameras = controller.list_available_cameras()?;
    if cameras.is_empty() {
        return Err("No cameras found".into());
    }

    info!(count = cameras.len(), "found cameras");

    let multi_camera = cameras.len() > 1;
    let mut camera_index = config.last_camera_index.min(cameras.len() - 1);

    controller.initialize(camera_index)?;
    controller.start_capture()?;

    let geometry = controller
        .current_geometry()
        .unwrap_or(crate::capture::FrameGeometry::new(
            defaults::WIDTH,
            defaults::HEIGHT,
        ));
    let mut surface = PresentationSurface::new(geometry);
    let mut have_frame = false;
    let mut show_help = false;
    let mut status_message = build_status_message(multi_camera);

    loop {
        // One consume per tick; a miss just means nothing new to draw
        if let Some(frame) = controller.latest_frame() {
            surface.upload(frame);
            have_frame = true;
        }

        terminal.draw(|f| {
            let area = f.area();

            // Reserve bottom line for status
            let camera_area = Rect {
                x: area.x,
                y: area.y,
                width: area.width,
                height: area.height.saturating_sub(1),
            };

            let widget = SurfaceWidget {
                surface: if have_frame { Some(&surface) } else { None },
                mirror: config.mirror_preview,
            };
            f.render_widget(widget, camera_area);

            let status_area = Rect {
                x: area.x,
                y: area.height.saturating_sub(1),
                width: area.width,
                height: 1,
            };
            let status = StatusBar {
                message: &status_message,
            };
            f.render_widget(status, status_area);
        })?;

        // Handle input with timeout for frame updates
        if event::poll(Duration::from_millis(timing::POLL_INTERVAL_MS))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                break;
            }

            if key.code == KeyCode::Char('q') {
                break;
            }

            if key.code == KeyCode::Char('m') {
                config.mirror_preview = !config.mirror_preview;
            }

            if key.code == KeyCode::Char('s') && multi_camera {
                show_help = false;
                let next_index = (camera_index + 1) % cameras.len();
                match switch_camera(controller, next_index) {
                    Ok(()) => {
                        camera_index = next_index;
                        have_frame = false;
                        status_message = build_status_message(multi_camera);
                    }
                    Err(err) => {
                        error!(%err, "failed to switch camera");
                        status_message = format!("Error: {}", err);
                        // Fall back to the camera that was live before
                        switch_camera(controller, camera_index)?;
                    }
                }
            }

            if key.code == KeyCode::Char('h') {
                show_help = !show_help;
                status_message = if show_help {
                    build_help_message(multi_camera)
                } else {
                    build_status_message(multi_camera)
                };
            }
        }
    }

    config.last_camera_index = camera_index;
    controller.stop_capture()?;
    Ok(())
}

/// Tear the session down and bring it up on another device
fn switch_camera(
    controller: &mut CaptureController,
    index: usize,
) -> Result<(), crate::errors::CaptureError> {
    info!(index, "switching camera");
    controller.cleanup();
    controller.initialize(index)?;
    controller.start_capture()
}

fn build_status_message(multi_camera: bool) -> String {
    let mut msg = "'m' mirror".to_string();
    if multi_camera {
        msg.push_str(" | 's' switch camera");
    }
    msg.push_str(" | 'h' help | 'q' quit");
    msg
}

fn build_help_message(multi_camera: bool) -> String {
    let mut msg = String::from("m: Mirror preview | ");
    if multi_camera {
        msg.push_str("s: Switch camera | ");
    }
    msg.push_str("h: Toggle help | q/Ctrl+C: Quit");
    msg
}

/// Widget that renders the presentation surface using half-block characters
struct SurfaceWidget<'a> {
    surface: Option<&'a PresentationSurface>,
    mirror: bool,
}

impl Widget for SurfaceWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(surface) = self.surface else {
            let msg = "Waiting for camera...";
            let x = area.x + (area.width.saturating_sub(msg.len() as u16)) / 2;
            let y = area.y + area.height / 2;
            if y < area.y + area.height && x < area.x + area.width {
                buf.set_string(x, y, msg, ratatui::style::Style::default());
            }
            return;
        };

        if surface.width() == 0 || surface.height() == 0 || area.width == 0 || area.height == 0 {
            return;
        }

        // Each terminal cell displays 2 vertical pixels using half-blocks
        let aspect = surface.width() as f64 / surface.height() as f64;
        let term_width = area.width as f64;
        let term_height = (area.height * 2) as f64;

        let (display_width, display_height) = if term_width / term_height > aspect {
            let h = term_height;
            let w = h * aspect;
            (w as u16, (h / 2.0) as u16)
        } else {
            let w = term_width;
            let h = w / aspect;
            (w as u16, (h / 2.0) as u16)
        };

        if display_width == 0 || display_height == 0 {
            return;
        }

        let x_offset = area.x + (area.width.saturating_sub(display_width)) / 2;
        let y_offset = area.y + (area.height.saturating_sub(display_height)) / 2;

        let x_scale = surface.width() as f64 / display_width as f64;
        let y_scale = surface.height() as f64 / (display_height * 2) as f64;

        // Upper half (▀) colored with fg, lower half with bg
        for ty in 0..display_height {
            for tx in 0..display_width {
                let term_x = x_offset + tx;
                let term_y = y_offset + ty;
                if term_x >= area.x + area.width || term_y >= area.y + area.height {
                    continue;
                }

                let src_x = {
                    let x = (tx as f64 * x_scale) as u32;
                    if self.mirror {
                        surface.width().saturating_sub(1).saturating_sub(x)
                    } else {
                        x
                    }
                };
                let src_y_top = (ty as f64 * 2.0 * y_scale) as u32;
                let src_y_bottom = ((ty as f64 * 2.0 + 1.0) * y_scale) as u32;

                let (tr, tg, tb) = surface.pixel(src_x, src_y_top);
                let (br, bg_, bb) = surface.pixel(src_x, src_y_bottom);

                if let Some(cell) = buf.cell_mut((term_x, term_y)) {
                    cell.set_char('▀');
                    cell.set_fg(Color::Rgb(tr, tg, tb));
                    cell.set_bg(Color::Rgb(br, bg_, bb));
                }
            }
        }
    }
}

/// Status bar widget
struct StatusBar<'a> {
    message: &'a str,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_bg(Color::DarkGray);
            }
        }

        let text = if self.message.len() > area.width as usize {
            &self.message[..area.width as usize]
        } else {
            self.message
        };

        buf.set_string(
            area.x,
            area.y,
            text,
            ratatui::style::Style::default()
                .fg(Color::White)
                .bg(Color::DarkGray),
        );
    }
}
