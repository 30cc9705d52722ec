// SPDX-License-Identifier: GPL-3.0-only

//! Presentation surface updated by the consumer thread
//!
//! Models the render-side image target the viewer samples from: an RGBA
//! image with an aligned row pitch and a write-only map/unmap interface.
//! Owned and written by the consumer thread only — the upload here is the
//! single transfer in the system that happens off the capture thread, so
//! delivery cadence is never gated on presentation.
//!
//! The surface is created once per negotiated geometry and rebuilt only
//! when the geometry changes.

use crate::capture::types::{FrameBuffer, FrameGeometry};
use crate::constants::{pipeline, surface as consts};
use tracing::debug;

/// RGBA presentation target with an aligned row pitch
pub struct PresentationSurface {
    width: u32,
    height: u32,
    row_pitch: usize,
    pixels: Vec<u8>,
}

impl PresentationSurface {
    pub fn new(geometry: FrameGeometry) -> Self {
        let row_pitch = aligned_pitch(geometry.width);
        Self {
            width: geometry.width,
            height: geometry.height,
            row_pitch,
            pixels: vec![0; row_pitch * geometry.height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Recreate the surface when the negotiated geometry changed
    pub fn ensure_geometry(&mut self, geometry: FrameGeometry) {
        if self.width == geometry.width && self.height == geometry.height {
            return;
        }
        debug!(%geometry, "rebuilding presentation surface");
        *self = Self::new(geometry);
    }

    /// Write-only map of the surface memory. The mapping ends when the
    /// returned guard is dropped.
    pub fn map_write(&mut self) -> MappedSurface<'_> {
        MappedSurface {
            row_pitch: self.row_pitch,
            pixels: &mut self.pixels,
        }
    }

    /// Upload a captured frame: map, expand packed RGB rows to RGBA, unmap
    pub fn upload(&mut self, frame: &FrameBuffer) {
        self.ensure_geometry(frame.geometry());
        let height = self.height;
        let width = self.width as usize;
        let mut mapped = self.map_write();

        for y in 0..height {
            let src = frame.row(y);
            let dest = mapped.row_mut(y);
            for x in 0..width {
                let s = x * pipeline::BYTES_PER_PIXEL;
                let d = x * 4;
                dest[d] = src[s];
                dest[d + 1] = src[s + 1];
                dest[d + 2] = src[s + 2];
                dest[d + 3] = 0xFF;
            }
        }
    }

    /// Sample one pixel as (r, g, b)
    pub fn pixel(&self, x: u32, y: u32) -> (u8, u8, u8) {
        let x = x.min(self.width.saturating_sub(1));
        let y = y.min(self.height.saturating_sub(1));
        let at = y as usize * self.row_pitch + x as usize * 4;
        (self.pixels[at], self.pixels[at + 1], self.pixels[at + 2])
    }
}

/// Write-only view of mapped surface memory
pub struct MappedSurface<'a> {
    row_pitch: usize,
    pixels: &'a mut [u8],
}

impl MappedSurface<'_> {
    pub fn row_pitch(&self) -> usize {
        self.row_pitch
    }

    /// One RGBA row, excluding the pitch padding
    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let start = y as usize * self.row_pitch;
        let row_len = self.pixels.len().min(start + self.row_pitch) - start;
        &mut self.pixels[start..start + row_len]
    }
}

/// Round a row of RGBA pixels up to the transfer alignment
fn aligned_pitch(width: u32) -> usize {
    let packed = width as usize * 4;
    packed.div_ceil(consts::ROW_PITCH_ALIGNMENT) * consts::ROW_PITCH_ALIGNMENT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pitch_is_aligned() {
        let surface = PresentationSurface::new(FrameGeometry::new(641, 480));
        assert_eq!(surface.row_pitch % consts::ROW_PITCH_ALIGNMENT, 0);
        assert!(surface.row_pitch >= 641 * 4);
    }

    #[test]
    fn test_upload_expands_rgb() {
        let geometry = FrameGeometry::new(2, 1);
        let mut frame = FrameBuffer::new(geometry);
        frame
            .fill_from(&[10, 20, 30, 40, 50, 60], geometry.row_bytes())
            .unwrap();

        let mut surface = PresentationSurface::new(geometry);
        surface.upload(&frame);

        assert_eq!(surface.pixel(0, 0), (10, 20, 30));
        assert_eq!(surface.pixel(1, 0), (40, 50, 60));
    }

    #[test]
    fn test_geometry_change_rebuilds() {
        let mut surface = PresentationSurface::new(FrameGeometry::new(4, 4));
        surface.ensure_geometry(FrameGeometry::new(8, 2));
        assert_eq!(surface.width(), 8);
        assert_eq!(surface.height(), 2);
    }
}
