//! Nearest-neighbour upscaling.
//!
//! The device image is tiny, so sinks and the recorder work on an
//! integer-scaled copy. Every source pixel becomes a `factor x factor`
//! block; no filtering.

use crate::frame::types::PixelBuffer;

/// Default integer scale factor (128x64 -> 512x256).
pub const DEFAULT_SCALE: u32 = 4;

/// An upscaled frame as tightly packed RGB24 rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaledFrame {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// `width * height * 3` bytes, row-major.
    pub data: Vec<u8>,
}

impl ScaledFrame {
    /// RGB bytes of row `y`.
    pub fn row(&self, y: u32) -> &[u8] {
        let stride = self.width as usize * 3;
        let start = y as usize * stride;
        &self.data[start..start + stride]
    }
}

impl PixelBuffer {
    /// Upscale by an integer `factor` (values below 1 are treated as 1).
    pub fn upscale(&self, factor: u32) -> ScaledFrame {
        let factor = factor.max(1) as usize;
        let width = self.width() * factor;
        let height = self.height() * factor;
        let stride = width * 3;
        let mut data = Vec::with_capacity(stride * height);

        for row in self.rows() {
            let start = data.len();
            for px in row {
                for _ in 0..factor {
                    data.extend_from_slice(&[px.r, px.g, px.b]);
                }
            }
            // Repeat the finished line for the remaining sub-rows.
            for _ in 1..factor {
                data.extend_from_within(start..start + stride);
            }
        }

        ScaledFrame {
            width: width as u32,
            height: height as u32,
            data,
        }
    }
}
