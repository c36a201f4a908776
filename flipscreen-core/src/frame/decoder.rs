//! Page bitmap decoder.
//!
//! Turns a [`RawFrame`] into a [`PixelBuffer`] using a fixed two-color
//! [`Palette`]. Decoding is a pure function of the input bytes: the
//! decoder keeps no state between frames.

use crate::frame::types::{Palette, PixelBuffer, RawFrame};
use crate::frame::{PAGES, WIDTH};

// ── FrameDecoder ─────────────────────────────────────────────────

/// Stateless decoder for packed monochrome frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameDecoder {
    palette: Palette,
}

impl FrameDecoder {
    /// Create a decoder that paints set bits with `palette.foreground`.
    pub fn new(palette: Palette) -> Self {
        Self { palette }
    }

    /// Decode a whole frame.
    ///
    /// Bit 0 of each byte is the top row of its page, bit 7 the bottom.
    pub fn decode(&self, raw: &RawFrame) -> PixelBuffer {
        let mut out = PixelBuffer::filled(self.palette.background);

        for page in 0..PAGES {
            for x in 0..WIDTH {
                let byte = raw.page_byte(page, x);
                if byte == 0 {
                    continue;
                }
                for bit in 0..8 {
                    if (byte >> bit) & 1 == 1 {
                        out.set(x, page * 8 + bit, self.palette.foreground);
                    }
                }
            }
        }

        out
    }
}

// ── Tests ────────────────────────────────────────────────────────
