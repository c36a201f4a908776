//! Frame and pixel types shared across the pipeline.
//!
//! [`RawFrame`] is the packed wire image, [`PixelBuffer`] is the decoded
//! image handed to display sinks.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FormatError;
use crate::frame::{FRAME_SIZE, HEIGHT, WIDTH};

// ── RawFrame ─────────────────────────────────────────────────────

/// One packed 1-bit-per-pixel frame, exactly [`FRAME_SIZE`] bytes.
///
/// The only way to build one from untrusted bytes is
/// `RawFrame::try_from(&[u8])`, which copies the input so the caller's
/// buffer can be reused immediately.
#[derive(Clone, PartialEq, Eq)]
pub struct RawFrame(Box<[u8; FRAME_SIZE]>);

impl RawFrame {
    /// A frame with every pixel clear.
    pub fn blank() -> Self {
        Self(Box::new([0u8; FRAME_SIZE]))
    }

    /// Wrap an owned array.
    pub fn from_array(bytes: [u8; FRAME_SIZE]) -> Self {
        Self(Box::new(bytes))
    }

    /// The packed bytes.
    pub fn as_bytes(&self) -> &[u8; FRAME_SIZE] {
        &self.0
    }

    /// Byte for column `x` of `page`.
    pub fn page_byte(&self, page: usize, x: usize) -> u8 {
        self.0[page * WIDTH + x]
    }
}

impl TryFrom<&[u8]> for RawFrame {
    type Error = FormatError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let array: [u8; FRAME_SIZE] =
            bytes.try_into().map_err(|_| FormatError::InvalidLength {
                expected: FRAME_SIZE,
                actual: bytes.len(),
            })?;
        Ok(Self::from_array(array))
    }
}

impl fmt::Debug for RawFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let set = self.0.iter().map(|b| b.count_ones()).sum::<u32>();
        f.debug_struct("RawFrame").field("set_pixels", &set).finish()
    }
}

// ── Rgb ──────────────────────────────────────────────────────────

/// A 24-bit color. Serialised as `"#rrggbb"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl FromStr for Rgb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(format!("invalid color {s:?}: expected #rrggbb"));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|e| format!("invalid color {s:?}: {e}"))
        };
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl TryFrom<String> for Rgb {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Rgb> for String {
    fn from(c: Rgb) -> Self {
        c.to_string()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

// ── Palette ──────────────────────────────────────────────────────

/// The two colors a decoded frame may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    /// Color of set bits.
    pub foreground: Rgb,
    /// Color of clear bits.
    pub background: Rgb,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            foreground: Rgb::BLACK,
            background: Rgb::WHITE,
        }
    }
}

// ── PixelBuffer ──────────────────────────────────────────────────

/// A decoded `HEIGHT x WIDTH` image, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pixels: Vec<Rgb>,
}

impl PixelBuffer {
    /// A buffer with every pixel set to `color`.
    pub fn filled(color: Rgb) -> Self {
        Self {
            pixels: vec![color; WIDTH * HEIGHT],
        }
    }

    pub const fn width(&self) -> usize {
        WIDTH
    }

    pub const fn height(&self) -> usize {
        HEIGHT
    }

    /// Pixel at column `x`, row `y`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is out of bounds.
    pub fn get(&self, x: usize, y: usize) -> Rgb {
        self.pixels[y * WIDTH + x]
    }

    pub(crate) fn set(&mut self, x: usize, y: usize, color: Rgb) {
        self.pixels[y * WIDTH + x] = color;
    }

    /// Iterate over rows, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[Rgb]> {
        self.pixels.chunks_exact(WIDTH)
    }

    /// All pixels, row-major.
    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    /// Tightly packed RGB24 bytes, row-major.
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|c| [c.r, c.g, c.b]).collect()
    }
}
