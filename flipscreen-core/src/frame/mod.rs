//! # Packed monochrome frames
//!
//! The remote device exposes a 128x64 one-bit display. Each frame
//! travels as 1024 bytes laid out in eight horizontal *pages*:
//!
//! ```text
//!            x = 0   x = 1        x = 127
//! page 0   [byte 0][byte 1] ... [byte 127]     rows 0..8
//! page 1   [byte 128]       ... [byte 255]     rows 8..16
//!   ...
//! page 7   [byte 896]       ... [byte 1023]    rows 56..64
//!
//! byte bit k (LSB = 0) -> row page * 8 + k
//! ```
//!
//! | Module    | Purpose                                         |
//! |-----------|-------------------------------------------------|
//! | `types`   | `RawFrame`, `PixelBuffer`, `Rgb`, `Palette`     |
//! | `decoder` | Page bitmap to pixel buffer                     |
//! | `scale`   | Nearest-neighbour upscaling for recording/sinks |

pub mod decoder;
pub mod scale;
pub mod types;

// ── Constants ────────────────────────────────────────────────────

/// Display width in pixels.
pub const WIDTH: usize = 128;

/// Display height in pixels.
pub const HEIGHT: usize = 64;

/// Number of 8-row pages.
pub const PAGES: usize = HEIGHT / 8;

/// Size of one packed frame on the wire.
pub const FRAME_SIZE: usize = WIDTH * PAGES;

// ── Re-exports ───────────────────────────────────────────────────

pub use decoder::FrameDecoder;
pub use scale::ScaledFrame;
pub use types::{Palette, PixelBuffer, RawFrame, Rgb};
