//! Output collaborators of the render loop.
//!
//! A [`DisplaySink`] shows decoded frames and reports quit requests; a
//! [`FrameRecorder`] persists the upscaled stream. Both run on the
//! foreground task only.

use std::time::Duration;

use crate::error::ScreenError;
use crate::frame::{PixelBuffer, ScaledFrame};

/// Where decoded frames are shown.
pub trait DisplaySink {
    /// Show `frame`. Called only when a newer frame is available.
    fn present(&mut self, frame: &PixelBuffer) -> Result<(), ScreenError>;

    /// Process pending UI events, waiting at most `wait` for one.
    fn pump_events(&mut self, wait: Duration) -> Result<(), ScreenError>;

    /// Whether the user asked to quit. Must not block.
    fn quit_requested(&self) -> bool;

    /// Release display resources.
    fn close(&mut self) -> Result<(), ScreenError> {
        Ok(())
    }
}

/// Persists the upscaled frame stream.
pub trait FrameRecorder {
    fn record(&mut self, frame: &ScaledFrame) -> Result<(), ScreenError>;

    /// Flush and close the output.
    fn finish(&mut self) -> Result<(), ScreenError>;
}
