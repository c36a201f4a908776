//! # flipscreen-core
//!
//! Acquisition and decode pipeline for a remote 128x64 monochrome screen.
//!
//! This crate contains:
//! - **Frame**: `RawFrame`, `FrameDecoder`, `PixelBuffer`, `ScaledFrame`
//! - **Transport**: `MessageSource`/`StreamControl` traits, `BridgeCodec` and a framed TCP bridge link
//! - **Channel**: `FrameChannel`, a latest-value mailbox between receiver and renderer
//! - **Receiver**: `FrameReceiver`, the background task that validates and publishes frames
//! - **Session**: `SessionPhase` state machine and `StreamSession` start/stop control
//! - **Render**: `RenderLoop`, the foreground cadence that drives sinks and shutdown
//! - **Error**: `ScreenError`, a `thiserror`-based error hierarchy

pub mod cancel;
pub mod channel;
pub mod error;
pub mod frame;
pub mod receiver;
pub mod render;
pub mod session;
pub mod sink;
pub mod transport;

#[cfg(test)]
mod testing;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use cancel::CancelFlag;
pub use channel::FrameChannel;
pub use error::{FormatError, ScreenError};
pub use frame::{
    FRAME_SIZE, FrameDecoder, HEIGHT, Palette, PixelBuffer, RawFrame, Rgb, ScaledFrame, WIDTH,
};
pub use receiver::{FrameReceiver, ReceiverStats};
pub use render::{ExitReason, RenderConfig, RenderLoop, SessionReport};
pub use session::{SessionPhase, StreamSession};
pub use sink::{DisplaySink, FrameRecorder};
pub use transport::codec::BridgeCodec;
pub use transport::{Message, MessageKind, MessageSource, StreamControl};
