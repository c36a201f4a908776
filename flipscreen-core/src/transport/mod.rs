//! # Transport collaborators
//!
//! The pipeline does not know how the device link works. It only needs
//! two capabilities, split so each task owns exactly one of them:
//!
//! - [`MessageSource`]: a blocking-style "read next message", owned by
//!   the frame receiver task.
//! - [`StreamControl`]: start and stop the device's screen stream, owned
//!   by the session on the foreground task.
//!
//! The [`bridge`] module implements both over a framed byte stream.

pub mod bridge;
pub mod codec;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::ScreenError;

// ── MessageKind ──────────────────────────────────────────────────

/// Discriminator of a transport message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Ask the device to begin pushing frames.
    StartScreenStream,
    /// Ask the device to stop pushing frames.
    StopScreenStream,
    /// One packed screen frame.
    ScreenFrame,
    /// Anything else the link may carry.
    Other(u8),
}

impl MessageKind {
    pub const fn to_u8(self) -> u8 {
        match self {
            MessageKind::StartScreenStream => 0x14,
            MessageKind::StopScreenStream => 0x15,
            MessageKind::ScreenFrame => 0x16,
            MessageKind::Other(v) => v,
        }
    }
}

impl From<u8> for MessageKind {
    fn from(v: u8) -> Self {
        match v {
            0x14 => MessageKind::StartScreenStream,
            0x15 => MessageKind::StopScreenStream,
            0x16 => MessageKind::ScreenFrame,
            other => MessageKind::Other(other),
        }
    }
}

// ── Message ──────────────────────────────────────────────────────

/// A single message read from, or written to, the device link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageKind,
    /// Raw payload; empty when the message carries none.
    pub payload: Bytes,
}

impl Message {
    /// A payload-less control message.
    pub fn command(kind: MessageKind) -> Self {
        Self {
            kind,
            payload: Bytes::new(),
        }
    }

    /// A screen frame message carrying `payload`.
    pub fn screen_frame(payload: impl Into<Bytes>) -> Self {
        Self {
            kind: MessageKind::ScreenFrame,
            payload: payload.into(),
        }
    }
}

// ── Traits ───────────────────────────────────────────────────────

/// Read half of the device link.
#[async_trait]
pub trait MessageSource: Send + 'static {
    /// Wait for the next message.
    ///
    /// Any error means the link is dead; callers must not retry.
    async fn read_next_message(&mut self) -> Result<Message, ScreenError>;
}

/// Control half of the device link.
#[async_trait]
pub trait StreamControl: Send {
    async fn start_stream(&mut self) -> Result<(), ScreenError>;
    async fn stop_stream(&mut self) -> Result<(), ScreenError>;
}
