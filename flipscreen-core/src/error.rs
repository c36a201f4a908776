//! Domain-specific error types for the screen pipeline.
//!
//! All fallible operations return `Result<T, ScreenError>`.
//! Frame validation failures use the narrower [`FormatError`], which the
//! receiver recovers from locally by dropping the offending message.

use std::time::Duration;
use thiserror::Error;

use crate::session::SessionPhase;

/// The canonical error type for the screen pipeline.
#[derive(Debug, Error)]
pub enum ScreenError {
    // ── Format Errors ────────────────────────────────────────────
    /// A message could not be turned into a frame.
    #[error("format error: {0}")]
    Format(#[from] FormatError),

    // ── Transport Errors ─────────────────────────────────────────
    /// The TCP/IO layer reported an error.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// The remote end closed the link.
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// Received bytes that do not start with the bridge magic sequence.
    #[error("invalid magic bytes: expected FSB1")]
    InvalidMagic,

    /// A bridge frame announced a payload larger than the codec limit.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// An operation exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    // ── Sink Errors ──────────────────────────────────────────────
    /// The display sink failed.
    #[error("display error: {0}")]
    Display(String),

    /// The recorder failed.
    #[error("recorder error: {0}")]
    Recorder(String),

    // ── Lifecycle Errors ─────────────────────────────────────────
    /// A session phase change that the state machine does not allow.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: SessionPhase, to: SessionPhase },

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

impl ScreenError {
    /// Whether this error means the remote link is gone.
    ///
    /// Transport errors end the session; nothing reconnects automatically.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ScreenError::Connection(_)
                | ScreenError::ConnectionClosed
                | ScreenError::InvalidMagic
                | ScreenError::FrameTooLarge { .. }
                | ScreenError::Timeout(_)
        )
    }
}

// ── FormatError ──────────────────────────────────────────────────

/// Why a transport message was not accepted as a screen frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// The message is not a screen frame.
    #[error("unexpected message kind {0:#04x}")]
    UnexpectedKind(u8),

    /// The message is a screen frame but carries no bytes.
    #[error("empty frame payload")]
    EmptyPayload,

    /// The payload is not exactly one packed frame.
    #[error("invalid frame length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

// ── Convenient From implementations ──────────────────────────────

impl From<tokio::task::JoinError> for ScreenError {
    fn from(e: tokio::task::JoinError) -> Self {
        ScreenError::Other(format!("receiver task failed: {e}"))
    }
}
