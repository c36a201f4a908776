//! Background frame receiver.
//!
//! Pulls messages from a [`MessageSource`] until cancelled or until the
//! link fails, and publishes every valid screen frame into the
//! [`FrameChannel`]. It does no rendering work and never waits on the
//! consumer.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::cancel::CancelFlag;
use crate::channel::FrameChannel;
use crate::error::{FormatError, ScreenError};
use crate::frame::RawFrame;
use crate::transport::{Message, MessageKind, MessageSource};

// ── ReceiverStats ────────────────────────────────────────────────

/// Counters kept by the receive loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    /// Frames published to the channel.
    pub accepted: u64,
    /// Messages discarded by validation.
    pub dropped: u64,
    /// Payload bytes of accepted frames.
    pub bytes: u64,
}

// ── Validation ───────────────────────────────────────────────────

/// Turn a transport message into an owned frame, or say why not.
///
/// The payload is copied, so the transport is free to reuse its buffer
/// once this returns.
pub fn accept(message: &Message) -> Result<RawFrame, FormatError> {
    if message.kind != MessageKind::ScreenFrame {
        return Err(FormatError::UnexpectedKind(message.kind.to_u8()));
    }
    if message.payload.is_empty() {
        return Err(FormatError::EmptyPayload);
    }
    RawFrame::try_from(&message.payload[..])
}

// ── FrameReceiver ────────────────────────────────────────────────

/// The sole writer of a [`FrameChannel`].
pub struct FrameReceiver<S> {
    source: S,
    channel: FrameChannel,
    cancel: CancelFlag,
    read_timeout: Duration,
    stats: ReceiverStats,
}

impl<S: MessageSource> FrameReceiver<S> {
    /// `read_timeout` bounds each read so the cancel flag is observed
    /// even when the link is silent.
    pub fn new(
        source: S,
        channel: FrameChannel,
        cancel: CancelFlag,
        read_timeout: Duration,
    ) -> Self {
        Self {
            source,
            channel,
            cancel,
            read_timeout,
            stats: ReceiverStats::default(),
        }
    }

    /// Run the receive loop on a new Tokio task.
    pub fn spawn(self) -> JoinHandle<Result<ReceiverStats, ScreenError>> {
        tokio::spawn(self.run())
    }

    /// Run the receive loop until cancelled or the link fails.
    ///
    /// A read failure sets the cancel flag before returning, so the render
    /// loop stops on its next tick.
    pub async fn run(mut self) -> Result<ReceiverStats, ScreenError> {
        info!("frame receiver started");

        while !self.cancel.is_cancelled() {
            let message =
                match tokio::time::timeout(self.read_timeout, self.source.read_next_message())
                    .await
                {
                    Err(_elapsed) => continue,
                    Ok(Ok(message)) => message,
                    Ok(Err(e)) if self.cancel.is_cancelled() => {
                        debug!("read ended during shutdown: {e}");
                        break;
                    }
                    Ok(Err(e)) => {
                        error!("transport read failed: {e}");
                        self.cancel.cancel();
                        return Err(e);
                    }
                };

            match accept(&message) {
                Ok(raw) => {
                    let seq = self.channel.publish(raw);
                    self.stats.accepted += 1;
                    self.stats.bytes += message.payload.len() as u64;
                    debug!(seq, "frame published");
                }
                Err(e) => {
                    self.stats.dropped += 1;
                    debug!("dropping message: {e}");
                }
            }
        }

        info!(
            accepted = self.stats.accepted,
            dropped = self.stats.dropped,
            "frame receiver stopped"
        );
        Ok(self.stats)
    }
}

// ── Tests ────────────────────────────────────────────────────────
