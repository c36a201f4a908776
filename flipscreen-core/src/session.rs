//! Streaming session lifecycle.
//!
//! Provides the [`SessionPhase`] state machine driven by the render loop,
//! and [`StreamSession`], which tells the device to start and stop
//! streaming and guarantees the stop request is sent at most once.

use std::fmt;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::error::ScreenError;
use crate::transport::StreamControl;

// ── SessionPhase ─────────────────────────────────────────────────

/// The current phase of a streaming session.
///
/// ```text
///  Starting ──► Running ──► Stopping ──► Stopped
///      │                        ▲
///      └────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// Stream start requested, receiver not yet running.
    #[default]
    Starting,

    /// Frames are flowing.
    Running {
        /// When the session entered `Running`.
        since: Instant,
    },

    /// Shutdown in progress.
    Stopping,

    /// Terminal.
    Stopped,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Starting => write!(f, "Starting"),
            Self::Running { .. } => write!(f, "Running"),
            Self::Stopping => write!(f, "Stopping"),
            Self::Stopped => write!(f, "Stopped"),
        }
    }
}

impl SessionPhase {
    /// How long the session has been running.
    ///
    /// Returns `None` for any other phase.
    pub fn running_duration(&self) -> Option<Duration> {
        match self {
            Self::Running { since } => Some(since.elapsed()),
            _ => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Transition to `Running`.
    ///
    /// Valid from: `Starting`.
    pub fn to_running(&mut self) -> Result<(), ScreenError> {
        self.transition(
            matches!(self, Self::Starting),
            Self::Running {
                since: Instant::now(),
            },
        )
    }

    /// Transition to `Stopping`.
    ///
    /// Valid from: `Starting`, `Running`.
    pub fn to_stopping(&mut self) -> Result<(), ScreenError> {
        self.transition(
            matches!(self, Self::Starting | Self::Running { .. }),
            Self::Stopping,
        )
    }

    /// Transition to `Stopped`.
    ///
    /// Valid from: `Stopping`.
    pub fn to_stopped(&mut self) -> Result<(), ScreenError> {
        self.transition(matches!(self, Self::Stopping), Self::Stopped)
    }

    fn transition(&mut self, allowed: bool, next: SessionPhase) -> Result<(), ScreenError> {
        if !allowed {
            return Err(ScreenError::InvalidTransition {
                from: *self,
                to: next,
            });
        }
        info!("session phase: {self} -> {next}");
        *self = next;
        Ok(())
    }
}

// ── StreamSession ────────────────────────────────────────────────

/// One start/stop cycle of the device's screen stream.
pub struct StreamSession<C> {
    control: C,
    phase: SessionPhase,
    stop_attempted: bool,
}

impl<C: StreamControl> StreamSession<C> {
    pub fn new(control: C) -> Self {
        Self {
            control,
            phase: SessionPhase::Starting,
            stop_attempted: false,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub(crate) fn phase_mut(&mut self) -> &mut SessionPhase {
        &mut self.phase
    }

    /// Ask the device to begin streaming.
    pub async fn start(&mut self) -> Result<(), ScreenError> {
        if self.phase != SessionPhase::Starting {
            return Err(ScreenError::InvalidTransition {
                from: self.phase,
                to: SessionPhase::Starting,
            });
        }
        self.control.start_stream().await?;
        info!("screen stream started");
        Ok(())
    }

    /// Ask the device to stop streaming, waiting at most `limit`.
    ///
    /// Best effort: the link may already be gone or stalled, so a failure
    /// or timeout is logged and reported as `false`. Only the first call
    /// reaches the device.
    pub async fn stop(&mut self, limit: Duration) -> bool {
        if self.stop_attempted {
            return false;
        }
        self.stop_attempted = true;

        match tokio::time::timeout(limit, self.control.stop_stream()).await {
            Ok(Ok(())) => {
                info!("screen stream stopped");
                true
            }
            Ok(Err(e)) => {
                warn!("failed to stop screen stream: {e}");
                false
            }
            Err(_elapsed) => {
                warn!("stop request not sent within {limit:?}; giving up");
                false
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
