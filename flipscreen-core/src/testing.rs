//! Test doubles for the transport and sink collaborators.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::ScreenError;
use crate::frame::{PixelBuffer, ScaledFrame};
use crate::sink::{DisplaySink, FrameRecorder};
use crate::transport::{Message, MessageSource, StreamControl};

// ── Transport ────────────────────────────────────────────────────

pub type Script = mpsc::UnboundedSender<Result<Message, ScreenError>>;

/// Replays scripted results; once the script is exhausted every read
/// hangs, like a silent link.
pub struct ScriptedSource {
    rx: mpsc::UnboundedReceiver<Result<Message, ScreenError>>,
}

#[async_trait]
impl MessageSource for ScriptedSource {
    async fn read_next_message(&mut self) -> Result<Message, ScreenError> {
        match self.rx.recv().await {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }
}

pub fn scripted(items: Vec<Result<Message, ScreenError>>) -> (ScriptedSource, Script) {
    let (tx, rx) = mpsc::unbounded_channel();
    for item in items {
        let _ = tx.send(item);
    }
    (ScriptedSource { rx }, tx)
}

/// Counts start/stop requests; can fail either, or stall on stop.
#[derive(Clone, Default)]
pub struct CountingControl {
    pub starts: Arc<AtomicUsize>,
    pub stops: Arc<AtomicUsize>,
    pub fail_start: bool,
    pub fail_stop: bool,
    pub hang_stop: bool,
}

#[async_trait]
impl StreamControl for CountingControl {
    async fn start_stream(&mut self) -> Result<(), ScreenError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if self.fail_start {
            return Err(ScreenError::ConnectionClosed);
        }
        Ok(())
    }

    async fn stop_stream(&mut self) -> Result<(), ScreenError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        if self.hang_stop {
            std::future::pending::<()>().await;
        }
        if self.fail_stop {
            return Err(ScreenError::ConnectionClosed);
        }
        Ok(())
    }
}

// ── Sinks ────────────────────────────────────────────────────────

/// Collects presented frames; quits after `quit_after` frames or when
/// `quit` is set from outside. `fail_events` makes every event pump fail.
#[derive(Clone, Default)]
pub struct TestSink {
    pub presented: Arc<Mutex<Vec<PixelBuffer>>>,
    pub quit: Arc<AtomicBool>,
    pub closed: Arc<AtomicBool>,
    pub quit_after: Option<usize>,
    pub fail_events: bool,
}

impl TestSink {
    pub fn presented_count(&self) -> usize {
        self.presented.lock().unwrap().len()
    }
}

impl DisplaySink for TestSink {
    fn present(&mut self, frame: &PixelBuffer) -> Result<(), ScreenError> {
        let mut presented = self.presented.lock().unwrap();
        presented.push(frame.clone());
        if self.quit_after.is_some_and(|n| presented.len() >= n) {
            self.quit.store(true, Ordering::SeqCst);
        }
        Ok(())
    }

    fn pump_events(&mut self, _wait: Duration) -> Result<(), ScreenError> {
        if self.fail_events {
            return Err(ScreenError::Display("terminal gone".into()));
        }
        Ok(())
    }

    fn quit_requested(&self) -> bool {
        self.quit.load(Ordering::SeqCst)
    }

    fn close(&mut self) -> Result<(), ScreenError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Records frame sizes; optionally fails every write.
#[derive(Clone, Default)]
pub struct TestRecorder {
    pub frames: Arc<Mutex<Vec<(u32, u32)>>>,
    pub finished: Arc<AtomicBool>,
    pub fail: bool,
}

impl FrameRecorder for TestRecorder {
    fn record(&mut self, frame: &ScaledFrame) -> Result<(), ScreenError> {
        if self.fail {
            return Err(ScreenError::Recorder("disk full".into()));
        }
        self.frames.lock().unwrap().push((frame.width, frame.height));
        Ok(())
    }

    fn finish(&mut self) -> Result<(), ScreenError> {
        self.finished.store(true, Ordering::SeqCst);
        Ok(())
    }
}
