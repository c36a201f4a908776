//! Foreground render loop.
//!
//! Owns the session lifecycle: starts the device stream, spawns the
//! [`FrameReceiver`], polls the [`FrameChannel`] on a fixed cadence and
//! presents a frame only when its sequence number advanced. On quit,
//! cancellation, link failure or a display that keeps failing it stops
//! the stream, joins the receiver and releases the sinks.

use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::cancel::CancelFlag;
use crate::channel::FrameChannel;
use crate::error::ScreenError;
use crate::frame::scale::DEFAULT_SCALE;
use crate::frame::{FrameDecoder, Palette, PixelBuffer, ScaledFrame};
use crate::receiver::{FrameReceiver, ReceiverStats};
use crate::session::StreamSession;
use crate::sink::{DisplaySink, FrameRecorder};
use crate::transport::{MessageSource, StreamControl};

/// Upper bound on the render cadence.
pub const MAX_FPS: u32 = 60;

/// Consecutive failures of one display operation before the session ends.
pub const MAX_DISPLAY_ERRORS: u32 = 30;

// ── RenderConfig ─────────────────────────────────────────────────

/// Configuration for [`RenderLoop`].
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Target ticks per second (clamped to `1..=MAX_FPS`).
    pub fps: u32,
    /// Bound on each transport read and on the stop request; together
    /// with one tick this bounds shutdown latency.
    pub read_timeout: Duration,
    /// Longest the display may block while pumping events.
    pub event_wait: Duration,
    /// Integer upscale factor for the recorder.
    pub scale: u32,
    /// Foreground/background colors.
    pub palette: Palette,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            read_timeout: Duration::from_millis(250),
            event_wait: Duration::from_millis(4),
            scale: DEFAULT_SCALE,
            palette: Palette::default(),
        }
    }
}

impl RenderConfig {
    /// Duration of one render tick.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.fps.clamp(1, MAX_FPS) as f64)
    }
}

// ── SessionReport ────────────────────────────────────────────────

/// Why the render loop left `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The display sink asked to quit.
    QuitRequested,
    /// The cancel flag was set from outside.
    Cancelled,
    /// The receiver lost the link.
    TransportFailed,
    /// The display kept failing.
    DisplayFailed,
}

/// Summary returned once the loop reaches `Stopped`.
#[derive(Debug)]
pub struct SessionReport {
    pub exit: ExitReason,
    /// Time spent in `Running`.
    pub ran_for: Duration,
    /// Frames handed to the display sink.
    pub frames_presented: u64,
    /// Published frames replaced before the loop could show them.
    pub frames_superseded: u64,
    /// Frames written by the recorder, idle repeats included.
    pub frames_recorded: u64,
    /// Receiver counters (zeroed when the receiver failed).
    pub receiver: ReceiverStats,
    /// The error that ended the receiver, if any.
    pub transport_error: Option<ScreenError>,
    /// Whether the stop request was sent within the read timeout.
    pub stream_stopped: bool,
}

// ── RenderLoop ───────────────────────────────────────────────────

/// The pipeline driver. Runs on the foreground task.
pub struct RenderLoop<C, S, D> {
    session: StreamSession<C>,
    receiver: FrameReceiver<S>,
    frontend: Frontend<D>,
}

/// Everything the tick touches: the consumer side of the channel and
/// the sinks.
struct Frontend<D> {
    sink: D,
    recorder: Option<Box<dyn FrameRecorder>>,
    /// Last recorded image, repeated on ticks without a new frame.
    last_scaled: Option<ScaledFrame>,
    decoder: FrameDecoder,
    channel: FrameChannel,
    cancel: CancelFlag,
    config: RenderConfig,
    presented: u64,
    superseded: u64,
    recorded: u64,
    event_errors: ErrorStreak,
    present_errors: ErrorStreak,
}

/// Consecutive failures of one display operation. Only the first of a
/// streak is logged at `warn`.
#[derive(Default)]
struct ErrorStreak(u32);

impl ErrorStreak {
    /// Count a failure; `true` once the streak reaches the limit.
    fn fail(&mut self, what: &str, e: &ScreenError) -> bool {
        self.0 += 1;
        if self.0 == 1 {
            warn!("{what} failed: {e}");
        } else {
            debug!(streak = self.0, "{what} failed: {e}");
        }
        self.0 >= MAX_DISPLAY_ERRORS
    }

    fn reset(&mut self) {
        self.0 = 0;
    }
}

impl<C, S, D> RenderLoop<C, S, D>
where
    C: StreamControl,
    S: MessageSource,
    D: DisplaySink,
{
    pub fn new(control: C, source: S, sink: D, config: RenderConfig) -> Self {
        let channel = FrameChannel::new();
        let cancel = CancelFlag::new();
        let receiver =
            FrameReceiver::new(source, channel.clone(), cancel.clone(), config.read_timeout);

        Self {
            session: StreamSession::new(control),
            receiver,
            frontend: Frontend {
                sink,
                recorder: None,
                last_scaled: None,
                decoder: FrameDecoder::new(config.palette),
                channel,
                cancel,
                config,
                presented: 0,
                superseded: 0,
                recorded: 0,
                event_errors: ErrorStreak::default(),
                present_errors: ErrorStreak::default(),
            },
        }
    }

    /// Attach a recorder fed with upscaled frames.
    pub fn with_recorder(mut self, recorder: Box<dyn FrameRecorder>) -> Self {
        self.frontend.recorder = Some(recorder);
        self
    }

    /// A cloneable handle that stops the pipeline from another task.
    pub fn cancel_handle(&self) -> CancelFlag {
        self.frontend.cancel.clone()
    }

    /// Drive the session from `Starting` to `Stopped`.
    ///
    /// Only a failure to start the stream is returned as an error. A link
    /// failure while running ends the session in order and is reported in
    /// [`SessionReport::transport_error`].
    pub async fn run(self) -> Result<SessionReport, ScreenError> {
        let RenderLoop {
            mut session,
            receiver,
            mut frontend,
        } = self;

        // ── Starting ─────────────────────────────────────────────
        if let Err(e) = session.start().await {
            error!("failed to start screen stream: {e}");
            frontend.cancel.cancel();
            session.phase_mut().to_stopping()?;
            frontend.release();
            session.phase_mut().to_stopped()?;
            return Err(e);
        }
        let receiver = receiver.spawn();
        session.phase_mut().to_running()?;

        // ── Running ──────────────────────────────────────────────
        let reason = frontend.render(&receiver).await;

        // ── Stopping ─────────────────────────────────────────────
        let ran_for = session.phase().running_duration().unwrap_or_default();
        session.phase_mut().to_stopping()?;
        frontend.cancel.cancel();
        let stream_stopped = session.stop(frontend.config.read_timeout).await;

        let (receiver_stats, transport_error) = match receiver.await {
            Ok(Ok(stats)) => (stats, None),
            Ok(Err(e)) => (ReceiverStats::default(), Some(e)),
            Err(e) => (ReceiverStats::default(), Some(ScreenError::from(e))),
        };
        let exit = match &transport_error {
            Some(e) => {
                error!("session ended by transport failure: {e}");
                ExitReason::TransportFailed
            }
            None => reason,
        };

        frontend.release();
        session.phase_mut().to_stopped()?;

        info!(
            ?exit,
            ?ran_for,
            presented = frontend.presented,
            superseded = frontend.superseded,
            received = receiver_stats.accepted,
            dropped = receiver_stats.dropped,
            "session finished"
        );

        Ok(SessionReport {
            exit,
            ran_for,
            frames_presented: frontend.presented,
            frames_superseded: frontend.superseded,
            frames_recorded: frontend.recorded,
            receiver: receiver_stats,
            transport_error,
            stream_stopped,
        })
    }
}

impl<D: DisplaySink> Frontend<D> {
    /// Tick until something asks the loop to stop.
    async fn render<T>(&mut self, receiver: &JoinHandle<T>) -> ExitReason {
        let interval = self.config.frame_interval();
        let mut last_seen = 0u64;

        loop {
            let tick_start = Instant::now();

            if self.cancel.is_cancelled() || receiver.is_finished() {
                return ExitReason::Cancelled;
            }

            match self.sink.pump_events(self.config.event_wait) {
                Ok(()) => self.event_errors.reset(),
                Err(e) => {
                    if self.event_errors.fail("display events", &e) {
                        error!("display unusable, ending session: {e}");
                        return ExitReason::DisplayFailed;
                    }
                }
            }
            if self.sink.quit_requested() {
                info!("quit requested");
                return ExitReason::QuitRequested;
            }

            let mut fresh = None;
            if let Some((raw, seq)) = self.channel.try_take_if_newer(last_seen) {
                let skipped = seq - last_seen - 1;
                if skipped > 0 {
                    debug!(skipped, "frames superseded before display");
                    self.superseded += skipped;
                }
                last_seen = seq;

                let pixels = self.decoder.decode(&raw);
                match self.sink.present(&pixels) {
                    Ok(()) => {
                        self.presented += 1;
                        self.present_errors.reset();
                    }
                    Err(e) => {
                        if self.present_errors.fail("render", &e) {
                            error!("display unusable, ending session: {e}");
                            return ExitReason::DisplayFailed;
                        }
                    }
                }
                fresh = Some(pixels);
            }
            self.record(fresh.as_ref());

            pace(tick_start, interval).await;
        }
    }

    /// Feed the recorder once per tick: the new frame if there is one,
    /// otherwise the previous image again, so the recording keeps a
    /// constant frame rate. A failing recorder is dropped for the rest of
    /// the session.
    fn record(&mut self, fresh: Option<&PixelBuffer>) {
        let Some(recorder) = self.recorder.as_mut() else {
            return;
        };
        if let Some(pixels) = fresh {
            self.last_scaled = Some(pixels.upscale(self.config.scale));
        }
        let Some(scaled) = self.last_scaled.as_ref() else {
            return;
        };

        match recorder.record(scaled) {
            Ok(()) => self.recorded += 1,
            Err(e) => {
                warn!("recording failed, disabling recorder: {e}");
                if let Some(mut recorder) = self.recorder.take() {
                    if let Err(e) = recorder.finish() {
                        warn!("failed to finalise recording: {e}");
                    }
                }
            }
        }
    }

    /// Finish the recorder and close the display. Failures are logged.
    fn release(&mut self) {
        if let Some(mut recorder) = self.recorder.take() {
            match recorder.finish() {
                Ok(()) => info!(frames = self.recorded, "recording finished"),
                Err(e) => warn!("failed to finalise recording: {e}"),
            }
        }
        if let Err(e) = self.sink.close() {
            warn!("failed to close display: {e}");
        }
    }
}

/// Sleep for the remainder of the tick.
async fn pace(tick_start: Instant, interval: Duration) {
    let elapsed = tick_start.elapsed();
    if elapsed < interval {
        tokio::time::sleep(interval - elapsed).await;
    } else {
        tokio::task::yield_now().await;
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{FRAME_SIZE, RawFrame};
    use crate::testing::{CountingControl, TestRecorder, TestSink, scripted};
    use crate::transport::Message;
    use std::sync::atomic::Ordering;

    fn fast_config() -> RenderConfig {
        RenderConfig {
            fps: 60,
            read_timeout: Duration::from_millis(50),
            event_wait: Duration::ZERO,
            scale: 2,
            palette: Palette::default(),
        }
    }

    fn frame_msg(fill: u8) -> Result<Message, ScreenError> {
        Ok(Message::screen_frame(vec![fill; FRAME_SIZE]))
    }

    #[test]
    fn frame_interval_is_clamped() {
        let mut cfg = RenderConfig::default();
        assert_eq!(cfg.frame_interval(), Duration::from_secs_f64(1.0 / 30.0));
        cfg.fps = 0;
        assert_eq!(cfg.frame_interval(), Duration::from_secs(1));
        cfg.fps = 1000;
        assert_eq!(cfg.frame_interval(), Duration::from_secs_f64(1.0 / 60.0));
    }

    #[tokio::test]
    async fn quit_after_first_frame() {
        let control = CountingControl::default();
        let sink = TestSink {
            quit_after: Some(1),
            ..Default::default()
        };
        let (source, _script) = scripted(vec![frame_msg(0xFF)]);

        let report = RenderLoop::new(control.clone(), source, sink.clone(), fast_config())
            .run()
            .await
            .unwrap();

        assert_eq!(report.exit, ExitReason::QuitRequested);
        assert_eq!(report.frames_presented, 1);
        assert!(report.transport_error.is_none());
        assert!(report.stream_stopped);
        assert_eq!(control.starts.load(Ordering::SeqCst), 1);
        assert_eq!(control.stops.load(Ordering::SeqCst), 1);
        assert!(sink.closed.load(Ordering::SeqCst));

        let presented = sink.presented.lock().unwrap();
        let expected = FrameDecoder::default().decode(&RawFrame::from_array([0xFF; FRAME_SIZE]));
        assert_eq!(presented[0], expected);
    }

    #[tokio::test]
    async fn unchanged_sequence_is_not_presented_again() {
        let control = CountingControl::default();
        let sink = TestSink::default();
        let (source, _script) = scripted(vec![frame_msg(0x01)]);

        let quit = sink.quit.clone();
        let (report, ()) = tokio::join!(
            RenderLoop::new(control, source, sink.clone(), fast_config()).run(),
            async move {
                // Many ticks pass with no new frame.
                tokio::time::sleep(Duration::from_millis(200)).await;
                quit.store(true, Ordering::SeqCst);
            }
        );

        let report = report.unwrap();
        assert_eq!(report.frames_presented, 1);
        assert_eq!(sink.presented_count(), 1);
    }

    #[tokio::test]
    async fn cancel_reaches_stopped_within_tick_and_read_timeout() {
        let control = CountingControl::default();
        let (source, _script) = scripted(Vec::new());
        let config = fast_config();
        let bound = config.frame_interval() + config.read_timeout;

        let render = RenderLoop::new(control.clone(), source, TestSink::default(), config);
        let cancel = render.cancel_handle();

        let (report, cancelled_at) = tokio::join!(render.run(), async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
            Instant::now()
        });
        let latency = cancelled_at.elapsed();

        let report = report.unwrap();
        assert_eq!(report.exit, ExitReason::Cancelled);
        assert_eq!(control.stops.load(Ordering::SeqCst), 1);
        // Generous slack for scheduler jitter on busy machines.
        assert!(
            latency < bound + Duration::from_millis(500),
            "shutdown took {latency:?}"
        );
    }

    #[tokio::test]
    async fn transport_failure_stops_session() {
        let control = CountingControl::default();
        let sink = TestSink::default();
        let (source, _script) = scripted(vec![
            frame_msg(0x0F),
            Err(ScreenError::ConnectionClosed),
        ]);

        let report = RenderLoop::new(control.clone(), source, sink.clone(), fast_config())
            .run()
            .await
            .unwrap();

        assert_eq!(report.exit, ExitReason::TransportFailed);
        assert!(matches!(
            report.transport_error,
            Some(ScreenError::ConnectionClosed)
        ));
        assert_eq!(control.stops.load(Ordering::SeqCst), 1);
        assert!(sink.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn start_failure_is_fatal() {
        let control = CountingControl {
            fail_start: true,
            ..Default::default()
        };
        let sink = TestSink::default();
        let (source, _script) = scripted(vec![frame_msg(0x01)]);

        let result = RenderLoop::new(control.clone(), source, sink.clone(), fast_config())
            .run()
            .await;

        assert!(result.is_err());
        assert_eq!(control.stops.load(Ordering::SeqCst), 0);
        assert_eq!(sink.presented_count(), 0);
        assert!(sink.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn recorder_receives_upscaled_frames() {
        let recorder = TestRecorder::default();
        let sink = TestSink {
            quit_after: Some(1),
            ..Default::default()
        };
        let (source, _script) = scripted(vec![frame_msg(0xAA)]);

        let report = RenderLoop::new(CountingControl::default(), source, sink, fast_config())
            .with_recorder(Box::new(recorder.clone()))
            .run()
            .await
            .unwrap();

        assert_eq!(report.frames_recorded, 1);
        assert_eq!(recorder.frames.lock().unwrap().as_slice(), &[(256, 128)]);
        assert!(recorder.finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn recorder_failure_does_not_stop_rendering() {
        let recorder = TestRecorder {
            fail: true,
            ..Default::default()
        };
        let sink = TestSink::default();
        let (source, script) = scripted(vec![frame_msg(0x01)]);

        let quit = sink.quit.clone();
        let (report, ()) = tokio::join!(
            RenderLoop::new(CountingControl::default(), source, sink.clone(), fast_config())
                .with_recorder(Box::new(recorder.clone()))
                .run(),
            async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                script.send(frame_msg(0x02)).unwrap();
                tokio::time::sleep(Duration::from_millis(100)).await;
                quit.store(true, Ordering::SeqCst);
            }
        );

        let report = report.unwrap();
        assert_eq!(report.exit, ExitReason::QuitRequested);
        assert_eq!(report.frames_presented, 2);
        assert_eq!(report.frames_recorded, 0);
        assert!(recorder.finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn stalled_stop_request_does_not_block_shutdown() {
        let control = CountingControl {
            hang_stop: true,
            ..Default::default()
        };
        let sink = TestSink::default();
        let (source, _script) = scripted(Vec::new());

        let render = RenderLoop::new(control.clone(), source, sink.clone(), fast_config());
        render.cancel_handle().cancel();

        let report = tokio::time::timeout(Duration::from_secs(3), render.run())
            .await
            .expect("session did not stop")
            .unwrap();

        assert_eq!(report.exit, ExitReason::Cancelled);
        assert!(!report.stream_stopped);
        assert_eq!(control.stops.load(Ordering::SeqCst), 1);
        assert!(sink.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn failed_stop_still_releases_sinks() {
        let control = CountingControl {
            fail_stop: true,
            ..Default::default()
        };
        let sink = TestSink {
            quit_after: Some(1),
            ..Default::default()
        };
        let recorder = TestRecorder::default();
        let (source, _script) = scripted(vec![frame_msg(0x01)]);

        let report = RenderLoop::new(control.clone(), source, sink.clone(), fast_config())
            .with_recorder(Box::new(recorder.clone()))
            .run()
            .await
            .unwrap();

        assert_eq!(report.exit, ExitReason::QuitRequested);
        assert!(!report.stream_stopped);
        assert_eq!(control.stops.load(Ordering::SeqCst), 1);
        assert!(sink.closed.load(Ordering::SeqCst));
        assert!(recorder.finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn persistent_display_errors_end_session() {
        let control = CountingControl::default();
        let sink = TestSink {
            fail_events: true,
            ..Default::default()
        };
        let (source, _script) = scripted(Vec::new());

        let report = tokio::time::timeout(
            Duration::from_secs(5),
            RenderLoop::new(control.clone(), source, sink.clone(), fast_config()).run(),
        )
        .await
        .expect("display failures never ended the session")
        .unwrap();

        assert_eq!(report.exit, ExitReason::DisplayFailed);
        assert_eq!(control.stops.load(Ordering::SeqCst), 1);
        assert!(sink.closed.load(Ordering::SeqCst));
    }

    #[test]
    fn error_streak_resets() {
        let mut streak = ErrorStreak::default();
        let e = ScreenError::Display("gone".into());
        for _ in 1..MAX_DISPLAY_ERRORS {
            assert!(!streak.fail("render", &e));
        }
        streak.reset();
        assert!(!streak.fail("render", &e));
    }

    #[tokio::test]
    async fn idle_ticks_repeat_last_frame_in_recording() {
        let recorder = TestRecorder::default();
        let sink = TestSink::default();
        let (source, _script) = scripted(vec![frame_msg(0x80)]);

        let quit = sink.quit.clone();
        let (report, ()) = tokio::join!(
            RenderLoop::new(CountingControl::default(), source, sink.clone(), fast_config())
                .with_recorder(Box::new(recorder.clone()))
                .run(),
            async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                quit.store(true, Ordering::SeqCst);
            }
        );

        let report = report.unwrap();
        assert_eq!(report.frames_presented, 1);
        assert!(report.frames_recorded > 1, "{report:?}");
        assert!(report.ran_for > Duration::ZERO);

        let frames = recorder.frames.lock().unwrap();
        assert_eq!(frames.len() as u64, report.frames_recorded);
        assert!(frames.iter().all(|&size| size == (256, 128)));
    }
}
