//! YUV4MPEG2 recorder.
//!
//! Writes the upscaled stream as uncompressed 4:4:4 video that players
//! and encoders (`ffmpeg -i out.y4m`) read directly. The stream header
//! is written with the first frame, once the frame size is known.
//!
//! The header declares a constant frame rate, so the caller must record
//! exactly one frame per tick at that rate, repeating the previous image
//! when nothing new arrived; the render loop does this.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use flipscreen_core::{FrameRecorder, ScaledFrame, ScreenError};
use tracing::{debug, info};

/// Records [`ScaledFrame`]s into a `.y4m` stream.
pub struct Y4mRecorder<W: Write = BufWriter<File>> {
    out: W,
    fps: u32,
    size: Option<(u32, u32)>,
    frames: u64,
    planes: Vec<u8>,
}

impl Y4mRecorder {
    /// Create (or truncate) `path`.
    pub fn create(path: &Path, fps: u32) -> Result<Self, ScreenError> {
        let file = File::create(path)
            .map_err(|e| ScreenError::Recorder(format!("{}: {e}", path.display())))?;
        info!("recording to {}", path.display());
        Ok(Self::new(BufWriter::new(file), fps))
    }
}

impl<W: Write> Y4mRecorder<W> {
    pub fn new(out: W, fps: u32) -> Self {
        Self {
            out,
            fps: fps.max(1),
            size: None,
            frames: 0,
            planes: Vec::new(),
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_header(&mut self, width: u32, height: u32) -> Result<(), ScreenError> {
        writeln!(
            self.out,
            "YUV4MPEG2 W{width} H{height} F{}:1 Ip A1:1 C444",
            self.fps
        )
        .map_err(recorder_err)?;
        self.size = Some((width, height));
        debug!(width, height, fps = self.fps, "y4m header written");
        Ok(())
    }
}

impl<W: Write> FrameRecorder for Y4mRecorder<W> {
    fn record(&mut self, frame: &ScaledFrame) -> Result<(), ScreenError> {
        match self.size {
            None => self.write_header(frame.width, frame.height)?,
            Some(size) if size != (frame.width, frame.height) => {
                return Err(ScreenError::Recorder(format!(
                    "frame size changed from {}x{} to {}x{}",
                    size.0, size.1, frame.width, frame.height
                )));
            }
            Some(_) => {}
        }

        rgb_to_yuv444_planar(&frame.data, &mut self.planes);
        self.out.write_all(b"FRAME\n").map_err(recorder_err)?;
        self.out.write_all(&self.planes).map_err(recorder_err)?;
        self.frames += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), ScreenError> {
        self.out.flush().map_err(recorder_err)
    }
}

/// Convert packed RGB24 into Y, U and V planes at full resolution.
fn rgb_to_yuv444_planar(rgb: &[u8], planes: &mut Vec<u8>) {
    let count = rgb.len() / 3;
    planes.clear();
    planes.resize(count * 3, 0);
    let (y_plane, rest) = planes.split_at_mut(count);
    let (u_plane, v_plane) = rest.split_at_mut(count);

    for (i, px) in rgb.chunks_exact(3).enumerate() {
        let (y, u, v) = rgb_to_yuv(px[0], px[1], px[2]);
        y_plane[i] = y;
        u_plane[i] = u;
        v_plane[i] = v;
    }
}

/// Full-range BT.601.
fn rgb_to_yuv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let (r, g, b) = (r as f64, g as f64, b as f64);

    let y = r * 0.29900 + g * 0.58700 + b * 0.11400;
    let u = r * -0.16874 + g * -0.33126 + b * 0.50000 + 128.0;
    let v = r * 0.50000 + g * -0.41869 + b * -0.08131 + 128.0;

    let clamp = |c: f64| c.round().clamp(0.0, 255.0) as u8;
    (clamp(y), clamp(u), clamp(v))
}

fn recorder_err(e: std::io::Error) -> ScreenError {
    ScreenError::Recorder(e.to_string())
}

// ── Tests ────────────────────────────────────────────────────────
