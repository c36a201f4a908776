//! Viewer configuration.

use std::path::Path;
use std::time::Duration;

use flipscreen_core::frame::scale::DEFAULT_SCALE;
use flipscreen_core::{Palette, RenderConfig, Rgb};
use serde::{Deserialize, Serialize};

/// Top-level configuration for the viewer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Device link settings.
    pub network: NetworkConfig,
    /// Rendering settings.
    pub display: DisplayConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

/// Device link settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Bridge address (`host:port`).
    pub device_address: String,
    /// Connection timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Upper bound on a single frame read in milliseconds.
    pub read_timeout_ms: u64,
}

/// Rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Integer upscale factor for recordings.
    pub scale: u32,
    /// Render cadence (1..=60).
    pub fps: u32,
    /// Color of lit pixels, `#rrggbb`.
    pub foreground: Rgb,
    /// Color of dark pixels, `#rrggbb`.
    pub background: Rgb,
    /// Longest the display waits for a key press per tick, in milliseconds.
    pub event_wait_ms: u64,
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level.
    pub level: String,
    /// Log file. Empty logs to stderr.
    pub file: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            device_address: "127.0.0.1:7340".into(),
            connect_timeout_ms: 5000,
            read_timeout_ms: 250,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        let palette = Palette::default();
        Self {
            scale: DEFAULT_SCALE,
            fps: 30,
            foreground: palette.foreground,
            background: palette.background,
            event_wait_ms: 4,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            file: "flipscreen-view.log".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl ViewerConfig {
    /// Load from a TOML file, falling back to defaults.
    ///
    /// Loading happens before logging is set up, so instead of logging a
    /// fallback this returns why it happened for the caller to report.
    pub fn load(path: &Path) -> (Self, Option<String>) {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(cfg) => (cfg, None),
                Err(e) => (
                    Self::default(),
                    Some(format!("invalid config {}: {e}; using defaults", path.display())),
                ),
            },
            Err(e) => (
                Self::default(),
                Some(format!("cannot read config {}: {e}; using defaults", path.display())),
            ),
        }
    }

    /// Write default config to a file.
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let text = toml::to_string_pretty(&Self::default()).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.network.connect_timeout_ms)
    }

    /// Map the file settings onto the pipeline's [`RenderConfig`].
    pub fn to_render_config(&self) -> RenderConfig {
        RenderConfig {
            fps: self.display.fps,
            read_timeout: Duration::from_millis(self.network.read_timeout_ms.max(1)),
            event_wait: Duration::from_millis(self.display.event_wait_ms),
            scale: self.display.scale.max(1),
            palette: Palette {
                foreground: self.display.foreground,
                background: self.display.background,
            },
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
