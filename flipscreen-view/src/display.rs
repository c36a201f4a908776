//! Terminal display: draws decoded frames with half-block characters.
//!
//! Each terminal cell shows two vertically stacked pixels: the glyph `▀`
//! takes the even row as its foreground color and the odd row as its
//! background, so the 128x64 screen fits in 128x32 cells.

use std::io::{Stdout, stdout};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use flipscreen_core::{PixelBuffer, Rgb, ScreenError};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};
use ratatui::{Frame, Terminal};
use tracing::{debug, warn};

const HALF_BLOCK: &str = "▀";

/// A [`DisplaySink`](flipscreen_core::DisplaySink) on the controlling
/// terminal.
pub struct TerminalDisplay {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    title: String,
    quit: bool,
    restored: bool,
}

impl TerminalDisplay {
    /// Take over the terminal: raw mode plus the alternate screen.
    pub fn open(title: impl Into<String>) -> Result<Self, ScreenError> {
        crossterm::terminal::enable_raw_mode().map_err(display_err)?;
        let terminal = crossterm::execute!(stdout(), crossterm::terminal::EnterAlternateScreen)
            .and_then(|_| Terminal::new(CrosstermBackend::new(stdout())));
        let terminal = match terminal {
            Ok(terminal) => terminal,
            Err(e) => {
                let _ = crossterm::execute!(stdout(), crossterm::terminal::LeaveAlternateScreen);
                let _ = crossterm::terminal::disable_raw_mode();
                return Err(display_err(e));
            }
        };

        // From here on, Drop restores the terminal.
        let mut display = Self {
            terminal,
            title: title.into(),
            quit: false,
            restored: false,
        };
        display.terminal.hide_cursor().map_err(display_err)?;
        display.terminal.clear().map_err(display_err)?;
        Ok(display)
    }

    fn restore(&mut self) -> Result<(), ScreenError> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;
        let _ = self.terminal.show_cursor();
        crossterm::terminal::disable_raw_mode().map_err(display_err)?;
        crossterm::execute!(stdout(), crossterm::terminal::LeaveAlternateScreen)
            .map_err(display_err)?;
        Ok(())
    }
}

impl flipscreen_core::DisplaySink for TerminalDisplay {
    fn present(&mut self, frame: &PixelBuffer) -> Result<(), ScreenError> {
        let lines = half_block_lines(frame);
        let title = self.title.as_str();
        self.terminal
            .draw(|f| draw(f, title, lines))
            .map_err(display_err)?;
        Ok(())
    }

    fn pump_events(&mut self, wait: Duration) -> Result<(), ScreenError> {
        let mut wait = wait;
        while event::poll(wait).map_err(display_err)? {
            if let Event::Key(key) = event::read().map_err(display_err)? {
                if is_quit_key(&key) {
                    debug!(code = ?key.code, "quit key pressed");
                    self.quit = true;
                }
            }
            // Drain whatever else is queued without waiting again.
            wait = Duration::ZERO;
        }
        Ok(())
    }

    fn quit_requested(&self) -> bool {
        self.quit
    }

    fn close(&mut self) -> Result<(), ScreenError> {
        self.restore()
    }
}

impl Drop for TerminalDisplay {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            warn!("failed to restore terminal: {e}");
        }
    }
}

// ── Drawing ──────────────────────────────────────────────────────

fn draw(f: &mut Frame, title: &str, lines: Vec<Line<'static>>) {
    let block = Block::bordered().title(format!(" {title} "));
    let width = lines.first().map_or(0, Line::width) as u16 + 2;
    let height = lines.len() as u16 + 2;

    let area = f.area();
    let target = Rect::new(
        area.x,
        area.y,
        width.min(area.width),
        height.min(area.height),
    );
    f.render_widget(Paragraph::new(lines).block(block), target);
}

/// Pack a pixel buffer into half-block lines, one per pair of rows.
///
/// Adjacent cells with identical colors share one span.
pub fn half_block_lines(frame: &PixelBuffer) -> Vec<Line<'static>> {
    let rows: Vec<&[Rgb]> = frame.rows().collect();

    rows.chunks(2)
        .map(|pair| {
            let top = pair[0];
            let bottom = pair.get(1).copied();

            let mut spans: Vec<Span<'static>> = Vec::new();
            let mut run: Option<(Style, usize)> = None;

            for (x, &upper) in top.iter().enumerate() {
                let lower = bottom.map_or(upper, |row| row[x]);
                let style = Style::new().fg(color(upper)).bg(color(lower));
                run = match run {
                    Some((current, len)) if current == style => Some((current, len + 1)),
                    previous => {
                        if let Some((style, len)) = previous {
                            spans.push(Span::styled(HALF_BLOCK.repeat(len), style));
                        }
                        Some((style, 1))
                    }
                };
            }
            if let Some((style, len)) = run {
                spans.push(Span::styled(HALF_BLOCK.repeat(len), style));
            }
            Line::from(spans)
        })
        .collect()
}

fn color(c: Rgb) -> Color {
    Color::Rgb(c.r, c.g, c.b)
}

/// `q`, `Esc` and `Ctrl-C` end the session.
pub fn is_quit_key(key: &KeyEvent) -> bool {
    if key.kind != KeyEventKind::Press {
        return false;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

fn display_err(e: impl std::fmt::Display) -> ScreenError {
    ScreenError::Display(e.to_string())
}

// ── Tests ────────────────────────────────────────────────────────
