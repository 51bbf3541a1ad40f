//! Terminal display using ANSI colors.

use super::Display;
use crate::config::DisplayConfig;
use crate::error::Result;
use crate::metrics::data::{AlertLevel, Color, ScreenData, Section};
use async_trait::async_trait;
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute,
    style::{style, Color as TermColor, Stylize},
    terminal::{Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use std::io::{self, Write};
use tracing::debug;

const MIN_WIDTH: usize = 24;

/// Renders screens as text frames on stdout.
pub struct TerminalDisplay {
    width: usize,
    clear_screen: bool,
    color: bool,
    alternate_screen: bool,
    last_frame: Option<String>,
}

impl TerminalDisplay {
    pub fn new() -> Self {
        Self {
            width: 64,
            clear_screen: true,
            color: false,
            alternate_screen: false,
            last_frame: None,
        }
    }
}

impl Default for TerminalDisplay {
    fn default() -> Self {
        Self::new()
    }
}

fn term_color(color: Color) -> TermColor {
    match color {
        Color::White => TermColor::White,
        Color::Red => TermColor::Red,
        Color::Green => TermColor::Green,
        Color::Yellow => TermColor::Yellow,
        Color::Blue => TermColor::Blue,
    }
}

fn paint(text: &str, color: Color, enabled: bool) -> String {
    if enabled {
        style(text).with(term_color(color)).to_string()
    } else {
        text.to_string()
    }
}

fn bar(value: f64, max: f64, cells: usize) -> String {
    let ratio = if max > 0.0 { (value / max).clamp(0.0, 1.0) } else { 0.0 };
    let filled = (ratio * cells as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(cells - filled))
}

/// Lay out one frame of `screen` as text, `width` columns wide.
///
/// `clock` is printed in the header so the frame only changes when either
/// the screen data or the displayed time changes.
pub fn render_frame(screen: &ScreenData, clock: &str, width: usize, color: bool) -> String {
    let width = width.max(MIN_WIDTH);
    let rule = "=".repeat(width);
    let mut lines = Vec::new();

    let gap = width.saturating_sub(screen.title.chars().count() + clock.chars().count());
    lines.push(format!("{}{}{}", screen.title, " ".repeat(gap.max(1)), clock));
    lines.push(rule.clone());

    for section in &screen.sections {
        let line = match section {
            Section::Title { text, color: c } => paint(&text.to_uppercase(), *c, color),
            Section::Metric {
                label,
                value,
                color: c,
            } => format!("{:<14}{}", format!("{label}:"), paint(value, *c, color)),
            Section::Bar {
                label,
                value,
                max,
                color: c,
            } => {
                let cells = width.saturating_sub(16).max(4);
                format!("{:<14}{}", label, paint(&bar(*value, *max, cells), *c, color))
            }
            Section::Text { text, color: c } => paint(text, *c, color),
        };
        lines.push(line);
    }

    if !screen.alerts.is_empty() {
        lines.push(rule.clone());
        for alert in &screen.alerts {
            let c = match alert.level {
                AlertLevel::Critical => Color::Red,
                AlertLevel::Warning => Color::Yellow,
                AlertLevel::Info => Color::Blue,
            };
            let text = format!("! {}: {}", alert.level.to_string().to_uppercase(), alert.message);
            lines.push(paint(&text, c, color));
        }
    }

    lines.push(rule);
    lines.join("\n")
}

#[async_trait]
impl Display for TerminalDisplay {
    fn name(&self) -> &str {
        "terminal"
    }

    async fn initialize(&mut self, config: &DisplayConfig) -> Result<bool> {
        let mut stdout = io::stdout();
        let is_tty = stdout.is_tty();

        self.width = config.width as usize;
        self.clear_screen = config.clear_screen;
        self.color = is_tty;

        if is_tty && self.clear_screen {
            execute!(stdout, EnterAlternateScreen, Hide)?;
            self.alternate_screen = true;
        }
        debug!(
            "Terminal display ready ({} columns, color {})",
            self.width, self.color
        );
        Ok(true)
    }

    async fn render(&mut self, screen: &ScreenData) -> Result<()> {
        let clock = chrono::Local::now().format("%H:%M").to_string();
        let frame = render_frame(screen, &clock, self.width, self.color);
        if self.last_frame.as_deref() == Some(frame.as_str()) {
            return Ok(());
        }

        let mut stdout = io::stdout().lock();
        if self.alternate_screen {
            execute!(stdout, Clear(ClearType::All), MoveTo(0, 0))?;
        } else {
            writeln!(stdout)?;
        }
        writeln!(stdout, "{}", frame)?;
        stdout.flush()?;

        self.last_frame = Some(frame);
        Ok(())
    }

    async fn clear(&mut self) -> Result<()> {
        if self.alternate_screen {
            execute!(io::stdout(), Clear(ClearType::All), MoveTo(0, 0))?;
        }
        self.last_frame = None;
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<()> {
        if self.alternate_screen {
            execute!(io::stdout(), Show, LeaveAlternateScreen)?;
            self.alternate_screen = false;
        }
        Ok(())
    }
}
