//! Full-screen error display for failures that happen before the studio opens.

use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    widgets::{Paragraph, Wrap},
};
use std::io::{self, Stdout};

const ERROR_BG: Color = Color::Rgb(255, 0, 0);
const ERROR_FG: Color = Color::Rgb(255, 255, 255);

/// Red full-screen message that waits for a key press.
pub struct ErrorScreen {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    active: bool,
}

impl ErrorScreen {
    /// Enters raw mode and the alternate screen.
    ///
    /// # Errors
    /// - If raw mode cannot be enabled
    /// - If the alternate screen cannot be entered
    pub fn new() -> anyhow::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(ErrorScreen {
            terminal,
            active: true,
        })
    }

    /// Shows `message` centered on a red background until a key is pressed.
    ///
    /// # Errors
    /// - If terminal rendering fails
    pub fn show_error(&mut self, message: &str) -> anyhow::Result<()> {
        loop {
            self.terminal.draw(|frame| render_error(frame, message))?;

            if event::poll(std::time::Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    /// Restores the terminal. Safe to call more than once.
    pub fn cleanup(&mut self) -> anyhow::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for ErrorScreen {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

/// Area for a message of `lines` lines: 80% wide, vertically centered.
fn message_area(area: Rect, lines: u16) -> Rect {
    let width = area.width * 8 / 10;
    let height = lines.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn render_error(frame: &mut Frame, message: &str) {
    let area = frame.area();
    frame.buffer_mut().set_style(area, Style::default().bg(ERROR_BG));

    let style = Style::default().fg(ERROR_FG).bg(ERROR_BG);
    let paragraph = Paragraph::new(Text::styled(message.to_string(), style))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });

    let lines = wrapped_lines(message, area.width * 8 / 10);
    frame.render_widget(paragraph, message_area(area, lines));
}

/// Rough line count after wrapping; each source line takes at least one row.
fn wrapped_lines(message: &str, width: u16) -> u16 {
    let width = width.max(1) as usize;
    message
        .lines()
        .map(|line| line.chars().count().div_ceil(width).max(1))
        .sum::<usize>()
        .min(u16::MAX as usize) as u16
}
