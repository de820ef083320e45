//! Terminal presentation for the studio.
//!
//! Draws the header, spectrum and footer, and reads terminal input on a
//! background thread so the event loop can `select!` on it.

use super::panel::StudioPanel;
use crate::visualizer::TerminalSurface;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    text::{Line, Span},
    widgets::Paragraph,
};
use std::io::{self, Stdout};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};

const INPUT_POLL: Duration = Duration::from_millis(100);

const PANEL_FG: Color = Color::Rgb(185, 207, 212);
const PANEL_BG: Color = Color::Rgb(0, 0, 0);
const DISABLED_FG: Color = Color::Rgb(70, 80, 84);

/// Splits the screen into header, spectrum and footer rows.
pub fn layout(area: Rect) -> [Rect; 3] {
    Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area)
}

fn hint(key: &str, label: &str, enabled: bool) -> Span<'static> {
    let style = if enabled {
        Style::default().fg(PANEL_FG)
    } else {
        Style::default().fg(DISABLED_FG).add_modifier(Modifier::DIM)
    };
    Span::styled(format!(" [{key}] {label} "), style)
}

fn status_style(panel: &StudioPanel) -> Style {
    if panel.has_error() {
        return Style::default().fg(Color::Rgb(255, 255, 255)).bg(Color::Red);
    }
    match panel.status() {
        "RECORDING" => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        "FINISHED" => Style::default().fg(Color::Rgb(0x00, 0xff, 0xa3)),
        _ => Style::default().fg(PANEL_FG),
    }
}

fn header_line(panel: &StudioPanel) -> Line<'static> {
    let mut spans = vec![
        Span::styled(" firstsound ", Style::default().fg(PANEL_FG).add_modifier(Modifier::BOLD)),
        Span::raw("│ "),
        Span::raw(format!("Input: {}", panel.device_label())),
    ];

    let count = panel.devices().len();
    if count > 0 {
        let position = panel.selected_index().map(|i| i + 1).unwrap_or(0);
        spans.push(Span::styled(
            format!(" ({position}/{count})"),
            Style::default().fg(DISABLED_FG),
        ));
    }

    if let Some(error) = panel.error() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(error.to_string(), Style::default().fg(Color::Red)));
    } else if let Some(notice) = panel.notice() {
        spans.push(Span::raw("  "));
        spans.push(Span::raw(notice.to_string()));
    }

    Line::from(spans)
}

fn footer_line(panel: &StudioPanel, can_switch: bool) -> Line<'static> {
    let controls = panel.controls();
    let indicator = if panel.status() == "RECORDING" {
        Span::styled(" ● ", Style::default().fg(Color::Red))
    } else {
        Span::raw("   ")
    };

    Line::from(vec![
        indicator,
        Span::styled(panel.status().to_string(), status_style(panel)),
        Span::raw("  "),
        Span::raw(panel.timer().to_string()),
        Span::raw("  "),
        hint("r", "record", controls.start),
        hint("s", "stop", controls.stop),
        hint("p", "play", controls.play),
        hint("w", "save", controls.play),
        hint("d", "device", can_switch),
        hint("q", "quit", true),
    ])
}

/// Draws one full studio frame.
pub fn draw(frame: &mut Frame, panel: &StudioPanel, surface: &TerminalSurface) {
    let [header, spectrum, footer] = layout(frame.area());
    let base = Style::default().fg(PANEL_FG).bg(PANEL_BG);

    frame.render_widget(Paragraph::new(header_line(panel)).style(base), header);
    frame.render_widget(surface, spectrum);

    let can_switch = panel.controls().start && !panel.devices().is_empty();
    frame.render_widget(
        Paragraph::new(footer_line(panel, can_switch)).style(base),
        footer,
    );
}

/// Raw-mode alternate-screen terminal owned by the studio.
pub struct StudioTerminal {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    active: bool,
}

impl StudioTerminal {
    /// Enters raw mode and the alternate screen.
    ///
    /// # Errors
    /// - If raw mode cannot be enabled
    /// - If the alternate screen cannot be entered
    pub fn enter() -> anyhow::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        terminal.hide_cursor()?;

        Ok(Self {
            terminal,
            active: true,
        })
    }

    pub fn size(&self) -> anyhow::Result<(u16, u16)> {
        let size = self.terminal.size()?;
        Ok((size.width, size.height))
    }

    pub fn draw(&mut self, panel: &StudioPanel, surface: &TerminalSurface) -> anyhow::Result<()> {
        self.terminal.draw(|frame| draw(frame, panel, surface))?;
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

impl Drop for StudioTerminal {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

/// Something the event loop has to react to besides timers.
#[derive(Debug, Clone)]
pub enum StudioInput {
    Terminal(Event),
    /// External record/stop trigger (SIGUSR1)
    ToggleRecord,
}

/// Forwards terminal events and the external trigger from a blocking thread.
pub struct InputReader {
    rx: UnboundedReceiver<StudioInput>,
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl InputReader {
    /// Starts the reader. `toggle` is a flag set asynchronously by a signal handler.
    pub fn spawn(toggle: Arc<AtomicBool>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let shutdown = Arc::new(AtomicBool::new(false));
        let stop = shutdown.clone();

        let handle = std::thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                if toggle.swap(false, Ordering::Relaxed) {
                    tracing::info!("Received SIGUSR1: toggling recording");
                    if tx.send(StudioInput::ToggleRecord).is_err() {
                        break;
                    }
                }

                match event::poll(INPUT_POLL) {
                    Ok(true) => match event::read() {
                        Ok(ev) => {
                            if tx.send(StudioInput::Terminal(ev)).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::error!("Failed to read terminal event: {}", e);
                            break;
                        }
                    },
                    Ok(false) => {}
                    Err(e) => {
                        tracing::error!("Failed to poll terminal events: {}", e);
                        break;
                    }
                }
            }
            tracing::debug!("Input reader stopped");
        });

        Self {
            rx,
            shutdown,
            handle: Some(handle),
        }
    }

    /// Next input; `None` once the reader thread has exited.
    pub async fn next(&mut self) -> Option<StudioInput> {
        self.rx.recv().await
    }

    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for InputReader {
    fn drop(&mut self) {
        self.stop();
    }
}
