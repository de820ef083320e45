//! The interactive recording studio.
//!
//! [`Studio`] is the session context: it owns the device gateway, the
//! spectrum renderer, the recording controller and the playback sink, and
//! reacts to timers, chunk arrival and terminal input on a single task.

pub mod panel;
pub mod ticker;
pub mod ui;

pub use panel::StudioPanel;
pub use ticker::Ticker;
pub use ui::{InputReader, StudioInput, StudioTerminal};

use crate::capture::{DeviceGateway, StreamSource};
use crate::recording::chunk::Chunk;
use crate::recording::{PlaybackSink, RecordingController, RecordingState, TICK_INTERVAL};
use crate::visualizer::{SpectrumRenderer, TerminalSurface};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Session settings taken from the configuration file.
#[derive(Debug, Clone)]
pub struct StudioSettings {
    pub chunk_interval: Duration,
    pub frame_rate: u32,
    pub save_dir: PathBuf,
}

/// A user intent, independent of how it was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Record,
    Stop,
    Play,
    Save,
    NextDevice,
    ToggleRecord,
    Quit,
}

/// Maps a key press to an action.
pub fn key_action(key: KeyEvent) -> Option<Action> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::Quit),
        KeyCode::Char('r') => Some(Action::Record),
        KeyCode::Char('s') => Some(Action::Stop),
        KeyCode::Char('p') => Some(Action::Play),
        KeyCode::Char('w') => Some(Action::Save),
        KeyCode::Char('d') => Some(Action::NextDevice),
        KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Studio {
    gateway: DeviceGateway,
    renderer: Option<SpectrumRenderer>,
    controller: RecordingController<StudioPanel>,
    sink: Box<dyn PlaybackSink>,
    surface: TerminalSurface,
    frames: Ticker,
    clock: Ticker,
    save_dir: PathBuf,
}

impl Studio {
    pub fn new(
        gateway: DeviceGateway,
        sink: Box<dyn PlaybackSink>,
        settings: StudioSettings,
    ) -> Self {
        Self {
            gateway,
            renderer: None,
            controller: RecordingController::new(StudioPanel::new(), settings.chunk_interval),
            sink,
            surface: TerminalSurface::new(0, 0),
            frames: Ticker::per_second(settings.frame_rate),
            clock: Ticker::new(TICK_INTERVAL),
            save_dir: settings.save_dir,
        }
    }

    pub fn panel(&self) -> &StudioPanel {
        self.controller.observer()
    }

    pub fn state(&self) -> RecordingState {
        self.controller.state()
    }

    /// Lists devices and starts the visualizer on the configured input.
    ///
    /// A failed acquisition leaves the studio open with the error showing.
    pub fn open(&mut self) {
        let devices = self.gateway.list_devices();
        let current = self.gateway.constraints().device.clone();
        self.controller.observer_mut().set_devices(devices, &current);
        self.attach_visualizer();
    }

    /// Resizes the spectrum to fit a terminal of the given size.
    pub fn resize(&mut self, columns: u16, rows: u16) {
        let [_, spectrum, _] = ui::layout(ratatui::layout::Rect::new(0, 0, columns, rows));
        self.surface.resize(spectrum.width, spectrum.height);
    }

    pub fn handle(&mut self, action: Action) -> Flow {
        tracing::debug!("Studio action: {:?}", action);
        match action {
            Action::Record => self.record(),
            Action::Stop => self.stop(),
            Action::ToggleRecord => {
                if self.state() == RecordingState::Recording {
                    self.stop();
                } else {
                    self.record();
                }
            }
            Action::Play => self.play(),
            Action::Save => self.save(),
            Action::NextDevice => self.next_device(),
            Action::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    pub fn on_input(&mut self, input: StudioInput) -> Flow {
        match input {
            StudioInput::Terminal(Event::Key(key)) => match key_action(key) {
                Some(action) => self.handle(action),
                None => Flow::Continue,
            },
            StudioInput::Terminal(Event::Resize(columns, rows)) => {
                self.resize(columns, rows);
                Flow::Continue
            }
            StudioInput::Terminal(_) => Flow::Continue,
            StudioInput::ToggleRecord => self.handle(Action::ToggleRecord),
        }
    }

    pub fn on_frame(&mut self) {
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.render_frame(&mut self.surface);
        }
    }

    pub fn on_clock(&mut self, now: Instant) {
        self.controller.clock_tick(now);
    }

    pub fn on_chunk(&mut self, chunk: Option<Chunk>) {
        match chunk {
            Some(chunk) => self.controller.append(chunk),
            None => {
                self.controller.feed_closed();
                self.clock.cancel();
            }
        }
    }

    /// Stops all loops and releases the microphone.
    pub fn close(&mut self) {
        self.controller.stop();
        self.clock.cancel();
        self.detach_visualizer();
        self.gateway.release();
        tracing::info!("Studio closed");
    }

    /// Runs the event loop until the user quits.
    ///
    /// # Errors
    /// - If the SIGUSR1 handler cannot be registered
    /// - If drawing to the terminal fails
    pub async fn run(&mut self, terminal: &mut StudioTerminal) -> anyhow::Result<()> {
        let toggle = Arc::new(AtomicBool::new(false));
        signal_hook::flag::register(signal_hook::consts::SIGUSR1, toggle.clone())
            .map_err(|e| anyhow::anyhow!("Failed to register signal handler: {e}"))?;

        let (columns, rows) = terminal.size()?;
        self.resize(columns, rows);
        self.open();
        terminal.draw(self.panel(), &self.surface)?;

        let mut input = InputReader::spawn(toggle);
        tracing::debug!("Entering studio loop");

        loop {
            let flow = tokio::select! {
                _ = self.frames.tick() => {
                    self.on_frame();
                    Flow::Continue
                }
                now = self.clock.tick() => {
                    self.on_clock(now);
                    Flow::Continue
                }
                chunk = self.controller.next_chunk() => {
                    self.on_chunk(chunk);
                    Flow::Continue
                }
                event = input.next() => match event {
                    Some(event) => self.on_input(event),
                    None => {
                        tracing::warn!("Terminal input closed; leaving studio");
                        Flow::Quit
                    }
                },
            };

            if flow == Flow::Quit {
                break;
            }
            terminal.draw(self.panel(), &self.surface)?;
        }

        input.stop();
        self.close();
        Ok(())
    }

    fn record(&mut self) {
        if self
            .controller
            .start(&mut self.gateway, Instant::now())
            .is_err()
        {
            return;
        }
        if self.state() == RecordingState::Recording {
            self.clock.start();
            self.ensure_visualizer();
        }
    }

    fn stop(&mut self) {
        self.controller.stop();
        self.clock.cancel();
    }

    fn play(&mut self) {
        if let Err(e) = self.controller.play(self.sink.as_mut()) {
            tracing::error!("Playback failed: {}", e);
            self.controller
                .observer_mut()
                .show_notice(format!("Playback failed: {e}"));
        }
    }

    fn save(&mut self) {
        match self.controller.save(&self.save_dir) {
            Ok(Some(path)) => {
                let length = self
                    .controller
                    .artifact()
                    .and_then(|artifact| artifact.duration())
                    .map(|d| format!(" ({:.1}s)", d.as_secs_f64()))
                    .unwrap_or_default();
                self.controller
                    .observer_mut()
                    .show_notice(format!("Saved {}{length}", path.display()));
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!("Save failed: {}", e);
                self.controller
                    .observer_mut()
                    .show_notice(format!("Save failed: {e}"));
            }
        }
    }

    fn next_device(&mut self) {
        if self.state() == RecordingState::Recording {
            tracing::debug!("Device switch ignored while recording");
            return;
        }

        let Some(selector) = self.controller.observer_mut().next_device() else {
            self.controller
                .observer_mut()
                .show_notice("No other input devices");
            return;
        };

        self.detach_visualizer();
        self.gateway.select_device(selector);
        match self.gateway.acquire_stream() {
            Ok(_) => self.attach_visualizer(),
            Err(e) => self.controller.observer_mut().mic_error(&e),
        }
    }

    fn attach_visualizer(&mut self) {
        match self.gateway.stream() {
            Ok(stream) => {
                self.detach_visualizer();
                self.renderer = Some(SpectrumRenderer::bind(stream));
                self.frames.start();
                self.controller.observer_mut().mic_ready();
            }
            Err(e) => self.controller.observer_mut().mic_error(&e),
        }
    }

    /// Rebinds the renderer if the active stream changed underneath it.
    fn ensure_visualizer(&mut self) {
        let current = match (self.gateway.active_stream(), self.renderer.as_ref()) {
            (Some(active), Some(renderer)) => {
                renderer.is_live() && renderer.stream().same_stream(active)
            }
            (None, _) => true,
            (Some(_), None) => false,
        };
        if !current {
            self.attach_visualizer();
        }
    }

    fn detach_visualizer(&mut self) {
        if let Some(mut renderer) = self.renderer.take() {
            renderer.cancel();
        }
        self.frames.cancel();
    }
}
