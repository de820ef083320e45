//! Presentation state shown around the spectrum.

use crate::capture::{CaptureError, DeviceDescriptor, DeviceSelector};
use crate::recording::{Controls, RecordingObserver, RecordingState};

/// Everything the studio screen displays besides the spectrum itself.
#[derive(Debug, Clone)]
pub struct StudioPanel {
    status: &'static str,
    /// Last state reported by the controller
    state: RecordingState,
    timer: String,
    controls: Controls,
    error: Option<String>,
    notice: Option<String>,
    devices: Vec<DeviceDescriptor>,
    /// Index into `devices`; `None` is the platform default
    selected: Option<usize>,
}

impl Default for StudioPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl StudioPanel {
    pub fn new() -> Self {
        Self {
            status: RecordingState::Idle.status_label(),
            state: RecordingState::Idle,
            timer: crate::recording::clock::format_elapsed(0),
            controls: Controls::for_state(RecordingState::Idle),
            error: None,
            notice: None,
            devices: Vec::new(),
            selected: None,
        }
    }

    pub fn status(&self) -> &str {
        self.status
    }

    pub fn timer(&self) -> &str {
        &self.timer
    }

    pub fn controls(&self) -> Controls {
        self.controls
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn devices(&self) -> &[DeviceDescriptor] {
        &self.devices
    }

    /// Replaces the device list and marks the entry matching `current`.
    pub fn set_devices(&mut self, devices: Vec<DeviceDescriptor>, current: &DeviceSelector) {
        self.selected = match current {
            DeviceSelector::Default => None,
            DeviceSelector::Named(name) => devices
                .iter()
                .position(|d| &d.id == name || &d.label == name)
                .or_else(|| name.parse::<usize>().ok().filter(|&i| i < devices.len())),
        };
        self.devices = devices;
    }

    /// Label of the selected input for the header.
    pub fn device_label(&self) -> &str {
        match self.selected.and_then(|i| self.devices.get(i)) {
            Some(device) => &device.label,
            None => "Default input",
        }
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    /// Advances the selection: default, each device in order, then default again.
    ///
    /// Returns the selector to acquire, or `None` when there is nothing to
    /// cycle through.
    pub fn next_device(&mut self) -> Option<DeviceSelector> {
        if self.devices.is_empty() {
            return None;
        }

        self.selected = match self.selected {
            None => Some(0),
            Some(i) if i + 1 < self.devices.len() => Some(i + 1),
            Some(_) => None,
        };

        Some(match self.selected {
            Some(i) => DeviceSelector::Named(self.devices[i].id.clone()),
            None => DeviceSelector::Default,
        })
    }

    /// Shows a one-line message in the footer until the next state change.
    pub fn show_notice(&mut self, message: impl Into<String>) {
        self.notice = Some(message.into());
    }

    /// Records a microphone failure that happened outside the controller.
    pub fn mic_error(&mut self, error: &CaptureError) {
        self.on_error(error);
    }

    /// Clears a previous microphone failure after a successful acquisition.
    pub fn mic_ready(&mut self) {
        if self.error.take().is_some() {
            self.status = self.state.status_label();
        }
    }
}

impl RecordingObserver for StudioPanel {
    fn on_transition(&mut self, state: RecordingState, controls: Controls) {
        self.status = state.status_label();
        self.state = state;
        self.controls = controls;
        self.error = None;
        self.notice = None;
    }

    fn on_tick(&mut self, elapsed: &str) {
        self.timer.clear();
        self.timer.push_str(elapsed);
    }

    fn on_error(&mut self, error: &CaptureError) {
        self.status = error.status_label();
        self.error = Some(error.to_string());
        self.notice = None;
    }
}
