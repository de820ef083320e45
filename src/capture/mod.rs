//! Microphone acquisition and device enumeration.
//!
//! [`DeviceGateway`] is the single owner of the session's live input stream.
//! Platform access sits behind [`CaptureBackend`] so the rest of the studio
//! can run against a scripted backend in tests.

pub mod error;
pub mod host;
pub mod stream;

pub use error::CaptureError;
pub use host::CpalBackend;
pub use stream::{InputStream, PcmSink, SinkId, StreamInfo};

use std::any::Any;

/// Which input device a stream should be opened on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DeviceSelector {
    /// The platform's default input device
    #[default]
    Default,
    /// A device id from [`DeviceDescriptor::id`], a device name, or a numeric index
    Named(String),
}

impl DeviceSelector {
    /// Parses a config value: `"default"` or anything else as a named device.
    pub fn from_config(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("default") {
            Self::Default
        } else {
            Self::Named(trimmed.to_string())
        }
    }
}

impl std::fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::Named(name) => write!(f, "{name}"),
        }
    }
}

/// Constraints used when opening a capture stream.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StreamConstraints {
    pub device: DeviceSelector,
}

/// Snapshot of one enumerated input device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// Backend-specific identifier. For cpal this is the device name.
    pub id: String,
    /// Display label
    pub label: String,
}

/// Keeps the platform stream running; dropping it stops capture.
pub struct StreamGuard {
    _inner: Box<dyn Any>,
}

impl StreamGuard {
    pub fn new<T: 'static>(inner: T) -> Self {
        Self {
            _inner: Box::new(inner),
        }
    }
}

/// A freshly opened stream plus the guard that keeps it alive.
pub struct CaptureHandle {
    pub stream: InputStream,
    pub guard: StreamGuard,
}

/// Platform capture subsystem.
pub trait CaptureBackend {
    /// Opens an input stream. May trigger a platform permission prompt.
    fn open(&mut self, constraints: &StreamConstraints) -> Result<CaptureHandle, CaptureError>;

    /// Lists available input devices.
    fn enumerate(&mut self) -> Result<Vec<DeviceDescriptor>, CaptureError>;
}

/// Something that can hand out the session's input stream.
pub trait StreamSource {
    /// Returns the active stream, acquiring one if none is open.
    fn stream(&mut self) -> Result<InputStream, CaptureError>;
}

/// Owns the active input stream and mediates all device access.
///
/// No retry logic lives here: a failed acquisition is returned to the caller,
/// which decides whether to ask again.
pub struct DeviceGateway {
    backend: Box<dyn CaptureBackend>,
    constraints: StreamConstraints,
    active: Option<CaptureHandle>,
}

impl DeviceGateway {
    pub fn new(backend: Box<dyn CaptureBackend>, constraints: StreamConstraints) -> Self {
        Self {
            backend,
            constraints,
            active: None,
        }
    }

    /// Opens a new stream with the current constraints, replacing any active one.
    ///
    /// The previous stream is released first so exclusive-access devices can be
    /// reopened. On failure no stream is active.
    ///
    /// # Errors
    /// - `PermissionDenied` if the platform refuses access
    /// - `NoDeviceFound` if the requested device does not exist
    /// - `CaptureUnsupported` if no usable capture configuration exists
    pub fn acquire_stream(&mut self) -> Result<InputStream, CaptureError> {
        self.release();

        tracing::debug!("Acquiring input stream on device '{}'", self.constraints.device);
        let handle = self.backend.open(&self.constraints).map_err(|e| {
            tracing::error!("Failed to acquire input stream: {}", e);
            e
        })?;

        let info = handle.stream.info();
        tracing::info!(
            "Input stream acquired: {} ({}Hz, {} channels)",
            info.device,
            info.sample_rate,
            info.channels
        );

        let stream = handle.stream.clone();
        self.active = Some(handle);
        Ok(stream)
    }

    /// Enumerates input devices, degrading to an empty list on failure.
    pub fn list_devices(&mut self) -> Vec<DeviceDescriptor> {
        match self.backend.enumerate() {
            Ok(devices) => {
                tracing::debug!("Enumerated {} input devices", devices.len());
                devices
            }
            Err(e) => {
                tracing::warn!("Device enumeration failed, continuing without labels: {}", e);
                Vec::new()
            }
        }
    }

    pub fn active_stream(&self) -> Option<&InputStream> {
        self.active.as_ref().map(|handle| &handle.stream)
    }

    pub fn constraints(&self) -> &StreamConstraints {
        &self.constraints
    }

    /// Changes the device used by the next acquisition.
    pub fn select_device(&mut self, device: DeviceSelector) {
        tracing::info!("Input device selected: {}", device);
        self.constraints.device = device;
    }

    /// Stops and drops the active stream, if any.
    pub fn release(&mut self) {
        if let Some(CaptureHandle { stream, guard }) = self.active.take() {
            tracing::debug!("Releasing input stream: {}", stream.info().device);
            drop(guard);
        }
    }
}

impl StreamSource for DeviceGateway {
    fn stream(&mut self) -> Result<InputStream, CaptureError> {
        match &self.active {
            Some(handle) => Ok(handle.stream.clone()),
            None => self.acquire_stream(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::gateway;
    use super::*;

    #[test]
    fn test_selector_from_config() {
        assert_eq!(DeviceSelector::from_config("default"), DeviceSelector::Default);
        assert_eq!(DeviceSelector::from_config(" Default "), DeviceSelector::Default);
        assert_eq!(DeviceSelector::from_config(""), DeviceSelector::Default);
        assert_eq!(
            DeviceSelector::from_config("USB Mic"),
            DeviceSelector::Named("USB Mic".to_string())
        );
    }

    #[test]
    fn test_acquire_replaces_active_stream() {
        let (mut gateway, script) = gateway();

        let first = gateway.acquire_stream().unwrap();
        let second = gateway.acquire_stream().unwrap();

        assert!(!first.same_stream(&second));
        assert!(gateway.active_stream().unwrap().same_stream(&second));
        assert_eq!(script.borrow().live_guards, 1);
    }

    #[test]
    fn test_acquire_failure_is_returned_without_retry() {
        let (mut gateway, script) = gateway();
        script
            .borrow_mut()
            .open_results
            .push(Err(CaptureError::PermissionDenied("denied".to_string())));

        let err = gateway.acquire_stream().unwrap_err();
        assert!(matches!(err, CaptureError::PermissionDenied(_)));
        assert_eq!(script.borrow().opened.len(), 1);
        assert!(gateway.active_stream().is_none());
    }

    #[test]
    fn test_stream_source_reuses_active_stream() {
        let (mut gateway, script) = gateway();

        let first = gateway.stream().unwrap();
        let again = gateway.stream().unwrap();

        assert!(first.same_stream(&again));
        assert_eq!(script.borrow().opened.len(), 1);
    }

    #[test]
    fn test_enumeration_failure_yields_empty_list() {
        let (mut gateway, script) = gateway();
        script.borrow_mut().devices = None;

        assert!(gateway.list_devices().is_empty());
    }

    #[test]
    fn test_selected_device_is_used_for_next_acquisition() {
        let (mut gateway, script) = gateway();
        gateway.select_device(DeviceSelector::Named("Line In".to_string()));
        gateway.acquire_stream().unwrap();

        assert_eq!(
            script.borrow().opened[0].device,
            DeviceSelector::Named("Line In".to_string())
        );
    }

    #[test]
    fn test_release_drops_guard() {
        let (mut gateway, script) = gateway();
        gateway.acquire_stream().unwrap();
        gateway.release();

        assert_eq!(script.borrow().live_guards, 0);
        assert!(gateway.active_stream().is_none());
    }
}
