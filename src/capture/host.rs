//! cpal-backed capture subsystem.
//!
//! Captures from a specified or default input device at its native sample
//! rate and format. Every sample format is converted to i16 before it reaches
//! the [`InputStream`], which downmixes to mono.

use super::{
    CaptureBackend, CaptureError, CaptureHandle, DeviceDescriptor, DeviceSelector, InputStream,
    StreamConstraints, StreamGuard, StreamInfo,
};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

#[cfg(target_os = "linux")]
use std::fs::OpenOptions;
#[cfg(target_os = "linux")]
use std::os::unix::io::AsRawFd;

/// Capture backend using the platform's default cpal host.
#[derive(Default)]
pub struct CpalBackend;

impl CpalBackend {
    pub fn new() -> Self {
        Self
    }

    /// Name of the platform's default input device, if there is one.
    pub fn default_input_name(&self) -> Option<String> {
        suppress_alsa_warnings(|| {
            Ok(cpal::default_host()
                .default_input_device()
                .and_then(|d| d.name().ok()))
        })
        .ok()
        .flatten()
    }
}

impl CaptureBackend for CpalBackend {
    fn open(&mut self, constraints: &StreamConstraints) -> Result<CaptureHandle, CaptureError> {
        let device = suppress_alsa_warnings(|| {
            let host = cpal::default_host();
            match &constraints.device {
                DeviceSelector::Default => host.default_input_device().ok_or_else(|| {
                    CaptureError::NoDeviceFound("no default input device".to_string())
                }),
                DeviceSelector::Named(spec) => find_device(&host, spec),
            }
        })?;

        let device_name = device
            .name()
            .unwrap_or_else(|_| "Unknown device".to_string());
        tracing::info!("Capture device: {}", device_name);

        let supported = device.default_input_config().map_err(map_default_config_error)?;
        let sample_format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();

        tracing::debug!(
            "Device configuration: {}Hz, {} channels, {:?}",
            config.sample_rate.0,
            config.channels,
            sample_format
        );

        let stream = InputStream::new(StreamInfo {
            device: device_name,
            sample_rate: config.sample_rate.0,
            channels: config.channels,
        });

        let platform_stream = build_stream(&device, &config, sample_format, stream.clone())?;
        platform_stream
            .play()
            .map_err(|e| CaptureError::from_backend_message(e.to_string()))?;

        tracing::debug!("Audio stream started");
        Ok(CaptureHandle {
            stream,
            guard: StreamGuard::new(platform_stream),
        })
    }

    fn enumerate(&mut self) -> Result<Vec<DeviceDescriptor>, CaptureError> {
        suppress_alsa_warnings(|| {
            let host = cpal::default_host();
            let devices = host
                .input_devices()
                .map_err(|e| CaptureError::DeviceEnumerationUnsupported(e.to_string()))?;

            Ok(devices
                .filter_map(|d| d.name().ok())
                .enumerate()
                .map(|(index, name)| describe(index, name))
                .collect())
        })
    }
}

/// Builds a descriptor, labelling unnamed devices by position.
fn describe(index: usize, name: String) -> DeviceDescriptor {
    let label = if name.trim().is_empty() {
        format!("Microphone {}", index + 1)
    } else {
        name.clone()
    };
    DeviceDescriptor { id: name, label }
}

fn build_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
    stream: InputStream,
) -> Result<cpal::Stream, CaptureError> {
    let failed = stream.clone();
    let err_fn = move |err: cpal::StreamError| {
        tracing::error!("Audio stream error: {}", err);
        if matches!(err, cpal::StreamError::DeviceNotAvailable) {
            failed.end();
        }
    };

    let built = match sample_format {
        cpal::SampleFormat::I16 => device.build_input_stream(
            config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                stream.push_interleaved(data);
            },
            err_fn,
            None,
        ),
        cpal::SampleFormat::F32 => device.build_input_stream(
            config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let converted: Vec<i16> = data
                    .iter()
                    .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                    .collect();
                stream.push_interleaved(&converted);
            },
            err_fn,
            None,
        ),
        cpal::SampleFormat::U16 => device.build_input_stream(
            config,
            move |data: &[u16], _: &cpal::InputCallbackInfo| {
                let converted: Vec<i16> = data.iter().map(|&s| (s as i32 - 32768) as i16).collect();
                stream.push_interleaved(&converted);
            },
            err_fn,
            None,
        ),
        other => {
            return Err(CaptureError::CaptureUnsupported(format!(
                "sample format {other:?}"
            )))
        }
    };

    built.map_err(map_build_error)
}

fn map_default_config_error(err: cpal::DefaultStreamConfigError) -> CaptureError {
    match err {
        cpal::DefaultStreamConfigError::DeviceNotAvailable => {
            CaptureError::NoDeviceFound("device is no longer available".to_string())
        }
        cpal::DefaultStreamConfigError::StreamTypeNotSupported => {
            CaptureError::CaptureUnsupported("device does not support input".to_string())
        }
        cpal::DefaultStreamConfigError::BackendSpecific { err } => {
            CaptureError::from_backend_message(err.description)
        }
    }
}

fn map_build_error(err: cpal::BuildStreamError) -> CaptureError {
    match err {
        cpal::BuildStreamError::DeviceNotAvailable => {
            CaptureError::NoDeviceFound("device is no longer available".to_string())
        }
        cpal::BuildStreamError::StreamConfigNotSupported => {
            CaptureError::CaptureUnsupported("stream configuration not supported".to_string())
        }
        cpal::BuildStreamError::BackendSpecific { err } => {
            CaptureError::from_backend_message(err.description)
        }
        other => CaptureError::Backend(other.to_string()),
    }
}

/// Finds an audio input device by name or numeric index.
///
/// # Arguments
/// * `host` - The cpal audio host
/// * `device_spec` - A device name or a numeric index (0, 1, 2, etc.)
///
/// # Errors
/// - If no device with the specified name/index is found
fn find_device(host: &cpal::Host, device_spec: &str) -> Result<cpal::Device, CaptureError> {
    let devices: Vec<cpal::Device> = host
        .input_devices()
        .map_err(|e| CaptureError::DeviceEnumerationUnsupported(e.to_string()))?
        .collect();

    if let Ok(index) = device_spec.parse::<usize>() {
        let count = devices.len();
        return devices.into_iter().nth(index).ok_or_else(|| {
            CaptureError::NoDeviceFound(format!(
                "device index {} is out of range (0-{})",
                index,
                count.saturating_sub(1)
            ))
        });
    }

    devices
        .into_iter()
        .find(|device| device.name().map(|name| name == device_spec).unwrap_or(false))
        .ok_or_else(|| {
            CaptureError::NoDeviceFound(format!(
                "'{device_spec}' not found. Use 'firstsound list-devices' to see available devices."
            ))
        })
}

/// Temporarily redirects stderr to /dev/null to suppress ALSA library warnings on Linux.
/// On non-Linux platforms, this is a no-op since ALSA doesn't exist.
#[cfg(target_os = "linux")]
pub(crate) fn suppress_alsa_warnings<F, T>(f: F) -> Result<T, CaptureError>
where
    F: FnOnce() -> Result<T, CaptureError>,
{
    let Ok(dev_null) = OpenOptions::new().write(true).open("/dev/null") else {
        return f();
    };

    let dev_null_fd = dev_null.as_raw_fd();

    let old_stderr = unsafe { libc::dup(libc::STDERR_FILENO) };
    if old_stderr == -1 {
        return f();
    }

    let redirect_result = unsafe { libc::dup2(dev_null_fd, libc::STDERR_FILENO) };
    if redirect_result == -1 {
        unsafe { libc::close(old_stderr) };
        return f();
    }

    let result = f();

    unsafe {
        libc::dup2(old_stderr, libc::STDERR_FILENO);
        libc::close(old_stderr);
    }

    result
}

#[cfg(not(target_os = "linux"))]
pub(crate) fn suppress_alsa_warnings<F, T>(f: F) -> Result<T, CaptureError>
where
    F: FnOnce() -> Result<T, CaptureError>,
{
    f()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unnamed_devices_get_positional_labels() {
        let named = describe(0, "USB Audio".to_string());
        assert_eq!(named.id, "USB Audio");
        assert_eq!(named.label, "USB Audio");

        let unnamed = describe(2, String::new());
        assert_eq!(unnamed.label, "Microphone 3");
    }

    #[test]
    fn test_build_errors_map_to_taxonomy() {
        assert!(matches!(
            map_build_error(cpal::BuildStreamError::DeviceNotAvailable),
            CaptureError::NoDeviceFound(_)
        ));
        assert!(matches!(
            map_build_error(cpal::BuildStreamError::StreamConfigNotSupported),
            CaptureError::CaptureUnsupported(_)
        ));
        assert!(matches!(
            map_default_config_error(cpal::DefaultStreamConfigError::StreamTypeNotSupported),
            CaptureError::CaptureUnsupported(_)
        ));
    }
}
