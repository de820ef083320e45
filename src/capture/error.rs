//! Error taxonomy for audio capture.

use thiserror::Error;

/// Failures reported by the capture subsystem.
///
/// Acquisition errors are terminal for the attempt that produced them; the
/// caller decides whether to prompt again.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// The platform refused access to the microphone
    #[error("Microphone access was denied: {0}")]
    PermissionDenied(String),

    /// No input device matches the request
    #[error("No audio input device found: {0}")]
    NoDeviceFound(String),

    /// The platform cannot capture audio with any supported configuration
    #[error("Audio capture is not supported: {0}")]
    CaptureUnsupported(String),

    /// Devices cannot be listed; callers degrade to an empty device list
    #[error("Device enumeration is not supported: {0}")]
    DeviceEnumerationUnsupported(String),

    /// Any other backend failure
    #[error("Audio backend error: {0}")]
    Backend(String),
}

impl CaptureError {
    /// Short label for status displays.
    pub fn status_label(&self) -> &'static str {
        match self {
            Self::PermissionDenied(_) => "MIC DENIED",
            Self::NoDeviceFound(_) => "NO MIC",
            _ => "MIC ERROR",
        }
    }

    /// Classifies a backend-specific message, recognising OS permission failures.
    pub(crate) fn from_backend_message(message: String) -> Self {
        let lowered = message.to_lowercase();
        if lowered.contains("permission denied") || lowered.contains("not permitted") {
            Self::PermissionDenied(message)
        } else {
            Self::Backend(message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_message_classification() {
        let err = CaptureError::from_backend_message("snd_pcm_open: Permission denied".to_string());
        assert!(matches!(err, CaptureError::PermissionDenied(_)));

        let err = CaptureError::from_backend_message("device busy".to_string());
        assert!(matches!(err, CaptureError::Backend(_)));
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(CaptureError::NoDeviceFound("x".into()).status_label(), "NO MIC");
        assert_eq!(CaptureError::Backend("x".into()).status_label(), "MIC ERROR");
    }
}
