//! Configuration file management for firstsound.
//!
//! Configuration lives in `~/.config/firstsound/firstsound.toml`. A missing
//! file is created with defaults on first run; missing keys fall back to
//! their defaults so older files keep loading.

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Input device settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Input device to use. Options:
    /// - "default" for the system default device
    /// - numeric index (0, 1, 2, etc.) from `firstsound list-devices`
    /// - device name from `firstsound list-devices`
    #[serde(default = "default_device")]
    pub device: String,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
        }
    }
}

fn default_device() -> String {
    "default".to_string()
}

/// Take recording settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingConfig {
    /// How much audio each recorded chunk holds, in milliseconds
    #[serde(default = "default_chunk_interval_ms")]
    pub chunk_interval_ms: u64,
    /// Where saved takes are written. Defaults to the user's audio directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_dir: Option<PathBuf>,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            chunk_interval_ms: default_chunk_interval_ms(),
            save_dir: None,
        }
    }
}

fn default_chunk_interval_ms() -> u64 {
    250
}

impl RecordingConfig {
    pub fn chunk_interval(&self) -> Duration {
        Duration::from_millis(self.chunk_interval_ms.max(1))
    }

    /// Resolves the save directory: configured, then audio dir, then home.
    pub fn resolved_save_dir(&self) -> anyhow::Result<PathBuf> {
        if let Some(dir) = &self.save_dir {
            return Ok(expand_home(dir));
        }
        dirs::audio_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| anyhow!("Could not determine a directory for saved takes"))
    }
}

/// Spectrum display settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualizerConfig {
    /// Frames per second for the spectrum
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            frame_rate: default_frame_rate(),
        }
    }
}

fn default_frame_rate() -> u32 {
    60
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirstSoundConfig {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub recording: RecordingConfig,
    #[serde(default)]
    pub visualizer: VisualizerConfig,
}

impl FirstSoundConfig {
    /// Loads configuration from the user's config directory, creating the
    /// file with defaults if it does not exist yet.
    ///
    /// # Errors
    /// - If the config directory cannot be determined or created
    /// - If the config file cannot be read or written
    /// - If the TOML is malformed or a value is invalid
    pub fn load() -> anyhow::Result<Self> {
        Self::load_or_create(&get_config_path()?)
    }

    /// Same as [`FirstSoundConfig::load`] for an explicit path.
    pub fn load_or_create(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            tracing::info!("Created default configuration at {}", path.display());
            return Ok(config);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: FirstSoundConfig = toml::from_str(&content)
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("Configuration saved");
        Ok(())
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.visualizer.frame_rate == 0 || self.visualizer.frame_rate > 240 {
            return Err(anyhow!(
                "visualizer.frame_rate must be between 1 and 240, got {}",
                self.visualizer.frame_rate
            ));
        }
        if self.recording.chunk_interval_ms == 0 {
            return Err(anyhow!("recording.chunk_interval_ms must be greater than 0"));
        }
        Ok(())
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

/// Path of the config file. Does not create anything.
///
/// # Errors
/// - If the home directory cannot be determined
pub fn get_config_path() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow!("Could not determine home directory"))?;
    Ok(home.join(".config").join("firstsound").join("firstsound.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_created_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("firstsound.toml");

        let config = FirstSoundConfig::load_or_create(&path).unwrap();

        assert_eq!(config, FirstSoundConfig::default());
        assert!(path.exists());
        assert_eq!(FirstSoundConfig::load_or_create(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("firstsound.toml");
        fs::write(&path, "[audio]\ndevice = \"USB Mic\"\n").unwrap();

        let config = FirstSoundConfig::load_or_create(&path).unwrap();

        assert_eq!(config.audio.device, "USB Mic");
        assert_eq!(config.recording.chunk_interval_ms, 250);
        assert_eq!(config.visualizer.frame_rate, 60);
        assert_eq!(config.recording.save_dir, None);
    }

    #[test]
    fn test_invalid_frame_rate_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("firstsound.toml");
        fs::write(&path, "[visualizer]\nframe_rate = 0\n").unwrap();

        let err = FirstSoundConfig::load_or_create(&path).unwrap_err();
        assert!(err.to_string().contains("frame_rate"));
    }

    #[test]
    fn test_malformed_toml_names_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("firstsound.toml");
        fs::write(&path, "[audio\n").unwrap();

        let err = FirstSoundConfig::load_or_create(&path).unwrap_err();
        assert!(err.to_string().contains("firstsound.toml"));
    }

    #[test]
    fn test_configured_save_dir_wins() {
        let recording = RecordingConfig {
            chunk_interval_ms: 100,
            save_dir: Some(PathBuf::from("/tmp/takes")),
        };
        assert_eq!(recording.resolved_save_dir().unwrap(), PathBuf::from("/tmp/takes"));
        assert_eq!(recording.chunk_interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_save_to_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("firstsound.toml");
        let mut config = FirstSoundConfig::default();
        config.recording.save_dir = Some(PathBuf::from("/data/takes"));
        config.visualizer.frame_rate = 30;

        config.save_to(&path).unwrap();
        assert_eq!(FirstSoundConfig::load_or_create(&path).unwrap(), config);
    }
}
