//! Configuration management for firstsound.
//!
//! Loads and saves the TOML settings file that selects the input device,
//! the recording chunk cadence, the save directory and the spectrum frame rate.

pub mod file;

pub use file::{get_config_path, FirstSoundConfig};
