//! Application command handlers for firstsound.
//!
//! # Commands
//! - `studio`: Live spectrum with record, play back and save (default)
//! - `list_devices`: List available audio input devices
//! - `logs`: Display recent log entries
//! - `config`: Open configuration file in user's preferred editor

pub mod config;
pub mod list_devices;
pub mod logs;
pub mod studio;

pub use config::handle_config;
pub use list_devices::handle_list_devices;
pub use logs::handle_logs;
pub use studio::handle_studio;
