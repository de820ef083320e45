//! The interactive recording studio.
//!
//! Opens the microphone, shows the live spectrum and lets the user record,
//! play back and save takes. Supports an external record/stop trigger via
//! the SIGUSR1 signal.

use crate::capture::{CpalBackend, DeviceGateway, DeviceSelector, StreamConstraints};
use crate::config::FirstSoundConfig;
use crate::recording::CpalPlayback;
use crate::studio::{Studio, StudioSettings, StudioTerminal};
use crate::ui::ErrorScreen;

/// Runs the studio until the user quits.
///
/// # Errors
/// - If the configuration cannot be loaded
/// - If the terminal cannot be initialized or drawn to
pub async fn handle_studio() -> Result<(), anyhow::Error> {
    tracing::info!("=== firstsound studio started ===");

    let config = match FirstSoundConfig::load() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("Failed to load configuration: {err:#}");
            let message = format!(
                "Configuration Error:\n\n{err:#}\n\nPlease check your ~/.config/firstsound/firstsound.toml file and try again."
            );
            let mut error_screen = ErrorScreen::new()?;
            error_screen.show_error(&message)?;
            error_screen.cleanup()?;
            return Err(anyhow::anyhow!("Configuration error: {err}"));
        }
    };

    tracing::info!(
        "Configuration loaded: device={}, chunk_interval={}ms, frame_rate={}fps",
        config.audio.device,
        config.recording.chunk_interval_ms,
        config.visualizer.frame_rate
    );

    let settings = StudioSettings {
        chunk_interval: config.recording.chunk_interval(),
        frame_rate: config.visualizer.frame_rate,
        save_dir: config.recording.resolved_save_dir()?,
    };

    let gateway = DeviceGateway::new(
        Box::new(CpalBackend::new()),
        StreamConstraints {
            device: DeviceSelector::from_config(&config.audio.device),
        },
    );
    let mut studio = Studio::new(gateway, Box::new(CpalPlayback::new()), settings);

    let mut terminal = StudioTerminal::enter()?;
    let result = studio.run(&mut terminal).await;
    terminal.cleanup()?;

    if let Err(e) = &result {
        tracing::error!("Studio failed: {}", e);
    } else {
        tracing::info!("=== firstsound studio exited successfully ===");
    }
    result
}
