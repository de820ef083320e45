//! Structured logging for firstsound using the tracing crate.
//!
//! Configures a rolling file logger that writes to daily-rotated log files.
//! Follows the XDG Base Directory Specification for log file placement.
//! Does not output to terminal to avoid interfering with the TUI.
//! Old log files are removed at startup, keeping the 7 most recent days.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing_appender::rolling;
use tracing_subscriber::prelude::*;

/// Prefix of every log file; rotation appends `.YYYY-MM-DD`.
pub const LOG_FILE_PREFIX: &str = "firstsound.log";

const MAX_LOG_FILES: usize = 7;

/// Global non-blocking guard holder to keep the appender alive for the program lifetime.
static APPENDER_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// Initializes the logging system with file-based output.
///
/// Log level is controlled by the RUST_LOG environment variable (defaults to "info").
///
/// # Errors
/// - If the log directory cannot be determined or created
/// - If logging was already initialized
pub fn init_logging() -> Result<(), anyhow::Error> {
    let log_dir = get_log_dir()?;
    fs::create_dir_all(&log_dir)?;

    if let Err(e) = cleanup_old_logs(&log_dir) {
        eprintln!("Warning: Failed to cleanup old logs: {e}");
    }

    let file_appender = rolling::daily(&log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    APPENDER_GUARD
        .set(guard)
        .map_err(|_| anyhow::anyhow!("Logging already initialized"))?;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_ansi(false),
        )
        .init();

    tracing::debug!("Logging initialized. Log dir: {}", log_dir.display());
    Ok(())
}

/// Determines the log directory: `$XDG_STATE_HOME/firstsound`, otherwise
/// `~/.local/state/firstsound`. Does not create it.
///
/// # Errors
/// - If neither XDG_STATE_HOME nor the home directory is available
pub fn get_log_dir() -> Result<PathBuf, anyhow::Error> {
    resolve_log_dir(
        std::env::var_os("XDG_STATE_HOME").map(PathBuf::from),
        dirs::home_dir(),
    )
}

fn resolve_log_dir(
    xdg_state: Option<PathBuf>,
    home: Option<PathBuf>,
) -> Result<PathBuf, anyhow::Error> {
    match (xdg_state, home) {
        (Some(state), _) if !state.as_os_str().is_empty() => Ok(state.join("firstsound")),
        (_, Some(home)) => Ok(home.join(".local").join("state").join("firstsound")),
        _ => Err(anyhow::anyhow!("Could not determine home directory")),
    }
}

/// Lists rotated log files, newest first.
pub fn log_files(log_dir: &Path) -> Result<Vec<PathBuf>, anyhow::Error> {
    let rotated_prefix = format!("{LOG_FILE_PREFIX}.");
    let mut files: Vec<_> = fs::read_dir(log_dir)?
        .filter_map(|entry| {
            let path = entry.ok()?.path();
            let file_name = path.file_name()?.to_string_lossy().to_string();

            // firstsound.log.YYYY-MM-DD
            if file_name.starts_with(&rotated_prefix) && file_name.matches('-').count() == 2 {
                let modified = fs::metadata(&path).ok()?.modified().ok()?;
                Some((path, modified))
            } else {
                None
            }
        })
        .collect();

    // Dated names sort chronologically; modification time breaks ties.
    files.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));
    Ok(files.into_iter().map(|(path, _)| path).collect())
}

/// Removes log files beyond the 7 most recent days.
///
/// # Errors
/// - If the log directory cannot be read
fn cleanup_old_logs(log_dir: &Path) -> Result<(), anyhow::Error> {
    for path in log_files(log_dir)?.iter().skip(MAX_LOG_FILES) {
        if let Err(e) = fs::remove_file(path) {
            tracing::warn!("Failed to delete old log file {}: {}", path.display(), e);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_log_dir_prefers_xdg_state() {
        let dir = resolve_log_dir(Some("/state".into()), Some("/home/u".into())).unwrap();
        assert_eq!(dir, PathBuf::from("/state/firstsound"));

        let dir = resolve_log_dir(None, Some("/home/u".into())).unwrap();
        assert_eq!(dir, PathBuf::from("/home/u/.local/state/firstsound"));

        assert!(resolve_log_dir(None, None).is_err());
    }

    #[test]
    fn test_cleanup_keeps_newest_week() {
        let dir = TempDir::new().unwrap();
        for day in 1..=10 {
            fs::write(dir.path().join(format!("firstsound.log.2026-01-{day:02}")), "x").unwrap();
        }
        fs::write(dir.path().join("unrelated.txt"), "x").unwrap();

        cleanup_old_logs(dir.path()).unwrap();

        let remaining = log_files(dir.path()).unwrap();
        assert_eq!(remaining.len(), 7);
        assert!(remaining[0].ends_with("firstsound.log.2026-01-10"));
        assert!(!dir.path().join("firstsound.log.2026-01-03").exists());
        assert!(dir.path().join("unrelated.txt").exists());
    }
}
