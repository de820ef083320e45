//! Application orchestration and command routing.
//!
//! Handles command-line argument parsing and delegates to appropriate command handlers.

use crate::commands;
use crate::logging;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::process;

/// A terminal audio studio with a live spectrum, take recording and playback
#[derive(Parser)]
#[command(name = "firstsound")]
#[command(version)]
#[command(about = "A terminal audio studio with a live spectrum, take recording and playback")]
#[command(long_about = "A terminal audio studio with a live spectrum, take recording and playback.\n\nDEFAULT COMMAND:\n    If no command is specified, 'studio' is used by default.\n\nKEYS:\n    r  record        s  stop        p  play\n    w  save take     d  next input  q  quit\n\nEXAMPLES:\n    # Open the studio\n    $ firstsound\n\n    # Start or stop recording from another program\n    $ pkill -USR1 firstsound\n\n    # Pick an input device\n    $ firstsound list-devices\n    $ firstsound config")]
#[command(
    after_help = "CONFIGURATION:\n    Config file:        ~/.config/firstsound/firstsound.toml\n    Logs:               ~/.local/state/firstsound/firstsound.log.*"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the recording studio (default)
    ///
    /// Shows a live spectrum of the microphone. Record takes, play them back
    /// and save them as WAV files.
    #[command(visible_alias = "s")]
    Studio,

    /// Open configuration file in your preferred editor
    ///
    /// Uses $EDITOR environment variable or falls back to nano/vi.
    #[command(visible_alias = "c")]
    Config,

    /// List available audio input devices
    ///
    /// Shows device IDs and names to help configure the input device in
    /// firstsound.toml.
    #[command(name = "list-devices")]
    ListDevices,

    /// Show recent log entries from the application
    ///
    /// Display the last 50 lines of the most recent log file.
    Logs,

    /// Generate shell completion script
    ///
    /// Examples:
    ///   firstsound completions bash > firstsound.bash
    ///   firstsound completions zsh > _firstsound
    ///   firstsound completions fish > firstsound.fish
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Runs the main application based on command-line arguments.
///
/// # Exit Codes
/// - 0: Success
/// - 1: General error
/// - 2: Usage error (invalid arguments)
///
/// # Errors
/// - If logging initialization fails
/// - If command execution fails
pub async fn run() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Handle commands that don't need logging
    match &cli.command {
        Some(Commands::Completions { shell }) => {
            generate(*shell, &mut Cli::command(), "firstsound", &mut io::stdout());
            return Ok(());
        }
        Some(Commands::ListDevices) => {
            return exit_on_error(commands::handle_list_devices());
        }
        Some(Commands::Logs) => {
            return exit_on_error(commands::handle_logs());
        }
        _ => {}
    }

    logging::init_logging()?;

    match cli.command {
        None | Some(Commands::Studio) => commands::handle_studio().await?,
        Some(Commands::Config) => commands::handle_config()?,
        Some(Commands::Completions { .. }) | Some(Commands::ListDevices) | Some(Commands::Logs) => {
            unreachable!("These commands are handled earlier")
        }
    }

    Ok(())
}

fn exit_on_error(result: anyhow::Result<()>) -> anyhow::Result<()> {
    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
    Ok(())
}
