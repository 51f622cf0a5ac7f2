use anyhow::{Context, Result};
use fs2::FileExt;
use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::Path,
};

use kelvin::args::{CliAction, ParsedArgs, display_help, display_version_info};
use kelvin::commands::{devices, reload, simulate};
use kelvin::config::Config;
use kelvin::constants::EXIT_FAILURE;
use kelvin::daemon;
use kelvin::logger::Log;
use kelvin::signals::setup_signal_handler;
use kelvin::utils::{get_lock_path, path_for_display};

/// Open the lock file and take the single instance lock.
///
/// The file is not truncated before the lock is held so the PID of a running
/// instance survives a failed attempt.
fn acquire_lock(lock_path: &Path) -> Result<Option<File>> {
    let mut lock_file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(lock_path)
        .with_context(|| format!("Failed to open lock file {}", lock_path.display()))?;

    if lock_file.try_lock_exclusive().is_err() {
        return Ok(None);
    }

    lock_file.set_len(0)?;
    write!(lock_file, "{}", std::process::id())?;
    lock_file.flush()?;
    Ok(Some(lock_file))
}

/// Release the lock and remove the lock file from disk.
fn cleanup(lock_file: File, lock_path: &Path) {
    Log::log_decorated("Performing cleanup...");

    // Drop the lock file handle to release the lock
    drop(lock_file);

    if let Err(e) = std::fs::remove_file(lock_path) {
        Log::log_warning(&format!("Failed to remove lock file: {}", e));
    } else {
        Log::log_debug("Lock file removed");
    }

    Log::log_decorated("Cleanup complete");
}

fn load_and_run(debug_enabled: bool, config_path: Option<&Path>) -> Result<()> {
    let (config, config_path) = Config::load(config_path)?;
    config.log_config(&config_path);
    let signal_state = setup_signal_handler(debug_enabled)?;
    daemon::run(config, &config_path, &signal_state)
}

fn run_daemon(debug_enabled: bool, config_path: Option<&Path>) -> Result<()> {
    Log::log_version();

    let lock_path = get_lock_path();
    let Some(lock_file) = acquire_lock(&lock_path)? else {
        Log::log_error(
            "Another instance of kelvin is already running.\n\
            • Use 'kelvin --reload' to apply configuration changes.",
        );
        std::process::exit(EXIT_FAILURE);
    };
    Log::log_debug(&format!("Lock acquired at {}", path_for_display(&lock_path)));

    let result = load_and_run(debug_enabled, config_path);

    cleanup(lock_file, &lock_path);
    Log::log_end();
    result
}

fn main() -> Result<()> {
    let parsed = ParsedArgs::from_env();

    match parsed.action {
        CliAction::ShowVersion => {
            display_version_info();
            Ok(())
        }
        CliAction::ShowHelp => {
            display_help();
            Ok(())
        }
        CliAction::ShowHelpDueToError => {
            display_help();
            std::process::exit(EXIT_FAILURE);
        }
        CliAction::Reload { debug_enabled } => {
            Log::set_debug_enabled(debug_enabled);
            reload::handle_reload_command(debug_enabled)
        }
        CliAction::ListDevices {
            debug_enabled,
            config_path,
        } => {
            Log::set_debug_enabled(debug_enabled);
            Log::log_version();
            let (config, _) = Config::load(config_path.as_deref())?;
            devices::handle_devices_command(&config)
        }
        CliAction::Simulate {
            debug_enabled,
            config_path,
            schedule,
        } => {
            Log::set_debug_enabled(debug_enabled);
            Log::log_version();
            let (config, _) = Config::load(config_path.as_deref())?;
            simulate::handle_simulate_command(&config, schedule.as_deref())
        }
        CliAction::Run {
            debug_enabled,
            config_path,
        } => {
            Log::set_debug_enabled(debug_enabled);
            run_daemon(debug_enabled, config_path.as_deref())
        }
    }
}
