//! Implementation of the --reload command.
//!
//! Signals the running kelvin daemon to re-read its configuration file and
//! restart its light tasks.

use anyhow::{Context, Result};
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;

use crate::logger::Log;
use crate::utils::get_running_kelvin_pid;

/// Handle the --reload command by sending SIGUSR2 to the running instance.
pub fn handle_reload_command(debug_enabled: bool) -> Result<()> {
    Log::log_version();

    let pid = get_running_kelvin_pid()
        .context("Cannot reload: kelvin does not seem to be running")?;

    if debug_enabled {
        Log::log_pipe();
        Log::log_debug(&format!("Found running kelvin instance with PID {}", pid));
    }

    Log::log_block_start("Signaling kelvin to reload its configuration...");
    let pid = i32::try_from(pid).with_context(|| format!("Invalid PID {}", pid))?;
    kill(Pid::from_raw(pid), Signal::SIGUSR2)
        .with_context(|| format!("Failed to signal kelvin (PID: {})", pid))?;

    Log::log_decorated(&format!("Sent reload signal to kelvin (PID: {})", pid));
    Log::log_indented("The running instance will reload its configuration");
    Log::log_end();
    Ok(())
}
