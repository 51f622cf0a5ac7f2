//! Signal handling for the kelvin daemon.
//!
//! A background thread turns process signals into [`SignalMessage`]s on a
//! channel read by the supervisor loop:
//!
//! - SIGINT, SIGTERM, SIGHUP: graceful shutdown
//! - SIGUSR2: reload the configuration (sent by `kelvin --reload`)

use anyhow::{Context, Result};
use signal_hook::{
    consts::signal::{SIGHUP, SIGINT, SIGTERM, SIGUSR2},
    iterator::Signals,
};
use std::{
    sync::Arc,
    sync::atomic::{AtomicBool, Ordering},
    sync::mpsc::{Receiver, Sender, channel},
    thread,
};

use crate::logger::Log;

/// Unified signal message type for all signal-based communication
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalMessage {
    /// Configuration reload signal (SIGUSR2)
    Reload,
    /// Shutdown signal (SIGTERM, SIGINT, SIGHUP)
    Shutdown,
}

/// Signal handling state shared between threads
pub struct SignalState {
    /// Cleared once a shutdown was requested; every task polls it
    pub running: Arc<AtomicBool>,
    pub signal_receiver: Receiver<SignalMessage>,
}

impl SignalState {
    /// State without a signal thread, driven through the returned sender.
    pub fn detached() -> (Self, Sender<SignalMessage>) {
        let (sender, receiver) = channel();
        (
            Self {
                running: Arc::new(AtomicBool::new(true)),
                signal_receiver: receiver,
            },
            sender,
        )
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn request_shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Set up signal handling for the daemon.
///
/// Spawns a background thread that monitors for signals and forwards them
/// as messages. Shutdown signals also clear the running flag directly so
/// sleeping light tasks notice without waiting for the supervisor.
pub fn setup_signal_handler(debug_enabled: bool) -> Result<SignalState> {
    let running = Arc::new(AtomicBool::new(true));
    let (signal_sender, signal_receiver) = channel::<SignalMessage>();

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP, SIGUSR2])
        .context("failed to register signal handlers")?;

    let running_clone = Arc::clone(&running);

    thread::spawn(move || {
        for sig in signals.forever() {
            match sig {
                SIGUSR2 => {
                    Log::log_pipe();
                    Log::log_decorated("Received configuration reload signal");

                    if signal_sender.send(SignalMessage::Reload).is_err() {
                        // Supervisor is gone, the process is exiting
                        break;
                    }
                }
                _ => {
                    let user_message = match sig {
                        SIGINT => {
                            if debug_enabled {
                                "Received SIGINT (Ctrl+C), initiating graceful shutdown..."
                            } else {
                                "Received interrupt signal, initiating graceful shutdown..."
                            }
                        }
                        SIGTERM => "Received termination request, initiating graceful shutdown...",
                        SIGHUP => "Received hangup signal, initiating graceful shutdown...",
                        _ => "Received shutdown signal, initiating graceful shutdown...",
                    };

                    Log::log_pipe();
                    Log::log_decorated(user_message);

                    if let Err(e) = signal_sender.send(SignalMessage::Shutdown) {
                        Log::log_warning(&format!("Failed to send shutdown message: {}", e));
                    }
                    running_clone.store(false, Ordering::SeqCst);
                }
            }
        }
    });

    Ok(SignalState {
        running,
        signal_receiver,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detached_state_delivers_messages() {
        let (state, sender) = SignalState::detached();
        assert!(state.is_running());

        sender.send(SignalMessage::Reload).unwrap();
        assert_eq!(state.signal_receiver.try_recv().unwrap(), SignalMessage::Reload);

        state.request_shutdown();
        assert!(!state.is_running());
    }
}
