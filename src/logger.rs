//! Structured logging system with visual formatting.
//!
//! This module provides the logging system used by the daemon and its one-shot
//! commands. It includes different log levels and formatting functions for
//! structured output with Unicode box drawing characters.
//!
//! Every call emits one complete line while holding the stdout lock, so the
//! per-light tasks never interleave partial lines. Debug output is only
//! printed after `Log::set_debug_enabled(true)`, and all output can be
//! switched off for quiet operation during tests.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

static LOGGING_ENABLED: AtomicBool = AtomicBool::new(true);
static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

/// Log level enumeration for categorizing message importance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogLevel {
    Log,  // Debug/operational logs, only shown with --debug
    Warn, // Warning messages (non-fatal issues)
    Err,  // Error messages (recoverable failures)
    Crit, // Critical errors (a light or the daemon stops)
    Info, // Informational messages (status updates)
}

impl LogLevel {
    fn prefix(self) -> &'static str {
        match self {
            LogLevel::Log => "[LOG]",
            LogLevel::Warn => "[WARN]",
            LogLevel::Err => "[ERR]",
            LogLevel::Crit => "[CRIT]",
            LogLevel::Info => "[INFO]",
        }
    }
}

/// Main logging interface providing structured output formatting.
pub struct Log;

impl Log {
    /// Enable or disable logging.
    ///
    /// Tests switch logging off so the state machine's chatter does not
    /// drown the test harness output.
    pub fn set_enabled(enabled: bool) {
        LOGGING_ENABLED.store(enabled, Ordering::SeqCst);
    }

    /// Check if logging is currently enabled.
    pub fn is_enabled() -> bool {
        LOGGING_ENABLED.load(Ordering::SeqCst)
    }

    /// Enable or disable `[LOG]` level output.
    pub fn set_debug_enabled(enabled: bool) {
        DEBUG_ENABLED.store(enabled, Ordering::SeqCst);
    }

    pub fn is_debug_enabled() -> bool {
        DEBUG_ENABLED.load(Ordering::SeqCst)
    }

    fn emit(line: &str) {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        // A closed stdout must never take a light task down with it
        let _ = writeln!(handle, "{}", line);
    }

    /// Main log function with level-based prefixes.
    ///
    /// # Arguments
    /// * `level` - LogLevel indicating message importance
    /// * `message` - Text content to log
    pub fn log(level: LogLevel, message: &str) {
        if !Self::is_enabled() {
            return;
        }
        if level == LogLevel::Log && !Self::is_debug_enabled() {
            return;
        }

        Self::emit(&format!("{} {}", level.prefix(), message));
    }

    // ═══ Convenience Methods for Common Log Levels ═══

    /// Log an error message.
    pub fn log_error(message: &str) {
        Self::log(LogLevel::Err, message);
    }

    /// Log a warning message.
    pub fn log_warning(message: &str) {
        Self::log(LogLevel::Warn, message);
    }

    /// Log an informational message.
    pub fn log_info(message: &str) {
        Self::log(LogLevel::Info, message);
    }

    /// Log a debug message. Suppressed unless debug output is enabled.
    pub fn log_debug(message: &str) {
        Self::log(LogLevel::Log, message);
    }

    /// Log a critical error message.
    pub fn log_critical(message: &str) {
        Self::log(LogLevel::Crit, message);
    }

    // ═══ Light Scoped Messages ═══

    /// Log an informational message about a single light.
    pub fn log_light(name: &str, message: &str) {
        Self::log_decorated(&format!("Light {} - {}", name, message));
    }

    /// Log a debug message about a single light.
    pub fn log_light_debug(name: &str, message: &str) {
        Self::log_debug(&format!("Light {} - {}", name, message));
    }

    /// Log a warning about a single light.
    pub fn log_light_warning(name: &str, message: &str) {
        Self::log_warning(&format!("Light {} - {}", name, message));
    }

    // ═══ Visual Formatting Functions ═══

    /// Log a decorated message with visual branching indicator.
    ///
    /// Used for main status messages and important information.
    pub fn log_decorated(message: &str) {
        if !Self::is_enabled() {
            return;
        }
        Self::emit(&format!("┣ {}", message));
    }

    /// Log an indented message for sub-items or details.
    pub fn log_indented(message: &str) {
        if !Self::is_enabled() {
            return;
        }
        Self::emit(&format!("┃   {}", message));
    }

    /// Log a visual pipe separator.
    pub fn log_pipe() {
        if !Self::is_enabled() {
            return;
        }
        Self::emit("┃");
    }

    /// Log a block start message with visual separation.
    ///
    /// Used for major state changes or new operational phases.
    pub fn log_block_start(message: &str) {
        if !Self::is_enabled() {
            return;
        }
        Self::emit(&format!("┃\n┣ {}", message));
    }

    /// Log the application version header.
    pub fn log_version() {
        if !Self::is_enabled() {
            return;
        }
        Self::emit(&format!("┏ kelvin v{} ━━╸\n┃", env!("CARGO_PKG_VERSION")));
    }

    /// Log the final termination marker.
    pub fn log_end() {
        if !Self::is_enabled() {
            return;
        }
        Self::emit("╹");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_enable_flags_round_trip() {
        Log::set_enabled(false);
        assert!(!Log::is_enabled());
        Log::set_enabled(true);
        assert!(Log::is_enabled());

        Log::set_debug_enabled(true);
        assert!(Log::is_debug_enabled());
        Log::set_debug_enabled(false);
        assert!(!Log::is_debug_enabled());
    }

    #[test]
    fn test_level_prefixes() {
        assert_eq!(LogLevel::Warn.prefix(), "[WARN]");
        assert_eq!(LogLevel::Crit.prefix(), "[CRIT]");
        assert_eq!(LogLevel::Log.prefix(), "[LOG]");
    }
}
