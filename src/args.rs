//! Command-line argument parsing and processing.
//!
//! Arguments are parsed with clap and turned into a [`CliAction`] for the
//! main application logic. Help and version output use the logger's visual
//! style instead of clap's, and unknown options lead to the help text.

use clap::Parser;
use std::path::PathBuf;

use crate::logger::Log;

#[derive(Parser, Debug)]
#[command(
    name = "kelvin",
    disable_help_flag = true,
    disable_version_flag = true
)]
struct Cli {
    /// Enable detailed debug output
    #[arg(short, long)]
    debug: bool,

    /// Use this configuration file instead of the default location
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// List the devices on the bridge and exit
    #[arg(short = 'l', long)]
    devices: bool,

    /// Print today's targets for all schedules, or the named one
    #[arg(short, long, value_name = "SCHEDULE", num_args = 0..=1)]
    simulate: Option<Option<String>>,

    /// Ask the running instance to reload its configuration
    #[arg(short, long)]
    reload: bool,

    #[arg(short, long)]
    help: bool,

    #[arg(short = 'V', long, short_alias = 'v')]
    version: bool,
}

/// Represents the parsed command-line arguments and their intended actions.
#[derive(Debug, PartialEq)]
pub enum CliAction {
    /// Run the daemon
    Run {
        debug_enabled: bool,
        config_path: Option<PathBuf>,
    },
    /// Print the devices known to the bridge
    ListDevices {
        debug_enabled: bool,
        config_path: Option<PathBuf>,
    },
    /// Print the targets of today's schedules
    Simulate {
        debug_enabled: bool,
        config_path: Option<PathBuf>,
        schedule: Option<String>,
    },
    /// Signal the running instance to reload its configuration
    Reload { debug_enabled: bool },
    /// Display help information and exit
    ShowHelp,
    /// Display version information and exit
    ShowVersion,
    /// Show help due to unknown arguments and exit
    ShowHelpDueToError,
}

/// Result of parsing command-line arguments.
pub struct ParsedArgs {
    pub action: CliAction,
}

impl ParsedArgs {
    /// Parse command-line arguments into a structured result.
    ///
    /// # Arguments
    /// * `args` - Iterator over command-line arguments including the program name
    ///
    /// # Returns
    /// ParsedArgs containing the determined action
    pub fn parse<I, S>(args: I) -> ParsedArgs
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|s| s.as_ref().to_string()).collect();

        let cli = match Cli::try_parse_from(&args) {
            Ok(cli) => cli,
            Err(e) => {
                let message = e.to_string();
                let first_line = message.lines().next().unwrap_or_default();
                Log::log_warning(first_line.trim_start_matches("error: "));
                return ParsedArgs {
                    action: CliAction::ShowHelpDueToError,
                };
            }
        };

        let debug_enabled = cli.debug;
        let config_path = cli.config;

        // Version wins over help, help over every command
        let action = if cli.version {
            CliAction::ShowVersion
        } else if cli.help {
            CliAction::ShowHelp
        } else if cli.reload {
            CliAction::Reload { debug_enabled }
        } else if cli.devices {
            CliAction::ListDevices {
                debug_enabled,
                config_path,
            }
        } else if let Some(schedule) = cli.simulate {
            CliAction::Simulate {
                debug_enabled,
                config_path,
                schedule,
            }
        } else {
            CliAction::Run {
                debug_enabled,
                config_path,
            }
        };

        ParsedArgs { action }
    }

    /// Convenience method to parse from std::env::args()
    pub fn from_env() -> ParsedArgs {
        Self::parse(std::env::args())
    }
}

/// Displays version information using custom logging style.
pub fn display_version_info() {
    Log::log_version();
    Log::log_pipe();
    println!("┗ {}", env!("CARGO_PKG_DESCRIPTION"));
}

/// Displays custom help message using logger methods.
pub fn display_help() {
    Log::log_version();
    Log::log_block_start(env!("CARGO_PKG_DESCRIPTION"));
    Log::log_block_start("Usage: kelvin [OPTIONS]");
    Log::log_block_start("Options:");
    Log::log_indented("-c, --config <PATH>         Use this configuration file");
    Log::log_indented("-d, --debug                 Enable detailed debug output");
    Log::log_indented("-h, --help                  Print help information");
    Log::log_indented("-l, --devices               List the devices on the bridge");
    Log::log_indented("-r, --reload                Reload the configuration of the running instance");
    Log::log_indented("-s, --simulate [SCHEDULE]   Print today's targets every 30 minutes");
    Log::log_indented("-V, --version               Print version information");
    Log::log_end();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliAction {
        ParsedArgs::parse(args.iter().copied()).action
    }

    #[test]
    fn test_parse_no_args() {
        assert_eq!(
            parse(&["kelvin"]),
            CliAction::Run {
                debug_enabled: false,
                config_path: None
            }
        );
    }

    #[test]
    fn test_parse_debug_and_config() {
        assert_eq!(
            parse(&["kelvin", "-d", "--config", "/tmp/kelvin.toml"]),
            CliAction::Run {
                debug_enabled: true,
                config_path: Some(PathBuf::from("/tmp/kelvin.toml"))
            }
        );
    }

    #[test]
    fn test_parse_help_flag() {
        assert_eq!(parse(&["kelvin", "--help"]), CliAction::ShowHelp);
        assert_eq!(parse(&["kelvin", "-h"]), CliAction::ShowHelp);
    }

    #[test]
    fn test_parse_version_short_flags() {
        assert_eq!(parse(&["kelvin", "-V"]), CliAction::ShowVersion);
        assert_eq!(parse(&["kelvin", "-v"]), CliAction::ShowVersion);
    }

    #[test]
    fn test_version_takes_precedence() {
        assert_eq!(
            parse(&["kelvin", "--version", "--help", "--debug"]),
            CliAction::ShowVersion
        );
    }

    #[test]
    fn test_parse_unknown_flag() {
        assert_eq!(parse(&["kelvin", "--unknown"]), CliAction::ShowHelpDueToError);
        assert_eq!(
            parse(&["kelvin", "--debug", "--invalid"]),
            CliAction::ShowHelpDueToError
        );
    }

    #[test]
    fn test_parse_devices() {
        assert_eq!(
            parse(&["kelvin", "--devices"]),
            CliAction::ListDevices {
                debug_enabled: false,
                config_path: None
            }
        );
    }

    #[test]
    fn test_parse_simulate_with_and_without_schedule() {
        assert_eq!(
            parse(&["kelvin", "--simulate"]),
            CliAction::Simulate {
                debug_enabled: false,
                config_path: None,
                schedule: None
            }
        );
        assert_eq!(
            parse(&["kelvin", "-s", "bedroom"]),
            CliAction::Simulate {
                debug_enabled: false,
                config_path: None,
                schedule: Some("bedroom".to_string())
            }
        );
    }

    #[test]
    fn test_parse_reload() {
        assert_eq!(
            parse(&["kelvin", "--reload", "--debug"]),
            CliAction::Reload {
                debug_enabled: true
            }
        );
    }
}
