//! # Kelvin
//!
//! Daylight color temperature and brightness automation for Philips Hue lights.
//!
//! Kelvin builds a schedule per light for every day from sunrise, sunset and
//! user-defined anchor times, interpolates the target between the anchors, and
//! keeps each light on that target until someone changes it by hand.
//!
//! ## Architecture
//!
//! - **color**: Kelvin, mired, brightness and chromaticity conversions
//! - **light_state**: The color/brightness value type and its tolerant equality
//! - **schedule** / **interval**: Daily anchor points and interpolation between them
//! - **light**: Per-light reconciliation state machine
//! - **gateway**: Device and bridge abstractions plus the Hue REST implementation
//! - **geo**: Location handling and sunrise/sunset calculation
//! - **config**: Configuration loading, validation, migration and default generation
//! - **daemon**: Light tasks, cadences and the reload-aware supervisor
//! - **scenes**: Bridge scenes that follow a schedule's current target
//! - **signals**, **args**, **commands**: Process and command line plumbing
//! - **logger**: Structured logging with visual formatting

pub mod args;
pub mod color;
pub mod commands;
pub mod config;
pub mod constants;
pub mod daemon;
pub mod gateway;
pub mod geo;
pub mod interval;
pub mod light;
pub mod light_state;
pub mod logger;
pub mod scenes;
pub mod schedule;
pub mod signals;
pub mod utils;

// Re-export important types for easier access
pub use config::Config;
pub use gateway::{BridgeGateway, DeviceGateway};
pub use interval::Interval;
pub use light::{Light, LightPhase};
pub use light_state::LightState;
pub use logger::{Log, LogLevel};
pub use schedule::{IntervalError, Schedule, ScheduleError, TimePoint};
