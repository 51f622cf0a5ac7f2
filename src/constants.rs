//! Application constants and default values for kelvin.
//!
//! This module contains the configuration defaults, validation limits,
//! device value ranges and operational timing constants used throughout
//! the application.

// ═══ Default Schedule ═══
// Used when a configuration file is generated for the first time

pub const DEFAULT_SCHEDULE_NAME: &str = "default";
pub const DEFAULT_COLOR_TEMPERATURE: u32 = 2750; // Kelvin - daylight target between sunrise and sunset
pub const DEFAULT_BRIGHTNESS: u8 = 100; // percent
pub const DEFAULT_WAKEUP_TIME: &str = "4:00";
pub const DEFAULT_WAKEUP_TEMP: u32 = 2000;
pub const DEFAULT_WAKEUP_BRIGHTNESS: u8 = 60;
pub const DEFAULT_EVENING_TIME: &str = "20:00";
pub const DEFAULT_EVENING_TEMP: u32 = 2300;
pub const DEFAULT_EVENING_BRIGHTNESS: u8 = 80;
pub const DEFAULT_BED_TIME: &str = "22:00";
pub const DEFAULT_BED_TEMP: u32 = 2000;
pub const DEFAULT_BED_BRIGHTNESS: u8 = 60;
pub const DEFAULT_ENABLE_WHEN_LIGHTS_APPEAR: bool = true;
pub const DEFAULT_SCENES_ENABLED: bool = true;

// ═══ Configuration Versioning ═══

pub const CURRENT_CONFIG_VERSION: u32 = 1;

// ═══ Device Value Ranges ═══
// Color temperature is clamped to what the bulbs can render, brightness is
// mapped onto the bridge's 0-254 scale

pub const MAXIMUM_DEVICE_TEMP: u32 = 6500; // Kelvin - coolest white any supported bulb renders
pub const MINIMUM_DEVICE_TEMP: u32 = 2000; // Kelvin - warmest white of color capable bulbs
pub const MINIMUM_AMBIANCE_TEMP: u32 = 2200; // Kelvin - warmest white of "Color Temperature Light" bulbs
pub const MAXIMUM_DEVICE_BRIGHTNESS: u8 = 254; // Hue brightness scale upper bound
pub const CHROMATICITY_PRECISION: i32 = 4; // Decimal places reported by the bridge for xy values

// Planckian locus approximation is only defined on this range
pub const LOCUS_MINIMUM_TEMP: u32 = 1667;
pub const LOCUS_MAXIMUM_TEMP: u32 = 25000;

// ═══ Validation Limits ═══

pub const MINIMUM_TEMP: u32 = 1000; // Kelvin - lowest value accepted in configuration
pub const MAXIMUM_TEMP: u32 = MAXIMUM_DEVICE_TEMP;
pub const MINIMUM_BRIGHTNESS: u8 = 0; // percent - zero turns the light off
pub const MAXIMUM_BRIGHTNESS: u8 = 100;

// ═══ Comparison Tolerances ═══
// Observed device state is quantized by the bridge, these absorb the rounding

pub const TEMPERATURE_TOLERANCE: u32 = 5; // Kelvin, exclusive
pub const BRIGHTNESS_TOLERANCE: u8 = 3; // percent, exclusive
pub const CHROMATICITY_TOLERANCE: f64 = 0.001; // Euclidean distance in xy space, inclusive

// ═══ Operational Timing Constants ═══

pub const DEFAULT_TRANSITION_SECS: u64 = 1; // Transition time sent with every write
pub const DEFAULT_RECONCILE_INTERVAL_SECS: u64 = 1; // Fast cadence: read, compare, write
pub const DEFAULT_TARGET_INTERVAL_SECS: u64 = 60; // Slow cadence: recompute interval and target
pub const DEFAULT_INITIALIZATION_SECS: u64 = 3; // Target must hold this long before automatic mode
pub const DEFAULT_BRIDGE_DELAY_MS: u64 = 100; // Minimum delay between two calls to the bridge
pub const MINIMUM_BRIDGE_DELAY_MS: u64 = 50;
pub const MAXIMUM_RECONCILE_INTERVAL_SECS: u64 = 60;
pub const MAXIMUM_TARGET_INTERVAL_SECS: u64 = 600;
pub const MAXIMUM_TRANSITION_SECS: u64 = 60;
pub const CHECK_INTERVAL_MS: u64 = 250; // How often sleeping tasks look at the running flag
pub const SIMULATION_STEP_MINUTES: u32 = 30; // Resolution of `kelvin --simulate`

// ═══ Bridge Communication Constants ═══

pub const BRIDGE_TIMEOUT_MS: u64 = 3000; // Socket timeout for a single HTTP exchange
pub const BRIDGE_HTTP_PORT: u16 = 80;
pub const MAX_RETRIES: u32 = 3; // Attempts for transient transport failures
pub const RETRY_DELAY_MS: u64 = 500;
pub const SCENE_NAME_MARKER: &str = "kelvin"; // Scenes containing this word are managed

// ═══ Files ═══

pub const CONFIG_DIR_NAME: &str = "kelvin";
pub const CONFIG_FILE_NAME: &str = "kelvin.toml";
pub const GEO_FILE_NAME: &str = "geo.toml";
pub const LOCK_FILE_NAME: &str = "kelvin.lock";

// ═══ Exit Codes ═══

pub const EXIT_FAILURE: i32 = 1; // General failure

// ═══ Test Constants ═══
// Common values used in tests for consistency
#[cfg(test)]
pub mod test_constants {
    pub const TEST_LATITUDE: f64 = 52.52; // Berlin
    pub const TEST_LONGITUDE: f64 = 13.405;
    pub const TEST_SUNRISE: &str = "07:00";
    pub const TEST_SUNSET: &str = "19:00";
}
