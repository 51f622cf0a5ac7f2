//! Configuration system for kelvin with validation, migration and geo overrides.
//!
//! This module handles the TOML configuration file: locating it, generating a
//! commented default on first run, upgrading files written by older versions,
//! validating values and answering which schedule drives a given light.
//!
//! ## Configuration Sources
//!
//! 1. `--config <path>` on the command line
//! 2. **XDG_CONFIG_HOME**/kelvin/kelvin.toml (created with defaults if missing)
//!
//! An optional `geo.toml` next to the configuration file overrides the
//! coordinates, so the main file can be shared without revealing a location.
//!
//! ## Configuration Structure
//!
//! ```toml
//! version = 1
//!
//! [bridge]
//! ip = "192.168.1.20"
//! username = "..."
//!
//! [location]
//! latitude = 52.52
//! longitude = 13.405
//!
//! [behaviour]
//! scenes = true
//! transition_seconds = 1
//!
//! [[schedules]]
//! name = "default"
//! associated_device_ids = [1, 2, 3]
//! enable_when_lights_appear = true
//! default_color_temperature = 2750
//! default_brightness = 100
//!
//! [[schedules.before_sunrise]]
//! time = "4:00"
//! color_temperature = 2000
//! brightness = 60
//! ```
//!
//! Omitting `color_temperature` or `brightness` on a schedule or an anchor
//! leaves that channel alone.
//!
//! ## Versions
//!
//! Files without a `version` (or `version = 0`) stored 12-hour times such as
//! `"3:04PM"` and had no `enable_when_lights_appear`. They are upgraded in
//! memory on load.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::*;
use crate::geo::Location;
use crate::logger::Log;
use crate::schedule::ScheduleError;
use crate::utils::{parse_time_of_day, parse_twelve_hour_time, path_for_display};

/// Geographic configuration stored separately in `geo.toml`.
#[derive(Debug, Deserialize, Clone)]
struct GeoConfig {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

/// Address and credentials of the Hue bridge.
///
/// Credentials are created by pressing the link button on the bridge; kelvin
/// only consumes them.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct BridgeConfig {
    pub ip: Option<String>,
    pub username: Option<String>,
}

impl BridgeConfig {
    pub fn is_configured(&self) -> bool {
        self.ip.as_deref().is_some_and(|ip| !ip.trim().is_empty())
            && self
                .username
                .as_deref()
                .is_some_and(|username| !username.trim().is_empty())
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct LocationConfig {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Operational tuning of the daemon.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct BehaviourConfig {
    /// Keep bridge scenes named "kelvin <schedule>" in sync with the targets
    pub scenes: bool,
    /// Fade duration sent with every write
    pub transition_seconds: u64,
    /// How often each light is read and corrected
    pub reconcile_interval_seconds: u64,
    /// How often the target is recomputed from the schedule
    pub target_interval_seconds: u64,
    /// How long a light must hold the written state before it counts as settled
    pub initialization_seconds: u64,
    /// Minimum spacing of bridge calls
    pub bridge_delay_ms: u64,
}

impl Default for BehaviourConfig {
    fn default() -> Self {
        Self {
            scenes: DEFAULT_SCENES_ENABLED,
            transition_seconds: DEFAULT_TRANSITION_SECS,
            reconcile_interval_seconds: DEFAULT_RECONCILE_INTERVAL_SECS,
            target_interval_seconds: DEFAULT_TARGET_INTERVAL_SECS,
            initialization_seconds: DEFAULT_INITIALIZATION_SECS,
            bridge_delay_ms: DEFAULT_BRIDGE_DELAY_MS,
        }
    }
}

impl BehaviourConfig {
    pub fn transition(&self) -> Duration {
        Duration::from_secs(self.transition_seconds)
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_seconds)
    }

    pub fn target_interval(&self) -> Duration {
        Duration::from_secs(self.target_interval_seconds)
    }

    pub fn initialization(&self) -> Duration {
        Duration::from_secs(self.initialization_seconds)
    }

    pub fn bridge_delay(&self) -> Duration {
        Duration::from_millis(self.bridge_delay_ms)
    }
}

/// A target that applies from a wall clock time on.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TimedColorTemperature {
    /// 24-hour wall clock time, `H:MM` or `HH:MM[:SS]`
    pub time: String,
    pub color_temperature: Option<u32>,
    pub brightness: Option<u8>,
}

/// A named schedule and the lights it drives.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ScheduleConfig {
    pub name: String,
    #[serde(default)]
    pub associated_device_ids: Vec<u32>,
    #[serde(default)]
    pub enable_when_lights_appear: bool,
    /// Daylight target between sunrise and sunset
    pub default_color_temperature: Option<u32>,
    pub default_brightness: Option<u8>,
    #[serde(default)]
    pub before_sunrise: Vec<TimedColorTemperature>,
    #[serde(default)]
    pub after_sunset: Vec<TimedColorTemperature>,
}

impl ScheduleConfig {
    /// The schedule written to a freshly generated configuration.
    pub fn default_schedule(associated_device_ids: Vec<u32>) -> Self {
        Self {
            name: DEFAULT_SCHEDULE_NAME.to_string(),
            associated_device_ids,
            enable_when_lights_appear: DEFAULT_ENABLE_WHEN_LIGHTS_APPEAR,
            default_color_temperature: Some(DEFAULT_COLOR_TEMPERATURE),
            default_brightness: Some(DEFAULT_BRIGHTNESS),
            before_sunrise: vec![TimedColorTemperature {
                time: DEFAULT_WAKEUP_TIME.to_string(),
                color_temperature: Some(DEFAULT_WAKEUP_TEMP),
                brightness: Some(DEFAULT_WAKEUP_BRIGHTNESS),
            }],
            after_sunset: vec![
                TimedColorTemperature {
                    time: DEFAULT_EVENING_TIME.to_string(),
                    color_temperature: Some(DEFAULT_EVENING_TEMP),
                    brightness: Some(DEFAULT_EVENING_BRIGHTNESS),
                },
                TimedColorTemperature {
                    time: DEFAULT_BED_TIME.to_string(),
                    color_temperature: Some(DEFAULT_BED_TEMP),
                    brightness: Some(DEFAULT_BED_BRIGHTNESS),
                },
            ],
        }
    }

    fn anchors(&self) -> impl Iterator<Item = &TimedColorTemperature> {
        self.before_sunrise.iter().chain(self.after_sunset.iter())
    }

    fn anchors_mut(&mut self) -> impl Iterator<Item = &mut TimedColorTemperature> {
        self.before_sunrise.iter_mut().chain(self.after_sunset.iter_mut())
    }
}

/// Configuration structure for kelvin, loaded from `kelvin.toml`.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub location: LocationConfig,
    #[serde(default)]
    pub behaviour: BehaviourConfig,
    #[serde(default)]
    pub schedules: Vec<ScheduleConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CURRENT_CONFIG_VERSION,
            bridge: BridgeConfig::default(),
            location: LocationConfig::default(),
            behaviour: BehaviourConfig::default(),
            schedules: vec![ScheduleConfig::default_schedule(Vec::new())],
        }
    }
}

impl Config {
    /// Default location of `kelvin.toml`.
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;
        Ok(config_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Path of the `geo.toml` belonging to a configuration file.
    pub fn get_geo_path(config_path: &Path) -> Result<PathBuf> {
        match config_path.parent() {
            Some(parent) => Ok(parent.join(GEO_FILE_NAME)),
            None => anyhow::bail!("Could not determine geo.toml path from config path"),
        }
    }

    /// Load the configuration.
    ///
    /// With an explicit path the file must exist. Without one the default
    /// location is used and a default configuration is created there if needed.
    pub fn load(explicit_path: Option<&Path>) -> Result<(Self, PathBuf)> {
        let config_path = match explicit_path {
            Some(path) => path.to_path_buf(),
            None => {
                let path = Self::get_config_path()?;
                if !path.exists() {
                    Log::log_block_start(&format!(
                        "Creating default configuration at {}",
                        path_for_display(&path)
                    ));
                    Self::create_default_config(&path, None)
                        .context("Failed to create default config during load")?;
                }
                path
            }
        };

        let config = Self::load_from_path(&config_path).with_context(|| {
            format!(
                "Failed to load configuration from {}",
                config_path.display()
            )
        })?;

        Ok((config, config_path))
    }

    /// Load, upgrade and validate the configuration at `path`.
    ///
    /// Does not create a file if `path` does not exist.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!(
                "Configuration file not found at specified path: {}",
                path.display()
            );
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        if config.migrate()? {
            Log::log_indented(&format!(
                "Upgraded configuration to version {} (in memory, file left untouched)",
                CURRENT_CONFIG_VERSION
            ));
        }

        Self::load_geo_override_from_path(&mut config, path);

        validate_config(&config)?;

        Ok(config)
    }

    /// Apply `geo.toml` next to `config_path` if present.
    ///
    /// A missing file is normal; an unreadable or malformed one is reported
    /// and ignored.
    fn load_geo_override_from_path(config: &mut Config, config_path: &Path) {
        let geo_path = match Self::get_geo_path(config_path) {
            Ok(path) => path,
            Err(_) => return,
        };

        if !geo_path.exists() {
            return;
        }

        match fs::read_to_string(&geo_path) {
            Ok(content) => match toml::from_str::<GeoConfig>(&content) {
                Ok(geo_config) => {
                    if let Some(lat) = geo_config.latitude {
                        config.location.latitude = Some(lat);
                    }
                    if let Some(lon) = geo_config.longitude {
                        config.location.longitude = Some(lon);
                    }
                    Log::log_indented(&format!(
                        "Loaded geographic overrides from {}",
                        path_for_display(&geo_path)
                    ));
                }
                Err(e) => {
                    Log::log_warning(&format!(
                        "Failed to parse geo.toml: {}. Using coordinates from main config.",
                        e
                    ));
                }
            },
            Err(e) => {
                Log::log_warning(&format!(
                    "Failed to read geo.toml: {}. Using coordinates from main config.",
                    e
                ));
            }
        }
    }

    /// Upgrade a configuration written by an older version.
    ///
    /// # Returns
    /// * `Ok(true)` - The configuration was upgraded
    /// * `Ok(false)` - Already current
    /// * `Err(_)` - Written by a newer version than this one
    pub fn migrate(&mut self) -> Result<bool> {
        if self.version > CURRENT_CONFIG_VERSION {
            anyhow::bail!(
                "Configuration version {} is newer than the supported version {}",
                self.version,
                CURRENT_CONFIG_VERSION
            );
        }
        if self.version == CURRENT_CONFIG_VERSION {
            return Ok(false);
        }

        Log::log_block_start(&format!(
            "Migrating configuration from version {} to {}",
            self.version, CURRENT_CONFIG_VERSION
        ));

        for schedule in &mut self.schedules {
            let name = schedule.name.clone();
            for anchor in schedule.anchors_mut() {
                if parse_time_of_day(&anchor.time).is_some() {
                    continue;
                }
                if let Some(time) = parse_twelve_hour_time(&anchor.time) {
                    let converted = time.format("%H:%M").to_string();
                    Log::log_indented(&format!(
                        "Schedule {} - Converted time '{}' to '{}'",
                        name, anchor.time, converted
                    ));
                    anchor.time = converted;
                }
            }
            schedule.enable_when_lights_appear = true;
        }

        self.version = CURRENT_CONFIG_VERSION;
        Ok(true)
    }

    /// Look up the schedule a light is associated with.
    pub fn schedule_for_light(&self, light_id: u32) -> Result<&ScheduleConfig, ScheduleError> {
        self.schedules
            .iter()
            .find(|schedule| schedule.associated_device_ids.contains(&light_id))
            .ok_or(ScheduleError::NotAssociated { light_id })
    }

    pub fn schedule_by_name(&self, name: &str) -> Option<&ScheduleConfig> {
        self.schedules.iter().find(|schedule| schedule.name == name)
    }

    /// The configured coordinates, if both are set.
    pub fn location(&self) -> Option<Location> {
        match (self.location.latitude, self.location.longitude) {
            (Some(lat), Some(lon)) => Location::new(lat, lon).ok(),
            _ => None,
        }
    }

    /// The configured coordinates, or an error explaining how to set them.
    pub fn require_location(&self) -> Result<Location> {
        self.location().with_context(|| {
            "No location configured. Set latitude and longitude in the [location] \
             section of kelvin.toml or in geo.toml"
                .to_string()
        })
    }

    /// Create a commented default configuration file at `path`.
    ///
    /// # Arguments
    /// * `path` - Where the config file should be created
    /// * `location` - Coordinates to store. If `None`, placeholders are written
    ///   commented out. If a `geo.toml` already exists next to `path` the
    ///   coordinates are left to it.
    pub fn create_default_config(path: &Path, location: Option<Location>) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let geo_exists = Self::get_geo_path(path)
            .map(|geo_path| geo_path.exists())
            .unwrap_or(false);

        let behaviour = BehaviourConfig::default();
        let mut builder = ConfigBuilder::new()
            .add_setting(
                "version",
                &CURRENT_CONFIG_VERSION.to_string(),
                "Configuration format version",
            )
            .add_table("bridge", "Hue bridge address and credentials")
            .add_comment("ip = \"192.168.1.2\"")
            .add_comment("username = \"<created by pressing the link button>\"")
            .add_table("location", "Coordinates used for sunrise and sunset");

        builder = match (location, geo_exists) {
            (_, true) => builder.add_comment("Coordinates are read from geo.toml"),
            (Some(location), false) => builder
                .add_setting(
                    "latitude",
                    &format!("{:.6}", location.latitude),
                    "Geographic latitude (-90 to 90)",
                )
                .add_setting(
                    "longitude",
                    &format!("{:.6}", location.longitude),
                    "Geographic longitude (-180 to 180)",
                ),
            (None, false) => builder
                .add_comment("latitude = 52.520008")
                .add_comment("longitude = 13.404954"),
        };

        let schedule = ScheduleConfig::default_schedule(Vec::new());
        builder = builder
            .add_table("behaviour", "Daemon behaviour")
            .add_setting(
                "scenes",
                &behaviour.scenes.to_string(),
                "Keep scenes named \"kelvin <schedule>\" in sync",
            )
            .add_setting(
                "transition_seconds",
                &behaviour.transition_seconds.to_string(),
                &format!("Fade duration of every write (0-{})", MAXIMUM_TRANSITION_SECS),
            )
            .add_setting(
                "reconcile_interval_seconds",
                &behaviour.reconcile_interval_seconds.to_string(),
                &format!(
                    "How often lights are checked (1-{})",
                    MAXIMUM_RECONCILE_INTERVAL_SECS
                ),
            )
            .add_setting(
                "target_interval_seconds",
                &behaviour.target_interval_seconds.to_string(),
                &format!(
                    "How often targets are recalculated (1-{})",
                    MAXIMUM_TARGET_INTERVAL_SECS
                ),
            )
            .add_setting(
                "initialization_seconds",
                &behaviour.initialization_seconds.to_string(),
                "Time a light must hold its target after appearing",
            )
            .add_setting(
                "bridge_delay_ms",
                &behaviour.bridge_delay_ms.to_string(),
                &format!("Minimum delay between bridge calls (>= {})", MINIMUM_BRIDGE_DELAY_MS),
            )
            .add_array_table("schedules", "Schedule for a group of lights")
            .add_setting("name", &format!("\"{}\"", schedule.name), "Unique name")
            .add_setting(
                "associated_device_ids",
                "[]",
                "Light ids, see 'kelvin --devices'",
            )
            .add_setting(
                "enable_when_lights_appear",
                &schedule.enable_when_lights_appear.to_string(),
                "Take over lights as soon as they are switched on",
            )
            .add_setting(
                "default_color_temperature",
                &DEFAULT_COLOR_TEMPERATURE.to_string(),
                &format!(
                    "Kelvin between sunrise and sunset ({}-{})",
                    MINIMUM_TEMP, MAXIMUM_TEMP
                ),
            )
            .add_setting(
                "default_brightness",
                &DEFAULT_BRIGHTNESS.to_string(),
                &format!(
                    "Percent between sunrise and sunset ({}-{})",
                    MINIMUM_BRIGHTNESS, MAXIMUM_BRIGHTNESS
                ),
            );

        for anchor in &schedule.before_sunrise {
            builder = add_anchor(builder, "schedules.before_sunrise", anchor);
        }
        for anchor in &schedule.after_sunset {
            builder = add_anchor(builder, "schedules.after_sunset", anchor);
        }

        fs::write(path, builder.build()).context("Failed to write default config file")?;
        Ok(())
    }

    pub fn log_config(&self, config_path: &Path) {
        Log::log_block_start(&format!(
            "Loaded configuration from {}",
            path_for_display(config_path)
        ));

        if let Ok(geo_path) = Self::get_geo_path(config_path) {
            if geo_path.exists() {
                Log::log_indented(&format!(
                    "Loaded geo coordinates from {}",
                    path_for_display(&geo_path)
                ));
            }
        }

        Log::log_indented(&format!(
            "Bridge: {}",
            self.bridge.ip.as_deref().unwrap_or("not configured")
        ));
        match self.location() {
            Some(location) => Log::log_indented(&format!("Location: {}", location)),
            None => Log::log_indented("Location: not configured"),
        }
        Log::log_indented(&format!("Scenes: {}", self.behaviour.scenes));
        Log::log_indented(&format!(
            "Transition: {} second(s)",
            self.behaviour.transition_seconds
        ));
        Log::log_indented(&format!(
            "Reconcile interval: {} second(s)",
            self.behaviour.reconcile_interval_seconds
        ));
        Log::log_indented(&format!(
            "Target interval: {} second(s)",
            self.behaviour.target_interval_seconds
        ));

        for schedule in &self.schedules {
            Log::log_indented(&format!(
                "Schedule {}: {} light(s), {} anchor(s)",
                schedule.name,
                schedule.associated_device_ids.len(),
                schedule.before_sunrise.len() + schedule.after_sunset.len()
            ));
        }
    }
}

fn add_anchor(builder: ConfigBuilder, table: &str, anchor: &TimedColorTemperature) -> ConfigBuilder {
    let mut builder = builder
        .add_array_table(table, "")
        .add_setting("time", &format!("\"{}\"", anchor.time), "24-hour wall clock time");
    if let Some(kelvin) = anchor.color_temperature {
        builder = builder.add_setting("color_temperature", &kelvin.to_string(), "Kelvin");
    }
    if let Some(percent) = anchor.brightness {
        builder = builder.add_setting("brightness", &percent.to_string(), "Percent");
    }
    builder
}

/// Validate a configuration, reporting the first impossible value.
///
/// Anchor times that cannot be parsed only produce a warning; the schedule
/// skips them.
pub fn validate_config(config: &Config) -> Result<()> {
    if let Some(lat) = config.location.latitude.filter(|lat| !(-90.0..=90.0).contains(lat)) {
        anyhow::bail!("Latitude must be between -90 and 90 degrees (got {})", lat);
    }
    if let Some(lon) = config
        .location
        .longitude
        .filter(|lon| !(-180.0..=180.0).contains(lon))
    {
        anyhow::bail!(
            "Longitude must be between -180 and 180 degrees (got {})",
            lon
        );
    }

    let behaviour = &config.behaviour;
    if behaviour.transition_seconds > MAXIMUM_TRANSITION_SECS {
        anyhow::bail!(
            "Transition must be between 0 and {} seconds (got {})",
            MAXIMUM_TRANSITION_SECS,
            behaviour.transition_seconds
        );
    }
    if !(1..=MAXIMUM_RECONCILE_INTERVAL_SECS).contains(&behaviour.reconcile_interval_seconds) {
        anyhow::bail!(
            "Reconcile interval must be between 1 and {} seconds (got {})",
            MAXIMUM_RECONCILE_INTERVAL_SECS,
            behaviour.reconcile_interval_seconds
        );
    }
    if !(1..=MAXIMUM_TARGET_INTERVAL_SECS).contains(&behaviour.target_interval_seconds) {
        anyhow::bail!(
            "Target interval must be between 1 and {} seconds (got {})",
            MAXIMUM_TARGET_INTERVAL_SECS,
            behaviour.target_interval_seconds
        );
    }
    if behaviour.bridge_delay_ms < MINIMUM_BRIDGE_DELAY_MS {
        anyhow::bail!(
            "Bridge delay must be at least {} ms (got {})",
            MINIMUM_BRIDGE_DELAY_MS,
            behaviour.bridge_delay_ms
        );
    }

    let mut names = HashSet::new();
    let mut owners: HashMap<u32, &str> = HashMap::new();

    for schedule in &config.schedules {
        if schedule.name.trim().is_empty() {
            anyhow::bail!("Schedule names must not be empty");
        }
        if !names.insert(schedule.name.as_str()) {
            anyhow::bail!("Schedule name '{}' is used more than once", schedule.name);
        }

        for id in &schedule.associated_device_ids {
            if let Some(other) = owners.insert(*id, &schedule.name) {
                anyhow::bail!(
                    "Light {} is associated with both schedule '{}' and '{}'",
                    id,
                    other,
                    schedule.name
                );
            }
        }

        validate_values(
            &schedule.name,
            "default",
            schedule.default_color_temperature,
            schedule.default_brightness,
        )?;

        for anchor in schedule.anchors() {
            validate_values(
                &schedule.name,
                &anchor.time,
                anchor.color_temperature,
                anchor.brightness,
            )?;
            if parse_time_of_day(&anchor.time).is_none() {
                Log::log_warning(&format!(
                    "Schedule {} - Time '{}' is not a valid 24-hour time (H:MM) and will be ignored",
                    schedule.name, anchor.time
                ));
            }
        }
    }

    Ok(())
}

fn validate_values(
    schedule: &str,
    context: &str,
    color_temperature: Option<u32>,
    brightness: Option<u8>,
) -> Result<()> {
    if let Some(kelvin) =
        color_temperature.filter(|kelvin| !(MINIMUM_TEMP..=MAXIMUM_TEMP).contains(kelvin))
    {
        anyhow::bail!(
            "Schedule '{}' ({}): color temperature must be between {} and {} Kelvin (got {})",
            schedule,
            context,
            MINIMUM_TEMP,
            MAXIMUM_TEMP,
            kelvin
        );
    }
    if let Some(percent) = brightness.filter(|percent| *percent > MAXIMUM_BRIGHTNESS) {
        anyhow::bail!(
            "Schedule '{}' ({}): brightness must be between {}% and {}% (got {})",
            schedule,
            context,
            MINIMUM_BRIGHTNESS,
            MAXIMUM_BRIGHTNESS,
            percent
        );
    }
    Ok(())
}

/// Builder for the commented default configuration file.
struct ConfigBuilder {
    entries: Vec<ConfigEntry>,
}

enum ConfigEntry {
    Comment(String),
    Table { header: String, comment: String },
    Setting { line: String, comment: String },
}

impl ConfigBuilder {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn add_table(mut self, name: &str, comment: &str) -> Self {
        self.entries.push(ConfigEntry::Table {
            header: format!("[{}]", name),
            comment: comment.to_string(),
        });
        self
    }

    fn add_array_table(mut self, name: &str, comment: &str) -> Self {
        self.entries.push(ConfigEntry::Table {
            header: format!("[[{}]]", name),
            comment: comment.to_string(),
        });
        self
    }

    fn add_comment(mut self, text: &str) -> Self {
        self.entries.push(ConfigEntry::Comment(format!("#{}", text)));
        self
    }

    fn add_setting(mut self, key: &str, value: &str, comment: &str) -> Self {
        self.entries.push(ConfigEntry::Setting {
            line: format!("{} = {}", key, value),
            comment: format!("# {}", comment),
        });
        self
    }

    fn build(self) -> String {
        // Align all setting comments on one column
        let max_width = self
            .entries
            .iter()
            .filter_map(|entry| match entry {
                ConfigEntry::Setting { line, .. } => Some(line.len()),
                _ => None,
            })
            .max()
            .unwrap_or(0)
            + 1;

        let mut result = Vec::new();
        for entry in self.entries {
            match entry {
                ConfigEntry::Table { header, comment } => {
                    if !result.is_empty() {
                        result.push(String::new());
                    }
                    if !comment.is_empty() {
                        result.push(format!("#[{}]", comment));
                    }
                    result.push(header);
                }
                ConfigEntry::Comment(text) => result.push(text),
                ConfigEntry::Setting { line, comment } => {
                    let padding = " ".repeat(max_width - line.len());
                    result.push(format!("{}{}{}", line, padding, comment));
                }
            }
        }

        let mut content = result.join("\n");
        content.push('\n');
        content
    }
}
