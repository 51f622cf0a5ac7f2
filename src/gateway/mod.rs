//! Gateway abstraction for the lighting bridge and the devices behind it.
//!
//! The scheduling core never talks to the network directly. It drives a
//! [`DeviceGateway`] per light and uses a [`BridgeGateway`] for everything that
//! concerns the bridge as a whole (device enumeration, batched polling, scenes).
//!
//! ## Units
//!
//! Values crossing these traits are in the bridge's native units when they
//! describe *observed* state ([`DeviceState`]: mired, 0-254 brightness, xy) and
//! in user-facing units when they describe a *write request* (Kelvin, percent),
//! so that the device-specific clamping and encoding stay inside the gateway.
//!
//! ## Implementations
//!
//! - **Hue**: [`hue::HueBridge`] and [`hue::HueLight`], REST over HTTP
//! - **Tests**: `MockDeviceGateway` (mockall, `testing-support` feature) and
//!   hand-written fakes in the integration tests

use anyhow::Result;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::color::{Chromaticity, TemperatureRange};
use crate::constants::MINIMUM_AMBIANCE_TEMP;

pub mod hue;

/// Hue type strings of lights that accept a brightness.
const DIMMABLE_TYPES: &[&str] = &[
    "Dimmable Light",
    "Color Temperature Light",
    "Color Light",
    "Extended Color Light",
];
/// Hue type strings of lights that accept a mired color temperature.
const COLOR_TEMPERATURE_TYPES: &[&str] = &["Color Temperature Light", "Extended Color Light"];
/// Hue type strings of lights that accept an xy chromaticity.
const COLOR_TYPES: &[&str] = &["Color Light", "Extended Color Light"];

/// Which channel a device currently renders its color from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    ColorTemperature,
    Chromaticity,
    /// Hue/saturation mode, never written by this daemon
    HueSaturation,
}

impl ColorMode {
    /// Parse the bridge's `colormode` attribute.
    pub fn from_bridge(value: &str) -> Option<Self> {
        match value {
            "ct" => Some(ColorMode::ColorTemperature),
            "xy" => Some(ColorMode::Chromaticity),
            "hs" => Some(ColorMode::HueSaturation),
            _ => None,
        }
    }
}

/// What a device can render, derived from its type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub dimmable: bool,
    pub color_temperature: bool,
    pub color: bool,
    pub temperature_range: TemperatureRange,
}

impl Capabilities {
    /// Derive the capabilities of a device from its Hue type string.
    ///
    /// "Color Temperature Light" bulbs stop at 2200K; every other color capable
    /// type reaches 2000K.
    pub fn from_device_type(device_type: &str) -> Self {
        let dimmable = DIMMABLE_TYPES.contains(&device_type);
        let color_temperature = COLOR_TEMPERATURE_TYPES.contains(&device_type);
        let color = COLOR_TYPES.contains(&device_type);

        let temperature_range = if device_type == "Color Temperature Light" {
            TemperatureRange::with_minimum(MINIMUM_AMBIANCE_TEMP)
        } else {
            TemperatureRange::DEFAULT
        };

        Self {
            dimmable,
            color_temperature,
            color,
            temperature_range,
        }
    }

    /// Whether the device accepts any white temperature, by mired or by xy.
    pub fn supports_temperature(&self) -> bool {
        self.color_temperature || self.color
    }

    /// Devices that can neither dim nor change color are ignored entirely.
    pub fn is_supported(&self) -> bool {
        self.dimmable || self.supports_temperature()
    }
}

/// Raw attributes of a device as reported by the bridge.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeviceState {
    pub on: bool,
    pub reachable: bool,
    pub color_mode: Option<ColorMode>,
    /// Mired
    pub color_temperature: Option<u16>,
    pub chromaticity: Option<Chromaticity>,
    /// 0-254
    pub brightness: Option<u8>,
}

impl DeviceState {
    /// A device counts as on only while the bridge can reach it.
    pub fn is_present(&self) -> bool {
        self.reachable && self.on
    }
}

/// A device known to the bridge.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceDescriptor {
    pub id: u32,
    pub name: String,
    pub device_type: String,
    pub capabilities: Capabilities,
    pub state: DeviceState,
}

/// What the bridge acknowledged for a write, in device units.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WriteAck {
    pub on: Option<bool>,
    pub color_temperature: Option<u16>,
    pub chromaticity: Option<Chromaticity>,
    pub brightness: Option<u8>,
}

impl WriteAck {
    pub fn is_empty(&self) -> bool {
        self.on.is_none()
            && self.color_temperature.is_none()
            && self.chromaticity.is_none()
            && self.brightness.is_none()
    }
}

/// A scene stored on the bridge.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneDescriptor {
    pub id: String,
    pub name: String,
    pub lights: Vec<u32>,
}

/// The light state stored for every member of a scene, in device units.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneLightState {
    pub on: bool,
    pub color_temperature: Option<u16>,
    pub chromaticity: Option<Chromaticity>,
    pub brightness: Option<u8>,
}

/// Read/write access to a single physical light.
///
/// Calls block until the bridge answered. A write additionally blocks for the
/// transition duration so a following read observes the settled state.
#[cfg_attr(any(test, feature = "testing-support"), mockall::automock)]
pub trait DeviceGateway: Send {
    /// Bridge id of the device.
    fn id(&self) -> u32;

    /// Read the current raw attributes.
    fn read_state(&mut self) -> Result<DeviceState>;

    /// Write a target in Kelvin and percent.
    ///
    /// # Arguments
    /// * `color_temperature` - Kelvin, `None` leaves the channel untouched
    /// * `brightness` - percent, `None` leaves the channel untouched, `Some(0)` turns the device off
    /// * `transition` - duration of the fade on the device
    fn write_state(
        &mut self,
        color_temperature: Option<u32>,
        brightness: Option<u8>,
        transition: Duration,
    ) -> Result<WriteAck>;
}

/// The last batched poll of every device, shared by all light handles of a bridge.
///
/// Each light reconciles once per reconcile interval, so serving all of them
/// from one poll per interval keeps the bridge traffic independent of the
/// number of lights. A write invalidates the snapshot: the next read must
/// observe the written values, not the state from before the write.
pub struct StateSnapshot {
    max_age: Duration,
    polled: Mutex<Option<(Instant, HashMap<u32, DeviceState>)>>,
}

impl StateSnapshot {
    pub fn new(max_age: Duration) -> Self {
        Self {
            max_age,
            polled: Mutex::new(None),
        }
    }

    /// State of device `id`, polling every device with `poll` if the snapshot is too old.
    ///
    /// The lock is held while polling, so tasks asking at the same time wait
    /// for one poll instead of issuing their own.
    ///
    /// # Returns
    /// * `Ok(Some(state))` - The device was part of the poll
    /// * `Ok(None)` - The bridge no longer knows the device
    /// * `Err(_)` - Polling failed, nothing is cached
    pub fn state_of<F>(&self, id: u32, poll: F) -> Result<Option<DeviceState>>
    where
        F: FnOnce() -> Result<HashMap<u32, DeviceState>>,
    {
        let mut polled = match self.polled.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let fresh = polled
            .as_ref()
            .is_some_and(|(at, _)| at.elapsed() < self.max_age);
        if !fresh {
            *polled = None;
            *polled = Some((Instant::now(), poll()?));
        }
        Ok(polled.as_ref().and_then(|(_, states)| states.get(&id).cloned()))
    }

    /// Replace the snapshot with a poll made elsewhere.
    pub fn store(&self, states: HashMap<u32, DeviceState>) {
        let mut polled = match self.polled.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *polled = Some((Instant::now(), states));
    }

    pub fn invalidate(&self) {
        let mut polled = match self.polled.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *polled = None;
    }
}

/// Operations on the bridge as a whole.
pub trait BridgeGateway: Send + Sync {
    /// Enumerate all devices with their capabilities and current attributes.
    fn list_devices(&self) -> Result<Vec<DeviceDescriptor>>;

    /// Poll every device in one call.
    fn read_all_states(&self) -> Result<HashMap<u32, DeviceState>>;

    /// Handle for reading and writing a single device.
    fn device(&self, id: u32, capabilities: Capabilities) -> Box<dyn DeviceGateway>;

    fn list_scenes(&self) -> Result<Vec<SceneDescriptor>>;

    /// Replace the members of a scene and store `state` for every member.
    fn update_scene(
        &self,
        scene: &SceneDescriptor,
        lights: &[u32],
        state: &SceneLightState,
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_extended_color_light() {
        let caps = Capabilities::from_device_type("Extended Color Light");
        assert!(caps.dimmable);
        assert!(caps.color_temperature);
        assert!(caps.color);
        assert_eq!(caps.temperature_range.min, 2000);
    }

    #[test]
    fn test_capabilities_ambiance_light() {
        let caps = Capabilities::from_device_type("Color Temperature Light");
        assert!(caps.dimmable);
        assert!(caps.color_temperature);
        assert!(!caps.color);
        assert_eq!(caps.temperature_range.min, 2200);
        assert_eq!(caps.temperature_range.max, 6500);
    }

    #[test]
    fn test_capabilities_dimmable_only() {
        let caps = Capabilities::from_device_type("Dimmable Light");
        assert!(caps.dimmable);
        assert!(!caps.supports_temperature());
        assert!(caps.is_supported());
    }

    fn states(brightness: u8) -> HashMap<u32, DeviceState> {
        let state = DeviceState {
            on: true,
            reachable: true,
            brightness: Some(brightness),
            ..Default::default()
        };
        HashMap::from([(1, state.clone()), (2, state)])
    }

    #[test]
    fn test_snapshot_serves_all_lights_from_one_poll() {
        let snapshot = StateSnapshot::new(Duration::from_secs(60));
        let mut polls = 0;

        for id in [1, 2, 1, 2] {
            let state = snapshot
                .state_of(id, || {
                    polls += 1;
                    Ok(states(100))
                })
                .unwrap();
            assert_eq!(state.unwrap().brightness, Some(100));
        }
        assert_eq!(polls, 1);

        let missing = snapshot.state_of(3, || unreachable!()).unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_snapshot_invalidation_and_expiry() {
        let snapshot = StateSnapshot::new(Duration::from_secs(60));
        snapshot.state_of(1, || Ok(states(100))).unwrap();

        snapshot.invalidate();
        let state = snapshot.state_of(1, || Ok(states(50))).unwrap().unwrap();
        assert_eq!(state.brightness, Some(50));

        let expiring = StateSnapshot::new(Duration::ZERO);
        expiring.state_of(1, || Ok(states(100))).unwrap();
        let state = expiring.state_of(1, || Ok(states(20))).unwrap().unwrap();
        assert_eq!(state.brightness, Some(20));
    }

    #[test]
    fn test_snapshot_poll_failure_caches_nothing() {
        let snapshot = StateSnapshot::new(Duration::from_secs(60));
        snapshot.store(states(100));
        snapshot.invalidate();

        assert!(snapshot.state_of(1, || Err(anyhow::anyhow!("timeout"))).is_err());
        let state = snapshot.state_of(1, || Ok(states(30))).unwrap().unwrap();
        assert_eq!(state.brightness, Some(30));
    }

    #[test]
    fn test_capabilities_unsupported_type() {
        let caps = Capabilities::from_device_type("On/Off plug-in unit");
        assert!(!caps.is_supported());
    }

    #[test]
    fn test_color_mode_parsing() {
        assert_eq!(ColorMode::from_bridge("ct"), Some(ColorMode::ColorTemperature));
        assert_eq!(ColorMode::from_bridge("xy"), Some(ColorMode::Chromaticity));
        assert_eq!(ColorMode::from_bridge("hs"), Some(ColorMode::HueSaturation));
        assert_eq!(ColorMode::from_bridge("none"), None);
    }

    #[test]
    fn test_device_presence_requires_reachability() {
        let state = DeviceState {
            on: true,
            reachable: false,
            ..Default::default()
        };
        assert!(!state.is_present());
    }
}
