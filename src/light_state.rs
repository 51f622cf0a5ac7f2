//! Target and observed light configurations.
//!
//! A [`LightState`] carries up to three channels: color temperature (Kelvin),
//! chromaticity (xy) and brightness (percent). A channel set to `None` is
//! ignored: it is never written and never counts as changed.
//!
//! Temperature and chromaticity describe the same target through two
//! encodings, so a well formed state has both or neither.

use std::fmt;

use crate::color::{
    Chromaticity, TemperatureRange, brightness_to_device_units, chromaticity_to_temperature,
    device_units_to_brightness, device_units_to_temperature, temperature_to_chromaticity,
    temperature_to_device_units,
};
use crate::constants::{
    BRIGHTNESS_TOLERANCE, CHROMATICITY_TOLERANCE, MAXIMUM_BRIGHTNESS, MAXIMUM_DEVICE_TEMP,
    TEMPERATURE_TOLERANCE,
};
use crate::gateway::{Capabilities, ColorMode, DeviceState};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LightState {
    pub color_temperature: Option<u32>,
    pub chromaticity: Option<Chromaticity>,
    pub brightness: Option<u8>,
}

impl LightState {
    /// Build a target from user-facing units. The chromaticity is derived
    /// from the temperature.
    pub fn new(color_temperature: Option<u32>, brightness: Option<u8>) -> Self {
        Self {
            color_temperature,
            chromaticity: color_temperature.map(temperature_to_chromaticity),
            brightness,
        }
    }

    /// A state with every channel ignored.
    pub fn unset() -> Self {
        Self::default()
    }

    pub fn is_unset(&self) -> bool {
        self.color_temperature.is_none() && self.chromaticity.is_none() && self.brightness.is_none()
    }

    /// Build a state from raw device values (mired, xy, 0-254).
    ///
    /// A zero mired value or an all-zero chromaticity means the device does not
    /// report that channel.
    pub fn from_device_values(
        color_temperature: Option<u16>,
        chromaticity: Option<Chromaticity>,
        brightness: Option<u8>,
        range: TemperatureRange,
    ) -> Self {
        Self {
            color_temperature: color_temperature
                .filter(|mired| *mired > 0)
                .map(|mired| device_units_to_temperature(mired, range)),
            chromaticity: chromaticity.filter(|xy| !xy.is_zero()),
            brightness: brightness.map(device_units_to_brightness),
        }
    }

    /// Build the observed state of a device from the channel it renders from.
    ///
    /// In `ct` mode only the temperature is trusted. In `xy` mode the
    /// chromaticity is used and a temperature is estimated from it. Devices
    /// that report no mode fall back to whatever they report.
    pub fn from_observation(state: &DeviceState, capabilities: &Capabilities) -> Self {
        let range = capabilities.temperature_range;
        let brightness = if capabilities.dimmable {
            state.brightness
        } else {
            None
        };

        match state.color_mode {
            Some(ColorMode::ColorTemperature) => {
                Self::from_device_values(state.color_temperature, None, brightness, range)
            }
            Some(ColorMode::Chromaticity) => {
                let chromaticity = state.chromaticity.filter(|xy| !xy.is_zero());
                Self {
                    color_temperature: chromaticity
                        .map(|xy| chromaticity_to_temperature(xy, range)),
                    chromaticity,
                    brightness: brightness.map(device_units_to_brightness),
                }
            }
            _ => Self::from_device_values(
                state.color_temperature,
                state.chromaticity,
                brightness,
                range,
            ),
        }
    }

    /// What a device with `capabilities` reports back after this state was
    /// written to it.
    ///
    /// Channels the device cannot render become `None`, the remaining ones are
    /// clamped and rounded through the device encoding.
    pub fn quantized(&self, capabilities: &Capabilities) -> Self {
        let range = capabilities.temperature_range;
        let color_temperature = if capabilities.supports_temperature() {
            self.color_temperature
                .map(|kelvin| temperature_to_device_units(kelvin, range))
                .map(|mired| device_units_to_temperature(mired, range))
        } else {
            None
        };
        let chromaticity = if capabilities.color {
            self.color_temperature
                .map(|kelvin| temperature_to_chromaticity(range.clamp(kelvin)).rounded())
        } else {
            None
        };
        let brightness = if capabilities.dimmable {
            self.brightness
                .map(brightness_to_device_units)
                .map(device_units_to_brightness)
        } else {
            None
        };

        Self {
            color_temperature,
            chromaticity,
            brightness,
        }
    }

    /// Drop the channels `reference` ignores.
    pub fn masked_like(&self, reference: &LightState) -> Self {
        Self {
            color_temperature: reference.color_temperature.and(self.color_temperature),
            chromaticity: reference.chromaticity.and(self.chromaticity),
            brightness: reference.brightness.and(self.brightness),
        }
    }

    /// Approximate equality with `self` as the reference.
    ///
    /// A channel `self` ignores always matches. The color branch is preferred:
    /// two states are equal when brightness matches and either both
    /// chromaticities are within tolerance or the temperatures are.
    pub fn equals(&self, other: &LightState) -> bool {
        let same_brightness = match (self.brightness, other.brightness) {
            (None, _) => true,
            (Some(a), Some(b)) => a.abs_diff(b) < BRIGHTNESS_TOLERANCE,
            (Some(_), None) => false,
        };
        if !same_brightness {
            return false;
        }

        let same_color = match (self.chromaticity, other.chromaticity) {
            (Some(a), Some(b)) => a.distance(&b) <= CHROMATICITY_TOLERANCE,
            _ => false,
        };
        if same_color {
            return true;
        }

        match (self.color_temperature, other.color_temperature) {
            // Nothing but brightness to compare
            (None, _) => self.chromaticity.is_none(),
            (Some(a), Some(b)) => a.abs_diff(b) < TEMPERATURE_TOLERANCE,
            (Some(_), None) => false,
        }
    }

    /// Check the value ranges and that temperature and chromaticity agree.
    pub fn is_valid(&self, minimum_temperature: u32) -> bool {
        let brightness_ok = self
            .brightness
            .is_none_or(|brightness| brightness <= MAXIMUM_BRIGHTNESS);
        let temperature_ok = self
            .color_temperature
            .is_none_or(|kelvin| (minimum_temperature..=MAXIMUM_DEVICE_TEMP).contains(&kelvin));
        let encodings_agree = self.color_temperature.is_some() == self.chromaticity.is_some();

        brightness_ok && temperature_ok && encodings_agree
    }
}

impl fmt::Display for LightState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.color_temperature {
            Some(kelvin) => write!(f, "{}K", kelvin)?,
            None => write!(f, "-K")?,
        }
        match self.brightness {
            Some(percent) => write!(f, ", {}%", percent),
            None => write!(f, ", -%"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temperature_only(kelvin: u32, percent: u8) -> LightState {
        LightState {
            color_temperature: Some(kelvin),
            chromaticity: None,
            brightness: Some(percent),
        }
    }

    #[test]
    fn test_new_derives_chromaticity() {
        let state = LightState::new(Some(2700), Some(60));
        let xy = state.chromaticity.map(|xy| xy.rounded());
        assert_eq!(xy, Some(Chromaticity::new(0.4593, 0.4107)));
        assert!(state.is_valid(2000));
    }

    #[test]
    fn test_unset_state() {
        let state = LightState::new(None, None);
        assert!(state.is_unset());
        assert!(state.is_valid(2000));
    }

    #[test]
    fn test_equals_brightness_tolerance() {
        let a = temperature_only(2700, 60);
        assert!(a.equals(&temperature_only(2700, 61)));
        assert!(a.equals(&temperature_only(2700, 62)));
        assert!(!a.equals(&temperature_only(2700, 63)));
    }

    #[test]
    fn test_equals_temperature_tolerance_edge() {
        let a = temperature_only(2700, 60);
        assert!(a.equals(&temperature_only(2704, 60)));
        assert!(!a.equals(&temperature_only(2705, 60)));
        assert!(!a.equals(&temperature_only(2750, 60)));
    }

    #[test]
    fn test_equals_prefers_color() {
        let target = LightState::new(Some(2700), Some(60));
        // Temperature estimate is off, chromaticity is spot on
        let observed = LightState {
            color_temperature: Some(2720),
            chromaticity: target.chromaticity,
            brightness: Some(60),
        };
        assert!(target.equals(&observed));
    }

    #[test]
    fn test_equals_falls_back_to_temperature() {
        let target = LightState::new(Some(2700), Some(60));
        let observed = temperature_only(2702, 60);
        assert!(target.equals(&observed));
    }

    #[test]
    fn test_equals_ignores_unset_reference_channels() {
        let target = LightState::new(None, Some(50));
        assert!(target.equals(&temperature_only(4000, 51)));
        let target = LightState::new(Some(3000), None);
        assert!(target.equals(&LightState::new(Some(3001), Some(10))));
    }

    #[test]
    fn test_equals_requires_reported_channel() {
        let target = temperature_only(2700, 60);
        let observed = LightState::new(None, Some(60));
        assert!(!target.equals(&observed));
    }

    #[test]
    fn test_is_valid_rejects_mismatched_encodings() {
        let state = temperature_only(2700, 60);
        assert!(!state.is_valid(2000));
    }

    #[test]
    fn test_is_valid_ranges() {
        assert!(!LightState::new(Some(1500), Some(50)).is_valid(2000));
        assert!(!LightState::new(Some(2100), Some(50)).is_valid(2200));
        assert!(!LightState::new(Some(3000), Some(101)).is_valid(2000));
        assert!(LightState::new(Some(6500), Some(0)).is_valid(2000));
    }

    #[test]
    fn test_from_device_values() {
        let state = LightState::from_device_values(
            Some(370),
            Some(Chromaticity::new(0.0, 0.0)),
            Some(254),
            TemperatureRange::DEFAULT,
        );
        assert_eq!(state.color_temperature, Some(2703));
        assert_eq!(state.chromaticity, None);
        assert_eq!(state.brightness, Some(100));
    }

    #[test]
    fn test_from_observation_ct_mode() {
        let caps = Capabilities::from_device_type("Extended Color Light");
        let device = DeviceState {
            on: true,
            reachable: true,
            color_mode: Some(ColorMode::ColorTemperature),
            color_temperature: Some(500),
            chromaticity: Some(Chromaticity::new(0.3, 0.3)),
            brightness: Some(152),
        };
        let observed = LightState::from_observation(&device, &caps);
        assert_eq!(observed.color_temperature, Some(2000));
        assert_eq!(observed.chromaticity, None);
        assert_eq!(observed.brightness, Some(60));
    }

    #[test]
    fn test_from_observation_xy_mode() {
        let caps = Capabilities::from_device_type("Extended Color Light");
        let xy = temperature_to_chromaticity(2700).rounded();
        let device = DeviceState {
            on: true,
            reachable: true,
            color_mode: Some(ColorMode::Chromaticity),
            color_temperature: Some(153),
            chromaticity: Some(xy),
            brightness: Some(254),
        };
        let observed = LightState::from_observation(&device, &caps);
        assert_eq!(observed.chromaticity, Some(xy));
        assert!(LightState::new(Some(2700), Some(100)).quantized(&caps).equals(&observed));
    }

    #[test]
    fn test_quantized_drops_unsupported_channels() {
        let caps = Capabilities::from_device_type("Dimmable Light");
        let quantized = LightState::new(Some(2700), Some(60)).quantized(&caps);
        assert_eq!(quantized.color_temperature, None);
        assert_eq!(quantized.chromaticity, None);
        assert_eq!(quantized.brightness, Some(60));
    }

    #[test]
    fn test_quantized_clamps_to_device_range() {
        let caps = Capabilities::from_device_type("Color Temperature Light");
        assert_eq!(temperature_to_device_units(2000, caps.temperature_range), 455);
        let quantized = LightState::new(Some(2000), Some(100)).quantized(&caps);
        assert_eq!(quantized.color_temperature, Some(2200));
        assert_eq!(quantized.chromaticity, None);
    }

    #[test]
    fn test_masked_like() {
        let reference = LightState::new(None, Some(40));
        let masked = LightState::new(Some(3000), Some(41)).masked_like(&reference);
        assert_eq!(masked, LightState::new(None, Some(41)));
    }

    #[test]
    fn test_display() {
        assert_eq!(LightState::new(Some(2750), Some(100)).to_string(), "2750K, 100%");
        assert_eq!(LightState::new(None, Some(5)).to_string(), "-K, 5%");
    }
}
