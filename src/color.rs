//! Conversions between user-facing light values and bridge device units.
//!
//! Color temperature is configured in Kelvin and sent to the bridge as mired
//! (1,000,000 / Kelvin). Brightness is configured in percent and sent on the
//! bridge's 0-254 scale. Full color bulbs additionally accept a CIE 1931
//! chromaticity coordinate, derived here from the Kelvin value with the cubic
//! Planckian locus approximation of Kang et al. (2002).
//!
//! All functions are pure. Channels that should not be touched are modelled
//! as `None` by the callers and simply mapped through `Option::map`.

use crate::constants::{
    CHROMATICITY_PRECISION, LOCUS_MAXIMUM_TEMP, LOCUS_MINIMUM_TEMP, MAXIMUM_BRIGHTNESS,
    MAXIMUM_DEVICE_BRIGHTNESS, MAXIMUM_DEVICE_TEMP, MINIMUM_DEVICE_TEMP,
};

/// Range of color temperatures a device can render, in Kelvin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemperatureRange {
    pub min: u32,
    pub max: u32,
}

impl TemperatureRange {
    /// Range shared by all color capable bulbs.
    pub const DEFAULT: TemperatureRange = TemperatureRange {
        min: MINIMUM_DEVICE_TEMP,
        max: MAXIMUM_DEVICE_TEMP,
    };

    /// Range for a device whose warmest supported white is `min` Kelvin.
    pub fn with_minimum(min: u32) -> Self {
        Self {
            min: min.min(MAXIMUM_DEVICE_TEMP),
            max: MAXIMUM_DEVICE_TEMP,
        }
    }

    pub fn clamp(&self, kelvin: u32) -> u32 {
        kelvin.clamp(self.min, self.max)
    }

    pub fn contains(&self, kelvin: u32) -> bool {
        (self.min..=self.max).contains(&kelvin)
    }
}

impl Default for TemperatureRange {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// A CIE 1931 xy chromaticity coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Chromaticity {
    pub x: f64,
    pub y: f64,
}

impl Chromaticity {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance between two coordinates.
    pub fn distance(&self, other: &Chromaticity) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// The coordinate with the precision the bridge reports back.
    pub fn rounded(&self) -> Self {
        let shift = 10f64.powi(CHROMATICITY_PRECISION);
        Self {
            x: (self.x * shift).round() / shift,
            y: (self.y * shift).round() / shift,
        }
    }

    /// `true` for the all-zero coordinate some bulbs report when the xy
    /// channel was never used.
    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

/// Convert Kelvin to the bridge's mired scale after clamping to `range`.
///
/// # Examples
/// ```
/// use kelvin::color::{temperature_to_device_units, TemperatureRange};
/// assert_eq!(temperature_to_device_units(2000, TemperatureRange::DEFAULT), 500);
/// assert_eq!(temperature_to_device_units(9000, TemperatureRange::DEFAULT), 154);
/// ```
pub fn temperature_to_device_units(kelvin: u32, range: TemperatureRange) -> u16 {
    let kelvin = range.clamp(kelvin);
    (1_000_000.0 / kelvin as f64).round() as u16
}

/// Convert a mired value reported by the bridge back to Kelvin, clamped to `range`.
///
/// A zero mired value cannot be inverted and maps to the coolest supported white.
pub fn device_units_to_temperature(mired: u16, range: TemperatureRange) -> u32 {
    if mired == 0 {
        return range.max;
    }
    let kelvin = (1_000_000.0 / mired as f64).round() as u32;
    range.clamp(kelvin)
}

/// Convert a brightness percentage to the bridge's 0-254 scale.
///
/// # Examples
/// ```
/// use kelvin::color::brightness_to_device_units;
/// assert_eq!(brightness_to_device_units(100), 254);
/// assert_eq!(brightness_to_device_units(50), 127);
/// ```
pub fn brightness_to_device_units(percent: u8) -> u8 {
    let percent = percent.min(MAXIMUM_BRIGHTNESS);
    (percent as f64 / MAXIMUM_BRIGHTNESS as f64 * MAXIMUM_DEVICE_BRIGHTNESS as f64).round() as u8
}

/// Convert a brightness reported on the 0-254 scale back to percent.
pub fn device_units_to_brightness(units: u8) -> u8 {
    let units = units.min(MAXIMUM_DEVICE_BRIGHTNESS);
    (units as f64 / MAXIMUM_DEVICE_BRIGHTNESS as f64 * MAXIMUM_BRIGHTNESS as f64).round() as u8
}

/// Map a color temperature onto the Planckian locus in xy space.
///
/// The result depends on `kelvin` alone. Values outside the validity range of
/// the approximation (1667K - 25000K) are clamped to it; device limits are not
/// applied here.
///
/// # Examples
/// ```
/// use kelvin::color::temperature_to_chromaticity;
/// let xy = temperature_to_chromaticity(2700).rounded();
/// assert_eq!((xy.x, xy.y), (0.4593, 0.4107));
/// ```
pub fn temperature_to_chromaticity(kelvin: u32) -> Chromaticity {
    let t = kelvin.clamp(LOCUS_MINIMUM_TEMP, LOCUS_MAXIMUM_TEMP) as f64;
    let inv = 1.0 / t;
    let inv2 = inv * inv;
    let inv3 = inv2 * inv;

    let x = if t < 4000.0 {
        -0.2661239e9 * inv3 - 0.2343589e6 * inv2 + 0.8776956e3 * inv + 0.179910
    } else {
        -3.0258469e9 * inv3 + 2.1070379e6 * inv2 + 0.2226347e3 * inv + 0.240390
    };

    let x2 = x * x;
    let x3 = x2 * x;
    let y = if t < 2222.0 {
        -1.1063814 * x3 - 1.34811020 * x2 + 2.18555832 * x - 0.20219683
    } else if t < 4000.0 {
        -0.9549476 * x3 - 1.37418593 * x2 + 2.09137015 * x - 0.16748867
    } else {
        3.0817580 * x3 - 5.87338670 * x2 + 3.75112997 * x - 0.37001483
    };

    Chromaticity { x, y }
}

/// Estimate the correlated color temperature of a chromaticity (McCamy, 1992).
///
/// Only meaningful near the Planckian locus; used to give xy-mode observations
/// a temperature channel. The result is clamped to `range`.
pub fn chromaticity_to_temperature(chromaticity: Chromaticity, range: TemperatureRange) -> u32 {
    let denominator = 0.1858 - chromaticity.y;
    if denominator.abs() < f64::EPSILON {
        return range.max;
    }
    let n = (chromaticity.x - 0.3320) / denominator;
    let cct = 449.0 * n.powi(3) + 3525.0 * n.powi(2) + 6823.3 * n + 5520.33;
    if !cct.is_finite() || cct <= 0.0 {
        return range.max;
    }
    range.clamp(cct.round() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_xy(kelvin: u32, x: f64, y: f64) {
        let xy = temperature_to_chromaticity(kelvin);
        assert!(
            (xy.x - x).abs() < 5e-5 && (xy.y - y).abs() < 5e-5,
            "{}K mapped to ({}, {}), expected ({}, {})",
            kelvin,
            xy.x,
            xy.y,
            x,
            y
        );
    }

    #[test]
    fn test_chromaticity_reference_points() {
        assert_xy(2000, 0.5269, 0.4133);
        assert_xy(2700, 0.4593, 0.4107);
        assert_xy(4000, 0.3805, 0.3767);
        assert_xy(6500, 0.3135, 0.3237);
    }

    #[test]
    fn test_chromaticity_is_deterministic() {
        let a = temperature_to_chromaticity(3456);
        let b = temperature_to_chromaticity(3456);
        assert_eq!(a.x.to_bits(), b.x.to_bits());
        assert_eq!(a.y.to_bits(), b.y.to_bits());
    }

    #[test]
    fn test_chromaticity_monotonic_in_x() {
        let mut previous = temperature_to_chromaticity(2000).x;
        for kelvin in (2100..=6500).step_by(100) {
            let x = temperature_to_chromaticity(kelvin).x;
            assert!(x < previous, "x should decrease as temperature rises ({}K)", kelvin);
            previous = x;
        }
    }

    #[test]
    fn test_chromaticity_clamps_to_locus_range() {
        assert_eq!(
            temperature_to_chromaticity(1000),
            temperature_to_chromaticity(LOCUS_MINIMUM_TEMP)
        );
    }

    #[test]
    fn test_temperature_to_device_units() {
        assert_eq!(temperature_to_device_units(2000, TemperatureRange::DEFAULT), 500);
        assert_eq!(temperature_to_device_units(2700, TemperatureRange::DEFAULT), 370);
        assert_eq!(temperature_to_device_units(6500, TemperatureRange::DEFAULT), 154);
    }

    #[test]
    fn test_temperature_to_device_units_clamps() {
        assert_eq!(temperature_to_device_units(1500, TemperatureRange::DEFAULT), 500);
        assert_eq!(temperature_to_device_units(10000, TemperatureRange::DEFAULT), 154);
        // Ambiance bulbs stop at 2200K
        let ambiance = TemperatureRange::with_minimum(2200);
        assert_eq!(temperature_to_device_units(2000, ambiance), 455);
    }

    #[test]
    fn test_device_units_to_temperature() {
        assert_eq!(device_units_to_temperature(500, TemperatureRange::DEFAULT), 2000);
        assert_eq!(device_units_to_temperature(370, TemperatureRange::DEFAULT), 2703);
        assert_eq!(device_units_to_temperature(153, TemperatureRange::DEFAULT), 6500);
        assert_eq!(device_units_to_temperature(0, TemperatureRange::DEFAULT), 6500);
    }

    #[test]
    fn test_temperature_round_trip_within_half_mired() {
        for kelvin in 2000..=6500 {
            let units = temperature_to_device_units(kelvin, TemperatureRange::DEFAULT);
            let back = device_units_to_temperature(units, TemperatureRange::DEFAULT);
            let half_step = (kelvin as f64).powi(2) / 2_000_000.0 + 1.0;
            assert!(
                (back as f64 - kelvin as f64).abs() <= half_step,
                "{}K came back as {}K",
                kelvin,
                back
            );
        }
    }

    #[test]
    fn test_temperature_round_trip_within_five_kelvin_for_warm_whites() {
        for kelvin in 2000..=3000 {
            let units = temperature_to_device_units(kelvin, TemperatureRange::DEFAULT);
            let back = device_units_to_temperature(units, TemperatureRange::DEFAULT);
            assert!(back.abs_diff(kelvin) <= 5, "{}K came back as {}K", kelvin, back);
        }
    }

    #[test]
    fn test_brightness_conversion() {
        assert_eq!(brightness_to_device_units(0), 0);
        assert_eq!(brightness_to_device_units(60), 152);
        assert_eq!(brightness_to_device_units(100), 254);
        assert_eq!(brightness_to_device_units(150), 254);
        assert_eq!(device_units_to_brightness(254), 100);
        assert_eq!(device_units_to_brightness(152), 60);
        assert_eq!(device_units_to_brightness(255), 100);
    }

    #[test]
    fn test_brightness_round_trip() {
        for percent in 0..=100u8 {
            let back = device_units_to_brightness(brightness_to_device_units(percent));
            assert!(back.abs_diff(percent) <= 1, "{}% came back as {}%", percent, back);
        }
    }

    #[test]
    fn test_mccamy_estimate_near_locus() {
        for kelvin in [2700, 4000, 6500] {
            let estimate =
                chromaticity_to_temperature(temperature_to_chromaticity(kelvin), TemperatureRange::DEFAULT);
            assert!(estimate.abs_diff(kelvin) <= 25, "{}K estimated as {}K", kelvin, estimate);
        }
    }

    #[test]
    fn test_chromaticity_rounding() {
        let xy = Chromaticity::new(0.45931395, 0.41066025).rounded();
        assert_eq!(xy, Chromaticity::new(0.4593, 0.4107));
        assert!(Chromaticity::new(0.0, 0.0).is_zero());
    }
}
