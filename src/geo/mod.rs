//! Geographic location and the sunrise/sunset times derived from it.
//!
//! This module provides functionality for:
//! - Validating the configured coordinates
//! - Solar calculations for sunrise/sunset times, including a fallback for
//!   polar day and polar night
//! - Debug output of the calculated times

pub mod solar;

use anyhow::Result;
use chrono::NaiveDate;
use std::fmt;

pub use solar::{SunTimes, calculate_sun_times};

/// Coordinates used for all sunrise/sunset calculations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    /// Create a location after checking the coordinate ranges.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !(-90.0..=90.0).contains(&latitude) {
            anyhow::bail!(
                "Invalid latitude: {}. Must be between -90 and 90 degrees",
                latitude
            );
        }
        if !(-180.0..=180.0).contains(&longitude) {
            anyhow::bail!(
                "Invalid longitude: {}. Must be between -180 and 180 degrees",
                longitude
            );
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ns = if self.latitude >= 0.0 { 'N' } else { 'S' };
        let ew = if self.longitude >= 0.0 { 'E' } else { 'W' };
        write!(
            f,
            "{:.4}°{}, {:.4}°{}",
            self.latitude.abs(),
            ns,
            self.longitude.abs(),
            ew
        )
    }
}

/// Log the sunrise and sunset times calculated for `date`.
pub fn log_solar_debug_info(location: &Location, date: NaiveDate) -> Result<()> {
    use crate::logger::Log;

    let sun = calculate_sun_times(location, date)?;

    if sun.polar_fallback {
        Log::log_pipe();
        Log::log_warning("⚠️ Using extreme latitude fallback values");
        Log::log_indented("(The sun does not rise or set on this date)");
    }

    Log::log_pipe();
    Log::log_debug("Solar calculation details:");
    Log::log_indented(&format!("Coordinates: {}", location));
    Log::log_indented(&format!("    Sunrise: {}", sun.sunrise.format("%H:%M:%S")));
    Log::log_indented(&format!("     Sunset: {}", sun.sunset.format("%H:%M:%S")));
    let daylight = sun.sunset - sun.sunrise;
    Log::log_indented(&format!(
        "   Daylight: {}h {}m",
        daylight.num_hours(),
        daylight.num_minutes() % 60
    ));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_validation() {
        assert!(Location::new(52.52, 13.405).is_ok());
        assert!(Location::new(91.0, 0.0).is_err());
        assert!(Location::new(-91.0, 0.0).is_err());
        assert!(Location::new(0.0, 181.0).is_err());
        assert!(Location::new(0.0, -181.0).is_err());
    }

    #[test]
    fn test_location_display() {
        let location = Location::new(40.7128, -74.006).unwrap();
        assert_eq!(location.to_string(), "40.7128°N, 74.0060°W");
    }
}
