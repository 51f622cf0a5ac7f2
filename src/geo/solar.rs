//! Sunrise and sunset calculation for a location and a local calendar day.
//!
//! The astronomical work is done by the `sunrise` crate, which answers in UTC
//! for a UTC calendar day. Far from Greenwich the event belonging to a local
//! day can fall on the neighbouring UTC day, so the neighbouring days are
//! searched as well. Where the sun does not rise or set at all, conventional
//! fallback times are used so a schedule can still be built.

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveTime, TimeZone};
use sunrise::{Coordinates, SolarDay, SolarEvent};

use super::Location;
use crate::utils::local_datetime;

/// Sunrise and sunset of one local calendar day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunTimes {
    pub sunrise: DateTime<Local>,
    pub sunset: DateTime<Local>,
    /// Set when the times are conventional values for polar day or night
    pub polar_fallback: bool,
}

impl SunTimes {
    /// Sun times from fixed wall clock values, used by tests and simulations.
    pub fn from_times(date: NaiveDate, sunrise: NaiveTime, sunset: NaiveTime) -> Result<Self> {
        let sunrise = local_datetime(date, sunrise)
            .with_context(|| format!("Sunrise {} does not exist on {}", sunrise, date))?;
        let sunset = local_datetime(date, sunset)
            .with_context(|| format!("Sunset {} does not exist on {}", sunset, date))?;
        if sunrise >= sunset {
            anyhow::bail!(
                "Sunrise ({}) must be before sunset ({})",
                sunrise.format("%H:%M"),
                sunset.format("%H:%M")
            );
        }
        Ok(Self {
            sunrise,
            sunset,
            polar_fallback: false,
        })
    }
}

/// Calculate sunrise and sunset for `date` in the local timezone.
///
/// # Arguments
/// * `location` - Coordinates to calculate for
/// * `date` - Local calendar day
///
/// # Returns
/// * `Ok(SunTimes)` - Both events on `date`, sunrise before sunset
/// * `Err(_)` - If the coordinates are rejected or no usable times exist
pub fn calculate_sun_times(location: &Location, date: NaiveDate) -> Result<SunTimes> {
    if Coordinates::new(location.latitude, location.longitude).is_none() {
        anyhow::bail!("Invalid coordinates: {}", location);
    }

    let sunrise = event_on_local_date(location, date, SunEvent::Sunrise);
    let sunset = event_on_local_date(location, date, SunEvent::Sunset);

    match (sunrise, sunset) {
        (Some(sunrise), Some(sunset)) if sunrise < sunset => Ok(SunTimes {
            sunrise,
            sunset,
            polar_fallback: false,
        }),
        _ => handle_polar_edge_cases(location.latitude, date).with_context(|| {
            format!(
                "Failed to calculate sunrise/sunset for {} on {}",
                location, date
            )
        }),
    }
}

#[derive(Debug, Clone, Copy)]
enum SunEvent {
    Sunrise,
    Sunset,
}

/// Find the occurrence of `event` that falls on the local calendar day `date`.
fn event_on_local_date(
    location: &Location,
    date: NaiveDate,
    event: SunEvent,
) -> Option<DateTime<Local>> {
    [date, date - Duration::days(1), date + Duration::days(1)]
        .into_iter()
        .filter_map(|utc_date| {
            let coord = Coordinates::new(location.latitude, location.longitude)?;
            let solar_day = SolarDay::new(coord, utc_date);
            let utc = match event {
                SunEvent::Sunrise => solar_day.event_time(SolarEvent::Sunrise),
                SunEvent::Sunset => solar_day.event_time(SolarEvent::Sunset),
            };
            Some(Local.from_utc_datetime(&utc.naive_utc()))
        })
        .find(|local| local.date_naive() == date)
}

/// Conventional times for days where the sun never rises or never sets.
///
/// Midnight sun uses a long day (6:00 to 18:00), polar night a short one
/// (9:00 to 15:00). Only applies above the polar circles.
fn handle_polar_edge_cases(latitude: f64, date: NaiveDate) -> Result<SunTimes> {
    if latitude.abs() < 66.0 {
        anyhow::bail!("No sunrise or sunset found outside the polar regions");
    }

    let day_of_year = date.ordinal();
    let is_summer = if latitude > 0.0 {
        // Northern hemisphere: summer around day 172 (June 21)
        (80..=264).contains(&day_of_year)
    } else {
        !(80..=264).contains(&day_of_year)
    };

    let (sunrise, sunset) = if is_summer { (6, 18) } else { (9, 15) };
    let sunrise = NaiveTime::from_hms_opt(sunrise, 0, 0).context("Invalid fallback sunrise")?;
    let sunset = NaiveTime::from_hms_opt(sunset, 0, 0).context("Invalid fallback sunset")?;

    let mut times = SunTimes::from_times(date, sunrise, sunset)?;
    times.polar_fallback = true;
    Ok(times)
}
