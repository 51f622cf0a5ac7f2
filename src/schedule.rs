//! Daily schedules and the lookup of the interval bracketing a moment.
//!
//! A [`Schedule`] is the configuration of one named schedule pinned to one
//! calendar day: sunrise and sunset for the configured location, the
//! configured anchors before sunrise and after sunset, and the end of the day.
//! It is rebuilt when the day turns over and never changes in between.
//!
//! ## Interval lookup
//!
//! Between sunrise and sunset the daylight interval (sunrise, sunset) applies.
//! Before sunrise the candidates are the configured morning anchors, the start
//! of the day and sunrise; after sunset the evening anchors, sunset and the end
//! of the day. The interval is formed by the latest candidate at or before the
//! query time and the earliest candidate after it. The start and end of day
//! only exist to close the bracket and take the values of their neighbour.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate, NaiveTime};
use std::fmt;

use crate::config::{ScheduleConfig, TimedColorTemperature};
use crate::geo::{Location, SunTimes, calculate_sun_times};
use crate::interval::Interval;
use crate::light_state::LightState;
use crate::logger::Log;
use crate::utils::{local_datetime, parse_time_of_day};

/// Where an anchor point comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorKind {
    Configured,
    Sunrise,
    Sunset,
    StartOfDay,
    EndOfDay,
}

impl AnchorKind {
    fn is_day_boundary(self) -> bool {
        matches!(self, AnchorKind::StartOfDay | AnchorKind::EndOfDay)
    }
}

/// A wall clock instant with the target values that apply at it.
#[derive(Debug, Clone, PartialEq)]
pub struct TimePoint {
    pub time: DateTime<Local>,
    pub color_temperature: Option<u32>,
    pub brightness: Option<u8>,
    pub kind: AnchorKind,
}

impl TimePoint {
    pub fn light_state(&self) -> LightState {
        LightState::new(self.color_temperature, self.brightness)
    }

    fn with_values_of(mut self, other: &TimePoint) -> Self {
        self.color_temperature = other.color_temperature;
        self.brightness = other.brightness;
        self
    }
}

impl fmt::Display for TimePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.kind {
            AnchorKind::Configured => "",
            AnchorKind::Sunrise => " (sunrise)",
            AnchorKind::Sunset => " (sunset)",
            AnchorKind::StartOfDay => " (start of day)",
            AnchorKind::EndOfDay => " (end of day)",
        };
        write!(
            f,
            "{}{}: {}",
            self.time.format("%H:%M"),
            label,
            self.light_state()
        )
    }
}

/// A light has no schedule associated with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    NotAssociated { light_id: u32 },
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleError::NotAssociated { light_id } => {
                write!(f, "Light {} is not associated with any schedule", light_id)
            }
        }
    }
}

impl std::error::Error for ScheduleError {}

/// Why no interval could be determined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntervalError {
    /// The query lies outside the schedule's day; rebuild the schedule.
    StaleSchedule {
        timestamp: DateTime<Local>,
        end_of_day: DateTime<Local>,
    },
    /// No bracketing pair exists; the candidate set was built wrong.
    Unbracketed { timestamp: DateTime<Local> },
}

impl fmt::Display for IntervalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntervalError::StaleSchedule {
                timestamp,
                end_of_day,
            } => write!(
                f,
                "No current interval as {} lies outside the schedule ending {}",
                timestamp.format("%Y-%m-%d %H:%M:%S"),
                end_of_day.format("%Y-%m-%d %H:%M:%S")
            ),
            IntervalError::Unbracketed { timestamp } => write!(
                f,
                "Could not find anchor points bracketing {}",
                timestamp.format("%Y-%m-%d %H:%M:%S")
            ),
        }
    }
}

impl std::error::Error for IntervalError {}

/// One named schedule pinned to one calendar day.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    pub name: String,
    pub date: NaiveDate,
    pub start_of_day: DateTime<Local>,
    pub end_of_day: DateTime<Local>,
    pub sunrise: TimePoint,
    pub sunset: TimePoint,
    /// Sorted by time
    pub before_sunrise: Vec<TimePoint>,
    /// Sorted by time
    pub after_sunset: Vec<TimePoint>,
    pub enable_when_lights_appear: bool,
}

impl Schedule {
    /// Build the schedule for `date` at `location`.
    pub fn for_location(config: &ScheduleConfig, location: &Location, date: NaiveDate) -> Result<Self> {
        let sun = calculate_sun_times(location, date)?;
        Self::build(config, &sun, date)
    }

    /// Build the schedule for `date` from known sun times.
    ///
    /// Anchors whose time cannot be parsed are logged and skipped.
    pub fn build(config: &ScheduleConfig, sun: &SunTimes, date: NaiveDate) -> Result<Self> {
        let start_of_day = NaiveTime::from_hms_opt(0, 0, 0)
            .and_then(|time| local_datetime(date, time))
            .with_context(|| format!("Start of day does not exist on {}", date))?;
        let end_of_day = NaiveTime::from_hms_opt(23, 59, 59)
            .and_then(|time| local_datetime(date, time))
            .with_context(|| format!("End of day does not exist on {}", date))?;

        let sunrise = TimePoint {
            time: sun.sunrise,
            color_temperature: config.default_color_temperature,
            brightness: config.default_brightness,
            kind: AnchorKind::Sunrise,
        };
        let sunset = TimePoint {
            time: sun.sunset,
            color_temperature: config.default_color_temperature,
            brightness: config.default_brightness,
            kind: AnchorKind::Sunset,
        };

        Ok(Self {
            name: config.name.clone(),
            date,
            start_of_day,
            end_of_day,
            sunrise,
            sunset,
            before_sunrise: anchors_for_day(&config.name, &config.before_sunrise, date),
            after_sunset: anchors_for_day(&config.name, &config.after_sunset, date),
            enable_when_lights_appear: config.enable_when_lights_appear,
        })
    }

    /// Whether this schedule is valid for the calendar day of `now`.
    ///
    /// The fraction of a second after the end of day anchor still belongs to
    /// the day and holds the end of day values.
    pub fn is_current(&self, now: DateTime<Local>) -> bool {
        now.date_naive() == self.date
    }

    /// Find the interval bracketing `now`.
    ///
    /// # Returns
    /// * `Ok(Interval)` - Daylight interval or the bracketing anchors
    /// * `Err(IntervalError::StaleSchedule)` - `now` is not on this schedule's day
    /// * `Err(IntervalError::Unbracketed)` - No bracketing pair could be formed
    pub fn current_interval(&self, now: DateTime<Local>) -> Result<Interval, IntervalError> {
        if !self.is_current(now) {
            return Err(IntervalError::StaleSchedule {
                timestamp: now,
                end_of_day: self.end_of_day,
            });
        }

        if self.sunrise.time <= now && now < self.sunset.time {
            return Ok(Interval::new(self.sunrise.clone(), self.sunset.clone()));
        }

        let candidates = if now < self.sunrise.time {
            let start = TimePoint {
                time: self.start_of_day,
                color_temperature: None,
                brightness: None,
                kind: AnchorKind::StartOfDay,
            };
            sorted_candidates(start, &self.before_sunrise, self.sunrise.clone())
        } else {
            let end = TimePoint {
                time: self.end_of_day,
                color_temperature: None,
                brightness: None,
                kind: AnchorKind::EndOfDay,
            };
            sorted_candidates(self.sunset.clone(), &self.after_sunset, end)
        };

        let (start, end) = bracket(&candidates, now)?;

        // Day boundaries carry the values of the anchor they are paired with
        let interval = if start.kind.is_day_boundary() {
            Interval::new(start.with_values_of(&end), end)
        } else if end.kind.is_day_boundary() {
            let end = end.with_values_of(&start);
            Interval::new(start, end)
        } else {
            Interval::new(start, end)
        };

        Ok(interval)
    }

    /// Every anchor of the day in chronological order.
    pub fn anchors(&self) -> Vec<&TimePoint> {
        let mut anchors: Vec<&TimePoint> = self
            .before_sunrise
            .iter()
            .chain(std::iter::once(&self.sunrise))
            .chain(std::iter::once(&self.sunset))
            .chain(self.after_sunset.iter())
            .collect();
        anchors.sort_by_key(|anchor| anchor.time);
        anchors
    }
}

/// Turn configured anchors into time points on `date`, sorted by time.
fn anchors_for_day(
    schedule_name: &str,
    entries: &[TimedColorTemperature],
    date: NaiveDate,
) -> Vec<TimePoint> {
    let mut points: Vec<TimePoint> = entries
        .iter()
        .filter_map(|entry| {
            let time = parse_time_of_day(&entry.time).and_then(|time| local_datetime(date, time));
            if time.is_none() {
                Log::log_warning(&format!(
                    "Schedule {} - Ignoring anchor with invalid time '{}'",
                    schedule_name, entry.time
                ));
            }
            time.map(|time| TimePoint {
                time,
                color_temperature: entry.color_temperature,
                brightness: entry.brightness,
                kind: AnchorKind::Configured,
            })
        })
        .collect();
    points.sort_by_key(|point| point.time);
    points
}

fn sorted_candidates(first: TimePoint, middle: &[TimePoint], last: TimePoint) -> Vec<TimePoint> {
    let mut candidates = Vec::with_capacity(middle.len() + 2);
    candidates.push(first);
    candidates.extend(middle.iter().cloned());
    candidates.push(last);
    // Stable, so a configured anchor sharing its time with a day boundary wins
    candidates.sort_by_key(|candidate| candidate.time);
    candidates
}

/// Pick the latest candidate at or before `now` and its successor.
///
/// When `now` sits exactly on the last candidate the pair ending there is used.
fn bracket(candidates: &[TimePoint], now: DateTime<Local>) -> Result<(TimePoint, TimePoint), IntervalError> {
    let unbracketed = IntervalError::Unbracketed { timestamp: now };

    let start_index = candidates
        .iter()
        .rposition(|candidate| candidate.time <= now)
        .ok_or_else(|| unbracketed.clone())?;

    match candidates.get(start_index + 1) {
        Some(end) => Ok((candidates[start_index].clone(), end.clone())),
        None if start_index > 0 => Ok((
            candidates[start_index - 1].clone(),
            candidates[start_index].clone(),
        )),
        None => Err(unbracketed),
    }
}
