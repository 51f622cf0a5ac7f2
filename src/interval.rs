//! The pair of anchor points bracketing a moment, and the light state between them.

use chrono::{DateTime, Local};
use std::fmt;

use crate::light_state::LightState;
use crate::schedule::TimePoint;
use crate::utils::interpolate_truncated;

/// Two adjacent anchors of a schedule with `start.time <= end.time`.
#[derive(Debug, Clone, PartialEq)]
pub struct Interval {
    pub start: TimePoint,
    pub end: TimePoint,
}

impl Interval {
    pub fn new(start: TimePoint, end: TimePoint) -> Self {
        Self { start, end }
    }

    /// Calculate the target light state at `timestamp`.
    ///
    /// Before the window the start state is returned unchanged, after it the
    /// end state. Inside, each channel is interpolated linearly on the
    /// elapsed minutes and truncated to an integer. A channel only one
    /// endpoint defines keeps that endpoint's value. The chromaticity is
    /// always derived from the resulting temperature.
    pub fn light_state_at(&self, timestamp: DateTime<Local>) -> LightState {
        if timestamp <= self.start.time {
            return self.start.light_state();
        }
        if timestamp >= self.end.time {
            return self.end.light_state();
        }

        let total_minutes = minutes_between(self.start.time, self.end.time);
        let progress = minutes_between(self.start.time, timestamp) / total_minutes;

        let color_temperature = interpolate_channel(
            self.start.color_temperature.map(i64::from),
            self.end.color_temperature.map(i64::from),
            progress,
        )
        .map(|kelvin| kelvin as u32);
        let brightness = interpolate_channel(
            self.start.brightness.map(i64::from),
            self.end.brightness.map(i64::from),
            progress,
        )
        .map(|percent| percent as u8);

        LightState::new(color_temperature, brightness)
    }

    /// Whether `timestamp` falls inside the window, start inclusive.
    pub fn contains(&self, timestamp: DateTime<Local>) -> bool {
        self.start.time <= timestamp && timestamp < self.end.time
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) to {} ({})",
            self.start.time.format("%H:%M"),
            self.start.light_state(),
            self.end.time.format("%H:%M"),
            self.end.light_state()
        )
    }
}

fn minutes_between(from: DateTime<Local>, to: DateTime<Local>) -> f64 {
    (to - from).num_milliseconds() as f64 / 60_000.0
}

fn interpolate_channel(start: Option<i64>, end: Option<i64>, progress: f64) -> Option<i64> {
    match (start, end) {
        (Some(start), Some(end)) => Some(interpolate_truncated(start, end, progress)),
        (Some(value), None) | (None, Some(value)) => Some(value),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::AnchorKind;
    use chrono::{NaiveDate, NaiveTime, TimeZone};

    fn at(hour: u32, minute: u32) -> DateTime<Local> {
        let date = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap();
        Local.from_local_datetime(&date.and_time(time)).earliest().unwrap()
    }

    fn point(hour: u32, kelvin: Option<u32>, percent: Option<u8>) -> TimePoint {
        TimePoint {
            time: at(hour, 0),
            color_temperature: kelvin,
            brightness: percent,
            kind: AnchorKind::Configured,
        }
    }

    #[test]
    fn test_endpoints_are_returned_verbatim() {
        let interval = Interval::new(point(4, Some(2000), Some(60)), point(7, Some(2750), Some(100)));
        assert_eq!(interval.light_state_at(at(4, 0)), LightState::new(Some(2000), Some(60)));
        assert_eq!(interval.light_state_at(at(7, 0)), LightState::new(Some(2750), Some(100)));
    }

    #[test]
    fn test_no_extrapolation_outside_window() {
        let interval = Interval::new(point(4, Some(2000), Some(60)), point(7, Some(2750), Some(100)));
        assert_eq!(interval.light_state_at(at(2, 0)), LightState::new(Some(2000), Some(60)));
        assert_eq!(interval.light_state_at(at(9, 0)), LightState::new(Some(2750), Some(100)));
    }

    #[test]
    fn test_linear_interpolation_midpoint() {
        let interval = Interval::new(point(4, Some(2000), Some(60)), point(7, Some(2750), Some(100)));
        let state = interval.light_state_at(at(5, 30));
        assert_eq!(state.color_temperature, Some(2375));
        assert_eq!(state.brightness, Some(80));
        assert!(state.chromaticity.is_some());
    }

    #[test]
    fn test_interpolation_truncates() {
        let interval = Interval::new(point(20, Some(2300), Some(80)), point(22, Some(2000), Some(60)));
        // 7 of 120 minutes
        let state = interval.light_state_at(at(20, 7));
        assert_eq!(state.color_temperature, Some(2283));
        assert_eq!(state.brightness, Some(79));
    }

    #[test]
    fn test_unset_channel_is_not_interpolated() {
        let interval = Interval::new(point(4, None, Some(60)), point(7, Some(2750), None));
        let state = interval.light_state_at(at(5, 30));
        assert_eq!(state.color_temperature, Some(2750));
        assert_eq!(state.brightness, Some(60));

        let interval = Interval::new(point(4, None, None), point(7, None, None));
        assert!(interval.light_state_at(at(5, 30)).is_unset());
    }

    #[test]
    fn test_chromaticity_follows_temperature() {
        let interval = Interval::new(point(4, Some(2000), Some(60)), point(7, Some(2750), Some(100)));
        let state = interval.light_state_at(at(6, 0));
        let expected = LightState::new(state.color_temperature, state.brightness);
        assert_eq!(state.chromaticity, expected.chromaticity);
        assert!(state.is_valid(2000));
    }

    #[test]
    fn test_degenerate_interval() {
        let interval = Interval::new(point(7, Some(2000), Some(10)), point(7, Some(3000), Some(90)));
        assert_eq!(interval.light_state_at(at(7, 0)), LightState::new(Some(2000), Some(10)));
    }

    #[test]
    fn test_contains() {
        let interval = Interval::new(point(4, Some(2000), Some(60)), point(7, Some(2750), Some(100)));
        assert!(interval.contains(at(4, 0)));
        assert!(interval.contains(at(6, 59)));
        assert!(!interval.contains(at(7, 0)));
    }
}
