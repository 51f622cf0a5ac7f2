//! Property based tests for the color conversions, interpolation and equality.

use chrono::{Duration, Local, NaiveDate, NaiveTime, TimeZone};
use proptest::prelude::*;

use kelvin::color::{
    TemperatureRange, brightness_to_device_units, device_units_to_brightness,
    device_units_to_temperature, temperature_to_chromaticity, temperature_to_device_units,
};
use kelvin::constants::{MAXIMUM_DEVICE_TEMP, MINIMUM_DEVICE_TEMP};
use kelvin::schedule::AnchorKind;
use kelvin::{Interval, LightState, TimePoint};

fn time_point(minutes: i64, kelvin: u32, percent: u8) -> TimePoint {
    let midnight = NaiveDate::from_ymd_opt(2024, 7, 1)
        .unwrap()
        .and_time(NaiveTime::from_hms_opt(0, 0, 0).unwrap());
    let base = Local.from_local_datetime(&midnight).earliest().unwrap();
    TimePoint {
        time: base + Duration::minutes(minutes),
        color_temperature: Some(kelvin),
        brightness: Some(percent),
        kind: AnchorKind::Configured,
    }
}

fn temperature_only(kelvin: u32, percent: u8) -> LightState {
    LightState {
        color_temperature: Some(kelvin),
        chromaticity: None,
        brightness: Some(percent),
    }
}

proptest! {
    #[test]
    fn brightness_round_trip_within_one_percent(percent in 0u8..=100) {
        let back = device_units_to_brightness(brightness_to_device_units(percent));
        prop_assert!(back.abs_diff(percent) <= 1, "{} came back as {}", percent, back);
    }

    #[test]
    fn temperature_round_trip_within_half_a_mired_step(kelvin in MINIMUM_DEVICE_TEMP..=MAXIMUM_DEVICE_TEMP) {
        let range = TemperatureRange::DEFAULT;
        let back = device_units_to_temperature(temperature_to_device_units(kelvin, range), range);
        let bound = (kelvin as f64).powi(2) / 2_000_000.0 + 1.0;
        prop_assert!((back.abs_diff(kelvin) as f64) <= bound, "{} came back as {}", kelvin, back);
    }

    #[test]
    fn warm_temperature_round_trip_within_five_kelvin(kelvin in 2000u32..=3000) {
        let range = TemperatureRange::DEFAULT;
        let back = device_units_to_temperature(temperature_to_device_units(kelvin, range), range);
        prop_assert!(back.abs_diff(kelvin) < 5, "{} came back as {}", kelvin, back);
    }

    #[test]
    fn chromaticity_x_falls_with_temperature(kelvin in 1700u32..25_000) {
        let warm = temperature_to_chromaticity(kelvin);
        let cool = temperature_to_chromaticity(kelvin + 1);
        prop_assert!(warm.x >= cool.x);
    }

    #[test]
    fn chromaticity_depends_on_kelvin_alone(kelvin in 1000u32..30_000) {
        prop_assert_eq!(temperature_to_chromaticity(kelvin), temperature_to_chromaticity(kelvin));
    }

    #[test]
    fn interval_endpoints_and_midpoint(
        start_kelvin in 1000u32..=6500,
        end_kelvin in 1000u32..=6500,
        start_percent in 0u8..=100,
        end_percent in 0u8..=100,
        start_minute in 0i64..600,
        half_length in 1i64..300,
    ) {
        let start = time_point(start_minute, start_kelvin, start_percent);
        let end = time_point(start_minute + 2 * half_length, end_kelvin, end_percent);
        let interval = Interval::new(start.clone(), end.clone());

        prop_assert_eq!(interval.light_state_at(start.time), start.light_state());
        prop_assert_eq!(interval.light_state_at(end.time), end.light_state());

        let middle = interval.light_state_at(start.time + Duration::minutes(half_length));
        let mean_kelvin = (start_kelvin as f64 + end_kelvin as f64) / 2.0;
        let mean_percent = (start_percent as f64 + end_percent as f64) / 2.0;
        prop_assert!((middle.color_temperature.unwrap() as f64 - mean_kelvin).abs() <= 1.0);
        prop_assert!((middle.brightness.unwrap() as f64 - mean_percent).abs() <= 1.0);
    }

    #[test]
    fn interval_is_monotonic_between_endpoints(
        start_kelvin in 2000u32..=6500,
        end_kelvin in 2000u32..=6500,
        minute in 0i64..=120,
    ) {
        let start = time_point(0, start_kelvin, 50);
        let end = time_point(120, end_kelvin, 50);
        let kelvin = Interval::new(start.clone(), end)
            .light_state_at(start.time + Duration::minutes(minute))
            .color_temperature
            .unwrap();
        prop_assert!(kelvin >= start_kelvin.min(end_kelvin));
        prop_assert!(kelvin <= start_kelvin.max(end_kelvin));
    }

    #[test]
    fn equality_is_reflexive(kelvin in 2000u32..=6500, percent in 0u8..=100) {
        let state = LightState::new(Some(kelvin), Some(percent));
        prop_assert!(state.equals(&state));
    }
}

#[test]
fn test_brightness_tolerance() {
    assert!(temperature_only(2700, 60).equals(&temperature_only(2700, 61)));
    assert!(temperature_only(2700, 60).equals(&temperature_only(2700, 62)));
    assert!(!temperature_only(2700, 60).equals(&temperature_only(2700, 63)));
}

#[test]
fn test_temperature_tolerance_edge() {
    assert!(temperature_only(2700, 60).equals(&temperature_only(2704, 60)));
    assert!(!temperature_only(2700, 60).equals(&temperature_only(2705, 60)));
    assert!(!temperature_only(2700, 60).equals(&temperature_only(2750, 60)));
}

#[test]
fn test_matching_color_wins_over_temperature() {
    let reference = LightState::new(Some(2700), Some(60));
    let mut observed = LightState::new(Some(2700), Some(60));
    // Estimated temperature is off, the reported chromaticity is exact
    observed.color_temperature = Some(2900);
    assert!(reference.equals(&observed));
}
