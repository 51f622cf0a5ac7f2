//! Implementation of the --simulate command.
//!
//! Prints the anchors of today's schedules at the configured location and the
//! interpolated target at fixed steps through the day, without touching any
//! device.

use anyhow::{Context, Result};
use chrono::{Duration, Local, NaiveDate, NaiveTime};

use crate::config::{Config, ScheduleConfig};
use crate::constants::SIMULATION_STEP_MINUTES;
use crate::geo::Location;
use crate::light_state::LightState;
use crate::logger::Log;
use crate::schedule::{IntervalError, Schedule};
use crate::utils::local_datetime;

/// One simulated point in time.
#[derive(Debug)]
pub struct SimulationStep {
    pub time: NaiveTime,
    pub target: Result<LightState, IntervalError>,
}

/// Handle the --simulate command.
///
/// # Arguments
/// * `config` - Loaded configuration
/// * `schedule_name` - Only simulate this schedule, all schedules if `None`
pub fn handle_simulate_command(config: &Config, schedule_name: Option<&str>) -> Result<()> {
    let location = config.require_location()?;
    let date = Local::now().date_naive();

    let schedules: Vec<&ScheduleConfig> = match schedule_name {
        Some(name) => vec![
            config
                .schedule_by_name(name)
                .with_context(|| format!("No schedule named '{}' in the configuration", name))?,
        ],
        None => config.schedules.iter().collect(),
    };

    Log::log_block_start(&format!("Simulating {} at {}", date.format("%Y-%m-%d"), location));
    for schedule_config in schedules {
        simulate_schedule(schedule_config, &location, date)?;
    }
    Log::log_end();
    Ok(())
}

fn simulate_schedule(config: &ScheduleConfig, location: &Location, date: NaiveDate) -> Result<()> {
    let schedule = Schedule::for_location(config, location, date)?;

    Log::log_block_start(&format!("Schedule {}", schedule.name));
    Log::log_decorated("Anchors:");
    for anchor in schedule.anchors() {
        Log::log_indented(&anchor.to_string());
    }

    Log::log_decorated(&format!("Targets every {} minutes:", SIMULATION_STEP_MINUTES));
    for step in simulation_steps(&schedule, SIMULATION_STEP_MINUTES) {
        let line = match step.target {
            Ok(target) => format!("{}  {}", step.time.format("%H:%M"), target),
            Err(e) => format!("{}  {}", step.time.format("%H:%M"), e),
        };
        Log::log_indented(&line);
    }
    Ok(())
}

/// Targets of `schedule` from midnight on, every `step_minutes`.
pub fn simulation_steps(schedule: &Schedule, step_minutes: u32) -> Vec<SimulationStep> {
    let step = Duration::minutes(i64::from(step_minutes.max(1)));
    let mut steps = Vec::new();
    let Some(mut time) = NaiveTime::from_hms_opt(0, 0, 0) else {
        return steps;
    };

    loop {
        if let Some(now) = local_datetime(schedule.date, time) {
            let target = schedule
                .current_interval(now)
                .map(|interval| interval.light_state_at(now));
            steps.push(SimulationStep { time, target });
        }

        let (next, wrapped) = time.overflowing_add_signed(step);
        if wrapped != 0 {
            break;
        }
        time = next;
    }
    steps
}
