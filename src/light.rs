//! Reconciliation of one physical light with its schedule.
//!
//! Every tick the light is read, its phase is re-evaluated and, if kelvin owns
//! the light and it does not show the target yet, the target is written once.
//!
//! ## Phases
//!
//! ```text
//!  Unscheduled            (no schedule, never changes)
//!  NotTracking ──appear──► Initializing ──holds target──► Automatic
//!       ▲                       ▲                            │
//!       │                       └──── scene match ──── Manual ◄─ user change
//!       └──────── off or unreachable (from any tracking phase)
//! ```
//!
//! A light that appears is written the target repeatedly until it has shown
//! it continuously for the initialization period. Schedules without
//! `enable_when_lights_appear` leave a newly appeared light alone until it
//! shows the target on its own, which is what activating a kelvin scene does.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate};
use std::fmt;
use std::time::Duration;

use crate::config::ScheduleConfig;
use crate::gateway::{Capabilities, DeviceDescriptor, DeviceGateway};
use crate::geo::Location;
use crate::interval::Interval;
use crate::light_state::LightState;
use crate::logger::Log;
use crate::schedule::{IntervalError, Schedule};

/// Where a light stands in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightPhase {
    Unscheduled,
    NotTracking,
    Initializing,
    Automatic,
    Manual,
}

impl fmt::Display for LightPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LightPhase::Unscheduled => "unscheduled",
            LightPhase::NotTracking => "not tracking",
            LightPhase::Initializing => "initializing",
            LightPhase::Automatic => "automatic",
            LightPhase::Manual => "manual",
        };
        write!(f, "{}", name)
    }
}

pub struct Light {
    pub id: u32,
    pub name: String,
    pub capabilities: Capabilities,
    device: Box<dyn DeviceGateway>,

    schedule_config: Option<ScheduleConfig>,
    location: Option<Location>,
    schedule: Option<Schedule>,
    interval: Option<Interval>,

    pub reachable: bool,
    pub on: bool,
    tracking: bool,
    automatic: bool,
    initializing: bool,
    /// Start of the current run of ticks in which the light showed the target
    stable_since: Option<DateTime<Local>>,
    initialization: Duration,

    /// Target for this moment, in user units
    pub target: LightState,
    /// Last observation
    pub observed: LightState,
    /// What the device should report after the last write
    pub written: Option<LightState>,
}

impl Light {
    /// Create a light from its bridge descriptor.
    ///
    /// # Arguments
    /// * `descriptor` - Name, capabilities and initial attributes
    /// * `device` - Gateway the light is read and written through
    /// * `schedule_config` - The light's schedule, `None` for an unscheduled light
    /// * `location` - Coordinates used to rebuild the schedule each day
    /// * `initialization` - How long a light must show the target before it counts as settled
    pub fn new(
        descriptor: &DeviceDescriptor,
        device: Box<dyn DeviceGateway>,
        schedule_config: Option<ScheduleConfig>,
        location: Option<Location>,
        initialization: Duration,
    ) -> Self {
        let observed = LightState::from_observation(&descriptor.state, &descriptor.capabilities);
        Self {
            id: descriptor.id,
            name: descriptor.name.clone(),
            capabilities: descriptor.capabilities,
            device,
            schedule_config,
            location,
            schedule: None,
            interval: None,
            reachable: descriptor.state.reachable,
            on: descriptor.state.on,
            tracking: false,
            automatic: false,
            initializing: false,
            stable_since: None,
            initialization,
            target: LightState::unset(),
            observed,
            written: None,
        }
    }

    /// Use a prebuilt schedule instead of computing one from the location.
    pub fn with_schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = Some(schedule);
        self
    }

    pub fn is_scheduled(&self) -> bool {
        self.schedule_config.is_some() || self.schedule.is_some()
    }

    pub fn schedule(&self) -> Option<&Schedule> {
        self.schedule.as_ref()
    }

    /// Whether the current target lies within what the device can show.
    pub fn target_is_valid(&self) -> bool {
        self.target.is_valid(self.capabilities.temperature_range.min)
    }

    pub fn interval(&self) -> Option<&Interval> {
        self.interval.as_ref()
    }

    pub fn phase(&self) -> LightPhase {
        if !self.is_scheduled() {
            LightPhase::Unscheduled
        } else if !self.tracking {
            LightPhase::NotTracking
        } else if self.initializing {
            LightPhase::Initializing
        } else if self.automatic {
            LightPhase::Automatic
        } else {
            LightPhase::Manual
        }
    }

    fn enable_when_lights_appear(&self) -> bool {
        match (&self.schedule, &self.schedule_config) {
            (Some(schedule), _) => schedule.enable_when_lights_appear,
            (None, Some(config)) => config.enable_when_lights_appear,
            (None, None) => false,
        }
    }

    /// Build the schedule for `date` from the configured location.
    pub fn rebuild_schedule(&mut self, date: NaiveDate) -> Result<()> {
        let config = self
            .schedule_config
            .as_ref()
            .with_context(|| format!("Light {} has no schedule to rebuild", self.name))?;
        let location = self
            .location
            .as_ref()
            .context("No location configured to calculate sunrise and sunset")?;

        let schedule = Schedule::for_location(config, location, date)?;
        Log::log_light_debug(
            &self.name,
            &format!(
                "Schedule {} for {}: sunrise {}, sunset {}",
                schedule.name,
                date,
                schedule.sunrise.time.format("%H:%M"),
                schedule.sunset.time.format("%H:%M")
            ),
        );
        self.schedule = Some(schedule);
        Ok(())
    }

    /// Recalculate the interval and the target for `now`.
    ///
    /// A schedule from another day is rebuilt. If that fails the previous
    /// target is kept and the rebuild is attempted again on the next call.
    ///
    /// # Returns
    /// * `Ok(())` - Target is current, or held after a failed rebuild
    /// * `Err(IntervalError::Unbracketed)` - The schedule cannot serve `now`
    pub fn update_target(&mut self, now: DateTime<Local>) -> Result<(), IntervalError> {
        if !self.is_scheduled() {
            return Ok(());
        }

        if self.schedule.as_ref().is_none_or(|schedule| !schedule.is_current(now)) {
            if let Err(e) = self.rebuild_schedule(now.date_naive()) {
                Log::log_light_warning(
                    &self.name,
                    &format!("Could not rebuild schedule, keeping {}: {:#}", self.target, e),
                );
                return Ok(());
            }
        }

        let Some(schedule) = self.schedule.as_ref() else {
            return Ok(());
        };

        let interval = match schedule.current_interval(now) {
            Ok(interval) => interval,
            Err(IntervalError::StaleSchedule { .. }) => {
                Log::log_light_warning(
                    &self.name,
                    &format!("Schedule is stale, keeping {}", self.target),
                );
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        if self.interval.as_ref() != Some(&interval) {
            Log::log_light_debug(&self.name, &format!("New interval {}", interval));
        }

        let target = interval.light_state_at(now);
        if !target.is_valid(self.capabilities.temperature_range.min) {
            Log::log_light_warning(
                &self.name,
                &format!("Calculated target {} is outside what the light supports", target),
            );
        }
        if target != self.target {
            Log::log_light_debug(&self.name, &format!("Target is now {}", target));
        }

        self.target = target;
        self.interval = Some(interval);
        Ok(())
    }

    /// Read the device and remember what it reports.
    pub fn refresh(&mut self) -> Result<()> {
        let state = self
            .device
            .read_state()
            .with_context(|| format!("Failed to read state of light {}", self.name))?;
        self.reachable = state.reachable;
        self.on = state.on;
        self.observed = LightState::from_observation(&state, &self.capabilities);
        Ok(())
    }

    /// Run one reconciliation tick.
    ///
    /// # Returns
    /// * `Ok(true)` - The target was written
    /// * `Ok(false)` - Nothing to write
    /// * `Err(_)` - Reading or writing the device failed
    pub fn update(&mut self, now: DateTime<Local>, transition: Duration) -> Result<bool> {
        self.refresh()?;

        if !self.is_scheduled() {
            return Ok(false);
        }

        if !self.reachable || !self.on {
            if self.tracking {
                Log::log_light(
                    &self.name,
                    "No longer reachable or turned on. Clearing state.",
                );
                self.stop_tracking();
            }
            return Ok(false);
        }

        if !self.tracking {
            self.tracking = true;
            if self.enable_when_lights_appear() {
                Log::log_light(
                    &self.name,
                    &format!("Light just appeared. Initializing state to {}", self.target),
                );
                self.start_initializing();
            } else {
                Log::log_light(
                    &self.name,
                    "Light just appeared. Waiting for a kelvin scene before taking over.",
                );
                self.automatic = false;
            }
        }

        let expected = self.target.quantized(&self.capabilities);

        if self.initializing {
            if expected.equals(&self.observed) {
                let since = *self.stable_since.get_or_insert(now);
                if elapsed(since, now) >= self.initialization {
                    Log::log_light(
                        &self.name,
                        &format!("Initialized to {}. Switching to automatic mode.", self.observed),
                    );
                    self.initializing = false;
                    self.automatic = true;
                    self.stable_since = None;
                    self.written = Some(expected);
                }
                return Ok(false);
            }
            self.stable_since = None;
            self.write(expected, transition)?;
            return Ok(true);
        }

        if !self.automatic {
            if !self.target.is_unset() && expected.equals(&self.observed) {
                Log::log_light(
                    &self.name,
                    "Shows the current target, assuming a kelvin scene. Taking over.",
                );
                self.start_initializing();
                self.stable_since = Some(now);
                self.written = Some(expected);
            }
            return Ok(false);
        }

        if let Some(written) = self.written {
            if !written.equals(&self.observed) {
                Log::log_light(
                    &self.name,
                    &format!(
                        "Manually changed (expected {}, found {}). Pausing automatic mode.",
                        written, self.observed
                    ),
                );
                self.automatic = false;
                return Ok(false);
            }
        }

        if expected.equals(&self.observed) {
            return Ok(false);
        }

        Log::log_light(&self.name, &format!("Updating to {}", self.target));
        self.write(expected, transition)?;
        Ok(true)
    }

    fn start_initializing(&mut self) {
        self.initializing = true;
        self.automatic = false;
        self.stable_since = None;
    }

    fn stop_tracking(&mut self) {
        self.tracking = false;
        self.automatic = false;
        self.initializing = false;
        self.stable_since = None;
        self.written = None;
    }

    fn write(&mut self, expected: LightState, transition: Duration) -> Result<()> {
        let ack = self
            .device
            .write_state(self.target.color_temperature, self.target.brightness, transition)
            .with_context(|| format!("Failed to update light {}", self.name))?;

        if ack.is_empty() {
            Log::log_light_warning(&self.name, "Bridge acknowledged none of the written values");
        } else {
            Log::log_light_debug(&self.name, &format!("Bridge acknowledged {:?}", ack));
        }

        self.written = Some(expected);
        Ok(())
    }
}

fn elapsed(since: DateTime<Local>, now: DateTime<Local>) -> Duration {
    (now - since).to_std().unwrap_or(Duration::ZERO)
}

impl fmt::Debug for Light {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Light")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("phase", &self.phase())
            .field("target", &self.target)
            .field("observed", &self.observed)
            .field("written", &self.written)
            .finish()
    }
}
