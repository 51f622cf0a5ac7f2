//! Keeps bridge scenes named after a schedule in step with its target.
//!
//! A scene whose name contains "kelvin" and the name of a schedule (case
//! insensitive, e.g. "Kelvin Evening" for schedule "evening") gets the
//! schedule's lights as members and the schedule's current target as their
//! state. Activating it from any Hue app then puts the lights into a state the
//! reconciliation recognises, and kelvin takes over.

use anyhow::Result;
use chrono::{DateTime, Local};
use std::collections::HashMap;

use crate::color::{TemperatureRange, brightness_to_device_units, temperature_to_device_units};
use crate::config::{Config, ScheduleConfig};
use crate::constants::SCENE_NAME_MARKER;
use crate::gateway::{BridgeGateway, SceneDescriptor, SceneLightState};
use crate::geo::Location;
use crate::light_state::LightState;
use crate::logger::Log;
use crate::schedule::Schedule;

/// Whether `scene_name` belongs to the schedule `schedule_name`.
pub fn scene_matches_schedule(scene_name: &str, schedule_name: &str) -> bool {
    let scene_name = scene_name.to_lowercase();
    scene_name.contains(SCENE_NAME_MARKER) && scene_name.contains(&schedule_name.to_lowercase())
}

/// Stored scene state for a target.
///
/// Brightness zero stores the lights as off.
pub fn scene_light_state(target: &LightState) -> SceneLightState {
    let range = TemperatureRange::DEFAULT;
    SceneLightState {
        on: target.brightness != Some(0),
        color_temperature: target
            .color_temperature
            .map(|kelvin| temperature_to_device_units(kelvin, range)),
        chromaticity: target.chromaticity.map(|xy| xy.rounded()),
        brightness: target
            .brightness
            .filter(|percent| *percent > 0)
            .map(brightness_to_device_units),
    }
}

/// Synchronizes scenes on every target cadence.
pub struct SceneSync {
    location: Location,
    schedules: HashMap<String, Schedule>,
}

impl SceneSync {
    pub fn new(location: Location) -> Self {
        Self {
            location,
            schedules: HashMap::new(),
        }
    }

    /// Update every managed scene for `now`.
    ///
    /// Failures of single scenes are logged and do not stop the others.
    pub fn sync(
        &mut self,
        bridge: &dyn BridgeGateway,
        config: &Config,
        now: DateTime<Local>,
    ) -> Result<()> {
        let scenes = bridge.list_scenes()?;
        for scene in scenes
            .iter()
            .filter(|scene| scene.name.to_lowercase().contains(SCENE_NAME_MARKER))
        {
            for schedule_config in config
                .schedules
                .iter()
                .filter(|schedule| scene_matches_schedule(&scene.name, &schedule.name))
            {
                if let Err(e) = self.update_scene(bridge, scene, schedule_config, now) {
                    Log::log_warning(&format!(
                        "Scene {} - Update for schedule {} failed: {:#}",
                        scene.name, schedule_config.name, e
                    ));
                }
            }
        }
        Ok(())
    }

    fn target_for(&mut self, config: &ScheduleConfig, now: DateTime<Local>) -> Result<LightState> {
        let current = self
            .schedules
            .get(&config.name)
            .filter(|schedule| schedule.is_current(now))
            .cloned();
        let schedule = match current {
            Some(schedule) => schedule,
            None => {
                let schedule = Schedule::for_location(config, &self.location, now.date_naive())?;
                self.schedules.insert(config.name.clone(), schedule.clone());
                schedule
            }
        };
        let interval = schedule.current_interval(now)?;
        Ok(interval.light_state_at(now))
    }

    fn update_scene(
        &mut self,
        bridge: &dyn BridgeGateway,
        scene: &SceneDescriptor,
        config: &ScheduleConfig,
        now: DateTime<Local>,
    ) -> Result<()> {
        if config.associated_device_ids.is_empty() {
            return Ok(());
        }

        let target = self.target_for(config, now)?;
        let state = scene_light_state(&target);
        Log::log_debug(&format!(
            "Scene {} - Storing {} for {} light(s)",
            scene.name,
            target,
            config.associated_device_ids.len()
        ));
        bridge.update_scene(scene, &config.associated_device_ids, &state)
    }
}
