//! The long running daemon: one task per scheduled light and a supervisor.
//!
//! Each light runs in its own thread with its own [`Ticker`]. The ticker drives
//! three cadences: reconciling the device (every second by default),
//! recalculating the target from the schedule (every minute) and rebuilding
//! the schedule when the calendar day turns over. Lights share nothing but
//! the read-only [`AppContext`] and the throttled bridge connection.
//!
//! The supervisor on the main thread keeps scenes in sync, and stops and
//! restarts all light tasks on a configuration reload.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::{BehaviourConfig, Config};
use crate::constants::CHECK_INTERVAL_MS;
use crate::gateway::BridgeGateway;
use crate::gateway::hue::HueBridge;
use crate::geo::Location;
use crate::light::Light;
use crate::logger::Log;
use crate::scenes::SceneSync;
use crate::schedule::{IntervalError, ScheduleError};
use crate::signals::{SignalMessage, SignalState};

/// Everything a light task may read. Nothing in here changes while the
/// tasks run; a reload builds a new context.
pub struct AppContext {
    pub config: Arc<Config>,
    pub location: Location,
    pub bridge: Arc<dyn BridgeGateway>,
}

impl AppContext {
    pub fn new(config: Config, bridge: Arc<dyn BridgeGateway>) -> Result<Self> {
        let location = config.require_location()?;
        Ok(Self {
            config: Arc::new(config),
            location,
            bridge,
        })
    }

    pub fn behaviour(&self) -> &BehaviourConfig {
        &self.config.behaviour
    }

    /// Create a [`Light`] for every scheduled, supported device.
    ///
    /// Devices without a schedule or without any capability kelvin uses are
    /// logged once and left out.
    pub fn create_lights(&self) -> Result<Vec<Light>> {
        let devices = self
            .bridge
            .list_devices()
            .context("Failed to list devices on the bridge")?;

        let mut lights = Vec::new();
        for descriptor in devices {
            if !descriptor.capabilities.is_supported() {
                Log::log_light(
                    &descriptor.name,
                    "Doesn't support any functionality we use. Excluding it from polling.",
                );
                continue;
            }

            let schedule = match self.config.schedule_for_light(descriptor.id) {
                Ok(schedule) => schedule.clone(),
                Err(e @ ScheduleError::NotAssociated { .. }) => {
                    Log::log_light(&descriptor.name, &format!("{}. Ignoring it.", e));
                    continue;
                }
            };

            let device = self.bridge.device(descriptor.id, descriptor.capabilities);
            lights.push(Light::new(
                &descriptor,
                device,
                Some(schedule),
                Some(self.location),
                self.behaviour().initialization(),
            ));
        }
        Ok(lights)
    }
}

/// A periodic action.
#[derive(Debug, Clone)]
pub struct Cadence {
    interval: Duration,
    last: Option<Instant>,
}

impl Cadence {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Whether the action is due at `instant`; marks it done if so.
    pub fn due(&mut self, instant: Instant) -> bool {
        let due = self
            .last
            .is_none_or(|last| instant.saturating_duration_since(last) >= self.interval);
        if due {
            self.last = Some(instant);
        }
        due
    }
}

/// What a light task should do on this pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickActions {
    pub new_day: bool,
    pub update_target: bool,
    pub reconcile: bool,
}

/// Drives the three cadences of a light task.
#[derive(Debug, Clone)]
pub struct Ticker {
    reconcile: Cadence,
    target: Cadence,
    date: Option<NaiveDate>,
}

impl Ticker {
    pub fn new(reconcile_interval: Duration, target_interval: Duration) -> Self {
        Self {
            reconcile: Cadence::new(reconcile_interval),
            target: Cadence::new(target_interval),
            date: None,
        }
    }

    /// Decide which actions are due.
    ///
    /// A new calendar day forces a target update as well.
    pub fn poll(&mut self, now: DateTime<Local>, instant: Instant) -> TickActions {
        let today = now.date_naive();
        let new_day = self.date.is_some_and(|date| date != today);
        self.date = Some(today);

        let mut update_target = self.target.due(instant);
        if new_day && !update_target {
            self.target.last = Some(instant);
            update_target = true;
        }

        TickActions {
            new_day,
            update_target,
            reconcile: self.reconcile.due(instant),
        }
    }
}

/// Sleep for `duration` in short steps, returning early once `active` clears.
fn sleep_while(active: &dyn Fn() -> bool, duration: Duration) {
    let step = Duration::from_millis(CHECK_INTERVAL_MS);
    let mut slept = Duration::ZERO;
    while slept < duration && active() {
        let chunk = step.min(duration - slept);
        thread::sleep(chunk);
        slept += chunk;
    }
}

/// What ended a pass of [`run_light_pass`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    Continue,
    /// The light's schedule cannot serve the current time; stop its task.
    Fatal,
}

/// Run the due actions for one light.
///
/// Device errors are logged and retried on the next reconcile tick.
pub fn run_light_pass(
    light: &mut Light,
    actions: TickActions,
    now: DateTime<Local>,
    transition: Duration,
) -> PassOutcome {
    if actions.new_day {
        Log::log_light(&light.name, "New day. Rebuilding schedule.");
        if let Err(e) = light.rebuild_schedule(now.date_naive()) {
            Log::log_light_warning(&light.name, &format!("Could not rebuild schedule: {:#}", e));
        }
    }

    if actions.update_target {
        if let Err(e @ IntervalError::Unbracketed { .. }) = light.update_target(now) {
            Log::log_critical(&format!(
                "Light {} - {}. Stopping automation for this light.",
                light.name, e
            ));
            return PassOutcome::Fatal;
        }
    }

    if actions.reconcile {
        if let Err(e) = light.update(now, transition) {
            Log::log_light_warning(&light.name, &format!("{:#}", e));
        }
    }

    PassOutcome::Continue
}

fn run_light_task(mut light: Light, behaviour: BehaviourConfig, active: Arc<AtomicBool>, running: Arc<AtomicBool>) {
    let is_active = || active.load(Ordering::SeqCst) && running.load(Ordering::SeqCst);
    let mut ticker = Ticker::new(behaviour.reconcile_interval(), behaviour.target_interval());
    let transition = behaviour.transition();

    Log::log_light_debug(&light.name, "Starting reconciliation");
    while is_active() {
        let actions = ticker.poll(Local::now(), Instant::now());
        // Take the time after the tick decision; a write may block for seconds
        if run_light_pass(&mut light, actions, Local::now(), transition) == PassOutcome::Fatal {
            return;
        }
        sleep_while(&is_active, Duration::from_millis(CHECK_INTERVAL_MS));
    }
    Log::log_light_debug(&light.name, "Stopped reconciliation");
}

/// A running set of light tasks sharing one stop flag.
pub struct Generation {
    active: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl Generation {
    /// List the lights of `context` and start a task for each.
    pub fn spawn(context: &AppContext, running: &Arc<AtomicBool>) -> Result<Self> {
        let lights = context.create_lights()?;
        Ok(Self::start(context, lights, running))
    }

    fn start(context: &AppContext, lights: Vec<Light>, running: &Arc<AtomicBool>) -> Self {
        let active = Arc::new(AtomicBool::new(true));
        let present = context
            .bridge
            .read_all_states()
            .map(|states| states.values().filter(|state| state.is_present()).count())
            .unwrap_or(0);

        Log::log_block_start(&format!(
            "Tracking {} light(s), {} light(s) on the bridge are currently on",
            lights.len(),
            present
        ));

        let mut handles = Vec::with_capacity(lights.len());
        for light in lights {
            let name = light.name.clone();
            let behaviour = context.behaviour().clone();
            let active = Arc::clone(&active);
            let running = Arc::clone(running);
            match thread::Builder::new()
                .name(format!("light-{}", light.id))
                .spawn(move || run_light_task(light, behaviour, active, running))
            {
                Ok(handle) => handles.push(handle),
                Err(e) => Log::log_light_warning(&name, &format!("Failed to start task: {}", e)),
            }
        }

        Self { active, handles }
    }

    /// Number of light tasks started.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Whether the tasks have not been told to stop.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Tell every task to stop and wait for them.
    pub fn stop(self) {
        self.active.store(false, Ordering::SeqCst);
        for handle in self.handles {
            if handle.join().is_err() {
                Log::log_error("A light task panicked");
            }
        }
    }
}

/// Replace the running light tasks with tasks for `new_context`.
///
/// The lights of the new configuration are listed before anything is stopped.
/// If that fails the current tasks keep running with the current context.
///
/// # Returns
/// The generation that is running afterwards
pub fn restart(
    generation: Generation,
    context: &mut AppContext,
    new_context: AppContext,
    running: &Arc<AtomicBool>,
) -> Generation {
    let lights = match new_context.create_lights() {
        Ok(lights) => lights,
        Err(e) => {
            Log::log_warning(&format!(
                "Failed to apply the new configuration, keeping the current one: {:#}",
                e
            ));
            return generation;
        }
    };

    Log::log_block_start("Restarting light tasks with the new configuration");
    generation.stop();
    *context = new_context;
    Generation::start(context, lights, running)
}

fn connect(config: &Config) -> Result<Arc<dyn BridgeGateway>> {
    let bridge = HueBridge::connect(&config.bridge, config.behaviour.bridge_delay())?
        .with_poll_interval(config.behaviour.reconcile_interval());
    Ok(Arc::new(bridge))
}

/// Run the daemon until a shutdown signal arrives.
///
/// # Arguments
/// * `config` - Loaded and validated configuration
/// * `config_path` - Where `config` came from, re-read on reload
/// * `signal_state` - Running flag and signal channel
pub fn run(config: Config, config_path: &Path, signal_state: &SignalState) -> Result<()> {
    let config_path: PathBuf = config_path.to_path_buf();
    let bridge = connect(&config)?;
    let mut context = AppContext::new(config, bridge)?;
    let mut generation = Generation::spawn(&context, &signal_state.running)?;
    let mut scenes = SceneSync::new(context.location);

    while signal_state.is_running() {
        let timeout = context.behaviour().target_interval();
        match signal_state.signal_receiver.recv_timeout(timeout) {
            Ok(SignalMessage::Shutdown) => break,
            Ok(SignalMessage::Reload) => match reload(&config_path) {
                Ok(new_context) => {
                    generation =
                        restart(generation, &mut context, new_context, &signal_state.running);
                    scenes = SceneSync::new(context.location);
                }
                Err(e) => {
                    Log::log_warning(&format!(
                        "Failed to reload configuration, keeping the current one: {:#}",
                        e
                    ));
                }
            },
            Err(RecvTimeoutError::Timeout) => {
                if context.behaviour().scenes {
                    if let Err(e) = scenes.sync(context.bridge.as_ref(), &context.config, Local::now()) {
                        Log::log_warning(&format!("Failed to update scenes: {:#}", e));
                    }
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    Log::log_block_start("Shutting down kelvin...");
    signal_state.request_shutdown();
    generation.stop();
    Ok(())
}

fn reload(config_path: &Path) -> Result<AppContext> {
    let config = Config::load_from_path(config_path)?;
    config.log_config(config_path);
    let bridge = connect(&config)?;
    AppContext::new(config, bridge)
}
