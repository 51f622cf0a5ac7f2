//! Philips Hue implementation of the gateway traits.
//!
//! All handles created from one [`HueBridge`] share a single connection
//! object. Its throttle serializes calls so that consecutive requests to the
//! bridge are at least `bridge_delay_ms` apart, no matter which light task
//! issues them. The bridge drops commands that arrive in bursts.
//!
//! Light handles read from a shared [`StateSnapshot`] refreshed by one
//! `GET /lights` per poll interval, so a tick costs one request for all lights
//! instead of one per light.

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::color::{brightness_to_device_units, temperature_to_chromaticity, temperature_to_device_units};
use crate::config::BridgeConfig;
use crate::constants::{DEFAULT_RECONCILE_INTERVAL_SECS, MAXIMUM_DEVICE_TEMP, MINIMUM_DEVICE_TEMP};
use crate::gateway::{
    BridgeGateway, Capabilities, DeviceDescriptor, DeviceGateway, DeviceState, SceneDescriptor,
    SceneLightState, StateSnapshot, WriteAck,
};
use crate::logger::Log;

pub mod http;
pub mod model;

use http::HttpClient;
use model::{
    HueLightJson, HueModifySceneJson, HueResultJson, HueSceneJson, HueSetStateJson,
    errors_from_results, write_ack_from_results,
};

struct BridgeConnection {
    client: HttpClient,
    username: String,
    delay: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl BridgeConnection {
    /// Wait until the minimum delay since the previous call has passed.
    ///
    /// The lock is held until the caller's request has been issued, so two
    /// tasks can never slip in between the wait and the request.
    fn throttle(&self) -> std::sync::MutexGuard<'_, Option<Instant>> {
        let mut last_call = match self.last_call.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(last) = *last_call {
            let elapsed = last.elapsed();
            if elapsed < self.delay {
                thread::sleep(self.delay - elapsed);
            }
        }
        last_call
    }

    fn api_path(&self, resource: &str) -> String {
        format!("/api/{}/{}", self.username, resource)
    }

    fn get<T: DeserializeOwned>(&self, resource: &str) -> Result<T> {
        let body = {
            let mut last_call = self.throttle();
            let body = self.client.get(&self.api_path(resource));
            *last_call = Some(Instant::now());
            body?
        };
        check_api_errors(&body)?;
        serde_json::from_str(&body)
            .with_context(|| format!("Unexpected answer from bridge for {}", resource))
    }

    fn put<B: Serialize>(&self, resource: &str, body: &B) -> Result<Vec<HueResultJson>> {
        let payload = serde_json::to_string(body).context("Failed to encode request")?;
        let answer = {
            let mut last_call = self.throttle();
            let answer = self.client.put(&self.api_path(resource), &payload);
            *last_call = Some(Instant::now());
            answer?
        };
        serde_json::from_str(&answer)
            .with_context(|| format!("Unexpected answer from bridge for {}", resource))
    }
}

/// Reads of unknown resources or with a bad username answer 200 with a list of errors.
fn check_api_errors(body: &str) -> Result<()> {
    if !body.trim_start().starts_with('[') {
        return Ok(());
    }
    if let Ok(results) = serde_json::from_str::<Vec<HueResultJson>>(body) {
        if let Some(error) = errors_from_results(&results).first() {
            anyhow::bail!(
                "Bridge reported error {} for {}: {}",
                error.error_type,
                error.address,
                error.description
            );
        }
    }
    Ok(())
}

fn parse_light_id(id: &str) -> Option<u32> {
    id.parse::<u32>().ok()
}

fn read_lights(connection: &BridgeConnection) -> Result<Vec<(u32, HueLightJson)>> {
    let lights: HashMap<String, HueLightJson> = connection.get("lights")?;
    let mut lights: Vec<(u32, HueLightJson)> = lights
        .into_iter()
        .filter_map(|(id, light)| parse_light_id(&id).map(|id| (id, light)))
        .collect();
    lights.sort_by_key(|(id, _)| *id);
    Ok(lights)
}

fn read_states(connection: &BridgeConnection) -> Result<HashMap<u32, DeviceState>> {
    Ok(read_lights(connection)?
        .into_iter()
        .map(|(id, light)| (id, light.state.to_device_state()))
        .collect())
}

/// Connection to one Hue bridge.
#[derive(Clone)]
pub struct HueBridge {
    connection: Arc<BridgeConnection>,
    snapshot: Arc<StateSnapshot>,
}

impl HueBridge {
    /// Connect to the bridge described by `config` and verify the credentials.
    ///
    /// # Arguments
    /// * `config` - Bridge address and username
    /// * `delay` - Minimum spacing of bridge calls
    pub fn connect(config: &BridgeConfig, delay: Duration) -> Result<Self> {
        let ip = config
            .ip
            .as_deref()
            .filter(|ip| !ip.trim().is_empty())
            .context("No bridge IP configured. Set 'ip' in the [bridge] section.")?;
        let username = config
            .username
            .as_deref()
            .filter(|username| !username.trim().is_empty())
            .context("No bridge username configured. Set 'username' in the [bridge] section.")?;

        let bridge = Self {
            connection: Arc::new(BridgeConnection {
                client: HttpClient::new(ip),
                username: username.trim().to_string(),
                delay,
                last_call: Mutex::new(None),
            }),
            snapshot: Arc::new(StateSnapshot::new(Duration::from_secs(
                DEFAULT_RECONCILE_INTERVAL_SECS,
            ))),
        };

        bridge
            .connection
            .get::<serde_json::Value>("config")
            .with_context(|| format!("Failed to connect to bridge at {}", ip))?;
        Log::log_decorated(&format!("Connected to bridge at {}", bridge.connection.client.host()));

        Ok(bridge)
    }

    /// Poll all lights at most once per `interval`, normally the reconcile interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.snapshot = Arc::new(StateSnapshot::new(interval));
        self
    }
}

impl BridgeGateway for HueBridge {
    fn list_devices(&self) -> Result<Vec<DeviceDescriptor>> {
        Ok(read_lights(&self.connection)?
            .into_iter()
            .map(|(id, light)| DeviceDescriptor {
                id,
                capabilities: Capabilities::from_device_type(&light.light_type),
                state: light.state.to_device_state(),
                name: light.name,
                device_type: light.light_type,
            })
            .collect())
    }

    fn read_all_states(&self) -> Result<HashMap<u32, DeviceState>> {
        let states = read_states(&self.connection)?;
        self.snapshot.store(states.clone());
        Ok(states)
    }

    fn device(&self, id: u32, capabilities: Capabilities) -> Box<dyn DeviceGateway> {
        Box::new(HueLight {
            id,
            capabilities,
            connection: Arc::clone(&self.connection),
            snapshot: Arc::clone(&self.snapshot),
        })
    }

    fn list_scenes(&self) -> Result<Vec<SceneDescriptor>> {
        let scenes: HashMap<String, HueSceneJson> = self.connection.get("scenes")?;
        let mut scenes: Vec<SceneDescriptor> = scenes
            .into_iter()
            .map(|(id, scene)| SceneDescriptor {
                id,
                name: scene.name,
                lights: scene
                    .lights
                    .iter()
                    .filter_map(|light| parse_light_id(light))
                    .collect(),
            })
            .collect();
        scenes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(scenes)
    }

    fn update_scene(
        &self,
        scene: &SceneDescriptor,
        lights: &[u32],
        state: &SceneLightState,
    ) -> Result<()> {
        let members = HueModifySceneJson {
            lights: lights.iter().map(|id| id.to_string()).collect(),
        };
        let results = self.connection.put(&format!("scenes/{}", scene.id), &members)?;
        if let Some(error) = errors_from_results(&results).first() {
            anyhow::bail!(
                "Failed to update members of scene {}: {}",
                scene.name,
                error.description
            );
        }

        let light_state = HueSetStateJson {
            on: Some(state.on),
            bri: state.brightness,
            ct: state.color_temperature,
            xy: state.chromaticity.map(|xy| [xy.x, xy.y]),
            transitiontime: None,
        };
        for light in lights {
            let results = self.connection.put(
                &format!("scenes/{}/lightstates/{}", scene.id, light),
                &light_state,
            )?;
            if let Some(error) = errors_from_results(&results).first() {
                anyhow::bail!(
                    "Failed to update light {} in scene {}: {}",
                    light,
                    scene.name,
                    error.description
                );
            }
        }
        Ok(())
    }
}

/// Handle for one light on a [`HueBridge`].
pub struct HueLight {
    id: u32,
    capabilities: Capabilities,
    connection: Arc<BridgeConnection>,
    snapshot: Arc<StateSnapshot>,
}

impl HueLight {
    /// Translate a target into the bridge's write body.
    ///
    /// Color temperature goes out as xy to color lights and as mired to
    /// temperature lights; capable lights get both and the bridge picks. A
    /// brightness of zero switches the light off instead of dimming it.
    fn build_state(
        &self,
        color_temperature: Option<u32>,
        brightness: Option<u8>,
        transition: Duration,
    ) -> HueSetStateJson {
        let range = self.capabilities.temperature_range;
        let mut body = HueSetStateJson {
            transitiontime: Some(transition_units(transition)),
            ..Default::default()
        };

        if let Some(kelvin) = color_temperature {
            let clamped = range.clamp(kelvin);
            if self.capabilities.color {
                let xy = temperature_to_chromaticity(clamped).rounded();
                body.xy = Some([xy.x, xy.y]);
            }
            if self.capabilities.color_temperature {
                body.ct = Some(temperature_to_device_units(clamped, range));
            }
        }

        match brightness {
            Some(0) => body.on = Some(false),
            Some(percent) if self.capabilities.dimmable => {
                body.bri = Some(brightness_to_device_units(percent))
            }
            _ => {}
        }

        body
    }
}

/// Hue transition times count in 100ms steps.
fn transition_units(transition: Duration) -> u16 {
    u16::try_from(transition.as_millis() / 100).unwrap_or(u16::MAX)
}

impl DeviceGateway for HueLight {
    fn id(&self) -> u32 {
        self.id
    }

    fn read_state(&mut self) -> Result<DeviceState> {
        let connection = &self.connection;
        self.snapshot
            .state_of(self.id, || read_states(connection))?
            .with_context(|| format!("Light {} is no longer known to the bridge", self.id))
    }

    fn write_state(
        &mut self,
        color_temperature: Option<u32>,
        brightness: Option<u8>,
        transition: Duration,
    ) -> Result<WriteAck> {
        if let Some(kelvin) = color_temperature {
            if !(MINIMUM_DEVICE_TEMP..=MAXIMUM_DEVICE_TEMP).contains(&kelvin) {
                Log::log_warning(&format!(
                    "Light {} - Color temperature {}K is outside {}K-{}K",
                    self.id, kelvin, MINIMUM_DEVICE_TEMP, MAXIMUM_DEVICE_TEMP
                ));
            }
        }

        let body = self.build_state(color_temperature, brightness, transition);
        if body.on.is_none() && body.bri.is_none() && body.ct.is_none() && body.xy.is_none() {
            return Ok(WriteAck::default());
        }

        let results = self
            .connection
            .put(&format!("lights/{}/state", self.id), &body)
            .inspect_err(|_| self.snapshot.invalidate())?;
        for error in errors_from_results(&results) {
            Log::log_warning(&format!(
                "Light {} - Bridge rejected {}: {}",
                self.id, error.address, error.description
            ));
        }

        // Let the transition finish so the next read sees the final values
        thread::sleep(transition);
        self.snapshot.invalidate();

        Ok(write_ack_from_results(&results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn light(device_type: &str) -> HueLight {
        HueLight {
            id: 1,
            capabilities: Capabilities::from_device_type(device_type),
            connection: Arc::new(BridgeConnection {
                client: HttpClient::new("127.0.0.1"),
                username: "user".to_string(),
                delay: Duration::ZERO,
                last_call: Mutex::new(None),
            }),
            snapshot: Arc::new(StateSnapshot::new(Duration::ZERO)),
        }
    }

    #[test]
    fn test_extended_color_light_gets_both_encodings() {
        let body = light("Extended Color Light").build_state(
            Some(2700),
            Some(50),
            Duration::from_secs(1),
        );
        assert_eq!(body.ct, Some(370));
        assert!(body.xy.is_some());
        assert_eq!(body.bri, Some(127));
        assert_eq!(body.on, None);
        assert_eq!(body.transitiontime, Some(10));
    }

    #[test]
    fn test_ambiance_light_is_clamped_to_its_range() {
        let body = light("Color Temperature Light").build_state(Some(2000), None, Duration::ZERO);
        assert_eq!(body.ct, Some(455));
        assert_eq!(body.xy, None);
        assert_eq!(body.bri, None);
    }

    #[test]
    fn test_zero_brightness_turns_off() {
        let body = light("Dimmable Light").build_state(Some(2700), Some(0), Duration::ZERO);
        assert_eq!(body.on, Some(false));
        assert_eq!(body.bri, None);
        assert_eq!(body.ct, None);
    }

    #[test]
    fn test_api_errors_in_read_answers() {
        let body = r#"[{"error": {"type": 1, "address": "/", "description": "unauthorized user"}}]"#;
        assert!(check_api_errors(body).is_err());
        assert!(check_api_errors(r#"{"name": "Bridge"}"#).is_ok());
    }

    #[test]
    fn test_throttle_spaces_calls() {
        let light = light("Dimmable Light");
        let connection = BridgeConnection {
            delay: Duration::from_millis(50),
            client: light.connection.client.clone(),
            username: String::new(),
            last_call: Mutex::new(Some(Instant::now())),
        };
        let start = Instant::now();
        drop(connection.throttle());
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn test_transition_units() {
        assert_eq!(transition_units(Duration::from_secs(1)), 10);
        assert_eq!(transition_units(Duration::from_millis(250)), 2);
        assert_eq!(transition_units(Duration::ZERO), 0);
    }
}
