//! JSON shapes of the Hue REST API (v1).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::color::Chromaticity;
use crate::gateway::{ColorMode, DeviceState, WriteAck};

/// One entry of `GET /api/<user>/lights`.
#[derive(Debug, Deserialize)]
pub struct HueLightJson {
    pub name: String,
    #[serde(rename = "type")]
    pub light_type: String,
    pub state: HueStateJson,
}

#[derive(Debug, Deserialize)]
pub struct HueStateJson {
    #[serde(default)]
    pub on: bool,
    pub bri: Option<u8>,
    pub ct: Option<u16>,
    pub xy: Option<Vec<f64>>,
    pub colormode: Option<String>,
    #[serde(default = "default_reachable")]
    pub reachable: bool,
}

fn default_reachable() -> bool {
    true
}

impl HueStateJson {
    pub fn to_device_state(&self) -> DeviceState {
        DeviceState {
            on: self.on,
            reachable: self.reachable,
            color_mode: self.colormode.as_deref().and_then(ColorMode::from_bridge),
            color_temperature: self.ct,
            chromaticity: self.xy.as_deref().and_then(chromaticity_from_slice),
            brightness: self.bri,
        }
    }
}

fn chromaticity_from_slice(values: &[f64]) -> Option<Chromaticity> {
    match values {
        [x, y] => Some(Chromaticity::new(*x, *y)),
        _ => None,
    }
}

/// Body of `PUT /api/<user>/lights/<id>/state` and of a scene light state.
#[derive(Debug, Default, Serialize, PartialEq)]
pub struct HueSetStateJson {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bri: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ct: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xy: Option<[f64; 2]>,
    /// Multiples of 100ms
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transitiontime: Option<u16>,
}

/// One element of the list the bridge answers every write with.
#[derive(Debug, Deserialize)]
pub struct HueResultJson {
    pub success: Option<HashMap<String, serde_json::Value>>,
    pub error: Option<HueErrorJson>,
}

#[derive(Debug, Deserialize)]
pub struct HueErrorJson {
    #[serde(rename = "type")]
    pub error_type: i64,
    pub address: String,
    pub description: String,
}

/// Collect what the bridge acknowledged, keyed by the last path segment
/// (`/lights/1/state/bri` -> `bri`).
pub fn write_ack_from_results(results: &[HueResultJson]) -> WriteAck {
    let mut ack = WriteAck::default();
    for success in results.iter().filter_map(|result| result.success.as_ref()) {
        for (address, value) in success {
            match address.rsplit('/').next() {
                Some("on") => ack.on = value.as_bool(),
                Some("bri") => ack.brightness = value.as_u64().and_then(|v| u8::try_from(v).ok()),
                Some("ct") => {
                    ack.color_temperature = value.as_u64().and_then(|v| u16::try_from(v).ok())
                }
                Some("xy") => {
                    ack.chromaticity = value.as_array().and_then(|values| {
                        let values: Vec<f64> = values.iter().filter_map(|v| v.as_f64()).collect();
                        chromaticity_from_slice(&values)
                    })
                }
                _ => {}
            }
        }
    }
    ack
}

/// Errors the bridge reported inside a successful HTTP response.
pub fn errors_from_results(results: &[HueResultJson]) -> Vec<&HueErrorJson> {
    results.iter().filter_map(|result| result.error.as_ref()).collect()
}

/// One entry of `GET /api/<user>/scenes`.
#[derive(Debug, Deserialize)]
pub struct HueSceneJson {
    pub name: String,
    #[serde(default)]
    pub lights: Vec<String>,
}

/// Body of `PUT /api/<user>/scenes/<id>`.
#[derive(Debug, Serialize)]
pub struct HueModifySceneJson {
    pub lights: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lights() {
        let json = r#"{
            "1": {"name": "Desk", "type": "Extended Color Light",
                  "state": {"on": true, "bri": 254, "ct": 366, "xy": [0.4578, 0.41],
                            "colormode": "ct", "reachable": true}},
            "2": {"name": "Plug", "type": "On/Off plug-in unit",
                  "state": {"on": false, "reachable": false}}
        }"#;
        let lights: HashMap<String, HueLightJson> = serde_json::from_str(json).unwrap();
        let desk = lights["1"].state.to_device_state();
        assert!(desk.on);
        assert_eq!(desk.color_mode, Some(ColorMode::ColorTemperature));
        assert_eq!(desk.color_temperature, Some(366));
        assert_eq!(desk.chromaticity, Some(Chromaticity::new(0.4578, 0.41)));
        assert_eq!(desk.brightness, Some(254));

        let plug = lights["2"].state.to_device_state();
        assert!(!plug.reachable);
        assert_eq!(plug.brightness, None);
    }

    #[test]
    fn test_set_state_skips_unset_channels() {
        let body = HueSetStateJson {
            bri: Some(127),
            transitiontime: Some(10),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"bri":127,"transitiontime":10}"#
        );
    }

    #[test]
    fn test_write_ack_from_results() {
        let json = r#"[
            {"success": {"/lights/1/state/bri": 127}},
            {"success": {"/lights/1/state/ct": 366}},
            {"success": {"/lights/1/state/xy": [0.4578, 0.41]}},
            {"error": {"type": 201, "address": "/lights/1/state/bri",
                       "description": "parameter, bri, is not modifiable. Device is set to off."}}
        ]"#;
        let results: Vec<HueResultJson> = serde_json::from_str(json).unwrap();
        let ack = write_ack_from_results(&results);
        assert_eq!(ack.brightness, Some(127));
        assert_eq!(ack.color_temperature, Some(366));
        assert_eq!(ack.chromaticity, Some(Chromaticity::new(0.4578, 0.41)));
        assert_eq!(ack.on, None);

        let errors = errors_from_results(&results);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].error_type, 201);
    }
}
