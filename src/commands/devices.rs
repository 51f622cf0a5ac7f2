//! Implementation of the --devices command.
//!
//! Lists every device on the bridge with its capabilities and current state,
//! so the ids for `associated_device_ids` can be looked up.

use anyhow::Result;

use crate::config::Config;
use crate::gateway::hue::HueBridge;
use crate::gateway::{BridgeGateway, DeviceDescriptor};
use crate::light_state::LightState;
use crate::logger::Log;

const HEADER: [&str; 9] = [
    "Name",
    "ID",
    "Reachable",
    "On",
    "Dimmable",
    "Temperature",
    "Color",
    "Current K",
    "Current %",
];

/// Handle the --devices command.
pub fn handle_devices_command(config: &Config) -> Result<()> {
    let bridge = HueBridge::connect(&config.bridge, config.behaviour.bridge_delay())?;
    let devices = bridge.list_devices()?;

    Log::log_block_start(&format!("{} device(s) on the bridge", devices.len()));
    Log::log_pipe();
    for line in device_table(&devices) {
        Log::log_indented(&line);
    }
    Log::log_end();
    Ok(())
}

fn yes_no(value: bool) -> String {
    if value { "yes" } else { "no" }.to_string()
}

/// Table cells for one device.
pub fn device_row(device: &DeviceDescriptor) -> Vec<String> {
    let caps = &device.capabilities;
    let current = LightState::from_observation(&device.state, caps);
    vec![
        device.name.clone(),
        device.id.to_string(),
        yes_no(device.state.reachable),
        yes_no(device.state.on),
        yes_no(caps.dimmable),
        yes_no(caps.color_temperature),
        yes_no(caps.color),
        current
            .color_temperature
            .map(|kelvin| kelvin.to_string())
            .unwrap_or_else(|| "-".to_string()),
        current
            .brightness
            .map(|percent| percent.to_string())
            .unwrap_or_else(|| "-".to_string()),
    ]
}

/// Render devices as aligned text lines, header first.
pub fn device_table(devices: &[DeviceDescriptor]) -> Vec<String> {
    let mut rows: Vec<Vec<String>> = vec![HEADER.iter().map(|cell| cell.to_string()).collect()];
    rows.extend(devices.iter().map(device_row));

    let mut widths = [0usize; HEADER.len()];
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    rows.iter()
        .map(|row| {
            row.iter()
                .zip(widths)
                .map(|(cell, width)| format!("{:<width$}", cell, width = width))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        })
        .collect()
}
