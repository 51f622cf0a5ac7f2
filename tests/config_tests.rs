use serial_test::serial;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

use kelvin::config::validate_config;
use kelvin::{Config, Log, ScheduleError};

fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("kelvin").join("kelvin.toml");
    fs::create_dir_all(config_path.parent().unwrap()).unwrap();
    fs::write(&config_path, content).unwrap();
    (temp_dir, config_path)
}

#[test]
#[serial]
fn test_default_config_is_created_in_xdg_config_home() {
    Log::set_enabled(false);
    let temp_dir = tempdir().unwrap();
    let previous = std::env::var_os("XDG_CONFIG_HOME");
    unsafe {
        std::env::set_var("XDG_CONFIG_HOME", temp_dir.path());
    }

    let result = Config::load(None);

    unsafe {
        match previous {
            Some(value) => std::env::set_var("XDG_CONFIG_HOME", value),
            None => std::env::remove_var("XDG_CONFIG_HOME"),
        }
    }

    let (config, path) = result.unwrap();
    assert_eq!(path, temp_dir.path().join("kelvin").join("kelvin.toml"));
    assert!(path.exists());
    assert_eq!(config.schedules.len(), 1);
    assert_eq!(config.schedules[0].name, "default");
    assert!(config.location().is_none());
    assert!(!config.bridge.is_configured());
}

#[test]
#[serial]
fn test_explicit_path_must_exist() {
    Log::set_enabled(false);
    let temp_dir = tempdir().unwrap();
    let missing = temp_dir.path().join("nowhere.toml");
    assert!(Config::load(Some(&missing)).is_err());
    assert!(!missing.exists());
}

#[test]
#[serial]
fn test_two_schedules_share_the_bridge() {
    Log::set_enabled(false);
    let (_temp_dir, path) = write_config(
        r#"
version = 1

[bridge]
ip = "192.168.1.20"
username = "abcdef0123456789"

[location]
latitude = 48.1374
longitude = 11.5755

[behaviour]
scenes = false
transition_seconds = 2

[[schedules]]
name = "living room"
associated_device_ids = [1, 2, 3]
enable_when_lights_appear = true
default_color_temperature = 4000
default_brightness = 100

[[schedules.after_sunset]]
time = "21:30"
color_temperature = 2200
brightness = 40

[[schedules]]
name = "hallway"
associated_device_ids = [7]
default_brightness = 80
"#,
    );

    let (config, loaded_from) = Config::load(Some(&path)).unwrap();
    assert_eq!(loaded_from, path);
    assert!(config.bridge.is_configured());
    assert!(!config.behaviour.scenes);
    assert_eq!(config.behaviour.transition_seconds, 2);
    assert_eq!(config.behaviour.reconcile_interval_seconds, 1);

    assert_eq!(config.schedule_for_light(2).unwrap().name, "living room");
    let hallway = config.schedule_for_light(7).unwrap();
    assert_eq!(hallway.default_color_temperature, None);
    assert!(!hallway.enable_when_lights_appear);
    assert_eq!(
        config.schedule_for_light(9),
        Err(ScheduleError::NotAssociated { light_id: 9 })
    );

    let location = config.require_location().unwrap();
    assert!((location.latitude - 48.1374).abs() < 1e-9);
}

#[test]
#[serial]
fn test_legacy_config_is_migrated_on_load() {
    Log::set_enabled(false);
    let (_temp_dir, path) = write_config(
        r#"
[location]
latitude = 52.52
longitude = 13.405

[[schedules]]
name = "bedroom"
associated_device_ids = [4]

[[schedules.before_sunrise]]
time = "6:15AM"
color_temperature = 2000
brightness = 30

[[schedules.after_sunset]]
time = "10:45PM"
color_temperature = 2000
brightness = 0
"#,
    );

    let config = Config::load_from_path(&path).unwrap();
    let bedroom = config.schedule_by_name("bedroom").unwrap();
    assert_eq!(config.version, 1);
    assert!(bedroom.enable_when_lights_appear);
    assert_eq!(bedroom.before_sunrise[0].time, "06:15");
    assert_eq!(bedroom.after_sunset[0].time, "22:45");

    // The file on disk stays as written
    assert!(fs::read_to_string(&path).unwrap().contains("10:45PM"));
}

#[test]
#[serial]
fn test_light_in_two_schedules_is_rejected() {
    Log::set_enabled(false);
    let (_temp_dir, path) = write_config(
        r#"
version = 1

[[schedules]]
name = "a"
associated_device_ids = [1, 2]

[[schedules]]
name = "b"
associated_device_ids = [2]
"#,
    );
    let error = Config::load_from_path(&path).unwrap_err();
    assert!(error.to_string().contains("Light 2"));
}

#[test]
fn test_default_config_validates() {
    assert!(validate_config(&Config::default()).is_ok());
}
