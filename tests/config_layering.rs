use meadow::config::{ConfigError, SceneConfig};
use serial_test::serial;

mod common;

fn clear_env() {
    unsafe {
        std::env::remove_var("MEADOW_FOG__DENSITY");
        std::env::remove_var("MEADOW_CAMERA__FOV");
    }
}

#[test]
#[serial]
fn missing_file_means_defaults() {
    clear_env();
    let config = SceneConfig::load_from("does/not/exist.toml").unwrap();
    assert_eq!(config, SceneConfig::default());
}

#[test]
#[serial]
fn file_overrides_defaults() {
    clear_env();
    let path = common::write_config(
        "file_overrides.toml",
        "[fog]\ndensity = 0.01\ncolor = \"#102030\"\n\n[window]\ntitle = \"field\"\n",
    );
    let config = SceneConfig::load_from(&path).unwrap();
    assert_eq!(config.fog.density, 0.01);
    assert_eq!(config.fog.color.to_hex(), 0x102030);
    assert_eq!(config.window.title, "field");
    assert_eq!(config.camera, SceneConfig::default().camera);
}

#[test]
#[serial]
fn environment_wins_over_file() {
    clear_env();
    let path = common::write_config("environment_wins.toml", "[fog]\ndensity = 0.01\n");
    unsafe {
        std::env::set_var("MEADOW_FOG__DENSITY", "0.2");
    }
    let config = SceneConfig::load_from(&path);
    clear_env();
    assert_eq!(config.unwrap().fog.density, 0.2);
}

#[test]
#[serial]
fn invalid_environment_value_is_rejected() {
    clear_env();
    unsafe {
        std::env::set_var("MEADOW_CAMERA__FOV", "0");
    }
    let result = SceneConfig::load_from("does/not/exist.toml");
    clear_env();
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}
