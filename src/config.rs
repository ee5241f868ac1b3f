//! Application configuration
//!
//! Configuration is loaded from multiple sources with the following priority (lowest to highest):
//! 1. Built-in defaults (the scene as it was designed)
//! 2. `meadow.toml` in the working directory (optional)
//! 3. Environment variables (`MEADOW_SECTION__KEY`)
//!
//! The web build has neither a working directory nor environment and always
//! uses the defaults.

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::scene::color::Color;

pub const DEFAULT_CONFIG_FILE: &str = "meadow.toml";
pub const ENV_PREFIX: &str = "MEADOW_";

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SceneConfig {
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub assets: AssetConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub animation: AnimationConfig,
    #[serde(default)]
    pub fog: FogConfig,
    #[serde(default)]
    pub stereo: StereoConfig,
}

impl SceneConfig {
    /// Load configuration from `meadow.toml` and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load configuration from a specific file, which may be missing.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if path.exists() {
            log::info!("Reading configuration from {}", path.display());
            figment = figment.merge(Toml::file(path));
        }

        // MEADOW_FOG__DENSITY=0.1 -> fog.density = 0.1
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    #[cfg(target_arch = "wasm32")]
    pub fn load_from<P: AsRef<Path>>(_path: P) -> Result<Self, ConfigError> {
        Ok(Self::default())
    }

    /// Parse a TOML document on top of the defaults, without touching the environment.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::string(toml))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let camera = &self.camera;
        if !(camera.fov > 0.0 && camera.fov < 180.0) {
            return Err(ConfigError::Invalid(format!(
                "camera.fov must be between 0 and 180 degrees, got {}",
                camera.fov
            )));
        }
        if !(camera.near > 0.0 && camera.far > camera.near) {
            return Err(ConfigError::Invalid(format!(
                "camera clip planes must satisfy 0 < near < far, got near={} far={}",
                camera.near, camera.far
            )));
        }
        if !(self.fog.density >= 0.0 && self.fog.density.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "fog.density must be a non-negative number, got {}",
                self.fog.density
            )));
        }
        if !(self.stereo.eye_separation >= 0.0 && self.stereo.eye_separation.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "stereo.eye_separation must be a non-negative number, got {}",
                self.stereo.eye_separation
            )));
        }
        if !(self.animation.spin_base_speed.is_finite() && self.animation.spin_speed_step.is_finite()) {
            return Err(ConfigError::Invalid("spin speeds must be finite".to_string()));
        }
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }
        Ok(())
    }
}

/// Window configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    pub title: String,
    /// Id of the canvas element the web build draws into.
    pub canvas_id: String,
    /// Initial inner size of the native window.
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "meadow".to_string(),
            canvas_id: "canvas".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Directory holding the textures and models (native only).
    pub root: String,
    /// Optional font file used for labels, relative to `root`.
    pub label_font: Option<String>,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            root: "assets".to_string(),
            label_font: None,
        }
    }
}

/// Camera configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Vertical field of view in degrees
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    /// Point the orbit controls circle around
    pub target: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov: 75.0,
            near: 0.1,
            far: 1000.0,
            position: [10.0, 10.0, 10.0],
            target: [0.0, 5.0, 0.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationConfig {
    /// Radians per second of the first spinning cube
    pub spin_base_speed: f32,
    /// Extra radians per second for each following cube
    pub spin_speed_step: f32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            spin_base_speed: 10.0,
            spin_speed_step: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FogConfig {
    pub color: Color,
    pub density: f32,
}

impl Default for FogConfig {
    fn default() -> Self {
        Self {
            color: Color::from_hex(0x808080),
            density: 0.07,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StereoConfig {
    /// Distance between the eyes in world units
    pub eye_separation: f32,
}

impl Default for StereoConfig {
    fn default() -> Self {
        Self {
            eye_separation: 0.064,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Load(#[from] figment::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_scene() {
        let config = SceneConfig::default();
        assert_eq!(config.camera.fov, 75.0);
        assert_eq!(config.camera.position, [10.0, 10.0, 10.0]);
        assert_eq!(config.fog.color.to_hex(), 0x808080);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn toml_overrides_single_fields() {
        let config = SceneConfig::from_toml_str(
            r#"
            [fog]
            density = 0.02

            [camera]
            target = [1.0, 2.0, 3.0]
            "#,
        )
        .unwrap();
        assert_eq!(config.fog.density, 0.02);
        assert_eq!(config.fog.color.to_hex(), 0x808080);
        assert_eq!(config.camera.target, [1.0, 2.0, 3.0]);
        assert_eq!(config.camera.fov, 75.0);
    }

    #[test]
    fn colour_names_are_accepted() {
        let config = SceneConfig::from_toml_str("[fog]\ncolor = \"purple\"").unwrap();
        assert_eq!(config.fog.color.to_hex(), 0x800080);
    }

    #[test]
    fn bad_colour_is_a_load_error() {
        let err = SceneConfig::from_toml_str("[fog]\ncolor = \"not-a-colour\"").unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }

    #[test]
    fn inverted_clip_planes_are_rejected() {
        let err = SceneConfig::from_toml_str("[camera]\nnear = 10.0\nfar = 1.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn negative_fog_is_rejected() {
        assert!(SceneConfig::from_toml_str("[fog]\ndensity = -1.0").is_err());
    }
}
