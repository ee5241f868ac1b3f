//! meadow
//!
//! A small 3D meadow rendered with wgpu, natively and in the browser: a grass
//! ground with trees, a cube and a sphere, a windmill model, spinning star
//! cubes, a labeled figure, four lights with a GUI panel, fog, a space
//! panorama and a side-by-side stereo mode.
//!
//! High-level modules
//! - `camera`: orbit controller, projection and per-eye camera uniforms
//! - `config`: layered configuration (defaults, `meadow.toml`, environment)
//! - `context`: central GPU and window context that owns device/queue/pipelines
//! - `data_structures`: geometry, meshes, instances, textures and the scene graph
//! - `flow`: the event loop and the flow trait
//! - `gui`: egui light panel and VR button
//! - `meadow`: the flow that owns and animates the meadow
//! - `pipelines`: mesh, sprite, skybox and line pipelines with their shaders
//! - `render`: render composition for efficient pipeline reuse
//! - `resources`: helpers to load textures/models and create GPU resources
//! - `scene`: the scene as plain data, lights, fog, labels and animation
//! - `stereo`: eye placement for the stereo view

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod gui;
pub mod meadow;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod scene;
pub mod stereo;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

use crate::{config::SceneConfig, meadow::MeadowFlow};

/// Loads the configuration and runs the meadow until the window closes.
pub fn start() -> anyhow::Result<()> {
    flow::init_logger();
    let config = SceneConfig::load()?;
    log::info!("starting with {config:?}");
    flow::run::<MeadowFlow>(config)
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn run_web() -> Result<(), wasm_bindgen::JsValue> {
    start().map_err(|e| JsValue::from_str(&format!("{e:#}")))
}
