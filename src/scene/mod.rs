//! The meadow scene as plain data.
//!
//! [`builder::build_scene`] produces a [`SceneDescription`]: a scene graph
//! whose nodes point into tables of meshes, models and sprites, plus the
//! lights, fog, background and spin schedule. Nothing here touches the GPU;
//! the flow turns the description into buffers once the device exists.

pub mod animation;
pub mod builder;
pub mod color;
pub mod label;
pub mod lights;

use serde::{Deserialize, Serialize};

use crate::{
    config::FogConfig,
    data_structures::{geometry::GeometryData, model::MaterialDesc, scene_graph::SceneGraph},
    scene::{animation::SpinSchedule, color::Color, lights::LightRig},
};

/// Exponential-squared fog.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fog {
    pub color: Color,
    pub density: f32,
}

impl From<&FogConfig> for Fog {
    fn from(config: &FogConfig) -> Self {
        Self {
            color: config.color,
            density: config.density,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Background {
    Color(Color),
    /// Equirectangular image; `until_loaded` is shown before (or instead of) it.
    Panorama { path: String, until_loaded: Color },
}

impl Background {
    pub fn clear_color(&self) -> Color {
        match self {
            Background::Color(color) => *color,
            Background::Panorama { until_loaded, .. } => *until_loaded,
        }
    }

    pub fn panorama(&self) -> Option<&str> {
        match self {
            Background::Color(_) => None,
            Background::Panorama { path, .. } => Some(path),
        }
    }
}

/// Geometry plus material, shared by every node of kind `Mesh(index)`.
#[derive(Debug, Clone)]
pub struct MeshEntry {
    pub name: String,
    pub geometry: GeometryData,
    pub material: MaterialDesc,
}

/// A model file loaded at start-up.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelEntry {
    pub name: String,
    /// OBJ path relative to the asset root; the MTL is found through `mtllib`.
    pub path: String,
    /// Materials forced to render both faces.
    pub double_sided_materials: Vec<String>,
}

/// A camera-facing text label.
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteEntry {
    pub text: String,
    pub base_width: f32,
    pub size: f32,
    /// Width and height in world units.
    pub world_size: [f32; 2],
}

#[derive(Debug, Clone)]
pub struct SceneDescription {
    pub graph: SceneGraph,
    pub meshes: Vec<MeshEntry>,
    pub models: Vec<ModelEntry>,
    pub sprites: Vec<SpriteEntry>,
    pub lights: LightRig,
    pub fog: Fog,
    pub background: Background,
    pub spin: SpinSchedule,
}

impl SceneDescription {
    /// Every texture path referenced by a mesh material, without duplicates.
    pub fn texture_paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = Vec::new();
        for path in self
            .meshes
            .iter()
            .filter_map(|mesh| mesh.material.map.as_ref())
            .map(|map| map.path.as_str())
        {
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn background_falls_back_to_clear_colour() {
        let background = Background::Panorama {
            path: "space.jpg".to_string(),
            until_loaded: Color::BLACK,
        };
        assert_eq!(background.clear_color(), Color::BLACK);
        assert_eq!(background.panorama(), Some("space.jpg"));
        assert_eq!(Background::Color(Color::WHITE).panorama(), None);
    }
}
