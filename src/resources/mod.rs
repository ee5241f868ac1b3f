use std::{
    io::{BufReader, Cursor},
    path::PathBuf,
};

#[cfg(target_arch = "wasm32")]
use anyhow::anyhow;

use crate::{
    data_structures::model::{self, Material, MaterialDesc},
    scene::{ModelEntry, color::Color},
};

/**
 * This module contains all logic for loading meshes, textures and fonts from external files.
 *
 * Natively files are read from the configured asset root, in the browser they are
 * fetched from `<origin>/assets/`.
 */
pub mod mesh;
pub mod texture;

#[derive(Debug, Clone)]
pub struct AssetLoader {
    root: PathBuf,
}

impl AssetLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub async fn load_string(&self, file_name: &str) -> anyhow::Result<String> {
        #[cfg(target_arch = "wasm32")]
        let txt = {
            let url = format_url(file_name)?;
            reqwest::get(url).await?.error_for_status()?.text().await?
        };
        #[cfg(not(target_arch = "wasm32"))]
        let txt = {
            let path = self.root.join(file_name);
            tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| anyhow::anyhow!("could not read {}: {e}", path.display()))?
        };

        Ok(txt)
    }

    pub async fn load_binary(&self, file_name: &str) -> anyhow::Result<Vec<u8>> {
        #[cfg(target_arch = "wasm32")]
        let data = {
            let url = format_url(file_name)?;
            reqwest::get(url)
                .await?
                .error_for_status()?
                .bytes()
                .await?
                .to_vec()
        };
        #[cfg(not(target_arch = "wasm32"))]
        let data = {
            let path = self.root.join(file_name);
            tokio::fs::read(&path)
                .await
                .map_err(|e| anyhow::anyhow!("could not read {}: {e}", path.display()))?
        };

        Ok(data)
    }
}

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().ok_or_else(|| anyhow!("no browser window"))?;
    let origin = window
        .location()
        .origin()
        .map_err(|e| anyhow!("page has no origin: {e:?}"))?;
    let base = reqwest::Url::parse(&format!("{origin}/assets/"))?;
    Ok(base.join(file_name)?)
}

/// `name` resolved against the directory of `file_name`, the way OBJ files
/// reference their MTL and MTL files their images.
pub fn sibling_path(file_name: &str, name: &str) -> String {
    match file_name.rsplit_once('/') {
        Some((dir, _)) if !name.starts_with('/') => format!("{dir}/{name}"),
        _ => name.to_string(),
    }
}

/// Loads an OBJ model with its MTL materials.
///
/// Materials listed in `entry.double_sided_materials` render both faces.
/// A model without usable materials gets a single white one.
pub async fn load_model_obj(
    loader: &AssetLoader,
    entry: &ModelEntry,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
) -> anyhow::Result<model::Model> {
    let file_name = entry.path.as_str();
    let obj_text = loader.load_string(file_name).await?;
    let mut obj_reader = BufReader::new(Cursor::new(obj_text));

    let (models, obj_materials) = tobj::load_obj_buf_async(
        &mut obj_reader,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |p| {
            let loader = loader.clone();
            let path = sibling_path(file_name, &p);
            async move {
                match loader.load_string(&path).await {
                    Ok(mat_text) => tobj::load_mtl_buf(&mut BufReader::new(Cursor::new(mat_text))),
                    Err(e) => {
                        log::warn!("material library {path} could not be loaded: {e:#}");
                        Err(tobj::LoadError::OpenFileFailed)
                    }
                }
            }
        },
    )
    .await?;

    let mut descs: Vec<MaterialDesc> = match obj_materials {
        Ok(materials) => materials
            .iter()
            .map(|m| mesh::material_desc(m, file_name, &entry.double_sided_materials))
            .collect(),
        Err(e) => {
            log::warn!("{file_name} has no usable materials: {e}");
            Vec::new()
        }
    };
    if descs.is_empty() {
        descs.push(MaterialDesc::phong(format!("{} default", entry.name), Color::WHITE));
    }

    let mut materials = Vec::with_capacity(descs.len());
    for desc in &descs {
        let diffuse_texture = match &desc.map {
            Some(map) => texture::load_texture_or_fallback(loader, device, queue, &map.path, &map.sampler).await,
            None => texture::white(device, queue),
        };
        materials.push(Material::new(device, desc, diffuse_texture, layout));
    }

    let meshes = models
        .iter()
        .map(|m| {
            let vertices = mesh::vertices_from_obj(&m.mesh);
            let material = m
                .mesh
                .material_id
                .filter(|id| *id < materials.len())
                .unwrap_or(0);
            model::Mesh::from_vertices(device, &m.name, &vertices, &m.mesh.indices, material)
        })
        .collect::<Vec<_>>();
    log::info!(
        "loaded {file_name}: {} meshes, {} materials",
        meshes.len(),
        materials.len()
    );

    Ok(model::Model { meshes, materials })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn siblings_share_the_directory() {
        assert_eq!(
            sibling_path("models/windmill/windmill_001.obj", "windmill_001.mtl"),
            "models/windmill/windmill_001.mtl"
        );
        assert_eq!(sibling_path("cube.obj", "cube.mtl"), "cube.mtl");
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[tokio::test]
    async fn reads_relative_to_the_root() {
        let root = std::env::temp_dir().join("meadow-asset-loader-test");
        std::fs::create_dir_all(root.join("models")).unwrap();
        std::fs::write(root.join("models/note.txt"), "grass").unwrap();

        let loader = AssetLoader::new(&root);
        assert_eq!(loader.load_string("models/note.txt").await.unwrap(), "grass");
        assert_eq!(loader.load_binary("models/note.txt").await.unwrap(), b"grass");
        assert!(loader.load_binary("missing.jpg").await.is_err());
    }
}
