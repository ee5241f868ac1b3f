use crate::{
    data_structures::texture::{SamplerOptions, Texture},
    resources::AssetLoader,
};

pub async fn load_texture(
    loader: &AssetLoader,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    file_name: &str,
    options: &SamplerOptions,
) -> anyhow::Result<Texture> {
    let data = loader.load_binary(file_name).await?;
    Texture::from_bytes(device, queue, &data, file_name, options)
}

/// Like [`load_texture`], but a missing or broken image becomes a white texel
/// so the material still renders in its base colour.
pub async fn load_texture_or_fallback(
    loader: &AssetLoader,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    file_name: &str,
    options: &SamplerOptions,
) -> Texture {
    match load_texture(loader, device, queue, file_name, options).await {
        Ok(texture) => texture,
        Err(e) => {
            log::warn!("texture {file_name} could not be loaded, using a blank one: {e:#}");
            white(device, queue)
        }
    }
}

pub fn white(device: &wgpu::Device, queue: &wgpu::Queue) -> Texture {
    Texture::create_solid(device, queue, [255, 255, 255, 255], "white")
}
