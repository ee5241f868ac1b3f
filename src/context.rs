use std::sync::Arc;

use anyhow::anyhow;
use cgmath::{Deg, Point3};
use winit::window::Window;

use crate::{
    camera::{CameraResources, OrbitController, Projection},
    config::SceneConfig,
    data_structures::texture,
    pipelines::Pipelines,
    scene::lights::{LightResources, LightUniform},
    stereo::StereoMode,
};

/// GPU handles plus the per-window state every frame needs.
#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub(crate) depth_texture: texture::Texture,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub camera: CameraResources,
    pub light: LightResources,
    pub pipelines: Pipelines,
    pub stereo: StereoMode,
    pub clear_colour: wgpu::Color,
}

impl Context {
    pub async fn new(window: Arc<Window>, scene: &SceneConfig) -> anyhow::Result<Self> {
        let size = window.inner_size();

        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow!("no graphics adapter can present to this window"))?;
        log::info!("adapter: {:?}", adapter.get_info());

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    required_features: wgpu::Features::empty(),
                    // WebGL doesn't support all of wgpu's features
                    required_limits: if cfg!(target_arch = "wasm32") {
                        wgpu::Limits::downlevel_webgl2_defaults()
                    } else {
                        wgpu::Limits::default()
                    },
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        // Colours are given in linear space; an sRGB surface encodes them on write.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| anyhow!("surface reports no texture formats"))?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let [px, py, pz] = scene.camera.position;
        let [tx, ty, tz] = scene.camera.target;
        let mut controller = OrbitController::new(
            Point3::new(px, py, pz),
            Point3::new(tx, ty, tz),
            Deg(scene.camera.fov).into(),
        );
        controller.set_viewport_height(config.height);
        let projection = Projection::new(
            config.width,
            config.height,
            Deg(scene.camera.fov),
            scene.camera.near,
            scene.camera.far,
        );
        let camera = CameraResources::new(&device, controller, projection);

        // the flow writes the real rig before the first frame
        let light = LightResources::new(&device, bytemuck::Zeroable::zeroed());

        let pipelines = Pipelines::new(
            &device,
            config.format,
            &camera.bind_group_layout,
            &light.bind_group_layout,
        );

        let depth_texture =
            texture::Texture::create_depth_texture(&device, [config.width, config.height], "depth_texture");

        Ok(Self {
            window,
            depth_texture,
            surface,
            device,
            queue,
            config,
            camera,
            light,
            pipelines,
            stereo: StereoMode::new(scene.stereo.eye_separation),
            clear_colour: wgpu::Color::BLACK,
        })
    }

    /// Reconfigures the surface; `false` for a zero-sized window, which is skipped.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_texture =
            texture::Texture::create_depth_texture(&self.device, [width, height], "depth_texture");
        self.camera.projection.resize(width, height);
        self.camera.controller.set_viewport_height(height);
        true
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn write_lights(&mut self, uniform: LightUniform) {
        self.light.write(&self.queue, uniform);
    }
}
