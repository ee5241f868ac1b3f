//! Render pipelines of the scene.
//!
//! Every pipeline shares the surface format and the depth format of the
//! context. Bind group slots:
//!
//! | pipeline | 0 | 1 | 2 |
//! | --- | --- | --- | --- |
//! | mesh | material | camera | lights |
//! | sprite | label texture | camera | lights |
//! | skybox | panorama | camera | |
//! | lines | camera | | |

pub mod lines;
pub mod mesh;
pub mod skybox;
pub mod sprite;

use crate::data_structures::{model, texture};

/// Primitive and depth settings that differ between pipelines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterState {
    pub topology: wgpu::PrimitiveTopology,
    pub cull_mode: Option<wgpu::Face>,
    pub depth_write: bool,
    pub depth_compare: wgpu::CompareFunction,
}

impl RasterState {
    pub const OPAQUE: RasterState = RasterState {
        topology: wgpu::PrimitiveTopology::TriangleList,
        cull_mode: Some(wgpu::Face::Back),
        depth_write: true,
        depth_compare: wgpu::CompareFunction::Less,
    };

    pub const DOUBLE_SIDED: RasterState = RasterState {
        cull_mode: None,
        ..Self::OPAQUE
    };

    /// Drawn first, behind everything, without touching the depth buffer.
    pub const BACKGROUND: RasterState = RasterState {
        cull_mode: None,
        depth_write: false,
        depth_compare: wgpu::CompareFunction::Always,
        ..Self::OPAQUE
    };

    pub const LINES: RasterState = RasterState {
        topology: wgpu::PrimitiveTopology::LineList,
        cull_mode: None,
        ..Self::OPAQUE
    };
}

pub fn mk_render_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    color_format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
    raster: RasterState,
    vertex_layouts: &[wgpu::VertexBufferLayout],
    shader: wgpu::ShaderModuleDescriptor,
) -> wgpu::RenderPipeline {
    let label = shader.label;
    let shader = device.create_shader_module(shader);

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label,
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: raster.topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: raster.cull_mode,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: texture::Texture::DEPTH_FORMAT,
            depth_write_enabled: raster.depth_write,
            depth_compare: raster.depth_compare,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}

/// All pipelines and the bind group layouts that are not owned by the camera or lights.
#[derive(Debug)]
pub struct Pipelines {
    pub mesh: wgpu::RenderPipeline,
    pub mesh_double_sided: wgpu::RenderPipeline,
    pub sprite: wgpu::RenderPipeline,
    pub skybox: wgpu::RenderPipeline,
    pub lines: wgpu::RenderPipeline,
    pub material_layout: wgpu::BindGroupLayout,
    pub texture_layout: wgpu::BindGroupLayout,
}

impl Pipelines {
    pub fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        camera_layout: &wgpu::BindGroupLayout,
        light_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let material_layout = model::material_layout(device);
        let texture_layout = texture::texture_layout(device, "texture_bind_group_layout");
        Self {
            mesh: mesh::mk_mesh_pipeline(
                device,
                color_format,
                &material_layout,
                camera_layout,
                light_layout,
                RasterState::OPAQUE,
            ),
            mesh_double_sided: mesh::mk_mesh_pipeline(
                device,
                color_format,
                &material_layout,
                camera_layout,
                light_layout,
                RasterState::DOUBLE_SIDED,
            ),
            sprite: sprite::mk_sprite_pipeline(
                device,
                color_format,
                &texture_layout,
                camera_layout,
                light_layout,
            ),
            skybox: skybox::mk_skybox_pipeline(device, color_format, &texture_layout, camera_layout),
            lines: lines::mk_line_pipeline(device, color_format, camera_layout),
            material_layout,
            texture_layout,
        }
    }

    pub fn mesh_for(&self, double_sided: bool) -> &wgpu::RenderPipeline {
        if double_sided {
            &self.mesh_double_sided
        } else {
            &self.mesh
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_sided_only_drops_culling() {
        let double = RasterState::DOUBLE_SIDED;
        assert_eq!(double.cull_mode, None);
        assert_eq!(double.topology, RasterState::OPAQUE.topology);
        assert!(double.depth_write);
    }

    #[test]
    fn shaders_parse_and_validate() {
        for (name, source) in [
            ("mesh.wgsl", include_str!("mesh.wgsl")),
            ("sprite.wgsl", include_str!("sprite.wgsl")),
            ("skybox.wgsl", include_str!("skybox.wgsl")),
            ("lines.wgsl", include_str!("lines.wgsl")),
        ] {
            let module = naga::front::wgsl::parse_str(source)
                .unwrap_or_else(|e| panic!("{name}: {}", e.emit_to_string(source)));
            naga::valid::Validator::new(
                naga::valid::ValidationFlags::all(),
                naga::valid::Capabilities::all(),
            )
            .validate(&module)
            .unwrap_or_else(|e| panic!("{name}: {e:?}"));
            for entry in ["vs_main", "fs_main"] {
                assert!(
                    module.entry_points.iter().any(|ep| ep.name == entry),
                    "{name} has no {entry}"
                );
            }
        }
    }

    #[test]
    fn background_never_writes_depth() {
        assert!(!RasterState::BACKGROUND.depth_write);
        assert_eq!(
            RasterState::BACKGROUND.depth_compare,
            wgpu::CompareFunction::Always
        );
    }
}
