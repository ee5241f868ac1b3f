//! Meshes, materials and models on the GPU.
//!
//! A [`Model`] is a list of meshes sharing a material table. Materials carry
//! a colour map, a small uniform with the Phong parameters and whether the
//! surface is rendered from both sides.

use std::ops::Range;

use wgpu::util::DeviceExt;

use crate::{
    data_structures::{
        geometry::GeometryData,
        texture::{SamplerOptions, Texture},
    },
    scene::color::Color,
};

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

impl From<&GeometryData> for Vec<ModelVertex> {
    fn from(geometry: &GeometryData) -> Self {
        geometry
            .positions
            .iter()
            .zip(&geometry.normals)
            .zip(&geometry.tex_coords)
            .map(|((position, normal), tex_coords)| ModelVertex {
                position: *position,
                tex_coords: *tex_coords,
                normal: *normal,
            })
            .collect()
    }
}

/// Where a material's colour map comes from and how it is sampled.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureDesc {
    /// Path relative to the asset root.
    pub path: String,
    pub sampler: SamplerOptions,
    /// Texture repeats across the surface (UV scale).
    pub repeat: [f32; 2],
}

impl TextureDesc {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            sampler: SamplerOptions::default(),
            repeat: [1.0, 1.0],
        }
    }

    pub fn repeated(mut self, x: f32, y: f32) -> Self {
        self.sampler.address_mode = wgpu::AddressMode::Repeat;
        self.repeat = [x, y];
        self
    }

    pub fn with_mag_filter(mut self, filter: wgpu::FilterMode) -> Self {
        self.sampler = self.sampler.with_mag_filter(filter);
        self
    }

    /// The image holds sRGB colours rather than linear data.
    pub fn srgb(mut self) -> Self {
        self.sampler = self.sampler.with_srgb();
        self
    }
}

/// CPU description of a Phong material.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialDesc {
    pub name: String,
    pub color: Color,
    pub specular: Color,
    pub shininess: f32,
    pub map: Option<TextureDesc>,
    pub double_sided: bool,
    pub flat_shading: bool,
}

impl MaterialDesc {
    pub const DEFAULT_SPECULAR: u32 = 0x111111;
    pub const DEFAULT_SHININESS: f32 = 30.0;

    pub fn phong(name: impl Into<String>, color: Color) -> Self {
        Self {
            name: name.into(),
            color,
            specular: Color::from_hex(Self::DEFAULT_SPECULAR),
            shininess: Self::DEFAULT_SHININESS,
            map: None,
            double_sided: false,
            flat_shading: false,
        }
    }

    pub fn with_map(mut self, map: TextureDesc) -> Self {
        self.map = Some(map);
        self
    }

    pub fn double_sided(mut self) -> Self {
        self.double_sided = true;
        self
    }

    pub fn flat(mut self) -> Self {
        self.flat_shading = true;
        self
    }

    pub fn to_uniform(&self) -> MaterialUniform {
        let repeat = self.map.as_ref().map_or([1.0, 1.0], |map| map.repeat);
        let mut specular = self.specular.to_array();
        specular[3] = self.shininess;
        MaterialUniform {
            color: self.color.to_array(),
            specular,
            params: [
                repeat[0],
                repeat[1],
                if self.flat_shading { 1.0 } else { 0.0 },
                0.0,
            ],
        }
    }
}

/// Layout mirrored by `Material` in `mesh.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub color: [f32; 4],
    /// rgb specular colour, w shininess
    pub specular: [f32; 4],
    /// xy uv repeat, z flat shading flag
    pub params: [f32; 4],
}

#[derive(Debug)]
pub struct Material {
    pub name: String,
    pub double_sided: bool,
    pub diffuse_texture: Texture,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl Material {
    pub fn new(
        device: &wgpu::Device,
        desc: &MaterialDesc,
        diffuse_texture: Texture,
        layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Material Buffer", desc.name)),
            contents: bytemuck::cast_slice(&[desc.to_uniform()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&diffuse_texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&diffuse_texture.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: buffer.as_entire_binding(),
                },
            ],
            label: Some(&desc.name),
        });

        Self {
            name: desc.name.clone(),
            double_sided: desc.double_sided,
            diffuse_texture,
            buffer,
            bind_group,
        }
    }
}

/// Colour map, its sampler and the material uniform.
pub fn material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
        label: Some("material_bind_group_layout"),
    })
}

#[derive(Debug)]
pub struct Mesh {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
    pub material: usize,
}

impl Mesh {
    pub fn from_vertices(
        device: &wgpu::Device,
        name: &str,
        vertices: &[ModelVertex],
        indices: &[u32],
        material: usize,
    ) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} Vertex Buffer")),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} Index Buffer")),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            name: name.to_string(),
            vertex_buffer,
            index_buffer,
            num_elements: indices.len() as u32,
            material,
        }
    }

    pub fn from_geometry(
        device: &wgpu::Device,
        name: &str,
        geometry: &GeometryData,
        material: usize,
    ) -> Self {
        let vertices: Vec<ModelVertex> = geometry.into();
        Self::from_vertices(device, name, &vertices, &geometry.indices, material)
    }
}

#[derive(Debug)]
pub struct Model {
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
}

impl Model {
    /// A model made of one mesh with one material.
    pub fn single(mesh: Mesh, material: Material) -> Self {
        Self {
            meshes: vec![Mesh { material: 0, ..mesh }],
            materials: vec![material],
        }
    }
}

pub trait DrawModel {
    fn draw_mesh_instanced(&mut self, mesh: &Mesh, material: &Material, instances: Range<u32>);
}

impl DrawModel for wgpu::RenderPass<'_> {
    /// Camera and light bind groups (1 and 2) must already be set.
    fn draw_mesh_instanced(
        &mut self,
        mesh: &Mesh,
        material: &Material,
        instances: Range<u32>,
    ) {
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.set_bind_group(0, &material.bind_group, &[]);
        self.draw_indexed(0..mesh.num_elements, 0, instances);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::geometry;

    #[test]
    fn phong_defaults() {
        let desc = MaterialDesc::phong("cube", Color::from_hex(0x4076ac));
        let uniform = desc.to_uniform();
        assert_eq!(uniform.specular[3], 30.0);
        assert_eq!(uniform.params, [1.0, 1.0, 0.0, 0.0]);
        assert!(!desc.double_sided);
    }

    #[test]
    fn uniform_carries_repeat_and_flat_flag() {
        let desc = MaterialDesc::phong("ground", Color::WHITE)
            .with_map(TextureDesc::new("grass.jpg").repeated(25.0, 25.0))
            .flat();
        assert_eq!(desc.to_uniform().params, [25.0, 25.0, 1.0, 0.0]);
    }

    #[test]
    fn geometry_becomes_interleaved_vertices() {
        let data = geometry::cuboid(1.0, 1.0, 1.0);
        let vertices: Vec<ModelVertex> = (&data).into();
        assert_eq!(vertices.len(), 24);
        assert_eq!(vertices[5].normal, data.normals[5]);
        assert_eq!(vertices[5].tex_coords, data.tex_coords[5]);
    }
}
