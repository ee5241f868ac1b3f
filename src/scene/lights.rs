//! The light rig: one ambient, two directional and one spot light.
//!
//! Lights are plain data edited by the panel. Every frame the rig is packed
//! into a [`LightUniform`] together with the fog parameters, and the spot
//! light's wireframe helper is rebuilt when its cone changes.

use std::f32::consts::TAU;

use cgmath::{Deg, InnerSpace, Point3, Rad, Vector3};
use wgpu::util::DeviceExt;

use crate::scene::{Fog, color::Color};

#[derive(Debug, Clone, PartialEq)]
pub struct AmbientLight {
    pub color: Color,
    pub intensity: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalLight {
    pub color: Color,
    pub intensity: f32,
    pub position: Point3<f32>,
    pub target: Point3<f32>,
}

impl DirectionalLight {
    /// Unit vector pointing from the target towards the light.
    pub fn direction(&self) -> Vector3<f32> {
        normalize_or(self.position - self.target, Vector3::unit_y())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpotLight {
    pub color: Color,
    pub intensity: f32,
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    /// Range of the light, 0 means unlimited.
    pub distance: f32,
    /// Half-angle of the cone in radians.
    pub angle: f32,
    pub penumbra: f32,
    pub decay: f32,
}

/// Segments of the helper's rim circle.
pub const HELPER_RIM_SEGMENTS: usize = 32;
/// Cone length drawn when the spot light has an unlimited range.
pub const HELPER_UNLIMITED_LENGTH: f32 = 1000.0;
/// Axis, four spokes and the rim, two vertices per segment.
pub const HELPER_VERTEX_COUNT: usize = (5 + HELPER_RIM_SEGMENTS) * 2;

impl SpotLight {
    pub fn new(color: Color, intensity: f32, position: Point3<f32>, target: Point3<f32>) -> Self {
        Self {
            color,
            intensity,
            position,
            target,
            distance: 0.0,
            angle: std::f32::consts::FRAC_PI_3,
            penumbra: 0.0,
            decay: 1.0,
        }
    }

    pub fn angle_degrees(&self) -> f32 {
        Deg::from(Rad(self.angle)).0
    }

    pub fn set_angle_degrees(&mut self, degrees: f32) {
        self.angle = Rad::from(Deg(degrees)).0;
    }

    /// Unit vector pointing from the target towards the light.
    pub fn direction(&self) -> Vector3<f32> {
        normalize_or(self.position - self.target, Vector3::unit_y())
    }

    /// Wireframe cone from the light towards its target as a line list: the
    /// axis, a spoke to four rim points and the rim circle.
    pub fn helper_lines(&self) -> Vec<LineVertex> {
        let length = if self.distance > 0.0 {
            self.distance
        } else {
            HELPER_UNLIMITED_LENGTH
        };
        let width = length * self.angle.tan();

        let forward = normalize_or(self.target - self.position, -Vector3::unit_z());
        let reference = if forward.y.abs() > 0.999 {
            Vector3::unit_x()
        } else {
            Vector3::unit_y()
        };
        let side = reference.cross(forward).normalize();
        let up = forward.cross(side);

        let to_world = |x: f32, y: f32| -> [f32; 3] {
            let p = self.position + side * (x * width) + up * (y * width) + forward * length;
            p.into()
        };
        let apex: [f32; 3] = self.position.into();
        let color = [self.color.r, self.color.g, self.color.b];

        let mut lines = Vec::with_capacity(HELPER_VERTEX_COUNT);
        for (x, y) in [(0.0, 0.0), (1.0, 0.0), (-1.0, 0.0), (0.0, 1.0), (0.0, -1.0)] {
            lines.push(LineVertex { position: apex, color });
            lines.push(LineVertex {
                position: to_world(x, y),
                color,
            });
        }
        for i in 0..HELPER_RIM_SEGMENTS {
            let p1 = i as f32 / HELPER_RIM_SEGMENTS as f32 * TAU;
            let p2 = (i + 1) as f32 / HELPER_RIM_SEGMENTS as f32 * TAU;
            lines.push(LineVertex {
                position: to_world(p1.cos(), p1.sin()),
                color,
            });
            lines.push(LineVertex {
                position: to_world(p2.cos(), p2.sin()),
                color,
            });
        }
        lines
    }
}

fn normalize_or(v: Vector3<f32>, fallback: Vector3<f32>) -> Vector3<f32> {
    if v.magnitude2() > f32::EPSILON {
        v.normalize()
    } else {
        fallback
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LightRig {
    pub ambient: AmbientLight,
    /// White key light.
    pub sun: DirectionalLight,
    /// Purple directional light whose target the panel moves.
    pub dusk: DirectionalLight,
    pub spot: SpotLight,
}

impl LightRig {
    pub fn to_uniform(&self, fog: &Fog) -> LightUniform {
        let dir = |light: &DirectionalLight| {
            let d = light.direction();
            [d.x, d.y, d.z, 0.0]
        };
        let spot = &self.spot;
        let spot_dir = spot.direction();
        let cos_angle = spot.angle.cos();
        let cos_penumbra = (spot.angle * (1.0 - spot.penumbra)).cos();
        LightUniform {
            ambient: self.ambient.color.scaled(self.ambient.intensity),
            directional_colors: [
                self.sun.color.scaled(self.sun.intensity),
                self.dusk.color.scaled(self.dusk.intensity),
            ],
            directional_directions: [dir(&self.sun), dir(&self.dusk)],
            spot_position: [spot.position.x, spot.position.y, spot.position.z, spot.distance],
            spot_direction: [spot_dir.x, spot_dir.y, spot_dir.z, spot.decay],
            spot_color: spot.color.scaled(spot.intensity),
            spot_cone: [cos_angle, cos_penumbra, 0.0, 0.0],
            fog: [fog.color.r, fog.color.g, fog.color.b, fog.density],
        }
    }
}

/// Layout mirrored by `Lights` in the WGSL shaders.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    pub ambient: [f32; 4],
    pub directional_colors: [[f32; 4]; 2],
    /// Towards the light.
    pub directional_directions: [[f32; 4]; 2],
    /// w holds the range (0 = unlimited).
    pub spot_position: [f32; 4],
    /// Towards the light, w holds the decay exponent.
    pub spot_direction: [f32; 4],
    pub spot_color: [f32; 4],
    /// x = cos(angle), y = cos(angle * (1 - penumbra))
    pub spot_cone: [f32; 4],
    /// rgb fog colour, w density
    pub fog: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LineVertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

impl crate::data_structures::model::Vertex for LineVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<LineVertex>() as wgpu::BufferAddress,
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
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// GPU side of the light rig: the uniform buffer and its bind group.
#[derive(Debug)]
pub struct LightResources {
    pub uniform: LightUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl LightResources {
    pub fn new(device: &wgpu::Device, uniform: LightUniform) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("light_bind_group_layout"),
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("light_bind_group"),
        });
        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    /// Uploads the uniform if it changed since the last write.
    pub fn write(&mut self, queue: &wgpu::Queue, uniform: LightUniform) {
        if uniform != self.uniform {
            self.uniform = uniform;
            queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[uniform]));
        }
    }
}
