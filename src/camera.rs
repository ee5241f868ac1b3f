//! Perspective projection, orbit controls and the camera uniform.
//!
//! The orbit controller keeps the camera on a sphere around a target point:
//! left drag orbits, right drag pans, the wheel dollies towards the target.

use std::f32::consts::{PI, TAU};

use cgmath::{InnerSpace, Matrix4, Point3, Rad, SquareMatrix, Vector3, perspective};
use wgpu::util::DeviceExt;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Polar angle margin that keeps the camera off the poles.
const POLAR_EPSILON: f32 = 0.000001;
/// Radius factor per wheel line.
pub const ZOOM_SCALE: f32 = 0.95;
/// Pixels of a touchpad scroll that count as one wheel line.
const PIXELS_PER_LINE: f32 = 50.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    aspect: f32,
    pub fovy: Rad<f32>,
    pub znear: f32,
    pub zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        let mut projection = Self {
            aspect: 1.0,
            fovy: fovy.into(),
            znear,
            zfar,
        };
        projection.resize(width, height);
        projection
    }

    /// Updates the aspect ratio. A zero sized surface (minimised window,
    /// hidden canvas) keeps the previous ratio and returns false.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        self.aspect = width as f32 / height as f32;
        true
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        self.calc_matrix_with_aspect(self.aspect)
    }

    /// Projection for a sub-viewport such as one stereo eye.
    pub fn calc_matrix_with_aspect(&self, aspect: f32) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, aspect, self.znear, self.zfar)
    }
}

#[derive(Debug, Clone)]
pub struct OrbitController {
    target: Point3<f32>,
    radius: f32,
    /// Azimuth around +Y, 0 looks down -Z from +Z.
    theta: f32,
    /// Polar angle from +Y.
    phi: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    fovy: Rad<f32>,
    viewport_height: f32,
    rotating: bool,
    panning: bool,
    cursor: Option<(f64, f64)>,
}

impl OrbitController {
    pub fn new(position: Point3<f32>, target: Point3<f32>, fovy: Rad<f32>) -> Self {
        let offset = position - target;
        let radius = offset.magnitude();
        let (theta, phi) = if radius > 0.0 {
            (
                offset.x.atan2(offset.z),
                (offset.y / radius).clamp(-1.0, 1.0).acos(),
            )
        } else {
            (0.0, PI / 2.0)
        };
        Self {
            target,
            radius: radius.max(f32::EPSILON),
            theta,
            phi: phi.clamp(POLAR_EPSILON, PI - POLAR_EPSILON),
            min_distance: 0.1,
            max_distance: 500.0,
            fovy,
            viewport_height: 1.0,
            rotating: false,
            panning: false,
            cursor: None,
        }
    }

    pub fn target(&self) -> Point3<f32> {
        self.target
    }

    pub fn distance(&self) -> f32 {
        self.radius
    }

    pub fn eye(&self) -> Point3<f32> {
        let (sin_phi, cos_phi) = self.phi.sin_cos();
        let (sin_theta, cos_theta) = self.theta.sin_cos();
        self.target
            + Vector3::new(
                self.radius * sin_phi * sin_theta,
                self.radius * cos_phi,
                self.radius * sin_phi * cos_theta,
            )
    }

    pub fn forward(&self) -> Vector3<f32> {
        (self.target - self.eye()).normalize()
    }

    pub fn right(&self) -> Vector3<f32> {
        self.forward().cross(Vector3::unit_y()).normalize()
    }

    pub fn up(&self) -> Vector3<f32> {
        self.right().cross(self.forward())
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.eye(), self.target, Vector3::unit_y())
    }

    pub fn set_viewport_height(&mut self, height: u32) {
        if height > 0 {
            self.viewport_height = height as f32;
        }
    }

    /// Orbits by a pointer movement of (`dx`, `dy`) pixels; a drag over the
    /// full viewport height is one full turn.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.theta -= TAU * dx / self.viewport_height;
        self.phi = (self.phi - TAU * dy / self.viewport_height)
            .clamp(POLAR_EPSILON, PI - POLAR_EPSILON);
    }

    /// Positive `lines` (wheel away from the user) move towards the target.
    pub fn dolly(&mut self, lines: f32) {
        self.radius =
            (self.radius * ZOOM_SCALE.powf(lines)).clamp(self.min_distance, self.max_distance);
    }

    /// Moves target and eye so the target follows the pointer in the view plane.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        let target_distance = self.radius * (self.fovy.0 / 2.0).tan();
        let scale = 2.0 * target_distance / self.viewport_height;
        let offset = -self.right() * (dx * scale) + self.up() * (dy * scale);
        self.target = self.target + offset;
    }

    /// Returns true when the event moved the camera.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::MouseInput { state, button, .. } => {
                let pressed = *state == ElementState::Pressed;
                match button {
                    MouseButton::Left => self.rotating = pressed,
                    MouseButton::Right => self.panning = pressed,
                    _ => (),
                }
                false
            }
            WindowEvent::CursorMoved { position, .. } => {
                let current = (position.x, position.y);
                let moved = match self.cursor {
                    Some((x, y)) if self.rotating || self.panning => {
                        let dx = (current.0 - x) as f32;
                        let dy = (current.1 - y) as f32;
                        if self.rotating {
                            self.rotate(dx, dy);
                        } else {
                            self.pan(dx, dy);
                        }
                        true
                    }
                    _ => false,
                };
                self.cursor = Some(current);
                moved
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                self.rotating = false;
                self.panning = false;
                false
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / PIXELS_PER_LINE,
                };
                self.dolly(lines);
                true
            }
            _ => false,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
    inv_view_proj: [[f32; 4]; 4],
    /// Camera axes in world space, used to face sprites towards the viewer.
    right: [f32; 4],
    up: [f32; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
            inv_view_proj: Matrix4::identity().into(),
            right: [1.0, 0.0, 0.0, 0.0],
            up: [0.0, 1.0, 0.0, 0.0],
        }
    }

    pub fn update(&mut self, eye: Point3<f32>, view: Matrix4<f32>, projection: Matrix4<f32>) {
        let view_proj = projection * view;
        self.view_position = eye.to_homogeneous().into();
        self.view_proj = view_proj.into();
        self.inv_view_proj = view_proj.invert().unwrap_or(Matrix4::identity()).into();
        // rows of the view rotation are the camera axes
        self.right = [view.x.x, view.y.x, view.z.x, 0.0];
        self.up = [view.x.y, view.y.y, view.z.y, 0.0];
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// Uniform buffer and bind group of one eye.
#[derive(Debug)]
pub struct EyeBinding {
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

/// Camera state and its GPU bindings; the second eye is only used in stereo mode.
#[derive(Debug)]
pub struct CameraResources {
    pub controller: OrbitController,
    pub projection: Projection,
    pub eyes: [EyeBinding; 2],
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    pub fn new(device: &wgpu::Device, controller: OrbitController, projection: Projection) -> Self {
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
            label: Some("camera_bind_group_layout"),
        });

        let mut uniform = CameraUniform::new();
        uniform.update(
            controller.eye(),
            controller.view_matrix(),
            projection.calc_matrix(),
        );
        let eye = |name: &str| {
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{name} Camera Buffer")),
                contents: bytemuck::cast_slice(&[uniform]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                layout: &bind_group_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                }],
                label: Some(&format!("{name} camera_bind_group")),
            });
            EyeBinding {
                uniform,
                buffer,
                bind_group,
            }
        };
        let eyes = [eye("left"), eye("right")];

        Self {
            controller,
            projection,
            eyes,
            bind_group_layout,
        }
    }

    pub fn write_eye(
        &mut self,
        queue: &wgpu::Queue,
        index: usize,
        eye: Point3<f32>,
        view: Matrix4<f32>,
        aspect: f32,
    ) {
        let projection = self.projection.calc_matrix_with_aspect(aspect);
        let binding = &mut self.eyes[index];
        binding.uniform.update(eye, view, projection);
        queue.write_buffer(&binding.buffer, 0, bytemuck::cast_slice(&[binding.uniform]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Deg, Transform, Vector4};

    const EPSILON: f32 = 0.0001;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    fn controller() -> OrbitController {
        let mut c = OrbitController::new(
            Point3::new(10.0, 10.0, 10.0),
            Point3::new(0.0, 5.0, 0.0),
            Deg(75.0).into(),
        );
        c.set_viewport_height(600);
        c
    }

    #[test]
    fn starts_at_configured_position() {
        let eye = controller().eye();
        assert!(approx_eq(eye.x, 10.0));
        assert!(approx_eq(eye.y, 10.0));
        assert!(approx_eq(eye.z, 10.0));
    }

    #[test]
    fn resize_ignores_zero_sizes() {
        let mut projection = Projection::new(800, 400, Deg(75.0), 0.1, 1000.0);
        assert!(approx_eq(projection.aspect(), 2.0));
        assert!(!projection.resize(0, 300));
        assert!(approx_eq(projection.aspect(), 2.0));
        assert!(projection.resize(300, 300));
        assert!(approx_eq(projection.aspect(), 1.0));
    }

    #[test]
    fn projection_maps_near_and_far_to_wgpu_depth() {
        let projection = Projection::new(1, 1, Deg(75.0), 0.1, 1000.0);
        let m = projection.calc_matrix();
        let near = m * Vector4::new(0.0, 0.0, -0.1, 1.0);
        let far = m * Vector4::new(0.0, 0.0, -1000.0, 1.0);
        assert!(approx_eq(near.z / near.w, 0.0));
        assert!(approx_eq(far.z / far.w, 1.0));
    }

    #[test]
    fn rotate_keeps_distance_and_clamps_polar_angle() {
        let mut c = controller();
        let distance = c.distance();
        c.rotate(150.0, 0.0);
        assert!(approx_eq((c.eye() - c.target()).magnitude(), distance));
        // a huge upward drag swings the eye under the target and stops at the pole
        c.rotate(0.0, -100_000.0);
        let offset = c.eye() - c.target();
        assert!((offset.y + distance).abs() < 0.01);
        assert!(offset.x.abs() < 0.01 && offset.z.abs() < 0.01);
        assert!(c.right().x.is_finite());

        // and a huge downward drag ends straight above it
        c.rotate(0.0, 200_000.0);
        let offset = c.eye() - c.target();
        assert!((offset.y - distance).abs() < 0.01);
        assert!(offset.x.abs() < 0.01 && offset.z.abs() < 0.01);
        assert!(approx_eq((c.eye() - c.target()).magnitude(), distance));
        assert!(c.right().x.is_finite());
    }

    #[test]
    fn full_height_drag_is_full_turn() {
        let mut c = controller();
        let before = c.eye();
        c.rotate(600.0, 0.0);
        let after = c.eye();
        assert!((after - before).magnitude() < 0.001);
    }

    #[test]
    fn dolly_scales_radius_and_clamps() {
        let mut c = controller();
        let distance = c.distance();
        c.dolly(1.0);
        assert!(approx_eq(c.distance(), distance * 0.95));
        c.dolly(-2.0);
        assert!(approx_eq(c.distance(), distance / 0.95));
        c.dolly(-10_000.0);
        assert!(approx_eq(c.distance(), c.max_distance));
    }

    #[test]
    fn pan_moves_target_against_pointer() {
        let mut c = controller();
        let right = c.right();
        let before = c.target();
        c.pan(100.0, 0.0);
        let moved = c.target() - before;
        assert!(moved.dot(right) < 0.0);
        assert!(approx_eq(moved.cross(right).magnitude(), 0.0));
    }

    #[test]
    fn view_matrix_puts_target_in_front() {
        let c = controller();
        let target_in_view = c.view_matrix().transform_point(c.target());
        assert!(target_in_view.z < 0.0);
        assert!(approx_eq(target_in_view.x, 0.0));
    }

    #[test]
    fn uniform_axes_match_controller() {
        let c = controller();
        let mut uniform = CameraUniform::new();
        let projection = Projection::new(4, 3, Deg(75.0), 0.1, 1000.0);
        uniform.update(c.eye(), c.view_matrix(), projection.calc_matrix());
        let right = c.right();
        assert!(approx_eq(uniform.right[0], right.x));
        assert!(approx_eq(uniform.right[2], right.z));
        assert!(approx_eq(uniform.up[1], c.up().y));
    }
}
