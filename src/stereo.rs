//! Side-by-side stereo rendering.
//!
//! Entering "VR" splits the surface into a left and a right half. Both eyes
//! look along the orbit camera's direction from positions shifted half the
//! eye separation along the camera's right vector.

use cgmath::{Matrix4, Point3, Vector3};

use crate::camera::OrbitController;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
        }
    }

    pub fn aspect(&self) -> f32 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width < 1.0 || self.height < 1.0
    }
}

/// One rendered view: where the eye is, what it sees and where it is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeView {
    pub position: Point3<f32>,
    pub view: Matrix4<f32>,
    pub viewport: Viewport,
}

/// Left and right halves of a `width` x `height` surface. An odd pixel goes to the right eye.
pub fn eye_viewports(width: u32, height: u32) -> [Viewport; 2] {
    let left_width = width / 2;
    [
        Viewport {
            x: 0.0,
            y: 0.0,
            width: left_width as f32,
            height: height as f32,
        },
        Viewport {
            x: left_width as f32,
            y: 0.0,
            width: (width - left_width) as f32,
            height: height as f32,
        },
    ]
}

/// Offsets of the left and right eye from the camera position.
pub fn eye_offsets(right: Vector3<f32>, separation: f32) -> [Vector3<f32>; 2] {
    let half = right * (separation / 2.0);
    [-half, half]
}

#[derive(Debug, Clone, PartialEq)]
pub struct StereoMode {
    enabled: bool,
    pub eye_separation: f32,
}

impl StereoMode {
    pub fn new(eye_separation: f32) -> Self {
        Self {
            enabled: false,
            eye_separation,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn toggle(&mut self) {
        self.enabled = !self.enabled;
        log::info!(
            "{} stereo view",
            if self.enabled { "Entering" } else { "Leaving" }
        );
    }

    /// Text of the button that switches the mode.
    pub fn button_label(&self) -> &'static str {
        if self.enabled { "EXIT VR" } else { "ENTER VR" }
    }

    /// The views to render this frame: one full-surface view, or two eyes
    /// with parallel view directions.
    pub fn eyes(&self, controller: &OrbitController, width: u32, height: u32) -> Vec<EyeView> {
        if !self.enabled {
            return vec![EyeView {
                position: controller.eye(),
                view: controller.view_matrix(),
                viewport: Viewport::full(width, height),
            }];
        }
        let eye = controller.eye();
        let target = controller.target();
        let up = controller.up();
        eye_offsets(controller.right(), self.eye_separation)
            .into_iter()
            .zip(eye_viewports(width, height))
            .map(|(offset, viewport)| EyeView {
                position: eye + offset,
                view: Matrix4::look_at_rh(eye + offset, target + offset, up),
                viewport,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Deg, InnerSpace, Transform};

    const EPSILON: f32 = 0.0001;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    fn controller() -> OrbitController {
        OrbitController::new(
            Point3::new(10.0, 10.0, 10.0),
            Point3::new(0.0, 5.0, 0.0),
            Deg(75.0).into(),
        )
    }

    #[test]
    fn viewports_split_the_surface() {
        let [left, right] = eye_viewports(1281, 720);
        assert_eq!(left.width, 640.0);
        assert_eq!(right.x, 640.0);
        assert_eq!(right.width, 641.0);
        assert_eq!(left.height, 720.0);
        assert!(approx_eq(left.aspect(), 640.0 / 720.0));
    }

    #[test]
    fn offsets_are_symmetric() {
        let [l, r] = eye_offsets(Vector3::unit_x(), 0.064);
        assert!(approx_eq(l.x, -0.032));
        assert!(approx_eq(r.x, 0.032));
        assert!(approx_eq((r - l).magnitude(), 0.064));
    }

    #[test]
    fn mono_renders_one_full_view() {
        let mode = StereoMode::new(0.064);
        let eyes = mode.eyes(&controller(), 800, 600);
        assert_eq!(eyes.len(), 1);
        assert_eq!(eyes[0].viewport, Viewport::full(800, 600));
        assert_eq!(mode.button_label(), "ENTER VR");
    }

    #[test]
    fn stereo_eyes_straddle_the_camera() {
        let mut mode = StereoMode::new(0.064);
        mode.toggle();
        assert_eq!(mode.button_label(), "EXIT VR");
        let c = controller();
        let eyes = mode.eyes(&c, 800, 600);
        assert_eq!(eyes.len(), 2);
        let centre = eyes[0].position + (eyes[1].position - eyes[0].position) / 2.0;
        assert!((centre - c.eye()).magnitude() < EPSILON);
        assert!(approx_eq((eyes[1].position - eyes[0].position).magnitude(), 0.064));
        // the right eye sits on the camera's right
        assert!((eyes[1].position - c.eye()).dot(c.right()) > 0.0);
        // both eyes look in the same direction
        let point = c.target();
        let l = eyes[0].view.transform_point(point);
        let r = eyes[1].view.transform_point(point);
        assert!(approx_eq(l.z, r.z));
        assert!(l.x > r.x);
    }
}
