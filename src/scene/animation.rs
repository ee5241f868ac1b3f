//! Spinning cubes.
//!
//! Every cube turns around its X and Y axes at the same angle
//! `time * speed`, where the speed grows slightly with the cube's index so
//! the cubes drift out of phase.

use crate::data_structures::{
    instance::Instance,
    scene_graph::{NodeId, SceneGraph},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpinRate {
    /// Radians per second of cube 0.
    pub base: f32,
    /// Added per cube index.
    pub step: f32,
}

impl SpinRate {
    pub fn speed(&self, index: usize) -> f32 {
        self.base + index as f32 * self.step
    }

    /// Local rotation of cube `index` after `time` seconds (Euler XYZ, z = 0).
    pub fn rotation(&self, time: f32, index: usize) -> cgmath::Quaternion<f32> {
        let angle = time * self.speed(index);
        Instance::new().with_euler(angle, angle, 0.0).rotation
    }
}

impl Default for SpinRate {
    fn default() -> Self {
        Self {
            base: 10.0,
            step: 0.1,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpinSchedule {
    pub rate: SpinRate,
    /// Spinning nodes in index order.
    pub nodes: Vec<NodeId>,
}

impl SpinSchedule {
    pub fn new(rate: SpinRate) -> Self {
        Self {
            rate,
            nodes: Vec::new(),
        }
    }

    pub fn push(&mut self, node: NodeId) {
        self.nodes.push(node);
    }

    /// Sets every cube's local rotation for `time` seconds since start.
    /// Positions and scales are left untouched.
    pub fn apply(&self, time: f32, graph: &mut SceneGraph) {
        for (index, &node) in self.nodes.iter().enumerate() {
            graph.local_mut(node).rotation = self.rate.rotation(time, index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::scene_graph::NodeKind;
    use cgmath::{InnerSpace, Rotation};

    const EPSILON: f32 = 0.0001;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn speed_grows_with_index() {
        let rate = SpinRate::default();
        assert!(approx_eq(rate.speed(0), 10.0));
        assert!(approx_eq(rate.speed(17), 11.7));
    }

    #[test]
    fn rotation_at_zero_is_identity() {
        let q = SpinRate::default().rotation(0.0, 5);
        assert!(approx_eq(q.s, 1.0));
        assert!(approx_eq(q.v.magnitude(), 0.0));
    }

    #[test]
    fn rotation_matches_x_then_y() {
        use cgmath::{Quaternion, Rad, Rotation3};
        let rate = SpinRate {
            base: 1.0,
            step: 0.0,
        };
        let q = rate.rotation(0.5, 0);
        let expected = Quaternion::from_angle_x(Rad(0.5)) * Quaternion::from_angle_y(Rad(0.5));
        let point = cgmath::Vector3::new(0.2, 0.7, -0.4);
        let a = q.rotate_vector(point);
        let b = expected.rotate_vector(point);
        assert!((a - b).magnitude() < EPSILON);
    }

    #[test]
    fn apply_keeps_positions() {
        let mut graph = SceneGraph::new();
        let mut schedule = SpinSchedule::new(SpinRate::default());
        for x in [5.0, -5.0] {
            let id = graph.add_root("star", Instance::at(x, 5.0, 0.0), NodeKind::Mesh(0));
            schedule.push(id);
        }
        schedule.apply(1.25, &mut graph);
        let second = graph.get(schedule.nodes[1]).local();
        assert!(approx_eq(second.position.x, -5.0));
        let expected = SpinRate::default().rotation(1.25, 1);
        assert!(approx_eq(second.rotation.s, expected.s));
    }
}
