//! Procedural primitive geometry.
//!
//! The generators follow the vertex and index layout of the classic web-3D
//! primitives (plane, box, sphere, cylinder, cone) so that sizes, segment
//! counts and winding behave the same. Texture coordinates use wgpu's
//! convention: `v = 0` is the top row of the image.

use std::f32::consts::{PI, TAU};

use cgmath::{InnerSpace, Vector3};

/// CPU-side triangle mesh ready to be uploaded with [`crate::data_structures::model::Mesh::from_geometry`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub tex_coords: Vec<[f32; 2]>,
    /// Counter-clockwise triangles.
    pub indices: Vec<u32>,
}

impl GeometryData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    fn push_vertex(&mut self, position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> u32 {
        self.positions.push(position);
        self.normals.push(normal);
        self.tex_coords.push(uv);
        (self.positions.len() - 1) as u32
    }
}

/// A `width` x `height` plane in the XY plane facing +Z.
pub fn plane(width: f32, height: f32) -> GeometryData {
    let mut data = GeometryData::default();
    let half_w = width / 2.0;
    let half_h = height / 2.0;
    for iy in 0..=1u32 {
        let y = iy as f32 * height - half_h;
        for ix in 0..=1u32 {
            let x = ix as f32 * width - half_w;
            data.push_vertex([x, -y, 0.0], [0.0, 0.0, 1.0], [ix as f32, iy as f32]);
        }
    }
    // grid is 2 x 2: a b / d c
    let (a, b, c, d) = (0, 2, 3, 1);
    data.indices.extend_from_slice(&[a, b, d, b, c, d]);
    data
}

/// Axis aligned box centred on the origin, four vertices per face.
pub fn cuboid(width: f32, height: f32, depth: f32) -> GeometryData {
    let mut data = GeometryData::default();
    // (u axis, v axis, w axis, u dir, v dir, face width, face height, depth)
    box_face(&mut data, [2, 1, 0], -1.0, -1.0, depth, height, width);
    box_face(&mut data, [2, 1, 0], 1.0, -1.0, depth, height, -width);
    box_face(&mut data, [0, 2, 1], 1.0, 1.0, width, depth, height);
    box_face(&mut data, [0, 2, 1], 1.0, -1.0, width, depth, -height);
    box_face(&mut data, [0, 1, 2], 1.0, -1.0, width, height, depth);
    box_face(&mut data, [0, 1, 2], -1.0, -1.0, width, height, -depth);
    data
}

fn box_face(
    data: &mut GeometryData,
    axes: [usize; 3],
    u_dir: f32,
    v_dir: f32,
    width: f32,
    height: f32,
    depth: f32,
) {
    let [u, v, w] = axes;
    let start = data.positions.len() as u32;
    for iy in 0..=1u32 {
        let y = iy as f32 * height - height / 2.0;
        for ix in 0..=1u32 {
            let x = ix as f32 * width - width / 2.0;
            let mut position = [0.0; 3];
            position[u] = x * u_dir;
            position[v] = y * v_dir;
            position[w] = depth / 2.0;
            let mut normal = [0.0; 3];
            normal[w] = if depth > 0.0 { 1.0 } else { -1.0 };
            data.push_vertex(position, normal, [ix as f32, iy as f32]);
        }
    }
    let (a, b, c, d) = (start, start + 2, start + 3, start + 1);
    data.indices.extend_from_slice(&[a, b, d, b, c, d]);
}

/// UV sphere. Pole rows are single triangles, every other row a quad strip.
pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> GeometryData {
    let width_segments = width_segments.max(3);
    let height_segments = height_segments.max(2);
    let mut data = GeometryData::default();
    let mut grid = Vec::with_capacity(height_segments as usize + 1);

    for iy in 0..=height_segments {
        let v = iy as f32 / height_segments as f32;
        let u_offset = if iy == 0 {
            0.5 / width_segments as f32
        } else if iy == height_segments {
            -0.5 / width_segments as f32
        } else {
            0.0
        };
        let mut row = Vec::with_capacity(width_segments as usize + 1);
        for ix in 0..=width_segments {
            let u = ix as f32 / width_segments as f32;
            let position = [
                -radius * (u * TAU).cos() * (v * PI).sin(),
                radius * (v * PI).cos(),
                radius * (u * TAU).sin() * (v * PI).sin(),
            ];
            let normal = normalize_or_up(position);
            row.push(data.push_vertex(position, normal, [u + u_offset, v]));
        }
        grid.push(row);
    }

    for iy in 0..height_segments as usize {
        for ix in 0..width_segments as usize {
            let a = grid[iy][ix + 1];
            let b = grid[iy][ix];
            let c = grid[iy + 1][ix];
            let d = grid[iy + 1][ix + 1];
            if iy != 0 {
                data.indices.extend_from_slice(&[a, b, d]);
            }
            if iy != height_segments as usize - 1 {
                data.indices.extend_from_slice(&[b, c, d]);
            }
        }
    }
    data
}

/// Closed cylinder centred on the origin along Y. A zero radius drops that cap.
pub fn cylinder(
    radius_top: f32,
    radius_bottom: f32,
    height: f32,
    radial_segments: u32,
) -> GeometryData {
    let radial_segments = radial_segments.max(3);
    let mut data = GeometryData::default();
    let half_height = height / 2.0;
    let slope = (radius_bottom - radius_top) / height;

    let mut rows = Vec::with_capacity(2);
    for y in 0..=1u32 {
        let v = y as f32;
        let radius = v * (radius_bottom - radius_top) + radius_top;
        let mut row = Vec::with_capacity(radial_segments as usize + 1);
        for x in 0..=radial_segments {
            let u = x as f32 / radial_segments as f32;
            let theta = u * TAU;
            let (sin, cos) = theta.sin_cos();
            let position = [radius * sin, -v * height + half_height, radius * cos];
            let normal = Vector3::new(sin, slope, cos).normalize();
            row.push(data.push_vertex(position, normal.into(), [u, v]));
        }
        rows.push(row);
    }
    for x in 0..radial_segments as usize {
        let a = rows[0][x];
        let b = rows[1][x];
        let c = rows[1][x + 1];
        let d = rows[0][x + 1];
        // a collapsed rim only contributes one triangle per segment
        if radius_top > 0.0 {
            data.indices.extend_from_slice(&[a, b, d]);
        }
        if radius_bottom > 0.0 {
            data.indices.extend_from_slice(&[b, c, d]);
        }
    }

    if radius_top > 0.0 {
        cylinder_cap(&mut data, true, radius_top, half_height, radial_segments);
    }
    if radius_bottom > 0.0 {
        cylinder_cap(&mut data, false, radius_bottom, half_height, radial_segments);
    }
    data
}

fn cylinder_cap(data: &mut GeometryData, top: bool, radius: f32, half_height: f32, segments: u32) {
    let sign = if top { 1.0 } else { -1.0 };
    let y = half_height * sign;
    let center_start = data.positions.len() as u32;
    for _ in 0..segments {
        data.push_vertex([0.0, y, 0.0], [0.0, sign, 0.0], [0.5, 0.5]);
    }
    let rim_start = data.positions.len() as u32;
    for x in 0..=segments {
        let theta = x as f32 / segments as f32 * TAU;
        let (sin, cos) = theta.sin_cos();
        data.push_vertex(
            [radius * sin, y, radius * cos],
            [0.0, sign, 0.0],
            [cos * 0.5 + 0.5, 1.0 - (sin * 0.5 * sign + 0.5)],
        );
    }
    for x in 0..segments {
        let center = center_start + x;
        let rim = rim_start + x;
        if top {
            data.indices.extend_from_slice(&[rim, rim + 1, center]);
        } else {
            data.indices.extend_from_slice(&[rim + 1, rim, center]);
        }
    }
}

/// Cone with its apex at `+height / 2` and a closed base at `-height / 2`.
pub fn cone(radius: f32, height: f32, radial_segments: u32) -> GeometryData {
    cylinder(0.0, radius, height, radial_segments)
}

/// Smooth per-vertex normals from area weighted face normals.
pub fn compute_vertex_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut normals = vec![Vector3::new(0.0f32, 0.0, 0.0); positions.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        if a >= positions.len() || b >= positions.len() || c >= positions.len() {
            continue;
        }
        let pa = Vector3::from(positions[a]);
        let pb = Vector3::from(positions[b]);
        let pc = Vector3::from(positions[c]);
        let face = (pb - pa).cross(pc - pa);
        normals[a] += face;
        normals[b] += face;
        normals[c] += face;
    }
    normals
        .into_iter()
        .map(|n| normalize_or_up(n.into()))
        .collect()
}

fn normalize_or_up(v: [f32; 3]) -> [f32; 3] {
    let v = Vector3::from(v);
    if v.magnitude2() > f32::EPSILON {
        v.normalize().into()
    } else {
        [0.0, 1.0, 0.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 0.0001;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    fn face_normal(data: &GeometryData, tri: &[u32]) -> Vector3<f32> {
        let p = |i: u32| Vector3::from(data.positions[i as usize]);
        (p(tri[1]) - p(tri[0])).cross(p(tri[2]) - p(tri[0]))
    }

    #[test]
    fn plane_faces_positive_z() {
        let data = plane(50.0, 50.0);
        assert_eq!(data.vertex_count(), 4);
        assert_eq!(data.triangle_count(), 2);
        for tri in data.indices.chunks(3) {
            assert!(face_normal(&data, tri).z > 0.0);
        }
        let max_x = data.positions.iter().map(|p| p[0]).fold(f32::MIN, f32::max);
        assert!(approx_eq(max_x, 25.0));
    }

    #[test]
    fn cuboid_has_outward_winding() {
        let data = cuboid(1.0, 1.0, 1.0);
        assert_eq!(data.vertex_count(), 24);
        assert_eq!(data.indices.len(), 36);
        for tri in data.indices.chunks(3) {
            let normal = face_normal(&data, tri);
            let stored = Vector3::from(data.normals[tri[0] as usize]);
            assert!(normal.dot(stored) > 0.0, "triangle {tri:?} winds inward");
            let centroid = tri
                .iter()
                .map(|&i| Vector3::from(data.positions[i as usize]))
                .fold(Vector3::new(0.0, 0.0, 0.0), |acc, p| acc + p / 3.0);
            assert!(centroid.dot(stored) > 0.0);
        }
    }

    #[test]
    fn sphere_counts_and_radius() {
        let data = sphere(1.0, 32, 16);
        assert_eq!(data.vertex_count(), 33 * 17);
        assert_eq!(data.triangle_count(), 32 * 2 * 16 - 64);
        for p in &data.positions {
            assert!(approx_eq(Vector3::from(*p).magnitude(), 1.0));
        }
    }

    #[test]
    fn sphere_winding_points_outward() {
        let data = sphere(2.0, 12, 5);
        for tri in data.indices.chunks(3) {
            let centroid = tri
                .iter()
                .map(|&i| Vector3::from(data.positions[i as usize]))
                .fold(Vector3::new(0.0, 0.0, 0.0), |acc, p| acc + p / 3.0);
            assert!(face_normal(&data, tri).dot(centroid) > 0.0);
        }
    }

    #[test]
    fn cone_is_centred_with_apex_up() {
        let data = cone(1.0, 5.0, 12);
        // torso 2 x 13, bottom cap 12 centres + 13 rim
        assert_eq!(data.vertex_count(), 26 + 25);
        assert_eq!(data.indices.len(), 36 + 36);
        let max_y = data.positions.iter().map(|p| p[1]).fold(f32::MIN, f32::max);
        let min_y = data.positions.iter().map(|p| p[1]).fold(f32::MAX, f32::min);
        assert!(approx_eq(max_y, 2.5));
        assert!(approx_eq(min_y, -2.5));
        let bottom_cap = &data.indices[36..];
        for tri in bottom_cap.chunks(3) {
            assert!(face_normal(&data, tri).y < 0.0);
        }
    }

    #[test]
    fn cylinder_has_two_caps() {
        let data = cylinder(0.4, 0.2, 2.0, 6);
        assert_eq!(data.vertex_count(), 14 + 2 * (6 + 7));
        assert_eq!(data.indices.len(), 36 + 2 * 18);
        for tri in data.indices[..36].chunks(3) {
            let centroid = tri
                .iter()
                .map(|&i| Vector3::from(data.positions[i as usize]))
                .fold(Vector3::new(0.0, 0.0, 0.0), |acc, p| acc + p / 3.0);
            let radial = Vector3::new(centroid.x, 0.0, centroid.z);
            assert!(face_normal(&data, tri).dot(radial) > 0.0);
        }
    }

    #[test]
    fn vertex_normals_of_flat_quad() {
        let data = plane(2.0, 2.0);
        let normals = compute_vertex_normals(&data.positions, &data.indices);
        for n in normals {
            assert!(approx_eq(n[2], 1.0));
        }
    }

    #[test]
    fn vertex_normals_ignore_out_of_range_indices() {
        let normals = compute_vertex_normals(&[[0.0, 0.0, 0.0]], &[0, 1, 2]);
        assert_eq!(normals, vec![[0.0, 1.0, 0.0]]);
    }
}
