use crate::{
    data_structures::{
        geometry::compute_vertex_normals,
        model::{self, MaterialDesc, TextureDesc},
    },
    resources::sibling_path,
    scene::color::Color,
};

/// Vertices of one OBJ mesh loaded with `single_index`.
///
/// Obj files may omit normals; smooth normals are computed from the faces then.
/// Texture coordinates are flipped into wgpu's top-left convention.
pub fn vertices_from_obj(mesh: &tobj::Mesh) -> Vec<model::ModelVertex> {
    let positions: Vec<[f32; 3]> = mesh
        .positions
        .chunks_exact(3)
        .map(|p| [p[0], p[1], p[2]])
        .collect();
    let normals: Vec<[f32; 3]> = if mesh.normals.len() == mesh.positions.len() {
        mesh.normals
            .chunks_exact(3)
            .map(|n| [n[0], n[1], n[2]])
            .collect()
    } else {
        compute_vertex_normals(&positions, &mesh.indices)
    };

    positions
        .into_iter()
        .zip(normals)
        .enumerate()
        .map(|(i, (position, normal))| model::ModelVertex {
            position,
            tex_coords: [
                mesh.texcoords.get(i * 2).map_or(0.0, |f| *f),
                1.0 - mesh.texcoords.get(i * 2 + 1).map_or(0.0, |f| *f),
            ],
            normal,
        })
        .collect()
}

/// Phong parameters of an MTL material: `Kd`, `Ks`, `Ns` and `map_Kd`.
///
/// Image paths are relative to the model file and repeat across the surface.
pub fn material_desc(
    material: &tobj::Material,
    obj_path: &str,
    double_sided: &[String],
) -> MaterialDesc {
    let [r, g, b] = material.diffuse.unwrap_or([1.0, 1.0, 1.0]);
    let mut desc = MaterialDesc::phong(material.name.clone(), Color::rgb(r, g, b));
    if let Some([r, g, b]) = material.specular {
        desc.specular = Color::rgb(r, g, b);
    }
    if let Some(shininess) = material.shininess {
        desc.shininess = shininess;
    }
    if let Some(map) = &material.diffuse_texture {
        desc = desc.with_map(TextureDesc::new(sibling_path(obj_path, map)).repeated(1.0, 1.0));
    }
    if double_sided.iter().any(|name| *name == material.name) {
        desc = desc.double_sided();
    }
    desc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle(with_normals: bool) -> tobj::Mesh {
        tobj::Mesh {
            positions: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            normals: if with_normals {
                vec![0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0]
            } else {
                Vec::new()
            },
            texcoords: vec![0.0, 0.0, 1.0, 0.0, 0.0, 0.25],
            indices: vec![0, 1, 2],
            ..Default::default()
        }
    }

    #[test]
    fn missing_normals_are_computed() {
        let vertices = vertices_from_obj(&triangle(false));
        assert_eq!(vertices.len(), 3);
        for v in &vertices {
            assert_eq!(v.normal, [0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn file_normals_are_kept() {
        let vertices = vertices_from_obj(&triangle(true));
        assert_eq!(vertices[1].normal, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn texcoords_are_flipped() {
        let vertices = vertices_from_obj(&triangle(true));
        assert_eq!(vertices[0].tex_coords, [0.0, 1.0]);
        assert_eq!(vertices[2].tex_coords, [0.0, 0.75]);
    }

    #[test]
    fn mtl_parameters_become_phong() {
        let material = tobj::Material {
            name: "Material".to_string(),
            diffuse: Some([0.5, 0.25, 1.0]),
            specular: Some([0.2, 0.2, 0.2]),
            shininess: Some(96.0),
            diffuse_texture: Some("wood.png".to_string()),
            ..Default::default()
        };
        let desc = material_desc(
            &material,
            "models/windmill/windmill_001.obj",
            &["Material".to_string()],
        );
        assert_eq!(desc.color, Color::rgb(0.5, 0.25, 1.0));
        assert_eq!(desc.shininess, 96.0);
        assert!(desc.double_sided);
        let map = desc.map.unwrap();
        assert_eq!(map.path, "models/windmill/wood.png");
        assert_eq!(map.sampler.address_mode, wgpu::AddressMode::Repeat);
    }

    #[test]
    fn other_materials_stay_single_sided() {
        let material = tobj::Material {
            name: "Blades".to_string(),
            ..Default::default()
        };
        let desc = material_desc(&material, "windmill.obj", &["Material".to_string()]);
        assert!(!desc.double_sided);
        assert_eq!(desc.color, Color::WHITE);
        assert_eq!(desc.shininess, MaterialDesc::DEFAULT_SHININESS);
    }
}
