//! Assembles the meadow.
//!
//! Sizes, colours and positions are fixed; only the fog and the spin speeds
//! come from the configuration.

use std::f32::consts::PI;

use cgmath::Point3;

use crate::{
    config::SceneConfig,
    data_structures::{
        geometry::{self, GeometryData},
        instance::Instance,
        model::{MaterialDesc, TextureDesc},
        scene_graph::{NodeId, NodeKind, SceneGraph},
    },
    scene::{
        Background, Fog, MeshEntry, ModelEntry, SceneDescription, SpriteEntry,
        animation::{SpinRate, SpinSchedule},
        color::Color,
        label::{LabelLayout, PersonLayout},
        lights::{AmbientLight, DirectionalLight, LightRig, SpotLight},
    },
};

pub const GROUND_SIZE: f32 = 50.0;
pub const TREE_POSITIONS: [(f32, f32); 8] = [
    (10.0, 0.0),
    (15.0, 0.0),
    (0.0, 10.0),
    (0.0, 15.0),
    (-10.0, 0.0),
    (-15.0, 0.0),
    (0.0, -10.0),
    (0.0, -15.0),
];
/// (x, y) of each group of three star cubes; all sit at z = 0.
pub const STAR_CUBE_GROUPS: [(f32, f32); 6] = [
    (5.0, 5.0),
    (-5.0, 5.0),
    (-10.0, 7.0),
    (10.0, 7.0),
    (-15.0, 10.0),
    (15.0, 10.0),
];
pub const WINDMILL_PATH: &str = "models/windmill/windmill_001.obj";
pub const PANORAMA_PATH: &str = "space.jpg";

const TRUNK_HEIGHT: f32 = 1.0;
const TREE_TOP_RADIUS: f32 = 1.0;
const TREE_TOP_HEIGHT: f32 = 5.0;

const BODY_RADIUS_TOP: f32 = 0.4;
const BODY_RADIUS_BOTTOM: f32 = 0.2;
const BODY_HEIGHT: f32 = 2.0;
const HEAD_RADIUS: f32 = BODY_RADIUS_TOP * 0.8;

pub struct SceneBuilder {
    graph: SceneGraph,
    meshes: Vec<MeshEntry>,
    models: Vec<ModelEntry>,
    sprites: Vec<SpriteEntry>,
    spin: SpinSchedule,
}

impl SceneBuilder {
    pub fn new(rate: SpinRate) -> Self {
        Self {
            graph: SceneGraph::new(),
            meshes: Vec::new(),
            models: Vec::new(),
            sprites: Vec::new(),
            spin: SpinSchedule::new(rate),
        }
    }

    /// Registers geometry and material once; nodes refer to it by index.
    pub fn add_mesh(&mut self, name: &str, geometry: GeometryData, material: MaterialDesc) -> usize {
        self.meshes.push(MeshEntry {
            name: name.to_string(),
            geometry,
            material,
        });
        self.meshes.len() - 1
    }

    pub fn add_ground(&mut self) -> NodeId {
        let grass = TextureDesc::new("grass.jpg")
            .repeated(GROUND_SIZE / 2.0, GROUND_SIZE / 2.0)
            .with_mag_filter(wgpu::FilterMode::Nearest)
            .srgb();
        let mesh = self.add_mesh(
            "ground",
            geometry::plane(GROUND_SIZE, GROUND_SIZE),
            MaterialDesc::phong("ground", Color::WHITE)
                .with_map(grass)
                .double_sided(),
        );
        self.graph.add_root(
            "ground",
            Instance::new().with_euler(-PI / 2.0, 0.0, 0.0),
            NodeKind::Mesh(mesh),
        )
    }

    pub fn add_cube(&mut self) -> NodeId {
        let mesh = self.add_mesh(
            "cube",
            geometry::cuboid(1.0, 1.0, 1.0),
            MaterialDesc::phong("cube", Color::from_hex(0x4076ac)),
        );
        self.graph
            .add_root("cube", Instance::at(2.0, 0.5, 2.0), NodeKind::Mesh(mesh))
    }

    pub fn add_sphere(&mut self) -> NodeId {
        let mesh = self.add_mesh(
            "sphere",
            geometry::sphere(1.0, 32, 16),
            MaterialDesc::phong("sphere", Color::from_hex(0x8d5107)),
        );
        self.graph
            .add_root("sphere", Instance::at(5.0, 12.0, 5.0), NodeKind::Mesh(mesh))
    }

    /// Eight cones sharing one mesh, each under its own root at ground level.
    pub fn add_trees(&mut self) -> Vec<NodeId> {
        let mesh = self.add_mesh(
            "tree top",
            geometry::cone(TREE_TOP_RADIUS, TREE_TOP_HEIGHT, 12),
            MaterialDesc::phong("tree top", Color::from_hex(0x008000)),
        );
        TREE_POSITIONS
            .iter()
            .map(|&(x, z)| {
                let root = self
                    .graph
                    .add_root("tree", Instance::at(x, 0.0, z), NodeKind::Group);
                self.graph.add_child(
                    root,
                    "tree top",
                    Instance::at(0.0, TRUNK_HEIGHT + TREE_TOP_HEIGHT / 2.0 - 1.0, 0.0),
                    NodeKind::Mesh(mesh),
                );
                root
            })
            .collect()
    }

    pub fn add_windmill(&mut self) -> NodeId {
        self.models.push(ModelEntry {
            name: "windmill".to_string(),
            path: WINDMILL_PATH.to_string(),
            double_sided_materials: vec!["Material".to_string()],
        });
        let model = self.models.len() - 1;
        self.graph
            .add_root("windmill", Instance::new(), NodeKind::Model(model))
    }

    /// Three star cubes per group, stacked at the same spot; each one spins.
    pub fn add_star_cubes(&mut self) -> Vec<NodeId> {
        let mesh = self.add_mesh(
            "star cube",
            geometry::cuboid(1.0, 1.0, 1.0),
            MaterialDesc::phong("star cube", Color::WHITE).with_map(TextureDesc::new("star.jpg")),
        );
        let mut cubes = Vec::with_capacity(STAR_CUBE_GROUPS.len() * 3);
        for &(x, y) in &STAR_CUBE_GROUPS {
            for _ in 0..3 {
                let id = self.graph.add_root(
                    &format!("star cube {}", cubes.len()),
                    Instance::at(x, y, 0.0),
                    NodeKind::Mesh(mesh),
                );
                self.spin.push(id);
                cubes.push(id);
            }
        }
        cubes
    }

    /// A six-sided body, a low-poly head and a text label above them.
    pub fn add_person(&mut self, x: f32, label_width: f32, size: f32, name: &str, color: Color) -> NodeId {
        let layout = PersonLayout::new(BODY_HEIGHT, HEAD_RADIUS, size);
        let material = MaterialDesc::phong(name, color).flat();
        let body = self.add_mesh(
            "body",
            geometry::cylinder(BODY_RADIUS_TOP, BODY_RADIUS_BOTTOM, BODY_HEIGHT, 6),
            material.clone(),
        );
        let head = self.add_mesh("head", geometry::sphere(HEAD_RADIUS, 12, 5), material);

        self.sprites.push(SpriteEntry {
            text: name.to_string(),
            base_width: label_width,
            size,
            world_size: LabelLayout::new(label_width, size, 0.0).world_size(),
        });
        let label = self.sprites.len() - 1;

        let root = self
            .graph
            .add_root(name, Instance::at(x, 0.0, 2.0), NodeKind::Group);
        self.graph
            .add_child(root, "body", Instance::at(0.0, layout.body_y, 0.0), NodeKind::Mesh(body));
        self.graph
            .add_child(root, "head", Instance::at(0.0, layout.head_y, 0.0), NodeKind::Mesh(head));
        self.graph.add_child(
            root,
            "label",
            Instance::at(0.0, layout.label_y, 0.0),
            NodeKind::Sprite(label),
        );
        root
    }

    pub fn finish(mut self, lights: LightRig, fog: Fog, background: Background) -> SceneDescription {
        self.graph.update_world_transforms();
        SceneDescription {
            graph: self.graph,
            meshes: self.meshes,
            models: self.models,
            sprites: self.sprites,
            lights,
            fog,
            background,
            spin: self.spin,
        }
    }
}

pub fn light_rig() -> LightRig {
    LightRig {
        ambient: AmbientLight {
            color: Color::from_hex(0x67167e),
            intensity: 0.25,
        },
        sun: DirectionalLight {
            color: Color::WHITE,
            intensity: 1.0,
            position: Point3::new(5.0, 10.0, 2.0),
            target: Point3::new(0.0, 0.0, 0.0),
        },
        dusk: DirectionalLight {
            color: Color::from_hex(0x9a36a1),
            intensity: 1.0,
            position: Point3::new(0.0, 10.0, 0.0),
            target: Point3::new(-5.0, 0.0, 0.0),
        },
        spot: SpotLight::new(
            Color::WHITE,
            1.0,
            Point3::new(0.0, 10.0, 0.0),
            Point3::new(-5.0, 0.0, 0.0),
        ),
    }
}

pub fn build_scene(config: &SceneConfig) -> SceneDescription {
    let rate = SpinRate {
        base: config.animation.spin_base_speed,
        step: config.animation.spin_speed_step,
    };
    let mut builder = SceneBuilder::new(rate);
    builder.add_ground();
    builder.add_cube();
    builder.add_sphere();
    builder.add_trees();
    builder.add_windmill();
    builder.add_star_cubes();
    builder.add_person(5.0, 100.0, 32.0, "a farmer", Color::from_hex(0x800080));

    let scene = builder.finish(
        light_rig(),
        Fog::from(&config.fog),
        Background::Panorama {
            path: PANORAMA_PATH.to_string(),
            until_loaded: Color::BLACK,
        },
    );
    log::debug!(
        "scene built: {} nodes, {} meshes, {} models, {} sprites",
        scene.graph.len(),
        scene.meshes.len(),
        scene.models.len(),
        scene.sprites.len()
    );
    scene
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 0.0001;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    fn scene() -> SceneDescription {
        build_scene(&SceneConfig::default())
    }

    fn mesh_named<'a>(scene: &'a SceneDescription, name: &str) -> &'a MeshEntry {
        scene
            .meshes
            .iter()
            .find(|mesh| mesh.name == name)
            .unwrap_or_else(|| panic!("no mesh {name}"))
    }

    #[test]
    fn ground_lies_flat_and_repeats_grass() {
        let scene = scene();
        let ground = mesh_named(&scene, "ground");
        let map = ground.material.map.as_ref().unwrap();
        assert_eq!(map.path, "grass.jpg");
        assert_eq!(map.repeat, [25.0, 25.0]);
        assert_eq!(map.sampler.mag_filter, wgpu::FilterMode::Nearest);
        assert!(map.sampler.srgb);
        assert!(ground.material.double_sided);

        // only the grass is colour managed; the star map stays linear
        let stars = mesh_named(&scene, "star cube").material.map.as_ref().unwrap();
        assert!(!stars.sampler.srgb);

        let node = scene.graph.find("ground").unwrap();
        let normal = scene.graph.world(node).to_matrix() * cgmath::Vector4::unit_z();
        assert!(approx_eq(normal.y, 1.0));
    }

    #[test]
    fn trees_stand_on_the_ground() {
        let scene = scene();
        let tops: Vec<_> = scene
            .graph
            .iter()
            .filter(|(_, node)| node.name == "tree top")
            .map(|(id, _)| scene.graph.world(id).position)
            .collect();
        assert_eq!(tops.len(), 8);
        assert!(tops.iter().all(|p| approx_eq(p.y, 2.5)));
        assert!(tops.iter().any(|p| approx_eq(p.x, -15.0) && approx_eq(p.z, 0.0)));
        assert_eq!(mesh_named(&scene, "tree top").material.color.to_hex(), 0x008000);
    }

    #[test]
    fn eighteen_cubes_spin() {
        let scene = scene();
        assert_eq!(scene.spin.nodes.len(), 18);
        let first = scene.graph.world(scene.spin.nodes[0]).position;
        let last = scene.graph.world(scene.spin.nodes[17]).position;
        assert!(approx_eq(first.x, 5.0) && approx_eq(first.y, 5.0));
        assert!(approx_eq(last.x, 15.0) && approx_eq(last.y, 10.0));
        assert!(approx_eq(scene.spin.rate.speed(17), 11.7));
    }

    #[test]
    fn farmer_is_assembled_from_parts() {
        let scene = scene();
        let root = scene.graph.find("a farmer").unwrap();
        let parts = scene.graph.get(root).children();
        assert_eq!(parts.len(), 3);
        let label = scene.graph.world(parts[2]);
        assert!(approx_eq(label.position.x, 5.0));
        assert!(approx_eq(label.position.y, 2.992));
        assert!(approx_eq(label.position.z, 2.0));

        let sprite = &scene.sprites[0];
        assert_eq!(sprite.text, "a farmer");
        assert!(approx_eq(sprite.world_size[0], 1.04));

        let body = mesh_named(&scene, "body");
        assert!(body.material.flat_shading);
        assert_eq!(body.material.color.to_hex(), 0x800080);
    }

    #[test]
    fn windmill_material_is_double_sided() {
        let scene = scene();
        assert_eq!(scene.models.len(), 1);
        assert_eq!(scene.models[0].path, WINDMILL_PATH);
        assert_eq!(scene.models[0].double_sided_materials, vec!["Material".to_string()]);
    }

    #[test]
    fn textures_are_listed_once() {
        assert_eq!(scene().texture_paths(), vec!["grass.jpg", "star.jpg"]);
    }

    #[test]
    fn fog_comes_from_config() {
        let mut config = SceneConfig::default();
        config.fog.density = 0.01;
        let scene = build_scene(&config);
        assert_eq!(scene.fog.density, 0.01);
        assert_eq!(scene.background.clear_color(), Color::BLACK);
    }
}
