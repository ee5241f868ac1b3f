use cgmath::InnerSpace;
use meadow::{
    config::SceneConfig,
    data_structures::scene_graph::NodeKind,
    meadow::{instance_data, nodes_of},
    scene::builder::{STAR_CUBE_GROUPS, TREE_POSITIONS, WINDMILL_PATH, build_scene},
};

#[test]
fn every_part_of_the_meadow_is_present() {
    let scene = build_scene(&SceneConfig::default());
    for name in ["ground", "cube", "sphere", "windmill", "a farmer"] {
        assert!(scene.graph.find(name).is_some(), "missing {name}");
    }
    assert_eq!(scene.spin.nodes.len(), STAR_CUBE_GROUPS.len() * 3);
    assert_eq!(scene.models.len(), 1);
    assert_eq!(scene.models[0].path, WINDMILL_PATH);
    assert_eq!(scene.sprites.len(), 1);
    assert_eq!(scene.sprites[0].text, "a farmer");
}

#[test]
fn every_mesh_is_used() {
    let scene = build_scene(&SceneConfig::default());
    for (index, mesh) in scene.meshes.iter().enumerate() {
        let nodes = nodes_of(&scene.graph, NodeKind::Mesh(index));
        assert!(!nodes.is_empty(), "{} is never drawn", mesh.name);
    }
    let trees = nodes_of(&scene.graph, NodeKind::Group)
        .into_iter()
        .filter(|&id| scene.graph.get(id).name == "tree")
        .count();
    assert_eq!(trees, TREE_POSITIONS.len());
}

#[test]
fn ground_lies_flat() {
    let scene = build_scene(&SceneConfig::default());
    let ground = scene.graph.find("ground").unwrap();
    let model = instance_data(&scene.graph, &[ground])[0].model();
    // the plane's +z normal ends up pointing up
    let up = model.z.truncate().normalize();
    assert!((up.y - 1.0).abs() < 0.0001);
}

#[test]
fn configuration_reaches_the_scene() {
    let config = SceneConfig::from_toml_str(
        "[fog]\ndensity = 0.5\n\n[animation]\nspin_base_speed = 2.0\nspin_speed_step = 0.5\n",
    )
    .unwrap();
    let scene = build_scene(&config);
    assert_eq!(scene.fog.density, 0.5);
    assert_eq!(scene.spin.rate.speed(0), 2.0);
    assert_eq!(scene.spin.rate.speed(2), 3.0);
}
