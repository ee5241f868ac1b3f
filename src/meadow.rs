//! The meadow flow: turns the scene description into GPU batches, spins the
//! star cubes and wires the light panel to the light uniform.

use instant::Duration;
use wgpu::util::DeviceExt;

use crate::{
    config::SceneConfig,
    context::Context,
    data_structures::{
        instance::InstanceRaw,
        model::{Material, Mesh, Model},
        scene_graph::{NodeId, NodeKind, SceneGraph},
        texture::{SamplerOptions, Texture, texture_bind_group},
    },
    flow::GraphicsFlow,
    gui::{light_panels, vr_button},
    pipelines::sprite::SpriteInstance,
    render::{Instanced, Lines, Render, Sprites},
    resources::{
        AssetLoader, load_model_obj,
        texture::{load_texture, load_texture_or_fallback, white},
    },
    scene::{
        MeshEntry, SceneDescription, SpriteEntry, animation::SpinSchedule, builder::build_scene,
        label::rasterize_label,
        lights::HELPER_VERTEX_COUNT,
    },
};

/// One model drawn at every node that refers to it.
#[derive(Debug)]
struct Batch {
    model: Model,
    nodes: Vec<NodeId>,
    buffer: wgpu::Buffer,
    animated: bool,
}

#[derive(Debug)]
struct SpriteBatch {
    _label: Texture,
    bind_group: wgpu::BindGroup,
    nodes: Vec<NodeId>,
    buffer: wgpu::Buffer,
}

#[derive(Debug)]
struct Panorama {
    _texture: Texture,
    bind_group: wgpu::BindGroup,
}

#[derive(Debug)]
pub struct MeadowFlow {
    scene: SceneDescription,
    batches: Vec<Batch>,
    sprites: Vec<SpriteBatch>,
    panorama: Option<Panorama>,
    spot_helper: wgpu::Buffer,
}

/// Nodes of `kind` in insertion order.
pub fn nodes_of(graph: &SceneGraph, kind: NodeKind) -> Vec<NodeId> {
    graph.iter_kind(kind).collect()
}

pub fn instance_data(graph: &SceneGraph, nodes: &[NodeId]) -> Vec<InstanceRaw> {
    nodes.iter().map(|&id| graph.world(id).to_raw()).collect()
}

pub fn sprite_data(graph: &SceneGraph, nodes: &[NodeId], world_size: [f32; 2]) -> Vec<SpriteInstance> {
    nodes
        .iter()
        .map(|&id| {
            let world = graph.world(id);
            SpriteInstance {
                center: world.position.into(),
                size: [world_size[0] * world.scale.x, world_size[1] * world.scale.y],
            }
        })
        .collect()
}

pub fn is_animated(spin: &SpinSchedule, nodes: &[NodeId]) -> bool {
    nodes.iter().any(|node| spin.nodes.contains(node))
}

/// Poses the scene `time` after the first frame.
pub fn advance(scene: &mut SceneDescription, time: Duration) {
    scene.spin.apply(time.as_secs_f32(), &mut scene.graph);
    scene.graph.update_world_transforms();
}

fn instance_buffer(device: &wgpu::Device, label: &str, data: &[InstanceRaw]) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{label} Instance Buffer")),
        contents: bytemuck::cast_slice(data),
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
    })
}

async fn load_mesh(loader: &AssetLoader, ctx: &Context, entry: &MeshEntry) -> Model {
    let texture = match &entry.material.map {
        Some(map) => {
            load_texture_or_fallback(loader, &ctx.device, &ctx.queue, &map.path, &map.sampler).await
        }
        None => white(&ctx.device, &ctx.queue),
    };
    let material = Material::new(
        &ctx.device,
        &entry.material,
        texture,
        &ctx.pipelines.material_layout,
    );
    let mesh = Mesh::from_geometry(&ctx.device, &entry.name, &entry.geometry, 0);
    Model::single(mesh, material)
}

async fn load_font(loader: &AssetLoader, config: &SceneConfig) -> Option<Vec<u8>> {
    let path = config.assets.label_font.as_deref()?;
    match loader.load_binary(path).await {
        Ok(font) => Some(font),
        Err(e) => {
            log::warn!("label font {path} could not be loaded: {e:#}");
            None
        }
    }
}

fn sprite_batch(
    ctx: &Context,
    graph: &SceneGraph,
    index: usize,
    entry: &SpriteEntry,
    font: Option<Vec<u8>>,
) -> anyhow::Result<SpriteBatch> {
    let label = rasterize_label(
        &ctx.device,
        &ctx.queue,
        &entry.text,
        entry.base_width,
        entry.size,
        font,
    )?;
    let bind_group = texture_bind_group(
        &ctx.device,
        &ctx.pipelines.texture_layout,
        &label.texture,
        &entry.text,
    );
    let nodes = nodes_of(graph, NodeKind::Sprite(index));
    let buffer = ctx
        .device
        .create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Sprite Buffer", entry.text)),
            contents: bytemuck::cast_slice(&sprite_data(graph, &nodes, entry.world_size)),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
    Ok(SpriteBatch {
        _label: label.texture,
        bind_group,
        nodes,
        buffer,
    })
}

impl GraphicsFlow for MeadowFlow {
    async fn load(ctx: &Context, config: &SceneConfig) -> anyhow::Result<Self> {
        let scene = build_scene(config);
        let loader = AssetLoader::new(config.assets.root.clone());

        let meshes = futures::future::join_all(
            scene
                .meshes
                .iter()
                .map(|entry| load_mesh(&loader, ctx, entry)),
        );
        let models = futures::future::join_all(scene.models.iter().map(|entry| {
            load_model_obj(
                &loader,
                entry,
                &ctx.device,
                &ctx.queue,
                &ctx.pipelines.material_layout,
            )
        }));
        let panorama = async {
            let Some(path) = scene.background.panorama() else {
                return None;
            };
            match load_texture(&loader, &ctx.device, &ctx.queue, path, &SamplerOptions::repeat()).await {
                Ok(texture) => Some(texture),
                Err(e) => {
                    log::warn!("panorama {path} could not be loaded, keeping the clear colour: {e:#}");
                    None
                }
            }
        };
        let (meshes, models, panorama, font) =
            futures::join!(meshes, models, panorama, load_font(&loader, config));

        let mut batches = Vec::new();
        for (index, model) in meshes.into_iter().enumerate() {
            let nodes = nodes_of(&scene.graph, NodeKind::Mesh(index));
            if nodes.is_empty() {
                continue;
            }
            batches.push(Batch {
                buffer: instance_buffer(
                    &ctx.device,
                    &scene.meshes[index].name,
                    &instance_data(&scene.graph, &nodes),
                ),
                animated: is_animated(&scene.spin, &nodes),
                model,
                nodes,
            });
        }
        for (index, model) in models.into_iter().enumerate() {
            let entry = &scene.models[index];
            let model = match model {
                Ok(model) => model,
                Err(e) => {
                    log::warn!("model {} is left out of the scene: {e:#}", entry.path);
                    continue;
                }
            };
            let nodes = nodes_of(&scene.graph, NodeKind::Model(index));
            batches.push(Batch {
                buffer: instance_buffer(
                    &ctx.device,
                    &entry.name,
                    &instance_data(&scene.graph, &nodes),
                ),
                animated: is_animated(&scene.spin, &nodes),
                model,
                nodes,
            });
        }

        let mut sprites = Vec::new();
        for (index, entry) in scene.sprites.iter().enumerate() {
            match sprite_batch(ctx, &scene.graph, index, entry, font.clone()) {
                Ok(batch) => sprites.push(batch),
                Err(e) => log::warn!("label `{}` could not be drawn: {e:#}", entry.text),
            }
        }

        let panorama = panorama.map(|texture| Panorama {
            bind_group: texture_bind_group(
                &ctx.device,
                &ctx.pipelines.texture_layout,
                &texture,
                "panorama",
            ),
            _texture: texture,
        });

        let helper = scene.lights.spot.helper_lines();
        let spot_helper = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Spot Helper Buffer"),
                contents: bytemuck::cast_slice(&helper),
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            });

        log::info!(
            "meadow loaded: {} batches, {} labels, panorama {}",
            batches.len(),
            sprites.len(),
            if panorama.is_some() { "on" } else { "off" }
        );

        Ok(Self {
            scene,
            batches,
            sprites,
            panorama,
            spot_helper,
        })
    }

    fn on_init(&mut self, ctx: &mut Context) {
        ctx.clear_colour = self.scene.background.clear_color().to_wgpu();
        ctx.write_lights(self.scene.lights.to_uniform(&self.scene.fog));
    }

    fn on_update(&mut self, ctx: &mut Context, time: Duration) {
        advance(&mut self.scene, time);
        for batch in self.batches.iter().filter(|batch| batch.animated) {
            ctx.queue.write_buffer(
                &batch.buffer,
                0,
                bytemuck::cast_slice(&instance_data(&self.scene.graph, &batch.nodes)),
            );
        }
    }

    fn on_gui(&mut self, ctx: &mut Context, gui: &egui::Context) {
        let response = light_panels(gui, &mut self.scene.lights);
        if response.lights_changed {
            ctx.write_lights(self.scene.lights.to_uniform(&self.scene.fog));
        }
        if response.spot_helper_changed {
            // always HELPER_VERTEX_COUNT vertices, so the buffer is rewritten in place
            let helper = self.scene.lights.spot.helper_lines();
            ctx.queue
                .write_buffer(&self.spot_helper, 0, bytemuck::cast_slice(&helper));
        }
        vr_button(gui, &mut ctx.stereo);
    }

    fn on_render(&self) -> Render<'_> {
        let mut renders = Vec::with_capacity(self.sprites.len() + 3);
        if let Some(panorama) = &self.panorama {
            renders.push(Render::Background(&panorama.bind_group));
        }
        renders.push(Render::Defaults(
            self.batches
                .iter()
                .map(|batch| Instanced {
                    instance: &batch.buffer,
                    model: &batch.model,
                    amount: batch.nodes.len(),
                })
                .collect(),
        ));
        renders.push(Render::Lines(Lines {
            vertex: &self.spot_helper,
            amount: HELPER_VERTEX_COUNT,
        }));
        renders.extend(self.sprites.iter().map(|sprites| {
            Render::Sprite(Sprites {
                instance: &sprites.buffer,
                bind_group: &sprites.bind_group,
                amount: sprites.nodes.len(),
            })
        }));
        Render::Composed(renders)
    }
}
