//! Render composition and pipeline batching.
//!
//! A flow describes what it wants drawn with a [`Render`] tree. The loop
//! flattens the tree into [`Batches`], one list per pipeline, and replays the
//! batches once per eye.
//!
//! # Key types
//!
//! - [`Render<'a>`] is the enum a flow returns every frame
//! - [`Instanced<'a>`] is a model drawn once per entry of an instance buffer
//! - [`Sprites<'a>`] are camera-facing quads sharing one texture
//! - [`Lines<'a>`] is an unlit line list

use crate::{
    context::Context,
    data_structures::model::{DrawModel, Model},
    pipelines::sprite::SPRITE_VERTICES,
};

/// A model plus the buffer of its per-instance transforms.
pub struct Instanced<'a> {
    pub instance: &'a wgpu::Buffer,
    pub model: &'a Model,
    pub amount: usize,
}

/// Billboards sharing one texture, one [`crate::pipelines::sprite::SpriteInstance`] each.
pub struct Sprites<'a> {
    pub instance: &'a wgpu::Buffer,
    pub bind_group: &'a wgpu::BindGroup,
    pub amount: usize,
}

pub struct Lines<'a> {
    pub vertex: &'a wgpu::Buffer,
    pub amount: usize,
}

/// Specifies how a part of the scene is drawn.
///
/// - `None` draws nothing
/// - `Default(Instanced)` draws one opaque instanced model
/// - `Defaults(Vec<Instanced>)` draws several of them
/// - `Sprite(Sprites)` draws labels facing the camera
/// - `Lines(Lines)` draws helper lines
/// - `Background(bind_group)` fills the screen from a panorama
/// - `Composed(Vec<Render>)` recursively draws all of its parts
pub enum Render<'a> {
    None,
    Default(Instanced<'a>),
    Defaults(Vec<Instanced<'a>>),
    Sprite(Sprites<'a>),
    Lines(Lines<'a>),
    Background(&'a wgpu::BindGroup),
    Composed(Vec<Render<'a>>),
}

impl<'a> Render<'a> {
    pub(crate) fn set_pipelines(self, batches: &mut Batches<'a>) {
        match self {
            Render::Default(instanced) => batches.basics.push(instanced),
            Render::Defaults(mut vec) => batches.basics.append(&mut vec),
            Render::Sprite(sprites) => batches.sprites.push(sprites),
            Render::Lines(lines) => batches.lines.push(lines),
            Render::Background(group) => batches.backgrounds.push(group),
            Render::Composed(renders) => renders
                .into_iter()
                .for_each(|render| render.set_pipelines(batches)),
            Render::None => (),
        }
    }
}

/// A frame's draw calls, sorted by pipeline.
#[derive(Default)]
pub(crate) struct Batches<'a> {
    pub(crate) backgrounds: Vec<&'a wgpu::BindGroup>,
    pub(crate) basics: Vec<Instanced<'a>>,
    pub(crate) sprites: Vec<Sprites<'a>>,
    pub(crate) lines: Vec<Lines<'a>>,
}

impl<'a> From<Render<'a>> for Batches<'a> {
    fn from(render: Render<'a>) -> Self {
        let mut batches = Batches::default();
        render.set_pipelines(&mut batches);
        batches
    }
}

impl Batches<'_> {
    /// Records every batch with the camera of eye `eye`.
    ///
    /// Order: background, opaque meshes, lines, then sprites so the label's
    /// translucent edges blend over what is behind it.
    pub(crate) fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>, ctx: &Context, eye: usize) {
        let camera = &ctx.camera.eyes[eye].bind_group;
        let pipelines = &ctx.pipelines;

        if let Some(background) = self.backgrounds.last() {
            render_pass.set_pipeline(&pipelines.skybox);
            render_pass.set_bind_group(0, *background, &[]);
            render_pass.set_bind_group(1, camera, &[]);
            render_pass.draw(0..3, 0..1);
        }

        for instanced in &self.basics {
            if instanced.amount == 0 {
                log::warn!("Instance buffer with no instances, skipping draw");
                continue;
            }
            render_pass.set_bind_group(1, camera, &[]);
            render_pass.set_bind_group(2, &ctx.light.bind_group, &[]);
            render_pass.set_vertex_buffer(1, instanced.instance.slice(..));
            for mesh in &instanced.model.meshes {
                let Some(material) = instanced.model.materials.get(mesh.material) else {
                    log::warn!("mesh {} has no material {}", mesh.name, mesh.material);
                    continue;
                };
                render_pass.set_pipeline(pipelines.mesh_for(material.double_sided));
                render_pass.draw_mesh_instanced(mesh, material, 0..instanced.amount as u32);
            }
        }

        if !self.lines.is_empty() {
            render_pass.set_pipeline(&pipelines.lines);
            render_pass.set_bind_group(0, camera, &[]);
            for lines in &self.lines {
                render_pass.set_vertex_buffer(0, lines.vertex.slice(..));
                render_pass.draw(0..lines.amount as u32, 0..1);
            }
        }

        if !self.sprites.is_empty() {
            render_pass.set_pipeline(&pipelines.sprite);
            render_pass.set_bind_group(1, camera, &[]);
            render_pass.set_bind_group(2, &ctx.light.bind_group, &[]);
            for sprites in &self.sprites {
                render_pass.set_bind_group(0, sprites.bind_group, &[]);
                render_pass.set_vertex_buffer(0, sprites.instance.slice(..));
                render_pass.draw(0..SPRITE_VERTICES, 0..sprites.amount as u32);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_nothing_batches_to_nothing() {
        let render = Render::Composed(vec![
            Render::None,
            Render::Composed(vec![Render::None, Render::Defaults(Vec::new())]),
        ]);
        let batches = Batches::from(render);
        assert!(batches.backgrounds.is_empty());
        assert!(batches.basics.is_empty());
        assert!(batches.sprites.is_empty());
        assert!(batches.lines.is_empty());
    }
}
