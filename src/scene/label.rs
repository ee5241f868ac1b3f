//! Text labels drawn onto a small canvas and shown as camera-facing sprites.
//!
//! The canvas is `base_width + 4` by `size + 4` pixels with a grey background.
//! Text wider than `base_width` is shrunk to fit, never stretched.

use crate::data_structures::texture::Texture;

pub const BORDER: f32 = 2.0;
/// World units per canvas pixel.
pub const LABEL_BASE_SCALE: f32 = 0.01;
/// Canvas format; the grey background is stored as-is, like a 2D canvas.
pub const LABEL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const BACKGROUND: wgpu::Color = wgpu::Color {
    r: 128.0 / 255.0,
    g: 128.0 / 255.0,
    b: 128.0 / 255.0,
    a: 1.0,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelLayout {
    pub canvas_width: f32,
    pub canvas_height: f32,
    pub text_scale: f32,
}

impl LabelLayout {
    pub fn new(base_width: f32, size: f32, text_width: f32) -> Self {
        let text_scale = if text_width > 0.0 {
            (base_width / text_width).min(1.0)
        } else {
            1.0
        };
        Self {
            canvas_width: base_width + BORDER * 2.0,
            canvas_height: size + BORDER * 2.0,
            text_scale,
        }
    }

    pub fn canvas_size(&self) -> (u32, u32) {
        (
            self.canvas_width.ceil().max(1.0) as u32,
            self.canvas_height.ceil().max(1.0) as u32,
        )
    }

    /// Sprite size in world units.
    pub fn world_size(&self) -> [f32; 2] {
        [
            self.canvas_width * LABEL_BASE_SCALE,
            self.canvas_height * LABEL_BASE_SCALE,
        ]
    }
}

/// Vertical placement of a figure's parts, relative to the figure's root.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PersonLayout {
    pub body_y: f32,
    pub head_y: f32,
    pub label_y: f32,
}

impl PersonLayout {
    pub fn new(body_height: f32, head_radius: f32, size: f32) -> Self {
        let head_y = body_height + head_radius * 1.1;
        Self {
            body_y: body_height / 2.0,
            head_y,
            label_y: head_y + head_radius + size * LABEL_BASE_SCALE,
        }
    }
}

/// A rasterised label ready to be bound to the sprite pipeline.
#[derive(Debug)]
pub struct LabelCanvas {
    pub layout: LabelLayout,
    pub texture: Texture,
}

/// Renders `text` centred in white on the grey canvas.
///
/// `font` adds a font to the system set; the browser has no system fonts, so
/// without one the web build shows an empty label.
#[cfg(feature = "ui")]
pub fn rasterize_label(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    text: &str,
    base_width: f32,
    size: f32,
    font: Option<Vec<u8>>,
) -> anyhow::Result<LabelCanvas> {
    use glyphon::{
        Attrs, Buffer, Cache, Color, Family, FontSystem, Metrics, Resolution, Shaping, SwashCache,
        TextArea, TextAtlas, TextBounds, TextRenderer, Viewport, Weight,
    };

    let mut font_system = FontSystem::new();
    if let Some(font) = font {
        font_system.db_mut().load_font_data(font);
    }
    let mut swash_cache = SwashCache::new();
    let cache = Cache::new(device);
    let mut viewport = Viewport::new(device, &cache);
    let mut atlas = TextAtlas::new(device, queue, &cache, LABEL_FORMAT);
    let mut text_renderer =
        TextRenderer::new(&mut atlas, device, wgpu::MultisampleState::default(), None);

    let mut buffer = Buffer::new(&mut font_system, Metrics::new(size, size));
    buffer.set_size(&mut font_system, None, None);
    buffer.set_text(
        &mut font_system,
        text,
        Attrs::new().family(Family::SansSerif).weight(Weight::BOLD),
        Shaping::Advanced,
    );
    buffer.shape_until_scroll(&mut font_system, false);
    let text_width = buffer
        .layout_runs()
        .fold(0.0f32, |width, run| width.max(run.line_w));

    let layout = LabelLayout::new(base_width, size, text_width);
    let (width, height) = layout.canvas_size();
    let texture = Texture::create_render_target(device, width, height, LABEL_FORMAT, text);
    viewport.update(queue, Resolution { width, height });

    // glyphon only scales uniformly, so wide text also gets shorter instead of
    // being squeezed horizontally alone
    let scale = layout.text_scale;
    text_renderer.prepare(
        device,
        queue,
        &mut font_system,
        &mut atlas,
        &viewport,
        [TextArea {
            buffer: &buffer,
            left: (width as f32 - text_width * scale) / 2.0,
            top: (height as f32 - size * scale) / 2.0,
            scale,
            bounds: TextBounds {
                left: 0,
                top: 0,
                right: width as i32,
                bottom: height as i32,
            },
            default_color: Color::rgb(255, 255, 255),
            custom_glyphs: &[],
        }],
        &mut swash_cache,
    )?;

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Label Encoder"),
    });
    {
        let mut pass = begin_canvas_pass(&mut encoder, &texture);
        text_renderer.render(&atlas, &viewport, &mut pass)?;
    }
    queue.submit(std::iter::once(encoder.finish()));
    log::debug!("label `{text}` rasterised at {width}x{height}, text scale {scale}");

    Ok(LabelCanvas { layout, texture })
}

/// Without the `ui` feature there is no text shaping: the canvas is the bare background.
#[cfg(not(feature = "ui"))]
pub fn rasterize_label(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    text: &str,
    base_width: f32,
    size: f32,
    _font: Option<Vec<u8>>,
) -> anyhow::Result<LabelCanvas> {
    let layout = LabelLayout::new(base_width, size, 0.0);
    let (width, height) = layout.canvas_size();
    let texture = Texture::create_render_target(device, width, height, LABEL_FORMAT, text);
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Label Encoder"),
    });
    drop(begin_canvas_pass(&mut encoder, &texture));
    queue.submit(std::iter::once(encoder.finish()));
    log::warn!("label `{text}` has no text: built without the `ui` feature");
    Ok(LabelCanvas { layout, texture })
}

fn begin_canvas_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    texture: &Texture,
) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("Label Pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: &texture.view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(BACKGROUND),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 0.0001;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn canvas_adds_border() {
        let layout = LabelLayout::new(100.0, 32.0, 80.0);
        assert_eq!(layout.canvas_size(), (104, 36));
        assert_eq!(layout.text_scale, 1.0);
    }

    #[test]
    fn wide_text_is_shrunk() {
        let layout = LabelLayout::new(100.0, 32.0, 250.0);
        assert!(approx_eq(layout.text_scale, 0.4));
    }

    #[test]
    fn empty_text_keeps_unit_scale() {
        assert_eq!(LabelLayout::new(100.0, 32.0, 0.0).text_scale, 1.0);
    }

    #[test]
    fn world_size_is_one_centimetre_per_pixel() {
        let [w, h] = LabelLayout::new(100.0, 32.0, 10.0).world_size();
        assert!(approx_eq(w, 1.04));
        assert!(approx_eq(h, 0.36));
    }

    #[test]
    fn person_parts_stack_up() {
        let person = PersonLayout::new(2.0, 0.32, 32.0);
        assert!(approx_eq(person.body_y, 1.0));
        assert!(approx_eq(person.head_y, 2.352));
        assert!(approx_eq(person.label_y, 2.992));
    }
}
