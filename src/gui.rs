//! The parameter panel and the VR button.
//!
//! [`GuiLayer`] owns the egui context, its winit input state and its wgpu
//! renderer. The widgets themselves are free functions over plain scene data
//! so they can be driven by a headless egui context.

use egui::{Align2, CollapsingHeader, Slider, Ui, ViewportId};
use egui_wgpu::ScreenDescriptor;
use winit::window::Window;

use crate::{
    scene::{
        color::Color,
        lights::{AmbientLight, DirectionalLight, LightRig, SpotLight},
    },
    stereo::StereoMode,
};

pub struct GuiLayer {
    ctx: egui::Context,
    state: egui_winit::State,
    renderer: egui_wgpu::Renderer,
    textures: PendingTextures,
}

impl std::fmt::Debug for GuiLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuiLayer").finish_non_exhaustive()
    }
}

/// Tessellated GUI of one frame, ready to be drawn over the scene.
pub struct GuiFrame {
    paint_jobs: Vec<egui::ClippedPrimitive>,
    screen: ScreenDescriptor,
}

/// Texture changes egui has handed out but the renderer hasn't seen yet.
///
/// egui sends the font atlas once in full and then only as patches, so a
/// frame that is never drawn must not lose its deltas.
#[derive(Default)]
struct PendingTextures {
    delta: egui::TexturesDelta,
}

impl PendingTextures {
    fn push(&mut self, delta: egui::TexturesDelta) {
        self.delta.append(delta);
    }

    fn take_uploads(&mut self) -> Vec<(egui::TextureId, egui::epaint::ImageDelta)> {
        std::mem::take(&mut self.delta.set)
    }

    fn take_frees(&mut self) -> Vec<egui::TextureId> {
        std::mem::take(&mut self.delta.free)
    }
}

impl GuiLayer {
    pub fn new(
        window: &Window,
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
    ) -> Self {
        let ctx = egui::Context::default();
        let state = egui_winit::State::new(
            ctx.clone(),
            ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            Some(device.limits().max_texture_dimension_2d as usize),
        );
        let renderer = egui_wgpu::Renderer::new(device, color_format, None, 1, false);
        Self {
            ctx,
            state,
            renderer,
            textures: PendingTextures::default(),
        }
    }

    /// Feeds a window event to egui; `true` if egui used it.
    pub fn on_window_event(&mut self, window: &Window, event: &winit::event::WindowEvent) -> bool {
        self.state.on_window_event(window, event).consumed
    }

    /// Runs the widgets for this frame.
    pub fn run(
        &mut self,
        window: &Window,
        size_in_pixels: [u32; 2],
        run_ui: impl FnMut(&egui::Context),
    ) -> GuiFrame {
        let raw_input = self.state.take_egui_input(window);
        let full_output = self.ctx.run(raw_input, run_ui);
        self.state
            .handle_platform_output(window, full_output.platform_output);
        let paint_jobs = self
            .ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        self.textures.push(full_output.textures_delta);
        GuiFrame {
            paint_jobs,
            screen: ScreenDescriptor {
                size_in_pixels,
                pixels_per_point: full_output.pixels_per_point,
            },
        }
    }

    /// Uploads textures and buffers; the returned command buffers must be
    /// submitted before the encoder that draws the frame.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        frame: &GuiFrame,
    ) -> Vec<wgpu::CommandBuffer> {
        for (id, image_delta) in self.textures.take_uploads() {
            self.renderer.update_texture(device, queue, id, &image_delta);
        }
        self.renderer
            .update_buffers(device, queue, encoder, &frame.paint_jobs, &frame.screen)
    }

    /// Draws on top of whatever `view` already holds.
    pub fn render(&mut self, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView, frame: &GuiFrame) {
        let pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("GUI Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        let mut pass = pass.forget_lifetime();
        self.renderer
            .render(&mut pass, &frame.paint_jobs, &frame.screen);
    }

    /// Releases textures egui is done with, once the frame using them is submitted.
    pub fn finish(&mut self) {
        for id in self.textures.take_frees() {
            self.renderer.free_texture(&id);
        }
    }
}

/// What the panel changed this frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PanelResponse {
    pub lights_changed: bool,
    /// Spot distance or angle moved: the helper cone must be rebuilt.
    pub spot_helper_changed: bool,
}

impl PanelResponse {
    fn merge(&mut self, other: PanelResponse) {
        self.lights_changed |= other.lights_changed;
        self.spot_helper_changed |= other.spot_helper_changed;
    }
}

/// Axis of the directional light's target a slider moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// One value a panel widget changed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightEdit {
    AmbientColor(Color),
    AmbientIntensity(f32),
    DuskColor(Color),
    DuskIntensity(f32),
    DuskTarget(Axis, f32),
    SpotColor(Color),
    SpotIntensity(f32),
    SpotDistance(f32),
    /// In degrees, as shown on the slider.
    SpotAngle(f32),
    SpotPenumbra(f32),
}

impl LightEdit {
    pub fn apply(self, rig: &mut LightRig) -> PanelResponse {
        let helper = matches!(self, LightEdit::SpotDistance(_) | LightEdit::SpotAngle(_));
        match self {
            LightEdit::AmbientColor(color) => rig.ambient.color = color,
            LightEdit::AmbientIntensity(value) => rig.ambient.intensity = value,
            LightEdit::DuskColor(color) => rig.dusk.color = color,
            LightEdit::DuskIntensity(value) => rig.dusk.intensity = value,
            LightEdit::DuskTarget(Axis::X, value) => rig.dusk.target.x = value,
            LightEdit::DuskTarget(Axis::Y, value) => rig.dusk.target.y = value,
            LightEdit::DuskTarget(Axis::Z, value) => rig.dusk.target.z = value,
            LightEdit::SpotColor(color) => rig.spot.color = color,
            LightEdit::SpotIntensity(value) => rig.spot.intensity = value,
            LightEdit::SpotDistance(value) => rig.spot.distance = value,
            LightEdit::SpotAngle(degrees) => rig.spot.set_angle_degrees(degrees),
            LightEdit::SpotPenumbra(value) => rig.spot.penumbra = value,
        }
        PanelResponse {
            lights_changed: true,
            spot_helper_changed: helper,
        }
    }
}

/// The light panel, pinned to the top-right corner.
pub fn light_panels(ctx: &egui::Context, rig: &mut LightRig) -> PanelResponse {
    let mut edits = Vec::new();
    egui::Window::new("Lights")
        .anchor(Align2::RIGHT_TOP, [-8.0, 8.0])
        .resizable(false)
        .show(ctx, |ui| {
            CollapsingHeader::new("Ambient")
                .default_open(true)
                .show(ui, |ui| ambient_controls(ui, &rig.ambient, &mut edits));
            CollapsingHeader::new("Directional")
                .default_open(true)
                .show(ui, |ui| directional_controls(ui, &rig.dusk, &mut edits));
            CollapsingHeader::new("Spot")
                .default_open(true)
                .show(ui, |ui| spot_controls(ui, &rig.spot, &mut edits));
        });
    apply_edits(rig, edits)
}

pub fn apply_edits(rig: &mut LightRig, edits: impl IntoIterator<Item = LightEdit>) -> PanelResponse {
    let mut response = PanelResponse::default();
    for edit in edits {
        response.merge(edit.apply(rig));
    }
    response
}

fn color_row(ui: &mut Ui, color: Color) -> Option<Color> {
    ui.horizontal(|ui| {
        let mut rgb = color.to_rgb8();
        let changed = ui.color_edit_button_srgb(&mut rgb).changed();
        ui.label(color.to_hex_string());
        (changed && rgb != color.to_rgb8()).then(|| Color::from_rgb8(rgb))
    })
    .inner
}

fn slider(ui: &mut Ui, value: f32, range: std::ops::RangeInclusive<f32>, step: f64, name: &str) -> Option<f32> {
    let mut value = value;
    let mut slider = Slider::new(&mut value, range).text(name);
    if step > 0.0 {
        slider = slider.step_by(step);
    }
    ui.add(slider).changed().then_some(value)
}

fn ambient_controls(ui: &mut Ui, light: &AmbientLight, edits: &mut Vec<LightEdit>) {
    edits.extend(color_row(ui, light.color).map(LightEdit::AmbientColor));
    edits.extend(slider(ui, light.intensity, 0.0..=5.0, 0.01, "intensity").map(LightEdit::AmbientIntensity));
}

fn directional_controls(ui: &mut Ui, light: &DirectionalLight, edits: &mut Vec<LightEdit>) {
    edits.extend(color_row(ui, light.color).map(LightEdit::DuskColor));
    edits.extend(slider(ui, light.intensity, 0.0..=2.0, 0.01, "intensity").map(LightEdit::DuskIntensity));
    for (axis, value, range, name) in [
        (Axis::X, light.target.x, -10.0..=10.0, "x"),
        (Axis::Z, light.target.z, -10.0..=10.0, "z"),
        (Axis::Y, light.target.y, 0.0..=10.0, "y"),
    ] {
        edits.extend(slider(ui, value, range, 0.01, name).map(|v| LightEdit::DuskTarget(axis, v)));
    }
}

fn spot_controls(ui: &mut Ui, light: &SpotLight, edits: &mut Vec<LightEdit>) {
    edits.extend(color_row(ui, light.color).map(LightEdit::SpotColor));
    edits.extend(slider(ui, light.intensity, 0.0..=2.0, 0.01, "intensity").map(LightEdit::SpotIntensity));
    edits.extend(slider(ui, light.distance, 0.0..=40.0, 0.0, "distance").map(LightEdit::SpotDistance));
    edits.extend(slider(ui, light.angle_degrees(), 0.0..=90.0, 0.0, "angle").map(LightEdit::SpotAngle));
    edits.extend(slider(ui, light.penumbra, 0.0..=1.0, 0.01, "penumbra").map(LightEdit::SpotPenumbra));
}

/// The "ENTER VR" / "EXIT VR" button at the bottom of the screen.
pub fn vr_button(ctx: &egui::Context, stereo: &mut StereoMode) -> bool {
    let clicked = egui::Area::new(egui::Id::new(VR_BUTTON_AREA))
        .anchor(Align2::CENTER_BOTTOM, [0.0, -20.0])
        .show(ctx, |ui| {
            ui.add(egui::Button::new(
                egui::RichText::new(stereo.button_label()).size(13.0),
            ))
            .clicked()
        })
        .inner;
    if clicked {
        stereo.toggle();
    }
    clicked
}

const VR_BUTTON_AREA: &str = "vr_button";

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use egui::{
        ColorImage, Event, ImageData, PointerButton, Pos2, RawInput, Rect, TextureId,
        TextureOptions, epaint::ImageDelta, vec2,
    };

    use super::*;
    use crate::scene::builder::light_rig;

    const EPSILON: f32 = 0.0001;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    fn input(events: Vec<Event>) -> RawInput {
        RawInput {
            screen_rect: Some(Rect::from_min_size(Pos2::ZERO, vec2(800.0, 600.0))),
            events,
            ..Default::default()
        }
    }

    fn run_frame(
        ctx: &egui::Context,
        events: Vec<Event>,
        rig: &mut LightRig,
        stereo: &mut StereoMode,
    ) -> (PanelResponse, bool) {
        let mut response = PanelResponse::default();
        let mut clicked = false;
        let _ = ctx.run(input(events), |ctx| {
            response = light_panels(ctx, rig);
            clicked = vr_button(ctx, stereo);
        });
        (response, clicked)
    }

    fn button(pos: Pos2, pressed: bool) -> Event {
        Event::PointerButton {
            pos,
            button: PointerButton::Primary,
            pressed,
            modifiers: Default::default(),
        }
    }

    fn image() -> ImageData {
        ImageData::Color(Arc::new(ColorImage::from_rgba_unmultiplied(
            [1, 1],
            &[255, 255, 255, 255],
        )))
    }

    #[test]
    fn idle_frames_change_nothing() {
        let ctx = egui::Context::default();
        let mut rig = light_rig();
        let before = rig.clone();
        let mut stereo = StereoMode::new(0.064);
        for _ in 0..3 {
            let (response, clicked) = run_frame(&ctx, Vec::new(), &mut rig, &mut stereo);
            assert_eq!(response, PanelResponse::default());
            assert!(!clicked);
        }
        assert_eq!(rig, before);
        assert!(!stereo.is_enabled());
    }

    #[test]
    fn angle_edit_is_stored_in_radians() {
        let mut rig = light_rig();
        let response = LightEdit::SpotAngle(45.0).apply(&mut rig);
        assert!(approx_eq(rig.spot.angle, std::f32::consts::FRAC_PI_4));
        assert!(response.spot_helper_changed);
        assert!(response.lights_changed);
    }

    #[test]
    fn only_cone_edits_rebuild_the_helper() {
        for edit in [LightEdit::SpotDistance(25.0), LightEdit::SpotAngle(20.0)] {
            let mut rig = light_rig();
            assert_eq!(
                edit.apply(&mut rig),
                PanelResponse {
                    lights_changed: true,
                    spot_helper_changed: true,
                }
            );
        }
        for edit in [
            LightEdit::SpotPenumbra(0.5),
            LightEdit::SpotColor(Color::from_hex(0x00ff00)),
            LightEdit::SpotIntensity(1.5),
            LightEdit::AmbientIntensity(3.0),
            LightEdit::DuskTarget(Axis::Y, 7.0),
        ] {
            let mut rig = light_rig();
            assert_eq!(
                edit.apply(&mut rig),
                PanelResponse {
                    lights_changed: true,
                    spot_helper_changed: false,
                }
            );
        }
    }

    #[test]
    fn edits_land_on_the_right_light() {
        let mut rig = light_rig();
        let mut expected = rig.clone();
        let response = apply_edits(
            &mut rig,
            [
                LightEdit::SpotPenumbra(0.25),
                LightEdit::DuskTarget(Axis::X, -4.0),
                LightEdit::AmbientColor(Color::from_hex(0x102030)),
                LightEdit::SpotDistance(12.0),
            ],
        );
        expected.spot.penumbra = 0.25;
        expected.dusk.target.x = -4.0;
        expected.ambient.color = Color::from_hex(0x102030);
        expected.spot.distance = 12.0;
        assert_eq!(rig, expected);
        assert!(response.lights_changed && response.spot_helper_changed);
    }

    #[test]
    fn clicking_the_vr_button_toggles_stereo() {
        let ctx = egui::Context::default();
        let mut rig = light_rig();
        let mut stereo = StereoMode::new(0.064);
        for _ in 0..3 {
            run_frame(&ctx, Vec::new(), &mut rig, &mut stereo);
        }
        let center = ctx
            .memory(|memory| memory.area_rect(egui::Id::new(VR_BUTTON_AREA)))
            .map(|rect| rect.center())
            .unwrap();
        assert!(center.y > 300.0);

        run_frame(&ctx, vec![Event::PointerMoved(center)], &mut rig, &mut stereo);
        run_frame(&ctx, vec![button(center, true)], &mut rig, &mut stereo);
        let (_, clicked) = run_frame(&ctx, vec![button(center, false)], &mut rig, &mut stereo);
        assert!(clicked);
        assert!(stereo.is_enabled());
        assert_eq!(stereo.button_label(), "EXIT VR");
    }

    #[test]
    fn undrawn_frames_keep_their_texture_uploads() {
        let mut pending = PendingTextures::default();
        let font = TextureId::Managed(0);

        // the full atlas arrives with a frame that never reaches the GPU
        let mut first = egui::TexturesDelta::default();
        first
            .set
            .push((font, ImageDelta::full(image(), TextureOptions::LINEAR)));
        pending.push(first);

        let mut second = egui::TexturesDelta::default();
        second
            .set
            .push((font, ImageDelta::partial([0, 0], image(), TextureOptions::LINEAR)));
        second.free.push(TextureId::Managed(3));
        pending.push(second);

        let uploads = pending.take_uploads();
        assert_eq!(uploads.len(), 2);
        assert!(uploads[0].1.is_whole());
        assert!(!uploads[1].1.is_whole());
        assert!(pending.take_uploads().is_empty());
        assert_eq!(pending.take_frees(), vec![TextureId::Managed(3)]);
        assert!(pending.take_frees().is_empty());
    }
}
