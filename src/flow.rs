//! Flow control and application event loop.
//!
//! A "flow" owns the content of the window: it loads its resources once,
//! updates them every frame, draws its GUI and hands back a [`Render`] tree.
//! The loop in this module owns everything else: the window, the GPU
//! [`Context`], the GUI layer and the camera.
//!
//! # Lifecycle
//!
//! Each frame:
//! 1. Window events go to the GUI first, then to the orbit camera unless the
//!    GUI claimed them
//! 2. `on_update` advances the flow to the current time
//! 3. `on_gui` builds the panels
//! 4. The flow's `on_render` tree is batched and drawn once per eye
//! 5. The GUI is drawn on top and the frame is presented

use std::{fmt::Debug, iter, sync::Arc};

use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::Window,
};

use crate::{
    config::SceneConfig,
    context::Context,
    gui::GuiLayer,
    render::{Batches, Render},
};

/// Trait for the content of the window.
///
/// # Lifecycle
///
/// 1. `load()` builds the flow once the GPU is ready
/// 2. `on_init()` configures the context (clear colour, lights)
/// 3. `on_update()` is called every frame with the time since start
/// 4. `on_gui()` is called every frame to build the GUI
/// 5. `on_render()` is called every frame and specifies how to draw `self`
pub trait GraphicsFlow: Sized + 'static {
    /// Create all GPU resources of the flow.
    fn load(ctx: &Context, config: &SceneConfig) -> impl Future<Output = anyhow::Result<Self>>;

    /// The only place meant for one-off configuration of the context.
    fn on_init(&mut self, ctx: &mut Context);

    /// Advance animations. `time` is measured from the first frame.
    fn on_update(&mut self, ctx: &mut Context, time: Duration);

    fn on_gui(&mut self, ctx: &mut Context, gui: &egui::Context);

    /// Collect what should be drawn this frame.
    fn on_render(&self) -> Render<'_>;
}

/// Application state bundle: GPU context, GUI, the flow and surface status.
pub struct AppState<F: GraphicsFlow> {
    pub(crate) ctx: Context,
    gui: GuiLayer,
    flow: F,
    is_surface_configured: bool,
    start: Option<Instant>,
}

impl<F: GraphicsFlow> Debug for AppState<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("ctx", &self.ctx)
            .field("is_surface_configured", &self.is_surface_configured)
            .finish_non_exhaustive()
    }
}

impl<F: GraphicsFlow> AppState<F> {
    async fn new(window: Arc<Window>, config: &SceneConfig) -> anyhow::Result<Self> {
        let mut ctx = Context::new(window.clone(), config).await?;
        let gui = GuiLayer::new(&window, &ctx.device, ctx.config.format);
        let mut flow = F::load(&ctx, config).await?;
        flow.on_init(&mut ctx);
        Ok(Self {
            ctx,
            gui,
            flow,
            is_surface_configured: false,
            start: None,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if self.ctx.resize(width, height) {
            self.is_surface_configured = true;
        }
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        self.ctx.window.request_redraw();

        if !self.is_surface_configured {
            return Ok(());
        }

        // Acquire first: a frame that bails out here must not have run the GUI.
        let output = self.ctx.surface.get_current_texture()?;

        let time = self.start.get_or_insert_with(Instant::now).elapsed();
        self.flow.on_update(&mut self.ctx, time);

        let window = self.ctx.window.clone();
        let (width, height) = self.ctx.size();
        let gui_frame = {
            let ctx = &mut self.ctx;
            let flow = &mut self.flow;
            self.gui
                .run(&window, [width, height], |gui| flow.on_gui(ctx, gui))
        };

        let eyes = self
            .ctx
            .stereo
            .eyes(&self.ctx.camera.controller, width, height);
        for (index, eye) in eyes.iter().enumerate().take(self.ctx.camera.eyes.len()) {
            self.ctx.camera.write_eye(
                &self.ctx.queue,
                index,
                eye.position,
                eye.view,
                eye.viewport.aspect(),
            );
        }

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        let gui_buffers = self
            .gui
            .prepare(&self.ctx.device, &self.ctx.queue, &mut encoder, &gui_frame);

        {
            let batches = Batches::from(self.flow.on_render());
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.ctx.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.ctx.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            for (index, eye) in eyes.iter().enumerate().take(self.ctx.camera.eyes.len()) {
                let viewport = eye.viewport;
                if viewport.is_empty() {
                    continue;
                }
                render_pass.set_viewport(
                    viewport.x,
                    viewport.y,
                    viewport.width,
                    viewport.height,
                    0.0,
                    1.0,
                );
                batches.draw(&mut render_pass, &self.ctx, index);
            }
        }

        self.gui.render(&mut encoder, &view, &gui_frame);

        self.ctx
            .queue
            .submit(gui_buffers.into_iter().chain(iter::once(encoder.finish())));
        output.present();
        self.gui.finish();
        Ok(())
    }
}

/// Whether the orbit camera should see `event`.
///
/// Presses and wheel turns over a GUI widget stay with the GUI. Everything
/// else is forwarded so a drag that ends over the panel still releases.
pub(crate) fn forward_to_camera(event: &WindowEvent, gui_consumed: bool) -> bool {
    if !gui_consumed {
        return true;
    }
    !matches!(
        event,
        WindowEvent::MouseInput {
            state: ElementState::Pressed,
            ..
        } | WindowEvent::MouseWheel { .. }
    )
}

pub struct App<F: GraphicsFlow> {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    #[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
    proxy: EventLoopProxy<FlowEvent<F>>,
    state: Option<AppState<F>>,
    config: SceneConfig,
    initializing: bool,
}

impl<F: GraphicsFlow> App<F> {
    fn new(event_loop: &EventLoop<FlowEvent<F>>, config: SceneConfig) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            state: None,
            config,
            initializing: false,
        })
    }

    fn window_attributes(&self) -> anyhow::Result<winit::window::WindowAttributes> {
        let mut window_attributes =
            Window::default_attributes().with_title(self.config.window.title.clone());

        #[cfg(not(target_arch = "wasm32"))]
        {
            window_attributes = window_attributes.with_inner_size(winit::dpi::LogicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));
        }

        #[cfg(target_arch = "wasm32")]
        {
            use winit::platform::web::WindowAttributesExtWebSys;

            let canvas = find_canvas(&self.config.window.canvas_id)?;
            window_attributes = window_attributes.with_canvas(Some(canvas));
        }

        Ok(window_attributes)
    }
}

#[cfg(target_arch = "wasm32")]
fn find_canvas(id: &str) -> anyhow::Result<web_sys::HtmlCanvasElement> {
    use anyhow::anyhow;
    use wasm_bindgen::JsCast;

    let document = web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| anyhow!("no document to draw into"))?;
    let canvas = document
        .get_element_by_id(id)
        .ok_or_else(|| anyhow!("no element with id `{id}`"))?;
    canvas
        .dyn_into()
        .map_err(|_| anyhow!("element `{id}` is not a canvas"))
}

pub enum FlowEvent<F: GraphicsFlow> {
    #[allow(dead_code)]
    Initialized(Box<AppState<F>>),
}

impl<F: GraphicsFlow> Debug for FlowEvent<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized(state) => f.debug_tuple("Initialized").field(state).finish(),
        }
    }
}

impl<F: GraphicsFlow> ApplicationHandler<FlowEvent<F>> for App<F> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() || self.initializing {
            return;
        }

        let window = match self
            .window_attributes()
            .and_then(|attributes| Ok(event_loop.create_window(attributes)?))
        {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Could not create the window: {e:#}");
                event_loop.exit();
                return;
            }
        };
        self.initializing = true;

        let config = self.config.clone();
        let init_future = async move { AppState::<F>::new(window, &config).await };

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.async_runtime.block_on(init_future) {
                Ok(state) => {
                    let size = state.ctx.window.inner_size();
                    let state = self.state.insert(state);
                    state.resize(size.width, size.height);
                    state.ctx.window.request_redraw();
                }
                Err(e) => {
                    log::error!("App initialization failed: {e:#}");
                    event_loop.exit();
                }
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                match init_future.await {
                    Ok(state) => {
                        if proxy
                            .send_event(FlowEvent::Initialized(Box::new(state)))
                            .is_err()
                        {
                            log::error!("Event loop closed before initialization finished");
                        }
                    }
                    Err(e) => log::error!("App initialization failed: {e:#}"),
                }
            });
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: FlowEvent<F>) {
        match event {
            FlowEvent::Initialized(state) => {
                // the message from the wasm `spawn_local`
                let state = self.state.insert(*state);
                let size = state.ctx.window.inner_size();
                state.resize(size.width, size.height);
                state.ctx.window.request_redraw();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        let consumed = state.gui.on_window_event(&state.ctx.window, &event);
        if forward_to_camera(&event, consumed) {
            state.ctx.camera.controller.handle_window_event(&event);
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::RedrawRequested => match state.render() {
                Ok(_) => {}
                // Reconfigure the surface if it's lost or outdated
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    let size = state.ctx.window.inner_size();
                    state.resize(size.width, size.height);
                }
                Err(e) => {
                    log::error!("Unable to render {}", e);
                }
            },
            _ => {}
        }
    }
}

/// Installs the platform logger. Safe to call more than once.
pub fn init_logger() {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            eprintln!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            log::warn!("Could not initialize logger: {}", e);
        }
    }
}

pub fn run<F: GraphicsFlow>(config: SceneConfig) -> anyhow::Result<()> {
    let event_loop: EventLoop<FlowEvent<F>> = EventLoop::with_user_event().build()?;

    let mut app: App<F> = App::new(&event_loop, config)?;

    event_loop.run_app(&mut app)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::event::{DeviceId, MouseButton, MouseScrollDelta, TouchPhase};

    fn press() -> WindowEvent {
        WindowEvent::MouseInput {
            device_id: unsafe { DeviceId::dummy() },
            state: ElementState::Pressed,
            button: MouseButton::Left,
        }
    }

    fn release() -> WindowEvent {
        WindowEvent::MouseInput {
            device_id: unsafe { DeviceId::dummy() },
            state: ElementState::Released,
            button: MouseButton::Left,
        }
    }

    fn wheel() -> WindowEvent {
        WindowEvent::MouseWheel {
            device_id: unsafe { DeviceId::dummy() },
            delta: MouseScrollDelta::LineDelta(0.0, 1.0),
            phase: TouchPhase::Moved,
        }
    }

    #[test]
    fn free_events_reach_the_camera() {
        assert!(forward_to_camera(&press(), false));
        assert!(forward_to_camera(&wheel(), false));
    }

    #[test]
    fn gui_keeps_presses_and_wheel() {
        assert!(!forward_to_camera(&press(), true));
        assert!(!forward_to_camera(&wheel(), true));
    }

    #[test]
    fn releases_always_reach_the_camera() {
        assert!(forward_to_camera(&release(), true));
    }
}
