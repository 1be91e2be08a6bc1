use std::f32::consts::TAU;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use egui::Context as EguiContext;
use framelab_assets::AssetStore;
use framelab_demos::{Demo, DemoId, FramelabConfig, create};
use framelab_input::{Action, Control, ControlId, InputState, Key, bind_key};
use framelab_render::FrameView;
use framelab_render_wgpu::WgpuRenderer;
use framelab_tween::FrameClock;
use glam::Vec2;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

const INITIAL_SIZE: (u32, u32) = (1280, 720);

#[derive(Parser)]
#[command(name = "framelab-desktop", about = "Framelab demo viewer")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML config overriding demo defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Texture root directory
    #[arg(long, default_value = "./assets")]
    assets: PathBuf,

    /// Demo to start with, by name or number
    #[arg(short, long, default_value = "1")]
    demo: String,

    /// RNG seed handed to every demo
    #[arg(short, long, default_value = "42")]
    seed: u64,
}

fn map_key(key: KeyCode) -> Key {
    match key {
        KeyCode::Space => Key::Space,
        KeyCode::ArrowLeft => Key::Left,
        KeyCode::ArrowRight => Key::Right,
        KeyCode::ArrowUp => Key::Up,
        KeyCode::ArrowDown => Key::Down,
        KeyCode::Escape => Key::Escape,
        _ => Key::Other,
    }
}

/// Number keys 1-8 jump straight to a demo.
fn demo_hotkey(key: KeyCode) -> Option<DemoId> {
    let index = match key {
        KeyCode::Digit1 => 0,
        KeyCode::Digit2 => 1,
        KeyCode::Digit3 => 2,
        KeyCode::Digit4 => 3,
        KeyCode::Digit5 => 4,
        KeyCode::Digit6 => 5,
        KeyCode::Digit7 => 6,
        KeyCode::Digit8 => 7,
        _ => return None,
    };
    DemoId::ALL.get(index).copied()
}

/// Segment (1-based, pad 1 at the top, increasing clockwise) under a pointer
/// at `offset` from the wheel center. The hub and the outside hit nothing.
fn wheel_segment(offset: egui::Vec2, radius: f32, segments: u8) -> Option<u8> {
    let distance = offset.length();
    if segments == 0 || distance > radius || distance < radius * 0.3 {
        return None;
    }
    let step = TAU / segments as f32;
    let angle = offset.x.atan2(-offset.y).rem_euclid(TAU);
    Some(((angle + step / 2.0) / step) as u8 % segments + 1)
}

/// Demo plus the input state the window layer feeds it.
struct AppState {
    config: FramelabConfig,
    seed: u64,
    demo: Box<dyn Demo>,
    input: InputState,
    clock: FrameClock,
    /// Mouse button currently dragging the orbit rig.
    drag: Option<MouseButton>,
    cursor: Vec2,
    wheel_hover: Option<u8>,
    show_panel: bool,
    /// Actions produced by the UI this frame.
    pending: Vec<Action>,
    /// Demo chosen this frame; switched once the GPU is at hand.
    switch_to: Option<DemoId>,
}

impl AppState {
    fn new(config: FramelabConfig, seed: u64, id: DemoId) -> Result<Self> {
        let (width, height) = INITIAL_SIZE;
        let demo = create(id, &config, seed, width, height).with_context(|| format!("creating {id}"))?;
        Ok(Self {
            config,
            seed,
            demo,
            input: InputState::new(width, height),
            clock: FrameClock::new(),
            drag: None,
            cursor: Vec2::ZERO,
            wheel_hover: None,
            show_panel: true,
            pending: Vec::new(),
            switch_to: None,
        })
    }

    fn dispatch(&mut self, action: &Action) {
        self.input.apply(action);
        self.demo.handle(action);
    }

    /// Replace the running demo, keeping the current one if construction fails.
    fn switch(&mut self, id: DemoId) -> bool {
        let (width, height) = self.input.viewport();
        match create(id, &self.config, self.seed, width, height) {
            Ok(demo) => {
                self.demo = demo;
                self.clock = FrameClock::new();
                self.drag = None;
                self.wheel_hover = None;
                info!(demo = %id, "switched demo");
                true
            }
            Err(e) => {
                error!("failed to create {id}: {e}");
                false
            }
        }
    }

    fn handle_key(&mut self, key: KeyCode, pressed: bool) {
        if pressed {
            match key {
                KeyCode::F1 => {
                    self.show_panel = !self.show_panel;
                    return;
                }
                _ => {
                    if let Some(id) = demo_hotkey(key) {
                        self.switch_to = Some(id);
                        return;
                    }
                }
            }
        }
        let key = map_key(key);
        if pressed {
            self.input.key_down(key);
        } else {
            self.input.key_up(key);
        }
        let action = bind_key(key, pressed);
        if action != Action::Noop {
            self.dispatch(&action);
        }
    }

    fn cursor_moved(&mut self, position: Vec2) {
        let delta = position - self.cursor;
        self.cursor = position;
        if let (Some(button), Some(orbit)) = (self.drag, self.demo.orbit()) {
            match button {
                MouseButton::Left => orbit.rotate(delta.x, delta.y),
                MouseButton::Right => orbit.pan(delta.x, delta.y),
                _ => {}
            }
        }
        self.dispatch(&Action::PointerMove(position));
    }

    fn mouse_button(&mut self, button: MouseButton, pressed: bool) {
        if pressed {
            self.drag = Some(button);
        } else if self.drag == Some(button) {
            self.drag = None;
        }
        if button == MouseButton::Left {
            let action = if pressed {
                Action::PointerDown(self.cursor)
            } else {
                Action::PointerUp
            };
            self.dispatch(&action);
        }
    }

    fn scroll(&mut self, lines: f32) {
        if let Some(orbit) = self.demo.orbit() {
            let step = orbit.distance * 0.1;
            orbit.zoom(-lines * step);
        }
    }

    fn draw_ui(&mut self, ctx: &EguiContext) {
        if !self.show_panel {
            return;
        }
        let current = self.demo.id();
        let controls = self.demo.controls();
        let mut actions = Vec::new();
        let mut switch_to = None;
        let mut wheel_hover = self.wheel_hover;

        egui::SidePanel::left("controls")
            .default_width(240.0)
            .show(ctx, |ui| {
                ui.heading("Framelab");
                ui.separator();
                egui::ComboBox::from_label("Demo")
                    .selected_text(current.title())
                    .show_ui(ui, |ui| {
                        for (i, id) in DemoId::ALL.into_iter().enumerate() {
                            let label = format!("{}. {}", i + 1, id.title());
                            if ui.selectable_label(id == current, label).clicked() && id != current {
                                switch_to = Some(id);
                            }
                        }
                    });
                ui.separator();

                for control in &controls {
                    if let Some(action) = control_ui(ui, control, &mut wheel_hover) {
                        actions.push(action);
                    }
                }

                ui.separator();
                ui.small("F1: panel | 1-8: demos | drag: orbit | wheel: zoom");
            });

        self.wheel_hover = wheel_hover;
        self.pending.extend(actions);
        if switch_to.is_some() {
            self.switch_to = switch_to;
        }
    }
}

fn control_ui(ui: &mut egui::Ui, control: &Control, wheel_hover: &mut Option<u8>) -> Option<Action> {
    match *control {
        Control::Radio {
            id,
            label,
            options,
            selected,
        } => {
            ui.label(label);
            let mut picked = None;
            ui.horizontal_wrapped(|ui| {
                for &option in options {
                    if ui.radio(option == selected, option).clicked() && option != selected {
                        picked = Some(Action::Select {
                            control: id,
                            option,
                        });
                    }
                }
            });
            picked
        }
        Control::Toggle { id, label, on } => {
            let mut value = on;
            ui.checkbox(&mut value, label)
                .changed()
                .then_some(Action::Toggle { control: id, on: value })
        }
        Control::Button { id, label, visible } => {
            (visible && ui.button(label).clicked()).then_some(Action::Press(id))
        }
        Control::Gauge { value, visible, .. } => {
            if visible {
                let fraction = (value / 100.0).clamp(0.0, 1.0);
                ui.add(egui::ProgressBar::new(fraction).text(format!("{value:.0}%")));
            }
            None
        }
        Control::Wheel { id, segments, active } => wheel_ui(ui, id, segments, active, wheel_hover),
    }
}

fn wheel_ui(
    ui: &mut egui::Ui,
    id: ControlId,
    segments: u8,
    active: bool,
    hover: &mut Option<u8>,
) -> Option<Action> {
    let (rect, response) = ui.allocate_exact_size(egui::vec2(140.0, 140.0), egui::Sense::hover());
    let center = rect.center();
    let radius = rect.width() * 0.5;
    let current = response
        .hover_pos()
        .and_then(|p| wheel_segment(p - center, radius, segments));

    let painter = ui.painter();
    let visuals = ui.visuals();
    let step = TAU / segments.max(1) as f32;
    for i in 0..segments {
        let angle = i as f32 * step;
        let pos = center + egui::vec2(angle.sin(), -angle.cos()) * radius * 0.7;
        let fill = if active && current == Some(i + 1) {
            visuals.selection.bg_fill
        } else {
            visuals.widgets.inactive.bg_fill
        };
        painter.circle_filled(pos, radius * 0.2, fill);
        painter.text(
            pos,
            egui::Align2::CENTER_CENTER,
            (i + 1).to_string(),
            egui::FontId::proportional(12.0),
            visuals.text_color(),
        );
    }

    if !active || current == *hover {
        *hover = current;
        return None;
    }
    *hover = current;
    current.map(|index| Action::Segment { control: id, index })
}

/// Window, surface and everything drawn into it.
struct Gpu {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    renderer: WgpuRenderer,
    egui_winit: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl Gpu {
    fn new(event_loop: &ActiveEventLoop, egui_ctx: &EguiContext, assets: AssetStore) -> Result<Self> {
        let attrs = Window::default_attributes()
            .with_title("Framelab")
            .with_inner_size(PhysicalSize::new(INITIAL_SIZE.0, INITIAL_SIZE.1));
        let window = Arc::new(event_loop.create_window(attrs).context("create window")?);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window.clone())
            .context("create surface")?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("no suitable GPU adapter")?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("framelab_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .context("create device")?;

        let size = window.inner_size();
        let caps = surface.get_capabilities(&adapter);
        // Colors are authored in display space, so the surface must not
        // re-encode them.
        let surface_format = caps
            .formats
            .iter()
            .find(|f| !f.is_srgb())
            .or(caps.formats.first())
            .copied()
            .context("surface reports no formats")?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let renderer = WgpuRenderer::new(&device, &queue, surface_format, config.width, config.height, assets);
        let egui_winit = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);

        info!(
            backend = adapter.get_info().backend.to_str(),
            format = ?surface_format,
            "GPU initialized"
        );

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            renderer,
            egui_winit,
            egui_renderer,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.config.width = width.max(1);
        self.config.height = height.max(1);
        self.surface.configure(&self.device, &self.config);
        self.renderer.resize(&self.device, self.config.width, self.config.height);
    }

    /// Drop per-demo GPU state and upload the new demo's textures.
    fn prepare(&mut self, demo: &dyn Demo) {
        self.renderer.reset();
        let keys = demo.textures();
        self.renderer.preload(&self.device, &self.queue, &keys);
        debug!(demo = %demo.id(), textures = keys.len(), "textures preloaded");
    }
}

struct App {
    state: AppState,
    assets: PathBuf,
    gpu: Option<Gpu>,
    egui_ctx: EguiContext,
}

impl App {
    fn new(state: AppState, assets: PathBuf) -> Self {
        Self {
            state,
            assets,
            gpu: None,
            egui_ctx: EguiContext::default(),
        }
    }

    fn redraw(&mut self) {
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };

        let time = self.state.clock.tick();
        self.state.demo.update(&time, &self.state.input);

        let output = match gpu.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.surface.configure(&gpu.device, &gpu.config);
                return;
            }
            Err(e) => {
                error!("surface error: {e}");
                return;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });

        let frame = self.state.demo.view();
        if let Err(e) = gpu
            .renderer
            .render(&gpu.device, &gpu.queue, &mut encoder, &view, &frame)
        {
            error!(kind = frame.kind(), "render failed: {e}");
        }
        if let FrameView::PostProcess { graph } = &frame {
            debug!(passes = graph.passes.len(), "post-process frame");
        }

        let raw_input = gpu.egui_winit.take_egui_input(&gpu.window);
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            self.state.draw_ui(ctx);
        });
        gpu.egui_winit
            .handle_platform_output(&gpu.window, full_output.platform_output);

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [gpu.config.width, gpu.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };
        for (id, image_delta) in &full_output.textures_delta.set {
            gpu.egui_renderer
                .update_texture(&gpu.device, &gpu.queue, *id, image_delta);
        }
        gpu.egui_renderer.update_buffers(
            &gpu.device,
            &gpu.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );
        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui_pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    ..Default::default()
                })
                .forget_lifetime();
            gpu.egui_renderer
                .render(&mut pass, &paint_jobs, &screen_descriptor);
        }
        gpu.queue.submit(std::iter::once(encoder.finish()));
        for id in &full_output.textures_delta.free {
            gpu.egui_renderer.free_texture(id);
        }
        output.present();

        self.apply_ui_actions();
    }

    /// Feed UI actions to the demo and perform any requested switch.
    fn apply_ui_actions(&mut self) {
        for action in std::mem::take(&mut self.state.pending) {
            self.state.dispatch(&action);
        }
        self.apply_switch();
    }

    fn apply_switch(&mut self) {
        let Some(id) = self.state.switch_to.take() else {
            return;
        };
        if self.state.switch(id) {
            if let Some(gpu) = self.gpu.as_mut() {
                gpu.prepare(self.state.demo.as_ref());
            }
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }
        match Gpu::new(event_loop, &self.egui_ctx, AssetStore::new(&self.assets)) {
            Ok(mut gpu) => {
                gpu.prepare(self.state.demo.as_ref());
                let resize = Action::Resize {
                    width: gpu.config.width,
                    height: gpu.config.height,
                };
                self.state.dispatch(&resize);
                self.state.clock.reset();
                self.gpu = Some(gpu);
            }
            Err(e) => {
                error!("failed to initialize graphics: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        let response = gpu.egui_winit.on_window_event(&gpu.window, &event);
        if response.consumed {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                gpu.resize(new_size.width, new_size.height);
                let resize = Action::Resize {
                    width: gpu.config.width,
                    height: gpu.config.height,
                };
                self.state.dispatch(&resize);
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: key_state,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                self.state.handle_key(key, key_state == ElementState::Pressed);
                self.apply_switch();
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.state
                    .cursor_moved(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::MouseInput { button, state, .. } => {
                self.state.mouse_button(button, state == ElementState::Pressed);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / 50.0,
                };
                self.state.scroll(lines);
            }
            WindowEvent::RedrawRequested => {
                self.redraw();
                if let Some(gpu) = &self.gpu {
                    gpu.window.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(gpu) = &self.gpu {
            gpu.window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let config = match &cli.config {
        Some(path) => FramelabConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => FramelabConfig::default(),
    };
    let id: DemoId = cli.demo.parse()?;
    info!(demo = %id, seed = cli.seed, "framelab-desktop starting");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(AppState::new(config, cli.seed, id)?, cli.assets);
    event_loop.run_app(&mut app)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrows_and_space_map_to_demo_keys() {
        assert_eq!(map_key(KeyCode::Space), Key::Space);
        assert_eq!(map_key(KeyCode::ArrowUp), Key::Up);
        assert_eq!(map_key(KeyCode::KeyQ), Key::Other);
    }

    #[test]
    fn digits_pick_demos() {
        assert_eq!(demo_hotkey(KeyCode::Digit1), Some(DemoId::CubeShift));
        assert_eq!(demo_hotkey(KeyCode::Digit8), Some(DemoId::Slideshow));
        assert_eq!(demo_hotkey(KeyCode::Digit9), None);
    }

    #[test]
    fn wheel_segments_run_clockwise_from_the_top() {
        assert_eq!(wheel_segment(egui::vec2(0.0, -50.0), 60.0, 8), Some(1));
        assert_eq!(wheel_segment(egui::vec2(50.0, 0.0), 60.0, 8), Some(3));
        assert_eq!(wheel_segment(egui::vec2(0.0, 50.0), 60.0, 8), Some(5));
        assert_eq!(wheel_segment(egui::vec2(-50.0, 0.0), 60.0, 8), Some(7));
    }

    #[test]
    fn wheel_hub_and_outside_hit_nothing() {
        assert_eq!(wheel_segment(egui::vec2(0.0, 5.0), 60.0, 8), None);
        assert_eq!(wheel_segment(egui::vec2(0.0, 90.0), 60.0, 8), None);
    }

    #[test]
    fn ui_switch_keeps_viewport() {
        let mut state = AppState::new(FramelabConfig::default(), 1, DemoId::Fan).unwrap();
        state.dispatch(&Action::Resize { width: 640, height: 480 });
        assert!(state.switch(DemoId::Crossfade));
        assert_eq!(state.demo.id(), DemoId::Crossfade);
        assert_eq!(state.input.viewport(), (640, 480));
    }
}
