//! Three-stage offscreen demo: nine film transitions, a composite of the
//! nine, and a final present.

use framelab_common::{Color, TextureKey};
use framelab_input::{Action, InputState};
use framelab_render::{
    FrameGraph, FrameView, OrbitCamera, Pass, PassOutput, PassUniforms, PerspectiveCamera, Program, TargetId,
    TargetSet,
};
use framelab_tween::FrameTime;
use glam::Vec2;
use tracing::warn;

use crate::config::SlideshowConfig;
use crate::tilt::PointerTilt;
use crate::{Demo, DemoId};

/// Films in the 3×3 composite.
pub const FILMS: usize = 9;

/// Frames per film.
pub const FRAMES: usize = 3;

/// Sentinel frame index so the first update always registers a change.
const NO_FRAME: u32 = FRAMES as u32;

pub struct Slideshow {
    camera: PerspectiveCamera,
    orbit: OrbitCamera,
    targets: TargetSet,
    tilt: PointerTilt,
    /// Pointer in `[0, 1]` of the viewport, y down.
    mouse: Vec2,
    /// `films[i]` holds that film's frames in order.
    films: Vec<[TextureKey; FRAMES]>,
    noise: TextureKey,
    frame: u32,
    change_time: f32,
    /// Shader time: elapsed milliseconds times the time scale.
    time: f32,
    graph: FrameGraph,
    config: SlideshowConfig,
}

/// Frame key for `film`, numbered from 1 (`01`, `02`, `03`).
pub fn frame_key(pattern: &str, film: &str, number: usize) -> TextureKey {
    TextureKey::new(pattern.replace("{film}", film).replace("{frame}", &format!("{number:02}")))
}

/// Transition weight between the outgoing and incoming frame, `since`
/// shader-time units after the frame changed. Holds at 0 for a while, ramps
/// up, then saturates.
pub fn transition_progress(since: f32) -> f32 {
    ((since.sin() - 0.3) / 0.5).clamp(0.0, 1.0)
}

impl Slideshow {
    pub fn new(config: &SlideshowConfig, width: u32, height: u32) -> Self {
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        let mut config = config.clone();
        if config.films.len() != FILMS {
            warn!(films = config.films.len(), "slideshow needs {FILMS} films, using the built-in list");
            config.films = SlideshowConfig::default().films;
        }
        let films = config
            .films
            .iter()
            .map(|film| std::array::from_fn(|i| frame_key(&config.frame_pattern, film, i + 1)))
            .collect::<Vec<_>>();
        let targets = TargetSet::new(FILMS as u8 + 1, width, height);
        let mut demo = Self {
            camera: config.orbit.camera(aspect),
            orbit: config.orbit.orbit(),
            graph: FrameGraph::new(targets.count()),
            targets,
            tilt: PointerTilt::new((width, height), config.mouse_seconds, config.mouse_seconds, 0.5),
            mouse: Vec2::splat(0.5),
            films,
            noise: TextureKey::new(config.noise_texture.as_str()),
            frame: NO_FRAME,
            change_time: 0.0,
            time: 0.0,
            config,
        };
        demo.orbit.apply(&mut demo.camera);
        demo.graph = demo.build_graph();
        demo
    }

    pub fn graph(&self) -> &FrameGraph {
        &self.graph
    }

    pub fn targets(&self) -> &TargetSet {
        &self.targets
    }

    /// Index of the frame currently fading out.
    pub fn frame(&self) -> u32 {
        self.frame % FRAMES as u32
    }

    fn composite_target(&self) -> TargetId {
        TargetId(FILMS as u8)
    }

    fn build_graph(&self) -> FrameGraph {
        let (w, h) = self.targets.size();
        let resolution = Vec2::new(w as f32, h as f32);
        let model = self.tilt.model();
        let grey = self.config.offscreen_grey;
        let primary = self.frame();
        let progress = transition_progress(self.time - self.change_time);

        let mut graph = FrameGraph::new(self.targets.count());
        for (index, frames) in self.films.iter().enumerate() {
            let mut pass = Pass::new(
                format!("film-{}", self.config.films[index]),
                Program::FilmEffect,
                PassOutput::Target(TargetId(index as u8)),
            );
            for key in frames {
                pass = pass.image(key.clone());
            }
            graph.push(
                pass.image(self.noise.clone())
                    .clear(Color::rgb(grey, grey, grey))
                    .uniforms(PassUniforms {
                        mvp: self.camera.view_projection() * model,
                        model,
                        time: self.time,
                        progress,
                        effect: index as u32,
                        primary,
                        secondary: (primary + 1) % FRAMES as u32,
                        resolution,
                        ..PassUniforms::default()
                    }),
            );
        }

        let stage = PassUniforms {
            mouse: self.mouse,
            resolution,
            time: self.time,
            ..PassUniforms::default()
        };
        let mut composite = Pass::new("composite", Program::Composite, PassOutput::Target(self.composite_target()));
        for index in 0..self.films.len() {
            composite = composite.target(TargetId(index as u8));
        }
        graph.push(
            composite
                .image(self.noise.clone())
                .clear(Color::RED)
                .uniforms(stage),
        );
        graph.push(
            Pass::new("present", Program::Present, PassOutput::Screen)
                .target(self.composite_target())
                .clear(Color::RED)
                .uniforms(stage),
        );
        graph
    }
}

impl Demo for Slideshow {
    fn id(&self) -> DemoId {
        DemoId::Slideshow
    }

    fn update(&mut self, time: &FrameTime, _input: &InputState) {
        self.time = (time.elapsed_ms() * self.config.time_scale as f64) as f32;
        let frame = self.time.floor() as u32 % FRAMES as u32;
        if frame != self.frame {
            self.frame = frame;
            self.change_time = self.time;
        }
        self.orbit.apply(&mut self.camera);
        self.tilt.advance(time.dt);
        self.graph = self.build_graph();
    }

    fn handle(&mut self, action: &Action) {
        match *action {
            Action::PointerMove(pixel) => {
                self.tilt.pointer_moved(pixel);
                let (w, h) = self.targets.size();
                self.mouse = Vec2::new(pixel.x / w as f32, pixel.y / h as f32);
            }
            Action::Resize { width, height } => {
                self.targets.resize(width, height);
                self.tilt.set_viewport(width, height);
                self.camera.set_aspect(width, height);
            }
            _ => {}
        }
    }

    fn view(&self) -> FrameView<'_> {
        FrameView::PostProcess { graph: &self.graph }
    }

    fn textures(&self) -> Vec<TextureKey> {
        self.graph.images()
    }

    fn orbit(&mut self) -> Option<&mut OrbitCamera> {
        Some(&mut self.orbit)
    }
}
