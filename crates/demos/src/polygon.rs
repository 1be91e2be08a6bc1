//! Star polygon streamed as a raw vertex list, rebuilt every frame.

use framelab_common::Color;
use framelab_geometry::{Mesh, star_polygon};
use framelab_input::{Action, Control, InputState};
use framelab_render::{FrameView, PolygonView};
use framelab_tween::{FrameTime, Interval};
use tracing::debug;

use crate::config::PolygonConfig;
use crate::{Demo, DemoId};

pub const SHAPE: &str = "shape";
const SHAPE_OPTIONS: &[&str] = &["polygon", "star"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Step the number of points up and down.
    Polygon,
    /// Pinch and relax the inner radius.
    Star,
}

impl Shape {
    fn as_str(self) -> &'static str {
        match self {
            Shape::Polygon => "polygon",
            Shape::Star => "star",
        }
    }
}

pub struct Polygon {
    mesh: Mesh,
    shape: Shape,
    polygon: u32,
    coefficient: f32,
    /// Direction of travel, shared by both shapes.
    rising: bool,
    interval: Interval,
    time: f32,
    config: PolygonConfig,
}

impl Polygon {
    pub fn new(config: &PolygonConfig) -> Self {
        let polygon = config.min_polygon.max(3);
        Self {
            mesh: star_polygon(polygon, 1.0),
            shape: Shape::Polygon,
            polygon,
            coefficient: 1.0,
            rising: true,
            interval: Interval::immediate(config.step_seconds),
            time: 0.0,
            config: config.clone(),
        }
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn polygon(&self) -> u32 {
        self.polygon
    }

    pub fn coefficient(&self) -> f32 {
        self.coefficient
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    fn step_polygon(&mut self) {
        let (lo, hi) = (self.config.min_polygon.max(3), self.config.max_polygon);
        self.polygon = if self.rising {
            self.polygon + 1
        } else {
            self.polygon.saturating_sub(1).max(3)
        };
        if self.polygon <= lo || self.polygon >= hi {
            self.rising = !self.rising;
        }
        debug!(polygon = self.polygon, "polygon step");
    }

    fn step_coefficient(&mut self) {
        let (lo, hi) = (self.config.min_coefficient, self.config.max_coefficient);
        let delta = if self.rising {
            self.config.coefficient_step
        } else {
            -self.config.coefficient_step
        };
        self.coefficient = (self.coefficient + delta).clamp(lo, hi);
        if self.coefficient <= lo || self.coefficient >= hi {
            self.rising = !self.rising;
        }
    }
}

impl Demo for Polygon {
    fn id(&self) -> DemoId {
        DemoId::Polygon
    }

    fn update(&mut self, time: &FrameTime, _input: &InputState) {
        self.time = time.elapsed;
        match self.shape {
            Shape::Polygon => {
                if !self.interval.tick(time.dt) {
                    return;
                }
                self.step_polygon();
            }
            Shape::Star => self.step_coefficient(),
        }
        self.mesh = star_polygon(self.polygon, self.coefficient);
    }

    fn handle(&mut self, action: &Action) {
        if let Action::Select { control: SHAPE, option } = *action {
            self.shape = if option == "star" { Shape::Star } else { Shape::Polygon };
            if self.shape == Shape::Polygon {
                self.coefficient = 1.0;
            }
            debug!(shape = self.shape.as_str(), "polygon shape");
        }
    }

    fn controls(&self) -> Vec<Control> {
        vec![Control::Radio {
            id: SHAPE,
            label: "Shape",
            options: SHAPE_OPTIONS,
            selected: self.shape.as_str(),
        }]
    }

    fn view(&self) -> FrameView<'_> {
        let grey = self.config.clear_grey;
        FrameView::Polygon(PolygonView {
            mesh: &self.mesh,
            time: self.time,
            clear_color: Color::rgb(grey, grey, grey),
            square: true,
        })
    }
}
