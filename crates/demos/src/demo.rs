use std::fmt;
use std::str::FromStr;

use framelab_common::TextureKey;
use framelab_input::{Action, Control, InputState};
use framelab_render::{FrameView, OrbitCamera};
use framelab_scene::SceneError;
use framelab_tween::FrameTime;
use tracing::info;

use crate::FramelabConfig;
use crate::crossfade::Crossfade;
use crate::cube_shift::CubeShift;
use crate::fan::Fan;
use crate::flight::Flight;
use crate::gallery::Gallery;
use crate::lights::Lights;
use crate::polygon::Polygon;
use crate::slideshow::Slideshow;

/// A self-contained demo driven one frame at a time.
///
/// The window layer calls [`handle`](Demo::handle) for every action as it
/// happens, then [`update`](Demo::update) once per frame, then renders
/// [`view`](Demo::view). Nothing is drawn between frames.
pub trait Demo {
    fn id(&self) -> DemoId;

    fn title(&self) -> &'static str {
        self.id().title()
    }

    /// Advance one frame.
    fn update(&mut self, time: &FrameTime, input: &InputState);

    /// React to one input or control action.
    fn handle(&mut self, action: &Action);

    /// Controls to show next to the viewport, reflecting current state.
    fn controls(&self) -> Vec<Control> {
        Vec::new()
    }

    fn view(&self) -> FrameView<'_>;

    /// Textures the renderer must have resolved before the first frame.
    fn textures(&self) -> Vec<TextureKey> {
        Vec::new()
    }

    /// Camera rig the window layer may drive with mouse drags, if any is
    /// active right now.
    fn orbit(&mut self) -> Option<&mut OrbitCamera> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DemoId {
    CubeShift,
    Fan,
    Flight,
    Gallery,
    Polygon,
    Lights,
    Crossfade,
    Slideshow,
}

impl DemoId {
    pub const ALL: [DemoId; 8] = [
        DemoId::CubeShift,
        DemoId::Fan,
        DemoId::Flight,
        DemoId::Gallery,
        DemoId::Polygon,
        DemoId::Lights,
        DemoId::Crossfade,
        DemoId::Slideshow,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DemoId::CubeShift => "cube-shift",
            DemoId::Fan => "fan",
            DemoId::Flight => "flight",
            DemoId::Gallery => "gallery",
            DemoId::Polygon => "polygon",
            DemoId::Lights => "lights",
            DemoId::Crossfade => "crossfade",
            DemoId::Slideshow => "slideshow",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            DemoId::CubeShift => "Cube shift (instancing)",
            DemoId::Fan => "Electric fan (scene graph rig)",
            DemoId::Flight => "Flight (camera rig and steering)",
            DemoId::Gallery => "Gallery (raycast picking)",
            DemoId::Polygon => "Star polygon (raw vertex buffers)",
            DemoId::Lights => "Point lights",
            DemoId::Crossfade => "Crossfade (two-pass offscreen)",
            DemoId::Slideshow => "Slideshow (three-stage offscreen)",
        }
    }
}

impl fmt::Display for DemoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown demo `{0}`")]
pub struct UnknownDemo(pub String);

impl FromStr for DemoId {
    type Err = UnknownDemo;

    /// Accepts the kebab-case name or the 1-based demo number.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(n) = s.parse::<usize>() {
            return n
                .checked_sub(1)
                .and_then(|i| DemoId::ALL.get(i).copied())
                .ok_or_else(|| UnknownDemo(s.to_string()));
        }
        DemoId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| UnknownDemo(s.to_string()))
    }
}

/// Build a demo for a `width`×`height` viewport. `seed` drives every
/// random choice the demo makes.
pub fn create(
    id: DemoId,
    config: &FramelabConfig,
    seed: u64,
    width: u32,
    height: u32,
) -> Result<Box<dyn Demo>, SceneError> {
    info!(demo = %id, seed, width, height, "creating demo");
    Ok(match id {
        DemoId::CubeShift => Box::new(CubeShift::new(&config.cube_shift, seed, width, height)?),
        DemoId::Fan => Box::new(Fan::new(&config.fan, width, height)?),
        DemoId::Flight => Box::new(Flight::new(&config.flight, width, height)?),
        DemoId::Gallery => Box::new(Gallery::new(&config.gallery, seed, width, height)?),
        DemoId::Polygon => Box::new(Polygon::new(&config.polygon)),
        DemoId::Lights => Box::new(Lights::new(&config.lights, width, height)),
        DemoId::Crossfade => Box::new(Crossfade::new(&config.crossfade, width, height)),
        DemoId::Slideshow => Box::new(Slideshow::new(&config.slideshow, width, height)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_parse_by_name_and_number() {
        assert_eq!("fan".parse::<DemoId>().unwrap(), DemoId::Fan);
        assert_eq!("8".parse::<DemoId>().unwrap(), DemoId::Slideshow);
        assert_eq!("1".parse::<DemoId>().unwrap(), DemoId::CubeShift);
        assert!("0".parse::<DemoId>().is_err());
        assert!("9".parse::<DemoId>().is_err());
        assert!("teapot".parse::<DemoId>().is_err());
    }

    #[test]
    fn names_roundtrip() {
        for id in DemoId::ALL {
            assert_eq!(id.to_string().parse::<DemoId>().unwrap(), id);
        }
    }

    #[test]
    fn every_demo_builds_and_runs() {
        let config = FramelabConfig::default();
        let input = InputState::new(800, 600);
        for id in DemoId::ALL {
            let mut demo = create(id, &config, 7, 800, 600).unwrap();
            assert_eq!(demo.id(), id);
            let mut time = FrameTime::first(1.0 / 60.0);
            for _ in 0..120 {
                demo.update(&time, &input);
                time = time.next(1.0 / 60.0);
            }
            demo.handle(&Action::Resize { width: 640, height: 480 });
            demo.update(&time, &input);
            if let FrameView::PostProcess { graph } = demo.view() {
                graph.validate().unwrap();
            }
        }
    }
}
