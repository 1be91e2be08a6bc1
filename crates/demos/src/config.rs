//! YAML configuration. Every field defaults to the demo's built-in value,
//! so an empty file (or no file) is valid.

use std::path::Path;

use framelab_common::Color;
use framelab_render::{OrbitCamera, PerspectiveCamera};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::slideshow::FILMS;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn check(ok: bool, field: &'static str, reason: impl Into<String>) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: reason.into(),
        })
    }
}

fn check_lens(prefix: &'static str, fov: f32, near: f32, far: f32) -> Result<(), ConfigError> {
    check(fov > 0.0 && fov < 180.0, prefix, format!("fov {fov} outside (0, 180)"))?;
    check(near > 0.0, prefix, format!("near plane {near} must be positive"))?;
    check(far > near, prefix, format!("far plane {far} must lie beyond near {near}"))
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FramelabConfig {
    pub cube_shift: CubeShiftConfig,
    pub fan: FanConfig,
    pub flight: FlightConfig,
    pub gallery: GalleryConfig,
    pub polygon: PolygonConfig,
    pub lights: LightsConfig,
    pub crossfade: CrossfadeConfig,
    pub slideshow: SlideshowConfig,
}

impl FramelabConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the demos cannot run with: non-positive speeds and
    /// durations where a tween or slide would never finish, empty counts,
    /// inverted ranges, and a film list that does not fill the 3×3 grid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.cube_shift;
        c.camera.validate("cube_shift.camera")?;
        check(c.slide_speed > 0.0, "cube_shift.slide_speed", format!("{} must be positive", c.slide_speed))?;
        check(c.wave_size >= 1, "cube_shift.wave_size", "at least one box must move")?;

        let f = &self.fan;
        f.camera.validate("fan.camera")?;
        check(f.tilt_seconds >= 0.0, "fan.tilt_seconds", format!("{} is negative", f.tilt_seconds))?;

        let f = &self.flight;
        f.camera.validate("flight.camera")?;
        check(f.fog_far > f.fog_near, "flight.fog_far", format!("{} must lie beyond fog_near {}", f.fog_far, f.fog_near))?;
        check(
            f.min_plane_distance > 0.0 && f.min_plane_distance <= f.plane_distance,
            "flight.min_plane_distance",
            format!("{} must be in (0, plane_distance {}]", f.min_plane_distance, f.plane_distance),
        )?;
        check(f.plane_speed > 0.0, "flight.plane_speed", format!("{} must be positive", f.plane_speed))?;

        let g = &self.gallery;
        g.camera.validate("gallery.camera")?;
        check(g.cards >= 1, "gallery.cards", "at least one card is required")?;
        check(g.pick_seconds >= 0.0, "gallery.pick_seconds", format!("{} is negative", g.pick_seconds))?;
        check(g.drift_seconds >= 0.0, "gallery.drift_seconds", format!("{} is negative", g.drift_seconds))?;

        let p = &self.polygon;
        check(p.min_polygon >= 3, "polygon.min_polygon", format!("{} is below a triangle", p.min_polygon))?;
        check(
            p.max_polygon >= p.min_polygon,
            "polygon.max_polygon",
            format!("{} is below min_polygon {}", p.max_polygon, p.min_polygon),
        )?;
        check(p.step_seconds > 0.0, "polygon.step_seconds", format!("{} must be positive", p.step_seconds))?;
        check(p.coefficient_step > 0.0, "polygon.coefficient_step", format!("{} must be positive", p.coefficient_step))?;
        check(
            p.min_coefficient > 0.0 && p.min_coefficient <= p.max_coefficient,
            "polygon.min_coefficient",
            format!("{} must be in (0, max_coefficient {}]", p.min_coefficient, p.max_coefficient),
        )?;

        let l = &self.lights;
        l.orbit.validate("lights.orbit")?;
        check(l.rows >= 1 && l.columns >= 1, "lights.rows", format!("{}×{} grid is empty", l.rows, l.columns))?;
        check(
            l.inner_radius > 0.0 && l.outer_radius > 0.0 && l.light_radius > 0.0,
            "lights.inner_radius",
            "radii must be positive",
        )?;

        let x = &self.crossfade;
        x.orbit.validate("crossfade.orbit")?;
        check(x.gauss_strength > 0.0, "crossfade.gauss_strength", format!("{} must be positive", x.gauss_strength))?;

        let s = &self.slideshow;
        s.orbit.validate("slideshow.orbit")?;
        check(
            s.films.len() == FILMS,
            "slideshow.films",
            format!("{} films given, the composite needs exactly {FILMS}", s.films.len()),
        )?;
        check(s.time_scale > 0.0, "slideshow.time_scale", format!("{} must be positive", s.time_scale))?;
        check(s.mouse_seconds >= 0.0, "slideshow.mouse_seconds", format!("{} is negative", s.mouse_seconds))
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Perspective camera placed at `position`, looking at `target`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    pub target: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov: 60.0,
            near: 0.1,
            far: 100.0,
            position: [0.0, 0.0, 10.0],
            target: [0.0; 3],
        }
    }
}

impl CameraConfig {
    fn at(fov: f32, near: f32, far: f32, position: [f32; 3]) -> Self {
        Self {
            fov,
            near,
            far,
            position,
            target: [0.0; 3],
        }
    }

    fn validate(&self, field: &'static str) -> Result<(), ConfigError> {
        check_lens(field, self.fov, self.near, self.far)
    }

    pub fn camera(&self, aspect: f32) -> PerspectiveCamera {
        PerspectiveCamera::new(self.fov, aspect, self.near, self.far)
            .looking(Vec3::from(self.position), Vec3::from(self.target))
    }

    pub fn orbit(&self) -> OrbitCamera {
        OrbitCamera::from_eye(Vec3::from(self.position), Vec3::from(self.target))
    }
}

/// Orbit camera around the origin, as used by the raw-pipeline demos.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitConfig {
    pub distance: f32,
    pub min: f32,
    pub max: f32,
    pub move_scale: f32,
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            distance: 5.0,
            min: 1.0,
            max: 10.0,
            move_scale: 2.0,
            fov: 45.0,
            near: 0.1,
            far: 10.0,
        }
    }
}

impl OrbitConfig {
    fn validate(&self, field: &'static str) -> Result<(), ConfigError> {
        check_lens(field, self.fov, self.near, self.far)?;
        check(
            self.min > 0.0 && self.max >= self.min,
            field,
            format!("zoom range [{}, {}] must be positive and ordered", self.min, self.max),
        )
    }

    pub fn orbit(&self) -> OrbitCamera {
        OrbitCamera::new(self.distance, self.min, self.max, self.move_scale)
    }

    pub fn camera(&self, aspect: f32) -> PerspectiveCamera {
        let mut camera = PerspectiveCamera::new(self.fov, aspect, self.near, self.far);
        self.orbit().apply(&mut camera);
        camera
    }
}

/// `0xRRGGBB` integers in the file, [`Color`] in code.
pub fn hex(value: u32) -> Color {
    Color::from_hex(value)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CubeShiftConfig {
    pub camera: CameraConfig,
    pub clear_color: u32,
    pub box_color: u32,
    pub moving_color: u32,
    pub ambient: f32,
    /// Distance a sliding box covers per frame.
    pub slide_speed: f32,
    /// Group rotation per frame, radians.
    pub spin: f32,
    /// Group rotation per frame while the hold key is down.
    pub hold_spin: f32,
    /// Most boxes that start sliding together.
    pub wave_size: usize,
    pub axes_length: f32,
}

impl Default for CubeShiftConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::at(90.0, 0.1, 100.0, [0.0, 2.0, 13.0]),
            clear_color: 0x666666,
            box_color: 0x3399ff,
            moving_color: 0xff0000,
            ambient: 0.3,
            slide_speed: 0.05,
            spin: 0.001,
            hold_spin: -0.005,
            wave_size: 3,
            axes_length: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FanConfig {
    pub camera: CameraConfig,
    pub clear_color: u32,
    pub color: u32,
    pub ambient: f32,
    /// Blade rotation per frame in auto mode.
    pub auto_speed: f32,
    /// Swing phase advance per frame.
    pub swing_rate: f32,
    pub narrow_deg: f32,
    pub wide_deg: f32,
    pub tilt_deg: f32,
    pub tilt_seconds: f32,
    pub axes_length: f32,
}

impl Default for FanConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::at(90.0, 0.1, 100.0, [18.0, 18.0, 24.0]),
            clear_color: 0x666666,
            color: 0x3399ff,
            ambient: 0.3,
            auto_speed: 0.05,
            swing_rate: 0.015,
            narrow_deg: 15.0,
            wide_deg: 45.0,
            tilt_deg: 15.0,
            tilt_seconds: 0.5,
            axes_length: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightConfig {
    pub camera: CameraConfig,
    pub clear_color: u32,
    pub ambient: f32,
    pub earth_color: u32,
    pub moon_color: u32,
    pub plane_color: u32,
    pub earth_texture: String,
    pub moon_texture: String,
    pub fog_near: f32,
    pub fog_far: f32,
    pub moon_distance: f32,
    pub plane_distance: f32,
    pub min_plane_distance: f32,
    pub plane_speed: f32,
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::at(60.0, 0.1, 200.0, [15.0, 10.0, 0.0]),
            clear_color: 0x000000,
            ambient: 0.2,
            earth_color: 0x0077ff,
            moon_color: 0xcccccc,
            plane_color: 0xffffff,
            earth_texture: "flight/earth.png".into(),
            moon_texture: "flight/moon.jpg".into(),
            fog_near: 20.0,
            fog_far: 100.0,
            moon_distance: 10.0,
            plane_distance: 5.3,
            min_plane_distance: 5.08,
            plane_speed: 0.025,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GalleryConfig {
    pub camera: CameraConfig,
    pub clear_color: u32,
    pub ambient: f32,
    pub cards: usize,
    /// Texture key per card; `{id}` is replaced by the 1-based card number.
    pub texture_pattern: String,
    /// Group rotation per frame while idle.
    pub spin: f32,
    pub pick_seconds: f32,
    pub drift_seconds: f32,
    pub backdrop_color: u32,
    pub axes_length: f32,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::at(60.0, 0.1, 40.0, [0.0, 0.0, 20.0]),
            clear_color: 0xffffff,
            ambient: 0.2,
            cards: 151,
            texture_pattern: "gallery/{id}.png".into(),
            spin: 0.0005,
            pick_seconds: 0.75,
            drift_seconds: 10.0,
            backdrop_color: 0xeeeeee,
            axes_length: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolygonConfig {
    pub clear_grey: f32,
    pub min_polygon: u32,
    pub max_polygon: u32,
    /// Seconds between polygon count changes.
    pub step_seconds: f32,
    pub coefficient_step: f32,
    pub min_coefficient: f32,
    pub max_coefficient: f32,
}

impl Default for PolygonConfig {
    fn default() -> Self {
        Self {
            clear_grey: 0.3,
            min_polygon: 3,
            max_polygon: 10,
            step_seconds: 1.0,
            coefficient_step: 0.01,
            min_coefficient: 0.5,
            max_coefficient: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightsConfig {
    pub orbit: OrbitConfig,
    pub clear_grey: f32,
    pub rows: u32,
    pub columns: u32,
    pub inner_radius: f32,
    pub outer_radius: f32,
    pub light_radius: f32,
}

impl Default for LightsConfig {
    fn default() -> Self {
        Self {
            orbit: OrbitConfig::default(),
            clear_grey: 0.3,
            rows: 256,
            columns: 4,
            inner_radius: 0.4,
            outer_radius: 0.8,
            light_radius: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossfadeConfig {
    pub orbit: OrbitConfig,
    pub first_texture: String,
    pub second_texture: String,
    pub offscreen_grey: f32,
    pub gauss_strength: f32,
    pub blur: bool,
}

impl Default for CrossfadeConfig {
    fn default() -> Self {
        Self {
            orbit: OrbitConfig::default(),
            first_texture: "crossfade/1007.png".into(),
            second_texture: "crossfade/1008.png".into(),
            offscreen_grey: 0.5,
            gauss_strength: 100.0,
            blur: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlideshowConfig {
    pub orbit: OrbitConfig,
    pub films: Vec<String>,
    /// Frame key; `{film}` and `{frame}` (`01`..`03`) are substituted.
    pub frame_pattern: String,
    pub noise_texture: String,
    /// Shader time units per millisecond.
    pub time_scale: f32,
    pub offscreen_grey: f32,
    pub mouse_seconds: f32,
}

impl Default for SlideshowConfig {
    fn default() -> Self {
        Self {
            orbit: OrbitConfig {
                distance: 1.0,
                ..OrbitConfig::default()
            },
            films: [
                "laputa", "majo", "nausicaa", "porco", "mononoke", "totoro", "chihiro", "mimi", "ponyo",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            frame_pattern: "films/{film}{frame}.jpg".into(),
            noise_texture: "films/noise.jpg".into(),
            time_scale: 0.0001,
            offscreen_grey: 0.5,
            mouse_seconds: 1.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(FramelabConfig::from_yaml("").unwrap(), FramelabConfig::default());
        assert_eq!(FramelabConfig::from_yaml("  \n").unwrap(), FramelabConfig::default());
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let cfg = FramelabConfig::from_yaml("flight:\n  plane_speed: 0.05\n").unwrap();
        assert_eq!(cfg.flight.plane_speed, 0.05);
        assert_eq!(cfg.flight.plane_distance, 5.3);
        assert_eq!(cfg.fan, FanConfig::default());
    }

    #[test]
    fn nested_camera_override() {
        let cfg = FramelabConfig::from_yaml("fan:\n  camera:\n    fov: 45\n").unwrap();
        assert_eq!(cfg.fan.camera.fov, 45.0);
        assert_eq!(cfg.fan.camera.position, [18.0, 18.0, 24.0]);
    }

    #[test]
    fn yaml_roundtrip() {
        let mut cfg = FramelabConfig::default();
        cfg.slideshow.films[0] = "kiki".into();
        cfg.gallery.cards = 12;
        let text = cfg.to_yaml().unwrap();
        assert_eq!(FramelabConfig::from_yaml(&text).unwrap(), cfg);
    }

    #[test]
    fn bad_yaml_is_an_error() {
        let err = FramelabConfig::from_yaml("cube_shift: [1, 2").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("framelab.yaml");
        std::fs::write(&path, "polygon:\n  max_polygon: 6\n").unwrap();
        let cfg = FramelabConfig::load(&path).unwrap();
        assert_eq!(cfg.polygon.max_polygon, 6);
        assert!(matches!(
            FramelabConfig::load(dir.path().join("missing.yaml")),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn defaults_validate() {
        FramelabConfig::default().validate().unwrap();
    }

    fn invalid_field(text: &str) -> &'static str {
        match FramelabConfig::from_yaml(text) {
            Err(ConfigError::Invalid { field, .. }) => field,
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn wrong_film_count_is_rejected() {
        assert_eq!(invalid_field("slideshow:\n  films: [laputa, majo]\n"), "slideshow.films");
        let ten: Vec<String> = (0..10).map(|i| format!("film{i}")).collect();
        let text = format!("slideshow:\n  films: [{}]\n", ten.join(", "));
        assert_eq!(invalid_field(&text), "slideshow.films");
    }

    #[test]
    fn zero_cards_are_rejected() {
        assert_eq!(invalid_field("gallery:\n  cards: 0\n"), "gallery.cards");
    }

    #[test]
    fn ranges_are_checked() {
        assert_eq!(invalid_field("cube_shift:\n  slide_speed: 0\n"), "cube_shift.slide_speed");
        assert_eq!(invalid_field("cube_shift:\n  slide_speed: -0.05\n"), "cube_shift.slide_speed");
        assert_eq!(invalid_field("cube_shift:\n  wave_size: 0\n"), "cube_shift.wave_size");
        assert_eq!(invalid_field("fan:\n  camera:\n    near: 0\n"), "fan.camera");
        assert_eq!(invalid_field("flight:\n  plane_speed: 0\n"), "flight.plane_speed");
        assert_eq!(invalid_field("flight:\n  fog_far: 10\n"), "flight.fog_far");
        assert_eq!(invalid_field("polygon:\n  min_polygon: 2\n"), "polygon.min_polygon");
        assert_eq!(invalid_field("polygon:\n  max_polygon: 2\n  min_polygon: 3\n"), "polygon.max_polygon");
        assert_eq!(invalid_field("polygon:\n  step_seconds: 0\n"), "polygon.step_seconds");
        assert_eq!(invalid_field("lights:\n  rows: 0\n"), "lights.rows");
        assert_eq!(invalid_field("crossfade:\n  orbit:\n    min: 5\n    max: 2\n"), "crossfade.orbit");
        assert_eq!(invalid_field("slideshow:\n  time_scale: 0\n"), "slideshow.time_scale");
    }

    #[test]
    fn invalid_message_names_the_field() {
        let err = FramelabConfig::from_yaml("gallery:\n  pick_seconds: -1\n").unwrap_err();
        assert!(err.to_string().starts_with("invalid gallery.pick_seconds"));
    }

    #[test]
    fn load_validates_too() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("framelab.yaml");
        std::fs::write(&path, "cube_shift:\n  slide_speed: 0\n").unwrap();
        assert!(matches!(
            FramelabConfig::load(&path),
            Err(ConfigError::Invalid { field: "cube_shift.slide_speed", .. })
        ));
    }

    #[test]
    fn default_film_list() {
        let cfg = SlideshowConfig::default();
        assert_eq!(cfg.films.len(), 9);
        assert_eq!(cfg.films[5], "totoro");
    }
}
