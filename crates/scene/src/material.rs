use framelab_common::{Color, TextureKey};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Surface description shared by any number of mesh nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub color: Color,
    pub texture: Option<TextureKey>,
    /// Shaded by the scene lights (Phong); unlit materials show `color` as is.
    pub lit: bool,
    /// Alpha-blended and drawn after opaque batches.
    pub transparent: bool,
    /// Fragments with alpha below this are discarded. `0.0` disables the test.
    pub alpha_test: f32,
    pub double_sided: bool,
    pub opacity: f32,
    /// Affected by scene fog.
    pub fog: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            texture: None,
            lit: false,
            transparent: false,
            alpha_test: 0.0,
            double_sided: false,
            opacity: 1.0,
            fog: true,
        }
    }
}

impl Material {
    /// Unlit, flat color.
    pub fn basic(color: Color) -> Self {
        Self {
            color,
            ..Self::default()
        }
    }

    /// Lit by ambient and directional light.
    pub fn phong(color: Color) -> Self {
        Self {
            color,
            lit: true,
            ..Self::default()
        }
    }

    pub fn with_texture(mut self, key: TextureKey) -> Self {
        self.texture = Some(key);
        self
    }

    pub fn with_transparency(mut self, opacity: f32) -> Self {
        self.transparent = true;
        self.opacity = opacity;
        self
    }

    pub fn with_alpha_test(mut self, threshold: f32) -> Self {
        self.alpha_test = threshold;
        self
    }

    pub fn with_double_side(mut self) -> Self {
        self.double_sided = true;
        self
    }

    pub fn without_fog(mut self) -> Self {
        self.fog = false;
        self
    }

    /// Base color with opacity folded into alpha.
    pub fn base_color(&self) -> [f32; 4] {
        let mut c = self.color.to_array();
        c[3] *= self.opacity;
        c
    }
}

/// Light arriving from `direction` (pointing from the scene toward the light).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionalLight {
    pub direction: Vec3,
    pub color: Color,
    pub intensity: f32,
}

impl DirectionalLight {
    /// A light placed at `position` shining toward the origin.
    pub fn from_position(position: Vec3, color: Color, intensity: f32) -> Self {
        Self {
            direction: position.normalize_or_zero(),
            color,
            intensity,
        }
    }
}

/// Linear distance fog.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fog {
    pub color: Color,
    pub near: f32,
    pub far: f32,
}

impl Fog {
    /// Fog amount at `depth`: 0 before `near`, 1 past `far`, smooth between.
    pub fn factor(&self, depth: f32) -> f32 {
        if self.far <= self.near {
            return if depth >= self.far { 1.0 } else { 0.0 };
        }
        let t = ((depth - self.near) / (self.far - self.near)).clamp(0.0, 1.0);
        t * t * (3.0 - 2.0 * t)
    }
}

/// Per-scene lighting and background.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub clear_color: Color,
    pub ambient: Color,
    pub ambient_intensity: f32,
    pub directional: Option<DirectionalLight>,
    pub fog: Option<Fog>,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            clear_color: Color::BLACK,
            ambient: Color::WHITE,
            ambient_intensity: 1.0,
            directional: None,
            fog: None,
        }
    }
}

impl Environment {
    /// Ambient color premultiplied by its intensity.
    pub fn ambient_rgb(&self) -> [f32; 3] {
        let a = self.ambient.to_rgb_array();
        a.map(|c| c * self.ambient_intensity)
    }
}
