use serde::{Deserialize, Serialize};

/// RGBA color with components in `[0, 1]`.
///
/// Values are passed to the GPU as written; the surface is configured with a
/// non-sRGB format so hex colors come out the way they read.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);
    pub const GREEN: Color = Color::rgb(0.0, 1.0, 0.0);
    pub const BLUE: Color = Color::rgb(0.0, 0.0, 1.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// `0xRRGGBB` packed color, fully opaque.
    pub fn from_hex(hex: u32) -> Self {
        let r = ((hex >> 16) & 0xff) as f32 / 255.0;
        let g = ((hex >> 8) & 0xff) as f32 / 255.0;
        let b = (hex & 0xff) as f32 / 255.0;
        Self::rgb(r, g, b)
    }

    /// Hue in degrees, saturation and lightness in percent.
    ///
    /// Channels are rounded to whole bytes before normalising, so the result
    /// lands exactly on a representable 8-bit color.
    pub fn from_hsl(hue_deg: f32, saturation: f32, lightness: f32) -> Self {
        let [r, g, b] = hsl_to_rgb8(hue_deg, saturation, lightness);
        Self::rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }

    pub fn with_alpha(mut self, a: f32) -> Self {
        self.a = a;
        self
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn to_rgb_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    pub fn to_wgpu_tuple(self) -> (f64, f64, f64, f64) {
        (self.r as f64, self.g as f64, self.b as f64, self.a as f64)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Standard HSL to 8-bit RGB conversion.
pub fn hsl_to_rgb8(hue_deg: f32, saturation: f32, lightness: f32) -> [u8; 3] {
    let h = hue_deg / 360.0;
    let s = saturation / 100.0;
    let l = lightness / 100.0;

    let (r, g, b) = if s == 0.0 {
        (l, l, l)
    } else {
        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;
        (
            hue_to_channel(p, q, h + 1.0 / 3.0),
            hue_to_channel(p, q, h),
            hue_to_channel(p, q, h - 1.0 / 3.0),
        )
    };

    [
        (r * 255.0).round() as u8,
        (g * 255.0).round() as u8,
        (b * 255.0).round() as u8,
    ]
}

fn hue_to_channel(p: f32, q: f32, mut t: f32) -> f32 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        return p + (q - p) * 6.0 * t;
    }
    if t < 0.5 {
        return q;
    }
    if t < 2.0 / 3.0 {
        return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
    }
    p
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_unpacks_channels() {
        let c = Color::from_hex(0x3399ff);
        assert!((c.r - 0.2).abs() < 1e-6);
        assert!((c.g - 0.6).abs() < 1e-6);
        assert!((c.b - 1.0).abs() < 1e-6);
        assert_eq!(c.a, 1.0);
    }

    #[test]
    fn hsl_primary_hues() {
        assert_eq!(hsl_to_rgb8(0.0, 100.0, 50.0), [255, 0, 0]);
        assert_eq!(hsl_to_rgb8(120.0, 100.0, 50.0), [0, 255, 0]);
        assert_eq!(hsl_to_rgb8(240.0, 100.0, 50.0), [0, 0, 255]);
        assert_eq!(hsl_to_rgb8(60.0, 100.0, 50.0), [255, 255, 0]);
    }

    #[test]
    fn hsl_grey_when_unsaturated() {
        assert_eq!(hsl_to_rgb8(200.0, 0.0, 50.0), [128, 128, 128]);
    }

    #[test]
    fn hsl_wraps_full_turn() {
        assert_eq!(hsl_to_rgb8(360.0, 100.0, 50.0), [255, 0, 0]);
        let c = Color::from_hsl(360.0, 100.0, 50.0);
        assert_eq!(c, Color::RED);
    }
}
