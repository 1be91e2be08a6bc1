use framelab_common::{Rng, TextureKey, hsl_to_rgb8};
use sha2::{Digest, Sha256};

use crate::{AssetError, TextureData};

/// Keys with this prefix name a generated texture instead of a file.
pub const PROCEDURAL_PREFIX: &str = "proc:";

/// Generated stand-ins for texture files.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Procedural {
    /// Black and white squares, `cells` per side.
    Checker { cells: u32 },
    /// Flat card in one hue with a darker frame.
    Hue(f32),
    /// Tileable two-octave value noise, grey.
    Noise { seed: u64 },
    /// Opaque green continents on transparent sea.
    Planet { seed: u64 },
}

impl Procedural {
    /// Parse `proc:checker`, `proc:hue:<deg>`, `proc:noise[:<seed>]`,
    /// `proc:planet[:<seed>]`.
    pub fn parse(key: &str) -> Result<Self, AssetError> {
        let unknown = || AssetError::UnknownProcedural(key.to_string());
        let body = key.strip_prefix(PROCEDURAL_PREFIX).ok_or_else(unknown)?;
        let mut parts = body.split(':');
        let name = parts.next().unwrap_or_default();
        let arg = parts.next();
        let seed = || match arg {
            Some(s) => s.parse::<u64>().map_err(|_| unknown()),
            None => Ok(1),
        };
        match name {
            "checker" => Ok(Procedural::Checker { cells: 8 }),
            "hue" => {
                let hue = arg.and_then(|s| s.parse::<f32>().ok()).ok_or_else(unknown)?;
                Ok(Procedural::Hue(hue))
            }
            "noise" => Ok(Procedural::Noise { seed: seed()? }),
            "planet" => Ok(Procedural::Planet { seed: seed()? }),
            _ => Err(unknown()),
        }
    }

    /// Stand-in for a texture file that could not be loaded. Stable per key.
    pub fn fallback_for(key: &TextureKey) -> Self {
        let hash = key_hash(key.as_str());
        let name = key.as_str().to_ascii_lowercase();
        if name.contains("noise") {
            Procedural::Noise { seed: hash }
        } else if name.contains("ground") || name.contains("planet") || name.contains("earth") {
            Procedural::Planet { seed: hash }
        } else {
            Procedural::Hue((hash % 360) as f32)
        }
    }
}

fn key_hash(key: &str) -> u64 {
    let result = Sha256::digest(key.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&result[..8]);
    u64::from_le_bytes(bytes)
}

/// Render a procedural texture at `size`×`size`.
pub fn procedural_texture(kind: Procedural, size: u32) -> TextureData {
    let size = size.max(1);
    let mut rgba = Vec::with_capacity((size * size * 4) as usize);
    match kind {
        Procedural::Checker { cells } => {
            let cell = (size / cells.max(1)).max(1);
            for y in 0..size {
                for x in 0..size {
                    let v = if ((x / cell) + (y / cell)) % 2 == 0 { 255 } else { 0 };
                    rgba.extend_from_slice(&[v, v, v, 255]);
                }
            }
        }
        Procedural::Hue(hue) => {
            let [r, g, b] = hsl_to_rgb8(hue, 60.0, 55.0);
            let [fr, fg, fb] = hsl_to_rgb8(hue, 60.0, 25.0);
            let frame = (size / 16).max(1);
            for y in 0..size {
                for x in 0..size {
                    let edge = x < frame || y < frame || x >= size - frame || y >= size - frame;
                    if edge {
                        rgba.extend_from_slice(&[fr, fg, fb, 255]);
                    } else {
                        rgba.extend_from_slice(&[r, g, b, 255]);
                    }
                }
            }
        }
        Procedural::Noise { seed } => {
            let coarse = ValueNoise::new(seed, 8);
            let fine = ValueNoise::new(seed.wrapping_add(1), 32);
            for y in 0..size {
                for x in 0..size {
                    let u = x as f32 / size as f32;
                    let v = y as f32 / size as f32;
                    let n = coarse.sample(u, v) * 0.7 + fine.sample(u, v) * 0.3;
                    let c = (n * 255.0).round() as u8;
                    rgba.extend_from_slice(&[c, c, c, 255]);
                }
            }
        }
        Procedural::Planet { seed } => {
            let land = ValueNoise::new(seed, 6);
            let detail = ValueNoise::new(seed.wrapping_add(7), 24);
            for y in 0..size {
                for x in 0..size {
                    let u = x as f32 / size as f32;
                    let v = y as f32 / size as f32;
                    let n = land.sample(u, v) * 0.8 + detail.sample(u, v) * 0.2;
                    if n > 0.55 {
                        let shade = (120.0 + (n - 0.55) * 200.0).min(255.0) as u8;
                        rgba.extend_from_slice(&[40, shade, 60, 255]);
                    } else {
                        rgba.extend_from_slice(&[0, 0, 0, 0]);
                    }
                }
            }
        }
    }
    TextureData {
        width: size,
        height: size,
        rgba,
    }
}

/// Lattice of random values, bilinearly interpolated with a smoothstep
/// fade. Wraps at the edges so the result tiles.
struct ValueNoise {
    cells: usize,
    lattice: Vec<f32>,
}

impl ValueNoise {
    fn new(seed: u64, cells: usize) -> Self {
        let mut rng = Rng::new(seed);
        let lattice = (0..cells * cells).map(|_| rng.next_f32()).collect();
        Self { cells, lattice }
    }

    fn at(&self, x: usize, y: usize) -> f32 {
        self.lattice[(y % self.cells) * self.cells + (x % self.cells)]
    }

    fn sample(&self, u: f32, v: f32) -> f32 {
        let fx = u * self.cells as f32;
        let fy = v * self.cells as f32;
        let x0 = fx.floor() as usize;
        let y0 = fy.floor() as usize;
        let tx = fade(fx - x0 as f32);
        let ty = fade(fy - y0 as f32);
        let top = self.at(x0, y0) + (self.at(x0 + 1, y0) - self.at(x0, y0)) * tx;
        let bottom = self.at(x0, y0 + 1) + (self.at(x0 + 1, y0 + 1) - self.at(x0, y0 + 1)) * tx;
        top + (bottom - top) * ty
    }
}

fn fade(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_keys() {
        assert_eq!(Procedural::parse("proc:checker").unwrap(), Procedural::Checker { cells: 8 });
        assert_eq!(Procedural::parse("proc:hue:120").unwrap(), Procedural::Hue(120.0));
        assert_eq!(Procedural::parse("proc:noise").unwrap(), Procedural::Noise { seed: 1 });
        assert_eq!(Procedural::parse("proc:planet:9").unwrap(), Procedural::Planet { seed: 9 });
    }

    #[test]
    fn parse_rejects_unknown() {
        assert!(Procedural::parse("proc:marble").is_err());
        assert!(Procedural::parse("proc:hue").is_err());
        assert!(Procedural::parse("proc:noise:x").is_err());
        assert!(Procedural::parse("films/totoro-01.jpg").is_err());
    }

    #[test]
    fn fallback_follows_name() {
        let noise = Procedural::fallback_for(&TextureKey::new("films/noise.jpg"));
        assert!(matches!(noise, Procedural::Noise { .. }));
        let ground = Procedural::fallback_for(&TextureKey::new("flight/ground.png"));
        assert!(matches!(ground, Procedural::Planet { .. }));
        let card = TextureKey::new("gallery/7.png");
        assert_eq!(Procedural::fallback_for(&card), Procedural::fallback_for(&card));
    }

    #[test]
    fn textures_have_requested_size() {
        for kind in [
            Procedural::Checker { cells: 4 },
            Procedural::Hue(200.0),
            Procedural::Noise { seed: 3 },
            Procedural::Planet { seed: 3 },
        ] {
            let tex = procedural_texture(kind, 32);
            assert_eq!((tex.width, tex.height), (32, 32));
            assert_eq!(tex.rgba.len(), 32 * 32 * 4);
        }
    }

    #[test]
    fn checker_alternates() {
        let tex = procedural_texture(Procedural::Checker { cells: 2 }, 4);
        assert_eq!(tex.pixel(0, 0), [255, 255, 255, 255]);
        assert_eq!(tex.pixel(2, 0), [0, 0, 0, 255]);
        assert_eq!(tex.pixel(2, 2), [255, 255, 255, 255]);
    }

    #[test]
    fn planet_mixes_land_and_sea() {
        let tex = procedural_texture(Procedural::Planet { seed: 11 }, 64);
        let alphas: Vec<u8> = tex.rgba.chunks(4).map(|p| p[3]).collect();
        assert!(alphas.iter().any(|&a| a == 0));
        assert!(alphas.iter().any(|&a| a == 255));
    }

    #[test]
    fn noise_is_deterministic() {
        let a = procedural_texture(Procedural::Noise { seed: 5 }, 16);
        let b = procedural_texture(Procedural::Noise { seed: 5 }, 16);
        assert_eq!(a, b);
    }
}
