use std::fmt;

use framelab_common::{Color, TextureKey};
use glam::{Mat4, Vec2};
use serde::Serialize;

use crate::BLUR_TAPS;

/// Offscreen render target slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TargetId(pub u8);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "target{}", self.0)
    }
}

/// Where a pass samples a texture from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TextureSource {
    Image(TextureKey),
    Target(TargetId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PassOutput {
    Target(TargetId),
    Screen,
}

/// Post-process programs. Each expects a fixed number of texture inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Program {
    /// Two images mixed by `progress` on a tilted plane.
    Crossfade,
    /// One-dimensional Gaussian blur along `direction`.
    Blur,
    /// Full-screen panel displaced around the mouse.
    Displace,
    /// Film transition between frames `primary` and `secondary`, styled by
    /// `effect`. Inputs: three frames then noise.
    FilmEffect,
    /// Nine film results and noise composited into one image.
    Composite,
    /// Final full-screen present with a ripple around the mouse.
    Present,
}

impl Program {
    pub const ALL: [Program; 6] = [
        Program::Crossfade,
        Program::Blur,
        Program::Displace,
        Program::FilmEffect,
        Program::Composite,
        Program::Present,
    ];

    pub fn input_count(self) -> usize {
        match self {
            Program::Crossfade => 2,
            Program::Blur | Program::Displace | Program::Present => 1,
            Program::FilmEffect => 4,
            Program::Composite => 10,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Program::Crossfade => "crossfade",
            Program::Blur => "blur",
            Program::Displace => "displace",
            Program::FilmEffect => "film-effect",
            Program::Composite => "composite",
            Program::Present => "present",
        }
    }
}

/// Uniform values for one pass. Backends pack this into their own layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassUniforms {
    /// Clip-space transform of the 2×2 quad the pass draws.
    pub mvp: Mat4,
    pub model: Mat4,
    pub mouse: Vec2,
    pub resolution: Vec2,
    pub time: f32,
    pub progress: f32,
    pub effect: u32,
    /// Input slot of the outgoing frame.
    pub primary: u32,
    /// Input slot of the incoming frame.
    pub secondary: u32,
    /// Texel step for blur passes (`(1/w, 0)` or `(0, 1/h)`).
    pub direction: Vec2,
    pub weights: [f32; BLUR_TAPS],
}

impl Default for PassUniforms {
    fn default() -> Self {
        Self {
            mvp: Mat4::IDENTITY,
            model: Mat4::IDENTITY,
            mouse: Vec2::ZERO,
            resolution: Vec2::ONE,
            time: 0.0,
            progress: 0.0,
            effect: 0,
            primary: 0,
            secondary: 1,
            direction: Vec2::ZERO,
            weights: [0.0; BLUR_TAPS],
        }
    }
}

/// One draw into a target or the screen.
#[derive(Debug, Clone, PartialEq)]
pub struct Pass {
    pub label: String,
    pub program: Program,
    pub inputs: Vec<TextureSource>,
    pub output: PassOutput,
    /// Clear color applied before drawing; `None` keeps the previous content.
    pub clear: Option<Color>,
    pub uniforms: PassUniforms,
}

impl Pass {
    pub fn new(label: impl Into<String>, program: Program, output: PassOutput) -> Self {
        Self {
            label: label.into(),
            program,
            inputs: Vec::new(),
            output,
            clear: Some(Color::BLACK),
            uniforms: PassUniforms::default(),
        }
    }

    pub fn input(mut self, source: TextureSource) -> Self {
        self.inputs.push(source);
        self
    }

    pub fn image(self, key: TextureKey) -> Self {
        self.input(TextureSource::Image(key))
    }

    pub fn target(self, id: TargetId) -> Self {
        self.input(TextureSource::Target(id))
    }

    pub fn clear(mut self, color: Color) -> Self {
        self.clear = Some(color);
        self
    }

    pub fn uniforms(mut self, uniforms: PassUniforms) -> Self {
        self.uniforms = uniforms;
        self
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("pass graph has no passes")]
    Empty,
    #[error("pass `{pass}` uses {target}, but only {count} targets exist")]
    UnknownTarget {
        pass: String,
        target: TargetId,
        count: u8,
    },
    #[error("pass `{pass}` samples {target}, which it also writes")]
    SelfSample { pass: String, target: TargetId },
    #[error("pass `{pass}` samples {target} before any pass wrote it")]
    ReadBeforeWrite { pass: String, target: TargetId },
    #[error("pass `{pass}` ({program}) needs {expected} inputs, got {got}")]
    InputCount {
        pass: String,
        program: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("last pass `{pass}` does not present to the screen")]
    NoPresent { pass: String },
}

/// Ordered passes over a fixed set of offscreen targets.
///
/// The order is authored by hand and never rearranged; [`validate`]
/// only checks that executing it in order is well-defined.
///
/// [`validate`]: FrameGraph::validate
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameGraph {
    pub target_count: u8,
    pub passes: Vec<Pass>,
}

impl FrameGraph {
    pub fn new(target_count: u8) -> Self {
        Self {
            target_count,
            passes: Vec::new(),
        }
    }

    pub fn push(&mut self, pass: Pass) {
        self.passes.push(pass);
    }

    pub fn validate(&self) -> Result<(), GraphError> {
        let last = self.passes.last().ok_or(GraphError::Empty)?;
        let mut written = vec![false; self.target_count as usize];

        for pass in &self.passes {
            let expected = pass.program.input_count();
            if pass.inputs.len() != expected {
                return Err(GraphError::InputCount {
                    pass: pass.label.clone(),
                    program: pass.program.label(),
                    expected,
                    got: pass.inputs.len(),
                });
            }

            let output = match pass.output {
                PassOutput::Target(t) => Some(self.check_known(pass, t)?),
                PassOutput::Screen => None,
            };

            for input in &pass.inputs {
                let TextureSource::Target(t) = input else {
                    continue;
                };
                let t = self.check_known(pass, *t)?;
                if Some(t) == output {
                    return Err(GraphError::SelfSample {
                        pass: pass.label.clone(),
                        target: t,
                    });
                }
                if !written[t.0 as usize] {
                    return Err(GraphError::ReadBeforeWrite {
                        pass: pass.label.clone(),
                        target: t,
                    });
                }
            }

            if let Some(t) = output {
                written[t.0 as usize] = true;
            }
        }

        if last.output != PassOutput::Screen {
            return Err(GraphError::NoPresent {
                pass: last.label.clone(),
            });
        }
        Ok(())
    }

    fn check_known(&self, pass: &Pass, target: TargetId) -> Result<TargetId, GraphError> {
        if target.0 < self.target_count {
            Ok(target)
        } else {
            Err(GraphError::UnknownTarget {
                pass: pass.label.clone(),
                target,
                count: self.target_count,
            })
        }
    }

    /// Every image key any pass samples, deduplicated, in first-use order.
    pub fn images(&self) -> Vec<TextureKey> {
        let mut keys: Vec<TextureKey> = Vec::new();
        for pass in &self.passes {
            for input in &pass.inputs {
                if let TextureSource::Image(k) = input {
                    if !keys.contains(k) {
                        keys.push(k.clone());
                    }
                }
            }
        }
        keys
    }
}

impl fmt::Display for FrameGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "targets: {}", self.target_count)?;
        for (i, pass) in self.passes.iter().enumerate() {
            let inputs: Vec<String> = pass
                .inputs
                .iter()
                .map(|s| match s {
                    TextureSource::Image(k) => k.to_string(),
                    TextureSource::Target(t) => t.to_string(),
                })
                .collect();
            let output = match pass.output {
                PassOutput::Target(t) => t.to_string(),
                PassOutput::Screen => "screen".to_string(),
            };
            writeln!(
                f,
                "{i:>2}. {:<14} {:<12} [{}] -> {}",
                pass.label,
                pass.program.label(),
                inputs.join(", "),
                output
            )?;
        }
        Ok(())
    }
}
