use framelab_render::Program;

/// Lit or unlit meshes drawn instanced, with texture, alpha test and fog.
pub const SCENE_SHADER: &str = r#"
struct Globals {
    view_proj: mat4x4<f32>,
    eye: vec4<f32>,
    // xyz: direction toward the light, w: 1 when the light exists.
    light_dir: vec4<f32>,
    light_color: vec4<f32>,
    ambient: vec4<f32>,
    fog_color: vec4<f32>,
    // x: near, y: far, z: 1 when fog is on.
    fog: vec4<f32>,
};

struct MaterialUniform {
    color: vec4<f32>,
    // x: lit, y: alpha test threshold, z: fogged.
    params: vec4<f32>,
};

@group(0) @binding(0) var<uniform> globals: Globals;
@group(1) @binding(0) var<uniform> material: MaterialUniform;
@group(1) @binding(1) var base_texture: texture_2d<f32>;
@group(1) @binding(2) var base_sampler: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
    @location(3) color: vec4<f32>,
};

struct InstanceInput {
    @location(4) model_0: vec4<f32>,
    @location(5) model_1: vec4<f32>,
    @location(6) model_2: vec4<f32>,
    @location(7) model_3: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) world_normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
    @location(3) color: vec4<f32>,
};

@vertex
fn vs_main(vertex: VertexInput, instance: InstanceInput) -> VertexOutput {
    let model = mat4x4<f32>(
        instance.model_0,
        instance.model_1,
        instance.model_2,
        instance.model_3,
    );
    let world = model * vec4<f32>(vertex.position, 1.0);

    var out: VertexOutput;
    out.clip_position = globals.view_proj * world;
    out.world_position = world.xyz;
    out.world_normal = (model * vec4<f32>(vertex.normal, 0.0)).xyz;
    out.uv = vertex.uv;
    out.color = vertex.color;
    return out;
}

@fragment
fn fs_main(in: VertexOutput, @builtin(front_facing) front: bool) -> @location(0) vec4<f32> {
    let texel = textureSample(base_texture, base_sampler, in.uv);
    var color = material.color * in.color * texel;
    if color.a < material.params.y {
        discard;
    }

    if material.params.x > 0.5 {
        var normal = normalize(in.world_normal);
        if !front {
            normal = -normal;
        }
        var light = globals.ambient.rgb;
        if globals.light_dir.w > 0.5 {
            let diffuse = max(dot(normal, normalize(globals.light_dir.xyz)), 0.0);
            light += globals.light_color.rgb * diffuse;
        }
        color = vec4<f32>(color.rgb * light, color.a);
    }

    if material.params.z > 0.5 && globals.fog.z > 0.5 {
        let depth = distance(globals.eye.xyz, in.world_position);
        let f = smoothstep(globals.fog.x, globals.fog.y, depth);
        color = vec4<f32>(mix(color.rgb, globals.fog_color.rgb, f), color.a);
    }
    return color;
}
"#;

/// Colored line lists (axes helpers) sharing the scene globals.
pub const LINE_SHADER: &str = r#"
struct Globals {
    view_proj: mat4x4<f32>,
    eye: vec4<f32>,
    light_dir: vec4<f32>,
    light_color: vec4<f32>,
    ambient: vec4<f32>,
    fog_color: vec4<f32>,
    fog: vec4<f32>,
};

@group(0) @binding(0) var<uniform> globals: Globals;

struct LineVertex {
    @location(0) position: vec3<f32>,
    @location(1) color: vec4<f32>,
};

struct LineOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
};

@vertex
fn vs_line(vertex: LineVertex) -> LineOutput {
    var out: LineOutput;
    out.clip_position = globals.view_proj * vec4<f32>(vertex.position, 1.0);
    out.color = vertex.color;
    return out;
}

@fragment
fn fs_line(in: LineOutput) -> @location(0) vec4<f32> {
    return in.color;
}
"#;

/// Vertex-colored triangles already in clip space; the hue turns with time.
pub const POLYGON_SHADER: &str = r#"
struct PolygonUniform {
    time: f32,
    _pad0: f32,
    _pad1: f32,
    _pad2: f32,
};

@group(0) @binding(0) var<uniform> params: PolygonUniform;

struct PolygonVertex {
    @location(0) position: vec3<f32>,
    @location(1) color: vec4<f32>,
};

struct PolygonOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
};

@vertex
fn vs_polygon(vertex: PolygonVertex) -> PolygonOutput {
    var out: PolygonOutput;
    out.clip_position = vec4<f32>(vertex.position.xy, 0.0, 1.0);
    out.color = vertex.color;
    return out;
}

@fragment
fn fs_polygon(in: PolygonOutput) -> @location(0) vec4<f32> {
    // Rotate the color about the grey axis.
    let k = vec3<f32>(0.57735027);
    let angle = params.time;
    let c = in.color.rgb;
    let rotated = c * cos(angle) + cross(k, c) * sin(angle) + k * dot(k, c) * (1.0 - cos(angle));
    return vec4<f32>(clamp(rotated, vec3<f32>(0.0), vec3<f32>(1.0)), in.color.a);
}
"#;

/// Torus shaded per fragment by point lights; light markers drawn unlit.
pub const POINT_LIGHT_SHADER: &str = r#"
const MAX_LIGHTS: u32 = 4u;

struct Globals {
    view_proj: mat4x4<f32>,
    eye: vec4<f32>,
    light_positions: array<vec4<f32>, 4>,
    light_colors: array<vec4<f32>, 4>,
    // x: light count.
    counts: vec4<u32>,
};

struct Draw {
    model: mat4x4<f32>,
    color: vec4<f32>,
    // x: lit.
    params: vec4<f32>,
};

@group(0) @binding(0) var<uniform> globals: Globals;
@group(1) @binding(0) var<uniform> draw: Draw;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
    @location(3) color: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) world_normal: vec3<f32>,
    @location(2) color: vec4<f32>,
};

@vertex
fn vs_main(vertex: VertexInput) -> VertexOutput {
    let world = draw.model * vec4<f32>(vertex.position, 1.0);
    var out: VertexOutput;
    out.clip_position = globals.view_proj * world;
    out.world_position = world.xyz;
    out.world_normal = (draw.model * vec4<f32>(vertex.normal, 0.0)).xyz;
    out.color = vertex.color * draw.color;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    if draw.params.x < 0.5 {
        return in.color;
    }
    let normal = normalize(in.world_normal);
    let view = normalize(globals.eye.xyz - in.world_position);
    var light = vec3<f32>(0.1);
    for (var i = 0u; i < min(globals.counts.x, MAX_LIGHTS); i += 1u) {
        let to_light = normalize(globals.light_positions[i].xyz - in.world_position);
        let diffuse = max(dot(normal, to_light), 0.0);
        let half_vector = normalize(to_light + view);
        let specular = pow(max(dot(normal, half_vector), 0.0), 50.0);
        light += globals.light_colors[i].rgb * (diffuse + specular);
    }
    return vec4<f32>(in.color.rgb * light, in.color.a);
}
"#;

/// Declarations shared by every post-process program: the pass uniforms, a
/// sampler, ten texture slots and a quad generated from the vertex index.
const POST_COMMON: &str = r#"
struct PassUniform {
    mvp: mat4x4<f32>,
    model: mat4x4<f32>,
    weights: array<vec4<f32>, 2>,
    mouse: vec2<f32>,
    resolution: vec2<f32>,
    direction: vec2<f32>,
    time: f32,
    progress: f32,
    effect: u32,
    primary: u32,
    secondary: u32,
    _pad: u32,
};

@group(0) @binding(0) var<uniform> pass_data: PassUniform;
@group(0) @binding(1) var input_sampler: sampler;
@group(0) @binding(2) var t0: texture_2d<f32>;
@group(0) @binding(3) var t1: texture_2d<f32>;
@group(0) @binding(4) var t2: texture_2d<f32>;
@group(0) @binding(5) var t3: texture_2d<f32>;
@group(0) @binding(6) var t4: texture_2d<f32>;
@group(0) @binding(7) var t5: texture_2d<f32>;
@group(0) @binding(8) var t6: texture_2d<f32>;
@group(0) @binding(9) var t7: texture_2d<f32>;
@group(0) @binding(10) var t8: texture_2d<f32>;
@group(0) @binding(11) var t9: texture_2d<f32>;

struct QuadOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) world_normal: vec3<f32>,
};

fn quad_corner(index: u32) -> vec2<f32> {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, 1.0),
    );
    return corners[index];
}

fn quad(index: u32, half_size: vec2<f32>, transform: mat4x4<f32>) -> QuadOutput {
    let corner = quad_corner(index);
    var out: QuadOutput;
    out.clip_position = transform * vec4<f32>(corner * half_size, 0.0, 1.0);
    out.uv = vec2<f32>(corner.x * 0.5 + 0.5, 0.5 - corner.y * 0.5);
    out.world_normal = (pass_data.model * vec4<f32>(0.0, 0.0, 1.0, 0.0)).xyz;
    return out;
}

// Full-screen panel in clip space.
@vertex
fn vs_panel(@builtin(vertex_index) index: u32) -> QuadOutput {
    return quad(index, vec2<f32>(1.0, 1.0), mat4x4<f32>(
        vec4<f32>(1.0, 0.0, 0.0, 0.0),
        vec4<f32>(0.0, 1.0, 0.0, 0.0),
        vec4<f32>(0.0, 0.0, 1.0, 0.0),
        vec4<f32>(0.0, 0.0, 0.0, 1.0),
    ));
}

fn facing_light(normal: vec3<f32>) -> f32 {
    return 0.6 + 0.4 * abs(normalize(normal).z);
}

// Displacement toward `center` (uv space), strongest on a ring that
// travels outward with time.
fn ripple(uv: vec2<f32>, center: vec2<f32>, time: f32) -> vec2<f32> {
    let aspect = pass_data.resolution.x / max(pass_data.resolution.y, 1.0);
    let d = (uv - center) * vec2<f32>(aspect, 1.0);
    let dist = length(d);
    let strength = 0.02 * exp(-dist * 6.0) * sin(dist * 40.0 - time * 4.0);
    return d / max(dist, 0.0001) * strength / vec2<f32>(aspect, 1.0);
}
"#;

const CROSSFADE_BODY: &str = r#"
// The 2×2 plane seen through `mvp`.
@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> QuadOutput {
    return quad(index, vec2<f32>(1.0, 1.0), pass_data.mvp);
}

@fragment
fn fs_main(in: QuadOutput) -> @location(0) vec4<f32> {
    let a = textureSample(t0, input_sampler, in.uv);
    let b = textureSample(t1, input_sampler, in.uv);
    let color = mix(a, b, pass_data.progress);
    return vec4<f32>(color.rgb * facing_light(in.world_normal), 1.0);
}
"#;

const BLUR_BODY: &str = r#"
fn weight(i: u32) -> f32 {
    return pass_data.weights[i / 4u][i % 4u];
}

@fragment
fn fs_main(in: QuadOutput) -> @location(0) vec4<f32> {
    var sum = textureSample(t0, input_sampler, in.uv) * weight(0u);
    for (var i = 1u; i < 8u; i += 1u) {
        let offset = pass_data.direction * f32(i);
        sum += textureSample(t0, input_sampler, in.uv + offset) * weight(i);
        sum += textureSample(t0, input_sampler, in.uv - offset) * weight(i);
    }
    return vec4<f32>(sum.rgb, 1.0);
}
"#;

const DISPLACE_BODY: &str = r#"
@fragment
fn fs_main(in: QuadOutput) -> @location(0) vec4<f32> {
    // The mouse arrives centered with y up.
    let center = vec2<f32>(pass_data.mouse.x * 0.5 + 0.5, 0.5 - pass_data.mouse.y * 0.5);
    let uv = in.uv - ripple(in.uv, center, pass_data.time);
    return vec4<f32>(textureSample(t0, input_sampler, uv).rgb, 1.0);
}
"#;

const FILM_BODY: &str = r#"
// Plane sized to the viewport aspect, one unit tall.
@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> QuadOutput {
    let aspect = pass_data.resolution.x / max(pass_data.resolution.y, 1.0);
    return quad(index, vec2<f32>(aspect * 0.5, 0.5), pass_data.mvp);
}

fn pick(slot: u32, a: vec4<f32>, b: vec4<f32>, c: vec4<f32>) -> vec4<f32> {
    return select(select(c, b, slot == 1u), a, slot == 0u);
}

fn frame(slot: u32, uv: vec2<f32>) -> vec4<f32> {
    let a = textureSample(t0, input_sampler, uv);
    let b = textureSample(t1, input_sampler, uv);
    let c = textureSample(t2, input_sampler, uv);
    return pick(slot, a, b, c);
}

@fragment
fn fs_main(in: QuadOutput) -> @location(0) vec4<f32> {
    let p = pass_data.progress;
    let uv = in.uv;
    let noise = textureSample(t3, input_sampler, uv).r;

    // Coordinates each effect samples the outgoing and incoming frame at.
    var from_uv = uv;
    var to_uv = uv;
    var mask = p;
    switch pass_data.effect {
        case 1u: {
            mask = step(noise, p);
        }
        case 2u: {
            mask = smoothstep(uv.x - 0.1, uv.x, p * 1.1);
        }
        case 3u: {
            mask = smoothstep(uv.y - 0.1, uv.y, p * 1.1);
        }
        case 4u: {
            from_uv = (uv - 0.5) / (1.0 + p) + 0.5;
            to_uv = (uv - 0.5) * (1.0 + (1.0 - p)) * 0.5 + 0.5;
        }
        case 5u: {
            from_uv = uv + vec2<f32>(p, 0.0);
            to_uv = uv - vec2<f32>(1.0 - p, 0.0);
            mask = step(1.0 - p, uv.x);
        }
        case 6u: {
            let radius = length((uv - 0.5) * vec2<f32>(pass_data.resolution.x / max(pass_data.resolution.y, 1.0), 1.0));
            mask = 1.0 - smoothstep(p * 1.2 - 0.1, p * 1.2, radius);
        }
        case 7u: {
            let shift = (noise - 0.5) * 0.2;
            from_uv = uv + vec2<f32>(shift * p, 0.0);
            to_uv = uv - vec2<f32>(shift * (1.0 - p), 0.0);
        }
        case 8u: {
            let blocks = mix(200.0, 12.0, sin(p * 3.14159265));
            from_uv = (floor(uv * blocks) + 0.5) / blocks;
            to_uv = from_uv;
        }
        default: {}
    }

    let outgoing = frame(pass_data.primary, from_uv);
    let incoming = frame(pass_data.secondary, to_uv);
    let color = mix(outgoing, incoming, clamp(mask, 0.0, 1.0));
    return vec4<f32>(color.rgb * facing_light(in.world_normal), 1.0);
}
"#;

const COMPOSITE_BODY: &str = r#"
@fragment
fn fs_main(in: QuadOutput) -> @location(0) vec4<f32> {
    let noise = textureSample(t9, input_sampler, in.uv * 0.5 + vec2<f32>(pass_data.time * 0.1, 0.0)).r;
    let grid = in.uv * 3.0;
    let cell = min(floor(grid), vec2<f32>(2.0));
    let local = fract(grid) + (noise - 0.5) * 0.02;

    var tiles = array<vec4<f32>, 9>(
        textureSample(t0, input_sampler, local),
        textureSample(t1, input_sampler, local),
        textureSample(t2, input_sampler, local),
        textureSample(t3, input_sampler, local),
        textureSample(t4, input_sampler, local),
        textureSample(t5, input_sampler, local),
        textureSample(t6, input_sampler, local),
        textureSample(t7, input_sampler, local),
        textureSample(t8, input_sampler, local),
    );
    let index = u32(cell.y) * 3u + u32(cell.x);
    let color = tiles[index];

    // The tile under the pointer stays bright, the rest dim.
    let hovered = all(cell == min(floor(pass_data.mouse * 3.0), vec2<f32>(2.0)));
    let shade = select(0.6, 1.0, hovered);
    return vec4<f32>(color.rgb * shade, 1.0);
}
"#;

const PRESENT_BODY: &str = r#"
@fragment
fn fs_main(in: QuadOutput) -> @location(0) vec4<f32> {
    let uv = in.uv - ripple(in.uv, pass_data.mouse, pass_data.time * 10.0);
    let color = textureSample(t0, input_sampler, uv).rgb;
    let vignette = 1.0 - 0.3 * length(in.uv - 0.5);
    return vec4<f32>(color * vignette, 1.0);
}
"#;

/// Program body appended to the shared post-process declarations.
fn post_body(program: Program) -> &'static str {
    match program {
        Program::Crossfade => CROSSFADE_BODY,
        Program::Blur => BLUR_BODY,
        Program::Displace => DISPLACE_BODY,
        Program::FilmEffect => FILM_BODY,
        Program::Composite => COMPOSITE_BODY,
        Program::Present => PRESENT_BODY,
    }
}

/// Complete WGSL source for a post-process program.
pub fn post_shader(program: Program) -> String {
    format!("{POST_COMMON}\n{}", post_body(program))
}

/// Vertex entry point: planes seen through a camera use their own, flat
/// passes share the clip-space panel.
pub fn post_vertex_entry(program: Program) -> &'static str {
    match program {
        Program::Crossfade | Program::FilmEffect => "vs_main",
        Program::Blur | Program::Displace | Program::Composite | Program::Present => "vs_panel",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_program_defines_its_entry_points() {
        for program in Program::ALL {
            let source = post_shader(program);
            assert!(source.contains("fn fs_main"), "{program:?}");
            assert!(source.contains(&format!("fn {}", post_vertex_entry(program))), "{program:?}");
        }
    }

    #[test]
    fn texture_slots_cover_the_widest_program() {
        let widest = Program::ALL.iter().map(|p| p.input_count()).max().unwrap_or(0);
        let source = post_shader(Program::Composite);
        for slot in 0..widest {
            assert!(source.contains(&format!("var t{slot}: texture_2d<f32>")));
        }
    }
}
