use bytemuck::{Pod, Zeroable};

/// Textured quad used by the text panels.
pub(super) const OVERLAY_SHADER_SOURCE: &str = r#"
struct VertexInput {
    @location(0) position: vec2<f32>,
    @location(1) uv: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.position = vec4<f32>(input.position, 0.0, 1.0);
    out.uv = input.uv;
    return out;
}

@group(0) @binding(0)
var panel_texture: texture_2d<f32>;
@group(0) @binding(1)
var panel_sampler: sampler;

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let uv = clamp(input.uv, vec2<f32>(0.0, 0.0), vec2<f32>(1.0, 1.0));
    return textureSample(panel_texture, panel_sampler, uv);
}
"#;

/// Instanced items lit by one spotlight plus a dim fill.
pub(super) const MESH_SHADER_SOURCE: &str = r#"
struct MeshUniforms {
    view_projection: mat4x4<f32>,
    light_position: vec4<f32>,
    light_target: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> uniforms: MeshUniforms;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
};

struct InstanceInput {
    @location(2) model_0: vec4<f32>,
    @location(3) model_1: vec4<f32>,
    @location(4) model_2: vec4<f32>,
    @location(5) model_3: vec4<f32>,
    @location(6) color: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) color: vec4<f32>,
};

@vertex
fn mesh_vs_main(vert: VertexInput, inst: InstanceInput) -> VertexOutput {
    let model = mat4x4<f32>(inst.model_0, inst.model_1, inst.model_2, inst.model_3);
    let world = model * vec4<f32>(vert.position, 1.0);
    var out: VertexOutput;
    out.position = uniforms.view_projection * world;
    out.world_position = world.xyz;
    out.normal = normalize((model * vec4<f32>(vert.normal, 0.0)).xyz);
    out.color = inst.color;
    return out;
}

@fragment
fn mesh_fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let light_pos = uniforms.light_position.xyz;
    let axis = normalize(uniforms.light_target.xyz - light_pos);
    let to_fragment = normalize(input.world_position - light_pos);
    let cone_cos = uniforms.light_target.w;
    let spot = smoothstep(cone_cos, min(cone_cos + 0.08, 1.0), dot(axis, to_fragment));
    let diffuse = max(dot(normalize(input.normal), -to_fragment), 0.0);
    let fill = 0.28 + 0.12 * max(input.normal.y, 0.0);
    let shade = fill + diffuse * spot * 0.95;
    return vec4<f32>(input.color.rgb * shade, input.color.a);
}
"#;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(super) struct QuadVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

pub(super) const QUAD_INDICES: [u16; 6] = [0, 1, 2, 2, 1, 3];
