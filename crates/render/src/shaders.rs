use crate::device::{AttributeDecl, AttributeKind, AttributeLocation, ProgramSource, UniformDecl};
use crate::geometry::{COLOR, POSITION};
use crate::uniform::UniformKind;

/// Uniform block shared by both stages of the basic program. Field order
/// must match the uniform declarations in [`basic_program`].
const BASIC_UNIFORMS: &str = r#"
struct Uniforms {
    modelMatrix: mat4x4<f32>,
    viewMatrix: mat4x4<f32>,
    projectionMatrix: mat4x4<f32>,
    baseColor: vec3<f32>,
    useVertexColors: i32,
};

@group(0) @binding(0)
var<uniform> uniforms: Uniforms;
"#;

const BASIC_VERTEX: &str = r#"
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec3<f32>,
};

@vertex
fn vs_main(
    @location(0) vertexPosition: vec3<f32>,
    @location(1) vertexColor: vec3<f32>,
) -> VertexOutput {
    var clip = uniforms.projectionMatrix * uniforms.viewMatrix * uniforms.modelMatrix
        * vec4<f32>(vertexPosition, 1.0);
    // Projection matrices map depth to [-1, 1]; the target expects [0, 1].
    clip.z = (clip.z + clip.w) * 0.5;

    var out: VertexOutput;
    out.clip_position = clip;
    out.color = vertexColor;
    return out;
}
"#;

const BASIC_FRAGMENT: &str = r#"
@fragment
fn fs_main(@location(0) color: vec3<f32>) -> @location(0) vec4<f32> {
    var c = vec4<f32>(uniforms.baseColor, 1.0);
    if (uniforms.useVertexColors != 0) {
        c *= vec4<f32>(color, 1.0);
    }
    return c;
}
"#;

/// Flat-colored program with optional per-vertex color, used by every
/// built-in material.
pub fn basic_program(label: &str) -> ProgramSource {
    ProgramSource {
        label: label.to_owned(),
        vertex: format!("{BASIC_UNIFORMS}{BASIC_VERTEX}"),
        fragment: format!("{BASIC_UNIFORMS}{BASIC_FRAGMENT}"),
        attributes: vec![
            AttributeDecl {
                name: POSITION.to_owned(),
                location: AttributeLocation(0),
                kind: AttributeKind::Vec3,
            },
            AttributeDecl {
                name: COLOR.to_owned(),
                location: AttributeLocation(1),
                kind: AttributeKind::Vec3,
            },
        ],
        uniforms: [
            ("modelMatrix", UniformKind::Mat4),
            ("viewMatrix", UniformKind::Mat4),
            ("projectionMatrix", UniformKind::Mat4),
            ("baseColor", UniformKind::Vec3),
            ("useVertexColors", UniformKind::Bool),
        ]
        .into_iter()
        .map(|(name, kind)| UniformDecl {
            name: name.to_owned(),
            kind,
        })
        .collect(),
    }
}
