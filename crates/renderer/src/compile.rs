use std::borrow::Cow;
use std::fmt::Write as _;

use anyhow::{anyhow, Result};
use wgpu::naga::ShaderStage;

/// Compiles the static full-surface quad vertex shader.
pub(crate) fn compile_vertex_shader(device: &wgpu::Device) -> Result<wgpu::ShaderModule> {
    compile_glsl(device, VERTEX_SHADER_GLSL, ShaderStage::Vertex, "quad vertex")
}

/// Wraps a preprocessed pattern body in the engine template and compiles it
/// through the naga GLSL frontend. `block_declaration` is the generated
/// per-shader uniform block; `samplers` maps sampler uniform names to their
/// texture units in unit order.
pub(crate) fn compile_fragment_shader(
    device: &wgpu::Device,
    body: &str,
    block_declaration: &str,
    samplers: &[(String, u32)],
    label: &str,
) -> Result<wgpu::ShaderModule> {
    let wrapped = wrap_fragment(body, block_declaration, samplers);
    compile_glsl(device, &wrapped, ShaderStage::Fragment, label)
}

fn compile_glsl(
    device: &wgpu::Device,
    source: &str,
    stage: ShaderStage,
    label: &str,
) -> Result<wgpu::ShaderModule> {
    // A failed compile must abort shader construction instead of surfacing
    // later as an uncaptured device error.
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(source.to_string()),
            stage,
            defines: &[],
        },
    });
    if let Some(error) = pollster::block_on(device.pop_error_scope()) {
        return Err(anyhow!("failed to compile shader {label}: {error}"));
    }
    Ok(module)
}

/// Produces the final device-ready fragment source:
///
/// 1. [`SHARED_HEADER`] declares the two shared uniform blocks and the
///    macro aliases onto their members.
/// 2. The generated per-shader block and sampler bindings follow.
/// 3. The preprocessed body is spliced in behind a `#line 1` marker.
/// 4. [`FOOTER`] calls `mainImage` and applies the brightness control.
pub(crate) fn wrap_fragment(
    body: &str,
    block_declaration: &str,
    samplers: &[(String, u32)],
) -> String {
    let mut source = String::with_capacity(body.len() + 2048);
    source.push_str(SHARED_HEADER);
    source.push('\n');
    source.push_str(block_declaration);
    source.push('\n');
    source.push_str(&sampler_declarations(samplers));
    source.push_str("\n#line 1\n");
    source.push_str(body);
    if !body.ends_with('\n') {
        source.push('\n');
    }
    source.push_str(FOOTER);
    source
}

/// Texture/sampler pairs at `set = 2`, two bindings per unit, with a
/// combined-sampler define per uniform name.
fn sampler_declarations(samplers: &[(String, u32)]) -> String {
    let mut decl = String::new();
    for (name, unit) in samplers {
        let tex_binding = unit * 2;
        let smp_binding = unit * 2 + 1;
        let _ = writeln!(
            decl,
            "layout(set = 2, binding = {tex_binding}) uniform texture2D ps_tex_{unit};"
        );
        let _ = writeln!(
            decl,
            "layout(set = 2, binding = {smp_binding}) uniform sampler ps_smp_{unit};"
        );
        let _ = writeln!(decl, "#define {name} sampler2D(ps_tex_{unit}, ps_smp_{unit})");
    }
    decl
}

/// GLSL prologue shared by every pattern shader.
///
/// The two block declarations must match the host structs in `blocks.rs`
/// field for field; `blocks::verify_block_layouts` guards the host side.
const SHARED_HEADER: &str = r"#version 450

layout(location = 0) out vec4 outColor;

layout(std140, set = 0, binding = 0) uniform PerRunBlock {
    vec2 _resolution;
    vec2 _runPad;
} runBlock;

layout(std140, set = 0, binding = 1) uniform PerFrameBlock {
    float _beat;
    float _sinPhaseBeat;
    float _bassLevel;
    float _trebleLevel;
    float _bassRatio;
    float _trebleRatio;
    float _volumeRatio;
    float _stemBass;
    float _stemDrums;
    float _stemVocals;
    float _stemOther;
    float _paletteSize;
    vec4 _palette[5];
} frameBlock;

#define iResolution runBlock._resolution
#define beat frameBlock._beat
#define sinPhaseBeat frameBlock._sinPhaseBeat
#define bassLevel frameBlock._bassLevel
#define trebleLevel frameBlock._trebleLevel
#define bassRatio frameBlock._bassRatio
#define trebleRatio frameBlock._trebleRatio
#define volumeRatio frameBlock._volumeRatio
#define stemBass frameBlock._stemBass
#define stemDrums frameBlock._stemDrums
#define stemVocals frameBlock._stemVocals
#define stemOther frameBlock._stemOther
#define iPaletteSize frameBlock._paletteSize
#define iPalette frameBlock._palette
";

/// GLSL epilogue: delegates to the pattern's `mainImage` and applies the
/// brightness control on the way out.
const FOOTER: &str = r"
void main() {
    vec4 color = vec4(0.0);
    mainImage(color, gl_FragCoord.xy);
    outColor = vec4(color.rgb * iBrightness, color.a);
}
";

/// Full-surface quad built from two triangles; no vertex buffers.
const VERTEX_SHADER_GLSL: &str = r"#version 450

const vec2 positions[6] = vec2[6](
    vec2(-1.0, -1.0), vec2(1.0, -1.0), vec2(1.0, 1.0),
    vec2(1.0, 1.0), vec2(-1.0, 1.0), vec2(-1.0, -1.0)
);

void main() {
    gl_Position = vec4(positions[gl_VertexIndex], 0.0, 1.0);
}
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_splices_body_behind_line_marker() {
        let body = "void mainImage(out vec4 fragColor, in vec2 fragCoord) { fragColor = vec4(1.0); }";
        let wrapped = wrap_fragment(body, "// block\n#define iBrightness 1.0\n", &[]);
        assert!(wrapped.starts_with("#version 450"));
        let line_marker = wrapped.find("#line 1").expect("line marker present");
        let body_at = wrapped.find("mainImage(out").expect("body present");
        assert!(line_marker < body_at);
        assert!(wrapped.contains("mainImage(color, gl_FragCoord.xy)"));
    }

    #[test]
    fn sampler_declarations_pair_bindings_per_unit() {
        let samplers = vec![("iChannel0".to_string(), 0), ("iBackbuffer".to_string(), 3)];
        let decl = sampler_declarations(&samplers);
        assert!(decl.contains("layout(set = 2, binding = 0) uniform texture2D ps_tex_0;"));
        assert!(decl.contains("layout(set = 2, binding = 1) uniform sampler ps_smp_0;"));
        assert!(decl.contains("#define iChannel0 sampler2D(ps_tex_0, ps_smp_0)"));
        assert!(decl.contains("layout(set = 2, binding = 6) uniform texture2D ps_tex_3;"));
        assert!(decl.contains("#define iBackbuffer sampler2D(ps_tex_3, ps_smp_3)"));
    }
}
