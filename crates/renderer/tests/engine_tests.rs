//! Integration tests that exercise the engine against a real device.
//!
//! Every test bails out quietly when no GPU adapter is available so the
//! suite stays green on headless CI boxes.

use std::path::Path;
use std::sync::Arc;

use renderer::{Engine, EngineConfig, FrameInput, Model, Shader, ShaderDescriptor};
use shaderlang::Preprocessor;

const SOLID_SHADER: &str =
    "void mainImage(out vec4 fragColor, in vec2 fragCoord) { fragColor = vec4(1.0, 0.5, 0.25, 1.0); }\n";

const FEEDBACK_SHADER: &str = r"
void mainImage(out vec4 fragColor, in vec2 fragCoord) {
    vec2 uv = fragCoord / iResolution;
    vec4 prev = texture(iBackbuffer, uv);
    vec4 coords = texture(lxModelCoords, uv);
    vec4 audio = texture(iChannel0, vec2(0.5, 0.25));
    fragColor = vec4(coords.rgb * iScale, 1.0) + prev * iWow1 + audio * levelReact;
}
";

fn try_engine(width: u32, height: u32) -> Option<Engine> {
    Engine::new(EngineConfig {
        width,
        height,
        ..EngineConfig::default()
    })
    .ok()
}

fn build_shader(name: &str, source: &str) -> Shader {
    let preprocessor = Preprocessor::new(".");
    let processed = preprocessor
        .process_source(name, source, Path::new("."))
        .expect("shader should preprocess");
    Shader::new(ShaderDescriptor::new(processed))
}

#[test]
fn readback_lags_one_frame_then_delivers_colors() {
    let Some(mut engine) = try_engine(32, 32) else {
        return;
    };
    let model = Arc::new(Model::grid(8, 8));
    let mut shader = build_shader("solid", SOLID_SHADER);
    shader.set_model(&model);
    engine.activate_shader(&mut shader).expect("activate");

    let mut colors = engine.color_buffer_for(&model);
    engine.tick(&FrameInput::default());
    engine
        .render_shader(&mut shader, Some(colors.as_mut_slice()))
        .expect("first frame");
    // The first frame has no prior content and is skipped, not read.
    assert!(colors.iter().all(|&c| c == 0));

    engine.drain_gpu().expect("drain");
    engine.tick(&FrameInput::default());
    engine
        .render_shader(&mut shader, Some(colors.as_mut_slice()))
        .expect("second frame");

    let c = colors[0];
    let (b, g, r, a) = (c & 0xff, (c >> 8) & 0xff, (c >> 16) & 0xff, (c >> 24) & 0xff);
    assert_eq!(r, 255, "red channel, got {c:#010x}");
    assert_eq!(a, 255, "alpha channel, got {c:#010x}");
    assert!((126..=130).contains(&g), "green channel, got {c:#010x}");
    assert!((62..=66).contains(&b), "blue channel, got {c:#010x}");
}

#[test]
fn feedback_and_model_samplers_compile_and_run() {
    let Some(mut engine) = try_engine(32, 32) else {
        return;
    };
    let model = Arc::new(Model::grid(4, 4));
    let mut shader = build_shader("feedback", FEEDBACK_SHADER);
    shader.set_model(&model);
    engine.activate_shader(&mut shader).expect("activate");
    for _ in 0..3 {
        engine.tick(&FrameInput::default());
        engine
            .render_shader(&mut shader, None)
            .expect("frame renders");
        engine.drain_gpu().expect("drain");
    }
}

#[test]
fn static_textures_are_created_once_and_destroyed_once() {
    let Some(mut engine) = try_engine(16, 16) else {
        return;
    };
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("tex.png");
    image::RgbaImage::from_pixel(4, 4, image::Rgba([255, 0, 0, 255]))
        .save(&path)
        .expect("write png");

    for _ in 0..3 {
        engine.acquire_texture(&path).expect("acquire");
    }
    assert_eq!(engine.cache().static_refs(&path), Some(3));
    assert_eq!(engine.cache().static_count(), 1);

    for _ in 0..3 {
        engine.release_texture(&path).expect("release");
    }
    assert_eq!(engine.cache().static_refs(&path), None);
    assert_eq!(engine.cache().static_count(), 0);

    // One release too many is a lifecycle bug and must fail loudly.
    assert!(engine.release_texture(&path).is_err());
}

#[test]
fn shaders_share_one_model_texture_until_generation_changes() {
    let Some(mut engine) = try_engine(16, 16) else {
        return;
    };
    let model = Arc::new(Model::grid(4, 4));

    let mut first = build_shader("first", SOLID_SHADER);
    first.set_model(&model);
    engine.activate_shader(&mut first).expect("activate first");
    let mut second = build_shader("second", SOLID_SHADER);
    second.set_model(&model);
    engine.activate_shader(&mut second).expect("activate second");

    engine.tick(&FrameInput::default());
    engine.render_shader(&mut first, None).expect("first frame");
    engine.render_shader(&mut second, None).expect("second frame");
    assert_eq!(engine.cache().model_count(), 1);

    engine.model_generation_changed();
    assert_eq!(engine.cache().model_count(), 0);

    engine.tick(&FrameInput::default());
    engine.render_shader(&mut first, None).expect("post-change frame");
    assert_eq!(engine.cache().model_count(), 1);
}

#[test]
fn channel_texture_refcounts_follow_shader_lifecycle() {
    let Some(mut engine) = try_engine(16, 16) else {
        return;
    };
    let dir = tempfile::tempdir().expect("tempdir");
    let tex_path = dir.path().join("noise.png");
    image::RgbaImage::from_pixel(2, 2, image::Rgba([0, 255, 0, 255]))
        .save(&tex_path)
        .expect("write png");

    let source = "#pragma iChannel1 \"noise.png\"\nvoid mainImage(out vec4 fragColor, in vec2 fragCoord) { fragColor = texture(iChannel1, fragCoord / iResolution); }\n";
    let preprocessor = Preprocessor::new(dir.path());
    let processed = preprocessor
        .process_source("textured", source, dir.path())
        .expect("preprocess");
    let model = Arc::new(Model::grid(4, 4));

    let mut a = Shader::new(ShaderDescriptor::new(processed.clone()));
    a.set_model(&model);
    let mut b = Shader::new(ShaderDescriptor::new(processed));
    b.set_model(&model);

    engine.activate_shader(&mut a).expect("activate a");
    engine.activate_shader(&mut b).expect("activate b");
    assert_eq!(engine.cache().static_refs(&tex_path), Some(2));

    engine.dispose_shader(&mut a).expect("dispose a");
    assert_eq!(engine.cache().static_refs(&tex_path), Some(1));
    engine.dispose_shader(&mut b).expect("dispose b");
    assert_eq!(engine.cache().static_refs(&tex_path), None);
}
