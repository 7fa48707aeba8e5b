use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use renderer::{AudioFrame, Engine, EngineConfig, FrameInput, Model, Shader, ShaderDescriptor};
use shaderlang::{PatternRegistry, Preprocessor};

pub fn list(dir: &Path, json: bool) -> Result<()> {
    let preprocessor = Preprocessor::new(dir);
    let registry = PatternRegistry::scan(dir, &preprocessor)
        .with_context(|| format!("failed to scan {}", dir.display()))?;

    if json {
        let patterns: Vec<_> = registry.iter().collect();
        println!("{}", serde_json::to_string_pretty(&patterns)?);
        return Ok(());
    }

    if registry.is_empty() {
        println!("no registrable shaders in {}", dir.display());
        return Ok(());
    }
    for def in registry.iter() {
        let drift = if def.drift { " [drift]" } else { "" };
        println!(
            "{:<28} {:<20} {}{}",
            def.class_name,
            def.category,
            def.shader_path.display(),
            drift
        );
    }
    Ok(())
}

pub struct RenderOptions {
    pub dir: PathBuf,
    pub pattern: String,
    pub frames: u32,
    pub size: (u32, u32),
    pub grid: (u32, u32),
    pub bpm: f64,
    pub out: Option<PathBuf>,
}

pub fn render(options: RenderOptions) -> Result<()> {
    let preprocessor = Preprocessor::new(&options.dir);
    let registry = PatternRegistry::scan(&options.dir, &preprocessor)
        .with_context(|| format!("failed to scan {}", options.dir.display()))?;
    let def = registry
        .get(&options.pattern)
        .ok_or_else(|| anyhow!("pattern `{}` is not registered", options.pattern))?;

    let processed = preprocessor
        .process_file(&def.shader_path)
        .with_context(|| format!("failed to preprocess {}", def.shader_path.display()))?;

    let mut engine = Engine::new(EngineConfig {
        width: options.size.0,
        height: options.size.1,
        ..EngineConfig::default()
    })?;
    let model = Arc::new(Model::grid(options.grid.0, options.grid.1));
    let mut shader = Shader::new(ShaderDescriptor::new(processed));
    shader.set_model(&model);
    engine.activate_shader(&mut shader)?;

    // Feed the engine a silent audio frame so ratios settle at 1.0.
    engine
        .audio_sender()
        .send(AudioFrame::default())
        .context("audio channel closed")?;

    let delta_ms = 1000.0 / 60.0;
    let beat_step = options.bpm / 60.0 * (delta_ms / 1000.0);
    let mut colors = engine.color_buffer_for(&model);
    let mut delivered = 0u32;

    for frame in 0..options.frames.max(1) {
        let input = FrameInput {
            delta_ms,
            beat_basis: (frame as f64 * beat_step).rem_euclid(1.0),
            ..FrameInput::default()
        };
        engine.tick(&input);
        engine.render_shader(&mut shader, Some(colors.as_mut_slice()))?;
        if colors.iter().any(|&c| c != 0) {
            delivered += 1;
        }
    }
    // One more frame after draining so the final readback resolves.
    engine.drain_gpu()?;
    engine.tick(&FrameInput {
        delta_ms,
        ..FrameInput::default()
    });
    engine.render_shader(&mut shader, Some(colors.as_mut_slice()))?;

    let lit = colors.iter().filter(|&&c| c & 0x00ff_ffff != 0).count();
    tracing::info!(
        pattern = %def.class_name,
        frames = options.frames,
        frames_with_colors = delivered,
        lit_points = lit,
        total_points = model.len(),
        "render complete"
    );

    if let Some(out) = &options.out {
        write_png(out, &colors, options.grid)?;
        println!("wrote {}", out.display());
    }

    engine.dispose_shader(&mut shader)?;
    Ok(())
}

/// Saves per-point colors as a grid-shaped PNG. Colors arrive as packed
/// BGRA words; PNG wants RGBA bytes.
fn write_png(path: &Path, colors: &[u32], grid: (u32, u32)) -> Result<()> {
    let (cols, rows) = grid;
    let mut image = image::RgbaImage::new(cols, rows);
    for (index, pixel) in image.pixels_mut().enumerate() {
        let color = colors.get(index).copied().unwrap_or(0);
        let [b, g, r, a] = color.to_le_bytes();
        *pixel = image::Rgba([r, g, b, a]);
    }
    image
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))
}
