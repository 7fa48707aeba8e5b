use anyhow::{Context, Result};
use bytemuck::Zeroable;
use crossbeam_channel::{bounded, Receiver, Sender};

use crate::audio::{AudioAnalysis, AudioFrame, AudioTexture};
use crate::blocks::{self, PerFrameBlock, PerRunBlock};
use crate::context::GpuContext;
use crate::model::Model;
use crate::shader::Shader;
use crate::textures::TextureCache;
use crate::uniforms::UniformStore;

/// Engine construction options.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Canvas size in pixels. The canvas must have room for every model
    /// point: one point per pixel.
    pub width: u32,
    pub height: u32,
    /// When set, shaders allocate readback rings and `render_shader` can
    /// fill per-point color slices.
    pub cpu_readback: bool,
    /// Capacity of the audio handoff channel.
    pub audio_queue_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 640,
            cpu_readback: true,
            audio_queue_depth: 4,
        }
    }
}

/// Host-supplied values for one tick.
#[derive(Debug, Clone)]
pub struct FrameInput {
    pub delta_ms: f64,
    /// Tempo phase, 0..1 over one beat.
    pub beat_basis: f64,
    /// Active palette, up to [`crate::MAX_PALETTE_COLORS`] RGB colors.
    pub palette: Vec<[f32; 3]>,
    pub primary_rgb: [f32; 3],
    pub secondary_rgb: [f32; 3],
    pub palette_offset: f32,
}

impl Default for FrameInput {
    fn default() -> Self {
        Self {
            delta_ms: 1000.0 / 60.0,
            beat_basis: 0.0,
            palette: vec![[1.0, 1.0, 1.0]],
            primary_rgb: [1.0, 1.0, 1.0],
            secondary_rgb: [0.5, 0.5, 0.5],
            palette_offset: 0.0,
        }
    }
}

/// Color context staged into every shader's standard uniforms.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FrameColors {
    pub primary: [f32; 3],
    pub secondary: [f32; 3],
    pub palette_offset: f32,
}

/// Everything a shader needs from the engine for one operation. Built
/// per-call so field borrows stay disjoint from the shader itself.
pub(crate) struct ShaderContext<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub cache: &'a mut TextureCache,
    pub shared_layout: &'a wgpu::BindGroupLayout,
    pub pattern_layout: &'a wgpu::BindGroupLayout,
    pub shared_bind_group: &'a wgpu::BindGroup,
    pub audio_view: &'a wgpu::TextureView,
    pub canvas: (u32, u32),
    pub ubo_alignment: u32,
    pub cache_epoch: u64,
    pub cpu_mode: bool,
    pub time_s: f64,
    pub delta_s: f64,
    pub colors: FrameColors,
}

/// The rendering engine: owns the device context, the texture cache, the
/// two shared uniform blocks, and the audio-derived per-frame state.
///
/// Single-threaded by design: construct it on the rendering thread, call
/// [`Engine::tick`] once per animation frame before any shader runs, then
/// drive each active shader through [`Engine::render_shader`]. The only
/// cross-thread input is the audio channel, drained at the start of the
/// tick.
pub struct Engine {
    gpu: GpuContext,
    cache: TextureCache,
    shared_layout: wgpu::BindGroupLayout,
    pattern_layout: wgpu::BindGroupLayout,
    shared_bind_group: wgpu::BindGroup,
    _per_run_buffer: wgpu::Buffer,
    per_frame_buffer: wgpu::Buffer,
    per_frame: PerFrameBlock,
    audio_texture: AudioTexture,
    analysis: AudioAnalysis,
    audio_tx: Sender<AudioFrame>,
    audio_rx: Receiver<AudioFrame>,
    colors: FrameColors,
    time_s: f64,
    delta_s: f64,
    frame_index: u64,
    cache_epoch: u64,
    cpu_readback: bool,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        blocks::verify_block_layouts()?;

        let gpu = GpuContext::new(config.width, config.height)?;
        let alignment = gpu.uniform_alignment;
        tracing::info!(
            width = gpu.width,
            height = gpu.height,
            points = gpu.width * gpu.height,
            uniform_alignment = alignment,
            "rendering canvas ready"
        );

        // Shared blocks are sized up to the device's minimum uniform buffer
        // alignment; undersized blocks are undefined behavior on some
        // drivers, so round up rather than trusting the struct size.
        let per_run_size =
            blocks::aligned_size(std::mem::size_of::<PerRunBlock>(), alignment);
        let per_run_buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("per-run block"),
            size: per_run_size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let per_run = PerRunBlock::new(gpu.width, gpu.height);
        gpu.queue
            .write_buffer(&per_run_buffer, 0, bytemuck::bytes_of(&per_run));

        let per_frame_size =
            blocks::aligned_size(std::mem::size_of::<PerFrameBlock>(), alignment);
        let per_frame_buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("per-frame block"),
            size: per_frame_size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let shared_layout = gpu
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("shared block layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                ],
            });
        let pattern_layout = gpu
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("pattern block layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });
        let shared_bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("shared blocks"),
            layout: &shared_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: per_run_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: per_frame_buffer.as_entire_binding(),
                },
            ],
        });

        let audio_texture = AudioTexture::new(&gpu.device);
        let (audio_tx, audio_rx) = bounded(config.audio_queue_depth.max(1));

        Ok(Self {
            gpu,
            cache: TextureCache::new(),
            shared_layout,
            pattern_layout,
            shared_bind_group,
            _per_run_buffer: per_run_buffer,
            per_frame_buffer,
            per_frame: PerFrameBlock::zeroed(),
            audio_texture,
            analysis: AudioAnalysis::new(),
            audio_tx,
            audio_rx,
            colors: FrameColors {
                primary: [1.0, 1.0, 1.0],
                secondary: [0.5, 0.5, 0.5],
                palette_offset: 0.0,
            },
            time_s: 0.0,
            delta_s: 0.0,
            frame_index: 0,
            cache_epoch: 0,
            cpu_readback: config.cpu_readback,
        })
    }

    /// Handle an audio-analysis thread uses to deliver frames. The engine
    /// drains to the newest frame at the start of each tick; a full channel
    /// just drops the oldest data.
    pub fn audio_sender(&self) -> Sender<AudioFrame> {
        self.audio_tx.clone()
    }

    pub fn canvas(&self) -> (u32, u32) {
        self.gpu.canvas()
    }

    pub fn time(&self) -> f64 {
        self.time_s
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn cpu_readback(&self) -> bool {
        self.cpu_readback
    }

    pub fn cache(&self) -> &TextureCache {
        &self.cache
    }

    /// Pre-loads (or retains) a static texture outside any shader, e.g. to
    /// keep an asset warm across pattern swaps. Pair with
    /// [`Engine::release_texture`].
    pub fn acquire_texture(&mut self, path: &std::path::Path) -> Result<()> {
        self.cache
            .acquire_static(&self.gpu.device, &self.gpu.queue, path)
    }

    pub fn release_texture(&mut self, path: &std::path::Path) -> Result<()> {
        self.cache.release_static(path)
    }

    /// The model's points moved. Every cached model texture is discarded;
    /// shaders re-derive textures on their next frame.
    pub fn model_generation_changed(&mut self) {
        self.cache_epoch += 1;
        self.cache.clear_model_textures();
    }

    /// Advances shared per-frame state: drains the audio channel, updates
    /// the EMA baselines and the audio texture, and rewrites + re-uploads
    /// the per-frame block. Call exactly once per animation frame, before
    /// any shader runs.
    pub fn tick(&mut self, frame: &FrameInput) {
        let delta_ms = frame.delta_ms.max(0.0);
        self.delta_s = delta_ms / 1000.0;
        self.time_s += self.delta_s;
        self.frame_index += 1;

        let mut latest = None;
        while let Ok(audio_frame) = self.audio_rx.try_recv() {
            latest = Some(audio_frame);
        }
        if let Some(audio_frame) = latest {
            self.analysis.ingest(audio_frame);
        }
        self.analysis.update(delta_ms);
        self.audio_texture
            .upload(&self.gpu.queue, self.analysis.texture_data());

        let beat = frame.beat_basis.rem_euclid(1.0);
        self.per_frame.beat = beat as f32;
        self.per_frame.sin_phase_beat =
            (0.5 + 0.5 * (std::f64::consts::PI * beat).sin()) as f32;
        self.per_frame.bass_level = self.analysis.bass_level() as f32;
        self.per_frame.treble_level = self.analysis.treble_level() as f32;
        self.per_frame.bass_ratio = self.analysis.bass_ratio() as f32;
        self.per_frame.treble_ratio = self.analysis.treble_ratio() as f32;
        self.per_frame.volume_ratio = self.analysis.volume_ratio() as f32;
        let [stem_bass, stem_drums, stem_vocals, stem_other] = self.analysis.stems();
        self.per_frame.stem_bass = stem_bass;
        self.per_frame.stem_drums = stem_drums;
        self.per_frame.stem_vocals = stem_vocals;
        self.per_frame.stem_other = stem_other;
        self.per_frame.set_palette(&frame.palette);

        self.gpu
            .queue
            .write_buffer(&self.per_frame_buffer, 0, bytemuck::bytes_of(&self.per_frame));

        self.colors = FrameColors {
            primary: frame.primary_rgb,
            secondary: frame.secondary_rgb,
            palette_offset: frame.palette_offset,
        };
    }

    /// Initializes the shader's GPU resources if needed and marks it
    /// active. Reactivation after `deactivate_shader` is cheap: resources
    /// were kept, only the backbuffer is cleared.
    pub fn activate_shader(&mut self, shader: &mut Shader) -> Result<()> {
        let mut ctx = self.shader_context();
        shader.activate(&mut ctx)
    }

    pub fn deactivate_shader(&mut self, shader: &mut Shader) {
        shader.deactivate();
    }

    /// Permanent disposal: releases the shader's texture cache references.
    pub fn dispose_shader(&mut self, shader: &mut Shader) -> Result<()> {
        shader.dispose(&mut self.cache)
    }

    /// Runs one shader for the current frame. In CPU mode `out`, when
    /// provided, receives the previous frame's resolved per-point colors
    /// as packed BGRA words.
    pub fn render_shader(&mut self, shader: &mut Shader, out: Option<&mut [u32]>) -> Result<()> {
        let mut ctx = self.shader_context();
        shader.run(&mut ctx, out, None)
    }

    /// Like [`Engine::render_shader`], with a hook that runs after the
    /// engine stages its uniforms so the caller can set or override any
    /// uniform value.
    pub fn render_shader_with(
        &mut self,
        shader: &mut Shader,
        out: Option<&mut [u32]>,
        mut hook: impl FnMut(&mut UniformStore) -> Result<()>,
    ) -> Result<()> {
        let mut ctx = self.shader_context();
        shader.run(&mut ctx, out, Some(&mut hook))
    }

    /// Convenience for hosts sizing per-point color buffers.
    pub fn color_buffer_for(&self, model: &Model) -> Vec<u32> {
        vec![0; model.len()]
    }

    /// Blocks until all submitted GPU work completes. Useful before
    /// teardown or when exporting a final frame.
    pub fn drain_gpu(&self) -> Result<()> {
        self.gpu
            .device
            .poll(wgpu::PollType::Wait)
            .map(|_| ())
            .context("device poll failed while draining")
    }

    fn shader_context(&mut self) -> ShaderContext<'_> {
        ShaderContext {
            device: &self.gpu.device,
            queue: &self.gpu.queue,
            cache: &mut self.cache,
            shared_layout: &self.shared_layout,
            pattern_layout: &self.pattern_layout,
            shared_bind_group: &self.shared_bind_group,
            audio_view: &self.audio_texture.view,
            canvas: (self.gpu.width, self.gpu.height),
            ubo_alignment: self.gpu.uniform_alignment,
            cache_epoch: self.cache_epoch,
            cpu_mode: self.cpu_readback,
            time_s: self.time_s,
            delta_s: self.delta_s,
            colors: self.colors,
        }
    }
}
