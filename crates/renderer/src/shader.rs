use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use shaderlang::{ControlSet, ControlTag, CustomKind, ProcessedShader};

use crate::blocks::aligned_size;
use crate::compile;
use crate::engine::ShaderContext;
use crate::model::Model;
use crate::target::{ReadbackRing, RenderTarget, TARGET_FORMAT};
use crate::textures::{self, TextureCache};
use crate::uniforms::{UniformKind, UniformStore};

/// Texture units with engine-assigned meanings, claimed in this order for
/// every shader. Shader-specific channels follow.
pub const TEXTURE_UNIT_AUDIO: u32 = 0;
pub const TEXTURE_UNIT_COORDS: u32 = 1;
pub const TEXTURE_UNIT_INDEX_MAP: u32 = 2;
pub const TEXTURE_UNIT_BACKBUFFER: u32 = 3;

const AUDIO_SAMPLER: &str = "iChannel0";
const COORDS_SAMPLER: &str = "lxModelCoords";
const INDEX_SAMPLER: &str = "lxModelIndexMap";
const BACKBUFFER_SAMPLER: &str = "iBackbuffer";

/// Uniforms the engine supplies to every pattern, in block order.
const STANDARD_UNIFORMS: &[(&str, UniformKind)] = &[
    ("iTime", UniformKind::Float1),
    ("iColorRGB", UniformKind::Float3),
    ("iColorHSB", UniformKind::Float3),
    ("iColor2RGB", UniformKind::Float3),
    ("iColor2HSB", UniformKind::Float3),
    ("iPaletteOffset", UniformKind::Float1),
    ("iSpeed", UniformKind::Float1),
    ("iScale", UniformKind::Float1),
    ("iQuantity", UniformKind::Float1),
    ("iTranslate", UniformKind::Float2),
    ("iSpin", UniformKind::Float1),
    ("iRotationAngle", UniformKind::Float1),
    ("iBrightness", UniformKind::Float1),
    ("iWow1", UniformKind::Float1),
    ("iWow2", UniformKind::Float1),
    ("iWowTrigger", UniformKind::Bool1),
    ("levelReact", UniformKind::Float1),
    ("frequencyReact", UniformKind::Float1),
    ("iTwist", UniformKind::Float1),
];

/// Everything needed to build a [`Shader`], before any device work.
pub struct ShaderDescriptor {
    pub processed: ProcessedShader,
    /// When set, rendered frames are read back into per-point colors.
    pub cpu_readback: bool,
    /// Additional uniforms the hosting pattern will set itself.
    pub extra_uniforms: Vec<(String, UniformKind)>,
}

impl ShaderDescriptor {
    pub fn new(processed: ProcessedShader) -> Self {
        Self {
            processed,
            cpu_readback: true,
            extra_uniforms: Vec::new(),
        }
    }

    pub fn with_extra_uniform(mut self, name: &str, kind: UniformKind) -> Self {
        self.extra_uniforms.push((name.to_string(), kind));
        self
    }

    pub fn gpu_only(mut self) -> Self {
        self.cpu_readback = false;
        self
    }
}

struct ChannelBinding {
    channel: u8,
    path: PathBuf,
    unit: u32,
}

struct GpuState {
    pipeline: wgpu::RenderPipeline,
    uniforms: UniformStore,
    uniform_buffer: wgpu::Buffer,
    pattern_bind_group: wgpu::BindGroup,
    texture_layout: wgpu::BindGroupLayout,
    /// One bind group per ping-pong orientation; index matches the render
    /// slot so the copy slot is always bound as the backbuffer.
    texture_bind_groups: Option<[wgpu::BindGroup; 2]>,
    nearest: wgpu::Sampler,
    linear: wgpu::Sampler,
    target: RenderTarget,
    readback: Option<ReadbackRing>,
    channels: Vec<ChannelBinding>,
}

/// One shader program with its uniforms, textures, and render target.
///
/// Construction does no device work; GPU resources materialize on first
/// activation and survive deactivation so reactivating is cheap. `dispose`
/// releases texture cache references; wgpu resources go with the struct.
pub struct Shader {
    name: String,
    processed: ProcessedShader,
    controls: ControlSet,
    cpu_readback: bool,
    extra_uniforms: Vec<(String, UniformKind)>,
    model: Option<Arc<Model>>,
    state: Option<GpuState>,
    active: bool,
    seen_epoch: u64,
    bind_groups_stale: bool,
}

impl Shader {
    pub fn new(descriptor: ShaderDescriptor) -> Self {
        let mut controls = ControlSet::new();
        controls.apply(&descriptor.processed.directives);
        Self {
            name: descriptor.processed.name.clone(),
            processed: descriptor.processed,
            controls,
            cpu_readback: descriptor.cpu_readback,
            extra_uniforms: descriptor.extra_uniforms,
            model: None,
            state: None,
            active: false,
            seen_epoch: 0,
            bind_groups_stale: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn controls(&self) -> &ControlSet {
        &self.controls
    }

    pub fn controls_mut(&mut self) -> &mut ControlSet {
        &mut self.controls
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Points the shader at the model it renders. Must be called at least
    /// once before the first frame; call again if the pattern's view of the
    /// model changes.
    pub fn set_model(&mut self, model: &Arc<Model>) {
        let changed = self
            .model
            .as_ref()
            .map(|current| current.id() != model.id())
            .unwrap_or(true);
        if changed {
            self.model = Some(Arc::clone(model));
            self.bind_groups_stale = true;
        }
    }

    pub(crate) fn activate(&mut self, ctx: &mut ShaderContext) -> Result<()> {
        if self.state.is_none() {
            self.init(ctx)?;
        }
        if let Some(state) = self.state.as_mut() {
            // A reactivated shader must not feed back a stale frame.
            state.target.request_clear();
        }
        self.active = true;
        Ok(())
    }

    /// Temporary deactivation keeps all GPU resources for fast reactivation.
    pub(crate) fn deactivate(&mut self) {
        self.active = false;
    }

    /// Releases the cache references this shader holds. Must be called when
    /// the owning pattern is unloaded, not when it is merely deactivated.
    pub(crate) fn dispose(&mut self, cache: &mut TextureCache) -> Result<()> {
        self.active = false;
        if let Some(state) = self.state.take() {
            for binding in &state.channels {
                cache.release_static(&binding.path)?;
            }
        }
        Ok(())
    }

    fn init(&mut self, ctx: &mut ShaderContext) -> Result<()> {
        let mut uniforms = UniformStore::new();
        for (name, kind) in STANDARD_UNIFORMS {
            uniforms.declare(name, *kind)?;
        }
        for param in self.processed.custom_parameters() {
            let kind = match param.kind {
                CustomKind::Float { .. } => UniformKind::Float1,
                CustomKind::Bool { .. } => UniformKind::Bool1,
            };
            uniforms.declare(&param.name, kind)?;
        }
        for (name, kind) in &self.extra_uniforms {
            uniforms.declare(name, *kind)?;
        }

        let audio_unit = uniforms.texture_unit(AUDIO_SAMPLER)?;
        let coords_unit = uniforms.texture_unit(COORDS_SAMPLER)?;
        let index_unit = uniforms.texture_unit(INDEX_SAMPLER)?;
        let backbuffer_unit = uniforms.texture_unit(BACKBUFFER_SAMPLER)?;
        debug_assert_eq!(
            (audio_unit, coords_unit, index_unit, backbuffer_unit),
            (
                TEXTURE_UNIT_AUDIO,
                TEXTURE_UNIT_COORDS,
                TEXTURE_UNIT_INDEX_MAP,
                TEXTURE_UNIT_BACKBUFFER
            )
        );

        let mut channels = Vec::new();
        for (channel, path) in self.processed.channels() {
            let unit = uniforms.texture_unit(&format!("iChannel{channel}"))?;
            channels.push(ChannelBinding {
                channel,
                path: path.to_path_buf(),
                unit,
            });
        }

        uniforms.freeze_layout();
        let block_declaration = uniforms.block_declaration("PatternBlock", "pat", 1, 0);
        let samplers = uniforms.sampler_bindings();

        let fragment = compile::compile_fragment_shader(
            ctx.device,
            &self.processed.body,
            &block_declaration,
            &samplers,
            &self.name,
        )?;
        let vertex = compile::compile_vertex_shader(ctx.device)?;

        // Acquire channel textures after compilation so a failure at either
        // step leaves no dangling cache references.
        for (index, binding) in channels.iter().enumerate() {
            if let Err(error) = ctx
                .cache
                .acquire_static(ctx.device, ctx.queue, &binding.path)
            {
                for prior in &channels[..index] {
                    let _ = ctx.cache.release_static(&prior.path);
                }
                return Err(error.context(format!(
                    "shader {}: failed to load texture for channel {}",
                    self.name, binding.channel
                )));
            }
        }

        let sampler_count = (channels.len() as u32) + TEXTURE_UNIT_BACKBUFFER + 1;
        let mut layout_entries = Vec::with_capacity(sampler_count as usize * 2);
        for unit in 0..sampler_count {
            // Reserved units carry data textures sampled with nearest
            // filtering; image channels filter linearly.
            let filterable = unit > TEXTURE_UNIT_BACKBUFFER;
            layout_entries.push(wgpu::BindGroupLayoutEntry {
                binding: unit * 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            });
            layout_entries.push(wgpu::BindGroupLayoutEntry {
                binding: unit * 2 + 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(if filterable {
                    wgpu::SamplerBindingType::Filtering
                } else {
                    wgpu::SamplerBindingType::NonFiltering
                }),
                count: None,
            });
        }
        let texture_layout = ctx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(&format!("{} texture layout", self.name)),
                entries: &layout_entries,
            });

        let pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(&format!("{} pipeline layout", self.name)),
                bind_group_layouts: &[ctx.shared_layout, ctx.pattern_layout, &texture_layout],
                push_constant_ranges: &[],
            });

        let pipeline = ctx
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(&format!("{} pipeline", self.name)),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &vertex,
                    entry_point: Some("main"),
                    buffers: &[],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState {
                    count: 1,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                fragment: Some(wgpu::FragmentState {
                    module: &fragment,
                    entry_point: Some("main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: TARGET_FORMAT,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                multiview: None,
                cache: None,
            });

        let buffer_size = aligned_size(uniforms.block_size().max(16) as usize, ctx.ubo_alignment);
        let uniform_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{} uniform block", self.name)),
            size: buffer_size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let pattern_bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{} pattern bind group", self.name)),
            layout: ctx.pattern_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let (width, height) = ctx.canvas;
        let target = RenderTarget::new(ctx.device, width, height);
        let readback = (self.cpu_readback && ctx.cpu_mode)
            .then(|| ReadbackRing::new(ctx.device, width, height));
        let nearest = textures::nearest_sampler(ctx.device, "point sampler");
        let linear = textures::linear_sampler(ctx.device, "channel sampler");

        self.state = Some(GpuState {
            pipeline,
            uniforms,
            uniform_buffer,
            pattern_bind_group,
            texture_layout,
            texture_bind_groups: None,
            nearest,
            linear,
            target,
            readback,
            channels,
        });
        self.bind_groups_stale = true;
        self.seen_epoch = ctx.cache_epoch;
        tracing::debug!(shader = %self.name, "initialized GPU resources");
        Ok(())
    }

    fn rebuild_texture_bind_groups(&mut self, ctx: &mut ShaderContext) -> Result<()> {
        let model = self
            .model
            .as_ref()
            .with_context(|| format!("shader {} has no model; call set_model first", self.name))?;
        ctx.cache
            .ensure_model(ctx.device, ctx.queue, ctx.canvas, model)?;
        let (coords_view, index_view) = ctx.cache.model_views(model.id())?;

        let state = self
            .state
            .as_mut()
            .context("shader is not initialized")?;

        let mut groups = Vec::with_capacity(2);
        for orientation in 0..2 {
            let backbuffer_view = &state.target.slots.slots()[orientation ^ 1].view;
            let mut entries = vec![
                wgpu::BindGroupEntry {
                    binding: TEXTURE_UNIT_AUDIO * 2,
                    resource: wgpu::BindingResource::TextureView(ctx.audio_view),
                },
                wgpu::BindGroupEntry {
                    binding: TEXTURE_UNIT_AUDIO * 2 + 1,
                    resource: wgpu::BindingResource::Sampler(&state.nearest),
                },
                wgpu::BindGroupEntry {
                    binding: TEXTURE_UNIT_COORDS * 2,
                    resource: wgpu::BindingResource::TextureView(coords_view),
                },
                wgpu::BindGroupEntry {
                    binding: TEXTURE_UNIT_COORDS * 2 + 1,
                    resource: wgpu::BindingResource::Sampler(&state.nearest),
                },
                wgpu::BindGroupEntry {
                    binding: TEXTURE_UNIT_INDEX_MAP * 2,
                    resource: wgpu::BindingResource::TextureView(index_view),
                },
                wgpu::BindGroupEntry {
                    binding: TEXTURE_UNIT_INDEX_MAP * 2 + 1,
                    resource: wgpu::BindingResource::Sampler(&state.nearest),
                },
                wgpu::BindGroupEntry {
                    binding: TEXTURE_UNIT_BACKBUFFER * 2,
                    resource: wgpu::BindingResource::TextureView(backbuffer_view),
                },
                wgpu::BindGroupEntry {
                    binding: TEXTURE_UNIT_BACKBUFFER * 2 + 1,
                    resource: wgpu::BindingResource::Sampler(&state.nearest),
                },
            ];
            for binding in &state.channels {
                entries.push(wgpu::BindGroupEntry {
                    binding: binding.unit * 2,
                    resource: wgpu::BindingResource::TextureView(
                        ctx.cache.static_view(&binding.path)?,
                    ),
                });
                entries.push(wgpu::BindGroupEntry {
                    binding: binding.unit * 2 + 1,
                    resource: wgpu::BindingResource::Sampler(&state.linear),
                });
            }
            groups.push(ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("{} textures {orientation}", self.name)),
                layout: &state.texture_layout,
                entries: &entries,
            }));
        }
        let mut groups = groups.into_iter();
        match (groups.next(), groups.next()) {
            (Some(first), Some(second)) => {
                state.texture_bind_groups = Some([first, second]);
                Ok(())
            }
            _ => bail!("texture bind group construction produced too few groups"),
        }
    }

    /// Renders one frame. In CPU mode, `out` receives the previous frame's
    /// resolved per-point colors (lag-one readback); `hook` runs after the
    /// engine stages its uniforms so callers can override anything.
    pub(crate) fn run(
        &mut self,
        ctx: &mut ShaderContext,
        mut out: Option<&mut [u32]>,
        hook: Option<&mut dyn FnMut(&mut UniformStore) -> Result<()>>,
    ) -> Result<()> {
        if !self.active {
            bail!("shader {} is not active", self.name);
        }
        if self.state.is_none() {
            bail!("shader {} is not initialized", self.name);
        }

        if ctx.cache_epoch != self.seen_epoch {
            self.seen_epoch = ctx.cache_epoch;
            self.bind_groups_stale = true;
        }
        let needs_rebuild = self.bind_groups_stale
            || self
                .state
                .as_ref()
                .is_some_and(|state| state.texture_bind_groups.is_none());
        if needs_rebuild {
            self.rebuild_texture_bind_groups(ctx)?;
            self.bind_groups_stale = false;
        }

        self.controls.update(ctx.delta_s);

        let state = self.state.as_mut().context("shader is not initialized")?;
        stage_standard_uniforms(&self.controls, &mut state.uniforms, ctx)?;
        if let Some(hook) = hook {
            hook(&mut state.uniforms)?;
        }
        let writes = state.uniforms.flush(ctx.queue, &state.uniform_buffer);
        tracing::trace!(shader = %self.name, writes, "uniforms flushed");

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(&format!("{} frame", self.name)),
            });

        if state.target.take_clear_request() {
            for slot in state.target.slots.slots() {
                let _clear_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("backbuffer clear"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &slot.view,
                        depth_slice: None,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    occlusion_query_set: None,
                    timestamp_writes: None,
                });
            }
            if let Some(readback) = state.readback.as_mut() {
                readback.reset();
            }
        }

        {
            let bind_groups = state
                .texture_bind_groups
                .as_ref()
                .context("texture bind groups missing")?;
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("pattern pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &state.target.slots.render().view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(&state.pipeline);
            pass.set_bind_group(0, ctx.shared_bind_group, &[]);
            pass.set_bind_group(1, &state.pattern_bind_group, &[]);
            pass.set_bind_group(2, &bind_groups[state.target.slots.render_index()], &[]);
            pass.draw(0..6, 0..1);
        }

        if let Some(readback) = state.readback.as_mut() {
            let padded_bytes_per_row = readback.padded_bytes_per_row;
            let buffer = readback.prepare_copy();
            encoder.copy_texture_to_buffer(
                wgpu::TexelCopyTextureInfo {
                    texture: &state.target.slots.render().texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                wgpu::TexelCopyBufferInfo {
                    buffer,
                    layout: wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(padded_bytes_per_row),
                        rows_per_image: Some(state.target.height),
                    },
                },
                wgpu::Extent3d {
                    width: state.target.width,
                    height: state.target.height,
                    depth_or_array_layers: 1,
                },
            );
        }

        ctx.queue.submit(std::iter::once(encoder.finish()));

        if let Some(readback) = state.readback.as_mut() {
            readback.begin_read();
            let _ = ctx.device.poll(wgpu::PollType::Poll);
            if let Some(out) = out.as_deref_mut() {
                if !readback.consume(out) {
                    tracing::trace!(shader = %self.name, "readback pending; frame skipped");
                }
            }
            readback.swap();
        }

        state.target.slots.swap();
        Ok(())
    }
}

fn stage_standard_uniforms(
    controls: &ControlSet,
    uniforms: &mut UniformStore,
    ctx: &ShaderContext,
) -> Result<()> {
    let value = |tag: ControlTag| controls.value(tag) as f32;

    uniforms.set_float("iTime", ctx.time_s as f32)?;
    uniforms.set_vec3("iColorRGB", ctx.colors.primary)?;
    uniforms.set_vec3("iColorHSB", rgb_to_hsb(ctx.colors.primary))?;
    uniforms.set_vec3("iColor2RGB", ctx.colors.secondary)?;
    uniforms.set_vec3("iColor2HSB", rgb_to_hsb(ctx.colors.secondary))?;
    uniforms.set_float("iPaletteOffset", ctx.colors.palette_offset)?;
    uniforms.set_float("iSpeed", value(ControlTag::Speed))?;
    uniforms.set_float("iScale", value(ControlTag::Size))?;
    uniforms.set_float("iQuantity", value(ControlTag::Quantity))?;
    uniforms.set_vec2("iTranslate", controls.translate())?;
    uniforms.set_float("iSpin", value(ControlTag::Spin))?;
    uniforms.set_float("iRotationAngle", value(ControlTag::Angle))?;
    uniforms.set_float("iBrightness", value(ControlTag::Brightness))?;
    uniforms.set_float("iWow1", value(ControlTag::Wow1))?;
    uniforms.set_float("iWow2", value(ControlTag::Wow2))?;
    uniforms.set_bool("iWowTrigger", controls.value(ControlTag::WowTrigger) >= 0.5)?;
    uniforms.set_float("levelReact", value(ControlTag::LevelReactivity))?;
    uniforms.set_float("frequencyReact", value(ControlTag::FreqReactivity))?;
    uniforms.set_float("iTwist", value(ControlTag::Twist))?;

    for custom in controls.customs() {
        match custom.kind {
            CustomKind::Float { .. } => uniforms.set_float(&custom.name, custom.value as f32)?,
            CustomKind::Bool { .. } => uniforms.set_bool(&custom.name, custom.value >= 0.5)?,
        }
    }
    Ok(())
}

/// RGB (0..1) to hue/saturation/brightness, all 0..1.
fn rgb_to_hsb([r, g, b]: [f32; 3]) -> [f32; 3] {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    let hue = if delta == 0.0 {
        0.0
    } else if max == r {
        (((g - b) / delta).rem_euclid(6.0)) / 6.0
    } else if max == g {
        ((b - r) / delta + 2.0) / 6.0
    } else {
        ((r - g) / delta + 4.0) / 6.0
    };
    let saturation = if max == 0.0 { 0.0 } else { delta / max };
    [hue, saturation, max]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_to_hsb_primaries() {
        assert_eq!(rgb_to_hsb([0.0, 0.0, 0.0]), [0.0, 0.0, 0.0]);
        assert_eq!(rgb_to_hsb([1.0, 1.0, 1.0]), [0.0, 0.0, 1.0]);
        let [h, s, v] = rgb_to_hsb([1.0, 0.0, 0.0]);
        assert_eq!((h, s, v), (0.0, 1.0, 1.0));
        let [h, _, _] = rgb_to_hsb([0.0, 1.0, 0.0]);
        assert!((h - 1.0 / 3.0).abs() < 1e-6);
        let [h, _, _] = rgb_to_hsb([0.0, 0.0, 1.0]);
        assert!((h - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn standard_uniforms_cover_the_reserved_names() {
        let names: Vec<&str> = STANDARD_UNIFORMS.iter().map(|(name, _)| *name).collect();
        for expected in [
            "iTime",
            "iColorRGB",
            "iColorHSB",
            "iColor2RGB",
            "iColor2HSB",
            "iPaletteOffset",
            "iSpeed",
            "iScale",
            "iQuantity",
            "iTranslate",
            "iSpin",
            "iRotationAngle",
            "iBrightness",
            "iWow1",
            "iWow2",
            "iWowTrigger",
            "levelReact",
            "frequencyReact",
        ] {
            assert!(names.contains(&expected), "missing {expected}");
        }
    }
}
