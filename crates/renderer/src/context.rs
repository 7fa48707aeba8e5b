use anyhow::{Context as AnyhowContext, Result};

/// Offscreen GPU context: one device and queue, no presentation surface.
///
/// The whole engine runs on the single thread that owns this context; every
/// device mutation flows through `queue`, which is the only ordering the
/// backend needs.
pub(crate) struct GpuContext {
    pub _instance: wgpu::Instance,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    /// Canvas size in pixels. One pixel maps to at most one model point.
    pub width: u32,
    pub height: u32,
    /// Device minimum for uniform buffer sizes/offsets. Undersized blocks
    /// are undefined behavior on some drivers, not a clean error.
    pub uniform_alignment: u32,
}

impl GpuContext {
    pub(crate) fn new(width: u32, height: u32) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
            backend_options: wgpu::BackendOptions::default(),
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .context("failed to find a suitable GPU adapter")?;

        let adapter_info = adapter.get_info();
        let limits = adapter.limits();
        tracing::debug!(
            name = %adapter_info.name,
            backend = ?adapter_info.backend,
            device_type = ?adapter_info.device_type,
            "selected GPU adapter"
        );

        let max_dimension = limits.max_texture_dimension_2d;
        if width > max_dimension || height > max_dimension {
            anyhow::bail!(
                "GPU max texture dimension is {max_dimension}, requested canvas is {width}x{height}"
            );
        }

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("pointshader device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits.clone(),
            memory_hints: wgpu::MemoryHints::MemoryUsage,
            trace: wgpu::Trace::default(),
        }))
        .context("failed to create GPU device")?;

        let uniform_alignment = limits.min_uniform_buffer_offset_alignment;

        Ok(Self {
            _instance: instance,
            device,
            queue,
            width: width.max(1),
            height: height.max(1),
            uniform_alignment,
        })
    }

    pub(crate) fn canvas(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
