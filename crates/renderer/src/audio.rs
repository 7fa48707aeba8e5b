use bytemuck::cast_slice;

pub const AUDIO_TEXTURE_WIDTH: u32 = 512;
pub const AUDIO_TEXTURE_HEIGHT: u32 = 2;

/// Floor applied to instantaneous levels so ratios stay finite in silence.
const AUDIO_LEVEL_MIN: f64 = 0.01;

/// One analysis frame handed off from the audio thread. The engine drains
/// the channel to the most recent frame at the start of each tick; shaders
/// never observe a frame mid-update.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// FFT band magnitudes, normalized 0..1. Any band count is accepted and
    /// resampled to the texture width.
    pub bands: Vec<f32>,
    /// Waveform samples, -1..1.
    pub waveform: Vec<f32>,
    /// Stem levels: bass, drums, vocals, other.
    pub stems: [f32; 4],
}

impl Default for AudioFrame {
    fn default() -> Self {
        Self {
            bands: vec![0.0; 16],
            waveform: vec![0.0; AUDIO_TEXTURE_WIDTH as usize],
            stems: [0.0; 4],
        }
    }
}

/// Exponential moving average with frame-rate compensation: a given alpha
/// describes the smoothing per `period_ms`, and `update` scales it to the
/// actual elapsed time so the baseline is stable at any tick rate.
#[derive(Debug, Clone)]
pub struct Ema {
    value: f64,
    alpha: f64,
    period_ms: f64,
    primed: bool,
}

impl Ema {
    pub fn new(alpha: f64, period_ms: f64) -> Self {
        Self {
            value: 0.0,
            alpha: alpha.clamp(0.0, 1.0),
            period_ms: period_ms.max(f64::EPSILON),
            primed: false,
        }
    }

    pub fn update(&mut self, sample: f64, delta_ms: f64) -> f64 {
        if !self.primed {
            self.primed = true;
            self.value = sample;
            return self.value;
        }
        let weight = 1.0 - (1.0 - self.alpha).powf(delta_ms.max(0.0) / self.period_ms);
        self.value += weight * (sample - self.value);
        self.value
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

/// Per-frame audio state: instantaneous band levels, slow EMA baselines,
/// and the current-to-baseline ratios shaders actually consume. Ratios make
/// patterns react to loudness change rather than absolute level.
pub struct AudioAnalysis {
    avg_volume: Ema,
    avg_bass: Ema,
    avg_treble: Ema,
    frame: AudioFrame,
    volume: f64,
    bass_level: f64,
    treble_level: f64,
    volume_ratio: f64,
    bass_ratio: f64,
    treble_ratio: f64,
    texture_data: Vec<f32>,
}

impl AudioAnalysis {
    pub fn new() -> Self {
        Self {
            avg_volume: Ema::new(0.5, 10.0),
            avg_bass: Ema::new(0.2, 10.0),
            avg_treble: Ema::new(0.2, 10.0),
            frame: AudioFrame::default(),
            volume: AUDIO_LEVEL_MIN,
            bass_level: AUDIO_LEVEL_MIN,
            treble_level: AUDIO_LEVEL_MIN,
            volume_ratio: 1.0,
            bass_ratio: 1.0,
            treble_ratio: 1.0,
            texture_data: vec![0.0; (AUDIO_TEXTURE_WIDTH * AUDIO_TEXTURE_HEIGHT) as usize],
        }
    }

    /// Replaces the current analysis frame. Called with the newest frame
    /// drained from the producer channel.
    pub fn ingest(&mut self, frame: AudioFrame) {
        self.frame = frame;
    }

    /// Recomputes levels, baselines, ratios, and the texture staging rows.
    /// Called exactly once per engine tick.
    pub fn update(&mut self, delta_ms: f64) {
        let bands = &self.frame.bands;
        let n = bands.len();

        self.volume = mean(bands.iter().copied()).max(AUDIO_LEVEL_MIN);
        let bass_bands = (n / 8).max(1).min(n.max(1));
        self.bass_level = mean(bands.iter().copied().take(bass_bands)).max(AUDIO_LEVEL_MIN);
        self.treble_level = mean(bands.iter().copied().skip(n / 2)).max(AUDIO_LEVEL_MIN);

        self.volume_ratio = self.volume / self.avg_volume.update(self.volume, delta_ms);
        self.bass_ratio = self.bass_level / self.avg_bass.update(self.bass_level, delta_ms);
        self.treble_ratio = self.treble_level / self.avg_treble.update(self.treble_level, delta_ms);

        self.refresh_texture_rows();
    }

    // FFT data in the first row, waveform in the second, both resampled
    // (nearest, no interpolation) to the texture width.
    fn refresh_texture_rows(&mut self) {
        let width = AUDIO_TEXTURE_WIDTH as usize;
        let bands = &self.frame.bands;
        let waveform = &self.frame.waveform;
        for x in 0..width {
            self.texture_data[x] = if bands.is_empty() {
                0.0
            } else {
                bands[x * bands.len() / width]
            };
            self.texture_data[width + x] = if waveform.is_empty() {
                0.0
            } else {
                waveform[x * waveform.len() / width]
            };
        }
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn bass_level(&self) -> f64 {
        self.bass_level
    }

    pub fn treble_level(&self) -> f64 {
        self.treble_level
    }

    pub fn volume_ratio(&self) -> f64 {
        self.volume_ratio
    }

    pub fn bass_ratio(&self) -> f64 {
        self.bass_ratio
    }

    pub fn treble_ratio(&self) -> f64 {
        self.treble_ratio
    }

    pub fn stems(&self) -> [f32; 4] {
        self.frame.stems
    }

    pub(crate) fn texture_data(&self) -> &[f32] {
        &self.texture_data
    }
}

impl Default for AudioAnalysis {
    fn default() -> Self {
        Self::new()
    }
}

fn mean(values: impl Iterator<Item = f32>) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for value in values {
        sum += value as f64;
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// The shared audio texture: 512x2 R32F, FFT row then waveform row.
/// Nearest-filtered and edge-clamped; bound to every shader's unit 0.
pub(crate) struct AudioTexture {
    texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl AudioTexture {
    pub(crate) fn new(device: &wgpu::Device) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("audio texture"),
            size: wgpu::Extent3d {
                width: AUDIO_TEXTURE_WIDTH,
                height: AUDIO_TEXTURE_HEIGHT,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R32Float,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    pub(crate) fn upload(&self, queue: &wgpu::Queue, data: &[f32]) {
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            cast_slice(data),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(AUDIO_TEXTURE_WIDTH * 4),
                rows_per_image: Some(AUDIO_TEXTURE_HEIGHT),
            },
            wgpu::Extent3d {
                width: AUDIO_TEXTURE_WIDTH,
                height: AUDIO_TEXTURE_HEIGHT,
                depth_or_array_layers: 1,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_converges_to_constant_input() {
        let mut ema = Ema::new(0.5, 10.0);
        for _ in 0..200 {
            ema.update(2.0, 10.0);
        }
        assert!((ema.value() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn ema_is_frame_rate_compensated() {
        // One 20ms step should move as far as two 10ms steps.
        let mut coarse = Ema::new(0.5, 10.0);
        coarse.update(0.0, 10.0);
        coarse.update(1.0, 20.0);

        let mut fine = Ema::new(0.5, 10.0);
        fine.update(0.0, 10.0);
        fine.update(1.0, 10.0);
        fine.update(1.0, 10.0);

        assert!((coarse.value() - fine.value()).abs() < 1e-9);
    }

    #[test]
    fn ratio_spikes_on_level_step_then_decays() {
        let mut analysis = AudioAnalysis::new();
        let mut quiet = AudioFrame::default();
        quiet.bands = vec![0.1; 16];
        analysis.ingest(quiet);
        for _ in 0..100 {
            analysis.update(10.0);
        }
        assert!((analysis.volume_ratio() - 1.0).abs() < 1e-3);

        let mut loud = AudioFrame::default();
        loud.bands = vec![0.8; 16];
        analysis.ingest(loud);
        analysis.update(10.0);
        let spike = analysis.volume_ratio();
        assert!(spike > 1.1, "ratio should spike on a step, got {spike}");

        for _ in 0..200 {
            analysis.update(10.0);
        }
        assert!((analysis.volume_ratio() - 1.0).abs() < 1e-2);
    }

    #[test]
    fn texture_rows_resample_band_counts() {
        let mut analysis = AudioAnalysis::new();
        let mut frame = AudioFrame::default();
        frame.bands = vec![0.25; 16];
        frame.waveform = vec![0.5; 1024];
        analysis.ingest(frame);
        analysis.update(10.0);
        let data = analysis.texture_data();
        assert_eq!(data.len(), 1024);
        assert!(data[..512].iter().all(|&v| (v - 0.25).abs() < 1e-6));
        assert!(data[512..].iter().all(|&v| (v - 0.5).abs() < 1e-6));
    }

    #[test]
    fn silence_keeps_levels_floored() {
        let mut analysis = AudioAnalysis::new();
        analysis.ingest(AudioFrame {
            bands: vec![0.0; 16],
            waveform: vec![0.0; 512],
            stems: [0.0; 4],
        });
        analysis.update(10.0);
        assert!(analysis.volume() >= 0.01);
        assert!(analysis.bass_level() >= 0.01);
        assert!(analysis.volume_ratio().is_finite());
    }
}
