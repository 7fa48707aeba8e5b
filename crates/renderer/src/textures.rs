use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use bytemuck::cast_slice;
use image::imageops::flip_vertical_in_place;
use image::GenericImageView;

use crate::model::{Model, ModelId};

/// Reference-counted cache of the (relatively) static textures shaders
/// sample: image files requested by name, and model-derived coordinate and
/// index-map textures keyed by model identity.
///
/// All operations happen on the rendering thread; entries outlive any single
/// shader, which holds only the lookup key.
#[derive(Default)]
pub struct TextureCache {
    statics: HashMap<PathBuf, StaticEntry>,
    models: HashMap<ModelId, ModelEntry>,
}

struct StaticEntry {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    refs: usize,
}

/// The two textures derived from one model: per-pixel normalized
/// coordinates, and the dilated point-index map.
pub(crate) struct ModelEntry {
    _coords: wgpu::Texture,
    _index_map: wgpu::Texture,
    pub coords_view: wgpu::TextureView,
    pub index_view: wgpu::TextureView,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a static texture on first request; later requests share the
    /// entry and bump its reference count. A failed image load is an error
    /// that aborts construction of the requesting shader.
    pub fn acquire_static(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        path: &Path,
    ) -> Result<()> {
        if let Some(entry) = self.statics.get_mut(path) {
            entry.refs += 1;
            return Ok(());
        }
        let entry = load_static_texture(device, queue, path)?;
        self.statics.insert(path.to_path_buf(), entry);
        Ok(())
    }

    /// Releases one reference; the device texture is destroyed at zero.
    /// Releasing an unknown name or releasing more times than acquired is a
    /// lifecycle bug and fails loudly.
    pub fn release_static(&mut self, path: &Path) -> Result<()> {
        let Some(entry) = self.statics.get_mut(path) else {
            bail!(
                "attempted to release texture that was never acquired: {}",
                path.display()
            );
        };
        entry.refs -= 1;
        if entry.refs == 0 {
            self.statics.remove(path);
        }
        Ok(())
    }

    pub(crate) fn static_view(&self, path: &Path) -> Result<&wgpu::TextureView> {
        self.statics
            .get(path)
            .map(|entry| &entry.view)
            .with_context(|| format!("texture {} is not resident", path.display()))
    }

    pub fn static_refs(&self, path: &Path) -> Option<usize> {
        self.statics.get(path).map(|entry| entry.refs)
    }

    pub fn static_count(&self) -> usize {
        self.statics.len()
    }

    /// Ensures both model textures exist for `model`, creating them on the
    /// first request after startup or after a generation change.
    pub fn ensure_model(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        canvas: (u32, u32),
        model: &Model,
    ) -> Result<()> {
        match self.models.entry(model.id()) {
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(slot) => {
                slot.insert(build_model_entry(device, queue, canvas, model));
                Ok(())
            }
        }
    }

    pub(crate) fn model_views(
        &self,
        id: ModelId,
    ) -> Result<(&wgpu::TextureView, &wgpu::TextureView)> {
        let entry = self
            .models
            .get(&id)
            .context("model textures are not resident")?;
        Ok((&entry.coords_view, &entry.index_view))
    }

    pub fn contains_model(&self, id: ModelId) -> bool {
        self.models.contains_key(&id)
    }

    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    /// The points moved: every cached model texture is stale. Discards all
    /// entries unconditionally; there is no partial invalidation.
    pub fn clear_model_textures(&mut self) {
        let dropped = self.models.len();
        self.models.clear();
        tracing::debug!(dropped, "discarded model textures after generation change");
    }
}

fn load_static_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    path: &Path,
) -> Result<StaticEntry> {
    let image = image::open(path)
        .with_context(|| format!("failed to open texture at {}", path.display()))?;
    let (width, height) = image.dimensions();
    let mut rgba = image.to_rgba8();
    flip_vertical_in_place(&mut rgba);

    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(&format!("static texture {}", path.display())),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &rgba,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(width * 4),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    Ok(StaticEntry {
        _texture: texture,
        view,
        refs: 1,
    })
}

fn build_model_entry(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    canvas: (u32, u32),
    model: &Model,
) -> ModelEntry {
    let (width, height) = canvas;
    let pixels = (width * height) as usize;
    if model.len() > pixels {
        tracing::error!(
            canvas_points = pixels,
            model_points = model.len(),
            "canvas too small for the model; points beyond capacity will not render"
        );
    }

    let coords_data = coords_texture_data(model, pixels);
    let coords = create_model_texture(
        device,
        "model coordinates",
        width,
        height,
        wgpu::TextureFormat::Rgba32Float,
    );
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &coords,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        cast_slice(&coords_data),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(width * 16),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );

    let index_data = index_texture_data(model, width, height);
    let index_map = create_model_texture(
        device,
        "model index map",
        width,
        height,
        wgpu::TextureFormat::Rg32Float,
    );
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &index_map,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        cast_slice(&index_data),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(width * 8),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );

    let coords_view = coords.create_view(&wgpu::TextureViewDescriptor::default());
    let index_view = index_map.create_view(&wgpu::TextureViewDescriptor::default());
    ModelEntry {
        _coords: coords,
        _index_map: index_map,
        coords_view,
        index_view,
    }
}

fn create_model_texture(
    device: &wgpu::Device,
    label: &str,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    })
}

/// Texel i holds point i's normalized coordinates; texels with no point
/// stay NaN so shaders can tell "no LED here" from a real position.
fn coords_texture_data(model: &Model, pixels: usize) -> Vec<f32> {
    let mut data = vec![f32::NAN; pixels * 4];
    for point in model.points() {
        let base = point.index as usize * 4;
        if base + 3 >= data.len() {
            continue;
        }
        data[base] = point.xn;
        data[base + 1] = point.yn;
        data[base + 2] = point.zn;
        data[base + 3] = 1.0;
    }
    data
}

/// Point indices written into a 5x5 neighborhood around each point's texel
/// to tolerate shader-side sampling and rounding error. The index is stored
/// as 2D texture coordinates (index % width, index / width).
fn index_texture_data(model: &Model, width: u32, height: u32) -> Vec<f32> {
    let mut data = vec![f32::NAN; (width * height * 2) as usize];
    for point in model.points() {
        let px = (point.xn * (width - 1) as f32).round() as i64;
        let py = (point.yn * (height - 1) as f32).round() as i64;
        let val1 = (point.index % width) as f32;
        let val2 = (point.index / width) as f32;
        for ny in py - 2..=py + 2 {
            for nx in px - 2..=px + 2 {
                if nx >= 0 && nx < width as i64 && ny >= 0 && ny < height as i64 {
                    let dest = ((ny as u32 * width + nx as u32) * 2) as usize;
                    data[dest] = val1;
                    data[dest + 1] = val2;
                }
            }
        }
    }
    data
}

/// Sampler for model and backbuffer textures: nearest-neighbor with edge
/// clamping. Linear filtering would blend unrelated point coordinates.
pub(crate) fn nearest_sampler(device: &wgpu::Device, label: &str) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Nearest,
        min_filter: wgpu::FilterMode::Nearest,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

/// Sampler for image channel textures.
pub(crate) fn linear_sampler(device: &wgpu::Device, label: &str) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelPoint;

    #[test]
    fn coords_data_marks_missing_points_nan() {
        let model = Model::new(vec![ModelPoint {
            index: 1,
            xn: 0.5,
            yn: 0.5,
            zn: 0.0,
        }]);
        let data = coords_texture_data(&model, 4);
        assert!(data[0].is_nan());
        assert_eq!(&data[4..8], &[0.5, 0.5, 0.0, 1.0]);
        assert!(data[8].is_nan());
    }

    #[test]
    fn index_data_dilates_a_5x5_neighborhood() {
        let model = Model::new(vec![ModelPoint {
            index: 0,
            xn: 0.5,
            yn: 0.5,
            zn: 0.0,
        }]);
        let width = 9;
        let height = 9;
        let data = index_texture_data(&model, width, height);
        // Center texel is (4, 4); the written square spans (2..=6, 2..=6).
        let written = |x: u32, y: u32| !data[((y * width + x) * 2) as usize].is_nan();
        assert!(written(4, 4));
        assert!(written(2, 2));
        assert!(written(6, 6));
        assert!(!written(1, 4));
        assert!(!written(4, 7));
    }

    #[test]
    fn index_dilation_clamps_at_texture_edges() {
        let model = Model::new(vec![ModelPoint {
            index: 0,
            xn: 0.0,
            yn: 0.0,
            zn: 0.0,
        }]);
        // Must not panic writing outside the 4x4 texture.
        let data = index_texture_data(&model, 4, 4);
        assert!(!data[0].is_nan());
    }

    #[test]
    fn index_values_encode_2d_position() {
        let model = Model::new(vec![ModelPoint {
            index: 7,
            xn: 1.0,
            yn: 1.0,
            zn: 0.0,
        }]);
        let width = 4;
        let data = index_texture_data(&model, width, 4);
        let dest = ((3 * width + 3) * 2) as usize;
        assert_eq!(data[dest], (7 % width) as f32);
        assert_eq!(data[dest + 1], (7 / width) as f32);
    }
}
