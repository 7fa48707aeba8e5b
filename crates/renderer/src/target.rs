use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Two slots with "render" and "copy" roles that swap every frame. Swapping
/// relabels, never copies, so feedback access to the previous frame is O(1).
#[derive(Debug)]
pub(crate) struct PingPong<T> {
    slots: [T; 2],
    render: usize,
}

impl<T> PingPong<T> {
    pub fn new(a: T, b: T) -> Self {
        Self {
            slots: [a, b],
            render: 0,
        }
    }

    pub fn swap(&mut self) {
        self.render ^= 1;
    }

    /// Current write target.
    pub fn render(&self) -> &T {
        &self.slots[self.render]
    }

    /// Previous frame, exposed as the backbuffer.
    pub fn copy(&self) -> &T {
        &self.slots[self.render ^ 1]
    }

    pub fn render_mut(&mut self) -> &mut T {
        &mut self.slots[self.render]
    }

    pub fn copy_mut(&mut self) -> &mut T {
        &mut self.slots[self.render ^ 1]
    }

    pub fn render_index(&self) -> usize {
        self.render
    }

    pub fn slots(&self) -> &[T; 2] {
        &self.slots
    }
}

pub(crate) struct TargetSlot {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

/// A shader's offscreen double buffer: two BGRA color attachments whose
/// roles swap after every draw.
pub(crate) struct RenderTarget {
    pub slots: PingPong<TargetSlot>,
    needs_clear: bool,
    pub width: u32,
    pub height: u32,
}

pub(crate) const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Bgra8Unorm;

impl RenderTarget {
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let make_slot = |index: usize| {
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some(&format!("render target slot {index}")),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: TARGET_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_SRC,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            TargetSlot { texture, view }
        };
        Self {
            slots: PingPong::new(make_slot(0), make_slot(1)),
            // Fresh targets have undefined contents; clear before first use.
            needs_clear: true,
            width,
            height,
        }
    }

    /// Marks both slots for clearing before the next draw, so a freshly
    /// (re)activated shader never reads stale feedback.
    pub fn request_clear(&mut self) {
        self.needs_clear = true;
    }

    pub fn take_clear_request(&mut self) -> bool {
        std::mem::take(&mut self.needs_clear)
    }
}

// Map state for one readback buffer, shared with the map_async callback.
const MAP_IDLE: u8 = 0;
const MAP_PENDING: u8 = 1;
const MAP_READY: u8 = 2;
const MAP_FAILED: u8 = 3;

struct ReadbackSlot {
    buffer: wgpu::Buffer,
    state: Arc<AtomicU8>,
}

impl ReadbackSlot {
    fn new(device: &wgpu::Device, index: usize, size: u64) -> Self {
        Self {
            buffer: device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&format!("readback buffer {index}")),
                size,
                usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                mapped_at_creation: false,
            }),
            state: Arc::new(AtomicU8::new(MAP_IDLE)),
        }
    }

    fn reset(&mut self) {
        match self.state.load(Ordering::Acquire) {
            MAP_IDLE => {}
            // A failed map left the buffer unmapped already.
            MAP_FAILED => self.state.store(MAP_IDLE, Ordering::Release),
            _ => {
                self.buffer.unmap();
                // A cancelled map_async may still fire its callback; detach
                // it so it cannot clobber the state of a later mapping.
                self.state = Arc::new(AtomicU8::new(MAP_IDLE));
            }
        }
    }
}

/// Asynchronous GPU-to-host readback, deliberately lagging one frame.
///
/// Each frame copies the rendered texture into the current "render" buffer
/// and requests its mapping, then consumes the *other* buffer, whose mapping
/// has had a full frame to resolve. The first frame after a reset has no
/// prior content and is skipped explicitly rather than read as garbage; a
/// mapping that has not resolved yet also counts as a skipped frame, never a
/// stall.
pub(crate) struct ReadbackRing {
    slots: PingPong<ReadbackSlot>,
    pub padded_bytes_per_row: u32,
    width: u32,
    height: u32,
}

impl ReadbackRing {
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let unpadded = width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_bytes_per_row = unpadded.div_ceil(align) * align;
        let size = (padded_bytes_per_row * height) as u64;
        Self {
            slots: PingPong::new(
                ReadbackSlot::new(device, 0, size),
                ReadbackSlot::new(device, 1, size),
            ),
            padded_bytes_per_row,
            width,
            height,
        }
    }

    /// Buffer the current frame should be copied into. Cancels a stale
    /// mapping left behind when nobody consumed this slot last time around
    /// (no output was requested); a mapped buffer must not be a copy
    /// destination.
    pub fn prepare_copy(&mut self) -> &wgpu::Buffer {
        let slot = self.slots.render_mut();
        if slot.state.load(Ordering::Acquire) != MAP_IDLE {
            slot.reset();
        }
        &slot.buffer
    }

    /// Requests the async map of the just-copied buffer. Call after the
    /// frame's commands are submitted.
    pub fn begin_read(&mut self) {
        let slot = self.slots.render_mut();
        debug_assert_eq!(slot.state.load(Ordering::Acquire), MAP_IDLE);
        slot.state.store(MAP_PENDING, Ordering::Release);
        let state = Arc::clone(&slot.state);
        slot.buffer.slice(..).map_async(wgpu::MapMode::Read, move |result| {
            let next = if result.is_ok() { MAP_READY } else { MAP_FAILED };
            state.store(next, Ordering::Release);
        });
    }

    /// Consumes the previous frame's buffer into `out` as packed BGRA
    /// colors, one `u32` per point. Returns false when there was nothing to
    /// consume (first frame, mapping still in flight, or a failed map).
    pub fn consume(&mut self, out: &mut [u32]) -> bool {
        let width = self.width;
        let height = self.height;
        let padded = self.padded_bytes_per_row;
        let slot = self.slots.copy_mut();
        match slot.state.load(Ordering::Acquire) {
            MAP_IDLE | MAP_PENDING => false,
            MAP_FAILED => {
                tracing::warn!("readback map failed; dropping frame");
                slot.state.store(MAP_IDLE, Ordering::Release);
                false
            }
            _ => {
                {
                    let data = slot.buffer.slice(..).get_mapped_range();
                    let mut written = 0usize;
                    'rows: for row in 0..height {
                        let start = (row * padded) as usize;
                        let row_bytes = &data[start..start + (width * 4) as usize];
                        for pixel in row_bytes.chunks_exact(4) {
                            if written >= out.len() {
                                break 'rows;
                            }
                            out[written] =
                                u32::from_le_bytes([pixel[0], pixel[1], pixel[2], pixel[3]]);
                            written += 1;
                        }
                    }
                }
                slot.buffer.unmap();
                slot.state.store(MAP_IDLE, Ordering::Release);
                true
            }
        }
    }

    pub fn swap(&mut self) {
        self.slots.swap();
    }

    /// Cancels in-flight maps and forgets stale contents. Used when the
    /// owning shader is reactivated or its backbuffer cleared.
    pub fn reset(&mut self) {
        self.slots.render_mut().reset();
        self.slots.copy_mut().reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_swap_by_relabeling() {
        let mut pp = PingPong::new('a', 'b');
        assert_eq!(*pp.render(), 'a');
        assert_eq!(*pp.copy(), 'b');
        pp.swap();
        assert_eq!(*pp.render(), 'b');
        assert_eq!(*pp.copy(), 'a');
    }

    #[test]
    fn even_frame_counts_restore_the_original_role() {
        let mut pp = PingPong::new(0, 1);
        let initial = pp.render_index();
        for frame in 1..=8 {
            pp.swap();
            if frame % 2 == 0 {
                assert_eq!(pp.render_index(), initial);
            } else {
                assert_ne!(pp.render_index(), initial);
            }
        }
    }
}
