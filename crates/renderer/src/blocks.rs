use bytemuck::{Pod, Zeroable};

/// Fixed capacity of the palette slot in the per-frame block. The shader
/// declaration reserves this many vec4 entries regardless of how many colors
/// the active palette actually holds.
pub const MAX_PALETTE_COLORS: usize = 5;

/// Per-run shared uniforms: written once at engine startup.
///
/// The field order must match the `PerRunBlock` declaration in
/// `compile::SHARED_HEADER` exactly; `PER_RUN_FIELDS` is the checked
/// description of that layout.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(crate) struct PerRunBlock {
    pub resolution: [f32; 2],
    pub _pad: [f32; 2],
}

impl PerRunBlock {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            resolution: [width as f32, height as f32],
            _pad: [0.0; 2],
        }
    }
}

/// Per-frame shared uniforms: rewritten and re-uploaded on every tick,
/// before any shader runs.
///
/// Field order must match the `PerFrameBlock` declaration in
/// `compile::SHARED_HEADER` exactly. The twelve leading scalars pack
/// tightly under std140; the vec4 palette array lands at offset 48, which
/// is 16-aligned with no implicit padding, so the repr(C) struct needs none
/// either. `PER_FRAME_FIELDS` is the checked description of this layout.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(crate) struct PerFrameBlock {
    pub beat: f32,
    pub sin_phase_beat: f32,
    pub bass_level: f32,
    pub treble_level: f32,
    pub bass_ratio: f32,
    pub treble_ratio: f32,
    pub volume_ratio: f32,
    pub stem_bass: f32,
    pub stem_drums: f32,
    pub stem_vocals: f32,
    pub stem_other: f32,
    pub palette_size: f32,
    pub palette: [[f32; 4]; MAX_PALETTE_COLORS],
}

impl PerFrameBlock {
    pub fn set_palette(&mut self, colors: &[[f32; 3]]) {
        let count = colors.len().min(MAX_PALETTE_COLORS);
        self.palette_size = count as f32;
        for (slot, color) in self.palette.iter_mut().zip(colors.iter().take(count)) {
            *slot = [color[0], color[1], color[2], 1.0];
        }
    }
}

/// std140 member classes used by the shared blocks.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Std140Field {
    Float,
    Vec2,
    Vec4Array(usize),
}

impl Std140Field {
    fn align(&self) -> usize {
        match self {
            Std140Field::Float => 4,
            Std140Field::Vec2 => 8,
            Std140Field::Vec4Array(_) => 16,
        }
    }

    fn size(&self) -> usize {
        match self {
            Std140Field::Float => 4,
            Std140Field::Vec2 => 8,
            Std140Field::Vec4Array(len) => 16 * len,
        }
    }
}

pub(crate) const PER_RUN_FIELDS: &[Std140Field] = &[
    Std140Field::Vec2, // resolution
    Std140Field::Vec2, // padding mirrored in the GLSL declaration
];

pub(crate) const PER_FRAME_FIELDS: &[Std140Field] = &[
    Std140Field::Float, // beat
    Std140Field::Float, // sinPhaseBeat
    Std140Field::Float, // bassLevel
    Std140Field::Float, // trebleLevel
    Std140Field::Float, // bassRatio
    Std140Field::Float, // trebleRatio
    Std140Field::Float, // volumeRatio
    Std140Field::Float, // stemBass
    Std140Field::Float, // stemDrums
    Std140Field::Float, // stemVocals
    Std140Field::Float, // stemOther
    Std140Field::Float, // paletteSize
    Std140Field::Vec4Array(MAX_PALETTE_COLORS),
];

/// Computes the byte span of an std140 block described by `fields`.
pub(crate) fn std140_span(fields: &[Std140Field]) -> usize {
    let mut cursor = 0;
    for field in fields {
        let align = field.align();
        cursor = (cursor + align - 1) & !(align - 1);
        cursor += field.size();
    }
    cursor
}

/// Rounds a block size up to the device's minimum uniform buffer alignment.
pub(crate) fn aligned_size(size: usize, alignment: u32) -> u64 {
    let alignment = alignment.max(1) as usize;
    (((size + alignment - 1) / alignment) * alignment) as u64
}

/// Load-time guard that the host structs match the std140 spans computed
/// from the field tables. The GLSL declarations are checked against the same
/// tables by inspection; this catches the host side drifting.
pub(crate) fn verify_block_layouts() -> anyhow::Result<()> {
    let per_run = std140_span(PER_RUN_FIELDS);
    if per_run != std::mem::size_of::<PerRunBlock>() {
        anyhow::bail!(
            "per-run block layout mismatch: std140 span {} != host size {}",
            per_run,
            std::mem::size_of::<PerRunBlock>()
        );
    }
    let per_frame = std140_span(PER_FRAME_FIELDS);
    if per_frame != std::mem::size_of::<PerFrameBlock>() {
        anyhow::bail!(
            "per-frame block layout mismatch: std140 span {} != host size {}",
            per_frame,
            std::mem::size_of::<PerFrameBlock>()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_structs_match_std140_spans() {
        verify_block_layouts().expect("layouts must agree");
    }

    #[test]
    fn per_frame_span_is_exact() {
        // 12 scalars + 5 vec4s; the palette lands on a 16-byte boundary.
        assert_eq!(std140_span(PER_FRAME_FIELDS), 128);
    }

    #[test]
    fn vec4_array_alignment_pads_preceding_scalars() {
        // A lone float before a vec4 array forces 12 bytes of padding.
        let fields = [Std140Field::Float, Std140Field::Vec4Array(2)];
        assert_eq!(std140_span(&fields), 16 + 32);
    }

    #[test]
    fn aligned_size_rounds_up() {
        assert_eq!(aligned_size(128, 256), 256);
        assert_eq!(aligned_size(256, 256), 256);
        assert_eq!(aligned_size(257, 256), 512);
        assert_eq!(aligned_size(24, 16), 32);
    }

    #[test]
    fn palette_clamps_to_capacity() {
        let mut block = PerFrameBlock::zeroed();
        let colors = [[1.0, 0.0, 0.0]; 7];
        block.set_palette(&colors);
        assert_eq!(block.palette_size, MAX_PALETTE_COLORS as f32);
        assert_eq!(block.palette[4], [1.0, 0.0, 0.0, 1.0]);
    }
}
