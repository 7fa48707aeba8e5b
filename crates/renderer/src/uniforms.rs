use std::collections::HashMap;
use std::fmt::Write as _;

use anyhow::{bail, Result};
use bytemuck::cast_slice;

/// The fixed vocabulary of uniform kinds a shader can declare. Bools are
/// carried as 32-bit ints on both sides of the ABI; the generated defines
/// convert back to GLSL booleans at the point of use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Int1,
    Int2,
    Int3,
    Int4,
    Float1,
    Float2,
    Float3,
    Float4,
    Bool1,
    Bool2,
    Mat2,
    Mat3,
    Mat4,
    FloatArray(u32),
    Vec2Array(u32),
    Vec3Array(u32),
    Vec4Array(u32),
    IntArray(u32),
    IVec2Array(u32),
    IVec3Array(u32),
    IVec4Array(u32),
    Sampler2D,
}

impl UniformKind {
    fn std140_align(&self) -> u32 {
        match self {
            UniformKind::Int1 | UniformKind::Float1 | UniformKind::Bool1 => 4,
            UniformKind::Int2 | UniformKind::Float2 | UniformKind::Bool2 => 8,
            UniformKind::Int3
            | UniformKind::Int4
            | UniformKind::Float3
            | UniformKind::Float4
            | UniformKind::Mat2
            | UniformKind::Mat3
            | UniformKind::Mat4
            | UniformKind::FloatArray(_)
            | UniformKind::Vec2Array(_)
            | UniformKind::Vec3Array(_)
            | UniformKind::Vec4Array(_)
            | UniformKind::IntArray(_)
            | UniformKind::IVec2Array(_)
            | UniformKind::IVec3Array(_)
            | UniformKind::IVec4Array(_) => 16,
            UniformKind::Sampler2D => 0,
        }
    }

    fn std140_size(&self) -> u32 {
        match self {
            UniformKind::Int1 | UniformKind::Float1 | UniformKind::Bool1 => 4,
            UniformKind::Int2 | UniformKind::Float2 | UniformKind::Bool2 => 8,
            UniformKind::Int3 | UniformKind::Float3 => 12,
            UniformKind::Int4 | UniformKind::Float4 => 16,
            // Matrix columns and array elements are padded to vec4 strides.
            UniformKind::Mat2 => 32,
            UniformKind::Mat3 => 48,
            UniformKind::Mat4 => 64,
            UniformKind::FloatArray(n)
            | UniformKind::Vec2Array(n)
            | UniformKind::Vec3Array(n)
            | UniformKind::Vec4Array(n)
            | UniformKind::IntArray(n)
            | UniformKind::IVec2Array(n)
            | UniformKind::IVec3Array(n)
            | UniformKind::IVec4Array(n) => 16 * n,
            UniformKind::Sampler2D => 0,
        }
    }

    fn glsl_member(&self, name: &str) -> String {
        match self {
            UniformKind::Int1 | UniformKind::Bool1 => format!("int _{name};"),
            UniformKind::Int2 | UniformKind::Bool2 => format!("ivec2 _{name};"),
            UniformKind::Int3 => format!("ivec3 _{name};"),
            UniformKind::Int4 => format!("ivec4 _{name};"),
            UniformKind::Float1 => format!("float _{name};"),
            UniformKind::Float2 => format!("vec2 _{name};"),
            UniformKind::Float3 => format!("vec3 _{name};"),
            UniformKind::Float4 => format!("vec4 _{name};"),
            UniformKind::Mat2 => format!("mat2 _{name};"),
            UniformKind::Mat3 => format!("mat3 _{name};"),
            UniformKind::Mat4 => format!("mat4 _{name};"),
            UniformKind::FloatArray(n) => format!("float _{name}[{n}];"),
            UniformKind::Vec2Array(n) => format!("vec2 _{name}[{n}];"),
            UniformKind::Vec3Array(n) => format!("vec3 _{name}[{n}];"),
            UniformKind::Vec4Array(n) => format!("vec4 _{name}[{n}];"),
            UniformKind::IntArray(n) => format!("int _{name}[{n}];"),
            UniformKind::IVec2Array(n) => format!("ivec2 _{name}[{n}];"),
            UniformKind::IVec3Array(n) => format!("ivec3 _{name}[{n}];"),
            UniformKind::IVec4Array(n) => format!("ivec4 _{name}[{n}];"),
            UniformKind::Sampler2D => String::new(),
        }
    }

    fn glsl_define(&self, name: &str, instance: &str) -> String {
        match self {
            UniformKind::Bool1 => format!("#define {name} ({instance}._{name} != 0)"),
            UniformKind::Bool2 => {
                format!("#define {name} notEqual({instance}._{name}, ivec2(0))")
            }
            _ => format!("#define {name} {instance}._{name}"),
        }
    }

    fn default_value(&self) -> UniformValue {
        match self {
            UniformKind::Int1 => UniformValue::Int1(0),
            UniformKind::Int2 => UniformValue::Int2([0; 2]),
            UniformKind::Int3 => UniformValue::Int3([0; 3]),
            UniformKind::Int4 => UniformValue::Int4([0; 4]),
            UniformKind::Float1 => UniformValue::Float1(0.0),
            UniformKind::Float2 => UniformValue::Float2([0.0; 2]),
            UniformKind::Float3 => UniformValue::Float3([0.0; 3]),
            UniformKind::Float4 => UniformValue::Float4([0.0; 4]),
            UniformKind::Bool1 => UniformValue::Bool1(false),
            UniformKind::Bool2 => UniformValue::Bool2([false; 2]),
            UniformKind::Mat2 => UniformValue::Mat2([0.0; 4]),
            UniformKind::Mat3 => UniformValue::Mat3([0.0; 9]),
            UniformKind::Mat4 => UniformValue::Mat4([0.0; 16]),
            UniformKind::FloatArray(n) => UniformValue::FloatArray(vec![0.0; *n as usize]),
            UniformKind::Vec2Array(n) => UniformValue::Vec2Array(vec![[0.0; 2]; *n as usize]),
            UniformKind::Vec3Array(n) => UniformValue::Vec3Array(vec![[0.0; 3]; *n as usize]),
            UniformKind::Vec4Array(n) => UniformValue::Vec4Array(vec![[0.0; 4]; *n as usize]),
            UniformKind::IntArray(n) => UniformValue::IntArray(vec![0; *n as usize]),
            UniformKind::IVec2Array(n) => UniformValue::IVec2Array(vec![[0; 2]; *n as usize]),
            UniformKind::IVec3Array(n) => UniformValue::IVec3Array(vec![[0; 3]; *n as usize]),
            UniformKind::IVec4Array(n) => UniformValue::IVec4Array(vec![[0; 4]; *n as usize]),
            UniformKind::Sampler2D => UniformValue::Int1(0),
        }
    }
}

/// A staged uniform value. Matrices are column-major; array values must
/// carry exactly the declared element count.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Int1(i32),
    Int2([i32; 2]),
    Int3([i32; 3]),
    Int4([i32; 4]),
    Float1(f32),
    Float2([f32; 2]),
    Float3([f32; 3]),
    Float4([f32; 4]),
    Bool1(bool),
    Bool2([bool; 2]),
    Mat2([f32; 4]),
    Mat3([f32; 9]),
    Mat4([f32; 16]),
    FloatArray(Vec<f32>),
    Vec2Array(Vec<[f32; 2]>),
    Vec3Array(Vec<[f32; 3]>),
    Vec4Array(Vec<[f32; 4]>),
    IntArray(Vec<i32>),
    IVec2Array(Vec<[i32; 2]>),
    IVec3Array(Vec<[i32; 3]>),
    IVec4Array(Vec<[i32; 4]>),
}

impl UniformValue {
    fn matches(&self, kind: UniformKind) -> bool {
        match (self, kind) {
            (UniformValue::Int1(_), UniformKind::Int1)
            | (UniformValue::Int2(_), UniformKind::Int2)
            | (UniformValue::Int3(_), UniformKind::Int3)
            | (UniformValue::Int4(_), UniformKind::Int4)
            | (UniformValue::Float1(_), UniformKind::Float1)
            | (UniformValue::Float2(_), UniformKind::Float2)
            | (UniformValue::Float3(_), UniformKind::Float3)
            | (UniformValue::Float4(_), UniformKind::Float4)
            | (UniformValue::Bool1(_), UniformKind::Bool1)
            | (UniformValue::Bool2(_), UniformKind::Bool2)
            | (UniformValue::Mat2(_), UniformKind::Mat2)
            | (UniformValue::Mat3(_), UniformKind::Mat3)
            | (UniformValue::Mat4(_), UniformKind::Mat4) => true,
            (UniformValue::FloatArray(v), UniformKind::FloatArray(n)) => v.len() == n as usize,
            (UniformValue::Vec2Array(v), UniformKind::Vec2Array(n)) => v.len() == n as usize,
            (UniformValue::Vec3Array(v), UniformKind::Vec3Array(n)) => v.len() == n as usize,
            (UniformValue::Vec4Array(v), UniformKind::Vec4Array(n)) => v.len() == n as usize,
            (UniformValue::IntArray(v), UniformKind::IntArray(n)) => v.len() == n as usize,
            (UniformValue::IVec2Array(v), UniformKind::IVec2Array(n)) => v.len() == n as usize,
            (UniformValue::IVec3Array(v), UniformKind::IVec3Array(n)) => v.len() == n as usize,
            (UniformValue::IVec4Array(v), UniformKind::IVec4Array(n)) => v.len() == n as usize,
            _ => false,
        }
    }

    /// std140 byte encoding at a member offset.
    fn encode(&self) -> Vec<u8> {
        match self {
            UniformValue::Int1(v) => cast_slice(std::slice::from_ref(v)).to_vec(),
            UniformValue::Int2(v) => cast_slice(v.as_slice()).to_vec(),
            UniformValue::Int3(v) => cast_slice(v.as_slice()).to_vec(),
            UniformValue::Int4(v) => cast_slice(v.as_slice()).to_vec(),
            UniformValue::Float1(v) => cast_slice(std::slice::from_ref(v)).to_vec(),
            UniformValue::Float2(v) => cast_slice(v.as_slice()).to_vec(),
            UniformValue::Float3(v) => cast_slice(v.as_slice()).to_vec(),
            UniformValue::Float4(v) => cast_slice(v.as_slice()).to_vec(),
            UniformValue::Bool1(v) => {
                let raw: u32 = u32::from(*v);
                raw.to_le_bytes().to_vec()
            }
            UniformValue::Bool2(v) => {
                let raw = [u32::from(v[0]), u32::from(v[1])];
                cast_slice(raw.as_slice()).to_vec()
            }
            UniformValue::Mat2(cols) => {
                let mut bytes = Vec::with_capacity(32);
                for col in cols.chunks_exact(2) {
                    push_padded_floats(&mut bytes, col, 4);
                }
                bytes
            }
            UniformValue::Mat3(cols) => {
                let mut bytes = Vec::with_capacity(48);
                for col in cols.chunks_exact(3) {
                    push_padded_floats(&mut bytes, col, 4);
                }
                bytes
            }
            UniformValue::Mat4(cols) => cast_slice(cols.as_slice()).to_vec(),
            UniformValue::FloatArray(v) => {
                let mut bytes = Vec::with_capacity(v.len() * 16);
                for item in v {
                    push_padded_floats(&mut bytes, std::slice::from_ref(item), 4);
                }
                bytes
            }
            UniformValue::Vec2Array(v) => {
                let mut bytes = Vec::with_capacity(v.len() * 16);
                for item in v {
                    push_padded_floats(&mut bytes, item.as_slice(), 4);
                }
                bytes
            }
            UniformValue::Vec3Array(v) => {
                let mut bytes = Vec::with_capacity(v.len() * 16);
                for item in v {
                    push_padded_floats(&mut bytes, item.as_slice(), 4);
                }
                bytes
            }
            UniformValue::Vec4Array(v) => cast_slice(v.as_slice()).to_vec(),
            UniformValue::IntArray(v) => {
                let mut bytes = Vec::with_capacity(v.len() * 16);
                for item in v {
                    push_padded_ints(&mut bytes, std::slice::from_ref(item), 4);
                }
                bytes
            }
            UniformValue::IVec2Array(v) => {
                let mut bytes = Vec::with_capacity(v.len() * 16);
                for item in v {
                    push_padded_ints(&mut bytes, item.as_slice(), 4);
                }
                bytes
            }
            UniformValue::IVec3Array(v) => {
                let mut bytes = Vec::with_capacity(v.len() * 16);
                for item in v {
                    push_padded_ints(&mut bytes, item.as_slice(), 4);
                }
                bytes
            }
            UniformValue::IVec4Array(v) => cast_slice(v.as_slice()).to_vec(),
        }
    }
}

fn push_padded_floats(bytes: &mut Vec<u8>, values: &[f32], lanes: usize) {
    bytes.extend_from_slice(cast_slice(values));
    for _ in values.len()..lanes {
        bytes.extend_from_slice(&0.0_f32.to_le_bytes());
    }
}

fn push_padded_ints(bytes: &mut Vec<u8>, values: &[i32], lanes: usize) {
    bytes.extend_from_slice(cast_slice(values));
    for _ in values.len()..lanes {
        bytes.extend_from_slice(&0_i32.to_le_bytes());
    }
}

/// One dirty-tracked shader input. A value reaches the device at most once
/// per frame and only if it changed since the last push.
#[derive(Debug)]
struct Uniform {
    name: String,
    kind: UniformKind,
    value: UniformValue,
    dirty: bool,
    /// Byte offset inside the per-shader block. Unused for samplers.
    offset: u32,
    /// Texture unit, samplers only. Assigned once, never reassigned.
    unit: Option<u32>,
}

/// All uniforms owned by one shader, plus the std140 layout of its block.
///
/// Declarations happen before [`UniformStore::freeze_layout`]; the frozen
/// layout produces both the GLSL block declaration and the host offsets, so
/// the two cannot diverge.
#[derive(Debug, Default)]
pub struct UniformStore {
    uniforms: Vec<Uniform>,
    index: HashMap<String, usize>,
    next_unit: u32,
    block_size: u32,
    frozen: bool,
}

impl UniformStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a block-resident uniform. Declaration order is block member
    /// order. Samplers are declared implicitly through [`Self::texture_unit`].
    pub fn declare(&mut self, name: &str, kind: UniformKind) -> Result<()> {
        if self.frozen {
            bail!("cannot declare uniform {name} after the layout is frozen");
        }
        if kind == UniformKind::Sampler2D {
            bail!("sampler uniforms are declared by requesting a texture unit");
        }
        if self.index.contains_key(name) {
            bail!("uniform {name} is already declared");
        }
        self.index.insert(name.to_string(), self.uniforms.len());
        self.uniforms.push(Uniform {
            name: name.to_string(),
            kind,
            value: kind.default_value(),
            dirty: true,
            offset: 0,
            unit: None,
        });
        Ok(())
    }

    /// Returns the texture unit for a sampler uniform, allocating the next
    /// unused unit for a new name. The same name always maps to the same
    /// unit for the life of the shader.
    pub fn texture_unit(&mut self, name: &str) -> Result<u32> {
        if let Some(&slot) = self.index.get(name) {
            return match self.uniforms[slot].unit {
                Some(unit) => Ok(unit),
                None => bail!(
                    "uniform {name} is declared as {:?}, not a sampler",
                    self.uniforms[slot].kind
                ),
            };
        }
        let unit = self.next_unit;
        self.next_unit += 1;
        self.index.insert(name.to_string(), self.uniforms.len());
        self.uniforms.push(Uniform {
            name: name.to_string(),
            kind: UniformKind::Sampler2D,
            value: UniformValue::Int1(unit as i32),
            dirty: false,
            offset: 0,
            unit: Some(unit),
        });
        Ok(unit)
    }

    /// Computes std140 offsets for every block member and locks the layout.
    pub fn freeze_layout(&mut self) {
        let mut cursor: u32 = 0;
        for uniform in &mut self.uniforms {
            if uniform.kind == UniformKind::Sampler2D {
                continue;
            }
            let align = uniform.kind.std140_align();
            cursor = (cursor + align - 1) & !(align - 1);
            uniform.offset = cursor;
            cursor += uniform.kind.std140_size();
        }
        self.block_size = cursor;
        self.frozen = true;
    }

    /// Byte span of the per-shader block (unaligned; round up for the
    /// device buffer).
    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Emits the GLSL declaration of the per-shader block plus the defines
    /// that map bare uniform names onto its members.
    pub fn block_declaration(&self, block_name: &str, instance: &str, set: u32, binding: u32) -> String {
        let mut decl = String::new();
        let _ = writeln!(
            decl,
            "layout(std140, set = {set}, binding = {binding}) uniform {block_name} {{"
        );
        for uniform in &self.uniforms {
            if uniform.kind == UniformKind::Sampler2D {
                continue;
            }
            let _ = writeln!(decl, "    {}", uniform.kind.glsl_member(&uniform.name));
        }
        let _ = writeln!(decl, "}} {instance};");
        for uniform in &self.uniforms {
            if uniform.kind == UniformKind::Sampler2D {
                continue;
            }
            let _ = writeln!(decl, "{}", uniform.kind.glsl_define(&uniform.name, instance));
        }
        decl
    }

    /// Sampler names with their units, in unit order. Drives the generated
    /// texture binding declarations.
    pub fn sampler_bindings(&self) -> Vec<(String, u32)> {
        let mut bindings: Vec<(String, u32)> = self
            .uniforms
            .iter()
            .filter_map(|u| u.unit.map(|unit| (u.name.clone(), unit)))
            .collect();
        bindings.sort_by_key(|(_, unit)| *unit);
        bindings
    }

    /// Stages a value, marking the uniform dirty only when the value
    /// actually changed. Unknown names and kind mismatches are lifecycle
    /// bugs and fail loudly.
    pub fn set(&mut self, name: &str, value: UniformValue) -> Result<()> {
        let &slot = self
            .index
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("uniform {name} was never declared"))?;
        let uniform = &mut self.uniforms[slot];
        if uniform.kind == UniformKind::Sampler2D {
            bail!("uniform {name} is a sampler; its texture unit is fixed");
        }
        if !value.matches(uniform.kind) {
            bail!(
                "uniform {name} is declared as {:?}; incompatible value {:?}",
                uniform.kind,
                value
            );
        }
        if uniform.value != value {
            uniform.value = value;
            uniform.dirty = true;
        }
        Ok(())
    }

    pub fn set_float(&mut self, name: &str, x: f32) -> Result<()> {
        self.set(name, UniformValue::Float1(x))
    }

    pub fn set_vec2(&mut self, name: &str, value: [f32; 2]) -> Result<()> {
        self.set(name, UniformValue::Float2(value))
    }

    pub fn set_vec3(&mut self, name: &str, value: [f32; 3]) -> Result<()> {
        self.set(name, UniformValue::Float3(value))
    }

    pub fn set_int(&mut self, name: &str, x: i32) -> Result<()> {
        self.set(name, UniformValue::Int1(x))
    }

    pub fn set_bool(&mut self, name: &str, x: bool) -> Result<()> {
        self.set(name, UniformValue::Bool1(x))
    }

    /// Encodes every dirty block member and clears its flag. Pure staging
    /// half of `flush`, split out so dirty-tracking is testable without a
    /// device.
    pub(crate) fn encode_dirty(&mut self) -> Vec<(u32, Vec<u8>)> {
        debug_assert!(self.frozen, "layout must be frozen before flushing");
        let mut writes = Vec::new();
        for uniform in &mut self.uniforms {
            if uniform.kind == UniformKind::Sampler2D || !uniform.dirty {
                continue;
            }
            uniform.dirty = false;
            writes.push((uniform.offset, uniform.value.encode()));
        }
        writes
    }

    /// Pushes dirty values into the shader's block buffer. Returns the
    /// number of device writes issued; redundant sets cost zero.
    pub fn flush(&mut self, queue: &wgpu::Queue, buffer: &wgpu::Buffer) -> usize {
        let writes = self.encode_dirty();
        let count = writes.len();
        for (offset, bytes) in writes {
            queue.write_buffer(buffer, offset as u64, &bytes);
        }
        count
    }

    pub fn offset_of(&self, name: &str) -> Option<u32> {
        self.index.get(name).map(|&slot| self.uniforms[slot].offset)
    }

    pub fn kind_of(&self, name: &str) -> Option<UniformKind> {
        self.index.get(name).map(|&slot| self.uniforms[slot].kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn std140_offsets_pack_like_the_spec_says() {
        let mut store = UniformStore::new();
        store.declare("a", UniformKind::Float1).unwrap();
        store.declare("b", UniformKind::Float3).unwrap();
        store.declare("c", UniformKind::Float1).unwrap();
        store.declare("d", UniformKind::Float2).unwrap();
        store.declare("e", UniformKind::Mat3).unwrap();
        store.declare("f", UniformKind::FloatArray(3)).unwrap();
        store.freeze_layout();

        assert_eq!(store.offset_of("a"), Some(0));
        // vec3 aligns to 16.
        assert_eq!(store.offset_of("b"), Some(16));
        // A float packs into the vec3's tail.
        assert_eq!(store.offset_of("c"), Some(28));
        assert_eq!(store.offset_of("d"), Some(32));
        // mat3 aligns to 16 and spans three padded columns.
        assert_eq!(store.offset_of("e"), Some(48));
        assert_eq!(store.offset_of("f"), Some(96));
        assert_eq!(store.block_size(), 96 + 48);
    }

    #[test]
    fn redundant_sets_issue_zero_writes() {
        let mut store = UniformStore::new();
        store.declare("iSpeed", UniformKind::Float1).unwrap();
        store.freeze_layout();

        // The initial default is dirty so the first frame uploads it.
        assert_eq!(store.encode_dirty().len(), 1);

        store.set_float("iSpeed", 0.25).unwrap();
        assert_eq!(store.encode_dirty().len(), 1);

        // Ending the frame at the prior frame's value costs nothing.
        store.set_float("iSpeed", 0.5).unwrap();
        store.set_float("iSpeed", 0.25).unwrap();
        store.set_float("iSpeed", 0.25).unwrap();
        assert_eq!(store.encode_dirty().len(), 0);
    }

    #[test]
    fn changed_value_is_encoded_at_its_offset() {
        let mut store = UniformStore::new();
        store.declare("pad", UniformKind::Float4).unwrap();
        store.declare("iQuantity", UniformKind::Float1).unwrap();
        store.freeze_layout();
        store.encode_dirty();

        store.set_float("iQuantity", 3.0).unwrap();
        let writes = store.encode_dirty();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].0, 16);
        assert_eq!(writes[0].1, 3.0_f32.to_le_bytes().to_vec());
    }

    #[test]
    fn texture_units_are_monotonic_and_stable() {
        let mut store = UniformStore::new();
        assert_eq!(store.texture_unit("iChannel0").unwrap(), 0);
        assert_eq!(store.texture_unit("lxModelCoords").unwrap(), 1);
        assert_eq!(store.texture_unit("iBackbuffer").unwrap(), 2);
        // Requesting an existing name returns its unit, never a new one.
        assert_eq!(store.texture_unit("lxModelCoords").unwrap(), 1);
        assert_eq!(store.texture_unit("iChannel3").unwrap(), 3);
    }

    #[test]
    fn texture_unit_for_block_member_is_an_error() {
        let mut store = UniformStore::new();
        store.declare("iTime", UniformKind::Float1).unwrap();
        assert!(store.texture_unit("iTime").is_err());
    }

    #[test]
    fn unknown_uniform_is_a_loud_error() {
        let mut store = UniformStore::new();
        store.freeze_layout();
        assert!(store.set_float("nope", 1.0).is_err());
    }

    #[test]
    fn kind_mismatch_is_a_loud_error() {
        let mut store = UniformStore::new();
        store.declare("iTranslate", UniformKind::Float2).unwrap();
        store.freeze_layout();
        assert!(store.set_float("iTranslate", 1.0).is_err());
    }

    #[test]
    fn bool_encodes_as_uint() {
        let mut store = UniformStore::new();
        store.declare("iWowTrigger", UniformKind::Bool1).unwrap();
        store.freeze_layout();
        store.set_bool("iWowTrigger", true).unwrap();
        let writes = store.encode_dirty();
        assert_eq!(writes[0].1, 1_u32.to_le_bytes().to_vec());
    }

    #[test]
    fn vec3_array_pads_each_element() {
        let value = UniformValue::Vec3Array(vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        let bytes = value.encode();
        assert_eq!(bytes.len(), 32);
        let floats: &[f32] = bytemuck::cast_slice(&bytes);
        assert_eq!(floats, &[1.0, 2.0, 3.0, 0.0, 4.0, 5.0, 6.0, 0.0]);
    }

    #[test]
    fn mat3_pads_each_column() {
        let value = UniformValue::Mat3([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        let bytes = value.encode();
        assert_eq!(bytes.len(), 48);
        let floats: &[f32] = bytemuck::cast_slice(&bytes);
        assert_eq!(
            floats,
            &[1.0, 2.0, 3.0, 0.0, 4.0, 5.0, 6.0, 0.0, 7.0, 8.0, 9.0, 0.0]
        );
    }

    #[test]
    fn array_length_mismatch_is_rejected() {
        let mut store = UniformStore::new();
        store.declare("weights", UniformKind::FloatArray(4)).unwrap();
        store.freeze_layout();
        assert!(store
            .set("weights", UniformValue::FloatArray(vec![0.0; 3]))
            .is_err());
    }

    #[test]
    fn block_declaration_lists_members_in_order() {
        let mut store = UniformStore::new();
        store.declare("iTime", UniformKind::Float1).unwrap();
        store.declare("iWowTrigger", UniformKind::Bool1).unwrap();
        store.texture_unit("iBackbuffer").unwrap();
        store.freeze_layout();
        let decl = store.block_declaration("PatternBlock", "pat", 1, 0);
        assert!(decl.contains("layout(std140, set = 1, binding = 0) uniform PatternBlock {"));
        assert!(decl.contains("float _iTime;"));
        assert!(decl.contains("int _iWowTrigger;"));
        assert!(decl.contains("#define iTime pat._iTime"));
        assert!(decl.contains("#define iWowTrigger (pat._iWowTrigger != 0)"));
        // Samplers never appear in the block.
        assert!(!decl.contains("iBackbuffer"));
    }
}
