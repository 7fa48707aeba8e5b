//! GPU rendering engine for LED pattern shaders.
//!
//! Each pattern is a GLSL fragment shader that samples per-point model
//! coordinate textures and audio-reactive uniforms to compute one color per
//! LED. Frames render to an offscreen double-buffered target whose roles
//! swap each frame, giving feedback shaders O(1) access to the previous
//! frame; in CPU mode an asynchronous readback ring returns the previous
//! frame's pixels as per-point colors without stalling the pipeline.
//!
//! The [`Engine`] owns the device context, the two shared uniform blocks
//! (per-run and per-frame), the audio analysis state, and the texture
//! cache. [`Shader`] instances are owned by their patterns and driven
//! through the engine once per animation frame. Everything runs on one
//! thread; the only cross-thread input is the audio channel.

mod audio;
mod blocks;
mod compile;
mod context;
mod engine;
mod model;
mod shader;
mod target;
mod textures;
mod uniforms;

pub use audio::{AudioAnalysis, AudioFrame, Ema, AUDIO_TEXTURE_HEIGHT, AUDIO_TEXTURE_WIDTH};
pub use blocks::MAX_PALETTE_COLORS;
pub use engine::{Engine, EngineConfig, FrameInput};
pub use model::{Model, ModelId, ModelPoint};
pub use shader::{
    Shader, ShaderDescriptor, TEXTURE_UNIT_AUDIO, TEXTURE_UNIT_BACKBUFFER, TEXTURE_UNIT_COORDS,
    TEXTURE_UNIT_INDEX_MAP,
};
pub use textures::TextureCache;
pub use uniforms::{UniformKind, UniformStore, UniformValue};
