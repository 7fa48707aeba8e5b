//! Embedded configuration language for pattern shaders.
//!
//! Pattern shaders are plain GLSL fragment shader files that describe their
//! own controls, textures, and registration metadata through `#pragma`
//! directives, `#iUniform` range declarations, and a legacy placeholder
//! syntax embedded in comments and source text. This crate turns a shader
//! file into a [`ProcessedShader`]: device-ready GLSL plus an ordered list of
//! [`Directive`] values the engine consumes at shader construction time.
//!
//! The crate also hosts the [`ControlSet`] runtime (seeded from directives,
//! queried every frame) and the [`PatternRegistry`], which scans a shader
//! directory at startup and synthesizes a loadable pattern definition for
//! every self-describing file.

mod config;
mod controls;
mod error;
mod preprocess;
mod registry;

pub use config::{CustomKind, CustomParameter, Directive};
pub use controls::{
    Control, ControlSet, ControlTag, CustomControl, NormalizationCurve, TranslateMode,
};
pub use error::PreprocessError;
pub use preprocess::{ProcessedShader, Preprocessor, MAX_INCLUDE_DEPTH};
pub use registry::{PatternDef, PatternRegistry};
