use std::path::PathBuf;

use crate::controls::{ControlTag, NormalizationCurve, TranslateMode};

/// A pattern-specific parameter declared in shader source, either through
/// the legacy placeholder syntax or an `#iUniform` line.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomParameter {
    /// Final GLSL uniform name as it appears in the processed body.
    pub name: String,
    pub kind: CustomKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CustomKind {
    Float { value: f64, min: f64, max: f64 },
    Bool { value: bool },
}

/// One parsed configuration directive. Directives are produced in source
/// order by the preprocessor and consumed once at shader construction; they
/// are immutable thereafter.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// `#pragma auto` — opt the file into automatic pattern registration.
    Auto,
    /// `TEControl.<TAG>.Value(x)`
    Value { tag: ControlTag, value: f64 },
    /// `TEControl.<TAG>.Range(value, min, max)`
    Range {
        tag: ControlTag,
        value: f64,
        min: f64,
        max: f64,
    },
    /// `TEControl.<TAG>.Label("...")`
    Label { tag: ControlTag, label: String },
    /// `TEControl.<TAG>.Exponent(x)`
    Exponent { tag: ControlTag, exponent: f64 },
    /// `TEControl.<TAG>.NormalizationCurve(CURVE)`
    NormalizationCurve {
        tag: ControlTag,
        curve: NormalizationCurve,
    },
    /// `TEControl.<TAG>.Disable`
    Disable { tag: ControlTag },
    /// `TEControl.TranslateMode.{NORMAL|DRIFT}`
    TranslateMode(TranslateMode),
    /// `#pragma iChannel<n> "file"` — static texture bound to channel 1-9.
    Texture { channel: u8, path: PathBuf },
    /// `#pragma name "ClassName"`
    ClassName(String),
    /// `#pragma lxCategory "Category"`
    Category(String),
    /// Parameter recovered from legacy placeholders.
    CustomParameter(CustomParameter),
}

impl Directive {
    /// Tag this directive configures, if it targets a single control.
    pub fn tag(&self) -> Option<ControlTag> {
        match self {
            Directive::Value { tag, .. }
            | Directive::Range { tag, .. }
            | Directive::Label { tag, .. }
            | Directive::Exponent { tag, .. }
            | Directive::NormalizationCurve { tag, .. }
            | Directive::Disable { tag } => Some(*tag),
            _ => None,
        }
    }
}
