use std::collections::HashMap;
use std::fmt;

use crate::config::{CustomKind, CustomParameter, Directive};

/// The common controls every pattern exposes. Shader files reference these
/// by name in `#pragma TEControl` directives and `#iUniform` declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlTag {
    Speed,
    Size,
    Quantity,
    Spin,
    Wow1,
    Wow2,
    XPos,
    YPos,
    Angle,
    Brightness,
    LevelReactivity,
    FreqReactivity,
    Twist,
    WowTrigger,
}

impl ControlTag {
    pub const ALL: [ControlTag; 14] = [
        ControlTag::Speed,
        ControlTag::Size,
        ControlTag::Quantity,
        ControlTag::Spin,
        ControlTag::Wow1,
        ControlTag::Wow2,
        ControlTag::XPos,
        ControlTag::YPos,
        ControlTag::Angle,
        ControlTag::Brightness,
        ControlTag::LevelReactivity,
        ControlTag::FreqReactivity,
        ControlTag::Twist,
        ControlTag::WowTrigger,
    ];

    /// Parses a tag name as written in shader source. Matching is
    /// case-insensitive, a leading `i` is stripped (`iSpeed` names SPEED),
    /// and `SCALE` is accepted as an alias for SIZE.
    pub fn parse(name: &str) -> Option<Self> {
        let mut key = name.trim().to_ascii_uppercase();
        if let Some(stripped) = key.strip_prefix('I') {
            key = stripped.to_string();
        }
        if key == "SCALE" {
            key = "SIZE".to_string();
        }
        Self::lookup(&key)
    }

    fn lookup(key: &str) -> Option<Self> {
        Some(match key {
            "SPEED" => ControlTag::Speed,
            "SIZE" => ControlTag::Size,
            "QUANTITY" => ControlTag::Quantity,
            "SPIN" => ControlTag::Spin,
            "WOW1" => ControlTag::Wow1,
            "WOW2" => ControlTag::Wow2,
            "XPOS" => ControlTag::XPos,
            "YPOS" => ControlTag::YPos,
            "ANGLE" => ControlTag::Angle,
            "BRIGHTNESS" => ControlTag::Brightness,
            "LEVELREACTIVITY" => ControlTag::LevelReactivity,
            "FREQREACTIVITY" => ControlTag::FreqReactivity,
            "TWIST" => ControlTag::Twist,
            "WOWTRIGGER" => ControlTag::WowTrigger,
            _ => return None,
        })
    }

    /// Display label used when a directive does not override it.
    pub fn label(&self) -> &'static str {
        match self {
            ControlTag::Speed => "Speed",
            ControlTag::Size => "Size",
            ControlTag::Quantity => "Quantity",
            ControlTag::Spin => "Spin",
            ControlTag::Wow1 => "Wow1",
            ControlTag::Wow2 => "Wow2",
            ControlTag::XPos => "xPos",
            ControlTag::YPos => "yPos",
            ControlTag::Angle => "Angle",
            ControlTag::Brightness => "Brightness",
            ControlTag::LevelReactivity => "LevelReact",
            ControlTag::FreqReactivity => "FreqReact",
            ControlTag::Twist => "Twist",
            ControlTag::WowTrigger => "WowTrigger",
        }
    }

    /// Name of the shader uniform fed by this control. XPOS/YPOS feed the
    /// two lanes of `iTranslate` and have no scalar uniform of their own.
    pub fn uniform_name(&self) -> Option<&'static str> {
        Some(match self {
            ControlTag::Speed => "iSpeed",
            ControlTag::Size => "iScale",
            ControlTag::Quantity => "iQuantity",
            ControlTag::Spin => "iSpin",
            ControlTag::Wow1 => "iWow1",
            ControlTag::Wow2 => "iWow2",
            ControlTag::Angle => "iRotationAngle",
            ControlTag::Brightness => "iBrightness",
            ControlTag::LevelReactivity => "levelReact",
            ControlTag::FreqReactivity => "frequencyReact",
            ControlTag::Twist => "iTwist",
            ControlTag::WowTrigger => "iWowTrigger",
            ControlTag::XPos | ControlTag::YPos => return None,
        })
    }

    /// Built-in (value, min, max) before any directive overrides.
    pub fn default_range(&self) -> (f64, f64, f64) {
        match self {
            ControlTag::Speed => (0.1, -1.0, 1.0),
            ControlTag::Size => (1.0, 0.01, 5.0),
            ControlTag::Quantity => (0.5, 0.0, 1.0),
            ControlTag::Spin => (0.0, -1.0, 1.0),
            ControlTag::Wow1 => (0.0, 0.0, 1.0),
            ControlTag::Wow2 => (0.0, 0.0, 1.0),
            ControlTag::XPos => (0.0, -1.0, 1.0),
            ControlTag::YPos => (0.0, -1.0, 1.0),
            ControlTag::Angle => (0.0, -std::f64::consts::PI, std::f64::consts::PI),
            ControlTag::Brightness => (1.0, 0.0, 1.0),
            ControlTag::LevelReactivity => (0.0, 0.0, 1.0),
            ControlTag::FreqReactivity => (0.0, 0.0, 1.0),
            ControlTag::Twist => (0.0, 0.0, 1.0),
            ControlTag::WowTrigger => (0.0, 0.0, 1.0),
        }
    }
}

impl fmt::Display for ControlTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Shape applied between a control's normalized position and its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NormalizationCurve {
    #[default]
    Normal,
    Reverse,
    BiasCenter,
    BiasOuter,
}

impl NormalizationCurve {
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name.trim().to_ascii_uppercase().as_str() {
            "NORMAL" => NormalizationCurve::Normal,
            "REVERSE" => NormalizationCurve::Reverse,
            "BIAS_CENTER" => NormalizationCurve::BiasCenter,
            "BIAS_OUTER" => NormalizationCurve::BiasOuter,
            _ => return None,
        })
    }
}

/// How a pattern interprets the XPOS/YPOS controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TranslateMode {
    /// `iTranslate` is an absolute offset.
    #[default]
    Normal,
    /// XPOS/YPOS are velocities; `iTranslate` accumulates them over time.
    Drift,
}

/// One live control: the current value plus the range, exponent, and curve
/// that map it to and from a normalized 0..1 position.
#[derive(Debug, Clone)]
pub struct Control {
    pub label: String,
    pub value: f64,
    pub min: f64,
    pub max: f64,
    pub exponent: f64,
    pub curve: NormalizationCurve,
    pub enabled: bool,
}

impl Control {
    fn from_tag(tag: ControlTag) -> Self {
        let (value, min, max) = tag.default_range();
        Self {
            label: tag.label().to_string(),
            value,
            min,
            max,
            exponent: 1.0,
            curve: NormalizationCurve::Normal,
            enabled: true,
        }
    }

    pub fn set_range(&mut self, value: f64, min: f64, max: f64) {
        self.min = min;
        self.max = max;
        self.value = value.clamp(min.min(max), max.max(min));
    }

    /// Current position on the normalized 0..1 axis.
    pub fn normalized(&self) -> f64 {
        if self.max == self.min {
            return 0.0;
        }
        let linear = ((self.value - self.min) / (self.max - self.min)).clamp(0.0, 1.0);
        self.unshape(linear)
    }

    /// Moves the control to a normalized 0..1 position.
    pub fn set_normalized(&mut self, normalized: f64) {
        let shaped = self.shape(normalized.clamp(0.0, 1.0));
        self.value = self.min + shaped * (self.max - self.min);
    }

    fn shape(&self, n: f64) -> f64 {
        let exp = self.exponent.max(f64::EPSILON);
        match self.curve {
            NormalizationCurve::Normal => n.powf(exp),
            NormalizationCurve::Reverse => 1.0 - (1.0 - n).powf(exp),
            NormalizationCurve::BiasCenter => {
                if n >= 0.5 {
                    0.5 + 0.5 * ((n - 0.5) * 2.0).powf(exp)
                } else {
                    0.5 - 0.5 * ((0.5 - n) * 2.0).powf(exp)
                }
            }
            NormalizationCurve::BiasOuter => {
                if n >= 0.5 {
                    1.0 - 0.5 * ((1.0 - n) * 2.0).powf(exp)
                } else {
                    0.5 * (n * 2.0).powf(exp)
                }
            }
        }
    }

    fn unshape(&self, shaped: f64) -> f64 {
        let exp = self.exponent.max(f64::EPSILON);
        match self.curve {
            NormalizationCurve::Normal => shaped.powf(1.0 / exp),
            NormalizationCurve::Reverse => 1.0 - (1.0 - shaped).powf(1.0 / exp),
            NormalizationCurve::BiasCenter => {
                if shaped >= 0.5 {
                    0.5 + 0.5 * ((shaped - 0.5) * 2.0).powf(1.0 / exp)
                } else {
                    0.5 - 0.5 * ((0.5 - shaped) * 2.0).powf(1.0 / exp)
                }
            }
            NormalizationCurve::BiasOuter => {
                if shaped >= 0.5 {
                    1.0 - 0.5 * ((1.0 - shaped) * 2.0).powf(1.0 / exp)
                } else {
                    0.5 * (shaped * 2.0).powf(1.0 / exp)
                }
            }
        }
    }
}

/// A pattern-specific parameter declared by the shader itself, outside the
/// fixed tag vocabulary.
#[derive(Debug, Clone)]
pub struct CustomControl {
    pub name: String,
    pub kind: CustomKind,
    pub value: f64,
}

/// The full set of live controls for one shader: one entry per tag, seeded
/// from built-in defaults and then reshaped by the shader's directives, plus
/// any custom parameters the shader declared.
#[derive(Debug, Clone)]
pub struct ControlSet {
    controls: HashMap<ControlTag, Control>,
    customs: Vec<CustomControl>,
    translate_mode: TranslateMode,
    drift: [f64; 2],
}

impl ControlSet {
    pub fn new() -> Self {
        let mut controls = HashMap::with_capacity(ControlTag::ALL.len());
        for tag in ControlTag::ALL {
            controls.insert(tag, Control::from_tag(tag));
        }
        Self {
            controls,
            customs: Vec::new(),
            translate_mode: TranslateMode::Normal,
            drift: [0.0; 2],
        }
    }

    /// Applies parsed directives in order. Directives that configure things
    /// other than controls (textures, registration metadata) are ignored
    /// here; their consumers pick them out of the same list.
    pub fn apply(&mut self, directives: &[Directive]) {
        for directive in directives {
            match directive {
                Directive::Value { tag, value } => {
                    self.control_mut(*tag).value = *value;
                }
                Directive::Range {
                    tag,
                    value,
                    min,
                    max,
                } => {
                    self.control_mut(*tag).set_range(*value, *min, *max);
                }
                Directive::Label { tag, label } => {
                    self.control_mut(*tag).label = label.clone();
                }
                Directive::Exponent { tag, exponent } => {
                    self.control_mut(*tag).exponent = *exponent;
                }
                Directive::NormalizationCurve { tag, curve } => {
                    self.control_mut(*tag).curve = *curve;
                }
                Directive::Disable { tag } => {
                    self.control_mut(*tag).enabled = false;
                }
                Directive::TranslateMode(mode) => {
                    self.translate_mode = *mode;
                }
                Directive::CustomParameter(CustomParameter { name, kind }) => {
                    let value = match kind {
                        CustomKind::Float { value, .. } => *value,
                        CustomKind::Bool { value } => {
                            if *value {
                                1.0
                            } else {
                                0.0
                            }
                        }
                    };
                    self.customs.push(CustomControl {
                        name: name.clone(),
                        kind: kind.clone(),
                        value,
                    });
                }
                Directive::Auto
                | Directive::Texture { .. }
                | Directive::ClassName(_)
                | Directive::Category(_) => {}
            }
        }
    }

    pub fn control(&self, tag: ControlTag) -> &Control {
        &self.controls[&tag]
    }

    pub fn control_mut(&mut self, tag: ControlTag) -> &mut Control {
        self.controls
            .get_mut(&tag)
            .expect("control set is seeded with every tag")
    }

    pub fn value(&self, tag: ControlTag) -> f64 {
        self.controls[&tag].value
    }

    pub fn customs(&self) -> &[CustomControl] {
        &self.customs
    }

    pub fn custom_mut(&mut self, name: &str) -> Option<&mut CustomControl> {
        self.customs.iter_mut().find(|c| c.name == name)
    }

    pub fn translate_mode(&self) -> TranslateMode {
        self.translate_mode
    }

    /// Advances drift integration. In NORMAL mode this is a no-op.
    pub fn update(&mut self, delta_s: f64) {
        if self.translate_mode == TranslateMode::Drift {
            self.drift[0] += self.value(ControlTag::XPos) * delta_s;
            self.drift[1] += self.value(ControlTag::YPos) * delta_s;
        }
    }

    /// The `iTranslate` value for the current frame: the raw XPOS/YPOS
    /// offsets in NORMAL mode, the accumulated drift in DRIFT mode.
    pub fn translate(&self) -> [f32; 2] {
        match self.translate_mode {
            TranslateMode::Normal => [
                self.value(ControlTag::XPos) as f32,
                self.value(ControlTag::YPos) as f32,
            ],
            TranslateMode::Drift => [self.drift[0] as f32, self.drift[1] as f32],
        }
    }
}

impl Default for ControlSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tags_with_prefix_and_alias() {
        assert_eq!(ControlTag::parse("SPEED"), Some(ControlTag::Speed));
        assert_eq!(ControlTag::parse("iSpeed"), Some(ControlTag::Speed));
        assert_eq!(ControlTag::parse("iScale"), Some(ControlTag::Size));
        assert_eq!(ControlTag::parse("SCALE"), Some(ControlTag::Size));
        assert_eq!(ControlTag::parse("wowtrigger"), Some(ControlTag::WowTrigger));
        assert_eq!(ControlTag::parse("intensity"), None);
    }

    #[test]
    fn range_directive_reshapes_control() {
        let mut set = ControlSet::new();
        set.apply(&[Directive::Range {
            tag: ControlTag::Size,
            value: 5.0,
            min: 1.0,
            max: 10.0,
        }]);
        let control = set.control(ControlTag::Size);
        assert_eq!(control.value, 5.0);
        assert_eq!(control.min, 1.0);
        assert_eq!(control.max, 10.0);
    }

    #[test]
    fn normalized_round_trip_with_exponent() {
        let mut control = Control::from_tag(ControlTag::Speed);
        control.set_range(0.0, 0.0, 4.0);
        control.exponent = 2.0;
        control.set_normalized(0.5);
        assert!((control.value - 1.0).abs() < 1e-9);
        assert!((control.normalized() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn drift_integrates_velocity() {
        let mut set = ControlSet::new();
        set.apply(&[Directive::TranslateMode(TranslateMode::Drift)]);
        set.control_mut(ControlTag::XPos).value = 0.5;
        set.control_mut(ControlTag::YPos).value = -0.25;
        set.update(2.0);
        assert_eq!(set.translate(), [1.0, -0.5]);
        set.update(2.0);
        assert_eq!(set.translate(), [2.0, -1.0]);
    }

    #[test]
    fn normal_mode_passes_offsets_through() {
        let mut set = ControlSet::new();
        set.control_mut(ControlTag::XPos).value = 0.25;
        set.update(10.0);
        assert_eq!(set.translate(), [0.25, 0.0]);
    }
}
