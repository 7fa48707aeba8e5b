use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::warn;

use crate::config::{CustomKind, CustomParameter, Directive};
use crate::controls::{ControlTag, NormalizationCurve, TranslateMode};
use crate::error::PreprocessError;

/// Nested `#include` expansion stops here; exceeding it is a hard error,
/// never silent truncation.
pub const MAX_INCLUDE_DEPTH: usize = 10;

/// Suffix appended to uniforms synthesized from legacy placeholders so they
/// cannot collide with names the shader author already uses.
pub const CUSTOM_SUFFIX: &str = "_custom";

/// A shader file after preprocessing: device-ready GLSL body plus the ordered
/// directive list recovered from its embedded configuration.
#[derive(Debug, Clone)]
pub struct ProcessedShader {
    /// Shader name (file stem unless a `name` pragma overrides it downstream).
    pub name: String,
    pub source_path: Option<PathBuf>,
    /// GLSL body with includes expanded and directive lines consumed.
    pub body: String,
    pub directives: Vec<Directive>,
    pub translate_mode: TranslateMode,
}

impl ProcessedShader {
    /// Static texture channel bindings in declaration order.
    pub fn channels(&self) -> impl Iterator<Item = (u8, &Path)> {
        self.directives.iter().filter_map(|d| match d {
            Directive::Texture { channel, path } => Some((*channel, path.as_path())),
            _ => None,
        })
    }

    pub fn class_name(&self) -> Option<&str> {
        self.directives.iter().find_map(|d| match d {
            Directive::ClassName(name) => Some(name.as_str()),
            _ => None,
        })
    }

    pub fn category(&self) -> Option<&str> {
        self.directives.iter().find_map(|d| match d {
            Directive::Category(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// A shader is self-describing when it opts in via `#pragma auto` or
    /// names its own pattern class.
    pub fn is_auto(&self) -> bool {
        self.directives
            .iter()
            .any(|d| matches!(d, Directive::Auto | Directive::ClassName(_)))
    }

    pub fn custom_parameters(&self) -> impl Iterator<Item = &CustomParameter> {
        self.directives.iter().filter_map(|d| match d {
            Directive::CustomParameter(p) => Some(p),
            _ => None,
        })
    }
}

/// Expands includes and parses the embedded configuration mini-language out
/// of raw shader text.
pub struct Preprocessor {
    resource_root: PathBuf,
    max_include_depth: usize,
    placeholder: Regex,
    float_range: Regex,
}

impl Preprocessor {
    /// `resource_root` anchors `<bracketed>` include and texture references.
    pub fn new(resource_root: impl Into<PathBuf>) -> Self {
        Self {
            resource_root: resource_root.into(),
            max_include_depth: MAX_INCLUDE_DEPTH,
            placeholder: Regex::new(r"\{%(\w+)(?:\[([^\]]*)\])?\}")
                .expect("placeholder pattern is valid"),
            float_range: Regex::new(
                r"(-?\d*\.\d*|-?\d+\.?)\s*in\s*\{\s*(-?\d*\.\d*|-?\d+\.?)\s*,\s*(-?\d*\.\d*|-?\d+\.?)\s*\}",
            )
            .expect("float range pattern is valid"),
        }
    }

    pub fn process_file(&self, path: &Path) -> Result<ProcessedShader, PreprocessError> {
        let source = fs::read_to_string(path).map_err(|source| PreprocessError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let base_dir = path.parent().unwrap_or(Path::new("."));
        let mut processed = self.process_source(&name, &source, base_dir)?;
        processed.source_path = Some(path.to_path_buf());
        Ok(processed)
    }

    /// Runs the full pipeline: include expansion, legacy placeholder
    /// rewriting, `#iUniform` parsing, pragma parsing, drift-mode define
    /// injection. Any failure aborts with no partial output.
    pub fn process_source(
        &self,
        name: &str,
        source: &str,
        base_dir: &Path,
    ) -> Result<ProcessedShader, PreprocessError> {
        let mut body = self.expand_includes(name, source, base_dir)?;
        let mut directives = Vec::new();

        body = self.rewrite_placeholders(name, &body, &mut directives)?;
        body = self.parse_iuniforms(name, &body, &mut directives)?;

        let (body, translate_mode) = self.parse_pragmas(name, &body, base_dir, &mut directives)?;

        // The define tells the shader framework to leave coordinates alone;
        // the host integrates XPOS/YPOS as velocities instead.
        let body = if translate_mode == TranslateMode::Drift {
            format!("#define TE_NOTRANSLATE\n{body}")
        } else {
            body
        };

        Ok(ProcessedShader {
            name: name.to_string(),
            source_path: None,
            body,
            directives,
            translate_mode,
        })
    }

    // Include expansion. Each pass splices one nesting level; files pulled in
    // by a pass are re-scanned on the next one, bounded by max_include_depth.
    fn expand_includes(
        &self,
        name: &str,
        source: &str,
        base_dir: &Path,
    ) -> Result<String, PreprocessError> {
        let mut text = source.to_string();
        let mut depth = 0;
        loop {
            let (expanded, found, last_line) = self.expand_once(name, &text, base_dir)?;
            text = expanded;
            if !found {
                return Ok(text);
            }
            depth += 1;
            if depth > self.max_include_depth {
                return Err(PreprocessError::IncludeDepth {
                    shader: name.to_string(),
                    line: last_line,
                    max_depth: self.max_include_depth,
                });
            }
        }
    }

    fn expand_once(
        &self,
        name: &str,
        source: &str,
        base_dir: &Path,
    ) -> Result<(String, bool, usize), PreprocessError> {
        let mut output = String::with_capacity(source.len());
        let mut found = false;
        let mut last_line = 0;
        for (index, line) in source.lines().enumerate() {
            let line_no = index + 1;
            if let Some(rest) = line.trim_start().strip_prefix("#include") {
                found = true;
                last_line = line_no;
                let path = self.resolve_file_token(rest, base_dir);
                let contents =
                    fs::read_to_string(&path).map_err(|source| PreprocessError::Include {
                        shader: name.to_string(),
                        line: line_no,
                        path: path.clone(),
                        source,
                    })?;
                // Restart line numbering inside the include, then pick the
                // outer count back up, so compile diagnostics stay usable.
                output.push_str("#line 1\n");
                output.push_str(&contents);
                if !contents.ends_with('\n') {
                    output.push('\n');
                }
                output.push_str(&format!("#line {}\n", line_no + 1));
            } else {
                output.push_str(line);
                output.push('\n');
            }
        }
        Ok((output, found, last_line))
    }

    // Legacy placeholder syntax: `{%name[value,min,max]}` or `{%name[bool]}`.
    // Rewritten to a suffixed uniform reference plus a custom parameter
    // directive; the uniform declaration itself is generated by the engine's
    // block builder.
    fn rewrite_placeholders(
        &self,
        name: &str,
        body: &str,
        directives: &mut Vec<Directive>,
    ) -> Result<String, PreprocessError> {
        for caps in self.placeholder.captures_iter(body) {
            let placeholder = &caps[1];
            let Some(metadata) = caps.get(2) else {
                continue;
            };
            let uniform = format!("{placeholder}{CUSTOM_SUFFIX}");
            if metadata.as_str() == "bool" {
                directives.push(Directive::CustomParameter(CustomParameter {
                    name: uniform,
                    kind: CustomKind::Bool { value: false },
                }));
            } else {
                let values: Vec<f64> = metadata
                    .as_str()
                    .split(',')
                    .map(parse_glsl_float)
                    .collect::<Result<_, _>>()
                    .map_err(|message| PreprocessError::Directive {
                        shader: name.to_string(),
                        text: caps[0].to_string(),
                        message,
                    })?;
                if values.len() != 3 {
                    return Err(PreprocessError::Directive {
                        shader: name.to_string(),
                        text: caps[0].to_string(),
                        message: format!("expected value,min,max but found {} values", values.len()),
                    });
                }
                directives.push(Directive::CustomParameter(CustomParameter {
                    name: uniform,
                    kind: CustomKind::Float {
                        value: values[0],
                        min: values[1],
                        max: values[2],
                    },
                }));
            }
        }
        Ok(self
            .placeholder
            .replace_all(body, format!("${{1}}{CUSTOM_SUFFIX}"))
            .into_owned())
    }

    // `#iUniform float NAME = default in {min,max}` range declarations.
    // Reserved names map onto control tags; names outside the vocabulary are
    // logged and skipped; vec2/vec3/color3 declarations carry no range and
    // are ignored. Every `#iUniform` line is removed from the output.
    fn parse_iuniforms(
        &self,
        name: &str,
        body: &str,
        directives: &mut Vec<Directive>,
    ) -> Result<String, PreprocessError> {
        let mut output = String::with_capacity(body.len());
        for line in body.lines() {
            if !line.contains("#iUniform") {
                output.push_str(line);
                output.push('\n');
                continue;
            }
            let trimmed = line.trim();
            if !trimmed.starts_with("#iUniform") {
                // Mentioned but not a declaration; drop the line like the
                // declarations themselves.
                continue;
            }
            let directive_err = |message: String| PreprocessError::Directive {
                shader: name.to_string(),
                text: trimmed.to_string(),
                message,
            };

            let (lhs, rhs) = trimmed
                .split_once('=')
                .ok_or_else(|| directive_err("expected `=` in iUniform declaration".into()))?;
            let lhs_tokens: Vec<&str> = lhs.split_whitespace().collect();
            if lhs_tokens.len() != 3 || lhs_tokens[0] != "#iUniform" {
                return Err(directive_err(format!(
                    "expected `#iUniform <type> <name>` but found `{lhs}`"
                )));
            }
            let var_type = lhs_tokens[1];
            let var_name = lhs_tokens[2];

            match var_type {
                "float" => {
                    let caps = self
                        .float_range
                        .captures(rhs)
                        .ok_or_else(|| directive_err(format!("float range didn't match `{rhs}`")))?;
                    let value = parse_glsl_float(&caps[1]).map_err(&directive_err)?;
                    let min = parse_glsl_float(&caps[2]).map_err(&directive_err)?;
                    let max = parse_glsl_float(&caps[3]).map_err(&directive_err)?;
                    match ControlTag::parse(var_name) {
                        Some(tag) => directives.push(Directive::Range {
                            tag,
                            value,
                            min,
                            max,
                        }),
                        None => warn!(shader = name, uniform = var_name, "iUniform name matches no control tag; skipping"),
                    }
                }
                // Color and translate declarations exist for editor preview
                // compatibility; the engine supplies those uniforms itself.
                "vec2" | "vec3" | "color3" => {}
                other => {
                    return Err(PreprocessError::UnsupportedUniformType {
                        shader: name.to_string(),
                        ty: other.to_string(),
                    });
                }
            }
        }
        Ok(output)
    }

    // `#pragma` directives. Recognized prefixes are parsed and consumed;
    // anything else passes through untouched, per shader-language convention.
    fn parse_pragmas(
        &self,
        name: &str,
        body: &str,
        base_dir: &Path,
        directives: &mut Vec<Directive>,
    ) -> Result<(String, TranslateMode), PreprocessError> {
        let mut output = String::with_capacity(body.len());
        let mut translate_mode = TranslateMode::Normal;

        for line in body.lines() {
            let trimmed = line.trim_start();
            if !trimmed.starts_with("#pragma") {
                output.push_str(line);
                output.push('\n');
                continue;
            }
            let tokens: Vec<&str> = trimmed
                .split(|c: char| c.is_whitespace() || c == '(' || c == ')')
                .filter(|t| !t.is_empty())
                .skip(1)
                .collect();
            let Some(head) = tokens.first() else {
                output.push_str(line);
                output.push('\n');
                continue;
            };

            let lowered = head.to_ascii_lowercase();
            let directive_err = |message: String| PreprocessError::Directive {
                shader: name.to_string(),
                text: trimmed.to_string(),
                message,
            };

            if lowered.starts_with("tecontrol.") {
                let directive = parse_control(&tokens).map_err(&directive_err)?;
                if let Directive::TranslateMode(mode) = directive {
                    translate_mode = mode;
                }
                directives.push(directive);
            } else if lowered.starts_with("ichannel") {
                directives.push(self.parse_texture(name, &tokens, base_dir)?);
            } else if lowered == "name" {
                let class = tokens
                    .get(1)
                    .ok_or_else(|| directive_err("missing class name".into()))?;
                directives.push(Directive::ClassName(cleanup(class)));
            } else if lowered == "lxcategory" {
                if tokens.len() < 2 {
                    return Err(directive_err("missing category name".into()));
                }
                // Spaces are permissible in category names.
                directives.push(Directive::Category(cleanup(&tokens[1..].join(" "))));
            } else if lowered == "auto" {
                directives.push(Directive::Auto);
            } else {
                output.push_str(line);
                output.push('\n');
            }
        }
        Ok((output, translate_mode))
    }

    fn parse_texture(
        &self,
        name: &str,
        tokens: &[&str],
        base_dir: &Path,
    ) -> Result<Directive, PreprocessError> {
        let directive_err = |message: String| PreprocessError::Directive {
            shader: name.to_string(),
            text: tokens.join(" "),
            message,
        };
        let channel = tokens[0]
            .chars()
            .last()
            .and_then(|c| c.to_digit(10))
            .ok_or_else(|| directive_err("channel number must be a single digit".into()))?
            as u8;
        if channel == 0 {
            return Err(PreprocessError::ReservedChannel {
                shader: name.to_string(),
            });
        }
        let raw = tokens
            .get(1)
            .ok_or_else(|| directive_err("missing texture file name".into()))?;
        let path = self.resolve_file_token(raw, base_dir);
        if !path.exists() {
            return Err(PreprocessError::TextureMissing {
                shader: name.to_string(),
                path,
            });
        }
        Ok(Directive::Texture { channel, path })
    }

    /// Resolves a quoted or `<bracketed>` file reference. Bracketed names
    /// resolve against the resource root; quoted names against the shader's
    /// own directory.
    fn resolve_file_token(&self, raw: &str, base_dir: &Path) -> PathBuf {
        let cleaned = cleanup(raw);
        if let Some(inner) = cleaned
            .strip_prefix('<')
            .and_then(|rest| rest.strip_suffix('>'))
        {
            return self.resource_root.join(cleanup(inner));
        }
        let path = PathBuf::from(&cleaned);
        if path.is_absolute() {
            path
        } else {
            base_dir.join(path)
        }
    }
}

fn parse_control(tokens: &[&str]) -> Result<Directive, String> {
    let parts: Vec<&str> = tokens[0].split('.').collect();
    let target = parts
        .get(1)
        .ok_or_else(|| "missing control name".to_string())?;

    // TranslateMode changes which template define is injected and how
    // XPOS/YPOS are interpreted, so it is handled apart from ordinary
    // control configuration.
    if target.eq_ignore_ascii_case("translatemode") {
        let mode = parts
            .get(2)
            .copied()
            .or_else(|| tokens.get(1).copied())
            .ok_or_else(|| "missing translate mode".to_string())?;
        return match mode.to_ascii_uppercase().as_str() {
            "NORMAL" => Ok(Directive::TranslateMode(TranslateMode::Normal)),
            "DRIFT" => Ok(Directive::TranslateMode(TranslateMode::Drift)),
            other => Err(format!("unknown translate mode: {other}")),
        };
    }

    let tag =
        ControlTag::parse(target).ok_or_else(|| format!("unknown control tag: {target}"))?;
    let op = parts
        .get(2)
        .ok_or_else(|| "missing configuration operation".to_string())?;

    match *op {
        "Value" => Ok(Directive::Value {
            tag,
            value: parse_arg(tokens)?,
        }),
        "Range" => {
            let joined = tokens[1..].concat();
            let range: Vec<f64> = joined
                .split(',')
                .filter(|s| !s.is_empty())
                .map(parse_glsl_float)
                .collect::<Result<_, _>>()?;
            if range.len() != 3 {
                return Err(format!("invalid range specification: {joined}"));
            }
            Ok(Directive::Range {
                tag,
                value: range[0],
                min: range[1],
                max: range[2],
            })
        }
        "Label" => {
            if tokens.len() < 2 {
                return Err("missing label".to_string());
            }
            Ok(Directive::Label {
                tag,
                label: cleanup(&tokens[1..].join(" ")),
            })
        }
        "Exponent" => Ok(Directive::Exponent {
            tag,
            exponent: parse_arg(tokens)?,
        }),
        "NormalizationCurve" => {
            let curve = tokens
                .get(1)
                .ok_or_else(|| "missing curve name".to_string())?;
            Ok(Directive::NormalizationCurve {
                tag,
                curve: NormalizationCurve::parse(curve)
                    .ok_or_else(|| format!("unknown normalization curve: {curve}"))?,
            })
        }
        "Disable" => Ok(Directive::Disable { tag }),
        other => Err(format!("unknown configuration operation: {other}")),
    }
}

fn parse_arg(tokens: &[&str]) -> Result<f64, String> {
    let raw = tokens
        .get(1)
        .ok_or_else(|| "missing argument".to_string())?;
    parse_glsl_float(raw)
}

/// Parses a float written in GLSL notation (`.5`, `1.`, `-0.25`).
fn parse_glsl_float(raw: impl AsRef<str>) -> Result<f64, String> {
    let s = raw.as_ref().trim();
    let normalized = if let Some(rest) = s.strip_prefix("-.") {
        format!("-0.{rest}")
    } else if let Some(rest) = s.strip_prefix('.') {
        format!("0.{rest}")
    } else if s.ends_with('.') {
        format!("{s}0")
    } else {
        s.to_string()
    };
    normalized
        .parse::<f64>()
        .map_err(|_| format!("invalid number: {s}"))
}

fn cleanup(raw: &str) -> String {
    let trimmed = raw.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(trimmed);
    unquoted.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn preprocessor() -> Preprocessor {
        Preprocessor::new("resources/shaders")
    }

    fn process(source: &str) -> ProcessedShader {
        preprocessor()
            .process_source("test", source, Path::new("."))
            .expect("source should preprocess")
    }

    #[test]
    fn range_pragma_parses_with_spaces() {
        let shader = process("#pragma TEControl.SIZE.Range(5, 1, 10)\nvoid mainImage(out vec4 c, in vec2 f) {}\n");
        assert_eq!(
            shader.directives,
            vec![Directive::Range {
                tag: ControlTag::Size,
                value: 5.0,
                min: 1.0,
                max: 10.0,
            }]
        );
    }

    #[test]
    fn range_pragma_parses_without_spaces() {
        let shader = process("#pragma TEControl.XPOS.Range(0.07,-1.0,1.0)\n");
        assert_eq!(
            shader.directives,
            vec![Directive::Range {
                tag: ControlTag::XPos,
                value: 0.07,
                min: -1.0,
                max: 1.0,
            }]
        );
    }

    #[test]
    fn iuniform_maps_onto_control_tag() {
        let shader = process("#iUniform float iSpeed = 0.5 in {-4, 4}\n");
        assert_eq!(
            shader.directives,
            vec![Directive::Range {
                tag: ControlTag::Speed,
                value: 0.5,
                min: -4.0,
                max: 4.0,
            }]
        );
        assert!(!shader.body.contains("#iUniform"));
    }

    #[test]
    fn iuniform_glsl_style_literals() {
        let shader = process("#iUniform float iWow1=-.1 in{0.,1.}\n");
        assert_eq!(
            shader.directives,
            vec![Directive::Range {
                tag: ControlTag::Wow1,
                value: -0.1,
                min: 0.0,
                max: 1.0,
            }]
        );
    }

    #[test]
    fn iuniform_unknown_name_is_skipped() {
        let shader = process("#iUniform float bassLevel=0.in{0.,1.}\n");
        assert!(shader.directives.is_empty());
    }

    #[test]
    fn iuniform_vec_declarations_are_ignored() {
        let shader = process("#iUniform vec3 iColorRGB=vec3(.964,.144,.519)\n");
        assert!(shader.directives.is_empty());
    }

    #[test]
    fn iuniform_unsupported_type_is_rejected() {
        let err = preprocessor()
            .process_source("test", "#iUniform mat4 m = mat4(1.0)\n", Path::new("."))
            .unwrap_err();
        assert!(matches!(
            err,
            PreprocessError::UnsupportedUniformType { ref ty, .. } if ty == "mat4"
        ));
    }

    #[test]
    fn metadata_pragmas_parse() {
        let shader = process(
            "#pragma name \"TechnoChurch\"\n#pragma lxCategory \"Noise Patterns\"\n#pragma auto\n",
        );
        assert_eq!(shader.class_name(), Some("TechnoChurch"));
        assert_eq!(shader.category(), Some("Noise Patterns"));
        assert!(shader.is_auto());
        assert!(!shader.body.contains("#pragma name"));
    }

    #[test]
    fn unknown_pragmas_pass_through() {
        let shader = process("#pragma optimize(on)\n");
        assert!(shader.directives.is_empty());
        assert!(shader.body.contains("#pragma optimize(on)"));
    }

    #[test]
    fn unknown_control_tag_is_fatal() {
        let err = preprocessor()
            .process_source("test", "#pragma TEControl.FOO.Value(1)\n", Path::new("."))
            .unwrap_err();
        assert!(matches!(err, PreprocessError::Directive { .. }));
    }

    #[test]
    fn channel_zero_is_reserved() {
        let err = preprocessor()
            .process_source("test", "#pragma iChannel0 \"tex.png\"\n", Path::new("."))
            .unwrap_err();
        assert!(matches!(err, PreprocessError::ReservedChannel { .. }));
    }

    #[test]
    fn missing_texture_is_fatal() {
        let err = preprocessor()
            .process_source(
                "test",
                "#pragma iChannel1 \"definitely_missing.png\"\n",
                Path::new("."),
            )
            .unwrap_err();
        assert!(matches!(err, PreprocessError::TextureMissing { .. }));
    }

    #[test]
    fn texture_channel_binds_existing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("clouds.png"), [0u8; 4]).expect("write texture");
        let shader = preprocessor()
            .process_source("test", "#pragma iChannel2 \"clouds.png\"\n", dir.path())
            .expect("texture pragma should parse");
        let channels: Vec<_> = shader.channels().collect();
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].0, 2);
        assert!(channels[0].1.ends_with("clouds.png"));
    }

    #[test]
    fn drift_mode_injects_define() {
        let shader = process("#pragma TEControl.TranslateMode.DRIFT\nvoid mainImage(out vec4 c, in vec2 f) {}\n");
        assert_eq!(shader.translate_mode, TranslateMode::Drift);
        assert!(shader.body.starts_with("#define TE_NOTRANSLATE\n"));
    }

    #[test]
    fn normal_mode_is_default() {
        let shader = process("void mainImage(out vec4 c, in vec2 f) {}\n");
        assert_eq!(shader.translate_mode, TranslateMode::Normal);
        assert!(!shader.body.contains("TE_NOTRANSLATE"));
    }

    #[test]
    fn legacy_placeholder_becomes_custom_parameter() {
        let shader = process("float x = {%blur[0.5,0.,1.]};\nfloat y = {%blur};\n");
        assert_eq!(
            shader.directives,
            vec![Directive::CustomParameter(CustomParameter {
                name: "blur_custom".into(),
                kind: CustomKind::Float {
                    value: 0.5,
                    min: 0.0,
                    max: 1.0,
                },
            })]
        );
        assert!(shader.body.contains("float x = blur_custom;"));
        assert!(shader.body.contains("float y = blur_custom;"));
    }

    #[test]
    fn legacy_bool_placeholder() {
        let shader = process("if ({%invert[bool]}) {}\n");
        assert_eq!(
            shader.directives,
            vec![Directive::CustomParameter(CustomParameter {
                name: "invert_custom".into(),
                kind: CustomKind::Bool { value: false },
            })]
        );
    }

    #[test]
    fn includes_expand_with_line_markers() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("common.glsl"), "float common() { return 1.0; }\n")
            .expect("write include");
        let shader = preprocessor()
            .process_source(
                "test",
                "#include \"common.glsl\"\nvoid mainImage(out vec4 c, in vec2 f) {}\n",
                dir.path(),
            )
            .expect("include should expand");
        assert!(shader.body.contains("float common() { return 1.0; }"));
        assert!(shader.body.contains("#line 1"));
        assert!(shader.body.contains("#line 2"));
    }

    #[test]
    fn nested_includes_within_bound_expand() {
        let dir = tempfile::tempdir().expect("tempdir");
        // inc9 includes inc8 includes ... includes inc0: ten nesting levels.
        fs::write(dir.path().join("inc0.glsl"), "float leaf() { return 0.0; }\n")
            .expect("write leaf");
        for level in 1..10 {
            fs::write(
                dir.path().join(format!("inc{level}.glsl")),
                format!("#include \"inc{}.glsl\"\n", level - 1),
            )
            .expect("write include");
        }
        let shader = preprocessor()
            .process_source("test", "#include \"inc9.glsl\"\n", dir.path())
            .expect("ten levels should expand");
        assert!(shader.body.contains("float leaf() { return 0.0; }"));
    }

    #[test]
    fn include_depth_overflow_is_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("inc0.glsl"), "float leaf() { return 0.0; }\n")
            .expect("write leaf");
        for level in 1..12 {
            fs::write(
                dir.path().join(format!("inc{level}.glsl")),
                format!("#include \"inc{}.glsl\"\n", level - 1),
            )
            .expect("write include");
        }
        let err = preprocessor()
            .process_source("test", "#include \"inc11.glsl\"\n", dir.path())
            .unwrap_err();
        assert!(matches!(err, PreprocessError::IncludeDepth { .. }));
    }

    #[test]
    fn missing_include_is_fatal_with_line() {
        let err = preprocessor()
            .process_source("test", "// one\n#include \"nope.glsl\"\n", Path::new("."))
            .unwrap_err();
        match err {
            PreprocessError::Include { line, .. } => assert_eq!(line, 2),
            other => panic!("expected include error, got {other:?}"),
        }
    }
}
