use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::controls::TranslateMode;
use crate::error::PreprocessError;
use crate::preprocess::Preprocessor;

/// A loadable pattern synthesized from a self-describing shader file or an
/// explicit manifest entry. The host maps one of these onto a generic
/// shader-driven pattern implementation; there is no per-pattern code.
#[derive(Debug, Clone, Serialize)]
pub struct PatternDef {
    pub class_name: String,
    pub category: String,
    pub shader_path: PathBuf,
    pub drift: bool,
}

const DEFAULT_CATEGORY: &str = "Auto Shader";

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// Optional `patterns.toml` manifest: explicit registrations for shaders
/// that do not (or cannot) describe themselves.
#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    patterns: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    class_name: String,
    #[serde(default = "default_category")]
    category: String,
    shader: PathBuf,
    #[serde(default)]
    drift: bool,
}

/// Startup registry of every pattern the shader directory can supply.
#[derive(Debug, Default)]
pub struct PatternRegistry {
    patterns: Vec<PatternDef>,
    by_name: HashMap<String, usize>,
}

impl PatternRegistry {
    /// Scans `dir` for `*.fs` files, preprocessing each one far enough to
    /// decide whether it is self-describing. Files that fail to preprocess
    /// are logged and skipped; the pattern is unavailable rather than the
    /// scan failing. An optional `patterns.toml` in the directory registers
    /// shaders explicitly.
    pub fn scan(dir: &Path, preprocessor: &Preprocessor) -> Result<Self, PreprocessError> {
        let mut registry = Self::default();

        let entries = fs::read_dir(dir).map_err(|source| PreprocessError::Read {
            path: dir.to_path_buf(),
            source,
        })?;
        let mut shader_files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "fs"))
            .collect();
        shader_files.sort();

        for path in shader_files {
            let processed = match preprocessor.process_file(&path) {
                Ok(processed) => processed,
                Err(error) => {
                    warn!(shader = %path.display(), %error, "error scanning shader; skipping");
                    continue;
                }
            };
            if !processed.is_auto() {
                debug!(shader = %path.display(), "shader has no registration pragma; skipping");
                continue;
            }
            let class_name = processed
                .class_name()
                .map(str::to_owned)
                .unwrap_or_else(|| processed.name.clone());
            registry.insert(PatternDef {
                class_name,
                category: processed
                    .category()
                    .unwrap_or(DEFAULT_CATEGORY)
                    .to_string(),
                shader_path: path,
                drift: processed.translate_mode == TranslateMode::Drift,
            });
        }

        let manifest_path = dir.join("patterns.toml");
        if manifest_path.exists() {
            registry.load_manifest(dir, &manifest_path)?;
        }

        Ok(registry)
    }

    fn load_manifest(&mut self, dir: &Path, path: &Path) -> Result<(), PreprocessError> {
        let raw = fs::read_to_string(path).map_err(|source| PreprocessError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest: Manifest = toml::from_str(&raw).map_err(|error| {
            PreprocessError::Directive {
                shader: path.display().to_string(),
                text: String::new(),
                message: error.to_string(),
            }
        })?;
        for entry in manifest.patterns {
            let shader_path = if entry.shader.is_absolute() {
                entry.shader
            } else {
                dir.join(entry.shader)
            };
            if !shader_path.exists() {
                warn!(shader = %shader_path.display(), "manifest names a missing shader; skipping");
                continue;
            }
            self.insert(PatternDef {
                class_name: entry.class_name,
                category: entry.category,
                shader_path,
                drift: entry.drift,
            });
        }
        Ok(())
    }

    fn insert(&mut self, def: PatternDef) {
        if self.by_name.contains_key(&def.class_name) {
            warn!(pattern = %def.class_name, "duplicate pattern name; keeping the first");
            return;
        }
        self.by_name
            .insert(def.class_name.clone(), self.patterns.len());
        self.patterns.push(def);
    }

    pub fn get(&self, class_name: &str) -> Option<&PatternDef> {
        self.by_name
            .get(class_name)
            .map(|&index| &self.patterns[index])
    }

    pub fn iter(&self) -> impl Iterator<Item = &PatternDef> {
        self.patterns.iter()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_shader(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).expect("write shader");
    }

    #[test]
    fn scan_registers_self_describing_shaders() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_shader(
            dir.path(),
            "fire.fs",
            "#pragma auto\nvoid mainImage(out vec4 c, in vec2 f) {}\n",
        );
        write_shader(
            dir.path(),
            "plain.fs",
            "void mainImage(out vec4 c, in vec2 f) {}\n",
        );
        write_shader(
            dir.path(),
            "named.fs",
            "#pragma name \"Fancy\"\n#pragma lxCategory \"Geometry\"\nvoid mainImage(out vec4 c, in vec2 f) {}\n",
        );

        let preprocessor = Preprocessor::new(dir.path());
        let registry = PatternRegistry::scan(dir.path(), &preprocessor).expect("scan");

        assert_eq!(registry.len(), 2);
        let fire = registry.get("fire").expect("fire registered");
        assert_eq!(fire.category, "Auto Shader");
        assert!(!fire.drift);
        let fancy = registry.get("Fancy").expect("named shader registered");
        assert_eq!(fancy.category, "Geometry");
        assert!(registry.get("plain").is_none());
    }

    #[test]
    fn broken_shader_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_shader(dir.path(), "bad.fs", "#pragma TEControl.FOO.Value(1)\n");
        write_shader(dir.path(), "good.fs", "#pragma auto\nvoid mainImage(out vec4 c, in vec2 f) {}\n");

        let preprocessor = Preprocessor::new(dir.path());
        let registry = PatternRegistry::scan(dir.path(), &preprocessor).expect("scan");
        assert_eq!(registry.len(), 1);
        assert!(registry.get("good").is_some());
    }

    #[test]
    fn drift_shaders_are_flagged() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_shader(
            dir.path(),
            "drifter.fs",
            "#pragma auto\n#pragma TEControl.TranslateMode.DRIFT\nvoid mainImage(out vec4 c, in vec2 f) {}\n",
        );
        let preprocessor = Preprocessor::new(dir.path());
        let registry = PatternRegistry::scan(dir.path(), &preprocessor).expect("scan");
        assert!(registry.get("drifter").expect("registered").drift);
    }

    #[test]
    fn manifest_adds_explicit_entries() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_shader(
            dir.path(),
            "plain.fs",
            "void mainImage(out vec4 c, in vec2 f) {}\n",
        );
        fs::write(
            dir.path().join("patterns.toml"),
            "[[patterns]]\nclass_name = \"Plain\"\nshader = \"plain.fs\"\ncategory = \"Hand Rolled\"\n",
        )
        .expect("write manifest");

        let preprocessor = Preprocessor::new(dir.path());
        let registry = PatternRegistry::scan(dir.path(), &preprocessor).expect("scan");
        let plain = registry.get("Plain").expect("manifest entry registered");
        assert_eq!(plain.category, "Hand Rolled");
    }

    #[test]
    fn duplicate_names_keep_first() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_shader(
            dir.path(),
            "a.fs",
            "#pragma name \"Same\"\nvoid mainImage(out vec4 c, in vec2 f) {}\n",
        );
        write_shader(
            dir.path(),
            "b.fs",
            "#pragma name \"Same\"\n#pragma lxCategory \"Other\"\nvoid mainImage(out vec4 c, in vec2 f) {}\n",
        );
        let preprocessor = Preprocessor::new(dir.path());
        let registry = PatternRegistry::scan(dir.path(), &preprocessor).expect("scan");
        assert_eq!(registry.len(), 1);
        let def = registry.get("Same").expect("registered");
        assert!(def.shader_path.ends_with("a.fs"));
    }
}
