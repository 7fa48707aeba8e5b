use std::path::PathBuf;

use thiserror::Error;

/// Failures raised while turning raw shader text into a processed shader.
///
/// Every variant carries enough context to point at the offending file and,
/// where line numbers survive the transformation, the line. A preprocessing
/// failure aborts construction of the owning shader; partial shaders are
/// never produced.
#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("{shader}:{line}: #include depth exceeds {max_depth}")]
    IncludeDepth {
        shader: String,
        line: usize,
        max_depth: usize,
    },

    #[error("{shader}:{line}: cannot read include `{path}`: {source}")]
    Include {
        shader: String,
        line: usize,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{shader}: error in `{text}`: {message}")]
    Directive {
        shader: String,
        text: String,
        message: String,
    },

    #[error("{shader}: iChannel0 is reserved for system audio; use channels 1-9 for textures")]
    ReservedChannel { shader: String },

    #[error("{shader}: texture file `{path}` not found")]
    TextureMissing { shader: String, path: PathBuf },

    #[error("{shader}: iUniform data type `{ty}` is not supported")]
    UnsupportedUniformType { shader: String, ty: String },

    #[error("cannot read shader `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
