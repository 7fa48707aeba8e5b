use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "pointshader",
    author,
    version,
    about = "Headless driver for LED pattern shaders",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan a shader directory and list the pattern registry.
    List {
        /// Directory containing `.fs` pattern shaders.
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        /// Emit the registry as JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Render frames of one pattern against a synthetic grid model.
    Render {
        /// Directory containing `.fs` pattern shaders.
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        /// Pattern name as listed by `list`.
        #[arg(value_name = "PATTERN")]
        pattern: String,

        /// Number of frames to render.
        #[arg(long, default_value_t = 120)]
        frames: u32,

        /// Canvas resolution (e.g. `256x256`).
        #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size, default_value = "256x256")]
        size: (u32, u32),

        /// Synthetic model grid dimensions (e.g. `32x16`).
        #[arg(long, value_name = "COLSxROWS", value_parser = parse_size, default_value = "32x32")]
        grid: (u32, u32),

        /// Beats per minute driving the beat-phase uniform.
        #[arg(long, default_value_t = 120.0)]
        bpm: f64,

        /// Write the final frame's per-point colors as a PNG.
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
}

fn parse_size(raw: &str) -> Result<(u32, u32), String> {
    let (w, h) = raw
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got `{raw}`"))?;
    let width = w
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid width `{w}`"))?;
    let height = h
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid height `{h}`"))?;
    if width == 0 || height == 0 {
        return Err("dimensions must be non-zero".to_string());
    }
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_size_pairs() {
        assert_eq!(parse_size("256x128"), Ok((256, 128)));
        assert_eq!(parse_size("64X64"), Ok((64, 64)));
        assert!(parse_size("256").is_err());
        assert!(parse_size("0x10").is_err());
    }
}
