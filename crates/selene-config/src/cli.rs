//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Selene command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "selene", about = "Cube-sphere terrain LOD driver")]
pub struct CliArgs {
    /// Viewport height in pixels.
    #[arg(long)]
    pub height: Option<u32>,

    /// Vertical field of view in degrees.
    #[arg(long)]
    pub fov: Option<f64>,

    /// Body radius in meters.
    #[arg(long)]
    pub radius: Option<f64>,

    /// Heightmap image (16-bit grayscale, equirectangular).
    #[arg(long)]
    pub heightmap: Option<PathBuf>,

    /// Deepest quadtree level.
    #[arg(long)]
    pub max_depth: Option<u32>,

    /// New patches allowed per frame.
    #[arg(long)]
    pub split_budget: Option<u32>,

    /// Frames to simulate.
    #[arg(long)]
    pub frames: Option<u32>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Drive a real GPU adapter instead of the in-memory device.
    #[arg(long)]
    pub wgpu: bool,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(h) = args.height {
            self.window.height = h;
        }
        if let Some(fov) = args.fov {
            self.camera.fov_y_degrees = fov;
        }
        if let Some(radius) = args.radius {
            self.body.radius_m = radius;
        }
        if let Some(ref path) = args.heightmap {
            self.body.heightmap = Some(path.clone());
        }
        if let Some(depth) = args.max_depth {
            self.lod.max_depth = depth;
        }
        if let Some(budget) = args.split_budget {
            self.lod.max_splits_per_frame = budget;
        }
        if let Some(frames) = args.frames {
            self.camera.frames = frames;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
