//! Headless LOD driver: flies a camera from orbit down to the surface of a
//! cube-sphere body and reports how the patch forest responds, without a window.
//!
//! Run with: `cargo run -p selene-headless -- --frames 120`
//! Add `--wgpu` to upload and draw on a real adapter into an offscreen target.

mod flight;

use std::collections::VecDeque;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use glam::Vec3;
use selene_config::{CliArgs, Config, WindowConfig, default_config_dir};
use selene_cubesphere::CubeFace;
use selene_lod::{DrawWalker, FrameStats, LodError, LodForest, LodParams};
use selene_render::{
    FenceValue, GpuDevice, HeadlessDevice, RecordingDrawRecorder, RenderContextError, TerrainPipeline,
    WgpuDrawList, init_headless_device_blocking,
};
use selene_terrain::{Heightfield, HeightmapImport, load_or_flat};
use tracing::{debug, error, info};

use crate::flight::DescentPath;

/// Frames the in-memory device trails behind submission.
const FRAMES_IN_FLIGHT: usize = 2;

/// Frames between progress lines.
const REPORT_INTERVAL: u32 = 30;

const SUN_DIRECTION: Vec3 = Vec3::new(1.0, 0.4, 0.2);

const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

#[derive(Debug, thiserror::Error)]
enum DriverError {
    #[error(transparent)]
    Lod(#[from] LodError),

    #[error(transparent)]
    RenderContext(#[from] RenderContextError),

    #[error("device reported {0} soundness violations")]
    Violations(usize),
}

/// Everything a run needs, resolved from config and CLI.
struct Scene {
    heightfield: Arc<dyn Heightfield>,
    params: LodParams,
    radius: f64,
    path: DescentPath,
    frames: u32,
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let config_dir = args.config.clone().or_else(default_config_dir);
    let mut config = match config_dir.as_deref() {
        Some(dir) => Config::load_or_create(dir).unwrap_or_else(|e| {
            eprintln!("Failed to load config: {e}, using defaults");
            Config::default()
        }),
        None => Config::default(),
    };
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.as_ref().map(|dir| dir.join("logs"));
    selene_log::init_logging(log_dir.as_deref(), cfg!(debug_assertions), Some(&config));

    info!(
        "Body: radius={:.1}km | LOD: max_depth={}, grid={}, budget={}/frame | {} frames",
        config.body.radius_m / 1000.0,
        config.lod.max_depth,
        config.lod.grid_resolution,
        config.lod.max_splits_per_frame,
        config.camera.frames,
    );

    let import = HeightmapImport {
        elevation_scale_m: config.body.elevation_scale_m,
        elevation_offset_m: config.body.elevation_offset_m,
    };
    let heightfield = load_or_flat(config.body.heightmap.as_deref(), &import);
    let scene = Scene {
        heightfield,
        params: LodParams::from(&config.lod),
        radius: config.body.radius_m,
        path: DescentPath::new(
            CubeFace::PosX.normal(),
            config.body.radius_m,
            &config.camera,
            &config.window,
        ),
        frames: config.camera.frames,
    };

    let result = if args.wgpu {
        run_wgpu(scene, &config.window)
    } else {
        run_headless(scene)
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Run failed: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Drive the forest against the in-memory device, retiring work a couple of
/// frames late the way a real queue would.
fn run_headless(scene: Scene) -> Result<(), DriverError> {
    let Scene {
        heightfield,
        params,
        radius,
        mut path,
        frames,
    } = scene;

    let mut device = HeadlessDevice::new();
    let mut forest = LodForest::new(&mut device, heightfield.clone(), radius, params)?;
    let mut recorder = RecordingDrawRecorder::new();
    let mut in_flight: VecDeque<FenceValue> = VecDeque::new();

    for frame in 0..frames {
        let camera = path.camera(heightfield.as_ref());
        let stats = forest.update(&mut device, &camera)?;

        recorder.clear();
        let walk = DrawWalker::new(camera.view_projection, camera.position, SUN_DIRECTION)
            .draw(&forest, &mut recorder);

        // Stands in for the frame's render submission.
        in_flight.push_back(device.submit_marker());
        while in_flight.len() > FRAMES_IN_FLIGHT {
            if let Some(fence) = in_flight.pop_front() {
                device.complete_through(fence);
            }
        }

        report_frame(frame, frames, path.altitude(), &stats, walk.drawn, &forest);
        path.advance();
    }

    let stats = forest.stats();
    forest.release_all_device_resources(&mut device)?;
    info!(
        "Done: {} meshes uploaded in {} batches ({:.1} MiB), peak {} live buffers",
        stats.uploads.meshes_uploaded,
        stats.uploads.batches_submitted,
        stats.uploads.bytes_uploaded as f64 / (1024.0 * 1024.0),
        device.peak_live_buffers(),
    );

    let violations = device.violations();
    for violation in violations {
        error!("Device violation: {violation:?}");
    }
    if violations.is_empty() {
        Ok(())
    } else {
        Err(DriverError::Violations(violations.len()))
    }
}

/// Drive the forest on a real adapter, drawing every frame into an offscreen target.
fn run_wgpu(scene: Scene, window: &WindowConfig) -> Result<(), DriverError> {
    let Scene {
        heightfield,
        params,
        radius,
        mut path,
        frames,
    } = scene;

    let mut gpu = init_headless_device_blocking()?;
    let size = wgpu::Extent3d {
        width: window.width.max(1),
        height: window.height.max(1),
        depth_or_array_layers: 1,
    };
    let color = create_target(gpu.device(), "offscreen-color", size, COLOR_FORMAT);
    let depth = create_target(gpu.device(), "offscreen-depth", size, DEPTH_FORMAT);
    let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());
    let depth_view = depth.create_view(&wgpu::TextureViewDescriptor::default());
    let mut pipeline = TerrainPipeline::new(gpu.device(), COLOR_FORMAT, Some(DEPTH_FORMAT));

    let mut forest = LodForest::new(&mut gpu, heightfield.clone(), radius, params)?;
    let mut draws = WgpuDrawList::new();
    let clear = wgpu::Color {
        r: 0.01,
        g: 0.01,
        b: 0.02,
        a: 1.0,
    };

    for frame in 0..frames {
        let camera = path.camera(heightfield.as_ref());
        let stats = forest.update(&mut gpu, &camera)?;

        draws.clear();
        let walk = DrawWalker::new(camera.view_projection, camera.position, SUN_DIRECTION)
            .draw(&forest, &mut draws);

        let mut encoder = gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("terrain-frame"),
            });
        pipeline.encode(&gpu, &mut encoder, &color_view, Some(&depth_view), clear, &draws);
        gpu.queue().submit([encoder.finish()]);

        report_frame(frame, frames, path.altitude(), &stats, walk.drawn, &forest);
        path.advance();
    }

    draws.clear();
    let stats = forest.stats();
    forest.release_all_device_resources(&mut gpu)?;
    info!(
        "Done: {} meshes uploaded in {} batches ({:.1} MiB)",
        stats.uploads.meshes_uploaded,
        stats.uploads.batches_submitted,
        stats.uploads.bytes_uploaded as f64 / (1024.0 * 1024.0),
    );
    Ok(())
}

fn create_target(
    device: &wgpu::Device,
    label: &str,
    size: wgpu::Extent3d,
    format: wgpu::TextureFormat,
) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    })
}

fn report_frame<D: GpuDevice>(
    frame: u32,
    frames: u32,
    altitude: f64,
    stats: &FrameStats,
    drawn: usize,
    forest: &LodForest<D>,
) {
    let forest_stats = forest.stats();
    if frame % REPORT_INTERVAL == 0 || frame + 1 == frames {
        info!(
            "Frame {frame}: altitude {:.1}km, {} leaves ({} drawn), depth {}, {:.1} MiB resident, {} awaiting destroy",
            altitude / 1000.0,
            forest_stats.leaf_count,
            drawn,
            forest_stats.max_depth,
            forest_stats.gpu_bytes as f64 / (1024.0 * 1024.0),
            forest_stats.deferred_backlog,
        );
    } else {
        debug!(
            "Frame {frame}: {} splits, {} merges, {} candidates, {} drawn",
            stats.splits, stats.merges, stats.candidates, drawn
        );
    }
}
