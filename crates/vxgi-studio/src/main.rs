//! Interactive voxel cone tracing viewer.

mod controls;
mod scenes;
mod tuning;
mod viewer;

use std::path::PathBuf;

use clap::Parser;
use glam::UVec2;

use vxgi_engine::device::GpuInit;
use vxgi_engine::logging::{init_logging, LoggingConfig};
use vxgi_engine::render::{RendererConfig, DEFAULT_VOXEL_GRID_RESOLUTION_INDEX};
use vxgi_engine::scene::SceneConfig;
use vxgi_engine::window::{Runtime, RuntimeConfig};

use viewer::Viewer;

#[derive(Debug, Parser)]
#[command(name = "vxgi-studio", version, about = "Real-time voxel cone tracing viewer")]
struct Args {
    /// Scene preset (cornell, courtyard).
    #[arg(long, default_value = "cornell")]
    scene: String,

    /// Width of the internal render target.
    #[arg(long, default_value_t = 1024)]
    internal_width: u32,

    /// Height of the internal render target.
    #[arg(long, default_value_t = 1024)]
    internal_height: u32,

    /// Voxel grid resolution index: 0 = 64³, 1 = 128³, 2 = 256³, 3 = 512³.
    #[arg(long, default_value_t = DEFAULT_VOXEL_GRID_RESOLUTION_INDEX)]
    voxel_resolution: usize,

    /// Directory with material maps (`stone.png`, `ground.png`); procedural
    /// patterns are used when omitted.
    #[arg(long)]
    textures: Option<PathBuf>,

    /// Log filter in env_logger syntax; overrides RUST_LOG.
    #[arg(long)]
    log: Option<String>,
}

fn run(args: Args) -> anyhow::Result<()> {
    if !SceneConfig::PRESETS.contains(&args.scene.as_str()) {
        log::warn!("unknown scene '{}' (available: {})", args.scene, SceneConfig::PRESETS.join(", "));
    }

    let config = RendererConfig {
        internal_size: UVec2::new(args.internal_width, args.internal_height),
        voxel_resolution_index: args.voxel_resolution,
        ..RendererConfig::default()
    };
    config.validate()?;

    let runtime = RuntimeConfig { title: "vxgi".to_string(), ..RuntimeConfig::default() };
    Runtime::run(runtime, GpuInit::default(), Viewer::new(args.scene, args.textures, config))
}

fn main() {
    let args = Args::parse();
    init_logging(LoggingConfig { env_filter: args.log.clone(), ..LoggingConfig::default() });

    if let Err(err) = run(args) {
        log::error!("{err:#}");
        std::process::exit(1);
    }
}
