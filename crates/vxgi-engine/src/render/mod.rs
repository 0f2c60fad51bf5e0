//! GPU rendering subsystem.
//!
//! The [`Renderer`] owns every stage of the voxel cone tracing pipeline:
//! shadow maps, voxelization into a mipmapped 3D radiance grid, the G-buffer
//! pass, full-screen cone tracing and the debug visualizers. Each stage owns
//! its own GPU resources (pipelines, buffers, bind groups).
//!
//! Convention:
//! - Stages draw into an internal-resolution target; the blit pass fits it
//!   into the window through the [`ResolutionMapper`] viewport.
//! - Voxel space is the `[-1, 1]³` cube: world position times `voxel_scale`.

mod blit;
mod common;
mod cone_tracing;
mod ctx;
mod gbuffer;
#[cfg(test)]
mod gpu_tests;
mod plan;
mod renderer;
mod resolution;
mod shadow;
mod targets;
mod visualize;
mod voxel_grid;
mod voxelize;

pub use blit::WINDOW_CLEAR_COLOR;
pub use common::{DEPTH_FORMAT, GBUFFER_FORMAT, MAIN_CLEAR_COLOR, MAIN_TARGET_FORMAT, VOXEL_FORMAT};
pub use ctx::{RenderCtx, RenderTarget};
pub use plan::{DisplayMode, FrameInputs, FramePlan, GBufferReady, PassKind, ShadowsReady, VoxelGridReady};
pub use renderer::{Renderer, RendererConfig};
pub use resolution::ResolutionMapper;
pub use targets::{ColorTarget, DepthTarget, GBuffer, GBufferChannel};
pub use visualize::{channel_remap, gbuffer_tile_rects};
pub use voxel_grid::{
    DEFAULT_VOXEL_GRID_RESOLUTION_INDEX, VOXEL_GRID_RESOLUTIONS, VoxelGridSelection, is_corner_marker, max_mip_level,
    mip_dimension, mip_level_count, workgroups_for,
};
pub use voxelize::VoxelizationSettings;
