//! Per-frame orchestration of the voxel cone tracing pipeline.

use glam::{UVec2, Vec2};

use crate::assets::AssetProvider;
use crate::error::ConfigError;
use crate::scene::{Camera, Scene};
use crate::time::FrameStats;

use super::blit::Blitter;
use super::common::{color_attachment, CameraBinding, MAIN_CLEAR_COLOR, MAIN_TARGET_FORMAT};
use super::cone_tracing::ConeTracingStage;
use super::gbuffer::GBufferStage;
use super::plan::{DisplayMode, FrameInputs, FramePlan, GBufferReady, PassKind, ShadowsReady, VoxelGridReady};
use super::resolution::ResolutionMapper;
use super::shadow::ShadowStage;
use super::targets::ColorTarget;
use super::visualize::{GBufferTiles, ShadowVisualizer, VoxelVisualizer};
use super::voxel_grid::{VoxelGrid, VoxelGridOps, VoxelGridSelection, VOXEL_GRID_RESOLUTIONS};
use super::voxelize::{VoxelizationSettings, VoxelizationStage};
use super::{RenderCtx, RenderTarget};

/// Startup configuration of a [`Renderer`].
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    /// Size of the shaded image before it is fitted into the window.
    pub internal_size: UVec2,
    pub display_mode: DisplayMode,
    /// Index into [`VOXEL_GRID_RESOLUTIONS`].
    pub voxel_resolution_index: usize,
    pub voxelization: VoxelizationSettings,
    pub show_gbuffer_tiles: bool,
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            internal_size: UVec2::new(1024, 1024),
            display_mode: DisplayMode::Scene,
            voxel_resolution_index: super::voxel_grid::DEFAULT_VOXEL_GRID_RESOLUTION_INDEX,
            voxelization: VoxelizationSettings::default(),
            show_gbuffer_tiles: false,
            fov_y_degrees: 45.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl RendererConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_internal_size(self.internal_size)?;
        VoxelGridSelection::new(self.voxel_resolution_index).map(|_| ())
    }
}

fn check_internal_size(size: UVec2) -> Result<(), ConfigError> {
    if size.x == 0 || size.y == 0 {
        return Err(ConfigError::EmptyInternalResolution { width: size.x, height: size.y });
    }
    Ok(())
}

struct Stages {
    shadow: ShadowStage,
    voxelize: VoxelizationStage,
    gbuffer: GBufferStage,
    cone_tracing: ConeTracingStage,
    voxel_view: VoxelVisualizer,
    shadow_view: ShadowVisualizer,
    gbuffer_tiles: GBufferTiles,
}

/// Owns every GPU resource of the pipeline and decides, each frame, which
/// passes run.
pub struct Renderer {
    mapper: ResolutionMapper,
    camera: Camera,
    display_mode: DisplayMode,
    selection: VoxelGridSelection,
    voxelization: VoxelizationSettings,
    show_gbuffer_tiles: bool,
    stats: FrameStats,

    camera_binding: CameraBinding,
    main: ColorTarget,
    grid_ops: VoxelGridOps,
    /// One grid per entry of `VOXEL_GRID_RESOLUTIONS`.
    grids: Vec<VoxelGrid>,
    stages: Stages,
    blitter: Blitter,
}

impl Renderer {
    pub fn new(ctx: &RenderCtx<'_>, assets: &dyn AssetProvider, config: RendererConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let selection = VoxelGridSelection::new(config.voxel_resolution_index)?;
        let device = ctx.device;
        let size = config.internal_size;

        let grid_ops = VoxelGridOps::new(device);
        let grids: Vec<VoxelGrid> =
            VOXEL_GRID_RESOLUTIONS.iter().map(|&res| VoxelGrid::new(device, &grid_ops, res)).collect();

        // Fresh grids show the corner markers until the first voxelization.
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("vxgi voxel grid init"),
        });
        for grid in &grids {
            grid.clear(&grid_ops, &mut encoder);
            grid.fill_corners(&grid_ops, &mut encoder);
        }
        ctx.queue.submit(Some(encoder.finish()));

        let camera_binding = CameraBinding::new(device);
        let stages = Stages {
            shadow: ShadowStage::new(device, assets),
            voxelize: VoxelizationStage::new(device, assets),
            gbuffer: GBufferStage::new(device, &camera_binding, assets, size),
            cone_tracing: ConeTracingStage::new(device, &grid_ops),
            voxel_view: VoxelVisualizer::new(device, &camera_binding, &grid_ops, size),
            shadow_view: ShadowVisualizer::new(device),
            gbuffer_tiles: GBufferTiles::new(device),
        };

        let aspect = size.x as f32 / size.y as f32;
        let camera = Camera::perspective(config.fov_y_degrees, aspect, config.near, config.far);

        log::info!(
            "renderer created: internal {}x{}, voxel grid {}³, mode {}",
            size.x,
            size.y,
            selection.resolution(),
            config.display_mode
        );

        Ok(Self {
            mapper: ResolutionMapper::new(ctx.surface_size.as_vec2(), size.as_vec2()),
            camera,
            display_mode: config.display_mode,
            selection,
            voxelization: config.voxelization,
            show_gbuffer_tiles: config.show_gbuffer_tiles,
            stats: FrameStats::default(),
            camera_binding,
            main: ColorTarget::new(device, "vxgi main target", size, MAIN_TARGET_FORMAT),
            grid_ops,
            grids,
            stages,
            blitter: Blitter::new(),
        })
    }

    /// Runs one frame: optional revoxelization, the display mode's passes,
    /// then the blit into `target`.
    pub fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        scene: &mut Scene,
        assets: &dyn AssetProvider,
        dt: f32,
    ) {
        self.stats.record(dt);
        if ctx.surface_size.as_vec2() != self.mapper.window_size() {
            self.on_window_resized(ctx.surface_size.x, ctx.surface_size.y);
        }

        self.camera.update();
        self.camera_binding.write(ctx.queue, &self.camera);

        let plan = FramePlan::new(FrameInputs {
            mode: self.display_mode,
            voxelization_pending: self.selection.is_voxelization_pending(),
            show_gbuffer_tiles: self.show_gbuffer_tiles,
            has_lights: !scene.lights.directional.is_empty(),
        });

        {
            let _clear = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("vxgi main clear"),
                color_attachments: &[color_attachment(&self.main.view, wgpu::LoadOp::Clear(MAIN_CLEAR_COLOR))],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }

        let grid = &self.grids[self.selection.index()];
        let mut frame = Frame {
            device: ctx.device,
            queue: ctx.queue,
            encoder: &mut *target.encoder,
            scene,
            assets,
            stages: &mut self.stages,
            grid_ops: &self.grid_ops,
            grid,
            selection: &mut self.selection,
            voxelization: &self.voxelization,
            camera: &self.camera,
            camera_binding: &self.camera_binding,
            main: &self.main,
            show_gbuffer_tiles: self.show_gbuffer_tiles,
            executed: Vec::with_capacity(plan.passes.len()),
        };

        if plan.revoxelize {
            log::debug!("revoxelizing at {}³", grid.resolution);
            let shadows = frame.shadow_maps();
            frame.voxelize(&shadows);
        }
        strategy(self.display_mode).execute(&mut frame);
        let mut executed = frame.executed;

        self.blitter.blit(ctx, target, &self.main, self.mapper.viewport());
        executed.push(PassKind::Blit);

        debug_assert_eq!(executed, plan.passes, "frame passes diverged from plan");
        log::trace!("frame {:?} in {:.2} ms", executed, dt * 1000.0);
    }

    // ── control surface ───────────────────────────────────────────────────

    #[inline]
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    #[inline]
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    #[inline]
    pub fn display_mode(&self) -> DisplayMode {
        self.display_mode
    }

    pub fn set_display_mode(&mut self, mode: DisplayMode) {
        if mode != self.display_mode {
            log::info!("display mode: {mode}");
            self.display_mode = mode;
        }
    }

    /// Re-runs voxelization on the next frame.
    pub fn request_revoxelization(&mut self) {
        self.selection.request_revoxelization();
    }

    #[inline]
    pub fn is_voxelization_pending(&self) -> bool {
        self.selection.is_voxelization_pending()
    }

    /// Switches the active grid. Out-of-range indices leave the renderer untouched.
    pub fn set_voxel_grid_resolution(&mut self, index: usize) -> Result<(), ConfigError> {
        self.selection.set_resolution_index(index)
    }

    #[inline]
    pub fn voxel_grid_resolution(&self) -> u32 {
        self.selection.resolution()
    }

    #[inline]
    pub fn voxelization_settings(&self) -> VoxelizationSettings {
        self.voxelization
    }

    /// Replaces the voxelization tunables; any change re-arms voxelization.
    pub fn set_voxelization_settings(&mut self, settings: VoxelizationSettings) {
        if settings != self.voxelization {
            self.voxelization = settings;
            self.selection.request_revoxelization();
        }
    }

    #[inline]
    pub fn show_gbuffer_tiles(&self) -> bool {
        self.show_gbuffer_tiles
    }

    pub fn set_show_gbuffer_tiles(&mut self, show: bool) {
        self.show_gbuffer_tiles = show;
    }

    /// Refits the viewport. Internal targets keep their size.
    pub fn on_window_resized(&mut self, width: u32, height: u32) {
        self.mapper.window_resized(width, height);
        log::debug!("window {width}x{height}, viewport {:?}", self.mapper.viewport());
    }

    /// Reallocates every internal-resolution target and refits the viewport.
    pub fn set_internal_resolution(&mut self, device: &wgpu::Device, width: u32, height: u32) -> Result<(), ConfigError> {
        let size = UVec2::new(width, height);
        check_internal_size(size)?;
        if size == self.main.size {
            return Ok(());
        }

        self.main = ColorTarget::new(device, "vxgi main target", size, MAIN_TARGET_FORMAT);
        self.stages.gbuffer.resize(device, size);
        self.stages.voxel_view.resize(device, size);
        self.stages.cone_tracing.invalidate_gbuffer();

        self.mapper.set(self.mapper.window_size(), Vec2::new(width as f32, height as f32));
        self.mapper.rescale_to_fit();
        self.camera.set_aspect(width as f32 / height as f32);
        log::info!("internal resolution {width}x{height}");
        Ok(())
    }

    #[inline]
    pub fn resolution(&self) -> &ResolutionMapper {
        &self.mapper
    }

    #[inline]
    pub fn frame_stats(&self) -> &FrameStats {
        &self.stats
    }
}

// ── frame ─────────────────────────────────────────────────────────────────

/// Everything a display mode needs to encode its passes for one frame.
pub(crate) struct Frame<'f> {
    device: &'f wgpu::Device,
    queue: &'f wgpu::Queue,
    encoder: &'f mut wgpu::CommandEncoder,
    scene: &'f mut Scene,
    assets: &'f dyn AssetProvider,
    stages: &'f mut Stages,
    grid_ops: &'f VoxelGridOps,
    grid: &'f VoxelGrid,
    selection: &'f mut VoxelGridSelection,
    voxelization: &'f VoxelizationSettings,
    camera: &'f Camera,
    camera_binding: &'f CameraBinding,
    main: &'f ColorTarget,
    show_gbuffer_tiles: bool,
    executed: Vec<PassKind>,
}

impl Frame<'_> {
    fn shadow_maps(&mut self) -> ShadowsReady {
        self.executed.push(PassKind::ShadowMaps);
        let models = self.scene.models().to_vec();
        self.stages.shadow.render_dirty(
            self.device,
            self.queue,
            self.encoder,
            &mut self.scene.lights,
            &models,
            self.assets,
        )
    }

    fn voxelize(&mut self, shadows: &ShadowsReady) -> VoxelGridReady {
        self.executed.push(PassKind::Voxelize);
        self.stages.voxelize.voxelize(
            self.device,
            self.queue,
            self.encoder,
            self.grid,
            self.grid_ops,
            self.selection,
            self.scene,
            self.assets,
            (&self.stages.shadow, shadows),
            self.voxelization,
        )
    }

    /// Proof that the active grid is current, if no voxelization is pending.
    fn voxel_grid(&self) -> Option<VoxelGridReady> {
        self.selection.grid_ready()
    }

    fn gbuffer(&mut self) -> GBufferReady {
        self.executed.push(PassKind::GBuffer);
        self.stages.gbuffer.render(self.encoder, self.camera_binding, self.scene.models(), self.assets)
    }

    fn cone_tracing(&mut self, shadows: &ShadowsReady, grid: &VoxelGridReady, gbuffer: &GBufferReady) {
        self.executed.push(PassKind::ConeTracing);
        let Stages { shadow, gbuffer: gbuffer_stage, cone_tracing, .. } = &mut *self.stages;
        cone_tracing.trace(
            self.device,
            self.queue,
            self.encoder,
            &self.main.view,
            self.scene,
            self.camera.position,
            (&*shadow, shadows),
            (self.grid, grid),
            (gbuffer_stage.targets(), gbuffer),
        );
    }

    fn gbuffer_tiles(&mut self, _gbuffer: &GBufferReady) {
        self.executed.push(PassKind::GBufferTiles);
        let Stages { gbuffer, gbuffer_tiles, .. } = &mut *self.stages;
        gbuffer_tiles.render(self.device, self.encoder, self.main, gbuffer.targets());
    }

    fn voxel_cube_faces(&mut self) {
        self.executed.push(PassKind::VoxelCubeFaces);
        let view = &self.stages.voxel_view;
        view.prepare(
            self.queue,
            self.camera.position,
            self.scene.voxel_scale(),
            self.grid,
            self.voxelization.visualize_mipmap_level,
        );
        view.render_cube_faces(self.encoder, self.camera_binding);
    }

    fn voxel_visualize(&mut self) {
        self.executed.push(PassKind::VoxelVisualize);
        self.stages.voxel_view.render_grid(self.encoder, &self.main.view, self.grid);
    }

    fn shadow_visualize(&mut self, shadows: &ShadowsReady) {
        self.executed.push(PassKind::ShadowVisualize);
        let Stages { shadow, shadow_view, .. } = &mut *self.stages;
        shadow_view.render(self.device, self.encoder, &self.main.view, (&*shadow, shadows));
    }
}

// ── display modes ─────────────────────────────────────────────────────────

/// Encodes the passes of one display mode.
pub(crate) trait DisplayPass {
    fn execute(&self, frame: &mut Frame<'_>);
}

struct ShadedScene;
struct VoxelizedScene;
struct ShadowMapView;

impl DisplayPass for ShadedScene {
    fn execute(&self, frame: &mut Frame<'_>) {
        let shadows = frame.shadow_maps();
        let gbuffer = frame.gbuffer();
        match frame.voxel_grid() {
            Some(grid) => frame.cone_tracing(&shadows, &grid, &gbuffer),
            None => log::warn!("voxel grid not ready; skipping cone tracing"),
        }
        if frame.show_gbuffer_tiles {
            frame.gbuffer_tiles(&gbuffer);
        }
    }
}

impl DisplayPass for VoxelizedScene {
    fn execute(&self, frame: &mut Frame<'_>) {
        frame.voxel_cube_faces();
        frame.voxel_visualize();
    }
}

impl DisplayPass for ShadowMapView {
    fn execute(&self, frame: &mut Frame<'_>) {
        let shadows = frame.shadow_maps();
        if !frame.scene.lights.directional.is_empty() {
            frame.shadow_visualize(&shadows);
        }
    }
}

fn strategy(mode: DisplayMode) -> &'static dyn DisplayPass {
    match mode {
        DisplayMode::Scene => &ShadedScene,
        DisplayMode::VoxelizedScene => &VoxelizedScene,
        DisplayMode::ShadowMap => &ShadowMapView,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = RendererConfig::default();
        assert_eq!(config.internal_size, UVec2::new(1024, 1024));
        assert_eq!(config.display_mode, DisplayMode::Scene);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_internal_size_is_rejected() {
        let config = RendererConfig { internal_size: UVec2::new(0, 720), ..Default::default() };
        assert_eq!(config.validate(), Err(ConfigError::EmptyInternalResolution { width: 0, height: 720 }));
    }

    #[test]
    fn out_of_range_voxel_index_is_rejected() {
        let config = RendererConfig { voxel_resolution_index: 9, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::VoxelResolutionOutOfRange { index: 9, .. })));
    }
}
