use std::path::PathBuf;

use anyhow::{Context, Result};
use winit::event::WindowEvent;

use vxgi_engine::assets::{AssetStore, MaterialId};
use vxgi_engine::core::{App, AppControl, FrameCtx, WindowCtx};
use vxgi_engine::device::Gpu;
use vxgi_engine::render::{max_mip_level, RenderCtx, Renderer, RendererConfig};
use vxgi_engine::scene::{distance_to_voxels, FlyCamera, Scene, SceneConfig, SceneLights};

use crate::controls::{self, Command};
use crate::scenes::{self, TextureSource};
use crate::tuning;

/// Seconds between window title refreshes.
const TITLE_INTERVAL: f32 = 0.5;

/// Fraction of the scene extent the camera covers per second.
const SPEED_PER_EXTENT: f32 = 0.4;

struct Session {
    assets: AssetStore,
    scene: Scene,
    renderer: Renderer,
    emitters: Vec<MaterialId>,
    fly: FlyCamera,
    base_speed: f32,
    looking: bool,
    title_timer: f32,
}

/// Interactive viewer: one scene, a fly camera and the renderer controls.
pub struct Viewer {
    scene_name: String,
    texture_dir: Option<PathBuf>,
    config: RendererConfig,
    session: Option<Session>,
}

impl Viewer {
    pub fn new(scene_name: String, texture_dir: Option<PathBuf>, config: RendererConfig) -> Self {
        Self { scene_name, texture_dir, config, session: None }
    }
}

impl App for Viewer {
    fn on_start(&mut self, window: &WindowCtx<'_>, gpu: &Gpu<'_>) -> Result<()> {
        let device = gpu.device();
        let queue = gpu.queue();

        let scene_config = SceneConfig::preset(&self.scene_name);
        let mut assets = AssetStore::new(device, queue);
        let textures = match &self.texture_dir {
            Some(dir) => TextureSource::Directory(dir),
            None => TextureSource::Procedural,
        };
        let built = scenes::build(&scene_config.name, &mut assets, device, queue, textures)
            .with_context(|| format!("failed to build scene '{}'", scene_config.name))?;
        let scene = Scene::from_store(&scene_config, &built.models, &mut assets, queue);

        let ctx = RenderCtx::new(device, queue, gpu.surface_format(), gpu.size());
        let mut renderer = Renderer::new(&ctx, &assets, self.config.clone())?;

        // Camera placement is authored in model units; the scene recenters and scales.
        let to_world = scene.model_transform().model_matrix();
        let fly = FlyCamera::looking_at(to_world.transform_point3(built.eye), to_world.transform_point3(built.target));
        fly.place(renderer.camera_mut());

        let base_speed = scene.world_bounds().extent().max_element() * SPEED_PER_EXTENT;
        log::info!("scene '{}' loaded, {} models", scene.name, scene.models().len());
        log::info!("controls:\n{}", controls::HELP);
        window.set_title(&format!("vxgi · {}", scene.name));

        self.session = Some(Session {
            assets,
            scene,
            renderer,
            emitters: built.emitters,
            fly,
            base_speed,
            looking: false,
            title_timer: 0.0,
        });
        Ok(())
    }

    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        if let (WindowEvent::Resized(size), Some(session)) = (event, self.session.as_mut()) {
            session.renderer.on_window_resized(size.width, size.height);
        }
        AppControl::Continue
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let Some(session) = self.session.as_mut() else {
            return AppControl::Continue;
        };
        let dt = ctx.time.dt;

        for command in controls::frame_commands(ctx.input_frame) {
            if session.apply(command, ctx.gpu.device(), ctx.gpu.queue()) == AppControl::Exit {
                return AppControl::Exit;
            }
        }

        let fly_input = controls::fly_input(ctx.input, ctx.input_frame);
        if fly_input.look != session.looking {
            session.looking = fly_input.look;
            ctx.window.set_mouse_look(fly_input.look);
        }
        session.fly.move_speed = session.base_speed * controls::speed_multiplier(ctx.input);
        session.fly.update(session.renderer.camera_mut(), fly_input, dt);

        let Session { assets, scene, renderer, .. } = &mut *session;
        let control = ctx.render(|rctx, target| renderer.render(rctx, target, scene, &*assets, dt));

        session.title_timer += dt;
        if session.title_timer >= TITLE_INTERVAL {
            session.title_timer = 0.0;
            let stats = session.renderer.frame_stats();
            ctx.window.set_title(&format!(
                "vxgi · {} · {} · {}³ · {:.0} fps ({:.2} ms)",
                session.scene.name,
                session.renderer.display_mode(),
                session.renderer.voxel_grid_resolution(),
                stats.fps(),
                stats.average_frame_ms(),
            ));
        }

        control
    }
}

impl Session {
    fn apply(&mut self, command: Command, device: &wgpu::Device, queue: &wgpu::Queue) -> AppControl {
        let Session { assets, scene, renderer, emitters, .. } = self;
        if apply_scene_command(scene, command, renderer.voxel_grid_resolution()).is_some() {
            return AppControl::Continue;
        }

        match command {
            Command::SetDisplayMode(mode) => renderer.set_display_mode(mode),
            Command::Revoxelize => renderer.request_revoxelization(),
            Command::SetVoxelResolution(index) => {
                if let Err(e) = renderer.set_voxel_grid_resolution(index) {
                    log::warn!("{e}");
                }
            }
            Command::ToggleGBufferTiles => renderer.set_show_gbuffer_tiles(!renderer.show_gbuffer_tiles()),
            Command::StepVisualizedMip(step) => {
                let mut settings = renderer.voxelization_settings();
                let max = max_mip_level(renderer.voxel_grid_resolution());
                settings.visualize_mipmap_level = settings.visualize_mipmap_level.saturating_add_signed(step).min(max);
                log::info!("visualized mip level: {}", settings.visualize_mipmap_level);
                renderer.set_voxelization_settings(settings);
            }
            Command::ToggleAmbientVoxelization => {
                let mut settings = renderer.voxelization_settings();
                settings.use_ambient_light = !settings.use_ambient_light;
                log::info!("ambient light in voxelization: {}", settings.use_ambient_light);
                renderer.set_voxelization_settings(settings);
            }
            Command::StepEmission(steps) => {
                let mut changed = false;
                for &id in emitters.iter() {
                    assets.update_material(queue, id, |m| {
                        let next = tuning::step_emission(m.emission, steps);
                        changed |= next != m.emission;
                        log::info!("material '{}' emission {:.2?}", m.name, next);
                        m.emission = next;
                    });
                }
                // Emission is baked into the radiance grid.
                if changed {
                    renderer.request_revoxelization();
                }
            }
            Command::CycleInternalResolution => {
                let next = tuning::next_internal_resolution(renderer.resolution().internal_size().as_uvec2());
                if let Err(e) = renderer.set_internal_resolution(device, next.x, next.y) {
                    log::warn!("{e}");
                }
            }
            Command::Exit => return AppControl::Exit,
            // Scene commands returned above.
            _ => {}
        }
        AppControl::Continue
    }
}

/// Applies commands that only edit scene state: lights, cones and shading
/// switches. Returns `None` for commands the renderer or asset store handle,
/// otherwise whether the scene changed.
///
/// Light edits re-render the affected shadow map on the next frame; the
/// radiance grid keeps the old lighting until the next revoxelization.
fn apply_scene_command(scene: &mut Scene, command: Command, grid_size: u32) -> Option<bool> {
    let cones = &mut scene.cone_settings;
    let lights = &mut scene.lights;
    let changed = match command {
        Command::ToggleHardShadows => {
            cones.enable_hard_shadows = !cones.enable_hard_shadows;
            log::info!("hard shadows: {}", cones.enable_hard_shadows);
            true
        }
        Command::ToggleDirectLight => {
            cones.enable_direct_light = !cones.enable_direct_light;
            log::info!("direct light: {}", cones.enable_direct_light);
            true
        }
        Command::ToggleSeparateAo => {
            cones.trace_ao_separately = !cones.trace_ao_separately;
            log::info!("separate AO cone: {}", cones.trace_ao_separately);
            true
        }
        Command::RotateSun { yaw, pitch } => {
            let changed = tuning::rotate_sun(lights, yaw, pitch);
            if let (true, Some(sun)) = (changed, lights.shadow_caster()) {
                log::info!("sun direction {:.3?} (V revoxelizes)", sun.direction());
            }
            changed
        }
        Command::StepShadowOrtho(steps) => log_frustum(tuning::step_shadow_frustum(lights, steps, 0, 0), lights),
        Command::StepShadowNear(steps) => log_frustum(tuning::step_shadow_frustum(lights, 0, steps, 0), lights),
        Command::StepShadowFar(steps) => log_frustum(tuning::step_shadow_frustum(lights, 0, 0, steps), lights),
        Command::StepAmbient(steps) => {
            let changed = tuning::step_ambient(lights, steps);
            log::info!("ambient light {:.2?}", lights.ambient);
            changed
        }
        Command::StepDiffuseAperture(steps) => {
            let changed = tuning::step_aperture(&mut cones.diffuse, steps);
            log::info!("diffuse aperture {:.1}°", cones.diffuse.aperture_degrees());
            changed
        }
        Command::StepDiffuseOffset(steps) => {
            let changed = tuning::step_offset_voxels(&mut cones.diffuse, steps, grid_size);
            log::info!(
                "diffuse offset {} voxels of {grid_size}³",
                distance_to_voxels(cones.diffuse.distance_offset, grid_size)
            );
            changed
        }
        _ => return None,
    };
    Some(changed)
}

fn log_frustum(changed: bool, lights: &SceneLights) -> bool {
    if let (true, Some(sun)) = (changed, lights.shadow_caster()) {
        let c = sun.shadow_map().config();
        log::info!("sun shadow extent {:.2}, near {:.2}, far {:.2}", c.ortho, c.near, c.far);
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene() -> Scene {
        let mut scene = Scene::new(&SceneConfig::cornell(), &[]);
        // The first frame renders every shadow map.
        shadow_renders(&mut scene);
        scene
    }

    /// Shadow maps re-rendered over two frames.
    fn shadow_renders(scene: &mut Scene) -> usize {
        let mut renders = 0;
        for _ in 0..2 {
            for light in &mut scene.lights.directional {
                if light.shadow_map_mut().render_if_dirty(|_| {}) {
                    renders += 1;
                }
            }
        }
        renders
    }

    // ── light commands ────────────────────────────────────────────────────

    #[test]
    fn light_command_rerenders_the_shadow_map_once() {
        let commands = [
            Command::RotateSun { yaw: 1, pitch: 0 },
            Command::RotateSun { yaw: 0, pitch: -1 },
            Command::StepShadowOrtho(1),
            Command::StepShadowNear(-1),
            Command::StepShadowFar(1),
        ];
        for command in commands {
            let mut scene = scene();
            assert_eq!(apply_scene_command(&mut scene, command, 256), Some(true), "{command:?}");
            assert_eq!(shadow_renders(&mut scene), 1, "{command:?}");
        }
    }

    #[test]
    fn refused_frustum_edit_renders_nothing() {
        let mut scene = scene();
        assert_eq!(apply_scene_command(&mut scene, Command::StepShadowNear(100), 256), Some(false));
        assert_eq!(shadow_renders(&mut scene), 0);
    }

    #[test]
    fn ambient_edit_leaves_shadow_maps_alone() {
        let mut scene = scene();
        let before = scene.lights.ambient;
        assert_eq!(apply_scene_command(&mut scene, Command::StepAmbient(1), 256), Some(true));
        assert!(scene.lights.ambient.x > before.x);
        assert_eq!(shadow_renders(&mut scene), 0);
    }

    // ── cone commands ─────────────────────────────────────────────────────

    #[test]
    fn diffuse_commands_edit_the_diffuse_cone_only() {
        let mut scene = scene();
        let before = scene.cone_settings;
        apply_scene_command(&mut scene, Command::StepDiffuseAperture(-1), 256);
        apply_scene_command(&mut scene, Command::StepDiffuseOffset(1), 256);
        assert!(scene.cone_settings.diffuse.aperture < before.diffuse.aperture);
        assert_eq!(scene.cone_settings.diffuse.distance_offset, 33.0 / 256.0);
        assert_eq!(scene.cone_settings.specular, before.specular);
    }

    #[test]
    fn renderer_commands_are_left_to_the_session() {
        let mut scene = scene();
        for command in [Command::Revoxelize, Command::CycleInternalResolution, Command::StepEmission(1), Command::Exit] {
            assert_eq!(apply_scene_command(&mut scene, command, 256), None);
        }
    }
}
