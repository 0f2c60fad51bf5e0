//! Frame planning: display modes, pass ordering and the tokens that prove a
//! stage's output is current.

use std::fmt;

/// What the main target shows.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash)]
pub enum DisplayMode {
    /// Deferred shading with voxel cone tracing.
    #[default]
    Scene,
    /// Ray-marched view of the active voxel grid.
    VoxelizedScene,
    /// Depth of the first light's shadow map.
    ShadowMap,
}

impl DisplayMode {
    pub const ALL: [DisplayMode; 3] = [DisplayMode::Scene, DisplayMode::VoxelizedScene, DisplayMode::ShadowMap];

    pub fn label(self) -> &'static str {
        match self {
            DisplayMode::Scene => "scene",
            DisplayMode::VoxelizedScene => "voxelized scene",
            DisplayMode::ShadowMap => "shadow map",
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// GPU passes a frame can contain.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PassKind {
    ShadowMaps,
    Voxelize,
    VoxelCubeFaces,
    VoxelVisualize,
    GBuffer,
    ConeTracing,
    GBufferTiles,
    ShadowVisualize,
    Blit,
}

/// Inputs that decide which passes run.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FrameInputs {
    pub mode: DisplayMode,
    pub voxelization_pending: bool,
    pub show_gbuffer_tiles: bool,
    pub has_lights: bool,
}

/// Ordered pass list for one frame.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FramePlan {
    pub revoxelize: bool,
    pub passes: Vec<PassKind>,
}

impl FramePlan {
    pub fn new(inputs: FrameInputs) -> Self {
        let mut passes = Vec::with_capacity(8);

        // Voxelization runs whatever is displayed so the grid never goes stale.
        if inputs.voxelization_pending {
            passes.extend([PassKind::ShadowMaps, PassKind::Voxelize]);
        }

        match inputs.mode {
            DisplayMode::Scene => {
                passes.extend([PassKind::ShadowMaps, PassKind::GBuffer, PassKind::ConeTracing]);
                if inputs.show_gbuffer_tiles {
                    passes.push(PassKind::GBufferTiles);
                }
            }
            DisplayMode::VoxelizedScene => {
                passes.extend([PassKind::VoxelCubeFaces, PassKind::VoxelVisualize]);
            }
            DisplayMode::ShadowMap => {
                passes.push(PassKind::ShadowMaps);
                if inputs.has_lights {
                    passes.push(PassKind::ShadowVisualize);
                }
            }
        }

        passes.push(PassKind::Blit);
        Self { revoxelize: inputs.voxelization_pending, passes }
    }

    pub fn contains(&self, pass: PassKind) -> bool {
        self.passes.contains(&pass)
    }

    /// Index of the first occurrence of `pass`.
    pub fn position(&self, pass: PassKind) -> Option<usize> {
        self.passes.iter().position(|p| *p == pass)
    }
}

// ── ready tokens ──────────────────────────────────────────────────────────
//
// Only the stage that produces an output can mint its token, so a consumer
// holding one knows the producer ran (or was already current) this frame.

/// Every shadow map is current.
#[derive(Debug)]
pub struct ShadowsReady(());

impl ShadowsReady {
    pub(crate) fn new() -> Self {
        Self(())
    }
}

/// The active voxel grid holds the current scene, mips included.
#[derive(Debug)]
pub struct VoxelGridReady(());

impl VoxelGridReady {
    pub(crate) fn new() -> Self {
        Self(())
    }
}

/// The G-buffer holds this frame's geometry.
#[derive(Debug)]
pub struct GBufferReady(());

impl GBufferReady {
    pub(crate) fn new() -> Self {
        Self(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(mode: DisplayMode) -> FrameInputs {
        FrameInputs { mode, voxelization_pending: false, show_gbuffer_tiles: false, has_lights: true }
    }

    // ── per-mode sequences ────────────────────────────────────────────────

    #[test]
    fn scene_mode_traces_after_gbuffer_and_shadows() {
        let plan = FramePlan::new(inputs(DisplayMode::Scene));
        assert_eq!(
            plan.passes,
            vec![PassKind::ShadowMaps, PassKind::GBuffer, PassKind::ConeTracing, PassKind::Blit]
        );
        assert!(!plan.revoxelize);
    }

    #[test]
    fn voxelized_scene_skips_gbuffer() {
        let plan = FramePlan::new(inputs(DisplayMode::VoxelizedScene));
        assert_eq!(plan.passes, vec![PassKind::VoxelCubeFaces, PassKind::VoxelVisualize, PassKind::Blit]);
    }

    #[test]
    fn shadow_mode_without_lights_only_blits() {
        let plan = FramePlan::new(FrameInputs { has_lights: false, ..inputs(DisplayMode::ShadowMap) });
        assert_eq!(plan.passes, vec![PassKind::ShadowMaps, PassKind::Blit]);

        let lit = FramePlan::new(inputs(DisplayMode::ShadowMap));
        assert!(lit.contains(PassKind::ShadowVisualize));
    }

    #[test]
    fn gbuffer_tiles_follow_cone_tracing() {
        let plan = FramePlan::new(FrameInputs { show_gbuffer_tiles: true, ..inputs(DisplayMode::Scene) });
        assert_eq!(plan.position(PassKind::GBufferTiles), Some(plan.position(PassKind::ConeTracing).unwrap() + 1));

        // Tiles only make sense on top of the shaded image.
        let vox = FramePlan::new(FrameInputs { show_gbuffer_tiles: true, ..inputs(DisplayMode::VoxelizedScene) });
        assert!(!vox.contains(PassKind::GBufferTiles));
    }

    // ── revoxelization ────────────────────────────────────────────────────

    #[test]
    fn pending_voxelization_runs_first_in_every_mode() {
        for mode in DisplayMode::ALL {
            let plan = FramePlan::new(FrameInputs { voxelization_pending: true, ..inputs(mode) });
            assert!(plan.revoxelize);
            assert_eq!(&plan.passes[..2], &[PassKind::ShadowMaps, PassKind::Voxelize], "{mode}");
        }
    }

    #[test]
    fn cone_tracing_sees_shadows_voxels_and_gbuffer() {
        let plan = FramePlan::new(FrameInputs { voxelization_pending: true, ..inputs(DisplayMode::Scene) });
        let trace = plan.position(PassKind::ConeTracing).unwrap();
        assert!(plan.position(PassKind::ShadowMaps).unwrap() < trace);
        assert!(plan.position(PassKind::Voxelize).unwrap() < trace);
        assert!(plan.position(PassKind::GBuffer).unwrap() < trace);
    }

    #[test]
    fn blit_is_always_last() {
        for mode in DisplayMode::ALL {
            for pending in [false, true] {
                let plan = FramePlan::new(FrameInputs { voxelization_pending: pending, ..inputs(mode) });
                assert_eq!(plan.passes.last(), Some(&PassKind::Blit));
                assert_eq!(plan.passes.iter().filter(|p| **p == PassKind::Blit).count(), 1);
            }
        }
    }
}
