//! Mipmapped 3D radiance grids and the active-resolution selection.

use glam::UVec3;

use crate::error::ConfigError;

use super::common::{
    compute_pipeline, pipeline_layout, sampler_entry, shader_module, storage_3d_entry, texture_entry,
    VOXEL_FORMAT,
};
use super::plan::VoxelGridReady;

/// Supported cubic grid resolutions.
pub const VOXEL_GRID_RESOLUTIONS: [u32; 4] = [64, 128, 256, 512];
pub const DEFAULT_VOXEL_GRID_RESOLUTION_INDEX: usize = 2;

const WORKGROUP_SIZE: u32 = 4;

/// Full mip chain length for a `dim³` grid (down to 1³).
#[inline]
pub fn mip_level_count(dim: u32) -> u32 {
    dim.max(1).ilog2() + 1
}

/// Highest mip level of a `dim³` grid.
#[inline]
pub fn max_mip_level(dim: u32) -> u32 {
    mip_level_count(dim) - 1
}

/// Edge length of mip `level` of a `dim³` grid.
#[inline]
pub fn mip_dimension(dim: u32, level: u32) -> u32 {
    (dim >> level).max(1)
}

#[inline]
pub fn workgroups_for(dim: u32) -> u32 {
    dim.div_ceil(WORKGROUP_SIZE)
}

/// Debug pattern written into fresh grids: the twelve edges of the cube one
/// voxel inside the border. Must agree with `fill_corners` in `voxel_clear.wgsl`.
pub fn is_corner_marker(p: UVec3, dim: u32) -> bool {
    if dim < 3 {
        return false;
    }
    let hi = dim - 1;
    let inside = p.cmpge(UVec3::ONE).all() && p.cmple(UVec3::splat(hi)).all();
    let on_edge = |c: u32| c == 1 || c == hi;
    let edges = on_edge(p.x) as u32 + on_edge(p.y) as u32 + on_edge(p.z) as u32;
    inside && edges >= 2
}

// ── selection ─────────────────────────────────────────────────────────────

/// Which grid is active and whether it must be re-voxelized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoxelGridSelection {
    index: usize,
    voxelize_next_frame: bool,
}

impl Default for VoxelGridSelection {
    fn default() -> Self {
        Self { index: DEFAULT_VOXEL_GRID_RESOLUTION_INDEX, voxelize_next_frame: true }
    }
}

impl VoxelGridSelection {
    /// Starts at `index` with a voxelization pending.
    pub fn new(index: usize) -> Result<Self, ConfigError> {
        check_index(index)?;
        Ok(Self { index, voxelize_next_frame: true })
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn resolution(&self) -> u32 {
        VOXEL_GRID_RESOLUTIONS[self.index]
    }

    /// Switches the active grid and re-arms voxelization. Out-of-range
    /// indices are rejected without touching state.
    pub fn set_resolution_index(&mut self, index: usize) -> Result<(), ConfigError> {
        check_index(index)?;
        self.index = index;
        self.voxelize_next_frame = true;
        log::info!("new voxel resolution: {}", self.resolution());
        Ok(())
    }

    #[inline]
    pub fn request_revoxelization(&mut self) {
        self.voxelize_next_frame = true;
    }

    #[inline]
    pub fn is_voxelization_pending(&self) -> bool {
        self.voxelize_next_frame
    }

    /// Marks the active grid as current after a voxelization pass.
    pub(crate) fn complete(&mut self) -> VoxelGridReady {
        self.voxelize_next_frame = false;
        VoxelGridReady::new()
    }

    /// The active grid is usable as-is when nothing is pending.
    pub fn grid_ready(&self) -> Option<VoxelGridReady> {
        (!self.voxelize_next_frame).then(VoxelGridReady::new)
    }
}

fn check_index(index: usize) -> Result<(), ConfigError> {
    if index < VOXEL_GRID_RESOLUTIONS.len() {
        Ok(())
    } else {
        Err(ConfigError::VoxelResolutionOutOfRange { index, supported: VOXEL_GRID_RESOLUTIONS.len() })
    }
}

// ── GPU ───────────────────────────────────────────────────────────────────

/// Compute pipelines and layouts shared by all grids.
pub struct VoxelGridOps {
    write_layout: wgpu::BindGroupLayout,
    mip_layout: wgpu::BindGroupLayout,
    /// Trilinear sampling of the full mip chain, used by cone tracing and the visualizer.
    pub sample_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    clear: wgpu::ComputePipeline,
    fill_corners: wgpu::ComputePipeline,
    downsample: wgpu::ComputePipeline,
}

impl VoxelGridOps {
    pub fn new(device: &wgpu::Device) -> Self {
        let cs = wgpu::ShaderStages::COMPUTE;

        let write_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("vxgi voxel write bgl"),
            entries: &[storage_3d_entry(0, cs)],
        });
        let mip_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("vxgi voxel mip bgl"),
            entries: &[
                texture_entry(
                    0,
                    cs,
                    wgpu::TextureSampleType::Float { filterable: false },
                    wgpu::TextureViewDimension::D3,
                ),
                storage_3d_entry(1, cs),
            ],
        });
        let fs = wgpu::ShaderStages::FRAGMENT;
        let sample_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("vxgi voxel sample bgl"),
            entries: &[
                texture_entry(
                    0,
                    fs,
                    wgpu::TextureSampleType::Float { filterable: true },
                    wgpu::TextureViewDimension::D3,
                ),
                sampler_entry(1, fs, wgpu::SamplerBindingType::Filtering),
            ],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("vxgi voxel sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Linear,
            ..Default::default()
        });

        let clear_module = shader_module(device, "vxgi voxel clear", include_str!("shaders/voxel_clear.wgsl"));
        let mip_module = shader_module(device, "vxgi voxel mip", include_str!("shaders/voxel_mip.wgsl"));
        let write_pl = pipeline_layout(device, "vxgi voxel write layout", &[&write_layout]);
        let mip_pl = pipeline_layout(device, "vxgi voxel mip layout", &[&mip_layout]);

        Self {
            clear: compute_pipeline(device, "vxgi voxel clear", &write_pl, &clear_module, "clear_grid"),
            fill_corners: compute_pipeline(device, "vxgi voxel corners", &write_pl, &clear_module, "fill_corners"),
            downsample: compute_pipeline(device, "vxgi voxel downsample", &mip_pl, &mip_module, "downsample"),
            write_layout,
            mip_layout,
            sample_layout,
            sampler,
        }
    }
}

/// One cubic RGBA8 grid with its full mip chain.
pub struct VoxelGrid {
    pub resolution: u32,
    texture: wgpu::Texture,
    /// Write view of level 0 for the voxelization fragment shader.
    pub base_storage_view: wgpu::TextureView,
    /// Trilinear + mip sampling bind group.
    pub sample_bind_group: wgpu::BindGroup,
    write_bind_group: wgpu::BindGroup,
    /// `mip_bind_groups[i]` reads level `i` and writes level `i + 1`.
    mip_bind_groups: Vec<wgpu::BindGroup>,
    /// Color attachment sized `resolution²`, never written; wgpu needs a
    /// render target to define the rasterization area.
    pub raster_view: wgpu::TextureView,
}

impl VoxelGrid {
    pub fn new(device: &wgpu::Device, ops: &VoxelGridOps, resolution: u32) -> Self {
        let levels = mip_level_count(resolution);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("vxgi voxel grid"),
            size: wgpu::Extent3d { width: resolution, height: resolution, depth_or_array_layers: resolution },
            mip_level_count: levels,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D3,
            format: VOXEL_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });

        let level_view = |level: u32| {
            texture.create_view(&wgpu::TextureViewDescriptor {
                label: Some("vxgi voxel level"),
                dimension: Some(wgpu::TextureViewDimension::D3),
                base_mip_level: level,
                mip_level_count: Some(1),
                ..Default::default()
            })
        };

        let base_storage_view = level_view(0);
        let full_view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("vxgi voxel grid sampled"),
            dimension: Some(wgpu::TextureViewDimension::D3),
            ..Default::default()
        });

        let sample_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("vxgi voxel sample bind group"),
            layout: &ops.sample_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(&full_view) },
                wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::Sampler(&ops.sampler) },
            ],
        });

        let write_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("vxgi voxel write bind group"),
            layout: &ops.write_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&base_storage_view),
            }],
        });

        let mip_bind_groups = (0..levels - 1)
            .map(|level| {
                let src = level_view(level);
                let dst = level_view(level + 1);
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("vxgi voxel mip bind group"),
                    layout: &ops.mip_layout,
                    entries: &[
                        wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(&src) },
                        wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::TextureView(&dst) },
                    ],
                })
            })
            .collect();

        let raster = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("vxgi voxel raster target"),
            size: wgpu::Extent3d { width: resolution, height: resolution, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: VOXEL_RASTER_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let raster_view = raster.create_view(&wgpu::TextureViewDescriptor::default());

        log::debug!("voxel grid {resolution}³ allocated ({levels} mip levels)");

        Self {
            resolution,
            texture,
            base_storage_view,
            sample_bind_group,
            write_bind_group,
            mip_bind_groups,
            raster_view,
        }
    }

    #[inline]
    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn clear(&self, ops: &VoxelGridOps, encoder: &mut wgpu::CommandEncoder) {
        self.dispatch_base(&ops.clear, encoder, "vxgi voxel clear");
    }

    pub fn fill_corners(&self, ops: &VoxelGridOps, encoder: &mut wgpu::CommandEncoder) {
        self.dispatch_base(&ops.fill_corners, encoder, "vxgi voxel corners");
    }

    fn dispatch_base(
        &self,
        pipeline: &wgpu::ComputePipeline,
        encoder: &mut wgpu::CommandEncoder,
        label: &str,
    ) {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(label),
            timestamp_writes: None,
        });
        let groups = workgroups_for(self.resolution);
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &self.write_bind_group, &[]);
        pass.dispatch_workgroups(groups, groups, groups);
    }

    /// Rebuilds levels `1..` from level 0 with a 2×2×2 box filter.
    pub fn generate_mipmaps(&self, ops: &VoxelGridOps, encoder: &mut wgpu::CommandEncoder) {
        for (i, bind_group) in self.mip_bind_groups.iter().enumerate() {
            // Separate passes so each level sees the previous one fully written.
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("vxgi voxel mip"),
                timestamp_writes: None,
            });
            let groups = workgroups_for(mip_dimension(self.resolution, i as u32 + 1));
            pass.set_pipeline(&ops.downsample);
            pass.set_bind_group(0, bind_group, &[]);
            pass.dispatch_workgroups(groups, groups, groups);
        }
    }
}

pub(crate) const VOXEL_RASTER_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R8Unorm;

#[cfg(test)]
mod tests {
    use super::*;

    // ── selection ─────────────────────────────────────────────────────────

    #[test]
    fn default_selection_is_256_and_pending() {
        let s = VoxelGridSelection::default();
        assert_eq!(s.resolution(), 256);
        assert!(s.is_voxelization_pending());
        assert!(s.grid_ready().is_none());
    }

    #[test]
    fn index_three_selects_512_and_rearms() {
        let mut s = VoxelGridSelection::default();
        let _ = s.complete();
        assert!(!s.is_voxelization_pending());

        s.set_resolution_index(3).unwrap();
        assert_eq!(s.resolution(), 512);
        assert!(s.is_voxelization_pending());
    }

    #[test]
    fn index_four_is_rejected_without_mutation() {
        let mut s = VoxelGridSelection::default();
        let _ = s.complete();
        let before = s.clone();

        let err = s.set_resolution_index(4).unwrap_err();
        assert_eq!(err, ConfigError::VoxelResolutionOutOfRange { index: 4, supported: 4 });
        assert_eq!(s, before);
        assert!(!s.is_voxelization_pending());
    }

    #[test]
    fn new_rejects_out_of_range() {
        assert!(VoxelGridSelection::new(7).is_err());
        assert_eq!(VoxelGridSelection::new(0).map(|s| s.resolution()), Ok(64));
    }

    #[test]
    fn request_rearms_and_complete_clears() {
        let mut s = VoxelGridSelection::default();
        let _ = s.complete();
        assert!(s.grid_ready().is_some());
        s.request_revoxelization();
        assert!(s.grid_ready().is_none());
    }

    // ── mip chain ─────────────────────────────────────────────────────────

    #[test]
    fn mip_chain_reaches_one_voxel() {
        assert_eq!(mip_level_count(64), 7);
        assert_eq!(mip_level_count(512), 10);
        assert_eq!(max_mip_level(256), 8);
        assert_eq!(mip_dimension(256, 8), 1);
        assert_eq!(mip_dimension(256, 12), 1);
    }

    #[test]
    fn workgroups_cover_small_levels() {
        assert_eq!(workgroups_for(1), 1);
        assert_eq!(workgroups_for(2), 1);
        assert_eq!(workgroups_for(64), 16);
    }

    // ── corner markers ────────────────────────────────────────────────────

    #[test]
    fn corner_marker_edges() {
        let dim = 64;
        assert!(is_corner_marker(UVec3::new(1, 1, 30), dim));
        assert!(is_corner_marker(UVec3::new(63, 1, 63), dim));
        assert!(!is_corner_marker(UVec3::new(1, 30, 30), dim));
        assert!(!is_corner_marker(UVec3::new(0, 1, 1), dim));
        assert!(!is_corner_marker(UVec3::new(32, 32, 32), dim));
    }

    #[test]
    fn corner_marker_count_is_twelve_edges() {
        let dim = 8;
        let mut count = 0;
        for z in 0..dim {
            for y in 0..dim {
                for x in 0..dim {
                    count += is_corner_marker(UVec3::new(x, y, z), dim) as u32;
                }
            }
        }
        // Edge voxels span [1, dim-1]; the 8 corners are shared by 3 edges.
        let per_edge = dim - 1;
        assert_eq!(count, 12 * per_edge - 2 * 8);
    }
}
