//! Tests that need a real device. Each one returns early when the machine has
//! no adapter, so they pass on headless CI without a GPU.

use std::path::Path;

use glam::Vec3;

use crate::assets::{AssetProvider, AssetStore, Material, MeshData, RgbaImage, TextureId, FALLBACK_TEXTURE};
use crate::scene::{Scene, SceneConfig};

use super::shadow::ShadowStage;
use super::voxel_grid::{VoxelGrid, VoxelGridOps, VoxelGridSelection};
use super::voxelize::{VoxelizationSettings, VoxelizationStage};

const GRID: u32 = 64;

fn headless_device() -> Option<(wgpu::Device, wgpu::Queue)> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default())).ok()?;
    let info = adapter.get_info();

    let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
        label: Some("vxgi test device"),
        required_features: wgpu::Features::empty(),
        required_limits: adapter.limits(),
        experimental_features: wgpu::ExperimentalFeatures::disabled(),
        memory_hints: wgpu::MemoryHints::Performance,
        trace: wgpu::Trace::Off,
    }))
    .ok()?;

    println!("test adapter: {} ({:?})", info.name, info.backend);
    Some((device, queue))
}

macro_rules! device_or_skip {
    () => {
        match headless_device() {
            Some(v) => v,
            None => {
                println!("Skipping GPU test: no adapter available.");
                return;
            }
        }
    };
}

/// Copies level 0 of `grid` into host memory. One row of a 64³ RGBA8 grid is
/// exactly the 256-byte copy alignment.
fn read_base_level(device: &wgpu::Device, queue: &wgpu::Queue, grid: &VoxelGrid) -> Vec<u8> {
    let row = GRID * 4;
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("vxgi test readback"),
        size: u64::from(row * GRID * GRID),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("vxgi readback") });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture: grid.texture(),
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(row),
                rows_per_image: Some(GRID),
            },
        },
        wgpu::Extent3d { width: GRID, height: GRID, depth_or_array_layers: GRID },
    );
    queue.submit(std::iter::once(encoder.finish()));

    let slice = buffer.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device.poll(wgpu::PollType::wait_indefinitely()).expect("device poll failed");
    rx.recv().expect("map callback dropped").expect("readback map failed");

    let bytes = slice.get_mapped_range().to_vec();
    buffer.unmap();
    bytes
}

// ── voxelization ──────────────────────────────────────────────────────────

#[test]
fn voxelizing_twice_gives_identical_grids() {
    let (device, queue) = device_or_skip!();

    let mut assets = AssetStore::new(&device, &queue);
    let material = assets.add_material(&device, Material::diffuse("grey", Vec3::splat(0.5)));
    let mut mesh = MeshData::new();
    mesh.push_box(material, Vec3::new(-1.0, -0.5, -0.8), Vec3::new(1.0, 0.5, 0.8));
    let model = assets.add_model(&device, "box", &mesh).expect("box uploads");

    // Without a sun every fragment of the box stores the same ambient radiance,
    // so the result does not depend on fragment order.
    let config = SceneConfig { sun: None, ..SceneConfig::cornell() };
    let mut scene = Scene::from_store(&config, &[model], &mut assets, &queue);

    let ops = VoxelGridOps::new(&device);
    let grid = VoxelGrid::new(&device, &ops, GRID);
    let mut selection = VoxelGridSelection::new(0).expect("index 0 is valid");
    assert_eq!(selection.resolution(), GRID);
    let mut shadow = ShadowStage::new(&device, &assets);
    let voxelize = VoxelizationStage::new(&device, &assets);
    let settings = VoxelizationSettings::default();

    let mut run = |selection: &mut VoxelGridSelection, scene: &mut Scene| {
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("vxgi test") });
        let models = scene.models().to_vec();
        let shadows = shadow.render_dirty(&device, &queue, &mut encoder, &mut scene.lights, &models, &assets);
        voxelize.voxelize(
            &device,
            &queue,
            &mut encoder,
            &grid,
            &ops,
            selection,
            scene,
            &assets,
            (&shadow, &shadows),
            &settings,
        );
        queue.submit(std::iter::once(encoder.finish()));
        read_base_level(&device, &queue, &grid)
    };

    let first = run(&mut selection, &mut scene);
    assert!(!selection.is_voxelization_pending());
    selection.request_revoxelization();
    let second = run(&mut selection, &mut scene);

    let filled = first.chunks_exact(4).filter(|texel| texel[3] > 0).count();
    assert!(filled > 0, "voxelization wrote nothing");
    assert!(filled < (GRID * GRID * GRID) as usize, "box surface filled the whole grid");
    assert!(first == second, "second voxelization differs from the first");
}

// ── material maps ─────────────────────────────────────────────────────────

#[test]
fn missing_maps_bind_the_fallback_texture() {
    let (device, queue) = device_or_skip!();
    let mut assets = AssetStore::new(&device, &queue);
    assert_eq!(assets.texture_count(), 1);

    let garbage = assets.texture_from_bytes(&device, &queue, "garbage", b"not an image");
    let missing = assets.load_texture(&device, &queue, Path::new("/nonexistent/vxgi/missing.png"));
    let empty = assets.texture_from_image(&device, &queue, "empty", &RgbaImage::new(0, 0));
    assert_eq!([garbage, missing, empty], [FALLBACK_TEXTURE; 3]);
    assert_eq!(assets.texture_count(), 1, "failed loads must not store textures");

    let real = assets.texture_from_image(&device, &queue, "checker", &RgbaImage::new(2, 2));
    assert_ne!(real, FALLBACK_TEXTURE);

    let plain = assets.add_material(&device, Material::diffuse("plain", Vec3::ONE));
    let mapped = assets.add_material(
        &device,
        Material {
            diffuse_map: Some(real),
            emission_map: Some(missing),
            bump_map: Some(TextureId(99)),
            ..Material::diffuse("mapped", Vec3::ONE)
        },
    );

    let maps = |id| assets.material(id).map(|m| m.maps).expect("material registered");
    assert_eq!(maps(plain), [FALLBACK_TEXTURE; 5]);
    assert_eq!(maps(mapped), [FALLBACK_TEXTURE, real, FALLBACK_TEXTURE, FALLBACK_TEXTURE, FALLBACK_TEXTURE]);
}

#[test]
fn material_updates_reach_the_stored_copy() {
    let (device, queue) = device_or_skip!();
    let mut assets = AssetStore::new(&device, &queue);
    let id = assets.add_material(&device, Material::diffuse("lamp", Vec3::ONE));

    assets.update_material(&queue, id, |m| m.emission = Vec3::splat(2.0));
    let stored = assets.material(id).map(|m| m.material.emission);
    assert_eq!(stored, Some(Vec3::splat(2.0)));
}
