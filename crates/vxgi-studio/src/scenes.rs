//! Procedural stand-ins for the classic test scenes.

use std::path::Path;

use anyhow::Result;
use glam::Vec3;
use vxgi_engine::assets::{AssetStore, Material, MaterialId, MeshData, ModelId, Rgba, RgbaImage, TextureId};

/// Models of a built scene plus where the camera starts, in model units.
pub struct BuiltScene {
    pub models: Vec<ModelId>,
    /// Materials with a non-zero emission color.
    pub emitters: Vec<MaterialId>,
    pub eye: Vec3,
    pub target: Vec3,
}

/// Where material maps come from.
#[derive(Debug, Copy, Clone)]
pub enum TextureSource<'a> {
    /// Patterns generated in memory.
    Procedural,
    /// `<name>.png` files in a directory; unreadable ones fall back to white.
    Directory(&'a Path),
}

/// Builds the geometry for preset `name`; unknown names get the Cornell box.
pub fn build(
    name: &str,
    assets: &mut AssetStore,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    textures: TextureSource<'_>,
) -> Result<BuiltScene> {
    match name {
        "courtyard" => courtyard(assets, device, queue, textures),
        _ => cornell(assets, device),
    }
}

/// Square checkerboard of `cells × cells` tiles alternating between two grey levels.
pub fn checker_image(size: u32, cells: u32, light: u8, dark: u8) -> RgbaImage {
    let cell = (size / cells.max(1)).max(1);
    RgbaImage::from_fn(size, size, |x, y| {
        let v = if (x / cell + y / cell) % 2 == 0 { light } else { dark };
        image_pixel(v)
    })
}

/// Running-bond brick pattern: rows of bricks with mortar lines, each row
/// shifted by half a brick.
pub fn brick_image(size: u32, rows: u32) -> RgbaImage {
    let row = (size / rows.max(1)).max(2);
    let brick = row * 2;
    RgbaImage::from_fn(size, size, |x, y| {
        let shift = if (y / row) % 2 == 0 { 0 } else { brick / 2 };
        let mortar = y % row == 0 || (x + shift) % brick == 0;
        image_pixel(if mortar { 170 } else { 245 })
    })
}

fn image_pixel(v: u8) -> Rgba<u8> {
    Rgba([v, v, v, 255])
}

fn texture(
    assets: &mut AssetStore,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    source: TextureSource<'_>,
    name: &str,
    procedural: impl FnOnce() -> RgbaImage,
) -> TextureId {
    match source {
        TextureSource::Procedural => assets.texture_from_image(device, queue, name, &procedural()),
        TextureSource::Directory(dir) => assets.load_texture(device, queue, &dir.join(format!("{name}.png"))),
    }
}

fn c(x: f32, y: f32, z: f32) -> Vec3 {
    Vec3::new(x, y, z)
}

/// Closed box open towards +z with red/green side walls, a ceiling light and
/// two blocks.
fn cornell(assets: &mut AssetStore, device: &wgpu::Device) -> Result<BuiltScene> {
    let white = assets.add_material(device, Material::diffuse("white", Vec3::splat(0.76)));
    let red = assets.add_material(device, Material::diffuse("red", Vec3::new(0.63, 0.065, 0.05)));
    let green = assets.add_material(device, Material::diffuse("green", Vec3::new(0.14, 0.45, 0.091)));
    let light = assets.add_material(
        device,
        Material { emission: Vec3::ONE, ..Material::diffuse("light", Vec3::splat(0.78)) },
    );
    let glossy = assets.add_material(
        device,
        Material {
            specular_reflectance: Vec3::splat(0.6),
            specular_exponent: 200.0,
            ..Material::diffuse("glossy", Vec3::new(0.2, 0.3, 0.7))
        },
    );

    // Walls face inwards.
    let mut room = MeshData::new();
    room.push_quad(white, c(-1.0, -1.0, 1.0), c(1.0, -1.0, 1.0), c(1.0, -1.0, -1.0), c(-1.0, -1.0, -1.0));
    room.push_quad(white, c(-1.0, 1.0, -1.0), c(1.0, 1.0, -1.0), c(1.0, 1.0, 1.0), c(-1.0, 1.0, 1.0));
    room.push_quad(white, c(-1.0, -1.0, -1.0), c(1.0, -1.0, -1.0), c(1.0, 1.0, -1.0), c(-1.0, 1.0, -1.0));
    room.push_quad(red, c(-1.0, -1.0, 1.0), c(-1.0, -1.0, -1.0), c(-1.0, 1.0, -1.0), c(-1.0, 1.0, 1.0));
    room.push_quad(green, c(1.0, -1.0, -1.0), c(1.0, -1.0, 1.0), c(1.0, 1.0, 1.0), c(1.0, 1.0, -1.0));
    room.push_quad(light, c(-0.3, 0.98, -0.3), c(0.3, 0.98, -0.3), c(0.3, 0.98, 0.3), c(-0.3, 0.98, 0.3));

    let mut blocks = MeshData::new();
    blocks.push_box(white, c(-0.65, -1.0, -0.6), c(-0.05, 0.2, 0.0));
    blocks.push_box(glossy, c(0.1, -1.0, 0.05), c(0.65, -0.4, 0.6));

    let models = vec![assets.add_model(device, "cornell room", &room)?, assets.add_model(device, "cornell blocks", &blocks)?];
    log::info!("cornell: {} triangles", room.triangle_count() + blocks.triangle_count());

    Ok(BuiltScene { models, emitters: vec![light], eye: c(0.0, 0.0, 3.2), target: Vec3::ZERO })
}

/// Walled courtyard with a colonnade, modelled in centimetres.
fn courtyard(
    assets: &mut AssetStore,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    textures: TextureSource<'_>,
) -> Result<BuiltScene> {
    let bricks = texture(assets, device, queue, textures, "stone", || brick_image(128, 8));
    let flags = texture(assets, device, queue, textures, "ground", || checker_image(128, 8, 255, 215));

    let mut stone = Material::diffuse("stone", Vec3::new(0.62, 0.58, 0.5));
    stone.ambient_map = Some(bricks);
    stone.diffuse_map = Some(bricks);
    let stone = assets.add_material(device, stone);
    let mut ground = Material::diffuse("ground", Vec3::new(0.45, 0.42, 0.38));
    ground.ambient_map = Some(flags);
    ground.diffuse_map = Some(flags);
    let ground = assets.add_material(device, ground);
    let lantern = assets.add_material(
        device,
        Material { emission: Vec3::new(1.0, 0.75, 0.4), ..Material::diffuse("lantern", Vec3::splat(0.8)) },
    );
    let cloth_red = assets.add_material(device, Material::diffuse("cloth red", Vec3::new(0.7, 0.1, 0.08)));
    let cloth_blue = assets.add_material(device, Material::diffuse("cloth blue", Vec3::new(0.1, 0.2, 0.6)));

    const HALF: f32 = 750.0;
    const WALL: f32 = 25.0;
    const HEIGHT: f32 = 450.0;

    let mut shell = MeshData::new();
    shell.push_box(ground, c(-HALF, -10.0, -HALF), c(HALF, 0.0, HALF));
    shell.push_box(stone, c(-HALF, 0.0, -HALF), c(HALF, HEIGHT, -HALF + WALL));
    shell.push_box(stone, c(-HALF, 0.0, HALF - WALL), c(HALF, HEIGHT, HALF));
    shell.push_box(stone, c(-HALF, 0.0, -HALF + WALL), c(-HALF + WALL, HEIGHT, HALF - WALL));
    shell.push_box(stone, c(HALF - WALL, 0.0, -HALF + WALL), c(HALF, HEIGHT, HALF - WALL));

    let mut colonnade = MeshData::new();
    for i in 0..7 {
        let z = -525.0 + i as f32 * 175.0;
        for x in [-500.0, 500.0] {
            colonnade.push_box(stone, c(x - 20.0, 0.0, z - 20.0), c(x + 20.0, 250.0, z + 20.0));
        }
    }
    for x in [-500.0, 500.0] {
        colonnade.push_box(stone, c(x - 30.0, 250.0, -575.0), c(x + 30.0, 280.0, 575.0));
    }
    // Hanging cloth between the pillars.
    for (i, z) in [-350.0f32, 0.0, 350.0].into_iter().enumerate() {
        let cloth = if i % 2 == 0 { cloth_red } else { cloth_blue };
        for x in [-500.0f32, 500.0] {
            colonnade.push_box(cloth, c(x - 3.0, 75.0, z - 75.0), c(x + 3.0, 240.0, z + 75.0));
        }
    }

    // Lanterns on the pillar fronts facing the court.
    for z in [-525.0f32, 525.0] {
        colonnade.push_box(lantern, c(-485.0, 180.0, z - 8.0), c(-475.0, 200.0, z + 8.0));
        colonnade.push_box(lantern, c(475.0, 180.0, z - 8.0), c(485.0, 200.0, z + 8.0));
    }

    let models =
        vec![assets.add_model(device, "courtyard shell", &shell)?, assets.add_model(device, "courtyard colonnade", &colonnade)?];
    log::info!("courtyard: {} triangles", shell.triangle_count() + colonnade.triangle_count());

    Ok(BuiltScene { models, emitters: vec![lantern], eye: c(0.0, 150.0, 650.0), target: c(0.0, 100.0, 0.0) })
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── procedural textures ───────────────────────────────────────────────

    #[test]
    fn checker_alternates_between_cells() {
        let img = checker_image(16, 4, 255, 100);
        assert_eq!(img.dimensions(), (16, 16));
        assert_eq!(img.get_pixel(0, 0).0, [255, 255, 255, 255]);
        assert_eq!(img.get_pixel(4, 0).0, [100, 100, 100, 255]);
        assert_eq!(img.get_pixel(4, 4).0, [255, 255, 255, 255]);
    }

    #[test]
    fn brick_rows_are_offset_by_half_a_brick() {
        let img = brick_image(64, 8);
        // Rows are 8 px tall, bricks 16 px wide.
        assert_eq!(img.get_pixel(3, 0).0[0], 170);
        assert_eq!(img.get_pixel(16, 3).0[0], 170);
        assert_eq!(img.get_pixel(8, 3).0[0], 245);
        assert_eq!(img.get_pixel(8, 11).0[0], 170);
    }

    #[test]
    fn degenerate_cell_counts_do_not_divide_by_zero() {
        let img = checker_image(4, 0, 255, 0);
        assert_eq!(img.dimensions(), (4, 4));
    }
}
