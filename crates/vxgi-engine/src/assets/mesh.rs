use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec2, Vec3};

use crate::scene::BoundingBox;

use super::MaterialId;

/// Interleaved vertex. Layout must match the vertex inputs and the
/// `array<f32>` stride used for vertex pulling in the voxelization shader.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
}

impl Vertex {
    /// Number of f32 values per vertex.
    pub const FLOATS: usize = 14;

    const ATTRS: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
        0 => Float32x3, // position
        1 => Float32x3, // normal
        2 => Float32x2, // uv
        3 => Float32x3, // tangent
        4 => Float32x3  // bitangent
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Contiguous run of triangles sharing one material.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SubMesh {
    pub first_vertex: u32,
    pub vertex_count: u32,
    pub material: MaterialId,
}

impl SubMesh {
    #[inline]
    pub fn vertices(&self) -> std::ops::Range<u32> {
        self.first_vertex..self.first_vertex + self.vertex_count
    }
}

/// CPU-side triangle list. Every three consecutive vertices form a triangle;
/// the voxelizer relies on this to find each triangle's dominant axis.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub submeshes: Vec<SubMesh>,
}

impl MeshData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a triangle with per-face tangent frame.
    pub fn push_triangle(&mut self, material: MaterialId, p: [Vec3; 3], uv: [Vec2; 3]) {
        let normal = (p[1] - p[0]).cross(p[2] - p[0]).normalize_or_zero();
        let (tangent, bitangent) = tangent_frame(p, uv, normal);

        let first = self.vertices.len() as u32;
        for i in 0..3 {
            self.vertices.push(Vertex {
                position: p[i].to_array(),
                normal: normal.to_array(),
                uv: uv[i].to_array(),
                tangent: tangent.to_array(),
                bitangent: bitangent.to_array(),
            });
        }

        match self.submeshes.last_mut() {
            Some(last) if last.material == material && last.first_vertex + last.vertex_count == first => {
                last.vertex_count += 3;
            }
            _ => self.submeshes.push(SubMesh { first_vertex: first, vertex_count: 3, material }),
        }
    }

    /// Appends a quad `a b c d` (counter-clockwise seen from the front) as two triangles.
    pub fn push_quad(&mut self, material: MaterialId, a: Vec3, b: Vec3, c: Vec3, d: Vec3) {
        let (ua, ub, uc, ud) = (Vec2::new(0.0, 1.0), Vec2::new(1.0, 1.0), Vec2::new(1.0, 0.0), Vec2::ZERO);
        self.push_triangle(material, [a, b, c], [ua, ub, uc]);
        self.push_triangle(material, [a, c, d], [ua, uc, ud]);
    }

    /// Appends an axis-aligned box with outward facing quads.
    pub fn push_box(&mut self, material: MaterialId, min: Vec3, max: Vec3) {
        let c = |x: f32, y: f32, z: f32| Vec3::new(x, y, z);
        let (x0, y0, z0, x1, y1, z1) = (min.x, min.y, min.z, max.x, max.y, max.z);
        self.push_quad(material, c(x0, y0, z1), c(x1, y0, z1), c(x1, y1, z1), c(x0, y1, z1)); // +z
        self.push_quad(material, c(x1, y0, z0), c(x0, y0, z0), c(x0, y1, z0), c(x1, y1, z0)); // -z
        self.push_quad(material, c(x1, y0, z1), c(x1, y0, z0), c(x1, y1, z0), c(x1, y1, z1)); // +x
        self.push_quad(material, c(x0, y0, z0), c(x0, y0, z1), c(x0, y1, z1), c(x0, y1, z0)); // -x
        self.push_quad(material, c(x0, y1, z1), c(x1, y1, z1), c(x1, y1, z0), c(x0, y1, z0)); // +y
        self.push_quad(material, c(x0, y0, z0), c(x1, y0, z0), c(x1, y0, z1), c(x0, y0, z1)); // -y
    }

    pub fn triangle_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(self.vertices.iter().map(|v| Vec3::from_array(v.position)))
    }
}

fn tangent_frame(p: [Vec3; 3], uv: [Vec2; 3], normal: Vec3) -> (Vec3, Vec3) {
    let e1 = p[1] - p[0];
    let e2 = p[2] - p[0];
    let d1 = uv[1] - uv[0];
    let d2 = uv[2] - uv[0];
    let det = d1.x * d2.y - d2.x * d1.y;

    if det.abs() < 1e-8 {
        let tangent = normal.any_orthonormal_vector();
        return (tangent, normal.cross(tangent));
    }

    let r = 1.0 / det;
    let tangent = ((e1 * d2.y - e2 * d1.y) * r).normalize_or_zero();
    let bitangent = ((e2 * d1.x - e1 * d2.x) * r).normalize_or_zero();
    (tangent, bitangent)
}

/// Model placement in world space.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self { position: Vec3::ZERO, rotation: Quat::IDENTITY, scale: Vec3::ONE }
    }
}

impl Transform {
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Inverse transpose of the model matrix, for transforming normals.
    pub fn normal_matrix(&self) -> Mat4 {
        self.model_matrix().inverse().transpose()
    }
}

/// Per-model uniform. Layout must match `Model` in the WGSL shaders.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(crate) struct ModelUniform {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 4],
}

impl From<&Transform> for ModelUniform {
    fn from(t: &Transform) -> Self {
        Self {
            model: t.model_matrix().to_cols_array_2d(),
            normal: t.normal_matrix().to_cols_array_2d(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const M0: MaterialId = MaterialId(0);
    const M1: MaterialId = MaterialId(1);

    // ── layout ────────────────────────────────────────────────────────────

    #[test]
    fn vertex_stride_matches_float_count() {
        assert_eq!(std::mem::size_of::<Vertex>(), Vertex::FLOATS * 4);
    }

    // ── building ──────────────────────────────────────────────────────────

    #[test]
    fn consecutive_triangles_share_a_submesh() {
        let mut mesh = MeshData::new();
        mesh.push_quad(M0, Vec3::ZERO, Vec3::X, Vec3::X + Vec3::Y, Vec3::Y);
        mesh.push_quad(M1, Vec3::ZERO, Vec3::X, Vec3::X + Vec3::Y, Vec3::Y);
        assert_eq!(mesh.triangle_count(), 4);
        assert_eq!(mesh.submeshes.len(), 2);
        assert_eq!(mesh.submeshes[0].vertices(), 0..6);
        assert_eq!(mesh.submeshes[1].vertices(), 6..12);
    }

    #[test]
    fn quad_normal_follows_winding() {
        let mut mesh = MeshData::new();
        mesh.push_quad(M0, Vec3::ZERO, Vec3::X, Vec3::X + Vec3::Y, Vec3::Y);
        for v in &mesh.vertices {
            assert_eq!(v.normal, [0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn tangent_frame_is_orthogonal_to_normal() {
        let mut mesh = MeshData::new();
        mesh.push_quad(M0, Vec3::ZERO, Vec3::X, Vec3::X + Vec3::Y, Vec3::Y);
        let v = mesh.vertices[0];
        let n = Vec3::from_array(v.normal);
        assert!(Vec3::from_array(v.tangent).dot(n).abs() < 1e-5);
        assert!(Vec3::from_array(v.bitangent).dot(n).abs() < 1e-5);
    }

    #[test]
    fn box_faces_point_outwards() {
        let mut mesh = MeshData::new();
        mesh.push_box(M0, Vec3::splat(-1.0), Vec3::splat(1.0));
        assert_eq!(mesh.triangle_count(), 12);
        for tri in mesh.vertices.chunks(3) {
            let centroid = tri.iter().map(|v| Vec3::from_array(v.position)).sum::<Vec3>() / 3.0;
            assert!(centroid.dot(Vec3::from_array(tri[0].normal)) > 0.0);
        }
    }

    #[test]
    fn bounding_box_covers_vertices() {
        let mut mesh = MeshData::new();
        mesh.push_box(M0, Vec3::new(-1.0, 0.0, 2.0), Vec3::new(3.0, 1.0, 4.0));
        let b = mesh.bounding_box();
        assert_eq!(b.min, Vec3::new(-1.0, 0.0, 2.0));
        assert_eq!(b.max, Vec3::new(3.0, 1.0, 4.0));
    }

    // ── transform ─────────────────────────────────────────────────────────

    #[test]
    fn normal_matrix_undoes_non_uniform_scale() {
        let t = Transform { scale: Vec3::new(2.0, 1.0, 1.0), ..Transform::default() };
        let n = t.normal_matrix().transform_vector3(Vec3::X);
        assert!((n - Vec3::new(0.5, 0.0, 0.0)).length() < 1e-6);
    }
}
