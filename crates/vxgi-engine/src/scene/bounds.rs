use glam::Vec3;

/// Margin kept free at the border of the voxelization cube, in normalized units.
pub const VOXEL_SCALE_MARGIN: f32 = 0.1;

/// Smallest extent used per axis when deriving voxel scales.
const MIN_EXTENT: f32 = 1e-4;

/// Axis-aligned bounding box in world units.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    /// An inverted box that any point or box expands.
    pub const EMPTY: BoundingBox = BoundingBox {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Self {
        points.into_iter().fold(Self::EMPTY, |b, p| b.expanded_to(p))
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    #[inline]
    pub fn expanded_to(self, p: Vec3) -> Self {
        Self::new(self.min.min(p), self.max.max(p))
    }

    #[inline]
    pub fn union(self, other: BoundingBox) -> Self {
        Self::new(self.min.min(other.min), self.max.max(other.max))
    }

    #[inline]
    pub fn scaled(self, s: f32) -> Self {
        // Negative scales swap the corners.
        let a = self.min * s;
        let b = self.max * s;
        Self::new(a.min(b), a.max(b))
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }
}

/// Per-axis scale mapping `bbox` onto `[-1 + margin/2, 1 - margin/2]` once centered.
///
/// Returns the scale and whether any axis had to be clamped to a minimum extent.
pub fn voxel_scale_for(bbox: &BoundingBox, margin: f32) -> (Vec3, bool) {
    let extent = bbox.extent().abs();
    let clamped = extent.cmplt(Vec3::splat(MIN_EXTENT)).any();
    let safe = extent.max(Vec3::splat(MIN_EXTENT));
    (Vec3::splat(2.0 - margin) / safe, clamped)
}
