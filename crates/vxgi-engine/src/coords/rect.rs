use glam::Vec2;

/// Axis-aligned rectangle in physical pixels (top-left origin).
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rect {
    pub origin: Vec2,
    pub size: Vec2,
}

impl Rect {
    /// The zero rectangle: no origin offset, no area.
    pub const EMPTY: Rect = Rect::new(0.0, 0.0, 0.0, 0.0);

    #[inline]
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            origin: Vec2::new(x, y),
            size: Vec2::new(w, h),
        }
    }

    #[inline]
    pub const fn from_origin_size(origin: Vec2, size: Vec2) -> Self {
        Self { origin, size }
    }

    #[inline]
    pub fn max(self) -> Vec2 {
        self.origin + self.size
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.size.x <= 0.0 || self.size.y <= 0.0
    }

    /// Width over height; zero for rectangles without height.
    #[inline]
    pub fn aspect(self) -> f32 {
        if self.size.y <= 0.0 { 0.0 } else { self.size.x / self.size.y }
    }

    /// True when the rectangle lies inside `[0, bounds]` on both axes.
    #[inline]
    pub fn fits_within(self, bounds: Vec2) -> bool {
        let max = self.max();
        self.origin.x >= 0.0
            && self.origin.y >= 0.0
            && self.size.x >= 0.0
            && self.size.y >= 0.0
            && max.x <= bounds.x
            && max.y <= bounds.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(x: f32, y: f32, w: f32, h: f32) -> Rect { Rect::new(x, y, w, h) }

    // ── emptiness ─────────────────────────────────────────────────────────

    #[test]
    fn empty_constant_has_no_area() {
        assert!(Rect::EMPTY.is_empty());
        assert_eq!(Rect::EMPTY.aspect(), 0.0);
    }

    #[test]
    fn zero_height_is_empty() {
        assert!(r(0.0, 0.0, 10.0, 0.0).is_empty());
    }

    // ── aspect ────────────────────────────────────────────────────────────

    #[test]
    fn aspect_of_wide_rect() {
        assert_eq!(r(3.0, 4.0, 200.0, 100.0).aspect(), 2.0);
    }

    // ── fits_within ───────────────────────────────────────────────────────

    #[test]
    fn fits_within_exact_bounds() {
        assert!(r(0.0, 0.0, 640.0, 480.0).fits_within(Vec2::new(640.0, 480.0)));
    }

    #[test]
    fn overflowing_rect_does_not_fit() {
        assert!(!r(10.0, 0.0, 640.0, 480.0).fits_within(Vec2::new(640.0, 480.0)));
    }

    #[test]
    fn negative_origin_does_not_fit() {
        assert!(!r(-1.0, 0.0, 10.0, 10.0).fits_within(Vec2::new(640.0, 480.0)));
    }
}
