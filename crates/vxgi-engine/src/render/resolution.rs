use glam::Vec2;

use crate::coords::Rect;

/// Maps the fixed internal render resolution onto the window back-buffer.
///
/// The mapper keeps the internal aspect ratio and centers the image, padding
/// with bars on the short axis (letterbox or pillarbox).
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct ResolutionMapper {
    window: Vec2,
    internal: Vec2,
    window_aspect: f32,
    internal_aspect: f32,
    viewport: Rect,
}

impl ResolutionMapper {
    pub fn new(window: Vec2, internal: Vec2) -> Self {
        let mut mapper = Self::default();
        mapper.set(window, internal);
        mapper.rescale_to_fit();
        mapper
    }

    /// Stores both sizes and resets the viewport. Call `rescale_to_fit` afterwards.
    pub fn set(&mut self, window: Vec2, internal: Vec2) {
        self.window = window;
        self.internal = internal;
        self.window_aspect = aspect_of(window);
        self.internal_aspect = aspect_of(internal);
        self.viewport = Rect::EMPTY;
    }

    /// Recomputes the largest centered rectangle with the internal aspect ratio.
    pub fn rescale_to_fit(&mut self) {
        self.viewport = fit_rect(self.window, self.internal, self.internal_aspect);
    }

    pub fn window_resized(&mut self, width: u32, height: u32) {
        self.window = Vec2::new(width as f32, height as f32);
        self.window_aspect = aspect_of(self.window);
        self.rescale_to_fit();
    }

    #[inline]
    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    #[inline]
    pub fn window_size(&self) -> Vec2 {
        self.window
    }

    #[inline]
    pub fn internal_size(&self) -> Vec2 {
        self.internal
    }

    #[inline]
    pub fn window_aspect(&self) -> f32 {
        self.window_aspect
    }

    #[inline]
    pub fn internal_aspect(&self) -> f32 {
        self.internal_aspect
    }
}

fn aspect_of(size: Vec2) -> f32 {
    if size.y > 0.0 { size.x / size.y } else { 0.0 }
}

fn fit_rect(window: Vec2, internal: Vec2, aspect: f32) -> Rect {
    if window.x <= 0.0 || window.y <= 0.0 || aspect <= 0.0 {
        return Rect::EMPTY;
    }
    if window == internal {
        return Rect::from_origin_size(Vec2::ZERO, window);
    }

    // Both branches round the derived side the same way and clamp to the window.
    let mut size = Vec2::new(window.x, (window.x / aspect).round());
    if size.y > window.y {
        size = Vec2::new((window.y * aspect).round().min(window.x), window.y);
    }

    let origin = ((window - size) * 0.5).round().max(Vec2::ZERO);
    Rect::from_origin_size(origin, size)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapped(window: (f32, f32), internal: (f32, f32)) -> Rect {
        ResolutionMapper::new(Vec2::new(window.0, window.1), Vec2::new(internal.0, internal.1))
            .viewport()
    }

    // ── fixed scenarios ───────────────────────────────────────────────────

    #[test]
    fn pillarbox_square_image_in_wide_window() {
        let vp = mapped((1920.0, 1080.0), (1024.0, 1024.0));
        assert_eq!(vp.size, Vec2::new(1080.0, 1080.0));
        assert_eq!(vp.origin, Vec2::new(420.0, 0.0));
    }

    #[test]
    fn letterbox_wide_image_in_square_window() {
        let vp = mapped((1000.0, 1000.0), (2000.0, 1000.0));
        assert_eq!(vp.size, Vec2::new(1000.0, 500.0));
        assert_eq!(vp.origin, Vec2::new(0.0, 250.0));
    }

    #[test]
    fn equal_sizes_fill_the_window() {
        let vp = mapped((1280.0, 720.0), (1280.0, 720.0));
        assert_eq!(vp, Rect::new(0.0, 0.0, 1280.0, 720.0));
    }

    #[test]
    fn same_aspect_different_size_fills_the_window() {
        let vp = mapped((1920.0, 1080.0), (1280.0, 720.0));
        assert_eq!(vp, Rect::new(0.0, 0.0, 1920.0, 1080.0));
    }

    // ── lifecycle ─────────────────────────────────────────────────────────

    #[test]
    fn set_resets_viewport_until_refit() {
        let mut m = ResolutionMapper::new(Vec2::new(800.0, 600.0), Vec2::new(512.0, 512.0));
        assert!(!m.viewport().is_empty());
        m.set(Vec2::new(800.0, 600.0), Vec2::new(512.0, 512.0));
        assert_eq!(m.viewport(), Rect::EMPTY);
        m.rescale_to_fit();
        assert_eq!(m.viewport().size, Vec2::new(600.0, 600.0));
    }

    #[test]
    fn window_resized_refits_and_updates_aspect() {
        let mut m = ResolutionMapper::new(Vec2::new(800.0, 600.0), Vec2::new(512.0, 512.0));
        m.window_resized(1920, 1080);
        assert_eq!(m.window_aspect(), 1920.0 / 1080.0);
        assert_eq!(m.viewport().origin, Vec2::new(420.0, 0.0));
    }

    #[test]
    fn minimized_window_yields_empty_viewport() {
        let mut m = ResolutionMapper::new(Vec2::new(800.0, 600.0), Vec2::new(512.0, 512.0));
        m.window_resized(0, 0);
        assert!(m.viewport().is_empty());
        assert!(m.viewport().fits_within(Vec2::ZERO));
    }

    // ── properties ────────────────────────────────────────────────────────

    #[test]
    fn viewport_fits_and_keeps_aspect_for_many_pairs() {
        let sizes = [
            (4.0, 3.0), (64.0, 48.0), (333.0, 777.0), (640.0, 480.0), (800.0, 600.0),
            (1024.0, 1024.0), (1280.0, 720.0), (1366.0, 768.0), (1920.0, 1080.0),
            (2560.0, 1080.0), (3840.0, 2160.0), (720.0, 1280.0),
        ];

        for &(ww, wh) in &sizes {
            for &(iw, ih) in &sizes {
                let vp = mapped((ww, wh), (iw, ih));
                let window = Vec2::new(ww, wh);

                assert!(vp.fits_within(window), "{vp:?} escapes {window:?}");

                if (ww, wh) == (iw, ih) {
                    assert_eq!(vp, Rect::new(0.0, 0.0, ww, wh));
                    continue;
                }

                // Half a pixel of rounding on the derived side is tolerated.
                let expected = iw / ih;
                let tolerance = (expected + 1.0) * 0.5 / vp.size.y.max(1.0) + 1e-4;
                assert!(
                    (vp.aspect() - expected).abs() <= tolerance,
                    "aspect {} vs {} for window {:?} internal {:?}",
                    vp.aspect(),
                    expected,
                    (ww, wh),
                    (iw, ih)
                );
            }
        }
    }
}
