/// Rolling frame-time statistics for the on-screen title and trace logs.
///
/// Keeps an exponential moving average of the frame delta; the first sample
/// seeds it directly.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameStats {
    frames: u64,
    average_dt: f32,
    last_dt: f32,
}

impl FrameStats {
    /// Weight of the newest sample in the moving average.
    pub const SMOOTHING: f32 = 0.1;

    pub fn record(&mut self, dt: f32) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        self.average_dt = if self.frames == 0 {
            dt
        } else {
            self.average_dt + (dt - self.average_dt) * Self::SMOOTHING
        };
        self.last_dt = dt;
        self.frames += 1;
    }

    #[inline]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    #[inline]
    pub fn last_frame_ms(&self) -> f32 {
        self.last_dt * 1000.0
    }

    #[inline]
    pub fn average_frame_ms(&self) -> f32 {
        self.average_dt * 1000.0
    }

    pub fn fps(&self) -> f32 {
        if self.average_dt > 0.0 { 1.0 / self.average_dt } else { 0.0 }
    }
}

impl Default for FrameStats {
    fn default() -> Self {
        Self { frames: 0, average_dt: 0.0, last_dt: 0.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stats_report_zero_fps() {
        assert_eq!(FrameStats::default().fps(), 0.0);
    }

    #[test]
    fn first_sample_seeds_average() {
        let mut s = FrameStats::default();
        s.record(0.02);
        assert_eq!(s.frames(), 1);
        assert!((s.fps() - 50.0).abs() < 1e-3);
    }

    #[test]
    fn average_moves_towards_new_samples() {
        let mut s = FrameStats::default();
        s.record(0.01);
        s.record(0.02);
        assert!((s.average_frame_ms() - 11.0).abs() < 1e-3);
        assert!((s.last_frame_ms() - 20.0).abs() < 1e-3);
    }

    #[test]
    fn invalid_samples_are_ignored() {
        let mut s = FrameStats::default();
        s.record(0.0);
        s.record(f32::NAN);
        assert_eq!(s.frames(), 0);
    }
}
