//! Frame timing.
//!
//! - one `FrameClock` per render loop; `tick()` once per presented frame
//! - `FrameStats` smooths the deltas for display

mod frame_clock;
mod frame_stats;

pub use frame_clock::{FrameClock, FrameTime};
pub use frame_stats::FrameStats;
