//! Screen-space geometry shared by the presentation code.
//!
//! Rectangles are expressed in physical pixels of the window back-buffer,
//! origin top-left, +X right, +Y down (the wgpu viewport convention).

mod rect;

pub use rect::Rect;
