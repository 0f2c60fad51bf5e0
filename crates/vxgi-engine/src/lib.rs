//! Voxel cone tracing engine crate.
//!
//! Owns the platform + GPU runtime pieces and the global illumination
//! pipeline: scene description, GPU assets, voxelization and cone tracing.

pub mod device;
pub mod window;
pub mod input;
pub mod time;
pub mod core;

pub mod logging;
pub mod coords;
pub mod error;
pub mod assets;
pub mod scene;
pub mod render;
