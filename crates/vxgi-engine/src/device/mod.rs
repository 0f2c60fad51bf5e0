//! GPU device + surface management.
//!
//! - picks the adapter and requests the limits the G-buffer pass needs
//! - configures the window swapchain
//! - acquires frames and hands out an encoder + view per frame

mod frame;
mod gpu;
mod init;
mod surface;

pub use frame::GpuFrame;
pub use gpu::Gpu;
pub use init::{GBUFFER_ATTACHMENT_BYTES_PER_SAMPLE, GpuInit};
pub use surface::SurfaceErrorAction;
