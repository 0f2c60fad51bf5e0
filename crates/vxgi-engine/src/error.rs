use std::fmt;

/// Rejected renderer configuration change.
///
/// Returned before any state is touched; the renderer keeps running with its
/// previous configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Voxel grid resolution index outside the supported set.
    VoxelResolutionOutOfRange { index: usize, supported: usize },
    /// A render target size with a zero dimension.
    EmptyInternalResolution { width: u32, height: u32 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::VoxelResolutionOutOfRange { index, supported } => write!(
                f,
                "voxel grid resolution index {index} out of range (0..{supported})"
            ),
            ConfigError::EmptyInternalResolution { width, height } => {
                write!(f, "internal resolution {width}x{height} has no area")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
