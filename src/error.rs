//! Typed errors for configuration, seeding, and accelerator setup.
//!
//! Everything here is fatal to the run: the engine is a batch kernel, not a
//! service, and there is no partial-failure or retry semantics. Normal
//! outcomes (stabilization, budget exhaustion) are ordinary return values.

use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// Tile dimensions do not evenly divide the grid dimension.
    TileMismatch { dim: usize, tile_w: usize, tile_h: usize },

    /// Hybrid band split is unusable (band not tile-aligned, sync period
    /// zero or not smaller than the band, or band larger than the grid).
    InvalidPartition { device_rows: usize, sync_period: usize },

    /// A named seed pattern needs a larger grid than configured.
    GridTooSmall { required: usize, actual: usize },

    /// No compatible GPU adapter was found by wgpu.
    NoAdapter,

    /// GPU device creation failed (wraps the underlying wgpu error message).
    DeviceCreation(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TileMismatch { dim, tile_w, tile_h } => write!(
                f,
                "tile size {tile_w}x{tile_h} does not evenly divide grid dimension {dim}"
            ),
            Self::InvalidPartition { device_rows, sync_period } => write!(
                f,
                "invalid hybrid split: {device_rows} device rows, sync period {sync_period}"
            ),
            Self::GridTooSmall { required, actual } => write!(
                f,
                "grid dimension should be at least {required}, got {actual}"
            ),
            Self::NoAdapter => write!(f, "no GPU adapter found"),
            Self::DeviceCreation(e) => write!(f, "failed to create GPU device: {e}"),
        }
    }
}

impl std::error::Error for Error {}
