//! Error types for cytoscope-rs.

use thiserror::Error;

use crate::camera_transform::DegenerateReason;

/// Configuration errors raised before any GPU work is issued.
///
/// All of these are fatal at construction time: callers abort
/// initialization rather than clamp or retry.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Raw volume byte count does not match the declared dimensions.
    #[error("volume size mismatch: expected {expected} bytes, got {actual}")]
    VolumeSizeMismatch { expected: usize, actual: usize },

    /// One of the declared volume dimensions is zero.
    #[error("volume has a zero dimension")]
    EmptyVolume,

    /// The camera cannot produce an invertible view-projection.
    #[error("degenerate camera: {0}")]
    DegenerateCamera(DegenerateReason),

    /// Explicit field seed has the wrong number of voxels.
    #[error("field seed size mismatch: expected {expected} voxels, got {actual}")]
    SeedSizeMismatch { expected: usize, actual: usize },

    /// Seed values would not survive the `f16` field encoding.
    #[error("seed needs exact values for {voxels} voxels; f16 allows at most {max}")]
    SeedNotRepresentable { voxels: usize, max: usize },

    /// Field edge length is zero.
    #[error("invalid field size {0}")]
    InvalidFieldSize(u32),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for core operations.
pub type CoreResult<T> = std::result::Result<T, CoreError>;
