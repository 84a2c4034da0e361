//! Core logic for cytoscope-rs.
//!
//! This crate holds everything that does not need a GPU device:
//! - [`compute_frame_uniform`] turns a [`CameraState`] snapshot into the per-frame uniform block
//! - [`ScalarVolumeData`] validates raw volume bytes and [`UploadLayout`] pads them for upload
//! - [`FieldSeed`], [`PingPong`] and [`DispatchGrid`] describe the simulated field
//! - [`Viewport`] resolves the render-target size against the display
//! - [`Options`] is the serde-backed configuration

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]
// Voxel math moves between u32 grid sizes and usize buffer offsets
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]

pub mod camera_transform;
pub mod error;
pub mod field;
pub mod options;
pub mod viewport;
pub mod volume;

pub use camera_transform::{compute_frame_uniform, CameraState, DegenerateReason, FrameUniform};
pub use error::{CoreError, CoreResult};
pub use field::{
    DispatchGrid, FieldSeed, FieldSlot, PingPong, FLAT_INDEX_MAX_VOXELS, WORKGROUP_EDGE,
};
pub use options::{FieldRuleKind, FieldSeedKind, Options, RaymarchOptions, VolumeSource};
pub use viewport::{DisplayMetrics, Viewport};
pub use volume::{ScalarVolumeData, UploadLayout, VolumeExtent};

// Re-export glam types for convenience
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
