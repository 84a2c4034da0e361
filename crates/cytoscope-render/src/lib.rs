//! Rendering backend for cytoscope-rs.
//!
//! This crate provides the wgpu side of the viewer:
//! - [`RenderEngine`] owns the device, queue and presentation target
//! - [`StaticVolume`] uploads the scanned scalar volume once
//! - [`FieldSimulation`] steps the ping-pong simulated field with a compute kernel
//! - [`CompositingRenderer`] ray-marches both volumes into the output image
//! - [`Camera`] is the orbit camera feeding the per-frame uniform

pub mod buffer;
pub mod camera;
pub mod compositor;
pub mod engine;
pub mod error;
pub mod field_sim;
pub mod readback;
pub mod screenshot;
pub mod shader;
pub mod volume_texture;

pub use camera::Camera;
pub use compositor::{
    CompositingRenderer, FrameOutcome, RaymarchUniforms, VOLUME_BOX_MAX, VOLUME_BOX_MIN,
};
pub use engine::{
    check_backend, classify_acquire_error, AcquireAction, AcquiredFrame, RenderEngine,
    OFFSCREEN_FORMAT, REQUESTED_BACKENDS,
};
pub use error::{RenderError, RenderResult};
pub use field_sim::{
    DynamicVolumeSource, FieldBuffer, FieldBufferId, FieldRule, FieldSimulation, GrayScottParams,
    VolumeBinding, FIELD_FORMAT,
};
pub use screenshot::{save_image, ScreenshotError};
pub use shader::ShaderBuilder;
pub use volume_texture::{create_static_volume, StaticVolume, STATIC_VOLUME_FORMAT};
