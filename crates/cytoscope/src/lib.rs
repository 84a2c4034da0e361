//! cytoscope-rs: a volume viewer with a live simulated overlay.
//!
//! A static scalar volume (for example a scanned density field) is shown
//! together with a secondary "cytosol" field that a GPU compute kernel
//! advances every frame. Both are ray-marched into one maximum-intensity
//! projection.
//!
//! # Quick Start
//!
//! ```no_run
//! use cytoscope::*;
//!
//! fn main() -> Result<()> {
//!     let options = Options::from_json_str(r#"{ "field_seed": "noise", "field_rule": "gray_scott" }"#)?;
//!     run(options)
//! }
//! ```
//!
//! # Frame loop
//!
//! Every frame runs the simulation step(s) and then the compositor, in that
//! order, on one queue. The compositor always samples the buffer the last
//! step wrote; see [`FieldSimulation::step`] for the ordering guarantee.

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
// Mouse deltas and pixel sizes move between f64 and f32
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]

mod app;
pub mod error;
pub mod headless;
pub mod scene;
pub mod volume_io;

pub use app::{run, App};
pub use error::{CytoscopeError, Result};
pub use headless::HeadlessSession;
pub use scene::{Scene, SceneConfig};
pub use volume_io::{load_raw_volume, load_volume};

// Re-export core types
pub use cytoscope_core::{
    compute_frame_uniform, CameraState, CoreError, DisplayMetrics, FieldRuleKind, FieldSeed,
    FieldSeedKind, FieldSlot, FrameUniform, Options, PingPong, RaymarchOptions,
    ScalarVolumeData, VolumeExtent, VolumeSource, Mat4, Quat, Vec2, Vec3, Vec4,
};

// Re-export render types
pub use cytoscope_render::{
    Camera, CompositingRenderer, DynamicVolumeSource, FieldBufferId, FieldRule,
    FieldSimulation, FrameOutcome, GrayScottParams, RenderEngine, RenderError, StaticVolume,
    VOLUME_BOX_MAX, VOLUME_BOX_MIN,
};
