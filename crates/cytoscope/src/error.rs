//! Error type for the cytoscope application layer.

use thiserror::Error;

use cytoscope_core::CoreError;
use cytoscope_render::{RenderError, ScreenshotError};

/// The main error type for cytoscope operations.
#[derive(Error, Debug)]
pub enum CytoscopeError {
    /// Invalid configuration or input data.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// GPU setup or rendering failed.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Saving a rendered frame failed.
    #[error("screenshot error: {0}")]
    Screenshot(#[from] ScreenshotError),

    /// The window could not be created.
    #[error("window creation failed: {0}")]
    Window(#[from] winit::error::OsError),

    /// The event loop could not be created or stopped with an error.
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    /// The GPU device was lost; every GPU resource must be rebuilt.
    #[error("GPU device lost")]
    DeviceLost,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for cytoscope operations.
pub type Result<T> = std::result::Result<T, CytoscopeError>;
