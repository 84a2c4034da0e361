//! Rendering error types.

use thiserror::Error;

use cytoscope_core::CoreError;

/// Errors that can occur during rendering operations.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Failed to create wgpu adapter.
    #[error("failed to create graphics adapter")]
    AdapterCreationFailed,

    /// The adapter's backend cannot write every layer of a 3D storage texture.
    #[error("graphics backend {0:?} cannot bind 3D storage textures")]
    UnsupportedBackend(wgpu::Backend),

    /// Failed to create wgpu device.
    #[error("failed to create graphics device: {0}")]
    DeviceCreationFailed(#[from] wgpu::RequestDeviceError),

    /// Failed to create surface.
    #[error("failed to create surface: {0}")]
    SurfaceCreationFailed(#[from] wgpu::CreateSurfaceError),

    /// Shader compilation failed.
    #[error("shader compilation failed: {0}")]
    ShaderCompilationFailed(String),

    /// Pipeline creation failed.
    #[error("pipeline creation failed: {0}")]
    PipelineCreationFailed(String),

    /// Texture creation failed.
    #[error("texture creation failed: {0}")]
    TextureCreationFailed(String),

    /// Out of memory.
    #[error("out of memory")]
    OutOfMemory,

    /// Reading a texture back to the host failed.
    #[error("GPU readback failed: {0}")]
    ReadbackFailed(String),

    /// The operation needs an offscreen target but the engine presents to a surface.
    #[error("engine has no offscreen target")]
    NoOffscreenTarget,

    /// Invalid configuration (volume size, camera, seed).
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// A specialized Result type for rendering operations.
pub type RenderResult<T> = std::result::Result<T, RenderError>;
