//! Shader assembly and validated GPU object creation.

use crate::error::{RenderError, RenderResult};

/// Runs `build` inside a validation error scope.
///
/// wgpu reports invalid shaders and pipelines asynchronously through the
/// device's error sink; the scope turns them into an immediate `Err` with the
/// validation message.
pub fn validated<T>(device: &wgpu::Device, build: impl FnOnce() -> T) -> Result<T, String> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = build();
    match pollster::block_on(device.pop_error_scope()) {
        Some(error) => Err(error.to_string()),
        None => Ok(value),
    }
}

/// Builder that concatenates WGSL fragments into one module.
pub struct ShaderBuilder {
    parts: Vec<String>,
    label: Option<String>,
}

impl ShaderBuilder {
    /// Creates an empty shader builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parts: Vec::new(),
            label: None,
        }
    }

    /// Appends a WGSL source fragment.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.parts.push(source.into());
        self
    }

    /// Sets the shader label for debugging.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Returns the concatenated source.
    pub fn source(&self) -> RenderResult<String> {
        if self.parts.iter().all(|p| p.trim().is_empty()) {
            return Err(RenderError::ShaderCompilationFailed("empty shader source".into()));
        }
        Ok(self.parts.join("\n\n"))
    }

    /// Compiles the module, failing if WGSL validation reports an error.
    pub fn build(self, device: &wgpu::Device) -> RenderResult<wgpu::ShaderModule> {
        let source = self.source()?;
        let label = self.label.as_deref();
        validated(device, || {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label,
                source: wgpu::ShaderSource::Wgsl(source.into()),
            })
        })
        .map_err(|message| {
            log::error!("shader {label:?} failed to compile: {message}");
            RenderError::ShaderCompilationFailed(message)
        })
    }
}

impl Default for ShaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parts_are_joined_in_order() {
        let source = ShaderBuilder::new()
            .with_source("fn a() {}")
            .with_source("fn b() {}")
            .source()
            .unwrap();
        assert_eq!(source, "fn a() {}\n\nfn b() {}");
    }

    #[test]
    fn test_empty_source_is_rejected() {
        let err = ShaderBuilder::new().with_source("  ").source().unwrap_err();
        assert!(matches!(err, RenderError::ShaderCompilationFailed(_)));
    }
}
