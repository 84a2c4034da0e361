//! Headless rendering API for cytoscope-rs.
//!
//! Runs the simulation and compositor against an offscreen target without
//! opening a window. Useful for integration tests, batch processing and
//! automated screenshots.

use std::path::Path;

use cytoscope_core::{CameraState, DisplayMetrics, RaymarchOptions, ScalarVolumeData, Viewport};
use cytoscope_render::{FrameOutcome, RenderEngine};
use pollster::FutureExt;

use crate::scene::{Scene, SceneConfig};
use crate::Result;

/// An offscreen engine with its scene.
pub struct HeadlessSession {
    engine: RenderEngine,
    scene: Scene,
}

impl HeadlessSession {
    /// Creates a headless GPU context of `width` x `height` pixels and
    /// builds the scene on it.
    ///
    /// # Example
    /// ```no_run
    /// use cytoscope::*;
    ///
    /// let volume = ScalarVolumeData::synthetic_sphere(VolumeExtent::cube(32)).unwrap();
    /// let mut session = HeadlessSession::new(256, 256, &volume, &SceneConfig::default()).unwrap();
    /// session.step();
    /// let pixels = session.render(&Camera::new(1.0).state()).unwrap();
    /// assert_eq!(pixels.len(), 256 * 256 * 4);
    /// ```
    pub fn new(
        width: u32,
        height: u32,
        volume: &ScalarVolumeData,
        config: &SceneConfig,
    ) -> Result<Self> {
        let engine = RenderEngine::new_headless(width, height).block_on()?;
        let scene = Scene::new(&engine, volume, config)?;
        Ok(Self { engine, scene })
    }

    /// Runs one simulation step and returns the step count.
    pub fn step(&mut self) -> u64 {
        self.scene.advance(&self.engine, 1)
    }

    /// Runs `steps` simulation steps and returns the step count.
    pub fn advance(&mut self, steps: u32) -> u64 {
        self.scene.advance(&self.engine, steps)
    }

    /// Renders one frame and returns it as RGBA8 rows, top row first.
    pub fn render(&mut self, camera: &CameraState) -> Result<Vec<u8>> {
        let viewport = self.engine.viewport();
        let display = DisplayMetrics::from_physical(viewport.width, viewport.height);
        match self.scene.render(&mut self.engine, camera, &display)? {
            FrameOutcome::Rendered => {}
            // The offscreen target is always available.
            FrameOutcome::Skipped => log::warn!("headless frame skipped"),
        }
        Ok(self.engine.read_offscreen()?)
    }

    /// Renders one frame and saves it as PNG or JPEG.
    pub fn render_to_file(&mut self, path: impl AsRef<Path>, camera: &CameraState) -> Result<()> {
        let data = self.render(camera)?;
        let viewport = self.engine.viewport();
        cytoscope_render::save_image(path, &data, viewport.width, viewport.height)?;
        Ok(())
    }

    /// Reads the current field back, blocking until submitted steps finish.
    pub fn read_field(&self) -> Result<Vec<[f32; 4]>> {
        Ok(self
            .scene
            .simulation()
            .read_current(&self.engine.device, &self.engine.queue)?)
    }

    /// Replaces the ray marching parameters used by later renders.
    pub fn set_raymarch_options(&mut self, options: RaymarchOptions) {
        self.scene.set_raymarch_options(&self.engine, options);
    }

    /// Resizes the offscreen target; returns whether the size changed.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        self.engine.resize(width, height)
    }

    /// Current offscreen target size.
    pub fn viewport(&self) -> Viewport {
        self.engine.viewport()
    }

    /// The render engine.
    pub fn engine(&self) -> &RenderEngine {
        &self.engine
    }

    /// The scene being rendered.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }
}
