//! Application window and event loop management.

mod input;

use std::sync::Arc;

use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::Window;

use cytoscope_core::{Options, ScalarVolumeData};
use cytoscope_render::{Camera, RenderEngine, VOLUME_BOX_MAX, VOLUME_BOX_MIN};

use crate::scene::{Scene, SceneConfig};
use crate::{CytoscopeError, Result};

/// The interactive viewer state.
pub struct App {
    options: Options,
    volume: ScalarVolumeData,
    window: Option<Arc<Window>>,
    engine: Option<RenderEngine>,
    scene: Option<Scene>,
    camera: Camera,
    // Mouse state for camera control
    mouse_pos: (f64, f64),
    left_mouse_down: bool,
    right_mouse_down: bool,
    shift_down: bool,
    // First fatal error; ends the event loop.
    error: Option<CytoscopeError>,
}

impl App {
    /// Creates the application for `volume`. GPU resources are created once
    /// the event loop resumes.
    pub fn new(options: Options, volume: ScalarVolumeData) -> Self {
        let aspect = options.window_width.max(1) as f32 / options.window_height.max(1) as f32;
        let mut camera = Camera::new(aspect);
        camera.frame_box(VOLUME_BOX_MIN, VOLUME_BOX_MAX);
        Self {
            options,
            volume,
            window: None,
            engine: None,
            scene: None,
            camera,
            mouse_pos: (0.0, 0.0),
            left_mouse_down: false,
            right_mouse_down: false,
            shift_down: false,
            error: None,
        }
    }

    fn init_gpu(&mut self, window: &Arc<Window>) -> Result<()> {
        let engine = pollster::block_on(RenderEngine::new_windowed(Arc::clone(window)))?;
        let scene = Scene::new(&engine, &self.volume, &SceneConfig::from(&self.options))?;
        self.engine = Some(engine);
        self.scene = Some(scene);
        Ok(())
    }

    /// Records a fatal error and stops the loop.
    fn fail(&mut self, event_loop: &ActiveEventLoop, error: CytoscopeError) {
        log::error!("{error}");
        if self.error.is_none() {
            self.error = Some(error);
        }
        event_loop.exit();
    }
}

/// Opens a window and runs the simulation and renderer until it is closed.
///
/// Each frame runs `options.steps_per_frame` simulation steps and then draws
/// the composited volumes. Left drag orbits, right or shift-left drag pans,
/// the wheel zooms and Escape quits.
pub fn run(options: Options) -> Result<()> {
    let _ = env_logger::try_init();

    let volume = crate::volume_io::load_volume(&options)?;
    let event_loop = EventLoop::new()?;
    let mut app = App::new(options, volume);
    event_loop.run_app(&mut app)?;

    match app.error {
        Some(error) => Err(error),
        None => Ok(()),
    }
}
