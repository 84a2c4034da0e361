use std::sync::Arc;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use cytoscope_core::DisplayMetrics;
use cytoscope_render::FrameOutcome;

use super::App;
use crate::CytoscopeError;

impl App {
    /// Steps the simulation and draws one frame.
    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(window), Some(engine), Some(scene)) =
            (&self.window, &mut self.engine, &mut self.scene)
        else {
            return;
        };

        // Device loss is only reported through this flag.
        if engine.device_lost() {
            self.fail(event_loop, CytoscopeError::DeviceLost);
            return;
        }

        let size = window.inner_size();
        let display = DisplayMetrics {
            logical_width: f64::from(size.width) / window.scale_factor(),
            logical_height: f64::from(size.height) / window.scale_factor(),
            scale_factor: window.scale_factor(),
        };
        let (width, height) = display.physical_size();
        // Round-tripping through logical pixels may lose a fraction; trust winit.
        let display = if (width, height) == (size.width, size.height) {
            display
        } else {
            DisplayMetrics::from_physical(size.width, size.height)
        };
        self.camera.set_aspect_ratio(display.aspect_ratio());

        scene.advance(engine, self.options.steps_per_frame);
        match scene.render(engine, &self.camera.state(), &display) {
            Ok(FrameOutcome::Rendered) => {}
            Ok(FrameOutcome::Skipped) => log::debug!("frame skipped"),
            Err(error) => {
                self.fail(event_loop, error);
                return;
            }
        }
        window.request_redraw();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attributes = Window::default_attributes()
            .with_title(self.options.window_title.clone())
            .with_inner_size(LogicalSize::new(
                self.options.window_width,
                self.options.window_height,
            ));

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(error) => {
                self.fail(event_loop, error.into());
                return;
            }
        };

        if let Err(error) = self.init_gpu(&window) {
            self.fail(event_loop, error);
            return;
        }
        window.request_redraw();
        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                // The next frame resizes the target to match.
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            WindowEvent::ModifiersChanged(modifiers) => {
                self.shift_down = modifiers.state().shift_key();
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let pressed = state == ElementState::Pressed;
                match button {
                    MouseButton::Left => self.left_mouse_down = pressed,
                    MouseButton::Right => self.right_mouse_down = pressed,
                    _ => {}
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let delta_x = (position.x - self.mouse_pos.0) as f32;
                let delta_y = (position.y - self.mouse_pos.1) as f32;
                self.mouse_pos = (position.x, position.y);

                // Left drag orbits; shift+left or right drag pans.
                let is_pan = self.right_mouse_down || (self.left_mouse_down && self.shift_down);
                if is_pan {
                    let scale = self.camera.distance * 0.002;
                    self.camera.pan(-delta_x * scale, delta_y * scale);
                } else if self.left_mouse_down {
                    self.camera.orbit(delta_x * 0.01, delta_y * 0.01);
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 * 0.1,
                };
                let scale = self.camera.distance * 0.1;
                self.camera.zoom(scroll * scale);
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed
                    && event.physical_key == PhysicalKey::Code(KeyCode::Escape)
                {
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }
}
