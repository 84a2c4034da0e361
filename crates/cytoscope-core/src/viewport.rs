//! Render-target sizing against the display.

/// Display size as reported by the windowing layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayMetrics {
    /// Width in logical (scale-independent) pixels.
    pub logical_width: f64,
    /// Height in logical pixels.
    pub logical_height: f64,
    /// Device pixel ratio.
    pub scale_factor: f64,
}

impl DisplayMetrics {
    /// Metrics for a display whose physical size is already known.
    #[must_use]
    pub fn from_physical(width: u32, height: u32) -> Self {
        Self {
            logical_width: f64::from(width),
            logical_height: f64::from(height),
            scale_factor: 1.0,
        }
    }

    /// Physical pixel size: `floor(logical * max(1, scale))`, at least 1x1.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn physical_size(&self) -> (u32, u32) {
        let scale = if self.scale_factor.is_finite() {
            self.scale_factor.max(1.0)
        } else {
            1.0
        };
        let to_px = |logical: f64| ((logical.max(0.0) * scale).floor() as u32).max(1);
        (to_px(self.logical_width), to_px(self.logical_height))
    }

    /// Width over height of the physical size.
    #[must_use]
    pub fn aspect_ratio(&self) -> f32 {
        let (w, h) = self.physical_size();
        w as f32 / h as f32
    }
}

/// Size of the backing render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Creates a viewport, clamping each dimension to at least 1.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// Resizes to the display's physical size if it differs.
    ///
    /// Returns `true` when the size changed. Calling it again with the same
    /// display is a no-op.
    pub fn sync(&mut self, display: &DisplayMetrics) -> bool {
        let (width, height) = display.physical_size();
        if (width, height) == (self.width, self.height) {
            return false;
        }
        log::debug!(
            "viewport resize {}x{} -> {width}x{height}",
            self.width,
            self.height
        );
        self.width = width;
        self.height = height;
        true
    }
}
