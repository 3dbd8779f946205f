pub const MIN_RELATIVE: f64 = 0.1;
pub const MAX_RELATIVE: f64 = 0.9;

/// Vertical counting line, kept as a relative position and re-derived in pixels whenever
/// the frame size or the position changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CountingLine {
    relative: f64,
    width: u32,
    height: u32,
    x: f32,
}

impl CountingLine {
    pub fn new(width: u32, height: u32, relative: f64) -> Self {
        let relative = if relative.is_finite() { relative } else { 0.5 };
        let relative = relative.clamp(MIN_RELATIVE, MAX_RELATIVE);

        Self {
            relative,
            width,
            height,
            x: Self::derive(width, relative),
        }
    }

    #[inline]
    fn derive(width: u32, relative: f64) -> f32 {
        (width as f64 * relative).floor() as f32
    }

    /// Absolute x of the line in pixels.
    #[inline]
    pub fn x(&self) -> f32 {
        self.x
    }

    #[inline]
    pub fn relative(&self) -> f64 {
        self.relative
    }

    #[inline]
    pub fn dims(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn set_position(&mut self, relative: f64) {
        if !relative.is_finite() {
            tracing::warn!("ignoring non-finite line position");
            return;
        }

        self.relative = relative.clamp(MIN_RELATIVE, MAX_RELATIVE);
        self.x = Self::derive(self.width, self.relative);
        tracing::info!("counting line moved to x={}", self.x);
    }

    pub fn set_frame_dimensions(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.x = Self::derive(width, self.relative);
    }
}
