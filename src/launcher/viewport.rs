/// Padding buffer subtracted from the container on each axis (30px per
/// side) before fitting.
const PADDING_BUFFER: f64 = 60.0;

/// Scale factor that fits a logical viewport into a container, never
/// upscaling past 1:1.
pub fn fit_scale(
    container_width: f64,
    container_height: f64,
    logical_width: f64,
    logical_height: f64,
) -> f64 {
    let available_width = container_width - PADDING_BUFFER;
    let available_height = container_height - PADDING_BUFFER;
    let scale_x = available_width / logical_width;
    let scale_y = available_height / logical_height;
    scale_x.min(scale_y).min(1.0)
}

/// Tracks the display scale of the embedded environment, rendered at a fixed
/// logical resolution and shrunk to fit its container on resize.
#[derive(Debug, Clone)]
pub struct ViewportScaler {
    logical_width: f64,
    logical_height: f64,
    scale: f64,
}

impl ViewportScaler {
    /// Starts at half scale until the first real container measurement.
    pub fn new(logical_width: f64, logical_height: f64) -> Self {
        Self {
            logical_width,
            logical_height,
            scale: 0.5,
        }
    }

    pub fn resize(&mut self, container_width: f64, container_height: f64) -> f64 {
        self.scale = fit_scale(
            container_width,
            container_height,
            self.logical_width,
            self.logical_height,
        );
        self.scale
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn logical_size(&self) -> (f64, f64) {
        (self.logical_width, self.logical_height)
    }

    /// Rendered footprint at the current scale.
    pub fn scaled_size(&self) -> (f64, f64) {
        (self.logical_width * self.scale, self.logical_height * self.scale)
    }
}
