//! Display size of an embedded photograph.

/// Display height every photo is scaled to before clamping.
pub const TARGET_HEIGHT: f64 = 350.0;

/// Widest a photo may be drawn; wider photos are scaled down to this width.
pub const MAX_WIDTH: f64 = 580.0;

/// Display size in pixels, shared by the document and print renderers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitSize {
    pub width: f64,
    pub height: f64,
}

impl FitSize {
    /// Fit a `width` x `height` image to the fixed target height, clamping
    /// the width and preserving the aspect ratio.
    pub fn for_dimensions(width: u32, height: u32) -> Self {
        let ratio = if width == 0 || height == 0 {
            1.0
        } else {
            width as f64 / height as f64
        };

        let mut fit = FitSize {
            width: TARGET_HEIGHT * ratio,
            height: TARGET_HEIGHT,
        };
        if fit.width > MAX_WIDTH {
            fit.width = MAX_WIDTH;
            fit.height = MAX_WIDTH / ratio;
        }
        fit
    }

    /// Whole-pixel size, as written into markup and drawing extents.
    pub fn rounded(&self) -> (u32, u32) {
        (self.width.round() as u32, self.height.round() as u32)
    }
}
