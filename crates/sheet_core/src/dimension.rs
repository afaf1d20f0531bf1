//! Frame size as typed into the form.
//!
//! Values are kept exactly as entered (after numeric coercion) and only
//! checked at the point of use. Unparsable text becomes NaN, which fails
//! every `> 0` comparison.

/// Coerce raw input text to a number: surrounding whitespace is ignored, empty
/// text is 0, anything unparsable is NaN.
pub fn parse_dimension(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameDimensions {
    pub width: f64,
    pub height: f64,
}

impl FrameDimensions {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Both sides strictly positive. NaN is never valid.
    pub fn is_valid(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    /// Whole-pixel tile size, or `None` if the dimensions are not valid.
    /// Fractions are truncated and anything below one pixel becomes one.
    pub fn to_pixels(&self) -> Option<(u32, u32)> {
        if !self.is_valid() {
            return None;
        }
        Some((to_pixel(self.width), to_pixel(self.height)))
    }
}

impl Default for FrameDimensions {
    fn default() -> Self {
        Self::new(32.0, 32.0)
    }
}

fn to_pixel(value: f64) -> u32 {
    // `as` saturates, so infinity lands on u32::MAX.
    (value.trunc() as u32).max(1)
}
