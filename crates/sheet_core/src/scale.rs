//! Fitting the fixed-resolution canvas into whatever space its container has.
//!
//! The canvas is scaled uniformly until it touches the container on one axis,
//! then centered on the other.

use glam::Vec2;

/// Where the canvas lands inside its container, in container pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayRect {
    pub offset: Vec2,
    pub size: Vec2,
    pub scale: f32,
}

impl DisplayRect {
    /// Map a canvas coordinate to container space.
    pub fn canvas_to_screen(&self, canvas_point: Vec2) -> Vec2 {
        self.offset + canvas_point * self.scale
    }
}

pub fn fit_canvas(canvas: (u32, u32), container: Vec2) -> DisplayRect {
    if canvas.0 == 0 || canvas.1 == 0 || container.x <= 0.0 || container.y <= 0.0 {
        return DisplayRect {
            offset: Vec2::ZERO,
            size: Vec2::ZERO,
            scale: 0.0,
        };
    }

    let canvas_size = Vec2::new(canvas.0 as f32, canvas.1 as f32);
    let scale = (container.x / canvas_size.x).min(container.y / canvas_size.y);
    let size = canvas_size * scale;
    DisplayRect {
        offset: (container - size) * 0.5,
        size,
        scale,
    }
}
