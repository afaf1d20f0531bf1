pub mod gpu_context;

pub use gpu_context::{clear_color_from_rgb, GpuContext};
