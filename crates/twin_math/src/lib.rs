// Re-export glam for convenience
pub use glam::*;

// Twin math types
pub mod color;
mod format;
mod transform;

pub use color::{parse_hex_color, NEUTRAL_GRAY};
pub use format::{format_real, format_real_f64, format_tuple};
pub use transform::Transform;
