//! Timing curves applied to sub-interval progress.
//!
//! `keySplines` eases each values segment with a cubic Bézier whose end points
//! are fixed at (0,0) and (1,1).

pub mod functions;

pub use functions::{bezier_ease_t, spline_ease};
