//! smil-value-core: typed animated values and their per-kind operators (engine-agnostic)

pub mod arith;
pub mod blend;
pub mod coercion;
pub mod context;
pub mod error;
pub mod path;
pub mod transform;
pub mod value;

pub use context::ValueContext;
pub use error::ValueError;
pub use path::{PathCommand, PathData, PathSegment};
pub use transform::{Matrix, TransformList, TransformOp, TransformType};
pub use value::{LengthUnit, Paint, Value, ValueKind};
