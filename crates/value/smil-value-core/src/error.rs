//! Errors raised while building values (path data, transform lists).

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValueError {
    #[error("path segment '{command:?}' expects {expected} coordinates, got {actual}")]
    PathArity {
        command: crate::path::PathCommand,
        expected: usize,
        actual: usize,
    },

    #[error("path data must start with a moveto")]
    PathWithoutMoveTo,

    #[error("transform '{kind:?}' expects at most {expected} parameters, got {actual}")]
    TransformArity {
        kind: crate::transform::TransformType,
        expected: usize,
        actual: usize,
    },
}
