use crate::shape::Shape;

/// All errors that can occur within stn.
///
/// A single error type across the workspace keeps propagation simple: shape
/// and rank mismatches, invalid layer configurations, and matmul dimension
/// errors all flow through here. Out-of-range sampling coordinates are NOT
/// errors anywhere in this codebase; they are a silently handled case of the
/// bilinear sampler.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Shape mismatch between an array and what the operation expected.
    #[error("shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: Shape, got: Shape },

    /// Operation requires a specific rank (number of dimensions).
    #[error("rank mismatch: expected rank {expected}, got {got}")]
    RankMismatch { expected: usize, got: usize },

    /// Dimension index out of range for the array's rank.
    #[error("dimension out of range: dim {dim} for array with {rank} dimensions")]
    DimOutOfRange { dim: usize, rank: usize },

    /// Element count mismatch when creating an array from a vec.
    #[error("element count mismatch: shape {shape} requires {expected} elements, got {got}")]
    ElementCountMismatch {
        shape: Shape,
        expected: usize,
        got: usize,
    },

    /// Matrix multiplication dimension mismatch.
    #[error("gemm shape mismatch: [{m}x{k1}] @ [{k2}x{n}], inner dimensions must match")]
    MatmulShapeMismatch {
        m: usize,
        k1: usize,
        k2: usize,
        n: usize,
    },

    /// Cannot reshape because element counts differ.
    #[error(
        "cannot reshape: source has {src} elements, target shape {dst_shape} has {dst} elements"
    )]
    ReshapeElementMismatch {
        src: usize,
        dst: usize,
        dst_shape: Shape,
    },

    /// Invalid layer configuration. Fatal at configuration time: the layer
    /// stays in (or reverts to) its unconfigured state.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Generic message for cases not covered above.
    #[error("{0}")]
    Msg(String),
}

impl Error {
    /// Create an error from any string message.
    pub fn msg(s: impl Into<String>) -> Self {
        Error::Msg(s.into())
    }

    /// Create a configuration error from any string message.
    pub fn config(s: impl Into<String>) -> Self {
        Error::Configuration(s.into())
    }
}

/// Convenience Result type used throughout stn.
pub type Result<T> = std::result::Result<T, Error>;

/// Macro for early return with a formatted error message.
/// Usage: `bail!("something went wrong: {}", detail)`
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::Error::Msg(format!($($arg)*)))
    };
}
