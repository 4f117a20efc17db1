use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TensorError {
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: Vec<usize>, got: Vec<usize> },
    #[error("rank mismatch: expected {expected}, got {got}")]
    RankMismatch { expected: usize, got: usize },
    #[error("incompatible tensor shapes {a:?} and {b:?} used during op")]
    BroadcastError { a: Vec<usize>, b: Vec<usize> },
    #[error("matmul dimension mismatch: [{m}x{k}] @ [{k2}x{n}]")]
    MatmulMismatch {
        m: usize,
        k: usize,
        k2: usize,
        n: usize,
    },
    #[error("invalid axis {axis} for value with {ndim} dimensions")]
    InvalidAxis { axis: i64, ndim: usize },
    #[error("reduction along axis {0} is not supported (only axes 0 and 1)")]
    UnsupportedReductionAxis(i64),
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: i64, len: usize },
    #[error("type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },
    #[error("cannot cast {value} to {dtype}")]
    InvalidCast { value: String, dtype: String },
    #[error("integer division by zero")]
    DivisionByZero,
    #[error("{0}")]
    Other(String),
}

impl TensorError {
    /// True for the errors that stem from incompatible shapes or ranks.
    pub fn is_shape_error(&self) -> bool {
        matches!(
            self,
            TensorError::ShapeMismatch { .. }
                | TensorError::RankMismatch { .. }
                | TensorError::BroadcastError { .. }
                | TensorError::MatmulMismatch { .. }
                | TensorError::InvalidAxis { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, TensorError>;
