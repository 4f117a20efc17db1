use thiserror::Error;
use tg_tensor::TensorError;

use crate::op::OpKind;

#[derive(Error, Debug)]
pub enum EvalError {
    #[error("unknown operation: {0}")]
    UnknownOperation(String),
    #[error("variable '{0}' read before it was initialized")]
    UninitializedVariable(String),
    #[error("no value bound for placeholder '{0}'")]
    MissingPlaceholder(String),
    #[error("'{0}' is not a variable")]
    NotAVariable(String),
    #[error("{op} takes {expected} operands, got {got}")]
    Arity {
        op: OpKind,
        expected: String,
        got: usize,
    },
    #[error("invalid option '{key}' for {op}: {reason}")]
    InvalidOption {
        op: OpKind,
        key: String,
        reason: String,
    },
    #[error("{0}")]
    Unsupported(String),
    #[error("no node with id {0}")]
    NoSuchNode(usize),
    #[error(transparent)]
    Tensor(#[from] TensorError),
    #[error("failed to evaluate {name} = {expression}{}: {cause}", at(.location))]
    Evaluation {
        name: String,
        expression: String,
        location: Option<String>,
        #[source]
        cause: Box<EvalError>,
    },
}

fn at(location: &Option<String>) -> String {
    location
        .as_deref()
        .map(|l| format!(" (defined at {})", l))
        .unwrap_or_default()
}

impl EvalError {
    /// The innermost error beneath any `Evaluation` wrappers.
    pub fn root_cause(&self) -> &EvalError {
        match self {
            EvalError::Evaluation { cause, .. } => cause.root_cause(),
            other => other,
        }
    }

    pub fn is_wrapped(&self) -> bool {
        matches!(self, EvalError::Evaluation { .. })
    }
}

pub type Result<T> = std::result::Result<T, EvalError>;
