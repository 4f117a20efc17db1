use std::fmt;
use std::str::FromStr;

use tg_tensor::{BinaryOp, Reduction, UnaryOp};

use crate::error::EvalError;

/// Operation tags understood by the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Add,
    Sub,
    Mul,
    Pow,
    Div,
    Max,
    Negate,
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Abs,
    Tanh,
    Tan,
    Sin,
    Cos,
    Log,
    Exp,
    Sqrt,
    Square,
    Sign,
    Cast,
    Argmax,
    Index,
    Slice,
    Concat,
    ReduceSum,
    ReduceMean,
    ReduceProd,
    Transpose,
    Eye,
    Zeros,
    Ones,
    ZerosLike,
    OnesLike,
    Shape,
    Rank,
    Matmul,
    Reshape,
    Pad,
    Where,
    Cond,
    Assign,
    AssignAdd,
    AssignSub,
    FlowGroup,
    Identity,
    StopGradient,
    Print,
    RandomUniform,
    RandomNormal,
    Gradients,
}

impl OpKind {
    pub const ALL: [OpKind; 54] = [
        OpKind::Add,
        OpKind::Sub,
        OpKind::Mul,
        OpKind::Pow,
        OpKind::Div,
        OpKind::Max,
        OpKind::Negate,
        OpKind::Equal,
        OpKind::NotEqual,
        OpKind::Less,
        OpKind::Greater,
        OpKind::LessEqual,
        OpKind::GreaterEqual,
        OpKind::Abs,
        OpKind::Tanh,
        OpKind::Tan,
        OpKind::Sin,
        OpKind::Cos,
        OpKind::Log,
        OpKind::Exp,
        OpKind::Sqrt,
        OpKind::Square,
        OpKind::Sign,
        OpKind::Cast,
        OpKind::Argmax,
        OpKind::Index,
        OpKind::Slice,
        OpKind::Concat,
        OpKind::ReduceSum,
        OpKind::ReduceMean,
        OpKind::ReduceProd,
        OpKind::Transpose,
        OpKind::Eye,
        OpKind::Zeros,
        OpKind::Ones,
        OpKind::ZerosLike,
        OpKind::OnesLike,
        OpKind::Shape,
        OpKind::Rank,
        OpKind::Matmul,
        OpKind::Reshape,
        OpKind::Pad,
        OpKind::Where,
        OpKind::Cond,
        OpKind::Assign,
        OpKind::AssignAdd,
        OpKind::AssignSub,
        OpKind::FlowGroup,
        OpKind::Identity,
        OpKind::StopGradient,
        OpKind::Print,
        OpKind::RandomUniform,
        OpKind::RandomNormal,
        OpKind::Gradients,
    ];

    /// The snake_case tag for this operation.
    pub fn name(&self) -> &'static str {
        match self {
            OpKind::Add => "add",
            OpKind::Sub => "sub",
            OpKind::Mul => "mul",
            OpKind::Pow => "pow",
            OpKind::Div => "div",
            OpKind::Max => "max",
            OpKind::Negate => "negate",
            OpKind::Equal => "equal",
            OpKind::NotEqual => "not_equal",
            OpKind::Less => "less",
            OpKind::Greater => "greater",
            OpKind::LessEqual => "less_equal",
            OpKind::GreaterEqual => "greater_equal",
            OpKind::Abs => "abs",
            OpKind::Tanh => "tanh",
            OpKind::Tan => "tan",
            OpKind::Sin => "sin",
            OpKind::Cos => "cos",
            OpKind::Log => "log",
            OpKind::Exp => "exp",
            OpKind::Sqrt => "sqrt",
            OpKind::Square => "square",
            OpKind::Sign => "sign",
            OpKind::Cast => "cast",
            OpKind::Argmax => "argmax",
            OpKind::Index => "index",
            OpKind::Slice => "slice",
            OpKind::Concat => "concat",
            OpKind::ReduceSum => "reduce_sum",
            OpKind::ReduceMean => "reduce_mean",
            OpKind::ReduceProd => "reduce_prod",
            OpKind::Transpose => "transpose",
            OpKind::Eye => "eye",
            OpKind::Zeros => "zeros",
            OpKind::Ones => "ones",
            OpKind::ZerosLike => "zeros_like",
            OpKind::OnesLike => "ones_like",
            OpKind::Shape => "shape",
            OpKind::Rank => "rank",
            OpKind::Matmul => "matmul",
            OpKind::Reshape => "reshape",
            OpKind::Pad => "pad",
            OpKind::Where => "where",
            OpKind::Cond => "cond",
            OpKind::Assign => "assign",
            OpKind::AssignAdd => "assign_add",
            OpKind::AssignSub => "assign_sub",
            OpKind::FlowGroup => "flow_group",
            OpKind::Identity => "identity",
            OpKind::StopGradient => "stop_gradient",
            OpKind::Print => "print",
            OpKind::RandomUniform => "random_uniform",
            OpKind::RandomNormal => "random_normal",
            OpKind::Gradients => "gradients",
        }
    }

    /// Accepted operand counts, inclusive.
    ///
    /// Sequence-taking operations (`concat`, `flow_group`) receive their
    /// sequence through the `values` option instead of operands.
    pub fn arity(&self) -> (usize, usize) {
        use OpKind::*;
        match self {
            Add | Sub | Mul | Pow | Div | Max | Equal | NotEqual | Less | Greater | LessEqual
            | GreaterEqual | Index | Matmul | Where | Cond | Assign | AssignAdd | AssignSub => {
                (2, 2)
            }
            Negate | Abs | Tanh | Tan | Sin | Cos | Log | Exp | Sqrt | Square | Sign | Cast
            | Transpose | ZerosLike | OnesLike | Shape | Rank | Pad | Identity | StopGradient
            | Print => (1, 1),
            Argmax | Slice | ReduceSum | ReduceMean | ReduceProd | Reshape => (1, 2),
            Eye | Gradients => (0, 2),
            Zeros | Ones => (0, 1),
            Concat | FlowGroup | RandomUniform | RandomNormal => (0, 0),
        }
    }

    pub fn binary_op(&self) -> Option<BinaryOp> {
        Some(match self {
            OpKind::Add => BinaryOp::Add,
            OpKind::Sub => BinaryOp::Sub,
            OpKind::Mul => BinaryOp::Mul,
            OpKind::Pow => BinaryOp::Pow,
            OpKind::Div => BinaryOp::Div,
            OpKind::Max => BinaryOp::Max,
            OpKind::Equal => BinaryOp::Equal,
            OpKind::NotEqual => BinaryOp::NotEqual,
            OpKind::Less => BinaryOp::Less,
            OpKind::Greater => BinaryOp::Greater,
            OpKind::LessEqual => BinaryOp::LessEqual,
            OpKind::GreaterEqual => BinaryOp::GreaterEqual,
            _ => return None,
        })
    }

    pub fn unary_op(&self) -> Option<UnaryOp> {
        Some(match self {
            OpKind::Negate => UnaryOp::Negate,
            OpKind::Abs => UnaryOp::Abs,
            OpKind::Tanh => UnaryOp::Tanh,
            OpKind::Tan => UnaryOp::Tan,
            OpKind::Sin => UnaryOp::Sin,
            OpKind::Cos => UnaryOp::Cos,
            OpKind::Log => UnaryOp::Log,
            OpKind::Exp => UnaryOp::Exp,
            OpKind::Sqrt => UnaryOp::Sqrt,
            OpKind::Square => UnaryOp::Square,
            OpKind::Sign => UnaryOp::Sign,
            _ => return None,
        })
    }

    pub fn reduction(&self) -> Option<Reduction> {
        match self {
            OpKind::ReduceSum => Some(Reduction::Sum),
            OpKind::ReduceMean => Some(Reduction::Mean),
            OpKind::ReduceProd => Some(Reduction::Prod),
            _ => None,
        }
    }

    pub fn is_comparison(&self) -> bool {
        self.binary_op().is_some_and(|op| op.is_comparison())
    }

    /// Operations with side effects or control flow. These resolve their own
    /// operands instead of going through a pure kernel.
    pub fn is_stateful(&self) -> bool {
        matches!(
            self,
            OpKind::Assign
                | OpKind::AssignAdd
                | OpKind::AssignSub
                | OpKind::FlowGroup
                | OpKind::Identity
                | OpKind::StopGradient
                | OpKind::Print
                | OpKind::Cond
                | OpKind::Gradients
        )
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OpKind {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OpKind::ALL
            .iter()
            .copied()
            .find(|op| op.name() == s)
            .ok_or_else(|| EvalError::UnknownOperation(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_roundtrip() {
        for op in OpKind::ALL {
            assert_eq!(op.name().parse::<OpKind>().unwrap(), op);
        }
    }

    #[test]
    fn test_unknown_tag() {
        let err = "conv2d".parse::<OpKind>().unwrap_err();
        assert!(matches!(err, EvalError::UnknownOperation(ref s) if s == "conv2d"));
    }

    #[test]
    fn test_classification() {
        assert_eq!(OpKind::Sub.binary_op(), Some(BinaryOp::Sub));
        assert!(OpKind::LessEqual.is_comparison());
        assert!(!OpKind::Add.is_comparison());
        assert_eq!(OpKind::Sqrt.unary_op(), Some(UnaryOp::Sqrt));
        assert_eq!(OpKind::ReduceProd.reduction(), Some(Reduction::Prod));
        assert!(OpKind::AssignAdd.is_stateful());
        assert!(!OpKind::Matmul.is_stateful());
    }

    #[test]
    fn test_arity() {
        assert_eq!(OpKind::Add.arity(), (2, 2));
        assert_eq!(OpKind::ReduceSum.arity(), (1, 2));
        assert_eq!(OpKind::Concat.arity(), (0, 0));
    }
}
