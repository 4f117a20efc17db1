//! Rank-matching elementwise combinators over nested arrays.
//!
//! Broadcasting follows numpy's right-aligned rules, expressed structurally:
//! a lower-rank operand is repeated along the outer axis until both ranks
//! agree, after which a length-1 axis stretches to meet its partner.

use crate::error::{Result, TensorError};
use crate::scalar::{BinaryOp, UnaryOp};
use crate::value::Value;

/// Combines two values elementwise with broadcasting.
pub fn vector_op<F>(a: &Value, b: &Value, op: &F) -> Result<Value>
where
    F: Fn(&Value, &Value) -> Result<Value>,
{
    let (xs, ys) = match (a, b) {
        (Value::Array(xs), Value::Array(ys)) => (xs, ys),
        (Value::Array(_), constant) => return constant_op(a, constant, op, false),
        (constant, Value::Array(_)) => return constant_op(b, constant, op, true),
        (x, y) => return op(x, y),
    };

    let (rank_a, rank_b) = (a.rank(), b.rank());
    if rank_a < rank_b {
        let promoted = Value::Array(vec![a.clone(); ys.len()]);
        return vector_op(&promoted, b, op);
    }
    if rank_b < rank_a {
        let promoted = Value::Array(vec![b.clone(); xs.len()]);
        return vector_op(a, &promoted, op);
    }

    let n = match (xs.len(), ys.len()) {
        (p, q) if p == q => p,
        (1, q) => q,
        (p, 1) => p,
        _ => {
            return Err(TensorError::BroadcastError {
                a: a.dims(),
                b: b.dims(),
            })
        }
    };

    (0..n)
        .map(|i| {
            let x = if xs.len() == 1 { &xs[0] } else { &xs[i] };
            let y = if ys.len() == 1 { &ys[0] } else { &ys[i] };
            vector_op(x, y, op)
        })
        .collect::<Result<Vec<_>>>()
        .map(Value::Array)
}

/// Combines every scalar of `vector` with `constant`.
///
/// With `switch` set the constant becomes the left operand, which matters for
/// non-commutative operators. An array constant is handed back to
/// [`vector_op`] so that length-1 arrays broadcast positionally.
pub fn constant_op<F>(vector: &Value, constant: &Value, op: &F, switch: bool) -> Result<Value>
where
    F: Fn(&Value, &Value) -> Result<Value>,
{
    if constant.is_array() {
        return if switch {
            vector_op(constant, vector, op)
        } else {
            vector_op(vector, constant, op)
        };
    }
    vector.try_map(&|item| {
        if switch {
            op(constant, item)
        } else {
            op(item, constant)
        }
    })
}

/// Elementwise ternary combinator. Shapes must already agree; nothing broadcasts.
pub fn three_way_op<F>(p: &Value, a: &Value, b: &Value, op: &F) -> Result<Value>
where
    F: Fn(&Value, &Value, &Value) -> Result<Value>,
{
    match (p, a, b) {
        (Value::Array(ps), Value::Array(xs), Value::Array(ys))
            if ps.len() == xs.len() && ps.len() == ys.len() =>
        {
            ps.iter()
                .zip(xs)
                .zip(ys)
                .map(|((p, x), y)| three_way_op(p, x, y, op))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array)
        }
        (p, a, b) if p.is_scalar() && a.is_scalar() && b.is_scalar() => op(p, a, b),
        (p, a, b) => Err(TensorError::ShapeMismatch {
            expected: p.dims(),
            got: if a.dims() != p.dims() { a.dims() } else { b.dims() },
        }),
    }
}

/// Broadcasted binary operator.
pub fn binary(a: &Value, b: &Value, op: BinaryOp) -> Result<Value> {
    vector_op(a, b, &|x, y| op.apply(x, y))
}

/// Unary operator applied to every scalar.
pub fn unary(a: &Value, op: UnaryOp) -> Result<Value> {
    a.try_map(&|x| op.apply(x))
}
