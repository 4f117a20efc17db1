use tg_tensor::broadcast;
use tg_tensor::reduce::{self, Reduction};
use tg_tensor::tensor;
use tg_tensor::{cast as dtype_cast, ComputeBackend, Value};

use super::args::Args;
use crate::error::Result;

pub(super) fn binary(args: &Args) -> Result<Value> {
    let op = args
        .op
        .binary_op()
        .ok_or_else(|| args.invalid("op", "not a binary operation"))?;
    Ok(broadcast::binary(args.a()?, args.b()?, op)?)
}

pub(super) fn unary(args: &Args) -> Result<Value> {
    let op = args
        .op
        .unary_op()
        .ok_or_else(|| args.invalid("op", "not a unary operation"))?;
    Ok(broadcast::unary(args.a()?, op)?)
}

pub(super) fn cast(args: &Args) -> Result<Value> {
    Ok(dtype_cast::cast(args.a()?, args.dtype)?)
}

/// Axes from operand `b` or the `axis` option: a scalar or a list.
fn axes(args: &Args) -> Result<Option<Vec<i64>>> {
    let Some(axis) = args.operand_or(1, "axis") else {
        return Ok(None);
    };
    let axes = if axis.is_array() {
        axis.as_i64_vec()
    } else {
        axis.as_i64().map(|a| vec![a])
    };
    axes.map(Some)
        .map_err(|e| args.invalid("axis", &e.to_string()))
}

pub(super) fn reduce(args: &Args) -> Result<Value> {
    let reduction = args.op.reduction().unwrap_or(Reduction::Sum);
    let value = args.a()?;
    let axes = axes(args)?;
    let keep_dims = args.flag("keepdims") || args.flag("keep_dims");
    let dtype = args.effective_dtype(value);
    Ok(reduce::reduce(
        value,
        axes.as_deref(),
        keep_dims,
        reduction,
        dtype,
    )?)
}

pub(super) fn argmax(args: &Args) -> Result<Value> {
    let axis = match axes(args)?.as_deref() {
        None => 0,
        Some([axis]) => *axis,
        Some(_) => return Err(args.invalid("axis", "argmax takes a single axis")),
    };
    Ok(reduce::argmax(args.a()?, axis)?)
}

pub(super) fn matmul(args: &Args, backend: &dyn ComputeBackend) -> Result<Value> {
    Ok(tensor::matmul(
        args.a()?,
        args.b()?,
        args.flag("transpose_a"),
        args.flag("transpose_b"),
        backend,
    )?)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use tg_tensor::{DType, TensorError};

    use crate::context::ExecutionContext;
    use crate::error::EvalError;
    use crate::eval::evaluate;
    use crate::graph::Graph;
    use crate::op::OpKind;
    use crate::options::Options;

    use super::*;

    fn eval(g: &mut Graph, op: OpKind, inputs: &[crate::NodeId], options: Options) -> Result<Value> {
        let id = g.op(op, inputs, options)?;
        let out = evaluate(g, id, &mut ExecutionContext::new())?;
        Ok(out.into_value().unwrap())
    }

    #[test]
    fn test_broadcast_rank_promotion() {
        let mut g = Graph::new();
        let row = g.constant("row", vec![10, 20, 30]).unwrap();
        let m = g.constant("m", vec![vec![1, 2, 3], vec![4, 5, 6]]).unwrap();
        let out = eval(&mut g, OpKind::Add, &[row, m], Options::new()).unwrap();
        assert_eq!(out, Value::from(vec![vec![11, 22, 33], vec![14, 25, 36]]));
        let flipped = eval(&mut g, OpKind::Add, &[m, row], Options::new()).unwrap();
        assert_eq!(out, flipped);
    }

    #[test]
    fn test_comparison_is_boolean() {
        let mut g = Graph::new();
        let a = g.constant("a", vec![1, 5, 3]).unwrap();
        let b = g.constant("b", 3).unwrap();
        let out = eval(&mut g, OpKind::GreaterEqual, &[a, b], Options::new()).unwrap();
        assert_eq!(out, Value::from(vec![false, true, true]));
    }

    #[test]
    fn test_scalar_first_operand_order() {
        let mut g = Graph::new();
        let ten = g.constant("ten", 10).unwrap();
        let v = g.constant("v", vec![1, 2]).unwrap();
        let out = eval(&mut g, OpKind::Sub, &[ten, v], Options::new()).unwrap();
        assert_eq!(out, Value::from(vec![9, 8]));
    }

    #[test]
    fn test_log_and_sign() {
        let mut g = Graph::new();
        let x = g.constant_typed("x", vec![-1.0, 0.0, 2.0], DType::Float64).unwrap();
        let log = eval(&mut g, OpKind::Log, &[x], Options::new()).unwrap();
        let log = log.flatten();
        assert!(log[0].as_f64().unwrap().is_nan());
        assert_eq!(log[1].as_f64().unwrap(), f64::NEG_INFINITY);
        assert_relative_eq!(log[2].as_f64().unwrap(), 2f64.ln());

        let sign = eval(&mut g, OpKind::Sign, &[x], Options::new()).unwrap();
        assert_eq!(sign, Value::from(vec![-1.0, 0.0, 1.0]));
    }

    #[test]
    fn test_cast_uses_dtype_option() {
        let mut g = Graph::new();
        let x = g.constant("x", vec![1.7, -2.2]).unwrap();
        let opts = Options::new().with("dtype", DType::Int32);
        let out = eval(&mut g, OpKind::Cast, &[x], opts).unwrap();
        assert_eq!(out, Value::from(vec![1, -2]));
    }

    #[test]
    fn test_reduce_variants() {
        let mut g = Graph::new();
        let x = g.constant("x", vec![vec![1, 2], vec![3, 4]]).unwrap();
        let prod = eval(&mut g, OpKind::ReduceProd, &[x], Options::new()).unwrap();
        assert_eq!(prod, Value::Int(24));

        let keep = Options::new()
            .with("axis", Value::from(vec![0, 1]))
            .with("keepdims", true);
        let sum = eval(&mut g, OpKind::ReduceSum, &[x], keep).unwrap();
        assert_eq!(sum, Value::from(vec![vec![10]]));

        let mean = eval(&mut g, OpKind::ReduceMean, &[x], Options::new().with("axis", -1i64)).unwrap();
        assert_eq!(mean, Value::from(vec![1, 3]));
    }

    #[test]
    fn test_reduce_empty_identities() {
        let mut g = Graph::new();
        let empty = g
            .constant_typed("empty", Value::Array(vec![Value::Array(vec![])]), DType::Float32)
            .unwrap();
        let axis = Options::new().with("axis", 1i64);
        let sum = eval(&mut g, OpKind::ReduceSum, &[empty], axis.clone()).unwrap();
        assert_eq!(sum, Value::from(vec![0.0]));
        let prod = eval(&mut g, OpKind::ReduceProd, &[empty], axis).unwrap();
        assert_eq!(prod, Value::from(vec![1.0]));
    }

    #[test]
    fn test_reduce_unsupported_axis() {
        let mut g = Graph::new();
        let x = g
            .constant("x", vec![vec![vec![1, 2]], vec![vec![3, 4]]])
            .unwrap();
        let err = eval(&mut g, OpKind::ReduceSum, &[x], Options::new().with("axis", 2i64))
            .unwrap_err();
        assert!(matches!(
            err.root_cause(),
            EvalError::Tensor(TensorError::UnsupportedReductionAxis(2))
        ));
    }

    #[test]
    fn test_argmax() {
        let mut g = Graph::new();
        let x = g.constant("x", vec![vec![1, 9, 9], vec![7, 2, 0]]).unwrap();
        let cols = eval(&mut g, OpKind::Argmax, &[x], Options::new()).unwrap();
        assert_eq!(cols, Value::from(vec![1, 0, 0]));
        let rows = eval(&mut g, OpKind::Argmax, &[x], Options::new().with("axis", 1i64)).unwrap();
        assert_eq!(rows, Value::from(vec![1, 0]));
    }

    #[test]
    fn test_matmul_options() {
        let mut g = Graph::new();
        let a = g.constant("a", vec![vec![1, 2, 3]]).unwrap();
        let opts = Options::new().with("transpose_b", true);
        let out = eval(&mut g, OpKind::Matmul, &[a, a], opts).unwrap();
        assert_eq!(out, Value::from(vec![vec![14]]));

        let b = g.constant("b", vec![vec![1, 2]]).unwrap();
        let err = eval(&mut g, OpKind::Matmul, &[a, b], Options::new()).unwrap_err();
        match err.root_cause() {
            EvalError::Tensor(e) => assert!(e.is_shape_error()),
            other => panic!("unexpected {:?}", other),
        }
    }
}
