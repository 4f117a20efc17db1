use tg_tensor::broadcast::three_way_op;
use tg_tensor::{layout, DType, Value};

use super::args::Args;
use crate::error::Result;
use crate::op::OpKind;

fn usize_list(args: &Args, value: &Value, key: &str) -> Result<Vec<usize>> {
    value
        .as_usize_vec()
        .map_err(|e| args.invalid(key, &e.to_string()))
}

fn i64_list(args: &Args, value: &Value, key: &str) -> Result<Vec<i64>> {
    value
        .as_i64_vec()
        .map_err(|e| args.invalid(key, &e.to_string()))
}

fn count(args: &Args, value: &Value, key: &str) -> Result<usize> {
    let n = value
        .as_i64()
        .map_err(|e| args.invalid(key, &e.to_string()))?;
    usize::try_from(n).map_err(|_| args.invalid(key, "must be non-negative"))
}

pub(super) fn index(args: &Args) -> Result<Value> {
    let i = args
        .b()?
        .as_i64()
        .map_err(|e| args.invalid("index", &e.to_string()))?;
    Ok(layout::index(args.a()?, i)?)
}

pub(super) fn slice(args: &Args) -> Result<Value> {
    let begin = args
        .operand_or(1, "begin")
        .ok_or_else(|| args.invalid("begin", "missing"))?;
    let begin = i64_list(args, begin, "begin")?;
    let size = match args.value("size") {
        Some(size) => i64_list(args, size, "size")?,
        None => vec![-1; begin.len()],
    };
    Ok(layout::slice(args.a()?, &begin, &size)?)
}

pub(super) fn concat(args: &Args) -> Result<Value> {
    let values = args.values("values")?;
    let axis = args.int("axis")?.unwrap_or(0);
    Ok(layout::concat(values, axis)?)
}

pub(super) fn transpose(args: &Args) -> Result<Value> {
    Ok(layout::transpose(args.a()?)?)
}

pub(super) fn eye(args: &Args) -> Result<Value> {
    let rows = args
        .operand_or(0, "num_rows")
        .ok_or_else(|| args.invalid("num_rows", "missing"))?;
    let rows = count(args, rows, "num_rows")?;
    let cols = match args.operand_or(1, "num_columns") {
        Some(cols) => count(args, cols, "num_columns")?,
        None => rows,
    };
    Ok(layout::eye(rows, cols, args.dtype))
}

fn fill_value(op: OpKind, dtype: DType) -> Value {
    match op {
        OpKind::Ones | OpKind::OnesLike => dtype.one(),
        _ => dtype.zero(),
    }
}

/// `zeros`/`ones`: extents from operand `a` or the `shape` option.
pub(super) fn fill(args: &Args) -> Result<Value> {
    let shape = args
        .operand_or(0, "shape")
        .ok_or_else(|| args.invalid("shape", "missing"))?;
    let dims = usize_list(args, shape, "shape")?;
    Ok(Value::filled(&dims, &fill_value(args.op, args.dtype)))
}

/// `zeros_like`/`ones_like`: extents of operand `a`.
pub(super) fn fill_like(args: &Args) -> Result<Value> {
    let like = args.a()?;
    let dtype = args.effective_dtype(like);
    Ok(Value::filled(&like.dims(), &fill_value(args.op, dtype)))
}

pub(super) fn shape(args: &Args) -> Result<Value> {
    let dims = args.a()?.dims();
    Ok(Value::Array(
        dims.into_iter().map(|d| Value::Int(d as i64)).collect(),
    ))
}

pub(super) fn rank(args: &Args) -> Result<Value> {
    Ok(Value::Int(args.a()?.rank() as i64))
}

pub(super) fn reshape(args: &Args) -> Result<Value> {
    let target = args
        .operand_or(1, "shape")
        .ok_or_else(|| args.invalid("shape", "missing"))?;
    let target = i64_list(args, target, "shape")?;
    Ok(layout::reshape(args.a()?, &target)?)
}

pub(super) fn pad(args: &Args) -> Result<Value> {
    let paddings = args
        .value("paddings")
        .and_then(Value::as_array)
        .ok_or_else(|| args.invalid("paddings", "expected a list of [before, after] pairs"))?;
    let paddings = paddings
        .iter()
        .map(|pair| match usize_list(args, pair, "paddings")?.as_slice() {
            &[before, after] => Ok((before, after)),
            _ => Err(args.invalid("paddings", "each entry needs exactly two extents")),
        })
        .collect::<Result<Vec<_>>>()?;

    let value = args.a()?;
    let fill = match args.value("constant_values") {
        Some(fill) => fill.clone(),
        None => args.effective_dtype(value).zero(),
    };
    Ok(layout::pad(value, &paddings, &fill)?)
}

/// Elementwise select on the `pred` option; shapes must already agree.
pub(super) fn select(args: &Args) -> Result<Value> {
    let pred = args
        .value("pred")
        .ok_or_else(|| args.invalid("pred", "missing"))?;
    Ok(three_way_op(pred, args.a()?, args.b()?, &|p, x, y| {
        Ok(if p.truthy() { x.clone() } else { y.clone() })
    })?)
}

#[cfg(test)]
mod tests {
    use tg_tensor::TensorError;

    use crate::context::ExecutionContext;
    use crate::error::EvalError;
    use crate::eval::evaluate;
    use crate::graph::Graph;
    use crate::node::NodeId;
    use crate::options::Options;

    use super::*;

    fn eval(g: &mut Graph, op: OpKind, inputs: &[NodeId], options: Options) -> Result<Value> {
        let id = g.op(op, inputs, options)?;
        let out = evaluate(g, id, &mut ExecutionContext::new())?;
        Ok(out.into_value().unwrap())
    }

    #[test]
    fn test_index_and_slice() {
        let mut g = Graph::new();
        let x = g.constant("x", vec![vec![1, 2, 3], vec![4, 5, 6]]).unwrap();
        let last = g.constant("last", -1).unwrap();
        let row = eval(&mut g, OpKind::Index, &[x, last], Options::new()).unwrap();
        assert_eq!(row, Value::from(vec![4, 5, 6]));

        let opts = Options::new()
            .with("begin", Value::from(vec![0, 1]))
            .with("size", Value::from(vec![2, -1]));
        let s = eval(&mut g, OpKind::Slice, &[x], opts).unwrap();
        assert_eq!(s, Value::from(vec![vec![2, 3], vec![5, 6]]));

        let bad = Options::new()
            .with("begin", Value::from(vec![0]))
            .with("size", Value::from(vec![1, 1]));
        let err = eval(&mut g, OpKind::Slice, &[x], bad).unwrap_err();
        assert!(matches!(
            err.root_cause(),
            EvalError::Tensor(TensorError::RankMismatch { .. })
        ));
    }

    #[test]
    fn test_concat_negative_axis() {
        let mut g = Graph::new();
        let a = g.constant("a", vec![vec![1], vec![2]]).unwrap();
        let b = g.constant("b", vec![vec![3], vec![4]]).unwrap();
        let opts = Options::new().with("values", vec![a, b]).with("axis", -1i64);
        let out = eval(&mut g, OpKind::Concat, &[], opts).unwrap();
        assert_eq!(out, Value::from(vec![vec![1, 3], vec![2, 4]]));
    }

    #[test]
    fn test_concat_requires_values() {
        let mut g = Graph::new();
        let err = eval(&mut g, OpKind::Concat, &[], Options::new()).unwrap_err();
        assert!(matches!(
            err.root_cause(),
            EvalError::InvalidOption { key, .. } if key == "values"
        ));
    }

    #[test]
    fn test_eye_and_fills() {
        let mut g = Graph::new();
        let two = g.constant("two", 2).unwrap();
        let three = g.constant("three", 3).unwrap();
        let eye = eval(&mut g, OpKind::Eye, &[two, three], Options::new().with("dtype", DType::Int32))
            .unwrap();
        assert_eq!(eye, Value::from(vec![vec![1, 0, 0], vec![0, 1, 0]]));

        let square = eval(&mut g, OpKind::Eye, &[], Options::new().with("num_rows", 2i64)).unwrap();
        assert_eq!(square, Value::from(vec![vec![1.0, 0.0], vec![0.0, 1.0]]));

        let ones = eval(
            &mut g,
            OpKind::Ones,
            &[],
            Options::new().with("shape", Value::from(vec![1, 2])),
        )
        .unwrap();
        assert_eq!(ones, Value::from(vec![vec![1.0, 1.0]]));

        let flags = g.constant("flags", vec![true, false]).unwrap();
        let zeros = eval(&mut g, OpKind::ZerosLike, &[flags], Options::new()).unwrap();
        assert_eq!(zeros, Value::from(vec![false, false]));
    }

    #[test]
    fn test_shape_rank_transpose() {
        let mut g = Graph::new();
        let x = g.constant("x", vec![vec![1, 2, 3], vec![4, 5, 6]]).unwrap();
        let shape = eval(&mut g, OpKind::Shape, &[x], Options::new()).unwrap();
        assert_eq!(shape, Value::from(vec![2, 3]));
        let rank = eval(&mut g, OpKind::Rank, &[x], Options::new()).unwrap();
        assert_eq!(rank, Value::Int(2));
        let t = eval(&mut g, OpKind::Transpose, &[x], Options::new()).unwrap();
        assert_eq!(t, Value::from(vec![vec![1, 4], vec![2, 5], vec![3, 6]]));
    }

    #[test]
    fn test_reshape_roundtrip() {
        let mut g = Graph::new();
        let x = g.constant("x", vec![vec![1, 2, 3], vec![4, 5, 6]]).unwrap();
        let flat_shape = g.constant("flat", vec![-1]).unwrap();
        let flat = g.op(OpKind::Reshape, &[x, flat_shape], Options::new()).unwrap();
        let back = Options::new().with("shape", Value::from(vec![2, -1]));
        let out = eval(&mut g, OpKind::Reshape, &[flat], back).unwrap();
        assert_eq!(out, Value::from(vec![vec![1, 2, 3], vec![4, 5, 6]]));

        let bad = Options::new().with("shape", Value::from(vec![4, -1]));
        let err = eval(&mut g, OpKind::Reshape, &[x], bad).unwrap_err();
        match err.root_cause() {
            EvalError::Tensor(e) => assert!(e.is_shape_error()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_pad_float_fill() {
        let mut g = Graph::new();
        let x = g.constant("x", vec![1.5]).unwrap();
        let opts = Options::new().with("paddings", Value::from(vec![vec![1, 1]]));
        let out = eval(&mut g, OpKind::Pad, &[x], opts).unwrap();
        assert_eq!(out, Value::from(vec![0.0, 1.5, 0.0]));
    }

    #[test]
    fn test_where_select() {
        let mut g = Graph::new();
        let pred = g.constant("pred", vec![true, false, true]).unwrap();
        let a = g.constant("a", vec![1, 2, 3]).unwrap();
        let b = g.constant("b", vec![-1, -2, -3]).unwrap();
        let out = eval(&mut g, OpKind::Where, &[a, b], Options::new().with("pred", pred)).unwrap();
        assert_eq!(out, Value::from(vec![1, -2, 3]));
    }

    #[test]
    fn test_where_does_not_broadcast() {
        let mut g = Graph::new();
        let pred = g.constant("pred", vec![true, false]).unwrap();
        let a = g.constant("a", vec![1, 2]).unwrap();
        let b = g.constant("b", 0).unwrap();
        let err = eval(&mut g, OpKind::Where, &[a, b], Options::new().with("pred", pred))
            .unwrap_err();
        assert!(matches!(
            err.root_cause(),
            EvalError::Tensor(TensorError::ShapeMismatch { .. })
        ));
    }
}
