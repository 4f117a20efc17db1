//! Axis reductions.
//!
//! Only axes 0 and 1 can be reduced. A list of axes is applied one axis at a
//! time, highest first, so earlier reductions never shift later axis indices.
//! Any other axis is rejected with [`TensorError::UnsupportedReductionAxis`].

use crate::broadcast::binary;
use crate::dtype::DType;
use crate::error::{Result, TensorError};
use crate::scalar::BinaryOp;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reduction {
    Sum,
    Mean,
    Prod,
}

impl Reduction {
    /// Result of reducing an empty slice: 0 for sum and mean, 1 for prod.
    pub fn identity(&self, dtype: DType) -> Value {
        match self {
            Reduction::Sum | Reduction::Mean => dtype.zero(),
            Reduction::Prod => dtype.one(),
        }
    }

    fn combinator(&self) -> BinaryOp {
        match self {
            Reduction::Sum | Reduction::Mean => BinaryOp::Add,
            Reduction::Prod => BinaryOp::Mul,
        }
    }
}

/// Reduces `value` along `axes`, or along every axis when `axes` is `None`.
///
/// `dtype` selects the representation of the empty-reduction identity.
pub fn reduce(
    value: &Value,
    axes: Option<&[i64]>,
    keep_dims: bool,
    reduction: Reduction,
    dtype: DType,
) -> Result<Value> {
    let rank = value.rank();

    let resolved = match axes {
        Some(axes) => Some(resolve_axes(axes, rank, value.is_scalar())?),
        None => None,
    };
    if value.is_scalar() {
        return Ok(value.clone());
    }

    let Some(resolved) = resolved else {
        let flat = value.flatten();
        let total = fold(&flat, reduction, dtype)?;
        return Ok(if keep_dims {
            Value::filled(&vec![1; rank], &total)
        } else {
            total
        });
    };

    let mut current = value.clone();
    for &axis in resolved.iter().rev() {
        log::trace!("reducing axis {} ({:?})", axis, reduction);
        current = reduce_axis(&current, axis, keep_dims, reduction, dtype)?;
    }
    Ok(current)
}

/// Normalizes and validates `axes`. Only 0 and 1 are supported; a scalar
/// accepts them and is returned as is.
fn resolve_axes(axes: &[i64], rank: usize, scalar: bool) -> Result<Vec<usize>> {
    let mut resolved = Vec::with_capacity(axes.len());
    for &axis in axes {
        let normalized = if axis < 0 { axis + rank as i64 } else { axis };
        if !(0..=1).contains(&normalized) {
            return Err(TensorError::UnsupportedReductionAxis(axis));
        }
        if !scalar && normalized as usize >= rank {
            return Err(TensorError::InvalidAxis { axis, ndim: rank });
        }
        resolved.push(normalized as usize);
    }
    resolved.sort_unstable();
    resolved.dedup();
    Ok(resolved)
}

fn reduce_axis(
    value: &Value,
    axis: usize,
    keep_dims: bool,
    reduction: Reduction,
    dtype: DType,
) -> Result<Value> {
    let items = value.as_array().ok_or(TensorError::InvalidAxis {
        axis: axis as i64,
        ndim: value.rank(),
    })?;
    if axis == 0 {
        let reduced = fold(items, reduction, dtype)?;
        return Ok(if keep_dims {
            Value::Array(vec![reduced])
        } else {
            reduced
        });
    }
    items
        .iter()
        .map(|row| reduce_axis(row, axis - 1, keep_dims, reduction, dtype))
        .collect::<Result<Vec<_>>>()
        .map(Value::Array)
}

fn fold(items: &[Value], reduction: Reduction, dtype: DType) -> Result<Value> {
    let Some((first, rest)) = items.split_first() else {
        return Ok(reduction.identity(dtype));
    };
    let op = reduction.combinator();
    let total = rest
        .iter()
        .try_fold(first.clone(), |acc, item| binary(&acc, item, op))?;

    if reduction != Reduction::Mean {
        return Ok(total);
    }
    let n = items.len();
    total.try_map(&|s| match s {
        Value::Float(f) => Ok(Value::Float(f / n as f64)),
        // integer means truncate toward zero
        other => Ok(Value::Int(other.as_i64()? / n as i64)),
    })
}

/// Index of the maximum along `axis`; ties resolve to the lowest index.
pub fn argmax(value: &Value, axis: i64) -> Result<Value> {
    let rank = value.rank();
    let normalized = if axis < 0 { axis + rank as i64 } else { axis };
    if rank == 0 || normalized < 0 || normalized as usize >= rank {
        return Err(TensorError::InvalidAxis { axis, ndim: rank });
    }
    argmax_at(value, normalized as usize)
}

fn argmax_at(value: &Value, axis: usize) -> Result<Value> {
    let items = value.as_array().ok_or(TensorError::InvalidAxis {
        axis: axis as i64,
        ndim: 0,
    })?;
    if axis == 0 {
        let refs: Vec<&Value> = items.iter().collect();
        return argmax_over(&refs);
    }
    items
        .iter()
        .map(|item| argmax_at(item, axis - 1))
        .collect::<Result<Vec<_>>>()
        .map(Value::Array)
}

fn argmax_over(items: &[&Value]) -> Result<Value> {
    match items.first() {
        None => Err(TensorError::Other("argmax over an empty axis".to_string())),
        Some(Value::Array(first)) => (0..first.len())
            .map(|j| {
                let column = items
                    .iter()
                    .map(|item| {
                        item.as_array()
                            .and_then(|row| row.get(j))
                            .ok_or_else(|| TensorError::ShapeMismatch {
                                expected: first_dims(items),
                                got: item.dims(),
                            })
                    })
                    .collect::<Result<Vec<_>>>()?;
                argmax_over(&column)
            })
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Some(_) => {
            let mut best = 0;
            let mut best_value = items[0].as_f64()?;
            for (i, item) in items.iter().enumerate().skip(1) {
                let v = item.as_f64()?;
                if v > best_value {
                    best = i;
                    best_value = v;
                }
            }
            Ok(Value::Int(best as i64))
        }
    }
}

fn first_dims(items: &[&Value]) -> Vec<usize> {
    items.first().map(|v| v.dims()).unwrap_or_default()
}
