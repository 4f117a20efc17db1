//! Kernels that rearrange or generate nested arrays without arithmetic.

use crate::dtype::DType;
use crate::error::{Result, TensorError};
use crate::value::Value;

/// Flattens `value` and rebuilds it with `target` extents.
///
/// At most one extent may be `-1`; it is inferred as the element count
/// divided by the product of the given extents.
pub fn reshape(value: &Value, target: &[i64]) -> Result<Value> {
    let flat = value.flatten();
    let total = flat.len();

    let mut inferred = None;
    let mut known = 1usize;
    for (i, &d) in target.iter().enumerate() {
        match d {
            -1 if inferred.is_none() => inferred = Some(i),
            -1 => {
                return Err(TensorError::Other(
                    "reshape: only one dimension can be inferred".to_string(),
                ))
            }
            d if d < 0 => {
                return Err(TensorError::Other(format!("reshape: invalid extent {}", d)))
            }
            d => known *= d as usize,
        }
    }

    let mismatch = || TensorError::ShapeMismatch {
        expected: vec![total],
        got: target.iter().map(|&d| d.max(0) as usize).collect(),
    };
    let mut dims: Vec<usize> = target.iter().map(|&d| d.max(0) as usize).collect();
    match inferred {
        Some(i) => {
            if known == 0 || total % known != 0 {
                return Err(mismatch());
            }
            dims[i] = total / known;
        }
        None if known != total => return Err(mismatch()),
        None => {}
    }
    Ok(nest(&flat, &dims))
}

pub(crate) fn nest(flat: &[Value], dims: &[usize]) -> Value {
    match dims.split_first() {
        None => flat.first().cloned().unwrap_or(Value::Array(vec![])),
        Some((&n, rest)) => {
            let chunk: usize = rest.iter().product();
            Value::Array(
                (0..n)
                    .map(|i| nest(&flat[i * chunk..(i + 1) * chunk], rest))
                    .collect(),
            )
        }
    }
}

/// Extracts the region starting at `begin` with per-axis `size` (`-1` = to the end).
pub fn slice(value: &Value, begin: &[i64], size: &[i64]) -> Result<Value> {
    if begin.len() != size.len() {
        return Err(TensorError::RankMismatch {
            expected: begin.len(),
            got: size.len(),
        });
    }
    if begin.len() > value.rank() {
        return Err(TensorError::InvalidAxis {
            axis: begin.len() as i64 - 1,
            ndim: value.rank(),
        });
    }
    slice_at(value, begin, size)
}

fn slice_at(value: &Value, begin: &[i64], size: &[i64]) -> Result<Value> {
    let (Some((&start, begin_rest)), Some((&len, size_rest))) =
        (begin.split_first(), size.split_first())
    else {
        return Ok(value.clone());
    };
    let items = value.as_array().unwrap_or_default();
    let start = usize::try_from(start)
        .ok()
        .filter(|&s| s <= items.len())
        .ok_or(TensorError::IndexOutOfBounds {
            index: start,
            len: items.len(),
        })?;
    let end = if len == -1 {
        items.len()
    } else {
        start + usize::try_from(len).map_err(|_| {
            TensorError::Other(format!("slice: invalid size {}", len))
        })?
    };
    if end > items.len() {
        return Err(TensorError::IndexOutOfBounds {
            index: end as i64 - 1,
            len: items.len(),
        });
    }
    items[start..end]
        .iter()
        .map(|item| slice_at(item, begin_rest, size_rest))
        .collect::<Result<Vec<_>>>()
        .map(Value::Array)
}

/// Joins `values` along `axis`. A negative axis means the last axis.
pub fn concat(values: &[Value], axis: i64) -> Result<Value> {
    let Some(first) = values.first() else {
        return Ok(Value::Array(vec![]));
    };
    let rank = first.rank();
    let axis = if axis < 0 {
        rank.saturating_sub(1)
    } else {
        axis as usize
    };
    if axis >= rank {
        return Err(TensorError::InvalidAxis {
            axis: axis as i64,
            ndim: rank,
        });
    }
    concat_at(values, axis)
}

fn concat_at(values: &[Value], axis: usize) -> Result<Value> {
    let arrays = values
        .iter()
        .map(|v| {
            v.as_array().ok_or(TensorError::InvalidAxis {
                axis: axis as i64,
                ndim: 0,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    if axis == 0 {
        return Ok(Value::Array(arrays.concat()));
    }
    let outer = arrays.first().map(|a| a.len()).unwrap_or(0);
    if let Some(bad) = values.iter().find(|v| v.len() != outer) {
        return Err(TensorError::ShapeMismatch {
            expected: values[0].dims(),
            got: bad.dims(),
        });
    }
    (0..outer)
        .map(|i| {
            let column: Vec<Value> = arrays.iter().map(|a| a[i].clone()).collect();
            concat_at(&column, axis - 1)
        })
        .collect::<Result<Vec<_>>>()
        .map(Value::Array)
}

/// Pads each axis with `(before, after)` copies of `fill`.
pub fn pad(value: &Value, paddings: &[(usize, usize)], fill: &Value) -> Result<Value> {
    let dims = value.dims();
    if paddings.len() != dims.len() {
        return Err(TensorError::RankMismatch {
            expected: dims.len(),
            got: paddings.len(),
        });
    }
    Ok(pad_at(value, paddings, &dims, fill))
}

fn pad_at(value: &Value, paddings: &[(usize, usize)], dims: &[usize], fill: &Value) -> Value {
    let (Some((&(before, after), inner_paddings)), Value::Array(items)) =
        (paddings.split_first(), value)
    else {
        return value.clone();
    };
    let inner_dims: Vec<usize> = dims[1..]
        .iter()
        .zip(inner_paddings)
        .map(|(d, (b, a))| d + b + a)
        .collect();
    let row = Value::filled(&inner_dims, fill);

    let mut out = Vec::with_capacity(before + items.len() + after);
    out.extend(std::iter::repeat(row.clone()).take(before));
    out.extend(
        items
            .iter()
            .map(|item| pad_at(item, inner_paddings, &dims[1..], fill)),
    );
    out.extend(std::iter::repeat(row).take(after));
    Value::Array(out)
}

/// Swaps the two axes of a matrix. Scalars and vectors are returned unchanged.
pub fn transpose(value: &Value) -> Result<Value> {
    match value.rank() {
        0 | 1 => Ok(value.clone()),
        2 => {
            let rows = value.as_array().unwrap_or_default();
            let cols = rows.first().map(Value::len).unwrap_or(0);
            if let Some(bad) = rows.iter().find(|r| r.len() != cols) {
                return Err(TensorError::ShapeMismatch {
                    expected: vec![rows.len(), cols],
                    got: vec![rows.len(), bad.len()],
                });
            }
            Ok(Value::Array(
                (0..cols)
                    .map(|j| {
                        Value::Array(
                            rows.iter()
                                .map(|r| match r {
                                    Value::Array(row) => row[j].clone(),
                                    scalar => scalar.clone(),
                                })
                                .collect(),
                        )
                    })
                    .collect(),
            ))
        }
        n => Err(TensorError::Other(format!(
            "transpose supports at most 2 dimensions, got {}",
            n
        ))),
    }
}

/// Identity matrix of `rows` × `cols` in `dtype`.
pub fn eye(rows: usize, cols: usize, dtype: DType) -> Value {
    let (zero, one) = (dtype.zero(), dtype.one());
    Value::Array(
        (0..rows)
            .map(|i| {
                Value::Array(
                    (0..cols)
                        .map(|j| if i == j { one.clone() } else { zero.clone() })
                        .collect(),
                )
            })
            .collect(),
    )
}

/// Element or sub-array at `index`; negative indices count from the end.
pub fn index(value: &Value, index: i64) -> Result<Value> {
    let items = value.as_array().ok_or_else(|| TensorError::TypeMismatch {
        expected: "array".to_string(),
        got: value.to_string(),
    })?;
    let len = items.len();
    let resolved = if index < 0 { index + len as i64 } else { index };
    usize::try_from(resolved)
        .ok()
        .and_then(|i| items.get(i))
        .cloned()
        .ok_or(TensorError::IndexOutOfBounds { index, len })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reshape_inferred() {
        let v = Value::from(vec![1, 2, 3, 4, 5, 6]);
        let r = reshape(&v, &[-1, 3]).unwrap();
        assert_eq!(r, Value::from(vec![vec![1, 2, 3], vec![4, 5, 6]]));
    }

    #[test]
    fn test_reshape_round_trip() {
        let x = Value::from(vec![vec![vec![1, 2], vec![3, 4]], vec![vec![5, 6], vec![7, 8]]]);
        let flat = Value::Array(x.flatten());
        for target in [&[4, -1][..], &[-1, 2, 2][..], &[8][..], &[2, 4][..]] {
            let shaped = reshape(&flat, target).unwrap();
            assert_eq!(reshape(&shaped, &[2, 2, 2]).unwrap(), x);
        }
    }

    #[test]
    fn test_reshape_to_scalar() {
        let v = Value::from(vec![vec![7]]);
        assert_eq!(reshape(&v, &[]).unwrap(), Value::Int(7));
    }

    #[test]
    fn test_reshape_errors() {
        let v = Value::from(vec![1, 2, 3, 4, 5, 6]);
        assert!(reshape(&v, &[-1, 4]).unwrap_err().is_shape_error());
        assert!(reshape(&v, &[4, 2]).unwrap_err().is_shape_error());
        assert!(reshape(&v, &[-1, -1]).is_err());
    }

    #[test]
    fn test_slice() {
        let m = Value::from(vec![vec![1, 2, 3], vec![4, 5, 6], vec![7, 8, 9]]);
        let s = slice(&m, &[1, 0], &[2, 2]).unwrap();
        assert_eq!(s, Value::from(vec![vec![4, 5], vec![7, 8]]));
        let tail = slice(&m, &[0, 1], &[-1, -1]).unwrap();
        assert_eq!(tail, Value::from(vec![vec![2, 3], vec![5, 6], vec![8, 9]]));
    }

    #[test]
    fn test_slice_errors() {
        let m = Value::from(vec![vec![1, 2], vec![3, 4]]);
        assert!(slice(&m, &[0, 0], &[1]).unwrap_err().is_shape_error());
        assert!(slice(&m, &[1], &[2]).is_err());
    }

    #[test]
    fn test_concat() {
        let a = Value::from(vec![vec![1, 2], vec![3, 4]]);
        let b = Value::from(vec![vec![5, 6]]);
        assert_eq!(
            concat(&[a.clone(), b], 0).unwrap(),
            Value::from(vec![vec![1, 2], vec![3, 4], vec![5, 6]])
        );
        let c = Value::from(vec![vec![9], vec![9]]);
        assert_eq!(
            concat(&[a.clone(), c.clone()], 1).unwrap(),
            Value::from(vec![vec![1, 2, 9], vec![3, 4, 9]])
        );
        assert_eq!(concat(&[a, c], -1).unwrap().dims(), vec![2, 3]);
    }

    #[test]
    fn test_pad() {
        let m = Value::from(vec![vec![1, 2], vec![3, 4]]);
        let p = pad(&m, &[(1, 0), (0, 1)], &Value::Int(0)).unwrap();
        assert_eq!(
            p,
            Value::from(vec![vec![0, 0, 0], vec![1, 2, 0], vec![3, 4, 0]])
        );
        assert!(pad(&m, &[(1, 1)], &Value::Int(0)).unwrap_err().is_shape_error());
    }

    #[test]
    fn test_pad_float_fill() {
        let v = Value::from(vec![1.0]);
        let p = pad(&v, &[(1, 1)], &DType::Float32.zero()).unwrap();
        assert_eq!(p, Value::from(vec![0.0, 1.0, 0.0]));
    }

    #[test]
    fn test_transpose() {
        let m = Value::from(vec![vec![1, 2, 3], vec![4, 5, 6]]);
        assert_eq!(
            transpose(&m).unwrap(),
            Value::from(vec![vec![1, 4], vec![2, 5], vec![3, 6]])
        );
        let v = Value::from(vec![1, 2]);
        assert_eq!(transpose(&v).unwrap(), v);
    }

    #[test]
    fn test_eye() {
        assert_eq!(
            eye(2, 3, DType::Float32),
            Value::from(vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]])
        );
        assert_eq!(eye(2, 2, DType::Int32), Value::from(vec![vec![1, 0], vec![0, 1]]));
    }

    #[test]
    fn test_index() {
        let m = Value::from(vec![vec![1, 2], vec![3, 4]]);
        assert_eq!(index(&m, 1).unwrap(), Value::from(vec![3, 4]));
        assert_eq!(index(&m, -2).unwrap(), Value::from(vec![1, 2]));
        assert!(index(&m, 2).is_err());
        assert!(index(&Value::Int(1), 0).is_err());
    }
}
