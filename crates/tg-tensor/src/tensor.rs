use crate::backend::ComputeBackend;
use crate::error::{Result, TensorError};
use crate::layout::{nest, transpose};
use crate::shape::Shape;
use crate::value::Value;

/// Dense row-major storage. Integral data is kept exact as `i64`.
#[derive(Debug, Clone, PartialEq)]
enum Buffer {
    Float(Vec<f64>),
    Int(Vec<i64>),
}

impl Buffer {
    fn to_f64(&self) -> Vec<f64> {
        match self {
            Buffer::Float(d) => d.clone(),
            Buffer::Int(d) => d.iter().map(|&x| x as f64).collect(),
        }
    }
}

/// A dense, row-major numeric view of a rectangular [`Value`].
///
/// Used where a kernel needs contiguous buffers (matrix products through a
/// [`ComputeBackend`]). When every source scalar is an integer or a boolean
/// the data is packed as `i64` so products stay exact.
#[derive(Debug, Clone)]
pub struct Tensor {
    data: Buffer,
    shape: Shape,
}

impl Tensor {
    /// Packs a rectangular numeric value. Ragged arrays are rejected.
    pub fn from_value(value: &Value) -> Result<Self> {
        let dims = value.dims();
        let flat = value.flatten();
        let numel: usize = dims.iter().product();
        if flat.len() != numel {
            return Err(TensorError::ShapeMismatch {
                expected: dims,
                got: vec![flat.len()],
            });
        }
        let integral = flat
            .iter()
            .all(|v| matches!(v, Value::Int(_) | Value::Bool(_)));
        let data = if integral {
            Buffer::Int(flat.iter().map(Value::as_i64).collect::<Result<_>>()?)
        } else {
            Buffer::Float(flat.iter().map(Value::as_f64).collect::<Result<_>>()?)
        };
        Ok(Tensor {
            data,
            shape: Shape::known(&dims),
        })
    }

    /// Unpacks back into a nested value; integer buffers yield `Value::Int`.
    pub fn to_value(&self) -> Value {
        let flat: Vec<Value> = match &self.data {
            Buffer::Float(d) => d.iter().map(|&x| Value::Float(x)).collect(),
            Buffer::Int(d) => d.iter().map(|&x| Value::Int(x)).collect(),
        };
        let dims = self.shape.to_vec().unwrap_or_default();
        nest(&flat, &dims)
    }

    /// Returns a reference to the tensor's shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Matrix multiplication of two 2D tensors using the given backend.
    ///
    /// self is [m, k], other is [k, n], result is [m, n]. Two integer
    /// tensors multiply in wrapping `i64`; any float operand promotes both.
    pub fn matmul(&self, other: &Tensor, backend: &dyn ComputeBackend) -> Result<Tensor> {
        for t in [self, other] {
            if t.shape.ndim() != 2 {
                return Err(TensorError::RankMismatch {
                    expected: 2,
                    got: t.shape.ndim(),
                });
            }
        }

        let dim = |t: &Tensor, i: usize| t.shape.dim(i).unwrap_or(0);
        let (m, k) = (dim(self, 0), dim(self, 1));
        let (k2, n) = (dim(other, 0), dim(other, 1));

        if k != k2 {
            return Err(TensorError::MatmulMismatch { m, k, k2, n });
        }

        let data = match (&self.data, &other.data) {
            (Buffer::Int(a), Buffer::Int(b)) => Buffer::Int(backend.matmul_i64(a, b, m, k, n)?),
            (a, b) => Buffer::Float(backend.matmul(&a.to_f64(), &b.to_f64(), m, k, n)?),
        };
        Ok(Tensor {
            data,
            shape: Shape::known(&[m, n]),
        })
    }
}

/// 2-D matrix product of nested values with optional pre-transposes.
///
/// A scalar operand is first broadcast to the other operand's
/// post-transpose shape.
pub fn matmul(
    a: &Value,
    b: &Value,
    transpose_a: bool,
    transpose_b: bool,
    backend: &dyn ComputeBackend,
) -> Result<Value> {
    let a = if transpose_a { transpose(a)? } else { a.clone() };
    let b = if transpose_b { transpose(b)? } else { b.clone() };
    let (a, b) = match (a.is_scalar(), b.is_scalar()) {
        (true, false) => (Value::filled(&b.dims(), &a), b),
        (false, true) => {
            let filled = Value::filled(&a.dims(), &b);
            (a, filled)
        }
        _ => (a, b),
    };

    let lhs = Tensor::from_value(&a)?;
    let rhs = Tensor::from_value(&b)?;
    log::trace!(
        "matmul {} @ {} on {}",
        lhs.shape(),
        rhs.shape(),
        backend.name()
    );
    Ok(lhs.matmul(&rhs, backend)?.to_value())
}
