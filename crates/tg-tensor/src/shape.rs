use crate::error::{Result, TensorError};
use std::fmt;

/// A static tensor shape. Each extent may be unresolved (`None`) until run time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Shape {
    dims: Vec<Option<usize>>,
}

impl Shape {
    /// Create a new shape from possibly-unresolved extents.
    pub fn new(dims: Vec<Option<usize>>) -> Self {
        Shape { dims }
    }

    /// Create a fully-resolved shape.
    pub fn known(dims: &[usize]) -> Self {
        Shape {
            dims: dims.iter().copied().map(Some).collect(),
        }
    }

    /// The shape of a scalar.
    pub fn scalar() -> Self {
        Shape { dims: vec![] }
    }

    /// Number of dimensions (rank).
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Returns the extent of dimension `i`, `None` if unresolved or out of range.
    pub fn dim(&self, i: usize) -> Option<usize> {
        self.dims.get(i).copied().flatten()
    }

    pub fn dims(&self) -> &[Option<usize>] {
        &self.dims
    }

    /// Resolved extents, if every extent is resolved.
    pub fn to_vec(&self) -> Option<Vec<usize>> {
        self.dims.iter().copied().collect()
    }

    /// Compute the broadcast shape of `a` and `b` using numpy-style broadcasting rules.
    ///
    /// Rules:
    /// 1. If the shapes have different numbers of dimensions, the shorter shape is
    ///    padded with ones on the left.
    /// 2. For each dimension, sizes must either be equal, or one of them must be 1.
    ///    The output dimension is the maximum of the two.
    /// 3. An unresolved extent paired with 1 stays unresolved; paired with a
    ///    resolved extent `n > 1` it resolves to `n`.
    pub fn broadcast_shape(a: &Shape, b: &Shape) -> Result<Shape> {
        let max_ndim = a.ndim().max(b.ndim());
        let mut result = Vec::with_capacity(max_ndim);

        for i in 0..max_ndim {
            // Index from the right
            let da = if i < a.ndim() {
                a.dims[a.ndim() - 1 - i]
            } else {
                Some(1)
            };
            let db = if i < b.ndim() {
                b.dims[b.ndim() - 1 - i]
            } else {
                Some(1)
            };

            let dim = match (da, db) {
                (Some(x), Some(y)) if x == y => Some(x),
                (Some(1), other) | (other, Some(1)) => other,
                (None, Some(n)) | (Some(n), None) => Some(n),
                (None, None) => None,
                _ => {
                    return Err(TensorError::BroadcastError {
                        a: a.dims.iter().map(|d| d.unwrap_or(0)).collect(),
                        b: b.dims.iter().map(|d| d.unwrap_or(0)).collect(),
                    })
                }
            };
            result.push(dim);
        }

        result.reverse();
        Ok(Shape::new(result))
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match d {
                Some(d) => write!(f, "{}", d)?,
                None => write!(f, "?")?,
            }
        }
        write!(f, "]")
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Shape::known(&dims)
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Shape::known(dims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_shape() {
        let s = Shape::known(&[2, 3, 4]);
        assert_eq!(s.ndim(), 3);
        assert_eq!(s.to_vec(), Some(vec![2, 3, 4]));
        assert_eq!(s.dim(0), Some(2));
        assert_eq!(s.dim(2), Some(4));
        assert_eq!(s.dim(3), None);
    }

    #[test]
    fn test_partial_shape() {
        let s = Shape::new(vec![None, Some(3)]);
        assert_eq!(s.to_vec(), None);
        assert_eq!(s.to_string(), "[?, 3]");
    }

    #[test]
    fn test_scalar_shape() {
        let s = Shape::scalar();
        assert_eq!(s.ndim(), 0);
        assert_eq!(s.to_vec(), Some(vec![]));
    }

    #[test]
    fn test_broadcast_expand() {
        let a = Shape::known(&[2, 1]);
        let b = Shape::known(&[1, 3]);
        let c = Shape::broadcast_shape(&a, &b).unwrap();
        assert_eq!(c, Shape::known(&[2, 3]));
    }

    #[test]
    fn test_broadcast_different_ndim() {
        let a = Shape::known(&[3]);
        let b = Shape::known(&[2, 3]);
        let c = Shape::broadcast_shape(&a, &b).unwrap();
        assert_eq!(c, Shape::known(&[2, 3]));
    }

    #[test]
    fn test_broadcast_unresolved() {
        let a = Shape::new(vec![None, Some(3)]);
        let b = Shape::known(&[3]);
        let c = Shape::broadcast_shape(&a, &b).unwrap();
        assert_eq!(c, Shape::new(vec![None, Some(3)]));
    }

    #[test]
    fn test_broadcast_error() {
        let a = Shape::known(&[2, 3]);
        let b = Shape::known(&[2, 4]);
        assert!(Shape::broadcast_shape(&a, &b).is_err());
    }
}
