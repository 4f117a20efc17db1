use std::fmt;

use crate::error::{Result, TensorError};

/// A concrete tensor value: a scalar or an arbitrarily nested array.
///
/// Arrays are expected to be rectangular; accessors that need the shape
/// follow the first element of each level.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Vec<Value>),
}

impl Value {
    /// Nesting depth: 0 for scalars, 1 for flat arrays, and so on.
    pub fn rank(&self) -> usize {
        match self {
            Value::Array(items) => 1 + items.first().map(Value::rank).unwrap_or(0),
            _ => 0,
        }
    }

    /// Runtime per-axis extents, following the first element at each level.
    pub fn dims(&self) -> Vec<usize> {
        let mut dims = Vec::new();
        let mut current = self;
        while let Value::Array(items) = current {
            dims.push(items.len());
            match items.first() {
                Some(first) => current = first,
                None => break,
            }
        }
        dims
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    pub fn is_scalar(&self) -> bool {
        !self.is_array()
    }

    /// Number of items on the outermost axis; 1 for scalars.
    pub fn len(&self) -> usize {
        match self {
            Value::Array(items) => items.len(),
            _ => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Array(items) if items.is_empty())
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Numeric view of a scalar. Booleans read as 0/1.
    pub fn as_f64(&self) -> Result<f64> {
        match self {
            Value::Float(f) => Ok(*f),
            Value::Int(i) => Ok(*i as f64),
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            other => Err(TensorError::TypeMismatch {
                expected: "numeric scalar".to_string(),
                got: other.kind_name().to_string(),
            }),
        }
    }

    /// Integer view of a scalar. Floats must be integral.
    pub fn as_i64(&self) -> Result<i64> {
        match self {
            Value::Int(i) => Ok(*i),
            Value::Float(f) if f.fract() == 0.0 => Ok(*f as i64),
            Value::Bool(b) => Ok(*b as i64),
            other => Err(TensorError::TypeMismatch {
                expected: "integer scalar".to_string(),
                got: other.to_string(),
            }),
        }
    }

    /// Reads a flat array (or a scalar) of integers, e.g. a shape or a list of axes.
    pub fn as_i64_vec(&self) -> Result<Vec<i64>> {
        match self {
            Value::Array(items) => items.iter().map(Value::as_i64).collect(),
            scalar => Ok(vec![scalar.as_i64()?]),
        }
    }

    /// Reads a flat array of non-negative extents.
    pub fn as_usize_vec(&self) -> Result<Vec<usize>> {
        self.as_i64_vec()?
            .into_iter()
            .map(|d| {
                usize::try_from(d).map_err(|_| {
                    TensorError::Other(format!("expected a non-negative extent, got {}", d))
                })
            })
            .collect()
    }

    /// Truthiness of a scalar: non-zero numbers, `true`, and non-empty strings.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0 && !f.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::Array(items) => !items.is_empty(),
        }
    }

    /// True when every scalar inside the value is truthy.
    pub fn all_truthy(&self) -> bool {
        match self {
            Value::Array(items) => items.iter().all(Value::all_truthy),
            scalar => scalar.truthy(),
        }
    }

    /// All scalars in row-major order.
    pub fn flatten(&self) -> Vec<Value> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(&self, out: &mut Vec<Value>) {
        match self {
            Value::Array(items) => items.iter().for_each(|item| item.flatten_into(out)),
            scalar => out.push(scalar.clone()),
        }
    }

    /// Builds a nested array of the given extents filled with `fill`.
    pub fn filled(dims: &[usize], fill: &Value) -> Value {
        match dims.split_first() {
            None => fill.clone(),
            Some((&n, rest)) => Value::Array((0..n).map(|_| Value::filled(rest, fill)).collect()),
        }
    }

    /// Applies `f` to every scalar, preserving the nesting.
    pub fn try_map<F>(&self, f: &F) -> Result<Value>
    where
        F: Fn(&Value) -> Result<Value>,
    {
        match self {
            Value::Array(items) => items
                .iter()
                .map(|item| item.try_map(f))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            scalar => f(scalar),
        }
    }

    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => {
                if x.is_finite() && x.fract() == 0.0 {
                    write!(f, "{:.1}", x)
                } else {
                    write!(f, "{}", x)
                }
            }
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v as f64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}
