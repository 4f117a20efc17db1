use std::fmt;
use std::str::FromStr;

use crate::error::TensorError;
use crate::value::Value;

/// Element data types a node can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DType {
    /// 32-bit floating point. Values are stored as f64 rounded through f32.
    Float32,
    /// 64-bit floating point.
    Float64,
    /// 32-bit signed integer.
    Int32,
    /// 16-bit signed integer.
    Int16,
    /// UTF-8 string.
    String,
    /// Boolean.
    Boolean,
    /// Not yet known (e.g. a placeholder declared without a type).
    #[default]
    Unknown,
}

impl DType {
    pub fn is_float(&self) -> bool {
        matches!(self, DType::Float32 | DType::Float64)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, DType::Int32 | DType::Int16)
    }

    pub fn is_numeric(&self) -> bool {
        self.is_float() || self.is_integer()
    }

    /// The additive identity in this dtype's representation.
    ///
    /// Unknown dtypes fall back to an integer zero.
    pub fn zero(&self) -> Value {
        match self {
            DType::Float32 | DType::Float64 => Value::Float(0.0),
            DType::Boolean => Value::Bool(false),
            DType::String => Value::Str(String::new()),
            DType::Int32 | DType::Int16 | DType::Unknown => Value::Int(0),
        }
    }

    /// The multiplicative identity in this dtype's representation.
    pub fn one(&self) -> Value {
        match self {
            DType::Float32 | DType::Float64 => Value::Float(1.0),
            DType::Boolean => Value::Bool(true),
            DType::String => Value::Str("1".to_string()),
            DType::Int32 | DType::Int16 | DType::Unknown => Value::Int(1),
        }
    }

    /// Infers the default dtype for a concrete value.
    ///
    /// - Float → Float32
    /// - Int → Int32
    /// - Bool → Boolean
    /// - Str → String
    /// - empty array → Unknown
    ///
    /// Arrays take the dtype of their first scalar, except that a numeric
    /// array holding any float is Float32 so no element gets truncated.
    pub fn infer(value: &Value) -> DType {
        match value {
            Value::Float(_) => DType::Float32,
            Value::Int(_) => DType::Int32,
            Value::Bool(_) => DType::Boolean,
            Value::Str(_) => DType::String,
            Value::Array(_) => {
                let flat = value.flatten();
                let first = flat.first().map(DType::infer).unwrap_or(DType::Unknown);
                if first.is_numeric() && flat.iter().any(|v| matches!(v, Value::Float(_))) {
                    DType::Float32
                } else {
                    first
                }
            }
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::Float32 => write!(f, "float32"),
            DType::Float64 => write!(f, "float64"),
            DType::Int32 => write!(f, "int32"),
            DType::Int16 => write!(f, "int16"),
            DType::String => write!(f, "string"),
            DType::Boolean => write!(f, "boolean"),
            DType::Unknown => write!(f, "unknown"),
        }
    }
}

impl FromStr for DType {
    type Err = TensorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "float32" | "float" => Ok(DType::Float32),
            "float64" | "double" => Ok(DType::Float64),
            "int32" | "int" => Ok(DType::Int32),
            "int16" => Ok(DType::Int16),
            "string" => Ok(DType::String),
            "boolean" | "bool" => Ok(DType::Boolean),
            "unknown" => Ok(DType::Unknown),
            other => Err(TensorError::Other(format!("unknown dtype: {}", other))),
        }
    }
}
