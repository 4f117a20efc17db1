//! Elementwise coercion between numeric, string and boolean values.
//!
//! Casting is idempotent for a fixed target: `cast(cast(v, T), T) == cast(v, T)`.

use crate::dtype::DType;
use crate::error::{Result, TensorError};
use crate::value::Value;

/// Casts every scalar in `value` to `dtype`. `Unknown` leaves the value untouched.
pub fn cast(value: &Value, dtype: DType) -> Result<Value> {
    value.try_map(&|scalar| cast_scalar(scalar, dtype))
}

pub fn cast_scalar(scalar: &Value, dtype: DType) -> Result<Value> {
    match dtype {
        DType::Float32 => to_float(scalar).map(|f| Value::Float(f as f32 as f64)),
        DType::Float64 => to_float(scalar).map(Value::Float),
        DType::Int32 => to_int(scalar, dtype).map(|i| Value::Int(i as i32 as i64)),
        DType::Int16 => to_int(scalar, dtype).map(|i| Value::Int(i as i16 as i64)),
        DType::Boolean => to_bool(scalar).map(Value::Bool),
        DType::String => Ok(Value::Str(match scalar {
            Value::Str(s) => s.clone(),
            other => other.to_string(),
        })),
        DType::Unknown => Ok(scalar.clone()),
    }
}

fn to_float(scalar: &Value) -> Result<f64> {
    match scalar {
        Value::Str(s) => s.trim().parse::<f64>().map_err(|_| invalid(scalar, DType::Float64)),
        other => other.as_f64(),
    }
}

fn to_int(scalar: &Value, dtype: DType) -> Result<i64> {
    match scalar {
        Value::Int(i) => Ok(*i),
        Value::Float(f) if f.is_finite() => Ok(f.trunc() as i64),
        Value::Float(_) => Err(invalid(scalar, dtype)),
        Value::Bool(b) => Ok(*b as i64),
        Value::Str(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .or_else(|_| s.parse::<f64>().map(|f| f.trunc() as i64))
                .map_err(|_| invalid(scalar, dtype))
        }
        Value::Array(_) => Err(invalid(scalar, dtype)),
    }
}

fn to_bool(scalar: &Value) -> Result<bool> {
    match scalar {
        Value::Str(s) => match s.trim() {
            "true" => Ok(true),
            "false" | "" => Ok(false),
            _ => Err(invalid(scalar, DType::Boolean)),
        },
        other => Ok(other.truthy()),
    }
}

fn invalid(scalar: &Value, dtype: DType) -> TensorError {
    TensorError::InvalidCast {
        value: scalar.to_string(),
        dtype: dtype.to_string(),
    }
}
