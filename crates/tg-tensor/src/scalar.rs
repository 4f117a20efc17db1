//! Scalar operators applied by the elementwise combinators.
//!
//! Integer operands stay integral where the operator allows it (add, sub, mul,
//! floor division, non-negative powers, max, abs, square, sign); any float
//! operand promotes the result to float. Booleans participate as 0/1.

use std::cmp::Ordering;

use crate::error::{Result, TensorError};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Max,
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Negate,
    Abs,
    Tanh,
    Tan,
    Sin,
    Cos,
    Log,
    Exp,
    Sqrt,
    Square,
    Sign,
}

#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

fn num(v: &Value) -> Result<Num> {
    match v {
        Value::Int(i) => Ok(Num::Int(*i)),
        Value::Bool(b) => Ok(Num::Int(*b as i64)),
        Value::Float(f) => Ok(Num::Float(*f)),
        other => Err(TensorError::TypeMismatch {
            expected: "numeric scalar".to_string(),
            got: other.to_string(),
        }),
    }
}

fn float(n: Num) -> f64 {
    match n {
        Num::Int(i) => i as f64,
        Num::Float(f) => f,
    }
}

fn floor_div(a: i64, b: i64) -> Result<i64> {
    if b == 0 {
        return Err(TensorError::DivisionByZero);
    }
    let q = a.wrapping_div(b);
    if a.wrapping_rem(b) != 0 && ((a < 0) != (b < 0)) {
        Ok(q.wrapping_sub(1))
    } else {
        Ok(q)
    }
}

impl BinaryOp {
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Equal
                | BinaryOp::NotEqual
                | BinaryOp::Less
                | BinaryOp::Greater
                | BinaryOp::LessEqual
                | BinaryOp::GreaterEqual
        )
    }

    /// Applies the operator to two scalars.
    pub fn apply(&self, a: &Value, b: &Value) -> Result<Value> {
        if self.is_comparison() {
            return self.compare(a, b).map(Value::Bool);
        }
        if let (BinaryOp::Add, Value::Str(x), Value::Str(y)) = (self, a, b) {
            return Ok(Value::Str(format!("{}{}", x, y)));
        }

        let (x, y) = (num(a)?, num(b)?);
        let out = match (self, x, y) {
            (BinaryOp::Add, Num::Int(p), Num::Int(q)) => Value::Int(p.wrapping_add(q)),
            (BinaryOp::Sub, Num::Int(p), Num::Int(q)) => Value::Int(p.wrapping_sub(q)),
            (BinaryOp::Mul, Num::Int(p), Num::Int(q)) => Value::Int(p.wrapping_mul(q)),
            (BinaryOp::Div, Num::Int(p), Num::Int(q)) => Value::Int(floor_div(p, q)?),
            (BinaryOp::Pow, Num::Int(p), Num::Int(q)) if (0..=u32::MAX as i64).contains(&q) => {
                Value::Int(p.wrapping_pow(q as u32))
            }
            (BinaryOp::Max, Num::Int(p), Num::Int(q)) => Value::Int(p.max(q)),
            (op, x, y) => {
                let (p, q) = (float(x), float(y));
                Value::Float(match op {
                    BinaryOp::Add => p + q,
                    BinaryOp::Sub => p - q,
                    BinaryOp::Mul => p * q,
                    BinaryOp::Div => p / q,
                    BinaryOp::Pow => p.powf(q),
                    BinaryOp::Max => {
                        if p.is_nan() || q.is_nan() {
                            f64::NAN
                        } else {
                            p.max(q)
                        }
                    }
                    _ => return Err(TensorError::Other(format!("{:?} is not arithmetic", op))),
                })
            }
        };
        Ok(out)
    }

    fn compare(&self, a: &Value, b: &Value) -> Result<bool> {
        let ordering = match (a, b) {
            (Value::Str(x), Value::Str(y)) => Some(x.cmp(y)),
            (Value::Str(_), _) | (_, Value::Str(_)) => {
                return match self {
                    BinaryOp::Equal => Ok(false),
                    BinaryOp::NotEqual => Ok(true),
                    _ => Err(TensorError::TypeMismatch {
                        expected: "comparable scalars".to_string(),
                        got: format!("{} and {}", a, b),
                    }),
                };
            }
            _ => match (num(a)?, num(b)?) {
                (Num::Int(p), Num::Int(q)) => Some(p.cmp(&q)),
                (x, y) => float(x).partial_cmp(&float(y)),
            },
        };

        // NaN compares unequal to everything
        Ok(match (self, ordering) {
            (BinaryOp::NotEqual, None) => true,
            (_, None) => false,
            (BinaryOp::Equal, Some(o)) => o == Ordering::Equal,
            (BinaryOp::NotEqual, Some(o)) => o != Ordering::Equal,
            (BinaryOp::Less, Some(o)) => o == Ordering::Less,
            (BinaryOp::Greater, Some(o)) => o == Ordering::Greater,
            (BinaryOp::LessEqual, Some(o)) => o != Ordering::Greater,
            (BinaryOp::GreaterEqual, Some(o)) => o != Ordering::Less,
            (op, _) => {
                return Err(TensorError::Other(format!("{:?} is not a comparison", op)))
            }
        })
    }
}

impl UnaryOp {
    pub fn apply(&self, a: &Value) -> Result<Value> {
        let x = num(a)?;
        let out = match (self, x) {
            (UnaryOp::Negate, Num::Int(i)) => Value::Int(i.wrapping_neg()),
            (UnaryOp::Abs, Num::Int(i)) => Value::Int(i.wrapping_abs()),
            (UnaryOp::Square, Num::Int(i)) => Value::Int(i.wrapping_mul(i)),
            (UnaryOp::Sign, Num::Int(i)) => Value::Int(i.signum()),
            (op, x) => {
                let f = float(x);
                Value::Float(match op {
                    UnaryOp::Negate => -f,
                    UnaryOp::Abs => f.abs(),
                    UnaryOp::Tanh => f.tanh(),
                    UnaryOp::Tan => f.tan(),
                    UnaryOp::Sin => f.sin(),
                    UnaryOp::Cos => f.cos(),
                    // ln of a negative number is NaN
                    UnaryOp::Log => f.ln(),
                    UnaryOp::Exp => f.exp(),
                    UnaryOp::Sqrt => f.sqrt(),
                    UnaryOp::Square => f * f,
                    UnaryOp::Sign => {
                        if f == 0.0 || f.is_nan() {
                            0.0
                        } else {
                            f.signum()
                        }
                    }
                })
            }
        };
        Ok(out)
    }
}
