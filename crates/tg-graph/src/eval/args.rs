use std::collections::BTreeMap;

use tg_tensor::{DType, Value};

use crate::error::{EvalError, Result};
use crate::op::OpKind;

/// A concrete option after every node it referenced has been evaluated.
#[derive(Debug, Clone)]
pub(crate) enum Resolved {
    Value(Value),
    Values(Vec<Value>),
}

/// Fully concrete operands and options of a pure kernel.
#[derive(Debug)]
pub(crate) struct Args {
    pub op: OpKind,
    pub dtype: DType,
    pub inputs: Vec<Value>,
    pub options: BTreeMap<String, Resolved>,
}

impl Args {
    pub fn a(&self) -> Result<&Value> {
        self.input(0)
    }

    pub fn b(&self) -> Result<&Value> {
        self.input(1)
    }

    fn input(&self, i: usize) -> Result<&Value> {
        self.inputs.get(i).ok_or_else(|| EvalError::Arity {
            op: self.op,
            expected: format!("at least {}", i + 1),
            got: self.inputs.len(),
        })
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        match self.options.get(key) {
            Some(Resolved::Value(v)) => Some(v),
            _ => None,
        }
    }

    /// Operand `index` if present, else the named option.
    pub fn operand_or(&self, index: usize, key: &str) -> Option<&Value> {
        self.inputs.get(index).or_else(|| self.value(key))
    }

    pub fn values(&self, key: &str) -> Result<&[Value]> {
        match self.options.get(key) {
            Some(Resolved::Values(vs)) => Ok(vs),
            _ => Err(self.invalid(key, "expected a sequence of nodes")),
        }
    }

    pub fn flag(&self, key: &str) -> bool {
        self.value(key).is_some_and(Value::truthy)
    }

    pub fn int(&self, key: &str) -> Result<Option<i64>> {
        self.value(key)
            .map(|v| v.as_i64().map_err(|e| self.invalid(key, &e.to_string())))
            .transpose()
    }

    pub fn float(&self, key: &str, default: f64) -> Result<f64> {
        match self.value(key) {
            Some(v) => v.as_f64().map_err(|e| self.invalid(key, &e.to_string())),
            None => Ok(default),
        }
    }

    /// The node dtype, or the dtype of `value` when the node's is unknown.
    pub fn effective_dtype(&self, value: &Value) -> DType {
        match self.dtype {
            DType::Unknown => DType::infer(value),
            dtype => dtype,
        }
    }

    pub fn invalid(&self, key: &str, reason: &str) -> EvalError {
        EvalError::InvalidOption {
            op: self.op,
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}
