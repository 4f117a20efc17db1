use std::collections::BTreeMap;

use tg_tensor::{DType, Value};

use crate::node::NodeId;

/// A named operation parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    /// A literal such as an axis, a flag or a shape.
    Value(Value),
    /// A node evaluated on demand (e.g. a `pred`).
    Node(NodeId),
    /// A sequence of nodes (the `values` of `concat` and `flow_group`).
    Nodes(Vec<NodeId>),
    DType(DType),
}

/// Operation options keyed by name (axis, keepdims, shape, paddings, pred, ...).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options(BTreeMap<String, OptionValue>);

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an option. Returns self for builder-style usage.
    pub fn with(mut self, key: &str, value: impl Into<OptionValue>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.0.get(key)
    }

    pub fn dtype(&self, key: &str) -> Option<DType> {
        match self.0.get(key) {
            Some(OptionValue::DType(dtype)) => Some(*dtype),
            Some(OptionValue::Value(Value::Str(name))) => name.parse().ok(),
            _ => None,
        }
    }

    /// Node ids referenced by this option set, in key order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.0.values().flat_map(|v| match v {
            OptionValue::Node(id) => vec![*id],
            OptionValue::Nodes(ids) => ids.clone(),
            _ => vec![],
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Value> for OptionValue {
    fn from(v: Value) -> Self {
        OptionValue::Value(v)
    }
}

impl From<NodeId> for OptionValue {
    fn from(id: NodeId) -> Self {
        OptionValue::Node(id)
    }
}

impl From<Vec<NodeId>> for OptionValue {
    fn from(ids: Vec<NodeId>) -> Self {
        OptionValue::Nodes(ids)
    }
}

impl From<DType> for OptionValue {
    fn from(dtype: DType) -> Self {
        OptionValue::DType(dtype)
    }
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        OptionValue::Value(Value::Bool(v))
    }
}

impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        OptionValue::Value(Value::Int(v))
    }
}

impl From<f64> for OptionValue {
    fn from(v: f64) -> Self {
        OptionValue::Value(Value::Float(v))
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        OptionValue::Value(Value::Str(v.to_string()))
    }
}
