use std::collections::{HashMap, HashSet};

use tg_tensor::Value;

use crate::node::NodeId;

/// Caller-supplied state for one evaluation run.
///
/// Holds placeholder bindings keyed by placeholder name and a retain set of
/// nodes that evaluate to themselves. After a run, [`reads`](Self::reads)
/// lists the variables that were read, in first-read order.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    bindings: HashMap<String, Value>,
    retain: HashSet<NodeId>,
    reads: Vec<NodeId>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, name: &str, value: impl Into<Value>) {
        self.bindings.insert(name.to_string(), value.into());
    }

    pub fn with_binding(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.bind(name, value);
        self
    }

    pub fn retain(&mut self, id: NodeId) {
        self.retain.insert(id);
    }

    pub fn with_retained(mut self, id: NodeId) -> Self {
        self.retain(id);
        self
    }

    pub fn binding(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn is_retained(&self, id: NodeId) -> bool {
        self.retain.contains(&id)
    }

    pub(crate) fn record_read(&mut self, id: NodeId) {
        if !self.reads.contains(&id) {
            self.reads.push(id);
        }
    }

    /// Variables read so far, deduplicated.
    pub fn reads(&self) -> &[NodeId] {
        &self.reads
    }
}
