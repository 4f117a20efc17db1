use std::collections::HashMap;

use tg_tensor::cast::cast;
use tg_tensor::{DType, Shape, Value};

use crate::error::{EvalError, Result};
use crate::node::{Breakpoint, Node, NodeId, NodeKind, Operation, TensorValue};
use crate::op::OpKind;
use crate::options::{OptionValue, Options};

/// Nesting depth rendered by [`Graph::expression`] before falling back to names.
const EXPRESSION_DEPTH: usize = 4;
/// Literals with at most this many scalars are rendered inline.
const INLINE_LITERAL_LEN: usize = 4;

/// Arena of nodes addressed by [`NodeId`], with a unique-name index.
#[derive(Debug, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    names: HashMap<String, NodeId>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id.0).ok_or(EvalError::NoSuchNode(id.0))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(id.0).ok_or(EvalError::NoSuchNode(id.0))
    }

    /// Looks a node up by its (unique) name.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// A literal whose dtype is inferred from its first scalar.
    pub fn constant(&mut self, name: &str, value: impl Into<Value>) -> Result<NodeId> {
        let value = value.into();
        let dtype = DType::infer(&value);
        self.constant_typed(name, value, dtype)
    }

    /// A literal stored cast to `dtype`.
    pub fn constant_typed(
        &mut self,
        name: &str,
        value: impl Into<Value>,
        dtype: DType,
    ) -> Result<NodeId> {
        let value = cast(&value.into(), dtype)?;
        let shape = Some(Shape::known(&value.dims()));
        let kind = NodeKind::Tensor(TensorValue::Concrete(value));
        Ok(self.insert(name, dtype, shape, true, kind))
    }

    /// A plain tensor whose value is another node.
    pub fn reference(&mut self, name: &str, target: NodeId) -> Result<NodeId> {
        let node = self.node(target)?;
        let (dtype, shape) = (node.dtype, node.shape.clone());
        let kind = NodeKind::Tensor(TensorValue::Node(target));
        Ok(self.insert(name, dtype, shape, false, kind))
    }

    pub fn variable(&mut self, name: &str, dtype: DType, initial: Option<Value>) -> Result<NodeId> {
        let initial = initial.map(|v| cast(&v, dtype)).transpose()?;
        let shape = initial.as_ref().map(|v| Shape::known(&v.dims()));
        Ok(self.insert(name, dtype, shape, false, NodeKind::Variable(initial)))
    }

    pub fn placeholder(&mut self, name: &str, dtype: DType, shape: Option<Shape>) -> NodeId {
        self.insert(name, dtype, shape, false, NodeKind::Placeholder)
    }

    /// Adds an operation named after its tag.
    pub fn op(&mut self, op: OpKind, inputs: &[NodeId], options: Options) -> Result<NodeId> {
        self.op_with_name(op.name(), op, inputs, options)
    }

    /// Adds an operation whose tag is given by name.
    pub fn op_named(&mut self, tag: &str, inputs: &[NodeId], options: Options) -> Result<NodeId> {
        let op: OpKind = tag.parse()?;
        self.op(op, inputs, options)
    }

    /// Adds an operation under an explicit node name.
    pub fn op_with_name(
        &mut self,
        name: &str,
        op: OpKind,
        inputs: &[NodeId],
        options: Options,
    ) -> Result<NodeId> {
        let (min, max) = op.arity();
        if inputs.len() < min || inputs.len() > max {
            let expected = if min == max {
                min.to_string()
            } else {
                format!("{}..={}", min, max)
            };
            return Err(EvalError::Arity {
                op,
                expected,
                got: inputs.len(),
            });
        }
        for id in inputs.iter().copied().chain(options.nodes()) {
            self.node(id)?;
        }

        let dtype = self.infer_dtype(op, inputs, &options);
        let shape = self.infer_shape(op, inputs, &options);
        let operation = Operation {
            op,
            inputs: inputs.to_vec(),
            options,
        };
        Ok(self.insert(name, dtype, shape, false, NodeKind::Operation(operation)))
    }

    pub fn set_breakpoint(&mut self, id: NodeId, breakpoint: Breakpoint) -> Result<()> {
        self.node_mut(id)?.breakpoint = Some(breakpoint);
        Ok(())
    }

    pub fn set_source(&mut self, id: NodeId, source: impl Into<String>) -> Result<()> {
        self.node_mut(id)?.source = Some(source.into());
        Ok(())
    }

    /// Overwrites a variable's stored value, cast to the variable's dtype.
    pub(crate) fn set_variable(&mut self, id: NodeId, value: &Value) -> Result<Value> {
        let node = self.node_mut(id)?;
        let NodeKind::Variable(stored) = &mut node.kind else {
            return Err(EvalError::NotAVariable(node.name.clone()));
        };
        let value = cast(value, node.dtype)?;
        *stored = Some(value.clone());
        Ok(value)
    }

    /// Re-expresses a pending operation as a fresh lazy node.
    pub(crate) fn defer(&mut self, origin: NodeId, operation: Operation) -> Result<NodeId> {
        let node = self.node(origin)?;
        let (dtype, shape) = (node.dtype, node.shape.clone());
        let name = format!("{}_deferred", operation.op);
        Ok(self.insert(&name, dtype, shape, false, NodeKind::Operation(operation)))
    }

    fn unique_name(&self, requested: &str) -> String {
        if !self.names.contains_key(requested) {
            return requested.to_string();
        }
        (1..)
            .map(|i| format!("{}_{}", requested, i))
            .find(|candidate| !self.names.contains_key(candidate))
            .unwrap_or_else(|| requested.to_string())
    }

    fn insert(
        &mut self,
        name: &str,
        dtype: DType,
        shape: Option<Shape>,
        is_const: bool,
        kind: NodeKind,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        let name = self.unique_name(name);
        self.names.insert(name.clone(), id);
        self.nodes.push(Node {
            id,
            name,
            dtype,
            shape,
            is_const,
            source: None,
            breakpoint: None,
            kind,
        });
        id
    }

    fn input_dtype(&self, id: Option<&NodeId>) -> DType {
        id.and_then(|id| self.nodes.get(id.0))
            .map(|n| n.dtype)
            .unwrap_or_default()
    }

    fn input_shape(&self, id: Option<&NodeId>) -> Option<Shape> {
        id.and_then(|id| self.nodes.get(id.0))
            .and_then(|n| n.shape.clone())
    }

    fn infer_dtype(&self, op: OpKind, inputs: &[NodeId], options: &Options) -> DType {
        if op.is_comparison() {
            return DType::Boolean;
        }
        match op {
            OpKind::Shape | OpKind::Rank | OpKind::Argmax => DType::Int32,
            OpKind::Cast
            | OpKind::Zeros
            | OpKind::Ones
            | OpKind::Eye
            | OpKind::RandomUniform
            | OpKind::RandomNormal => options.dtype("dtype").unwrap_or(DType::Float32),
            OpKind::ZerosLike | OpKind::OnesLike => options
                .dtype("dtype")
                .unwrap_or_else(|| self.input_dtype(inputs.first())),
            OpKind::Concat => match options.get("values") {
                Some(OptionValue::Nodes(ids)) => self.input_dtype(ids.first()),
                _ => DType::Unknown,
            },
            OpKind::FlowGroup | OpKind::Gradients => DType::Unknown,
            _ => self.input_dtype(inputs.first()),
        }
    }

    fn infer_shape(&self, op: OpKind, inputs: &[NodeId], options: &Options) -> Option<Shape> {
        if op.binary_op().is_some() {
            let a = self.input_shape(inputs.first())?;
            let b = self.input_shape(inputs.get(1))?;
            return Shape::broadcast_shape(&a, &b).ok();
        }
        if op.unary_op().is_some() {
            return self.input_shape(inputs.first());
        }
        match op {
            OpKind::Cast
            | OpKind::ZerosLike
            | OpKind::OnesLike
            | OpKind::Identity
            | OpKind::StopGradient
            | OpKind::Print
            | OpKind::Assign
            | OpKind::AssignAdd
            | OpKind::AssignSub => self.input_shape(inputs.first()),
            OpKind::Rank => Some(Shape::scalar()),
            OpKind::Shape => self
                .input_shape(inputs.first())
                .map(|s| Shape::known(&[s.ndim()])),
            OpKind::Transpose => self.input_shape(inputs.first()).map(|s| {
                let mut dims = s.dims().to_vec();
                dims.reverse();
                Shape::new(dims)
            }),
            OpKind::Zeros | OpKind::Ones | OpKind::RandomUniform | OpKind::RandomNormal => {
                match options.get("shape") {
                    Some(OptionValue::Value(v)) => v.as_usize_vec().ok().map(|d| Shape::known(&d)),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Renders the symbolic expression rooted at `id`, e.g. `add(x, mul(y, 2))`.
    pub fn expression(&self, id: NodeId) -> String {
        self.render(id, 0)
    }

    fn render(&self, id: NodeId, depth: usize) -> String {
        let Some(node) = self.nodes.get(id.0) else {
            return id.to_string();
        };
        match &node.kind {
            NodeKind::Tensor(TensorValue::Concrete(value))
                if value.flatten().len() <= INLINE_LITERAL_LEN =>
            {
                value.to_string()
            }
            NodeKind::Tensor(TensorValue::Node(target)) if depth < EXPRESSION_DEPTH => {
                self.render(*target, depth + 1)
            }
            NodeKind::Operation(operation) if depth < EXPRESSION_DEPTH => {
                let mut args: Vec<String> = operation
                    .inputs
                    .iter()
                    .map(|input| self.render(*input, depth + 1))
                    .collect();
                if let Some(OptionValue::Nodes(ids)) = operation.options.get("values") {
                    let items: Vec<String> =
                        ids.iter().map(|i| self.render(*i, depth + 1)).collect();
                    args.push(format!("[{}]", items.join(", ")));
                }
                format!("{}({})", operation.op, args.join(", "))
            }
            _ => node.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_names() {
        let mut g = Graph::new();
        let a = g.constant("x", 1).unwrap();
        let b = g.constant("x", 2).unwrap();
        let c = g.constant("x", 3).unwrap();
        assert_eq!(g.node(a).unwrap().name(), "x");
        assert_eq!(g.node(b).unwrap().name(), "x_1");
        assert_eq!(g.node(c).unwrap().name(), "x_2");
        assert_eq!(g.find("x_1"), Some(b));
        assert_eq!(g.len(), 3);
    }

    #[test]
    fn test_constant_cast_to_dtype() {
        let mut g = Graph::new();
        let c = g.constant_typed("c", vec![1, 2], DType::Float32).unwrap();
        let node = g.node(c).unwrap();
        assert_eq!(node.value(), Some(&Value::from(vec![1.0, 2.0])));
        assert_eq!(node.shape(), Some(&Shape::known(&[2])));
        assert!(node.is_const());

        let v = g.variable("v", DType::Int32, Some(Value::Float(3.9))).unwrap();
        assert_eq!(g.node(v).unwrap().value(), Some(&Value::Int(3)));
    }

    #[test]
    fn test_mixed_literal_promotes_to_float() {
        let mut g = Graph::new();
        let c = g
            .constant("c", Value::Array(vec![Value::Int(1), Value::Float(2.5)]))
            .unwrap();
        let node = g.node(c).unwrap();
        assert_eq!(node.dtype(), DType::Float32);
        assert_eq!(node.value(), Some(&Value::from(vec![1.0, 2.5])));
    }

    #[test]
    fn test_arity_checked() {
        let mut g = Graph::new();
        let a = g.constant("a", 1).unwrap();
        let err = g.op(OpKind::Add, &[a], Options::new()).unwrap_err();
        assert!(matches!(err, EvalError::Arity { got: 1, .. }));
        assert!(g.op(OpKind::Negate, &[a, a], Options::new()).is_err());
    }

    #[test]
    fn test_unknown_tag() {
        let mut g = Graph::new();
        let a = g.constant("a", 1).unwrap();
        let err = g.op_named("fft", &[a], Options::new()).unwrap_err();
        assert!(matches!(err, EvalError::UnknownOperation(ref t) if t == "fft"));
    }

    #[test]
    fn test_missing_input() {
        let mut g = Graph::new();
        let err = g.op(OpKind::Negate, &[NodeId(7)], Options::new()).unwrap_err();
        assert!(matches!(err, EvalError::NoSuchNode(7)));
    }

    #[test]
    fn test_dtype_inference() {
        let mut g = Graph::new();
        let a = g.constant("a", vec![1, 2, 3]).unwrap();
        let b = g.constant("b", vec![vec![1.5, 2.5, 3.5]]).unwrap();
        let less = g.op(OpKind::Less, &[a, b], Options::new()).unwrap();
        let sum = g.op(OpKind::Add, &[b, a], Options::new()).unwrap();
        let shape = g.op(OpKind::Shape, &[b], Options::new()).unwrap();
        let cast = g
            .op(OpKind::Cast, &[a], Options::new().with("dtype", DType::Float64))
            .unwrap();

        assert_eq!(g.node(less).unwrap().dtype(), DType::Boolean);
        assert_eq!(g.node(sum).unwrap().dtype(), DType::Float32);
        assert_eq!(g.node(shape).unwrap().dtype(), DType::Int32);
        assert_eq!(g.node(cast).unwrap().dtype(), DType::Float64);
    }

    #[test]
    fn test_shape_inference() {
        let mut g = Graph::new();
        let row = g.placeholder("row", DType::Float32, Some(Shape::known(&[3])));
        let batch = g.placeholder("batch", DType::Float32, Some(Shape::new(vec![None, Some(3)])));
        let sum = g.op(OpKind::Add, &[row, batch], Options::new()).unwrap();
        assert_eq!(g.node(sum).unwrap().shape(), Some(&Shape::new(vec![None, Some(3)])));

        let odd = g.placeholder("odd", DType::Float32, Some(Shape::known(&[2])));
        let bad = g.op(OpKind::Add, &[row, odd], Options::new()).unwrap();
        assert_eq!(g.node(bad).unwrap().shape(), None);

        let t = g.op(OpKind::Transpose, &[batch], Options::new()).unwrap();
        assert_eq!(g.node(t).unwrap().rank(), Some(2));
    }

    #[test]
    fn test_expression() {
        let mut g = Graph::new();
        let x = g.placeholder("x", DType::Float32, None);
        let y = g.placeholder("y", DType::Float32, None);
        let two = g.constant("two", 2).unwrap();
        let mul = g.op(OpKind::Mul, &[y, two], Options::new()).unwrap();
        let add = g.op(OpKind::Add, &[x, mul], Options::new()).unwrap();
        assert_eq!(g.expression(add), "add(x, mul(y, 2))");

        let big = g.constant("big", vec![1, 2, 3, 4, 5]).unwrap();
        let cat = g
            .op(OpKind::Concat, &[], Options::new().with("values", vec![x, big]))
            .unwrap();
        assert_eq!(g.expression(cat), "concat([x, big])");
    }

    #[test]
    fn test_reference_inherits_dtype() {
        let mut g = Graph::new();
        let c = g.constant("c", vec![true, false]).unwrap();
        let r = g.reference("r", c).unwrap();
        assert_eq!(g.node(r).unwrap().dtype(), DType::Boolean);
        assert_eq!(g.expression(r), "[true, false]");
    }

    #[test]
    fn test_set_variable_rejects_non_variables() {
        let mut g = Graph::new();
        let c = g.constant("c", 1).unwrap();
        let err = g.set_variable(c, &Value::Int(2)).unwrap_err();
        assert!(matches!(err, EvalError::NotAVariable(ref n) if n == "c"));
    }
}
