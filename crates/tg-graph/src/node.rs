use std::fmt;
use std::sync::Arc;

use tg_tensor::{DType, Shape, Value};

use crate::eval::Output;
use crate::op::OpKind;
use crate::options::Options;

/// Stable handle to a node inside its [`Graph`](crate::Graph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Observation hook invoked after an operation is computed, with the node,
/// its concrete operands and its concrete result.
pub type Breakpoint =
    Arc<dyn Fn(&Node, Option<&Output>, Option<&Output>, &Output) + Send + Sync>;

/// What a plain tensor holds: a literal, or an indirection to another node.
#[derive(Debug, Clone, PartialEq)]
pub enum TensorValue {
    Concrete(Value),
    Node(NodeId),
}

/// An operation tag with its operands and options.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub op: OpKind,
    pub inputs: Vec<NodeId>,
    pub options: Options,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Tensor(TensorValue),
    Operation(Operation),
    /// Mutable only through the assign family.
    Variable(Option<Value>),
    /// Bound at run time through the execution context.
    Placeholder,
}

/// A graph vertex. Shape and dtype are fixed at construction.
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) name: String,
    pub(crate) dtype: DType,
    pub(crate) shape: Option<Shape>,
    pub(crate) is_const: bool,
    pub(crate) source: Option<String>,
    pub(crate) breakpoint: Option<Breakpoint>,
    pub(crate) kind: NodeKind,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Static shape; `None` when even the rank is unknown.
    pub fn shape(&self) -> Option<&Shape> {
        self.shape.as_ref()
    }

    pub fn rank(&self) -> Option<usize> {
        self.shape.as_ref().map(Shape::ndim)
    }

    pub fn is_const(&self) -> bool {
        self.is_const
    }

    /// Where the node was defined, if the builder recorded it.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn operation(&self) -> Option<&Operation> {
        match &self.kind {
            NodeKind::Operation(op) => Some(op),
            _ => None,
        }
    }

    /// The stored value of a literal tensor or a variable.
    pub fn value(&self) -> Option<&Value> {
        match &self.kind {
            NodeKind::Tensor(TensorValue::Concrete(v)) => Some(v),
            NodeKind::Variable(v) => v.as_ref(),
            _ => None,
        }
    }

    pub fn breakpoint(&self) -> Option<&Breakpoint> {
        self.breakpoint.as_ref()
    }

    pub(crate) fn kind_label(&self) -> &'static str {
        match self.kind {
            NodeKind::Tensor(_) => "tensor",
            NodeKind::Operation(_) => "operation",
            NodeKind::Variable(_) => "variable",
            NodeKind::Placeholder => "placeholder",
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("dtype", &self.dtype)
            .field("shape", &self.shape)
            .field("is_const", &self.is_const)
            .field("source", &self.source)
            .field("breakpoint", &self.breakpoint.is_some())
            .field("kind", &self.kind)
            .finish()
    }
}
