//! The evaluation engine.
//!
//! An [`Evaluator`] walks the graph depth-first from a root node, memoizing
//! each operation's result for the lifetime of the evaluator. Pure kernels
//! whose operands are still symbolic are not failed: the operation is
//! re-expressed as a fresh lazy node and that node is returned instead.

mod args;
mod array;
mod control;
mod math;
mod random;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tg_tensor::{ComputeBackend, CpuBackend, Value};

use crate::config::EvalConfig;
use crate::context::ExecutionContext;
use crate::error::{EvalError, Result};
use crate::graph::Graph;
use crate::node::{NodeId, NodeKind, Operation, TensorValue};
use crate::op::OpKind;
use crate::options::OptionValue;

use args::{Args, Resolved};

/// Result of running a node.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Value(Value),
    /// A node left unevaluated: retained, deferred, or forwarded.
    Node(NodeId),
    List(Vec<Output>),
}

impl Output {
    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Output::Node(id) => Some(*id),
            _ => None,
        }
    }

    /// Converts to a value; lists become arrays. `None` if any node remains.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Output::Value(v) => Some(v),
            Output::Node(_) => None,
            Output::List(items) => items
                .into_iter()
                .map(Output::into_value)
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
        }
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Value(v) => write!(f, "{}", v),
            Output::Node(id) => write!(f, "{}", id),
            Output::List(items) => {
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

impl From<Value> for Output {
    fn from(v: Value) -> Self {
        Output::Value(v)
    }
}

/// Operand resolution: concrete, or blocked on a symbolic node.
enum Resolution<T> {
    Concrete(T),
    Symbolic,
}

/// One evaluation run over a graph.
pub struct Evaluator<'g> {
    graph: &'g mut Graph,
    config: EvalConfig,
    backend: Arc<dyn ComputeBackend>,
    memo: HashMap<NodeId, Output>,
    symbolic: HashSet<NodeId>,
    rng: StdRng,
}

impl<'g> Evaluator<'g> {
    pub fn new(graph: &'g mut Graph) -> Self {
        Self::with_config(graph, EvalConfig::default())
    }

    pub fn with_config(graph: &'g mut Graph, config: EvalConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Evaluator {
            graph,
            config,
            backend: Arc::new(CpuBackend::new()),
            memo: HashMap::new(),
            symbolic: HashSet::new(),
            rng,
        }
    }

    /// Replaces the backend used for matrix products.
    pub fn with_backend(mut self, backend: Arc<dyn ComputeBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn graph(&self) -> &Graph {
        self.graph
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Whether `id` was produced by deferral during this run.
    pub fn is_symbolic(&self, id: NodeId) -> bool {
        self.symbolic.contains(&id)
    }

    /// Evaluates one step of `id`.
    ///
    /// Retained nodes come back as themselves. Operations are memoized;
    /// variables, placeholders and plain tensors are read directly.
    pub fn run(&mut self, id: NodeId, ctx: &mut ExecutionContext) -> Result<Output> {
        if ctx.is_retained(id) {
            return Ok(Output::Node(id));
        }
        let node = self.graph.node(id)?;
        log::trace!("run {} '{}'", node.kind_label(), node.name());

        match &node.kind {
            NodeKind::Operation(_) => self.eval_operation(id, ctx),
            NodeKind::Variable(value) => {
                let value = value
                    .clone()
                    .ok_or_else(|| EvalError::UninitializedVariable(node.name.clone()))?;
                ctx.record_read(id);
                Ok(Output::Value(value))
            }
            NodeKind::Placeholder => ctx
                .binding(&node.name)
                .cloned()
                .map(Output::Value)
                .ok_or_else(|| EvalError::MissingPlaceholder(node.name.clone())),
            NodeKind::Tensor(TensorValue::Concrete(value)) => Ok(Output::Value(value.clone())),
            NodeKind::Tensor(TensorValue::Node(target)) => {
                let target = *target;
                self.run(target, ctx)
            }
        }
    }

    pub fn run_all(&mut self, ids: &[NodeId], ctx: &mut ExecutionContext) -> Result<Output> {
        ids.iter()
            .map(|&id| self.run(id, ctx))
            .collect::<Result<Vec<_>>>()
            .map(Output::List)
    }

    /// Runs `id` until the result is no longer a node that can make progress.
    pub fn complete_eval(&mut self, id: NodeId, ctx: &mut ExecutionContext) -> Result<Output> {
        let mut last = id;
        let mut current = self.run(id, ctx)?;
        let mut steps = 1;
        loop {
            match current {
                Output::Node(next)
                    if next != last && !self.is_symbolic(next) && !ctx.is_retained(next) =>
                {
                    if steps >= self.config.max_fixed_point_iterations {
                        log::warn!(
                            "stopped forcing '{}' after {} steps",
                            self.graph.node(id)?.name(),
                            steps
                        );
                        return Ok(Output::Node(next));
                    }
                    steps += 1;
                    last = next;
                    current = self.run(next, ctx)?;
                }
                Output::List(items) => return self.complete_list(items, ctx),
                other => return Ok(other),
            }
        }
    }

    pub fn complete_eval_all(
        &mut self,
        ids: &[NodeId],
        ctx: &mut ExecutionContext,
    ) -> Result<Output> {
        ids.iter()
            .map(|&id| self.complete_eval(id, ctx))
            .collect::<Result<Vec<_>>>()
            .map(Output::List)
    }

    /// Forces an already computed output, e.g. one returned by [`run`](Self::run).
    pub fn complete(&mut self, output: Output, ctx: &mut ExecutionContext) -> Result<Output> {
        match output {
            Output::Node(id) if self.is_symbolic(id) || ctx.is_retained(id) => Ok(Output::Node(id)),
            Output::Node(id) => self.complete_eval(id, ctx),
            Output::List(items) => self.complete_list(items, ctx),
            value => Ok(value),
        }
    }

    fn complete_list(&mut self, items: Vec<Output>, ctx: &mut ExecutionContext) -> Result<Output> {
        items
            .into_iter()
            .map(|item| self.complete(item, ctx))
            .collect::<Result<Vec<_>>>()
            .map(Output::List)
    }

    fn resolve(&mut self, id: NodeId, ctx: &mut ExecutionContext) -> Result<Resolution<Value>> {
        Ok(match self.complete_eval(id, ctx)?.into_value() {
            Some(value) => Resolution::Concrete(value),
            None => Resolution::Symbolic,
        })
    }

    fn eval_operation(&mut self, id: NodeId, ctx: &mut ExecutionContext) -> Result<Output> {
        let node = self.graph.node(id)?;
        if let Some(hit) = self.memo.get(&id) {
            log::debug!("memo hit for '{}'", node.name());
            return Ok(hit.clone());
        }
        let Some(operation) = node.operation().cloned() else {
            return Err(EvalError::Unsupported(format!(
                "'{}' is not an operation",
                node.name()
            )));
        };

        let result = match self.dispatch(id, &operation, ctx) {
            Ok(result) => result,
            Err(err) => return Err(self.wrap(id, err)),
        };
        self.memo.insert(id, result.clone());
        self.fire_breakpoint(id, &operation, &result, ctx);
        Ok(result)
    }

    /// Attaches node context to `err` unless an inner node already did.
    fn wrap(&self, id: NodeId, err: EvalError) -> EvalError {
        if err.is_wrapped() {
            return err;
        }
        match self.graph.node(id) {
            Ok(node) => EvalError::Evaluation {
                name: node.name.clone(),
                expression: self.graph.expression(id),
                location: node.source.clone(),
                cause: Box::new(err),
            },
            Err(_) => err,
        }
    }

    fn fire_breakpoint(
        &mut self,
        id: NodeId,
        operation: &Operation,
        result: &Output,
        ctx: &mut ExecutionContext,
    ) {
        let Some(breakpoint) = self.graph.node(id).ok().and_then(|n| n.breakpoint.clone()) else {
            return;
        };
        let stateful = operation.op.is_stateful();
        let a = operation
            .inputs
            .first()
            .and_then(|&i| self.observe(i, stateful, ctx));
        let b = operation
            .inputs
            .get(1)
            .and_then(|&i| self.observe(i, stateful, ctx));
        let concrete = self
            .complete(result.clone(), ctx)
            .unwrap_or_else(|_| result.clone());
        if let Ok(node) = self.graph.node(id) {
            (*breakpoint)(node, a.as_ref(), b.as_ref(), &concrete);
        }
    }

    /// An operand as shown to a breakpoint. Operands of stateful operations
    /// are only read back (memo, literal or variable), never evaluated, so an
    /// untaken `cond` branch stays untaken.
    fn observe(
        &mut self,
        input: NodeId,
        stateful: bool,
        ctx: &mut ExecutionContext,
    ) -> Option<Output> {
        if !stateful {
            return self.complete_eval(input, ctx).ok();
        }
        if let Some(hit) = self.memo.get(&input) {
            return Some(hit.clone());
        }
        match &self.graph.node(input).ok()?.kind {
            NodeKind::Tensor(TensorValue::Concrete(v)) | NodeKind::Variable(Some(v)) => {
                Some(Output::Value(v.clone()))
            }
            _ => None,
        }
    }

    /// Routes stateful operations to their handlers and everything else to a
    /// pure kernel over gathered operands.
    fn dispatch(
        &mut self,
        id: NodeId,
        operation: &Operation,
        ctx: &mut ExecutionContext,
    ) -> Result<Output> {
        let kernel: fn(&mut Self, &Args) -> Result<Value> = match operation.op {
            OpKind::Assign | OpKind::AssignAdd | OpKind::AssignSub => {
                return self.assign(id, operation, ctx)
            }
            OpKind::FlowGroup => return self.flow_group(operation, ctx),
            OpKind::Identity | OpKind::StopGradient => return self.identity(operation, ctx),
            OpKind::Print => return self.print(operation, ctx),
            OpKind::Cond => return self.cond(id, operation, ctx),
            OpKind::Gradients => {
                return Err(EvalError::Unsupported(
                    "gradients must be built by a differentiation pass before evaluation"
                        .to_string(),
                ))
            }
            OpKind::Add
            | OpKind::Sub
            | OpKind::Mul
            | OpKind::Pow
            | OpKind::Div
            | OpKind::Max
            | OpKind::Equal
            | OpKind::NotEqual
            | OpKind::Less
            | OpKind::Greater
            | OpKind::LessEqual
            | OpKind::GreaterEqual => |_, args| math::binary(args),
            OpKind::Negate
            | OpKind::Abs
            | OpKind::Tanh
            | OpKind::Tan
            | OpKind::Sin
            | OpKind::Cos
            | OpKind::Log
            | OpKind::Exp
            | OpKind::Sqrt
            | OpKind::Square
            | OpKind::Sign => |_, args| math::unary(args),
            OpKind::Cast => |_, args| math::cast(args),
            OpKind::Argmax => |_, args| math::argmax(args),
            OpKind::ReduceSum | OpKind::ReduceMean | OpKind::ReduceProd => {
                |_, args| math::reduce(args)
            }
            OpKind::Matmul => |ev, args| math::matmul(args, ev.backend.as_ref()),
            OpKind::Index => |_, args| array::index(args),
            OpKind::Slice => |_, args| array::slice(args),
            OpKind::Concat => |_, args| array::concat(args),
            OpKind::Transpose => |_, args| array::transpose(args),
            OpKind::Eye => |_, args| array::eye(args),
            OpKind::Zeros | OpKind::Ones => |_, args| array::fill(args),
            OpKind::ZerosLike | OpKind::OnesLike => |_, args| array::fill_like(args),
            OpKind::Shape => |_, args| array::shape(args),
            OpKind::Rank => |_, args| array::rank(args),
            OpKind::Reshape => |_, args| array::reshape(args),
            OpKind::Pad => |_, args| array::pad(args),
            OpKind::Where => |_, args| array::select(args),
            OpKind::RandomUniform | OpKind::RandomNormal => {
                |ev, args| random::sample(args, &mut ev.rng)
            }
        };
        match self.gather(id, operation, ctx)? {
            Resolution::Concrete(args) => kernel(self, &args).map(Output::Value),
            Resolution::Symbolic => self.defer(id, operation),
        }
    }

    /// Resolves every operand and node-valued option of a pure kernel.
    fn gather(
        &mut self,
        id: NodeId,
        operation: &Operation,
        ctx: &mut ExecutionContext,
    ) -> Result<Resolution<Args>> {
        let mut inputs = Vec::with_capacity(operation.inputs.len());
        for &input in &operation.inputs {
            match self.resolve(input, ctx)? {
                Resolution::Concrete(value) => inputs.push(value),
                Resolution::Symbolic => return Ok(Resolution::Symbolic),
            }
        }

        let mut options = BTreeMap::new();
        for (key, option) in operation.options.iter() {
            let resolved = match option {
                OptionValue::Value(v) => Resolved::Value(v.clone()),
                OptionValue::DType(dtype) => Resolved::Value(Value::Str(dtype.to_string())),
                OptionValue::Node(node) => match self.resolve(*node, ctx)? {
                    Resolution::Concrete(value) => Resolved::Value(value),
                    Resolution::Symbolic => return Ok(Resolution::Symbolic),
                },
                OptionValue::Nodes(nodes) => {
                    let mut values = Vec::with_capacity(nodes.len());
                    for &node in nodes {
                        match self.resolve(node, ctx)? {
                            Resolution::Concrete(value) => values.push(value),
                            Resolution::Symbolic => return Ok(Resolution::Symbolic),
                        }
                    }
                    Resolved::Values(values)
                }
            };
            options.insert(key.to_string(), resolved);
        }

        Ok(Resolution::Concrete(Args {
            op: operation.op,
            dtype: self.graph.node(id)?.dtype,
            inputs,
            options,
        }))
    }

    /// Re-expresses `operation` as a lazy node because an operand is symbolic.
    fn defer(&mut self, id: NodeId, operation: &Operation) -> Result<Output> {
        if self.is_symbolic(id) {
            return Ok(Output::Node(id));
        }
        let deferred = self.graph.defer(id, operation.clone())?;
        self.symbolic.insert(deferred);
        log::debug!(
            "deferred '{}' as '{}'",
            self.graph.node(id)?.name(),
            self.graph.node(deferred)?.name()
        );
        Ok(Output::Node(deferred))
    }
}

/// Evaluates `id` to completion with a fresh evaluator.
pub fn evaluate(graph: &mut Graph, id: NodeId, ctx: &mut ExecutionContext) -> Result<Output> {
    Evaluator::new(graph).complete_eval(id, ctx)
}
