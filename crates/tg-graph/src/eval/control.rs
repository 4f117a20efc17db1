//! Operations with side effects or control flow. These resolve their own
//! operands. `assign*` and `cond` defer as a whole when an operand is still
//! symbolic; nothing is written in that case.

use tg_tensor::broadcast;
use tg_tensor::{BinaryOp, Value};

use super::{Evaluator, Output, Resolution};
use crate::context::ExecutionContext;
use crate::error::{EvalError, Result};
use crate::node::{NodeId, Operation};
use crate::op::OpKind;
use crate::options::OptionValue;

impl Evaluator<'_> {
    fn operand(&self, operation: &Operation, index: usize) -> Result<NodeId> {
        operation
            .inputs
            .get(index)
            .copied()
            .ok_or_else(|| EvalError::Arity {
                op: operation.op,
                expected: format!("at least {}", index + 1),
                got: operation.inputs.len(),
            })
    }

    /// `assign`, `assign_add` and `assign_sub` on the variable in operand `a`.
    pub(super) fn assign(
        &mut self,
        id: NodeId,
        operation: &Operation,
        ctx: &mut ExecutionContext,
    ) -> Result<Output> {
        let target = self.operand(operation, 0)?;
        let source = self.operand(operation, 1)?;
        let Resolution::Concrete(rhs) = self.resolve(source, ctx)? else {
            return self.defer(id, operation);
        };

        let combine = match operation.op {
            OpKind::AssignAdd => Some(BinaryOp::Add),
            OpKind::AssignSub => Some(BinaryOp::Sub),
            _ => None,
        };
        let updated = match combine {
            Some(op) => {
                let Resolution::Concrete(current) = self.resolve(target, ctx)? else {
                    return self.defer(id, operation);
                };
                broadcast::binary(&current, &rhs, op)?
            }
            None => rhs,
        };

        let stored = self.graph.set_variable(target, &updated)?;
        log::debug!(
            "{} wrote '{}' = {}",
            operation.op,
            self.graph.node(target)?.name(),
            stored
        );
        Ok(Output::Value(stored))
    }

    /// Evaluates the `values` option in order and returns every result.
    pub(super) fn flow_group(
        &mut self,
        operation: &Operation,
        ctx: &mut ExecutionContext,
    ) -> Result<Output> {
        let ids = match operation.options.get("values") {
            Some(OptionValue::Nodes(ids)) => ids.clone(),
            Some(OptionValue::Node(id)) => vec![*id],
            _ => operation.inputs.clone(),
        };
        self.complete_eval_all(&ids, ctx)
    }

    pub(super) fn identity(
        &mut self,
        operation: &Operation,
        ctx: &mut ExecutionContext,
    ) -> Result<Output> {
        let input = self.operand(operation, 0)?;
        self.complete_eval(input, ctx)
    }

    /// Logs the operand under `tg_graph::print` and hands back the operand
    /// itself, unevaluated.
    pub(super) fn print(
        &mut self,
        operation: &Operation,
        ctx: &mut ExecutionContext,
    ) -> Result<Output> {
        let input = self.operand(operation, 0)?;
        let shown = self.complete_eval(input, ctx)?;
        let message = match operation.options.get("message") {
            Some(OptionValue::Value(Value::Str(m))) => m.as_str(),
            _ => "",
        };
        log::info!(target: "tg_graph::print", "{}{}", message, shown);
        Ok(Output::Node(input))
    }

    /// Returns branch `a` when every element of `pred` is true, else branch `b`.
    /// Only the chosen branch is evaluated.
    pub(super) fn cond(
        &mut self,
        id: NodeId,
        operation: &Operation,
        ctx: &mut ExecutionContext,
    ) -> Result<Output> {
        let pred = match operation.options.get("pred") {
            Some(OptionValue::Node(pred)) => match self.resolve(*pred, ctx)? {
                Resolution::Concrete(value) => value,
                Resolution::Symbolic => return self.defer(id, operation),
            },
            Some(OptionValue::Value(v)) => v.clone(),
            _ => {
                return Err(EvalError::InvalidOption {
                    op: operation.op,
                    key: "pred".to_string(),
                    reason: "missing".to_string(),
                })
            }
        };
        let branch = if pred.all_truthy() {
            self.operand(operation, 0)?
        } else {
            self.operand(operation, 1)?
        };
        self.complete_eval(branch, ctx)
    }
}

#[cfg(test)]
mod tests {
    use tg_tensor::DType;

    use crate::eval::evaluate;
    use crate::graph::Graph;
    use crate::options::Options;

    use super::*;

    #[test]
    fn test_assign_casts_to_variable_dtype() {
        let mut g = Graph::new();
        let v = g.variable("v", DType::Int32, None).unwrap();
        let x = g.constant("x", vec![1.9, -1.9]).unwrap();
        let set = g.op(OpKind::Assign, &[v, x], Options::new()).unwrap();

        let out = evaluate(&mut g, set, &mut ExecutionContext::new()).unwrap();
        assert_eq!(out, Output::Value(Value::from(vec![1, -1])));
        assert_eq!(g.node(v).unwrap().value(), Some(&Value::from(vec![1, -1])));
    }

    #[test]
    fn test_assign_sub_broadcasts() {
        let mut g = Graph::new();
        let v = g
            .variable("v", DType::Float32, Some(Value::from(vec![5.0, 6.0])))
            .unwrap();
        let one = g.constant("one", 1.0).unwrap();
        let dec = g.op(OpKind::AssignSub, &[v, one], Options::new()).unwrap();
        let out = evaluate(&mut g, dec, &mut ExecutionContext::new()).unwrap();
        assert_eq!(out, Output::Value(Value::from(vec![4.0, 5.0])));
    }

    #[test]
    fn test_assign_requires_variable() {
        let mut g = Graph::new();
        let c = g.constant("c", 1).unwrap();
        let set = g.op(OpKind::Assign, &[c, c], Options::new()).unwrap();
        let err = evaluate(&mut g, set, &mut ExecutionContext::new()).unwrap_err();
        assert!(matches!(err.root_cause(), EvalError::NotAVariable(n) if n == "c"));
    }

    #[test]
    fn test_assign_add_uninitialized() {
        let mut g = Graph::new();
        let v = g.variable("v", DType::Int32, None).unwrap();
        let one = g.constant("one", 1).unwrap();
        let inc = g.op(OpKind::AssignAdd, &[v, one], Options::new()).unwrap();
        let err = evaluate(&mut g, inc, &mut ExecutionContext::new()).unwrap_err();
        assert!(matches!(err.root_cause(), EvalError::UninitializedVariable(_)));
    }

    #[test]
    fn test_identity_and_stop_gradient() {
        let mut g = Graph::new();
        let x = g.constant("x", vec![1, 2]).unwrap();
        let id = g.op(OpKind::Identity, &[x], Options::new()).unwrap();
        let sg = g.op(OpKind::StopGradient, &[id], Options::new()).unwrap();
        let out = evaluate(&mut g, sg, &mut ExecutionContext::new()).unwrap();
        assert_eq!(out, Output::Value(Value::from(vec![1, 2])));
    }

    #[test]
    fn test_cond_evaluates_chosen_branch_only() {
        let mut g = Graph::new();
        let pred = g.constant("pred", vec![true, true]).unwrap();
        let yes = g.constant("yes", 1).unwrap();
        let missing = g.placeholder("missing", DType::Int32, None);
        let choose = g
            .op(OpKind::Cond, &[yes, missing], Options::new().with("pred", pred))
            .unwrap();
        let out = evaluate(&mut g, choose, &mut ExecutionContext::new()).unwrap();
        assert_eq!(out, Output::Value(Value::Int(1)));

        let mixed = g.constant("mixed", vec![true, false]).unwrap();
        let other = g
            .op(OpKind::Cond, &[yes, missing], Options::new().with("pred", mixed))
            .unwrap();
        let err = evaluate(&mut g, other, &mut ExecutionContext::new()).unwrap_err();
        assert!(matches!(err.root_cause(), EvalError::MissingPlaceholder(_)));
    }

    #[test]
    fn test_print_returns_operand() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut g = Graph::new();
        let x = g.constant("x", 4).unwrap();
        let sq = g.op(OpKind::Square, &[x], Options::new()).unwrap();
        let p = g
            .op(OpKind::Print, &[sq], Options::new().with("message", "sq: "))
            .unwrap();
        let twice = g.op(OpKind::Add, &[p, p], Options::new()).unwrap();
        let out = evaluate(&mut g, twice, &mut ExecutionContext::new()).unwrap();
        assert_eq!(out, Output::Value(Value::Int(32)));
    }

    #[test]
    fn test_flow_group_order() {
        let mut g = Graph::new();
        let v = g.variable("v", DType::Int32, Some(Value::Int(0))).unwrap();
        let one = g.constant("one", 1).unwrap();
        let first = g.op(OpKind::AssignAdd, &[v, one], Options::new()).unwrap();
        let second = g.op(OpKind::AssignAdd, &[v, one], Options::new()).unwrap();
        let group = g
            .op(OpKind::FlowGroup, &[], Options::new().with("values", vec![first, second, v]))
            .unwrap();
        let out = evaluate(&mut g, group, &mut ExecutionContext::new()).unwrap();
        assert_eq!(
            out,
            Output::List(vec![
                Output::Value(Value::Int(1)),
                Output::Value(Value::Int(2)),
                Output::Value(Value::Int(2)),
            ])
        );
    }

    #[test]
    fn test_assign_defers_on_retained_operand() {
        let mut g = Graph::new();
        let v = g.variable("v", DType::Int32, Some(Value::Int(0))).unwrap();
        let x = g.constant("x", 2).unwrap();
        let one = g.constant("one", 1).unwrap();
        let rhs = g.op(OpKind::Add, &[x, one], Options::new()).unwrap();
        let inc = g.op(OpKind::AssignAdd, &[v, rhs], Options::new()).unwrap();

        let mut ctx = ExecutionContext::new().with_retained(x);
        let out = evaluate(&mut g, inc, &mut ctx).unwrap();
        let deferred = out.as_node().unwrap();
        assert_eq!(g.node(deferred).unwrap().name(), "assign_add_deferred");
        assert_eq!(g.node(v).unwrap().value(), Some(&Value::Int(0)));

        let out = evaluate(&mut g, deferred, &mut ExecutionContext::new()).unwrap();
        assert_eq!(out, Output::Value(Value::Int(3)));
        assert_eq!(g.node(v).unwrap().value(), Some(&Value::Int(3)));
    }

    #[test]
    fn test_cond_defers_on_retained_pred() {
        let mut g = Graph::new();
        let flag = g.constant("flag", true).unwrap();
        let pred = g.op(OpKind::Identity, &[flag], Options::new()).unwrap();
        let yes = g.constant("yes", 1).unwrap();
        let no = g.constant("no", 2).unwrap();
        let choose = g
            .op(OpKind::Cond, &[yes, no], Options::new().with("pred", pred))
            .unwrap();

        let mut ctx = ExecutionContext::new().with_retained(flag);
        let out = evaluate(&mut g, choose, &mut ctx).unwrap();
        let deferred = out.as_node().unwrap();
        assert_eq!(g.node(deferred).unwrap().name(), "cond_deferred");

        let out = evaluate(&mut g, deferred, &mut ExecutionContext::new()).unwrap();
        assert_eq!(out, Output::Value(Value::Int(1)));
    }
}
