//! `tg-graph` - Lazy computation-graph evaluation.
//!
//! This crate provides:
//! - an arena `Graph` of plain tensors, operations, variables and placeholders
//! - the closed set of operation tags (`OpKind`) and their options
//! - an `Evaluator` that memoizes per run, defers operations whose operands
//!   are still symbolic, and wraps failures with the failing node's expression
//! - `ExecutionContext` for placeholder bindings and retained nodes

pub mod config;
pub mod context;
pub mod error;
pub mod eval;
pub mod graph;
pub mod node;
pub mod op;
pub mod options;

pub use config::EvalConfig;
pub use context::ExecutionContext;
pub use error::{EvalError, Result};
pub use eval::{evaluate, Evaluator, Output};
pub use graph::Graph;
pub use node::{Breakpoint, Node, NodeId, NodeKind, Operation, TensorValue};
pub use op::OpKind;
pub use options::{OptionValue, Options};
