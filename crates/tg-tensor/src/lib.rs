//! `tg-tensor` - Value-level numerics for tensor-graph.
//!
//! This crate provides:
//! - `Value`, a scalar or nested array, with `DType` and static `Shape`
//! - dtype casting
//! - broadcasting combinators and scalar operators
//! - axis reductions restricted to axes 0 and 1
//! - layout kernels (reshape, slice, concat, pad, transpose, eye, index)
//! - a dense `Tensor` view and a pluggable `ComputeBackend` for matrix products

pub mod backend;
pub mod broadcast;
pub mod cast;
pub mod cpu;
pub mod dtype;
pub mod error;
pub mod layout;
pub mod reduce;
pub mod scalar;
pub mod shape;
pub mod tensor;
pub mod value;

// Re-export primary types at the crate root for convenience.
pub use backend::ComputeBackend;
pub use cpu::CpuBackend;
pub use dtype::DType;
pub use error::{Result, TensorError};
pub use reduce::Reduction;
pub use scalar::{BinaryOp, UnaryOp};
pub use shape::Shape;
pub use tensor::Tensor;
pub use value::Value;
