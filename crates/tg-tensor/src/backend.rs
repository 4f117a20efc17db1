use std::fmt::Debug;

use crate::error::Result;

/// Trait for pluggable compute backends.
///
/// Data is passed in as contiguous row-major slices and returned as owned
/// vectors. Nested-array bookkeeping stays with the caller; a backend only
/// ever sees dense buffers.
pub trait ComputeBackend: Send + Sync + Debug {
    /// Returns the name of this backend (e.g., "cpu").
    fn name(&self) -> &str;

    /// Matrix multiplication: C = A @ B.
    ///
    /// - `a`: row-major data of shape [m, k]
    /// - `b`: row-major data of shape [k, n]
    /// - Returns: row-major data of shape [m, n]
    fn matmul(&self, a: &[f64], b: &[f64], m: usize, k: usize, n: usize) -> Result<Vec<f64>>;

    /// Integer matrix multiplication with wrapping `i64` accumulation.
    fn matmul_i64(
        &self,
        a: &[i64],
        b: &[i64],
        m: usize,
        k: usize,
        n: usize,
    ) -> Result<Vec<i64>>;
}
