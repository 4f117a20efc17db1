pub mod matmul;

use crate::backend::ComputeBackend;
use crate::error::{Result, TensorError};

/// Reference backend: plain loops over dense buffers.
#[derive(Debug, Clone)]
pub struct CpuBackend;

impl CpuBackend {
    pub fn new() -> Self {
        CpuBackend
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeBackend for CpuBackend {
    fn name(&self) -> &str {
        "cpu"
    }

    fn matmul(&self, a: &[f64], b: &[f64], m: usize, k: usize, n: usize) -> Result<Vec<f64>> {
        check_len("a", a, m, k)?;
        check_len("b", b, k, n)?;
        Ok(matmul::naive(a, b, m, k, n))
    }

    fn matmul_i64(
        &self,
        a: &[i64],
        b: &[i64],
        m: usize,
        k: usize,
        n: usize,
    ) -> Result<Vec<i64>> {
        check_len("a", a, m, k)?;
        check_len("b", b, k, n)?;
        Ok(matmul::naive_i64(a, b, m, k, n))
    }
}

fn check_len<T>(operand: &str, buf: &[T], rows: usize, cols: usize) -> Result<()> {
    if buf.len() == rows * cols {
        return Ok(());
    }
    Err(TensorError::Other(format!(
        "matmul: {} holds {} elements, expected {}x{}",
        operand,
        buf.len(),
        rows,
        cols
    )))
}
