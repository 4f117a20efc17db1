/// Evaluator settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalConfig {
    /// Upper bound on `run` steps taken by one `complete_eval` call.
    pub max_fixed_point_iterations: usize,
    /// Seed for random kernels without their own `seed` option.
    /// `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            max_fixed_point_iterations: 32,
            seed: None,
        }
    }
}

impl EvalConfig {
    pub fn with_max_fixed_point_iterations(mut self, n: usize) -> Self {
        self.max_fixed_point_iterations = n.max(1);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}
