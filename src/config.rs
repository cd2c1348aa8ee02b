//! Configuration options for affine expansion evaluation.
//!
//! This module defines how an [`AffineExpansion`](crate::AffineExpansion)
//! checks the parameter sets it is handed and how it dispatches batch
//! evaluations.

/// How strictly parameter sets are checked before a theta is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepValidation {
    /// Trust the caller. Inconsistent step counts are only caught by the
    /// debug assertion in [`ParameterSet::n_steps`](crate::ParameterSet::n_steps).
    #[default]
    Relaxed,

    /// Run [`ParameterSet::validate_steps`](crate::ParameterSet::validate_steps)
    /// on every input, at O(number of parameters) per evaluation.
    Strict,
}

/// How batch evaluations over many parameter sets are carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchMode {
    /// Forward the batch to the theta's own `evaluate_vec`.
    #[default]
    Delegate,

    /// Evaluate each element with rayon once the batch reaches the threshold.
    /// Only suitable for thetas that are safe to call concurrently.
    Parallel,
}

/// Configuration options for an affine expansion.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpansionConfig {
    /// Parameter-set validation policy. Default: Relaxed
    pub step_validation: StepValidation,

    /// Batch dispatch policy. Default: Delegate
    pub batch_mode: BatchMode,

    /// Smallest batch evaluated in parallel under `BatchMode::Parallel`. Default: 64
    pub parallel_threshold: usize,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            step_validation: StepValidation::default(),
            batch_mode: BatchMode::default(),
            parallel_threshold: 64,
        }
    }
}

impl ExpansionConfig {
    /// Default configuration with strict step validation.
    pub fn strict() -> Self {
        Self {
            step_validation: StepValidation::Strict,
            ..Self::default()
        }
    }

    /// Set the step validation policy.
    pub fn with_step_validation(mut self, step_validation: StepValidation) -> Self {
        self.step_validation = step_validation;
        self
    }

    /// Set the batch dispatch policy.
    pub fn with_batch_mode(mut self, batch_mode: BatchMode) -> Self {
        self.batch_mode = batch_mode;
        self
    }

    /// Set the minimum batch size for parallel evaluation.
    pub fn with_parallel_threshold(mut self, parallel_threshold: usize) -> Self {
        self.parallel_threshold = parallel_threshold;
        self
    }

    /// Whether a batch of `len` inputs should be split across threads.
    pub(crate) fn parallel_for(&self, len: usize) -> bool {
        self.batch_mode == BatchMode::Parallel && len >= self.parallel_threshold.max(1)
    }
}
