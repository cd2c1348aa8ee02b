use thiserror::Error;

use crate::parameters::expression::ExpressionError;

/// Error types for the rbtheta-rs library.
#[derive(Error, Debug)]
pub enum RbError {
    /// A parameter name was not present in the queried namespace.
    #[error("Parameter not found: '{name}'")]
    ParameterNotFound { name: String },

    /// A step index exceeded the stored values of an existing parameter.
    #[error("Step {step} out of range for parameter '{name}' with {len} stored step(s)")]
    StepOutOfRange {
        name: String,
        step: usize,
        len: usize,
    },

    /// Two parameter sets with different step counts were combined.
    #[error("Can only merge parameter sets with matching step counts: {lhs} != {rhs}")]
    StepCountMismatch { lhs: usize, rhs: usize },

    /// A term or output index exceeded the size of its collection.
    #[error("{what} index {index} out of range (size {len})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    /// An (output, term) pair did not address an attached output theta.
    #[error(
        "Output term ({output_index}, {q_l}) out of range: \
         expected output_index < {n_outputs} and q_l < {n_terms}"
    )]
    OutputTermOutOfRange {
        output_index: usize,
        q_l: usize,
        n_outputs: usize,
        n_terms: usize,
    },

    /// A caller supplied an unusable argument, such as an absent theta handle.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Primary parameters of one set disagree in their number of steps.
    #[error("Parameter '{name}' has {found} step(s), expected {expected}")]
    InconsistentSteps {
        name: String,
        expected: usize,
        found: usize,
    },

    /// Failure while parsing or evaluating a theta expression.
    #[error("Expression error: {0}")]
    Expression(#[from] ExpressionError),

    /// I/O error wrapper.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl RbError {
    /// Returns true for every error that reports an index past the end of a
    /// term collection, including (output, term) pairs.
    pub fn is_index_out_of_range(&self) -> bool {
        matches!(
            self,
            RbError::IndexOutOfRange { .. } | RbError::OutputTermOutOfRange { .. }
        )
    }
}

/// Result type alias for rbtheta-rs operations.
pub type Result<T> = std::result::Result<T, RbError>;
