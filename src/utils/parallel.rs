//! Batch evaluation of theta functions, sequential or with rayon.
//!
//! Both entry points keep result `i` tied to input `i`; the parallel path only
//! changes which thread produces each element.

use ndarray::Array1;
use rayon::prelude::*;

use crate::config::ExpansionConfig;
use crate::error::{RbError, Result};
use crate::parameters::ParameterSet;
use crate::theta::{Number, Theta, ThetaHandle};

/// Evaluate one theta at every parameter set in `mus`.
///
/// Below the configured threshold, or in [`BatchMode::Delegate`](crate::config::BatchMode),
/// the whole batch goes to the theta's own `evaluate_vec`. Otherwise each
/// element is evaluated with `evaluate` on the rayon pool.
///
/// # Arguments
///
/// * `theta` - The theta to evaluate
/// * `mus` - The parameter points, in order
/// * `config` - Dispatch policy
///
/// # Returns
///
/// * `Result<Vec<Number>>` - One value per input; the first error aborts the batch.
///   A delegated `evaluate_vec` that returns the wrong number of values is
///   reported as [`RbError::InvalidArgument`].
pub fn evaluate_batch(
    theta: &dyn Theta,
    mus: &[ParameterSet],
    config: &ExpansionConfig,
) -> Result<Vec<Number>> {
    if !config.parallel_for(mus.len()) {
        let values = theta.evaluate_vec(mus)?;
        if values.len() != mus.len() {
            return Err(RbError::InvalidArgument(format!(
                "theta batch evaluation returned {} values for {} parameter sets",
                values.len(),
                mus.len()
            )));
        }
        return Ok(values);
    }

    log::debug!("evaluating theta over {} parameter sets in parallel", mus.len());
    mus.par_iter().map(|mu| theta.evaluate(mu)).collect()
}

/// Evaluate every theta in `thetas` at the same parameter set.
///
/// Produces the weight vector of one affine sum, in term order.
pub fn evaluate_terms(
    thetas: &[ThetaHandle],
    mu: &ParameterSet,
    config: &ExpansionConfig,
) -> Result<Array1<Number>> {
    let weights: Result<Vec<Number>> = if config.parallel_for(thetas.len()) {
        log::debug!("evaluating {} theta terms in parallel", thetas.len());
        thetas.par_iter().map(|theta| theta.evaluate(mu)).collect()
    } else {
        thetas.iter().map(|theta| theta.evaluate(mu)).collect()
    };

    Ok(Array1::from_vec(weights?))
}
