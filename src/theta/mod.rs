//! Theta functions: the parameter-dependent weights of an affine expansion.
//!
//! A theta maps a [`ParameterSet`] to one scalar. An affine expansion stores
//! one theta per operator, right-hand-side and output term and multiplies the
//! corresponding precomputed, parameter-independent term by its value.
//!
//! Thetas are shared through [`ThetaHandle`] (`Arc<dyn Theta>`), so the same
//! instance can weight terms in several expansions or outputs and stays alive
//! for as long as any of them holds it.

use crate::error::Result;
use crate::parameters::ParameterSet;
use std::sync::Arc;

mod builtin;

pub use builtin::{ConstantTheta, ExpressionTheta, FnTheta, ParameterTheta};

/// Scalar produced by theta functions.
#[cfg(not(feature = "complex"))]
pub type Number = f64;

/// Scalar produced by theta functions.
#[cfg(feature = "complex")]
pub type Number = num_complex::Complex64;

/// A scalar-valued function of a parameter point.
///
/// Implementors must provide [`evaluate`](Theta::evaluate). The batch form
/// [`evaluate_vec`](Theta::evaluate_vec) may be overridden when a theta can do
/// better than one call per input, but its result must equal mapping
/// `evaluate` over the inputs, element for element and in order.
///
/// Thetas may keep internal state (a cache, a counter) behind interior
/// mutability. The `Send + Sync` bound lets an expansion evaluate them from a
/// rayon pool; whether concurrent calls on one instance are meaningful is up
/// to the implementation.
pub trait Theta: Send + Sync {
    /// Evaluate the theta at a single parameter point.
    fn evaluate(&self, mu: &ParameterSet) -> Result<Number>;

    /// Evaluate the theta at each of `mus`, returning one value per input.
    fn evaluate_vec(&self, mus: &[ParameterSet]) -> Result<Vec<Number>> {
        mus.iter().map(|mu| self.evaluate(mu)).collect()
    }
}

/// Shared handle to a theta function.
pub type ThetaHandle = Arc<dyn Theta>;

/// Wrap a concrete theta into a shareable [`ThetaHandle`].
///
/// # Examples
///
/// ```
/// use rbtheta_rs::theta::{self, ConstantTheta, Number, Theta};
/// use rbtheta_rs::ParameterSet;
///
/// let one = theta::handle(ConstantTheta::default());
/// assert_eq!(one.evaluate(&ParameterSet::new()).unwrap(), Number::from(1.0));
/// ```
pub fn handle<T: Theta + 'static>(theta: T) -> ThetaHandle {
    Arc::new(theta)
}
