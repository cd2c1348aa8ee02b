//! # rbtheta-rs
//!
//! `rbtheta-rs` provides the parameter bookkeeping and affine-expansion layer
//! of a certified reduced-basis solver.
//!
//! The library provides:
//! - [`ParameterSet`], named parameters with one value per time step, plus a
//!   separate namespace of "extra" parameters that do not define the point
//! - The [`Theta`] trait for parameter-dependent scalar weights, with constant,
//!   single-parameter, closure and expression-based implementations
//! - [`AffineExpansion`], which holds the operator, right-hand-side and ragged
//!   output thetas and evaluates them singly, in batches or as weight vectors
//!
//! ## Basic Usage
//!
//! ```
//! use rbtheta_rs::theta::{self, ConstantTheta, ExpressionTheta, Number};
//! use rbtheta_rs::{AffineExpansion, ParameterSet};
//!
//! let mut expansion = AffineExpansion::new();
//! expansion.attach_operator_theta(theta::handle(ConstantTheta::default())).unwrap();
//! expansion
//!     .attach_operator_theta(theta::handle(ExpressionTheta::parse("1 / Re").unwrap()))
//!     .unwrap();
//! expansion.attach_rhs_theta(theta::handle(ConstantTheta::default())).unwrap();
//!
//! let mu = ParameterSet::from_values([("Re", 50.0)]);
//! let weights = expansion.operator_weights(&mu).unwrap();
//! assert_eq!(weights.len(), expansion.n_operator_terms());
//! assert_eq!(weights[1], Number::from(0.02));
//! ```

// Public modules
pub mod config;
pub mod error;
pub mod expansion;

// Parameter system
pub mod parameters;

// Theta functions
pub mod theta;

pub mod utils;

// Re-exports for convenience
pub use config::{BatchMode, ExpansionConfig, StepValidation};
pub use error::{RbError, Result};
pub use expansion::AffineExpansion;
pub use parameters::ParameterSet;
pub use theta::{Number, Theta, ThetaHandle};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
