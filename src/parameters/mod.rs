//! # Parameter System
//!
//! This module provides the parameter point at which an affine expansion is
//! evaluated, together with the small expression language used to write theta
//! functions as text.
//!
//! ## Core Components
//!
//! - [`ParameterSet`]: named parameters, each holding one value per step, plus
//!   a disjoint namespace of extra parameters
//! - [`StepContext`]: a parameter set viewed at a single step
//! - [`Expression`]: parse and evaluate arithmetic over parameter names
//!
//! ## Example Usage
//!
//! ```rust
//! use rbtheta_rs::parameters::{Expression, ParameterSet};
//!
//! let mut mu = ParameterSet::new();
//! mu.set_step_value("k", 0, 3.5);
//! mu.set_step_value("k", 1, 4.0);
//! mu.set_extra_value("error_bound", 1e-3);
//!
//! assert_eq!(mu.n_steps(), 2);
//! assert_eq!(mu.get_value("k").unwrap(), 3.5);
//!
//! let expr = Expression::parse("2 * k").unwrap();
//! assert_eq!(expr.evaluate(&mu.at_step(1)).unwrap(), 8.0);
//! ```

pub mod expression;
pub mod parameter_set;


pub use expression::{EvaluationContext, Expression, ExpressionError};
pub use parameter_set::{Iter, ParameterSet, StepContext, DEFAULT_PRECISION};
