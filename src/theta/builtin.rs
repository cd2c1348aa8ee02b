//! Built-in theta implementations.

use super::{Number, Theta};
use crate::error::Result;
use crate::parameters::{Expression, ParameterSet};
use std::fmt;

/// A theta that ignores the parameter point and returns a fixed value.
///
/// The default value is 1, the weight of a term that does not depend on the
/// parameters at all.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantTheta {
    value: Number,
}

impl ConstantTheta {
    pub fn new(value: Number) -> Self {
        Self { value }
    }

    pub fn value(&self) -> Number {
        self.value
    }
}

impl Default for ConstantTheta {
    fn default() -> Self {
        Self::new(Number::from(1.0))
    }
}

impl Theta for ConstantTheta {
    fn evaluate(&self, _mu: &ParameterSet) -> Result<Number> {
        Ok(self.value)
    }

    fn evaluate_vec(&self, mus: &[ParameterSet]) -> Result<Vec<Number>> {
        Ok(vec![self.value; mus.len()])
    }
}

/// A theta equal to one named parameter at a fixed step.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterTheta {
    name: String,
    step: usize,
}

impl ParameterTheta {
    /// Read `name` at step 0.
    pub fn new(name: &str) -> Self {
        Self::at_step(name, 0)
    }

    /// Read `name` at `step`.
    pub fn at_step(name: &str, step: usize) -> Self {
        Self {
            name: name.to_string(),
            step,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Theta for ParameterTheta {
    fn evaluate(&self, mu: &ParameterSet) -> Result<Number> {
        Ok(Number::from(mu.get_step_value(&self.name, self.step)?))
    }
}

/// A theta backed by a closure.
///
/// # Examples
///
/// ```
/// use rbtheta_rs::theta::{FnTheta, Number, Theta};
/// use rbtheta_rs::ParameterSet;
///
/// let diffusion = FnTheta::new("diffusion", |mu: &ParameterSet| {
///     Ok(Number::from(1.0 / mu.get_value("Re")?))
/// });
///
/// let mu = ParameterSet::from_values([("Re", 100.0)]);
/// assert_eq!(diffusion.evaluate(&mu).unwrap(), Number::from(0.01));
/// ```
pub struct FnTheta {
    label: String,
    func: Box<dyn Fn(&ParameterSet) -> Result<Number> + Send + Sync>,
}

impl FnTheta {
    /// Create a theta from a label, used in logs and `Debug`, and a closure.
    pub fn new<F>(label: &str, func: F) -> Self
    where
        F: Fn(&ParameterSet) -> Result<Number> + Send + Sync + 'static,
    {
        Self {
            label: label.to_string(),
            func: Box::new(func),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Debug for FnTheta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTheta")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl Theta for FnTheta {
    fn evaluate(&self, mu: &ParameterSet) -> Result<Number> {
        (self.func)(mu)
    }
}

/// A theta written as an arithmetic expression over parameter names.
///
/// Variables resolve against the primary parameters at a fixed step (0 unless
/// set with [`at_step`](ExpressionTheta::at_step)). Extra parameters are not
/// visible.
///
/// # Examples
///
/// ```
/// use rbtheta_rs::theta::{ExpressionTheta, Number, Theta};
/// use rbtheta_rs::ParameterSet;
///
/// let theta = ExpressionTheta::parse("k^2 + 1").unwrap();
/// let mu = ParameterSet::from_values([("k", 2.0)]);
/// assert_eq!(theta.evaluate(&mu).unwrap(), Number::from(5.0));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionTheta {
    source: String,
    expr: Expression,
    step: usize,
}

impl ExpressionTheta {
    /// Parse `source` into a theta evaluated at step 0.
    pub fn parse(source: &str) -> Result<Self> {
        Ok(Self {
            source: source.to_string(),
            expr: Expression::parse(source)?,
            step: 0,
        })
    }

    /// Evaluate at `step` instead of step 0.
    pub fn at_step(mut self, step: usize) -> Self {
        self.step = step;
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Parameter names the expression refers to.
    pub fn variables(&self) -> Vec<String> {
        self.expr.variables()
    }

    /// Evaluate the expression once per step of `mu`.
    pub fn evaluate_steps(&self, mu: &ParameterSet) -> Result<Vec<Number>> {
        (0..mu.n_steps())
            .map(|step| Ok(Number::from(self.expr.evaluate(&mu.at_step(step))?)))
            .collect()
    }
}

impl Theta for ExpressionTheta {
    fn evaluate(&self, mu: &ParameterSet) -> Result<Number> {
        let value = self.expr.evaluate(&mu.at_step(self.step))?;
        Ok(Number::from(value))
    }
}
