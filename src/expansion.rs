//! Affine expansions of parametrized operators, right-hand sides and outputs.
//!
//! A parametrized operator is written as `A(mu) = sum_q theta_q(mu) A_q`, and
//! likewise for the right-hand side `F(mu)` and for each scalar output
//! `l_n(mu)`. The parameter-independent pieces `A_q`, `F_q` and `l_{n,q}` are
//! assembled once elsewhere. [`AffineExpansion`] holds the matching theta
//! functions and evaluates them, so an assembly stage can size its storage
//! from the term counts and combine the precomputed terms with the returned
//! weights.
//!
//! Outputs are ragged: each has its own term count. Output terms are also
//! addressable through a flat index, the running sum of all earlier outputs'
//! term counts plus the local term index. Appending outputs never changes the
//! flat index of an existing term.

use ndarray::Array1;
use std::fmt;

use crate::config::{ExpansionConfig, StepValidation};
use crate::error::{RbError, Result};
use crate::parameters::ParameterSet;
use crate::theta::{Number, ThetaHandle};
use crate::utils::parallel::{evaluate_batch, evaluate_terms};

/// Theta functions for the operator, right-hand-side and output affine sums.
///
/// Terms can be attached at any time, including after evaluations have
/// happened; there is no finalisation step. Evaluation never mutates the
/// expansion. It holds no locks, so concurrent use is exactly as safe as the
/// attached thetas are.
///
/// # Examples
///
/// ```
/// use rbtheta_rs::theta::{self, ConstantTheta, Number, ParameterTheta};
/// use rbtheta_rs::{AffineExpansion, ParameterSet};
///
/// let mut expansion = AffineExpansion::new();
/// expansion.attach_operator_theta(theta::handle(ParameterTheta::new("k"))).unwrap();
/// expansion.attach_operator_theta(theta::handle(ConstantTheta::default())).unwrap();
///
/// let mut mu = ParameterSet::new();
/// mu.set_step_value("k", 0, 3.5);
///
/// assert_eq!(expansion.n_operator_terms(), 2);
/// assert_eq!(expansion.eval_operator_theta(0, &mu).unwrap(), Number::from(3.5));
/// assert_eq!(expansion.eval_operator_theta(1, &mu).unwrap(), Number::from(1.0));
/// ```
#[derive(Clone)]
pub struct AffineExpansion {
    /// Operator ("A") terms
    a_terms: Vec<ThetaHandle>,

    /// Right-hand-side ("F") terms
    f_terms: Vec<ThetaHandle>,

    /// One term list per output
    outputs: Vec<Vec<ThetaHandle>>,

    /// Flat index of each output's first term; one trailing entry holds the total
    output_offsets: Vec<usize>,

    config: ExpansionConfig,
}

impl AffineExpansion {
    /// Create an empty expansion with the default configuration.
    pub fn new() -> Self {
        Self::with_config(ExpansionConfig::default())
    }

    /// Create an empty expansion with the given configuration.
    pub fn with_config(config: ExpansionConfig) -> Self {
        Self {
            a_terms: Vec::new(),
            f_terms: Vec::new(),
            outputs: Vec::new(),
            output_offsets: vec![0],
            config,
        }
    }

    pub fn config(&self) -> &ExpansionConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: ExpansionConfig) {
        self.config = config;
    }

    /// Append one operator theta.
    ///
    /// # Errors
    ///
    /// [`RbError::InvalidArgument`] if `theta` is `None`.
    pub fn attach_operator_theta(&mut self, theta: impl Into<Option<ThetaHandle>>) -> Result<()> {
        let theta = require(theta.into(), "operator", 0)?;
        self.a_terms.push(theta);
        log::debug!("attached operator theta {}", self.a_terms.len() - 1);
        Ok(())
    }

    /// Append several operator thetas, in order.
    ///
    /// Either all of them are attached or, if any is `None`, none is.
    pub fn attach_operator_thetas<I>(&mut self, thetas: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<Option<ThetaHandle>>,
    {
        let thetas = require_all(thetas, "operator")?;
        log::debug!(
            "attaching {} operator thetas after {} existing",
            thetas.len(),
            self.a_terms.len()
        );
        self.a_terms.extend(thetas);
        Ok(())
    }

    /// Append one right-hand-side theta.
    pub fn attach_rhs_theta(&mut self, theta: impl Into<Option<ThetaHandle>>) -> Result<()> {
        let theta = require(theta.into(), "rhs", 0)?;
        self.f_terms.push(theta);
        log::debug!("attached rhs theta {}", self.f_terms.len() - 1);
        Ok(())
    }

    /// Append several right-hand-side thetas, in order, all or nothing.
    pub fn attach_rhs_thetas<I>(&mut self, thetas: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<Option<ThetaHandle>>,
    {
        let thetas = require_all(thetas, "rhs")?;
        log::debug!(
            "attaching {} rhs thetas after {} existing",
            thetas.len(),
            self.f_terms.len()
        );
        self.f_terms.extend(thetas);
        Ok(())
    }

    /// Append a new output made of a single term.
    pub fn attach_output_theta(&mut self, theta: impl Into<Option<ThetaHandle>>) -> Result<()> {
        let theta = require(theta.into(), "output", 0)?;
        self.push_output(vec![theta]);
        Ok(())
    }

    /// Append a new output made of the given terms, in order.
    ///
    /// An empty sequence adds an output with no terms. If any element is
    /// `None` no output is added.
    pub fn attach_output_thetas<I>(&mut self, thetas: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<Option<ThetaHandle>>,
    {
        let thetas = require_all(thetas, "output")?;
        self.push_output(thetas);
        Ok(())
    }

    fn push_output(&mut self, thetas: Vec<ThetaHandle>) {
        let offset = self.total_output_terms();
        log::debug!(
            "attached output {} with {} term(s) at flat offset {}",
            self.outputs.len(),
            thetas.len(),
            offset
        );
        self.output_offsets.push(offset + thetas.len());
        self.outputs.push(thetas);
    }

    pub fn n_operator_terms(&self) -> usize {
        self.a_terms.len()
    }

    pub fn n_rhs_terms(&self) -> usize {
        self.f_terms.len()
    }

    pub fn n_outputs(&self) -> usize {
        self.outputs.len()
    }

    /// Number of terms of one output.
    ///
    /// # Errors
    ///
    /// [`RbError::IndexOutOfRange`] if `output_index >= n_outputs()`.
    pub fn n_output_terms(&self, output_index: usize) -> Result<usize> {
        self.outputs
            .get(output_index)
            .map(Vec::len)
            .ok_or(RbError::IndexOutOfRange {
                what: "output",
                index: output_index,
                len: self.outputs.len(),
            })
    }

    /// Sum of the term counts of all outputs.
    pub fn total_output_terms(&self) -> usize {
        self.output_offsets.last().copied().unwrap_or(0)
    }

    /// Flat index of term `q_l` of output `output_index`.
    ///
    /// `q_l` is not checked against the output's term count; only
    /// [`eval_output_theta`](Self::eval_output_theta) enforces that bound.
    ///
    /// # Errors
    ///
    /// [`RbError::IndexOutOfRange`] if `output_index >= n_outputs()`, or if
    /// the flat index would not fit in a `usize`.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtheta_rs::theta::{self, ConstantTheta, ThetaHandle};
    /// use rbtheta_rs::AffineExpansion;
    ///
    /// let one = || theta::handle(ConstantTheta::default());
    /// let mut expansion = AffineExpansion::new();
    /// expansion.attach_output_thetas([one(), one()]).unwrap();
    /// expansion.attach_output_thetas(Vec::<ThetaHandle>::new()).unwrap();
    /// expansion.attach_output_thetas([one(), one(), one()]).unwrap();
    ///
    /// assert_eq!(expansion.flatten_output_index(0, 1).unwrap(), 1);
    /// assert_eq!(expansion.flatten_output_index(2, 0).unwrap(), 2);
    /// assert_eq!(expansion.flatten_output_index(2, 2).unwrap(), 4);
    /// assert_eq!(expansion.total_output_terms(), 5);
    /// ```
    pub fn flatten_output_index(&self, output_index: usize, q_l: usize) -> Result<usize> {
        if output_index >= self.outputs.len() {
            return Err(RbError::IndexOutOfRange {
                what: "output",
                index: output_index,
                len: self.outputs.len(),
            });
        }
        self.output_offsets[output_index]
            .checked_add(q_l)
            .ok_or(RbError::IndexOutOfRange {
                what: "output term",
                index: q_l,
                len: self.total_output_terms(),
            })
    }

    /// Evaluate operator theta `q` at `mu`.
    ///
    /// # Errors
    ///
    /// [`RbError::IndexOutOfRange`] if `q >= n_operator_terms()`, plus any
    /// error raised by the theta itself or by strict step validation.
    pub fn eval_operator_theta(&self, q: usize, mu: &ParameterSet) -> Result<Number> {
        let theta = term(&self.a_terms, q, "operator")?;
        self.check(mu)?;
        log::trace!("evaluating operator theta {}", q);
        theta.evaluate(mu)
    }

    /// Evaluate operator theta `q` at each of `mus`, in order.
    pub fn eval_operator_theta_vec(&self, q: usize, mus: &[ParameterSet]) -> Result<Vec<Number>> {
        let theta = term(&self.a_terms, q, "operator")?;
        self.check_all(mus)?;
        log::trace!("evaluating operator theta {} over {} points", q, mus.len());
        evaluate_batch(theta.as_ref(), mus, &self.config)
    }

    /// Evaluate right-hand-side theta `q` at `mu`.
    pub fn eval_rhs_theta(&self, q: usize, mu: &ParameterSet) -> Result<Number> {
        let theta = term(&self.f_terms, q, "rhs")?;
        self.check(mu)?;
        log::trace!("evaluating rhs theta {}", q);
        theta.evaluate(mu)
    }

    /// Evaluate right-hand-side theta `q` at each of `mus`, in order.
    pub fn eval_rhs_theta_vec(&self, q: usize, mus: &[ParameterSet]) -> Result<Vec<Number>> {
        let theta = term(&self.f_terms, q, "rhs")?;
        self.check_all(mus)?;
        log::trace!("evaluating rhs theta {} over {} points", q, mus.len());
        evaluate_batch(theta.as_ref(), mus, &self.config)
    }

    /// Evaluate term `q_l` of output `output_index` at `mu`.
    ///
    /// # Errors
    ///
    /// [`RbError::OutputTermOutOfRange`] if the output does not exist or has
    /// no term `q_l`.
    pub fn eval_output_theta(
        &self,
        output_index: usize,
        q_l: usize,
        mu: &ParameterSet,
    ) -> Result<Number> {
        let theta = self.output_term(output_index, q_l)?;
        self.check(mu)?;
        log::trace!("evaluating output theta ({}, {})", output_index, q_l);
        theta.evaluate(mu)
    }

    /// Evaluate term `q_l` of output `output_index` at each of `mus`, in order.
    pub fn eval_output_theta_vec(
        &self,
        output_index: usize,
        q_l: usize,
        mus: &[ParameterSet],
    ) -> Result<Vec<Number>> {
        let theta = self.output_term(output_index, q_l)?;
        self.check_all(mus)?;
        log::trace!(
            "evaluating output theta ({}, {}) over {} points",
            output_index,
            q_l,
            mus.len()
        );
        evaluate_batch(theta.as_ref(), mus, &self.config)
    }

    /// All operator thetas at `mu`, in term order.
    pub fn operator_weights(&self, mu: &ParameterSet) -> Result<Array1<Number>> {
        self.check(mu)?;
        evaluate_terms(&self.a_terms, mu, &self.config)
    }

    /// All right-hand-side thetas at `mu`, in term order.
    pub fn rhs_weights(&self, mu: &ParameterSet) -> Result<Array1<Number>> {
        self.check(mu)?;
        evaluate_terms(&self.f_terms, mu, &self.config)
    }

    /// All thetas of one output at `mu`, in term order.
    pub fn output_weights(&self, output_index: usize, mu: &ParameterSet) -> Result<Array1<Number>> {
        let terms = self
            .outputs
            .get(output_index)
            .ok_or(RbError::IndexOutOfRange {
                what: "output",
                index: output_index,
                len: self.outputs.len(),
            })?;
        self.check(mu)?;
        evaluate_terms(terms, mu, &self.config)
    }

    /// Every output theta at `mu`, in flat index order.
    ///
    /// Element `flatten_output_index(n, q_l)` holds output `n`, term `q_l`.
    pub fn flat_output_weights(&self, mu: &ParameterSet) -> Result<Array1<Number>> {
        self.check(mu)?;
        let flat: Vec<ThetaHandle> = self.outputs.iter().flatten().cloned().collect();
        evaluate_terms(&flat, mu, &self.config)
    }

    fn output_term(&self, output_index: usize, q_l: usize) -> Result<&ThetaHandle> {
        let terms = self.outputs.get(output_index);
        terms
            .and_then(|terms| terms.get(q_l))
            .ok_or_else(|| RbError::OutputTermOutOfRange {
                output_index,
                q_l,
                n_outputs: self.outputs.len(),
                n_terms: terms.map_or(0, Vec::len),
            })
    }

    fn check(&self, mu: &ParameterSet) -> Result<()> {
        if self.config.step_validation == StepValidation::Strict {
            if let Err(err) = mu.validate_steps() {
                log::warn!("rejecting parameter set: {}", err);
                return Err(err);
            }
        }
        Ok(())
    }

    fn check_all(&self, mus: &[ParameterSet]) -> Result<()> {
        mus.iter().try_for_each(|mu| self.check(mu))
    }
}

fn term<'a>(terms: &'a [ThetaHandle], q: usize, what: &'static str) -> Result<&'a ThetaHandle> {
    terms.get(q).ok_or(RbError::IndexOutOfRange {
        what,
        index: q,
        len: terms.len(),
    })
}

fn require(theta: Option<ThetaHandle>, what: &str, position: usize) -> Result<ThetaHandle> {
    theta.ok_or_else(|| {
        RbError::InvalidArgument(format!("{} theta at position {} is absent", what, position))
    })
}

fn require_all<I>(thetas: I, what: &str) -> Result<Vec<ThetaHandle>>
where
    I: IntoIterator,
    I::Item: Into<Option<ThetaHandle>>,
{
    thetas
        .into_iter()
        .enumerate()
        .map(|(position, theta)| require(theta.into(), what, position))
        .collect()
}

impl Default for AffineExpansion {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AffineExpansion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let output_terms: Vec<usize> = self.outputs.iter().map(Vec::len).collect();
        f.debug_struct("AffineExpansion")
            .field("n_operator_terms", &self.a_terms.len())
            .field("n_rhs_terms", &self.f_terms.len())
            .field("output_terms", &output_terms)
            .field("config", &self.config)
            .finish()
    }
}
