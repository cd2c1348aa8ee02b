//! Multi-step parameter sets
//!
//! This module provides the [`ParameterSet`] struct, the parameter point `mu` at
//! which every theta function is evaluated. Each named parameter stores a
//! sequence of values indexed by step, so the same type covers both static
//! parametrizations (one step) and time- or stage-dependent ones (many steps).
//! A second, disjoint namespace of "extra" parameters carries auxiliary values
//! (error indicators, bookkeeping) that travel with the point but take no part
//! in step-count validation or in theta evaluation.

use crate::error::{RbError, Result};
use crate::parameters::expression::{EvaluationContext, ExpressionError};
use serde::{Deserialize, Serialize};
use std::collections::{btree_map, BTreeMap, BTreeSet};
use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::ops::AddAssign;
use std::path::Path;

/// Number of fractional mantissa digits used by [`ParameterSet::print`] and `Display`.
pub const DEFAULT_PRECISION: usize = 6;

type StepMap = BTreeMap<String, Vec<f64>>;

fn default_n_steps() -> usize {
    1
}

/// A named, multi-step parameter point
///
/// Both namespaces are kept in canonical (lexicographic) key order, so
/// iteration, name listings and the text dump are independent of the order in
/// which parameters were inserted.
///
/// All primary parameters are expected to hold the same number of steps. This
/// is not enforced on mutation; [`n_steps`](Self::n_steps) asserts it in debug
/// builds and [`validate_steps`](Self::validate_steps) checks it on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterSet {
    /// Primary parameters: name to per-step values
    parameters: StepMap,

    /// Auxiliary parameters with no step-count invariant
    #[serde(default)]
    extra_parameters: StepMap,

    /// Declared step count, only reported while `parameters` is empty
    #[serde(default = "default_n_steps")]
    n_steps: usize,
}

impl ParameterSet {
    /// Create a new empty parameter set with a single step
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtheta_rs::parameters::ParameterSet;
    ///
    /// let mu = ParameterSet::new();
    /// assert_eq!(mu.n_parameters(), 0);
    /// assert_eq!(mu.n_steps(), 1);
    /// ```
    pub fn new() -> Self {
        Self {
            parameters: StepMap::new(),
            extra_parameters: StepMap::new(),
            n_steps: 1,
        }
    }

    /// Create a single-step parameter set from flat name/value pairs
    ///
    /// Each value becomes a one-element step sequence.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtheta_rs::parameters::ParameterSet;
    /// use std::collections::HashMap;
    ///
    /// let mut flat = HashMap::new();
    /// flat.insert("k".to_string(), 3.5);
    /// flat.insert("nu".to_string(), 0.1);
    ///
    /// let mu = ParameterSet::from_values(flat);
    /// assert_eq!(mu.get_value("k").unwrap(), 3.5);
    /// assert_eq!(mu.n_steps(), 1);
    /// ```
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut set = Self::new();
        for (name, value) in values {
            set.parameters.insert(name.into(), vec![value]);
        }
        set
    }

    /// Remove all primary and extra parameters and reset the step count to 1
    pub fn clear(&mut self) {
        self.n_steps = 1;
        self.parameters.clear();
        self.extra_parameters.clear();
    }

    /// Check whether a primary parameter exists
    pub fn has_value(&self, name: &str) -> bool {
        self.parameters.contains_key(name)
    }

    /// Check whether an extra parameter exists
    pub fn has_extra_value(&self, name: &str) -> bool {
        self.extra_parameters.contains_key(name)
    }

    /// Get the step-0 value of a primary parameter
    ///
    /// # Errors
    ///
    /// [`RbError::ParameterNotFound`] if `name` is absent, and
    /// [`RbError::StepOutOfRange`] if its step sequence is empty.
    pub fn get_value(&self, name: &str) -> Result<f64> {
        self.get_step_value(name, 0)
    }

    /// Get the step-0 value of a primary parameter, or `default` if it is unavailable
    pub fn get_value_or(&self, name: &str, default: f64) -> f64 {
        self.get_step_value_or(name, 0, default)
    }

    /// Get the value of a primary parameter at `step`
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtheta_rs::parameters::ParameterSet;
    ///
    /// let mut mu = ParameterSet::new();
    /// mu.push_back_value("t", 0.0);
    /// mu.push_back_value("t", 0.5);
    ///
    /// assert_eq!(mu.get_step_value("t", 1).unwrap(), 0.5);
    /// assert!(mu.get_step_value("t", 2).is_err());
    /// assert!(mu.get_step_value("missing", 0).is_err());
    /// ```
    pub fn get_step_value(&self, name: &str, step: usize) -> Result<f64> {
        lookup_step(&self.parameters, name, step)
    }

    /// Get the value of a primary parameter at `step`, or `default` if either
    /// the name or the step is missing
    pub fn get_step_value_or(&self, name: &str, step: usize, default: f64) -> f64 {
        lookup_step_or(&self.parameters, name, step, default)
    }

    /// Get the step-0 value of an extra parameter
    pub fn get_extra_value(&self, name: &str) -> Result<f64> {
        self.get_extra_step_value(name, 0)
    }

    /// Get the step-0 value of an extra parameter, or `default` if it is unavailable
    pub fn get_extra_value_or(&self, name: &str, default: f64) -> f64 {
        self.get_extra_step_value_or(name, 0, default)
    }

    /// Get the value of an extra parameter at `step`
    pub fn get_extra_step_value(&self, name: &str, step: usize) -> Result<f64> {
        lookup_step(&self.extra_parameters, name, step)
    }

    /// Get the value of an extra parameter at `step`, or `default`
    pub fn get_extra_step_value_or(&self, name: &str, step: usize, default: f64) -> f64 {
        lookup_step_or(&self.extra_parameters, name, step, default)
    }

    /// Replace all steps of a primary parameter with the single value `value`
    ///
    /// Whatever was stored before, the parameter has exactly one step afterwards.
    pub fn set_value(&mut self, name: &str, value: f64) {
        self.parameters.insert(name.to_string(), vec![value]);
    }

    /// Write `value` at `step` of a primary parameter, growing it if needed
    ///
    /// Writing one past the end appends. Writing further out zero-fills the
    /// skipped steps so that no step is ever left undefined.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtheta_rs::parameters::ParameterSet;
    ///
    /// let mut mu = ParameterSet::new();
    /// mu.set_step_value("k", 3, 2.0);
    ///
    /// assert_eq!(mu.get_step_value("k", 0).unwrap(), 0.0);
    /// assert_eq!(mu.get_step_value("k", 2).unwrap(), 0.0);
    /// assert_eq!(mu.get_step_value("k", 3).unwrap(), 2.0);
    /// assert_eq!(mu.n_steps(), 4);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `step` is `usize::MAX`, since the parameter would need more
    /// than `usize::MAX` slots.
    pub fn set_step_value(&mut self, name: &str, step: usize, value: f64) {
        write_step(&mut self.parameters, name, step, value);
    }

    /// Replace all steps of an extra parameter with the single value `value`
    pub fn set_extra_value(&mut self, name: &str, value: f64) {
        self.extra_parameters.insert(name.to_string(), vec![value]);
    }

    /// Write `value` at `step` of an extra parameter, growing it if needed
    ///
    /// # Panics
    ///
    /// Panics if `step` is `usize::MAX`.
    pub fn set_extra_step_value(&mut self, name: &str, step: usize, value: f64) {
        write_step(&mut self.extra_parameters, name, step, value);
    }

    /// Append one step to a primary parameter, creating it if absent
    pub fn push_back_value(&mut self, name: &str, value: f64) {
        self.parameters
            .entry(name.to_string())
            .or_default()
            .push(value);
    }

    /// Append one step to an extra parameter, creating it if absent
    pub fn push_back_extra_value(&mut self, name: &str, value: f64) {
        self.extra_parameters
            .entry(name.to_string())
            .or_default()
            .push(value);
    }

    /// Remove a primary parameter. Does nothing if it is absent.
    pub fn erase_parameter(&mut self, name: &str) {
        self.parameters.remove(name);
    }

    /// Remove an extra parameter. Does nothing if it is absent.
    pub fn erase_extra_parameter(&mut self, name: &str) {
        self.extra_parameters.remove(name);
    }

    /// Number of distinct primary parameters
    pub fn n_parameters(&self) -> usize {
        self.parameters.len()
    }

    /// Number of distinct extra parameters
    pub fn n_extra_parameters(&self) -> usize {
        self.extra_parameters.len()
    }

    /// Declare the step count reported while no primary parameter is stored
    pub fn set_n_steps(&mut self, n_steps: usize) {
        self.n_steps = n_steps;
    }

    /// Number of steps shared by the primary parameters
    ///
    /// With no primary parameters this is the value declared through
    /// [`set_n_steps`](Self::set_n_steps) (1 by default). Otherwise it is the
    /// length of the first parameter in canonical order.
    ///
    /// Release builds do not look at the other parameters. Debug builds assert
    /// that every parameter has the same length and panic if not; use
    /// [`validate_steps`](Self::validate_steps) for a recoverable check.
    pub fn n_steps(&self) -> usize {
        let Some(first) = self.parameters.values().next() else {
            return self.n_steps;
        };

        debug_assert!(
            self.parameters.values().all(|v| v.len() == first.len()),
            "All parameters must have the same number of steps."
        );

        first.len()
    }

    /// Check that all primary parameters have the same number of steps
    ///
    /// Returns the common step count, or the declared count when there are no
    /// primary parameters.
    ///
    /// # Errors
    ///
    /// [`RbError::InconsistentSteps`] naming the first parameter, in canonical
    /// order, whose length differs from the first parameter's.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtheta_rs::parameters::ParameterSet;
    ///
    /// let mut mu = ParameterSet::new();
    /// mu.set_step_value("a", 1, 1.0);
    /// mu.set_value("b", 2.0);
    /// assert!(mu.validate_steps().is_err());
    ///
    /// mu.push_back_value("b", 3.0);
    /// assert_eq!(mu.validate_steps().unwrap(), 2);
    /// ```
    pub fn validate_steps(&self) -> Result<usize> {
        let mut iter = self.parameters.values();
        let Some(first) = iter.next() else {
            return Ok(self.n_steps);
        };
        let expected = first.len();

        for (name, values) in &self.parameters {
            if values.len() != expected {
                return Err(RbError::InconsistentSteps {
                    name: name.clone(),
                    expected,
                    found: values.len(),
                });
            }
        }

        Ok(expected)
    }

    /// Names of all primary parameters, in canonical order
    pub fn parameter_names(&self) -> BTreeSet<String> {
        self.parameters.keys().cloned().collect()
    }

    /// Names of all extra parameters, in canonical order
    pub fn extra_parameter_names(&self) -> BTreeSet<String> {
        self.extra_parameters.keys().cloned().collect()
    }

    /// Iterate over primary parameters as `(name, steps)` pairs in canonical order
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.parameters.iter(),
        }
    }

    /// Iterate over extra parameters as `(name, steps)` pairs in canonical order
    pub fn extra_iter(&self) -> Iter<'_> {
        Iter {
            inner: self.extra_parameters.iter(),
        }
    }

    /// A read-only view of this set at a single step, for expression evaluation
    pub fn at_step(&self, step: usize) -> StepContext<'_> {
        StepContext { params: self, step }
    }

    /// Merge `rhs` into this set
    ///
    /// Every primary and extra entry of `rhs` overwrites or is inserted into
    /// `self`. Entries present only in `self` are kept unchanged.
    ///
    /// # Errors
    ///
    /// [`RbError::StepCountMismatch`] if the two sets report different
    /// [`n_steps`](Self::n_steps); `self` is left untouched in that case.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtheta_rs::parameters::ParameterSet;
    ///
    /// let mut a = ParameterSet::from_values([("x", 1.0), ("y", 2.0)]);
    /// let b = ParameterSet::from_values([("y", 5.0), ("z", 6.0)]);
    /// a.merge(&b).unwrap();
    ///
    /// assert_eq!(a.get_value("x").unwrap(), 1.0);
    /// assert_eq!(a.get_value("y").unwrap(), 5.0);
    /// assert_eq!(a.get_value("z").unwrap(), 6.0);
    /// ```
    pub fn merge(&mut self, rhs: &ParameterSet) -> Result<()> {
        let (lhs_steps, rhs_steps) = (self.n_steps(), rhs.n_steps());
        if lhs_steps != rhs_steps {
            return Err(RbError::StepCountMismatch {
                lhs: lhs_steps,
                rhs: rhs_steps,
            });
        }

        for (name, values) in &rhs.parameters {
            self.parameters.insert(name.clone(), values.clone());
        }
        for (name, values) in &rhs.extra_parameters {
            self.extra_parameters.insert(name.clone(), values.clone());
        }

        Ok(())
    }

    /// Render the primary parameters as text, one line per parameter
    ///
    /// Each line reads `name: v0, v1, ...` with values in scientific notation
    /// carrying `precision` digits after the decimal point and a signed,
    /// at-least-two-digit exponent (`3.500000e+00` at precision 6). Extra
    /// parameters are not included. This is a diagnostic format with no parser.
    pub fn get_string(&self, precision: usize) -> String {
        let mut out = String::new();
        for (name, values) in &self.parameters {
            let line = values
                .iter()
                .map(|&v| format_scientific(v, precision))
                .collect::<Vec<_>>()
                .join(", ");
            out.push_str(name);
            out.push_str(": ");
            out.push_str(&line);
            out.push('\n');
        }
        out
    }

    /// Write [`get_string`](Self::get_string) at [`DEFAULT_PRECISION`] to stdout
    pub fn print(&self) {
        print!("{}", self.get_string(DEFAULT_PRECISION));
    }

    /// Serialize the parameter set to a JSON string
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize a parameter set from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Save the parameter set to a JSON file
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = self.to_json()?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }

    /// Load a parameter set from a JSON file
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut json = String::new();
        file.read_to_string(&mut json)?;
        Self::from_json(&json)
    }
}

fn lookup_step(map: &StepMap, name: &str, step: usize) -> Result<f64> {
    let values = map.get(name).ok_or_else(|| RbError::ParameterNotFound {
        name: name.to_string(),
    })?;

    values
        .get(step)
        .copied()
        .ok_or_else(|| RbError::StepOutOfRange {
            name: name.to_string(),
            step,
            len: values.len(),
        })
}

fn lookup_step_or(map: &StepMap, name: &str, step: usize, default: f64) -> f64 {
    map.get(name)
        .and_then(|values| values.get(step))
        .copied()
        .unwrap_or(default)
}

fn write_step(map: &mut StepMap, name: &str, step: usize, value: f64) {
    let values = map.entry(name.to_string()).or_default();
    if step >= values.len() {
        if step > values.len() {
            log::trace!(
                "zero-filling steps {}..{} of parameter '{}'",
                values.len(),
                step,
                name
            );
        }
        let Some(len) = step.checked_add(1) else {
            panic!("Step {} of parameter '{}' exceeds the addressable range", step, name);
        };
        values.resize(len, 0.0);
    }
    values[step] = value;
}

/// Format `value` as `d.ddddde±XX`
fn format_scientific(value: f64, precision: usize) -> String {
    let formatted = format!("{:.*e}", precision, value);
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => {
            let exponent: i32 = exponent.parse().unwrap_or(0);
            let sign = if exponent < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exponent.abs())
        }
        // NaN and infinities have no exponent
        None => formatted,
    }
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Structural equality over both namespaces. The declared step count of an
/// empty set does not take part.
impl PartialEq for ParameterSet {
    fn eq(&self, other: &Self) -> bool {
        self.parameters == other.parameters && self.extra_parameters == other.extra_parameters
    }
}

impl fmt::Display for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.get_string(DEFAULT_PRECISION))
    }
}

/// Operator form of [`ParameterSet::merge`].
///
/// # Panics
///
/// Panics with the [`RbError::StepCountMismatch`] message if the step counts
/// differ. Use [`ParameterSet::merge`] to handle that case.
impl AddAssign<&ParameterSet> for ParameterSet {
    fn add_assign(&mut self, rhs: &ParameterSet) {
        if let Err(err) = self.merge(rhs) {
            panic!("{}", err);
        }
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self::from_values(iter)
    }
}

impl<'a> IntoIterator for &'a ParameterSet {
    type Item = (&'a str, &'a [f64]);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Read-only iterator over `(name, steps)` pairs of a [`ParameterSet`]
#[derive(Debug, Clone)]
pub struct Iter<'a> {
    inner: btree_map::Iter<'a, String, Vec<f64>>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, &'a [f64]);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Iter<'_> {}

/// A [`ParameterSet`] seen at one step
///
/// Resolves variable names against the primary parameters only.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    params: &'a ParameterSet,
    step: usize,
}

impl StepContext<'_> {
    /// The step this context reads
    pub fn step(&self) -> usize {
        self.step
    }
}

impl EvaluationContext for StepContext<'_> {
    fn get_variable(&self, name: &str) -> std::result::Result<f64, ExpressionError> {
        match self.params.get_step_value(name, self.step) {
            Ok(value) => Ok(value),
            Err(RbError::ParameterNotFound { .. }) => Err(ExpressionError::UndefinedVariable {
                name: name.to_string(),
            }),
            Err(err) => Err(ExpressionError::InvalidOperation {
                message: err.to_string(),
            }),
        }
    }

    fn has_variable(&self, name: &str) -> bool {
        self.params.has_value(name)
    }

    fn variable_names(&self) -> Vec<String> {
        self.params.parameter_names().into_iter().collect()
    }
}
