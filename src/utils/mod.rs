//! Utility functions and helpers for the rbtheta-rs library.

pub mod parallel;

pub use parallel::{evaluate_batch, evaluate_terms};
