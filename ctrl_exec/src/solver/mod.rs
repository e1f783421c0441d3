//! # Solver service
//!
//! A small modelling layer over the Clarabel conic solver: continuous
//! variables, linear constraints, rotated second order cones and a quadratic
//! objective to minimise.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod expr;
mod model;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use expr::*;
pub use model::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Reasons a model could not be solved to optimality. Statuses are reported
/// as the raw solver status and are never retried.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SolveError {
    #[error("The model has no objective")]
    NoObjective,

    #[error("The model could not be set up: {0}")]
    Setup(String),

    #[error("The model is infeasible (solver status {status})")]
    Infeasible { status: String },

    #[error("The model is unbounded (solver status {status})")]
    Unbounded { status: String },

    #[error("The solve exceeded its time limit of {limit_s} s")]
    TimeLimit { limit_s: f64 },

    #[error("The solver failed (solver status {status})")]
    Failed { status: String },
}
