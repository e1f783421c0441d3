//! # Control synthesis library
//!
//! Builds and solves the optimal control problem of driving a linear
//! time-invariant system `dx/dt = A x + B u + C` to a terminal condition
//! `H x(T) = g` with a piecewise polynomial control. The control can be
//! piecewise constant, piecewise linear or a quadratic C1 spline, and is
//! found by a single convex (second order cone) program.
//!
//! The pipeline runs one way:
//!
//! ```text
//! Problem -> ReachMap -> ControlBasis + objective -> ControlSearch -> ControlSolution
//! ```

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

/// Control parametrizations - variables, continuity and box constraints per basis
pub mod basis;

/// Forward simulation of the dynamics under a solved control
pub mod movement;

/// Numeric kernel - ODE propagation and cubic spline interpolation
pub mod numeric;

/// Objective assembly - control effort and terminal cost
pub mod objective;

/// Search parameters loaded from `search.toml`
pub mod params;

/// Problem definition and dimension checks
pub mod problem;

/// Reachability map - influence of each coefficient on the terminal state
pub mod reach;

/// Search orchestration - the staged model build and solve
pub mod search;

/// Conic modelling layer over the Clarabel solver
pub mod solver;
