//! # Numeric kernel
//!
//! Linear ODE propagation, cubic interpolation of sampled vector fields and
//! definite integration of the interpolant. These are the only numerical
//! primitives the reachability map builder relies on.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod ode;
mod spline;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use ode::*;
pub use spline::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Failures of the numeric kernel. None of them are recoverable, they point at
/// a malformed dynamics matrix or a degenerate grid.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum NumericError {
    #[error("Propagation diverged at t = {t} (non-finite state)")]
    Diverged { t: f64 },

    #[error("Sample grid is not strictly monotonic around index {index}")]
    NonMonotonicGrid { index: usize },

    #[error("Cubic interpolation needs at least 4 samples, got {len}")]
    GridTooShort { len: usize },

    #[error("Sample grid has {grid} points but {values} values were given")]
    LengthMismatch { grid: usize, values: usize },

    #[error("Interval [{t0}, {t1}] lies outside the interpolated domain [{start}, {end}]")]
    OutsideDomain {
        t0: f64,
        t1: f64,
        start: f64,
        end: f64,
    },
}
