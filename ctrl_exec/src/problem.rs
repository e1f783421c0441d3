//! # Problem statement
//!
//! The immutable description of the optimal control task:
//!
//! ```text
//! dx/dt = A x + B u + C,            x(0) = x0,      H x(T) = g,
//! L1 <= u(t) <= L2,
//! minimise  int_0^T (u' R u + d |u|) dt + c x(T)
//! ```
//!
//! Shapes are checked once, when the problem is built from its parameters. A
//! `Problem` which exists is always dimensionally consistent.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use nalgebra::{DMatrix, DVector};
use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Raw problem parameters, as loaded from a parameter file.
///
/// Matrices are given row-major as nested arrays.
#[derive(Deserialize, Debug, Clone)]
pub struct ProblemParams {
    /// State matrix A (n x n)
    pub a: Vec<Vec<f64>>,

    /// Control matrix B (n x r)
    pub b: Vec<Vec<f64>>,

    /// Constant drift C (n)
    pub c: Vec<f64>,

    /// Lower control limits L1 (r)
    pub l1: Vec<f64>,

    /// Upper control limits L2 (r)
    pub l2: Vec<f64>,

    /// Initial state x0 (n)
    pub x0: Vec<f64>,

    /// Terminal map H (m x n)
    pub h: Vec<Vec<f64>>,

    /// Terminal target g (m)
    pub g: Vec<f64>,

    /// State cost Q (n x n). Not used by the control search.
    pub q: Vec<Vec<f64>>,

    /// Control effort weight R (r x r)
    pub r: Vec<Vec<f64>>,

    /// Absolute control penalty weight d (r). Only used by piecewise constant
    /// control.
    pub d: Vec<f64>,

    /// Terminal linear cost c (n)
    pub c_terminal: Vec<f64>,

    /// End time of the control horizon T.
    ///
    /// Units: seconds
    pub horizon_s: f64,

    /// Number of equal-width control segments N.
    pub num_segments: usize,
}

/// A dimensionally consistent optimal control problem.
#[derive(Debug, Clone)]
pub struct Problem {
    a: DMatrix<f64>,
    b: DMatrix<f64>,
    c: DVector<f64>,
    l1: DVector<f64>,
    l2: DVector<f64>,
    x0: DVector<f64>,
    h: DMatrix<f64>,
    g: DVector<f64>,
    q: DMatrix<f64>,
    r: DMatrix<f64>,
    d: DVector<f64>,
    c_terminal: DVector<f64>,
    horizon_s: f64,
    num_segments: usize,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors raised while building a problem. All of them are fatal.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ProblemError {
    #[error("Dimension {0} is zero")]
    ZeroDimension(&'static str),

    #[error("Matrix {item} has rows of differing lengths (row {row} has {found} entries, expected {expected})")]
    RaggedMatrix {
        item: &'static str,
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Dimension of {item} is {found} instead of {expected}")]
    DimensionMismatch {
        item: &'static str,
        expected: String,
        found: String,
    },

    #[error("The horizon must be positive and finite, found {0}")]
    InvalidHorizon(f64),

    #[error("The number of segments must be at least 1")]
    NoSegments,

    #[error("Control limits of channel {channel} are inverted: L1 = {l1} > L2 = {l2}")]
    InvertedLimits { channel: usize, l1: f64, l2: f64 },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Problem {
    /// Build the problem from its raw parameters, checking every dimension.
    pub fn new(params: ProblemParams) -> Result<Self, ProblemError> {
        let a = to_matrix("A", &params.a)?;
        let b = to_matrix("B", &params.b)?;
        let h = to_matrix("H", &params.h)?;
        let q = to_matrix("Q", &params.q)?;
        let r = to_matrix("R", &params.r)?;

        // Dimensions are defined by A, L1 and H, everything else must agree
        let n = a.nrows();
        let r_dim = params.l1.len();
        let m = h.nrows();

        if n == 0 {
            return Err(ProblemError::ZeroDimension("n"));
        }
        if r_dim == 0 {
            return Err(ProblemError::ZeroDimension("r"));
        }

        check_shape("A", &a, n, n)?;
        check_shape("B", &b, n, r_dim)?;
        check_len("C", params.c.len(), n)?;
        check_len("L2", params.l2.len(), r_dim)?;
        check_len("x0", params.x0.len(), n)?;
        if m > 0 {
            check_shape("H", &h, m, n)?;
        }
        check_len("g", params.g.len(), m)?;
        check_shape("Q", &q, n, n)?;
        check_shape("R", &r, r_dim, r_dim)?;
        check_len("d", params.d.len(), r_dim)?;
        check_len("c", params.c_terminal.len(), n)?;

        if !(params.horizon_s.is_finite() && params.horizon_s > 0.0) {
            return Err(ProblemError::InvalidHorizon(params.horizon_s));
        }
        if params.num_segments == 0 {
            return Err(ProblemError::NoSegments);
        }
        for (channel, (l1, l2)) in params.l1.iter().zip(params.l2.iter()).enumerate() {
            if l1 > l2 {
                return Err(ProblemError::InvertedLimits {
                    channel,
                    l1: *l1,
                    l2: *l2,
                });
            }
        }

        debug!("All dimensions are correct (n = {}, r = {}, m = {})", n, r_dim, m);

        Ok(Self {
            a,
            b,
            c: DVector::from_vec(params.c),
            l1: DVector::from_vec(params.l1),
            l2: DVector::from_vec(params.l2),
            x0: DVector::from_vec(params.x0),
            // An empty H still maps from the n-dimensional state space
            h: if m == 0 { DMatrix::zeros(0, n) } else { h },
            g: DVector::from_vec(params.g),
            q,
            r,
            d: DVector::from_vec(params.d),
            c_terminal: DVector::from_vec(params.c_terminal),
            horizon_s: params.horizon_s,
            num_segments: params.num_segments,
        })
    }

    /// Dimension of the state vector, n.
    pub fn num_states(&self) -> usize {
        self.a.nrows()
    }

    /// Dimension of the control vector, r.
    pub fn num_controls(&self) -> usize {
        self.l1.len()
    }

    /// Number of terminal equality constraints, m.
    pub fn num_terminal(&self) -> usize {
        self.h.nrows()
    }

    pub fn a(&self) -> &DMatrix<f64> {
        &self.a
    }

    pub fn b(&self) -> &DMatrix<f64> {
        &self.b
    }

    pub fn c(&self) -> &DVector<f64> {
        &self.c
    }

    pub fn l1(&self) -> &DVector<f64> {
        &self.l1
    }

    pub fn l2(&self) -> &DVector<f64> {
        &self.l2
    }

    pub fn x0(&self) -> &DVector<f64> {
        &self.x0
    }

    pub fn h(&self) -> &DMatrix<f64> {
        &self.h
    }

    pub fn g(&self) -> &DVector<f64> {
        &self.g
    }

    pub fn q(&self) -> &DMatrix<f64> {
        &self.q
    }

    pub fn r(&self) -> &DMatrix<f64> {
        &self.r
    }

    pub fn d(&self) -> &DVector<f64> {
        &self.d
    }

    pub fn c_terminal(&self) -> &DVector<f64> {
        &self.c_terminal
    }

    /// End of the control horizon, T.
    pub fn horizon_s(&self) -> f64 {
        self.horizon_s
    }

    /// Number of control segments, N.
    pub fn num_segments(&self) -> usize {
        self.num_segments
    }

    /// Width of one control segment, T/N.
    pub fn segment_width_s(&self) -> f64 {
        self.horizon_s / self.num_segments as f64
    }

    /// Start and end time of segment `k`.
    pub fn segment_bounds(&self, k: usize) -> (f64, f64) {
        let n = self.num_segments as f64;
        (
            self.horizon_s * k as f64 / n,
            self.horizon_s * (k + 1) as f64 / n,
        )
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Convert a row-major nested array into a matrix.
fn to_matrix(item: &'static str, rows: &[Vec<f64>]) -> Result<DMatrix<f64>, ProblemError> {
    let ncols = rows.first().map(|r| r.len()).unwrap_or(0);

    for (row, values) in rows.iter().enumerate() {
        if values.len() != ncols {
            return Err(ProblemError::RaggedMatrix {
                item,
                row,
                expected: ncols,
                found: values.len(),
            });
        }
    }

    Ok(DMatrix::from_fn(rows.len(), ncols, |i, j| rows[i][j]))
}

fn check_shape(
    item: &'static str,
    mat: &DMatrix<f64>,
    nrows: usize,
    ncols: usize,
) -> Result<(), ProblemError> {
    if mat.shape() != (nrows, ncols) {
        return Err(ProblemError::DimensionMismatch {
            item,
            expected: format!("({})x({})", nrows, ncols),
            found: format!("({})x({})", mat.nrows(), mat.ncols()),
        });
    }
    Ok(())
}

fn check_len(item: &'static str, len: usize, expected: usize) -> Result<(), ProblemError> {
    if len != expected {
        return Err(ProblemError::DimensionMismatch {
            item,
            expected: expected.to_string(),
            found: len.to_string(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
