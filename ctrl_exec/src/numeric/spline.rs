//! Vector-valued not-a-knot cubic spline interpolation

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::DVector;

use super::NumericError;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Minimum number of samples a cubic spline can be fitted to.
pub const MIN_SPLINE_SAMPLES: usize = 4;

/// Relative tolerance with which integration bounds may overshoot the domain.
const DOMAIN_TOLERANCE: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A cubic spline through vector-valued samples.
///
/// Every component is interpolated independently with the not-a-knot end
/// condition, i.e. the third derivative is continuous at the second and the
/// penultimate knots.
#[derive(Debug, Clone)]
pub struct CubicSpline {
    /// Knots, strictly increasing
    knots: Vec<f64>,

    /// Sample values at each knot
    values: Vec<DVector<f64>>,

    /// Second derivative at each knot
    moments: Vec<DVector<f64>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CubicSpline {
    /// Fit a spline through `values` sampled at `t_grid`.
    ///
    /// The grid must be strictly monotonic, increasing or decreasing, and
    /// hold at least [`MIN_SPLINE_SAMPLES`] points.
    pub fn fit(t_grid: &[f64], values: &[DVector<f64>]) -> Result<Self, NumericError> {
        if t_grid.len() != values.len() {
            return Err(NumericError::LengthMismatch {
                grid: t_grid.len(),
                values: values.len(),
            });
        }
        if t_grid.len() < MIN_SPLINE_SAMPLES {
            return Err(NumericError::GridTooShort { len: t_grid.len() });
        }

        // Work on an increasing grid
        let decreasing = t_grid[1] < t_grid[0];
        let (knots, values): (Vec<f64>, Vec<DVector<f64>>) = if decreasing {
            (
                t_grid.iter().rev().copied().collect(),
                values.iter().rev().cloned().collect(),
            )
        } else {
            (t_grid.to_vec(), values.to_vec())
        };

        for (i, w) in knots.windows(2).enumerate() {
            if !(w[1] > w[0]) {
                let index = if decreasing { t_grid.len() - 2 - i } else { i };
                return Err(NumericError::NonMonotonicGrid { index });
            }
        }

        let moments = not_a_knot_moments(&knots, &values);

        Ok(Self {
            knots,
            values,
            moments,
        })
    }

    /// Start and end of the interpolated domain.
    pub fn domain(&self) -> (f64, f64) {
        (self.knots[0], self.knots[self.knots.len() - 1])
    }

    /// Evaluate the spline at `t`, clamped to the domain.
    pub fn eval(&self, t: f64) -> DVector<f64> {
        let (start, end) = self.domain();
        let t = t.max(start).min(end);
        let i = self.interval_of(t);

        let (x0, x1) = (self.knots[i], self.knots[i + 1]);
        let h = x1 - x0;
        let (a, b) = (x1 - t, t - x0);

        &self.moments[i] * (a.powi(3) / (6.0 * h))
            + &self.moments[i + 1] * (b.powi(3) / (6.0 * h))
            + (&self.values[i] / h - &self.moments[i] * (h / 6.0)) * a
            + (&self.values[i + 1] / h - &self.moments[i + 1] * (h / 6.0)) * b
    }

    /// Exact definite integral of the spline over `[t0, t1]`.
    ///
    /// Bounds which overshoot the domain by less than a small relative
    /// tolerance are clamped onto it, anything further is an error.
    pub fn integrate(&self, t0: f64, t1: f64) -> Result<DVector<f64>, NumericError> {
        if t1 < t0 {
            return self.integrate(t1, t0).map(|v| -v);
        }

        let (start, end) = self.domain();
        let tol = DOMAIN_TOLERANCE * (end - start);
        if t0 < start - tol || t1 > end + tol || !t0.is_finite() || !t1.is_finite() {
            return Err(NumericError::OutsideDomain { t0, t1, start, end });
        }
        let (t0, t1) = (t0.max(start), t1.min(end));

        let first = self.interval_of(t0);
        let last = self.interval_of(t1);

        let mut total = DVector::zeros(self.values[0].len());
        for i in first..=last {
            let lo = t0.max(self.knots[i]);
            let hi = t1.min(self.knots[i + 1]);
            if hi > lo {
                total += self.piece_antiderivative(i, hi) - self.piece_antiderivative(i, lo);
            }
        }

        Ok(total)
    }

    /// Antiderivative of piece `i` evaluated at `t`.
    fn piece_antiderivative(&self, i: usize, t: f64) -> DVector<f64> {
        let (x0, x1) = (self.knots[i], self.knots[i + 1]);
        let h = x1 - x0;
        let (a, b) = (x1 - t, t - x0);

        &self.moments[i] * (-a.powi(4) / (24.0 * h))
            + &self.moments[i + 1] * (b.powi(4) / (24.0 * h))
            - (&self.values[i] / h - &self.moments[i] * (h / 6.0)) * (a * a / 2.0)
            + (&self.values[i + 1] / h - &self.moments[i + 1] * (h / 6.0)) * (b * b / 2.0)
    }

    /// Index of the knot interval containing `t`, which must lie in the domain.
    fn interval_of(&self, t: f64) -> usize {
        let last = self.knots.len() - 2;
        match self
            .knots
            .binary_search_by(|k| k.partial_cmp(&t).unwrap_or(std::cmp::Ordering::Less))
        {
            Ok(i) => i.min(last),
            Err(i) => i.saturating_sub(1).min(last),
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Solve for the knot second derivatives of a not-a-knot spline.
///
/// The two not-a-knot conditions express `M_0` and `M_n` in terms of their
/// neighbours, which reduces the system on the interior moments to a
/// tridiagonal one solved with the Thomas algorithm.
fn not_a_knot_moments(knots: &[f64], values: &[DVector<f64>]) -> Vec<DVector<f64>> {
    let n = knots.len() - 1;
    let dim = values[0].len();
    let h: Vec<f64> = knots.windows(2).map(|w| w[1] - w[0]).collect();

    // Divided differences
    let delta: Vec<DVector<f64>> = (0..n)
        .map(|i| (&values[i + 1] - &values[i]) / h[i])
        .collect();

    // Interior rows i = 1..n-1, stored at index i - 1
    let rows = n - 1;
    let mut sub = vec![0.0; rows];
    let mut diag = vec![0.0; rows];
    let mut sup = vec![0.0; rows];
    let mut rhs: Vec<DVector<f64>> = Vec::with_capacity(rows);

    for i in 1..n {
        sub[i - 1] = h[i - 1];
        diag[i - 1] = 2.0 * (h[i - 1] + h[i]);
        sup[i - 1] = h[i];
        rhs.push((&delta[i] - &delta[i - 1]) * 6.0);
    }

    // Eliminate M_0 = ((h0 + h1) M_1 - h0 M_2) / h1 from the first row
    diag[0] += h[0] * (h[0] + h[1]) / h[1];
    sup[0] -= h[0] * h[0] / h[1];

    // Eliminate M_n = ((h_{n-2} + h_{n-1}) M_{n-1} - h_{n-1} M_{n-2}) / h_{n-2}
    diag[rows - 1] += h[n - 1] * (h[n - 2] + h[n - 1]) / h[n - 2];
    sub[rows - 1] -= h[n - 1] * h[n - 1] / h[n - 2];

    // Thomas algorithm, forward sweep
    for i in 1..rows {
        let w = sub[i] / diag[i - 1];
        diag[i] -= w * sup[i - 1];
        let prev = rhs[i - 1].clone();
        rhs[i] -= prev * w;
    }

    // Back substitution
    let mut interior = vec![DVector::zeros(dim); rows];
    interior[rows - 1] = &rhs[rows - 1] / diag[rows - 1];
    for i in (0..rows - 1).rev() {
        interior[i] = (&rhs[i] - &interior[i + 1] * sup[i]) / diag[i];
    }

    let m_first = (&interior[0] * (h[0] + h[1]) - &interior[1] * h[0]) / h[1];
    let m_last = (&interior[rows - 1] * (h[n - 2] + h[n - 1]) - &interior[rows - 2] * h[n - 1])
        / h[n - 2];

    let mut moments = Vec::with_capacity(n + 1);
    moments.push(m_first);
    moments.extend(interior);
    moments.push(m_last);
    moments
}
