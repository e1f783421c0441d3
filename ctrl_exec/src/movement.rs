//! # Control signal reconstruction and forward simulation
//!
//! Turns solved coefficients back into a piecewise polynomial control
//! signal and drives the true dynamics `dx/dt = A x + B u + C` with it. The
//! simulated trajectory is what the terminal and box properties are checked
//! against, and what the runner archives.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use nalgebra::DVector;
use serde::Serialize;
use util::maths::{linspace, poly_deriv_ascending, poly_val_ascending};

// Internal
use crate::{
    numeric::{propagate_affine, NumericError},
    problem::Problem,
    search::ControlSolution,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A piecewise polynomial control signal over `[0, T]`.
#[derive(Debug, Clone)]
pub struct ControlSignal {
    horizon_s: f64,
    num_channels: usize,
    num_segments: usize,
    num_orders: usize,

    /// Ascending coefficients, laid out channel, segment, order.
    coeffs: Vec<f64>,
}

/// A sampled forward simulation.
#[derive(Debug, Clone)]
pub struct Trajectory {
    /// Sample times
    ///
    /// Units: seconds
    pub t: Vec<f64>,

    /// State at each sample time
    pub x: Vec<DVector<f64>>,

    /// Control at each sample time
    pub u: Vec<DVector<f64>>,
}

/// One value of a [`Trajectory`] in long form, for archiving.
#[derive(Debug, Clone, Serialize)]
pub struct TrajectoryRecord {
    pub t_s: f64,
    pub kind: &'static str,
    pub index: usize,
    pub value: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ControlSignal {
    /// Build a signal from coefficients laid out channel, segment, order.
    ///
    /// Returns `None` if `coeffs` has the wrong length.
    pub fn new(
        horizon_s: f64,
        num_channels: usize,
        num_segments: usize,
        num_orders: usize,
        coeffs: Vec<f64>,
    ) -> Option<Self> {
        if coeffs.len() != num_channels * num_segments * num_orders || num_segments == 0 {
            return None;
        }

        Some(Self {
            horizon_s,
            num_channels,
            num_segments,
            num_orders,
            coeffs,
        })
    }

    /// The signal described by a solved search.
    pub fn from_solution(solution: &ControlSolution) -> Self {
        Self {
            horizon_s: solution.horizon_s(),
            num_channels: solution.num_channels(),
            num_segments: solution.num_segments(),
            num_orders: solution.basis().num_orders(),
            coeffs: solution.raw_coefficients().to_vec(),
        }
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    pub fn num_segments(&self) -> usize {
        self.num_segments
    }

    pub fn horizon_s(&self) -> f64 {
        self.horizon_s
    }

    /// The ascending polynomial coefficients of a channel on a segment.
    pub fn polynomial(&self, channel: usize, segment: usize) -> &[f64] {
        let start = (channel * self.num_segments + segment) * self.num_orders;
        &self.coeffs[start..start + self.num_orders]
    }

    /// Start and end time of segment `k`.
    pub fn segment_bounds(&self, segment: usize) -> (f64, f64) {
        let n = self.num_segments as f64;
        (
            self.horizon_s * segment as f64 / n,
            self.horizon_s * (segment + 1) as f64 / n,
        )
    }

    /// The segment that governs time `t`. Breakpoints belong to the segment
    /// on their right, except `T` which belongs to the last segment.
    pub fn segment_at(&self, t: f64) -> usize {
        let k = (t * self.num_segments as f64 / self.horizon_s).floor();
        if k <= 0.0 {
            0
        } else {
            (k as usize).min(self.num_segments - 1)
        }
    }

    /// The value of one channel on a given segment, extrapolating the
    /// segment's polynomial if `t` lies outside it.
    pub fn value_on(&self, channel: usize, segment: usize, t: f64) -> f64 {
        poly_val_ascending(t, self.polynomial(channel, segment))
    }

    /// The time derivative of one channel on a given segment.
    pub fn slope_on(&self, channel: usize, segment: usize, t: f64) -> f64 {
        poly_deriv_ascending(t, self.polynomial(channel, segment))
    }

    /// The control vector at time `t`.
    pub fn eval(&self, t: f64) -> DVector<f64> {
        self.eval_on(self.segment_at(t), t)
    }

    /// The control vector at time `t` using segment `k`'s polynomials.
    pub fn eval_on(&self, segment: usize, t: f64) -> DVector<f64> {
        DVector::from_iterator(
            self.num_channels,
            (0..self.num_channels).map(|i| self.value_on(i, segment, t)),
        )
    }

    /// The extreme values of a channel over a segment, found from the
    /// endpoints and any stationary point inside the segment.
    pub fn extrema_on(&self, channel: usize, segment: usize) -> (f64, f64) {
        let (t1, t2) = self.segment_bounds(segment);
        let poly = self.polynomial(channel, segment);

        let mut candidates = vec![t1, t2];
        if poly.len() > 2 && poly[2] != 0.0 {
            let t_stat = -poly[1] / (2.0 * poly[2]);
            if t_stat > t1 && t_stat < t2 {
                candidates.push(t_stat);
            }
        }

        candidates
            .iter()
            .map(|t| poly_val_ascending(*t, poly))
            .fold((std::f64::INFINITY, std::f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            })
    }
}

impl Trajectory {
    /// The final simulated state.
    pub fn terminal_state(&self) -> Option<&DVector<f64>> {
        self.x.last()
    }

    /// The trajectory in long form: every state and control component at
    /// every sample time.
    pub fn records(&self) -> Vec<TrajectoryRecord> {
        let mut records = Vec::new();

        for (j, t) in self.t.iter().enumerate() {
            for (index, value) in self.x[j].iter().enumerate() {
                records.push(TrajectoryRecord {
                    t_s: *t,
                    kind: "state",
                    index,
                    value: *value,
                });
            }
            for (index, value) in self.u[j].iter().enumerate() {
                records.push(TrajectoryRecord {
                    t_s: *t,
                    kind: "control",
                    index,
                    value: *value,
                });
            }
        }

        records
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Simulate the problem's dynamics from `x0` under `signal`.
///
/// Each segment is integrated separately with `steps_per_segment` RK4 steps
/// of `substeps` sub-steps each, so that the integrator never straddles a
/// discontinuity of the control.
pub fn simulate(
    problem: &Problem,
    signal: &ControlSignal,
    steps_per_segment: usize,
    substeps: usize,
) -> Result<Trajectory, NumericError> {
    let steps = steps_per_segment.max(1);
    let b = problem.b();
    let c = problem.c();

    let mut traj = Trajectory {
        t: vec![0.0],
        x: vec![problem.x0().clone()],
        u: vec![signal.eval_on(0, 0.0)],
    };

    for k in 0..signal.num_segments() {
        let (t1, t2) = signal.segment_bounds(k);
        let grid = linspace(t1, t2, steps + 1);

        let forcing = |t: f64| b * signal.eval_on(k, t) + c;

        let x_start = traj.x.last().cloned().unwrap_or_else(|| problem.x0().clone());
        let states = propagate_affine(problem.a(), Some(&forcing), &x_start, &grid, substeps)?;

        for (t, x) in grid.iter().zip(states.into_iter()).skip(1) {
            traj.t.push(*t);
            traj.x.push(x);
            traj.u.push(signal.eval_on(k, *t));
        }
    }

    debug!(
        "Simulated {} samples, terminal state {:?}",
        traj.t.len(),
        traj.terminal_state().map(|x| x.as_slice().to_vec())
    );

    Ok(traj)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::problem::ProblemParams;
    use approx::assert_relative_eq;

    fn double_integrator() -> Problem {
        Problem::new(ProblemParams {
            a: vec![vec![0.0, 1.0], vec![0.0, 0.0]],
            b: vec![vec![0.0], vec![1.0]],
            c: vec![0.0, 0.0],
            l1: vec![-100.0],
            l2: vec![100.0],
            x0: vec![1.0, 0.0],
            h: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            g: vec![0.0, 0.0],
            q: vec![vec![0.0, 0.0], vec![0.0, 0.0]],
            r: vec![vec![1.0]],
            d: vec![0.0],
            c_terminal: vec![0.0, 0.0],
            horizon_s: 1.0,
            num_segments: 4,
        })
        .unwrap()
    }

    #[test]
    fn test_signal_segments() {
        // Constant 1 on the first half, 3 on the second
        let signal = ControlSignal::new(2.0, 1, 2, 1, vec![1.0, 3.0]).unwrap();

        assert_eq!(signal.segment_at(0.0), 0);
        assert_eq!(signal.segment_at(1.0), 1);
        assert_eq!(signal.segment_at(2.0), 1);
        assert_relative_eq!(signal.eval(0.5)[0], 1.0);
        assert_relative_eq!(signal.eval(2.0)[0], 3.0);

        assert!(ControlSignal::new(2.0, 1, 2, 1, vec![1.0]).is_none());
    }

    #[test]
    fn test_extrema() {
        // u = (t - 0.5)^2 on [0, 1]
        let signal = ControlSignal::new(1.0, 1, 1, 3, vec![0.25, -1.0, 1.0]).unwrap();
        let (lo, hi) = signal.extrema_on(0, 0);

        assert_relative_eq!(lo, 0.0);
        assert_relative_eq!(hi, 0.25);
    }

    #[test]
    fn test_simulate_minimum_energy() {
        // The minimum energy control u = 12 t - 6 brings (1, 0) to rest at
        // the origin in one second.
        let problem = double_integrator();
        let signal = ControlSignal::new(1.0, 1, 4, 2, [-6.0, 12.0].repeat(4)).unwrap();

        let traj = simulate(&problem, &signal, 10, 1).unwrap();
        let x_t = traj.terminal_state().unwrap();

        assert_eq!(traj.t.len(), 41);
        assert_relative_eq!(x_t[0], 0.0, epsilon = 1e-10);
        assert_relative_eq!(x_t[1], 0.0, epsilon = 1e-10);
        assert_relative_eq!(traj.u[40][0], 6.0, epsilon = 1e-12);
        assert_eq!(traj.records().len(), 41 * 3);
    }
}
