//! # Reachability map
//!
//! The terminal state is affine in the control coefficients:
//!
//! ```text
//! x(T) = xT0 + sum_{i,k,o} p[i,k,o] D[i,k,o]
//! D[i,k,o] = int_{t_k}^{t_{k+1}} exp(A (T - t)) B[:,i] t^o dt
//! ```
//!
//! where `xT0` is the terminal state under zero control. The kernel
//! `exp(A (T - t)) b` is obtained without a matrix exponential, by propagating
//! the adjoint system `dz/dt = -A z` backwards from `z(T) = b`, fitting a cubic
//! spline to the samples and integrating it exactly over each segment.
//!
//! The tensor D is stored densely, one column per `(channel, segment, order)`
//! at the offset given by [`ReachMap::index`].

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace};
use nalgebra::{DMatrix, DVector};

// Internal
use crate::{
    numeric::{propagate, CubicSpline, NumericError},
    params::SearchParams,
    problem::Problem,
};
use util::maths::linspace;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Sensitivity of the terminal state to every control coefficient.
#[derive(Debug, Clone)]
pub struct ReachMap {
    num_channels: usize,
    num_segments: usize,
    num_orders: usize,

    /// Terminal state under zero control, xT0
    free_terminal_state: DVector<f64>,

    /// Residual target h = g - H xT0
    residual_target: DVector<f64>,

    /// D, one n-vector column per coefficient
    influence: DMatrix<f64>,

    /// H D, one m-vector column per coefficient
    terminal_influence: DMatrix<f64>,

    /// c' D, one entry per coefficient
    cost_influence: DVector<f64>,
}

/// One entry of the influence tensor.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct InfluenceRecord {
    pub channel: usize,
    pub order: usize,
    pub segment: usize,
    pub state: usize,
    pub value: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Numeric failures while building the map, with the quantity being computed.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ReachError {
    #[error("Failed to propagate the free response from x0: {0}")]
    FreeResponse(#[source] NumericError),

    #[error("Failed to integrate the response to the drift term C: {0}")]
    Drift(#[source] NumericError),

    #[error("Failed to compute the influence of channel {channel}, order {order}: {source}")]
    Influence {
        channel: usize,
        order: usize,
        segment: Option<usize>,
        #[source]
        source: NumericError,
    },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ReachMap {
    /// Build the map for polynomial orders `0..num_orders` on every channel and
    /// segment of the problem.
    pub fn build(
        problem: &Problem,
        num_orders: usize,
        params: &SearchParams,
    ) -> Result<Self, ReachError> {
        let t_end = problem.horizon_s();
        let r = problem.num_controls();
        let n_seg = problem.num_segments();
        let substeps = params.ode_substeps;

        let straight_grid = linspace(0.0, t_end, params.grid_size);
        let reverse_grid = linspace(t_end, 0.0, params.grid_size);
        let minus_a = -problem.a();

        // ---- ZERO CONTROL TERMINAL STATE ----

        let free = propagate(problem.a(), problem.x0(), &straight_grid, substeps)
            .map_err(ReachError::FreeResponse)?;
        let free_end = match free.last() {
            Some(x) => x.clone(),
            None => problem.x0().clone(),
        };

        // int_0^T exp(A (T - s)) C ds
        let drift = propagate(&minus_a, problem.c(), &reverse_grid, substeps)
            .and_then(|zc| CubicSpline::fit(&reverse_grid, &zc))
            .and_then(|spline| spline.integrate(0.0, t_end))
            .map_err(ReachError::Drift)?;

        let free_terminal_state = free_end + drift;
        let residual_target = problem.g() - problem.h() * &free_terminal_state;

        debug!("Zero control terminal state: {:?}", free_terminal_state.as_slice());

        // ---- INFLUENCE TENSOR ----

        let mut influence = DMatrix::zeros(problem.num_states(), r * n_seg * num_orders);

        for i in 0..r {
            let b_i: DVector<f64> = problem.b().column(i).into_owned();
            let zb = propagate(&minus_a, &b_i, &reverse_grid, substeps).map_err(|e| {
                ReachError::Influence {
                    channel: i,
                    order: 0,
                    segment: None,
                    source: e,
                }
            })?;

            for o in 0..num_orders {
                // z(t) t^o
                let weighted: Vec<DVector<f64>> = zb
                    .iter()
                    .zip(reverse_grid.iter())
                    .map(|(z, t)| z * t.powi(o as i32))
                    .collect();

                let spline = CubicSpline::fit(&reverse_grid, &weighted).map_err(|e| {
                    ReachError::Influence {
                        channel: i,
                        order: o,
                        segment: None,
                        source: e,
                    }
                })?;

                for k in 0..n_seg {
                    let (t1, t2) = problem.segment_bounds(k);
                    let d = spline.integrate(t1, t2).map_err(|e| ReachError::Influence {
                        channel: i,
                        order: o,
                        segment: Some(k),
                        source: e,
                    })?;
                    influence.set_column(index(n_seg, num_orders, i, k, o), &d);
                }

                trace!("Influence of channel {} order {} computed", i, o);
            }

            debug!("Reachability of control channel {} computed", i);
        }

        let terminal_influence = problem.h() * &influence;
        let cost_influence = influence.tr_mul(problem.c_terminal());

        Ok(Self {
            num_channels: r,
            num_segments: n_seg,
            num_orders,
            free_terminal_state,
            residual_target,
            influence,
            terminal_influence,
            cost_influence,
        })
    }

    /// Flat column offset of coefficient `(channel, segment, order)`.
    pub fn index(&self, channel: usize, segment: usize, order: usize) -> usize {
        index(self.num_segments, self.num_orders, channel, segment, order)
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    pub fn num_segments(&self) -> usize {
        self.num_segments
    }

    pub fn num_orders(&self) -> usize {
        self.num_orders
    }

    /// Terminal state reached with zero control, xT0.
    pub fn free_terminal_state(&self) -> &DVector<f64> {
        &self.free_terminal_state
    }

    /// Residual terminal target h = g - H xT0.
    pub fn residual_target(&self) -> &DVector<f64> {
        &self.residual_target
    }

    /// D[i,k,o], the change of x(T) per unit of coefficient p[i,k,o].
    pub fn influence(&self, channel: usize, segment: usize, order: usize) -> DVector<f64> {
        self.influence
            .column(self.index(channel, segment, order))
            .into_owned()
    }

    /// Row `l` of H D, the terminal constraint coefficient of every
    /// coefficient, indexed by [`ReachMap::index`].
    pub fn terminal_row(&self, l: usize) -> Vec<f64> {
        self.terminal_influence.row(l).iter().copied().collect()
    }

    /// c' D[i,k,o], the terminal cost per unit of coefficient p[i,k,o].
    pub fn cost_coeff(&self, channel: usize, segment: usize, order: usize) -> f64 {
        self.cost_influence[self.index(channel, segment, order)]
    }

    /// Every entry of D in channel, then order, then segment order.
    pub fn records(&self) -> Vec<InfluenceRecord> {
        let mut records = Vec::with_capacity(self.influence.len());

        for channel in 0..self.num_channels {
            for order in 0..self.num_orders {
                for segment in 0..self.num_segments {
                    let col = self.influence.column(self.index(channel, segment, order));
                    records.extend(col.iter().enumerate().map(|(state, value)| {
                        InfluenceRecord {
                            channel,
                            order,
                            segment,
                            state,
                            value: *value,
                        }
                    }));
                }
            }
        }

        records
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn index(num_segments: usize, num_orders: usize, channel: usize, segment: usize, order: usize) -> usize {
    (channel * num_segments + segment) * num_orders + order
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
