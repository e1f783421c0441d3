//! The result of a successful control search

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;
use std::collections::BTreeMap;

use crate::{basis::ControlBasis, movement::ControlSignal, problem::Problem};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Optimal coefficients and cost, together with the problem dimensions
/// needed to rebuild the control signal.
#[derive(Debug, Clone)]
pub struct ControlSolution {
    basis: ControlBasis,
    horizon_s: f64,
    num_channels: usize,
    num_segments: usize,

    /// Coefficients laid out channel, segment, order
    coeffs: Vec<f64>,

    cost: f64,
}

/// One coefficient p[i,k,o], for archiving.
#[derive(Debug, Clone, Serialize)]
pub struct CoefficientRecord {
    pub channel: usize,
    pub segment: usize,
    pub order: usize,
    pub value: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ControlSolution {
    pub(super) fn new(problem: &Problem, basis: ControlBasis, coeffs: Vec<f64>, cost: f64) -> Self {
        Self {
            basis,
            horizon_s: problem.horizon_s(),
            num_channels: problem.num_controls(),
            num_segments: problem.num_segments(),
            coeffs,
            cost,
        }
    }

    pub fn basis(&self) -> ControlBasis {
        self.basis
    }

    /// Optimal value of the objective, excluding the constant part of the
    /// terminal cost.
    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// Control horizon T.
    ///
    /// Units: seconds
    pub fn horizon_s(&self) -> f64 {
        self.horizon_s
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    pub fn num_segments(&self) -> usize {
        self.num_segments
    }

    /// The coefficient p[i,k,o].
    pub fn get(&self, channel: usize, segment: usize, order: usize) -> f64 {
        let orders = self.basis.num_orders();
        self.coeffs[(channel * self.num_segments + segment) * orders + order]
    }

    /// Every coefficient keyed by `(channel, segment, order)`.
    pub fn coefficients(&self) -> BTreeMap<(usize, usize, usize), f64> {
        self.records()
            .into_iter()
            .map(|r| ((r.channel, r.segment, r.order), r.value))
            .collect()
    }

    /// Every coefficient in channel, segment, order order.
    pub fn records(&self) -> Vec<CoefficientRecord> {
        let orders = self.basis.num_orders();
        let mut records = Vec::with_capacity(self.coeffs.len());

        for channel in 0..self.num_channels {
            for segment in 0..self.num_segments {
                for order in 0..orders {
                    records.push(CoefficientRecord {
                        channel,
                        segment,
                        order,
                        value: self.get(channel, segment, order),
                    });
                }
            }
        }

        records
    }

    /// The piecewise polynomial control described by the coefficients.
    pub fn signal(&self) -> ControlSignal {
        ControlSignal::from_solution(self)
    }

    pub(crate) fn raw_coefficients(&self) -> &[f64] {
        &self.coeffs
    }
}
