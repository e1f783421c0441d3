//! # Objective assembly
//!
//! The cost minimised by every basis is the sum of the control effort
//!
//! ```text
//! sum_k int_{t_k}^{t_k+1} u(t)^T R u(t) dt
//! ```
//!
//! and the linear terminal cost `c^T x(T)`, whose coefficient dependent part
//! is `sum cD[i,k,o] p[i,k,o]`. The constant part of the terminal cost is
//! left out of the model.
//!
//! Both are written in the segment-local coefficients `a[i,k,o]` of
//! [`CoeffVars`]. With `s = (t - t_k) / w` the effort of one segment is
//!
//! ```text
//! R[i1,i2] w sum_{o1,o2} a[i1,k,o1] a[i2,k,o2] / (o1 + o2 + 1)
//! ```
//!
//! and the terminal cost row is pulled back from the absolute coefficients.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;

use crate::{
    basis::CoeffVars,
    problem::Problem,
    reach::ReachMap,
    solver::{LinExpr, QuadExpr},
};

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Build the control effort as a quadratic form in the coefficients.
///
/// Channel pairs whose weight `R[i1,i2]` has magnitude at most `threshold`
/// contribute nothing and are skipped.
pub fn effort_cost(problem: &Problem, vars: &CoeffVars, threshold: f64) -> QuadExpr {
    let r = problem.r();
    let orders = vars.num_orders();
    let mut obj = QuadExpr::new();

    let width = vars.width_s();

    for k in 0..vars.num_segments() {
        for i1 in 0..vars.num_channels() {
            for i2 in 0..vars.num_channels() {
                let weight = r[(i1, i2)];
                if weight.abs() <= threshold {
                    continue;
                }

                for o1 in 0..orders {
                    for o2 in 0..orders {
                        obj.add_quad_term(
                            vars.get(i1, k, o1),
                            vars.get(i2, k, o2),
                            weight * width / (o1 + o2 + 1) as f64,
                        );
                    }
                }
            }
        }
    }

    trace!("Effort cost has {} terms", obj.quad_terms().len());

    obj
}

/// Build the coefficient dependent part of the terminal cost `c^T x(T)`.
pub fn terminal_cost(reach: &ReachMap, vars: &CoeffVars) -> LinExpr {
    let mut expr = LinExpr::new();

    for i in 0..vars.num_channels() {
        for k in 0..vars.num_segments() {
            let absolute: Vec<f64> = (0..vars.num_orders())
                .map(|o| reach.cost_coeff(i, k, o))
                .collect();

            for (o, coeff) in vars.pull_back(k, &absolute).iter().enumerate() {
                if *coeff != 0.0 {
                    expr.add_term(vars.get(i, k, o), *coeff);
                }
            }
        }
    }

    expr
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
