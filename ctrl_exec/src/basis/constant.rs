//! Piecewise constant control: one coefficient `u[i,k]` per channel and
//! segment, bounded directly by `[L1, L2]`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;

use super::CoeffVars;
use crate::{
    problem::Problem,
    solver::{LinExpr, Model, Relation},
};

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Declare `u[i,k]` with bounds `[L1[i], L2[i]]`. A channel with
/// `L1 == L2` ends up with fixed variables.
pub(super) fn declare_variables(model: &mut Model, problem: &Problem) -> CoeffVars {
    CoeffVars::declare(model, problem, 1, |model, i, k, _| {
        model.add_var(format!("u[{},{}]", i, k), problem.l1()[i], problem.l2()[i])
    })
}

/// Build the penalty `(T/N) sum_k d[i] |u[i,k]|`.
///
/// When the box of a channel lies on one side of zero the absolute value is
/// just a sign flip. Otherwise each `u` is split into `v_pos - v_neg` with
/// both parts non-negative, and the penalty is taken on their sum.
pub(super) fn abs_penalty(
    model: &mut Model,
    problem: &Problem,
    vars: &CoeffVars,
    threshold: f64,
) -> LinExpr {
    let width = problem.segment_width_s();
    let mut penalty = LinExpr::new();

    for i in 0..vars.num_channels() {
        let d = problem.d()[i];
        if d.abs() <= threshold {
            continue;
        }

        let (l1, l2) = (problem.l1()[i], problem.l2()[i]);
        let weight = width * d;

        if l1 > -threshold {
            for k in 0..vars.num_segments() {
                penalty.add_term(vars.get(i, k, 0), weight);
            }
        } else if l2 < threshold {
            for k in 0..vars.num_segments() {
                penalty.add_term(vars.get(i, k, 0), -weight);
            }
        } else {
            debug!("Splitting channel {} into positive and negative parts", i);

            for k in 0..vars.num_segments() {
                let pos = model.add_var(format!("u_pos[{},{}]", i, k), 0.0, l2);
                let neg = model.add_var(format!("u_neg[{},{}]", i, k), 0.0, -l1);

                let split = LinExpr::from(vars.get(i, k, 0))
                    .with_term(pos, -1.0)
                    .with_term(neg, 1.0);
                model.add_constr(split, Relation::Eq, 0.0, format!("abs_split[{},{}]", i, k));

                penalty.add_term(pos, weight).add_term(neg, weight);
            }
        }
    }

    penalty
}
