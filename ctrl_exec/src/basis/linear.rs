//! Piecewise linear control, continuous across segment boundaries.
//!
//! A linear segment attains its extremes at its endpoints so the box
//! constraint only needs checking there.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use super::CoeffVars;
use crate::{
    problem::Problem,
    solver::{Model, Relation},
};

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Join segments `k` and `k + 1` of every channel at `t_{k+1}`.
pub(super) fn add_continuity(model: &mut Model, vars: &CoeffVars) {
    add_value_continuity(model, vars);
}

/// Keep both endpoints of every segment in `[L1, L2]`.
pub(super) fn add_box_constraints(model: &mut Model, problem: &Problem, vars: &CoeffVars) {
    for i in 0..vars.num_channels() {
        let (l1, l2) = (problem.l1()[i], problem.l2()[i]);

        for k in 0..vars.num_segments() {
            for (end, s) in [("start", 0.0), ("end", 1.0)].iter() {
                let value = vars.value_at(i, k, *s);

                if l1 == l2 {
                    model.add_constr(value, Relation::Eq, l1, format!("box_{}[{},{}]", end, i, k));
                } else {
                    model.add_constr(
                        value.clone(),
                        Relation::Ge,
                        l1,
                        format!("box_lower_{}[{},{}]", end, i, k),
                    );
                    model.add_constr(
                        value,
                        Relation::Le,
                        l2,
                        format!("box_upper_{}[{},{}]", end, i, k),
                    );
                }
            }
        }
    }
}

/// Equate the values of consecutive segments at their shared breakpoint.
pub(super) fn add_value_continuity(model: &mut Model, vars: &CoeffVars) {
    for i in 0..vars.num_channels() {
        for k in 0..vars.num_segments().saturating_sub(1) {
            let expr = vars.value_at(i, k, 1.0) - vars.value_at(i, k + 1, 0.0);
            model.add_constr(expr, Relation::Eq, 0.0, format!("value_continuity[{},{}]", i, k));
        }
    }
}
