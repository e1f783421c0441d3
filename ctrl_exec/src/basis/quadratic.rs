//! Quadratic spline control, continuous with a continuous first derivative.
//!
//! The extremes of a quadratic segment can lie strictly inside it, so the
//! box is enforced with a conic certificate. For a segment `[t1, t2]` of
//! width `w`, introduce the endpoint margins
//!
//! ```text
//! y0 = u(t1) - L1    y1 = u(t2) - L1
//! y2 = L2 - u(t1)    y3 = L2 - u(t2)
//! ```
//!
//! all in `[0, L2 - L1]`. The segment stays above `L1` iff its curvature
//! satisfies `p2 w^2 <= (sqrt(y0) + sqrt(y1))^2 = y0 + y1 + 2 sqrt(y0 y1)`.
//! The square root term is replaced by `q0` with `q0^2 <= 4 y0 y1`, and
//! likewise for the upper bound with `y2`, `y3` and `q1`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;

use super::{linear, CoeffVars};
use crate::{
    problem::Problem,
    solver::{LinExpr, Model, Relation},
};

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Join neighbouring segments in value and slope.
pub(super) fn add_continuity(model: &mut Model, vars: &CoeffVars) {
    linear::add_value_continuity(model, vars);

    for i in 0..vars.num_channels() {
        for k in 0..vars.num_segments().saturating_sub(1) {
            let expr = vars.slope_at(i, k, 1.0) - vars.slope_at(i, k + 1, 0.0);
            model.add_constr(expr, Relation::Eq, 0.0, format!("slope_continuity[{},{}]", i, k));
        }
    }
}

/// Keep every segment of every channel inside `[L1, L2]`.
pub(super) fn add_box_constraints(model: &mut Model, problem: &Problem, vars: &CoeffVars) {
    let n_over_t = problem.num_segments() as f64 / problem.horizon_s();
    let scale = n_over_t * n_over_t;

    for i in 0..vars.num_channels() {
        let (l1, l2) = (problem.l1()[i], problem.l2()[i]);

        if l1 == l2 {
            debug!("Channel {} has a degenerate box, fixing it to {}", i, l1);
            add_fixed_channel(model, vars, i, l1);
            continue;
        }

        for k in 0..vars.num_segments() {
            let start = vars.value_at(i, k, 0.0);
            let end = vars.value_at(i, k, 1.0);
            let p2 = vars.curvature(i, k);

            let y: Vec<_> = (0..4)
                .map(|e| model.add_var(format!("y{}[{},{}]", e, i, k), 0.0, l2 - l1))
                .collect();
            let q: Vec<_> = (0..2)
                .map(|e| model.add_var(format!("q{}[{},{}]", e, i, k), 0.0, std::f64::INFINITY))
                .collect();

            // Endpoint margins
            let margins = [
                (start.clone(), y[0], 1.0, l1),
                (end.clone(), y[1], 1.0, l1),
                (start, y[2], -1.0, l2),
                (end, y[3], -1.0, l2),
            ];
            for (e, (value, margin, sign, rhs)) in margins.iter().cloned().enumerate() {
                let expr = value.with_term(margin, -sign);
                model.add_constr(expr, Relation::Eq, rhs, format!("margin_y{}[{},{}]", e, i, k));
            }

            // Curvature bounds
            let lower = p2
                .clone()
                .with_term(y[0], -scale)
                .with_term(y[1], -scale)
                .with_term(q[0], -scale);
            model.add_constr(lower, Relation::Le, 0.0, format!("curvature_lower[{},{}]", i, k));

            let upper = p2
                .with_term(y[2], scale)
                .with_term(y[3], scale)
                .with_term(q[1], scale);
            model.add_constr(upper, Relation::Ge, 0.0, format!("curvature_upper[{},{}]", i, k));

            model.add_rotated_cone(q[0], y[0], y[1], format!("cone_lower[{},{}]", i, k));
            model.add_rotated_cone(q[1], y[2], y[3], format!("cone_upper[{},{}]", i, k));
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// With `L1 == L2` the conic certificate has no interior. The same feasible
/// set is a flat segment at the limit, which is stated directly.
fn add_fixed_channel(model: &mut Model, vars: &CoeffVars, i: usize, value: f64) {
    for k in 0..vars.num_segments() {
        model.add_constr(
            vars.value_at(i, k, 0.0),
            Relation::Eq,
            value,
            format!("fixed_start[{},{}]", i, k),
        );
        model.add_constr(
            vars.value_at(i, k, 1.0),
            Relation::Eq,
            value,
            format!("fixed_end[{},{}]", i, k),
        );
        model.add_constr(
            LinExpr::from(vars.get(i, k, 2)),
            Relation::Eq,
            0.0,
            format!("fixed_curvature[{},{}]", i, k),
        );
    }
}
