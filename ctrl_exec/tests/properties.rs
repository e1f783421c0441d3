//! Structural properties of the optimum returned by every basis: continuity,
//! terminal condition under the true dynamics, box limits and cost
//! monotonicity in the effort weight.

mod common;

use approx::assert_relative_eq;
use ctrl_lib::{
    basis::ControlBasis,
    movement::simulate,
    params::SearchParams,
    problem::Problem,
    search::{search_control, ControlSolution},
};

const BOX_TOL: f64 = 1e-6;

fn solve_all(problem: &Problem) -> Vec<ControlSolution> {
    let params = SearchParams::default();
    ControlBasis::ALL
        .iter()
        .map(|b| search_control(problem, *b, &params).unwrap())
        .collect()
}

#[test]
fn test_continuity_at_breakpoints() {
    let problem = common::planar_problem([1.0, 1.0]);

    for solution in solve_all(&problem) {
        let basis = solution.basis();
        let signal = solution.signal();

        for i in 0..problem.num_controls() {
            for k in 0..problem.num_segments() - 1 {
                let (_, t) = problem.segment_bounds(k);

                if basis.degree() >= 1 {
                    assert_relative_eq!(
                        signal.value_on(i, k, t),
                        signal.value_on(i, k + 1, t),
                        epsilon = 1e-6
                    );
                }
                if basis.degree() >= 2 {
                    assert_relative_eq!(
                        signal.slope_on(i, k, t),
                        signal.slope_on(i, k + 1, t),
                        epsilon = 1e-6
                    );
                }
            }
        }
    }
}

#[test]
fn test_terminal_condition_under_true_dynamics() {
    let params = SearchParams::default();

    for problem in [common::planar_problem([1.0, 1.0]), common::oscillator()].iter() {
        for solution in solve_all(problem) {
            let traj = simulate(
                problem,
                &solution.signal(),
                params.sim_steps_per_segment,
                params.ode_substeps,
            )
            .unwrap();
            let x_t = traj.terminal_state().unwrap();
            let residual = problem.h() * x_t - problem.g();

            assert!(
                residual.norm() < 1e-5,
                "{} control misses the target by {}",
                solution.basis(),
                residual.norm()
            );
        }
    }
}

#[test]
fn test_box_limits_hold() {
    let problem = common::planar_problem([1.0, 1.0]);

    for solution in solve_all(&problem) {
        let signal = solution.signal();

        for i in 0..problem.num_controls() {
            let (l1, l2) = (problem.l1()[i], problem.l2()[i]);

            for k in 0..problem.num_segments() {
                let (lo, hi) = signal.extrema_on(i, k);

                assert!(
                    lo >= l1 - BOX_TOL && hi <= l2 + BOX_TOL,
                    "{} control leaves [{}, {}] on channel {} segment {}: [{}, {}]",
                    solution.basis(),
                    l1,
                    l2,
                    i,
                    k,
                    lo,
                    hi
                );
            }
        }
    }
}

#[test]
fn test_box_is_active_for_quadratic_spline() {
    // The unconstrained optimum of the first channel is -1.5 + 1.5 t, so the
    // spline must ride the limit somewhere.
    let problem = common::planar_problem([1.0, 1.0]);
    let solution = search_control(
        &problem,
        ControlBasis::QuadraticSpline,
        &SearchParams::default(),
    )
    .unwrap();
    let signal = solution.signal();

    let peak = (0..problem.num_segments())
        .map(|k| {
            let (lo, hi) = signal.extrema_on(0, k);
            lo.abs().max(hi.abs())
        })
        .fold(0.0, f64::max);

    assert!(peak > 1.1);
    assert!(peak <= 1.2 + BOX_TOL);
}

#[test]
fn test_cost_increases_with_effort_weight() {
    let params = SearchParams::default();
    let light = common::planar_problem([1.0, 1.0]);
    let heavy = common::planar_problem([2.0, 1.0]);

    for basis in ControlBasis::ALL.iter() {
        let light_cost = search_control(&light, *basis, &params).unwrap().cost();
        let heavy_cost = search_control(&heavy, *basis, &params).unwrap().cost();

        assert!(
            heavy_cost > light_cost + 1e-3,
            "{} control: {} is not above {}",
            basis,
            heavy_cost,
            light_cost
        );
    }
}
