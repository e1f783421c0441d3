//! Minimum energy control of the double integrator, which has the closed
//! form `u(t) = 12 t - 6` and cost 12 over one second.

mod common;

use approx::assert_relative_eq;
use ctrl_lib::{
    basis::ControlBasis, movement::simulate, params::SearchParams, search::search_control,
};

#[test]
fn test_linear_matches_closed_form() {
    let problem = common::double_integrator(1.0, 4, 100.0);
    let solution = search_control(&problem, ControlBasis::Linear, &SearchParams::default()).unwrap();

    assert_relative_eq!(solution.cost(), 12.0, max_relative = 1e-5);
    for k in 0..4 {
        assert_relative_eq!(solution.get(0, k, 0), -6.0, epsilon = 1e-4);
        assert_relative_eq!(solution.get(0, k, 1), 12.0, epsilon = 1e-4);
    }
}

#[test]
fn test_quadratic_matches_closed_form() {
    let problem = common::double_integrator(1.0, 4, 100.0);
    let solution = search_control(
        &problem,
        ControlBasis::QuadraticSpline,
        &SearchParams::default(),
    )
    .unwrap();

    assert_relative_eq!(solution.cost(), 12.0, max_relative = 1e-5);
    for k in 0..4 {
        assert_relative_eq!(solution.get(0, k, 0), -6.0, epsilon = 1e-4);
        assert_relative_eq!(solution.get(0, k, 1), 12.0, epsilon = 1e-4);
        assert_relative_eq!(solution.get(0, k, 2), 0.0, epsilon = 1e-4);
    }
}

#[test]
fn test_constant_is_least_norm_staircase() {
    // With four segments the best staircase is u_k = -12.8 (s_k - 0.5), where
    // s_k is the time from the segment midpoint to T, and costs 12.8.
    let problem = common::double_integrator(1.0, 4, 100.0);
    let solution =
        search_control(&problem, ControlBasis::Constant, &SearchParams::default()).unwrap();

    assert_relative_eq!(solution.cost(), 12.8, max_relative = 1e-5);
    let expected = [-4.8, -1.6, 1.6, 4.8];
    for (k, u) in expected.iter().enumerate() {
        assert_relative_eq!(solution.get(0, k, 0), *u, epsilon = 1e-4);
    }

    let mapping = solution.coefficients();
    assert_eq!(mapping.len(), 4);
    assert_relative_eq!(mapping[&(0, 3, 0)], 4.8, epsilon = 1e-4);
}

#[test]
fn test_finer_staircase_approaches_closed_form() {
    let params = SearchParams::default();
    let coarse = search_control(
        &common::double_integrator(1.0, 4, 100.0),
        ControlBasis::Constant,
        &params,
    )
    .unwrap();
    let fine = search_control(
        &common::double_integrator(1.0, 16, 100.0),
        ControlBasis::Constant,
        &params,
    )
    .unwrap();

    assert!(fine.cost() < coarse.cost());
    assert!(fine.cost() > 12.0 - 1e-6);
}

#[test]
fn test_simulated_closed_form_reaches_rest() {
    let problem = common::double_integrator(1.0, 4, 100.0);
    let params = SearchParams::default();
    let solution = search_control(&problem, ControlBasis::Linear, &params).unwrap();

    let traj = simulate(&problem, &solution.signal(), 20, 4).unwrap();
    let x_t = traj.terminal_state().unwrap();

    assert_relative_eq!(x_t[0], 0.0, epsilon = 1e-5);
    assert_relative_eq!(x_t[1], 0.0, epsilon = 1e-5);
    assert_relative_eq!(traj.u[0][0], -6.0, epsilon = 1e-4);
}
