//! Channels whose limits coincide can only hold the limit value.

mod common;

use approx::assert_relative_eq;
use ctrl_lib::{
    basis::ControlBasis,
    params::SearchParams,
    search::{search_control, SearchError},
    solver::SolveError,
};

#[test]
fn test_fixed_channel_feasible() {
    // Holding 0.5 for one second reaches exactly 0.5
    let problem = common::integrator(0.5, 0.5, 0.5, 0.0);

    for basis in ControlBasis::ALL.iter() {
        let solution = search_control(&problem, *basis, &SearchParams::default()).unwrap();
        let signal = solution.signal();

        for k in 0..problem.num_segments() {
            let (lo, hi) = signal.extrema_on(0, k);
            assert_relative_eq!(lo, 0.5, epsilon = 1e-6);
            assert_relative_eq!(hi, 0.5, epsilon = 1e-6);
        }
        assert_relative_eq!(solution.cost(), 0.25, epsilon = 1e-6);
    }
}

#[test]
fn test_fixed_channel_infeasible() {
    let problem = common::integrator(0.5, 0.5, 0.7, 0.0);

    for basis in ControlBasis::ALL.iter() {
        let err = search_control(&problem, *basis, &SearchParams::default()).unwrap_err();

        assert!(
            matches!(err, SearchError::SolverStatus(SolveError::Infeasible { .. })),
            "{} control gave {:?}",
            basis,
            err
        );
    }
}
