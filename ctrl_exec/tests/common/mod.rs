//! Problems shared by the integration tests

#![allow(dead_code)]

use ctrl_lib::problem::{Problem, ProblemParams};

/// `x'' = u` from rest at 1 to rest at the origin.
pub fn double_integrator(horizon_s: f64, num_segments: usize, limit: f64) -> Problem {
    Problem::new(ProblemParams {
        a: vec![vec![0.0, 1.0], vec![0.0, 0.0]],
        b: vec![vec![0.0], vec![1.0]],
        c: vec![0.0, 0.0],
        l1: vec![-limit],
        l2: vec![limit],
        x0: vec![1.0, 0.0],
        h: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
        g: vec![0.0, 0.0],
        q: vec![vec![0.0, 0.0], vec![0.0, 0.0]],
        r: vec![vec![1.0]],
        d: vec![0.0],
        c_terminal: vec![0.0, 0.0],
        horizon_s,
        num_segments,
    })
    .unwrap()
}

/// Two independent double integrators, the second with a constant downward
/// drift, driven to rest at the origin. The unconstrained optimum leaves the
/// box on the first channel.
pub fn planar_problem(r: [f64; 2]) -> Problem {
    Problem::new(ProblemParams {
        a: vec![
            vec![0.0, 1.0, 0.0, 0.0],
            vec![0.0, 0.0, 0.0, 0.0],
            vec![0.0, 0.0, 0.0, 1.0],
            vec![0.0, 0.0, 0.0, 0.0],
        ],
        b: vec![
            vec![0.0, 0.0],
            vec![1.0, 0.0],
            vec![0.0, 0.0],
            vec![0.0, 1.0],
        ],
        c: vec![0.0, 0.0, 0.0, -0.5],
        l1: vec![-1.2, -1.0],
        l2: vec![1.2, 1.5],
        x0: vec![1.0, 0.0, -1.0, 0.5],
        h: vec![
            vec![1.0, 0.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0, 0.0],
            vec![0.0, 0.0, 1.0, 0.0],
            vec![0.0, 0.0, 0.0, 1.0],
        ],
        g: vec![0.0, 0.0, 0.0, 0.0],
        q: vec![vec![0.0; 4]; 4],
        r: vec![vec![r[0], 0.0], vec![0.0, r[1]]],
        d: vec![0.0, 0.0],
        c_terminal: vec![0.0; 4],
        horizon_s: 2.0,
        num_segments: 8,
    })
    .unwrap()
}

/// A lightly driven harmonic oscillator brought to rest, constraining the
/// terminal position only.
pub fn oscillator() -> Problem {
    Problem::new(ProblemParams {
        a: vec![vec![0.0, 1.0], vec![-1.0, 0.0]],
        b: vec![vec![0.0], vec![1.0]],
        c: vec![0.0, 0.1],
        l1: vec![-5.0],
        l2: vec![5.0],
        x0: vec![1.0, 0.0],
        h: vec![vec![1.0, 0.0]],
        g: vec![0.0],
        q: vec![vec![0.0, 0.0], vec![0.0, 0.0]],
        r: vec![vec![1.0]],
        d: vec![0.0],
        c_terminal: vec![0.0, 0.5],
        horizon_s: 3.0,
        num_segments: 6,
    })
    .unwrap()
}

/// `x' = u` on `[0, 1]` from 0 to `target`, with a single control channel in
/// `[l1, l2]` and absolute value weight `d`.
pub fn integrator(l1: f64, l2: f64, target: f64, d: f64) -> Problem {
    Problem::new(ProblemParams {
        a: vec![vec![0.0]],
        b: vec![vec![1.0]],
        c: vec![0.0],
        l1: vec![l1],
        l2: vec![l2],
        x0: vec![0.0],
        h: vec![vec![1.0]],
        g: vec![target],
        q: vec![vec![0.0]],
        r: vec![vec![1.0]],
        d: vec![d],
        c_terminal: vec![0.0],
        horizon_s: 1.0,
        num_segments: 4,
    })
    .unwrap()
}
