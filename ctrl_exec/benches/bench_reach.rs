//! # Reachability Map Benchmark

use criterion::{criterion_group, criterion_main, Criterion};

use ctrl_lib::{
    basis::ControlBasis,
    params::SearchParams,
    problem::{Problem, ProblemParams},
    reach::ReachMap,
};

fn reach_map_benchmark(c: &mut Criterion) {
    // ---- Load the shipped oscillator problem ----

    let problem_params: ProblemParams =
        util::params::from_str(include_str!("../../params/problem.toml")).unwrap();
    let problem = Problem::new(problem_params).unwrap();
    let params = SearchParams::default();

    // Bench the map for each basis
    for basis in ControlBasis::ALL.iter() {
        c.bench_function(&format!("ReachMap::build::{}", basis), |b| {
            b.iter(|| ReachMap::build(&problem, basis.num_orders(), &params).unwrap())
        });
    }
}

criterion_group!(benches, reach_map_benchmark);
criterion_main!(benches);
