//! Search parameters
//!
//! Numerical constants of the pipeline which are configuration rather than
//! part of the problem statement.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the control search pipeline.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SearchParams {
    /// Number of samples in each propagation grid over `[0, T]`.
    pub grid_size: usize,

    /// Number of RK4 sub-steps taken between consecutive grid samples.
    pub ode_substeps: usize,

    /// Cost weights (entries of R, entries of d) with an absolute value at or
    /// below this threshold are treated as zero and produce no terms.
    pub negligible_threshold: f64,

    /// Number of RK4 steps per control segment used by forward simulation.
    pub sim_steps_per_segment: usize,

    /// Parameters passed through to the conic solver.
    pub solver: SolverParams,
}

/// Parameters of the conic solver.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SolverParams {
    /// Maximum number of interior point iterations.
    pub max_iter: u32,

    /// Wall-clock limit on a single solve.
    ///
    /// Units: seconds. `None` means no limit.
    pub time_limit_s: Option<f64>,

    /// Primal/dual feasibility tolerance.
    pub tol_feas: f64,

    /// Absolute duality gap tolerance.
    pub tol_gap_abs: f64,

    /// Relative duality gap tolerance.
    pub tol_gap_rel: f64,

    /// Print the solver's own iteration log.
    pub verbose: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            grid_size: 501,
            ode_substeps: 4,
            negligible_threshold: 1e-15,
            sim_steps_per_segment: 50,
            solver: SolverParams::default(),
        }
    }
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            max_iter: 200,
            time_limit_s: None,
            tol_feas: 1e-8,
            tol_gap_abs: 1e-8,
            tol_gap_rel: 1e-8,
            verbose: false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_partial_toml() {
        let p: SearchParams = util::params::from_str(
            "grid_size = 101\n\n[solver]\ntime_limit_s = 2.5\n",
        )
        .unwrap();

        assert_eq!(p.grid_size, 101);
        assert_eq!(p.ode_substeps, 4);
        assert_eq!(p.negligible_threshold, 1e-15);
        assert_eq!(p.solver.time_limit_s, Some(2.5));
        assert_eq!(p.solver.max_iter, 200);
    }
}
