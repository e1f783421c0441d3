//! # Control search
//!
//! Orchestrates one optimal control search: the reachability map is built,
//! then the model is assembled and solved in a fixed order of stages
//!
//! ```text
//! Empty -> VariablesDeclared -> ConstraintsBuilt -> ObjectiveSet -> Solved -> Extracted
//! ```
//!
//! with `Infeasible`, `Unbounded` and `Failed` as terminal failure stages. A
//! stage can only be entered from the one before it, and a failed search is
//! never retried or reformulated.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod solution;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, warn};
use std::fmt;

// Internal
use crate::{
    basis::{CoeffVars, ControlBasis},
    params::SearchParams,
    problem::{Problem, ProblemError, ProblemParams},
    reach::{ReachError, ReachMap},
    solver::{Model, SolveError, Solution},
};

pub use solution::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single control search over one problem with one basis.
///
/// The search exclusively owns its model for the whole build.
pub struct ControlSearch<'a> {
    problem: &'a Problem,
    basis: ControlBasis,
    params: &'a SearchParams,

    stage: SearchStage,

    reach: ReachMap,
    model: Model,
    vars: Option<CoeffVars>,
    solution: Option<Solution>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Stages of a [`ControlSearch`], in the order they are entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SearchStage {
    Empty,
    VariablesDeclared,
    ConstraintsBuilt,
    ObjectiveSet,
    Solved,
    Extracted,

    /// The solver proved the model infeasible
    Infeasible,

    /// The solver proved the model unbounded
    Unbounded,

    /// The solver stopped without an answer
    Failed,
}

/// Errors which end a control search.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ProblemError),

    #[error("Numeric instability: {0}")]
    NumericInstability(#[from] ReachError),

    #[error("Solver status error: {0}")]
    SolverStatus(#[from] SolveError),

    #[error("Cannot {action} in the {stage} stage")]
    StageOrder {
        action: &'static str,
        stage: SearchStage,
    },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<'a> ControlSearch<'a> {
    /// Start a search, building the reachability map for the basis.
    pub fn new(
        problem: &'a Problem,
        basis: ControlBasis,
        params: &'a SearchParams,
    ) -> Result<Self, SearchError> {
        info!(
            "Building reachability map for {} control ({} channels, {} segments)",
            basis,
            problem.num_controls(),
            problem.num_segments()
        );
        let reach = ReachMap::build(problem, basis.num_orders(), params)?;

        Ok(Self {
            problem,
            basis,
            params,
            stage: SearchStage::Empty,
            reach,
            model: Model::new(basis.model_name()),
            vars: None,
            solution: None,
        })
    }

    pub fn stage(&self) -> SearchStage {
        self.stage
    }

    pub fn basis(&self) -> ControlBasis {
        self.basis
    }

    /// The reachability map the model is built from.
    pub fn reach(&self) -> &ReachMap {
        &self.reach
    }

    /// The model as assembled so far.
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Declare the coefficient variables.
    pub fn declare_variables(&mut self) -> Result<(), SearchError> {
        self.enter(SearchStage::VariablesDeclared, "declare variables")?;

        self.vars = Some(self.basis.declare_variables(&mut self.model, self.problem));

        debug!("{} variables declared", self.model.num_vars());
        Ok(())
    }

    /// Add continuity, box and terminal constraints.
    pub fn build_constraints(&mut self) -> Result<(), SearchError> {
        self.enter(SearchStage::ConstraintsBuilt, "build constraints")?;
        let vars = self.vars_for("build constraints")?;

        self.basis.add_continuity(&mut self.model, &vars);
        self.basis
            .add_box_constraints(&mut self.model, self.problem, &vars);
        self.basis
            .add_terminal_constraints(&mut self.model, &self.reach, &vars);

        self.vars = Some(vars);
        Ok(())
    }

    /// Assemble the objective and hand it to the model.
    pub fn set_objective(&mut self) -> Result<(), SearchError> {
        self.enter(SearchStage::ObjectiveSet, "set the objective")?;
        let vars = self.vars_for("set the objective")?;

        let obj = self
            .basis
            .objective_terms(&mut self.model, self.problem, &self.reach, &vars, self.params);
        self.model.set_objective(obj);

        self.vars = Some(vars);
        Ok(())
    }

    /// Solve the model. On failure the search moves to a terminal failure
    /// stage and the solver's status is returned.
    pub fn solve(&mut self) -> Result<(), SearchError> {
        self.enter(SearchStage::Solved, "solve")?;

        let stats = self.model.stats();
        info!(
            "Solving \"{}\": {} variables, {} equality rows, {} inequality rows, {} cones",
            self.model.name(),
            stats.num_vars,
            stats.num_eq_rows,
            stats.num_ineq_rows,
            stats.num_cones
        );

        match self.model.solve(&self.params.solver) {
            Ok(solution) => {
                info!(
                    "Solved in {} iterations ({:.3} s), objective {}",
                    solution.iterations(),
                    solution.solve_time_s(),
                    solution.objective_value()
                );
                self.solution = Some(solution);
                Ok(())
            }
            Err(e) => {
                self.stage = match e {
                    SolveError::Infeasible { .. } => SearchStage::Infeasible,
                    SolveError::Unbounded { .. } => SearchStage::Unbounded,
                    _ => SearchStage::Failed,
                };
                warn!("Search for {} control stopped: {}", self.basis, e);
                Err(e.into())
            }
        }
    }

    /// Read every coefficient back from the solved model.
    pub fn extract(&mut self) -> Result<ControlSolution, SearchError> {
        let not_solved = SearchError::StageOrder {
            action: "extract the coefficients",
            stage: self.stage,
        };
        let (vars, solution) = match (self.vars.as_ref(), self.solution.as_ref()) {
            (Some(v), Some(s)) => (v, s),
            _ => return Err(not_solved),
        };
        let mut coeffs = Vec::with_capacity(vars.all().len());
        for i in 0..vars.num_channels() {
            for k in 0..vars.num_segments() {
                let local: Vec<f64> = (0..vars.num_orders())
                    .map(|o| solution.value(vars.get(i, k, o)))
                    .collect();
                coeffs.extend(vars.to_absolute(k, &local));
            }
        }
        let cost = solution.objective_value();

        self.enter(SearchStage::Extracted, "extract the coefficients")?;

        Ok(ControlSolution::new(self.problem, self.basis, coeffs, cost))
    }

    /// Run every remaining stage in order.
    pub fn run(&mut self) -> Result<ControlSolution, SearchError> {
        self.declare_variables()?;
        self.build_constraints()?;
        self.set_objective()?;
        self.solve()?;
        self.extract()
    }

    /// Move to `next`, which must directly follow the current stage.
    fn enter(&mut self, next: SearchStage, action: &'static str) -> Result<(), SearchError> {
        if self.stage.next() == Some(next) {
            self.stage = next;
            Ok(())
        } else {
            Err(SearchError::StageOrder {
                action,
                stage: self.stage,
            })
        }
    }

    /// Take the declared variables, failing if there are none yet.
    fn vars_for(&mut self, action: &'static str) -> Result<CoeffVars, SearchError> {
        match self.vars.take() {
            Some(v) => Ok(v),
            None => Err(SearchError::StageOrder {
                action,
                stage: self.stage,
            }),
        }
    }
}

impl SearchStage {
    /// The stage that follows this one on success.
    pub fn next(&self) -> Option<SearchStage> {
        match self {
            SearchStage::Empty => Some(SearchStage::VariablesDeclared),
            SearchStage::VariablesDeclared => Some(SearchStage::ConstraintsBuilt),
            SearchStage::ConstraintsBuilt => Some(SearchStage::ObjectiveSet),
            SearchStage::ObjectiveSet => Some(SearchStage::Solved),
            SearchStage::Solved => Some(SearchStage::Extracted),
            _ => None,
        }
    }

    /// True for stages no further transition leaves.
    pub fn is_terminal(&self) -> bool {
        self.next().is_none()
    }
}

impl fmt::Display for SearchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Check the dimensions of `params` and build the problem a search runs on.
///
/// Inconsistent shapes end the search before any model is built, as a
/// [`SearchError::Configuration`].
pub fn prepare_problem(params: ProblemParams) -> Result<Problem, SearchError> {
    let problem = Problem::new(params)?;
    debug!(
        "Problem prepared: {} states, {} controls, {} segments",
        problem.num_states(),
        problem.num_controls(),
        problem.num_segments()
    );
    Ok(problem)
}

/// Search for the optimal control of `problem` in the given basis.
pub fn search_control(
    problem: &Problem,
    basis: ControlBasis,
    params: &SearchParams,
) -> Result<ControlSolution, SearchError> {
    ControlSearch::new(problem, basis, params)?.run()
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn integrator_params(l1: f64, l2: f64, target: f64) -> ProblemParams {
        ProblemParams {
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
            d: vec![0.0],
            c_terminal: vec![0.0],
            horizon_s: 1.0,
            num_segments: 4,
        }
    }

    /// x' = u on [0, 1] with u in [l1, l2]
    fn integrator(l1: f64, l2: f64, target: f64) -> Problem {
        prepare_problem(integrator_params(l1, l2, target)).unwrap()
    }

    #[test]
    fn test_stage_order() {
        let problem = integrator(-1.0, 1.0, 0.5);
        let params = SearchParams::default();
        let mut search = ControlSearch::new(&problem, ControlBasis::Linear, &params).unwrap();

        assert_eq!(search.stage(), SearchStage::Empty);
        assert!(matches!(
            search.set_objective(),
            Err(SearchError::StageOrder { stage: SearchStage::Empty, .. })
        ));
        assert!(matches!(search.extract(), Err(SearchError::StageOrder { .. })));

        search.declare_variables().unwrap();
        assert!(matches!(
            search.declare_variables(),
            Err(SearchError::StageOrder { .. })
        ));
        search.build_constraints().unwrap();
        search.set_objective().unwrap();
        search.solve().unwrap();
        assert_eq!(search.stage(), SearchStage::Solved);

        let solution = search.extract().unwrap();
        assert_eq!(search.stage(), SearchStage::Extracted);
        assert!(search.stage().is_terminal());
        assert_eq!(solution.coefficients().len(), 8);
    }

    #[test]
    fn test_infeasible_is_terminal() {
        // u fixed to 0.5 can only reach 0.5
        let problem = integrator(0.5, 0.5, 0.7);
        let params = SearchParams::default();
        let mut search = ControlSearch::new(&problem, ControlBasis::Constant, &params).unwrap();

        let err = search.run().unwrap_err();
        assert!(matches!(
            err,
            SearchError::SolverStatus(SolveError::Infeasible { .. })
        ));
        assert_eq!(search.stage(), SearchStage::Infeasible);
        assert!(search.solve().is_err());
        assert!(search.extract().is_err());
    }

    #[test]
    fn test_time_limit_fails_search() {
        let problem = integrator(-1.0, 1.0, 0.5);
        let mut params = SearchParams::default();
        params.solver.time_limit_s = Some(1e-12);
        let mut search = ControlSearch::new(&problem, ControlBasis::QuadraticSpline, &params).unwrap();

        let err = search.run().unwrap_err();
        assert!(matches!(
            err,
            SearchError::SolverStatus(SolveError::TimeLimit { .. })
        ));
        assert_eq!(search.stage(), SearchStage::Failed);
        assert!(search.stage().is_terminal());
        assert!(search.extract().is_err());
    }

    #[test]
    fn test_mismatched_problem_is_configuration_error() {
        let mut params = integrator_params(-1.0, 1.0, 0.5);
        params.b = vec![vec![1.0, 0.0]];

        assert!(matches!(
            prepare_problem(params),
            Err(SearchError::Configuration(ProblemError::DimensionMismatch { item: "B", .. }))
        ));
    }
}
