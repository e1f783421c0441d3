//! Conic model assembly and solving
//!
//! A [`Model`] collects variables, linear constraints, rotated second order
//! cones and a quadratic objective, then hands them to Clarabel in its
//! standard form:
//!
//! ```text
//! minimise    1/2 z' P z + q' z
//! subject to  A z + s = b,   s in K
//! ```
//!
//! with `K` the product of a zero cone (equalities and fixed variables), a
//! nonnegative cone (inequalities and variable bounds) and one 3-dimensional
//! second order cone per rotated cone constraint.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use clarabel::algebra::CscMatrix;
use clarabel::solver::{
    DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus,
    SupportedConeT::{self, NonnegativeConeT, SecondOrderConeT, ZeroConeT},
};
use log::{debug, warn};

// Internal
use super::{LinExpr, QuadExpr, Relation, SolveError, Var};
use crate::params::SolverParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An optimisation model under construction.
#[derive(Debug, Clone)]
pub struct Model {
    name: String,
    vars: Vec<VarInfo>,
    constraints: Vec<LinearConstraint>,
    cones: Vec<RotatedCone>,
    objective: Option<QuadExpr>,
}

/// Sizes of the assembled conic program.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModelStats {
    pub num_vars: usize,
    pub num_eq_rows: usize,
    pub num_ineq_rows: usize,
    pub num_cones: usize,
}

/// The optimal point of a solved model.
#[derive(Debug, Clone)]
pub struct Solution {
    values: Vec<f64>,
    objective: f64,
    status: SolveStatus,
    iterations: u32,
    solve_time_s: f64,
}

/// Accepted solver outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// Solved to the requested tolerances
    Optimal,

    /// Solved to the reduced tolerances only
    AlmostOptimal,
}

#[derive(Debug, Clone)]
struct VarInfo {
    name: String,
    lb: f64,
    ub: f64,
}

#[derive(Debug, Clone)]
struct LinearConstraint {
    name: String,
    expr: LinExpr,
    relation: Relation,
    rhs: f64,
}

/// `q^2 <= 4 a b` with `a, b >= 0`
#[derive(Debug, Clone)]
struct RotatedCone {
    name: String,
    q: Var,
    a: Var,
    b: Var,
}

/// Sparse matrix entries accumulated row by row.
#[derive(Default)]
struct Triplets {
    entries: Vec<(usize, usize, f64)>,
    rows: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Model {
    /// Create an empty model.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            vars: Vec::new(),
            constraints: Vec::new(),
            cones: Vec::new(),
            objective: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a continuous variable with the given bounds. Use infinite bounds
    /// for free directions.
    pub fn add_var<S: Into<String>>(&mut self, name: S, lb: f64, ub: f64) -> Var {
        self.vars.push(VarInfo {
            name: name.into(),
            lb,
            ub,
        });
        Var(self.vars.len() - 1)
    }

    /// Add the linear constraint `expr (relation) rhs`.
    pub fn add_constr<S: Into<String>>(
        &mut self,
        expr: LinExpr,
        relation: Relation,
        rhs: f64,
        name: S,
    ) {
        self.constraints.push(LinearConstraint {
            name: name.into(),
            expr,
            relation,
            rhs,
        });
    }

    /// Add the rotated cone constraint `q^2 <= 4 a b`, which also forces
    /// `a, b >= 0`.
    pub fn add_rotated_cone<S: Into<String>>(&mut self, q: Var, a: Var, b: Var, name: S) {
        self.cones.push(RotatedCone {
            name: name.into(),
            q,
            a,
            b,
        });
    }

    /// Set the expression to be minimised.
    pub fn set_objective(&mut self, objective: QuadExpr) {
        self.objective = Some(objective);
    }

    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    /// Count the rows of the conic program this model assembles into.
    pub fn stats(&self) -> ModelStats {
        let mut stats = ModelStats {
            num_vars: self.vars.len(),
            num_cones: self.cones.len(),
            ..Default::default()
        };

        for v in self.vars.iter() {
            if v.lb == v.ub {
                stats.num_eq_rows += 1;
            } else {
                stats.num_ineq_rows += v.lb.is_finite() as usize + v.ub.is_finite() as usize;
            }
        }
        for c in self.constraints.iter() {
            match c.relation {
                Relation::Eq => stats.num_eq_rows += 1,
                _ => stats.num_ineq_rows += 1,
            }
        }

        stats
    }

    /// Solve the model, returning the optimal point or the reason there is
    /// none.
    pub fn solve(&self, params: &SolverParams) -> Result<Solution, SolveError> {
        let objective = self.objective.as_ref().ok_or(SolveError::NoObjective)?;
        self.validate()?;

        let n = self.vars.len();
        let stats = self.stats();
        debug!(
            "Assembling model \"{}\": {} variables, {} equality rows, {} inequality rows, {} cones",
            self.name, stats.num_vars, stats.num_eq_rows, stats.num_ineq_rows, stats.num_cones
        );

        // ---- COST ----

        let mut p = Triplets::default();
        for (v1, v2, c) in objective.quad_terms() {
            let (i, j) = if v1.0 <= v2.0 { (v1.0, v2.0) } else { (v2.0, v1.0) };
            // 1/2 z'Pz counts off-diagonal entries twice
            let val = if i == j { 2.0 * c } else { *c };
            p.entries.push((i, j, val));
        }
        p.rows = n;

        let mut q = vec![0.0; n];
        for (v, c) in objective.linear().terms() {
            q[v.0] += c;
        }

        // ---- CONSTRAINTS ----

        let mut a = Triplets::default();
        let mut b = Vec::new();

        // Zero cone: fixed variables then equality constraints
        for (j, v) in self.vars.iter().enumerate() {
            if v.lb == v.ub {
                a.push_row(&[(j, 1.0)]);
                b.push(v.lb);
            }
        }
        for c in self.constraints.iter().filter(|c| c.relation == Relation::Eq) {
            a.push_row(&dense_terms(&c.expr));
            b.push(c.rhs - c.expr.constant_term());
        }
        let num_eq = b.len();

        // Nonnegative cone: bounds then inequality constraints
        for (j, v) in self.vars.iter().enumerate() {
            if v.lb == v.ub {
                continue;
            }
            if v.lb.is_finite() {
                a.push_row(&[(j, -1.0)]);
                b.push(-v.lb);
            }
            if v.ub.is_finite() {
                a.push_row(&[(j, 1.0)]);
                b.push(v.ub);
            }
        }
        for c in self.constraints.iter() {
            let sign = match c.relation {
                Relation::Eq => continue,
                Relation::Le => 1.0,
                Relation::Ge => -1.0,
            };
            let row: Vec<(usize, f64)> = dense_terms(&c.expr)
                .into_iter()
                .map(|(j, v)| (j, sign * v))
                .collect();
            a.push_row(&row);
            b.push(sign * (c.rhs - c.expr.constant_term()));
        }
        let num_ineq = b.len() - num_eq;

        // Second order cones: s = (a + b, q, a - b), |(q, a - b)| <= a + b
        for cone in self.cones.iter() {
            a.push_row(&[(cone.a.0, -1.0), (cone.b.0, -1.0)]);
            a.push_row(&[(cone.q.0, -1.0)]);
            a.push_row(&[(cone.a.0, -1.0), (cone.b.0, 1.0)]);
            b.extend_from_slice(&[0.0, 0.0, 0.0]);
        }

        let mut cones: Vec<SupportedConeT<f64>> = Vec::new();
        if num_eq > 0 {
            cones.push(ZeroConeT(num_eq));
        }
        if num_ineq > 0 {
            cones.push(NonnegativeConeT(num_ineq));
        }
        cones.extend(self.cones.iter().map(|_| SecondOrderConeT(3)));

        let p_csc = p.into_csc(n, n, true);
        let a_csc = a.into_csc(b.len(), n, false);

        // ---- SOLVE ----

        let settings = DefaultSettingsBuilder::default()
            .max_iter(params.max_iter)
            .time_limit(params.time_limit_s.unwrap_or(std::f64::INFINITY))
            .tol_feas(params.tol_feas)
            .tol_gap_abs(params.tol_gap_abs)
            .tol_gap_rel(params.tol_gap_rel)
            .verbose(params.verbose)
            .build()
            .map_err(|e| SolveError::Setup(format!("invalid solver settings: {:?}", e)))?;

        let mut solver = DefaultSolver::new(&p_csc, &q, &a_csc, &b, &cones, settings)
            .map_err(|e| SolveError::Setup(format!("{:?}", e)))?;
        solver.solve();

        let sol = &solver.solution;
        let raw_status = format!("{:?}", sol.status);
        debug!(
            "Solver finished with status {} after {} iterations ({:.3} s)",
            raw_status, sol.iterations, sol.solve_time
        );

        let status = match sol.status {
            SolverStatus::Solved => SolveStatus::Optimal,
            SolverStatus::AlmostSolved => {
                warn!("Model \"{}\" solved to reduced accuracy only", self.name);
                SolveStatus::AlmostOptimal
            }
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
                return Err(SolveError::Infeasible { status: raw_status })
            }
            SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
                return Err(SolveError::Unbounded { status: raw_status })
            }
            SolverStatus::MaxTime => {
                return Err(SolveError::TimeLimit {
                    limit_s: params.time_limit_s.unwrap_or(std::f64::INFINITY),
                })
            }
            _ => return Err(SolveError::Failed { status: raw_status }),
        };

        let objective_value = sol.obj_val + objective.linear().constant_term();
        debug!("Optimal objective: {}", objective_value);

        Ok(Solution {
            values: sol.x.clone(),
            objective: objective_value,
            status,
            iterations: sol.iterations,
            solve_time_s: sol.solve_time,
        })
    }

    /// Check every variable reference and bound before assembly.
    fn validate(&self) -> Result<(), SolveError> {
        let n = self.vars.len();
        let check = |var: &Var, context: &str| {
            if var.0 < n {
                Ok(())
            } else {
                Err(SolveError::Setup(format!(
                    "{} references unknown variable {}",
                    context, var.0
                )))
            }
        };

        for v in self.vars.iter() {
            if v.lb > v.ub || v.lb.is_nan() || v.ub.is_nan() {
                return Err(SolveError::Setup(format!(
                    "variable {} has invalid bounds [{}, {}]",
                    v.name, v.lb, v.ub
                )));
            }
        }
        for c in self.constraints.iter() {
            for (v, _) in c.expr.terms() {
                check(v, &c.name)?;
            }
        }
        for c in self.cones.iter() {
            for v in [c.q, c.a, c.b].iter() {
                check(v, &c.name)?;
            }
        }
        if let Some(obj) = &self.objective {
            for (v1, v2, _) in obj.quad_terms() {
                check(v1, "objective")?;
                check(v2, "objective")?;
            }
            for (v, _) in obj.linear().terms() {
                check(v, "objective")?;
            }
        }

        Ok(())
    }
}

impl Solution {
    /// Optimal value of a variable.
    pub fn value(&self, var: Var) -> f64 {
        self.values[var.0]
    }

    /// All variable values, indexed by [`Var::index`].
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Optimal objective value, including the objective's constant term.
    pub fn objective_value(&self) -> f64 {
        self.objective
    }

    pub fn status(&self) -> SolveStatus {
        self.status
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn solve_time_s(&self) -> f64 {
        self.solve_time_s
    }
}

impl Triplets {
    fn push_row(&mut self, row: &[(usize, f64)]) {
        for (j, v) in row {
            self.entries.push((self.rows, *j, *v));
        }
        self.rows += 1;
    }

    /// Convert to compressed sparse column form, summing duplicate entries.
    fn into_csc(mut self, nrows: usize, ncols: usize, upper_tri: bool) -> CscMatrix<f64> {
        self.entries.sort_by(|x, y| (x.1, x.0).cmp(&(y.1, y.0)));

        let mut colptr = vec![0usize; ncols + 1];
        let mut rowval: Vec<usize> = Vec::new();
        let mut nzval: Vec<f64> = Vec::new();
        let mut last: Option<(usize, usize)> = None;

        for (i, j, v) in self.entries {
            debug_assert!(!upper_tri || i <= j);
            if last == Some((i, j)) {
                if let Some(val) = nzval.last_mut() {
                    *val += v;
                }
                continue;
            }
            rowval.push(i);
            nzval.push(v);
            colptr[j + 1] += 1;
            last = Some((i, j));
        }

        for j in 0..ncols {
            colptr[j + 1] += colptr[j];
        }

        CscMatrix::new(nrows, ncols, colptr, rowval, nzval)
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Collect the terms of an expression as `(column, coeff)` pairs.
fn dense_terms(expr: &LinExpr) -> Vec<(usize, f64)> {
    expr.terms().iter().map(|(v, c)| (v.0, *c)).collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_small_qp() {
        // min x^2 + y^2  s.t.  x + y = 2,  x <= 0.5
        let mut m = Model::new("qp");
        let x = m.add_var("x", f64::NEG_INFINITY, 0.5);
        let y = m.add_var("y", f64::NEG_INFINITY, f64::INFINITY);
        m.add_constr(x * 1.0 + y * 1.0, Relation::Eq, 2.0, "sum");

        let mut obj = QuadExpr::new();
        obj.add_quad_term(x, x, 1.0).add_quad_term(y, y, 1.0);
        m.set_objective(obj);

        let sol = m.solve(&SolverParams::default()).unwrap();
        assert_relative_eq!(sol.value(x), 0.5, epsilon = 1e-6);
        assert_relative_eq!(sol.value(y), 1.5, epsilon = 1e-6);
        assert_relative_eq!(sol.objective_value(), 2.5, epsilon = 1e-6);
    }

    #[test]
    fn test_rotated_cone() {
        // max q  s.t.  q^2 <= 4 a b,  a <= 1,  b <= 4  gives q = 4
        let mut m = Model::new("cone");
        let q = m.add_var("q", 0.0, f64::INFINITY);
        let a = m.add_var("a", 0.0, 1.0);
        let b = m.add_var("b", 0.0, 4.0);
        m.add_rotated_cone(q, a, b, "cone");
        m.set_objective(QuadExpr::from(-LinExpr::from(q)));

        let sol = m.solve(&SolverParams::default()).unwrap();
        assert_relative_eq!(sol.value(q), 4.0, epsilon = 1e-5);
        assert_relative_eq!(sol.objective_value(), -4.0, epsilon = 1e-5);
    }

    #[test]
    fn test_infeasible() {
        let mut m = Model::new("infeasible");
        let x = m.add_var("x", 0.0, 1.0);
        m.add_constr(LinExpr::from(x), Relation::Ge, 2.0, "too_big");
        m.set_objective(QuadExpr::from(LinExpr::from(x)));

        assert!(matches!(
            m.solve(&SolverParams::default()),
            Err(SolveError::Infeasible { .. })
        ));
    }

    #[test]
    fn test_unbounded() {
        let mut m = Model::new("unbounded");
        let x = m.add_var("x", f64::NEG_INFINITY, 0.0);
        m.set_objective(QuadExpr::from(LinExpr::from(x)));

        assert!(matches!(
            m.solve(&SolverParams::default()),
            Err(SolveError::Unbounded { .. })
        ));
    }

    #[test]
    fn test_objective_constant_and_fixed_var() {
        let mut m = Model::new("fixed");
        let x = m.add_var("x", 3.0, 3.0);
        let mut obj = QuadExpr::new();
        obj.add_quad_term(x, x, 1.0)
            .add_linear(&LinExpr::constant(1.0), 1.0);
        m.set_objective(obj);

        assert_eq!(m.stats().num_eq_rows, 1);
        let sol = m.solve(&SolverParams::default()).unwrap();
        assert_relative_eq!(sol.value(x), 3.0, epsilon = 1e-6);
        assert_relative_eq!(sol.objective_value(), 10.0, epsilon = 1e-5);
    }

    #[test]
    fn test_missing_objective() {
        let mut m = Model::new("empty");
        m.add_var("x", 0.0, 1.0);
        assert!(matches!(
            m.solve(&SolverParams::default()),
            Err(SolveError::NoObjective)
        ));
    }

    /// max q  s.t.  q^2 <= 4 a b  and  a + b <= 3, which needs several
    /// interior point iterations.
    fn cone_model() -> (Model, Var) {
        let mut m = Model::new("cone");
        let q = m.add_var("q", 0.0, f64::INFINITY);
        let a = m.add_var("a", 0.0, f64::INFINITY);
        let b = m.add_var("b", 0.0, f64::INFINITY);
        m.add_constr(a * 1.0 + b * 1.0, Relation::Le, 3.0, "budget");
        m.add_rotated_cone(q, a, b, "cone");
        m.set_objective(QuadExpr::from(-LinExpr::from(q)));
        (m, q)
    }

    #[test]
    fn test_cone_model_solves() {
        let (m, q) = cone_model();
        let sol = m.solve(&SolverParams::default()).unwrap();
        assert_relative_eq!(sol.value(q), 3.0, epsilon = 1e-5);
    }

    #[test]
    fn test_time_limit() {
        let (m, _) = cone_model();
        let params = SolverParams {
            time_limit_s: Some(1e-12),
            ..SolverParams::default()
        };

        match m.solve(&params) {
            Err(SolveError::TimeLimit { limit_s }) => assert_eq!(limit_s, 1e-12),
            other => panic!("expected a time limit, got {:?}", other.map(|s| s.objective_value())),
        }
    }

    #[test]
    fn test_iteration_limit_fails() {
        let (m, _) = cone_model();
        let params = SolverParams {
            max_iter: 1,
            ..SolverParams::default()
        };

        match m.solve(&params) {
            Err(SolveError::Failed { status }) => assert_eq!(status, "MaxIterations"),
            other => panic!("expected a failure, got {:?}", other.map(|s| s.objective_value())),
        }
    }
}
