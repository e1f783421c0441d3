//! # Control parametrizations
//!
//! Each control channel `i` is a polynomial on every segment
//! `[t_k, t_{k+1}]`, reported in absolute time:
//!
//! ```text
//! u_i(t) = p[i,k,0] + p[i,k,1] t + p[i,k,2] t^2
//! ```
//!
//! truncated to the degree of the basis. Inside the model each segment is
//! written in its own local coordinate instead, see [`CoeffVars`].
//!
//! A [`ControlBasis`] owns everything that depends on that degree: the
//! coefficient variables, the continuity constraints between segments and
//! the encoding of the box `L1 <= u <= L2`.
//! Terminal constraints and the objective are shared across bases and only
//! depend on the number of coefficients per segment.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod constant;
mod linear;
mod quadratic;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Internal
use crate::{
    objective,
    params::SearchParams,
    problem::Problem,
    reach::ReachMap,
    solver::{LinExpr, Model, QuadExpr, Relation, Var},
};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The polynomial family used for the control on each segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlBasis {
    /// Piecewise constant, discontinuous at segment boundaries
    Constant,

    /// Piecewise linear, continuous
    Linear,

    /// Piecewise quadratic, continuous with a continuous first derivative
    QuadraticSpline,
}

/// Error returned when parsing an unknown basis name.
#[derive(Debug, thiserror::Error, PartialEq)]
#[error("Unknown control basis \"{0}\", expected one of constant, linear, quadratic")]
pub struct UnknownBasis(pub String);

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The coefficient variables of a model, laid out with the same offsets as
/// the [`ReachMap`] columns.
///
/// The solver works with segment-local coefficients a[i,k,o] of
///
/// ```text
/// u_i(t) = sum_o a[i,k,o] s^o,    s = (t - t_k) / w
/// ```
///
/// which keep every row of the model on a scale independent of `T`. They map
/// exactly onto the absolute coefficients p[i,k,o] through
/// [`CoeffVars::to_absolute`].
#[derive(Debug, Clone)]
pub struct CoeffVars {
    num_channels: usize,
    num_segments: usize,
    num_orders: usize,
    horizon_s: f64,
    vars: Vec<Var>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ControlBasis {
    /// All bases, lowest degree first.
    pub const ALL: [ControlBasis; 3] = [
        ControlBasis::Constant,
        ControlBasis::Linear,
        ControlBasis::QuadraticSpline,
    ];

    /// Polynomial degree of each segment.
    pub fn degree(&self) -> usize {
        match self {
            ControlBasis::Constant => 0,
            ControlBasis::Linear => 1,
            ControlBasis::QuadraticSpline => 2,
        }
    }

    /// Number of coefficients per channel and segment.
    pub fn num_orders(&self) -> usize {
        self.degree() + 1
    }

    /// Short name, as accepted by [`FromStr`].
    pub fn name(&self) -> &'static str {
        match self {
            ControlBasis::Constant => "constant",
            ControlBasis::Linear => "linear",
            ControlBasis::QuadraticSpline => "quadratic",
        }
    }

    /// Title of the model built for this basis.
    pub fn model_name(&self) -> &'static str {
        match self {
            ControlBasis::Constant => "Optimal Piecewise Constant Control",
            ControlBasis::Linear => "Optimal Piecewise Linear Control",
            ControlBasis::QuadraticSpline => "Optimal Quadratic Spline Control",
        }
    }

    /// Declare the coefficient variables of every channel and segment.
    pub fn declare_variables(&self, model: &mut Model, problem: &Problem) -> CoeffVars {
        match self {
            ControlBasis::Constant => constant::declare_variables(model, problem),
            ControlBasis::Linear | ControlBasis::QuadraticSpline => {
                CoeffVars::declare_free(model, problem, self.num_orders())
            }
        }
    }

    /// Constrain neighbouring segments to join at every interior breakpoint.
    pub fn add_continuity(&self, model: &mut Model, vars: &CoeffVars) {
        match self {
            ControlBasis::Constant => (),
            ControlBasis::Linear => linear::add_continuity(model, vars),
            ControlBasis::QuadraticSpline => quadratic::add_continuity(model, vars),
        }
    }

    /// Keep every channel within `[L1, L2]`.
    pub fn add_box_constraints(&self, model: &mut Model, problem: &Problem, vars: &CoeffVars) {
        match self {
            // Expressed by the variable bounds themselves
            ControlBasis::Constant => (),
            ControlBasis::Linear => linear::add_box_constraints(model, problem, vars),
            ControlBasis::QuadraticSpline => {
                quadratic::add_box_constraints(model, problem, vars)
            }
        }
    }

    /// Constrain `H x(T) = g` through the reachability map.
    pub fn add_terminal_constraints(&self, model: &mut Model, reach: &ReachMap, vars: &CoeffVars) {
        let h = reach.residual_target();

        for l in 0..h.len() {
            let row = reach.terminal_row(l);
            let mut expr = LinExpr::new();

            for i in 0..vars.num_channels() {
                for k in 0..vars.num_segments() {
                    let start = reach.index(i, k, 0);
                    let local = vars.pull_back(k, &row[start..start + vars.num_orders()]);

                    for (o, coeff) in local.iter().enumerate() {
                        if *coeff != 0.0 {
                            expr.add_term(vars.get(i, k, o), *coeff);
                        }
                    }
                }
            }

            model.add_constr(expr, Relation::Eq, h[l], format!("terminal[{}]", l));
        }

        debug!("{} terminal constraints added", h.len());
    }

    /// The basis' contribution to the objective: the control effort, the
    /// terminal cost and, for piecewise constant control, the absolute value
    /// penalty.
    pub fn objective_terms(
        &self,
        model: &mut Model,
        problem: &Problem,
        reach: &ReachMap,
        vars: &CoeffVars,
        params: &SearchParams,
    ) -> QuadExpr {
        let mut obj = objective::effort_cost(problem, vars, params.negligible_threshold);
        obj.add_linear(&objective::terminal_cost(reach, vars), 1.0);

        if let ControlBasis::Constant = self {
            let abs = constant::abs_penalty(model, problem, vars, params.negligible_threshold);
            obj.add_linear(&abs, 1.0);
        }

        obj
    }
}

impl fmt::Display for ControlBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ControlBasis {
    type Err = UnknownBasis;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "constant" | "pcc" => Ok(ControlBasis::Constant),
            "linear" | "plc" => Ok(ControlBasis::Linear),
            "quadratic" | "quadratic_spline" | "qsc" => Ok(ControlBasis::QuadraticSpline),
            _ => Err(UnknownBasis(s.to_string())),
        }
    }
}

impl CoeffVars {
    /// Declare unbounded coefficients a[i,k,o] for `num_orders` orders.
    pub(crate) fn declare_free(model: &mut Model, problem: &Problem, num_orders: usize) -> Self {
        Self::declare(model, problem, num_orders, |model, i, k, o| {
            model.add_var(
                format!("a[{},{},{}]", i, k, o),
                std::f64::NEG_INFINITY,
                std::f64::INFINITY,
            )
        })
    }

    /// Declare one variable per coefficient using `add` in channel, segment,
    /// order order.
    pub(crate) fn declare<F>(model: &mut Model, problem: &Problem, num_orders: usize, mut add: F) -> Self
    where
        F: FnMut(&mut Model, usize, usize, usize) -> Var,
    {
        let num_channels = problem.num_controls();
        let num_segments = problem.num_segments();
        let mut vars = Vec::with_capacity(num_channels * num_segments * num_orders);

        for i in 0..num_channels {
            for k in 0..num_segments {
                for o in 0..num_orders {
                    vars.push(add(model, i, k, o));
                }
            }
        }

        Self {
            num_channels,
            num_segments,
            num_orders,
            horizon_s: problem.horizon_s(),
            vars,
        }
    }

    /// The variable of the local coefficient a[i,k,o].
    pub fn get(&self, channel: usize, segment: usize, order: usize) -> Var {
        self.vars[(channel * self.num_segments + segment) * self.num_orders + order]
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    pub fn num_segments(&self) -> usize {
        self.num_segments
    }

    pub fn num_orders(&self) -> usize {
        self.num_orders
    }

    /// Width of every segment.
    ///
    /// Units: seconds
    pub fn width_s(&self) -> f64 {
        self.horizon_s / self.num_segments as f64
    }

    /// Start time of segment `k`.
    pub fn segment_start_s(&self, segment: usize) -> f64 {
        self.horizon_s * segment as f64 / self.num_segments as f64
    }

    /// Every variable, in [`ReachMap::index`] order.
    pub fn all(&self) -> &[Var] {
        &self.vars
    }

    /// The value of channel `i` on segment `k` at local position `s`, as an
    /// expression.
    pub fn value_at(&self, channel: usize, segment: usize, s: f64) -> LinExpr {
        let mut expr = LinExpr::new();
        for o in 0..self.num_orders {
            expr.add_term(self.get(channel, segment, o), s.powi(o as i32));
        }
        expr
    }

    /// The time derivative of channel `i` on segment `k` at local position
    /// `s`.
    pub fn slope_at(&self, channel: usize, segment: usize, s: f64) -> LinExpr {
        let width = self.width_s();
        let mut expr = LinExpr::new();
        for o in 1..self.num_orders {
            expr.add_term(
                self.get(channel, segment, o),
                o as f64 * s.powi(o as i32 - 1) / width,
            );
        }
        expr
    }

    /// The absolute time coefficient p[i,k,2] of a quadratic segment,
    /// `a[i,k,2] / w^2`.
    pub fn curvature(&self, channel: usize, segment: usize) -> LinExpr {
        let width = self.width_s();
        LinExpr::from(self.get(channel, segment, 2)) * (1.0 / (width * width))
    }

    /// Convert the local coefficients of segment `k` to absolute time
    /// coefficients p.
    pub fn to_absolute(&self, segment: usize, local: &[f64]) -> Vec<f64> {
        let m = self.basis_change(segment);
        (0..self.num_orders)
            .map(|o| (0..self.num_orders).map(|j| m[o][j] * local[j]).sum())
            .collect()
    }

    /// Rewrite the linear form `sum_o c[o] p[o]` of segment `k`'s absolute
    /// coefficients as a form in its local coefficients.
    pub fn pull_back(&self, segment: usize, absolute: &[f64]) -> Vec<f64> {
        let m = self.basis_change(segment);
        (0..self.num_orders)
            .map(|j| (0..self.num_orders).map(|o| absolute[o] * m[o][j]).sum())
            .collect()
    }

    /// The matrix M with `p = M a` on segment `k`.
    ///
    /// Expanding `((t - t_k) / w)^j` gives
    /// `M[o][j] = C(j, o) (-t_k)^(j - o) / w^j` for `o <= j`.
    fn basis_change(&self, segment: usize) -> Vec<Vec<f64>> {
        let t_k = self.segment_start_s(segment);
        let width = self.width_s();
        let mut m = vec![vec![0.0; self.num_orders]; self.num_orders];

        for j in 0..self.num_orders {
            let scale = width.powi(j as i32);
            for o in 0..=j {
                m[o][j] = binomial(j, o) * (-t_k).powi((j - o) as i32) / scale;
            }
        }

        m
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn binomial(n: usize, k: usize) -> f64 {
    (0..k).fold(1.0, |acc, i| acc * (n - i) as f64 / (i + 1) as f64)
}
