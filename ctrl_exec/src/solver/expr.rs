//! Linear and quadratic expressions over model variables

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::ops::{Add, Mul, Neg, Sub};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Handle to a decision variable of a [`super::Model`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Var(pub(crate) usize);

/// An affine expression `sum(coeff * var) + constant`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinExpr {
    terms: Vec<(Var, f64)>,
    constant: f64,
}

/// A quadratic expression `sum(coeff * var1 * var2) + linear`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuadExpr {
    quad_terms: Vec<(Var, Var, f64)>,
    linear: LinExpr,
}

/// Relation between the two sides of a linear constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// `expr == rhs`
    Eq,

    /// `expr <= rhs`
    Le,

    /// `expr >= rhs`
    Ge,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Var {
    /// Position of the variable in the model's solution vector.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl LinExpr {
    pub fn new() -> Self {
        Self::default()
    }

    /// An expression with no variable terms.
    pub fn constant(value: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    /// Add `coeff * var` to the expression.
    pub fn add_term(&mut self, var: Var, coeff: f64) -> &mut Self {
        self.terms.push((var, coeff));
        self
    }

    /// Builder form of [`LinExpr::add_term`].
    pub fn with_term(mut self, var: Var, coeff: f64) -> Self {
        self.add_term(var, coeff);
        self
    }

    pub fn add_constant(&mut self, value: f64) -> &mut Self {
        self.constant += value;
        self
    }

    /// Add `scale * other` to the expression.
    pub fn add_expr(&mut self, other: &LinExpr, scale: f64) -> &mut Self {
        self.terms
            .extend(other.terms.iter().map(|(v, c)| (*v, c * scale)));
        self.constant += other.constant * scale;
        self
    }

    /// The variable terms, possibly with repeated variables.
    pub fn terms(&self) -> &[(Var, f64)] {
        &self.terms
    }

    pub fn constant_term(&self) -> f64 {
        self.constant
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Evaluate the expression for the given variable values.
    pub fn eval(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(v, c)| c * values[v.0])
            .sum::<f64>()
            + self.constant
    }
}

impl QuadExpr {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `coeff * var1 * var2` to the expression.
    pub fn add_quad_term(&mut self, var1: Var, var2: Var, coeff: f64) -> &mut Self {
        self.quad_terms.push((var1, var2, coeff));
        self
    }

    /// Add `scale * expr` to the linear part of the expression.
    pub fn add_linear(&mut self, expr: &LinExpr, scale: f64) -> &mut Self {
        self.linear.add_expr(expr, scale);
        self
    }

    /// Add another quadratic expression.
    pub fn add_quad(&mut self, other: &QuadExpr) -> &mut Self {
        self.quad_terms.extend_from_slice(&other.quad_terms);
        self.linear.add_expr(&other.linear, 1.0);
        self
    }

    pub fn quad_terms(&self) -> &[(Var, Var, f64)] {
        &self.quad_terms
    }

    pub fn linear(&self) -> &LinExpr {
        &self.linear
    }

    /// Evaluate the expression for the given variable values.
    pub fn eval(&self, values: &[f64]) -> f64 {
        self.quad_terms
            .iter()
            .map(|(v1, v2, c)| c * values[v1.0] * values[v2.0])
            .sum::<f64>()
            + self.linear.eval(values)
    }
}

impl From<Var> for LinExpr {
    fn from(var: Var) -> Self {
        LinExpr::new().with_term(var, 1.0)
    }
}

impl From<LinExpr> for QuadExpr {
    fn from(linear: LinExpr) -> Self {
        Self {
            quad_terms: Vec::new(),
            linear,
        }
    }
}

impl Mul<f64> for Var {
    type Output = LinExpr;

    fn mul(self, rhs: f64) -> LinExpr {
        LinExpr::new().with_term(self, rhs)
    }
}

impl Mul<f64> for LinExpr {
    type Output = LinExpr;

    fn mul(mut self, rhs: f64) -> LinExpr {
        for (_, c) in self.terms.iter_mut() {
            *c *= rhs;
        }
        self.constant *= rhs;
        self
    }
}

impl Add for LinExpr {
    type Output = LinExpr;

    fn add(mut self, rhs: LinExpr) -> LinExpr {
        self.add_expr(&rhs, 1.0);
        self
    }
}

impl Sub for LinExpr {
    type Output = LinExpr;

    fn sub(mut self, rhs: LinExpr) -> LinExpr {
        self.add_expr(&rhs, -1.0);
        self
    }
}

impl Neg for LinExpr {
    type Output = LinExpr;

    fn neg(self) -> LinExpr {
        self * -1.0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_lin_expr_ops() {
        let (x, y) = (Var(0), Var(1));
        let e = x * 2.0 + (y * 3.0 - LinExpr::constant(1.0));

        assert_eq!(e.eval(&[1.0, 2.0]), 7.0);
        assert_eq!((-e.clone()).eval(&[1.0, 2.0]), -7.0);
        assert_eq!(e.constant_term(), -1.0);
        assert_eq!(e.terms().len(), 2);
    }

    #[test]
    fn test_quad_expr_eval() {
        let (x, y) = (Var(0), Var(1));
        let mut q = QuadExpr::new();
        q.add_quad_term(x, y, 2.0)
            .add_quad_term(y, y, 1.0)
            .add_linear(&LinExpr::from(x), 4.0);

        // 2*3*5 + 25 + 12
        assert_eq!(q.eval(&[3.0, 5.0]), 67.0);
    }
}
