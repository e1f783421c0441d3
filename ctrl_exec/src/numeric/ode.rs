//! Linear ODE propagation

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{DMatrix, DVector};

use super::NumericError;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Propagate `dx/dt = A x` from `x0` at `t_grid[0]` along `t_grid`, returning
/// the state at every grid sample.
///
/// The grid may be decreasing, in which case the system is propagated
/// backwards in time. Each grid interval is covered by `substeps` classical
/// RK4 steps.
pub fn propagate(
    a: &DMatrix<f64>,
    x0: &DVector<f64>,
    t_grid: &[f64],
    substeps: usize,
) -> Result<Vec<DVector<f64>>, NumericError> {
    propagate_affine(a, None, x0, t_grid, substeps)
}

/// Propagate the affine system `dx/dt = A x + f(t)` along `t_grid`.
///
/// `forcing` is evaluated at the RK4 stage times; when it is `None` the system
/// is homogeneous.
pub fn propagate_affine(
    a: &DMatrix<f64>,
    forcing: Option<&dyn Fn(f64) -> DVector<f64>>,
    x0: &DVector<f64>,
    t_grid: &[f64],
    substeps: usize,
) -> Result<Vec<DVector<f64>>, NumericError> {
    let substeps = substeps.max(1);
    let mut states = Vec::with_capacity(t_grid.len());

    let mut x = x0.clone();
    if let Some(t0) = t_grid.first() {
        check_finite(&x, *t0)?;
        states.push(x.clone());
    }

    for w in t_grid.windows(2) {
        let dt = (w[1] - w[0]) / substeps as f64;
        let mut t = w[0];

        for _ in 0..substeps {
            x = rk4_step(a, forcing, &x, t, dt);
            t += dt;
        }

        check_finite(&x, w[1])?;
        states.push(x.clone());
    }

    Ok(states)
}

/// Take a single RK4 step of `dx/dt = A x + f(t)`.
pub fn rk4_step(
    a: &DMatrix<f64>,
    forcing: Option<&dyn Fn(f64) -> DVector<f64>>,
    x: &DVector<f64>,
    t: f64,
    dt: f64,
) -> DVector<f64> {
    let f = |t: f64, x: &DVector<f64>| -> DVector<f64> {
        match forcing {
            Some(func) => a * x + func(t),
            None => a * x,
        }
    };

    let k1 = f(t, x);
    let k2 = f(t + dt / 2.0, &(x + &k1 * (dt / 2.0)));
    let k3 = f(t + dt / 2.0, &(x + &k2 * (dt / 2.0)));
    let k4 = f(t + dt, &(x + &k3 * dt));

    x + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (dt / 6.0)
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn check_finite(x: &DVector<f64>, t: f64) -> Result<(), NumericError> {
    if x.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(NumericError::Diverged { t })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use util::maths::linspace;

    #[test]
    fn test_exponential_decay() {
        let a = DMatrix::from_element(1, 1, -1.0);
        let x0 = DVector::from_element(1, 1.0);
        let grid = linspace(0.0, 2.0, 201);

        let xs = propagate(&a, &x0, &grid, 4).unwrap();
        assert_eq!(xs.len(), 201);
        assert_relative_eq!(xs[200][0], (-2.0f64).exp(), epsilon = 1e-10);
    }

    #[test]
    fn test_backward_rotation() {
        // dz/dt = -A z with A the harmonic oscillator, propagated from T to 0
        let a = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, -1.0, 0.0]);
        let x0 = DVector::from_vec(vec![0.0, 1.0]);
        let grid = linspace(std::f64::consts::PI, 0.0, 101);

        let zs = propagate(&(-&a), &x0, &grid, 4).unwrap();

        // z(t) = exp(A (T - t)) b, at t = 0 this is a half rotation
        assert_relative_eq!(zs[100][0], 0.0, epsilon = 1e-8);
        assert_relative_eq!(zs[100][1], -1.0, epsilon = 1e-8);
    }

    #[test]
    fn test_divergence() {
        let a = DMatrix::from_element(1, 1, 1e200);
        let x0 = DVector::from_element(1, 1.0);
        let grid = linspace(0.0, 1.0, 11);

        assert!(matches!(
            propagate(&a, &x0, &grid, 1),
            Err(NumericError::Diverged { .. })
        ));
    }

    #[test]
    fn test_affine_forcing() {
        // dx/dt = 1 from 0 gives x(t) = t
        let a = DMatrix::zeros(1, 1);
        let x0 = DVector::zeros(1);
        let grid = linspace(0.0, 3.0, 4);
        let one = |_t: f64| DVector::from_element(1, 1.0);

        let xs = propagate_affine(&a, Some(&one), &x0, &grid, 1).unwrap();
        assert_relative_eq!(xs[3][0], 3.0, epsilon = 1e-12);
    }
}
