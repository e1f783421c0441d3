//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Evaluate a polynomial whose coefficients are given lowest power first, i.e.
/// `coeffs[0] + coeffs[1]*t + coeffs[2]*t^2 + ...`.
pub fn poly_val_ascending<T>(value: T, coeffs: &[T]) -> T
where
    T: Float,
{
    // Horner's scheme, starting from the highest power
    coeffs
        .iter()
        .rev()
        .fold(T::zero(), |acc, c| acc * value + *c)
}

/// Evaluate the first derivative of a polynomial given lowest power first.
pub fn poly_deriv_ascending<T>(value: T, coeffs: &[T]) -> T
where
    T: Float,
{
    let mut res = T::zero();
    let mut power = T::one();

    for (i, c) in coeffs.iter().enumerate().skip(1) {
        res = res + T::from(i).unwrap_or_else(T::nan) * *c * power;
        power = power * value;
    }

    res
}

/// The definite integral of `t^power` over `[t1, t2]`.
pub fn monomial_integral<T>(power: usize, t1: T, t2: T) -> T
where
    T: Float,
{
    let exp = (power + 1) as i32;
    let denom = T::from(exp).unwrap_or_else(T::nan);

    (t2.powi(exp) - t1.powi(exp)) / denom
}

/// Return `num` evenly spaced samples from `start` to `end` inclusive.
///
/// `start` may be greater than `end`, in which case the samples decrease.
pub fn linspace<T>(start: T, end: T, num: usize) -> Vec<T>
where
    T: Float,
{
    match num {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let steps = T::from(num - 1).unwrap_or_else(T::nan);
            let mut samples: Vec<T> = (0..num)
                .map(|i| start + (end - start) * T::from(i).unwrap_or_else(T::nan) / steps)
                .collect();

            // Pin the last sample exactly to the end of the range
            samples[num - 1] = end;
            samples
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_poly_val_ascending() {
        // 1 + 2t + 3t^2 at t = 2
        assert_eq!(poly_val_ascending(2f64, &[1.0, 2.0, 3.0]), 17.0);
        assert_eq!(poly_val_ascending(5f64, &[4.0]), 4.0);
        assert_eq!(poly_val_ascending(5f64, &[]), 0.0);
    }

    #[test]
    fn test_poly_deriv_ascending() {
        // d/dt (1 + 2t + 3t^2) = 2 + 6t
        assert_eq!(poly_deriv_ascending(2f64, &[1.0, 2.0, 3.0]), 14.0);
        assert_eq!(poly_deriv_ascending(2f64, &[1.0]), 0.0);
    }

    #[test]
    fn test_monomial_integral() {
        assert_relative_eq!(monomial_integral(0, 1f64, 3f64), 2.0);
        assert_relative_eq!(monomial_integral(2, 0f64, 3f64), 9.0);
        assert_relative_eq!(monomial_integral(5, 1f64, 2f64), 63.0 / 6.0);
    }

    #[test]
    fn test_linspace() {
        let s = linspace(0f64, 1f64, 5);
        assert_eq!(s, vec![0.0, 0.25, 0.5, 0.75, 1.0]);

        let r = linspace(2f64, 0f64, 3);
        assert_eq!(r, vec![2.0, 1.0, 0.0]);

        assert!(linspace(0f64, 1f64, 0).is_empty());
    }
}
