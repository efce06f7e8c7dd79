//! Bivariate rational correction surfaces.
//!
//! `g(x, y) = (a0 + a1 x + a2 y + a3 x² + a4 y²) / (1 + b1 x + b2 y + b3 x² + b4 y²)`
//!
//! Coefficients come from a linearised least-squares fit. The number of terms
//! grows with the number of samples and treats both axes alike: 3 or 4
//! samples give a plane, 5 to 8 a quadratic without cross term, 9 or more the
//! full rational.

use crate::types::{GeoError, GeoResult};
use nalgebra::{DMatrix, DVector};

const NUMERATOR_TERMS: usize = 5;
const DENOMINATOR_TERMS: usize = 4;
const SVD_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone)]
pub struct RationalSurface {
    numerator: Vec<f64>,
    denominator: Vec<f64>,
    x_offset: f64,
    x_scale: f64,
    y_offset: f64,
    y_scale: f64,
}

impl RationalSurface {
    /// Fit a surface through the samples `g[i]` at `(x[i], y[i])`
    pub fn fit(x: &[f64], y: &[f64], g: &[f64]) -> GeoResult<Self> {
        let n = g.len();
        if x.len() != n || y.len() != n {
            return Err(GeoError::Processing(
                "surface fit inputs differ in length".to_string(),
            ));
        }
        if n == 0 {
            return Err(GeoError::Processing("surface fit without samples".to_string()));
        }

        let (x_offset, x_scale) = normalisation(x);
        let (y_offset, y_scale) = normalisation(y);

        let numerator_terms = match n {
            1 | 2 => 1,
            3 | 4 => 3,
            _ => NUMERATOR_TERMS,
        };
        let denominator_terms = if n >= NUMERATOR_TERMS + DENOMINATOR_TERMS {
            DENOMINATOR_TERMS
        } else {
            0
        };
        let unknowns = numerator_terms + denominator_terms;

        let mut a = DMatrix::<f64>::zeros(n, unknowns);
        let mut b = DVector::<f64>::zeros(n);
        for i in 0..n {
            let t = terms((x[i] - x_offset) / x_scale, (y[i] - y_offset) / y_scale);
            for k in 0..numerator_terms {
                a[(i, k)] = t[k];
            }
            for k in 0..denominator_terms {
                a[(i, numerator_terms + k)] = -g[i] * t[k + 1];
            }
            b[i] = g[i];
        }

        let solution = a
            .svd(true, true)
            .solve(&b, SVD_EPSILON)
            .map_err(|e| GeoError::Processing(format!("rational surface fit failed: {}", e)))?;

        log::debug!(
            "Fitted rational surface with {} numerator and {} denominator terms",
            numerator_terms,
            denominator_terms
        );

        Ok(Self {
            numerator: solution.iter().take(numerator_terms).copied().collect(),
            denominator: solution.iter().skip(numerator_terms).copied().collect(),
            x_offset,
            x_scale,
            y_offset,
            y_scale,
        })
    }

    pub fn value(&self, x: f64, y: f64) -> f64 {
        let t = terms((x - self.x_offset) / self.x_scale, (y - self.y_offset) / self.y_scale);
        let p: f64 = self.numerator.iter().zip(&t).map(|(c, v)| c * v).sum();
        let q: f64 = 1.0 + self.denominator.iter().zip(&t[1..]).map(|(c, v)| c * v).sum::<f64>();

        if q.abs() < f64::EPSILON {
            p
        } else {
            p / q
        }
    }

    pub fn numerator_terms(&self) -> usize {
        self.numerator.len()
    }

    pub fn denominator_terms(&self) -> usize {
        self.denominator.len()
    }
}

fn terms(x: f64, y: f64) -> [f64; NUMERATOR_TERMS] {
    [1.0, x, y, x * x, y * y]
}

fn normalisation(values: &[f64]) -> (f64, f64) {
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let spread = values.iter().map(|v| (v - mean).abs()).fold(0.0, f64::max);
    (mean, if spread > 0.0 { spread } else { 1.0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_three_points_give_plane() {
        let x = [0.0, 100.0, 0.0];
        let y = [0.0, 0.0, 200.0];
        let g: Vec<f64> = x.iter().zip(&y).map(|(a, b)| 1e-4 + 2e-6 * a - 1e-6 * b).collect();

        let surface = RationalSurface::fit(&x, &y, &g).unwrap();
        assert_eq!(surface.numerator_terms(), 3);
        assert_eq!(surface.denominator_terms(), 0);
        assert_abs_diff_eq!(surface.value(50.0, 50.0), 1e-4 + 1e-4 - 5e-5, epsilon = 1e-12);
    }

    #[test]
    fn test_four_points_fit_plane_symmetrically() {
        let x = [0.0, 300.0, 0.0, 300.0];
        let y = [0.0, 0.0, 300.0, 300.0];

        let tilted: Vec<f64> = x.iter().zip(&y).map(|(a, b)| 2e-4 - 1e-6 * a + 3e-7 * b).collect();
        let surface = RationalSurface::fit(&x, &y, &tilted).unwrap();
        assert_eq!(surface.numerator_terms(), 3);
        assert_eq!(surface.denominator_terms(), 0);
        for i in 0..4 {
            assert_abs_diff_eq!(surface.value(x[i], y[i]), tilted[i], epsilon = 1e-15);
        }

        // saddle: the least-squares plane is flat, no curvature along one axis only
        let saddle = [0.0, 1e-4, 1e-4, 0.0];
        let surface = RationalSurface::fit(&x, &y, &saddle).unwrap();
        for &(px, py) in &[(0.0, 300.0), (300.0, 0.0), (75.0, 225.0), (-100.0, 150.0)] {
            assert_abs_diff_eq!(surface.value(px, py), 5e-5, epsilon = 1e-15);
            assert_abs_diff_eq!(surface.value(px, py), surface.value(py, px), epsilon = 1e-15);
        }
    }

    #[test]
    fn test_zero_residuals_give_zero_surface() {
        let x = [10.0, 200.0, 350.0, 40.0];
        let y = [5.0, 300.0, 80.0, 700.0];
        let surface = RationalSurface::fit(&x, &y, &[0.0; 4]).unwrap();

        for &(px, py) in &[(0.0, 0.0), (371.0, 747.0), (150.0, 400.0)] {
            assert_eq!(surface.value(px, py), 0.0);
        }
    }

    #[test]
    fn test_full_rational_reproduces_rational() {
        let x: Vec<f64> = (0..30).map(|i| ((i * 37) % 50) as f64 * 8.0).collect();
        let y: Vec<f64> = (0..30).map(|i| ((i * 53) % 47) as f64 * 16.0).collect();
        let f = |a: f64, b: f64| {
            (1.0 + 0.002 * a + 0.001 * b + 1e-6 * a * a) / (1.0 + 0.0005 * a + 1e-7 * b * b)
        };
        let g: Vec<f64> = x.iter().zip(&y).map(|(a, b)| f(*a, *b)).collect();

        let surface = RationalSurface::fit(&x, &y, &g).unwrap();
        assert_eq!(surface.numerator_terms(), 5);
        assert_eq!(surface.denominator_terms(), 4);
        assert_abs_diff_eq!(surface.value(150.0, 300.0), f(150.0, 300.0), epsilon = 1e-8);
    }

    #[test]
    fn test_mismatched_inputs() {
        assert!(RationalSurface::fit(&[0.0], &[0.0, 1.0], &[0.0]).is_err());
        assert!(RationalSurface::fit(&[], &[], &[]).is_err());
    }
}
