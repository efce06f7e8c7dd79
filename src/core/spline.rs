//! Natural cubic splines for trajectory interpolation.

use crate::types::{GeoError, GeoResult};

/// Natural cubic spline through a strictly increasing set of knots
#[derive(Debug, Clone)]
pub struct NaturalCubicSpline {
    x: Vec<f64>,
    a: Vec<f64>,
    b: Vec<f64>,
    c: Vec<f64>,
    d: Vec<f64>,
}

impl NaturalCubicSpline {
    pub fn new(x: &[f64], y: &[f64]) -> GeoResult<Self> {
        if x.len() != y.len() {
            return Err(GeoError::Processing(format!(
                "spline abscissae ({}) and ordinates ({}) differ in length",
                x.len(),
                y.len()
            )));
        }
        if x.len() < 3 {
            return Err(GeoError::Processing(format!(
                "at least 3 knots are required for a cubic spline, got {}",
                x.len()
            )));
        }
        if let Some(i) = x.windows(2).position(|w| !(w[1] > w[0])) {
            return Err(GeoError::Processing(format!(
                "spline knots not strictly increasing at index {}",
                i + 1
            )));
        }

        let n = x.len() - 1;
        let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();

        // forward sweep of the tridiagonal system for the second-order coefficients
        let mut mu = vec![0.0; n];
        let mut z = vec![0.0; n + 1];
        for i in 1..n {
            let g = 2.0 * (x[i + 1] - x[i - 1]) - h[i - 1] * mu[i - 1];
            mu[i] = h[i] / g;
            z[i] = (3.0 * (y[i + 1] * h[i - 1] - y[i] * (x[i + 1] - x[i - 1]) + y[i - 1] * h[i])
                / (h[i - 1] * h[i])
                - h[i - 1] * z[i - 1])
                / g;
        }

        let mut b = vec![0.0; n];
        let mut c = vec![0.0; n + 1];
        let mut d = vec![0.0; n];
        for j in (0..n).rev() {
            c[j] = z[j] - mu[j] * c[j + 1];
            b[j] = (y[j + 1] - y[j]) / h[j] - h[j] * (c[j + 1] + 2.0 * c[j]) / 3.0;
            d[j] = (c[j + 1] - c[j]) / (3.0 * h[j]);
        }
        c.truncate(n);

        Ok(Self {
            x: x.to_vec(),
            a: y[..n].to_vec(),
            b,
            c,
            d,
        })
    }

    /// Knot range covered by the spline
    pub fn domain(&self) -> (f64, f64) {
        (self.x[0], self.x[self.x.len() - 1])
    }

    /// Spline value at `t`, `None` outside the knot range
    pub fn value(&self, t: f64) -> Option<f64> {
        let (lo, hi) = self.domain();
        if !(t >= lo && t <= hi) {
            return None;
        }

        let segment = self.x.partition_point(|&knot| knot <= t).clamp(1, self.a.len()) - 1;
        let dx = t - self.x[segment];
        Some(self.a[segment] + dx * (self.b[segment] + dx * (self.c[segment] + dx * self.d[segment])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_interpolates_knots_and_lines() {
        let x = [0.0, 1.0, 2.5, 4.0, 7.0];
        let y: Vec<f64> = x.iter().map(|v| 3.0 * v - 2.0).collect();
        let spline = NaturalCubicSpline::new(&x, &y).unwrap();

        for (xi, yi) in x.iter().zip(&y) {
            assert_abs_diff_eq!(spline.value(*xi).unwrap(), *yi, epsilon = 1e-12);
        }
        assert_abs_diff_eq!(spline.value(3.3).unwrap(), 7.9, epsilon = 1e-12);
    }

    #[test]
    fn test_smooth_function_accuracy() {
        let x: Vec<f64> = (0..=60).map(|i| i as f64 * 0.1).collect();
        let y: Vec<f64> = x.iter().map(|v| v.sin()).collect();
        let spline = NaturalCubicSpline::new(&x, &y).unwrap();

        for t in [0.55, 1.234, 3.0001, 4.75] {
            assert_abs_diff_eq!(spline.value(t).unwrap(), t.sin(), epsilon = 1e-5);
        }
    }

    #[test]
    fn test_outside_domain_and_invalid_knots() {
        let spline = NaturalCubicSpline::new(&[0.0, 1.0, 2.0], &[0.0, 1.0, 0.0]).unwrap();
        assert!(spline.value(-0.1).is_none());
        assert!(spline.value(2.1).is_none());
        assert!(spline.value(2.0).is_some());

        assert!(NaturalCubicSpline::new(&[0.0, 1.0, 1.0], &[0.0, 1.0, 2.0]).is_err());
        assert!(NaturalCubicSpline::new(&[0.0, 1.0], &[0.0, 1.0]).is_err());
    }
}
