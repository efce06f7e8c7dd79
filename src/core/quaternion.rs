//! Unit quaternions for rotating vectors about arbitrary axes.

use crate::types::Vec3;

/// Immutable rotation quaternion `r + i·x + j·y + k·z`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    r: f64,
    i: f64,
    j: f64,
    k: f64,
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion {
        r: 1.0,
        i: 0.0,
        j: 0.0,
        k: 0.0,
    };

    /// Rotation by `angle` radians about the axis `(x, y, z)`.
    ///
    /// The axis is used as given; pass a unit vector for a unit quaternion.
    pub fn from_axis_angle(x: f64, y: f64, z: f64, angle: f64) -> Self {
        let (s, c) = (0.5 * angle).sin_cos();
        Self {
            r: c,
            i: s * x,
            j: s * y,
            k: s * z,
        }
    }

    pub fn from_axis(axis: &Vec3, angle: f64) -> Self {
        Self::from_axis_angle(axis[0], axis[1], axis[2], angle)
    }

    pub fn r(&self) -> f64 {
        self.r
    }

    pub fn i(&self) -> f64 {
        self.i
    }

    pub fn j(&self) -> f64 {
        self.j
    }

    pub fn k(&self) -> f64 {
        self.k
    }

    /// Rotated copy of `v` (`q v q⁻¹`)
    pub fn rotate(&self, v: &Vec3) -> Vec3 {
        let mut out = *v;
        self.rotate_in_place(&mut out);
        out
    }

    /// Rotate `v` in place; used by the per-pixel loops
    pub fn rotate_in_place(&self, v: &mut Vec3) {
        let a = self.r;
        let b = self.i;
        let c = self.j;
        let d = self.k;

        let ab = a * b;
        let ac = a * c;
        let ad = a * d;
        let bb = b * b;
        let bc = b * c;
        let bd = b * d;
        let cc = c * c;
        let cd = c * d;
        let dd = d * d;

        let [x, y, z] = *v;
        v[0] = 2.0 * ((-cc - dd) * x + (bc - ad) * y + (ac + bd) * z) + x;
        v[1] = 2.0 * ((ad + bc) * x + (-bb - dd) * y + (cd - ab) * z) + y;
        v[2] = 2.0 * ((bd - ac) * x + (ab + cd) * y + (-bb - cc) * z) + z;
    }

    /// Hamilton product `self * other`
    pub fn multiply(&self, other: &Quaternion) -> Quaternion {
        Quaternion {
            r: self.r * other.r - self.i * other.i - self.j * other.j - self.k * other.k,
            i: self.r * other.i + self.i * other.r + self.j * other.k - self.k * other.j,
            j: self.r * other.j - self.i * other.k + self.j * other.r + self.k * other.i,
            k: self.r * other.k + self.i * other.j - self.j * other.i + self.k * other.r,
        }
    }

    pub fn conjugate(&self) -> Quaternion {
        Quaternion {
            r: self.r,
            i: -self.i,
            j: -self.j,
            k: -self.k,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::coordinates::{norm, unit};
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_quarter_turn_about_z() {
        let q = Quaternion::from_axis_angle(0.0, 0.0, 1.0, FRAC_PI_2);
        let v = q.rotate(&[1.0, 0.0, 0.0]);
        assert_abs_diff_eq!(v[0], 0.0, epsilon = 1e-15);
        assert_abs_diff_eq!(v[1], 1.0, epsilon = 1e-15);
        assert_abs_diff_eq!(v[2], 0.0, epsilon = 1e-15);
    }

    #[test]
    fn test_rotation_preserves_length() {
        let axes = [[1.0, 2.0, 3.0], [-0.3, 0.1, 0.9], [0.0, -1.0, 0.0]];
        let vectors = [[7000.0, -12.5, 3.25], [1e-3, 4.0, -8.0], [0.0, 0.0, 1.0]];

        for axis in &axes {
            let axis = unit(axis);
            for angle in [-3.0, -0.001, 0.5, 2.9, 6.0] {
                let q = Quaternion::from_axis(&axis, angle);
                for v in &vectors {
                    let rotated = q.rotate(v);
                    assert_abs_diff_eq!(norm(&rotated), norm(v), epsilon = 1e-12 * norm(v));
                }
            }
        }
    }

    #[test]
    fn test_matches_sandwich_product() {
        let axis = unit(&[0.2, -0.7, 0.4]);
        let q = Quaternion::from_axis(&axis, 1.234);
        let v = [3.0, -1.0, 2.0];

        let p = Quaternion { r: 0.0, i: v[0], j: v[1], k: v[2] };
        let sandwich = q.multiply(&p).multiply(&q.conjugate());
        let rotated = q.rotate(&v);

        assert_abs_diff_eq!(sandwich.r(), 0.0, epsilon = 1e-14);
        assert_abs_diff_eq!(sandwich.i(), rotated[0], epsilon = 1e-14);
        assert_abs_diff_eq!(sandwich.j(), rotated[1], epsilon = 1e-14);
        assert_abs_diff_eq!(sandwich.k(), rotated[2], epsilon = 1e-14);
    }

    #[test]
    fn test_in_place_matches_copy() {
        let q = Quaternion::from_axis_angle(0.0, 1.0, 0.0, 0.75);
        let v = [1.0, 2.0, 3.0];
        let mut w = v;
        q.rotate_in_place(&mut w);
        assert_eq!(w, q.rotate(&v));
        assert_eq!(Quaternion::IDENTITY.rotate(&v), v);
    }
}
