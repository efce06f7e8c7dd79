//! Ray intersection with axis-aligned ellipsoids.

use crate::types::Vec3;

/// Move `point` along `direction` onto an axis-aligned ellipsoid.
///
/// Solves `a t² + 2 b t + c = 0` for the line `point + t·direction` and takes
/// the root nearer to `point`. When the line misses the ellipsoid the
/// discriminant is negative and `point` becomes NaN; callers must check.
pub fn intersect(point: &mut Vec3, direction: &Vec3, center: &Vec3, radii: &Vec3) {
    let mut a = 0.0;
    let mut b = 0.0;
    let mut c = -1.0;
    for k in 0..3 {
        let p = (point[k] - center[k]) / radii[k];
        let d = direction[k] / radii[k];
        a += d * d;
        b += p * d;
        c += p * p;
    }

    let root = (b * b - a * c).sqrt();
    // both forms pick the same root; dividing c avoids subtracting close values
    let t = if b > 0.0 {
        let q = -b - root;
        if q != 0.0 {
            c / q
        } else {
            (-b + root) / a
        }
    } else {
        let q = -b + root;
        if q != 0.0 {
            c / q
        } else {
            (-b - root) / a
        }
    };

    for k in 0..3 {
        point[k] += t * direction[k];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::coordinates::{norm, sub};
    use approx::assert_relative_eq;

    #[test]
    fn test_sphere_hit_from_outside() {
        let center = [1.0, -2.0, 3.0];
        let radius = 6371.0;
        let mut point = [8000.0, 500.0, -300.0];
        let direction = sub(&center, &point);

        intersect(&mut point, &direction, &center, &[radius; 3]);
        assert_relative_eq!(norm(&sub(&point, &center)), radius, max_relative = 1e-9);
    }

    #[test]
    fn test_nearer_root_is_chosen() {
        let mut point = [10.0, 0.0, 0.0];
        intersect(&mut point, &[-1.0, 0.0, 0.0], &[0.0; 3], &[2.0, 3.0, 4.0]);
        assert_relative_eq!(point[0], 2.0, max_relative = 1e-12);

        // pointing away: the only forward hit is behind, the nearer root is still x = 2
        let mut point = [10.0, 0.0, 0.0];
        intersect(&mut point, &[1.0, 0.0, 0.0], &[0.0; 3], &[2.0, 3.0, 4.0]);
        assert_relative_eq!(point[0], 2.0, max_relative = 1e-12);
    }

    #[test]
    fn test_miss_yields_nan() {
        let mut point = [10.0, 10.0, 0.0];
        intersect(&mut point, &[1.0, 0.0, 0.0], &[0.0; 3], &[1.0; 3]);
        assert!(point.iter().all(|v| v.is_nan()));
    }
}
