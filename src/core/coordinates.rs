//! WGS-84 geodetic transforms, ECI/ECEF rotation and small vector helpers.
//!
//! All lengths are kilometres; angles passed in and out of the geodetic
//! functions are degrees.

use crate::types::{GeoError, GeoResult, Vec3};
use std::f64::consts::TAU;

/// WGS-84 semi-major axis in km
pub const WGS84_A: f64 = 6378.137;

/// WGS-84 flattening
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;

/// WGS-84 semi-minor axis in km
pub const WGS84_B: f64 = WGS84_A * (1.0 - WGS84_F);

/// WGS-84 first eccentricity squared
pub const WGS84_E2: f64 = WGS84_F * (2.0 - WGS84_F);

/// Earth rotation rate in rad/s
pub const EARTH_ROTATION_RATE: f64 = 7.292_115_146_7e-5;

/// Geodetic position (degrees, km) to ECEF (km).
pub fn wgs_to_ecef(lon: f64, lat: f64, alt: f64) -> GeoResult<Vec3> {
    if !(lat.abs() <= 90.0) {
        return Err(GeoError::Geometry(format!("latitude {} outside [-90, 90]", lat)));
    }

    let (sin_lat, cos_lat) = lat.to_radians().sin_cos();
    let (sin_lon, cos_lon) = lon.to_radians().sin_cos();
    let n = WGS84_A / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();

    Ok([
        (n + alt) * cos_lat * cos_lon,
        (n + alt) * cos_lat * sin_lon,
        (n * (1.0 - WGS84_E2) + alt) * sin_lat,
    ])
}

/// ECEF (km) to geodetic `(lon, lat, alt)` in degrees and km.
///
/// Closed-form solution after Borkowski (1989), polished by one fixed-point
/// latitude step. Points on the polar axis and on the equatorial plane take
/// explicit branches.
pub fn ecef_to_wgs(x: f64, y: f64, z: f64) -> (f64, f64, f64) {
    let r = x.hypot(y);

    if r == 0.0 {
        let lat = if z >= 0.0 { 90.0 } else { -90.0 };
        return (0.0, lat, z.abs() - WGS84_B);
    }

    let lon = y.atan2(x).to_degrees();

    if z == 0.0 {
        return (lon, 0.0, r - WGS84_A);
    }

    let a = WGS84_A;
    let b = WGS84_B.copysign(z);
    let ab = a * a - b * b;

    let e = (b * z - ab) / (a * r);
    let f = (b * z + ab) / (a * r);
    let p = 4.0 / 3.0 * (e * f + 1.0);
    let q = 2.0 * (e * e - f * f);
    let d = p * p * p + q * q;

    let v = if d >= 0.0 {
        let s = d.sqrt();
        (s - q).cbrt() - (s + q).cbrt()
    } else {
        let s = (-p).sqrt();
        2.0 * s * ((q / (p * s)).acos() / 3.0).cos()
    };

    let g = 0.5 * ((e * e + v).sqrt() + e);
    let t = (g * g + (f - v * g) / (2.0 * g - e)).sqrt() - g;
    let mut lat = (a * (1.0 - t * t) / (2.0 * b * t)).atan();

    // one fixed-point step removes the residual of the cubic solution
    let sin_lat = lat.sin();
    let n = a / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
    lat = (z + WGS84_E2 * n * sin_lat).atan2(r);

    let (sin_lat, cos_lat) = lat.sin_cos();
    let alt = r * cos_lat + z * sin_lat - a * (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();

    (lon, lat.to_degrees(), alt)
}

/// Rotate an ECI vector into ECEF (rotation about Z by `+gst`)
pub fn eci_to_ecef(gst: f64, v: &Vec3) -> Vec3 {
    let (s, c) = gst.sin_cos();
    [c * v[0] + s * v[1], -s * v[0] + c * v[1], v[2]]
}

/// Rotate an ECEF vector into ECI (rotation about Z by `-gst`)
pub fn ecef_to_eci(gst: f64, v: &Vec3) -> Vec3 {
    let (s, c) = gst.sin_cos();
    [c * v[0] - s * v[1], s * v[0] + c * v[1], v[2]]
}

/// ECEF velocity to ECI, including the Earth-rotation term
pub fn ecef_to_eci_velocity(gst: f64, position_ecef: &Vec3, velocity_ecef: &Vec3) -> Vec3 {
    let inertial = [
        velocity_ecef[0] - EARTH_ROTATION_RATE * position_ecef[1],
        velocity_ecef[1] + EARTH_ROTATION_RATE * position_ecef[0],
        velocity_ecef[2],
    ];
    ecef_to_eci(gst, &inertial)
}

/// ECI velocity to ECEF, removing the Earth-rotation term
pub fn eci_to_ecef_velocity(gst: f64, position_eci: &Vec3, velocity_eci: &Vec3) -> Vec3 {
    let position = eci_to_ecef(gst, position_eci);
    let velocity = eci_to_ecef(gst, velocity_eci);
    [
        velocity[0] + EARTH_ROTATION_RATE * position[1],
        velocity[1] - EARTH_ROTATION_RATE * position[0],
        velocity[2],
    ]
}

pub fn cross(a: &Vec3, b: &Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

pub fn dot(a: &Vec3, b: &Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub fn norm(a: &Vec3) -> f64 {
    dot(a, a).sqrt()
}

pub fn sub(a: &Vec3, b: &Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub fn scale(a: &Vec3, s: f64) -> Vec3 {
    [a[0] * s, a[1] * s, a[2] * s]
}

/// Angle between two vectors via `atan2(|a x b|, a . b)`, in `[0, 2π)`
pub fn angle(a: &Vec3, b: &Vec3) -> f64 {
    let angle = norm(&cross(a, b)).atan2(dot(a, b)).rem_euclid(TAU);
    if angle >= TAU {
        0.0
    } else {
        angle
    }
}

/// Normalise a vector in place; zero vectors are left untouched
pub fn normalize(v: &mut Vec3) {
    let length = norm(v);
    if length > 0.0 {
        v.iter_mut().for_each(|c| *c /= length);
    }
}

/// Unit vector in the direction of `v`
pub fn unit(v: &Vec3) -> Vec3 {
    let mut u = *v;
    normalize(&mut u);
    u
}

/// Unit cross product, failing for (anti-)parallel inputs
pub fn unit_cross(a: &Vec3, b: &Vec3) -> GeoResult<Vec3> {
    let c = cross(a, b);
    if norm(&c) == 0.0 {
        return Err(GeoError::Geometry("cross product of parallel vectors".to_string()));
    }
    Ok(unit(&c))
}
