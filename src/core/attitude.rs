//! Instrument attitude frame and pitch/roll decomposition of pointing vectors.
//!
//! The frame is built from the satellite position (yaw axis) and the orbital
//! plane normal (pitch axis). A pointing vector with pitch `p` and roll `r` is
//! the nadir direction `-yaw` rotated by `-p` about the pitch axis and then by
//! `r` about the equally rotated roll axis.

use crate::core::coordinates::{angle, cross, dot, norm, scale, sub, unit};
use crate::core::quaternion::Quaternion;
use crate::types::{GeoError, GeoResult, Vec3};
use std::f64::consts::FRAC_PI_2;

/// Components of the pitch axis smaller than this do not vote on the roll sign
const SIGN_VOTE_THRESHOLD: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttitudeFrame {
    yaw: Vec3,
    pitch: Vec3,
    roll: Vec3,
}

impl AttitudeFrame {
    pub fn new(satellite: &Vec3, plane_normal: &Vec3) -> GeoResult<Self> {
        let yaw = unit(satellite);
        let along = dot(plane_normal, &yaw);
        let pitch = unit(&sub(plane_normal, &scale(&yaw, along)));
        if norm(&yaw) == 0.0 || norm(&pitch) == 0.0 {
            return Err(GeoError::Geometry(
                "orbital plane normal parallel to the satellite position".to_string(),
            ));
        }
        let roll = cross(&pitch, &yaw);
        Ok(Self { yaw, pitch, roll })
    }

    pub fn yaw(&self) -> &Vec3 {
        &self.yaw
    }

    pub fn pitch(&self) -> &Vec3 {
        &self.pitch
    }

    pub fn roll(&self) -> &Vec3 {
        &self.roll
    }

    /// Unit pointing vector for the given pitch and roll angles (radians)
    pub fn pointing(&self, pitch: f64, roll: f64) -> Vec3 {
        let mut pointing = scale(&self.yaw, -1.0);
        let mut roll_axis = self.roll;

        let pitch_rotation = Quaternion::from_axis(&self.pitch, -pitch);
        pitch_rotation.rotate_in_place(&mut pointing);
        pitch_rotation.rotate_in_place(&mut roll_axis);

        Quaternion::from_axis(&roll_axis, roll).rotate_in_place(&mut pointing);
        pointing
    }

    /// Pitch and roll angles (radians) of a unit pointing vector
    pub fn decompose(&self, pointing: &Vec3) -> GeoResult<(f64, f64)> {
        let pitch = FRAC_PI_2 - angle(&cross(pointing, &self.pitch), &self.yaw);

        let out_of_plane = dot(pointing, &self.pitch);
        let in_plane = unit(&sub(pointing, &scale(&self.pitch, out_of_plane)));
        if norm(&in_plane) == 0.0 {
            return Err(GeoError::Geometry(
                "pointing vector parallel to the pitch axis".to_string(),
            ));
        }
        let magnitude = angle(pointing, &in_plane);

        Ok((pitch, self.roll_sign(pointing, &in_plane, magnitude) * magnitude))
    }

    /// Sign of the roll angle, voted over the components of `(P - cos|r| Q) / N`
    fn roll_sign(&self, pointing: &Vec3, in_plane: &Vec3, magnitude: f64) -> f64 {
        let cos_roll = magnitude.cos();
        let ratio = |k: usize| (pointing[k] - cos_roll * in_plane[k]) / self.pitch[k];

        let mut votes = 0i32;
        for k in 0..3 {
            if self.pitch[k].abs() >= SIGN_VOTE_THRESHOLD {
                let r = ratio(k);
                if r > 0.0 {
                    votes += 1;
                } else if r < 0.0 {
                    votes -= 1;
                }
            }
        }

        if votes != 0 {
            return votes.signum() as f64;
        }

        // undecided: trust the dominant component
        let dominant = (0..3)
            .max_by(|&a, &b| self.pitch[a].abs().total_cmp(&self.pitch[b].abs()))
            .unwrap_or(0);
        if ratio(dominant) < 0.0 {
            -1.0
        } else {
            1.0
        }
    }
}
