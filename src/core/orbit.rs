//! Orbit reconstruction on the synthetic per-line time axis.
//!
//! GPS samples are moved into the inertial frame, interpolated with natural
//! cubic splines onto one epoch per scan line of every image (plus a fix
//! epoch ahead of the acquisition), and supplemented with the orbital plane
//! normal and the smoothed orbital angular velocity.

use crate::core::coordinates::{
    angle, ecef_to_eci, ecef_to_eci_velocity, eci_to_ecef, norm, unit_cross,
};
use crate::core::mode::ModeCharacteristics;
use crate::core::smoothing::LocalRegressionSmoother;
use crate::core::spline::NaturalCubicSpline;
use crate::core::time::{reduced_jd_to_gst, JD2001, SECONDS_PER_DAY};
use crate::types::{GeoError, GeoResult, GpsSample, ImageCenterTimes, Vec3, IMAGE_COUNT};
use std::ops::Range;

/// Trailing GPS samples excluded from the trajectory
const DROPPED_TRAILING_SAMPLES: usize = 2;

/// Seconds between the fix epoch and the centre of the first image
pub const SETUP_LEAD_TIME: f64 = 400.0;

/// GPS trajectory in the inertial frame
#[derive(Debug, Clone)]
pub struct EciTrajectory {
    /// Days since JD 2001
    times: Vec<f64>,
    positions: Vec<Vec3>,
    velocities: Vec<Vec3>,
}

impl EciTrajectory {
    pub fn from_gps(samples: &[GpsSample]) -> GeoResult<Self> {
        let usable = samples.len().saturating_sub(DROPPED_TRAILING_SAMPLES);
        if usable < 3 {
            return Err(GeoError::Telemetry(format!(
                "{} GPS samples are not enough to interpolate the orbit",
                samples.len()
            )));
        }

        let mut times = Vec::with_capacity(usable);
        let mut positions = Vec::with_capacity(usable);
        let mut velocities = Vec::with_capacity(usable);
        for sample in &samples[..usable] {
            let t = sample.julian_date - JD2001;
            let gst = reduced_jd_to_gst(t);
            times.push(t);
            positions.push(ecef_to_eci(gst, &sample.position_ecef));
            velocities.push(ecef_to_eci_velocity(
                gst,
                &sample.position_ecef,
                &sample.velocity_ecef,
            ));
        }

        if times.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(GeoError::Telemetry(
                "GPS sample times are not strictly increasing".to_string(),
            ));
        }

        log::debug!("ECI trajectory built from {} of {} GPS samples", usable, samples.len());

        Ok(Self {
            times,
            positions,
            velocities,
        })
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn velocities(&self) -> &[Vec3] {
        &self.velocities
    }

    /// Orbital angular velocity in rad/s.
    ///
    /// Element `i` is the angle swept between samples `i` and `i + 1`; the
    /// last element is the mean rate over the whole trajectory.
    pub fn angular_velocities(&self) -> Vec<f64> {
        let n = self.len();
        let mut rates: Vec<f64> = (0..n - 1)
            .map(|i| {
                angle(&self.positions[i], &self.positions[i + 1])
                    / ((self.times[i + 1] - self.times[i]) * SECONDS_PER_DAY)
            })
            .collect();
        rates.push(
            angle(&self.positions[0], &self.positions[n - 1])
                / ((self.times[n - 1] - self.times[0]) * SECONDS_PER_DAY),
        );
        rates
    }
}

/// Epochs of the fix point and of every scan line of every image.
///
/// Index 0 is the fix epoch; line `l` of image `i` sits at
/// `1 + i * row_count + l`.
#[derive(Debug, Clone)]
pub struct TrajectoryAxis {
    /// Days since JD 2001
    epochs: Vec<f64>,
    image_starts: [f64; IMAGE_COUNT],
    row_count: usize,
    time_per_line: f64,
    integration_time: f64,
}

impl TrajectoryAxis {
    pub const FIX_INDEX: usize = 0;

    pub fn new(center_times: &ImageCenterTimes, mode: &ModeCharacteristics) -> GeoResult<Self> {
        let row_count = mode.row_count;
        let time_per_line = mode.time_per_line();
        let half_image = (row_count / 2) as f64 * time_per_line / SECONDS_PER_DAY;

        let mut image_starts = [0.0; IMAGE_COUNT];
        for (start, jd) in image_starts.iter_mut().zip(&center_times.julian_dates) {
            *start = jd - JD2001 - half_image;
        }
        let fix = center_times.julian_dates[0] - JD2001 - SETUP_LEAD_TIME / SECONDS_PER_DAY;

        let axis = Self::build(fix, image_starts, row_count, time_per_line, mode.integration_time);
        if axis.epochs.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(GeoError::Telemetry(
                "image centre times overlap or are not in chronological order".to_string(),
            ));
        }
        Ok(axis)
    }

    fn build(
        fix: f64,
        image_starts: [f64; IMAGE_COUNT],
        row_count: usize,
        time_per_line: f64,
        integration_time: f64,
    ) -> Self {
        let mut epochs = Vec::with_capacity(1 + IMAGE_COUNT * row_count);
        epochs.push(fix);
        for start in &image_starts {
            epochs.extend((0..row_count).map(|line| {
                start + (line as f64 * time_per_line + integration_time / 2.0) / SECONDS_PER_DAY
            }));
        }

        Self {
            epochs,
            image_starts,
            row_count,
            time_per_line,
            integration_time,
        }
    }

    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    pub fn epochs(&self) -> &[f64] {
        &self.epochs
    }

    pub fn epoch(&self, index: usize) -> f64 {
        self.epochs[index]
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Seconds between consecutive lines
    pub fn time_per_line(&self) -> f64 {
        self.time_per_line
    }

    pub fn line_index(&self, image: usize, line: usize) -> usize {
        1 + image * self.row_count + line
    }

    /// Axis indices of all lines of `image`
    pub fn image_range(&self, image: usize) -> Range<usize> {
        let first = self.line_index(image, 0);
        first..first + self.row_count
    }

    /// Epoch of a fractional row of `image`
    pub fn row_epoch(&self, image: usize, row: f64) -> f64 {
        self.image_starts[image]
            + (row * self.time_per_line + self.integration_time / 2.0) / SECONDS_PER_DAY
    }

    /// Copy of the axis with every epoch moved by `seconds`
    pub fn shifted(&self, seconds: f64) -> Self {
        let days = seconds / SECONDS_PER_DAY;
        let mut image_starts = self.image_starts;
        image_starts.iter_mut().for_each(|s| *s += days);
        Self::build(
            self.epochs[Self::FIX_INDEX] + days,
            image_starts,
            self.row_count,
            self.time_per_line,
            self.integration_time,
        )
    }
}

/// Interpolated satellite state on every epoch of a [`TrajectoryAxis`]
#[derive(Debug, Clone)]
pub struct OrbitSolution {
    /// ECI positions in km
    pub positions: Vec<Vec3>,
    /// ECI velocities in km/s
    pub velocities: Vec<Vec3>,
    /// Orbit radius in km
    pub radii: Vec<f64>,
    /// Orbital plane unit normal in ECI, co-rotating with the Earth
    pub plane_normals: Vec<Vec3>,
    /// Smoothed orbital angular velocity in rad/s
    pub angular_velocities: Vec<f64>,
}

/// Interpolate the trajectory onto `axis`.
///
/// The plane normal is frozen at the fix epoch in the Earth-fixed frame and
/// re-expressed in the inertial frame at every other epoch.
pub fn reconstruct_orbit(
    axis: &TrajectoryAxis,
    trajectory: &EciTrajectory,
    smoother: &LocalRegressionSmoother,
) -> GeoResult<OrbitSolution> {
    let origin = trajectory.times()[0];
    let seconds = |t: f64| (t - origin) * SECONDS_PER_DAY;
    let knots: Vec<f64> = trajectory.times().iter().map(|&t| seconds(t)).collect();

    let component_spline = |states: &[Vec3], k: usize| {
        let values: Vec<f64> = states.iter().map(|s| s[k]).collect();
        NaturalCubicSpline::new(&knots, &values)
    };
    let mut position_splines = Vec::with_capacity(3);
    let mut velocity_splines = Vec::with_capacity(3);
    for k in 0..3 {
        position_splines.push(component_spline(trajectory.positions(), k)?);
        velocity_splines.push(component_spline(trajectory.velocities(), k)?);
    }

    let evaluate = |spline: &NaturalCubicSpline, t: f64| {
        spline.value(seconds(t)).ok_or_else(|| {
            GeoError::Telemetry(format!(
                "epoch JD {:.6} outside the GPS coverage",
                t + JD2001
            ))
        })
    };

    let mut positions = Vec::with_capacity(axis.len());
    let mut velocities = Vec::with_capacity(axis.len());
    for &t in axis.epochs() {
        let mut position = [0.0; 3];
        let mut velocity = [0.0; 3];
        for k in 0..3 {
            position[k] = evaluate(&position_splines[k], t)?;
            velocity[k] = evaluate(&velocity_splines[k], t)?;
        }
        positions.push(position);
        velocities.push(velocity);
    }
    let radii = positions.iter().map(norm).collect();

    let fix = TrajectoryAxis::FIX_INDEX;
    let fixed_normal = eci_to_ecef(
        reduced_jd_to_gst(axis.epoch(fix)),
        &unit_cross(&positions[fix], &velocities[fix])?,
    );
    let plane_normals = axis
        .epochs()
        .iter()
        .map(|&t| ecef_to_eci(reduced_jd_to_gst(t), &fixed_normal))
        .collect();

    let raw_rates = trajectory.angular_velocities();
    let smoothed_rates = smoother.smooth(&knots, &raw_rates)?;
    let rate_spline = NaturalCubicSpline::new(&knots, &smoothed_rates)?;
    let angular_velocities = axis
        .epochs()
        .iter()
        .map(|&t| evaluate(&rate_spline, t))
        .collect::<GeoResult<Vec<f64>>>()?;

    log::debug!(
        "Orbit reconstructed on {} epochs, mean angular velocity {:.6e} rad/s",
        axis.len(),
        angular_velocities.iter().sum::<f64>() / angular_velocities.len() as f64
    );

    Ok(OrbitSolution {
        positions,
        velocities,
        radii,
        plane_normals,
        angular_velocities,
    })
}
