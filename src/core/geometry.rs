//! Orbit and attitude reconstruction for one image of an acquisition.
//!
//! The nominal solution points the instrument at the annotated target for the
//! centre line of the image; the scan mechanism is modelled by rotating the
//! target about the orbital plane normal with a slowed-down orbital rate. With
//! ground control points the line timing is locked onto the GCP nearest to the
//! image centre, and with three or more GCPs the pitch and roll grids are
//! corrected by a smooth surface fitted through the GCP residuals.

use crate::core::attitude::AttitudeFrame;
use crate::core::coordinates::{ecef_to_eci, eci_to_ecef, norm, sub, unit, wgs_to_ecef};
use crate::core::mode::ModeCharacteristics;
use crate::core::orbit::{reconstruct_orbit, EciTrajectory, OrbitSolution, TrajectoryAxis};
use crate::core::position::{PositionCalculator, ScanLine};
use crate::core::quaternion::Quaternion;
use crate::core::rational::RationalSurface;
use crate::core::smoothing::LocalRegressionSmoother;
use crate::core::time::{reduced_jd_to_gst, SECONDS_PER_DAY};
use crate::types::{
    AcquisitionInfo, GeoGrid, GeoResult, GeometryResult, GpsSample, GroundControlPoint,
    ImageCenterTimes, Vec3,
};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// GCPs needed before the pitch/roll grids are corrected by a surface fit
pub const MIN_GCPS_FOR_SURFACE: usize = 3;

/// Tunables of the geometric correction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryParams {
    /// Intersect with the ellipsoid raised by the target altitude
    pub use_target_altitude: bool,
    /// Ratio of the orbital rate to the rate of the scan mechanism
    pub slow_down_factor: f64,
    /// Samples per local regression window for the angular velocity
    pub smoothing_span: usize,
    pub smoothing_degree: usize,
    pub robust_iterations: usize,
    /// Apply the GCP time shift and surface correction when GCPs are given
    pub refine_with_gcps: bool,
    /// Return the pitch/roll grids alongside the positions
    pub keep_pitch_roll: bool,
}

impl Default for GeometryParams {
    fn default() -> Self {
        Self {
            use_target_altitude: true,
            slow_down_factor: 5.0,
            smoothing_span: 5,
            smoothing_degree: 1,
            robust_iterations: 0,
            refine_with_gcps: true,
            keep_pitch_roll: true,
        }
    }
}

/// Ground point the instrument looks at in a known pixel
#[derive(Debug, Clone, Copy)]
struct PointingAnchor {
    ecef: Vec3,
    /// Acquisition-order row
    row: f64,
    col: f64,
}

/// Per-image state shared by the reconstruction steps
struct ImageContext {
    image: usize,
    /// +1 for forward scans, -1 for backward scans
    scan_sign: f64,
}

#[derive(Debug, Clone, Default)]
pub struct GeometryCalculator {
    params: GeometryParams,
}

impl GeometryCalculator {
    pub fn new(params: GeometryParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &GeometryParams {
        &self.params
    }

    /// Geolocate every pixel of the image described by `info`.
    ///
    /// GCP rows are in storage order; grids in the result are in acquisition
    /// order (see [`GeometryResult::into_storage_order`]).
    pub fn calculate(
        &self,
        center_times: &ImageCenterTimes,
        gps: &[GpsSample],
        info: &AcquisitionInfo,
        gcps: &[GroundControlPoint],
    ) -> GeoResult<GeometryResult> {
        let mode = ModeCharacteristics::for_mode(info.mode);
        let image = info.image_index()?;
        let context = ImageContext {
            image,
            scan_sign: if image % 2 == 1 { -1.0 } else { 1.0 },
        };
        log::info!(
            "Geolocating image {} (index {}) in mode {}: {} rows x {} columns",
            info.chronological_image_number,
            image,
            info.mode,
            mode.row_count,
            mode.col_count
        );

        let smoother = LocalRegressionSmoother::new(
            self.params.smoothing_degree,
            self.params.smoothing_span,
            self.params.robust_iterations,
        )?;
        let trajectory = EciTrajectory::from_gps(gps)?;
        let mut axis = TrajectoryAxis::new(center_times, mode)?;
        let mut orbit = reconstruct_orbit(&axis, &trajectory, &smoother)?;

        let mut anchor = PointingAnchor {
            ecef: wgs_to_ecef(info.target_lon, info.target_lat, info.target_altitude_km)?,
            row: (mode.row_count / 2) as f64,
            col: mode.reference_column(),
        };
        let mut track = self.target_track(&context, &axis, &orbit, &anchor);

        let gcps = if self.params.refine_with_gcps {
            usable_gcps(gcps, mode, info.is_backscanning)
        } else {
            Vec::new()
        };

        if let Some(gcp) = nearest_to_centre(&gcps, mode) {
            let gcp_ecef = wgs_to_ecef(gcp.lon, gcp.lat, gcp.altitude_km)?;
            let closest = closest_line(&axis, context.image, &track, &gcp_ecef);
            let shift = (closest as f64 - gcp.pixel_row) * axis.time_per_line();
            log::info!(
                "Locking onto GCP at row {:.1}, column {:.1}: nominal line {}, time shift {:.4} s",
                gcp.pixel_row,
                gcp.pixel_col,
                closest,
                shift
            );

            axis = axis.shifted(shift);
            orbit = reconstruct_orbit(&axis, &trajectory, &smoother)?;
            anchor = PointingAnchor {
                ecef: gcp_ecef,
                row: gcp.pixel_row,
                col: gcp.pixel_col,
            };
            track = self.target_track(&context, &axis, &orbit, &anchor);
        } else {
            log::debug!("No usable GCPs, keeping the nominal solution");
        }

        let lines = scan_lines(&axis, &orbit, context.image);
        let (mut pitches, mut rolls) = attitude_grids(&lines, &track, mode, anchor.col)?;

        if gcps.len() >= MIN_GCPS_FOR_SURFACE {
            refine_attitude(&context, &axis, &lines, &gcps, &mut pitches, &mut rolls)?;
        } else if !gcps.is_empty() {
            log::debug!(
                "{} GCPs are too few for a pitch/roll correction surface",
                gcps.len()
            );
        }

        let positions = PositionCalculator::new(
            info.target_altitude_km,
            self.params.use_target_altitude,
        )
        .calculate_positions(&lines, &pitches, &rolls)?;

        let (pitches, rolls) = if self.params.keep_pitch_roll {
            (Some(pitches), Some(rolls))
        } else {
            (None, None)
        };

        Ok(GeometryResult {
            lons: positions.lons,
            lats: positions.lats,
            vaas: positions.vaas,
            vzas: positions.vzas,
            pitches,
            rolls,
            is_backscanning: info.is_backscanning,
        })
    }

    /// ECI position the instrument aims at for every line of the image.
    ///
    /// The anchor is rotated about the plane normal by the slowed-down orbital
    /// angle elapsed since the anchor row was acquired.
    fn target_track(
        &self,
        context: &ImageContext,
        axis: &TrajectoryAxis,
        orbit: &OrbitSolution,
        anchor: &PointingAnchor,
    ) -> Vec<Vec3> {
        let reference_epoch = axis.row_epoch(context.image, anchor.row);

        axis.image_range(context.image)
            .map(|index| {
                let epoch = axis.epoch(index);
                let target = ecef_to_eci(reduced_jd_to_gst(epoch), &anchor.ecef);
                let elapsed = (epoch - reference_epoch) * SECONDS_PER_DAY;
                let rotation = context.scan_sign * orbit.angular_velocities[index]
                    / self.params.slow_down_factor
                    * elapsed;
                Quaternion::from_axis(&orbit.plane_normals[index], rotation).rotate(&target)
            })
            .collect()
    }
}

/// Valid GCPs inside the image, rows mapped into acquisition order
fn usable_gcps(
    gcps: &[GroundControlPoint],
    mode: &ModeCharacteristics,
    is_backscanning: bool,
) -> Vec<GroundControlPoint> {
    let last_row = (mode.row_count - 1) as f64;
    let last_col = (mode.col_count - 1) as f64;

    let usable: Vec<GroundControlPoint> = gcps
        .iter()
        .filter(|gcp| gcp.is_valid())
        .filter(|gcp| {
            (-0.5..=last_col + 0.5).contains(&gcp.pixel_col)
                && (-0.5..=last_row + 0.5).contains(&gcp.pixel_row)
        })
        .map(|gcp| {
            let mut gcp = gcp.clone();
            if is_backscanning {
                gcp.pixel_row = last_row - gcp.pixel_row;
            }
            gcp
        })
        .collect();

    if usable.len() < gcps.len() {
        log::warn!(
            "Ignoring {} of {} GCPs that are invalid or outside the image",
            gcps.len() - usable.len(),
            gcps.len()
        );
    }
    usable
}

fn nearest_to_centre<'g>(
    gcps: &'g [GroundControlPoint],
    mode: &ModeCharacteristics,
) -> Option<&'g GroundControlPoint> {
    let centre_row = (mode.row_count / 2) as f64;
    let centre_col = (mode.col_count / 2) as f64;
    let distance = |gcp: &GroundControlPoint| {
        (gcp.pixel_row - centre_row).powi(2) + (gcp.pixel_col - centre_col).powi(2)
    };
    gcps.iter().min_by(|a, b| distance(a).total_cmp(&distance(b)))
}

/// Line of the image whose nominal target lies closest to `ground_ecef`
fn closest_line(axis: &TrajectoryAxis, image: usize, track: &[Vec3], ground_ecef: &Vec3) -> usize {
    axis.image_range(image)
        .zip(track)
        .map(|(index, target)| {
            let target_ecef = eci_to_ecef(reduced_jd_to_gst(axis.epoch(index)), target);
            norm(&sub(&target_ecef, ground_ecef))
        })
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(line, _)| line)
        .unwrap_or(0)
}

fn scan_lines(axis: &TrajectoryAxis, orbit: &OrbitSolution, image: usize) -> Vec<ScanLine> {
    axis.image_range(image)
        .map(|index| ScanLine {
            epoch: axis.epoch(index),
            satellite: orbit.positions[index],
            plane_normal: orbit.plane_normals[index],
        })
        .collect()
}

/// Pitch and roll of every pixel.
///
/// Each line is pointed at its target in `anchor_col`; pitch is constant
/// along the line and roll follows the scan angle of the columns.
fn attitude_grids(
    lines: &[ScanLine],
    track: &[Vec3],
    mode: &ModeCharacteristics,
    anchor_col: f64,
) -> GeoResult<(GeoGrid, GeoGrid)> {
    let deltas = mode.scan_deltas();
    let anchor_delta = mode.scan_delta(anchor_col);
    let mut pitches = Array2::zeros((lines.len(), mode.col_count));
    let mut rolls = Array2::zeros((lines.len(), mode.col_count));

    for (row, (line, target)) in lines.iter().zip(track).enumerate() {
        let frame = AttitudeFrame::new(&line.satellite, &line.plane_normal)?;
        let (pitch, roll) = frame.decompose(&unit(&sub(target, &line.satellite)))?;
        let reference_roll = roll - anchor_delta;

        pitches.row_mut(row).fill(pitch);
        for (value, delta) in rolls.row_mut(row).iter_mut().zip(&deltas) {
            *value = reference_roll + delta;
        }
    }

    let centre = lines.len() / 2;
    log::debug!(
        "Centre line pitch {:.6} rad, first column roll {:.6} rad",
        pitches[[centre, 0]],
        rolls[[centre, 0]]
    );
    Ok((pitches, rolls))
}

/// Add rational correction surfaces fitted through the GCP residuals
fn refine_attitude(
    context: &ImageContext,
    axis: &TrajectoryAxis,
    lines: &[ScanLine],
    gcps: &[GroundControlPoint],
    pitches: &mut GeoGrid,
    rolls: &mut GeoGrid,
) -> GeoResult<()> {
    let mut cols = Vec::with_capacity(gcps.len());
    let mut rows = Vec::with_capacity(gcps.len());
    let mut pitch_residuals = Vec::with_capacity(gcps.len());
    let mut roll_residuals = Vec::with_capacity(gcps.len());

    for gcp in gcps {
        let (pitch, roll) = direct_attitude(context, axis, lines, gcp)?;
        pitch_residuals.push(pitch - bilinear(pitches, gcp.pixel_row, gcp.pixel_col));
        roll_residuals.push(roll - bilinear(rolls, gcp.pixel_row, gcp.pixel_col));
        cols.push(gcp.pixel_col);
        rows.push(gcp.pixel_row);
    }

    let pitch_surface = RationalSurface::fit(&cols, &rows, &pitch_residuals)?;
    let roll_surface = RationalSurface::fit(&cols, &rows, &roll_residuals)?;
    log::info!(
        "Correcting pitch/roll with surfaces through {} GCPs (max residuals {:.3e} / {:.3e} rad)",
        gcps.len(),
        pitch_residuals.iter().fold(0.0f64, |m, r| m.max(r.abs())),
        roll_residuals.iter().fold(0.0f64, |m, r| m.max(r.abs()))
    );

    for ((row, col), value) in pitches.indexed_iter_mut() {
        *value += pitch_surface.value(col as f64, row as f64);
    }
    for ((row, col), value) in rolls.indexed_iter_mut() {
        *value += roll_surface.value(col as f64, row as f64);
    }
    Ok(())
}

/// Pitch and roll that point exactly at a GCP from its (fractional) row
fn direct_attitude(
    context: &ImageContext,
    axis: &TrajectoryAxis,
    lines: &[ScanLine],
    gcp: &GroundControlPoint,
) -> GeoResult<(f64, f64)> {
    let row = gcp.pixel_row.clamp(0.0, (lines.len() - 1) as f64);
    let lower = row.floor() as usize;
    let upper = (lower + 1).min(lines.len() - 1);
    let w = row - lower as f64;
    let lerp = |a: &Vec3, b: &Vec3| -> Vec3 {
        [
            a[0] + w * (b[0] - a[0]),
            a[1] + w * (b[1] - a[1]),
            a[2] + w * (b[2] - a[2]),
        ]
    };

    let satellite = lerp(&lines[lower].satellite, &lines[upper].satellite);
    let normal = lerp(&lines[lower].plane_normal, &lines[upper].plane_normal);
    let epoch = axis.row_epoch(context.image, row);

    let ground = ecef_to_eci(
        reduced_jd_to_gst(epoch),
        &wgs_to_ecef(gcp.lon, gcp.lat, gcp.altitude_km)?,
    );
    let frame = AttitudeFrame::new(&satellite, &normal)?;
    frame.decompose(&unit(&sub(&ground, &satellite)))
}

/// Bilinear grid value at a fractional (row, col), clamped to the grid
fn bilinear(grid: &GeoGrid, row: f64, col: f64) -> f64 {
    let (rows, cols) = grid.dim();
    let r = row.clamp(0.0, (rows - 1) as f64);
    let c = col.clamp(0.0, (cols - 1) as f64);
    let r0 = r.floor() as usize;
    let c0 = c.floor() as usize;
    let r1 = (r0 + 1).min(rows - 1);
    let c1 = (c0 + 1).min(cols - 1);
    let wr = r - r0 as f64;
    let wc = c - c0 as f64;

    let top = grid[[r0, c0]] + wc * (grid[[r0, c1]] - grid[[r0, c0]]);
    let bottom = grid[[r1, c0]] + wc * (grid[[r1, c1]] - grid[[r1, c0]]);
    top + wr * (bottom - top)
}
