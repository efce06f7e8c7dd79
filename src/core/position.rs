//! Per-pixel ground positions and view angles from the pitch/roll grids.

use crate::core::attitude::AttitudeFrame;
use crate::core::coordinates::{
    dot, ecef_to_wgs, eci_to_ecef, norm, sub, WGS84_A, WGS84_B,
};
use crate::core::intersection::intersect;
use crate::core::time::reduced_jd_to_gst;
use crate::types::{GeoError, GeoGrid, GeoResult, Vec3};
use ndarray::Array2;

/// Satellite state at the epoch of one scan line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanLine {
    /// Days since JD 2001
    pub epoch: f64,
    /// ECI position in km
    pub satellite: Vec3,
    /// Orbital plane normal in ECI
    pub plane_normal: Vec3,
}

/// Ground coordinates and view geometry of every pixel, in degrees
#[derive(Debug, Clone)]
pub struct PixelPositions {
    pub lons: GeoGrid,
    pub lats: GeoGrid,
    pub vaas: GeoGrid,
    pub vzas: GeoGrid,
}

/// lon, lat, view azimuth, view zenith
type PixelValues = [f64; 4];

#[derive(Debug, Clone)]
pub struct PositionCalculator {
    altitude_km: f64,
}

impl PositionCalculator {
    /// Calculator intersecting with the ellipsoid raised by `target_altitude_km`,
    /// or with the bare WGS-84 ellipsoid when `use_target_altitude` is off
    pub fn new(target_altitude_km: f64, use_target_altitude: bool) -> Self {
        Self {
            altitude_km: if use_target_altitude {
                target_altitude_km
            } else {
                0.0
            },
        }
    }

    pub fn radii(&self) -> Vec3 {
        [
            WGS84_A + self.altitude_km,
            WGS84_A + self.altitude_km,
            WGS84_B + self.altitude_km,
        ]
    }

    pub fn calculate_positions(
        &self,
        lines: &[ScanLine],
        pitches: &GeoGrid,
        rolls: &GeoGrid,
    ) -> GeoResult<PixelPositions> {
        let (rows, cols) = pitches.dim();
        if rolls.dim() != (rows, cols) || lines.len() != rows {
            return Err(GeoError::Processing(format!(
                "{} scan lines do not match pitch grid {:?} and roll grid {:?}",
                lines.len(),
                pitches.dim(),
                rolls.dim()
            )));
        }

        log::info!("Intersecting {} x {} lines of sight with the ellipsoid", rows, cols);
        let values = self.compute_rows(lines, pitches, rolls)?;

        let grid = |k: usize| Array2::from_shape_fn((rows, cols), |(r, c)| values[r][c][k]);
        let positions = PixelPositions {
            lons: grid(0),
            lats: grid(1),
            vaas: grid(2),
            vzas: grid(3),
        };

        let invalid = positions
            .lons
            .iter()
            .filter(|lon| !lon.is_finite())
            .count();
        if invalid == rows * cols {
            return Err(GeoError::Geometry(
                "no line of sight intersects the Earth ellipsoid".to_string(),
            ));
        }
        if invalid > 0 {
            log::warn!("{} of {} pixels have no ellipsoid intersection", invalid, rows * cols);
        }

        Ok(positions)
    }

    #[cfg(feature = "parallel")]
    fn compute_rows(
        &self,
        lines: &[ScanLine],
        pitches: &GeoGrid,
        rolls: &GeoGrid,
    ) -> GeoResult<Vec<Vec<PixelValues>>> {
        use rayon::prelude::*;

        (0..lines.len())
            .into_par_iter()
            .map(|r| self.compute_row(&lines[r], pitches.row(r), rolls.row(r)))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn compute_rows(
        &self,
        lines: &[ScanLine],
        pitches: &GeoGrid,
        rolls: &GeoGrid,
    ) -> GeoResult<Vec<Vec<PixelValues>>> {
        (0..lines.len())
            .map(|r| self.compute_row(&lines[r], pitches.row(r), rolls.row(r)))
            .collect()
    }

    fn compute_row(
        &self,
        line: &ScanLine,
        pitches: ndarray::ArrayView1<f64>,
        rolls: ndarray::ArrayView1<f64>,
    ) -> GeoResult<Vec<PixelValues>> {
        let frame = AttitudeFrame::new(&line.satellite, &line.plane_normal)?;
        let gst = reduced_jd_to_gst(line.epoch);
        let satellite_ecef = eci_to_ecef(gst, &line.satellite);
        let radii = self.radii();

        Ok(pitches
            .iter()
            .zip(rolls.iter())
            .map(|(&pitch, &roll)| {
                let direction = frame.pointing(pitch, roll);
                let mut point = line.satellite;
                intersect(&mut point, &direction, &[0.0; 3], &radii);
                if !point.iter().all(|v| v.is_finite()) {
                    return [f64::NAN; 4];
                }

                let ground = eci_to_ecef(gst, &point);
                let (lon, lat, _) = ecef_to_wgs(ground[0], ground[1], ground[2]);
                let (vaa, vza) = view_angles(&ground, lon, lat, &satellite_ecef);
                [lon, lat, vaa, vza]
            })
            .collect())
    }
}

/// View azimuth (clockwise from north) and zenith angle in degrees of the
/// satellite seen from a ground point at `lon`/`lat` degrees
pub fn view_angles(ground_ecef: &Vec3, lon: f64, lat: f64, satellite_ecef: &Vec3) -> (f64, f64) {
    let (sin_lon, cos_lon) = lon.to_radians().sin_cos();
    let (sin_lat, cos_lat) = lat.to_radians().sin_cos();
    let east = [-sin_lon, cos_lon, 0.0];
    let north = [-sin_lat * cos_lon, -sin_lat * sin_lon, cos_lat];
    let up = [cos_lat * cos_lon, cos_lat * sin_lon, sin_lat];

    let look = sub(satellite_ecef, ground_ecef);
    let range = norm(&look);
    let vza = (dot(&look, &up) / range).clamp(-1.0, 1.0).acos().to_degrees();
    let vaa = dot(&look, &east)
        .atan2(dot(&look, &north))
        .to_degrees()
        .rem_euclid(360.0);
    (vaa, vza)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::coordinates::{ecef_to_eci, unit_cross, wgs_to_ecef};
    use approx::assert_abs_diff_eq;

    fn overhead_line(lon: f64, lat: f64, altitude: f64) -> ScanLine {
        let epoch = 3000.25;
        let gst = reduced_jd_to_gst(epoch);
        let satellite = ecef_to_eci(gst, &wgs_to_ecef(lon, lat, altitude).unwrap());
        let plane_normal = unit_cross(&satellite, &[0.0, 0.0, 1.0]).unwrap();
        ScanLine {
            epoch,
            satellite,
            plane_normal,
        }
    }

    #[test]
    fn test_nadir_pixel_lands_below_satellite() {
        let line = overhead_line(12.0, 0.0, 700.0);
        let calculator = PositionCalculator::new(0.0, true);
        let zeros = Array2::zeros((1, 1));

        let positions = calculator.calculate_positions(&[line], &zeros, &zeros).unwrap();
        assert_abs_diff_eq!(positions.lons[[0, 0]], 12.0, epsilon = 1e-9);
        assert_abs_diff_eq!(positions.lats[[0, 0]], 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(positions.vzas[[0, 0]], 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_off_nadir_pixels_tilt_view() {
        let line = overhead_line(-30.0, 0.0, 700.0);
        let calculator = PositionCalculator::new(0.0, true);
        let pitches = Array2::zeros((1, 3));
        let rolls = Array2::from_shape_vec((1, 3), vec![-0.05, 0.0, 0.05]).unwrap();

        let positions = calculator.calculate_positions(&[line], &pitches, &rolls).unwrap();
        assert!(positions.vzas[[0, 0]] > 2.0);
        assert!(positions.vzas[[0, 2]] > 2.0);
        assert_abs_diff_eq!(positions.vzas[[0, 0]], positions.vzas[[0, 2]], epsilon = 1e-6);
        // polar pass over the equator: rolls swing the line of sight east-west
        assert!((positions.lons[[0, 0]] - positions.lons[[0, 2]]).abs() > 0.4);
        assert_abs_diff_eq!(positions.lats[[0, 0]], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_raised_ellipsoid() {
        let line = overhead_line(45.0, 30.0, 700.0);
        let raised = PositionCalculator::new(2.0, true);
        assert_eq!(raised.radii(), [WGS84_A + 2.0, WGS84_A + 2.0, WGS84_B + 2.0]);
        assert_eq!(PositionCalculator::new(2.0, false).radii(), [WGS84_A, WGS84_A, WGS84_B]);

        let zeros = Array2::zeros((1, 1));
        let positions = raised.calculate_positions(&[line], &zeros, &zeros).unwrap();
        assert_abs_diff_eq!(positions.lons[[0, 0]], 45.0, epsilon = 1e-6);
    }

    #[test]
    fn test_all_misses_are_an_error() {
        let line = overhead_line(0.0, 0.0, 700.0);
        let calculator = PositionCalculator::new(0.0, true);
        let pitches = Array2::from_elem((1, 2), 1.4);
        let rolls = Array2::zeros((1, 2));
        assert!(matches!(
            calculator.calculate_positions(&[line], &pitches, &rolls),
            Err(GeoError::Geometry(_))
        ));
    }

    #[test]
    fn test_shape_mismatch() {
        let line = overhead_line(0.0, 0.0, 700.0);
        let calculator = PositionCalculator::new(0.0, true);
        let zeros = Array2::zeros((2, 2));
        assert!(calculator.calculate_positions(&[line], &zeros, &zeros).is_err());
    }

    #[test]
    fn test_view_angles_of_northern_satellite() {
        let ground = wgs_to_ecef(0.0, 0.0, 0.0).unwrap();
        let satellite = wgs_to_ecef(0.0, 1.0, 700.0).unwrap();
        let (vaa, vza) = view_angles(&ground, 0.0, 0.0, &satellite);
        assert_abs_diff_eq!(vaa, 0.0, epsilon = 1e-9);
        assert!(vza > 5.0 && vza < 90.0);
    }
}
