//! Synthetic circular-orbit acquisition shared by the integration tests
#![allow(dead_code)]

use pushgeo::core::coordinates::{ecef_to_wgs, eci_to_ecef, eci_to_ecef_velocity};
use pushgeo::core::time::{reduced_jd_to_gst, JD2001, SECONDS_PER_DAY};
use pushgeo::core::TrajectoryAxis;
use pushgeo::{AcquisitionInfo, GpsSample, ImageCenterTimes, ModeCharacteristics, Vec3};
use std::f64::consts::TAU;

/// Centre of the acquisition (UT1), also the centre of the middle image
pub const CENTER_JD: f64 = 2_455_000.25;
pub const RADIUS: f64 = 7078.0;
pub const PERIOD: f64 = 5926.0;
pub const GPS_INTERVAL: f64 = 10.0;
pub const IMAGE_SPACING: f64 = 60.0;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// ECI position and velocity `seconds` after the centre epoch
pub fn circular_eci(seconds: f64) -> (Vec3, Vec3) {
    let rate = TAU / PERIOD;
    let inclination = 98f64.to_radians();
    let node = 0.7f64;
    let e1 = [node.cos(), node.sin(), 0.0];
    let e2 = [
        -node.sin() * inclination.cos(),
        node.cos() * inclination.cos(),
        inclination.sin(),
    ];
    let (s, c) = (rate * seconds).sin_cos();
    let mut r = [0.0; 3];
    let mut v = [0.0; 3];
    for k in 0..3 {
        r[k] = RADIUS * (c * e1[k] + s * e2[k]);
        v[k] = RADIUS * rate * (-s * e1[k] + c * e2[k]);
    }
    (r, v)
}

/// Earth-fixed state at a UT1 Julian date
pub fn ecef_state(jd: f64) -> (Vec3, Vec3) {
    let gst = reduced_jd_to_gst(jd - JD2001);
    let (r, v) = circular_eci((jd - CENTER_JD) * SECONDS_PER_DAY);
    (eci_to_ecef(gst, &r), eci_to_ecef_velocity(gst, &r, &v))
}

/// GPS samples every 10 s from 700 s before to 720 s after the centre
pub fn gps_samples() -> Vec<GpsSample> {
    (-70..=72)
        .map(|i| {
            let jd = CENTER_JD + i as f64 * GPS_INTERVAL / SECONDS_PER_DAY;
            let (position_ecef, velocity_ecef) = ecef_state(jd);
            GpsSample {
                position_ecef,
                velocity_ecef,
                seconds_of_week: 0.0,
                julian_date: jd,
            }
        })
        .collect()
}

pub fn center_times() -> ImageCenterTimes {
    let mut jds = [0.0; 5];
    for (i, jd) in jds.iter_mut().enumerate() {
        *jd = CENTER_JD + (i as f64 - 2.0) * IMAGE_SPACING / SECONDS_PER_DAY;
    }
    ImageCenterTimes::new(jds)
}

/// Geodetic point below the satellite when the centre line of `image` is taken
pub fn sub_satellite_point(mode: i32, image: usize) -> (f64, f64) {
    let characteristics = ModeCharacteristics::for_mode(mode);
    let axis = TrajectoryAxis::new(&center_times(), characteristics).unwrap();
    let epoch = axis.epoch(axis.line_index(image, characteristics.row_count / 2));

    let (r, _) = circular_eci((epoch - (CENTER_JD - JD2001)) * SECONDS_PER_DAY);
    let ecef = eci_to_ecef(reduced_jd_to_gst(epoch), &r);
    let (lon, lat, _) = ecef_to_wgs(ecef[0], ecef[1], ecef[2]);
    (lon, lat)
}

/// Acquisition whose target lies below the satellite at the image centre
pub fn acquisition(mode: i32, image_number: usize) -> AcquisitionInfo {
    let mut info = AcquisitionInfo {
        mode,
        target_altitude_km: 0.0,
        target_lat: 0.0,
        target_lon: 0.0,
        chronological_image_number: image_number,
        is_backscanning: false,
    };
    let image = info.image_index().unwrap();
    let (lon, lat) = sub_satellite_point(mode, image);
    info.target_lon = lon;
    info.target_lat = lat;
    info.is_backscanning = image % 2 == 1;
    info
}
