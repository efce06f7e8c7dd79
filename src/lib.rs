//! pushgeo: geometric correction for pushbroom satellite imagery
//!
//! Reconstructs, for every scan line of an image, the satellite position and
//! instrument attitude from GPS and instrument telemetry, optionally refines
//! them with ground control points, and intersects every pixel's line of sight
//! with the WGS-84 ellipsoid to obtain longitude, latitude and view angles.

pub mod types;
pub mod io;
pub mod core;

// Re-export main types and functions for easier access
pub use types::{
    AcquisitionInfo, GeoError, GeoGrid, GeoResult, GeometryResult, GpsSample,
    GroundControlPoint, ImageCenterTimes, Vec3,
};

pub use crate::core::{GeometryCalculator, GeometryParams, ModeCharacteristics, TimeTables};
pub use io::{SharedTimeTables, TimeTableLoader, TimeTableSource};
