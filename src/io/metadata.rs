//! Acquisition metadata from product annotations.

use crate::types::{AcquisitionInfo, GeoError, GeoResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

pub const SENSOR_MODE: &str = "Sensor Mode";
pub const TARGET_ALTITUDE: &str = "Target Altitude";
pub const TARGET_LAT: &str = "Target Lat";
pub const TARGET_LON: &str = "Target Lon";
pub const IMAGE_NUMBER: &str = "Image Number";

/// GCP altitudes above this are taken to be metres
const ALTITUDE_METRES_THRESHOLD: f64 = 10.0;

static ALTITUDE_NOTE: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"\(alt=\s*([-+]?\d+(?:\.\d*)?)\s*\)"));

static LEADING_NUMBER: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"^\s*([-+]?\d+(?:\.\d*)?(?:[eE][-+]?\d+)?)"));

impl AcquisitionInfo {
    /// Read the acquisition parameters from annotation name/value pairs.
    ///
    /// The target altitude is annotated in metres. A missing or unparsable
    /// annotation is reported with its name.
    pub fn from_annotations(annotations: &HashMap<String, String>) -> GeoResult<Self> {
        let mode = leading_number(annotations, SENSOR_MODE)? as i32;
        let target_altitude_km = leading_number(annotations, TARGET_ALTITUDE)? / 1000.0;
        let target_lat = leading_number(annotations, TARGET_LAT)?;
        let target_lon = leading_number(annotations, TARGET_LON)?;
        let image_number = leading_number(annotations, IMAGE_NUMBER)?;
        if image_number.fract() != 0.0 || image_number < 1.0 {
            return Err(metadata_error(IMAGE_NUMBER, "not a positive integer"));
        }

        let mut info = Self {
            mode,
            target_altitude_km,
            target_lat,
            target_lon,
            chronological_image_number: image_number as usize,
            is_backscanning: false,
        };
        info.is_backscanning = info.image_index()? % 2 == 1;

        log::debug!(
            "Acquisition: mode {}, target ({:.4}, {:.4}) at {:.3} km, image {}",
            info.mode,
            info.target_lon,
            info.target_lat,
            info.target_altitude_km,
            info.chronological_image_number
        );
        Ok(info)
    }
}

/// Altitude in km from a `(alt=NNN)` note in a GCP description, else `default_km`
pub fn parse_gcp_altitude(description: &str, default_km: f64) -> f64 {
    let altitude = Lazy::force(&ALTITUDE_NOTE)
        .as_ref()
        .ok()
        .and_then(|re| re.captures(description))
        .and_then(|captures| captures[1].parse::<f64>().ok());

    match altitude {
        Some(value) if value > ALTITUDE_METRES_THRESHOLD => value / 1000.0,
        Some(value) => value,
        None => default_km,
    }
}

fn leading_number(annotations: &HashMap<String, String>, name: &str) -> GeoResult<f64> {
    let value = annotations
        .get(name)
        .ok_or_else(|| metadata_error(name, "annotation missing"))?;

    let number = Lazy::force(&LEADING_NUMBER)
        .as_ref()
        .map_err(|e| GeoError::Processing(format!("invalid number pattern: {}", e)))?
        .captures(value)
        .and_then(|captures| captures[1].parse::<f64>().ok())
        .ok_or_else(|| metadata_error(name, &format!("cannot parse '{}'", value)))?;
    Ok(number)
}

fn metadata_error(annotation: &str, message: &str) -> GeoError {
    GeoError::Metadata {
        annotation: annotation.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotations(mode: &str, image: &str) -> HashMap<String, String> {
        [
            (SENSOR_MODE, mode),
            (TARGET_ALTITUDE, "350"),
            (TARGET_LAT, "52.25"),
            (TARGET_LON, "-1.5"),
            (IMAGE_NUMBER, image),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_annotations_are_parsed() {
        let info = AcquisitionInfo::from_annotations(&annotations("3A", "2")).unwrap();
        assert_eq!(info.mode, 3);
        assert_eq!(info.target_altitude_km, 0.35);
        assert_eq!(info.target_lat, 52.25);
        assert_eq!(info.target_lon, -1.5);
        assert_eq!(info.chronological_image_number, 2);
        assert!(info.is_backscanning);

        let forward = AcquisitionInfo::from_annotations(&annotations("5", "1")).unwrap();
        assert!(!forward.is_backscanning);
    }

    #[test]
    fn test_errors_name_the_annotation() {
        let mut missing = annotations("1", "1");
        missing.remove(TARGET_LAT);
        match AcquisitionInfo::from_annotations(&missing) {
            Err(GeoError::Metadata { annotation, .. }) => assert_eq!(annotation, TARGET_LAT),
            other => panic!("unexpected result {:?}", other),
        }

        match AcquisitionInfo::from_annotations(&annotations("Full Swath", "1")) {
            Err(GeoError::Metadata { annotation, .. }) => assert_eq!(annotation, SENSOR_MODE),
            other => panic!("unexpected result {:?}", other),
        }

        assert!(AcquisitionInfo::from_annotations(&annotations("1", "7")).is_err());
        assert!(AcquisitionInfo::from_annotations(&annotations("1", "1.5")).is_err());
    }

    #[test]
    fn test_gcp_altitude_annotation() {
        assert_eq!(parse_gcp_altitude("church tower (alt=120)", 0.05), 0.12);
        assert_eq!(parse_gcp_altitude("(alt= 0.8 )", 0.05), 0.8);
        assert_eq!(parse_gcp_altitude("bridge", 0.05), 0.05);
        assert_eq!(parse_gcp_altitude("(alt=high)", 0.05), 0.05);
    }

    #[test]
    fn test_patterns_compile_once_and_are_reused() {
        assert!(LEADING_NUMBER.is_ok());
        assert!(ALTITUDE_NOTE.is_ok());

        let values = annotations("3A", "2");
        let first = AcquisitionInfo::from_annotations(&values).unwrap();
        for _ in 0..100 {
            assert_eq!(AcquisitionInfo::from_annotations(&values).unwrap(), first);
            assert_eq!(parse_gcp_altitude("mast (alt=42)", 0.0), 0.042);
        }
    }
}
