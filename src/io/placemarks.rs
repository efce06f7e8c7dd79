//! Ground control points from BEAM/VISAT placemark files.

use crate::io::metadata::parse_gcp_altitude;
use crate::types::{GeoError, GeoResult, GroundControlPoint};
use quick_xml::de::from_str;
use serde::Deserialize;
use std::path::Path;

/// Placemark file as written by the BEAM/VISAT pin and GCP managers
#[derive(Debug, Deserialize)]
pub struct PlacemarkFile {
    #[serde(rename = "Placemark", default)]
    pub placemarks: Vec<Placemark>,
}

/// Fields are kept as text so that one broken entry does not reject the file
#[derive(Debug, Deserialize)]
pub struct Placemark {
    #[serde(rename = "@name", default)]
    pub name: Option<String>,
    #[serde(rename = "DESCRIPTION", default)]
    pub description: Option<String>,
    #[serde(rename = "LATITUDE", default)]
    pub latitude: Option<String>,
    #[serde(rename = "LONGITUDE", default)]
    pub longitude: Option<String>,
    #[serde(rename = "PIXEL_X", default)]
    pub pixel_x: Option<String>,
    #[serde(rename = "PIXEL_Y", default)]
    pub pixel_y: Option<String>,
}

impl Placemark {
    /// GCP in pixel-centre index coordinates, `None` if a position is unusable
    pub fn to_gcp(&self, default_altitude_km: f64) -> Option<GroundControlPoint> {
        let number = |field: &Option<String>| {
            field
                .as_deref()
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite())
        };

        let altitude_km = self
            .description
            .as_deref()
            .map(|d| parse_gcp_altitude(d, default_altitude_km))
            .unwrap_or(default_altitude_km);

        let gcp = GroundControlPoint::new(
            number(&self.pixel_x)? - 0.5,
            number(&self.pixel_y)? - 0.5,
            number(&self.longitude)?,
            number(&self.latitude)?,
            altitude_km,
        );
        gcp.is_valid().then_some(gcp)
    }
}

/// Parse placemark XML into GCPs, dropping entries without valid positions
pub fn read_placemarks(xml: &str, default_altitude_km: f64) -> GeoResult<Vec<GroundControlPoint>> {
    let file: PlacemarkFile = from_str(xml)
        .map_err(|e| GeoError::XmlParsing(format!("Failed to parse placemarks: {}", e)))?;

    let gcps: Vec<GroundControlPoint> = file
        .placemarks
        .iter()
        .filter_map(|p| {
            let gcp = p.to_gcp(default_altitude_km);
            if gcp.is_none() {
                log::warn!(
                    "Skipping placemark '{}' without valid pixel and geo position",
                    p.name.as_deref().unwrap_or("?")
                );
            }
            gcp
        })
        .collect();

    log::info!("Read {} of {} placemarks as GCPs", gcps.len(), file.placemarks.len());
    Ok(gcps)
}

pub fn read_placemark_file<P: AsRef<Path>>(
    path: P,
    default_altitude_km: f64,
) -> GeoResult<Vec<GroundControlPoint>> {
    log::debug!("Reading placemarks from {}", path.as_ref().display());
    let xml = std::fs::read_to_string(path)?;
    read_placemarks(&xml, default_altitude_km)
}
