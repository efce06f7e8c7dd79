use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Cartesian 3-vector in kilometres (positions) or km/s (velocities)
pub type Vec3 = [f64; 3];

/// Per-pixel output grid (rows x columns)
pub type GeoGrid = Array2<f64>;

/// Number of images taken during one acquisition
pub const IMAGE_COUNT: usize = 5;

/// Acquisition parameters derived once from product metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionInfo {
    /// Numeric instrument mode (`"3A"` maps to 3)
    pub mode: i32,
    pub target_altitude_km: f64,
    /// Target latitude in degrees
    pub target_lat: f64,
    /// Target longitude in degrees
    pub target_lon: f64,
    /// 1-based image number as annotated in the product
    pub chronological_image_number: usize,
    pub is_backscanning: bool,
}

impl AcquisitionInfo {
    /// Index of the image within the chronologically ordered acquisition.
    ///
    /// The annotated image number is mapped through the fixed permutation
    /// `{2, 1, 3, 0, 4}` (image 1 is the centre image of the sequence).
    pub fn image_index(&self) -> GeoResult<usize> {
        const PERMUTATION: [usize; IMAGE_COUNT] = [2, 1, 3, 0, 4];

        match self.chronological_image_number {
            n @ 1..=IMAGE_COUNT => Ok(PERMUTATION[n - 1]),
            n => Err(GeoError::Metadata {
                annotation: "Image Number".to_string(),
                message: format!("image number {} outside 1..={}", n, IMAGE_COUNT),
            }),
        }
    }
}

/// Centre epochs of the images of one acquisition, in chronological order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageCenterTimes {
    /// UT1 Julian dates
    pub julian_dates: [f64; IMAGE_COUNT],
}

impl ImageCenterTimes {
    pub fn new(julian_dates: [f64; IMAGE_COUNT]) -> Self {
        Self { julian_dates }
    }
}

/// One GPS telemetry sample, already converted to kilometres and UT1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpsSample {
    pub position_ecef: Vec3,
    pub velocity_ecef: Vec3,
    pub seconds_of_week: f64,
    /// UT1 Julian date of the measurement
    pub julian_date: f64,
}

/// Ground control point in pixel-centre index coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundControlPoint {
    pub pixel_col: f64,
    pub pixel_row: f64,
    /// Longitude in degrees
    pub lon: f64,
    /// Latitude in degrees
    pub lat: f64,
    pub altitude_km: f64,
}

impl GroundControlPoint {
    pub fn new(pixel_col: f64, pixel_row: f64, lon: f64, lat: f64, altitude_km: f64) -> Self {
        Self {
            pixel_col,
            pixel_row,
            lon,
            lat,
            altitude_km,
        }
    }

    /// Whether both pixel and geographic positions are usable
    pub fn is_valid(&self) -> bool {
        self.pixel_col.is_finite()
            && self.pixel_row.is_finite()
            && self.lon.is_finite()
            && self.lat.is_finite()
            && self.lat.abs() <= 90.0
            && self.altitude_km.is_finite()
    }
}

/// Per-pixel geolocation grids for one image
#[derive(Debug, Clone)]
pub struct GeometryResult {
    /// Longitudes in degrees
    pub lons: GeoGrid,
    /// Latitudes in degrees
    pub lats: GeoGrid,
    /// View azimuth angles in degrees, clockwise from north
    pub vaas: GeoGrid,
    /// View zenith angles in degrees
    pub vzas: GeoGrid,
    /// Instrument pitch angles in radians (diagnostic)
    pub pitches: Option<GeoGrid>,
    /// Instrument roll angles in radians (diagnostic)
    pub rolls: Option<GeoGrid>,
    /// Rows must be flipped before they match the stored image rows
    pub is_backscanning: bool,
}

impl GeometryResult {
    pub fn row_count(&self) -> usize {
        self.lons.nrows()
    }

    pub fn col_count(&self) -> usize {
        self.lons.ncols()
    }

    /// Number of pixels whose ray missed the ellipsoid
    pub fn invalid_pixel_count(&self) -> usize {
        self.lons
            .iter()
            .zip(self.lats.iter())
            .filter(|(lon, lat)| !lon.is_finite() || !lat.is_finite())
            .count()
    }

    /// Reorder rows from acquisition order into storage order
    pub fn into_storage_order(mut self) -> Self {
        if self.is_backscanning {
            self.lons = flip_rows(&self.lons);
            self.lats = flip_rows(&self.lats);
            self.vaas = flip_rows(&self.vaas);
            self.vzas = flip_rows(&self.vzas);
            self.pitches = self.pitches.as_ref().map(flip_rows);
            self.rolls = self.rolls.as_ref().map(flip_rows);
            self.is_backscanning = false;
        }
        self
    }
}

fn flip_rows(grid: &GeoGrid) -> GeoGrid {
    grid.slice(ndarray::s![..;-1, ..]).to_owned()
}

/// Error types for geometric correction
#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Metadata error in annotation '{annotation}': {message}")]
    Metadata { annotation: String, message: String },

    #[error("No data available in {table} table for MJD {mjd}")]
    NoTimeData { table: &'static str, mjd: f64 },

    #[error("Telemetry error: {0}")]
    Telemetry(String),

    #[error("Geometry error: {0}")]
    Geometry(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Download error: {0}")]
    Download(String),

    #[error("XML parsing error: {0}")]
    XmlParsing(String),
}

/// Result type for geometric correction
pub type GeoResult<T> = Result<T, GeoError>;
