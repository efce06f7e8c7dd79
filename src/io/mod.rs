//! Ingestion of telemetry, metadata, placemarks and time tables

pub mod metadata;
pub mod placemarks;
pub mod telemetry;
pub mod time_tables;

pub use metadata::parse_gcp_altitude;
pub use placemarks::{read_placemark_file, read_placemarks};
pub use telemetry::{cleanse_duplicates, gps_samples, select_ict_record, GpsRecord, IctRecord};
pub use time_tables::{
    load_time_tables, parse_leap_seconds, parse_ut1, SharedTimeTables, TimeTableLoader,
    TimeTableSource,
};
