//! GPS and image-centre-time telemetry records.
//!
//! Records are produced by the telemetry readers of the surrounding toolbox;
//! here they are moved onto the engine's conventions: kilometres and UT1
//! Julian dates.

use crate::core::time::{jd_to_mjd, TimeTables, SECONDS_PER_DAY};
use crate::types::{GeoError, GeoResult, GpsSample, ImageCenterTimes, Vec3, IMAGE_COUNT};

/// Julian date of the GPS epoch, 1980-01-06T00:00
pub const GPS_EPOCH_JD: f64 = 2_444_244.5;

/// Delay between a GPS fix and its time tag, in seconds
pub const MEASUREMENT_DELAY: f64 = 0.999;

/// Header prefix of the authoritative image-centre-time record
pub const ICT_SYNC_WORD: &str = "+G:29494";

/// Raw GPS record in metres and GPS time
#[derive(Debug, Clone, PartialEq)]
pub struct GpsRecord {
    pub week: u32,
    pub seconds_of_week: f64,
    pub position_m: Vec3,
    pub velocity_m_s: Vec3,
}

impl GpsRecord {
    /// GPS-time Julian date of the record
    pub fn gps_julian_date(&self) -> f64 {
        GPS_EPOCH_JD + self.week as f64 * 7.0 + self.seconds_of_week / SECONDS_PER_DAY
    }

    pub fn to_sample(&self, tables: &TimeTables) -> GeoResult<GpsSample> {
        let gps_jd = self.gps_julian_date();
        let utc_jd = gps_jd
            - (tables.delta_gps(jd_to_mjd(gps_jd))? + MEASUREMENT_DELAY) / SECONDS_PER_DAY;

        Ok(GpsSample {
            position_ecef: self.position_m.map(|v| v / 1000.0),
            velocity_ecef: self.velocity_m_s.map(|v| v / 1000.0),
            seconds_of_week: self.seconds_of_week,
            julian_date: tables.utc_to_ut1_jd(utc_jd)?,
        })
    }
}

/// Convert records to samples and drop repeated time tags
pub fn gps_samples(records: &[GpsRecord], tables: &TimeTables) -> GeoResult<Vec<GpsSample>> {
    let samples = records
        .iter()
        .map(|r| r.to_sample(tables))
        .collect::<GeoResult<Vec<_>>>()?;
    Ok(cleanse_duplicates(samples))
}

/// Keep only samples whose time strictly exceeds that of the previous kept sample
pub fn cleanse_duplicates(samples: Vec<GpsSample>) -> Vec<GpsSample> {
    let total = samples.len();
    let mut kept: Vec<GpsSample> = Vec::with_capacity(total);
    for sample in samples {
        match kept.last() {
            Some(last) if sample.julian_date <= last.julian_date => {}
            _ => kept.push(sample),
        }
    }
    if kept.len() < total {
        log::debug!("Dropped {} duplicate GPS samples", total - kept.len());
    }
    kept
}

/// Image centre times as reported by the instrument (UTC Julian dates)
#[derive(Debug, Clone, PartialEq)]
pub struct IctRecord {
    pub header: String,
    pub center_times_jd: [f64; IMAGE_COUNT],
}

/// First record carrying the sync word
pub fn select_ict_record(records: &[IctRecord]) -> GeoResult<&IctRecord> {
    records
        .iter()
        .find(|r| r.header.trim_start().starts_with(ICT_SYNC_WORD))
        .ok_or_else(|| {
            GeoError::Telemetry(format!(
                "none of {} image centre time records starts with '{}'",
                records.len(),
                ICT_SYNC_WORD
            ))
        })
}

impl ImageCenterTimes {
    /// Centre times of an ICT record moved onto the UT1 scale
    pub fn from_ict(record: &IctRecord, tables: &TimeTables) -> GeoResult<Self> {
        let mut julian_dates = [0.0; IMAGE_COUNT];
        for (out, &utc) in julian_dates.iter_mut().zip(&record.center_times_jd) {
            *out = tables.utc_to_ut1_jd(utc)?;
        }
        Ok(Self::new(julian_dates))
    }
}
