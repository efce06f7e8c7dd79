//! Time system: Julian dates, sidereal time and the leap-second / UT1 tables.

use crate::types::{GeoError, GeoResult};
use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use std::f64::consts::TAU;

pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Offset between Julian date and modified Julian date
pub const MJD_OFFSET: f64 = 2_400_000.5;

/// Julian date of 2001-01-01T00:00, origin of the engine's reduced time axis
pub const JD2001: f64 = 2_451_910.5;

/// Julian date of the J2000 epoch (2000-01-01T12:00)
pub const JD2000: f64 = 2_451_545.0;

/// MJD of the Unix epoch
const MJD_UNIX_EPOCH: f64 = 40_587.0;

/// TAI - GPS time in seconds
const TAI_MINUS_GPS: f64 = 19.0;

/// Julian date of a proleptic Gregorian calendar date (UTC, no leap seconds).
///
/// `month` is zero-based (0 = January).
pub fn julian_date(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: f64) -> f64 {
    let mut y = year as f64;
    let mut m = (month + 1) as f64;
    if m <= 2.0 {
        y -= 1.0;
        m += 12.0;
    }

    let a = (y / 100.0).floor();
    let b = 2.0 - a + (a / 4.0).floor();
    let day_fraction = (hour as f64 + minute as f64 / 60.0 + second / 3600.0) / 24.0;

    (365.25 * (y + 4716.0)).floor() + (30.6001 * (m + 1.0)).floor() + day as f64 + b - 1524.5
        + day_fraction
}

/// Julian date of a UTC timestamp
pub fn julian_date_of(date: &DateTime<Utc>) -> f64 {
    let second = date.second() as f64 + date.nanosecond() as f64 * 1e-9;
    julian_date(
        date.year(),
        date.month0(),
        date.day(),
        date.hour(),
        date.minute(),
        second,
    )
}

/// Modified Julian date of a timestamp (millisecond resolution)
pub fn date_to_mjd(date: &DateTime<Utc>) -> f64 {
    date.timestamp_millis() as f64 / (SECONDS_PER_DAY * 1000.0) + MJD_UNIX_EPOCH
}

/// Timestamp of a modified Julian date, rounded to the nearest millisecond
pub fn mjd_to_date(mjd: f64) -> GeoResult<DateTime<Utc>> {
    let millis = ((mjd - MJD_UNIX_EPOCH) * SECONDS_PER_DAY * 1000.0).round();
    if !millis.is_finite() {
        return Err(GeoError::Processing(format!("MJD {} is not a valid date", mjd)));
    }

    Utc.timestamp_millis_opt(millis as i64)
        .single()
        .ok_or_else(|| GeoError::Processing(format!("MJD {} is outside the supported date range", mjd)))
}

pub fn jd_to_mjd(jd: f64) -> f64 {
    jd - MJD_OFFSET
}

pub fn mjd_to_jd(mjd: f64) -> f64 {
    mjd + MJD_OFFSET
}

/// Greenwich mean sidereal time (IAU 1982 model) in radians, within `[0, 2π)`.
///
/// `mjd` is expected on the UT1 scale.
pub fn mjd_to_gst(mjd: f64) -> f64 {
    let t = (mjd_to_jd(mjd) - JD2000) / 36_525.0;

    let gmst_seconds = 67_310.548_41
        + (876_600.0 * 3600.0 + 8_640_184.812_866) * t
        + 0.093_104 * t * t
        - 6.2e-6 * t * t * t;

    let gst = gmst_seconds.rem_euclid(SECONDS_PER_DAY) / SECONDS_PER_DAY * TAU;
    if gst >= TAU || gst < 0.0 {
        0.0
    } else {
        gst
    }
}

/// Sidereal angle for an epoch on the engine's reduced axis (days since [`JD2001`])
pub fn reduced_jd_to_gst(reduced_jd: f64) -> f64 {
    mjd_to_gst(jd_to_mjd(reduced_jd + JD2001))
}

/// One row of the TAI - UTC table
#[derive(Debug, Clone, PartialEq)]
pub struct LeapSecondEntry {
    /// First MJD this entry applies to
    pub mjd: f64,
    /// TAI - UTC in seconds at `reference_mjd`
    pub offset: f64,
    pub reference_mjd: f64,
    /// Drift in seconds per day (only non-zero before 1972)
    pub rate: f64,
}

impl LeapSecondEntry {
    pub fn constant(mjd: f64, offset: f64) -> Self {
        Self {
            mjd,
            offset,
            reference_mjd: 0.0,
            rate: 0.0,
        }
    }

    fn value_at(&self, mjd: f64) -> f64 {
        self.offset + (mjd - self.reference_mjd) * self.rate
    }
}

/// One row of the UT1 - UTC table
#[derive(Debug, Clone, PartialEq)]
pub struct Ut1Entry {
    pub mjd: f64,
    /// UT1 - UTC in seconds
    pub ut1_minus_utc: f64,
}

/// Leap seconds since 1972 (MJD, TAI - UTC)
const BUILTIN_LEAP_SECONDS: [(f64, f64); 28] = [
    (41317.0, 10.0),
    (41499.0, 11.0),
    (41683.0, 12.0),
    (42048.0, 13.0),
    (42413.0, 14.0),
    (42778.0, 15.0),
    (43144.0, 16.0),
    (43509.0, 17.0),
    (43874.0, 18.0),
    (44239.0, 19.0),
    (44786.0, 20.0),
    (45151.0, 21.0),
    (45516.0, 22.0),
    (46247.0, 23.0),
    (47161.0, 24.0),
    (47892.0, 25.0),
    (48257.0, 26.0),
    (48804.0, 27.0),
    (49169.0, 28.0),
    (49534.0, 29.0),
    (50083.0, 30.0),
    (50630.0, 31.0),
    (51179.0, 32.0),
    (53736.0, 33.0),
    (54832.0, 34.0),
    (56109.0, 35.0),
    (57204.0, 36.0),
    (57754.0, 37.0),
];

/// Leap-second and Earth-orientation tables.
///
/// Constructed once (from files, a download or the built-in leap seconds) and
/// passed explicitly to every conversion that needs it.
#[derive(Debug, Clone, Default)]
pub struct TimeTables {
    leap_seconds: Vec<LeapSecondEntry>,
    ut1: Vec<Ut1Entry>,
}

impl TimeTables {
    /// Tables from parsed rows; rows are sorted by MJD
    pub fn new(mut leap_seconds: Vec<LeapSecondEntry>, mut ut1: Vec<Ut1Entry>) -> Self {
        leap_seconds.sort_by(|a, b| a.mjd.total_cmp(&b.mjd));
        ut1.sort_by(|a, b| a.mjd.total_cmp(&b.mjd));
        ut1.dedup_by(|a, b| a.mjd == b.mjd);
        Self { leap_seconds, ut1 }
    }

    /// Built-in leap seconds without any UT1 data
    pub fn with_builtin_leap_seconds() -> Self {
        Self::new(builtin_leap_seconds(), Vec::new())
    }

    pub fn with_ut1(mut self, ut1: Vec<Ut1Entry>) -> Self {
        self.ut1 = Self::new(Vec::new(), ut1).ut1;
        self
    }

    pub fn leap_seconds(&self) -> &[LeapSecondEntry] {
        &self.leap_seconds
    }

    pub fn ut1_entries(&self) -> &[Ut1Entry] {
        &self.ut1
    }

    /// TAI - UTC in seconds
    pub fn delta_tai(&self, mjd: f64) -> GeoResult<f64> {
        let count = self.leap_seconds.partition_point(|e| e.mjd <= mjd);
        if count == 0 {
            return Err(GeoError::NoTimeData { table: "TAI-UTC", mjd });
        }
        Ok(self.leap_seconds[count - 1].value_at(mjd))
    }

    /// GPS - UTC in seconds
    pub fn delta_gps(&self, mjd: f64) -> GeoResult<f64> {
        Ok(self.delta_tai(mjd)? - TAI_MINUS_GPS)
    }

    /// UT1 - UTC in seconds, linearly interpolated between tabulated days
    pub fn delta_ut1(&self, mjd: f64) -> GeoResult<f64> {
        let count = self.ut1.partition_point(|e| e.mjd <= mjd);
        if count == 0 {
            return Err(GeoError::NoTimeData { table: "UT1-UTC", mjd });
        }

        let floor = &self.ut1[count - 1];
        if floor.mjd == mjd {
            return Ok(floor.ut1_minus_utc);
        }
        let ceiling = self
            .ut1
            .get(count)
            .ok_or(GeoError::NoTimeData { table: "UT1-UTC", mjd })?;

        let w = (mjd - floor.mjd) / (ceiling.mjd - floor.mjd);
        Ok(floor.ut1_minus_utc + w * (ceiling.ut1_minus_utc - floor.ut1_minus_utc))
    }

    /// Shift a UTC Julian date onto the UT1 scale
    pub fn utc_to_ut1_jd(&self, jd_utc: f64) -> GeoResult<f64> {
        Ok(jd_utc + self.delta_ut1(jd_to_mjd(jd_utc))? / SECONDS_PER_DAY)
    }
}

pub fn builtin_leap_seconds() -> Vec<LeapSecondEntry> {
    BUILTIN_LEAP_SECONDS
        .iter()
        .map(|&(mjd, offset)| LeapSecondEntry::constant(mjd, offset))
        .collect()
}
