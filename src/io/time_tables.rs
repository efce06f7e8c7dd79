//! Leap-second (`tai-utc.dat`) and Earth-orientation (`finals.data`) tables.
//!
//! Tables are parsed from text, cached on disk and optionally refreshed from
//! the network. [`SharedTimeTables`] hands immutable snapshots to running
//! calculations while a refresh swaps in new tables.

use crate::core::time::{builtin_leap_seconds, LeapSecondEntry, TimeTables, Ut1Entry, MJD_OFFSET};
use crate::types::{GeoError, GeoResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;

const LEAP_SECOND_FILE: &str = "tai-utc.dat";
const UT1_FILE: &str = "finals.data";
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Where the time tables come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeTableSource {
    pub leap_second_url: String,
    pub ut1_url: String,
    /// Directory holding the cached copies
    pub cache_dir: PathBuf,
}

impl Default for TimeTableSource {
    fn default() -> Self {
        Self {
            leap_second_url: "https://maia.usno.navy.mil/ser7/tai-utc.dat".to_string(),
            ut1_url: "https://maia.usno.navy.mil/ser7/finals.data".to_string(),
            cache_dir: dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("pushgeo"),
        }
    }
}

static LEAP_SECOND_ROW: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| {
    Regex::new(
        r"=JD\s*([0-9.]+)\s+TAI-UTC=\s*([-0-9.]+)\s*S\s*\+\s*\(MJD\s*-\s*([0-9.]+)\s*\)\s*X\s*([-0-9.]+)\s*S",
    )
});

/// Parse a USNO `tai-utc.dat` table.
///
/// Rows look like
/// ` 1972 JAN  1 =JD 2441317.5  TAI-UTC=  10.0       S + (MJD - 41317.) X 0.0      S`.
pub fn parse_leap_seconds(text: &str) -> GeoResult<Vec<LeapSecondEntry>> {
    let row = Lazy::force(&LEAP_SECOND_ROW)
        .as_ref()
        .map_err(|e| GeoError::Processing(format!("invalid leap second pattern: {}", e)))?;

    let mut entries = Vec::new();
    for (number, line) in text.lines().enumerate() {
        if !line.contains("=JD") {
            continue;
        }
        let captures = row.captures(line).ok_or_else(|| {
            GeoError::InvalidFormat(format!("malformed leap second row {}: '{}'", number + 1, line.trim()))
        })?;
        let field = |i: usize| -> GeoResult<f64> {
            captures[i].parse::<f64>().map_err(|e| {
                GeoError::InvalidFormat(format!("leap second row {}: {}", number + 1, e))
            })
        };

        entries.push(LeapSecondEntry {
            mjd: field(1)? - MJD_OFFSET,
            offset: field(2)?,
            reference_mjd: field(3)?,
            rate: field(4)?,
        });
    }

    log::debug!("Parsed {} leap second entries", entries.len());
    Ok(entries)
}

/// Parse an IERS `finals.data` table (fixed columns).
///
/// MJD is in columns 8-15, UT1 - UTC in columns 59-68. Rows without a UT1
/// value are skipped.
pub fn parse_ut1(text: &str) -> GeoResult<Vec<Ut1Entry>> {
    let mut entries = Vec::new();
    for (number, line) in text.lines().enumerate() {
        let mjd_field = line.get(7..15).map(str::trim).unwrap_or("");
        let ut1_field = line.get(58..68).map(str::trim).unwrap_or("");
        if mjd_field.is_empty() || ut1_field.is_empty() {
            continue;
        }

        let parse = |field: &str, what: &str| {
            field.parse::<f64>().map_err(|e| {
                GeoError::InvalidFormat(format!(
                    "finals row {}: bad {} '{}': {}",
                    number + 1,
                    what,
                    field,
                    e
                ))
            })
        };
        entries.push(Ut1Entry {
            mjd: parse(mjd_field, "MJD")?,
            ut1_minus_utc: parse(ut1_field, "UT1-UTC")?,
        });
    }

    log::debug!("Parsed {} UT1-UTC entries", entries.len());
    Ok(entries)
}

/// Read tables from files; without a leap-second file the built-in table is used
pub fn load_time_tables(leap_second_path: Option<&Path>, ut1_path: &Path) -> GeoResult<TimeTables> {
    let leap_seconds = match leap_second_path {
        Some(path) => parse_leap_seconds(&std::fs::read_to_string(path)?)?,
        None => builtin_leap_seconds(),
    };
    let ut1 = parse_ut1(&std::fs::read_to_string(ut1_path)?)?;
    log::info!(
        "Loaded {} leap second and {} UT1 entries",
        leap_seconds.len(),
        ut1.len()
    );
    Ok(TimeTables::new(leap_seconds, ut1))
}

/// Loads time tables from the cache directory or the network
#[derive(Debug, Clone)]
pub struct TimeTableLoader {
    source: TimeTableSource,
}

impl TimeTableLoader {
    pub fn new(source: TimeTableSource) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &TimeTableSource {
        &self.source
    }

    pub fn leap_second_path(&self) -> PathBuf {
        self.source.cache_dir.join(LEAP_SECOND_FILE)
    }

    pub fn ut1_path(&self) -> PathBuf {
        self.source.cache_dir.join(UT1_FILE)
    }

    /// Tables from the cached files
    pub fn load_cached(&self) -> GeoResult<TimeTables> {
        let leap_path = self.leap_second_path();
        let leap = if leap_path.exists() {
            Some(leap_path.as_path())
        } else {
            log::warn!("No cached leap second table, using built-in leap seconds");
            None
        };
        load_time_tables(leap, &self.ut1_path())
    }

    /// Download both tables, update the cache and return the parsed tables
    pub fn refresh(&self) -> GeoResult<TimeTables> {
        std::fs::create_dir_all(&self.source.cache_dir)?;

        let client = reqwest::blocking::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .user_agent(concat!("pushgeo/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GeoError::Download(format!("Failed to create HTTP client: {}", e)))?;

        let leap_text = Self::download(&client, &self.source.leap_second_url)?;
        let ut1_text = Self::download(&client, &self.source.ut1_url)?;

        // parse before caching so a broken download never replaces a good file
        let leap_seconds = parse_leap_seconds(&leap_text)?;
        let ut1 = parse_ut1(&ut1_text)?;
        std::fs::write(self.leap_second_path(), leap_text)?;
        std::fs::write(self.ut1_path(), ut1_text)?;

        log::info!(
            "Refreshed time tables into {}",
            self.source.cache_dir.display()
        );
        Ok(TimeTables::new(leap_seconds, ut1))
    }

    fn download(client: &reqwest::blocking::Client, url: &str) -> GeoResult<String> {
        log::info!("Downloading time table from: {}", url);
        let response = client
            .get(url)
            .send()
            .map_err(|e| GeoError::Download(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(GeoError::Download(format!(
                "HTTP {}: {}",
                response.status().as_u16(),
                url
            )));
        }

        response
            .text()
            .map_err(|e| GeoError::Download(format!("Failed to read response body: {}", e)))
    }
}

/// Time tables shared between threads, replaced as a whole on refresh
#[derive(Debug)]
pub struct SharedTimeTables {
    inner: RwLock<Arc<TimeTables>>,
}

impl SharedTimeTables {
    pub fn new(tables: TimeTables) -> Self {
        Self {
            inner: RwLock::new(Arc::new(tables)),
        }
    }

    /// Current tables; unaffected by later replacements
    pub fn snapshot(&self) -> Arc<TimeTables> {
        match self.inner.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub fn replace(&self, tables: TimeTables) {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Arc::new(tables);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const TAI_UTC: &str = "\
 1961 JAN  1 =JD 2437300.5  TAI-UTC=   1.4228180 S + (MJD - 37300.) X 0.001296 S
 1972 JAN  1 =JD 2441317.5  TAI-UTC=  10.0       S + (MJD - 41317.) X 0.0      S
 2017 JAN  1 =JD 2457754.5  TAI-UTC=  37.0       S + (MJD - 41317.) X 0.0      S
";

    fn finals_row(mjd: &str, flag: char, ut1: &str) -> String {
        let mut row = format!("{:<7}{:>8}", "171001", mjd);
        row.push_str(&" ".repeat(57 - row.len()));
        row.push(flag);
        row.push_str(&format!("{:>10}", ut1));
        row.push_str("  0.0000071");
        row
    }

    #[test]
    fn test_parse_leap_seconds() {
        let entries = parse_leap_seconds(TAI_UTC).unwrap();
        assert_eq!(entries.len(), 3);
        assert_abs_diff_eq!(entries[0].mjd, 37300.0, epsilon = 1e-9);
        assert_abs_diff_eq!(entries[0].rate, 0.001296, epsilon = 1e-12);
        assert_abs_diff_eq!(entries[2].offset, 37.0, epsilon = 1e-12);

        let tables = TimeTables::new(entries, Vec::new());
        assert_abs_diff_eq!(tables.delta_tai(37310.0).unwrap(), 1.4228180 + 10.0 * 0.001296, epsilon = 1e-9);
        assert_abs_diff_eq!(tables.delta_gps(58000.0).unwrap(), 18.0, epsilon = 1e-12);

        // the row pattern is shared between calls
        assert!(LEAP_SECOND_ROW.is_ok());
        assert_eq!(parse_leap_seconds(TAI_UTC).unwrap().len(), 3);
    }

    #[test]
    fn test_malformed_leap_second_row() {
        let text = " 1972 JAN  1 =JD 2441317.5  TAI-UTC=  ten S + (MJD - 41317.) X 0.0 S\n";
        assert!(matches!(parse_leap_seconds(text), Err(GeoError::InvalidFormat(_))));
    }

    #[test]
    fn test_parse_ut1_skips_rows_without_value() {
        let text = [
            finals_row("58027.00", 'I', "0.3207893"),
            finals_row("58028.00", 'P', "0.3198000"),
            format!("{:<7}{:>8}", "171003", "58029.00"),
            String::new(),
        ]
        .join("\n");

        let entries = parse_ut1(&text).unwrap();
        assert_eq!(entries.len(), 2);
        assert_abs_diff_eq!(entries[1].mjd, 58028.0, epsilon = 1e-12);

        let tables = TimeTables::new(Vec::new(), entries);
        assert_abs_diff_eq!(tables.delta_ut1(58027.5).unwrap(), 0.32029465, epsilon = 1e-9);
        assert!(tables.delta_ut1(58029.0).is_err());
    }

    #[test]
    fn test_parse_ut1_rejects_garbage() {
        let text = finals_row("58027.00", 'I', "0.32x7893");
        assert!(matches!(parse_ut1(&text), Err(GeoError::InvalidFormat(_))));
    }

    #[test]
    fn test_load_from_cache_directory() {
        let dir = tempfile::tempdir().unwrap();
        let source = TimeTableSource {
            cache_dir: dir.path().to_path_buf(),
            ..TimeTableSource::default()
        };
        let loader = TimeTableLoader::new(source);
        assert!(loader.load_cached().is_err());

        std::fs::write(loader.ut1_path(), finals_row("58027.00", 'I', "0.3207893")).unwrap();
        let tables = loader.load_cached().unwrap();
        assert_eq!(tables.ut1_entries().len(), 1);
        assert_eq!(tables.leap_seconds().len(), builtin_leap_seconds().len());

        std::fs::write(loader.leap_second_path(), TAI_UTC).unwrap();
        assert_eq!(loader.load_cached().unwrap().leap_seconds().len(), 3);
    }

    #[test]
    fn test_shared_tables_snapshot_survives_replace() {
        let shared = SharedTimeTables::new(TimeTables::with_builtin_leap_seconds());
        let before = shared.snapshot();
        shared.replace(TimeTables::new(Vec::new(), Vec::new()));

        assert!(!before.leap_seconds().is_empty());
        assert!(shared.snapshot().leap_seconds().is_empty());
    }
}
