/// Snapshot table loading.
///
/// Parses the two CSV inputs the service runs on:
///   - the enriched measurement table written by the satellite pipeline
///     (`timestamp, latitude, longitude, chlorophyll_a, site_id, site_name,
///     bloom_probability, risk_level, bloom_label, data_source, sst,
///     turbidity, salinity`);
///   - the HAEDAT event export (`locationText`, `initialDate`, plus columns
///     we ignore), which ships as Latin-1.
///
/// Row-level failures (unparseable timestamp, missing numeric, unknown risk
/// label) drop the row and keep going; the caller decides whether a missing
/// or empty *file* is fatal. Per the service contract the measurement table
/// is required and the event table is optional.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use std::fmt;
use std::path::Path;

use crate::logging::{self, DataSource};
use crate::model::{BloomEvent, Observation, Provenance, RiskLevel};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// File-level snapshot loading failures. Row-level problems never surface
/// here — bad rows are dropped and logged.
#[derive(Debug)]
pub enum SnapshotError {
    /// The file could not be opened or read.
    Io(String),
    /// The file opened but the CSV structure was unusable (e.g. missing
    /// required headers).
    Format(String),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::Io(msg) => write!(f, "snapshot I/O error: {}", msg),
            SnapshotError::Format(msg) => write!(f, "snapshot format error: {}", msg),
        }
    }
}

impl std::error::Error for SnapshotError {}

// ---------------------------------------------------------------------------
// Measurement table
// ---------------------------------------------------------------------------

/// Raw measurement row as serialized by the upstream pipeline. Everything is
/// optional or stringly typed at this layer so one malformed cell drops one
/// row instead of aborting the load.
#[derive(Debug, Deserialize)]
struct MeasurementRow {
    timestamp: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    chlorophyll_a: Option<f64>,
    site_id: String,
    site_name: String,
    bloom_probability: Option<f64>,
    risk_level: String,
    bloom_label: Option<u8>,
    data_source: String,
    sst: Option<f64>,
    turbidity: Option<f64>,
    salinity: Option<f64>,
}

/// Loads the enriched measurement table.
///
/// Returns the rows that survived parsing; an empty vec is a legal result
/// (the caller treats an empty store as "not loaded" at query time).
pub fn load_measurements(path: &Path) -> Result<Vec<Observation>, SnapshotError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| SnapshotError::Io(e.to_string()))?;

    let mut observations = Vec::new();
    let mut dropped = 0usize;

    for result in reader.deserialize::<MeasurementRow>() {
        let row = match result {
            Ok(r) => r,
            Err(_) => {
                dropped += 1;
                continue;
            }
        };
        match observation_from_row(row) {
            Some(obs) => observations.push(obs),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        logging::warn(
            DataSource::Copernicus,
            None,
            &format!("dropped {} unparseable measurement rows", dropped),
        );
    }
    logging::info(
        DataSource::Copernicus,
        None,
        &format!("loaded {} measurement rows from {}", observations.len(), path.display()),
    );
    Ok(observations)
}

fn observation_from_row(row: MeasurementRow) -> Option<Observation> {
    let timestamp = parse_snapshot_timestamp(&row.timestamp)?;
    let risk_level = RiskLevel::parse(&row.risk_level)?;
    Some(Observation {
        timestamp,
        latitude: row.latitude?,
        longitude: row.longitude?,
        chlorophyll_a: row.chlorophyll_a?,
        site_id: row.site_id,
        site_name: row.site_name,
        bloom_probability: row.bloom_probability?,
        risk_level,
        bloom_label: row.bloom_label?,
        sea_surface_temperature: row.sst?,
        turbidity: row.turbidity?,
        salinity: row.salinity?,
        // The current upstream pipeline fabricates all three ancillary
        // columns; there is no provenance column in the snapshot yet, so
        // everything loaded from it is marked synthetic. See enrich.rs for
        // the path real co-located measurements would take.
        ancillary_provenance: Provenance::Synthetic,
        data_source: row.data_source,
    })
}

// ---------------------------------------------------------------------------
// Event table
// ---------------------------------------------------------------------------

/// Loads the HAEDAT event export.
///
/// The export is Latin-1 encoded, so rows are read as bytes and converted
/// lossily; location text only feeds a fuzzy comparison, so replacement
/// characters in the odd accented name are harmless.
pub fn load_events(path: &Path) -> Result<Vec<BloomEvent>, SnapshotError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| SnapshotError::Io(e.to_string()))?;

    let headers = reader
        .byte_headers()
        .map_err(|e| SnapshotError::Format(e.to_string()))?
        .clone();
    let location_idx = column_index(&headers, b"locationText")
        .ok_or_else(|| SnapshotError::Format("missing locationText column".to_string()))?;
    let date_idx = column_index(&headers, b"initialDate")
        .ok_or_else(|| SnapshotError::Format("missing initialDate column".to_string()))?;

    let mut events = Vec::new();
    let mut dropped = 0usize;

    for result in reader.byte_records() {
        let record = match result {
            Ok(r) => r,
            Err(_) => {
                dropped += 1;
                continue;
            }
        };
        let location_text = match record.get(location_idx) {
            Some(bytes) if !bytes.is_empty() => String::from_utf8_lossy(bytes).into_owned(),
            _ => {
                dropped += 1;
                continue;
            }
        };
        let initial_date = record
            .get(date_idx)
            .map(String::from_utf8_lossy)
            .and_then(|s| parse_snapshot_timestamp(&s));
        match initial_date {
            Some(initial_date) => events.push(BloomEvent { location_text, initial_date }),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        logging::warn(
            DataSource::Haedat,
            None,
            &format!("dropped {} unparseable event rows", dropped),
        );
    }
    logging::info(
        DataSource::Haedat,
        None,
        &format!("loaded {} event rows from {}", events.len(), path.display()),
    );
    Ok(events)
}

fn column_index(headers: &csv::ByteRecord, name: &[u8]) -> Option<usize> {
    headers.iter().position(|h| h == name)
}

// ---------------------------------------------------------------------------
// Timestamp parsing
// ---------------------------------------------------------------------------

/// Parses the timestamp formats seen across both snapshots: RFC 3339,
/// `YYYY-MM-DD HH:MM:SS`, and bare `YYYY-MM-DD`. Returns `None` on anything
/// else so the caller can drop the row.
pub fn parse_snapshot_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;

    const MEASUREMENT_HEADER: &str = "timestamp,latitude,longitude,chlorophyll_a,site_id,site_name,bloom_probability,risk_level,bloom_label,data_source,sst,turbidity,salinity";

    fn write_temp_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        file.write_all(contents.as_bytes()).expect("write temp file");
        file
    }

    #[test]
    fn test_load_measurements_parses_valid_rows() {
        let csv = format!(
            "{}\n2025-06-10 12:00:00,53.27,-9.06,18.5,S001,Galway Bay,0.9,critical,1,copernicus_satellite,14.2,3.1,34.0\n",
            MEASUREMENT_HEADER
        );
        let file = write_temp_csv(&csv);
        let rows = load_measurements(file.path()).expect("load should succeed");
        assert_eq!(rows.len(), 1);
        let obs = &rows[0];
        assert_eq!(obs.site_name, "Galway Bay");
        assert_eq!(obs.risk_level, RiskLevel::Critical);
        assert_eq!(obs.bloom_label, 1);
        assert_eq!(obs.ancillary_provenance, Provenance::Synthetic);
        assert_eq!(
            obs.timestamp,
            Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_load_measurements_drops_bad_rows_keeps_good() {
        let csv = format!(
            "{}\n\
             not-a-date,53.27,-9.06,18.5,S001,Galway Bay,0.9,critical,1,copernicus_satellite,14.2,3.1,34.0\n\
             2025-06-10 12:00:00,53.27,-9.06,,S001,Galway Bay,0.9,critical,1,copernicus_satellite,14.2,3.1,34.0\n\
             2025-06-11 12:00:00,53.27,-9.06,8.0,S001,Galway Bay,0.2,low,0,copernicus_satellite,13.8,2.9,33.7\n",
            MEASUREMENT_HEADER
        );
        let file = write_temp_csv(&csv);
        let rows = load_measurements(file.path()).expect("load should succeed");
        assert_eq!(rows.len(), 1, "bad timestamp and missing chl rows are dropped");
        assert_eq!(rows[0].risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_load_measurements_missing_file_is_io_error() {
        let result = load_measurements(Path::new("/nonexistent/hab_data.csv"));
        assert!(matches!(result, Err(SnapshotError::Io(_))));
    }

    #[test]
    fn test_load_events_parses_and_drops() {
        let csv = "eventName,locationText,initialDate,region\n\
                   HAB-2019-044,galway bay ,2019-07-03,IE\n\
                   HAB-2020-012,Bantry Bay,2020-06-09,IE\n\
                   HAB-2021-001,Cork Harbor,never,IE\n";
        let file = write_temp_csv(csv);
        let events = load_events(file.path()).expect("load should succeed");
        assert_eq!(events.len(), 2, "row with unparseable initialDate is dropped");
        assert_eq!(events[0].location_text, "galway bay ");
        assert_eq!(
            events[0].initial_date,
            Utc.with_ymd_and_hms(2019, 7, 3, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_load_events_tolerates_latin1_bytes() {
        // "Dún Laoghaire" with a Latin-1 ú (0xFA), invalid as UTF-8.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"locationText,initialDate\n");
        bytes.extend_from_slice(b"D\xFAn Laoghaire,2021-03-15\n");
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        file.write_all(&bytes).expect("write temp file");

        let events = load_events(file.path()).expect("latin-1 bytes must not abort the load");
        assert_eq!(events.len(), 1);
        // Lossy conversion: the location is still usable for fuzzy matching.
        assert!(events[0].location_text.contains("n Laoghaire"));
    }

    #[test]
    fn test_load_events_missing_required_column_is_format_error() {
        let file = write_temp_csv("eventName,region\nHAB-1,IE\n");
        assert!(matches!(load_events(file.path()), Err(SnapshotError::Format(_))));
    }

    #[test]
    fn test_parse_snapshot_timestamp_formats() {
        assert!(parse_snapshot_timestamp("2025-06-10T12:00:00+00:00").is_some());
        assert!(parse_snapshot_timestamp("2025-06-10 12:00:00").is_some());
        assert!(parse_snapshot_timestamp("2025-06-10").is_some());
        assert!(parse_snapshot_timestamp("10/06/2025").is_none());
        assert!(parse_snapshot_timestamp("").is_none());
    }
}
