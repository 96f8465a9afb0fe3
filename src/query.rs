/// Query service orchestration.
///
/// Composes the measurement store, the optional event log, and the
/// explanation provider into the three request shapes the serving layer
/// exposes: site discovery, raw measurement series, and explained answers.
///
/// The service owns all reference state explicitly — nothing here reads
/// globals — so a test can inject fixture tables and a fresh data drop is
/// handled by building a new `QueryService` and swapping it in whole.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::events::EventLog;
use crate::llm::ExplanationProvider;
use crate::logging;
use crate::model::{AggregateSnapshot, Observation, QueryError, SiteCoverage, round2};
use crate::store::MeasurementStore;

// ---------------------------------------------------------------------------
// Snapshot policy
// ---------------------------------------------------------------------------

/// Which representative snapshot of the window feeds the explanation prompt.
///
/// The two policies existed side by side in earlier revisions of this
/// pipeline; `LatestRow` reflects "current state at this site" and is the
/// default, `WindowMean` smooths over single-pass artifacts. Configurable
/// rather than hardcoded because reasonable deployments want either.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotPolicy {
    /// Most recent observation in the filtered window.
    LatestRow,
    /// Arithmetic mean over the filtered window.
    WindowMean,
}

impl Default for SnapshotPolicy {
    fn default() -> Self {
        SnapshotPolicy::LatestRow
    }
}

impl SnapshotPolicy {
    /// Parses the policy names accepted in the config file.
    pub fn parse(label: &str) -> Option<SnapshotPolicy> {
        match label.trim().to_lowercase().as_str() {
            "latest_row" | "latest" => Some(SnapshotPolicy::LatestRow),
            "window_mean" | "mean" => Some(SnapshotPolicy::WindowMean),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

/// One raw measurement row as served to clients. A projection of
/// `Observation` — site fields are implied by the query, ancillary salinity
/// and provenance stay internal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawMeasurement {
    pub timestamp: String,
    pub latitude: f64,
    pub longitude: f64,
    pub chlorophyll_a: f64,
    pub sea_surface_temperature: f64,
    pub turbidity: f64,
    pub bloom_label: u8,
    pub bloom_probability: f64,
}

impl RawMeasurement {
    fn from_observation(obs: &Observation) -> Self {
        RawMeasurement {
            timestamp: obs.timestamp.to_rfc3339(),
            latitude: obs.latitude,
            longitude: obs.longitude,
            chlorophyll_a: obs.chlorophyll_a,
            sea_surface_temperature: obs.sea_surface_temperature,
            turbidity: obs.turbidity,
            bloom_label: obs.bloom_label,
            bloom_probability: obs.bloom_probability,
        }
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

pub struct QueryService {
    store: MeasurementStore,
    /// Optional by design: a deployment without the HAEDAT export still
    /// serves every query, with event counts pinned at zero.
    events: Option<EventLog>,
    explainer: Box<dyn ExplanationProvider + Send + Sync>,
    policy: SnapshotPolicy,
}

impl QueryService {
    pub fn new(
        store: MeasurementStore,
        events: Option<EventLog>,
        explainer: Box<dyn ExplanationProvider + Send + Sync>,
        policy: SnapshotPolicy,
    ) -> Self {
        QueryService {
            store,
            events,
            explainer,
            policy,
        }
    }

    /// Site discovery: every site present in the measurement table with its
    /// temporal coverage. Empty when nothing is loaded.
    pub fn get_site_listing(&self) -> Vec<SiteCoverage> {
        self.store.list_sites_with_coverage()
    }

    /// Raw observation series for a site and window.
    pub fn get_raw_series(
        &self,
        site: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<Vec<RawMeasurement>, QueryError> {
        let (start, end) = parse_window(start_date, end_date)?;
        let rows = self.store.query_raw(site, start, end)?;
        Ok(rows.iter().map(|o| RawMeasurement::from_observation(o)).collect())
    }

    /// Windowed aggregate for a site.
    pub fn get_window_aggregate(
        &self,
        site: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<AggregateSnapshot, QueryError> {
        let (start, end) = parse_window(start_date, end_date)?;
        self.store.query_aggregate(site, start, end)
    }

    /// Historical event count for a site and window; zero when the event
    /// log is absent or the site has no sufficiently similar location.
    pub fn get_event_count(
        &self,
        site: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<usize, QueryError> {
        let (start, end) = parse_window(start_date, end_date)?;
        Ok(self
            .events
            .as_ref()
            .map(|log| log.count_events(site, start, end))
            .unwrap_or(0))
    }

    /// Answers a natural-language question about a site's current HAB state.
    ///
    /// Validation happens before any table scan; the representative
    /// measurement snapshot follows the configured policy; the language-model
    /// answer is returned verbatim, and its failures surface as `Upstream`
    /// without retry.
    pub fn get_explained_answer(
        &self,
        site: &str,
        start_date: &str,
        end_date: &str,
        question: &str,
    ) -> Result<String, QueryError> {
        if site.trim().is_empty() {
            return Err(QueryError::Validation("site is required".to_string()));
        }
        if question.trim().is_empty() {
            return Err(QueryError::Validation("user_question is required".to_string()));
        }
        let (start, end) = parse_window(start_date, end_date)?;

        let rows = self.store.query_raw(site, start, end)?;
        let snapshot = match self.policy {
            // query_raw is chronological, so the last row is the most recent.
            SnapshotPolicy::LatestRow => {
                let latest = rows.last().ok_or_else(|| {
                    QueryError::Internal("measurement query returned no rows".to_string())
                })?;
                AggregateSnapshot {
                    chl_a: round2(latest.chlorophyll_a),
                    sst: round2(latest.sea_surface_temperature),
                    turbidity: round2(latest.turbidity),
                    probability: round2(latest.bloom_probability),
                }
            }
            SnapshotPolicy::WindowMean => self.store.query_aggregate(site, start, end)?,
        };

        let event_count = self
            .events
            .as_ref()
            .map(|log| log.count_events(site, start, end))
            .unwrap_or(0);

        match self.explainer.explain(site, &snapshot, event_count, question) {
            Ok(answer) => Ok(answer),
            Err(e) => {
                logging::log_llm_failure(site, &e);
                Err(QueryError::Upstream("language model unavailable".to_string()))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Window parsing
// ---------------------------------------------------------------------------

/// Parses a client-supplied date window. Accepts `YYYY-MM-DD` or a full
/// RFC 3339 instant. A date-only start is midnight UTC; a date-only end is
/// the last second of that day, so a `YYYY-MM-DD` window includes every
/// observation on its end day (the coverage dates advertised by the site
/// listing are queryable verbatim). RFC 3339 instants are taken exactly as
/// given. Anything else is a validation error — inputs are never silently
/// coerced.
pub fn parse_window(
    start_date: &str,
    end_date: &str,
) -> Result<(DateTime<Utc>, DateTime<Utc>), QueryError> {
    let start = parse_query_date(start_date, false)?;
    let end = parse_query_date(end_date, true)?;
    if start > end {
        return Err(QueryError::Validation(format!(
            "start_date {} is after end_date {}",
            start_date, end_date
        )));
    }
    Ok((start, end))
}

fn parse_query_date(raw: &str, day_end: bool) -> Result<DateTime<Utc>, QueryError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(QueryError::Validation("missing date".to_string()));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        // NaiveDate always has a valid midnight and a valid 23:59:59.
        let dt = if day_end {
            date.and_hms_opt(23, 59, 59).unwrap()
        } else {
            date.and_hms_opt(0, 0, 0).unwrap()
        };
        return Ok(dt.and_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    Err(QueryError::Validation(format!("unrecognized date '{}'", raw)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;
    use crate::model::{BloomEvent, Provenance, RiskLevel};
    use chrono::TimeZone;
    use std::sync::{Arc, Mutex};

    type CallLog = Arc<Mutex<Vec<(String, AggregateSnapshot, usize, String)>>>;

    /// Canned provider that records the inputs it was called with. The call
    /// log is shared so the test keeps a handle after the provider moves
    /// into the service.
    struct RecordingExplainer {
        calls: CallLog,
        fail: bool,
    }

    impl RecordingExplainer {
        fn ok() -> (Self, CallLog) {
            let calls: CallLog = Arc::new(Mutex::new(Vec::new()));
            (
                RecordingExplainer {
                    calls: Arc::clone(&calls),
                    fail: false,
                },
                calls,
            )
        }
        fn failing() -> Self {
            RecordingExplainer {
                calls: Arc::new(Mutex::new(Vec::new())),
                fail: true,
            }
        }
    }

    impl ExplanationProvider for RecordingExplainer {
        fn explain(
            &self,
            site: &str,
            snapshot: &AggregateSnapshot,
            event_count: usize,
            question: &str,
        ) -> Result<String, LlmError> {
            self.calls.lock().unwrap().push((
                site.to_string(),
                snapshot.clone(),
                event_count,
                question.to_string(),
            ));
            if self.fail {
                Err(LlmError::Http(529))
            } else {
                Ok("Elevated chlorophyll suggests an active bloom.".to_string())
            }
        }
    }

    fn observation(day: u32, chl: f64) -> Observation {
        let assessment = crate::risk::classify(chl);
        Observation {
            timestamp: Utc.with_ymd_and_hms(2025, 6, day, 12, 0, 0).unwrap(),
            latitude: 53.35,
            longitude: -6.26,
            chlorophyll_a: chl,
            site_id: "S003".to_string(),
            site_name: "Dublin Bay".to_string(),
            bloom_probability: assessment.bloom_probability,
            risk_level: assessment.risk_level,
            bloom_label: assessment.bloom_label,
            sea_surface_temperature: 14.0,
            turbidity: 3.0,
            salinity: 34.0,
            ancillary_provenance: Provenance::Synthetic,
            data_source: "copernicus_satellite".to_string(),
        }
    }

    fn events() -> EventLog {
        EventLog::new(vec![
            BloomEvent {
                location_text: "dublin bay ".to_string(),
                initial_date: Utc.with_ymd_and_hms(2025, 6, 5, 0, 0, 0).unwrap(),
            },
            BloomEvent {
                location_text: "DUBLIN BAY".to_string(),
                initial_date: Utc.with_ymd_and_hms(2025, 6, 11, 0, 0, 0).unwrap(),
            },
        ])
    }

    fn service(policy: SnapshotPolicy, explainer: RecordingExplainer) -> QueryService {
        let store = crate::store::MeasurementStore::new(vec![
            observation(10, 3.0),
            observation(11, 12.0),
            observation(12, 22.0),
        ]);
        QueryService::new(store, Some(events()), Box::new(explainer), policy)
    }

    #[test]
    fn test_site_listing_delegates_to_store() {
        let svc = service(SnapshotPolicy::LatestRow, RecordingExplainer::ok().0);
        let listing = svc.get_site_listing();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].site, "Dublin Bay");
        assert_eq!(listing[0].start_date, "2025-06-10");
        assert_eq!(listing[0].end_date, "2025-06-12");
    }

    #[test]
    fn test_raw_series_maps_to_wire_shape_in_order() {
        let svc = service(SnapshotPolicy::LatestRow, RecordingExplainer::ok().0);
        let rows = svc
            .get_raw_series("Dublin Bay", "2025-06-01", "2025-06-30")
            .expect("should match");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].chlorophyll_a, 3.0);
        assert_eq!(rows[2].chlorophyll_a, 22.0);
        assert_eq!(rows[0].bloom_label, 0);
        assert_eq!(rows[2].bloom_label, 1);
    }

    #[test]
    fn test_raw_series_invalid_date_is_validation_error_before_scan() {
        let svc = service(SnapshotPolicy::LatestRow, RecordingExplainer::ok().0);
        let err = svc
            .get_raw_series("Dublin Bay", "June 1st", "2025-06-30")
            .unwrap_err();
        assert!(matches!(err, QueryError::Validation(_)));
    }

    #[test]
    fn test_raw_series_inverted_window_is_validation_error() {
        let svc = service(SnapshotPolicy::LatestRow, RecordingExplainer::ok().0);
        let err = svc
            .get_raw_series("Dublin Bay", "2025-06-30", "2025-06-01")
            .unwrap_err();
        assert!(matches!(err, QueryError::Validation(_)));
    }

    #[test]
    fn test_raw_series_unknown_site_is_not_found() {
        let svc = service(SnapshotPolicy::LatestRow, RecordingExplainer::ok().0);
        let err = svc
            .get_raw_series("Atlantis", "2025-06-01", "2025-06-30")
            .unwrap_err();
        assert!(matches!(err, QueryError::NotFound(_)));
    }

    #[test]
    fn test_window_aggregate_means() {
        let svc = service(SnapshotPolicy::LatestRow, RecordingExplainer::ok().0);
        let agg = svc
            .get_window_aggregate("Dublin Bay", "2025-06-01", "2025-06-30")
            .expect("should match");
        assert_eq!(agg.chl_a, 12.33);
    }

    #[test]
    fn test_event_count_with_and_without_log() {
        let svc = service(SnapshotPolicy::LatestRow, RecordingExplainer::ok().0);
        assert_eq!(
            svc.get_event_count("Dublin Bay", "2025-06-01", "2025-06-30").unwrap(),
            2
        );

        let store = crate::store::MeasurementStore::new(vec![observation(10, 3.0)]);
        let no_events =
            QueryService::new(store, None, Box::new(RecordingExplainer::ok().0), SnapshotPolicy::LatestRow);
        assert_eq!(
            no_events.get_event_count("Dublin Bay", "2025-06-01", "2025-06-30").unwrap(),
            0
        );
    }

    #[test]
    fn test_explained_answer_returns_provider_text_verbatim() {
        let svc = service(SnapshotPolicy::LatestRow, RecordingExplainer::ok().0);
        let answer = svc
            .get_explained_answer("Dublin Bay", "2025-06-01", "2025-06-30", "Why the risk?")
            .expect("explanation should succeed");
        assert_eq!(answer, "Elevated chlorophyll suggests an active bloom.");
    }

    #[test]
    fn test_explained_answer_feeds_latest_snapshot_and_event_count() {
        let store = crate::store::MeasurementStore::new(vec![
            observation(10, 3.0),
            observation(12, 22.0),
        ]);
        let (explainer, call_log) = RecordingExplainer::ok();
        let svc = QueryService::new(store, Some(events()), Box::new(explainer), SnapshotPolicy::LatestRow);
        svc.get_explained_answer("Dublin Bay", "2025-06-01", "2025-06-30", "Why?")
            .expect("explanation should succeed");

        let calls = call_log.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (site, snapshot, event_count, question) = &calls[0];
        assert_eq!(site, "Dublin Bay");
        assert_eq!(snapshot.chl_a, 22.0, "latest-row policy takes the June 12 observation");
        assert_eq!(snapshot.probability, 0.95);
        assert_eq!(*event_count, 2);
        assert_eq!(question, "Why?");
    }

    #[test]
    fn test_explained_answer_window_mean_policy_uses_aggregate() {
        let store = crate::store::MeasurementStore::new(vec![
            observation(10, 3.0),
            observation(11, 12.0),
            observation(12, 22.0),
        ]);
        let (explainer, call_log) = RecordingExplainer::ok();
        let svc = QueryService::new(store, Some(events()), Box::new(explainer), SnapshotPolicy::WindowMean);
        svc.get_explained_answer("Dublin Bay", "2025-06-01", "2025-06-30", "Why?")
            .expect("explanation should succeed");

        let calls = call_log.lock().unwrap();
        assert_eq!(calls[0].1.chl_a, 12.33, "window-mean policy feeds the aggregate");
    }

    #[test]
    fn test_explained_answer_missing_fields_are_validation_errors() {
        let svc = service(SnapshotPolicy::LatestRow, RecordingExplainer::ok().0);
        assert!(matches!(
            svc.get_explained_answer("", "2025-06-01", "2025-06-30", "Why?"),
            Err(QueryError::Validation(_))
        ));
        assert!(matches!(
            svc.get_explained_answer("Dublin Bay", "2025-06-01", "2025-06-30", "  "),
            Err(QueryError::Validation(_))
        ));
    }

    #[test]
    fn test_explained_answer_empty_window_is_not_found_before_llm_call() {
        let (explainer, call_log) = RecordingExplainer::ok();
        let store = crate::store::MeasurementStore::new(vec![observation(10, 3.0)]);
        let svc = QueryService::new(store, None, Box::new(explainer), SnapshotPolicy::LatestRow);
        let err = svc
            .get_explained_answer("Dublin Bay", "2025-07-01", "2025-07-31", "Why?")
            .unwrap_err();
        assert!(matches!(err, QueryError::NotFound(_)));
        assert!(
            call_log.lock().unwrap().is_empty(),
            "provider must not be called when no measurements match"
        );
    }

    #[test]
    fn test_explained_answer_llm_failure_maps_to_upstream() {
        let svc = service(SnapshotPolicy::LatestRow, RecordingExplainer::failing());
        let err = svc
            .get_explained_answer("Dublin Bay", "2025-06-01", "2025-06-30", "Why?")
            .unwrap_err();
        assert_eq!(err, QueryError::Upstream("language model unavailable".to_string()));
    }

    #[test]
    fn test_parse_window_accepts_plain_dates_and_rfc3339() {
        let (start, end) = parse_window("2025-06-01", "2025-06-30T23:59:59+00:00").unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 6, 30, 23, 59, 59).unwrap());
    }

    #[test]
    fn test_parse_window_date_only_end_covers_full_end_day() {
        // A plain end date must not be cut off at midnight, or observations
        // later on the end day silently fall out of the window.
        let (start, end) = parse_window("2025-06-01", "2025-06-30").unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 6, 30, 23, 59, 59).unwrap());
    }

    #[test]
    fn test_parse_window_rfc3339_end_is_taken_verbatim() {
        // End-of-day widening applies to date-only inputs; a full instant
        // means exactly what it says.
        let (_, end) = parse_window("2025-06-01", "2025-06-30T12:00:00+00:00").unwrap();
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 6, 30, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_raw_series_single_day_window_includes_intraday_rows() {
        let svc = service(SnapshotPolicy::LatestRow, RecordingExplainer::ok().0);
        let rows = svc
            .get_raw_series("Dublin Bay", "2025-06-12", "2025-06-12")
            .expect("noon observation on the end day must be included");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].chlorophyll_a, 22.0);
    }
}
