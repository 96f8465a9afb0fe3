/// Core data types for the HAB monitoring service.
///
/// This module defines the shared domain model imported by all other modules.
/// It contains no I/O and almost no logic — only types, their parse/display
/// impls, and the service-wide error taxonomy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Provenance
// ---------------------------------------------------------------------------

/// Provenance tag stamped on every measurement row produced by this pipeline.
pub const DATA_SOURCE_COPERNICUS: &str = "copernicus_satellite";

/// Whether the ancillary fields (SST, turbidity, salinity) on an observation
/// are real co-located measurements or generated placeholders.
///
/// The upstream satellite extract carries chlorophyll only; until a real
/// co-located source is wired in, the enrichment pipeline fabricates the
/// ancillary fields and flags them `Synthetic` so downstream consumers can
/// never mistake them for observed data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Observed,
    Synthetic,
}

// ---------------------------------------------------------------------------
// Risk levels
// ---------------------------------------------------------------------------

/// HAB risk tiers, in ascending order of severity.
///
/// Derived from `bloom_probability` by fixed-cutoff binning in `risk::classify`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Parses the lowercase label used in the snapshot CSV. Returns `None`
    /// for anything unrecognized so the loader can drop the row.
    pub fn parse(label: &str) -> Option<RiskLevel> {
        match label.trim() {
            "low" => Some(RiskLevel::Low),
            "medium" => Some(RiskLevel::Medium),
            "high" => Some(RiskLevel::High),
            "critical" => Some(RiskLevel::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
            RiskLevel::Critical => write!(f, "critical"),
        }
    }
}

// ---------------------------------------------------------------------------
// Observation types
// ---------------------------------------------------------------------------

/// One enriched measurement row: a satellite chlorophyll observation with its
/// resolved site assignment and derived risk fields.
///
/// Invariants maintained by the enrichment pipeline and snapshot loader:
///   - exactly one resolved site per observation (possibly the open-water
///     sentinel from `sites::resolve`);
///   - `bloom_probability` and `risk_level` are deterministic functions of
///     `chlorophyll_a` (see `risk::classify`);
///   - `timestamp` parsed successfully (unparseable rows are dropped upstream).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    /// Chlorophyll-a concentration. Unit is a pass-through from the source
    /// extract (mg/m³ for Copernicus L4 products), never converted here.
    pub chlorophyll_a: f64,
    pub site_id: String,
    pub site_name: String,
    pub bloom_probability: f64,
    pub risk_level: RiskLevel,
    /// 1 if chlorophyll_a exceeded the fixed bloom threshold, else 0.
    pub bloom_label: u8,
    pub sea_surface_temperature: f64,
    pub turbidity: f64,
    pub salinity: f64,
    /// Provenance of the three ancillary fields above.
    pub ancillary_provenance: Provenance,
    pub data_source: String,
}

/// A historical bloom event from the HAEDAT export.
///
/// `location_text` is free text and does not reliably match the curated site
/// registry names — matching is fuzzy, see `events::EventLog`.
#[derive(Debug, Clone, PartialEq)]
pub struct BloomEvent {
    pub location_text: String,
    pub initial_date: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Query result types
// ---------------------------------------------------------------------------

/// Windowed per-site aggregate: arithmetic means rounded to 2 decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateSnapshot {
    pub chl_a: f64,
    pub sst: f64,
    pub turbidity: f64,
    pub probability: f64,
}

/// Temporal coverage entry for one site, dates formatted `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteCoverage {
    pub site: String,
    pub start_date: String,
    pub end_date: String,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors surfaced by the query service, classified for the transport layer.
///
/// The serving layer is outside this crate; `http_status` gives it the
/// intended mapping without leaking internal detail into messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Malformed input: unparseable window dates, missing required fields.
    /// Detected before any table scan.
    Validation(String),
    /// No rows matched the requested site/window. The expected, common case
    /// for a misspelled site or an empty window — not exceptional.
    NotFound(String),
    /// The language-model call failed (transport, HTTP status, or timeout).
    Upstream(String),
    /// Unexpected internal failure, e.g. the measurement table never loaded.
    Internal(String),
}

impl QueryError {
    /// HTTP status the serving layer should translate this error into.
    pub fn http_status(&self) -> u16 {
        match self {
            QueryError::Validation(_) => 400,
            QueryError::NotFound(_) => 404,
            QueryError::Upstream(_) => 502,
            QueryError::Internal(_) => 500,
        }
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::Validation(msg) => write!(f, "Invalid request: {}", msg),
            QueryError::NotFound(msg) => write!(f, "Not found: {}", msg),
            QueryError::Upstream(msg) => write!(f, "Upstream service failure: {}", msg),
            QueryError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for QueryError {}

/// Rounds to 2 decimal places, matching the aggregate contract.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
