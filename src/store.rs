/// In-memory measurement store.
///
/// Holds the enriched observation table, sorted chronologically once at
/// construction, and answers the three query shapes the service needs:
/// raw per-site series, per-site window aggregates, and the site/coverage
/// listing. The table is immutable after construction — reloading a fresh
/// data drop means building a new store and swapping the service value.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::model::{AggregateSnapshot, Observation, QueryError, SiteCoverage, round2};

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct MeasurementStore {
    /// All observations, ascending by timestamp.
    observations: Vec<Observation>,
}

impl MeasurementStore {
    /// Builds a store from an enriched observation batch. Sorts once here so
    /// every raw-series query comes back chronological for free.
    pub fn new(mut observations: Vec<Observation>) -> Self {
        observations.sort_by_key(|o| o.timestamp);
        MeasurementStore { observations }
    }

    /// Raw observation series for one site over a window, inclusive on both
    /// boundaries, in chronological order.
    ///
    /// Fails with `NotFound` when the store is empty or nothing matches —
    /// the common outcome for a misspelled site name or an empty window.
    pub fn query_raw(
        &self,
        site_name: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<&Observation>, QueryError> {
        if self.observations.is_empty() {
            return Err(QueryError::NotFound("measurements data not loaded".to_string()));
        }
        let matched: Vec<&Observation> = self
            .observations
            .iter()
            .filter(|o| o.site_name == site_name && o.timestamp >= start && o.timestamp <= end)
            .collect();
        if matched.is_empty() {
            return Err(QueryError::NotFound(format!(
                "no measurements for site '{}' in the requested window",
                site_name
            )));
        }
        Ok(matched)
    }

    /// Window aggregate for one site: arithmetic mean of each numeric field
    /// over the matched rows, rounded to 2 decimals. Same not-found
    /// semantics as `query_raw`.
    pub fn query_aggregate(
        &self,
        site_name: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<AggregateSnapshot, QueryError> {
        let rows = self.query_raw(site_name, start, end)?;
        let n = rows.len() as f64;
        let (mut chl, mut sst, mut turb, mut prob) = (0.0, 0.0, 0.0, 0.0);
        for row in &rows {
            chl += row.chlorophyll_a;
            sst += row.sea_surface_temperature;
            turb += row.turbidity;
            prob += row.bloom_probability;
        }
        Ok(AggregateSnapshot {
            chl_a: round2(chl / n),
            sst: round2(sst / n),
            turbidity: round2(turb / n),
            probability: round2(prob / n),
        })
    }

    /// One coverage entry per distinct site name present in the table, with
    /// the earliest and latest observed timestamps as calendar dates.
    /// Sorted by site name so repeated calls return identical listings.
    /// An empty store yields an empty listing, not an error.
    pub fn list_sites_with_coverage(&self) -> Vec<SiteCoverage> {
        let mut ranges: BTreeMap<&str, (DateTime<Utc>, DateTime<Utc>)> = BTreeMap::new();
        for obs in &self.observations {
            ranges
                .entry(obs.site_name.as_str())
                .and_modify(|(min, max)| {
                    if obs.timestamp < *min {
                        *min = obs.timestamp;
                    }
                    if obs.timestamp > *max {
                        *max = obs.timestamp;
                    }
                })
                .or_insert((obs.timestamp, obs.timestamp));
        }
        ranges
            .into_iter()
            .map(|(site, (min, max))| SiteCoverage {
                site: site.to_string(),
                start_date: min.format("%Y-%m-%d").to_string(),
                end_date: max.format("%Y-%m-%d").to_string(),
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
