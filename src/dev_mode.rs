/// Development mode utilities for working without real data.
///
/// When no satellite snapshot is available, use this module to fabricate a
/// deterministic observation batch for development and demos, and a canned
/// explanation provider so the explain endpoint works without credentials.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::enrich::{self, RawSample};
use crate::llm::{ExplanationProvider, LlmError};
use crate::model::{AggregateSnapshot, Observation};
use crate::sites::SITE_REGISTRY;

/// Configuration for synthetic data generation.
pub struct DevMode {
    /// Seed for the generator; same seed, same batch.
    pub seed: u64,
    /// Days of history to fabricate, one observation per site per day.
    pub days: i64,
}

impl DevMode {
    pub fn new(seed: u64) -> Self {
        Self { seed, days: 30 }
    }

    /// Fabricates an enriched observation batch covering every registered
    /// site for `days` days ending at `end`.
    ///
    /// Points are jittered around each site's coordinates (within the match
    /// threshold, so they resolve back to the site) and chlorophyll spans
    /// the whole classification range so every risk tier shows up in demos.
    pub fn synthetic_batch(&self, end: DateTime<Utc>) -> Vec<Observation> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut samples = Vec::new();
        for day in 0..self.days {
            let timestamp = end - Duration::days(self.days - 1 - day);
            for site in SITE_REGISTRY {
                let chl = rng.gen_range(0.5..25.0);
                samples.push(RawSample {
                    timestamp,
                    latitude: site.latitude + rng.gen_range(-0.05..0.05),
                    longitude: site.longitude + rng.gen_range(-0.05..0.05),
                    chlorophyll_a: chl,
                    sea_surface_temperature: None,
                    turbidity: None,
                    salinity: None,
                });
            }
        }
        enrich::enrich_batch(&samples, &mut rng)
    }
}

/// Explanation provider that answers from a template instead of calling the
/// live API. Used in development and in tests of the query service.
pub struct CannedExplainer;

impl ExplanationProvider for CannedExplainer {
    fn explain(
        &self,
        site: &str,
        snapshot: &AggregateSnapshot,
        event_count: usize,
        _question: &str,
    ) -> Result<String, LlmError> {
        Ok(format!(
            "[dev] At {} the chlorophyll-a level is {} with bloom probability {}; \
             {} historical HAB events were reported in the selected period.",
            site, snapshot.chl_a, snapshot.probability, event_count
        ))
    }
}
