/// Historical bloom-event log with fuzzy site matching.
///
/// The HAEDAT export records event locations as free text ("galway bay ",
/// "Bantry bay, Cork") that rarely matches the curated registry names
/// byte-for-byte, so lookups resolve the requested site against the distinct
/// location strings with normalized Levenshtein similarity before counting.
///
/// This dataset is optional enrichment, not load-bearing: every failure mode
/// here (empty table, no similar location, no events in the window) degrades
/// to a zero count rather than an error.

use chrono::{DateTime, Utc};

use crate::model::BloomEvent;

/// Minimum normalized similarity (0-1) for a location-text match.
/// Below this, the requested site is treated as having no event history.
pub const MATCH_CUTOFF: f64 = 0.6;

// ---------------------------------------------------------------------------
// Event log
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct EventLog {
    events: Vec<BloomEvent>,
}

impl EventLog {
    pub fn new(events: Vec<BloomEvent>) -> Self {
        EventLog { events }
    }

    /// Counts events for a site within `[start, end]` inclusive.
    ///
    /// The site name is fuzzy-resolved against the distinct location strings
    /// in the log; the best candidate is used only if its similarity clears
    /// `MATCH_CUTOFF`, otherwise the count is 0. Never errors.
    pub fn count_events(&self, site_name: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> usize {
        let Some(matched_location) = self.resolve_location(site_name) else {
            return 0;
        };
        self.events
            .iter()
            .filter(|e| {
                normalize(&e.location_text) == matched_location
                    && e.initial_date >= start
                    && e.initial_date <= end
            })
            .count()
    }

    /// Best-matching normalized location for a requested site name, if any
    /// clears the similarity cutoff. Ties keep the first candidate seen.
    fn resolve_location(&self, site_name: &str) -> Option<String> {
        let query = normalize(site_name);
        if query.is_empty() {
            return None;
        }
        let mut best: Option<(String, f64)> = None;
        let mut seen = std::collections::HashSet::new();
        for event in &self.events {
            let candidate = normalize(&event.location_text);
            if !seen.insert(candidate.clone()) {
                continue;
            }
            let score = strsim::normalized_levenshtein(&query, &candidate);
            match &best {
                Some((_, best_score)) if score <= *best_score => {}
                _ => best = Some((candidate, score)),
            }
        }
        match best {
            Some((location, score)) if score >= MATCH_CUTOFF => Some(location),
            _ => None,
        }
    }
}

/// Case- and whitespace-insensitive canonical form used on both sides of the
/// similarity comparison.
fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
