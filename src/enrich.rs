/// Observation enrichment pipeline.
///
/// Takes raw satellite samples (point, time, chlorophyll) and produces the
/// enriched `Observation` rows the rest of the service works with: nearest
/// site resolved, risk fields derived, provenance stamped.
///
/// Ancillary fields (SST, turbidity, salinity) are not present in the
/// chlorophyll extract. When a sample does not carry them, placeholders are
/// drawn from rough climatological distributions for Irish coastal waters and
/// the row is flagged `Provenance::Synthetic` — see the provenance notes in
/// `model`. Supplying all three marks the row `Observed`.

use rand::Rng;

use crate::model::{DATA_SOURCE_COPERNICUS, Observation, Provenance};
use crate::{risk, sites};

// ---------------------------------------------------------------------------
// Raw samples
// ---------------------------------------------------------------------------

/// One cleaned satellite sample, pre-enrichment. Rows with missing
/// chlorophyll or unparseable timestamps never get this far — the loader
/// drops them.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSample {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub chlorophyll_a: f64,
    /// Co-located ancillary measurements, when a real source provides them.
    pub sea_surface_temperature: Option<f64>,
    pub turbidity: Option<f64>,
    pub salinity: Option<f64>,
}

// ---------------------------------------------------------------------------
// Placeholder distributions
// ---------------------------------------------------------------------------

/// (mean, spread) for the synthetic ancillary placeholders, approximating the
/// normal distributions the upstream pipeline sampled: SST N(14, 2),
/// turbidity N(3, 1), salinity N(34, 1).
const SST_MEAN: f64 = 14.0;
const SST_SPREAD: f64 = 2.0;
const TURBIDITY_MEAN: f64 = 3.0;
const TURBIDITY_SPREAD: f64 = 1.0;
const SALINITY_MEAN: f64 = 34.0;
const SALINITY_SPREAD: f64 = 1.0;

/// Approximate normal sample: mean of 4 uniforms over [mean - 2*spread,
/// mean + 2*spread]. Bell-shaped enough for placeholder data without pulling
/// in a distributions crate.
fn synthetic_value<R: Rng>(rng: &mut R, mean: f64, spread: f64) -> f64 {
    let lo = mean - 2.0 * spread;
    let hi = mean + 2.0 * spread;
    let sum: f64 = (0..4).map(|_| rng.gen_range(lo..hi)).sum();
    sum / 4.0
}

// ---------------------------------------------------------------------------
// Enrichment
// ---------------------------------------------------------------------------

/// Enriches a single raw sample.
pub fn enrich_sample<R: Rng>(sample: &RawSample, rng: &mut R) -> Observation {
    let (site_id, site_name) = sites::resolve(sample.latitude, sample.longitude);
    let assessment = risk::classify(sample.chlorophyll_a);

    // The row is Observed only when every ancillary field came from a real
    // source; one fabricated field taints the set.
    let provenance = if sample.sea_surface_temperature.is_some()
        && sample.turbidity.is_some()
        && sample.salinity.is_some()
    {
        Provenance::Observed
    } else {
        Provenance::Synthetic
    };

    Observation {
        timestamp: sample.timestamp,
        latitude: sample.latitude,
        longitude: sample.longitude,
        chlorophyll_a: sample.chlorophyll_a,
        site_id: site_id.to_string(),
        site_name: site_name.to_string(),
        bloom_probability: assessment.bloom_probability,
        risk_level: assessment.risk_level,
        bloom_label: assessment.bloom_label,
        sea_surface_temperature: sample
            .sea_surface_temperature
            .unwrap_or_else(|| synthetic_value(rng, SST_MEAN, SST_SPREAD)),
        turbidity: sample
            .turbidity
            .unwrap_or_else(|| synthetic_value(rng, TURBIDITY_MEAN, TURBIDITY_SPREAD)),
        salinity: sample
            .salinity
            .unwrap_or_else(|| synthetic_value(rng, SALINITY_MEAN, SALINITY_SPREAD)),
        ancillary_provenance: provenance,
        data_source: DATA_SOURCE_COPERNICUS.to_string(),
    }
}

/// Enriches a full batch in one pass. Observation order follows sample order;
/// callers that need chronological order sort at store construction.
pub fn enrich_batch<R: Rng>(samples: &[RawSample], rng: &mut R) -> Vec<Observation> {
    samples.iter().map(|s| enrich_sample(s, rng)).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
