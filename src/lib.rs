//! HAB monitoring service library.
//!
//! Ingests satellite-derived chlorophyll snapshots for the Irish coastal
//! monitoring network, classifies harmful-algal-bloom risk per site, and
//! answers windowed queries — including natural-language questions forwarded
//! to an external language model. The HTTP layer lives outside this crate;
//! it is expected to construct one [`query::QueryService`] at startup and
//! translate [`model::QueryError`] values via `http_status()`.

pub mod config;
pub mod dev_mode;
pub mod enrich;
pub mod events;
pub mod ingest;
pub mod llm;
pub mod logging;
pub mod model;
pub mod query;
pub mod risk;
pub mod sites;
pub mod store;
pub mod verify;

use std::time::Duration;

use crate::config::ServiceConfig;
use crate::events::EventLog;
use crate::ingest::snapshot;
use crate::llm::{AnthropicExplainer, ExplanationProvider};
use crate::logging::DataSource;
use crate::model::QueryError;
use crate::query::QueryService;
use crate::store::MeasurementStore;

/// Builds the query service from configuration and an injected explanation
/// provider. This is the seam tests use to run the full stack with fixture
/// files and a canned provider.
///
/// The asymmetry between the two snapshots is deliberate: the measurement
/// table is required (startup fails without it), the event export is
/// optional (absence degrades event counts to zero).
pub fn build_service(
    config: &ServiceConfig,
    explainer: Box<dyn ExplanationProvider + Send + Sync>,
) -> Result<QueryService, QueryError> {
    let observations = snapshot::load_measurements(&config.measurements_file)
        .map_err(|e| {
            logging::error(DataSource::Copernicus, None, &e.to_string());
            QueryError::Internal("measurement snapshot failed to load".to_string())
        })?;
    let store = MeasurementStore::new(observations);

    let events = match snapshot::load_events(&config.events_file) {
        Ok(events) => Some(EventLog::new(events)),
        Err(e) => {
            logging::warn(
                DataSource::Haedat,
                None,
                &format!("event export unavailable, counts will be 0: {}", e),
            );
            None
        }
    };

    Ok(QueryService::new(store, events, explainer, config.snapshot_policy()))
}

/// Builds the query service with the live Anthropic explainer configured
/// from the environment.
pub fn build_live_service(config: &ServiceConfig) -> Result<QueryService, QueryError> {
    let explainer = AnthropicExplainer::from_env(
        config.llm.model.clone(),
        Duration::from_secs(config.llm.timeout_secs),
    )
    .map_err(|e| {
        logging::error(DataSource::Llm, None, &e.to_string());
        QueryError::Internal("language-model client failed to initialize".to_string())
    })?;
    build_service(config, Box::new(explainer))
}
