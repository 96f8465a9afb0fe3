/// Service configuration.
///
/// Loaded once at startup from a TOML file; every field has a sensible
/// default so a missing file or empty table still yields a runnable
/// configuration. The Anthropic API key is deliberately NOT part of the
/// file — it comes from the environment (`.env` supported) so credentials
/// never land in version-controlled config.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::llm;
use crate::logging::LogLevel;
use crate::query::SnapshotPolicy;

// ---------------------------------------------------------------------------
// Config shape
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Enriched measurement snapshot (required at startup; the loader fails
    /// hard if this file is missing).
    pub measurements_file: PathBuf,
    /// HAEDAT event export (optional; absence degrades event counts to 0).
    pub events_file: PathBuf,
    /// Snapshot policy for the explain endpoint: "latest_row" or "window_mean".
    pub snapshot_policy: String,
    pub llm: LlmConfig,
    pub log: LogConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub file: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            measurements_file: PathBuf::from("./data/hab_dashboard_data.csv"),
            events_file: PathBuf::from("./data/haedat_search.csv"),
            snapshot_policy: "latest_row".to_string(),
            llm: LlmConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        LlmConfig {
            model: llm::DEFAULT_MODEL.to_string(),
            timeout_secs: llm::DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: "info".to_string(),
            file: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl ServiceConfig {
    /// Loads configuration from a TOML file. A missing file yields the
    /// defaults; a present-but-malformed file is an error, because silently
    /// running with defaults against a typo'd config is worse than failing.
    pub fn load(path: &Path) -> Result<ServiceConfig, String> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ServiceConfig::default());
            }
            Err(e) => return Err(format!("failed to read config {}: {}", path.display(), e)),
        };
        toml::from_str(&contents).map_err(|e| format!("invalid config {}: {}", path.display(), e))
    }

    /// Resolved snapshot policy; unrecognized labels fall back to the
    /// default rather than failing startup.
    pub fn snapshot_policy(&self) -> SnapshotPolicy {
        SnapshotPolicy::parse(&self.snapshot_policy).unwrap_or_default()
    }

    /// Resolved minimum log level.
    pub fn log_level(&self) -> LogLevel {
        LogLevel::parse(&self.log.level).unwrap_or(LogLevel::Info)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
