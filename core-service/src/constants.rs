//! Central Configuration Constants
//!
//! Single source of truth for configuration defaults.
//! Every value can be overridden from the environment.

use std::time::Duration;

/// Default per-source request timeout (seconds)
pub const DEFAULT_SOURCE_TIMEOUT_SECS: u64 = 10;

/// Default overall fan-out deadline (seconds)
pub const DEFAULT_ANALYSIS_DEADLINE_SECS: u64 = 30;

/// Maximum indicators accepted by one bulk analysis
pub const MAX_BULK_INDICATORS: usize = 100;

/// Maximum accepted indicator length
pub const MAX_INDICATOR_LENGTH: usize = 2048;

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "ThreatLens";

// ============================================
// Helper functions to read from env with fallback
// ============================================

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// VirusTotal API key, if configured
pub fn get_virustotal_api_key() -> Option<String> {
    non_empty_var("VIRUSTOTAL_API_KEY")
}

/// AbuseIPDB API key, if configured
pub fn get_abuseipdb_api_key() -> Option<String> {
    non_empty_var("ABUSEIPDB_API_KEY")
}

/// Per-source timeout from environment or default
pub fn get_source_timeout() -> Duration {
    let secs = non_empty_var("THREATLENS_SOURCE_TIMEOUT_SECS")
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_SOURCE_TIMEOUT_SECS);
    Duration::from_secs(secs)
}

/// Overall analysis deadline from environment or default
pub fn get_analysis_deadline() -> Duration {
    let secs = non_empty_var("THREATLENS_ANALYSIS_DEADLINE_SECS")
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_ANALYSIS_DEADLINE_SECS);
    Duration::from_secs(secs)
}

/// `name=weight,...` overrides for the weight table
pub fn get_weight_overrides() -> Option<String> {
    non_empty_var("THREATLENS_WEIGHTS")
}

/// Weight for sources missing from the table
pub fn get_default_weight() -> Option<f64> {
    non_empty_var("THREATLENS_DEFAULT_WEIGHT").and_then(|s| s.parse().ok())
}

/// Local blocklist file for the threat feed source
pub fn get_threat_feed_path() -> Option<String> {
    non_empty_var("THREAT_FEED_PATH")
}

/// Sync public blocklists at startup?
pub fn is_threat_feed_sync_enabled() -> bool {
    non_empty_var("THREAT_FEED_SYNC")
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}
