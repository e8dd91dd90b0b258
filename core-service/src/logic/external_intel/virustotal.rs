//! VirusTotal Integration Module
//!
//! Query VirusTotal API v3 cho ip / domain / url / hash.
//!
//! Features:
//! - Endpoint per indicator type
//! - Rate limiting (free tier: 4 req/min)
//! - Local caching to reduce API calls
//! - Retry with jittered backoff on 5xx

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use parking_lot::Mutex;
use rand::Rng;

use super::source::{map_status, ReputationSource};
use super::types::{RawPayload, Translation, VTApiResponse, VtReport, VtStats};
use crate::error::SourceError;
use crate::logic::fusion::Verdict;
use crate::logic::indicator::{Indicator, IndicatorType};

// ============================================================================
// CONSTANTS
// ============================================================================

pub const SOURCE_NAME: &str = "virustotal";

const VT_API_BASE: &str = "https://www.virustotal.com/api/v3";
const FREE_TIER_RATE_LIMIT: u32 = 4; // requests per minute
const CACHE_MAX_SIZE: usize = 1000;
const CACHE_TTL_HOURS: i64 = 24;
const MAX_ATTEMPTS: u32 = 3;
const USER_AGENT: &str = concat!("threatlens/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// VT SOURCE
// ============================================================================

pub struct VirusTotalSource {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
    state: Mutex<VtState>,
}

struct VtState {
    cache: HashMap<String, CachedResult>,
    requests_this_minute: u32,
    minute_start: Instant,
    rate_limit: u32,
}

struct CachedResult {
    report: VtReport,
    cached_at: i64,
}

impl VirusTotalSource {
    pub fn new(api_key: &str) -> Result<Self, SourceError> {
        Self::with_base_url(api_key, VT_API_BASE)
    }

    /// Point the client at another API root (proxies, tests).
    pub fn with_base_url(api_key: &str, base_url: &str) -> Result<Self, SourceError> {
        if api_key.trim().is_empty() {
            return Err(SourceError::NotConfigured);
        }

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SourceError::Network(e.to_string()))?;

        Ok(Self {
            api_key: api_key.trim().to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            state: Mutex::new(VtState {
                cache: HashMap::new(),
                requests_this_minute: 0,
                minute_start: Instant::now(),
                rate_limit: FREE_TIER_RATE_LIMIT,
            }),
        })
    }

    /// Override the per-minute request budget (premium keys).
    pub fn with_rate_limit(self, per_minute: u32) -> Self {
        self.state.lock().rate_limit = per_minute.max(1);
        self
    }

    /// Build the object URL for an indicator.
    fn object_url(&self, indicator: &Indicator) -> String {
        let value = indicator.value();
        match indicator.indicator_type() {
            IndicatorType::Ip => format!("{}/ip_addresses/{}", self.base_url, value),
            IndicatorType::Domain => {
                format!("{}/domains/{}", self.base_url, value.to_ascii_lowercase())
            }
            IndicatorType::Hash => {
                format!("{}/files/{}", self.base_url, value.to_ascii_lowercase())
            }
            IndicatorType::Url => {
                format!("{}/urls/{}", self.base_url, URL_SAFE_NO_PAD.encode(value))
            }
        }
    }

    /// Reserve one request slot, or fail with the remaining wait.
    fn check_rate_limit(&self) -> Result<(), SourceError> {
        let mut state = self.state.lock();
        let now = Instant::now();

        // Reset counter if minute passed
        if now.duration_since(state.minute_start) >= Duration::from_secs(60) {
            state.minute_start = now;
            state.requests_this_minute = 0;
        }

        if state.requests_this_minute >= state.rate_limit {
            let wait_time = 60u64.saturating_sub(now.duration_since(state.minute_start).as_secs());
            return Err(SourceError::RateLimited {
                retry_after: wait_time,
            });
        }

        state.requests_this_minute += 1;
        Ok(())
    }

    fn get_cached(&self, key: &str) -> Option<VtReport> {
        let state = self.state.lock();
        let cached = state.cache.get(key)?;
        let age_hours = (chrono::Utc::now().timestamp() - cached.cached_at) / 3600;

        if age_hours < CACHE_TTL_HOURS {
            Some(cached.report.clone())
        } else {
            None
        }
    }

    fn cache_result(&self, key: &str, report: VtReport) {
        let mut state = self.state.lock();

        // Evict oldest 10% if full
        if state.cache.len() >= CACHE_MAX_SIZE {
            let mut entries: Vec<_> = state
                .cache
                .iter()
                .map(|(k, v)| (k.clone(), v.cached_at))
                .collect();
            entries.sort_by(|a, b| a.1.cmp(&b.1));

            for (k, _) in entries.into_iter().take(CACHE_MAX_SIZE / 10) {
                state.cache.remove(&k);
            }
        }

        state.cache.insert(
            key.to_string(),
            CachedResult {
                report,
                cached_at: chrono::Utc::now().timestamp(),
            },
        );
    }

    /// (size, capacity)
    pub fn cache_stats(&self) -> (usize, usize) {
        (self.state.lock().cache.len(), CACHE_MAX_SIZE)
    }

    pub fn clear_cache(&self) {
        self.state.lock().cache.clear();
    }

    async fn request(&self, url: &str) -> Result<VtReport, SourceError> {
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let response = self
                .http
                .get(url)
                .header("x-apikey", &self.api_key)
                .send()
                .await?;

            let status = response.status();

            if status.is_success() {
                let body: VTApiResponse = response.json().await?;
                return Ok(parse_api_response(body));
            }

            if status.is_server_error() && attempt < MAX_ATTEMPTS {
                let delay = backoff_delay(attempt);
                log::debug!(
                    "VirusTotal {} (attempt {}), retrying in {:?}",
                    status,
                    attempt,
                    delay
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            return Err(map_status(status, response.headers(), "VirusTotal"));
        }
    }
}

#[async_trait]
impl ReputationSource for VirusTotalSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn fetch(&self, indicator: &Indicator) -> Result<RawPayload, SourceError> {
        let url = self.object_url(indicator);

        // Check cache first
        if let Some(cached) = self.get_cached(&url) {
            log::debug!("VirusTotal cache hit for {}", indicator);
            return Ok(RawPayload::VirusTotal(cached));
        }

        self.check_rate_limit()?;

        let report = self.request(&url).await?;
        self.cache_result(&url, report.clone());

        Ok(RawPayload::VirusTotal(report))
    }
}

/// 2^attempt seconds plus 10-25% jitter
fn backoff_delay(attempt: u32) -> Duration {
    let base = 2f64.powi(attempt as i32);
    let jitter = base * rand::thread_rng().gen_range(0.10..0.25);
    Duration::from_secs_f64(base + jitter)
}

// ============================================================================
// PARSE RESPONSE
// ============================================================================

fn parse_api_response(resp: VTApiResponse) -> VtReport {
    let attrs = resp.data.attributes;

    let stats = attrs
        .last_analysis_stats
        .map(|s| VtStats {
            malicious: s.malicious,
            suspicious: s.suspicious,
            undetected: s.undetected,
            harmless: s.harmless,
            timeout: s.timeout,
        })
        .unwrap_or_default();

    // Extract detection names
    let mut detection_names: Vec<String> = attrs
        .last_analysis_results
        .unwrap_or_default()
        .into_values()
        .filter(|r| r.category == "malicious" || r.category == "suspicious")
        .filter_map(|r| r.result)
        .collect();
    detection_names.sort();
    detection_names.dedup();

    VtReport {
        object_id: resp.data.id,
        stats,
        detection_names,
        categories: attrs.categories.into_iter().collect(),
        tags: attrs.tags,
        reputation: attrs.reputation,
        first_seen: attrs.first_submission_date,
        last_seen: attrs.last_analysis_date,
        country: attrs.country,
        asn: attrs.asn,
        as_owner: attrs.as_owner,
    }
}

// ============================================================================
// TRANSLATION
// ============================================================================

/// Engine stats -> common verdict.
pub fn translate(report: &VtReport) -> Translation {
    let stats = &report.stats;

    let verdict = if stats.total_engines() == 0 {
        Verdict::Unrated
    } else if stats.is_malware() {
        Verdict::Malicious
    } else if stats.malicious > 0 || stats.suspicious > 0 {
        Verdict::Suspicious
    } else if stats.harmless > 0 {
        Verdict::Harmless
    } else {
        Verdict::Undetected
    };

    // First vendor category, by vendor name, for a stable display value
    let category = report.categories.values().next().cloned();

    Translation::new(verdict)
        .category(category)
        .meta("malicious", stats.malicious)
        .meta("suspicious", stats.suspicious)
        .meta("harmless", stats.harmless)
        .meta("undetected", stats.undetected)
        .meta("total_engines", stats.total_engines())
        .meta("detection_names", report.detection_names.clone())
        .meta("vendor_tags", report.tags.clone())
        .meta_opt("reputation", report.reputation)
        .meta_opt("first_seen", report.first_seen)
        .meta_opt("last_seen", report.last_seen)
        .meta_opt("country", report.country.clone())
        .meta_opt("asn", report.asn)
        .meta_opt("as_owner", report.as_owner.clone())
}

// ============================================================================
// TESTS
// ============================================================================
