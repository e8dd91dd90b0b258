//! External Intelligence Types
//!
//! Per-family payload shapes handed from the source adapters to the
//! normalizer. Each family is a variant of `RawPayload`; the fusion core
//! never sees these, only the normalized `VendorVerdict`.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::SourceError;
use crate::logic::fusion::Verdict;

// ============================================================================
// RAW PAYLOAD (tagged per source family)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum RawPayload {
    VirusTotal(VtReport),
    AbuseIpDb(AbuseReport),
    ThreatFeed(FeedMatch),
    Generic(GenericReport),
}

/// What the fan-out layer collected for one source.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResponse {
    /// Payload arrived before the timeout
    Payload(RawPayload),
    /// Timeout or overall deadline hit
    TimedOut,
    /// Adapter-level failure
    Failed(SourceError),
}

/// Output of a family-specific translation, before it becomes a `VendorVerdict`.
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub verdict: Verdict,
    pub category: Option<String>,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Translation {
    pub fn new(verdict: Verdict) -> Self {
        Self {
            verdict,
            category: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn category(mut self, category: Option<String>) -> Self {
        self.category = category;
        self
    }

    pub fn meta(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn meta_opt<T: Into<serde_json::Value>>(self, key: &str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.meta(key, v),
            None => self,
        }
    }
}

// ============================================================================
// VIRUSTOTAL
// ============================================================================

/// Kết quả từ VirusTotal API (đã parse)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VtReport {
    pub object_id: String,
    pub stats: VtStats,
    /// Detection names from engines that flagged the object
    pub detection_names: Vec<String>,
    /// vendor -> category (domains and URLs)
    pub categories: BTreeMap<String, String>,
    pub tags: Vec<String>,
    pub reputation: Option<i64>,
    pub first_seen: Option<i64>,
    pub last_seen: Option<i64>,
    pub country: Option<String>,
    pub asn: Option<u64>,
    pub as_owner: Option<String>,
}

/// Thống kê nhanh từ VT
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VtStats {
    pub malicious: u32,
    pub suspicious: u32,
    pub undetected: u32,
    pub harmless: u32,
    pub timeout: u32,
}

impl VtStats {
    pub fn total_engines(&self) -> u32 {
        self.malicious
            .saturating_add(self.suspicious)
            .saturating_add(self.undetected)
            .saturating_add(self.harmless)
    }

    /// Tỷ lệ phát hiện (0.0 - 1.0)
    pub fn detection_ratio(&self) -> f64 {
        let total = self.total_engines();
        if total == 0 {
            return 0.0;
        }
        self.malicious.saturating_add(self.suspicious) as f64 / total as f64
    }

    /// Có phải malware không (theo VT)
    pub fn is_malware(&self) -> bool {
        self.malicious >= 3 || self.detection_ratio() >= 0.1
    }
}

// ============================================================================
// ABUSEIPDB
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AbuseReport {
    pub ip_address: String,
    /// 0 - 100
    pub abuse_confidence_score: u8,
    pub total_reports: u32,
    pub distinct_users: u32,
    pub is_whitelisted: bool,
    pub country_code: Option<String>,
    pub usage_type: Option<String>,
    pub isp: Option<String>,
    pub last_reported_at: Option<String>,
}

// ============================================================================
// THREAT FEED
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedMatch {
    pub listed: bool,
    /// Feeds that list the indicator
    pub feeds: Vec<String>,
    pub tags: Vec<String>,
}

// ============================================================================
// GENERIC
// ============================================================================

/// Sources whose adapter already reduced the answer to a native verdict word.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenericReport {
    pub native_verdict: String,
    pub category: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

// ============================================================================
// API RESPONSE TYPES (for parsing VT API)
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct VTApiResponse {
    pub data: VTApiData,
}

#[derive(Debug, Deserialize)]
pub struct VTApiData {
    pub id: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub attributes: VTApiAttributes,
}

#[derive(Debug, Deserialize)]
pub struct VTApiAttributes {
    pub last_analysis_stats: Option<VTApiStats>,
    pub last_analysis_results: Option<HashMap<String, VTApiEngineResult>>,
    #[serde(default)]
    pub categories: HashMap<String, String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub reputation: Option<i64>,
    pub first_submission_date: Option<i64>,
    pub last_analysis_date: Option<i64>,
    pub country: Option<String>,
    pub asn: Option<u64>,
    pub as_owner: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VTApiStats {
    #[serde(default)]
    pub malicious: u32,
    #[serde(default)]
    pub suspicious: u32,
    #[serde(default)]
    pub undetected: u32,
    #[serde(default)]
    pub harmless: u32,
    #[serde(default)]
    pub timeout: u32,
}

#[derive(Debug, Deserialize)]
pub struct VTApiEngineResult {
    pub category: String,
    pub engine_name: String,
    pub result: Option<String>,
}

// ============================================================================
// API RESPONSE TYPES (for parsing AbuseIPDB API)
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AbuseApiResponse {
    pub data: AbuseApiData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbuseApiData {
    pub ip_address: String,
    pub abuse_confidence_score: u8,
    #[serde(default)]
    pub total_reports: u32,
    #[serde(default)]
    pub num_distinct_users: u32,
    #[serde(default)]
    pub is_whitelisted: Option<bool>,
    pub country_code: Option<String>,
    pub usage_type: Option<String>,
    pub isp: Option<String>,
    pub last_reported_at: Option<String>,
}
