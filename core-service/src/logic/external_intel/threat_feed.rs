//! Threat Feed Module
//!
//! Mục đích: Local blocklist of known-bad indicators, optionally synced
//! từ các threat intelligence feeds công khai.
//!
//! Feeds supported:
//! - URLhaus (abuse.ch)
//! - Emerging Threats
//! - Feodo Tracker
//! - Local blocklist files

use std::collections::{BTreeSet, HashMap};
use std::net::IpAddr;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use super::source::ReputationSource;
use super::types::{FeedMatch, RawPayload, Translation};
use crate::error::SourceError;
use crate::logic::fusion::Verdict;
use crate::logic::indicator::{classify, Indicator, IndicatorType};

// ============================================================================
// THREAT FEED SOURCES
// ============================================================================

pub const SOURCE_NAME: &str = "threat_feed";

/// Feed name used for indicators loaded from a local file
pub const LOCAL_FEED: &str = "local";

const SYNC_TIMEOUT_SECS: u64 = 30;

/// Available threat feed sources
pub const FEED_SOURCES: &[FeedSource] = &[
    FeedSource {
        name: "URLhaus",
        tag: "malware_distribution",
        url: "https://urlhaus.abuse.ch/downloads/text/",
        indicator_type: IndicatorType::Url,
        enabled: true,
    },
    FeedSource {
        name: "Emerging Threats - Compromised IPs",
        tag: "compromised_host",
        url: "https://rules.emergingthreats.net/blockrules/compromised-ips.txt",
        indicator_type: IndicatorType::Ip,
        enabled: true,
    },
    FeedSource {
        name: "Feodo Tracker - Botnet C2",
        tag: "botnet_c2",
        url: "https://feodotracker.abuse.ch/downloads/ipblocklist.txt",
        indicator_type: IndicatorType::Ip,
        enabled: true,
    },
];

#[derive(Debug, Clone)]
pub struct FeedSource {
    pub name: &'static str,
    /// What a listing in this feed means
    pub tag: &'static str,
    pub url: &'static str,
    pub indicator_type: IndicatorType,
    pub enabled: bool,
}

// ============================================================================
// THREAT FEED
// ============================================================================

/// Indicator sets, each entry mapped to the feeds that list it.
#[derive(Debug, Default)]
pub struct ThreatFeed {
    malicious_ips: HashMap<IpAddr, BTreeSet<String>>,
    malicious_domains: HashMap<String, BTreeSet<String>>,
    malicious_urls: HashMap<String, BTreeSet<String>>,
    malicious_hashes: HashMap<String, BTreeSet<String>>,

    /// Last sync time
    last_sync: Option<i64>,
}

impl ThreatFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse feed content. Lines that don't fit the feed's type are skipped.
    pub fn parse_feed(&mut self, content: &str, feed: &str, indicator_type: IndicatorType) -> usize {
        let mut count = 0;

        for line in content.lines() {
            let line = line.trim();

            // Skip comments and empty lines
            if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
                continue;
            }

            if self.insert(line, indicator_type, feed) {
                count += 1;
            }
        }

        count
    }

    /// Load a local blocklist: one indicator per line, type inferred.
    pub fn load_file(&mut self, path: &Path) -> std::io::Result<usize> {
        let content = std::fs::read_to_string(path)?;
        let mut count = 0;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match classify(line) {
                Ok(indicator_type) => {
                    if self.insert(line, indicator_type, LOCAL_FEED) {
                        count += 1;
                    }
                }
                Err(_) => log::debug!("Skipping unrecognized blocklist entry: {}", line),
            }
        }

        log::info!("Loaded {} indicators from {}", count, path.display());
        Ok(count)
    }

    /// Add one indicator under `feed`. Returns false if the value is invalid.
    pub fn insert(&mut self, value: &str, indicator_type: IndicatorType, feed: &str) -> bool {
        let value = value.trim();
        let feed = feed.to_string();

        match indicator_type {
            IndicatorType::Ip => match IpAddr::from_str(value) {
                Ok(ip) => {
                    self.malicious_ips.entry(ip).or_default().insert(feed);
                    true
                }
                Err(_) => false,
            },
            IndicatorType::Domain => {
                let domain = value.to_lowercase();
                if domain.is_empty() || !domain.contains('.') {
                    return false;
                }
                self.malicious_domains.entry(domain).or_default().insert(feed);
                true
            }
            IndicatorType::Url => {
                let url = value.to_lowercase();
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return false;
                }

                // Also extract domain
                if let Some(domain) = extract_domain(&url) {
                    self.malicious_domains
                        .entry(domain)
                        .or_default()
                        .insert(feed.clone());
                }
                self.malicious_urls.entry(url).or_default().insert(feed);
                true
            }
            IndicatorType::Hash => {
                let hash = value.to_lowercase();
                if !is_valid_hash(&hash) {
                    return false;
                }
                self.malicious_hashes.entry(hash).or_default().insert(feed);
                true
            }
        }
    }

    /// Feeds listing the indicator (empty = not listed)
    pub fn lookup(&self, indicator: &Indicator) -> BTreeSet<String> {
        let value = indicator.value();
        let found = match indicator.indicator_type() {
            IndicatorType::Ip => IpAddr::from_str(value)
                .ok()
                .and_then(|ip| self.malicious_ips.get(&ip))
                .cloned(),
            IndicatorType::Domain => self.lookup_domain(value),
            IndicatorType::Url => {
                let url = value.to_lowercase();
                self.malicious_urls.get(&url).cloned().or_else(|| {
                    extract_domain(&url).and_then(|domain| self.lookup_domain(&domain))
                })
            }
            IndicatorType::Hash => self.malicious_hashes.get(&value.to_lowercase()).cloned(),
        };

        found.unwrap_or_default()
    }

    /// Exact match, then parent domains
    fn lookup_domain(&self, domain: &str) -> Option<BTreeSet<String>> {
        let domain_lower = domain.to_lowercase();

        if let Some(feeds) = self.malicious_domains.get(&domain_lower) {
            return Some(feeds.clone());
        }

        let parts: Vec<&str> = domain_lower.split('.').collect();
        for i in 1..parts.len().saturating_sub(1) {
            let parent = parts[i..].join(".");
            if let Some(feeds) = self.malicious_domains.get(&parent) {
                return Some(feeds.clone());
            }
        }

        None
    }

    /// Get stats
    pub fn stats(&self) -> FeedStats {
        FeedStats {
            total_ips: self.malicious_ips.len(),
            total_domains: self.malicious_domains.len(),
            total_urls: self.malicious_urls.len(),
            total_hashes: self.malicious_hashes.len(),
            last_sync: self.last_sync,
        }
    }

    /// Clear all data
    pub fn clear(&mut self) {
        self.malicious_ips.clear();
        self.malicious_domains.clear();
        self.malicious_urls.clear();
        self.malicious_hashes.clear();
        self.last_sync = None;
    }
}

// ============================================================================
// SYNC RESULT
// ============================================================================

#[derive(Debug, Clone, serde::Serialize)]
pub struct SyncResult {
    pub success: bool,
    pub feeds_synced: usize,
    pub total_indicators: usize,
    pub errors: Vec<String>,
}

// ============================================================================
// FEED STATS
// ============================================================================

#[derive(Debug, Clone, serde::Serialize)]
pub struct FeedStats {
    pub total_ips: usize,
    pub total_domains: usize,
    pub total_urls: usize,
    pub total_hashes: usize,
    pub last_sync: Option<i64>,
}

// ============================================================================
// FEED SOURCE
// ============================================================================

/// `ReputationSource` backed by a shared `ThreatFeed`.
#[derive(Clone)]
pub struct ThreatFeedSource {
    feed: Arc<RwLock<ThreatFeed>>,
    http: reqwest::Client,
}

impl ThreatFeedSource {
    pub fn new(feed: ThreatFeed) -> Self {
        Self {
            feed: Arc::new(RwLock::new(feed)),
            http: reqwest::Client::new(),
        }
    }

    pub fn feed(&self) -> Arc<RwLock<ThreatFeed>> {
        Arc::clone(&self.feed)
    }

    pub fn stats(&self) -> FeedStats {
        self.feed.read().stats()
    }

    /// Sync all enabled feeds. A failed feed is recorded, not fatal.
    pub async fn sync_all(&self) -> SyncResult {
        let mut result = SyncResult {
            success: true,
            feeds_synced: 0,
            total_indicators: 0,
            errors: Vec::new(),
        };

        for source in FEED_SOURCES.iter().filter(|s| s.enabled) {
            match self.sync_feed(source).await {
                Ok(count) => {
                    result.feeds_synced += 1;
                    result.total_indicators += count;
                    log::info!("Synced {} indicators from {}", count, source.name);
                }
                Err(e) => {
                    result.errors.push(format!("{}: {}", source.name, e));
                    log::warn!("Failed to sync {}: {}", source.name, e);
                }
            }
        }

        self.feed.write().last_sync = Some(Utc::now().timestamp());

        if !result.errors.is_empty() {
            result.success = result.feeds_synced > 0;
        }

        result
    }

    async fn sync_feed(&self, source: &FeedSource) -> Result<usize, SourceError> {
        let content = self
            .http
            .get(source.url)
            .timeout(Duration::from_secs(SYNC_TIMEOUT_SECS))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(self
            .feed
            .write()
            .parse_feed(&content, source.name, source.indicator_type))
    }
}

#[async_trait]
impl ReputationSource for ThreatFeedSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn fetch(&self, indicator: &Indicator) -> Result<RawPayload, SourceError> {
        let feeds = self.feed.read().lookup(indicator);

        Ok(RawPayload::ThreatFeed(FeedMatch {
            listed: !feeds.is_empty(),
            tags: feed_tags(&feeds),
            feeds: feeds.into_iter().collect(),
        }))
    }
}

// ============================================================================
// TRANSLATION
// ============================================================================

/// Listed -> malicious (category = first feed), otherwise undetected.
pub fn translate(feed_match: &FeedMatch) -> Translation {
    if !feed_match.listed {
        return Translation::new(Verdict::Undetected);
    }

    Translation::new(Verdict::Malicious)
        .category(feed_match.feeds.first().cloned())
        .meta("feeds", feed_match.feeds.clone())
        .meta("feed_tags", feed_match.tags.clone())
}

// ============================================================================
// UTILITIES
// ============================================================================

/// Tags of the known feeds among `feeds`, sorted and deduplicated.
/// Local and ad-hoc feeds carry no tag.
fn feed_tags(feeds: &BTreeSet<String>) -> Vec<String> {
    let tags: BTreeSet<&str> = FEED_SOURCES
        .iter()
        .filter(|source| feeds.contains(source.name))
        .map(|source| source.tag)
        .collect();
    tags.into_iter().map(str::to_string).collect()
}

/// Extract domain from URL
fn extract_domain(url: &str) -> Option<String> {
    let url = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))?;

    let domain = url.split('/').next()?;
    let domain = domain.split(':').next()?; // Remove port

    if domain.is_empty() {
        return None;
    }
    Some(domain.to_lowercase())
}

/// Check if string is a valid hash
fn is_valid_hash(s: &str) -> bool {
    let len = s.len();

    // MD5 = 32, SHA1 = 40, SHA256 = 64
    if len != 32 && len != 40 && len != 64 {
        return false;
    }

    s.chars().all(|c| c.is_ascii_hexdigit())
}

// ============================================================================
// TESTS
// ============================================================================
