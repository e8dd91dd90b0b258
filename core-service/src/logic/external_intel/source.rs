//! Reputation Source trait
//!
//! One implementation per vendor. A source only fetches and parses;
//! translation into the common verdict vocabulary happens in the normalizer.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;

use super::types::RawPayload;
use crate::error::SourceError;
use crate::logic::indicator::{Indicator, IndicatorType};

#[async_trait]
pub trait ReputationSource: Send + Sync {
    /// Stable identity, also the weight table key (e.g. "virustotal")
    fn name(&self) -> &str;

    /// Indicator types this source can answer for. Unsupported types are
    /// not queried and do not count against coverage.
    fn supports(&self, _indicator_type: IndicatorType) -> bool {
        true
    }

    /// Fetch the raw, family-tagged payload for one indicator.
    async fn fetch(&self, indicator: &Indicator) -> Result<RawPayload, SourceError>;
}

/// Fallback when a 429 carries no usable Retry-After
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Map a non-success vendor status to a `SourceError`.
pub(crate) fn map_status(status: StatusCode, headers: &HeaderMap, vendor: &str) -> SourceError {
    match status {
        StatusCode::NOT_FOUND => SourceError::NotFound,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SourceError::InvalidApiKey,
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = headers
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            SourceError::RateLimited { retry_after }
        }
        s => SourceError::Network(format!("{} HTTP {}", vendor, s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_map_status() {
        let none = HeaderMap::new();
        assert!(matches!(
            map_status(StatusCode::NOT_FOUND, &none, "VirusTotal"),
            SourceError::NotFound
        ));
        assert!(matches!(
            map_status(StatusCode::FORBIDDEN, &none, "AbuseIPDB"),
            SourceError::InvalidApiKey
        ));
        assert!(matches!(
            map_status(StatusCode::UNAUTHORIZED, &none, "AbuseIPDB"),
            SourceError::InvalidApiKey
        ));

        match map_status(StatusCode::BAD_GATEWAY, &none, "VirusTotal") {
            SourceError::Network(msg) => assert_eq!(msg, "VirusTotal HTTP 502 Bad Gateway"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_rate_limit_reads_retry_after() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("17"));
        assert!(matches!(
            map_status(StatusCode::TOO_MANY_REQUESTS, &headers, "AbuseIPDB"),
            SourceError::RateLimited { retry_after: 17 }
        ));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert!(matches!(
            map_status(StatusCode::TOO_MANY_REQUESTS, &headers, "AbuseIPDB"),
            SourceError::RateLimited { retry_after: DEFAULT_RETRY_AFTER_SECS }
        ));
    }
}
