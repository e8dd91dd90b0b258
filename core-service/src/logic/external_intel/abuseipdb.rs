//! AbuseIPDB Integration Module
//!
//! Query AbuseIPDB API v2 `/check` cho địa chỉ IP.

use async_trait::async_trait;

use super::source::{map_status, ReputationSource};
use super::types::{AbuseApiResponse, AbuseReport, RawPayload, Translation};
use crate::error::SourceError;
use crate::logic::fusion::Verdict;
use crate::logic::indicator::{Indicator, IndicatorType};

// ============================================================================
// CONSTANTS
// ============================================================================

pub const SOURCE_NAME: &str = "abuseipdb";

const ABUSEIPDB_API_BASE: &str = "https://api.abuseipdb.com/api/v2";
const MAX_AGE_DAYS: u32 = 90;

const MALICIOUS_SCORE: u8 = 75;
const SUSPICIOUS_SCORE: u8 = 25;

// ============================================================================
// SOURCE
// ============================================================================

pub struct AbuseIpDbSource {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

impl AbuseIpDbSource {
    pub fn new(api_key: &str) -> Result<Self, SourceError> {
        Self::with_base_url(api_key, ABUSEIPDB_API_BASE)
    }

    pub fn with_base_url(api_key: &str, base_url: &str) -> Result<Self, SourceError> {
        if api_key.trim().is_empty() {
            return Err(SourceError::NotConfigured);
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("threatlens/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SourceError::Network(e.to_string()))?;

        Ok(Self {
            api_key: api_key.trim().to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }
}

#[async_trait]
impl ReputationSource for AbuseIpDbSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn supports(&self, indicator_type: IndicatorType) -> bool {
        indicator_type == IndicatorType::Ip
    }

    async fn fetch(&self, indicator: &Indicator) -> Result<RawPayload, SourceError> {
        if !self.supports(indicator.indicator_type()) {
            return Err(SourceError::Unsupported(indicator.indicator_type()));
        }

        let max_age = MAX_AGE_DAYS.to_string();
        let response = self
            .http
            .get(format!("{}/check", self.base_url))
            .query(&[("ipAddress", indicator.value()), ("maxAgeInDays", max_age.as_str())])
            .header("Key", &self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(map_status(status, response.headers(), "AbuseIPDB"));
        }

        let body: AbuseApiResponse = response.json().await?;
        Ok(RawPayload::AbuseIpDb(parse_api_response(body)))
    }
}

fn parse_api_response(resp: AbuseApiResponse) -> AbuseReport {
    let data = resp.data;
    AbuseReport {
        ip_address: data.ip_address,
        abuse_confidence_score: data.abuse_confidence_score.min(100),
        total_reports: data.total_reports,
        distinct_users: data.num_distinct_users,
        is_whitelisted: data.is_whitelisted.unwrap_or(false),
        country_code: data.country_code,
        usage_type: data.usage_type,
        isp: data.isp,
        last_reported_at: data.last_reported_at,
    }
}

// ============================================================================
// TRANSLATION
// ============================================================================

/// Confidence score -> common verdict. Score thresholds win over the
/// whitelist flag.
pub fn translate(report: &AbuseReport) -> Translation {
    let score = report.abuse_confidence_score;

    let verdict = if score >= MALICIOUS_SCORE {
        Verdict::Malicious
    } else if score >= SUSPICIOUS_SCORE {
        Verdict::Suspicious
    } else if report.is_whitelisted {
        Verdict::Harmless
    } else if report.total_reports == 0 {
        Verdict::Unrated
    } else {
        Verdict::Undetected
    };

    Translation::new(verdict)
        .category(report.usage_type.clone())
        .meta("abuse_confidence_score", score)
        .meta("total_reports", report.total_reports)
        .meta("distinct_users", report.distinct_users)
        .meta("is_whitelisted", report.is_whitelisted)
        .meta_opt("country", report.country_code.clone())
        .meta_opt("isp", report.isp.clone())
        .meta_opt("last_reported_at", report.last_reported_at.clone())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn report(score: u8, reports: u32, whitelisted: bool) -> AbuseReport {
        AbuseReport {
            ip_address: "1.2.3.4".to_string(),
            abuse_confidence_score: score,
            total_reports: reports,
            is_whitelisted: whitelisted,
            ..Default::default()
        }
    }

    #[test]
    fn test_translate_thresholds() {
        assert_eq!(translate(&report(100, 50, false)).verdict, Verdict::Malicious);
        assert_eq!(translate(&report(75, 5, false)).verdict, Verdict::Malicious);
        assert_eq!(translate(&report(74, 5, false)).verdict, Verdict::Suspicious);
        assert_eq!(translate(&report(25, 5, false)).verdict, Verdict::Suspicious);
        assert_eq!(translate(&report(0, 3, true)).verdict, Verdict::Harmless);
        assert_eq!(translate(&report(0, 0, false)).verdict, Verdict::Unrated);
        assert_eq!(translate(&report(10, 2, false)).verdict, Verdict::Undetected);
    }

    #[test]
    fn test_translate_metadata() {
        let mut r = report(87, 14, false);
        r.usage_type = Some("Data Center/Web Hosting/Transit".to_string());
        r.country_code = Some("NL".to_string());

        let t = translate(&r);
        assert_eq!(t.category.as_deref(), Some("Data Center/Web Hosting/Transit"));
        assert_eq!(t.metadata["abuse_confidence_score"], serde_json::json!(87));
        assert_eq!(t.metadata["country"], serde_json::json!("NL"));
        assert!(!t.metadata.contains_key("isp"));
    }

    #[test]
    fn test_parse_api_response() {
        let body = r#"{"data":{"ipAddress":"1.2.3.4","abuseConfidenceScore":87,
            "totalReports":14,"numDistinctUsers":6,"isWhitelisted":null}}"#;
        let parsed: AbuseApiResponse = serde_json::from_str(body).unwrap();
        let report = parse_api_response(parsed);
        assert_eq!(report.distinct_users, 6);
        assert!(!report.is_whitelisted);
    }

    #[test]
    fn test_supports_only_ips() {
        let source = AbuseIpDbSource::new("key").unwrap();
        assert!(source.supports(IndicatorType::Ip));
        assert!(!source.supports(IndicatorType::Domain));
        assert!(!source.supports(IndicatorType::Hash));
    }

    #[tokio::test]
    async fn test_fetch_rejects_unsupported_type() {
        let source = AbuseIpDbSource::new("key").unwrap();
        let result = source
            .fetch(&Indicator::with_type("evil.example", IndicatorType::Domain))
            .await;
        assert!(matches!(result, Err(SourceError::Unsupported(IndicatorType::Domain))));
    }
}
