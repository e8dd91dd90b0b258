//! Indicator Classifier
//!
//! Pure function: literal form -> IndicatorType.
//! Rules are checked in a fixed order, first match wins:
//! ip -> url -> hash -> domain.

use once_cell::sync::Lazy;
use regex::Regex;

use super::types::{Indicator, IndicatorType};
use crate::error::FusionError;

// ============================================================================
// PATTERNS
// ============================================================================

static IPV4_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,3})\.(\d{1,3})\.(\d{1,3})\.(\d{1,3})$").unwrap());

static URL_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^https?://\S+$").unwrap());

static HASH_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9a-fA-F]+$").unwrap());

static LABEL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?$").unwrap());

static TLD_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z]{2,63}$").unwrap());

/// MD5 = 32, SHA1 = 40, SHA256 = 64
const HASH_LENGTHS: [usize; 3] = [32, 40, 64];

const MAX_DOMAIN_LENGTH: usize = 253;

// ============================================================================
// PUBLIC API
// ============================================================================

/// Determine the type of an indicator from its literal form.
pub fn classify(indicator: &str) -> Result<IndicatorType, FusionError> {
    let candidate = indicator.trim();

    if candidate.is_empty() {
        return Err(FusionError::unclassifiable(indicator));
    }

    if is_ipv4(candidate) {
        return Ok(IndicatorType::Ip);
    }
    if is_url(candidate) {
        return Ok(IndicatorType::Url);
    }
    if is_hash(candidate) {
        return Ok(IndicatorType::Hash);
    }
    if is_domain(candidate) {
        return Ok(IndicatorType::Domain);
    }

    log::warn!("Unsupported indicator: {}", indicator);
    Err(FusionError::unclassifiable(indicator))
}

/// Classify and wrap into an immutable [`Indicator`].
pub fn classify_indicator(indicator: &str) -> Result<Indicator, FusionError> {
    let indicator_type = classify(indicator)?;
    Ok(Indicator::with_type(indicator, indicator_type))
}

// ============================================================================
// RULES
// ============================================================================

fn is_ipv4(s: &str) -> bool {
    let Some(caps) = IPV4_PATTERN.captures(s) else {
        return false;
    };

    caps.iter()
        .skip(1)
        .flatten()
        .all(|octet| octet.as_str().parse::<u16>().map(|v| v <= 255).unwrap_or(false))
}

fn is_url(s: &str) -> bool {
    URL_PATTERN.is_match(s)
}

fn is_hash(s: &str) -> bool {
    HASH_LENGTHS.contains(&s.len()) && HASH_PATTERN.is_match(s)
}

fn is_domain(s: &str) -> bool {
    let s = s.strip_suffix('.').unwrap_or(s);

    if s.len() > MAX_DOMAIN_LENGTH {
        return false;
    }

    let labels: Vec<&str> = s.split('.').collect();
    if labels.len() < 2 {
        return false;
    }

    if !labels.iter().all(|label| LABEL_PATTERN.is_match(label)) {
        return false;
    }

    labels.last().map(|tld| TLD_PATTERN.is_match(tld)).unwrap_or(false)
}

// ============================================================================
// TESTS
// ============================================================================
