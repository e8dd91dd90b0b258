//! Verdict Normalizer
//!
//! Reduces every source, whatever its native vocabulary, to one
//! `VendorVerdict`. Non-responders and parse failures become `error`
//! with empty metadata; a vendor that answered "no record" becomes `unrated`.

use super::abuseipdb;
use super::threat_feed;
use super::types::{GenericReport, RawPayload, RawResponse, Translation};
use super::virustotal;
use crate::error::SourceError;
use crate::logic::fusion::{VendorVerdict, Verdict};

/// Normalize one collected response.
pub fn normalize(source_name: &str, response: RawResponse) -> VendorVerdict {
    match response {
        RawResponse::Payload(payload) => match translate(&payload) {
            Ok(translation) => into_verdict(source_name, translation),
            Err(e) => {
                log::warn!("Source {} returned an unusable payload: {}", source_name, e);
                VendorVerdict::no_response(source_name)
            }
        },
        RawResponse::Failed(SourceError::NotFound) => {
            VendorVerdict::answered(source_name, Verdict::Unrated)
                .with_metadata("not_found", true)
        }
        RawResponse::Failed(e) => {
            log::warn!("Source {} failed: {}", source_name, e);
            VendorVerdict::no_response(source_name)
        }
        RawResponse::TimedOut => {
            log::warn!("Source {} timed out", source_name);
            VendorVerdict::no_response(source_name)
        }
    }
}

/// Family dispatch: each adapter owns its own vocabulary mapping.
pub fn translate(payload: &RawPayload) -> Result<Translation, SourceError> {
    match payload {
        RawPayload::VirusTotal(report) => Ok(virustotal::translate(report)),
        RawPayload::AbuseIpDb(report) => Ok(abuseipdb::translate(report)),
        RawPayload::ThreatFeed(feed_match) => Ok(threat_feed::translate(feed_match)),
        RawPayload::Generic(report) => translate_generic(report),
    }
}

fn into_verdict(source_name: &str, translation: Translation) -> VendorVerdict {
    let Translation {
        verdict,
        category,
        metadata,
    } = translation;

    metadata.into_iter().fold(
        VendorVerdict::answered(source_name, verdict).with_category(category.as_deref()),
        |acc, (key, value)| acc.with_metadata(&key, value),
    )
}

/// Map a native verdict word. Unknown words are treated as a parse failure.
fn translate_generic(report: &GenericReport) -> Result<Translation, SourceError> {
    let verdict = match report.native_verdict.trim().to_ascii_lowercase().as_str() {
        "malicious" | "malware" | "phishing" | "c2" | "botnet" | "blacklisted" | "bad" => {
            Verdict::Malicious
        }
        "suspicious" | "suspect" | "spam" | "grayware" | "pup" => Verdict::Suspicious,
        "harmless" | "clean" | "benign" | "safe" | "whitelisted" | "good" => Verdict::Harmless,
        "undetected" | "not detected" | "none" => Verdict::Undetected,
        "unrated" | "unknown" | "unclassified" => Verdict::Unrated,
        other => {
            return Err(SourceError::Parse(format!("unknown native verdict {:?}", other)));
        }
    };

    let mut translation = Translation::new(verdict).category(report.category.clone());
    translation.metadata.extend(report.metadata.clone());
    Ok(translation)
}

// ============================================================================
// TESTS
// ============================================================================
