//! External Intelligence Module - Reputation sources
//!
//! Mục đích: Kết nối với nguồn threat intelligence bên ngoài và chuẩn hoá
//! câu trả lời của từng nguồn thành `VendorVerdict`.
//!
//! # Components
//! - `source.rs`: `ReputationSource` trait
//! - `virustotal.rs`: VirusTotal API v3
//! - `abuseipdb.rs`: AbuseIPDB API v2 (IP only)
//! - `threat_feed.rs`: Local blocklist + public feed sync
//! - `normalizer.rs`: Per-family verdict translation

pub mod abuseipdb;
pub mod normalizer;
pub mod source;
pub mod threat_feed;
pub mod types;
pub mod virustotal;

pub use abuseipdb::AbuseIpDbSource;
pub use normalizer::normalize;
pub use source::ReputationSource;
pub use threat_feed::{ThreatFeed, ThreatFeedSource};
pub use types::{
    AbuseReport, FeedMatch, GenericReport, RawPayload, RawResponse, Translation, VtReport,
    VtStats,
};
pub use virustotal::VirusTotalSource;
