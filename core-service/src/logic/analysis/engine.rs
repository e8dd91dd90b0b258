//! Fusion Engine
//!
//! classify -> fan-out -> normalize -> fuse -> confidence -> bucket -> assemble
//!
//! Everything after the fan-out is synchronous and pure; `evaluate` exposes
//! that half for callers that already hold a verdict list.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use sha2::{Digest, Sha256};

use super::fanout::FanOut;
use crate::constants::{self, MAX_BULK_INDICATORS};
use crate::error::{EngineError, FusionError, FusionResult};
use crate::logic::external_intel::{
    normalize, AbuseIpDbSource, ReputationSource, ThreatFeed, ThreatFeedSource,
    VirusTotalSource,
};
use crate::logic::fusion::{self, AnalysisResult, VendorVerdict, WeightError, WeightTable};
use crate::logic::history::HistorySink;
use crate::logic::indicator::{classify, classify_indicator, Indicator, IndicatorType};

// ============================================================================
// ENGINE
// ============================================================================

pub struct FusionEngine {
    weights: Arc<WeightTable>,
    fanout: FanOut,
    history: Option<Arc<dyn HistorySink>>,
}

impl FusionEngine {
    pub fn builder() -> FusionEngineBuilder {
        FusionEngineBuilder::default()
    }

    /// Engine wired from environment: weight table, configured vendor
    /// sources and the threat feed.
    pub async fn from_env() -> Result<Self, WeightError> {
        Ok(Self::builder_from_env().await?.build())
    }

    /// Same wiring as `from_env`, left open for a history sink or extra sources.
    pub async fn builder_from_env() -> Result<FusionEngineBuilder, WeightError> {
        let weights = WeightTable::from_env()?;
        let mut builder = Self::builder()
            .weights(Arc::new(weights))
            .timeouts(constants::get_source_timeout(), constants::get_analysis_deadline());

        match constants::get_virustotal_api_key().map(|key| VirusTotalSource::new(&key)) {
            Some(Ok(source)) => builder = builder.source(Arc::new(source)),
            Some(Err(e)) => log::warn!("VirusTotal source disabled: {}", e),
            None => log::info!("VIRUSTOTAL_API_KEY not set, VirusTotal source disabled"),
        }

        match constants::get_abuseipdb_api_key().map(|key| AbuseIpDbSource::new(&key)) {
            Some(Ok(source)) => builder = builder.source(Arc::new(source)),
            Some(Err(e)) => log::warn!("AbuseIPDB source disabled: {}", e),
            None => log::info!("ABUSEIPDB_API_KEY not set, AbuseIPDB source disabled"),
        }

        let mut feed = ThreatFeed::new();
        if let Some(path) = constants::get_threat_feed_path() {
            if let Err(e) = feed.load_file(Path::new(&path)) {
                log::warn!("Failed to load threat feed {}: {}", path, e);
            }
        }
        let feed_source = ThreatFeedSource::new(feed);
        if constants::is_threat_feed_sync_enabled() {
            let result = feed_source.sync_all().await;
            log::info!(
                "Threat feed sync: {} feeds, {} indicators, {} errors",
                result.feeds_synced,
                result.total_indicators,
                result.errors.len()
            );
        }

        Ok(builder.source(Arc::new(feed_source)))
    }

    pub fn weights(&self) -> &WeightTable {
        &self.weights
    }

    pub fn source_names(&self) -> Vec<String> {
        self.fanout.source_names()
    }

    /// Type detection only, no network.
    pub fn classify(&self, raw: &str) -> FusionResult<IndicatorType> {
        classify(raw)
    }

    /// Full pipeline for one raw indicator string.
    pub async fn analyze(&self, raw: &str) -> FusionResult<AnalysisResult> {
        let indicator = classify_indicator(raw)?;
        self.run(indicator).await
    }

    /// Full pipeline with an externally supplied type, skipping classification.
    pub async fn analyze_as(
        &self,
        raw: &str,
        indicator_type: IndicatorType,
    ) -> FusionResult<AnalysisResult> {
        if raw.trim().is_empty() {
            return Err(FusionError::unclassifiable(raw));
        }
        self.run(Indicator::with_type(raw, indicator_type)).await
    }

    /// Hash the file (SHA-256) and analyze the hash.
    pub async fn analyze_file(&self, path: &Path) -> Result<AnalysisResult, EngineError> {
        let hash = hash_file(path).await?;
        log::debug!("{} -> sha256 {}", path.display(), hash);
        Ok(self
            .run(Indicator::with_type(&hash, IndicatorType::Hash))
            .await?)
    }

    /// One result per input, in input order.
    pub async fn analyze_bulk(
        &self,
        raws: &[String],
    ) -> Result<Vec<FusionResult<AnalysisResult>>, EngineError> {
        if raws.len() > MAX_BULK_INDICATORS {
            return Err(EngineError::TooManyIndicators {
                count: raws.len(),
                max: MAX_BULK_INDICATORS,
            });
        }

        Ok(join_all(raws.iter().map(|raw| self.analyze(raw))).await)
    }

    /// Pure stages over an already collected verdict list.
    pub fn evaluate(
        &self,
        indicator: Indicator,
        verdicts: Vec<VendorVerdict>,
    ) -> FusionResult<AnalysisResult> {
        fusion::evaluate(indicator, verdicts, &self.weights)
    }

    async fn run(&self, indicator: Indicator) -> FusionResult<AnalysisResult> {
        let started = Instant::now();

        let verdicts: Vec<VendorVerdict> = self
            .fanout
            .collect(&indicator)
            .await
            .into_iter()
            .map(|(name, response)| normalize(&name, response))
            .collect();

        let result = self.evaluate(indicator, verdicts)?;

        if let Some(history) = &self.history {
            if let Err(e) = history.record(&result) {
                log::warn!("Failed to record analysis {}: {}", result.analysis_id(), e);
            }
        }

        log::debug!(
            "Analyzed {} in {}ms: {} ({})",
            result.indicator(),
            started.elapsed().as_millis(),
            result.threat_score().value(),
            result.threat_score().risk_level()
        );

        Ok(result)
    }
}

// ============================================================================
// BUILDER
// ============================================================================

#[derive(Default)]
pub struct FusionEngineBuilder {
    sources: Vec<Arc<dyn ReputationSource>>,
    weights: Option<Arc<WeightTable>>,
    history: Option<Arc<dyn HistorySink>>,
    timeouts: Option<(Duration, Duration)>,
}

impl FusionEngineBuilder {
    /// Registration order is output order.
    pub fn source(mut self, source: Arc<dyn ReputationSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn weights(mut self, weights: Arc<WeightTable>) -> Self {
        self.weights = Some(weights);
        self
    }

    pub fn history(mut self, history: Arc<dyn HistorySink>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn timeouts(mut self, per_source: Duration, deadline: Duration) -> Self {
        self.timeouts = Some((per_source, deadline));
        self
    }

    pub fn build(self) -> FusionEngine {
        let mut fanout = FanOut::new(self.sources);
        if let Some((per_source, deadline)) = self.timeouts {
            fanout = fanout.with_timeouts(per_source, deadline);
        }

        FusionEngine {
            weights: self
                .weights
                .unwrap_or_else(|| Arc::new(WeightTable::builtin())),
            fanout,
            history: self.history,
        }
    }
}

// ============================================================================
// UTILITIES
// ============================================================================

/// Lowercase hex SHA-256 of a file's contents.
pub async fn hash_file(path: &Path) -> Result<String, EngineError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| EngineError::Io {
        path: path.display().to_string(),
        source,
    })?;

    Ok(hex::encode(Sha256::digest(&bytes)))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{HistoryError, SourceError};
    use crate::logic::external_intel::{GenericReport, RawPayload};
    use crate::logic::fusion::{RiskLevel, Verdict};
    use crate::logic::history::{HistoryQuery, InMemoryHistory};
    use async_trait::async_trait;
    use std::io::Write;

    struct Fixed {
        name: &'static str,
        answer: Result<&'static str, SourceError>,
    }

    #[async_trait]
    impl ReputationSource for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        async fn fetch(&self, _indicator: &Indicator) -> Result<RawPayload, SourceError> {
            self.answer.clone().map(|word| {
                RawPayload::Generic(GenericReport {
                    native_verdict: word.to_string(),
                    category: Some("phishing".to_string()),
                    ..Default::default()
                })
            })
        }
    }

    fn source(name: &'static str, word: &'static str) -> Arc<dyn ReputationSource> {
        Arc::new(Fixed {
            name,
            answer: Ok(word),
        })
    }

    fn down(name: &'static str) -> Arc<dyn ReputationSource> {
        Arc::new(Fixed {
            name,
            answer: Err(SourceError::Network("connection refused".into())),
        })
    }

    struct BrokenSink;

    impl HistorySink for BrokenSink {
        fn record(&self, _result: &AnalysisResult) -> Result<(), HistoryError> {
            Err(HistoryError::Unavailable("disk full".into()))
        }
    }

    #[tokio::test]
    async fn test_analyze_two_of_three() {
        let engine = FusionEngine::builder()
            .source(source("a", "malicious"))
            .source(source("b", "malicious"))
            .source(source("c", "clean"))
            .build();

        let result = engine.analyze("  evil.example ").await.unwrap();
        let score = result.threat_score();

        assert_eq!(result.indicator().value(), "evil.example");
        assert_eq!(result.indicator().indicator_type(), IndicatorType::Domain);
        assert_eq!(score.value(), 67);
        assert_eq!(score.risk_level(), RiskLevel::High);
        assert_eq!(score.detection_ratio(), "2/3");
        assert!((score.confidence() - 0.5).abs() < 1e-9);

        let names: Vec<_> = result
            .vendor_verdicts()
            .iter()
            .map(|v| v.source_name())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_unclassifiable_input() {
        let engine = FusionEngine::builder().source(source("a", "clean")).build();
        let err = engine.analyze("not an indicator").await.unwrap_err();
        assert!(matches!(err, FusionError::UnclassifiableIndicator { .. }));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_all_sources_down() {
        let engine = FusionEngine::builder()
            .source(down("a"))
            .source(down("b"))
            .build();

        let err = engine.analyze("1.2.3.4").await.unwrap_err();
        assert_eq!(err, FusionError::InsufficientData { queried: 2 });
    }

    #[tokio::test]
    async fn test_partial_response_still_scores() {
        let engine = FusionEngine::builder()
            .source(source("a", "malicious"))
            .source(down("b"))
            .build();

        let result = engine.analyze("1.2.3.4").await.unwrap();
        assert_eq!(result.threat_score().value(), 100);
        assert_eq!(result.threat_score().detection_ratio(), "1/1");
        assert_eq!(result.vendor_verdicts()[1].verdict(), Verdict::Error);
        assert!(result.tags().contains("partial-coverage"));
    }

    #[tokio::test]
    async fn test_analyze_as_overrides_type() {
        let engine = FusionEngine::builder().source(source("a", "clean")).build();

        let result = engine
            .analyze_as("internal-host", IndicatorType::Domain)
            .await
            .unwrap();
        assert_eq!(result.indicator().indicator_type(), IndicatorType::Domain);

        assert!(engine.analyze_as("   ", IndicatorType::Domain).await.is_err());
    }

    #[tokio::test]
    async fn test_history_records_and_sink_failure_is_ignored() {
        let history = Arc::new(InMemoryHistory::new(10));
        let engine = FusionEngine::builder()
            .source(source("a", "suspicious"))
            .history(history.clone())
            .build();

        let result = engine.analyze("evil.example").await.unwrap();
        assert_eq!(history.list(HistoryQuery::default()), vec![result]);

        let engine = FusionEngine::builder()
            .source(source("a", "suspicious"))
            .history(Arc::new(BrokenSink))
            .build();
        assert!(engine.analyze("evil.example").await.is_ok());
    }

    #[tokio::test]
    async fn test_analyze_file_hashes_contents() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hello").unwrap();

        let engine = FusionEngine::builder().source(source("a", "clean")).build();
        let result = engine.analyze_file(file.path()).await.unwrap();

        assert_eq!(result.indicator().indicator_type(), IndicatorType::Hash);
        assert_eq!(
            result.indicator().value(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[tokio::test]
    async fn test_analyze_file_missing() {
        let engine = FusionEngine::builder().source(source("a", "clean")).build();
        let err = engine
            .analyze_file(Path::new("/definitely/not/here.bin"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Io { .. }));
    }

    #[tokio::test]
    async fn test_analyze_bulk_keeps_order() {
        let engine = FusionEngine::builder().source(source("a", "malicious")).build();
        let inputs = vec![
            "1.2.3.4".to_string(),
            "???".to_string(),
            "evil.example".to_string(),
        ];

        let results = engine.analyze_bulk(&inputs).await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().indicator().value(), "1.2.3.4");
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap().indicator().value(), "evil.example");
    }

    #[tokio::test]
    async fn test_analyze_bulk_limit() {
        let engine = FusionEngine::builder().build();
        let inputs = vec!["1.2.3.4".to_string(); MAX_BULK_INDICATORS + 1];
        assert!(matches!(
            engine.analyze_bulk(&inputs).await,
            Err(EngineError::TooManyIndicators { count: 101, max: 100 })
        ));
    }

    #[test]
    fn test_evaluate_with_fuller_set() {
        let engine = FusionEngine::builder().build();
        let indicator = Indicator::with_type("1.2.3.4", IndicatorType::Ip);

        let partial = engine
            .evaluate(
                indicator.clone(),
                vec![
                    VendorVerdict::answered("a", Verdict::Malicious),
                    VendorVerdict::no_response("b"),
                ],
            )
            .unwrap();
        let full = engine
            .evaluate(
                indicator,
                vec![
                    VendorVerdict::answered("a", Verdict::Malicious),
                    VendorVerdict::answered("b", Verdict::Malicious),
                ],
            )
            .unwrap();

        assert!(full.threat_score().confidence() > partial.threat_score().confidence());
    }
}
