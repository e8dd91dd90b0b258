//! Fan-out
//!
//! Queries every source that supports the indicator type concurrently.
//! Each request is bounded by the per-source timeout and by the overall
//! deadline, whichever comes first. One failing or slow source never
//! affects the others.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::{timeout_at, Instant};

use crate::constants::{DEFAULT_ANALYSIS_DEADLINE_SECS, DEFAULT_SOURCE_TIMEOUT_SECS};
use crate::logic::external_intel::{RawResponse, ReputationSource};
use crate::logic::indicator::Indicator;

pub struct FanOut {
    sources: Vec<Arc<dyn ReputationSource>>,
    per_source_timeout: Duration,
    deadline: Duration,
}

impl FanOut {
    pub fn new(sources: Vec<Arc<dyn ReputationSource>>) -> Self {
        Self {
            sources,
            per_source_timeout: Duration::from_secs(DEFAULT_SOURCE_TIMEOUT_SECS),
            deadline: Duration::from_secs(DEFAULT_ANALYSIS_DEADLINE_SECS),
        }
    }

    pub fn with_timeouts(mut self, per_source_timeout: Duration, deadline: Duration) -> Self {
        self.per_source_timeout = per_source_timeout;
        self.deadline = deadline;
        self
    }

    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    pub fn count(&self) -> usize {
        self.sources.len()
    }

    /// Collect one response per supporting source, in registration order.
    pub async fn collect(&self, indicator: &Indicator) -> Vec<(String, RawResponse)> {
        let started = Instant::now();
        let deadline = started + self.deadline;
        let source_deadline = (started + self.per_source_timeout).min(deadline);

        let futures = self
            .sources
            .iter()
            .filter(|s| s.supports(indicator.indicator_type()))
            .map(|source| async move {
                let name = source.name().to_string();
                let response = match timeout_at(source_deadline, source.fetch(indicator)).await {
                    Ok(Ok(payload)) => RawResponse::Payload(payload),
                    Ok(Err(e)) => RawResponse::Failed(e),
                    Err(_) => RawResponse::TimedOut,
                };
                (name, response)
            });

        let responses = join_all(futures).await;

        let responded = responses
            .iter()
            .filter(|(_, r)| matches!(r, RawResponse::Payload(_)))
            .count();
        log::info!(
            "Fan-out for {}: {}/{} sources returned payloads in {}ms",
            indicator,
            responded,
            responses.len(),
            started.elapsed().as_millis()
        );

        responses
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use crate::logic::external_intel::{FeedMatch, RawPayload};
    use crate::logic::indicator::IndicatorType;
    use async_trait::async_trait;

    struct Stub {
        name: &'static str,
        delay: Duration,
        result: Result<bool, SourceError>,
        ip_only: bool,
    }

    impl Stub {
        fn listed(name: &'static str) -> Arc<dyn ReputationSource> {
            Arc::new(Stub {
                name,
                delay: Duration::ZERO,
                result: Ok(true),
                ip_only: false,
            })
        }

        fn slow(name: &'static str, delay: Duration) -> Arc<dyn ReputationSource> {
            Arc::new(Stub {
                name,
                delay,
                result: Ok(true),
                ip_only: false,
            })
        }

        fn failing(name: &'static str, error: SourceError) -> Arc<dyn ReputationSource> {
            Arc::new(Stub {
                name,
                delay: Duration::ZERO,
                result: Err(error),
                ip_only: false,
            })
        }
    }

    #[async_trait]
    impl ReputationSource for Stub {
        fn name(&self) -> &str {
            self.name
        }

        fn supports(&self, indicator_type: IndicatorType) -> bool {
            !self.ip_only || indicator_type == IndicatorType::Ip
        }

        async fn fetch(&self, _indicator: &Indicator) -> Result<RawPayload, SourceError> {
            tokio::time::sleep(self.delay).await;
            self.result.clone().map(|listed| {
                RawPayload::ThreatFeed(FeedMatch {
                    listed,
                    ..Default::default()
                })
            })
        }
    }

    fn domain() -> Indicator {
        Indicator::with_type("evil.example", IndicatorType::Domain)
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_source_times_out_without_blocking_others() {
        let fanout = FanOut::new(vec![
            Stub::slow("slow", Duration::from_secs(60)),
            Stub::listed("fast"),
            Stub::failing("broken", SourceError::Network("reset".into())),
        ])
        .with_timeouts(Duration::from_secs(5), Duration::from_secs(30));

        let responses = fanout.collect(&domain()).await;

        let names: Vec<_> = responses.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["slow", "fast", "broken"]);
        assert_eq!(responses[0].1, RawResponse::TimedOut);
        assert!(matches!(responses[1].1, RawResponse::Payload(_)));
        assert!(matches!(responses[2].1, RawResponse::Failed(SourceError::Network(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_overall_deadline_caps_per_source_timeout() {
        let fanout = FanOut::new(vec![Stub::slow("medium", Duration::from_secs(3))])
            .with_timeouts(Duration::from_secs(10), Duration::from_secs(2));

        let responses = fanout.collect(&domain()).await;
        assert_eq!(responses[0].1, RawResponse::TimedOut);
    }

    #[tokio::test]
    async fn test_unsupported_sources_are_not_queried() {
        let ip_only: Arc<dyn ReputationSource> = Arc::new(Stub {
            name: "ip_only",
            delay: Duration::ZERO,
            result: Ok(true),
            ip_only: true,
        });
        let fanout = FanOut::new(vec![ip_only, Stub::listed("any")]);

        let responses = fanout.collect(&domain()).await;
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].0, "any");

        let ip = Indicator::with_type("1.2.3.4", IndicatorType::Ip);
        assert_eq!(fanout.collect(&ip).await.len(), 2);
    }
}
