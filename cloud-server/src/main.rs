//! ThreatLens Cloud - Indicator analysis HTTP service
//!
//! Thin HTTP layer over `threatlens-core`.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    THREATLENS CLOUD                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌───────────┐  ┌─────────────────────────┐ │
//! │  │  API      │  │  Rate     │  │  FusionEngine           │ │
//! │  │  Gateway  │  │  Limiter  │  │  (fan-out + fusion)     │ │
//! │  │  (Axum)   │  │           │  │                         │ │
//! │  └─────┬─────┘  └─────┬─────┘  └────────────┬────────────┘ │
//! │        └──────────────┼──────────────────────┘              │
//! │                       ▼                                     │
//! │                ┌─────────────┐                             │
//! │                │  History    │                             │
//! │                │ (in-memory) │                             │
//! │                └─────────────┘                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod error;
mod handlers;
mod middleware;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use threatlens_core::{FusionEngine, InMemoryHistory};

pub use error::{AppError, AppResult};
use middleware::rate_limit::RateLimiter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    // Initialize logging (JSON lines in production)
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "threatlens_cloud=debug,threatlens_core=info,tower_http=debug".into()
    });
    let registry = tracing_subscriber::registry().with(filter);
    if config.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("ThreatLens Cloud starting ({})...", config.environment);

    let history = Arc::new(InMemoryHistory::new(config.history_capacity));
    let engine = FusionEngine::builder_from_env()
        .await
        .context("invalid weight configuration")?
        .history(history.clone())
        .build();

    tracing::info!("Reputation sources: {}", engine.source_names().join(", "));
    for entry in engine.weights().entries() {
        tracing::debug!("Weight {} = {}", entry.source, entry.weight);
    }

    // Build application state
    let state = AppState {
        engine: Arc::new(engine),
        history,
        limiter: Arc::new(RateLimiter::new(config.rate_limit_per_minute)),
        config: config.clone(),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<FusionEngine>,
    pub history: Arc<InMemoryHistory>,
    pub limiter: Arc<RateLimiter>,
    pub config: config::Config,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    // Public routes
    let public_routes = Router::new().route("/health", get(handlers::health::check));

    // API routes (per-client rate limit)
    let api_routes = Router::new()
        .route("/api/v1/analyze", post(handlers::analyze::analyze))
        .route("/api/v1/analyze/bulk", post(handlers::analyze::analyze_bulk))
        .route("/api/v1/classify/:indicator", get(handlers::analyze::classify))
        .route("/api/v1/history", get(handlers::history::list))
        .route("/api/v1/history/:id", get(handlers::history::get))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit::enforce,
        ));

    // Combine all routes
    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use threatlens_core::logic::external_intel::GenericReport;
    use threatlens_core::{Indicator, RawPayload, ReputationSource, SourceError};

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
                    ..Default::default()
                })
            })
        }
    }

    fn app_with(sources: Vec<Fixed>, rate_limit: u32) -> Router {
        let history = Arc::new(InMemoryHistory::new(100));
        let engine = sources
            .into_iter()
            .fold(FusionEngine::builder(), |b, s| b.source(Arc::new(s)))
            .history(history.clone())
            .build();

        create_router(AppState {
            engine: Arc::new(engine),
            history,
            limiter: Arc::new(RateLimiter::new(rate_limit)),
            config: config::Config::default(),
        })
    }

    fn app() -> Router {
        app_with(
            vec![
                Fixed { name: "a", answer: Ok("malicious") },
                Fixed { name: "b", answer: Ok("malicious") },
                Fixed { name: "c", answer: Ok("clean") },
            ],
            1000,
        )
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(app(), get_req("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["sources"], json!(["a", "b", "c"]));
    }

    #[tokio::test]
    async fn test_analyze() {
        let (status, body) = send(
            app(),
            post_json("/api/v1/analyze", json!({"indicator": "evil.example"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["indicator"]["type"], "domain");
        assert_eq!(body["threat_score"]["value"], 67);
        assert_eq!(body["threat_score"]["risk_level"], "high");
        assert_eq!(body["vendor_verdicts"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_analyze_with_type_override() {
        let (status, body) = send(
            app(),
            post_json(
                "/api/v1/analyze",
                json!({"indicator": "intranet", "indicator_type": "domain"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["indicator"]["value"], "intranet");
    }

    #[tokio::test]
    async fn test_analyze_unclassifiable() {
        let (status, body) = send(
            app(),
            post_json("/api/v1/analyze", json!({"indicator": "not a valid @@@ indicator"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], 400);
    }

    #[tokio::test]
    async fn test_analyze_empty_is_validation_error() {
        let (status, _) = send(app(), post_json("/api/v1/analyze", json!({"indicator": ""}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_analyze_insufficient_data() {
        let app = app_with(
            vec![Fixed {
                name: "down",
                answer: Err(SourceError::Network("refused".into())),
            }],
            1000,
        );

        let response = app
            .oneshot(post_json("/api/v1/analyze", json!({"indicator": "1.2.3.4"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(response.headers().contains_key(header::RETRY_AFTER));
    }

    #[tokio::test]
    async fn test_bulk() {
        let (status, body) = send(
            app(),
            post_json(
                "/api/v1/analyze/bulk",
                json!({"indicators": ["1.2.3.4", "@@@", "evil.example"]}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 3);
        assert_eq!(body["succeeded"], 2);
        assert_eq!(body["results"][1]["indicator"], "@@@");
        assert!(body["results"][1]["error"].is_string());
        assert!(body["results"][1].get("result").is_none());
    }

    #[tokio::test]
    async fn test_bulk_limit() {
        let indicators: Vec<String> = (0..101).map(|i| format!("10.0.0.{}", i)).collect();
        let (status, _) = send(
            app(),
            post_json("/api/v1/analyze/bulk", json!({ "indicators": indicators })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_classify() {
        let (status, body) = send(app(), get_req("/api/v1/classify/8.8.8.8")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["indicator_type"], "ip");

        let (status, _) = send(app(), get_req("/api/v1/classify/999.1.1.1")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_history_roundtrip() {
        let app = app();

        let (_, analyzed) = send(
            app.clone(),
            post_json("/api/v1/analyze", json!({"indicator": "evil.example"})),
        )
        .await;
        let id = analyzed["analysis_id"].as_str().unwrap().to_string();

        let (status, page) = send(app.clone(), get_req("/api/v1/history?risk_level=high")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["count"], 1);
        assert_eq!(page["items"][0]["analysis_id"], id.as_str());

        let (status, _) = send(app.clone(), get_req("/api/v1/history?risk_level=safe")).await;
        assert_eq!(status, StatusCode::OK);

        let (status, one) = send(app.clone(), get_req(&format!("/api/v1/history/{}", id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(one, analyzed);

        let (status, _) = send(
            app.clone(),
            get_req(&format!("/api/v1/history/{}", uuid::Uuid::new_v4())),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(app, get_req("/api/v1/history?risk_level=purple")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_rate_limit_per_client() {
        let app = app_with(vec![Fixed { name: "a", answer: Ok("clean") }], 1);

        let first = Request::get("/api/v1/classify/8.8.8.8")
            .header("x-client-id", "soc-1")
            .body(Body::empty())
            .unwrap();
        let second = Request::get("/api/v1/classify/8.8.8.8")
            .header("x-client-id", "soc-1")
            .body(Body::empty())
            .unwrap();
        let other = Request::get("/api/v1/classify/8.8.8.8")
            .header("x-client-id", "soc-2")
            .body(Body::empty())
            .unwrap();

        assert_eq!(app.clone().oneshot(first).await.unwrap().status(), StatusCode::OK);

        let limited = app.clone().oneshot(second).await.unwrap();
        assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(limited.headers().contains_key(header::RETRY_AFTER));

        assert_eq!(app.clone().oneshot(other).await.unwrap().status(), StatusCode::OK);

        // Health is not rate limited
        assert_eq!(app.oneshot(get_req("/health")).await.unwrap().status(), StatusCode::OK);
    }
}
