//! Per-client rate limiting
//!
//! Fixed one-minute window per client, keyed by the `x-client-id` header.
//! Requests without the header share the `anonymous` bucket.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use parking_lot::Mutex;

use crate::{AppError, AppState};

pub const CLIENT_ID_HEADER: &str = "x-client-id";
pub const ANONYMOUS_CLIENT: &str = "anonymous";

const WINDOW: Duration = Duration::from_secs(60);
/// Expired windows are pruned once the table grows past this
const PRUNE_THRESHOLD: usize = 10_000;

struct Window {
    started: Instant,
    count: u32,
}

pub struct RateLimiter {
    per_minute: u32,
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(per_minute: u32) -> Self {
        Self {
            per_minute: per_minute.max(1),
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Count one request. `Err(retry_after_secs)` when over budget.
    pub fn check(&self, client: &str) -> Result<(), u64> {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: &str, now: Instant) -> Result<(), u64> {
        let mut windows = self.windows.lock();

        if windows.len() > PRUNE_THRESHOLD {
            windows.retain(|_, w| now.duration_since(w.started) < WINDOW);
        }

        let window = windows.entry(client.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.duration_since(window.started) >= WINDOW {
            window.started = now;
            window.count = 0;
        }

        if window.count >= self.per_minute {
            let elapsed = now.duration_since(window.started);
            return Err(WINDOW.saturating_sub(elapsed).as_secs().max(1));
        }

        window.count += 1;
        Ok(())
    }
}

pub fn client_id(headers: &HeaderMap) -> String {
    headers
        .get(CLIENT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(ANONYMOUS_CLIENT)
        .to_string()
}

/// Middleware: reject clients over their per-minute budget
pub async fn enforce(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client = client_id(req.headers());

    if let Err(retry_after) = state.limiter.check(&client) {
        tracing::warn!("Rate limit exceeded for client '{}'", client);
        return Err(AppError::RateLimited { retry_after });
    }

    Ok(next.run(req).await)
}
