//! Configuration module

use std::env;

use threatlens_core::logic::history::DEFAULT_HISTORY_CAPACITY;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// Results kept in the in-memory history
    pub history_capacity: usize,

    /// Requests per client per minute on /api routes
    pub rate_limit_per_minute: u32,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Engine settings (API keys, weights, timeouts) are read by
    /// `FusionEngine::from_env`.
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),

            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),

            history_capacity: env::var("HISTORY_CAPACITY")
                .ok()
                .and_then(|c| c.parse().ok())
                .unwrap_or(DEFAULT_HISTORY_CAPACITY),

            rate_limit_per_minute: env::var("RATE_LIMIT_PER_MINUTE")
                .ok()
                .and_then(|r| r.parse().ok())
                .unwrap_or(60),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            environment: "development".to_string(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            rate_limit_per_minute: 60,
        }
    }
}
