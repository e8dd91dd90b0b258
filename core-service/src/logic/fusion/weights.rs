//! Credibility Weight Table
//!
//! Static mapping source_name -> credibility weight. Built once at startup
//! (defaults + environment overrides) and shared read-only behind an `Arc`.

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

use crate::constants;

// ============================================================================
// DEFAULTS
// ============================================================================

/// Weight applied to sources missing from the table
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// Built-in credibility weights for the bundled sources
pub const BUILTIN_WEIGHTS: &[(&str, f64)] = &[
    ("virustotal", 1.0),
    ("abuseipdb", 0.8),
    ("threat_feed", 0.6),
];

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WeightError {
    #[error("weight for {name:?} must be a finite positive number, got {value}")]
    InvalidWeight { name: String, value: f64 },

    #[error("malformed weight entry {0:?}, expected name=weight")]
    Malformed(String),
}

// ============================================================================
// WEIGHT TABLE
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct WeightTable {
    weights: HashMap<String, f64>,
    default_weight: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeightEntry {
    pub source: String,
    pub weight: f64,
}

impl WeightTable {
    /// Empty table: every source gets `default_weight`.
    pub fn new(default_weight: f64) -> Result<Self, WeightError> {
        validate("<default>", default_weight)?;
        Ok(Self {
            weights: HashMap::new(),
            default_weight,
        })
    }

    /// Table with the bundled source weights.
    pub fn builtin() -> Self {
        Self {
            weights: BUILTIN_WEIGHTS
                .iter()
                .map(|(name, weight)| (name.to_string(), *weight))
                .collect(),
            default_weight: DEFAULT_WEIGHT,
        }
    }

    /// Built-in table with `THREATLENS_DEFAULT_WEIGHT` / `THREATLENS_WEIGHTS` applied.
    pub fn from_env() -> Result<Self, WeightError> {
        let mut table = Self::builtin();

        if let Some(default_weight) = constants::get_default_weight() {
            validate("<default>", default_weight)?;
            table.default_weight = default_weight;
        }

        match constants::get_weight_overrides() {
            Some(overrides) => table.with_overrides(&overrides),
            None => Ok(table),
        }
    }

    pub fn with_weight(mut self, source: &str, weight: f64) -> Result<Self, WeightError> {
        validate(source, weight)?;
        self.weights.insert(normalize_name(source), weight);
        Ok(self)
    }

    /// Apply `name=weight,name=weight` overrides.
    pub fn with_overrides(self, overrides: &str) -> Result<Self, WeightError> {
        let mut table = self;

        for entry in overrides.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (name, value) = entry
                .split_once('=')
                .ok_or_else(|| WeightError::Malformed(entry.to_string()))?;

            let name = name.trim();
            if name.is_empty() {
                return Err(WeightError::Malformed(entry.to_string()));
            }

            let weight: f64 = value
                .trim()
                .parse()
                .map_err(|_| WeightError::Malformed(entry.to_string()))?;

            table = table.with_weight(name, weight)?;
        }

        Ok(table)
    }

    /// Credibility weight of a source (case-insensitive lookup).
    pub fn weight_for(&self, source: &str) -> f64 {
        self.weights
            .get(&normalize_name(source))
            .copied()
            .unwrap_or(self.default_weight)
    }

    pub fn default_weight(&self) -> f64 {
        self.default_weight
    }

    /// Sorted snapshot, for display
    pub fn entries(&self) -> Vec<WeightEntry> {
        let mut entries: Vec<WeightEntry> = self
            .weights
            .iter()
            .map(|(source, weight)| WeightEntry {
                source: source.clone(),
                weight: *weight,
            })
            .collect();
        entries.sort_by(|a, b| a.source.cmp(&b.source));
        entries
    }
}

impl Default for WeightTable {
    fn default() -> Self {
        Self::builtin()
    }
}

fn validate(source: &str, weight: f64) -> Result<(), WeightError> {
    if weight.is_finite() && weight > 0.0 {
        Ok(())
    } else {
        Err(WeightError::InvalidWeight {
            name: source.to_string(),
            value: weight,
        })
    }
}

fn normalize_name(source: &str) -> String {
    source.trim().to_ascii_lowercase()
}

// ============================================================================
// TESTS
// ============================================================================
