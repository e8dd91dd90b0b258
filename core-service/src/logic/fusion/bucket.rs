//! Risk Bucketer
//!
//! Total function of the value. Lower bounds are inclusive, so a value
//! sitting exactly on a boundary belongs to the higher bucket.

use super::rules::{CRITICAL_MIN, HIGH_MIN, LOW_MIN, MEDIUM_MIN};
use super::types::RiskLevel;

/// [0,14] safe, [15,34] low, [35,59] medium, [60,84] high, [85,100] critical
pub fn bucket(value: u8) -> RiskLevel {
    if value >= CRITICAL_MIN {
        RiskLevel::Critical
    } else if value >= HIGH_MIN {
        RiskLevel::High
    } else if value >= MEDIUM_MIN {
        RiskLevel::Medium
    } else if value >= LOW_MIN {
        RiskLevel::Low
    } else {
        RiskLevel::Safe
    }
}
