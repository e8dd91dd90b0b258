//! Indicator Module
//!
//! Xác định loại observable (ip, domain, url, hash) từ chuỗi đầu vào.
//!
//! ## Structure
//! - `types`: Indicator, IndicatorType
//! - `classifier`: ordered classification rules

pub mod types;
pub mod classifier;

pub use types::{Indicator, IndicatorType};
pub use classifier::{classify, classify_indicator};
