//! History Module - Analysis result hand-off
//!
//! Mục đích: Nhận `AnalysisResult` sau mỗi lần phân tích. Engine chỉ biết
//! trait `HistorySink`; nơi lưu trữ là việc của collaborator.

mod memory;

pub use memory::{HistoryQuery, InMemoryHistory, DEFAULT_HISTORY_CAPACITY};

use crate::error::HistoryError;
use crate::logic::fusion::AnalysisResult;

pub trait HistorySink: Send + Sync {
    /// Persist one finished result. Failures are logged by the engine.
    fn record(&self, result: &AnalysisResult) -> Result<(), HistoryError>;
}
