//! Analysis handlers

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use threatlens_core::constants::MAX_INDICATOR_LENGTH;
use threatlens_core::{AnalysisResult, IndicatorType};

use crate::{AppError, AppResult, AppState};

#[derive(Debug, Deserialize, Validate)]
pub struct AnalyzeRequest {
    #[validate(length(min = 1, max = 2048))]
    pub indicator: String,

    /// Skip classification and use this type
    pub indicator_type: Option<IndicatorType>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BulkAnalyzeRequest {
    #[validate(length(min = 1, max = 100))]
    pub indicators: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct BulkItem {
    pub indicator: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalysisResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BulkAnalyzeResponse {
    pub total: usize,
    pub succeeded: usize,
    pub results: Vec<BulkItem>,
}

#[derive(Debug, Serialize)]
pub struct ClassifyResponse {
    pub indicator: String,
    pub indicator_type: IndicatorType,
}

/// Analyze one indicator
pub async fn analyze(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> AppResult<Json<AnalysisResult>> {
    req.validate()?;

    let result = match req.indicator_type {
        Some(indicator_type) => state.engine.analyze_as(&req.indicator, indicator_type).await?,
        None => state.engine.analyze(&req.indicator).await?,
    };

    tracing::info!(
        "Analysis {} for {}: {} ({})",
        result.analysis_id(),
        result.indicator(),
        result.threat_score().value(),
        result.threat_score().risk_level()
    );

    Ok(Json(result))
}

/// Analyze up to 100 indicators; per-item failures are reported inline
pub async fn analyze_bulk(
    State(state): State<AppState>,
    Json(req): Json<BulkAnalyzeRequest>,
) -> AppResult<Json<BulkAnalyzeResponse>> {
    req.validate()?;

    if let Some(too_long) = req
        .indicators
        .iter()
        .find(|i| i.len() > MAX_INDICATOR_LENGTH)
    {
        return Err(AppError::ValidationError(format!(
            "indicator longer than {} characters: {}...",
            MAX_INDICATOR_LENGTH,
            too_long.chars().take(32).collect::<String>()
        )));
    }

    let outcomes = state.engine.analyze_bulk(&req.indicators).await?;

    let results: Vec<BulkItem> = req
        .indicators
        .into_iter()
        .zip(outcomes)
        .map(|(indicator, outcome)| match outcome {
            Ok(result) => BulkItem {
                indicator,
                result: Some(result),
                error: None,
            },
            Err(e) => BulkItem {
                indicator,
                result: None,
                error: Some(e.to_string()),
            },
        })
        .collect();

    let succeeded = results.iter().filter(|r| r.result.is_some()).count();

    Ok(Json(BulkAnalyzeResponse {
        total: results.len(),
        succeeded,
        results,
    }))
}

/// Type detection only
pub async fn classify(
    State(state): State<AppState>,
    Path(indicator): Path<String>,
) -> AppResult<Json<ClassifyResponse>> {
    let indicator_type = state.engine.classify(&indicator)?;

    Ok(Json(ClassifyResponse {
        indicator: indicator.trim().to_string(),
        indicator_type,
    }))
}
