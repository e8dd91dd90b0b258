//! History handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use threatlens_core::{AnalysisResult, HistoryQuery, RiskLevel};

use crate::{AppError, AppResult, AppState};

const MAX_PAGE_SIZE: usize = 200;

#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub risk_level: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HistoryPage {
    pub total_stored: usize,
    pub count: usize,
    pub items: Vec<AnalysisResult>,
}

/// List recent analyses, newest first
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> AppResult<Json<HistoryPage>> {
    let risk_level = params
        .risk_level
        .as_deref()
        .map(str::parse::<RiskLevel>)
        .transpose()
        .map_err(AppError::ValidationError)?;

    let defaults = HistoryQuery::default();
    let items = state.history.list(HistoryQuery {
        limit: params.limit.unwrap_or(defaults.limit).min(MAX_PAGE_SIZE),
        offset: params.offset.unwrap_or(0),
        risk_level,
    });

    Ok(Json(HistoryPage {
        total_stored: state.history.len(),
        count: items.len(),
        items,
    }))
}

/// Get one analysis by id
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<AnalysisResult>> {
    let result = state
        .history
        .get(id)
        .ok_or_else(|| AppError::NotFound("Analysis not found".to_string()))?;

    Ok(Json(result))
}
