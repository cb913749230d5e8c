#![allow(dead_code)]
use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    api::{error::ApiError, response::ApiResponse},
    controller::AppState,
};

/// Optimization status response
#[derive(Debug, Serialize)]
pub struct OptimizationStatusResponse {
    last_run: Option<DateTime<Utc>>,
    next_scheduled: Option<DateTime<Utc>>,
    status: String,
    last_result: Option<OptimizationResult>,
}

/// Optimization result
#[derive(Debug, Serialize)]
pub struct OptimizationResult {
    timestamp: DateTime<Utc>,
    objective: String,
    duration_ms: i64,
    estimated_cost: Option<f64>,
    estimated_savings: Option<f64>,
    schedule_created: bool,
}

/// Request to trigger optimization
#[derive(Debug, Deserialize)]
pub struct TriggerOptimizationRequest {
    #[serde(default)]
    force: bool,
}

/// Optimization history response
#[derive(Debug, Serialize)]
pub struct OptimizationHistoryResponse {
    runs: Vec<OptimizationRun>,
    total: usize,
}

/// Optimization run
#[derive(Debug, Serialize)]
pub struct OptimizationRun {
    id: i64,
    created_at: DateTime<Utc>,
    duration_ms: i64,
    objective: String,
    success: bool,
}

/// POST /api/v1/optimize/trigger - Force trigger optimization
pub async fn trigger_optimization(
    State(_state): State<AppState>,
    Json(request): Json<TriggerOptimizationRequest>,
) -> Result<Json<ApiResponse<OptimizationResult>>, ApiError> {
    tracing::info!(force = request.force, "Triggering optimization");

    // TODO: Actually trigger optimization in controller
    // For now, return a placeholder result

    let result = OptimizationResult {
        timestamp: Utc::now(),
        objective: "MinimizeCost".to_string(),
        duration_ms: 0,
        estimated_cost: None,
        estimated_savings: None,
        schedule_created: false,
    };

    Ok(Json(ApiResponse::success(result)))
}

/// GET /api/v1/optimize/status - Get optimization status
pub async fn get_optimization_status(
    State(_state): State<AppState>,
) -> Result<Json<ApiResponse<OptimizationStatusResponse>>, ApiError> {
    // TODO: Get actual status from controller
    let response = OptimizationStatusResponse {
        last_run: None,
        next_scheduled: None,
        status: "idle".to_string(),
        last_result: None,
    };

    Ok(Json(ApiResponse::success(response)))
}

/// GET /api/v1/optimize/history - Get optimization history
#[cfg(feature = "db")]
pub async fn get_optimization_history(
    State(_state): State<AppState>,
) -> Result<Json<ApiResponse<OptimizationHistoryResponse>>, ApiError> {
    // TODO: Fetch from database
    let response = OptimizationHistoryResponse {
        runs: vec![],
        total: 0,
    };

    Ok(Json(ApiResponse::success(response)))
}

#[cfg(not(feature = "db"))]
pub async fn get_optimization_history(
    State(_state): State<AppState>,
) -> Result<Json<ApiResponse<OptimizationHistoryResponse>>, ApiError> {
    Ok(Json(ApiResponse::success(OptimizationHistoryResponse {
        runs: vec![],
        total: 0,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optimization_result_serialization() {
        let result = OptimizationResult {
            timestamp: Utc::now(),
            objective: "MinimizeCost".to_string(),
            duration_ms: 150,
            estimated_cost: Some(45.50),
            estimated_savings: Some(12.30),
            schedule_created: true,
        };

        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("objective"));
        assert!(json.contains("duration_ms"));
    }
}
