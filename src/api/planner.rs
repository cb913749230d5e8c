#![allow(dead_code)]
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::AuthBearer;
use crate::domain::slot::Slot;
use crate::executor::{ControlEntities, SimulatedControlEntities};
use crate::controller::planner_runtime::PlannerRuntime;

use super::error::ApiError;

pub type PlannerState = Arc<PlannerRuntime<SimulatedControlEntities>>;

/// Slot-based planner/executor surface, mounted alongside the legacy `/api/v1`
/// router while the shadow pipeline proves itself. Shares the Bearer-token
/// auth layer but runs against its own state -- it knows nothing about
/// `AppState`'s battery controller.
pub fn router(state: PlannerState, token: String) -> Router {
    Router::new()
        .route("/schedule", get(get_full_schedule))
        .route("/schedule/slot/{start}", get(get_slot))
        .route("/schedule/export", get(export_schedule_csv))
        .route("/diagnostics/execution-log", get(get_execution_log))
        .route("/water-heater/state", get(get_water_heater_state))
        .route("/water-heater/target", post(set_water_heater_target))
        .route("/water-heater/enable", post(set_water_heater_enable))
        .with_state(state)
        .layer(crate::auth::auth_layer(token))
}

async fn get_full_schedule(State(st): State<PlannerState>, AuthBearer: AuthBearer) -> Result<Json<Vec<Slot>>, ApiError> {
    let now = Utc::now();
    let window = st
        .store
        .get_slot_window(now, now + chrono::Duration::hours(48))
        .await?;
    Ok(Json(window))
}

#[derive(Debug, Deserialize)]
struct SlotPath {
    start: DateTime<Utc>,
}

async fn get_slot(
    State(st): State<PlannerState>,
    AuthBearer: AuthBearer,
    Path(SlotPath { start }): Path<SlotPath>,
) -> Result<Json<Slot>, ApiError> {
    let slot = st
        .store
        .get_current_slot(start)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no slot covers {start}")))?;
    Ok(Json(slot))
}

async fn export_schedule_csv(State(st): State<PlannerState>, AuthBearer: AuthBearer) -> Result<Response, ApiError> {
    let now = Utc::now();
    let window = st
        .store
        .get_slot_window(now, now + chrono::Duration::hours(48))
        .await?;

    let mut csv = String::from("slot_start,charge_kwh,discharge_kwh,grid_import_kwh,grid_export_kwh,water_heat_on,soc_end_pct,classification\n");
    for slot in &window {
        csv.push_str(&format!(
            "{},{:.3},{:.3},{:.3},{:.3},{},{:.1},{:?}\n",
            slot.slot_start,
            slot.charge_kwh,
            slot.discharge_kwh,
            slot.grid_import_kwh,
            slot.grid_export_kwh,
            slot.water_heat_on,
            slot.soc_end_pct,
            slot.classification,
        ));
    }

    Ok((
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "text/csv")],
        csv,
    )
        .into_response())
}

#[derive(Debug, Serialize)]
struct ExecutionLogEntry {
    tick_at: DateTime<Utc>,
    slot_start: DateTime<Utc>,
    reason: String,
    all_writes_ok: bool,
}

async fn get_execution_log(State(st): State<PlannerState>, AuthBearer: AuthBearer) -> Json<Vec<ExecutionLogEntry>> {
    let recent = st.executor.log().recent(100).await;
    Json(
        recent
            .into_iter()
            .map(|r| ExecutionLogEntry {
                tick_at: r.tick_at,
                slot_start: r.slot_start,
                reason: r.reason,
                all_writes_ok: r.writes.iter().all(|w| w.ok),
            })
            .collect(),
    )
}

#[derive(Debug, Serialize)]
struct WaterHeaterState {
    enabled: bool,
    target_c: f64,
}

async fn get_water_heater_state(
    State(st): State<PlannerState>,
    AuthBearer: AuthBearer,
) -> Result<Json<WaterHeaterState>, ApiError> {
    let reported = st.executor.entities().read_reported().await?;
    Ok(Json(WaterHeaterState {
        enabled: reported.water_heater_enabled,
        target_c: reported.water_heater_target_c,
    }))
}

#[derive(Debug, Deserialize)]
struct SetTargetRequest {
    celsius: f64,
}

async fn set_water_heater_target(
    State(st): State<PlannerState>,
    AuthBearer: AuthBearer,
    Json(req): Json<SetTargetRequest>,
) -> Result<StatusCode, ApiError> {
    st.executor.entities().set_water_heater_target_c(req.celsius).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct SetEnableRequest {
    enabled: bool,
}

async fn set_water_heater_enable(
    State(st): State<PlannerState>,
    AuthBearer: AuthBearer,
    Json(req): Json<SetEnableRequest>,
) -> Result<StatusCode, ApiError> {
    st.executor.entities().set_water_heater_enable(req.enabled).await?;
    Ok(StatusCode::NO_CONTENT)
}
