#![allow(dead_code)]
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::override_evaluator::EffectivePlan;
use super::state_machine::ControlEntity;

#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityWriteRecord {
    pub entity: ControlEntity,
    pub attempt: u32,
    pub ok: bool,
    pub error: Option<String>,
    /// True when the tick left this entity untouched because its desired
    /// value hadn't changed and the tracker reported no drift.
    pub skipped: bool,
}

/// One row of the append-only execution log: the tick's effective plan plus
/// the per-entity write outcomes, in write order.
#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickRecord {
    pub tick_at: DateTime<Utc>,
    pub slot_start: DateTime<Utc>,
    pub reason: String,
    pub writes: Vec<EntityWriteRecord>,
}

impl TickRecord {
    pub fn from_effective_plan(tick_at: DateTime<Utc>, slot_start: DateTime<Utc>, plan: &EffectivePlan) -> Self {
        Self { tick_at, slot_start, reason: plan.reason.clone(), writes: Vec::new() }
    }
}

/// Append-only in-memory execution log, capped to bound memory; a `"db"`
/// backend would persist each row instead of evicting it. Readers (the
/// diagnostics API) only ever see committed, fully-written ticks.
pub struct ExecutionLog {
    rows: RwLock<std::collections::VecDeque<TickRecord>>,
    capacity: usize,
}

impl ExecutionLog {
    pub fn new(capacity: usize) -> Self {
        Self { rows: RwLock::new(std::collections::VecDeque::with_capacity(capacity)), capacity }
    }

    pub async fn append(&self, record: TickRecord) {
        let mut rows = self.rows.write().await;
        if rows.len() >= self.capacity {
            rows.pop_front();
        }
        rows.push_back(record);
    }

    pub async fn recent(&self, n: usize) -> Vec<TickRecord> {
        let rows = self.rows.read().await;
        rows.iter().rev().take(n).cloned().collect()
    }
}

impl Default for ExecutionLog {
    fn default() -> Self {
        Self::new(2_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_plan() -> EffectivePlan {
        EffectivePlan {
            charge_kwh: 0.0,
            discharge_kwh: 0.0,
            grid_export_kwh: 0.0,
            water_heat_on: false,
            soc_target_pct: 50.0,
            classification: crate::domain::slot::Classification::Hold,
            reason: "planned".to_string(),
            manual_mode: None,
        }
    }

    #[tokio::test]
    async fn append_and_recent_preserve_order() {
        let log = ExecutionLog::new(10);
        let now: DateTime<Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
        for i in 0..3 {
            let slot_start = now + chrono::Duration::minutes(15 * i);
            log.append(TickRecord::from_effective_plan(now, slot_start, &sample_plan())).await;
        }
        let recent = log.recent(2).await;
        assert_eq!(recent.len(), 2);
        assert!(recent[0].slot_start > recent[1].slot_start);
    }

    #[tokio::test]
    async fn append_evicts_oldest_beyond_capacity() {
        let log = ExecutionLog::new(2);
        let now: DateTime<Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
        for i in 0..5 {
            let slot_start = now + chrono::Duration::minutes(15 * i);
            log.append(TickRecord::from_effective_plan(now, slot_start, &sample_plan())).await;
        }
        let recent = log.recent(10).await;
        assert_eq!(recent.len(), 2);
    }
}
