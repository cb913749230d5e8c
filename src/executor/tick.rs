#![allow(dead_code)]
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{error, warn};

use crate::domain::context::ContextGates;
use crate::domain::slot::Slot;

use super::control_entities::{ControlEntities, ReportedState, WorkMode};
use super::log::{EntityWriteRecord, ExecutionLog, TickRecord};
use super::override_evaluator::{EffectivePlan, LiveState, OverrideEvaluator, OverrideThresholds};
use super::state_machine::{ControlEntity, EntityStateTracker};

const MAX_WRITE_ATTEMPTS: u32 = 3;
const BACKOFF_BASE_SECS: u64 = 1;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("slot window does not contain the current slot")]
    SlotWindowIncomplete,
    #[error("control entity write failed after {attempts} attempts: {source}")]
    EntityWriteFailed { attempts: u32, source: String },
}

/// Drives a single 5-minute tick: gate check, current-slot lookup, override
/// evaluation, diff-and-apply against the entity state machine, and an
/// append-only record of the outcome.
pub struct Executor<C: ControlEntities> {
    entities: C,
    log: ExecutionLog,
    thresholds: OverrideThresholds,
}

impl<C: ControlEntities> Executor<C> {
    pub fn new(entities: C, thresholds: OverrideThresholds) -> Self {
        Self { entities, log: ExecutionLog::default(), thresholds }
    }

    pub fn log(&self) -> &ExecutionLog {
        &self.log
    }

    pub fn entities(&self) -> &C {
        &self.entities
    }

    /// Runs one tick. Returns early with `SlotWindowIncomplete` before any
    /// writes are attempted if there is no current slot -- the executor never
    /// guesses.
    pub async fn tick(
        &self,
        now: DateTime<Utc>,
        current_slot: Option<&Slot>,
        context: &ContextGates,
        live: &LiveState,
        tracker: &mut EntityStateTracker,
    ) -> Result<TickRecord, ExecutorError> {
        let Some(slot) = current_slot else {
            return Err(ExecutorError::SlotWindowIncomplete);
        };

        if !context.automation_enabled {
            let plan = EffectivePlan {
                charge_kwh: 0.0,
                discharge_kwh: 0.0,
                grid_export_kwh: 0.0,
                water_heat_on: slot.water_heat_on,
                soc_target_pct: slot.soc_target_pct,
                classification: slot.classification,
                reason: "automation_disabled".to_string(),
                manual_mode: None,
            };
            return Ok(TickRecord::from_effective_plan(now, slot.slot_start, &plan));
        }

        let plan = OverrideEvaluator::evaluate(slot, context, live, &self.thresholds);
        let mut record = TickRecord::from_effective_plan(now, slot.slot_start, &plan);

        let reported = match self.entities.read_reported().await {
            Ok(reported) => Some(reported),
            Err(e) => {
                warn!(error = %e, "readback failed, diffing against last known state only");
                None
            }
        };

        for entity in ControlEntity::ORDER {
            if let Some(reported) = &reported {
                tracker.observe(entity, reported_value(entity, reported), tolerance_for(entity, &self.thresholds));
            }

            let desired = desired_value(entity, &plan);
            let desired_changed = match tracker.last_applied_value(entity) {
                Some(applied) => (desired - applied).abs() > tolerance_for(entity, &self.thresholds),
                None => true,
            };

            if !desired_changed && !tracker.needs_reapply(entity) {
                record.writes.push(EntityWriteRecord { entity, attempt: 0, ok: true, error: None, skipped: true });
                continue;
            }

            let write = self.apply_entity(entity, &plan, tracker).await;
            record.writes.push(write);
        }

        self.log.append(record.clone()).await;
        Ok(record)
    }

    async fn apply_entity(
        &self,
        entity: ControlEntity,
        plan: &EffectivePlan,
        tracker: &mut EntityStateTracker,
    ) -> EntityWriteRecord {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = self.write_once(entity, plan).await;
            match result {
                Ok(value) => {
                    tracker.mark_setting(entity, value);
                    tracker.mark_confirmed(entity);
                    return EntityWriteRecord { entity, attempt, ok: true, error: None, skipped: false };
                }
                Err(e) if attempt < MAX_WRITE_ATTEMPTS => {
                    let backoff = BACKOFF_BASE_SECS * 2u64.pow(attempt - 1);
                    warn!(?entity, attempt, backoff, error = %e, "control entity write failed, retrying");
                    tokio::time::sleep(Duration::from_secs(backoff)).await;
                }
                Err(e) => {
                    error!(?entity, attempt, error = %e, "control entity write exhausted retries");
                    return EntityWriteRecord { entity, attempt, ok: false, error: Some(e.to_string()), skipped: false };
                }
            }
        }
    }

    async fn write_once(&self, entity: ControlEntity, plan: &EffectivePlan) -> anyhow::Result<f64> {
        match entity {
            ControlEntity::WorkMode => {
                let mode = work_mode_for(plan);
                self.entities.set_work_mode(mode).await?;
                Ok(mode as i32 as f64)
            }
            ControlEntity::GridCharging => {
                let enabled = plan.charge_kwh > 0.0;
                self.entities.set_grid_charging(enabled).await?;
                Ok(if enabled { 1.0 } else { 0.0 })
            }
            ControlEntity::ChargePower => {
                let watts = plan.charge_kwh * 4.0 * 1000.0;
                self.entities.set_max_charge_power_w(watts).await?;
                Ok(watts)
            }
            ControlEntity::DischargePower => {
                let watts = plan.discharge_kwh * 4.0 * 1000.0;
                self.entities.set_max_discharge_power_w(watts).await?;
                Ok(watts)
            }
            ControlEntity::ExportLimit => {
                let watts = plan.grid_export_kwh * 4.0 * 1000.0;
                self.entities.set_grid_max_export_w(watts).await?;
                Ok(watts)
            }
            ControlEntity::SocTarget => {
                let pct = plan.soc_target_pct;
                self.entities.set_soc_target_percent(pct).await?;
                Ok(pct)
            }
            ControlEntity::WaterHeaterTarget => {
                let celsius = 55.0;
                self.entities.set_water_heater_target_c(celsius).await?;
                Ok(celsius)
            }
            ControlEntity::WaterHeaterEnable => {
                self.entities.set_water_heater_enable(plan.water_heat_on).await?;
                Ok(if plan.water_heat_on { 1.0 } else { 0.0 })
            }
        }
    }
}

fn work_mode_for(plan: &EffectivePlan) -> WorkMode {
    if plan.discharge_kwh > 0.0 || plan.grid_export_kwh > 0.0 {
        WorkMode::ExportFirst
    } else if plan.charge_kwh > 0.0 {
        WorkMode::BatteryFirst
    } else {
        WorkMode::LoadFirst
    }
}

/// The value `write_once` would apply for `entity` given `plan`, without
/// performing the write. Used to decide whether a write is needed at all.
fn desired_value(entity: ControlEntity, plan: &EffectivePlan) -> f64 {
    match entity {
        ControlEntity::WorkMode => work_mode_for(plan) as i32 as f64,
        ControlEntity::GridCharging => if plan.charge_kwh > 0.0 { 1.0 } else { 0.0 },
        ControlEntity::ChargePower => plan.charge_kwh * 4.0 * 1000.0,
        ControlEntity::DischargePower => plan.discharge_kwh * 4.0 * 1000.0,
        ControlEntity::ExportLimit => plan.grid_export_kwh * 4.0 * 1000.0,
        ControlEntity::SocTarget => plan.soc_target_pct,
        ControlEntity::WaterHeaterTarget => 55.0,
        ControlEntity::WaterHeaterEnable => if plan.water_heat_on { 1.0 } else { 0.0 },
    }
}

fn reported_value(entity: ControlEntity, reported: &ReportedState) -> f64 {
    match entity {
        ControlEntity::WorkMode => reported.work_mode as i32 as f64,
        ControlEntity::GridCharging => if reported.grid_charging { 1.0 } else { 0.0 },
        ControlEntity::ChargePower => reported.max_charge_power_w,
        ControlEntity::DischargePower => reported.max_discharge_power_w,
        ControlEntity::ExportLimit => reported.grid_max_export_w,
        ControlEntity::SocTarget => reported.soc_target_percent,
        ControlEntity::WaterHeaterTarget => reported.water_heater_target_c,
        ControlEntity::WaterHeaterEnable => if reported.water_heater_enabled { 1.0 } else { 0.0 },
    }
}

fn tolerance_for(entity: ControlEntity, thresholds: &OverrideThresholds) -> f64 {
    match entity {
        ControlEntity::WorkMode | ControlEntity::GridCharging | ControlEntity::WaterHeaterEnable => 0.5,
        ControlEntity::ChargePower | ControlEntity::DischargePower | ControlEntity::ExportLimit => 50.0,
        ControlEntity::SocTarget => thresholds.max_soc_epsilon_pct,
        ControlEntity::WaterHeaterTarget => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::slot::Classification;
    use crate::executor::control_entities::SimulatedControlEntities;

    fn thresholds() -> OverrideThresholds {
        OverrideThresholds {
            min_soc_pct: 10.0,
            max_soc_pct: 95.0,
            low_soc_buffer_pct: 5.0,
            pv_dump_threshold_kw: 3.0,
            max_soc_epsilon_pct: 1.0,
            stale_slot_seconds: 900,
        }
    }

    #[tokio::test]
    async fn tick_without_current_slot_errors() {
        let executor = Executor::new(SimulatedControlEntities::default(), thresholds());
        let mut tracker = EntityStateTracker::default();
        let context = ContextGates::default();
        let live = LiveState { soc_now_pct: 50.0, pv_now_kw: 0.0, water_heater_idle: true, slot_age_seconds: 0 };
        let now: DateTime<Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
        let result = executor.tick(now, None, &context, &live, &mut tracker).await;
        assert!(matches!(result, Err(ExecutorError::SlotWindowIncomplete)));
    }

    #[tokio::test]
    async fn tick_applies_low_soc_protection_and_logs_it() {
        let executor = Executor::new(SimulatedControlEntities::default(), thresholds());
        let mut tracker = EntityStateTracker::default();
        let context = ContextGates::default();
        let live = LiveState { soc_now_pct: 12.0, pv_now_kw: 0.0, water_heater_idle: true, slot_age_seconds: 0 };
        let now: DateTime<Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
        let mut slot = Slot::new_empty(now);
        slot.discharge_kwh = 1.0;
        slot.classification = Classification::Discharge;

        let record = executor.tick(now, Some(&slot), &context, &live, &mut tracker).await.unwrap();
        assert_eq!(record.reason, "low_soc_protection");
        assert_eq!(record.writes.len(), 8);
        assert!(record.writes.iter().all(|w| w.ok));

        let logged = executor.log().recent(1).await;
        assert_eq!(logged.len(), 1);
    }

    #[tokio::test]
    async fn repeated_identical_tick_skips_every_write() {
        let executor = Executor::new(SimulatedControlEntities::default(), thresholds());
        let mut tracker = EntityStateTracker::default();
        let context = ContextGates::default();
        let live = LiveState { soc_now_pct: 50.0, pv_now_kw: 0.0, water_heater_idle: true, slot_age_seconds: 0 };
        let now: DateTime<Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
        let slot = Slot::new_empty(now);

        let first = executor.tick(now, Some(&slot), &context, &live, &mut tracker).await.unwrap();
        assert!(first.writes.iter().all(|w| !w.skipped));

        let second = executor.tick(now, Some(&slot), &context, &live, &mut tracker).await.unwrap();
        assert!(second.writes.iter().all(|w| w.skipped && w.ok));
    }

    #[tokio::test]
    async fn changed_soc_target_is_not_skipped_while_entity_is_idle() {
        let executor = Executor::new(SimulatedControlEntities::default(), thresholds());
        let mut tracker = EntityStateTracker::default();
        let context = ContextGates::default();
        let live = LiveState { soc_now_pct: 50.0, pv_now_kw: 0.0, water_heater_idle: true, slot_age_seconds: 0 };
        let now: DateTime<Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
        let mut slot = Slot::new_empty(now);
        slot.soc_target_pct = 40.0;

        executor.tick(now, Some(&slot), &context, &live, &mut tracker).await.unwrap();

        slot.soc_target_pct = 80.0;
        let second = executor.tick(now, Some(&slot), &context, &live, &mut tracker).await.unwrap();
        let soc_write = second.writes.iter().find(|w| w.entity == ControlEntity::SocTarget).unwrap();
        assert!(!soc_write.skipped);
    }
}
