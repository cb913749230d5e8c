#![allow(dead_code)]
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ControlEntity {
    WorkMode,
    GridCharging,
    ChargePower,
    DischargePower,
    ExportLimit,
    SocTarget,
    WaterHeaterTarget,
    WaterHeaterEnable,
}

impl ControlEntity {
    /// Write order mandated by the tick contract: work-mode first, water
    /// heater last.
    pub const ORDER: [ControlEntity; 8] = [
        ControlEntity::WorkMode,
        ControlEntity::GridCharging,
        ControlEntity::ChargePower,
        ControlEntity::DischargePower,
        ControlEntity::ExportLimit,
        ControlEntity::SocTarget,
        ControlEntity::WaterHeaterTarget,
        ControlEntity::WaterHeaterEnable,
    ];
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntityState {
    Unknown,
    Setting,
    Confirmed,
    Drifted,
}

/// Per-entity state-machine tracker. `Unknown -> Setting -> Confirmed` on a
/// successful write + matching readback; `Confirmed -> Drifted` when a later
/// readback disagrees with the last applied value beyond tolerance, which
/// triggers a re-apply on the next tick.
#[derive(Debug, Default)]
pub struct EntityStateTracker {
    states: HashMap<ControlEntity, EntityState>,
    last_applied: HashMap<ControlEntity, f64>,
}

impl EntityStateTracker {
    pub fn state_of(&self, entity: ControlEntity) -> EntityState {
        self.states.get(&entity).copied().unwrap_or(EntityState::Unknown)
    }

    pub fn mark_setting(&mut self, entity: ControlEntity, value: f64) {
        self.states.insert(entity, EntityState::Setting);
        self.last_applied.insert(entity, value);
    }

    pub fn mark_confirmed(&mut self, entity: ControlEntity) {
        self.states.insert(entity, EntityState::Confirmed);
    }

    pub fn observe(&mut self, entity: ControlEntity, reported: f64, tolerance: f64) {
        let Some(&applied) = self.last_applied.get(&entity) else {
            return;
        };
        if (reported - applied).abs() > tolerance {
            self.states.insert(entity, EntityState::Drifted);
        } else if self.states.get(&entity) == Some(&EntityState::Setting) {
            self.states.insert(entity, EntityState::Confirmed);
        }
    }

    pub fn needs_reapply(&self, entity: ControlEntity) -> bool {
        matches!(self.state_of(entity), EntityState::Unknown | EntityState::Drifted)
    }

    /// Last value this tracker applied (or last observed as matching) for
    /// `entity`, if any. Used to detect a changed *desired* value even when
    /// the entity itself hasn't drifted.
    pub fn last_applied_value(&self, entity: ControlEntity) -> Option<f64> {
        self.last_applied.get(&entity).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_entity_needs_reapply() {
        let tracker = EntityStateTracker::default();
        assert!(tracker.needs_reapply(ControlEntity::WorkMode));
    }

    #[test]
    fn drift_beyond_tolerance_triggers_reapply() {
        let mut tracker = EntityStateTracker::default();
        tracker.mark_setting(ControlEntity::ChargePower, 1000.0);
        tracker.mark_confirmed(ControlEntity::ChargePower);
        tracker.observe(ControlEntity::ChargePower, 1500.0, 50.0);
        assert_eq!(tracker.state_of(ControlEntity::ChargePower), EntityState::Drifted);
        assert!(tracker.needs_reapply(ControlEntity::ChargePower));
    }

    #[test]
    fn matching_readback_confirms_setting() {
        let mut tracker = EntityStateTracker::default();
        tracker.mark_setting(ControlEntity::SocTarget, 60.0);
        tracker.observe(ControlEntity::SocTarget, 60.2, 1.0);
        assert_eq!(tracker.state_of(ControlEntity::SocTarget), EntityState::Confirmed);
    }

    #[test]
    fn last_applied_value_is_none_until_set() {
        let mut tracker = EntityStateTracker::default();
        assert_eq!(tracker.last_applied_value(ControlEntity::WorkMode), None);
        tracker.mark_setting(ControlEntity::WorkMode, 2.0);
        assert_eq!(tracker.last_applied_value(ControlEntity::WorkMode), Some(2.0));
    }
}
