#![allow(dead_code)]
use crate::domain::context::{ContextGates, ManualOverrideMode};
use crate::domain::slot::{Classification, Slot};

/// Real-time thresholds the OverrideEvaluator applies on top of the current
/// slot's plan. Distinct from the policy vector: these are live safety/
/// comfort gates, not planning-time economics.
#[derive(Debug, Clone, Copy)]
pub struct OverrideThresholds {
    pub min_soc_pct: f64,
    pub max_soc_pct: f64,
    pub low_soc_buffer_pct: f64,
    pub pv_dump_threshold_kw: f64,
    pub max_soc_epsilon_pct: f64,
    pub stale_slot_seconds: i64,
}

/// Live readings the evaluator needs beyond the planned slot itself.
#[derive(Debug, Clone, Copy)]
pub struct LiveState {
    pub soc_now_pct: f64,
    pub pv_now_kw: f64,
    pub water_heater_idle: bool,
    pub slot_age_seconds: i64,
}

#[derive(Debug, Clone)]
pub struct EffectivePlan {
    pub charge_kwh: f64,
    pub discharge_kwh: f64,
    pub grid_export_kwh: f64,
    pub water_heat_on: bool,
    pub soc_target_pct: f64,
    pub classification: Classification,
    pub reason: String,
    pub manual_mode: Option<ManualOverrideMode>,
}

/// Priority order: stale/missing plan > low-SoC protection > manual override
/// > PV dump > planned action. Each branch returns immediately; only the
/// winning rule's reason is recorded.
pub struct OverrideEvaluator;

impl OverrideEvaluator {
    pub fn evaluate(
        slot: &Slot,
        context: &ContextGates,
        live: &LiveState,
        thresholds: &OverrideThresholds,
    ) -> EffectivePlan {
        if live.slot_age_seconds > thresholds.stale_slot_seconds {
            return EffectivePlan {
                charge_kwh: 0.0,
                discharge_kwh: 0.0,
                grid_export_kwh: 0.0,
                water_heat_on: false,
                soc_target_pct: live.soc_now_pct,
                classification: Classification::Hold,
                reason: "stale_slot_safe_idle".to_string(),
                manual_mode: None,
            };
        }

        if live.soc_now_pct < thresholds.min_soc_pct + thresholds.low_soc_buffer_pct {
            return EffectivePlan {
                charge_kwh: slot.charge_kwh,
                discharge_kwh: 0.0,
                grid_export_kwh: 0.0,
                water_heat_on: slot.water_heat_on,
                soc_target_pct: thresholds.min_soc_pct + thresholds.low_soc_buffer_pct,
                classification: Classification::Hold,
                reason: "low_soc_protection".to_string(),
                manual_mode: None,
            };
        }

        if let Some(mode) = context.manual_override {
            return Self::manual_plan(slot, mode);
        }

        if live.pv_now_kw > thresholds.pv_dump_threshold_kw
            && live.soc_now_pct >= thresholds.max_soc_pct - thresholds.max_soc_epsilon_pct
            && live.water_heater_idle
        {
            return EffectivePlan {
                charge_kwh: slot.charge_kwh,
                discharge_kwh: slot.discharge_kwh,
                grid_export_kwh: slot.grid_export_kwh,
                water_heat_on: true,
                soc_target_pct: slot.soc_target_pct,
                classification: Classification::Water,
                reason: "pv_dump".to_string(),
                manual_mode: None,
            };
        }

        EffectivePlan {
            charge_kwh: slot.charge_kwh,
            discharge_kwh: slot.discharge_kwh,
            grid_export_kwh: slot.grid_export_kwh,
            water_heat_on: slot.water_heat_on,
            soc_target_pct: slot.soc_target_pct,
            classification: slot.classification,
            reason: "planned".to_string(),
            manual_mode: None,
        }
    }

    /// A manual override bypasses the planned action entirely for the
    /// selected mode only; it leaves PV-dump/planned handling for anything
    /// else the mode doesn't cover.
    fn manual_plan(slot: &Slot, mode: ManualOverrideMode) -> EffectivePlan {
        match mode {
            ManualOverrideMode::ForceCharge => EffectivePlan {
                charge_kwh: slot.charge_kwh.max(0.1),
                discharge_kwh: 0.0,
                grid_export_kwh: 0.0,
                water_heat_on: slot.water_heat_on,
                soc_target_pct: slot.soc_target_pct,
                classification: Classification::Charge,
                reason: "manual_force_charge".to_string(),
                manual_mode: Some(mode),
            },
            ManualOverrideMode::Pause => EffectivePlan {
                charge_kwh: 0.0,
                discharge_kwh: 0.0,
                grid_export_kwh: 0.0,
                water_heat_on: slot.water_heat_on,
                soc_target_pct: slot.soc_target_pct,
                classification: Classification::Hold,
                reason: "manual_pause".to_string(),
                manual_mode: Some(mode),
            },
            ManualOverrideMode::WaterBoost => EffectivePlan {
                charge_kwh: slot.charge_kwh,
                discharge_kwh: slot.discharge_kwh,
                grid_export_kwh: slot.grid_export_kwh,
                water_heat_on: true,
                soc_target_pct: slot.soc_target_pct,
                classification: Classification::Water,
                reason: "manual_water_boost".to_string(),
                manual_mode: Some(mode),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    fn base_slot() -> Slot {
        let start = "2026-01-01T00:00:00Z".parse().unwrap();
        let mut slot = Slot::new_empty(start);
        slot.discharge_kwh = 1.0;
        slot.classification = Classification::Discharge;
        slot
    }

    #[test]
    fn low_soc_below_buffer_forces_charge_override() {
        let slot = base_slot();
        let context = ContextGates::default();
        let live = LiveState { soc_now_pct: 12.0, pv_now_kw: 0.0, water_heater_idle: true, slot_age_seconds: 0 };
        let effective = OverrideEvaluator::evaluate(&slot, &context, &live, &thresholds());

        assert_eq!(effective.discharge_kwh, 0.0);
        assert_eq!(effective.grid_export_kwh, 0.0);
        assert_eq!(effective.classification, Classification::Hold);
        assert_eq!(effective.reason, "low_soc_protection");
    }

    #[test]
    fn low_soc_protection_outranks_manual_override() {
        let slot = base_slot();
        let mut context = ContextGates::default();
        context.manual_override = Some(ManualOverrideMode::ForceCharge);
        let live = LiveState { soc_now_pct: 12.0, pv_now_kw: 0.0, water_heater_idle: true, slot_age_seconds: 0 };
        let effective = OverrideEvaluator::evaluate(&slot, &context, &live, &thresholds());
        assert_eq!(effective.reason, "low_soc_protection");
    }

    #[test]
    fn pv_dump_turns_water_heater_on() {
        let mut slot = base_slot();
        slot.discharge_kwh = 0.0;
        slot.classification = Classification::Hold;
        let context = ContextGates::default();
        let live = LiveState { soc_now_pct: 95.0, pv_now_kw: 4.0, water_heater_idle: true, slot_age_seconds: 0 };
        let effective = OverrideEvaluator::evaluate(&slot, &context, &live, &thresholds());
        assert!(effective.water_heat_on);
        assert_eq!(effective.reason, "pv_dump");
    }

    #[test]
    fn stale_slot_forces_safe_idle() {
        let slot = base_slot();
        let context = ContextGates::default();
        let live = LiveState { soc_now_pct: 50.0, pv_now_kw: 0.0, water_heater_idle: true, slot_age_seconds: 1000 };
        let effective = OverrideEvaluator::evaluate(&slot, &context, &live, &thresholds());
        assert_eq!(effective.reason, "stale_slot_safe_idle");
        assert_eq!(effective.discharge_kwh, 0.0);
    }
}
