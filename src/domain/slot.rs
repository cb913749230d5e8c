#![allow(dead_code)]
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length of a planning slot.
pub const SLOT_MINUTES: i64 = 15;

/// Number of slots in a planning horizon (48h @ 15min).
pub const HORIZON_SLOTS: usize = 192;

#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Charge,
    Discharge,
    Hold,
    Export,
    PvCharge,
    Water,
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Charge => "charge",
            Self::Discharge => "discharge",
            Self::Hold => "hold",
            Self::Export => "export",
            Self::PvCharge => "pv_charge",
            Self::Water => "water",
        };
        write!(f, "{}", s)
    }
}

#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ManualOverrideSource {
    None,
    UserBlock,
    Analyst,
}

impl Default for ManualOverrideSource {
    fn default() -> Self {
        Self::None
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SlotError {
    #[error("slot times not strictly sorted")]
    NotSorted,
    #[error("slot start {0} is not aligned to a {SLOT_MINUTES}-minute boundary")]
    NotAligned(DateTime<Utc>),
    #[error("frame has {have} slots, need at least {need}")]
    TooShort { have: usize, need: usize },
    #[error("charge_kwh and discharge_kwh cannot both be nonzero in one slot")]
    ChargeDischargeConflict,
    #[error("grid_import_kwh and grid_export_kwh cannot both be nonzero in one slot")]
    ImportExportConflict,
    #[error("soc percent {0} out of [0, 100] range")]
    SocOutOfRange(f64),
}

/// A single 15-minute planning slot: immutable key, mutable plan/observation fields.
#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    pub slot_start: DateTime<Utc>,
    pub slot_end: DateTime<Utc>,

    // Forecast
    pub load_kwh: f64,
    pub pv_kwh: f64,
    pub load_p10: Option<f64>,
    pub load_p50: Option<f64>,
    pub load_p90: Option<f64>,
    pub pv_p10: Option<f64>,
    pub pv_p50: Option<f64>,
    pub pv_p90: Option<f64>,

    // Tariff
    pub import_price: f64,
    pub export_price: f64,

    // Plan
    pub charge_kwh: f64,
    pub discharge_kwh: f64,
    pub grid_import_kwh: f64,
    pub grid_export_kwh: f64,
    pub water_heat_on: bool,
    pub soc_start_pct: f64,
    pub soc_end_pct: f64,
    pub soc_target_pct: f64,
    pub classification: Classification,
    pub reason: String,

    // Observation
    pub actual_load_kwh: Option<f64>,
    pub actual_pv_kwh: Option<f64>,
    pub actual_charge_kwh: Option<f64>,
    pub actual_discharge_kwh: Option<f64>,
    pub actual_grid_import_kwh: Option<f64>,
    pub actual_grid_export_kwh: Option<f64>,
    pub actual_soc_pct: Option<f64>,

    // Flags
    pub is_historical: bool,
    pub manual_override_source: ManualOverrideSource,
}

impl Slot {
    pub fn new_empty(slot_start: DateTime<Utc>) -> Self {
        Self {
            slot_start,
            slot_end: slot_start + ChronoDuration::minutes(SLOT_MINUTES),
            load_kwh: 0.0,
            pv_kwh: 0.0,
            load_p10: None,
            load_p50: None,
            load_p90: None,
            pv_p10: None,
            pv_p50: None,
            pv_p90: None,
            import_price: 0.0,
            export_price: 0.0,
            charge_kwh: 0.0,
            discharge_kwh: 0.0,
            grid_import_kwh: 0.0,
            grid_export_kwh: 0.0,
            water_heat_on: false,
            soc_start_pct: 0.0,
            soc_end_pct: 0.0,
            soc_target_pct: 0.0,
            classification: Classification::Hold,
            reason: String::new(),
            actual_load_kwh: None,
            actual_pv_kwh: None,
            actual_charge_kwh: None,
            actual_discharge_kwh: None,
            actual_grid_import_kwh: None,
            actual_grid_export_kwh: None,
            actual_soc_pct: None,
            is_historical: false,
            manual_override_source: ManualOverrideSource::None,
        }
    }

    /// Checks the per-slot plan invariants from the data model.
    pub fn validate_plan(&self) -> Result<(), SlotError> {
        if self.charge_kwh > 0.0 && self.discharge_kwh > 0.0 {
            return Err(SlotError::ChargeDischargeConflict);
        }
        if self.grid_import_kwh > 0.0 && self.grid_export_kwh > 0.0 {
            return Err(SlotError::ImportExportConflict);
        }
        for pct in [self.soc_start_pct, self.soc_end_pct, self.soc_target_pct] {
            if !(0.0..=100.0).contains(&pct) {
                return Err(SlotError::SocOutOfRange(pct));
            }
        }
        Ok(())
    }

    pub fn aligned(&self) -> bool {
        self.slot_start.timestamp() % (SLOT_MINUTES * 60) == 0
    }
}

/// Validates a raw frame of slots (ordering, alignment, minimum length) before
/// any other component is allowed to touch it. Grounded on `Schedule::validate`.
pub fn validate_frame(slots: &[Slot]) -> Result<(), SlotError> {
    if slots.len() < HORIZON_SLOTS {
        return Err(SlotError::TooShort { have: slots.len(), need: HORIZON_SLOTS });
    }
    for w in slots.windows(2) {
        if w[1].slot_start <= w[0].slot_start {
            return Err(SlotError::NotSorted);
        }
    }
    for s in slots {
        if !s.aligned() {
            return Err(SlotError::NotAligned(s.slot_start));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aligned_start() -> DateTime<Utc> {
        "2026-01-01T00:00:00Z".parse().unwrap()
    }

    #[test]
    fn validate_plan_rejects_simultaneous_charge_and_discharge() {
        let mut slot = Slot::new_empty(aligned_start());
        slot.charge_kwh = 1.0;
        slot.discharge_kwh = 1.0;
        assert_eq!(slot.validate_plan(), Err(SlotError::ChargeDischargeConflict));
    }

    #[test]
    fn validate_plan_rejects_simultaneous_import_and_export() {
        let mut slot = Slot::new_empty(aligned_start());
        slot.grid_import_kwh = 1.0;
        slot.grid_export_kwh = 1.0;
        assert_eq!(slot.validate_plan(), Err(SlotError::ImportExportConflict));
    }

    #[test]
    fn validate_frame_rejects_short_frame() {
        let slots = vec![Slot::new_empty(aligned_start())];
        assert!(matches!(validate_frame(&slots), Err(SlotError::TooShort { .. })));
    }

    #[test]
    fn validate_frame_rejects_misaligned_start() {
        let mut slots = Vec::new();
        let mut t = aligned_start() + ChronoDuration::minutes(3);
        for _ in 0..HORIZON_SLOTS {
            slots.push(Slot::new_empty(t));
            t += ChronoDuration::minutes(SLOT_MINUTES);
        }
        assert!(matches!(validate_frame(&slots), Err(SlotError::NotAligned(_))));
    }

    #[test]
    fn validate_frame_accepts_sorted_aligned_full_horizon() {
        let mut slots = Vec::new();
        let mut t = aligned_start();
        for _ in 0..HORIZON_SLOTS {
            slots.push(Slot::new_empty(t));
            t += ChronoDuration::minutes(SLOT_MINUTES);
        }
        assert!(validate_frame(&slots).is_ok());
    }
}
