#![allow(dead_code)]
use crate::domain::slot::{Classification, Slot};
use crate::optimizer::strategies::kepler::{classify, KeplerOutput};

/// Converts MILP output into the canonical slot rows, computing
/// `soc_target_pct` per the block-projection rule and a per-slot reason tag.
/// Does not itself talk to the SlotStore — callers decide the upsert.
pub struct ScheduleAssembler;

impl ScheduleAssembler {
    pub fn assemble(mut slots: Vec<Slot>, solution: &KeplerOutput, capacity_kwh: f64, min_soc_pct: f64) -> Vec<Slot> {
        let n = slots.len();
        debug_assert_eq!(n, solution.charge_kwh.len());

        for t in 0..n {
            let slot = &mut slots[t];
            slot.charge_kwh = solution.charge_kwh[t];
            slot.discharge_kwh = solution.discharge_kwh[t];
            slot.grid_import_kwh = solution.grid_import_kwh[t];
            slot.grid_export_kwh = solution.grid_export_kwh[t];
            slot.water_heat_on = solution.water_on[t];
            slot.soc_start_pct = soc_to_pct(solution.soc_kwh[t], capacity_kwh);
            slot.soc_end_pct = soc_to_pct(solution.soc_kwh[t + 1], capacity_kwh);
            slot.classification = classify(
                solution.charge_kwh[t],
                solution.discharge_kwh[t],
                solution.grid_export_kwh[t],
                solution.water_on[t],
            );
        }

        Self::assign_block_targets(&mut slots, min_soc_pct);
        Self::assign_reasons(&mut slots, solution.water_quota_relaxed);
        slots
    }

    /// Within a contiguous run of the same classification, `soc_target_pct`
    /// is fixed to the block's terminal (charge/export) or entry (hold)
    /// projected SoC; discharge blocks always target `min_soc_pct`.
    fn assign_block_targets(slots: &mut [Slot], min_soc_pct: f64) {
        let n = slots.len();
        let mut i = 0;
        while i < n {
            let mut j = i;
            while j + 1 < n && same_block(&slots[j], &slots[j + 1]) {
                j += 1;
            }
            let target = match slots[i].classification {
                Classification::Charge | Classification::Export | Classification::PvCharge => {
                    slots[j].soc_end_pct
                }
                Classification::Hold | Classification::Water => slots[i].soc_start_pct,
                Classification::Discharge => min_soc_pct,
            };
            for slot in &mut slots[i..=j] {
                slot.soc_target_pct = target;
            }
            i = j + 1;
        }
    }

    fn assign_reasons(slots: &mut [Slot], water_quota_relaxed: bool) {
        for slot in slots.iter_mut() {
            slot.reason = match slot.classification {
                Classification::Charge => "kepler:charge".to_string(),
                Classification::Discharge => "kepler:discharge".to_string(),
                Classification::Export => "kepler:export".to_string(),
                Classification::Water if water_quota_relaxed => "kepler:water_quota_relaxed".to_string(),
                Classification::Water => "kepler:water".to_string(),
                Classification::PvCharge => "kepler:pv_charge".to_string(),
                Classification::Hold => "kepler:hold".to_string(),
            };
        }
    }
}

fn same_block(a: &Slot, b: &Slot) -> bool {
    std::mem::discriminant(&a.classification) == std::mem::discriminant(&b.classification)
}

fn soc_to_pct(soc_kwh: f64, capacity_kwh: f64) -> f64 {
    if capacity_kwh <= 0.0 {
        0.0
    } else {
        ((soc_kwh / capacity_kwh * 100.0) * 10.0).round() / 10.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};

    fn slots(n: usize) -> Vec<Slot> {
        let start: DateTime<Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
        (0..n).map(|i| Slot::new_empty(start + Duration::minutes(15 * i as i64))).collect()
    }

    fn flat_solution(n: usize, charge: f64, discharge: f64, export: f64, water: bool) -> KeplerOutput {
        KeplerOutput {
            charge_kwh: vec![charge; n],
            discharge_kwh: vec![discharge; n],
            grid_import_kwh: vec![0.0; n],
            grid_export_kwh: vec![export; n],
            soc_kwh: vec![5.0; n + 1],
            water_on: vec![water; n],
            water_quota_relaxed: false,
        }
    }

    #[test]
    fn contiguous_charge_block_shares_one_target() {
        let raw = slots(4);
        let solution = flat_solution(4, 1.0, 0.0, 0.0, false);
        let assembled = ScheduleAssembler::assemble(raw, &solution, 10.0, 10.0);
        let target = assembled[0].soc_target_pct;
        assert!(assembled.iter().all(|s| s.soc_target_pct == target));
    }

    #[test]
    fn discharge_block_targets_min_soc() {
        let raw = slots(4);
        let solution = flat_solution(4, 0.0, 1.0, 0.0, false);
        let assembled = ScheduleAssembler::assemble(raw, &solution, 10.0, 15.0);
        assert!(assembled.iter().all(|s| s.soc_target_pct == 15.0));
    }
}
