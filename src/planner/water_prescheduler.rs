#![allow(dead_code)]
use chrono::{DateTime, Duration, Timelike, Utc};
use std::collections::HashSet;

use crate::domain::slot::{Slot, SLOT_MINUTES};

#[derive(Debug, Clone, Copy)]
pub struct WaterPreSchedulerInputs {
    pub vacation_mode: bool,
    pub days_since_last_legionella_cycle: f64,
    pub interval_days: f64,
    pub duration_hours: f64,
    pub max_hours_between_heating: f64,
    pub already_heated_today_kwh: f64,
    pub already_heated_threshold_kwh: f64,
}

/// Determines water-heat commitments before MILP runs. Returns the set of
/// slot indices (into the 192-slot frame) that MILP must hard-constrain to
/// `water_heat_on = 1`. An empty set means MILP is free to choose (normal,
/// deferrable-load mode).
pub struct WaterPreScheduler;

impl WaterPreScheduler {
    pub fn commit(inputs: &WaterPreSchedulerInputs, slots: &[Slot], now: DateTime<Utc>) -> HashSet<usize> {
        if !inputs.vacation_mode {
            return HashSet::new();
        }

        if inputs.days_since_last_legionella_cycle < inputs.interval_days {
            return HashSet::new();
        }

        if inputs.already_heated_today_kwh >= inputs.already_heated_threshold_kwh {
            return HashSet::new();
        }

        let slots_needed = ((inputs.duration_hours * 60.0) / SLOT_MINUTES as f64).round() as usize;
        if slots_needed == 0 {
            return HashSet::new();
        }

        let window_end = now + Duration::hours(24);
        // The cycle cannot be deferred past this instant without exceeding
        // the configured maximum gap since the last heating event. If that
        // instant is already behind us the cycle is overdue; fall back to
        // the plain 24h search window instead of filtering everything out.
        let raw_deadline = now - Duration::seconds((inputs.days_since_last_legionella_cycle * 86_400.0) as i64)
            + Duration::seconds((inputs.max_hours_between_heating * 3_600.0) as i64);
        let deadline = if raw_deadline > now { raw_deadline } else { window_end };
        let after_1400 = |t: DateTime<Utc>| t.hour() >= 14;

        let in_search_window = |s: &Slot| s.slot_start >= now && s.slot_start < window_end && s.slot_end <= deadline;

        let preferred: Vec<usize> =
            slots.iter().enumerate().filter(|(_, s)| in_search_window(s) && after_1400(s.slot_start)).map(|(i, _)| i).collect();

        if let Some(window) = cheapest_contiguous_window(&preferred, slots, slots_needed) {
            return window;
        }

        // Can't find a cheap evening slot before the deadline; relax the
        // after-14:00 preference but keep the hard deadline.
        let fallback: Vec<usize> = slots.iter().enumerate().filter(|(_, s)| in_search_window(s)).map(|(i, _)| i).collect();

        cheapest_contiguous_window(&fallback, slots, slots_needed).unwrap_or_default()
    }
}

/// The cheapest contiguous run of `slots_needed` entries within `candidates`,
/// as a set of frame indices. `None` if no contiguous run of that length
/// exists among the candidates.
fn cheapest_contiguous_window(candidates: &[usize], slots: &[Slot], slots_needed: usize) -> Option<HashSet<usize>> {
    if candidates.len() < slots_needed {
        return None;
    }

    let mut best_start = 0usize;
    let mut best_cost = f64::INFINITY;
    for w in 0..=(candidates.len() - slots_needed) {
        let window = &candidates[w..w + slots_needed];
        if !is_contiguous(window) {
            continue;
        }
        let cost: f64 = window.iter().map(|&i| slots[i].import_price).sum();
        if cost < best_cost {
            best_cost = cost;
            best_start = w;
        }
    }

    if best_cost.is_finite() {
        Some(candidates[best_start..best_start + slots_needed].iter().copied().collect())
    } else {
        None
    }
}

fn is_contiguous(indices: &[usize]) -> bool {
    indices.windows(2).all(|w| w[1] == w[0] + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::slot::Slot;

    fn make_frame(start: DateTime<Utc>, n: usize) -> Vec<Slot> {
        let mut slots = Vec::new();
        let mut t = start;
        for i in 0..n {
            let mut s = Slot::new_empty(t);
            // Cheap between 18:00 and 22:00.
            s.import_price = if (18..22).contains(&t.hour()) { 0.3 } else { 1.5 };
            let _ = i;
            slots.push(s);
            t += Duration::minutes(SLOT_MINUTES);
        }
        slots
    }

    #[test]
    fn no_commitment_when_not_in_vacation_mode() {
        let now: DateTime<Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
        let slots = make_frame(now, 192);
        let inputs = WaterPreSchedulerInputs {
            vacation_mode: false,
            days_since_last_legionella_cycle: 10.0,
            interval_days: 7.0,
            duration_hours: 3.0,
            max_hours_between_heating: 48.0,
            already_heated_today_kwh: 0.0,
            already_heated_threshold_kwh: 5.0,
        };
        assert!(WaterPreScheduler::commit(&inputs, &slots, now).is_empty());
    }

    #[test]
    fn commits_twelve_slots_in_cheapest_evening_window() {
        let now: DateTime<Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
        let slots = make_frame(now, 192);
        let inputs = WaterPreSchedulerInputs {
            vacation_mode: true,
            days_since_last_legionella_cycle: 8.0,
            interval_days: 7.0,
            duration_hours: 3.0,
            max_hours_between_heating: 48.0,
            already_heated_today_kwh: 0.0,
            already_heated_threshold_kwh: 5.0,
        };
        let committed = WaterPreScheduler::commit(&inputs, &slots, now);
        assert_eq!(committed.len(), 12);
        for &idx in &committed {
            assert!(slots[idx].slot_start.hour() >= 14);
        }
    }

    #[test]
    fn suppressed_when_already_heated_today() {
        let now: DateTime<Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
        let slots = make_frame(now, 192);
        let inputs = WaterPreSchedulerInputs {
            vacation_mode: true,
            days_since_last_legionella_cycle: 8.0,
            interval_days: 7.0,
            duration_hours: 3.0,
            max_hours_between_heating: 48.0,
            already_heated_today_kwh: 10.0,
            already_heated_threshold_kwh: 5.0,
        };
        assert!(WaterPreScheduler::commit(&inputs, &slots, now).is_empty());
    }

    #[test]
    fn tight_max_hours_between_heating_overrides_the_cheapest_evening_window() {
        let now: DateTime<Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
        let slots = make_frame(now, 192);
        let inputs = WaterPreSchedulerInputs {
            vacation_mode: true,
            days_since_last_legionella_cycle: 1.0,
            interval_days: 1.0,
            duration_hours: 3.0,
            max_hours_between_heating: 30.0,
            already_heated_today_kwh: 0.0,
            already_heated_threshold_kwh: 5.0,
        };
        let committed = WaterPreScheduler::commit(&inputs, &slots, now);
        assert_eq!(committed.len(), 12);
        // Deadline is now + 6h, well before the cheap 18:00-22:00 window, so
        // the commitment must land earlier even though it's more expensive.
        for &idx in &committed {
            assert!(slots[idx].slot_start.hour() < 6);
        }
    }
}
