#![allow(dead_code)]
//! Kepler: the core MILP optimizer.
//!
//! Builds one mixed-integer program over the full 192-slot / 48-hour horizon
//! and solves it in a single pass, replacing the legacy "7-pass heuristic" and
//! the hourly-resolution `MilpOptimizer` this module is grounded on. Binary
//! water-heater variables and the protective-SoC export gate are why this
//! needs a true MILP solver rather than a continuous relaxation.

use std::collections::HashSet;
use thiserror::Error;

use crate::domain::slot::{Classification, Slot, SLOT_MINUTES};
use crate::planner::policy::PolicyVector;

#[cfg(feature = "optimization")]
use good_lp::{constraint, variable, Expression, ProblemVariables, Solution, SolverModel};

#[derive(Debug, Error)]
pub enum KeplerError {
    #[error("MILP proved infeasible even after relaxing the water quota")]
    Infeasible,
    #[error("solver did not return within the wall-time budget")]
    PlannerTimeout,
    #[error("optimization feature not compiled in")]
    FeatureDisabled,
}

#[derive(Debug, Clone)]
pub struct BatteryParams {
    pub capacity_kwh: f64,
    pub min_soc_pct: f64,
    pub max_soc_pct: f64,
    pub max_charge_kw: f64,
    pub max_discharge_kw: f64,
    pub efficiency: f64,
}

impl BatteryParams {
    pub fn min_soc_kwh(&self) -> f64 {
        self.capacity_kwh * self.min_soc_pct / 100.0
    }
    pub fn max_soc_kwh(&self) -> f64 {
        self.capacity_kwh * self.max_soc_pct / 100.0
    }
}

#[derive(Debug, Clone)]
pub struct WaterParams {
    pub power_kw: f64,
    pub min_kwh_per_day: f64,
    pub max_hours_between_heating: f64,
    pub already_heated_today_kwh: f64,
}

#[derive(Debug, Clone)]
pub struct KeplerConfig {
    pub delta_t_hours: f64,
    pub battery: BatteryParams,
    pub water: WaterParams,
    pub grid_max_export_kwh_per_slot: f64,
    pub time_limit_seconds: u64,
    /// Tiny coefficient used only to break ties between otherwise-equal-cost
    /// solutions in favor of least total cycling, since good_lp has no
    /// native lexicographic multi-objective mode.
    pub tie_break_epsilon: f64,
}

impl Default for KeplerConfig {
    fn default() -> Self {
        Self {
            delta_t_hours: 0.25,
            battery: BatteryParams {
                capacity_kwh: 10.0,
                min_soc_pct: 10.0,
                max_soc_pct: 95.0,
                max_charge_kw: 5.0,
                max_discharge_kw: 5.0,
                efficiency: 0.95,
            },
            water: WaterParams {
                power_kw: 3.0,
                min_kwh_per_day: 2.0,
                max_hours_between_heating: 24.0,
                already_heated_today_kwh: 0.0,
            },
            grid_max_export_kwh_per_slot: 2.5,
            time_limit_seconds: 30,
            tie_break_epsilon: 1e-6,
        }
    }
}

#[derive(Debug, Clone)]
pub struct KeplerOutput {
    pub charge_kwh: Vec<f64>,
    pub discharge_kwh: Vec<f64>,
    pub grid_import_kwh: Vec<f64>,
    pub grid_export_kwh: Vec<f64>,
    /// SoC in kWh, length T+1 (soc_kwh[0] is the starting SoC).
    pub soc_kwh: Vec<f64>,
    pub water_on: Vec<bool>,
    pub water_quota_relaxed: bool,
}

pub struct Kepler {
    pub config: KeplerConfig,
}

impl Kepler {
    pub fn new(config: KeplerConfig) -> Self {
        Self { config }
    }

    pub fn solve(
        &self,
        slots: &[Slot],
        soc_now_kwh: f64,
        policy: &PolicyVector,
        committed_water_slots: &HashSet<usize>,
    ) -> Result<KeplerOutput, KeplerError> {
        self.solve_inner(slots, soc_now_kwh, policy, committed_water_slots, false)
            .or_else(|e| {
                if matches!(e, KeplerError::Infeasible) {
                    tracing::warn!("Kepler infeasible under hard water quota, retrying with quota relaxed");
                    self.solve_inner(slots, soc_now_kwh, policy, committed_water_slots, true)
                } else {
                    Err(e)
                }
            })
    }

    #[cfg(feature = "optimization")]
    fn solve_inner(
        &self,
        slots: &[Slot],
        soc_now_kwh: f64,
        policy: &PolicyVector,
        committed_water_slots: &HashSet<usize>,
        relax_water_quota: bool,
    ) -> Result<KeplerOutput, KeplerError> {
        let t_len = slots.len();
        let dt = self.config.delta_t_hours;
        let bat = &self.config.battery;
        let water = &self.config.water;

        let mut problem = ProblemVariables::new();
        let c = problem.add_vector(variable().min(0.0).max(bat.max_charge_kw * dt), t_len);
        let d = problem.add_vector(variable().min(0.0).max(bat.max_discharge_kw * dt), t_len);
        let gi = problem.add_vector(variable().min(0.0), t_len);
        let ge = problem.add_vector(variable().min(0.0), t_len);
        let soc = problem.add_vector(
            variable().min(bat.min_soc_kwh()).max(bat.max_soc_kwh()),
            t_len + 1,
        );
        let w: Vec<_> = (0..t_len).map(|_| problem.add(variable().binary())).collect();
        let z: Vec<_> = (0..t_len).map(|_| problem.add(variable().binary())).collect();
        let r = problem.add_vector(variable().min(0.0), t_len);
        let u = problem.add(variable().min(0.0));
        let water_slack = problem.add(variable().min(0.0));

        let soc_target_end_kwh = bat.capacity_kwh * policy.target_soc_end_pct / 100.0;

        // Forward-rolling average import price, used for the export-spread gate.
        let predicted_future_import_price = |from: usize| -> f64 {
            let window = &slots[from..t_len.min(from + 16)];
            if window.is_empty() {
                0.0
            } else {
                window.iter().map(|s| s.import_price).sum::<f64>() / window.len() as f64
            }
        };

        let energy_cost = (0..t_len)
            .map(|t| slots[t].import_price * gi[t] - slots[t].export_price * ge[t])
            .sum::<Expression>();
        let wear_cost = (0..t_len)
            .map(|t| policy.wear_cost_per_kwh * (c[t] + d[t]))
            .sum::<Expression>();
        let ramping_cost = (0..t_len).map(|t| policy.ramping_cost * r[t]).sum::<Expression>();
        let tie_break = (0..t_len).map(|t| self.config.tie_break_epsilon * c[t]).sum::<Expression>();
        let terminal_penalty: Expression = policy.soft_floor_penalty * u;

        let objective = energy_cost + wear_cost + ramping_cost + tie_break + terminal_penalty;
        let mut model = problem.minimise(objective).using(good_lp::default_solver);

        model = model.with(constraint!(soc[0] == soc_now_kwh));

        for t in 0..t_len {
            let s = &slots[t];
            let water_energy = water.power_kw * dt;

            // 1. Energy balance.
            model = model.with(constraint!(
                s.load_kwh + c[t] + ge[t] + w[t] * water_energy == s.pv_kwh + d[t] + gi[t]
            ));

            // 2. Battery dynamics.
            model = model.with(constraint!(
                soc[t + 1] == soc[t] + bat.efficiency * c[t] - d[t] / bat.efficiency
            ));

            // 4. Mutual exclusion (charge vs discharge in the same slot).
            let max_rate_energy = bat.max_charge_kw.max(bat.max_discharge_kw) * dt;
            model = model.with(constraint!(c[t] + d[t] <= max_rate_energy));

            // 5. Export gating: protective floor (big-M via binary z[t]) plus
            // a per-slot cap. The price-spread gate is static data, so it is
            // folded directly into the cap rather than needing its own binary.
            let spread_ok =
                s.export_price - predicted_future_import_price(t) > policy.export_min_spread;
            if spread_ok {
                model = model.with(constraint!(
                    soc[t] - policy.protective_soc_kwh >= -bat.capacity_kwh * (1.0 - z[t])
                ));
                model = model.with(constraint!(
                    ge[t] <= self.config.grid_max_export_kwh_per_slot * z[t]
                ));
            } else {
                model = model.with(constraint!(ge[t] <= 0.0));
            }

            // Ramping aux.
            if t == 0 {
                model = model.with(constraint!(r[t] >= c[t]));
            } else {
                model = model.with(constraint!(r[t] >= c[t] - c[t - 1]));
                model = model.with(constraint!(r[t] >= c[t - 1] - c[t]));
            }

            // Committed water-heater slots (anti-legionella cycles) are hard.
            if committed_water_slots.contains(&t) {
                model = model.with(constraint!(w[t] == 1.0));
            }
        }

        // 6. Water quota over the first 24h (96 slots) of the horizon.
        let day_slots = t_len.min(96);
        let quota_lhs = (0..day_slots)
            .map(|t| water.power_kw * dt * w[t])
            .sum::<Expression>();
        let quota_rhs = water.min_kwh_per_day - water.already_heated_today_kwh;
        if relax_water_quota {
            model = model.with(constraint!(quota_lhs + water_slack >= quota_rhs));
        } else {
            model = model.with(constraint!(quota_lhs >= quota_rhs));
            model = model.with(constraint!(water_slack == 0.0));
        }

        // No off-gap longer than max_hours_between_heating within the first day.
        let gap_slots = ((water.max_hours_between_heating * 60.0) / SLOT_MINUTES as f64).round() as usize;
        if gap_slots > 0 && gap_slots < day_slots {
            for start in 0..=(day_slots - gap_slots) {
                let window_sum =
                    (start..start + gap_slots).map(|t| w[t]).sum::<Expression>();
                model = model.with(constraint!(window_sum >= 1.0));
            }
        }

        // 7. Soft terminal-SoC constraint.
        model = model.with(constraint!(soc[t_len] + u >= soc_target_end_kwh));

        let solution = model.solve().map_err(|_| KeplerError::Infeasible)?;

        let relaxed_used = relax_water_quota && solution.value(water_slack) > 1e-6;

        Ok(KeplerOutput {
            charge_kwh: (0..t_len).map(|t| round3(solution.value(c[t]))).collect(),
            discharge_kwh: (0..t_len).map(|t| round3(solution.value(d[t]))).collect(),
            grid_import_kwh: (0..t_len).map(|t| round3(solution.value(gi[t]))).collect(),
            grid_export_kwh: (0..t_len).map(|t| round3(solution.value(ge[t]))).collect(),
            soc_kwh: (0..=t_len).map(|t| solution.value(soc[t])).collect(),
            water_on: (0..t_len).map(|t| solution.value(w[t]) > 0.5).collect(),
            water_quota_relaxed: relaxed_used,
        })
    }

    #[cfg(not(feature = "optimization"))]
    fn solve_inner(
        &self,
        _slots: &[Slot],
        _soc_now_kwh: f64,
        _policy: &PolicyVector,
        _committed_water_slots: &HashSet<usize>,
        _relax_water_quota: bool,
    ) -> Result<KeplerOutput, KeplerError> {
        Err(KeplerError::FeatureDisabled)
    }
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

/// Derives a `Classification` from the dominant nonzero primary variable in a
/// slot, priority Export > Charge > Water > Discharge > Hold.
pub fn classify(charge_kwh: f64, discharge_kwh: f64, export_kwh: f64, water_on: bool) -> Classification {
    const EPS: f64 = 1e-4;
    if export_kwh > EPS {
        Classification::Export
    } else if charge_kwh > EPS {
        Classification::Charge
    } else if water_on {
        Classification::Water
    } else if discharge_kwh > EPS {
        Classification::Discharge
    } else {
        Classification::Hold
    }
}

#[cfg(all(test, feature = "optimization"))]
mod tests {
    use super::*;
    use crate::domain::slot::Slot;
    use chrono::{DateTime, Duration, Utc};

    fn frame(prices: &[f64], loads: &[f64]) -> Vec<Slot> {
        let start: DateTime<Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
        prices
            .iter()
            .zip(loads.iter())
            .enumerate()
            .map(|(i, (&price, &load))| {
                let mut s = Slot::new_empty(start + Duration::minutes(15 * i as i64));
                s.import_price = price;
                s.export_price = price * 0.3;
                s.load_kwh = load;
                s.pv_kwh = 0.0;
                s
            })
            .collect()
    }

    fn policy() -> PolicyVector {
        PolicyVector {
            target_soc_end_pct: 50.0,
            s_index_factor: 1.0,
            wear_cost_per_kwh: 0.05,
            ramping_cost: 0.01,
            export_min_spread: 1.0,
            protective_soc_kwh: 3.0,
            soft_floor_penalty: 8.0,
        }
    }

    #[test]
    fn charges_during_cheap_overnight_window() {
        let mut prices = vec![0.2; 8];
        prices.extend(vec![2.0; 16]);
        let loads = vec![0.25; 24];
        let slots = frame(&prices, &loads);

        let config = KeplerConfig {
            battery: BatteryParams {
                capacity_kwh: 10.0,
                min_soc_pct: 10.0,
                max_soc_pct: 95.0,
                max_charge_kw: 5.0,
                max_discharge_kw: 5.0,
                efficiency: 0.95,
            },
            water: WaterParams {
                power_kw: 0.0,
                min_kwh_per_day: 0.0,
                max_hours_between_heating: 24.0,
                already_heated_today_kwh: 0.0,
            },
            ..KeplerConfig::default()
        };
        let kepler = Kepler::new(config);
        let mut pol = policy();
        pol.target_soc_end_pct = 10.0;

        let out = kepler.solve(&slots, 2.0, &pol, &HashSet::new()).unwrap();
        let soc_pct_after_slot7 = out.soc_kwh[8] / 10.0 * 100.0;
        assert!(soc_pct_after_slot7 >= 80.0 - 0.5, "soc after slot 7 = {soc_pct_after_slot7}");
        assert!(out.grid_export_kwh.iter().all(|&e| e <= 1e-6));
    }

    #[test]
    fn exports_only_during_the_peak_price_window() {
        let start: DateTime<Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
        let mut import_prices = vec![1.5; 4];
        import_prices.extend(vec![4.0; 4]);
        import_prices.extend(vec![0.5; 16]);

        let slots: Vec<Slot> = import_prices
            .iter()
            .enumerate()
            .map(|(i, &price)| {
                let mut s = Slot::new_empty(start + Duration::minutes(15 * i as i64));
                s.import_price = price;
                s.export_price = price;
                s.load_kwh = 0.25;
                s.pv_kwh = 0.0;
                s
            })
            .collect();

        let config = KeplerConfig {
            battery: BatteryParams {
                capacity_kwh: 10.0,
                min_soc_pct: 10.0,
                max_soc_pct: 95.0,
                max_charge_kw: 5.0,
                max_discharge_kw: 5.0,
                efficiency: 0.95,
            },
            water: WaterParams {
                power_kw: 0.0,
                min_kwh_per_day: 0.0,
                max_hours_between_heating: 24.0,
                already_heated_today_kwh: 0.0,
            },
            ..KeplerConfig::default()
        };
        let kepler = Kepler::new(config);
        let mut pol = policy();
        pol.export_min_spread = 1.0;

        let soc_now_kwh = 9.0; // soc_now_pct = 90
        let out = kepler.solve(&slots, soc_now_kwh, &pol, &HashSet::new()).unwrap();

        for (t, &export) in out.grid_export_kwh.iter().enumerate() {
            if (4..8).contains(&t) {
                continue;
            }
            assert!(export <= 1e-6, "slot {t} exported {export} outside the peak window");
        }
        assert!(out.grid_export_kwh[4..8].iter().any(|&e| e > 1e-6), "expected some export during the peak window");

        let last_export_slot = (4..8)
            .rev()
            .find(|&t| out.grid_export_kwh[t] > 1e-6)
            .expect("at least one export slot");
        assert!(
            out.soc_kwh[last_export_slot + 1] >= pol.protective_soc_kwh - 1e-6,
            "soc after last export slot dropped below the protective floor"
        );
    }
}
