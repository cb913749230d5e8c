#![cfg(feature = "optimization")]
//! Black-box tests for the full Preparer -> SIndex -> TargetSoC ->
//! WaterPreScheduler -> Kepler -> ScheduleAssembler pipeline, driven through
//! `planner::plan()` the same way the controller runtime calls it. Component
//! tests elsewhere in the crate cover each stage in isolation; these assert
//! the literal, documented end-to-end behavior.

use chrono::{DateTime, Duration, Utc};

use kepler_energy_planner::domain::slot::{Classification, HORIZON_SLOTS};
use kepler_energy_planner::optimizer::strategies::kepler::{BatteryParams, KeplerConfig, WaterParams};
use kepler_energy_planner::planner::preparer::{LocationConfig, RawSlotInput};
use kepler_energy_planner::planner::s_index::{SIndexInputs, SIndexMode};
use kepler_energy_planner::planner::water_prescheduler::WaterPreSchedulerInputs;
use kepler_energy_planner::planner::{plan, EconomicsPolicy, PlanningRunInputs, TargetSocInputsPartial};

fn start() -> DateTime<Utc> {
    "2026-01-01T00:00:00Z".parse().unwrap()
}

fn frame(n: usize, price_at: impl Fn(usize) -> f64, load_at: impl Fn(usize) -> f64) -> Vec<RawSlotInput> {
    let t0 = start();
    (0..n)
        .map(|i| RawSlotInput {
            slot_start: t0 + Duration::minutes(15 * i as i64),
            load_kwh: load_at(i),
            pv_kwh: 0.0,
            load_p10: None,
            load_p50: None,
            load_p90: None,
            pv_p10: None,
            pv_p50: None,
            pv_p90: None,
            import_price: price_at(i),
            export_price: price_at(i) * 0.3,
        })
        .collect()
}

fn no_weather_s_index() -> SIndexInputs {
    SIndexInputs {
        mode: SIndexMode::Dynamic,
        base_factor: 1.0,
        max_factor: 1.3,
        pv_deficit_weight: 0.1,
        temp_weight: 0.05,
        temp_baseline_c: 10.0,
        temp_cold_c: -10.0,
        risk_appetite: 3,
        expected_pv_kwh: 10.0,
        forecast_pv_kwh: 10.0,
        forecast_mean_temp_c: 10.0,
        weather_volatility_norm: 0.0,
        load_quantiles: None,
    }
}

fn no_water_inputs() -> WaterPreSchedulerInputs {
    WaterPreSchedulerInputs {
        vacation_mode: false,
        days_since_last_legionella_cycle: 0.0,
        interval_days: 7.0,
        duration_hours: 3.0,
        max_hours_between_heating: 24.0,
        already_heated_today_kwh: 0.0,
        already_heated_threshold_kwh: 5.0,
    }
}

fn economics() -> EconomicsPolicy {
    EconomicsPolicy { wear_cost_per_kwh: 0.05, ramping_cost: 0.01, export_min_spread: 1.0, protective_soc_kwh: 3.0 }
}

fn location() -> LocationConfig {
    LocationConfig { latitude_deg: 59.3, longitude_deg: 18.0, timezone_offset_hours: 1 }
}

#[test]
fn s1_cheap_overnight_charge() {
    // Cheap for the first 2h (8 slots), expensive for the rest of the horizon.
    let raw = frame(
        HORIZON_SLOTS,
        |i| if i < 8 { 0.2 } else { 2.0 },
        |_| 0.25,
    );

    let inputs = PlanningRunInputs {
        raw_frame: raw,
        soc_now_kwh: 2.0, // 20% of 10 kWh
        context: Default::default(),
        s_index: no_weather_s_index(),
        target_soc: TargetSocInputsPartial { min_soc_pct: 10.0, max_soc_pct: 95.0 },
        water: no_water_inputs(),
        kepler: KeplerConfig {
            battery: BatteryParams {
                capacity_kwh: 10.0,
                min_soc_pct: 10.0,
                max_soc_pct: 95.0,
                max_charge_kw: 5.0,
                max_discharge_kw: 5.0,
                efficiency: 0.95,
            },
            water: WaterParams { power_kw: 0.0, min_kwh_per_day: 0.0, max_hours_between_heating: 24.0, already_heated_today_kwh: 0.0 },
            ..KeplerConfig::default()
        },
        risk_appetite: 5, // low target, so MILP prefers charging up front over the terminal soft constraint
    };

    let output = plan(&inputs, economics(), location(), 0.9, start()).unwrap();

    let soc_pct_after_slot7 = output.slots[7].soc_end_pct;
    assert!(soc_pct_after_slot7 >= 80.0 - 0.5, "soc after slot 7 = {soc_pct_after_slot7}");
    assert!(output.slots.iter().all(|s| s.grid_export_kwh <= 1e-6));
    for slot in &output.slots[0..8] {
        if slot.charge_kwh > 1e-6 {
            assert_eq!(slot.classification, Classification::Charge);
        }
    }
}

#[test]
fn s2_peak_only_export() {
    let raw = frame(
        HORIZON_SLOTS,
        |i| {
            if i < 4 {
                1.5
            } else if i < 8 {
                4.0
            } else {
                0.5
            }
        },
        |_| 0.25,
    );

    let inputs = PlanningRunInputs {
        raw_frame: raw,
        soc_now_kwh: 9.0, // 90%
        context: Default::default(),
        s_index: no_weather_s_index(),
        target_soc: TargetSocInputsPartial { min_soc_pct: 10.0, max_soc_pct: 95.0 },
        water: no_water_inputs(),
        kepler: KeplerConfig {
            battery: BatteryParams {
                capacity_kwh: 10.0,
                min_soc_pct: 10.0,
                max_soc_pct: 95.0,
                max_charge_kw: 5.0,
                max_discharge_kw: 5.0,
                efficiency: 0.95,
            },
            water: WaterParams { power_kw: 0.0, min_kwh_per_day: 0.0, max_hours_between_heating: 24.0, already_heated_today_kwh: 0.0 },
            ..KeplerConfig::default()
        },
        risk_appetite: 3,
    };

    let output = plan(&inputs, economics(), location(), 0.9, start()).unwrap();

    for (t, slot) in output.slots.iter().enumerate() {
        if (4..8).contains(&t) {
            continue;
        }
        assert!(slot.grid_export_kwh <= 1e-6, "slot {t} exported {} outside the peak window", slot.grid_export_kwh);
    }
    assert!(output.slots[4..8].iter().any(|s| s.grid_export_kwh > 1e-6), "expected some export during the peak window");
    let last_export = (4..8).rev().find(|&t| output.slots[t].grid_export_kwh > 1e-6).expect("at least one export slot");
    assert!(output.slots[last_export].soc_end_pct >= 30.0 - 0.5); // 3 kWh protective floor / 10 kWh capacity
}

#[test]
fn s3_vacation_anti_legionella() {
    // Cheap from 18:00-22:00, expensive otherwise -- matches the 24h window
    // the scheduler searches within.
    let raw = frame(HORIZON_SLOTS, |i| if (72..88).contains(&i) { 0.3 } else { 1.5 }, |_| 0.25);

    let inputs = PlanningRunInputs {
        raw_frame: raw,
        soc_now_kwh: 5.0,
        context: Default::default(),
        s_index: no_weather_s_index(),
        target_soc: TargetSocInputsPartial { min_soc_pct: 10.0, max_soc_pct: 95.0 },
        water: WaterPreSchedulerInputs {
            vacation_mode: true,
            days_since_last_legionella_cycle: 8.0,
            interval_days: 7.0,
            duration_hours: 3.0,
            max_hours_between_heating: 48.0,
            already_heated_today_kwh: 0.0,
            already_heated_threshold_kwh: 5.0,
        },
        kepler: KeplerConfig {
            battery: BatteryParams {
                capacity_kwh: 10.0,
                min_soc_pct: 10.0,
                max_soc_pct: 95.0,
                max_charge_kw: 5.0,
                max_discharge_kw: 5.0,
                efficiency: 0.95,
            },
            water: WaterParams { power_kw: 3.0, min_kwh_per_day: 0.0, max_hours_between_heating: 48.0, already_heated_today_kwh: 0.0 },
            ..KeplerConfig::default()
        },
        risk_appetite: 3,
    };

    let output = plan(&inputs, economics(), location(), 0.9, start()).unwrap();

    let water_on: Vec<usize> = output.slots.iter().enumerate().filter(|(_, s)| s.water_heat_on).map(|(i, _)| i).collect();
    assert_eq!(water_on.len(), 12);
    assert!(water_on.windows(2).all(|w| w[1] == w[0] + 1), "legionella cycle must be contiguous");
    for &idx in &water_on {
        assert!(idx >= 56, "cycle must start after 14:00 (slot 56)");
    }
}

#[test]
fn s5_risk_appetite_monotonicity() {
    let raw = frame(HORIZON_SLOTS, |_| 1.0, |_| 0.25);

    let mut previous_target = f64::INFINITY;
    for risk_appetite in 1..=5u8 {
        let inputs = PlanningRunInputs {
            raw_frame: raw.clone(),
            soc_now_kwh: 5.0,
            context: Default::default(),
            s_index: no_weather_s_index(),
            target_soc: TargetSocInputsPartial { min_soc_pct: 10.0, max_soc_pct: 95.0 },
            water: no_water_inputs(),
            kepler: KeplerConfig {
                battery: BatteryParams {
                    capacity_kwh: 10.0,
                    min_soc_pct: 10.0,
                    max_soc_pct: 95.0,
                    max_charge_kw: 5.0,
                    max_discharge_kw: 5.0,
                    efficiency: 0.95,
                },
                water: WaterParams { power_kw: 0.0, min_kwh_per_day: 0.0, max_hours_between_heating: 24.0, already_heated_today_kwh: 0.0 },
                ..KeplerConfig::default()
            },
            risk_appetite,
        };

        let output = plan(&inputs, economics(), location(), 0.9, start()).unwrap();
        assert!(
            output.policy.target_soc_end_pct < previous_target,
            "risk_appetite={risk_appetite} target={} did not decrease from {previous_target}",
            output.policy.target_soc_end_pct
        );
        previous_target = output.policy.target_soc_end_pct;
    }
}
