#![allow(dead_code)]
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use rand::Rng;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::domain::context::ContextGates;
use crate::domain::slot::{Slot, HORIZON_SLOTS};
use crate::executor::{
    ControlEntities, EntityStateTracker, Executor, LiveState, OverrideThresholds, SimulatedControlEntities,
};
use crate::planner::preparer::{LocationConfig, RawSlotInput};
use crate::planner::{plan, EconomicsPolicy, PlanningRunInputs, TargetSocInputsPartial};
use crate::planner::s_index::SIndexInputs;
use crate::planner::water_prescheduler::WaterPreSchedulerInputs;
use crate::repo::slots::{InMemorySlotStore, SlotStore};

/// Ties the planner pipeline, the SlotStore, and the 5-minute Executor
/// together into the three long-lived tasks from the concurrency model: one
/// Planner task (periodic, jittered), one Executor task (every 5 min), one
/// Recorder task (every 15 min, slot-aligned).
pub struct PlannerRuntime<C: ControlEntities> {
    pub store: Arc<dyn SlotStore>,
    pub executor: Arc<Executor<C>>,
    cfg: AppConfig,
}

impl PlannerRuntime<SimulatedControlEntities> {
    pub fn new_simulated(cfg: AppConfig) -> Self {
        let thresholds = OverrideThresholds {
            min_soc_pct: cfg.battery.min_soc_percent,
            max_soc_pct: cfg.battery.max_soc_percent,
            low_soc_buffer_pct: cfg.automation.low_soc_buffer_pct,
            pv_dump_threshold_kw: cfg.automation.pv_dump_threshold_kw,
            max_soc_epsilon_pct: cfg.automation.max_soc_epsilon_pct,
            stale_slot_seconds: cfg.automation.stale_slot_seconds,
        };
        Self {
            store: Arc::new(InMemorySlotStore::new()),
            executor: Arc::new(Executor::new(SimulatedControlEntities::default(), thresholds)),
            cfg,
        }
    }
}

impl<C: ControlEntities + 'static> PlannerRuntime<C> {
    /// Builds the 192-slot raw frame and runs the full planning pipeline,
    /// then upserts the result into the SlotStore. Called once at startup
    /// and then on the periodic Planner task cadence.
    pub async fn run_planner(&self, raw_frame: Vec<RawSlotInput>, soc_now_kwh: f64) -> Result<()> {
        let inputs = PlanningRunInputs {
            raw_frame,
            soc_now_kwh,
            context: ContextGates::default(),
            s_index: SIndexInputs {
                mode: crate::planner::s_index::SIndexMode::Dynamic,
                base_factor: self.cfg.s_index.base_factor,
                max_factor: self.cfg.s_index.max_factor,
                pv_deficit_weight: self.cfg.s_index.pv_deficit_weight,
                temp_weight: self.cfg.s_index.temp_weight,
                temp_baseline_c: self.cfg.s_index.temp_baseline_c,
                temp_cold_c: self.cfg.s_index.temp_cold_c,
                risk_appetite: self.cfg.s_index.risk_appetite,
                expected_pv_kwh: 0.0,
                forecast_pv_kwh: 0.0,
                forecast_mean_temp_c: self.cfg.s_index.temp_baseline_c,
                weather_volatility_norm: 0.0,
                load_quantiles: None,
            },
            target_soc: TargetSocInputsPartial {
                min_soc_pct: self.cfg.battery.min_soc_percent,
                max_soc_pct: self.cfg.battery.max_soc_percent,
            },
            water: WaterPreSchedulerInputs {
                vacation_mode: false,
                days_since_last_legionella_cycle: 0.0,
                interval_days: self.cfg.water_heating.vacation.legionella_interval_days as f64,
                duration_hours: self.cfg.water_heating.vacation.duration_hours,
                max_hours_between_heating: 24.0,
                already_heated_today_kwh: 0.0,
                already_heated_threshold_kwh: self.cfg.water_heating.daily_quota_minutes / 60.0
                    * self.cfg.water_heating.power_kw,
            },
            kepler: crate::optimizer::strategies::kepler::KeplerConfig {
                battery: crate::optimizer::strategies::kepler::BatteryParams {
                    capacity_kwh: self.cfg.battery.capacity_kwh,
                    max_charge_kw: self.cfg.battery.max_charge_kw,
                    max_discharge_kw: self.cfg.battery.max_discharge_kw,
                    efficiency: self.cfg.battery.efficiency,
                    min_soc_pct: self.cfg.battery.min_soc_percent,
                    max_soc_pct: self.cfg.battery.max_soc_percent,
                },
                water: crate::optimizer::strategies::kepler::WaterParams {
                    power_kw: self.cfg.water_heating.power_kw,
                    min_kwh_per_day: self.cfg.water_heating.daily_quota_minutes / 60.0
                        * self.cfg.water_heating.power_kw,
                    max_hours_between_heating: 24.0,
                    already_heated_today_kwh: 0.0,
                },
                time_limit_seconds: self.cfg.executor.solver_wall_time_secs,
                ..Default::default()
            },
            risk_appetite: self.cfg.s_index.risk_appetite,
        };

        let economics = EconomicsPolicy {
            wear_cost_per_kwh: self.cfg.battery_economics.wear_cost_per_kwh,
            ramping_cost: self.cfg.battery_economics.ramping_cost,
            export_min_spread: self.cfg.battery_economics.export_min_spread,
            protective_soc_kwh: self.cfg.battery_economics.protective_soc_kwh,
        };

        let location = LocationConfig {
            latitude_deg: self.cfg.forecast.weather.as_ref().map(|w| w.latitude).unwrap_or(0.0),
            longitude_deg: self.cfg.forecast.weather.as_ref().map(|w| w.longitude).unwrap_or(0.0),
            timezone_offset_hours: 0,
        };

        let output = plan(&inputs, economics, location, 0.9, Utc::now()).context("planning run failed")?;
        if output.water_quota_relaxed {
            warn!("water heating daily quota relaxed to satisfy anti-legionella commitments");
        }
        self.store.upsert_plan(output.slots, Utc::now()).await.context("failed to persist plan")?;
        Ok(())
    }

    /// The periodic Planner task: re-run every `planner_interval_minutes`,
    /// with configurable jitter so multiple deployments don't all solve at
    /// the same wall-clock second.
    pub async fn planner_loop(self: Arc<Self>, raw_frame_source: impl Fn() -> Vec<RawSlotInput> + Send + 'static) {
        let interval_secs = self.cfg.executor.planner_interval_minutes * 60;
        let jitter_secs = self.cfg.executor.planner_jitter_seconds;
        loop {
            let jitter = if jitter_secs > 0 {
                rand::thread_rng().gen_range(0..jitter_secs)
            } else {
                0
            };
            tokio::time::sleep(std::time::Duration::from_secs(interval_secs + jitter)).await;

            let raw_frame = raw_frame_source();
            let soc_now_kwh = self.cfg.battery.capacity_kwh * self.cfg.battery.initial_soc_percent / 100.0;
            if let Err(e) = self.run_planner(raw_frame, soc_now_kwh).await {
                error!(error = %e, "planner run failed, keeping previous plan");
            }
        }
    }

    /// The periodic Executor task: every 5 minutes, read the current slot
    /// and drive one tick.
    pub async fn executor_loop(self: Arc<Self>) {
        let mut tracker = EntityStateTracker::default();
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(self.cfg.executor.tick_interval_secs));
        loop {
            interval.tick().await;
            let now = Utc::now();
            let current = self.store.get_current_slot(now).await.ok().flatten();
            let live = LiveState {
                soc_now_pct: self.cfg.battery.initial_soc_percent,
                pv_now_kw: 0.0,
                water_heater_idle: true,
                slot_age_seconds: current.as_ref().map(|s| (now - s.slot_start).num_seconds()).unwrap_or(i64::MAX),
            };
            let context = ContextGates::default();
            match self.executor.tick(now, current.as_ref(), &context, &live, &mut tracker).await {
                Ok(record) => info!(reason = %record.reason, "executor tick applied"),
                Err(e) => warn!(error = %e, "executor tick skipped"),
            }
        }
    }

    /// The periodic Recorder task: every 15 minutes, aligned to the slot
    /// boundary, writes observed values back into the current slot.
    pub async fn recorder_loop(self: Arc<Self>, sample: impl Fn() -> ObservedSample + Send + 'static) {
        loop {
            let now = Utc::now();
            let next_boundary_secs = 900 - (now.timestamp() % 900);
            tokio::time::sleep(std::time::Duration::from_secs(next_boundary_secs as u64)).await;

            let now = Utc::now();
            if let Ok(Some(mut slot)) = self.store.get_current_slot(now).await {
                let observed = sample();
                apply_observation(&mut slot, observed);
                if let Err(e) = self.store.record_observation(slot.slot_start, slot).await {
                    warn!(error = %e, "failed to record observation");
                }
            }
        }
    }
}

pub struct ObservedSample {
    pub load_kwh: f64,
    pub pv_kwh: f64,
    pub charge_kwh: f64,
    pub discharge_kwh: f64,
    pub grid_import_kwh: f64,
    pub grid_export_kwh: f64,
    pub soc_pct: f64,
}

fn apply_observation(slot: &mut Slot, sample: ObservedSample) {
    slot.actual_load_kwh = Some(sample.load_kwh);
    slot.actual_pv_kwh = Some(sample.pv_kwh);
    slot.actual_charge_kwh = Some(sample.charge_kwh);
    slot.actual_discharge_kwh = Some(sample.discharge_kwh);
    slot.actual_grid_import_kwh = Some(sample.grid_import_kwh);
    slot.actual_grid_export_kwh = Some(sample.grid_export_kwh);
    slot.actual_soc_pct = Some(sample.soc_pct);
    if slot.slot_end <= Utc::now() {
        slot.is_historical = true;
    }
}

pub fn flat_raw_frame(start: chrono::DateTime<Utc>, load_kwh: f64, pv_kwh: f64, import_price: f64, export_price: f64) -> Vec<RawSlotInput> {
    (0..HORIZON_SLOTS)
        .map(|i| RawSlotInput {
            slot_start: start + chrono::Duration::minutes(15 * i as i64),
            load_kwh,
            pv_kwh,
            load_p10: None,
            load_p50: None,
            load_p90: None,
            pv_p10: None,
            pv_p50: None,
            pv_p90: None,
            import_price,
            export_price,
        })
        .collect()
}
