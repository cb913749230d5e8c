pub mod assembler;
pub mod policy;
pub mod preparer;
pub mod s_index;
pub mod target_soc;
pub mod water_prescheduler;

use std::collections::HashSet;
use thiserror::Error;

use crate::domain::context::ContextGates;
use crate::domain::slot::Slot;
use crate::optimizer::strategies::kepler::{Kepler, KeplerConfig, KeplerError};
use crate::planner::assembler::ScheduleAssembler;
use crate::planner::policy::{target_soc_penalty, PolicyVector};
use crate::planner::preparer::{PreparerError, RawSlotInput};
use crate::planner::s_index::{SIndex, SIndexInputs};
use crate::planner::target_soc::{TargetSocInputs, TargetSocStrategist};
use crate::planner::water_prescheduler::{WaterPreScheduler, WaterPreSchedulerInputs};

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("bad input: {0}")]
    BadInput(#[from] PreparerError),
    #[error("MILP proved infeasible")]
    Infeasible,
    #[error("solver exceeded its wall-time budget")]
    PlannerTimeout,
    #[error("forecast window does not cover the full horizon")]
    StaleForecast,
}

impl From<KeplerError> for PlannerError {
    fn from(e: KeplerError) -> Self {
        match e {
            KeplerError::Infeasible => PlannerError::Infeasible,
            KeplerError::PlannerTimeout => PlannerError::PlannerTimeout,
            KeplerError::FeatureDisabled => PlannerError::Infeasible,
        }
    }
}

/// Inputs assembled by the caller (from ForecastProvider/TariffProvider/
/// StateProvider) for a single planning run. Everything here is immutable
/// for the duration of the run; nothing is read back from global config
/// mid-pipeline.
pub struct PlanningRunInputs {
    pub raw_frame: Vec<RawSlotInput>,
    pub soc_now_kwh: f64,
    pub context: ContextGates,
    pub s_index: SIndexInputs,
    pub target_soc: TargetSocInputsPartial,
    pub water: WaterPreSchedulerInputs,
    pub kepler: KeplerConfig,
    pub risk_appetite: u8,
}

/// `TargetSocInputs` minus the fields the pipeline fills in from SIndex's
/// own deficit/cold diagnostics, so callers don't have to duplicate them.
pub struct TargetSocInputsPartial {
    pub min_soc_pct: f64,
    pub max_soc_pct: f64,
}

pub struct PlanningRunOutput {
    pub slots: Vec<Slot>,
    pub policy: PolicyVector,
    pub water_quota_relaxed: bool,
}

/// Runs the full pipeline: Preparer -> SIndex -> TargetSoC -> WaterPreScheduler
/// -> Kepler -> ScheduleAssembler. One-way data flow; each stage's output
/// feeds only the next. The economics-derived portion of the policy vector
/// portion of the policy vector is supplied by the caller (straight out of
/// `BatteryEconomicsConfig`), while SIndex/TargetSoC fill in the rest.
pub fn plan(
    inputs: &PlanningRunInputs,
    economics: EconomicsPolicy,
    location: preparer::LocationConfig,
    pv_confidence: f64,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<PlanningRunOutput, PlannerError> {
    let (s_index_factor, s_diag) = SIndex::compute(&inputs.s_index);

    let prep = preparer::Preparer::new(location, pv_confidence);
    let frame = prep.prepare(&inputs.raw_frame, s_index_factor, inputs.s_index.max_factor)?;

    let target_soc_pct = TargetSocStrategist::choose(&TargetSocInputs {
        risk_appetite: inputs.risk_appetite,
        min_soc_pct: inputs.target_soc.min_soc_pct,
        max_soc_pct: inputs.target_soc.max_soc_pct,
        pv_deficit_norm: s_diag.pv_deficit_norm,
        cold_norm: s_diag.cold_norm,
    });

    let committed_water: HashSet<usize> = WaterPreScheduler::commit(&inputs.water, &frame, now);

    let policy = PolicyVector {
        target_soc_end_pct: target_soc_pct,
        s_index_factor,
        wear_cost_per_kwh: economics.wear_cost_per_kwh,
        ramping_cost: economics.ramping_cost,
        export_min_spread: economics.export_min_spread,
        protective_soc_kwh: economics.protective_soc_kwh,
        soft_floor_penalty: target_soc_penalty(inputs.risk_appetite),
    };

    let kepler = Kepler::new(inputs.kepler.clone());
    let solution = kepler.solve(&frame, inputs.soc_now_kwh, &policy, &committed_water)?;

    let capacity_kwh = inputs.kepler.battery.capacity_kwh;
    let min_soc_pct = inputs.kepler.battery.min_soc_pct;
    let slots = ScheduleAssembler::assemble(frame, &solution, capacity_kwh, min_soc_pct);

    Ok(PlanningRunOutput { slots, policy, water_quota_relaxed: solution.water_quota_relaxed })
}

#[derive(Debug, Clone, Copy)]
pub struct EconomicsPolicy {
    pub wear_cost_per_kwh: f64,
    pub ramping_cost: f64,
    pub export_min_spread: f64,
    pub protective_soc_kwh: f64,
}
