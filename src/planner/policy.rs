#![allow(dead_code)]
use serde::{Deserialize, Serialize};

/// The policy vector theta: per-run tunable parameters produced by the
/// strategy layer (SIndex, TargetSoC) and consumed by Kepler. Assembled fresh
/// on every planner run and threaded through by value; never mutates the
/// global config snapshot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PolicyVector {
    pub target_soc_end_pct: f64,
    pub s_index_factor: f64,
    pub wear_cost_per_kwh: f64,
    pub ramping_cost: f64,
    pub export_min_spread: f64,
    pub protective_soc_kwh: f64,
    pub soft_floor_penalty: f64,
}

/// Risk-indexed target-SoC soft-constraint penalty table from the MILP
/// objective (monetary units/kWh), indexed by `risk_appetite` (1..=5).
pub fn target_soc_penalty(risk_appetite: u8) -> f64 {
    match risk_appetite {
        1 => 20.0,
        2 => 14.0,
        3 => 8.0,
        4 => 4.0,
        5 => 2.0,
        _ => 8.0,
    }
}

/// Risk-indexed target-SoC base buffer table (percentage points).
pub fn target_soc_base_buffer(risk_appetite: u8) -> f64 {
    match risk_appetite {
        1 => 35.0,
        2 => 20.0,
        3 => 10.0,
        4 => 3.0,
        5 => -7.0,
        _ => 10.0,
    }
}

/// Risk-appetite to quantile mapping used by SIndex's probabilistic mode
/// (level 1 = Safety -> p95 of load).
pub fn risk_appetite_quantile(risk_appetite: u8) -> f64 {
    match risk_appetite {
        1 => 0.95,
        2 => 0.80,
        3 => 0.50,
        4 => 0.25,
        5 => 0.10,
        _ => 0.50,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_soc_penalty_table_matches_contract() {
        assert_eq!(target_soc_penalty(1), 20.0);
        assert_eq!(target_soc_penalty(5), 2.0);
    }

    #[test]
    fn quantile_level_one_is_p95() {
        assert_eq!(risk_appetite_quantile(1), 0.95);
        assert_eq!(risk_appetite_quantile(5), 0.10);
    }
}
