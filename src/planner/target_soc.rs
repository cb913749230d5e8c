#![allow(dead_code)]
use crate::planner::policy::target_soc_base_buffer;

#[derive(Debug, Clone, Copy)]
pub struct TargetSocInputs {
    pub risk_appetite: u8,
    pub min_soc_pct: f64,
    pub max_soc_pct: f64,
    /// PV deficit over the next 24-48h, normalized to [0, 1] (0 = no deficit).
    pub pv_deficit_norm: f64,
    /// Cold-weather severity over the next 24-48h, normalized to [0, 1].
    pub cold_norm: f64,
}

/// Chooses the end-of-horizon SoC target. Guarantees monotonicity: with all
/// other inputs equal, a lower risk-appetite level always yields a strictly
/// larger target (barring clamps at `max_soc_pct`).
pub struct TargetSocStrategist;

impl TargetSocStrategist {
    pub fn choose(inputs: &TargetSocInputs) -> f64 {
        let base_buffer = target_soc_base_buffer(inputs.risk_appetite);
        let weather_adjustment =
            (inputs.pv_deficit_norm * 8.0 + inputs.cold_norm * 8.0).clamp(-8.0, 8.0);
        let target = inputs.min_soc_pct + base_buffer + weather_adjustment;
        target.clamp(inputs.min_soc_pct, inputs.max_soc_pct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(risk_appetite: u8) -> TargetSocInputs {
        TargetSocInputs {
            risk_appetite,
            min_soc_pct: 10.0,
            max_soc_pct: 95.0,
            pv_deficit_norm: 0.0,
            cold_norm: 0.0,
        }
    }

    #[test]
    fn monotonic_across_all_risk_levels() {
        let mut prev = f64::INFINITY;
        for level in 1..=5u8 {
            let target = TargetSocStrategist::choose(&inputs(level));
            assert!(
                target < prev || (target - inputs(level).max_soc_pct).abs() < 1e-9,
                "target at level {level} ({target}) not strictly less than previous ({prev})"
            );
            prev = target;
        }
    }

    #[test]
    fn clamps_to_min_and_max_soc() {
        let mut input = inputs(5);
        input.min_soc_pct = 50.0;
        let target = TargetSocStrategist::choose(&input);
        assert!(target >= input.min_soc_pct);

        let mut input = inputs(1);
        input.max_soc_pct = 30.0;
        let target = TargetSocStrategist::choose(&input);
        assert!(target <= input.max_soc_pct);
    }

    #[test]
    fn higher_risk_appetite_lowers_target_soc() {
        let targets: Vec<f64> = (1..=5u8).map(|l| TargetSocStrategist::choose(&inputs(l))).collect();
        for w in targets.windows(2) {
            assert!(w[0] > w[1]);
        }
    }
}
