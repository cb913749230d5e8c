#![allow(dead_code)]
use serde::{Deserialize, Serialize};

use crate::planner::policy::risk_appetite_quantile;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SIndexMode {
    Dynamic,
    Probabilistic,
}

/// Diagnostics persisted alongside the scalar safety factor for auditability.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SIndexDiagnostics {
    pub mode: SIndexModeTag,
    pub pv_deficit_norm: f64,
    pub cold_norm: f64,
    pub volatility_norm: f64,
    pub quantile_used: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SIndexModeTag {
    Dynamic,
    Probabilistic,
}

#[derive(Debug, Clone, Copy)]
pub struct SIndexInputs {
    pub mode: SIndexMode,
    pub base_factor: f64,
    pub max_factor: f64,
    pub pv_deficit_weight: f64,
    pub temp_weight: f64,
    pub temp_baseline_c: f64,
    pub temp_cold_c: f64,
    pub risk_appetite: u8,
    /// Expected (historical-average) PV energy over the lookahead window, kWh.
    pub expected_pv_kwh: f64,
    /// Forecast PV energy over the same window, kWh.
    pub forecast_pv_kwh: f64,
    /// Mean forecast temperature over the horizon, Celsius.
    pub forecast_mean_temp_c: f64,
    /// Standard deviation of cloud cover / temperature over the horizon,
    /// already normalized to [0, 1].
    pub weather_volatility_norm: f64,
    /// p10/p50/p90 quantiles of the forecast load over the horizon, kWh,
    /// when the forecaster supplies them.
    pub load_quantiles: Option<LoadQuantiles>,
}

#[derive(Debug, Clone, Copy)]
pub struct LoadQuantiles {
    pub p10: f64,
    pub p50: f64,
    pub p90: f64,
}

impl LoadQuantiles {
    /// Linear interpolation across the three known quantile points, clamped
    /// to the [p10, p90] range at the edges.
    fn at(&self, q: f64) -> f64 {
        if q <= 0.10 {
            self.p10
        } else if q <= 0.50 {
            let t = (q - 0.10) / 0.40;
            self.p10 + t * (self.p50 - self.p10)
        } else if q <= 0.90 {
            let t = (q - 0.50) / 0.40;
            self.p50 + t * (self.p90 - self.p50)
        } else {
            self.p90
        }
    }
}

/// Computes the scalar safety factor and per-slot load inflation diagnostics.
pub struct SIndex;

impl SIndex {
    pub fn compute(inputs: &SIndexInputs) -> (f64, SIndexDiagnostics) {
        match inputs.mode {
            SIndexMode::Dynamic => Self::compute_dynamic(inputs),
            SIndexMode::Probabilistic => Self::compute_probabilistic(inputs),
        }
    }

    fn compute_dynamic(inputs: &SIndexInputs) -> (f64, SIndexDiagnostics) {
        let pv_deficit_norm = if inputs.expected_pv_kwh > 0.0 {
            ((inputs.expected_pv_kwh - inputs.forecast_pv_kwh) / inputs.expected_pv_kwh)
                .clamp(0.0, 1.0)
        } else {
            0.0
        };

        let cold_norm = if inputs.temp_baseline_c > inputs.temp_cold_c {
            ((inputs.temp_baseline_c - inputs.forecast_mean_temp_c)
                / (inputs.temp_baseline_c - inputs.temp_cold_c))
                .clamp(0.0, 1.0)
        } else {
            0.0
        };

        let volatility = inputs.weather_volatility_norm.clamp(0.0, 1.0);
        let pv_weight = inputs.pv_deficit_weight + volatility * 0.4;
        let temp_weight = inputs.temp_weight + volatility * 0.2;

        let s = inputs.base_factor + pv_weight * pv_deficit_norm + temp_weight * cold_norm;
        let clamped = s.clamp(inputs.base_factor, inputs.max_factor);

        (
            clamped,
            SIndexDiagnostics {
                mode: SIndexModeTag::Dynamic,
                pv_deficit_norm,
                cold_norm,
                volatility_norm: volatility,
                quantile_used: None,
            },
        )
    }

    fn compute_probabilistic(inputs: &SIndexInputs) -> (f64, SIndexDiagnostics) {
        let q = risk_appetite_quantile(inputs.risk_appetite);
        let s = match &inputs.load_quantiles {
            Some(quantiles) if quantiles.p50 > 0.0 => 1.0 + (quantiles.at(q) / quantiles.p50 - 1.0).max(0.0),
            _ => inputs.base_factor,
        };
        let clamped = s.clamp(inputs.base_factor, inputs.max_factor);

        (
            clamped,
            SIndexDiagnostics {
                mode: SIndexModeTag::Probabilistic,
                pv_deficit_norm: 0.0,
                cold_norm: 0.0,
                volatility_norm: 0.0,
                quantile_used: Some(q),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_inputs() -> SIndexInputs {
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

    #[test]
    fn dynamic_mode_returns_base_factor_with_no_deficit() {
        let (s, _) = SIndex::compute(&base_inputs());
        assert_eq!(s, 1.0);
    }

    #[test]
    fn dynamic_mode_is_clamped_to_max_factor() {
        let mut inputs = base_inputs();
        inputs.expected_pv_kwh = 20.0;
        inputs.forecast_pv_kwh = 0.0;
        inputs.forecast_mean_temp_c = -10.0;
        inputs.pv_deficit_weight = 1.0;
        inputs.temp_weight = 1.0;
        let (s, _) = SIndex::compute(&inputs);
        assert_eq!(s, inputs.max_factor);
    }

    #[test]
    fn probabilistic_mode_level_one_uses_p95_quantile() {
        let mut inputs = base_inputs();
        inputs.mode = SIndexMode::Probabilistic;
        inputs.risk_appetite = 1;
        inputs.load_quantiles = Some(LoadQuantiles { p10: 5.0, p50: 10.0, p90: 20.0 });
        let (_, diag) = SIndex::compute(&inputs);
        assert_eq!(diag.quantile_used, Some(0.95));
    }
}
