#![allow(dead_code)]
use serde::{Deserialize, Serialize};

/// Provenance tag recorded alongside every corrected value, per the
/// two-stage forecaster contract: a reader must always be able to tell
/// whether a slot's numbers are the raw baseline or a corrected estimate.
#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionSource {
    Baseline,
    CorrectedRolling,
    CorrectedMl,
}

#[derive(Debug, Clone, Copy)]
pub struct CorrectedValue {
    pub value: f64,
    pub source: CorrectionSource,
}

/// Which secondary signal, if any, produced `correction_kwh`. Callers that
/// have no correction signal pass `None`; a rolling-average forecaster and a
/// (future) ML forecaster each report their own variant so the recorded
/// `CorrectionSource` reflects what actually ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionMethod {
    None,
    Rolling,
    Ml,
}

/// Applies the Aurora-style correction envelope: `final = base + correction`
/// clamped to `[base * 0.5, base * 1.5]`, then a positivity/daylight floor.
/// Grounded on `forecast/engine.rs`'s fallback-on-failure pattern (never let
/// a secondary signal override the primary one unboundedly) but applied
/// per-value instead of per-forecast.
pub struct ForecastAdapter;

impl ForecastAdapter {
    /// `is_civil_daylight` only matters for PV; pass `true` unconditionally
    /// for load.
    pub fn apply_load_correction(base_kwh: f64, correction_kwh: f64, method: CorrectionMethod) -> CorrectedValue {
        let clamped = Self::clamp(base_kwh, correction_kwh);
        let value = clamped.max(0.01);
        CorrectedValue { value, source: Self::source(method, correction_kwh) }
    }

    pub fn apply_pv_correction(
        base_kwh: f64,
        correction_kwh: f64,
        method: CorrectionMethod,
        is_civil_daylight: bool,
    ) -> CorrectedValue {
        let clamped = Self::clamp(base_kwh, correction_kwh);
        let value = if is_civil_daylight { clamped.max(0.0) } else { 0.0 };
        CorrectedValue { value, source: Self::source(method, correction_kwh) }
    }

    fn clamp(base: f64, correction: f64) -> f64 {
        let raw = base + correction;
        let lo = base * 0.5;
        let hi = base * 1.5;
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        raw.clamp(lo, hi)
    }

    fn source(method: CorrectionMethod, correction_kwh: f64) -> CorrectionSource {
        if method == CorrectionMethod::None || correction_kwh == 0.0 {
            CorrectionSource::Baseline
        } else if method == CorrectionMethod::Ml {
            CorrectionSource::CorrectedMl
        } else {
            CorrectionSource::CorrectedRolling
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pv_correction_clamped_to_half_to_one_and_half_of_base() {
        let corrected = ForecastAdapter::apply_pv_correction(2.0, -2.5, CorrectionMethod::Rolling, true);
        assert_eq!(corrected.value, 1.0);
        assert_eq!(corrected.source, CorrectionSource::CorrectedRolling);
    }

    #[test]
    fn pv_correction_zero_outside_daylight() {
        let corrected = ForecastAdapter::apply_pv_correction(2.0, 0.1, CorrectionMethod::Rolling, false);
        assert_eq!(corrected.value, 0.0);
    }

    #[test]
    fn load_correction_has_positivity_floor() {
        let corrected = ForecastAdapter::apply_load_correction(0.0, 0.0, CorrectionMethod::None);
        assert_eq!(corrected.value, 0.01);
    }

    #[test]
    fn no_correction_used_reports_baseline_source() {
        let corrected = ForecastAdapter::apply_load_correction(1.0, 0.3, CorrectionMethod::None);
        assert_eq!(corrected.source, CorrectionSource::Baseline);
    }

    #[test]
    fn ml_correction_reports_ml_source() {
        let corrected = ForecastAdapter::apply_load_correction(1.0, 0.2, CorrectionMethod::Ml);
        assert_eq!(corrected.source, CorrectionSource::CorrectedMl);
    }

    #[test]
    fn zero_correction_is_baseline_regardless_of_method() {
        let corrected = ForecastAdapter::apply_load_correction(1.0, 0.0, CorrectionMethod::Ml);
        assert_eq!(corrected.source, CorrectionSource::Baseline);
    }
}
