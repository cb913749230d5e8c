#![allow(dead_code)]
use serde::{Deserialize, Serialize};

/// Real-time sources that feed the OverrideEvaluator and WaterPreScheduler,
/// distinct from the forecast/tariff frame: vacation mode, alarm state, and
/// a user-initiated manual override.
#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum ManualOverrideMode {
    ForceCharge,
    Pause,
    WaterBoost,
}

#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextGates {
    pub vacation_mode: bool,
    pub alarm_armed: bool,
    pub manual_override: Option<ManualOverrideMode>,
    pub automation_enabled: bool,
}

impl Default for ContextGates {
    fn default() -> Self {
        Self {
            vacation_mode: false,
            alarm_armed: false,
            manual_override: None,
            automation_enabled: true,
        }
    }
}

impl ContextGates {
    pub fn manual_override_active(&self) -> bool {
        self.manual_override.is_some()
    }
}
