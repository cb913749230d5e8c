#![allow(dead_code)]
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkMode {
    BatteryFirst,
    LoadFirst,
    ExportFirst,
}

/// Abstract, idempotent control-entity write surface the Executor drives.
/// Each method corresponds 1:1 to a physical Home-Assistant-style entity
/// write; a real backend (Modbus, HA REST) implements this trait, `sim`
/// mode uses an in-memory one.
#[async_trait]
pub trait ControlEntities: Send + Sync {
    async fn set_work_mode(&self, mode: WorkMode) -> Result<()>;
    async fn set_grid_charging(&self, enabled: bool) -> Result<()>;
    async fn set_max_charge_power_w(&self, watts: f64) -> Result<()>;
    async fn set_max_discharge_power_w(&self, watts: f64) -> Result<()>;
    async fn set_grid_max_export_w(&self, watts: f64) -> Result<()>;
    async fn set_soc_target_percent(&self, percent: f64) -> Result<()>;
    async fn set_water_heater_target_c(&self, celsius: f64) -> Result<()>;
    async fn set_water_heater_enable(&self, enabled: bool) -> Result<()>;

    /// Reads back the entity values currently reported by the backend, used
    /// by the state machine to detect drift.
    async fn read_reported(&self) -> Result<ReportedState>;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReportedState {
    pub work_mode: WorkMode,
    pub grid_charging: bool,
    pub max_charge_power_w: f64,
    pub max_discharge_power_w: f64,
    pub grid_max_export_w: f64,
    pub soc_target_percent: f64,
    pub water_heater_target_c: f64,
    pub water_heater_enabled: bool,
}

/// In-memory control-entity backend for `sim` mode and tests. Applies writes
/// immediately and reports back exactly what was applied (no simulated
/// drift) -- entity-level drift simulation lives in the hardware layer, not
/// here.
pub struct SimulatedControlEntities {
    state: tokio::sync::RwLock<ReportedState>,
}

impl Default for SimulatedControlEntities {
    fn default() -> Self {
        Self {
            state: tokio::sync::RwLock::new(ReportedState {
                work_mode: WorkMode::LoadFirst,
                grid_charging: false,
                max_charge_power_w: 0.0,
                max_discharge_power_w: 0.0,
                grid_max_export_w: 0.0,
                soc_target_percent: 0.0,
                water_heater_target_c: 55.0,
                water_heater_enabled: false,
            }),
        }
    }
}

#[async_trait]
impl ControlEntities for SimulatedControlEntities {
    async fn set_work_mode(&self, mode: WorkMode) -> Result<()> {
        self.state.write().await.work_mode = mode;
        Ok(())
    }
    async fn set_grid_charging(&self, enabled: bool) -> Result<()> {
        self.state.write().await.grid_charging = enabled;
        Ok(())
    }
    async fn set_max_charge_power_w(&self, watts: f64) -> Result<()> {
        self.state.write().await.max_charge_power_w = watts;
        Ok(())
    }
    async fn set_max_discharge_power_w(&self, watts: f64) -> Result<()> {
        self.state.write().await.max_discharge_power_w = watts;
        Ok(())
    }
    async fn set_grid_max_export_w(&self, watts: f64) -> Result<()> {
        self.state.write().await.grid_max_export_w = watts;
        Ok(())
    }
    async fn set_soc_target_percent(&self, percent: f64) -> Result<()> {
        self.state.write().await.soc_target_percent = percent;
        Ok(())
    }
    async fn set_water_heater_target_c(&self, celsius: f64) -> Result<()> {
        self.state.write().await.water_heater_target_c = celsius;
        Ok(())
    }
    async fn set_water_heater_enable(&self, enabled: bool) -> Result<()> {
        self.state.write().await.water_heater_enabled = enabled;
        Ok(())
    }
    async fn read_reported(&self) -> Result<ReportedState> {
        Ok(*self.state.read().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_state_is_idle() {
        let entities = SimulatedControlEntities::default();
        let reported = entities.read_reported().await.unwrap();
        assert_eq!(reported.work_mode, WorkMode::LoadFirst);
        assert!(!reported.grid_charging);
        assert!(!reported.water_heater_enabled);
    }

    #[tokio::test]
    async fn writes_are_visible_on_readback() {
        let entities = SimulatedControlEntities::default();
        entities.set_work_mode(WorkMode::BatteryFirst).await.unwrap();
        entities.set_grid_charging(true).await.unwrap();
        entities.set_max_charge_power_w(2500.0).await.unwrap();
        entities.set_water_heater_enable(true).await.unwrap();

        let reported = entities.read_reported().await.unwrap();
        assert_eq!(reported.work_mode, WorkMode::BatteryFirst);
        assert!(reported.grid_charging);
        assert_eq!(reported.max_charge_power_w, 2500.0);
        assert!(reported.water_heater_enabled);
    }
}
