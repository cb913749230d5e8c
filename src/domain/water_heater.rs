#![allow(dead_code)]
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Water-heater-specific errors
#[derive(Debug, Error)]
pub enum WaterHeaterError {
    #[error("Communication error: {0}")]
    Communication(String),
    #[error("Invalid target temperature: {0}C (out of supported range)")]
    InvalidTemperature(f64),
    #[error("Heater in fault state: {0}")]
    Fault(String),
    #[error("Heater offline or unavailable")]
    Offline,
}

/// Water heater control-entity abstraction. A deferrable electric load whose
/// on/off state MILP (or, for anti-legionella cycles, WaterPreScheduler)
/// decides ahead of time and the Executor applies at tick time.
#[async_trait]
pub trait WaterHeater: Send + Sync {
    async fn read_state(&self) -> Result<WaterHeaterState>;
    async fn set_enable(&self, on: bool) -> Result<()>;
    async fn set_target_temperature(&self, celsius: f64) -> Result<()>;
    fn capabilities(&self) -> WaterHeaterCapabilities;
}

#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaterHeaterState {
    pub status: WaterHeaterStatus,
    pub heating: bool,
    pub power_kw: f64,
    pub current_temperature_c: f64,
    pub target_temperature_c: f64,
    pub energy_today_kwh: f64,
}

#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WaterHeaterStatus {
    Idle,
    Heating,
    Offline,
    Faulted,
}

#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaterHeaterCapabilities {
    pub power_kw: f64,
    pub min_target_c: f64,
    pub max_target_c: f64,
    pub legionella_target_c: f64,
}

impl Default for WaterHeaterCapabilities {
    fn default() -> Self {
        Self {
            power_kw: 3.0,
            min_target_c: 40.0,
            max_target_c: 75.0,
            legionella_target_c: 65.0,
        }
    }
}

/// Simulated water heater for development and testing, mirroring the shape
/// of the battery/inverter simulated devices.
#[derive(Debug)]
pub struct SimulatedWaterHeater {
    state: Arc<RwLock<WaterHeaterState>>,
    caps: WaterHeaterCapabilities,
}

impl SimulatedWaterHeater {
    pub fn new(initial: WaterHeaterState, caps: WaterHeaterCapabilities) -> Self {
        Self { state: Arc::new(RwLock::new(initial)), caps }
    }

    pub fn default_heater() -> Self {
        let caps = WaterHeaterCapabilities::default();
        let initial = WaterHeaterState {
            status: WaterHeaterStatus::Idle,
            heating: false,
            power_kw: 0.0,
            current_temperature_c: 55.0,
            target_temperature_c: 55.0,
            energy_today_kwh: 0.0,
        };
        Self::new(initial, caps)
    }

    /// Advances the simulated tank temperature toward its target while heating,
    /// and lets it drift down toward ambient while idle. Intended to be called
    /// once per executor tick in `sim` mode.
    pub async fn simulate_step(&self, duration_seconds: u64) {
        let mut st = self.state.write().await;
        let duration_hours = duration_seconds as f64 / 3600.0;
        const HEAT_RATE_C_PER_KWH: f64 = 8.0;
        const AMBIENT_DRIFT_C_PER_HOUR: f64 = 0.3;

        if st.heating {
            let energy_kwh = self.caps.power_kw * duration_hours;
            st.energy_today_kwh += energy_kwh;
            st.current_temperature_c =
                (st.current_temperature_c + energy_kwh * HEAT_RATE_C_PER_KWH)
                    .min(st.target_temperature_c);
            st.power_kw = self.caps.power_kw;
            if st.current_temperature_c >= st.target_temperature_c {
                st.heating = false;
                st.status = WaterHeaterStatus::Idle;
                st.power_kw = 0.0;
            }
        } else {
            st.current_temperature_c -= AMBIENT_DRIFT_C_PER_HOUR * duration_hours;
            st.power_kw = 0.0;
        }
    }
}

#[async_trait]
impl WaterHeater for SimulatedWaterHeater {
    async fn read_state(&self) -> Result<WaterHeaterState> {
        Ok(self.state.read().await.clone())
    }

    async fn set_enable(&self, on: bool) -> Result<()> {
        let mut st = self.state.write().await;
        st.heating = on;
        st.status = if on { WaterHeaterStatus::Heating } else { WaterHeaterStatus::Idle };
        if !on {
            st.power_kw = 0.0;
        }
        Ok(())
    }

    async fn set_target_temperature(&self, celsius: f64) -> Result<()> {
        if celsius < self.caps.min_target_c || celsius > self.caps.max_target_c {
            anyhow::bail!(WaterHeaterError::InvalidTemperature(celsius));
        }
        let mut st = self.state.write().await;
        st.target_temperature_c = celsius;
        Ok(())
    }

    fn capabilities(&self) -> WaterHeaterCapabilities {
        self.caps.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn enable_transitions_status_to_heating() {
        let heater = SimulatedWaterHeater::default_heater();
        heater.set_enable(true).await.unwrap();
        let state = heater.read_state().await.unwrap();
        assert!(state.heating);
        assert_eq!(state.status, WaterHeaterStatus::Heating);
    }

    #[tokio::test]
    async fn set_target_temperature_rejects_out_of_range() {
        let heater = SimulatedWaterHeater::default_heater();
        assert!(heater.set_target_temperature(120.0).await.is_err());
        assert!(heater.set_target_temperature(60.0).await.is_ok());
    }

    #[tokio::test]
    async fn simulate_step_accumulates_energy_while_heating() {
        let heater = SimulatedWaterHeater::default_heater();
        heater.set_target_temperature(70.0).await.unwrap();
        heater.set_enable(true).await.unwrap();
        heater.simulate_step(900).await;
        let state = heater.read_state().await.unwrap();
        assert!(state.energy_today_kwh > 0.0);
    }
}
