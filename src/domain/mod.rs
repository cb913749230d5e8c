pub mod battery;
pub mod context;
pub mod ev_charger;
pub mod forecast;
pub mod grid;
pub mod inverter;
pub mod schedule;
pub mod slot;
pub mod types;
pub mod water_heater;

pub use battery::*;
pub use context::*;
pub use ev_charger::*;
pub use grid::*;
pub use inverter::*;
pub use schedule::*;
pub use slot::*;
pub use types::*;
pub use water_heater::*;
