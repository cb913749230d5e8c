pub mod battery;

pub use battery::ModbusBattery;
