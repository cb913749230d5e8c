pub mod adapter;
pub mod consumption;
pub mod engine;
pub mod features;
pub mod metrics;
pub mod prices;
pub mod production;
pub mod weather;

pub use adapter::*;
pub use consumption::*;
pub use engine::*;
pub use metrics::*;
pub use prices::*;
pub use production::*;
pub use weather::*;
