pub mod constraints;
pub mod dp;
pub mod greedy;
pub mod strategies;
pub mod types;

pub use constraints::*;
pub use dp::*;
pub use strategies::*;
pub use types::*;
