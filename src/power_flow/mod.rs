/// Power Flow Orchestration System
///
/// This module contains the core power flow model that coordinates all energy flows
/// in the system. It ensures physical constraints are never violated while optimizing
/// for economic objectives.

pub mod snapshot;
pub mod constraints;
pub mod inputs;
pub mod model;

pub use snapshot::PowerSnapshot;
pub use constraints::AllConstraints;
pub use inputs::PowerFlowInputs;
