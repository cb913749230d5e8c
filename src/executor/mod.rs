pub mod control_entities;
pub mod log;
pub mod override_evaluator;
pub mod state_machine;
pub mod tick;

pub use control_entities::{ControlEntities, ReportedState, SimulatedControlEntities, WorkMode};
pub use override_evaluator::{EffectivePlan, LiveState, OverrideEvaluator, OverrideThresholds};
pub use state_machine::{ControlEntity, EntityState, EntityStateTracker};
pub use tick::{Executor, ExecutorError};
