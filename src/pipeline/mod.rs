//! Pipeline orchestration
//!
//! The executor runs one stage: it selects the stage's work items, fans
//! the (agent × item) grid out onto tasks, joins them in spawn order and
//! applies the stage's propagation rule sequentially. The orchestrator
//! strings the six stages together into full cycles over the shared
//! registries and the event queue.

pub mod executor;
pub mod orchestrator;

pub use executor::{StageExecutor, StageReport};
pub use orchestrator::{CycleReport, Orchestrator, SystemStatus};
