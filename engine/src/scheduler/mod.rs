//! Drum-Buffer-Rope scheduling stages and their orchestration.
//!
//! Control flow for one run:
//! bottleneck identification -> drum packing -> feeding (backward) and
//! downstream (forward) placement -> annotation -> assembly.
//! Every stage works on copies; the caller's payload is never mutated.

mod annotate;
mod downstream;
mod drum;
mod engine;
mod feeding;
mod state;

pub use annotate::annotate;
pub use downstream::{schedule_downstream, schedule_downstream_chains};
pub use drum::schedule_drum;
pub use engine::{DbrOutcome, DrumBufferRopeScheduler, SchedulerError};
pub use feeding::{schedule_feeding, schedule_feeding_chains};
pub use state::{EnginePhase, EngineState};
