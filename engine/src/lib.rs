//! Drum-Buffer-Rope (Theory of Constraints) production scheduling engine.
//!
//! Given a pool of operations, resources and precedence dependencies, the
//! engine finds the most loaded resource (the drum), packs its work into a
//! contiguous timeline, backward-schedules the work feeding it behind a
//! constraint buffer and forward-schedules the work waiting on it behind a
//! shipping buffer.
//!
//! The engine is a pure, synchronous transformation: a schedule payload goes
//! in, a new one comes out. Every call builds its own indices, so separate
//! runs may execute in parallel.

pub mod bottleneck;
mod config;
pub mod graph;
pub mod logging;
mod models;
pub mod scheduler;
mod timeline;
pub mod validation;

pub use bottleneck::{identify_bottleneck, resource_loads, Bottleneck, ResourceLoad};
pub use config::DbrConfig;
pub use graph::{DagCheck, DependencyIndex};
pub use models::{
    hours_to_duration, ConstraintTag, Dependency, Operation, Resource, ScheduleData,
    ScheduleMetadata, CONSTRAINT_FEEDING, DRUM_OPERATION, SCHEDULING_METHOD, SHIPPING_BUFFER,
};
pub use scheduler::{DbrOutcome, DrumBufferRopeScheduler, EnginePhase, SchedulerError};
pub use timeline::DrumTimeline;

/// Run the Drum-Buffer-Rope engine over a schedule payload.
///
/// # Arguments
/// * `data` - Operations, resources, dependencies and optional `horizonStart`
/// * `config` - Buffer ratios, capacity and validation switches
///
/// # Returns
/// * A new payload with drum, feeding and downstream operations time-stamped,
///   tagged and annotated, plus `bottleneckResource`, `bottleneckUtilization`
///   and `schedulingMethod` metadata
///
/// # Errors
/// * `SchedulerError` if the configuration or payload is malformed, or the
///   dependency graph is cyclic while `validate_dag` is on
pub fn schedule_drum_buffer_rope(
    data: &ScheduleData,
    config: &DbrConfig,
) -> Result<ScheduleData, SchedulerError> {
    let mut scheduler = DrumBufferRopeScheduler::new(data.clone(), config.clone())?;
    Ok(scheduler.schedule()?.schedule)
}

/// Same as [`schedule_drum_buffer_rope`] over a JSON payload.
pub fn schedule_json(payload: &str, config: &DbrConfig) -> Result<String, SchedulerError> {
    let data: ScheduleData = serde_json::from_str(payload)?;
    let scheduled = schedule_drum_buffer_rope(&data, config)?;
    Ok(serde_json::to_string(&scheduled)?)
}
