//! Structural checks on the schedule payload before any stage runs.
//!
//! Detects:
//! - Duplicate operation ids
//! - Negative or non-finite durations, setup times and lags
//! - Dependencies that point at operations missing from the payload
//!
//! Cycle detection lives in [`crate::graph`] because it needs the index.

use rustc_hash::FxHashSet;

use crate::models::ScheduleData;
use crate::scheduler::SchedulerError;

fn check_hours(operation: &str, value: f64) -> Result<(), SchedulerError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SchedulerError::InvalidDuration {
            operation: operation.to_string(),
            value,
        })
    }
}

/// Validate the payload, stopping at the first problem found.
pub fn validate_input(data: &ScheduleData) -> Result<(), SchedulerError> {
    let mut ids: FxHashSet<&str> = FxHashSet::default();
    for op in &data.operations {
        if !ids.insert(op.id.as_str()) {
            return Err(SchedulerError::DuplicateOperation(op.id.clone()));
        }
        check_hours(&op.id, op.duration)?;
        if let Some(setup) = op.setup_time {
            check_hours(&op.id, setup)?;
        }
    }

    for dep in &data.dependencies {
        if !ids.contains(dep.from_operation_id.as_str())
            || !ids.contains(dep.to_operation_id.as_str())
        {
            return Err(SchedulerError::UnknownOperation {
                from: dep.from_operation_id.clone(),
                to: dep.to_operation_id.clone(),
            });
        }
        if let Some(lag) = dep.lag {
            check_hours(&dep.to_operation_id, lag)?;
        }
    }

    Ok(())
}
