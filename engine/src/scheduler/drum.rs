//! Drum scheduling: pack the constraint resource's operations back to back.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;

use crate::bottleneck::Bottleneck;
use crate::models::{add_hours, hours_to_duration, ConstraintTag, Operation, DRUM_OPERATION};
use crate::timeline::DrumTimeline;
use crate::{log_decision, log_stage, log_trace};

use super::SchedulerError;

/// Lay out every movable operation on the bottleneck starting at `horizon_start`.
///
/// Largest jobs (duration + setup) go first, ties keep input order. Each
/// operation starts where the previous one ended, so without locked work the
/// timeline is contiguous. Locked operations on the bottleneck are treated as
/// reserved time and packed around.
///
/// Returns the scheduled copies in chronological order, or
/// `SchedulerError::OutOfRange` if an operation would run past the
/// representable calendar.
pub fn schedule_drum(
    operations: &[Operation],
    bottleneck: &Bottleneck,
    horizon_start: DateTime<Utc>,
    verbosity: u8,
) -> Result<Vec<Operation>, SchedulerError> {
    if bottleneck.is_none() {
        log_stage!(verbosity, "no bottleneck resource, drum is empty");
        return Ok(Vec::new());
    }
    let drum_resource = bottleneck.resource_id.as_str();

    let mut reserved: Vec<(DateTime<Utc>, DateTime<Utc>)> = Vec::new();
    for op in operations
        .iter()
        .filter(|op| op.assigned_resource() == Some(drum_resource) && op.is_locked())
    {
        let Some(start) = op.start_time else {
            continue;
        };
        let end = match op.end_time {
            Some(end) => end,
            None => add_hours(start, op.total_hours()).ok_or_else(|| {
                SchedulerError::OutOfRange {
                    operation: op.id.clone(),
                }
            })?,
        };
        reserved.push((start, end));
    }
    log_trace!(
        verbosity,
        "{} locked period(s) on drum {}",
        reserved.len(),
        drum_resource
    );
    let mut timeline = DrumTimeline::new(reserved);

    let mut drum: Vec<Operation> = operations
        .iter()
        .filter(|op| op.assigned_resource() == Some(drum_resource) && op.is_reschedulable())
        .cloned()
        .collect();
    // Stable sort keeps input order among equal-sized jobs
    drum.sort_by(|a, b| {
        b.total_hours()
            .partial_cmp(&a.total_hours())
            .unwrap_or(Ordering::Equal)
    });

    let mut cursor = horizon_start;
    for op in &mut drum {
        let start = hours_to_duration(op.total_hours())
            .and_then(|length| timeline.earliest_fit(cursor, length))
            .ok_or_else(|| SchedulerError::OutOfRange {
                operation: op.id.clone(),
            })?;
        op.place_at(start)?;
        let Some(end) = op.end_time else {
            continue;
        };
        timeline.add_busy_period(start, end);
        op.set_engine_tag(ConstraintTag::new(DRUM_OPERATION, true));
        log_decision!(verbosity, "drum {} [{} .. {})", op.id, start, end);
        cursor = end;
    }

    log_stage!(
        verbosity,
        "drum {} packed with {} operation(s)",
        drum_resource,
        drum.len()
    );
    Ok(drum)
}
