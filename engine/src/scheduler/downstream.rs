//! Downstream scheduling: forward-place work that waits on the drum.
//!
//! A successor of the drum starts a shipping buffer after the latest drum
//! operation it depends on:
//!
//! ```text
//! start = latest(drum.end + lag) + ratio * (duration + setup)
//! end   = start + (duration + setup)
//! ```

use chrono::{DateTime, Utc};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::config::DbrConfig;
use crate::graph::DependencyIndex;
use crate::models::{add_hours, ConstraintTag, Operation, SHIPPING_BUFFER};
use crate::{log_decision, log_stage};

use super::SchedulerError;

fn place_successor(
    op: &Operation,
    ready: DateTime<Utc>,
    ratio: f64,
) -> Result<Operation, SchedulerError> {
    let buffer_hours = ratio * op.total_hours();
    let start = add_hours(ready, buffer_hours).ok_or_else(|| SchedulerError::OutOfRange {
        operation: op.id.clone(),
    })?;
    let mut placed = op.clone();
    placed.place_at(start)?;
    placed.set_engine_tag(ConstraintTag::new(SHIPPING_BUFFER, buffer_hours));
    Ok(placed)
}

/// Earliest allowed start for `id`, given the end times of the predecessors in `anchors`.
fn ready_time(
    id: &str,
    index: &DependencyIndex<'_>,
    anchors: &FxHashMap<&str, DateTime<Utc>>,
) -> Result<Option<DateTime<Utc>>, SchedulerError> {
    let mut ready: Option<DateTime<Utc>> = None;
    for edge in index.predecessors(id) {
        let Some(end) = anchors.get(edge.operation) else {
            continue;
        };
        let earliest = add_hours(*end, edge.lag_hours).ok_or_else(|| {
            SchedulerError::OutOfRange {
                operation: id.to_string(),
            }
        })?;
        ready = Some(ready.map_or(earliest, |r| r.max(earliest)));
    }
    Ok(ready)
}

/// Forward-place every operation that depends directly on a drum operation.
///
/// Operations in `excluded` (drum and feeding work) are never touched. A
/// successor whose drum predecessors all lack an end time is left
/// unscheduled. Results come back in input order.
pub fn schedule_downstream(
    operations: &[Operation],
    drum: &[Operation],
    excluded: &FxHashSet<&str>,
    index: &DependencyIndex<'_>,
    config: &DbrConfig,
) -> Result<Vec<Operation>, SchedulerError> {
    let drum_ids: FxHashSet<&str> = drum.iter().map(|op| op.id.as_str()).collect();
    let drum_ends: FxHashMap<&str, DateTime<Utc>> = drum
        .iter()
        .filter_map(|op| Some((op.id.as_str(), op.end_time?)))
        .collect();

    let mut downstream: Vec<Operation> = Vec::new();
    for op in operations {
        if excluded.contains(op.id.as_str()) || !op.is_reschedulable() {
            continue;
        }
        let follows_drum = index
            .predecessors(&op.id)
            .iter()
            .any(|edge| drum_ids.contains(edge.operation));
        if !follows_drum {
            continue;
        }

        match ready_time(&op.id, index, &drum_ends)? {
            Some(ready) => {
                let placed = place_successor(op, ready, config.shipping_buffer_ratio)?;
                log_decision!(
                    config.verbosity,
                    "downstream {} [{:?} .. {:?})",
                    placed.id,
                    placed.start_time,
                    placed.end_time
                );
                downstream.push(placed);
            }
            None => {
                log_decision!(
                    config.verbosity,
                    "downstream {} left unscheduled: drum predecessor has no end time",
                    op.id
                );
            }
        }
    }

    log_stage!(config.verbosity, "{} downstream operation(s)", downstream.len());
    Ok(downstream)
}

/// Forward-place direct and transitive successors of the drum.
///
/// Walks the graph in topological order; each operation starts a shipping
/// buffer after the latest of its drum and already-placed downstream
/// predecessors. Results come back in input order.
pub fn schedule_downstream_chains(
    operations: &[Operation],
    topo_order: &[&str],
    drum: &[Operation],
    excluded: &FxHashSet<&str>,
    index: &DependencyIndex<'_>,
    config: &DbrConfig,
) -> Result<Vec<Operation>, SchedulerError> {
    let by_id: FxHashMap<&str, &Operation> =
        operations.iter().map(|op| (op.id.as_str(), op)).collect();
    let mut anchors: FxHashMap<&str, DateTime<Utc>> = drum
        .iter()
        .filter_map(|op| Some((op.id.as_str(), op.end_time?)))
        .collect();

    let mut placed: FxHashMap<&str, Operation> = FxHashMap::default();
    for &id in topo_order {
        if excluded.contains(id) {
            continue;
        }
        let Some(op) = by_id.get(id) else {
            continue;
        };
        if !op.is_reschedulable() {
            continue;
        }
        let Some(ready) = ready_time(id, index, &anchors)? else {
            continue;
        };

        let successor = place_successor(op, ready, config.shipping_buffer_ratio)?;
        log_decision!(
            config.verbosity,
            "downstream chain {} [{:?} .. {:?})",
            successor.id,
            successor.start_time,
            successor.end_time
        );
        if let Some(end) = successor.end_time {
            anchors.insert(id, end);
        }
        placed.insert(id, successor);
    }

    let downstream: Vec<Operation> = operations
        .iter()
        .filter_map(|op| placed.remove(op.id.as_str()))
        .collect();
    log_stage!(
        config.verbosity,
        "{} downstream operation(s) incl. chains",
        downstream.len()
    );
    Ok(downstream)
}
