//! Feeding scheduling: backward-place work that feeds the drum.
//!
//! A feeder must be finished a constraint buffer ahead of the drum
//! operation it supplies, so the drum is never starved:
//!
//! ```text
//! end   = earliest(drum.start - lag) - ratio * (duration + setup)
//! start = end - (duration + setup)
//! ```

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;

use crate::config::DbrConfig;
use crate::graph::DependencyIndex;
use crate::models::{sub_hours, ConstraintTag, Operation, CONSTRAINT_FEEDING};
use crate::{log_decision, log_stage};

use super::SchedulerError;

/// Copy `op` and place it to finish a constraint buffer before `limit`.
fn place_feeder(
    op: &Operation,
    limit: DateTime<Utc>,
    ratio: f64,
) -> Result<Operation, SchedulerError> {
    let buffer_hours = ratio * op.total_hours();
    let end = sub_hours(limit, buffer_hours).ok_or_else(|| SchedulerError::OutOfRange {
        operation: op.id.clone(),
    })?;
    let mut placed = op.clone();
    placed.place_ending_at(end)?;
    placed.set_engine_tag(ConstraintTag::new(CONSTRAINT_FEEDING, buffer_hours));
    Ok(placed)
}

/// Latest allowed finish for `id`, given the start times of the successors in `anchors`.
fn finish_limit(
    id: &str,
    index: &DependencyIndex<'_>,
    anchors: &FxHashMap<&str, DateTime<Utc>>,
) -> Result<Option<DateTime<Utc>>, SchedulerError> {
    let mut limit: Option<DateTime<Utc>> = None;
    for edge in index.successors(id) {
        let Some(start) = anchors.get(edge.operation) else {
            continue;
        };
        let latest = sub_hours(*start, edge.lag_hours).ok_or_else(|| {
            SchedulerError::OutOfRange {
                operation: id.to_string(),
            }
        })?;
        limit = Some(limit.map_or(latest, |l| l.min(latest)));
    }
    Ok(limit)
}

/// Backward-place every operation with a dependency edge into a drum operation.
///
/// A feeder of several drum operations is placed against the earliest
/// starting one. A feeder whose drum successor has no start time is left
/// unscheduled. Results come back in input order.
pub fn schedule_feeding(
    operations: &[Operation],
    drum: &[Operation],
    index: &DependencyIndex<'_>,
    config: &DbrConfig,
) -> Result<Vec<Operation>, SchedulerError> {
    let drum_by_id: FxHashMap<&str, &Operation> =
        drum.iter().map(|op| (op.id.as_str(), op)).collect();
    let drum_starts: FxHashMap<&str, DateTime<Utc>> = drum
        .iter()
        .filter_map(|op| Some((op.id.as_str(), op.start_time?)))
        .collect();

    let mut feeding: Vec<Operation> = Vec::new();
    for op in operations {
        if drum_by_id.contains_key(op.id.as_str()) || !op.is_reschedulable() {
            continue;
        }
        let feeds_drum = index
            .successors(&op.id)
            .iter()
            .any(|edge| drum_by_id.contains_key(edge.operation));
        if !feeds_drum {
            continue;
        }

        match finish_limit(&op.id, index, &drum_starts)? {
            Some(limit) => {
                let placed = place_feeder(op, limit, config.constraint_buffer_ratio)?;
                log_decision!(
                    config.verbosity,
                    "feeding {} [{:?} .. {:?})",
                    placed.id,
                    placed.start_time,
                    placed.end_time
                );
                feeding.push(placed);
            }
            None => {
                log_decision!(
                    config.verbosity,
                    "feeding {} left unscheduled: drum successor has no start time",
                    op.id
                );
            }
        }
    }

    log_stage!(config.verbosity, "{} feeding operation(s)", feeding.len());
    Ok(feeding)
}

/// Backward-place direct and transitive feeders of the drum.
///
/// Walks the graph in reverse topological order so every successor is placed
/// before its predecessors. Each feeder finishes a constraint buffer before
/// the earliest of its drum and feeding successors, so a chain of feeders
/// never overlaps itself. Results come back in input order.
pub fn schedule_feeding_chains(
    operations: &[Operation],
    topo_order: &[&str],
    drum: &[Operation],
    index: &DependencyIndex<'_>,
    config: &DbrConfig,
) -> Result<Vec<Operation>, SchedulerError> {
    let by_id: FxHashMap<&str, &Operation> =
        operations.iter().map(|op| (op.id.as_str(), op)).collect();
    let mut anchors: FxHashMap<&str, DateTime<Utc>> = drum
        .iter()
        .filter_map(|op| Some((op.id.as_str(), op.start_time?)))
        .collect();
    let drum_ids: Vec<&str> = drum.iter().map(|op| op.id.as_str()).collect();

    let mut placed: FxHashMap<&str, Operation> = FxHashMap::default();
    for &id in topo_order.iter().rev() {
        if drum_ids.contains(&id) {
            continue;
        }
        let Some(op) = by_id.get(id) else {
            continue;
        };
        if !op.is_reschedulable() {
            continue;
        }
        let Some(limit) = finish_limit(id, index, &anchors)? else {
            continue;
        };

        let feeder = place_feeder(op, limit, config.constraint_buffer_ratio)?;
        log_decision!(
            config.verbosity,
            "feeding chain {} [{:?} .. {:?})",
            feeder.id,
            feeder.start_time,
            feeder.end_time
        );
        if let Some(start) = feeder.start_time {
            anchors.insert(id, start);
        }
        placed.insert(id, feeder);
    }

    let feeding: Vec<Operation> = operations
        .iter()
        .filter_map(|op| placed.remove(op.id.as_str()))
        .collect();
    log_stage!(config.verbosity, "{} feeding operation(s) incl. chains", feeding.len());
    Ok(feeding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::DagCheck;
    use crate::models::Dependency;
    use chrono::{Duration, TimeZone};

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, minute, 0).unwrap()
    }

    fn drum_op(id: &str, start: DateTime<Utc>, hours: f64) -> Operation {
        let mut op = Operation::new(id, hours).on_resource("DRUM");
        op.place_at(start).unwrap();
        op
    }

    #[test]
    fn test_feeder_ends_buffer_before_drum() {
        let operations = vec![
            Operation::new("A", 4.0).on_resource("DRUM"),
            Operation::new("B", 2.0).on_resource("M2"),
        ];
        let drum = vec![drum_op("A", at(0, 0), 4.0)];
        let deps = vec![Dependency::new("B", "A")];
        let index = DependencyIndex::build(&deps);

        let feeding =
            schedule_feeding(&operations, &drum, &index, &DbrConfig::default()).unwrap();

        assert_eq!(feeding.len(), 1);
        let b = &feeding[0];
        assert_eq!(b.end_time, Some(at(0, 0) - Duration::minutes(30)));
        assert_eq!(b.start_time, Some(at(0, 0) - Duration::minutes(150)));
        assert_eq!(b.constraints[0].kind, CONSTRAINT_FEEDING);
        assert_eq!(b.constraints[0].value, serde_json::json!(0.5));
    }

    #[test]
    fn test_feeder_of_two_drums_uses_earliest() {
        let operations = vec![
            Operation::new("D1", 4.0).on_resource("DRUM"),
            Operation::new("D2", 2.0).on_resource("DRUM"),
            Operation::new("F", 1.0).with_setup(1.0).on_resource("M2"),
        ];
        let drum = vec![drum_op("D1", at(4, 0), 4.0), drum_op("D2", at(8, 0), 2.0)];
        let deps = vec![Dependency::new("F", "D2"), Dependency::new("F", "D1")];
        let index = DependencyIndex::build(&deps);

        let feeding =
            schedule_feeding(&operations, &drum, &index, &DbrConfig::default()).unwrap();

        assert_eq!(feeding.len(), 1);
        assert_eq!(feeding[0].end_time, Some(at(3, 30)));
        assert_eq!(feeding[0].start_time, Some(at(1, 30)));
    }

    #[test]
    fn test_lag_pulls_feeder_earlier() {
        let operations = vec![Operation::new("B", 2.0)];
        let drum = vec![drum_op("A", at(10, 0), 4.0)];
        let deps = vec![Dependency::new("B", "A").with_lag(1.0)];
        let index = DependencyIndex::build(&deps);

        let feeding =
            schedule_feeding(&operations, &drum, &index, &DbrConfig::default()).unwrap();
        assert_eq!(feeding[0].end_time, Some(at(8, 30)));
    }

    #[test]
    fn test_unrelated_and_locked_operations_ignored() {
        let operations = vec![
            Operation::new("free", 2.0),
            Operation::new("locked", 2.0).locked_at(at(1, 0), at(3, 0)),
        ];
        let drum = vec![drum_op("A", at(5, 0), 1.0)];
        let deps = vec![Dependency::new("locked", "A")];
        let index = DependencyIndex::build(&deps);

        let feeding =
            schedule_feeding(&operations, &drum, &index, &DbrConfig::default()).unwrap();
        assert!(feeding.is_empty());
    }

    #[test]
    fn test_unresolved_drum_start_leaves_feeder_alone() {
        let operations = vec![Operation::new("B", 2.0)];
        let drum = vec![Operation::new("A", 4.0).on_resource("DRUM")];
        let deps = vec![Dependency::new("B", "A")];
        let index = DependencyIndex::build(&deps);

        let feeding =
            schedule_feeding(&operations, &drum, &index, &DbrConfig::default()).unwrap();
        assert!(feeding.is_empty());
    }

    #[test]
    fn test_transitive_feeders_only_with_chains() {
        let operations = vec![
            Operation::new("A", 4.0).on_resource("DRUM"),
            Operation::new("B", 2.0),
            Operation::new("C", 1.0),
        ];
        let drum = vec![drum_op("A", at(10, 0), 4.0)];
        let deps = vec![Dependency::new("C", "B"), Dependency::new("B", "A")];
        let index = DependencyIndex::build(&deps);
        let DagCheck::Valid(order) = index.topological_order(&operations) else {
            panic!("expected a DAG");
        };
        let config = DbrConfig::default();

        let direct = schedule_feeding(&operations, &drum, &index, &config).unwrap();
        assert_eq!(direct.len(), 1);

        let chained =
            schedule_feeding_chains(&operations, &order, &drum, &index, &config).unwrap();
        let ids: Vec<&str> = chained.iter().map(|op| op.id.as_str()).collect();
        assert_eq!(ids, vec!["B", "C"]);
        // B: ends 09:30, starts 07:30
        assert_eq!(chained[0].start_time, Some(at(7, 30)));
        // C: ends 07:30 - 0.25h = 07:15, starts 06:15
        assert_eq!(chained[1].end_time, Some(at(7, 15)));
        assert_eq!(chained[1].start_time, Some(at(6, 15)));
    }

    #[test]
    fn test_feeder_past_calendar_is_an_error() {
        let operations = vec![Operation::new("B", 2.0e9)];
        let drum = vec![drum_op("A", at(0, 0), 1.0)];
        let deps = vec![Dependency::new("B", "A")];
        let index = DependencyIndex::build(&deps);

        let result = schedule_feeding(&operations, &drum, &index, &DbrConfig::default());
        assert!(matches!(
            result,
            Err(SchedulerError::OutOfRange { operation }) if operation == "B"
        ));
    }
}
