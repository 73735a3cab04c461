//! Schedule data model shared with the surrounding planning system.
//!
//! Field names follow the camelCase payload the planning service exchanges,
//! timestamps travel as ISO-8601 strings.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::scheduler::SchedulerError;

/// Constraint tag kind for operations on the drum resource.
pub const DRUM_OPERATION: &str = "DRUM_OPERATION";
/// Constraint tag kind for operations feeding the drum.
pub const CONSTRAINT_FEEDING: &str = "CONSTRAINT_FEEDING";
/// Constraint tag kind for operations downstream of the drum.
pub const SHIPPING_BUFFER: &str = "SHIPPING_BUFFER";
/// Value written to `schedulingMethod` metadata.
pub const SCHEDULING_METHOD: &str = "DRUM-TOC";

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

const ENGINE_TAGS: [&str; 3] = [DRUM_OPERATION, CONSTRAINT_FEEDING, SHIPPING_BUFFER];

/// Convert fractional hours to a millisecond-precision duration.
///
/// Returns `None` when the value does not fit a `Duration`.
pub fn hours_to_duration(hours: f64) -> Option<Duration> {
    let millis = (hours * MILLIS_PER_HOUR).round();
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return None;
    }
    Some(Duration::milliseconds(millis as i64))
}

/// `at` moved forward by `hours`, or `None` past the representable calendar.
pub fn add_hours(at: DateTime<Utc>, hours: f64) -> Option<DateTime<Utc>> {
    hours_to_duration(hours).and_then(|delta| at.checked_add_signed(delta))
}

/// `at` moved back by `hours`, or `None` past the representable calendar.
pub fn sub_hours(at: DateTime<Utc>, hours: f64) -> Option<DateTime<Utc>> {
    hours_to_duration(hours).and_then(|delta| at.checked_sub_signed(delta))
}

/// A free-form constraint marker attached to an operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConstraintTag {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub value: Value,
}

impl ConstraintTag {
    pub fn new(kind: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }
}

/// A unit of work to be placed on the timeline.
///
/// `duration` and `setup_time` are in hours. An operation with
/// `manually_scheduled` set and a start time is locked: the engine never
/// moves it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub duration: f64,
    #[serde(default)]
    pub setup_time: Option<f64>,
    #[serde(default)]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub manually_scheduled: bool,
    #[serde(default)]
    pub constraints: Vec<ConstraintTag>,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

impl Operation {
    /// Create an unassigned, unscheduled operation.
    pub fn new(id: impl Into<String>, duration_hours: f64) -> Self {
        Self {
            id: id.into(),
            name: None,
            duration: duration_hours,
            setup_time: None,
            resource_id: None,
            start_time: None,
            end_time: None,
            manually_scheduled: false,
            constraints: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_setup(mut self, setup_hours: f64) -> Self {
        self.setup_time = Some(setup_hours);
        self
    }

    pub fn on_resource(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    /// Pin the operation to a fixed interval.
    pub fn locked_at(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start_time = Some(start);
        self.end_time = Some(end);
        self.manually_scheduled = true;
        self
    }

    /// Processing plus setup, in hours.
    pub fn total_hours(&self) -> f64 {
        self.duration + self.setup_time.unwrap_or(0.0)
    }

    /// Assigned resource, treating an empty id as unassigned.
    pub fn assigned_resource(&self) -> Option<&str> {
        self.resource_id.as_deref().filter(|r| !r.is_empty())
    }

    pub fn is_locked(&self) -> bool {
        self.manually_scheduled && self.start_time.is_some()
    }

    /// Whether the engine may give this operation a fresh interval.
    pub fn is_reschedulable(&self) -> bool {
        !self.is_locked() && self.total_hours() > 0.0
    }

    pub fn has_tag(&self, kind: &str) -> bool {
        self.constraints.iter().any(|c| c.kind == kind)
    }

    /// Record the engine tag for this run.
    ///
    /// Engine tags of other kinds are dropped and an existing tag of the same
    /// kind gets the new value. Caller-supplied tags are left alone.
    pub fn set_engine_tag(&mut self, tag: ConstraintTag) {
        self.constraints
            .retain(|c| c.kind == tag.kind || !ENGINE_TAGS.contains(&c.kind.as_str()));
        match self.constraints.iter_mut().find(|c| c.kind == tag.kind) {
            Some(existing) => existing.value = tag.value,
            None => self.constraints.push(tag),
        }
    }

    fn out_of_range(&self) -> SchedulerError {
        SchedulerError::OutOfRange {
            operation: self.id.clone(),
        }
    }

    /// Set start and derive end from the operation's total time.
    pub fn place_at(&mut self, start: DateTime<Utc>) -> Result<(), SchedulerError> {
        let end = add_hours(start, self.total_hours()).ok_or_else(|| self.out_of_range())?;
        self.start_time = Some(start);
        self.end_time = Some(end);
        Ok(())
    }

    /// Set end and derive start from the operation's total time.
    pub fn place_ending_at(&mut self, end: DateTime<Utc>) -> Result<(), SchedulerError> {
        let start = sub_hours(end, self.total_hours()).ok_or_else(|| self.out_of_range())?;
        self.start_time = Some(start);
        self.end_time = Some(end);
        Ok(())
    }
}

/// A capacity-bounded executor of operations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Precedence edge: `from_operation_id` must finish before `to_operation_id` starts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    pub from_operation_id: String,
    pub to_operation_id: String,
    /// Extra waiting time between the two operations, in hours.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lag: Option<f64>,
}

impl Dependency {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from_operation_id: from.into(),
            to_operation_id: to.into(),
            lag: None,
        }
    }

    pub fn with_lag(mut self, lag_hours: f64) -> Self {
        self.lag = Some(lag_hours);
        self
    }

    pub fn lag_hours(&self) -> f64 {
        self.lag.unwrap_or(0.0)
    }
}

/// Top-level payload metadata. Unknown keys are carried through untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horizon_start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottleneck_resource: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottleneck_utilization: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduling_method: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// The schedule-data payload consumed and produced by the engine.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleData {
    pub operations: Vec<Operation>,
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ScheduleMetadata>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ScheduleData {
    pub fn horizon_start(&self) -> Option<DateTime<Utc>> {
        self.metadata.as_ref().and_then(|m| m.horizon_start)
    }

    pub fn operation(&self, id: &str) -> Option<&Operation> {
        self.operations.iter().find(|op| op.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_total_hours_includes_setup() {
        let op = Operation::new("A", 4.0).with_setup(0.5);
        assert_eq!(op.total_hours(), 4.5);
        assert_eq!(Operation::new("B", 2.0).total_hours(), 2.0);
    }

    #[test]
    fn test_empty_resource_is_unassigned() {
        let op = Operation::new("A", 1.0).on_resource("");
        assert_eq!(op.assigned_resource(), None);
        let op = Operation::new("A", 1.0).on_resource("M1");
        assert_eq!(op.assigned_resource(), Some("M1"));
    }

    #[test]
    fn test_set_engine_tag_replaces_value() {
        let mut op = Operation::new("A", 1.0);
        op.set_engine_tag(ConstraintTag::new(CONSTRAINT_FEEDING, 0.25));
        op.set_engine_tag(ConstraintTag::new(CONSTRAINT_FEEDING, 0.5));
        assert_eq!(op.constraints, vec![ConstraintTag::new(CONSTRAINT_FEEDING, 0.5)]);
    }

    #[test]
    fn test_set_engine_tag_drops_stale_kinds_only() {
        let mut op = Operation::new("A", 1.0);
        op.constraints.push(ConstraintTag::new("CUSTOM", 1));
        op.set_engine_tag(ConstraintTag::new(DRUM_OPERATION, true));
        op.set_engine_tag(ConstraintTag::new(SHIPPING_BUFFER, 0.15));

        let kinds: Vec<&str> = op.constraints.iter().map(|c| c.kind.as_str()).collect();
        assert_eq!(kinds, vec!["CUSTOM", SHIPPING_BUFFER]);
    }

    #[test]
    fn test_place_at_and_ending_at() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut op = Operation::new("A", 1.5).with_setup(0.5);
        op.place_at(t0).unwrap();
        assert_eq!(op.end_time, Some(t0 + Duration::hours(2)));

        op.place_ending_at(t0).unwrap();
        assert_eq!(op.start_time, Some(t0 - Duration::hours(2)));
        assert_eq!(op.end_time, Some(t0));
    }

    #[test]
    fn test_placement_past_calendar_is_an_error() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut op = Operation::new("huge", 1.0e10);

        assert!(matches!(
            op.place_at(t0),
            Err(SchedulerError::OutOfRange { operation }) if operation == "huge"
        ));
        assert!(op.place_ending_at(t0).is_err());
        assert_eq!(op.start_time, None);
        assert_eq!(op.end_time, None);
    }

    #[test]
    fn test_hours_conversion() {
        assert_eq!(hours_to_duration(0.15), Some(Duration::minutes(9)));
        assert_eq!(hours_to_duration(f64::MAX), None);
        assert_eq!(hours_to_duration(f64::NAN), None);
    }

    #[test]
    fn test_payload_wire_shape() {
        let json = r#"{
            "operations": [
                {"id": "A", "duration": 4, "setupTime": null, "resourceId": "M1",
                 "constraints": [{"type": "CUSTOM", "value": 1}]}
            ],
            "resources": [{"id": "M1", "name": "Kiln"}],
            "dependencies": [{"fromOperationId": "B", "toOperationId": "A"}],
            "metadata": {"horizonStart": "2024-01-01T00:00:00Z", "plantId": "7"},
            "version": "v1"
        }"#;
        let data: ScheduleData = serde_json::from_str(json).unwrap();

        assert_eq!(data.operations[0].total_hours(), 4.0);
        assert_eq!(data.operations[0].constraints[0].kind, "CUSTOM");
        assert_eq!(data.dependencies[0].lag_hours(), 0.0);
        assert_eq!(
            data.horizon_start(),
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
        let metadata = data.metadata.as_ref().unwrap();
        assert_eq!(metadata.extra.get("plantId"), Some(&Value::from("7")));
        assert_eq!(data.extra.get("version"), Some(&Value::from("v1")));

        let out = serde_json::to_value(&data).unwrap();
        assert_eq!(out["operations"][0]["resourceId"], "M1");
        assert_eq!(out["metadata"]["horizonStart"], "2024-01-01T00:00:00Z");
        assert_eq!(out["metadata"]["plantId"], "7");
        assert_eq!(out["version"], "v1");
    }
}
