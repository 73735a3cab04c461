//! Tag scheduled operations with their TOC provenance.

use serde_json::Value;

use crate::bottleneck::Bottleneck;
use crate::models::{Operation, SCHEDULING_METHOD};

/// Metadata key naming the method that produced an operation's times.
pub const METADATA_SCHEDULING_METHOD: &str = "schedulingMethod";
/// Metadata key set on operations that run on the bottleneck.
pub const METADATA_IS_BOTTLENECK: &str = "isBottleneck";
/// Metadata key carrying the bottleneck utilization percentage.
pub const METADATA_BOTTLENECK_UTILIZATION: &str = "bottleneckUtilization";

/// Attach scheduling-method and bottleneck metadata.
///
/// No times are touched. Keys are overwritten rather than appended, so
/// running the pass twice leaves the same metadata. Bottleneck keys left
/// from an earlier run are removed from operations off the bottleneck.
pub fn annotate(operations: &mut [Operation], bottleneck: &Bottleneck) {
    for op in operations.iter_mut() {
        op.metadata.insert(
            METADATA_SCHEDULING_METHOD.to_string(),
            Value::from(SCHEDULING_METHOD),
        );
        if !bottleneck.is_none()
            && op.assigned_resource() == Some(bottleneck.resource_id.as_str())
        {
            op.metadata
                .insert(METADATA_IS_BOTTLENECK.to_string(), Value::from(true));
            op.metadata.insert(
                METADATA_BOTTLENECK_UTILIZATION.to_string(),
                Value::from(bottleneck.utilization),
            );
        } else {
            op.metadata.remove(METADATA_IS_BOTTLENECK);
            op.metadata.remove(METADATA_BOTTLENECK_UTILIZATION);
        }
    }
}
