//! Bottleneck (drum) identification from committed resource load.

use rustc_hash::FxHashMap;

use crate::models::Operation;

/// Committed work on one resource over the planning window.
#[derive(Clone, Debug, PartialEq)]
pub struct ResourceLoad {
    pub resource_id: String,
    /// Sum of duration + setup across the resource's operations, in hours.
    pub committed_hours: f64,
    /// `committed_hours / available_hours`, as a percentage.
    pub utilization: f64,
}

/// The constraint resource chosen for a run.
///
/// An empty `resource_id` is the null bottleneck: nothing is scheduled
/// through the drum and the payload passes through.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Bottleneck {
    pub resource_id: String,
    pub utilization: f64,
}

impl Bottleneck {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_none(&self) -> bool {
        self.resource_id.is_empty()
    }
}

/// Tally load per resource, in the order resources first appear in `operations`.
///
/// Unassigned operations are skipped. Locked operations count: they occupy
/// capacity whether or not the engine may move them.
pub fn resource_loads(operations: &[Operation], available_hours: f64) -> Vec<ResourceLoad> {
    let mut slot_of: FxHashMap<&str, usize> = FxHashMap::default();
    let mut loads: Vec<ResourceLoad> = Vec::new();

    for op in operations {
        let Some(resource) = op.assigned_resource() else {
            continue;
        };
        let slot = *slot_of.entry(resource).or_insert_with(|| {
            loads.push(ResourceLoad {
                resource_id: resource.to_string(),
                committed_hours: 0.0,
                utilization: 0.0,
            });
            loads.len() - 1
        });
        loads[slot].committed_hours += op.total_hours();
    }

    for load in &mut loads {
        load.utilization = load.committed_hours / available_hours * 100.0;
    }
    loads
}

/// Pick the resource with the strictly highest utilization.
///
/// Ties go to the resource encountered first. Resources with no committed
/// time never qualify, so an all-idle plant yields [`Bottleneck::none`].
pub fn identify_bottleneck(loads: &[ResourceLoad]) -> Bottleneck {
    let mut best = Bottleneck::none();
    for load in loads {
        if load.utilization > best.utilization {
            best = Bottleneck {
                resource_id: load.resource_id.clone(),
                utilization: load.utilization,
            };
        }
    }
    best
}
