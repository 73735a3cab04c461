//! Drum-Buffer-Rope engine orchestration.

use chrono::Utc;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::bottleneck::{identify_bottleneck, resource_loads, Bottleneck, ResourceLoad};
use crate::config::DbrConfig;
use crate::graph::{DagCheck, DependencyIndex};
use crate::models::{Operation, ScheduleData, SCHEDULING_METHOD};
use crate::validation::validate_input;
use crate::{log_stage, log_trace};

use super::annotate::annotate;
use super::downstream::{schedule_downstream, schedule_downstream_chains};
use super::drum::schedule_drum;
use super::feeding::{schedule_feeding, schedule_feeding_chains};
use super::state::{EnginePhase, EngineState};

/// Errors that can occur during scheduling.
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Circular dependency detected among operations: {0:?}")]
    CircularDependency(Vec<String>),
    #[error("Duplicate operation id: {0}")]
    DuplicateOperation(String),
    #[error("Dependency {from} -> {to} references an unknown operation")]
    UnknownOperation { from: String, to: String },
    #[error("Operation {operation} has an invalid time value: {value}")]
    InvalidDuration { operation: String, value: f64 },
    #[error("Operation {operation} would be placed outside the supported date range")]
    OutOfRange { operation: String },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Invalid schedule payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Everything a scheduling run produced.
#[derive(Clone, Debug)]
pub struct DbrOutcome {
    /// The input payload with drum, feeding and downstream operations re-timed.
    pub schedule: ScheduleData,
    pub bottleneck: Bottleneck,
    /// Load on every resource, in the order resources first appear.
    pub resource_loads: Vec<ResourceLoad>,
    /// Drum operation ids in timeline order.
    pub drum_operations: Vec<String>,
    /// Feeding operation ids in input order.
    pub feeding_operations: Vec<String>,
    /// Downstream operation ids in input order.
    pub downstream_operations: Vec<String>,
    /// Phases visited, `Idle` through `Done`.
    pub phases: Vec<EnginePhase>,
}

fn operation_ids(operations: &[Operation]) -> Vec<String> {
    operations.iter().map(|op| op.id.clone()).collect()
}

/// Drum-Buffer-Rope scheduler for one payload.
///
/// All indices are built from the payload on each call to
/// [`schedule`](Self::schedule); nothing is shared between instances.
pub struct DrumBufferRopeScheduler {
    data: ScheduleData,
    config: DbrConfig,
    state: EngineState,
}

impl DrumBufferRopeScheduler {
    /// Validate configuration and payload and prepare a run.
    pub fn new(data: ScheduleData, config: DbrConfig) -> Result<Self, SchedulerError> {
        config.validate()?;
        validate_input(&data)?;
        let state = EngineState::new(config.verbosity);
        Ok(Self {
            data,
            config,
            state,
        })
    }

    pub fn phase(&self) -> EnginePhase {
        self.state.phase()
    }

    /// Run every stage and assemble the new schedule.
    pub fn schedule(&mut self) -> Result<DbrOutcome, SchedulerError> {
        let verbosity = self.config.verbosity;
        self.state = EngineState::new(verbosity);
        let operations = &self.data.operations;

        let index = DependencyIndex::build(&self.data.dependencies);
        log_trace!(
            verbosity,
            "indexed {} dependency edge(s) over {} operation(s)",
            self.data.dependencies.len(),
            operations.len()
        );
        let topo_order = if self.config.validate_dag || self.config.schedule_chains {
            match index.topological_order(operations) {
                DagCheck::Valid(order) => Some(order),
                DagCheck::Cyclic(blocked) => {
                    return Err(SchedulerError::CircularDependency(blocked))
                }
            }
        } else {
            None
        };

        let horizon_start = self.data.horizon_start().unwrap_or_else(Utc::now);

        // Bottleneck
        let loads = resource_loads(operations, self.config.available_hours);
        for load in &loads {
            log_trace!(
                verbosity,
                "load {}: {:.2}h ({:.1}%)",
                load.resource_id,
                load.committed_hours,
                load.utilization
            );
        }
        let bottleneck = identify_bottleneck(&loads);
        if bottleneck.is_none() {
            log_stage!(verbosity, "no resource carries load, passing schedule through");
        } else {
            log_stage!(
                verbosity,
                "bottleneck {} at {:.1}% utilization",
                bottleneck.resource_id,
                bottleneck.utilization
            );
        }
        self.state.advance();

        // Drum
        let mut drum = schedule_drum(operations, &bottleneck, horizon_start, verbosity)?;
        self.state.advance();

        // Feeding and downstream
        let mut feeding = match (&topo_order, self.config.schedule_chains) {
            (Some(order), true) => {
                schedule_feeding_chains(operations, order, &drum, &index, &self.config)?
            }
            _ => schedule_feeding(operations, &drum, &index, &self.config)?,
        };
        let mut downstream = {
            let excluded: FxHashSet<&str> = drum
                .iter()
                .chain(feeding.iter())
                .map(|op| op.id.as_str())
                .collect();
            match (&topo_order, self.config.schedule_chains) {
                (Some(order), true) => schedule_downstream_chains(
                    operations,
                    order,
                    &drum,
                    &excluded,
                    &index,
                    &self.config,
                )?,
                _ => schedule_downstream(operations, &drum, &excluded, &index, &self.config)?,
            }
        };
        self.state.advance();

        // Annotation
        annotate(&mut drum, &bottleneck);
        annotate(&mut feeding, &bottleneck);
        annotate(&mut downstream, &bottleneck);
        self.state.advance();

        let drum_operations = operation_ids(&drum);
        let feeding_operations = operation_ids(&feeding);
        let downstream_operations = operation_ids(&downstream);

        let mut rescheduled: FxHashMap<String, Operation> = FxHashMap::default();
        for op in drum.into_iter().chain(feeding).chain(downstream) {
            rescheduled.insert(op.id.clone(), op);
        }
        let assembled: Vec<Operation> = operations
            .iter()
            .map(|op| rescheduled.remove(&op.id).unwrap_or_else(|| op.clone()))
            .collect();

        let mut metadata = self.data.metadata.clone().unwrap_or_default();
        metadata.bottleneck_resource = Some(bottleneck.resource_id.clone());
        metadata.bottleneck_utilization = Some(bottleneck.utilization);
        metadata.scheduling_method = Some(SCHEDULING_METHOD.to_string());

        let schedule = ScheduleData {
            operations: assembled,
            resources: self.data.resources.clone(),
            dependencies: self.data.dependencies.clone(),
            metadata: Some(metadata),
            extra: self.data.extra.clone(),
        };
        self.state.advance();
        log_stage!(
            verbosity,
            "done: {} drum, {} feeding, {} downstream",
            drum_operations.len(),
            feeding_operations.len(),
            downstream_operations.len()
        );

        Ok(DbrOutcome {
            schedule,
            bottleneck,
            resource_loads: loads,
            drum_operations,
            feeding_operations,
            downstream_operations,
            phases: self.state.history().to_vec(),
        })
    }
}
