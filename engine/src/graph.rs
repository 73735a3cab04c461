//! Dependency adjacency index and topological ordering.
//!
//! The index is rebuilt for every scheduling run and borrows from the
//! caller's payload, so concurrent runs never share graph state.

use rustc_hash::FxHashMap;
use std::collections::VecDeque;

use crate::models::{Dependency, Operation};

/// One end of a precedence edge as seen from the other end.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Edge<'a> {
    pub operation: &'a str,
    pub lag_hours: f64,
}

/// Outcome of the DAG check.
#[derive(Clone, Debug, PartialEq)]
pub enum DagCheck<'a> {
    /// Operation ids ordered so every predecessor precedes its successors.
    Valid(Vec<&'a str>),
    /// Ids of operations that sit on or behind a cycle, in input order.
    Cyclic(Vec<String>),
}

/// Predecessor and successor lists keyed by operation id.
#[derive(Debug, Default)]
pub struct DependencyIndex<'a> {
    predecessors: FxHashMap<&'a str, Vec<Edge<'a>>>,
    successors: FxHashMap<&'a str, Vec<Edge<'a>>>,
}

impl<'a> DependencyIndex<'a> {
    pub fn build(dependencies: &'a [Dependency]) -> Self {
        let mut index = Self::default();
        for dep in dependencies {
            let from = dep.from_operation_id.as_str();
            let to = dep.to_operation_id.as_str();
            let lag_hours = dep.lag_hours();
            index.predecessors.entry(to).or_default().push(Edge {
                operation: from,
                lag_hours,
            });
            index.successors.entry(from).or_default().push(Edge {
                operation: to,
                lag_hours,
            });
        }
        index
    }

    /// Operations that must finish before `id` starts.
    pub fn predecessors(&self, id: &str) -> &[Edge<'a>] {
        self.predecessors.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Operations that wait on `id`.
    pub fn successors(&self, id: &str) -> &[Edge<'a>] {
        self.successors.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Order operations with Kahn's algorithm.
    ///
    /// Ready operations are released in input order so the result is
    /// reproducible. Edges touching ids outside `operations` are ignored.
    pub fn topological_order(&self, operations: &'a [Operation]) -> DagCheck<'a> {
        let mut in_degree: FxHashMap<&str, usize> = operations
            .iter()
            .map(|op| (op.id.as_str(), 0))
            .collect();

        for op in operations {
            for edge in self.successors(&op.id) {
                if let Some(degree) = in_degree.get_mut(edge.operation) {
                    *degree += 1;
                }
            }
        }

        let mut queue: VecDeque<&'a str> = operations
            .iter()
            .map(|op| op.id.as_str())
            .filter(|id| in_degree.get(id) == Some(&0))
            .collect();

        let mut order: Vec<&'a str> = Vec::with_capacity(operations.len());
        while let Some(id) = queue.pop_front() {
            order.push(id);
            for edge in self.successors(id) {
                if let Some(degree) = in_degree.get_mut(edge.operation) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(edge.operation);
                    }
                }
            }
        }

        if order.len() != in_degree.len() {
            let blocked = operations
                .iter()
                .filter(|op| in_degree.get(op.id.as_str()).is_some_and(|d| *d > 0))
                .map(|op| op.id.clone())
                .collect();
            return DagCheck::Cyclic(blocked);
        }

        DagCheck::Valid(order)
    }
}
