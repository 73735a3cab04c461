//! Configuration for the Drum-Buffer-Rope engine.

use crate::scheduler::SchedulerError;

/// Tuning knobs for one scheduling run.
#[derive(Clone, Debug)]
pub struct DbrConfig {
    /// Constraint buffer as a fraction of a feeding operation's total time.
    pub constraint_buffer_ratio: f64,
    /// Shipping buffer as a fraction of a downstream operation's total time.
    pub shipping_buffer_ratio: f64,
    /// Capacity of every resource over the planning window, in hours.
    pub available_hours: f64,
    /// Reject cyclic dependency graphs before scheduling.
    pub validate_dag: bool,
    /// Also schedule transitive feeders and transitive downstream operations.
    pub schedule_chains: bool,
    /// Verbosity level: 0=silent, 1=stages, 2=decisions, 3=trace.
    pub verbosity: u8,
}

impl Default for DbrConfig {
    fn default() -> Self {
        Self {
            constraint_buffer_ratio: 0.25,
            shipping_buffer_ratio: 0.15,
            available_hours: 40.0,
            validate_dag: true,
            schedule_chains: false,
            verbosity: 0,
        }
    }
}

impl DbrConfig {
    /// Check that ratios and capacity are usable.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        for (name, ratio) in [
            ("constraint_buffer_ratio", self.constraint_buffer_ratio),
            ("shipping_buffer_ratio", self.shipping_buffer_ratio),
        ] {
            if !ratio.is_finite() || ratio < 0.0 {
                return Err(SchedulerError::InvalidConfig(format!(
                    "{} must be a non-negative number, got {}",
                    name, ratio
                )));
            }
        }
        if !self.available_hours.is_finite() || self.available_hours <= 0.0 {
            return Err(SchedulerError::InvalidConfig(format!(
                "available_hours must be positive, got {}",
                self.available_hours
            )));
        }
        Ok(())
    }
}
