//! Verbosity-gated logging for the scheduling engine.
//!
//! Every macro compiles down to a single integer comparison when the
//! configured verbosity is below its level, so silent runs pay nothing.
//!
//! - 0: SILENT
//! - 1: STAGES (bottleneck choice, phase transitions, per-stage counts)
//! - 2: DECISIONS (each operation placed, skipped or left unscheduled)
//! - 3: TRACE (index construction, load tallies, busy-period walks)

pub const VERBOSITY_SILENT: u8 = 0;
pub const VERBOSITY_STAGES: u8 = 1;
pub const VERBOSITY_DECISIONS: u8 = 2;
pub const VERBOSITY_TRACE: u8 = 3;

/// Log a stage-level event (verbosity >= 1).
#[macro_export]
macro_rules! log_stage {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_STAGES {
            eprintln!("[dbr] {}", format_args!($($arg)*));
        }
    };
}

/// Log a per-operation scheduling decision (verbosity >= 2).
#[macro_export]
macro_rules! log_decision {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_DECISIONS {
            eprintln!("[dbr]   {}", format_args!($($arg)*));
        }
    };
}

/// Log algorithm internals (verbosity >= 3).
#[macro_export]
macro_rules! log_trace {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_TRACE {
            eprintln!("[dbr]     {}", format_args!($($arg)*));
        }
    };
}
