#[cfg(test)]
mod tests;

// Pointer-chasing latency probe and related memory benchmarks.
//
// The probe walks a random single-cycle permutation with one dependent
// load per step, so the time per step is the latency of whichever level
// of the memory hierarchy the working set lands in.

pub mod error;
pub mod host;
pub mod prefetch;
pub mod probe;
pub mod report;
pub mod working_set;

pub use error::ProbeError;
pub use probe::{LatencyMeasurement, SizeSchedule, SweepConfig, SweepRecord, measure_latency, run_sweep};
pub use working_set::{ChaseOutcome, WorkingSet};
