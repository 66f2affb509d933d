// The latency probe: one timed pointer chase per working-set size.

use std::time::{Duration, Instant};

use rand::Rng;

use crate::ProbeError;
use crate::working_set::{SLOT_BYTES, WorkingSet};

/// Dependent loads per measurement, the same for every working-set size.
pub const DEFAULT_STEPS: usize = 100_000_000;

/// 128 slots of 8 bytes, i.e. 1 KB.
pub const DEFAULT_START_ELEMENTS: usize = 128;

/// Doublings from the start size; 27 takes 1 KB up to 64 GB.
pub const DEFAULT_SIZE_STEPS: usize = 27;

/// Result of timing one working set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencyMeasurement {
    pub element_count: usize,
    pub steps: usize,
    pub elapsed: Duration,
    /// Sum of everything the probe read. Only here so the loads are
    /// observed; the value itself means nothing.
    pub checksum: u64,
}

impl LatencyMeasurement {
    pub fn size_in_bytes(&self) -> usize {
        self.element_count * SLOT_BYTES
    }

    pub fn runtime_ns(&self) -> u128 {
        self.elapsed.as_nanos()
    }

    pub fn ns_per_access(&self) -> f64 {
        if self.steps == 0 {
            return 0.0;
        }
        self.elapsed.as_nanos() as f64 / self.steps as f64
    }
}

/// Builds a fresh random cyclic working set of `element_count` slots,
/// touches every slot once and then times `steps` dependent loads
/// starting at slot 0.
///
/// Only the chase itself is inside the timed region. Allocation failure
/// is returned as [`ProbeError::Allocation`] and should end the run.
///
/// __Arguments:__
///
/// + `element_count` - number of 64-bit slots in the working set
///
/// + `steps` - number of dependent loads to time
///
/// + `rng` - randomness for the permutation
///
pub fn measure_latency<R: Rng + ?Sized>(
    element_count: usize,
    steps: usize,
    rng: &mut R,
) -> Result<LatencyMeasurement, ProbeError> {
    let working_set = WorkingSet::try_new_cyclic(element_count, rng)?;
    log::debug!(
        "allocated and shuffled {} elements ({} bytes)",
        element_count,
        working_set.size_in_bytes()
    );

    let warm_up_sum = working_set.warm_up();

    let start = Instant::now();
    let outcome = working_set.chase(0, steps);
    let elapsed = start.elapsed();

    Ok(LatencyMeasurement {
        element_count,
        steps: outcome.steps,
        elapsed,
        checksum: warm_up_sum.wrapping_add(outcome.checksum),
    })
}

/// Geometric sequence of working-set sizes: `start_elements << i` for
/// `i` in `0..size_steps`. Sizes that would overflow `usize` are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeSchedule {
    pub start_elements: usize,
    pub size_steps: usize,
}

impl Default for SizeSchedule {
    fn default() -> Self {
        Self {
            start_elements: DEFAULT_START_ELEMENTS,
            size_steps: DEFAULT_SIZE_STEPS,
        }
    }
}

impl SizeSchedule {
    pub fn element_counts(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.size_steps).map_while(|i| {
            let factor = 1usize.checked_shl(u32::try_from(i).ok()?)?;
            self.start_elements.checked_mul(factor)
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepConfig {
    pub schedule: SizeSchedule,
    pub steps: usize,
    pub runs: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            schedule: SizeSchedule::default(),
            steps: DEFAULT_STEPS,
            runs: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepRecord {
    pub run_id: usize,
    pub measurement: LatencyMeasurement,
}

#[derive(Debug, Clone, Default)]
pub struct SweepSummary {
    pub records: Vec<SweepRecord>,
    /// Wrapping sum of every measurement's checksum.
    pub checksum: u64,
}

/// Runs the full schedule `config.runs` times, calling `on_record` as
/// soon as each measurement is available.
///
/// Stops at the first error; records already taken are lost with it,
/// since a sweep with a hole in it cannot be compared across machines.
pub fn run_sweep<R, F>(
    config: &SweepConfig,
    rng: &mut R,
    mut on_record: F,
) -> Result<SweepSummary, ProbeError>
where
    R: Rng + ?Sized,
    F: FnMut(&SweepRecord),
{
    let mut summary = SweepSummary::default();

    for run_id in 0..config.runs {
        log::info!("starting run {} of {}", run_id + 1, config.runs);

        for element_count in config.schedule.element_counts() {
            let measurement = measure_latency(element_count, config.steps, rng)?;
            let record = SweepRecord {
                run_id,
                measurement,
            };

            summary.checksum = summary.checksum.wrapping_add(measurement.checksum);
            on_record(&record);
            summary.records.push(record);
        }
    }

    Ok(summary)
}
