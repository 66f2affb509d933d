// Random gathers from a large vector, with and without software prefetch.
//
// Unlike the pointer chase, the positions here are known up front, so a
// prefetch issued `distance` accesses ahead can overlap with the current
// load. Every prefetching run must produce the same checksum as the
// plain run; anything else is a bug in the loop, not a timing effect.

use std::fmt;
use std::time::{Duration, Instant};

use rand::Rng;
use rand::seq::SliceRandom;

use crate::ProbeError;

pub const DEFAULT_VALUE_COUNT: usize = 1_000_000_000;
pub const DEFAULT_ACCESS_COUNT: usize = 10_000_000;
pub const DEFAULT_MEASUREMENTS: usize = 10;
pub const DEFAULT_DISTANCES: [usize; 9] = [1, 2, 4, 8, 16, 32, 64, 128, 256];

/// Expected temporal reuse of prefetched data, from "evict soon" (0) to
/// "keep in every cache level" (3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Locality {
    NonTemporal,
    Low,
    Moderate,
    High,
}

impl Locality {
    pub const ALL: [Locality; 4] = [
        Locality::NonTemporal,
        Locality::Low,
        Locality::Moderate,
        Locality::High,
    ];

    pub fn level(self) -> u8 {
        match self {
            Locality::NonTemporal => 0,
            Locality::Low => 1,
            Locality::Moderate => 2,
            Locality::High => 3,
        }
    }

    pub fn from_level(level: u8) -> Option<Self> {
        Self::ALL.get(usize::from(level)).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefetchMode {
    Disabled,
    Enabled { distance: usize, locality: Locality },
}

impl fmt::Display for PrefetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrefetchMode::Disabled => write!(f, "no prefetch"),
            PrefetchMode::Enabled { distance, locality } => write!(
                f,
                "prefetch distance {} (locality {})",
                distance,
                locality.level()
            ),
        }
    }
}

// each hint is a zero-sized type; `gather` is monomorphized per hint

trait PrefetchHint {
    const ENABLED: bool;
    fn prefetch(value: &u32);
}

struct NoPrefetch;

impl PrefetchHint for NoPrefetch {
    const ENABLED: bool = false;

    #[inline(always)]
    fn prefetch(_value: &u32) {}
}

// hint values follow the x86 encoding: 0 is NTA and 3 is T0, which
// lines up with `Locality::level`
struct Hint<const LEVEL: i32>;

impl<const LEVEL: i32> PrefetchHint for Hint<LEVEL> {
    const ENABLED: bool = true;

    #[inline(always)]
    fn prefetch(value: &u32) {
        prefetch_line::<LEVEL>(value);
    }
}

#[cfg(target_arch = "x86_64")]
#[inline(always)]
fn prefetch_line<const LEVEL: i32>(value: &u32) {
    // SAFETY: prefetch never faults and the address comes from a live reference.
    unsafe {
        std::arch::x86_64::_mm_prefetch::<LEVEL>((value as *const u32).cast::<i8>());
    }
}

#[cfg(not(target_arch = "x86_64"))]
#[inline(always)]
fn prefetch_line<const LEVEL: i32>(_value: &u32) {}

#[inline(always)]
fn gather<H: PrefetchHint>(values: &[u32], positions: &[u64], distance: usize) -> u64 {
    let len = positions.len();
    let mut checksum = 0u64;

    for offset in 0..len {
        if H::ENABLED {
            let ahead = positions[(offset + distance).min(len - 1)] as usize;
            if let Some(value) = values.get(ahead) {
                H::prefetch(value);
            }
        }

        checksum += u64::from(values[positions[offset] as usize] % 17);
    }

    checksum
}

/// Outcome of one pass over the position list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExperimentResult {
    pub mode: PrefetchMode,
    pub checksum: u64,
    pub elapsed: Duration,
}

/// Sums `values[p] % 17` for every `p` in `positions`, in order, and
/// times it.
///
/// Every position must be a valid index into `values`.
pub fn run_experiment(values: &[u32], positions: &[u64], mode: PrefetchMode) -> ExperimentResult {
    let start = Instant::now();
    let checksum = match mode {
        PrefetchMode::Disabled => gather::<NoPrefetch>(values, positions, 0),
        PrefetchMode::Enabled { distance, locality } => match locality {
            Locality::NonTemporal => gather::<Hint<0>>(values, positions, distance),
            Locality::Low => gather::<Hint<1>>(values, positions, distance),
            Locality::Moderate => gather::<Hint<2>>(values, positions, distance),
            Locality::High => gather::<Hint<3>>(values, positions, distance),
        },
    };
    let elapsed = start.elapsed();

    ExperimentResult {
        mode,
        checksum: std::hint::black_box(checksum),
        elapsed,
    }
}

#[derive(Debug, Clone)]
pub struct Comparison {
    pub baseline: ExperimentResult,
    pub prefetched: Vec<ExperimentResult>,
}

/// Runs the plain gather once and then once per prefetch distance.
///
/// Returns [`ProbeError::ChecksumMismatch`] as soon as a prefetching run
/// disagrees with the plain one.
pub fn compare_prefetch(
    values: &[u32],
    positions: &[u64],
    distances: &[usize],
    locality: Locality,
) -> Result<Comparison, ProbeError> {
    let baseline = run_experiment(values, positions, PrefetchMode::Disabled);
    log::debug!("{}: {:?}", baseline.mode, baseline.elapsed);

    let mut prefetched = Vec::with_capacity(distances.len());
    for &distance in distances {
        let mode = PrefetchMode::Enabled { distance, locality };
        let result = run_experiment(values, positions, mode);
        log::debug!("{}: {:?}", mode, result.elapsed);

        if result.checksum != baseline.checksum {
            return Err(ProbeError::ChecksumMismatch {
                expected: baseline.checksum,
                actual: result.checksum,
                mode,
            });
        }
        prefetched.push(result);
    }

    Ok(Comparison {
        baseline,
        prefetched,
    })
}

/// Values to gather from and the random positions to gather.
#[derive(Debug, Clone)]
pub struct Workload {
    pub values: Vec<u32>,
    pub positions: Vec<u64>,
}

impl Workload {
    /// Fills `value_count` random values and `access_count` positions
    /// drawn uniformly from `0..value_count`.
    pub fn generate<R: Rng + ?Sized>(
        value_count: usize,
        access_count: usize,
        rng: &mut R,
    ) -> Result<Self, ProbeError> {
        assert!(value_count > 0, "cannot gather from an empty vector");

        let mut values: Vec<u32> = Vec::new();
        values
            .try_reserve_exact(value_count)
            .map_err(|_| ProbeError::Allocation {
                element_count: value_count,
                bytes: value_count.saturating_mul(std::mem::size_of::<u32>()),
            })?;
        values.extend((0..value_count).map(|_| rng.gen_range(0..=u32::MAX)));

        let mut positions: Vec<u64> = Vec::new();
        positions
            .try_reserve_exact(access_count)
            .map_err(|_| ProbeError::Allocation {
                element_count: access_count,
                bytes: access_count.saturating_mul(std::mem::size_of::<u64>()),
            })?;
        let upper = value_count as u64;
        positions.extend((0..access_count).map(|_| rng.gen_range(0..upper)));

        Ok(Self { values, positions })
    }

    pub fn shuffle_positions<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.positions.shuffle(rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn locality_levels_round_trip() {
        for locality in Locality::ALL {
            assert_eq!(Locality::from_level(locality.level()), Some(locality));
        }
        assert_eq!(Locality::from_level(4), None);
    }

    #[test]
    fn gather_sums_values_mod_17() {
        let values = [17, 18, 35, 100];
        let positions = [0, 1, 2, 3, 3];
        let result = run_experiment(&values, &positions, PrefetchMode::Disabled);
        // 0 + 1 + 1 + 15 + 15
        assert_eq!(result.checksum, 32);
    }

    #[test]
    fn prefetching_never_changes_the_checksum() {
        let mut rng = StdRng::seed_from_u64(7);
        let workload = Workload::generate(10_000, 5_000, &mut rng).unwrap();

        for locality in Locality::ALL {
            let comparison = compare_prefetch(
                &workload.values,
                &workload.positions,
                &DEFAULT_DISTANCES,
                locality,
            )
            .unwrap();

            assert_eq!(comparison.prefetched.len(), DEFAULT_DISTANCES.len());
            for result in &comparison.prefetched {
                assert_eq!(result.checksum, comparison.baseline.checksum);
            }
        }
    }

    #[test]
    fn distance_past_the_end_is_clamped() {
        let values = [1, 2, 3];
        let positions = [2, 1, 0];
        let mode = PrefetchMode::Enabled {
            distance: 1000,
            locality: Locality::High,
        };
        assert_eq!(run_experiment(&values, &positions, mode).checksum, 6);
    }

    #[test]
    fn empty_position_list_sums_to_zero() {
        let mode = PrefetchMode::Enabled {
            distance: 4,
            locality: Locality::Low,
        };
        assert_eq!(run_experiment(&[5], &[], mode).checksum, 0);
    }

    #[test]
    fn positions_stay_in_range_after_shuffle() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut workload = Workload::generate(64, 1_000, &mut rng).unwrap();
        let before: u64 = workload.positions.iter().sum();

        workload.shuffle_positions(&mut rng);

        assert!(workload.positions.iter().all(|&p| p < 64));
        assert_eq!(workload.positions.iter().sum::<u64>(), before);
    }
}
