// unit tests

use super::*;

use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn cyclic(element_count: usize, seed: u64) -> WorkingSet {
    let mut rng = StdRng::seed_from_u64(seed);
    WorkingSet::try_new_cyclic(element_count, &mut rng).unwrap()
}

proptest! {
    #[test]
    fn slots_are_a_permutation(element_count in 1usize..4096, seed in any::<u64>()) {
        let working_set = cyclic(element_count, seed);
        prop_assert_eq!(working_set.len(), element_count);
        prop_assert!(working_set.is_permutation());
    }

    #[test]
    fn chase_from_zero_visits_every_slot(element_count in 1usize..4096, seed in any::<u64>()) {
        let working_set = cyclic(element_count, seed);
        prop_assert_eq!(working_set.cycle_length(0), Some(element_count));
    }

    #[test]
    fn every_start_lies_on_the_same_cycle(element_count in 1usize..512, seed in any::<u64>()) {
        let working_set = cyclic(element_count, seed);
        for start in 0..element_count {
            prop_assert_eq!(working_set.cycle_length(start), Some(element_count));
        }
    }
}

#[test]
fn single_slot_points_at_itself() {
    let working_set = cyclic(1, 0);
    assert_eq!(working_set.as_slice(), &[0]);
    assert_eq!(working_set.chase(0, 10).position, 0);
}

#[test]
fn different_seeds_give_different_orders_with_the_same_structure() {
    let a = cyclic(1024, 1);
    let b = cyclic(1024, 2);

    assert_ne!(a.as_slice(), b.as_slice());
    for working_set in [&a, &b] {
        assert!(working_set.is_permutation());
        assert_eq!(working_set.cycle_length(0), Some(1024));
    }
}

#[test]
fn one_full_lap_sums_every_index() {
    let n = 1000usize;
    let working_set = cyclic(n, 99);
    let outcome = working_set.chase(0, n);

    assert_eq!(outcome.position, 0);
    assert_eq!(outcome.checksum, (0..n as u64).sum::<u64>());
}

#[test]
fn warm_up_sums_every_slot() {
    let working_set = cyclic(500, 5);
    assert_eq!(working_set.warm_up(), (0..500u64).sum::<u64>());
}

#[test]
fn sub_cycles_are_detected() {
    // 0 -> 1 -> 0 and 2 -> 3 -> 2
    let working_set = WorkingSet::from_slots(vec![1, 0, 3, 2]);
    assert!(working_set.is_permutation());
    assert_eq!(working_set.cycle_length(0), Some(2));
}

#[test]
fn broken_slots_are_not_a_permutation() {
    assert!(!WorkingSet::from_slots(vec![1, 1, 0]).is_permutation());
    assert!(!WorkingSet::from_slots(vec![1, 7, 0]).is_permutation());
    assert_eq!(WorkingSet::from_slots(vec![1, 7, 0]).cycle_length(0), None);
    assert_eq!(WorkingSet::from_slots(vec![1, 1, 0]).cycle_length(0), None);
}

#[test]
fn step_count_does_not_depend_on_size() {
    const STEPS: usize = 10_000;
    let mut rng = StdRng::seed_from_u64(11);

    for element_count in [1, 3, 128, 4096, 1 << 16] {
        let measurement = measure_latency(element_count, STEPS, &mut rng).unwrap();
        assert_eq!(measurement.steps, STEPS);
        assert_eq!(measurement.element_count, element_count);
        assert_eq!(measurement.size_in_bytes(), element_count * 8);
    }
}

#[test]
fn zero_steps_reports_zero_latency() {
    let mut rng = StdRng::seed_from_u64(0);
    let measurement = measure_latency(128, 0, &mut rng).unwrap();
    assert_eq!(measurement.steps, 0);
    assert_eq!(measurement.ns_per_access(), 0.0);
}

#[test]
fn impossible_allocation_is_an_error() {
    let mut rng = StdRng::seed_from_u64(0);
    let element_count = usize::MAX / 4;

    match measure_latency(element_count, 1, &mut rng) {
        Err(ProbeError::Allocation {
            element_count: reported,
            ..
        }) => assert_eq!(reported, element_count),
        other => panic!("expected an allocation error, got {other:?}"),
    }
}

#[test]
fn default_schedule_spans_1_kb_to_64_gb() {
    let counts: Vec<usize> = SizeSchedule::default().element_counts().collect();

    assert_eq!(counts.len(), 27);
    assert_eq!(counts[0] * 8, 1024);
    assert_eq!(counts[26] * 8, 64 * 1024 * 1024 * 1024);
    assert!(counts.windows(2).all(|w| w[1] == 2 * w[0]));
}

#[test]
fn schedule_drops_sizes_that_overflow() {
    let schedule = SizeSchedule {
        start_elements: usize::MAX / 2,
        size_steps: 5,
    };
    assert_eq!(schedule.element_counts().count(), 2);
}

#[test]
fn sweep_repeats_every_size_per_run() {
    let config = SweepConfig {
        schedule: SizeSchedule {
            start_elements: 16,
            size_steps: 4,
        },
        steps: 1000,
        runs: 3,
    };
    let mut rng = StdRng::seed_from_u64(21);
    let mut seen = Vec::new();

    let summary = run_sweep(&config, &mut rng, |record| {
        seen.push((record.run_id, record.measurement.element_count));
    })
    .unwrap();

    assert_eq!(summary.records.len(), 12);
    assert_eq!(seen.len(), 12);
    assert_eq!(seen[0], (0, 16));
    assert_eq!(seen[3], (0, 128));
    assert_eq!(seen[11], (2, 128));

    let total = summary
        .records
        .iter()
        .fold(0u64, |acc, r| acc.wrapping_add(r.measurement.checksum));
    assert_eq!(summary.checksum, total);
}
