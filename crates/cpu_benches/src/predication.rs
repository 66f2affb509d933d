// Counting values below a threshold with a branch, with a predicated
// add, and with two independent predicated counters.
//
// The optimizer may turn the branch into a conditional move on its own;
// `black_box` on each value keeps the three loops as written.

use std::hint::black_box;
use std::time::{Duration, Instant};

use rand::Rng;

pub const DEFAULT_ITEM_COUNT: usize = 10_000_000;

/// Half of the value range, so the branch is taken about half the time.
pub const THRESHOLD: i32 = i32::MAX / 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedCount {
    pub count: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredicationReport {
    pub branched: TimedCount,
    pub predicated: TimedCount,
    pub interleaved: TimedCount,
}

impl PredicationReport {
    pub fn counts_agree(&self) -> bool {
        self.branched.count == self.predicated.count
            && self.predicated.count == self.interleaved.count
    }
}

pub fn count_branched(data: &[i32], threshold: i32) -> usize {
    let mut count = 0;
    for &value in data {
        if black_box(value) < threshold {
            count += 1;
        }
    }
    count
}

pub fn count_predicated(data: &[i32], threshold: i32) -> usize {
    let mut count = 0;
    for &value in data {
        count += usize::from(black_box(value) < threshold);
    }
    count
}

/// Two counters over the two halves, so consecutive adds do not depend
/// on each other.
pub fn count_interleaved(data: &[i32], threshold: i32) -> usize {
    let half = data.len() / 2;
    let (front, back) = data.split_at(half);

    let mut count_front = 0;
    let mut count_back = 0;
    for i in 0..half {
        count_front += usize::from(black_box(front[i]) < threshold);
        count_back += usize::from(black_box(back[i]) < threshold);
    }

    // odd length leaves one value at the end of `back`
    let tail = back[half..].iter().filter(|&&v| v < threshold).count();

    count_front + count_back + tail
}

fn timed(count: impl FnOnce() -> usize) -> TimedCount {
    let start = Instant::now();
    let count = count();
    TimedCount {
        count,
        elapsed: start.elapsed(),
    }
}

pub fn measure(data: &[i32], threshold: i32) -> PredicationReport {
    PredicationReport {
        branched: timed(|| count_branched(data, threshold)),
        predicated: timed(|| count_predicated(data, threshold)),
        interleaved: timed(|| count_interleaved(data, threshold)),
    }
}

pub fn run<R: Rng + ?Sized>(item_count: usize, rng: &mut R) -> Result<(), String> {
    let data: Vec<i32> = (0..item_count).map(|_| rng.gen_range(0..i32::MAX)).collect();

    // untimed pass so every page is touched
    println!("Sum: {}", count_predicated(&data, THRESHOLD));

    let report = measure(&data, THRESHOLD);
    for (label, result) in [
        ("branched", report.branched),
        ("predicated", report.predicated),
        ("out of order", report.interleaved),
    ] {
        println!("Duration {label}: {}us", result.elapsed.as_micros());
        println!("Sum: {}", result.count);
    }

    if !report.counts_agree() {
        return Err(format!("counts disagree: {report:?}"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_strategies_count_the_same() {
        let data = [5, -3, 100, 7, 8, 0, 42];
        for threshold in [-10, 0, 6, 8, 1000] {
            let expected = data.iter().filter(|&&v| v < threshold).count();
            let report = measure(&data, threshold);
            assert_eq!(report.branched.count, expected);
            assert!(report.counts_agree());
        }
    }

    #[test]
    fn interleaved_handles_tiny_inputs() {
        assert_eq!(count_interleaved(&[], 1), 0);
        assert_eq!(count_interleaved(&[0], 1), 1);
        assert_eq!(count_interleaved(&[0, 2, 0], 1), 2);
    }
}
