// Timed loops that sit next to the latency probe: sorting with one or
// all cores, branches vs predication, row- vs column-order traversal and
// record layout. Each module has a `run` entry point used by the CLI.

pub mod layout;
pub mod predication;
pub mod sort;
pub mod traversal;

use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;

fn report_elapsed(label: &str, elapsed: Duration) {
    println!("{label} ... {:>2.3}s", elapsed.as_secs_f64());
}

/// Seeded generator when a seed is given, OS entropy otherwise.
pub fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}
