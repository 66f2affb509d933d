//! Compares random gathers with and without software prefetching, for
//! each locality hint and a range of prefetch distances.
//!
//! The first round for every locality is a warm-up and is not printed.
//! Exits with an error if any prefetching run produces a different sum.

use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;

use pointer_chase::ProbeError;
use pointer_chase::prefetch::{
    DEFAULT_ACCESS_COUNT, DEFAULT_DISTANCES, DEFAULT_MEASUREMENTS, DEFAULT_VALUE_COUNT, Locality,
    Workload, compare_prefetch,
};

#[derive(Parser)]
#[command(about, long_about = None)]
struct Args {
    /// Length of the u32 vector gathered from.
    #[arg(long, default_value_t = DEFAULT_VALUE_COUNT)]
    values: usize,

    /// Number of random positions gathered per run.
    #[arg(long, default_value_t = DEFAULT_ACCESS_COUNT)]
    accesses: usize,

    /// Measured rounds per locality, after one warm-up round.
    #[arg(long, default_value_t = DEFAULT_MEASUREMENTS)]
    measurements: usize,

    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn run(args: &Args) -> Result<(), ProbeError> {
    let mut rng = StdRng::seed_from_u64(args.seed);

    log::info!(
        "generating {} values and {} positions",
        args.values,
        args.accesses
    );
    let mut workload = Workload::generate(args.values, args.accesses, &mut rng)?;

    for locality in Locality::ALL {
        workload.shuffle_positions(&mut rng);
        println!("Locality of {}\n", locality.level());

        for round in 0..=args.measurements {
            let comparison = compare_prefetch(
                &workload.values,
                &workload.positions,
                &DEFAULT_DISTANCES,
                locality,
            )?;

            if round == 0 {
                continue;
            }

            let baseline = &comparison.baseline;
            print!(
                "{:.4}s (sum is {})",
                baseline.elapsed.as_secs_f64(),
                baseline.checksum
            );
            for result in &comparison.prefetched {
                print!(" | {}: {:.4}s", result.mode, result.elapsed.as_secs_f64());
            }
            println!();
        }
        println!("\n");
    }

    Ok(())
}

fn main() -> Result<(), String> {
    env_logger::init();

    let args = Args::parse();
    if args.values == 0 {
        return Err("--values must be at least 1".to_string());
    }

    run(&args).map_err(|e| {
        log::error!("{e}");
        e.to_string()
    })
}
