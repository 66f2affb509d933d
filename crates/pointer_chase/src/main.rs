// Sweeps the latency probe over working sets from 1 KB upwards.

use std::path::PathBuf;

use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;

use pointer_chase::probe::{DEFAULT_SIZE_STEPS, DEFAULT_START_ELEMENTS, DEFAULT_STEPS};
use pointer_chase::{ProbeError, SizeSchedule, SweepConfig, host, report, run_sweep};

/// Number of sweeps in a full run, for aggregation across repetitions.
const FULL_RUN_COUNT: usize = 5;

#[derive(Parser)]
#[command(about, long_about = None)]
struct Args {
    /// Dependent loads timed per working set.
    #[arg(long, default_value_t = DEFAULT_STEPS)]
    steps: usize,

    /// Elements in the smallest working set.
    #[arg(long, default_value_t = DEFAULT_START_ELEMENTS)]
    start_elements: usize,

    /// Number of doublings of the working set.
    #[arg(long, default_value_t = DEFAULT_SIZE_STEPS)]
    size_steps: usize,

    /// Sweeps to perform; defaults to 1, or 5 with --full-run.
    #[arg(long)]
    runs: Option<usize>,

    /// Also write one CSV row per measurement to <output-dir>/<hostname>.csv.
    #[arg(long, action)]
    full_run: bool,

    #[arg(long, default_value = "results/pointer_chasing")]
    output_dir: PathBuf,

    /// Seed for the permutations; random if not given.
    #[arg(long)]
    seed: Option<u64>,
}

fn run(args: Args) -> Result<(), ProbeError> {
    let runs = match args.runs {
        Some(n) => n,
        None if args.full_run => FULL_RUN_COUNT,
        None => 1,
    };

    let config = SweepConfig {
        schedule: SizeSchedule {
            start_elements: args.start_elements,
            size_steps: args.size_steps,
        },
        steps: args.steps,
        runs,
    };

    // look this up before measuring for hours
    let machine = if args.full_run {
        Some(host::hostname()?)
    } else {
        None
    };

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    log::info!(
        "{} run(s), {} sizes from {} elements, {} steps each",
        config.runs,
        config.schedule.size_steps,
        config.schedule.start_elements,
        config.steps
    );

    let summary = run_sweep(&config, &mut rng, |record| {
        println!("{}", report::measurement_line(&record.measurement));
    })?;

    // the sum may wrap; it is only printed so the loads are observable
    println!("{}", report::checksum_line(summary.checksum));

    if let Some(machine) = machine {
        let path = report::write_host_csv(&args.output_dir, &machine, &summary.records)?;
        log::info!("wrote {} rows to {}", summary.records.len(), path.display());
    }

    Ok(())
}

fn main() -> Result<(), String> {
    env_logger::init();

    let args = Args::parse();
    if args.start_elements == 0 {
        return Err("--start-elements must be at least 1".to_string());
    }

    run(args).map_err(|e| {
        log::error!("{e}");
        e.to_string()
    })
}
