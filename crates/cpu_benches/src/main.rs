// CLI for the sibling CPU benchmarks

use clap::{Args, Parser, Subcommand};

use cpu_benches::{layout, make_rng, predication, sort, traversal};

// setup command line args

#[derive(Parser)]
#[command(about, long_about = None)]
pub struct CliArgs {
    #[clap(subcommand)]
    pub command: Command,
    /// Seed for generated data; random if not given.
    #[clap(long)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
pub enum Command {
    Sort(SortArgs),
    Predication(PredicationArgs),
    Traversal(TraversalArgs),
    Layout(LayoutArgs),
}

#[derive(Debug, Args)]
pub struct SortArgs {
    /// Sort with a rayon pool instead of the calling thread.
    #[clap(long, action)]
    parallel: bool,
    /// Sort 16 GB instead of 1 GB.
    #[clap(long, action)]
    large: bool,
    /// Explicit element count, overrides --large.
    #[clap(long)]
    items: Option<usize>,
    /// Stop after generating the data.
    #[clap(long, action)]
    data_only: bool,
    /// Pool size for --parallel; defaults to the number of CPUs.
    #[clap(long)]
    threads: Option<usize>,
}

#[derive(Debug, Args)]
pub struct PredicationArgs {
    #[clap(long, default_value_t = predication::DEFAULT_ITEM_COUNT)]
    items: usize,
}

#[derive(Debug, Args)]
pub struct TraversalArgs {
    #[clap(long, default_value_t = traversal::DEFAULT_ITEM_COUNT)]
    items: usize,
    #[clap(long, default_value_t = traversal::DEFAULT_ITERATIONS)]
    iterations: usize,
}

#[derive(Debug, Args)]
pub struct LayoutArgs {
    #[clap(long, default_value_t = layout::DEFAULT_ELEMENT_COUNT)]
    elements: usize,
    #[clap(long, default_value_t = layout::DEFAULT_REPETITIONS)]
    repetitions: usize,
}

fn main() -> Result<(), String> {
    env_logger::init();

    let args = CliArgs::parse();
    let mut rng = make_rng(args.seed);

    match args.command {
        Command::Sort(args) => {
            let item_count = match (args.items, args.large) {
                (Some(n), _) => n,
                (None, true) => sort::LARGE_ITEM_COUNT,
                (None, false) => sort::DEFAULT_ITEM_COUNT,
            };
            let mode = if args.parallel {
                sort::SortMode::MultiThreaded
            } else {
                sort::SortMode::SingleThreaded
            };
            sort::run(item_count, mode, args.data_only, args.threads, &mut rng)?
        }
        Command::Predication(args) => predication::run(args.items, &mut rng)?,
        Command::Traversal(args) => traversal::run(args.items, args.iterations, &mut rng)?,
        Command::Layout(args) => layout::run(args.elements, args.repetitions)?,
    }

    Ok(())
}
