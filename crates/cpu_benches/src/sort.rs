// Sort throughput with a single thread vs. a rayon pool on every core.

use std::time::{Duration, Instant};

use rand::Rng;
use rayon::{ThreadPool, ThreadPoolBuilder, slice::ParallelSliceMut};

use pointer_chase::report::format_size;

/// 1 GB of `i32`.
pub const DEFAULT_ITEM_COUNT: usize = 250_000_000;

/// 16 GB of `i32`.
pub const LARGE_ITEM_COUNT: usize = 4_000_000_000;

const PREVIEW_LEN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
    SingleThreaded,
    MultiThreaded,
}

/// Non-negative random values, like C's `rand()`.
pub fn random_data<R: Rng + ?Sized>(item_count: usize, rng: &mut R) -> Vec<i32> {
    (0..item_count).map(|_| rng.gen_range(0..i32::MAX)).collect()
}

/// Pool with one thread per logical CPU unless `threads` says otherwise.
pub fn build_thread_pool(threads: Option<usize>) -> Result<ThreadPool, String> {
    let num_threads = threads.unwrap_or_else(num_cpus::get);
    ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .map_err(|e| e.to_string())
}

/// Sorts `data` in place and returns how long only the sort took.
pub fn timed_sort(data: &mut [i32], mode: SortMode, thread_pool: &ThreadPool) -> Duration {
    let start = Instant::now();
    match mode {
        SortMode::SingleThreaded => data.sort_unstable(),
        SortMode::MultiThreaded => thread_pool.install(|| data.par_sort_unstable()),
    }
    start.elapsed()
}

fn preview(data: &[i32]) -> String {
    data.iter()
        .take(PREVIEW_LEN)
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// __Arguments:__
///
/// + `item_count` - number of `i32` values to sort
///
/// + `mode` - sort on the calling thread or on the pool
///
/// + `data_only` - stop once the data has been generated, for measuring
///   generation on its own
///
pub fn run<R: Rng + ?Sized>(
    item_count: usize,
    mode: SortMode,
    data_only: bool,
    threads: Option<usize>,
    rng: &mut R,
) -> Result<(), String> {
    let thread_pool = build_thread_pool(threads)?;

    match mode {
        SortMode::SingleThreaded => println!("Running single-threaded sort."),
        SortMode::MultiThreaded => println!(
            "Running multi-threaded sort on {} threads.",
            thread_pool.current_num_threads()
        ),
    }

    println!("Element size (i32): {} Bytes", std::mem::size_of::<i32>());
    println!(
        "Total array size: {}",
        format_size(item_count * std::mem::size_of::<i32>())
    );

    log::info!("filling array with random data");
    let mut data = random_data(item_count, rng);
    println!("Initial array start: {}", preview(&data));

    if data_only {
        println!("Early out for measuring data creation only.");
        return Ok(());
    }

    let elapsed = timed_sort(&mut data, mode, &thread_pool);

    println!("Array start after sorting: {}", preview(&data));
    println!("Total duration: {} s", elapsed.as_secs_f64());

    Ok(())
}
