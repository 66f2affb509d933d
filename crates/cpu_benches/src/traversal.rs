// Summing a flat array in row order and in column order.
//
// The element count stays fixed while the shape goes from 10 rows to
// 10^n rows, so the column-order stride shrinks as the row count grows.

use std::time::{Duration, Instant};

use rand::Rng;

pub const DEFAULT_ITEM_COUNT: usize = 1_000_000_000;
pub const DEFAULT_ITERATIONS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraversalResult {
    pub rows: usize,
    pub cols: usize,
    pub row_wise: Duration,
    pub column_wise: Duration,
    pub row_sum: u64,
    pub column_sum: u64,
}

/// Values in `0..10`.
pub fn random_digits<R: Rng + ?Sized>(item_count: usize, rng: &mut R) -> Vec<i32> {
    (0..item_count).map(|_| rng.gen_range(0..10)).collect()
}

/// `(rows, cols)` for `rows = 10, 100, ...` with `cols = item_count / rows`,
/// stopping before `rows` exceeds `item_count`.
pub fn shapes(item_count: usize, iterations: usize) -> Vec<(usize, usize)> {
    let mut shapes = Vec::with_capacity(iterations);
    let mut rows = 1usize;
    for _ in 0..iterations {
        rows = match rows.checked_mul(10) {
            Some(r) if r <= item_count => r,
            _ => break,
        };
        shapes.push((rows, item_count / rows));
    }
    shapes
}

pub fn sum_row_wise(data: &[i32], rows: usize, cols: usize) -> u64 {
    let mut sum = 0u64;
    for r in 0..rows {
        for c in 0..cols {
            sum += data[r * cols + c] as u64;
        }
    }
    sum
}

pub fn sum_column_wise(data: &[i32], rows: usize, cols: usize) -> u64 {
    let mut sum = 0u64;
    for c in 0..cols {
        for r in 0..rows {
            sum += data[r * cols + c] as u64;
        }
    }
    sum
}

pub fn measure(data: &[i32], rows: usize, cols: usize) -> TraversalResult {
    let start = Instant::now();
    let column_sum = std::hint::black_box(sum_column_wise(data, rows, cols));
    let column_wise = start.elapsed();

    let start = Instant::now();
    let row_sum = std::hint::black_box(sum_row_wise(data, rows, cols));
    let row_wise = start.elapsed();

    TraversalResult {
        rows,
        cols,
        row_wise,
        column_wise,
        row_sum,
        column_sum,
    }
}

pub fn run<R: Rng + ?Sized>(item_count: usize, iterations: usize, rng: &mut R) -> Result<(), String> {
    let data = random_digits(item_count, rng);

    // one untimed pass so later passes start from the same state
    let warm_up: u64 = data.iter().map(|&v| v as u64).sum();
    log::info!("warm-up sum: {warm_up}");

    let mut results = Vec::new();
    for (rows, cols) in shapes(item_count, iterations) {
        println!("Columns: {cols} Rows: {rows}");
        let result = measure(&data, rows, cols);
        println!(
            " col-wise: {} ms sum: {}  row-wise: {} ms sum: {}",
            result.column_wise.as_millis(),
            result.column_sum,
            result.row_wise.as_millis(),
            result.row_sum
        );

        if result.row_sum != result.column_sum {
            return Err(format!(
                "row-wise sum {} differs from column-wise sum {}",
                result.row_sum, result.column_sum
            ));
        }
        results.push(result);
    }

    let row_line: Vec<String> = results
        .iter()
        .map(|r| r.row_wise.as_millis().to_string())
        .collect();
    let column_line: Vec<String> = results
        .iter()
        .map(|r| r.column_wise.as_millis().to_string())
        .collect();
    println!("Total duration row-wise (ms):\n{}", row_line.join("\t"));
    println!("Total duration column-wise (ms):\n{}", column_line.join("\t"));

    Ok(())
}
