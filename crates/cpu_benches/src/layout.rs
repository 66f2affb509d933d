// Record layout: padding, packing and field order.
//
// `Sale1` to `Sale5` carry the same fields in different layouts. The
// string fields are sized so that, packed, the two flags and the two
// doubles end up on different cache lines.

use std::hint::black_box;
use std::mem::{align_of, size_of};
use std::time::{Duration, Instant};

use pointer_chase::report::format_size;

/// 28 on x86_64 (64 byte lines), 48 on aarch64 where Apple parts use
/// 128 byte lines.
#[cfg(target_arch = "aarch64")]
pub const STRING_LENGTH: usize = 48;
#[cfg(not(target_arch = "aarch64"))]
pub const STRING_LENGTH: usize = 28;

pub const DEFAULT_ELEMENT_COUNT: usize = 32 * 1024 * 1024;
pub const DEFAULT_REPETITIONS: usize = 3;

// small records showing padding only

#[repr(C)]
pub struct S1 {
    pub primary_key: i32,
    pub timestamp: i64,
    pub color: [u8; 2],
    pub zipcode: i32,
}

#[repr(C, packed)]
pub struct S2 {
    pub primary_key: i32,
    pub timestamp: i64,
    pub color: [u8; 2],
    pub zipcode: i32,
}

#[repr(C, packed(8))]
pub struct S3 {
    pub primary_key: i32,
    pub timestamp: i64,
    pub color: [u8; 2],
    pub zipcode: i32,
}

#[repr(C, packed)]
pub struct S4 {
    pub color: [u8; 2],
    pub timestamp: i64,
    pub primary_key: i32,
    pub zipcode: i32,
}

/// `(name, size, alignment)` of the small records.
pub fn small_record_layouts() -> [(&'static str, usize, usize); 4] {
    [
        ("S1", size_of::<S1>(), align_of::<S1>()),
        ("S2", size_of::<S2>(), align_of::<S2>()),
        ("S3", size_of::<S3>(), align_of::<S3>()),
        ("S4", size_of::<S4>(), align_of::<S4>()),
    ]
}

pub trait SaleRecord: Copy {
    fn from_index(i: usize) -> Self;

    /// Amount times tax rate when taxes apply, written without branches.
    fn taxed_amount(&self) -> f64;
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct Sale1 {
    pub amount_is_null: bool,
    pub amount: f64,
    pub product_name: [u8; STRING_LENGTH],
    pub product_category: [u8; STRING_LENGTH],
    pub taxes_incurred: bool,
    pub tax_rate: f64,
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct Sale2 {
    pub amount_is_null: bool,
    pub amount: f64,
    pub product_name: [u8; STRING_LENGTH],
    pub product_category: [u8; STRING_LENGTH],
    pub taxes_incurred: bool,
    pub tax_rate: f64,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct Sale3 {
    pub amount_is_null: bool,
    pub amount: f64,
    pub taxes_incurred: bool,
    pub tax_rate: f64,
    pub product_name: [u8; STRING_LENGTH],
    pub product_category: [u8; STRING_LENGTH],
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct Sale4 {
    pub amount_is_null: bool,
    pub taxes_incurred: bool,
    pub amount: f64,
    pub tax_rate: f64,
    pub product_name: [u8; STRING_LENGTH],
    pub product_category: [u8; STRING_LENGTH],
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct Sale5 {
    pub amount_is_null: bool,
    pub taxes_incurred: bool,
    pub amount: f64,
    pub tax_rate: f64,
    pub product_name: [u8; STRING_LENGTH],
    pub product_category: [u8; STRING_LENGTH],
    pub _pad: [u8; 8],
}

macro_rules! impl_sale_record {
    ($name:ident $(, $pad:ident)?) => {
        impl SaleRecord for $name {
            fn from_index(i: usize) -> Self {
                Self {
                    amount_is_null: i % 17 == 0,
                    amount: 10.0 * (i % 1_000) as f64,
                    taxes_incurred: i % 117 == 0,
                    tax_rate: 1.01 * (i % 10) as f64,
                    product_name: [0; STRING_LENGTH],
                    product_category: [0; STRING_LENGTH],
                    $($pad: [0; 8],)?
                }
            }

            fn taxed_amount(&self) -> f64 {
                // copies, since packed fields cannot be borrowed
                let amount = self.amount;
                let tax_rate = self.tax_rate;
                let is_null = f64::from(u8::from(self.amount_is_null));
                let taxed = f64::from(u8::from(self.taxes_incurred));

                (is_null * amount) * ((taxed * tax_rate) + (1.0 - taxed))
            }
        }
    };
}

impl_sale_record!(Sale1);
impl_sale_record!(Sale2);
impl_sale_record!(Sale3);
impl_sale_record!(Sale4);
impl_sale_record!(Sale5, _pad);

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutReport {
    pub name: &'static str,
    pub size: usize,
    pub align: usize,
    pub element_count: usize,
    pub fill: Duration,
    pub sum: Duration,
    pub total: f64,
}

impl LayoutReport {
    pub fn data_bytes(&self) -> usize {
        self.size * self.element_count
    }

    fn megabytes_per_second(&self, elapsed: Duration) -> f64 {
        self.data_bytes() as f64 / 1e6 / elapsed.as_secs_f64()
    }
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

/// Fills a vector of `element_count` records and then sums
/// [`SaleRecord::taxed_amount`] over it, timing both.
pub fn benchmark<T: SaleRecord>(element_count: usize) -> LayoutReport {
    let start = Instant::now();
    let records: Vec<T> = (0..element_count).map(T::from_index).collect();
    let fill = start.elapsed();

    let start = Instant::now();
    let total = black_box(records.iter().map(SaleRecord::taxed_amount).sum::<f64>());
    let sum = start.elapsed();

    LayoutReport {
        name: short_type_name::<T>(),
        size: size_of::<T>(),
        align: align_of::<T>(),
        element_count,
        fill,
        sum,
        total,
    }
}

pub fn benchmark_all(element_count: usize) -> Vec<LayoutReport> {
    vec![
        benchmark::<Sale1>(element_count),
        benchmark::<Sale2>(element_count),
        benchmark::<Sale3>(element_count),
        benchmark::<Sale4>(element_count),
        benchmark::<Sale5>(element_count),
    ]
}

pub fn run(element_count: usize, repetitions: usize) -> Result<(), String> {
    for (name, size, align) in small_record_layouts() {
        println!("Size of {name} is {size} (alignof: {align}).");
    }

    for repetition in 0..repetitions {
        log::info!("repetition {} of {}", repetition + 1, repetitions);

        for report in benchmark_all(element_count) {
            println!(
                "Size of single struct {} is {} (alignof: {}).",
                report.name, report.size, report.align
            );
            println!(
                "Filled with {} elements ({}) at {:.1} MB/s.",
                report.element_count,
                format_size(report.data_bytes()),
                report.megabytes_per_second(report.fill)
            );
            crate::report_elapsed("fill", report.fill);
            println!(
                "Summed {} elements (result: {}) at {:.1} MB/s.",
                report.element_count,
                report.total,
                report.megabytes_per_second(report.sum)
            );
            crate::report_elapsed("sum", report.sum);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packing_removes_padding() {
        assert_eq!(size_of::<S1>(), 24);
        assert_eq!(size_of::<S2>(), 18);
        assert_eq!(align_of::<S2>(), 1);
        assert_eq!(size_of::<S4>(), 18);

        assert_eq!(size_of::<Sale2>(), 18 + 2 * STRING_LENGTH);
        assert_eq!(align_of::<Sale2>(), 1);
        assert!(size_of::<Sale1>() > size_of::<Sale2>());
    }

    #[test]
    fn grouping_small_fields_shrinks_the_record() {
        assert!(size_of::<Sale4>() < size_of::<Sale1>());
        assert_eq!(size_of::<Sale5>(), size_of::<Sale4>() + 8);
    }

    #[test]
    fn every_layout_computes_the_same_total() {
        let reports = benchmark_all(5_000);
        let expected = reports[0].total;
        assert!(expected > 0.0);
        for report in &reports {
            assert_eq!(report.total, expected, "{}", report.name);
            assert_eq!(report.element_count, 5_000);
        }
        assert_eq!(reports[1].name, "Sale2");
    }

    #[test]
    fn taxed_amount_applies_rate_only_when_taxed() {
        // index 0: amount 0
        assert_eq!(Sale1::from_index(0).taxed_amount(), 0.0);
        // index 17: counted, amount 170, not taxed
        assert_eq!(Sale3::from_index(17).taxed_amount(), 170.0);
        // index 18: not counted
        assert_eq!(Sale2::from_index(18).taxed_amount(), 0.0);
    }
}
