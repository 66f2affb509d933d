// Human-readable result lines and the per-host CSV file.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::ProbeError;
use crate::probe::{LatencyMeasurement, SweepRecord};

pub const CSV_HEADER: &str = "MACHINE,RUN_ID,ELEMENT_COUNT,SIZE_IN_BYTES,RUNTIME_NS";

/// Formats a byte count for display.
///
/// Below 1 MB the size is given in decimal kilobytes, which keeps the
/// small sizes readable (1024 bytes prints as `1 KB`). Larger sizes are
/// powers of two and print in binary megabytes or gigabytes.
pub fn format_size(bytes: usize) -> String {
    if bytes < 1000 * 1000 {
        format!("{} KB", bytes / 1000)
    } else if bytes < 1000 * 1000 * 1000 {
        format!("{} MB", bytes / 1024 / 1024)
    } else {
        format!("{} GB", bytes / 1024 / 1024 / 1024)
    }
}

/// `<size> <unit> took <ns> ns per access (<n> elements)`
pub fn measurement_line(measurement: &LatencyMeasurement) -> String {
    format!(
        "{} took {:.2} ns per access ({} elements)",
        format_size(measurement.size_in_bytes()),
        measurement.ns_per_access(),
        measurement.element_count
    )
}

pub fn checksum_line(checksum: u64) -> String {
    format!("Sum = {checksum}")
}

/// Writes the header and one row per record.
pub fn write_csv<W: Write>(
    mut writer: W,
    machine: &str,
    records: &[SweepRecord],
) -> Result<(), ProbeError> {
    writeln!(writer, "{CSV_HEADER}")?;
    for record in records {
        let m = &record.measurement;
        writeln!(
            writer,
            "\"{}\",{},{},{},{}",
            machine,
            record.run_id,
            m.element_count,
            m.size_in_bytes(),
            m.runtime_ns()
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes `<dir>/<machine>.csv`, creating `dir` if needed, and returns
/// the path written.
pub fn write_host_csv(
    dir: &Path,
    machine: &str,
    records: &[SweepRecord],
) -> Result<PathBuf, ProbeError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{machine}.csv"));
    let file = File::create(&path)?;
    write_csv(BufWriter::new(file), machine, records)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn measurement(element_count: usize, nanos: u64) -> LatencyMeasurement {
        LatencyMeasurement {
            element_count,
            steps: 1000,
            elapsed: Duration::from_nanos(nanos),
            checksum: 0,
        }
    }

    #[test]
    fn sizes_pick_units() {
        assert_eq!(format_size(1024), "1 KB");
        assert_eq!(format_size(512 * 1024), "524 KB");
        assert_eq!(format_size(1024 * 1024), "1 MB");
        assert_eq!(format_size(512 * 1024 * 1024), "512 MB");
        assert_eq!(format_size(8 * 1024 * 1024 * 1024), "8 GB");
    }

    #[test]
    fn line_matches_expected_shape() {
        let line = measurement_line(&measurement(128, 1500));
        assert_eq!(line, "1 KB took 1.50 ns per access (128 elements)");
    }

    #[test]
    fn csv_has_header_and_quoted_machine() {
        let records = [
            SweepRecord {
                run_id: 0,
                measurement: measurement(128, 42),
            },
            SweepRecord {
                run_id: 1,
                measurement: measurement(256, 77),
            },
        ];

        let mut out = Vec::new();
        write_csv(&mut out, "nx05", &records).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(lines[1], "\"nx05\",0,128,1024,42");
        assert_eq!(lines[2], "\"nx05\",1,256,2048,77");
        assert_eq!(lines.len(), 3);
    }
}
