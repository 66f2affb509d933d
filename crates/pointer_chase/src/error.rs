// Errors that end a benchmark run.

use std::io;

use thiserror::Error;

use crate::prefetch::PrefetchMode;

/// Every failure here is fatal for the run that hit it; a partially
/// allocated working set or a wrong checksum means the numbers are useless.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("unable to allocate {bytes} bytes for {element_count} elements")]
    Allocation { element_count: usize, bytes: usize },

    #[error("checksum mismatch with {mode}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        expected: u64,
        actual: u64,
        mode: PrefetchMode,
    },

    #[error("unable to read host name: {0}")]
    Hostname(#[source] io::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}
