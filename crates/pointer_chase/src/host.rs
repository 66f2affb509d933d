// Network name of the machine, used to name the CSV file.

use std::io;

use crate::ProbeError;

#[cfg(unix)]
pub fn hostname() -> Result<String, ProbeError> {
    let mut buffer = [0u8; 256];

    // SAFETY: the pointer and length describe `buffer`, which outlives the call.
    let rc = unsafe { libc::gethostname(buffer.as_mut_ptr().cast(), buffer.len()) };
    if rc != 0 {
        return Err(ProbeError::Hostname(io::Error::last_os_error()));
    }

    // gethostname may truncate without a terminator
    let end = buffer.iter().position(|&b| b == 0).unwrap_or(buffer.len());
    let name = String::from_utf8_lossy(&buffer[..end]).into_owned();
    if name.is_empty() {
        return Err(ProbeError::Hostname(io::Error::new(
            io::ErrorKind::NotFound,
            "empty host name",
        )));
    }

    Ok(name)
}

#[cfg(not(unix))]
pub fn hostname() -> Result<String, ProbeError> {
    std::env::var("COMPUTERNAME")
        .or_else(|_| std::env::var("HOSTNAME"))
        .map_err(|e| ProbeError::Hostname(io::Error::new(io::ErrorKind::NotFound, e)))
}
