//! Logging for zuschat.
use anyhow::Context;
use std::io::{ErrorKind, LineWriter};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::fmt::time::OffsetTime;
use zuschat_core::get_data_dir;

/// Rotate the log once it grows past this size.
const MAX_LOG_BYTES: u64 = 100 * 1024;

/// Moves `log_path` to `<name>.old` once it is larger than `max_bytes`,
/// replacing any previous backup. Returns whether the log was rotated.
fn rotate_log(log_path: &Path, max_bytes: u64) -> std::io::Result<bool> {
    let size = match std::fs::metadata(log_path) {
        Ok(metadata) => metadata.len(),
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    if size <= max_bytes {
        return Ok(false);
    }

    let mut backup = log_path.as_os_str().to_owned();
    backup.push(".old");
    let backup_path = PathBuf::from(backup);
    if backup_path.exists() {
        std::fs::remove_file(&backup_path)?;
    }
    std::fs::rename(log_path, backup_path)?;
    Ok(true)
}

/// Initializes file based logging.
///
/// Logs go to `<data_dir>/zuschat.log`, rotated by [`rotate_log`] at 100KB.
/// Only the zuschat crates log at debug level.
///
/// # Errors
///
/// Fails when the data directory cannot be created, the log cannot be
/// rotated or opened, or the local time offset is unavailable.
pub fn setup_logging() -> anyhow::Result<()> {
    let data_dir = get_data_dir().context("Failed to get data directory")?;
    let log_path = data_dir.join("zuschat.log");
    rotate_log(&log_path, MAX_LOG_BYTES).context("Failed to rotate the log file")?;

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open {}", log_path.display()))?;

    // Flush after every line
    let writer = Mutex::new(LineWriter::new(log_file));

    tracing_subscriber::fmt()
        .with_env_filter("zuschat=debug,zuschat_core=debug,rustyline=info")
        .with_writer(writer)
        .with_ansi(false)
        .with_timer(OffsetTime::local_rfc_3339()?)
        .init();
    Ok(())
}
