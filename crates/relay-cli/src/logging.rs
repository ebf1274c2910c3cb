//! Logging setup: console output plus an optional log file.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter};
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Log files larger than this are truncated at startup
const MAX_LOG_SIZE: u64 = 1024 * 1024;

/// Initialize the global subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Console output
/// goes to stderr so that command output on stdout stays parseable.
///
/// Returns a guard that must be kept alive while logging to a file.
pub fn init_logging(config: &LoggingConfig) -> io::Result<Option<WorkerGuard>> {
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
    };

    let Some(path) = &config.file else {
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(io::stderr)
            .init();
        return Ok(None);
    };

    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    truncate_if_needed(path)?;
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let (writer, guard) = tracing_appender::non_blocking(BufWriter::new(file));

    tracing_subscriber::registry()
        .with(filter())
        .with(fmt::layer().with_writer(io::stderr))
        .with(fmt::layer().with_writer(writer).with_ansi(false).with_target(true))
        .init();

    tracing::info!("Logging to file: {}", path.display());
    Ok(Some(guard))
}

fn truncate_if_needed(path: &Path) -> io::Result<()> {
    if path.exists() && fs::metadata(path)?.len() > MAX_LOG_SIZE {
        File::create(path)?.set_len(0)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oversized_log_is_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let big = dir.path().join("big.log");
        let small = dir.path().join("small.log");
        fs::write(&big, vec![b'x'; MAX_LOG_SIZE as usize + 1]).unwrap();
        fs::write(&small, b"keep").unwrap();

        truncate_if_needed(&big).unwrap();
        truncate_if_needed(&small).unwrap();
        truncate_if_needed(&dir.path().join("absent.log")).unwrap();

        assert_eq!(fs::metadata(&big).unwrap().len(), 0);
        assert_eq!(fs::read(&small).unwrap(), b"keep");
    }
}
