//! Logging init: file under XDG state dir, or graceful fallback to stderr.
//!
//! The library itself only emits `tracing` events; embedding applications
//! call one of these once at startup if they want them written somewhere.

use anyhow::Result;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,apiwire_core=debug";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// fmt subscriber appending plain-text events to `file`.
fn file_subscriber(file: fs::File, filter: EnvFilter) -> impl tracing::Subscriber + Send + Sync {
    // Appends are serialized through the mutex; events never interleave mid-line.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .finish()
}

/// Path of the log file under the XDG state dir (`~/.local/state/apiwire/apiwire.log`).
pub fn log_file_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("apiwire")?;
    Ok(xdg_dirs.get_state_home().join("apiwire").join("apiwire.log"))
}

/// Initialize structured logging to `~/.local/state/apiwire/apiwire.log`.
/// On failure (e.g. log dir unwritable), returns Err so the caller can fall back to stderr.
pub fn init_logging() -> Result<()> {
    let log_file_path = log_file_path()?;
    if let Some(dir) = log_file_path.parent() {
        fs::create_dir_all(dir)?;
    }

    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file_path)?;

    tracing::subscriber::set_global_default(file_subscriber(file, env_filter()))
        .map_err(|e| anyhow::anyhow!("tracing subscriber: {}", e))?;

    tracing::info!("apiwire logging initialized at {}", log_file_path.display());

    Ok(())
}

/// Initialize logging to stderr only. Use when `init_logging()` fails.
/// A second call (subscriber already set) is a no-op.
pub fn init_logging_stderr() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_lives_under_apiwire_state_dir() {
        let path = log_file_path().unwrap();
        assert!(path.ends_with("apiwire/apiwire.log"), "{}", path.display());
    }

    #[test]
    fn file_subscriber_appends_filtered_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("apiwire.log");
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .unwrap();
        let subscriber = file_subscriber(file, EnvFilter::new("info"));
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(attempt = 2u32, "retrying zone list");
            tracing::debug!("filtered out");
        });
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("retrying zone list"), "{}", text);
        assert!(text.contains("attempt=2"), "{}", text);
        assert!(!text.contains("filtered out"));
        assert!(!text.contains('\u{1b}'), "no ANSI escapes in the file");
    }
}
