use anyhow::Result;
use lingo_core::AssistantConfig;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{
    EnvFilter, Registry, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "lingo_routing=info,lingo_core=info,lingo_providers=info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into())
}

/// Installs the global subscriber, writing to stderr or to a fresh `debug.log`
/// under the Lingo folder.
///
/// # Errors
/// Returns an error if the log file cannot be created or a subscriber is already set.
pub fn init_logging(log_stderr: bool) -> Result<()> {
    if log_stderr {
        Registry::default()
            .with(env_filter())
            .with(fmt::layer().with_writer(io::stderr).with_target(true))
            .try_init()?;
        return Ok(());
    }

    let debug_log = prepare_log_file(&AssistantConfig::config_dir()?)?;
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&debug_log)?;

    Registry::default()
        .with(env_filter())
        .with(
            fmt::layer()
                .with_writer(Arc::new(log_file))
                .with_ansi(false)
                .with_target(true)
                .with_level(true),
        )
        .try_init()?;
    Ok(())
}

/// Creates `dir` and removes the previous session's log, returning the log path.
///
/// # Errors
/// Returns an error if the directory cannot be created or the old log removed.
pub fn prepare_log_file(dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let debug_log = dir.join("debug.log");
    if debug_log.exists() {
        fs::remove_file(&debug_log)?;
    }
    Ok(debug_log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_prepare_log_file_removes_old_log() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let lingo_dir = temp.path().join(".lingo");
        fs::create_dir_all(&lingo_dir).expect("Failed to create .lingo dir");
        fs::write(lingo_dir.join("debug.log"), "old content\n").expect("write old log");

        let log = prepare_log_file(&lingo_dir).expect("prepare log");

        assert_eq!(log, lingo_dir.join("debug.log"));
        assert!(!log.exists());
    }

    #[test]
    fn test_prepare_log_file_creates_directory() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let nested = temp.path().join("a").join("b");

        let log = prepare_log_file(&nested).expect("prepare log");

        assert!(nested.is_dir());
        assert_eq!(log.file_name().and_then(|name| name.to_str()), Some("debug.log"));
    }
}
