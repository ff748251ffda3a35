// src/log.rs
use std::{
    fs::{self, OpenOptions},
    io,
    path::{Path, PathBuf},
    sync::Mutex,
};

use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{self, time::Uptime},
    prelude::*,
};

use crate::config::consts::{LOG_FILE, STORE_DIR};

/// `.store/debug.log`
pub fn default_path() -> PathBuf {
    Path::new(STORE_DIR).join(LOG_FILE)
}

/// Console at info (debug with `verbose`), plus everything at debug
/// appended to `path` with time since start.
/// A second call is a no-op.
pub fn init(path: &Path, verbose: bool) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let console_level = if verbose { LevelFilter::DEBUG } else { LevelFilter::INFO };
    let console = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_filter(console_level);
    let debug_file = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_timer(Uptime::default())
        .with_filter(LevelFilter::DEBUG);

    let _ = tracing_subscriber::registry().with(console).with(debug_file).try_init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_the_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("debug.log");
        init(&path, false).unwrap();
        init(&path, true).unwrap();
        assert!(path.exists());
    }
}
