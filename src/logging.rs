use std::path::PathBuf;

use anyhow::Context;
use flexi_logger::{Cleanup, Criterion, Duplicate, FileSpec, Logger, LoggerHandle, Naming};

use crate::{config, paths};

/// File logs at DEBUG with rotation; warnings and errors are duplicated to stderr.
///
/// Keep the returned handle alive for the life of the process so buffered
/// lines are flushed on shutdown.
pub fn init_logging() -> anyhow::Result<LoggerHandle> {
    let log_dir = log_dir()?;

    let handle = Logger::try_with_str("debug")?
        .log_to_file(
            FileSpec::default()
                .directory(log_dir)
                .basename(config::logging::LOG_FILE_NAME),
        )
        .rotate(
            Criterion::Size(config::logging::LOG_ROTATE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(config::logging::LOG_ROTATE_KEEP_FILES),
        )
        .duplicate_to_stderr(Duplicate::Warn)
        .format(flexi_logger::detailed_format)
        .start()
        .context("failed to start logger")?;

    log::info!("{}", "=".repeat(60));
    log::info!("Research Matcher host starting");
    log::info!("Version: {}", config::HOST_VERSION);
    log::info!("Platform: {}", std::env::consts::OS);
    log::info!("{}", "=".repeat(60));

    Ok(handle)
}

fn log_dir() -> anyhow::Result<PathBuf> {
    let dir = paths::data_dir()?.join(config::logging::LOG_DIR_NAME);
    std::fs::create_dir_all(&dir).with_context(|| format!("failed creating log dir {}", dir.display()))?;
    Ok(dir)
}
