use std::path::PathBuf;

use anyhow::Context;

use crate::config;

/// Data directory holding the catalog, logs and cached model.
///
/// `RESEARCH_MATCHER_HOME` wins; otherwise `~/.research_matcher`.
pub fn data_dir() -> anyhow::Result<PathBuf> {
    if let Some(dir) = non_empty_env(config::paths::HOME_ENV) {
        return Ok(PathBuf::from(dir));
    }
    let home = home_dir().context("cannot determine home directory (neither HOME nor USERPROFILE is set)")?;
    Ok(home.join(config::paths::DATA_DIR_REL))
}

pub fn default_catalog_path() -> anyhow::Result<PathBuf> {
    Ok(data_dir()?.join(config::catalog::CATALOG_FILE_NAME))
}

pub fn home_dir() -> Option<PathBuf> {
    // Use $HOME on all platforms (macOS, Linux, Windows via MSYS/Git Bash)
    if let Some(v) = non_empty_env("HOME") {
        return Some(PathBuf::from(v));
    }
    // Windows fallback
    non_empty_env("USERPROFILE").map(PathBuf::from)
}

pub(crate) fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
