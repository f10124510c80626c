// download.rs - Model file download with SHA256 verification.
//
// Downloads model weights on first use, caches them under the data directory.
// Files are verified against known SHA256 hashes to ensure integrity.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use sha2::{Digest, Sha256};

use crate::{config, paths};

const MODEL_FILES: [(&str, &str); 3] = [
    ("model.safetensors", config::embedding::MODEL_SAFETENSORS_SHA256),
    ("tokenizer.json", config::embedding::TOKENIZER_JSON_SHA256),
    ("config.json", config::embedding::CONFIG_JSON_SHA256),
];

/// Returns the local model directory path.
///
/// A directory named by `RESEARCH_MATCHER_MODEL_DIR` is used as is.
pub fn model_dir() -> anyhow::Result<PathBuf> {
    if let Some(dir) = paths::non_empty_env(config::embedding::MODEL_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    Ok(paths::data_dir()?.join(config::embedding::MODEL_DIR_REL))
}

/// Check if all required model files exist in `dir`.
pub fn model_files_exist(dir: &Path) -> bool {
    MODEL_FILES.iter().all(|(name, _)| dir.join(name).exists())
}

/// Download all model files if not already cached. Returns the model directory path.
pub fn ensure_model_files() -> anyhow::Result<PathBuf> {
    let dir = model_dir()?;

    if model_files_exist(&dir) {
        log::info!("Model files already cached at {}", dir.display());
        return Ok(dir);
    }

    if paths::non_empty_env(config::embedding::MODEL_DIR_ENV).is_some() {
        bail!(
            "{} points at {} but it does not contain {}",
            config::embedding::MODEL_DIR_ENV,
            dir.display(),
            MODEL_FILES.map(|(name, _)| name).join(", ")
        );
    }

    log::info!("Downloading embedding model to {}", dir.display());
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create model dir {}", dir.display()))?;

    let base = config::embedding::MODEL_CDN_BASE;
    for (name, sha256) in MODEL_FILES {
        let dest = dir.join(name);
        if dest.exists() {
            continue;
        }
        download_and_verify(&format!("{base}/{name}"), &dest, sha256)?;
    }

    log::info!("Model download complete");
    Ok(dir)
}

/// Download a file from URL and verify its SHA256 hash.
fn download_and_verify(url: &str, dest: &Path, expected_sha256: &str) -> anyhow::Result<()> {
    let filename = dest.file_name().unwrap_or_default().to_string_lossy();
    log::info!("Downloading {} from {}", filename, url);

    let resp = ureq::get(url)
        .timeout(std::time::Duration::from_secs(config::embedding::DOWNLOAD_TIMEOUT_SECS))
        .call()
        .with_context(|| format!("failed to download {url}"))?;

    let status = resp.status();
    if status != 200 {
        bail!("HTTP {status} downloading {url}");
    }

    // Read body into memory (model is ~87 MB, fits in RAM)
    let mut body = Vec::new();
    resp.into_reader()
        .read_to_end(&mut body)
        .with_context(|| format!("failed to read response body for {url}"))?;

    verify_sha256(&body, expected_sha256).with_context(|| format!("integrity check for {filename}"))?;

    // Write atomically: write to .tmp, then rename
    let tmp_path = dest.with_extension("tmp");
    let mut file = fs::File::create(&tmp_path)
        .with_context(|| format!("failed to create {}", tmp_path.display()))?;
    file.write_all(&body)?;
    file.flush()?;
    drop(file);

    fs::rename(&tmp_path, dest)
        .with_context(|| format!("failed to rename {} -> {}", tmp_path.display(), dest.display()))?;

    Ok(())
}

fn verify_sha256(body: &[u8], expected_sha256: &str) -> anyhow::Result<()> {
    let mut hasher = Sha256::new();
    hasher.update(body);
    let actual_hash = hex::encode(hasher.finalize());

    if actual_hash != expected_sha256 {
        bail!("SHA256 mismatch: expected {}, got {}", expected_sha256, actual_hash);
    }

    log::info!("SHA256 verified ({})", &actual_hash[..12]);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_sha256() {
        // sha256("abc")
        let abc = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";
        assert!(verify_sha256(b"abc", abc).is_ok());
        assert!(verify_sha256(b"abd", abc).is_err());
    }

    #[test]
    fn test_model_files_exist_requires_all_three() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!model_files_exist(dir.path()));

        fs::write(dir.path().join("model.safetensors"), b"w").unwrap();
        fs::write(dir.path().join("tokenizer.json"), b"{}").unwrap();
        assert!(!model_files_exist(dir.path()));

        fs::write(dir.path().join("config.json"), b"{}").unwrap();
        assert!(model_files_exist(dir.path()));
    }
}
