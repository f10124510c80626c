// store.rs - Build and load the persisted catalog.
//
// The artifact is a single SQLite file:
// - catalog_meta:        schema version, model, dims, profile count, build time
// - profiles:            identity + keywords (JSON array), keyed by position
// - keyword_embeddings:  one little-endian f32 blob per (position, keyword_index)
//
// A build writes a complete new file next to the target and renames it over the
// old one, so readers never observe a half-written catalog and a failed build
// leaves the previous catalog in place.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rusqlite::{params, Connection, OpenFlags};
use tempfile::{Builder, TempPath};
use zerocopy::byteorder::little_endian::F32;
use zerocopy::{FromBytes, IntoBytes};

use super::{Catalog, CatalogMeta, Profile, RawProfile};
use crate::config;
use crate::embeddings::{embed_checked, Embedding, EmbeddingProvider};
use crate::error::{MatcherError, Result};

const SCHEMA_SQL: &str = r#"
    CREATE TABLE catalog_meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE profiles (
        position INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL,
        department TEXT NOT NULL,
        keywords TEXT NOT NULL
    );

    CREATE TABLE keyword_embeddings (
        position INTEGER NOT NULL,
        keyword_index INTEGER NOT NULL,
        vector BLOB NOT NULL,
        PRIMARY KEY (position, keyword_index)
    );
"#;

/// Builds catalogs with an injected embedding provider and persists them at `path`.
pub struct CatalogStore {
    provider: Arc<dyn EmbeddingProvider>,
    path: PathBuf,
}

impl CatalogStore {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, path: impl Into<PathBuf>) -> Self {
        Self {
            provider,
            path: path.into(),
        }
    }

    /// Embed every profile's keywords and atomically replace the persisted catalog.
    ///
    /// Nothing is written unless every profile embedded successfully.
    pub fn build(&self, raw_profiles: &[RawProfile]) -> Result<Catalog> {
        log::info!(
            "Building catalog of {} profiles with {} -> {}",
            raw_profiles.len(),
            self.provider.model_name(),
            self.path.display()
        );

        let mut profiles = Vec::with_capacity(raw_profiles.len());
        for (position, raw) in raw_profiles.iter().enumerate() {
            let raw = raw.validated(position)?;
            let matrix = embed_checked(self.provider.as_ref(), &raw.keywords).map_err(|e| {
                MatcherError::build(format!("embedding keywords of profile #{position} ({})", raw.name), e)
            })?;
            log::debug!("Embedded profile #{} {} ({} keywords)", position, raw.name, matrix.len());
            profiles.push(Profile::from_raw(raw, matrix));
        }

        let meta = CatalogMeta {
            schema_version: config::SCHEMA_VERSION,
            model_name: self.provider.model_name().to_string(),
            dimensions: self.provider.dimensions(),
            built_at: chrono::Utc::now().to_rfc3339(),
        };
        let catalog = Catalog::new(meta, profiles)?;

        write_atomically(&self.path, &catalog)?;
        log::info!("Catalog built: {} profiles at {}", catalog.len(), self.path.display());
        Ok(catalog)
    }

    pub fn load(&self) -> Result<Catalog> {
        load_catalog(&self.path)
    }
}

/// A uniquely named, self-deleting staging file in `path`'s directory.
fn staged_file(path: &Path) -> std::io::Result<TempPath> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut prefix: OsString = path.file_name().map(|n| n.to_owned()).unwrap_or_else(|| "catalog".into());
    prefix.push(".");
    Ok(Builder::new()
        .prefix(&prefix)
        .suffix(config::catalog::STAGED_SUFFIX)
        .tempfile_in(dir)?
        .into_temp_path())
}

fn write_atomically(path: &Path, catalog: &Catalog) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| MatcherError::build(format!("create {}", parent.display()), e))?;
    }

    // Dropping `staged` on any error below removes it.
    let staged = staged_file(path)
        .map_err(|e| MatcherError::build(format!("stage next to {}", path.display()), e))?;
    log::debug!("Staging catalog at {}", staged.display());

    write_artifact(&staged, catalog)
        .map_err(|e| MatcherError::build(format!("write {}", staged.display()), e))?;

    staged.persist(path).map_err(|e| {
        MatcherError::build(format!("rename {} -> {}", e.path.display(), path.display()), e.error)
    })?;
    Ok(())
}

fn write_artifact(path: &Path, catalog: &Catalog) -> rusqlite::Result<()> {
    let mut conn = Connection::open(path)?;
    conn.execute_batch(&format!(
        "PRAGMA journal_mode = DELETE;\nPRAGMA busy_timeout = {};",
        config::catalog::PRAGMA_BUSY_TIMEOUT_MS
    ))?;
    conn.execute_batch(SCHEMA_SQL)?;

    let tx = conn.transaction()?;
    {
        let meta = catalog.meta();
        let mut put_meta = tx.prepare("INSERT INTO catalog_meta (key, value) VALUES (?1, ?2)")?;
        put_meta.execute(params!["schema_version", meta.schema_version.to_string()])?;
        put_meta.execute(params!["model_name", meta.model_name])?;
        put_meta.execute(params!["dimensions", meta.dimensions.to_string()])?;
        put_meta.execute(params!["profile_count", catalog.len().to_string()])?;
        put_meta.execute(params!["built_at", meta.built_at])?;

        let mut put_profile = tx.prepare(
            "INSERT INTO profiles (position, name, email, department, keywords) VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        let mut put_vector = tx.prepare(
            "INSERT INTO keyword_embeddings (position, keyword_index, vector) VALUES (?1, ?2, ?3)",
        )?;

        for (position, profile) in catalog.profiles().iter().enumerate() {
            let keywords = serde_json::to_string(&profile.keywords)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            put_profile.execute(params![
                position as i64,
                profile.name,
                profile.email,
                profile.department,
                keywords
            ])?;

            for (keyword_index, vector) in profile.embedding_matrix.iter().enumerate() {
                put_vector.execute(params![position as i64, keyword_index as i64, encode_vector(vector)])?;
            }
        }
    }
    tx.commit()?;

    conn.close().map_err(|(_, e)| e)
}

fn encode_vector(vector: &[f32]) -> Vec<u8> {
    let le: Vec<F32> = vector.iter().copied().map(F32::new).collect();
    le.as_bytes().to_vec()
}

fn decode_vector(blob: &[u8], dims: usize) -> Option<Embedding> {
    let le = <[F32]>::ref_from_bytes(blob).ok()?;
    if le.len() != dims {
        return None;
    }
    Some(le.iter().map(|v| v.get()).collect())
}

/// Load a persisted catalog, verifying that metadata and embeddings line up.
pub fn load_catalog(path: &Path) -> Result<Catalog> {
    if !path.is_file() {
        return Err(MatcherError::CatalogNotFound {
            path: path.to_path_buf(),
        });
    }

    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX)
        .map_err(|e| MatcherError::corrupt(path, format!("open: {e}")))?;

    let meta_map = read_meta(&conn).map_err(|e| MatcherError::corrupt(path, format!("read catalog_meta: {e}")))?;
    let meta_value = |key: &str| {
        meta_map
            .get(key)
            .cloned()
            .ok_or_else(|| MatcherError::corrupt(path, format!("catalog_meta is missing {key}")))
    };
    let meta_number = |key: &str| -> Result<usize> {
        let raw = meta_value(key)?;
        raw.parse()
            .map_err(|_| MatcherError::corrupt(path, format!("catalog_meta {key} is not a number: {raw:?}")))
    };

    let schema_version = meta_number("schema_version")?;
    if schema_version != config::SCHEMA_VERSION as usize {
        return Err(MatcherError::corrupt(
            path,
            format!(
                "schema version {schema_version}, expected {}; rebuild the catalog",
                config::SCHEMA_VERSION
            ),
        ));
    }
    let meta = CatalogMeta {
        schema_version: config::SCHEMA_VERSION,
        model_name: meta_value("model_name")?,
        dimensions: meta_number("dimensions")?,
        built_at: meta_value("built_at")?,
    };
    let profile_count = meta_number("profile_count")?;

    let mut profiles = read_profiles(&conn, path)?;
    if profiles.len() != profile_count {
        return Err(MatcherError::corrupt(
            path,
            format!("catalog_meta declares {profile_count} profiles, found {}", profiles.len()),
        ));
    }

    read_embeddings(&conn, path, meta.dimensions, &mut profiles)?;

    let catalog = Catalog::new(meta, profiles).map_err(|e| MatcherError::corrupt(path, e.to_string()))?;
    log::info!(
        "Loaded catalog: {} profiles, model {} ({} dims), built {}",
        catalog.len(),
        catalog.meta().model_name,
        catalog.meta().dimensions,
        catalog.meta().built_at
    );
    Ok(catalog)
}

fn read_meta(conn: &Connection) -> rusqlite::Result<HashMap<String, String>> {
    let mut stmt = conn.prepare("SELECT key, value FROM catalog_meta")?;
    let rows = stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))?;
    rows.collect()
}

fn read_profiles(conn: &Connection, path: &Path) -> Result<Vec<Profile>> {
    let read = || -> rusqlite::Result<Vec<(i64, String, String, String, String)>> {
        let mut stmt =
            conn.prepare("SELECT position, name, email, department, keywords FROM profiles ORDER BY position")?;
        let rows = stmt.query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?)))?;
        rows.collect()
    };
    let rows = read().map_err(|e| MatcherError::corrupt(path, format!("read profiles: {e}")))?;

    let mut profiles = Vec::with_capacity(rows.len());
    for (expected, (position, name, email, department, keywords)) in rows.into_iter().enumerate() {
        if position != expected as i64 {
            return Err(MatcherError::corrupt(
                path,
                format!("profile positions are not contiguous: expected {expected}, found {position}"),
            ));
        }
        let keywords: Vec<String> = serde_json::from_str(&keywords)
            .map_err(|e| MatcherError::corrupt(path, format!("keywords of profile #{position}: {e}")))?;
        profiles.push(Profile {
            name,
            email,
            department,
            keywords,
            embedding_matrix: Vec::new(),
        });
    }
    Ok(profiles)
}

fn read_embeddings(conn: &Connection, path: &Path, dims: usize, profiles: &mut [Profile]) -> Result<()> {
    let read = || -> rusqlite::Result<Vec<(i64, i64, Vec<u8>)>> {
        let mut stmt = conn.prepare(
            "SELECT position, keyword_index, vector FROM keyword_embeddings ORDER BY position, keyword_index",
        )?;
        let rows = stmt.query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))?;
        rows.collect()
    };
    let rows = read().map_err(|e| MatcherError::corrupt(path, format!("read keyword_embeddings: {e}")))?;

    for (position, keyword_index, blob) in rows {
        let profile = usize::try_from(position)
            .ok()
            .and_then(|p| profiles.get_mut(p))
            .ok_or_else(|| MatcherError::corrupt(path, format!("embedding for unknown profile #{position}")))?;

        if keyword_index != profile.embedding_matrix.len() as i64 {
            return Err(MatcherError::corrupt(
                path,
                format!("profile #{position} embeddings are not contiguous at keyword {keyword_index}"),
            ));
        }

        let vector = decode_vector(&blob, dims).ok_or_else(|| {
            MatcherError::corrupt(
                path,
                format!(
                    "embedding {position}/{keyword_index} is {} bytes, expected {}",
                    blob.len(),
                    dims * std::mem::size_of::<f32>()
                ),
            )
        })?;
        profile.embedding_matrix.push(vector);
    }
    Ok(())
}
