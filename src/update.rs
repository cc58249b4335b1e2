use crate::catalog;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{
    fs,
    io::Read,
    path::{Path, PathBuf},
    time::Duration,
};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

const CATALOG_URL: &str =
    "https://raw.githubusercontent.com/kxdekxde/browndust2-mod-manager/main/characters_data.json";
const USER_AGENT: &str = "SpineSmith";
const MAX_CATALOG_BYTES: u64 = 8 * 1024 * 1024;

#[derive(Debug, Clone)]
pub enum RefreshResult {
    UpToDate,
    Refreshed { entries: usize },
}

#[derive(Debug, Serialize, Deserialize)]
struct CatalogMeta {
    sha256: String,
    fetched_at: String,
}

/// One-shot character-table refresh: fetch, hash, and swap the cache only
/// when the remote content actually changed.
pub fn refresh_catalog(cache_path: &Path) -> Result<RefreshResult> {
    let body = fetch_catalog()?;
    // Reject garbage before it can poison the cache.
    let entries = catalog::parse_entries(&body).context("remote character table is invalid")?;

    let remote_hash = bytes_sha256(&body);
    let local_hash = if cache_path.exists() {
        Some(file_sha256(cache_path)?)
    } else {
        None
    };

    if local_hash.as_deref() == Some(remote_hash.as_str()) {
        write_meta(cache_path, &remote_hash)?;
        return Ok(RefreshResult::UpToDate);
    }

    replace_cache(cache_path, &body)?;
    write_meta(cache_path, &remote_hash)?;
    Ok(RefreshResult::Refreshed {
        entries: entries.len(),
    })
}

fn fetch_catalog() -> Result<Vec<u8>> {
    let agent = ureq::AgentBuilder::new()
        .timeout_connect(Duration::from_secs(5))
        .timeout_read(Duration::from_secs(30))
        .timeout_write(Duration::from_secs(30))
        .build();
    let response = agent
        .get(CATALOG_URL)
        .set("User-Agent", USER_AGENT)
        .call()
        .context("fetch character table")?;
    let mut body = Vec::new();
    response
        .into_reader()
        .take(MAX_CATALOG_BYTES)
        .read_to_end(&mut body)
        .context("read character table body")?;
    Ok(body)
}

fn replace_cache(cache_path: &Path, body: &[u8]) -> Result<()> {
    let parent = cache_path.parent().context("resolve cache directory")?;
    fs::create_dir_all(parent).context("create cache directory")?;
    let temp_path = parent.join(".spinesmith-catalog.tmp");
    fs::write(&temp_path, body).context("stage character table")?;
    fs::rename(&temp_path, cache_path).context("replace character table")?;
    Ok(())
}

fn write_meta(cache_path: &Path, hash: &str) -> Result<()> {
    let meta = CatalogMeta {
        sha256: hash.to_string(),
        fetched_at: OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string()),
    };
    let raw = serde_json::to_string_pretty(&meta).context("serialize catalog meta")?;
    fs::write(meta_path(cache_path), raw).context("write catalog meta")?;
    Ok(())
}

fn meta_path(cache_path: &Path) -> PathBuf {
    cache_path.with_extension("meta.json")
}

pub fn file_sha256(path: &Path) -> Result<String> {
    let bytes = fs::read(path).context("read file for checksum")?;
    Ok(bytes_sha256(&bytes))
}

pub fn bytes_sha256(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_matches_known_vector() {
        assert_eq!(
            bytes_sha256(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn file_hash_agrees_with_bytes_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.json");
        fs::write(&path, b"[]").unwrap();
        assert_eq!(file_sha256(&path).unwrap(), bytes_sha256(b"[]"));
    }

    #[test]
    fn replace_cache_swaps_content_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("characters.json");
        fs::write(&path, b"old").unwrap();
        replace_cache(&path, b"new").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"new");
        assert!(!dir.path().join(".spinesmith-catalog.tmp").exists());
    }

    #[test]
    fn meta_sidecar_records_hash_and_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("characters.json");
        write_meta(&path, "deadbeef").unwrap();
        let raw = fs::read_to_string(dir.path().join("characters.meta.json")).unwrap();
        let meta: CatalogMeta = serde_json::from_str(&raw).unwrap();
        assert_eq!(meta.sha256, "deadbeef");
        assert!(OffsetDateTime::parse(&meta.fetched_at, &Rfc3339).is_ok());
    }
}
