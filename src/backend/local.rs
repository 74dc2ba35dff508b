//! Directory-backed backend: blob storage, key-value store and session.
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/blobs/<uuid>/<name>   uploaded files (path returned: blobs/<uuid>/<name>)
//! <root>/kv/<b64(key)>.json    one { "key", "value", "seq" } entry per key
//! <root>/session.json          { "username": "…" } while signed in
//! ```
//!
//! Each key owns its own file, so writers on different keys never touch
//! the same bytes, whether they share a `LocalStore`, a process, or
//! neither. `seq` is stamped when a key is first written and kept on
//! every rewrite; listings sort by it, giving first-write order. Every
//! write lands in a uniquely named temp file and is renamed into place.

use super::{pattern_regex, Authenticator, BlobStorage, KeyValueStore, KvItem, StoredBlob};
use crate::error::BackendError;
use crate::model::UploadedFile;
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};
use uuid::Uuid;

const BLOB_DIR: &str = "blobs";
const KV_DIR: &str = "kv";
const SESSION_FILE: &str = "session.json";

/// Last `seq` handed out in this process.
static LAST_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    key: String,
    value: String,
    seq: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
}

/// Local on-disk implementation of the storage capabilities.
#[derive(Debug)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a storage path to a file under the blob directory.
    ///
    /// Rejects anything that would escape the root.
    pub fn blob_file(&self, path: &str) -> Option<PathBuf> {
        let rel = Path::new(path);
        let safe = rel
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !safe || !rel.starts_with(BLOB_DIR) {
            return None;
        }
        Some(self.root.join(rel))
    }

    pub async fn sign_in(&self, username: &str) -> Result<(), BackendError> {
        let session = Session {
            username: username.to_string(),
        };
        write_atomic(
            &self.root.join(SESSION_FILE),
            serde_json::to_vec_pretty(&session)?,
        )
        .await?;
        info!("Signed in as {}", username);
        Ok(())
    }

    pub async fn sign_out(&self) -> Result<(), BackendError> {
        match tokio::fs::remove_file(self.root.join(SESSION_FILE)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn session(&self) -> Option<Session> {
        let bytes = std::fs::read(self.root.join(SESSION_FILE)).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.root
            .join(KV_DIR)
            .join(format!("{}.json", URL_SAFE_NO_PAD.encode(key)))
    }

    async fn read_entry(path: &Path) -> Result<Option<Entry>, BackendError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn load_entries(&self) -> Result<Vec<Entry>, BackendError> {
        let mut dir = match tokio::fs::read_dir(self.root.join(KV_DIR)).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            match Self::read_entry(&path).await {
                Ok(Some(entry)) => entries.push(entry),
                Ok(None) => {}
                Err(e) => warn!("Skipping unreadable entry {}: {}", path.display(), e),
            }
        }
        entries.sort_by(|a, b| a.seq.cmp(&b.seq).then_with(|| a.key.cmp(&b.key)));
        Ok(entries)
    }
}

/// Next insertion stamp: wall-clock nanoseconds, strictly increasing
/// within the process.
fn next_seq() -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX));
    let prev = LAST_SEQ
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(now.max(last.saturating_add(1)))
        })
        .unwrap_or_else(|last| last);
    now.max(prev.saturating_add(1))
}

/// Write `bytes` to `path` via a uniquely named sibling temp file and rename.
async fn write_atomic(path: &Path, bytes: Vec<u8>) -> Result<(), BackendError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!("{file_name}.{}.tmp", Uuid::new_v4().simple()));
    tokio::fs::write(&tmp, bytes).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

/// Strip directory components from a user-supplied file name.
fn sanitise_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("");
    if base.is_empty() || base == "." || base == ".." {
        "upload.bin".to_string()
    } else {
        base.to_string()
    }
}

#[async_trait]
impl BlobStorage for LocalStore {
    async fn upload(&self, file: &UploadedFile) -> Result<Option<StoredBlob>, BackendError> {
        let name = sanitise_name(file.name());
        let rel = format!("{BLOB_DIR}/{}/{name}", Uuid::new_v4());
        write_atomic(&self.root.join(&rel), file.bytes().to_vec()).await?;
        debug!("Stored {} ({} bytes) at {}", file.name(), file.size(), rel);
        Ok(Some(StoredBlob {
            path: rel,
            name,
            size: file.size(),
        }))
    }

    async fn read(&self, path: &str) -> Result<Option<Vec<u8>>, BackendError> {
        let Some(full) = self.blob_file(path) else {
            return Ok(None);
        };
        match tokio::fs::read(&full).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl KeyValueStore for LocalStore {
    async fn set(&self, key: &str, value: &str) -> Result<(), BackendError> {
        let path = self.entry_path(key);
        let seq = match Self::read_entry(&path).await {
            Ok(Some(existing)) => existing.seq,
            Ok(None) => next_seq(),
            Err(e) => {
                warn!("Replacing unreadable entry for {}: {}", key, e);
                next_seq()
            }
        };
        let entry = Entry {
            key: key.to_string(),
            value: value.to_string(),
            seq,
        };
        write_atomic(&path, serde_json::to_vec_pretty(&entry)?).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        Ok(Self::read_entry(&self.entry_path(key)).await?.map(|e| e.value))
    }

    async fn list(&self, pattern: &str, include_values: bool) -> Result<Vec<KvItem>, BackendError> {
        let re = pattern_regex(pattern)?;
        let entries = self.load_entries().await?;
        Ok(entries
            .into_iter()
            .filter(|e| re.is_match(&e.key))
            .map(|e| KvItem {
                key: e.key,
                value: include_values.then_some(e.value),
            })
            .collect())
    }
}

impl Authenticator for LocalStore {
    fn is_authenticated(&self) -> bool {
        self.session().is_some()
    }
}
