//! services/app/src/adapters/credential_file.rs
//!
//! File-backed implementation of the `CredentialCache` port.
//!
//! The entry is written as one JSON document through a temp file and a rename,
//! so readers never see a partial group. The latest entry is mirrored into a
//! watch channel that backs `changes()`.

use async_stream::stream;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use todo_sync_core::ports::{CredentialCache, PortError, PortResult};
use todo_sync_core::CredentialCacheEntry;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info};

#[derive(Serialize, Deserialize)]
struct StoredFile {
    credentials: CredentialCacheEntry,
    saved_at: DateTime<Utc>,
}

pub struct FileCredentialCache {
    path: PathBuf,
    current: watch::Sender<CredentialCacheEntry>,
    /// Serializes writers so the file and the channel agree on the last entry.
    write_lock: Mutex<()>,
}

impl FileCredentialCache {
    /// Opens the cache at `path`. A missing file reads as a cleared entry.
    pub async fn open(path: impl Into<PathBuf>) -> PortResult<Self> {
        let path = path.into();
        let entry = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let stored: StoredFile = serde_json::from_slice(&bytes).map_err(|e| {
                    PortError::Malformed(format!("{}: {}", path.display(), e))
                })?;
                debug!(saved_at = %stored.saved_at, "Loaded credential cache.");
                stored.credentials
            }
            Err(e) if e.kind() == ErrorKind::NotFound => CredentialCacheEntry::cleared(),
            Err(e) => return Err(io_error(&path, e)),
        };
        info!("Credential cache opened at {}", path.display());

        let (current, _) = watch::channel(entry);
        Ok(Self {
            path,
            current,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write_file(&self, entry: &CredentialCacheEntry) -> PortResult<()> {
        let stored = StoredFile {
            credentials: entry.clone(),
            saved_at: Utc::now(),
        };
        let bytes = serde_json::to_vec_pretty(&stored)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }

        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| io_error(&tmp, e))?;
        // The entry may hold a password.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(|e| io_error(&tmp, e))?;
        }
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| io_error(&self.path, e))
    }
}

fn io_error(path: &Path, e: std::io::Error) -> PortError {
    PortError::Unavailable(format!("{}: {}", path.display(), e))
}

#[async_trait]
impl CredentialCache for FileCredentialCache {
    async fn save(&self, entry: &CredentialCacheEntry) -> PortResult<()> {
        let _guard = self.write_lock.lock().await;
        self.write_file(entry).await?;
        self.current.send_replace(entry.clone());
        debug!(
            auth_via_password = entry.auth_via_password(),
            auth_via_provider = entry.auth_via_provider(),
            "Credential cache saved."
        );
        Ok(())
    }

    async fn load(&self) -> PortResult<CredentialCacheEntry> {
        Ok(self.current.borrow().clone())
    }

    fn changes(&self) -> BoxStream<'static, CredentialCacheEntry> {
        let mut rx = self.current.subscribe();
        stream! {
            loop {
                let entry = rx.borrow_and_update().clone();
                yield entry;
                if rx.changed().await.is_err() {
                    break;
                }
            }
        }
        .boxed()
    }
}
