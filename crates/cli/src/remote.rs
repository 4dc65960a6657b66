// FILE: crates/cli/src/remote.rs

use async_trait::async_trait;
use shopsync_core::SyncRecord;
use shopsync_sync_engine::{RemoteGateway, Result, SyncError};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Remote gateway backed by a shared directory
///
/// Each user's records live in `<root>/<user>.json` as one array. Several
/// data directories pointed at the same remote directory behave like
/// separate devices on one account.
#[derive(Debug, Clone)]
pub struct DirectoryGateway {
    root: PathBuf,
}

impl DirectoryGateway {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn user_file(&self, user_id: &str) -> PathBuf {
        let name: String = user_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.root.join(format!("{}.json", name))
    }

    async fn read_user(&self, user_id: &str) -> Result<Vec<SyncRecord>> {
        let path = self.user_file(user_id);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(SyncError::Network(format!("{}: {}", path.display(), e))),
        }
    }
}

#[async_trait]
impl RemoteGateway for DirectoryGateway {
    async fn fetch_records(&self, user_id: &str) -> Result<Vec<SyncRecord>> {
        let records = self.read_user(user_id).await?;
        log::debug!("Fetched {} remote records for {}", records.len(), user_id);
        Ok(records)
    }

    async fn upload_records(&self, user_id: &str, records: &[SyncRecord]) -> Result<()> {
        let mut stored = self.read_user(user_id).await?;
        for record in records {
            match stored.iter_mut().find(|r| r.id == record.id) {
                Some(existing) => *existing = record.clone(),
                None => stored.push(record.clone()),
            }
        }

        let bytes = serde_json::to_vec_pretty(&stored)?;
        let root = self.root.clone();
        let path = self.user_file(user_id);
        tokio::task::spawn_blocking(move || write_atomic(&root, &path, &bytes))
            .await
            .map_err(|e| SyncError::Network(format!("Upload task failed: {}", e)))??;

        log::debug!("Uploaded {} records for {}", records.len(), user_id);
        Ok(())
    }
}

fn write_atomic(root: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    std::fs::create_dir_all(root)?;
    let mut temp_file = tempfile::NamedTempFile::new_in(root)?;
    temp_file.write_all(bytes)?;
    temp_file.as_file().sync_all()?;
    temp_file.persist(path).map_err(|e| e.error)?;
    Ok(())
}
