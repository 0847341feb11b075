//! Remote backup: one JSON file per record in a user-authorised folder.
//!
//! The transport behind [`RemoteBackupGateway`] (a cloud drive API, a synced
//! desktop folder) is opaque here. Authentication, token refresh and transport
//! errors all surface as [`RemoteError`]; nothing is retried. The local store
//! stays the source of truth and is only written by a fully validated
//! [`RemoteBackupService::restore`].

use crate::constants::{REMOTE_RECORD_PREFIX, REMOTE_RECORD_SUFFIX};
use crate::record::PatientRecord;
use crate::store::PatientStore;
use crate::{PatientError, PatientResult};
use async_trait::async_trait;
use kinesio_uuid::RecordId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("not signed in to the backup provider")]
    NotSignedIn,
    #[error("remote file not found: {0}")]
    NotFound(String),
    #[error("invalid remote name: {0}")]
    InvalidName(String),
    #[error("remote I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("backup provider error: {0}")]
    Provider(String),
}

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// The signed-in account, as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
    pub picture: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
}

#[async_trait]
pub trait RemoteBackupGateway: Send + Sync {
    /// Finds or creates the folder called `name` and returns its id.
    async fn ensure_folder(&self, name: &str) -> RemoteResult<String>;

    async fn list_files(&self, folder_id: &str) -> RemoteResult<Vec<RemoteFile>>;

    async fn read_file(&self, file_id: &str) -> RemoteResult<String>;

    /// Creates a file and returns its id.
    async fn create_file(&self, folder_id: &str, name: &str, content: &str)
        -> RemoteResult<String>;

    async fn update_file(&self, file_id: &str, content: &str) -> RemoteResult<()>;

    async fn delete_file(&self, file_id: &str) -> RemoteResult<()>;

    /// Current and future sign-in state. `None` means signed out.
    fn auth_state(&self) -> watch::Receiver<Option<UserProfile>>;
}

/// Name of the remote file holding the record with `id`.
pub fn remote_record_name(id: &str) -> String {
    format!("{REMOTE_RECORD_PREFIX}{id}{REMOTE_RECORD_SUFFIX}")
}

fn record_id_from_name(name: &str) -> Option<&str> {
    name.strip_prefix(REMOTE_RECORD_PREFIX)?
        .strip_suffix(REMOTE_RECORD_SUFFIX)
        .filter(|id| !id.is_empty())
}

/// Counts from one mirror run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MirrorReport {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
}

/// Mirrors the local store to a [`RemoteBackupGateway`] and restores from it.
#[derive(Clone)]
pub struct RemoteBackupService {
    store: PatientStore,
    gateway: Arc<dyn RemoteBackupGateway>,
}

impl RemoteBackupService {
    pub fn new(store: PatientStore, gateway: Arc<dyn RemoteBackupGateway>) -> Self {
        Self { store, gateway }
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.gateway.auth_state().borrow().clone()
    }

    fn require_user(&self) -> RemoteResult<UserProfile> {
        self.current_user().ok_or(RemoteError::NotSignedIn)
    }

    /// Patient files in the backup folder, keyed by record id.
    async fn remote_records(&self) -> RemoteResult<(String, HashMap<String, RemoteFile>)> {
        let folder_name = self.store.config().backup_folder_name().to_string();
        let folder_id = self.gateway.ensure_folder(&folder_name).await?;
        let files = self
            .gateway
            .list_files(&folder_id)
            .await?
            .into_iter()
            .filter_map(|file| {
                record_id_from_name(&file.name)
                    .map(str::to_string)
                    .map(|id| (id, file))
            })
            .collect();
        Ok((folder_id, files))
    }

    /// Uploads every local record and deletes remote records that no longer
    /// exist locally.
    ///
    /// Stops at the first gateway failure; files already written stay written.
    pub async fn mirror(&self) -> PatientResult<MirrorReport> {
        let user = self.require_user()?;
        let (folder_id, remote) = self.remote_records().await?;
        let records = self.store.list_all();

        let mut report = MirrorReport::default();
        for record in &records {
            let content =
                serde_json::to_string_pretty(record).map_err(PatientError::Serialization)?;
            match remote.get(&record.id) {
                Some(file) => {
                    self.gateway.update_file(&file.id, &content).await?;
                    report.updated += 1;
                }
                None => {
                    self.gateway
                        .create_file(&folder_id, &remote_record_name(&record.id), &content)
                        .await?;
                    report.created += 1;
                }
            }
        }

        let local: HashSet<&str> = records.iter().map(|r| r.id.as_str()).collect();
        for (id, file) in &remote {
            if !local.contains(id.as_str()) {
                self.gateway.delete_file(&file.id).await?;
                report.deleted += 1;
            }
        }

        tracing::info!(
            "mirrored {} patients for {} ({} created, {} updated, {} deleted)",
            records.len(),
            user.email,
            report.created,
            report.updated,
            report.deleted
        );
        Ok(report)
    }

    /// Replaces the local collection with the records in the backup folder.
    ///
    /// Every file is downloaded and validated before the single write. An
    /// empty folder is an error rather than a request to wipe the store.
    pub async fn restore(&self) -> PatientResult<Vec<PatientRecord>> {
        self.require_user()?;
        let (_, remote) = self.remote_records().await?;
        if remote.is_empty() {
            return Err(RemoteError::NotFound("no patient files in backup folder".into()).into());
        }

        let mut files: Vec<&RemoteFile> = remote.values().collect();
        files.sort_by(|a, b| a.name.cmp(&b.name));

        let mut entries = Vec::with_capacity(files.len());
        for file in files {
            let content = self.gateway.read_file(&file.id).await?;
            let entry: Value = serde_json::from_str(&content).map_err(|e| {
                PatientError::ImportRejected(format!("{} is not valid JSON: {e}", file.name))
            })?;
            entries.push(entry);
        }

        let text = Value::Array(entries).to_string();
        let records = self.store.import(&text)?;
        tracing::info!("restored {} patients from remote backup", records.len());
        Ok(records)
    }
}

/// A gateway over a local directory, such as a desktop-synced cloud folder.
///
/// Folder ids are folder names; file ids are `<folder>/<file>`. The gateway is
/// signed in from construction until [`sign_out`](LocalFolderGateway::sign_out).
pub struct LocalFolderGateway {
    root: PathBuf,
    auth: watch::Sender<Option<UserProfile>>,
}

impl LocalFolderGateway {
    pub fn new(root: impl Into<PathBuf>, profile: UserProfile) -> Self {
        let (auth, _) = watch::channel(Some(profile));
        Self {
            root: root.into(),
            auth,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sign_in(&self, profile: UserProfile) {
        self.auth.send_replace(Some(profile));
    }

    pub fn sign_out(&self) {
        self.auth.send_replace(None);
    }

    fn component(name: &str) -> RemoteResult<&str> {
        RecordId::parse(name).map_err(|e| RemoteError::InvalidName(e.to_string()))?;
        Ok(name)
    }

    fn file_path(&self, file_id: &str) -> RemoteResult<PathBuf> {
        let (folder, name) = file_id
            .split_once('/')
            .ok_or_else(|| RemoteError::InvalidName(file_id.to_string()))?;
        Ok(self
            .root
            .join(Self::component(folder)?)
            .join(Self::component(name)?))
    }

    fn not_found(file_id: &str, e: std::io::Error) -> RemoteError {
        if e.kind() == ErrorKind::NotFound {
            RemoteError::NotFound(file_id.to_string())
        } else {
            RemoteError::Io(e)
        }
    }

    async fn write_atomic(path: &Path, content: &str) -> RemoteResult<()> {
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[async_trait]
impl RemoteBackupGateway for LocalFolderGateway {
    async fn ensure_folder(&self, name: &str) -> RemoteResult<String> {
        let name = Self::component(name)?;
        tokio::fs::create_dir_all(self.root.join(name)).await?;
        Ok(name.to_string())
    }

    async fn list_files(&self, folder_id: &str) -> RemoteResult<Vec<RemoteFile>> {
        let folder = Self::component(folder_id)?;
        let mut dir = tokio::fs::read_dir(self.root.join(folder))
            .await
            .map_err(|e| Self::not_found(folder_id, e))?;

        let mut files = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            files.push(RemoteFile {
                id: format!("{folder}/{name}"),
                name,
            });
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    async fn read_file(&self, file_id: &str) -> RemoteResult<String> {
        let path = self.file_path(file_id)?;
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| Self::not_found(file_id, e))
    }

    async fn create_file(
        &self,
        folder_id: &str,
        name: &str,
        content: &str,
    ) -> RemoteResult<String> {
        let file_id = format!("{}/{}", Self::component(folder_id)?, Self::component(name)?);
        Self::write_atomic(&self.file_path(&file_id)?, content).await?;
        Ok(file_id)
    }

    async fn update_file(&self, file_id: &str, content: &str) -> RemoteResult<()> {
        let path = self.file_path(file_id)?;
        if !tokio::fs::try_exists(&path).await? {
            return Err(RemoteError::NotFound(file_id.to_string()));
        }
        Self::write_atomic(&path, content).await
    }

    async fn delete_file(&self, file_id: &str) -> RemoteResult<()> {
        let path = self.file_path(file_id)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| Self::not_found(file_id, e))
    }

    fn auth_state(&self) -> watch::Receiver<Option<UserProfile>> {
        self.auth.subscribe()
    }
}
