use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

const AUDIO_DIR: &str = "audio";
const SAVED_DIR: &str = "saved";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("audio file not found: {0}")]
    NotFound(String),
    #[error("invalid storage key: {0}")]
    InvalidKey(String),
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Audio files under a single root directory.
///
/// Files are addressed by keys relative to the root (`audio/<job_id>.mp3`,
/// `saved/saved_<timestamp>_<job_id>.mp3`); those keys are what job records
/// and saved audios persist.
#[derive(Debug, Clone)]
pub struct AudioStorage {
    root: PathBuf,
}

impl AudioStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root and its subdirectories if missing
    pub async fn ensure_dirs(&self) -> Result<(), StorageError> {
        fs::create_dir_all(self.root.join(AUDIO_DIR)).await?;
        fs::create_dir_all(self.root.join(SAVED_DIR)).await?;
        tracing::info!(root = %self.root.display(), "Audio storage ready");
        Ok(())
    }

    pub fn job_audio_key(job_id: Uuid) -> String {
        format!("{}/{}.mp3", AUDIO_DIR, job_id)
    }

    /// Write the assembled audio of a job, returning its key.
    ///
    /// The file is written under a temporary name and renamed into place, so
    /// readers never observe a partial file.
    pub async fn write_job_audio(&self, job_id: Uuid, audio: &[u8]) -> Result<String, StorageError> {
        let key = Self::job_audio_key(job_id);
        let path = self.resolve(&key)?;
        let tmp_path = path.with_extension(format!("mp3.{}.tmp", Uuid::new_v4()));

        let written = match fs::write(&tmp_path, audio).await {
            Ok(()) => fs::rename(&tmp_path, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            Self::remove_partial(job_id, &tmp_path).await;
            return Err(e.into());
        }

        tracing::debug!(job_id = %job_id, key = %key, size_bytes = audio.len(), "Job audio written");
        Ok(key)
    }

    /// Best-effort removal of a temporary file left by a failed write
    async fn remove_partial(job_id: Uuid, tmp_path: &Path) {
        match fs::remove_file(tmp_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    job_id = %job_id,
                    path = %tmp_path.display(),
                    error = %e,
                    "Failed to remove temporary audio file"
                );
            }
        }
    }

    /// Copy a job's audio into the saved area, returning the new key
    pub async fn copy_to_saved(&self, source_key: &str, job_id: Uuid) -> Result<String, StorageError> {
        let source = self.resolve(source_key)?;
        let key = format!(
            "{}/saved_{}_{}.mp3",
            SAVED_DIR,
            Utc::now().format("%Y%m%d%H%M%S%3f"),
            job_id
        );
        let target = self.resolve(&key)?;

        fs::copy(&source, &target).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(source_key.to_string()),
            _ => StorageError::Io(e),
        })?;

        Ok(key)
    }

    pub async fn read(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(key)?;
        fs::read(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(key.to_string()),
            _ => StorageError::Io(e),
        })
    }

    /// Remove a file; a missing file is not an error
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let is_plain = !key.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !is_plain {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}
