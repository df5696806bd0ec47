//! Per-task output destinations for bulk fetches

use crate::fetch::task::TaskId;
use crate::SourceError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Durable home for one fetched payload per task id
///
/// Destinations are partitioned by id, so two tasks never write to the same
/// unit and workers need no coordination beyond the queue.
#[async_trait]
pub trait TaskDestination: Send + Sync {
    async fn store(&self, id: &TaskId, payload: &[u8]) -> Result<(), SourceError>;
}

/// Writes each payload to `<dir>/<id>.<extension>`
#[derive(Debug, Clone)]
pub struct DirectoryDestination {
    dir: PathBuf,
    extension: String,
}

impl DirectoryDestination {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
        }
    }

    /// Creates the output directory if needed
    pub async fn prepare(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `id`'s payload
    ///
    /// Separators and `%` are percent-encoded, so distinct ids always map to
    /// distinct files.
    pub fn path_for(&self, id: &TaskId) -> PathBuf {
        self.dir
            .join(format!("{}.{}", encode_file_name(id.as_str()), self.extension))
    }
}

fn encode_file_name(id: &str) -> String {
    let mut encoded = String::with_capacity(id.len());
    for c in id.chars() {
        match c {
            '%' | '/' | '\\' | ':' => encoded.push_str(&format!("%{:02X}", c as u32)),
            _ => encoded.push(c),
        }
    }
    encoded
}

#[async_trait]
impl TaskDestination for DirectoryDestination {
    async fn store(&self, id: &TaskId, payload: &[u8]) -> Result<(), SourceError> {
        let path = self.path_for(id);
        let tmp = path.with_extension(format!("{}.part", self.extension));
        let to_store_error = |source| SourceError::Store {
            target: path.display().to_string(),
            source,
        };

        tokio::fs::write(&tmp, payload)
            .await
            .map_err(to_store_error)?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(to_store_error)?;
        Ok(())
    }
}
