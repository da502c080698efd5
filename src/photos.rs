use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{debug, warn};
use uuid::Uuid;

use crate::error::AppResult;

/// Directory holding uploaded photos. The stored file name is the reference
/// kept on incidents and pets.
#[derive(Debug, Clone)]
pub struct PhotoStorage {
    dir: PathBuf,
}

impl PhotoStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        PhotoStorage { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copies an uploaded temp file in as `<field>-<millis>-<uuid><.ext>`.
    pub async fn save(&self, field: &str, src: &Path, original_name: Option<&str>) -> AppResult<String> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let name = stored_name(field, original_name);
        tokio::fs::copy(src, self.dir.join(&name)).await?;
        debug!("Stored upload {}", name);
        Ok(name)
    }

    pub async fn discard(&self, name: &str) {
        if let Err(e) = tokio::fs::remove_file(self.dir.join(name)).await {
            warn!("Could not remove orphaned upload {}: {}", name, e);
        }
    }
}

fn stored_name(field: &str, original_name: Option<&str>) -> String {
    let extension = original_name
        .and_then(|n| Path::new(n).extension())
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default();
    format!(
        "{}-{}-{}{}",
        field,
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple(),
        extension
    )
}
