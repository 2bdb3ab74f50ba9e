use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use demodeck_application::{ArtifactFile, ArtifactStore};
use demodeck_core::{AppError, AppResult};
use demodeck_domain::{ArtifactPath, BranchName};


const INDEX_FILE: &str = "index.html";

/// Serves files from published trees under a static root.
#[derive(Debug, Clone)]
pub struct FilesystemArtifactStore {
    static_root: PathBuf,
}

impl FilesystemArtifactStore {
    /// Creates a store rooted at the published static directory.
    #[must_use]
    pub fn new(static_root: PathBuf) -> Self {
        Self { static_root }
    }
}

#[async_trait]
impl ArtifactStore for FilesystemArtifactStore {
    async fn resolve(
        &self,
        project_name: &str,
        branch: &BranchName,
        path: &ArtifactPath,
    ) -> AppResult<ArtifactFile> {
        let published_root = self
            .static_root
            .join(project_name)
            .join(branch.directory_name());
        let segments = path.segments().to_vec();

        tokio::task::spawn_blocking(move || resolve_within(&published_root, &segments))
            .await
            .map_err(|error| AppError::Internal(format!("artifact lookup task failed: {error}")))?
    }
}

fn resolve_within(published_root: &Path, segments: &[String]) -> AppResult<ArtifactFile> {
    let root = canonicalize(published_root)?;
    let candidate = segments
        .iter()
        .fold(root.clone(), |path, segment| path.join(segment));
    let mut resolved = canonicalize(&candidate)?;
    if !resolved.starts_with(&root) {
        return Err(AppError::Forbidden(
            "requested path escapes the published root".to_owned(),
        ));
    }

    let mut metadata = metadata(&resolved)?;
    if metadata.is_dir() {
        resolved = canonicalize(&resolved.join(INDEX_FILE))?;
        if !resolved.starts_with(&root) {
            return Err(AppError::Forbidden(
                "requested path escapes the published root".to_owned(),
            ));
        }
        metadata = metadata_of_file(&resolved)?;
    } else if !metadata.is_file() {
        return Err(AppError::NotFound("artifact not found".to_owned()));
    }

    let modified_at = metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to read modification time of '{}': {error}",
                resolved.display()
            ))
        })?;

    Ok(ArtifactFile {
        path: resolved,
        size: metadata.len(),
        modified_at,
    })
}

fn canonicalize(path: &Path) -> AppResult<PathBuf> {
    fs::canonicalize(path).map_err(|error| match error.kind() {
        ErrorKind::NotFound | ErrorKind::NotADirectory => {
            AppError::NotFound("artifact not found".to_owned())
        }
        _ => AppError::Internal(format!(
            "failed to resolve '{}': {error}",
            path.display()
        )),
    })
}

fn metadata(path: &Path) -> AppResult<fs::Metadata> {
    fs::metadata(path).map_err(|error| {
        AppError::Internal(format!("failed to inspect '{}': {error}", path.display()))
    })
}

fn metadata_of_file(path: &Path) -> AppResult<fs::Metadata> {
    let metadata = metadata(path)?;
    if metadata.is_file() {
        Ok(metadata)
    } else {
        Err(AppError::NotFound("artifact not found".to_owned()))
    }
}
