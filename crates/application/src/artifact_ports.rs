use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use demodeck_core::AppResult;
use demodeck_domain::{ArtifactPath, BranchName};

/// Published file resolved inside a (project, branch) root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactFile {
    /// Canonical path of the file.
    pub path: PathBuf,
    /// File size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified_at: DateTime<Utc>,
}

impl ArtifactFile {
    /// Returns whether the file changed after the client's copy.
    ///
    /// HTTP dates carry whole seconds, so sub-second precision is dropped.
    #[must_use]
    pub fn is_modified_since(&self, since: Option<DateTime<Utc>>) -> bool {
        match since {
            Some(since) => self.modified_at.timestamp() > since.timestamp(),
            None => true,
        }
    }
}

/// Resolves requested paths against published roots.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Resolves a file beneath `{project}/{branch}`.
    ///
    /// Escapes are `AppError::Forbidden`. Missing files and directories without an
    /// index page are `AppError::NotFound`.
    async fn resolve(
        &self,
        project_name: &str,
        branch: &BranchName,
        path: &ArtifactPath,
    ) -> AppResult<ArtifactFile>;
}
