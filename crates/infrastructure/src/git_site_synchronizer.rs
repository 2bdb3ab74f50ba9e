use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use demodeck_application::{SiteSynchronizer, SyncReport, SyncRequest, SyncStrategy};
use demodeck_core::{AppError, AppResult};
use demodeck_domain::BranchName;
use tracing::{info, warn};

mod git;
mod publish;


use git::GitRunner;

/// Default limit for a single git process.
pub const DEFAULT_GIT_COMMAND_TIMEOUT: Duration = Duration::from_secs(300);

/// Filesystem layout and transport identity of the git synchronizer.
#[derive(Debug, Clone)]
pub struct GitSiteSynchronizerConfig {
    /// Parent of the persistent working copies. Never served.
    pub workspace_root: PathBuf,
    /// Parent of the published trees.
    pub static_root: PathBuf,
    /// Deploy key used for every remote operation.
    pub ssh_private_key_path: Option<PathBuf>,
    /// Limit for a single git process.
    pub command_timeout: Duration,
}

/// Synchronizes working copies with git and publishes them by atomic swap.
#[derive(Debug, Clone)]
pub struct GitSiteSynchronizer {
    workspace_root: PathBuf,
    static_root: PathBuf,
    git: GitRunner,
}

impl GitSiteSynchronizer {
    /// Creates a synchronizer for the given layout.
    #[must_use]
    pub fn new(config: GitSiteSynchronizerConfig) -> Self {
        Self {
            git: GitRunner::new(
                config.ssh_private_key_path.as_deref(),
                config.command_timeout,
            ),
            workspace_root: config.workspace_root,
            static_root: config.static_root,
        }
    }

    fn working_copy(&self, request: &SyncRequest) -> PathBuf {
        self.workspace_root
            .join(&request.project_name)
            .join(request.branch.directory_name())
    }

    /// Brings the working copy to the remote tip, escalating until one layer succeeds.
    async fn update_working_copy(
        &self,
        working_copy: &Path,
        branch: &BranchName,
        remote_url: &str,
    ) -> AppResult<SyncStrategy> {
        let has_repository = tokio::fs::metadata(working_copy.join(".git"))
            .await
            .is_ok_and(|metadata| metadata.is_dir());

        let mut failures = Vec::new();
        for strategy in SyncStrategy::escalation_order() {
            if !has_repository && *strategy != SyncStrategy::FreshClone {
                continue;
            }

            let attempt = match strategy {
                SyncStrategy::ResetToRemote => {
                    self.reset_to_remote(working_copy, branch, remote_url)
                        .await
                }
                SyncStrategy::ForceResetAndClean => {
                    self.force_reset_and_clean(working_copy, branch, remote_url)
                        .await
                }
                SyncStrategy::FreshClone => {
                    self.fresh_clone(working_copy, branch, remote_url).await
                }
            };

            match attempt {
                Ok(()) => return Ok(*strategy),
                Err(detail) => {
                    warn!(
                        working_copy = %working_copy.display(),
                        branch = %branch,
                        strategy = strategy.as_str(),
                        error = %detail,
                        "synchronization layer failed"
                    );
                    failures.push(format!("{}: {detail}", strategy.as_str()));
                }
            }
        }

        Err(AppError::Transport(failures.join("; ")))
    }

    async fn reset_to_remote(
        &self,
        working_copy: &Path,
        branch: &BranchName,
        remote_url: &str,
    ) -> Result<(), String> {
        let tracking = format!("origin/{branch}");
        self.git
            .run(
                Some(working_copy),
                &["remote", "set-url", "origin", remote_url],
            )
            .await?;
        self.git
            .run(
                Some(working_copy),
                &["fetch", "--depth", "1", "origin", branch.as_str()],
            )
            .await?;
        self.git
            .run(Some(working_copy), &["reset", "--hard", tracking.as_str()])
            .await
    }

    async fn force_reset_and_clean(
        &self,
        working_copy: &Path,
        branch: &BranchName,
        remote_url: &str,
    ) -> Result<(), String> {
        let refspec = format!("+refs/heads/{branch}:refs/remotes/origin/{branch}");
        let tracking = format!("origin/{branch}");
        self.git
            .run(
                Some(working_copy),
                &["remote", "set-url", "origin", remote_url],
            )
            .await?;
        self.git
            .run(
                Some(working_copy),
                &["fetch", "--force", "--depth", "1", "origin", refspec.as_str()],
            )
            .await?;
        self.git
            .run(
                Some(working_copy),
                &["reset", "--hard", tracking.as_str()],
            )
            .await?;
        self.git
            .run(Some(working_copy), &["clean", "-fdx"])
            .await
    }

    async fn fresh_clone(
        &self,
        working_copy: &Path,
        branch: &BranchName,
        remote_url: &str,
    ) -> Result<(), String> {
        match tokio::fs::remove_dir_all(working_copy).await {
            Ok(()) => {}
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
            Err(error) => {
                return Err(format!(
                    "failed to remove working copy '{}': {error}",
                    working_copy.display()
                ));
            }
        }
        if let Some(parent) = working_copy.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|error| {
                format!(
                    "failed to create workspace directory '{}': {error}",
                    parent.display()
                )
            })?;
        }

        let target = working_copy.display().to_string();
        self.git
            .run(
                None,
                &[
                    "clone",
                    "--depth",
                    "1",
                    "--single-branch",
                    "--branch",
                    branch.as_str(),
                    "--",
                    remote_url,
                    target.as_str(),
                ],
            )
            .await
    }
}

#[async_trait]
impl SiteSynchronizer for GitSiteSynchronizer {
    async fn sync(&self, request: &SyncRequest) -> AppResult<SyncReport> {
        let working_copy = self.working_copy(request);
        let remote_url = self.git.remote_url(&request.repository_url);
        let strategy = self
            .update_working_copy(&working_copy, &request.branch, &remote_url)
            .await?;

        let static_root = self.static_root.clone();
        let demo_path = request.demo_path.clone();
        let project_name = request.project_name.clone();
        let branch = request.branch.clone();
        let tree = tokio::task::spawn_blocking(move || {
            publish::publish(
                &working_copy,
                &demo_path,
                &static_root,
                &project_name,
                &branch,
            )
        })
        .await
        .map_err(|error| AppError::Internal(format!("publish task failed: {error}")))??;

        for folder in &request.sub_site_folders {
            if !tokio::fs::metadata(tree.root.join(folder))
                .await
                .is_ok_and(|metadata| metadata.is_dir())
            {
                warn!(
                    project = request.project_name.as_str(),
                    branch = %request.branch,
                    folder = folder.as_str(),
                    "configured sub-site folder is missing from published tree"
                );
            }
        }

        info!(
            project = request.project_name.as_str(),
            branch = %request.branch,
            strategy = strategy.as_str(),
            files = tree.files,
            published_root = %tree.root.display(),
            "published tree swapped in"
        );
        Ok(SyncReport {
            strategy,
            published_root: tree.root,
            published_files: tree.files,
        })
    }
}
