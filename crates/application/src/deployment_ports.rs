use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use demodeck_core::{AppResult, AuditId, ProjectId};
use demodeck_domain::{AuditStatus, BranchName, DemoPath, DeploymentAudit};

/// Input of one synchronization run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    /// Clone URL of the source repository.
    pub repository_url: String,
    /// Branch to publish.
    pub branch: BranchName,
    /// Project directory name under the published root.
    pub project_name: String,
    /// Sub-tree of the working copy that gets published.
    pub demo_path: DemoPath,
    /// Folders expected inside the published tree.
    pub sub_site_folders: Vec<String>,
}

/// Recovery layer that brought the working copy up to date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStrategy {
    /// Fetch and hard reset of an existing working copy.
    ResetToRemote,
    /// Fetch, hard reset and removal of untracked and ignored files.
    ForceResetAndClean,
    /// Working copy removed and cloned again.
    FreshClone,
}

impl SyncStrategy {
    /// Returns every strategy in escalation order.
    #[must_use]
    pub fn escalation_order() -> &'static [Self] {
        const ORDER: &[SyncStrategy] = &[
            SyncStrategy::ResetToRemote,
            SyncStrategy::ForceResetAndClean,
            SyncStrategy::FreshClone,
        ];

        ORDER
    }

    /// Returns a stable label.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResetToRemote => "reset_to_remote",
            Self::ForceResetAndClean => "force_reset_and_clean",
            Self::FreshClone => "fresh_clone",
        }
    }
}

/// Result of a successful synchronization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Layer that succeeded.
    pub strategy: SyncStrategy,
    /// Directory now served for the (project, branch) pair.
    pub published_root: PathBuf,
    /// Number of regular files published.
    pub published_files: usize,
}

/// Makes a published directory match a remote branch tip.
#[async_trait]
pub trait SiteSynchronizer: Send + Sync {
    /// Synchronizes and publishes one branch.
    ///
    /// Returns `AppError::Transport` once every recovery layer has failed.
    async fn sync(&self, request: &SyncRequest) -> AppResult<SyncReport>;
}

/// Filters and paging for the audit list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditListQuery {
    /// Optional status filter.
    pub status: Option<AuditStatus>,
    /// Optional project filter.
    pub project_id: Option<ProjectId>,
    /// One-based page number.
    pub page: u32,
    /// Page size.
    pub limit: u32,
}

impl AuditListQuery {
    /// Returns the row offset of the page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

/// Raw aggregate over a window of audit records.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AuditStatusCounts {
    /// Records in the window.
    pub total: u64,
    /// Successful records.
    pub success: u64,
    /// Failed records.
    pub failed: u64,
    /// Pending records.
    pub pending: u64,
    /// Average processing time of terminal records.
    pub avg_processing_ms: Option<f64>,
}

/// Persistence for deployment audit records.
#[async_trait]
pub trait DeploymentAuditRepository: Send + Sync {
    /// Stores a new pending record.
    async fn create(&self, audit: &DeploymentAudit) -> AppResult<()>;

    /// Persists the terminal transition of a record.
    ///
    /// Returns `AppError::Conflict` when the stored record is no longer pending.
    async fn complete(&self, audit: &DeploymentAudit) -> AppResult<()>;

    /// Finds one record.
    async fn find(&self, audit_id: AuditId) -> AppResult<Option<DeploymentAudit>>;

    /// Lists one page ordered by start time descending, with the unpaged total.
    async fn list(&self, query: AuditListQuery) -> AppResult<(Vec<DeploymentAudit>, u64)>;

    /// Counts records started at or after `since`.
    async fn count_by_status(
        &self,
        project_id: Option<ProjectId>,
        since: DateTime<Utc>,
    ) -> AppResult<AuditStatusCounts>;
}
