use async_trait::async_trait;
use chrono::{DateTime, Utc};

use demodeck_core::{AppResult, DemoConfigId, ProjectId};
use demodeck_domain::{BranchName, DemoConfig, DeploymentStatus, Project};

/// Deployment state written back onto a demo config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentStatusUpdate {
    /// New deployment state.
    pub status: DeploymentStatus,
    /// Finish time, set for terminal states.
    pub last_deployment_at: Option<DateTime<Utc>>,
    /// Failure detail, cleared on success.
    pub deployment_error: Option<String>,
}

impl DeploymentStatusUpdate {
    /// Marks a config as currently deploying.
    #[must_use]
    pub fn deploying() -> Self {
        Self {
            status: DeploymentStatus::Deploying,
            last_deployment_at: None,
            deployment_error: None,
        }
    }

    /// Marks a config as successfully deployed.
    #[must_use]
    pub fn succeeded(at: DateTime<Utc>) -> Self {
        Self {
            status: DeploymentStatus::Success,
            last_deployment_at: Some(at),
            deployment_error: None,
        }
    }

    /// Marks a config as failed.
    #[must_use]
    pub fn failed(at: DateTime<Utc>, error: impl Into<String>) -> Self {
        Self {
            status: DeploymentStatus::Failed,
            last_deployment_at: Some(at),
            deployment_error: Some(error.into()),
        }
    }
}

/// Read access to projects and demo configs owned by the administrative layer.
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Finds a project by id regardless of its active flag.
    async fn find_project(&self, project_id: ProjectId) -> AppResult<Option<Project>>;

    /// Finds a project by its unique name regardless of its active flag.
    async fn find_project_by_name(&self, name: &str) -> AppResult<Option<Project>>;

    /// Lists every active project ordered by name.
    async fn list_active_projects(&self) -> AppResult<Vec<Project>>;

    /// Lists active projects bound to an `owner/repo` repository, ordered by name.
    async fn list_active_projects_by_repository(
        &self,
        repository_full_name: &str,
    ) -> AppResult<Vec<Project>>;

    /// Lists active demo configs of the given projects for one branch.
    async fn list_active_demo_configs(
        &self,
        project_ids: &[ProjectId],
        branch: &BranchName,
    ) -> AppResult<Vec<DemoConfig>>;

    /// Finds a demo config by id regardless of its active flag.
    async fn find_demo_config(&self, demo_config_id: DemoConfigId)
    -> AppResult<Option<DemoConfig>>;

    /// Finds the demo config of one (project, branch) pair.
    async fn find_demo_config_by_branch(
        &self,
        project_id: ProjectId,
        branch: &BranchName,
    ) -> AppResult<Option<DemoConfig>>;

    /// Writes deployment state back onto a demo config.
    async fn update_deployment_status(
        &self,
        demo_config_id: DemoConfigId,
        update: DeploymentStatusUpdate,
    ) -> AppResult<()>;
}
