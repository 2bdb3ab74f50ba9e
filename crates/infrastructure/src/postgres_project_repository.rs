use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use demodeck_application::{DeploymentStatusUpdate, ProjectRepository};
use demodeck_core::{AppError, AppResult, DemoConfigId, ProjectId};
use demodeck_domain::{BranchName, DemoConfig, DemoConfigInput, DeploymentStatus, Project};


/// PostgreSQL-backed read model of projects and demo configs.
#[derive(Clone)]
pub struct PostgresProjectRepository {
    pool: PgPool,
}

impl PostgresProjectRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ProjectRow {
    id: uuid::Uuid,
    name: String,
    repository_url: String,
    repository_full_name: String,
    is_active: bool,
}

impl TryFrom<ProjectRow> for Project {
    type Error = AppError;

    fn try_from(row: ProjectRow) -> AppResult<Self> {
        Project::new(
            ProjectId::from_uuid(row.id),
            row.name,
            row.repository_url,
            row.repository_full_name,
            row.is_active,
        )
    }
}

#[derive(Debug, FromRow)]
struct DemoConfigRow {
    id: uuid::Uuid,
    project_id: uuid::Uuid,
    branch: String,
    demo_path: String,
    sub_site_folders: Option<String>,
    display_name: Option<String>,
    deployment_status: String,
    last_deployment_at: Option<DateTime<Utc>>,
    deployment_error: Option<String>,
    is_active: bool,
}

impl TryFrom<DemoConfigRow> for DemoConfig {
    type Error = AppError;

    fn try_from(row: DemoConfigRow) -> AppResult<Self> {
        DemoConfig::new(DemoConfigInput {
            id: DemoConfigId::from_uuid(row.id),
            project_id: ProjectId::from_uuid(row.project_id),
            branch: row.branch,
            demo_path: row.demo_path,
            sub_site_folders: row.sub_site_folders,
            display_name: row.display_name,
            deployment_status: DeploymentStatus::parse(row.deployment_status.as_str())?,
            last_deployment_at: row.last_deployment_at,
            deployment_error: row.deployment_error,
            is_active: row.is_active,
        })
    }
}

const DEMO_CONFIG_COLUMNS: &str = r#"
    id,
    project_id,
    branch,
    demo_path,
    sub_site_folders,
    display_name,
    deployment_status,
    last_deployment_at,
    deployment_error,
    is_active
"#;

#[async_trait]
impl ProjectRepository for PostgresProjectRepository {
    async fn find_project(&self, project_id: ProjectId) -> AppResult<Option<Project>> {
        let row = sqlx::query_as::<_, ProjectRow>(
            r#"
            SELECT id, name, repository_url, repository_full_name, is_active
            FROM projects
            WHERE id = $1
            "#,
        )
        .bind(project_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find project: {error}")))?;

        row.map(Project::try_from).transpose()
    }

    async fn find_project_by_name(&self, name: &str) -> AppResult<Option<Project>> {
        let row = sqlx::query_as::<_, ProjectRow>(
            r#"
            SELECT id, name, repository_url, repository_full_name, is_active
            FROM projects
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to find project by name: {error}"))
        })?;

        row.map(Project::try_from).transpose()
    }

    async fn list_active_projects(&self) -> AppResult<Vec<Project>> {
        let rows = sqlx::query_as::<_, ProjectRow>(
            r#"
            SELECT id, name, repository_url, repository_full_name, is_active
            FROM projects
            WHERE is_active
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list active projects: {error}"))
        })?;

        rows.into_iter().map(Project::try_from).collect()
    }

    async fn list_active_projects_by_repository(
        &self,
        repository_full_name: &str,
    ) -> AppResult<Vec<Project>> {
        let rows = sqlx::query_as::<_, ProjectRow>(
            r#"
            SELECT id, name, repository_url, repository_full_name, is_active
            FROM projects
            WHERE is_active AND repository_full_name = $1
            ORDER BY name
            "#,
        )
        .bind(repository_full_name)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to list projects for repository '{repository_full_name}': {error}"
            ))
        })?;

        rows.into_iter().map(Project::try_from).collect()
    }

    async fn list_active_demo_configs(
        &self,
        project_ids: &[ProjectId],
        branch: &BranchName,
    ) -> AppResult<Vec<DemoConfig>> {
        if project_ids.is_empty() {
            return Ok(Vec::new());
        }

        let project_ids: Vec<uuid::Uuid> =
            project_ids.iter().map(|project_id| project_id.as_uuid()).collect();
        let rows = sqlx::query_as::<_, DemoConfigRow>(&format!(
            r#"
            SELECT {DEMO_CONFIG_COLUMNS}
            FROM demo_configs
            WHERE is_active AND project_id = ANY($1) AND branch = $2
            ORDER BY created_at, id
            "#
        ))
        .bind(project_ids)
        .bind(branch.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to list demo configs for branch '{branch}': {error}"
            ))
        })?;

        rows.into_iter().map(DemoConfig::try_from).collect()
    }

    async fn find_demo_config(
        &self,
        demo_config_id: DemoConfigId,
    ) -> AppResult<Option<DemoConfig>> {
        let row = sqlx::query_as::<_, DemoConfigRow>(&format!(
            r#"
            SELECT {DEMO_CONFIG_COLUMNS}
            FROM demo_configs
            WHERE id = $1
            "#
        ))
        .bind(demo_config_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find demo config: {error}")))?;

        row.map(DemoConfig::try_from).transpose()
    }

    async fn find_demo_config_by_branch(
        &self,
        project_id: ProjectId,
        branch: &BranchName,
    ) -> AppResult<Option<DemoConfig>> {
        let row = sqlx::query_as::<_, DemoConfigRow>(&format!(
            r#"
            SELECT {DEMO_CONFIG_COLUMNS}
            FROM demo_configs
            WHERE project_id = $1 AND branch = $2
            "#
        ))
        .bind(project_id.as_uuid())
        .bind(branch.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to find demo config by branch: {error}"))
        })?;

        row.map(DemoConfig::try_from).transpose()
    }

    async fn update_deployment_status(
        &self,
        demo_config_id: DemoConfigId,
        update: DeploymentStatusUpdate,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE demo_configs
            SET deployment_status = $2,
                last_deployment_at = COALESCE($3, last_deployment_at),
                deployment_error = $4
            WHERE id = $1
            "#,
        )
        .bind(demo_config_id.as_uuid())
        .bind(update.status.as_str())
        .bind(update.last_deployment_at)
        .bind(update.deployment_error)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to update deployment status: {error}"))
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "demo config '{demo_config_id}' not found"
            )));
        }

        Ok(())
    }
}
