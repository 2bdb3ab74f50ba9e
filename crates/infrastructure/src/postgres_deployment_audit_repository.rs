use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

use demodeck_application::{AuditListQuery, AuditStatusCounts, DeploymentAuditRepository};
use demodeck_core::{AppError, AppResult, AuditId, ProjectId};
use demodeck_domain::{
    AuditStatus, BranchName, DeploymentAudit, DeploymentAuditParts, DeploymentSummary,
    DeploymentTrigger,
};


/// PostgreSQL-backed deployment audit log.
///
/// Terminal records are never rewritten: completion is a conditional update on
/// `status = 'pending'`.
#[derive(Clone)]
pub struct PostgresDeploymentAuditRepository {
    pool: PgPool,
}

impl PostgresDeploymentAuditRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AuditRow {
    id: uuid::Uuid,
    project_id: uuid::Uuid,
    branch: String,
    event: String,
    repository_full_name: String,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    status: String,
    error_message: Option<String>,
    summary: Option<Json<DeploymentSummary>>,
    processing_ms: Option<i64>,
}

impl TryFrom<AuditRow> for DeploymentAudit {
    type Error = AppError;

    fn try_from(row: AuditRow) -> AppResult<Self> {
        DeploymentAudit::from_parts(DeploymentAuditParts {
            id: AuditId::from_uuid(row.id),
            project_id: ProjectId::from_uuid(row.project_id),
            branch: BranchName::new(row.branch)?,
            event: DeploymentTrigger::parse(row.event.as_str())?,
            repository_full_name: row.repository_full_name,
            started_at: row.started_at,
            finished_at: row.finished_at,
            status: AuditStatus::parse(row.status.as_str())?,
            error_message: row.error_message,
            summary: row.summary.map(|Json(summary)| summary),
            processing_ms: row.processing_ms,
        })
    }
}

#[derive(Debug, FromRow)]
struct StatusCountsRow {
    total: i64,
    success: i64,
    failed: i64,
    pending: i64,
    avg_processing_ms: Option<f64>,
}

fn count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

#[async_trait]
impl DeploymentAuditRepository for PostgresDeploymentAuditRepository {
    async fn create(&self, audit: &DeploymentAudit) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO deployment_audits (
                id,
                project_id,
                branch,
                event,
                repository_full_name,
                started_at,
                finished_at,
                status,
                error_message,
                summary,
                processing_ms
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(audit.id().as_uuid())
        .bind(audit.project_id().as_uuid())
        .bind(audit.branch().as_str())
        .bind(audit.event().as_str())
        .bind(audit.repository_full_name())
        .bind(audit.started_at())
        .bind(audit.finished_at())
        .bind(audit.status().as_str())
        .bind(audit.error_message())
        .bind(audit.summary().map(Json))
        .bind(audit.processing_ms())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to create deployment audit: {error}"))
        })?;

        Ok(())
    }

    async fn complete(&self, audit: &DeploymentAudit) -> AppResult<()> {
        if !audit.status().is_terminal() {
            return Err(AppError::Validation(format!(
                "audit '{}' has no terminal status to persist",
                audit.id()
            )));
        }

        let result = sqlx::query(
            r#"
            UPDATE deployment_audits
            SET status = $2,
                finished_at = $3,
                error_message = $4,
                summary = $5,
                processing_ms = $6
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(audit.id().as_uuid())
        .bind(audit.status().as_str())
        .bind(audit.finished_at())
        .bind(audit.error_message())
        .bind(audit.summary().map(Json))
        .bind(audit.processing_ms())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to complete deployment audit: {error}"))
        })?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        match self.find(audit.id()).await? {
            Some(stored) => Err(AppError::Conflict(format!(
                "audit '{}' is already {}",
                audit.id(),
                stored.status().as_str()
            ))),
            None => Err(AppError::NotFound(format!(
                "audit '{}' not found",
                audit.id()
            ))),
        }
    }

    async fn find(&self, audit_id: AuditId) -> AppResult<Option<DeploymentAudit>> {
        let row = sqlx::query_as::<_, AuditRow>(
            r#"
            SELECT
                id,
                project_id,
                branch,
                event,
                repository_full_name,
                started_at,
                finished_at,
                status,
                error_message,
                summary,
                processing_ms
            FROM deployment_audits
            WHERE id = $1
            "#,
        )
        .bind(audit_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to find deployment audit: {error}"))
        })?;

        row.map(DeploymentAudit::try_from).transpose()
    }

    async fn list(&self, query: AuditListQuery) -> AppResult<(Vec<DeploymentAudit>, u64)> {
        let status = query.status.map(|status| status.as_str());
        let project_id = query.project_id.map(|project_id| project_id.as_uuid());

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM deployment_audits
            WHERE ($1::TEXT IS NULL OR status = $1)
                AND ($2::UUID IS NULL OR project_id = $2)
            "#,
        )
        .bind(status)
        .bind(project_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to count deployment audits: {error}"))
        })?;

        let rows = sqlx::query_as::<_, AuditRow>(
            r#"
            SELECT
                id,
                project_id,
                branch,
                event,
                repository_full_name,
                started_at,
                finished_at,
                status,
                error_message,
                summary,
                processing_ms
            FROM deployment_audits
            WHERE ($1::TEXT IS NULL OR status = $1)
                AND ($2::UUID IS NULL OR project_id = $2)
            ORDER BY started_at DESC, id DESC
            LIMIT $3
            OFFSET $4
            "#,
        )
        .bind(status)
        .bind(project_id)
        .bind(i64::from(query.limit))
        .bind(i64::try_from(query.offset()).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list deployment audits: {error}"))
        })?;

        let audits = rows
            .into_iter()
            .map(DeploymentAudit::try_from)
            .collect::<AppResult<Vec<_>>>()?;
        Ok((audits, count(total)))
    }

    async fn count_by_status(
        &self,
        project_id: Option<ProjectId>,
        since: DateTime<Utc>,
    ) -> AppResult<AuditStatusCounts> {
        let row = sqlx::query_as::<_, StatusCountsRow>(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'success') AS success,
                COUNT(*) FILTER (WHERE status = 'failed') AS failed,
                COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                (AVG(processing_ms) FILTER (WHERE processing_ms IS NOT NULL))::DOUBLE PRECISION
                    AS avg_processing_ms
            FROM deployment_audits
            WHERE started_at >= $1
                AND ($2::UUID IS NULL OR project_id = $2)
            "#,
        )
        .bind(since)
        .bind(project_id.map(|project_id| project_id.as_uuid()))
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to aggregate deployment audits: {error}"))
        })?;

        Ok(AuditStatusCounts {
            total: count(row.total),
            success: count(row.success),
            failed: count(row.failed),
            pending: count(row.pending),
            avg_processing_ms: row.avg_processing_ms,
        })
    }
}
