use demodeck_application::{AuditPage, AuditStats};
use demodeck_domain::{DeploymentAudit, DeploymentOutcome, DeploymentSummary};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Response of the webhook test endpoint.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/webhook-test-response.ts"
)]
pub struct WebhookTestResponse {
    pub message: String,
    pub timestamp: String,
    pub has_webhook_secret: bool,
}

/// Acknowledgement of a webhook event that is not processed.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/webhook-ignored-response.ts"
)]
pub struct WebhookIgnoredResponse {
    pub message: String,
    pub event_type: Option<String>,
}

/// Webhook push that matched no demo config.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/webhook-no-match-response.ts"
)]
pub struct WebhookNoMatchResponse {
    pub message: String,
    pub repository: String,
    pub branch: String,
    pub audit_id: Option<String>,
}

/// Webhook push that ran to completion.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/webhook-deployment-response.ts"
)]
pub struct WebhookDeploymentResponse {
    pub message: String,
    pub repository: String,
    pub branch: String,
    pub audit_id: String,
    pub total_configs: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub results: Vec<DeploymentResultResponse>,
}

/// Result of one demo config synchronization.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/deployment-result-response.ts"
)]
pub struct DeploymentResultResponse {
    pub demo_config_id: String,
    pub success: bool,
    pub message: String,
    pub error: Option<String>,
}

impl From<&DeploymentOutcome> for DeploymentResultResponse {
    fn from(outcome: &DeploymentOutcome) -> Self {
        Self {
            demo_config_id: outcome.demo_config_id.to_string(),
            success: outcome.success,
            message: outcome.message.clone(),
            error: outcome.error.clone(),
        }
    }
}

/// Aggregate stored on a completed audit record.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/deployment-summary-response.ts"
)]
pub struct DeploymentSummaryResponse {
    pub message: Option<String>,
    pub total_configs: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub results: Vec<DeploymentResultResponse>,
}

impl From<&DeploymentSummary> for DeploymentSummaryResponse {
    fn from(summary: &DeploymentSummary) -> Self {
        Self {
            message: summary.message.clone(),
            total_configs: summary.total_configs,
            success_count: summary.success_count,
            failure_count: summary.failure_count,
            results: summary
                .results
                .iter()
                .map(DeploymentResultResponse::from)
                .collect(),
        }
    }
}

/// Incoming payload for a manual deployment.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/trigger-deployment-request.ts"
)]
pub struct TriggerDeploymentRequest {
    pub project_id: String,
    #[serde(default)]
    pub branch: Option<String>,
}

/// Deployment accepted for background execution.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/scheduled-deployment-response.ts"
)]
pub struct ScheduledDeploymentResponse {
    pub message: String,
    pub audit_id: String,
    pub project_id: String,
    pub branch: String,
    pub event: String,
    pub status: String,
}

impl ScheduledDeploymentResponse {
    #[must_use]
    pub fn accepted(message: &str, audit: &DeploymentAudit) -> Self {
        Self {
            message: message.to_owned(),
            audit_id: audit.id().to_string(),
            project_id: audit.project_id().to_string(),
            branch: audit.branch().as_str().to_owned(),
            event: audit.event().as_str().to_owned(),
            status: audit.status().as_str().to_owned(),
        }
    }
}

/// API representation of a deployment audit record.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/deployment-audit-response.ts"
)]
pub struct DeploymentAuditResponse {
    pub id: String,
    pub project_id: String,
    pub branch: String,
    pub event: String,
    pub repository_full_name: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub status: String,
    pub error_message: Option<String>,
    pub summary: Option<DeploymentSummaryResponse>,
    #[ts(type = "number | null")]
    pub processing_ms: Option<i64>,
}

impl From<&DeploymentAudit> for DeploymentAuditResponse {
    fn from(audit: &DeploymentAudit) -> Self {
        Self {
            id: audit.id().to_string(),
            project_id: audit.project_id().to_string(),
            branch: audit.branch().as_str().to_owned(),
            event: audit.event().as_str().to_owned(),
            repository_full_name: audit.repository_full_name().to_owned(),
            started_at: audit.started_at().to_rfc3339(),
            finished_at: audit.finished_at().map(|value| value.to_rfc3339()),
            status: audit.status().as_str().to_owned(),
            error_message: audit.error_message().map(ToOwned::to_owned),
            summary: audit.summary().map(DeploymentSummaryResponse::from),
            processing_ms: audit.processing_ms(),
        }
    }
}

/// Query parameters of the audit list.
#[derive(Debug, Default, Deserialize)]
pub struct AuditListParams {
    pub status: Option<String>,
    pub project_id: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// One page of audit records.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/audit-list-response.ts"
)]
pub struct AuditListResponse {
    pub entries: Vec<DeploymentAuditResponse>,
    #[ts(type = "number")]
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    #[ts(type = "number")]
    pub total_pages: u64,
}

impl From<AuditPage> for AuditListResponse {
    fn from(page: AuditPage) -> Self {
        Self {
            entries: page
                .entries
                .iter()
                .map(DeploymentAuditResponse::from)
                .collect(),
            total: page.total,
            page: page.page,
            limit: page.limit,
            total_pages: page.total_pages,
        }
    }
}

/// Query parameters of the audit statistics.
#[derive(Debug, Default, Deserialize)]
pub struct AuditStatsParams {
    pub project_id: Option<String>,
    pub days: Option<u32>,
}

/// Aggregate over recent audit records.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/audit-stats-response.ts"
)]
pub struct AuditStatsResponse {
    #[ts(type = "number")]
    pub total: u64,
    #[ts(type = "number")]
    pub success: u64,
    #[ts(type = "number")]
    pub failed: u64,
    #[ts(type = "number")]
    pub pending: u64,
    pub success_rate: f64,
    #[ts(type = "number")]
    pub avg_processing_ms: i64,
    pub period_days: u32,
}

impl From<AuditStats> for AuditStatsResponse {
    fn from(stats: AuditStats) -> Self {
        Self {
            total: stats.total,
            success: stats.success,
            failed: stats.failed,
            pending: stats.pending,
            success_rate: stats.success_rate,
            avg_processing_ms: stats.avg_processing_ms,
            period_days: stats.period_days,
        }
    }
}
