use chrono::{Duration, Utc};
use serde::Serialize;

use demodeck_core::{AppError, AppResult, AuditId, ProjectId};
use demodeck_domain::DeploymentAudit;

use crate::deployment_ports::AuditListQuery;

use super::DeploymentService;

/// Page size used when the caller does not ask for one.
pub const DEFAULT_AUDIT_PAGE_SIZE: u32 = 50;

/// Largest page size served.
pub const MAX_AUDIT_PAGE_SIZE: u32 = 200;

/// Trailing window of the statistics endpoint.
pub const DEFAULT_STATS_WINDOW_DAYS: u32 = 7;

const MAX_STATS_WINDOW_DAYS: u32 = 365;

/// One page of audit records.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditPage {
    /// Records ordered by start time, newest first.
    pub entries: Vec<DeploymentAudit>,
    /// Matching records across all pages.
    pub total: u64,
    /// One-based page number.
    pub page: u32,
    /// Page size.
    pub limit: u32,
    /// Number of pages.
    pub total_pages: u64,
}

/// Aggregate over a trailing window of audit records.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AuditStats {
    /// Records in the window.
    pub total: u64,
    /// Successful records.
    pub success: u64,
    /// Failed records.
    pub failed: u64,
    /// Pending records.
    pub pending: u64,
    /// Share of successful records in percent, two decimals.
    pub success_rate: f64,
    /// Rounded average processing time.
    pub avg_processing_ms: i64,
    /// Window length.
    pub period_days: u32,
}

impl DeploymentService {
    /// Lists audit records. Page defaults to 1 and the size is clamped to the served maximum.
    pub async fn list_audits(&self, query: AuditListQuery) -> AppResult<AuditPage> {
        let query = AuditListQuery {
            page: query.page.max(1),
            limit: match query.limit {
                0 => DEFAULT_AUDIT_PAGE_SIZE,
                limit => limit.min(MAX_AUDIT_PAGE_SIZE),
            },
            ..query
        };

        let (entries, total) = self.audits.list(query).await?;
        Ok(AuditPage {
            entries,
            total,
            page: query.page,
            limit: query.limit,
            total_pages: total.div_ceil(u64::from(query.limit)),
        })
    }

    /// Returns one audit record.
    pub async fn get_audit(&self, audit_id: AuditId) -> AppResult<DeploymentAudit> {
        self.audits.find(audit_id).await?.ok_or_else(|| {
            AppError::NotFound(format!("deployment audit '{audit_id}' does not exist"))
        })
    }

    /// Aggregates records started within the last `days` days.
    pub async fn audit_stats(
        &self,
        project_id: Option<ProjectId>,
        days: Option<u32>,
    ) -> AppResult<AuditStats> {
        let period_days = days
            .unwrap_or(DEFAULT_STATS_WINDOW_DAYS)
            .clamp(1, MAX_STATS_WINDOW_DAYS);
        let since = Utc::now() - Duration::days(i64::from(period_days));
        let counts = self.audits.count_by_status(project_id, since).await?;

        let success_rate = if counts.total == 0 {
            0.0
        } else {
            (counts.success as f64 / counts.total as f64 * 10_000.0).round() / 100.0
        };

        Ok(AuditStats {
            total: counts.total,
            success: counts.success,
            failed: counts.failed,
            pending: counts.pending,
            success_rate,
            avg_processing_ms: counts
                .avg_processing_ms
                .map(|average| average.round() as i64)
                .unwrap_or_default(),
            period_days,
        })
    }
}
