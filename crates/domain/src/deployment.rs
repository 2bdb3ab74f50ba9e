use std::str::FromStr;

use chrono::{DateTime, Utc};
use demodeck_core::{AppError, AppResult, AuditId, DemoConfigId, NonEmptyString, ProjectId};
use serde::{Deserialize, Serialize};

use crate::BranchName;

/// Message recorded when a trigger matched no active demo config.
pub const NO_MATCHING_CONFIGS_MESSAGE: &str = "No matching demo configurations found";

/// Lifecycle state of a deployment audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    /// Execution is in progress.
    Pending,
    /// Processing completed. Individual configs may still have failed.
    Success,
    /// Orchestration itself failed.
    Failed,
}

impl AuditStatus {
    /// Returns whether no further transition is allowed.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    /// Parses a stored value.
    pub fn parse(value: &str) -> AppResult<Self> {
        Self::from_str(value)
    }
}

impl FromStr for AuditStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            _ => Err(AppError::Validation(format!(
                "unknown audit status '{value}'"
            ))),
        }
    }
}

/// Event that started a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DeploymentTrigger {
    /// Webhook push event.
    Push,
    /// Manual trigger by project id.
    ManualTrigger,
    /// Re-execution of a prior audit record.
    ReExecute,
    /// Any other webhook event name.
    Webhook(String),
}

impl DeploymentTrigger {
    /// Parses an event name.
    pub fn parse(value: &str) -> AppResult<Self> {
        let value = value.trim();
        Ok(match value {
            "push" => Self::Push,
            "manual_trigger" => Self::ManualTrigger,
            "re_execute" => Self::ReExecute,
            _ => Self::Webhook(NonEmptyString::new(value)?.into()),
        })
    }

    /// Returns the stored event name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Push => "push",
            Self::ManualTrigger => "manual_trigger",
            Self::ReExecute => "re_execute",
            Self::Webhook(value) => value.as_str(),
        }
    }
}

impl TryFrom<String> for DeploymentTrigger {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value.as_str())
    }
}

impl From<DeploymentTrigger> for String {
    fn from(value: DeploymentTrigger) -> Self {
        value.as_str().to_owned()
    }
}

/// Result of deploying one demo config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentOutcome {
    /// Deployed config.
    pub demo_config_id: DemoConfigId,
    /// Whether the synchronization succeeded.
    pub success: bool,
    /// Human-readable result line.
    pub message: String,
    /// Captured failure detail.
    pub error: Option<String>,
}

impl DeploymentOutcome {
    /// Builds a successful outcome.
    #[must_use]
    pub fn succeeded(demo_config_id: DemoConfigId, message: impl Into<String>) -> Self {
        Self {
            demo_config_id,
            success: true,
            message: message.into(),
            error: None,
        }
    }

    /// Builds a failed outcome.
    #[must_use]
    pub fn failed(demo_config_id: DemoConfigId, error: impl Into<String>) -> Self {
        Self {
            demo_config_id,
            success: false,
            message: "Deployment failed".to_owned(),
            error: Some(error.into()),
        }
    }
}

/// Aggregated result stored on a successful audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentSummary {
    /// Optional note, set when nothing was deployed.
    pub message: Option<String>,
    /// Number of matched demo configs.
    pub total_configs: usize,
    /// Number of successful synchronizations.
    pub success_count: usize,
    /// Number of failed synchronizations.
    pub failure_count: usize,
    /// Per-config results.
    pub results: Vec<DeploymentOutcome>,
}

impl DeploymentSummary {
    /// Counts a settled set of outcomes.
    #[must_use]
    pub fn from_outcomes(results: Vec<DeploymentOutcome>) -> Self {
        let success_count = results.iter().filter(|outcome| outcome.success).count();
        Self {
            message: None,
            total_configs: results.len(),
            success_count,
            failure_count: results.len() - success_count,
            results,
        }
    }

    /// Summary for a trigger that matched nothing.
    #[must_use]
    pub fn no_matching_configs() -> Self {
        Self {
            message: Some(NO_MATCHING_CONFIGS_MESSAGE.to_owned()),
            total_configs: 0,
            success_count: 0,
            failure_count: 0,
            results: Vec::new(),
        }
    }
}

/// Terminal transition applied to a pending audit record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditOutcome {
    /// Processing completed.
    Success(DeploymentSummary),
    /// Orchestration failed with the given error text.
    Failed(String),
}

/// Stored fields of an audit record, used to rehydrate it from persistence.
#[derive(Debug, Clone)]
pub struct DeploymentAuditParts {
    /// Record identifier.
    pub id: AuditId,
    /// Project the record is attached to.
    pub project_id: ProjectId,
    /// Deployed branch.
    pub branch: BranchName,
    /// Trigger event.
    pub event: DeploymentTrigger,
    /// `owner/repo` of the source repository.
    pub repository_full_name: String,
    /// Creation time.
    pub started_at: DateTime<Utc>,
    /// Terminal transition time.
    pub finished_at: Option<DateTime<Utc>>,
    /// Lifecycle state.
    pub status: AuditStatus,
    /// Orchestration error on failure.
    pub error_message: Option<String>,
    /// Aggregated results on success.
    pub summary: Option<DeploymentSummary>,
    /// Stored processing duration.
    pub processing_ms: Option<i64>,
}

/// Record of one deployment execution attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentAudit {
    id: AuditId,
    project_id: ProjectId,
    branch: BranchName,
    event: DeploymentTrigger,
    repository_full_name: NonEmptyString,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    status: AuditStatus,
    error_message: Option<String>,
    summary: Option<DeploymentSummary>,
    processing_ms: Option<i64>,
}

impl DeploymentAudit {
    /// Creates a new pending record.
    pub fn pending(
        project_id: ProjectId,
        branch: BranchName,
        event: DeploymentTrigger,
        repository_full_name: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        Ok(Self {
            id: AuditId::new(),
            project_id,
            branch,
            event,
            repository_full_name: NonEmptyString::new(repository_full_name)?,
            started_at,
            finished_at: None,
            status: AuditStatus::Pending,
            error_message: None,
            summary: None,
            processing_ms: None,
        })
    }

    /// Rehydrates a stored record, enforcing the end-time invariant.
    pub fn from_parts(parts: DeploymentAuditParts) -> AppResult<Self> {
        if parts.status.is_terminal() != parts.finished_at.is_some() {
            return Err(AppError::Validation(format!(
                "audit '{}' with status '{}' has inconsistent end time",
                parts.id,
                parts.status.as_str()
            )));
        }

        Ok(Self {
            id: parts.id,
            project_id: parts.project_id,
            branch: parts.branch,
            event: parts.event,
            repository_full_name: NonEmptyString::new(parts.repository_full_name)?,
            started_at: parts.started_at,
            finished_at: parts.finished_at,
            status: parts.status,
            error_message: parts.error_message,
            summary: parts.summary,
            processing_ms: parts.processing_ms,
        })
    }

    /// Applies the single terminal transition.
    pub fn complete(&mut self, outcome: AuditOutcome, finished_at: DateTime<Utc>) -> AppResult<()> {
        if self.status.is_terminal() {
            return Err(AppError::Conflict(format!(
                "audit '{}' is already {}",
                self.id,
                self.status.as_str()
            )));
        }

        match outcome {
            AuditOutcome::Success(summary) => {
                self.status = AuditStatus::Success;
                self.summary = Some(summary);
            }
            AuditOutcome::Failed(message) => {
                self.status = AuditStatus::Failed;
                self.error_message = Some(message);
            }
        }
        self.finished_at = Some(finished_at);
        self.processing_ms = Some(
            finished_at
                .signed_duration_since(self.started_at)
                .num_milliseconds()
                .max(0),
        );

        Ok(())
    }

    /// Returns the record identifier.
    #[must_use]
    pub fn id(&self) -> AuditId {
        self.id
    }

    /// Returns the attached project.
    #[must_use]
    pub fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Returns the deployed branch.
    #[must_use]
    pub fn branch(&self) -> &BranchName {
        &self.branch
    }

    /// Returns the trigger event.
    #[must_use]
    pub fn event(&self) -> &DeploymentTrigger {
        &self.event
    }

    /// Returns the source repository full name.
    #[must_use]
    pub fn repository_full_name(&self) -> &str {
        self.repository_full_name.as_str()
    }

    /// Returns the creation time.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Returns the terminal transition time.
    #[must_use]
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub fn status(&self) -> AuditStatus {
        self.status
    }

    /// Returns the orchestration error.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Returns the aggregated results.
    #[must_use]
    pub fn summary(&self) -> Option<&DeploymentSummary> {
        self.summary.as_ref()
    }

    /// Returns the processing duration in milliseconds.
    #[must_use]
    pub fn processing_ms(&self) -> Option<i64> {
        self.processing_ms
    }
}
