use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use demodeck_core::{AppError, AppResult, AuditId, ProjectId};
use demodeck_domain::{
    AuditOutcome, BranchName, DeploymentAudit, DeploymentSummary, DeploymentTrigger, Project,
};

use crate::deployment_ports::{DeploymentAuditRepository, SiteSynchronizer};
use crate::project_ports::ProjectRepository;

mod dispatch;
mod queries;

pub use queries::{
    AuditPage, AuditStats, DEFAULT_AUDIT_PAGE_SIZE, DEFAULT_STATS_WINDOW_DAYS,
    MAX_AUDIT_PAGE_SIZE,
};

use dispatch::BranchLocks;


/// Default number of synchronizations allowed to run at once.
pub const DEFAULT_MAX_CONCURRENT_DEPLOYMENTS: usize = 4;

/// Result of a webhook-driven execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookDeployment {
    /// No active project is bound to the repository. Nothing was recorded.
    NoMatchingProject,
    /// Execution finished and the audit record is terminal.
    Completed(DeploymentAudit),
}

/// Execution submitted to the runtime.
///
/// The audit record is returned while still pending. Dropping `completion` detaches the
/// task, which keeps running.
#[derive(Debug)]
pub struct ScheduledDeployment {
    /// Pending audit record created for the execution.
    pub audit: DeploymentAudit,
    /// Resolves with the terminal audit record.
    pub completion: JoinHandle<AppResult<DeploymentAudit>>,
}

/// Fans synchronization out across matching demo configs and records the outcome.
#[derive(Clone)]
pub struct DeploymentService {
    projects: Arc<dyn ProjectRepository>,
    audits: Arc<dyn DeploymentAuditRepository>,
    synchronizer: Arc<dyn SiteSynchronizer>,
    permits: Arc<Semaphore>,
    branch_locks: BranchLocks,
}

impl DeploymentService {
    /// Creates a new deployment service running at most `max_concurrency` syncs at once.
    #[must_use]
    pub fn new(
        projects: Arc<dyn ProjectRepository>,
        audits: Arc<dyn DeploymentAuditRepository>,
        synchronizer: Arc<dyn SiteSynchronizer>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            projects,
            audits,
            synchronizer,
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
            branch_locks: BranchLocks::default(),
        }
    }

    /// Runs a webhook trigger to completion.
    ///
    /// The audit record attaches to the first matching project by name. Individual sync
    /// failures land in the summary. Only orchestration failures return an error, after
    /// the record has been marked failed where possible.
    pub async fn execute(
        &self,
        repository_full_name: &str,
        branch: &BranchName,
        event: DeploymentTrigger,
    ) -> AppResult<WebhookDeployment> {
        let projects = self
            .projects
            .list_active_projects_by_repository(repository_full_name)
            .await?;
        let Some(primary_project_id) = projects.first().map(Project::id) else {
            info!(
                repository = repository_full_name,
                branch = %branch,
                "no active project matches repository"
            );
            return Ok(WebhookDeployment::NoMatchingProject);
        };

        let audit = DeploymentAudit::pending(
            primary_project_id,
            branch.clone(),
            event,
            repository_full_name,
            Utc::now(),
        )?;
        self.audits.create(&audit).await?;
        info!(
            audit_id = %audit.id(),
            repository = repository_full_name,
            branch = %branch,
            event = audit.event().as_str(),
            "deployment started"
        );

        self.run(audit, projects)
            .await
            .map(WebhookDeployment::Completed)
    }

    /// Returns the project if it exists and is active, a validation error otherwise.
    pub async fn deployable_project(&self, project_id: ProjectId) -> AppResult<Project> {
        self.projects
            .find_project(project_id)
            .await?
            .filter(Project::is_active)
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "project '{project_id}' does not exist or is inactive"
                ))
            })
    }

    /// Schedules a manual deployment of one project branch.
    pub async fn trigger_project(
        &self,
        project_id: ProjectId,
        branch: BranchName,
    ) -> AppResult<ScheduledDeployment> {
        let project = self.deployable_project(project_id).await?;

        self.schedule(
            project.id(),
            branch,
            DeploymentTrigger::ManualTrigger,
            project.repository_full_name().as_str().to_owned(),
        )
        .await
    }

    /// Schedules a new execution with the project, branch and repository of a prior record.
    ///
    /// The prior record is left untouched.
    pub async fn re_execute(&self, audit_id: AuditId) -> AppResult<ScheduledDeployment> {
        let prior = self.audits.find(audit_id).await?.ok_or_else(|| {
            AppError::NotFound(format!("deployment audit '{audit_id}' does not exist"))
        })?;

        let project_id = prior.project_id();
        if self
            .projects
            .find_project(project_id)
            .await?
            .filter(Project::is_active)
            .is_none()
        {
            return Err(AppError::Validation(format!(
                "project '{project_id}' of deployment audit '{audit_id}' no longer exists or is inactive"
            )));
        }

        self.schedule(
            project_id,
            prior.branch().clone(),
            DeploymentTrigger::ReExecute,
            prior.repository_full_name().to_owned(),
        )
        .await
    }

    async fn schedule(
        &self,
        project_id: ProjectId,
        branch: BranchName,
        event: DeploymentTrigger,
        repository_full_name: String,
    ) -> AppResult<ScheduledDeployment> {
        let audit =
            DeploymentAudit::pending(project_id, branch, event, repository_full_name, Utc::now())?;
        self.audits.create(&audit).await?;

        let service = self.clone();
        let background = audit.clone();
        let completion = tokio::spawn(async move {
            let projects = match service
                .projects
                .list_active_projects_by_repository(background.repository_full_name())
                .await
            {
                Ok(projects) => projects,
                Err(error) => return Err(service.fail(background, error).await),
            };
            service.run(background, projects).await
        });

        info!(
            audit_id = %audit.id(),
            project_id = %project_id,
            branch = %audit.branch(),
            event = audit.event().as_str(),
            "deployment scheduled"
        );
        Ok(ScheduledDeployment { audit, completion })
    }

    async fn run(
        &self,
        audit: DeploymentAudit,
        projects: Vec<Project>,
    ) -> AppResult<DeploymentAudit> {
        let project_ids: Vec<_> = projects.iter().map(Project::id).collect();
        let configs = match self
            .projects
            .list_active_demo_configs(&project_ids, audit.branch())
            .await
        {
            Ok(configs) => configs,
            Err(error) => return Err(self.fail(audit, error).await),
        };

        let summary = if configs.is_empty() {
            DeploymentSummary::no_matching_configs()
        } else {
            self.deploy_all(&projects, configs).await
        };

        let pending = audit.clone();
        match self.finish(audit, AuditOutcome::Success(summary)).await {
            Ok(audit) => Ok(audit),
            Err(error) => Err(self.fail(pending, error).await),
        }
    }

    async fn finish(
        &self,
        mut audit: DeploymentAudit,
        outcome: AuditOutcome,
    ) -> AppResult<DeploymentAudit> {
        audit.complete(outcome, Utc::now())?;
        self.audits.complete(&audit).await?;

        if let Some(summary) = audit.summary() {
            info!(
                audit_id = %audit.id(),
                total = summary.total_configs,
                succeeded = summary.success_count,
                failed = summary.failure_count,
                processing_ms = audit.processing_ms().unwrap_or_default(),
                "deployment finished"
            );
        }
        Ok(audit)
    }

    /// Marks the record failed on a best-effort basis and hands the error back.
    async fn fail(&self, mut audit: DeploymentAudit, cause: AppError) -> AppError {
        error!(audit_id = %audit.id(), error = %cause, "deployment orchestration failed");

        let marked = match audit.complete(AuditOutcome::Failed(cause.to_string()), Utc::now()) {
            Ok(()) => self.audits.complete(&audit).await,
            Err(error) => Err(error),
        };
        if let Err(error) = marked {
            warn!(audit_id = %audit.id(), error = %error, "could not mark deployment audit failed");
        }

        cause
    }
}
