use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tokio::sync::OwnedMutexGuard;
use tokio::task::JoinSet;
use tracing::{info, warn};

use demodeck_core::{DemoConfigId, ProjectId};
use demodeck_domain::{BranchName, DemoConfig, DeploymentOutcome, DeploymentSummary, Project};

use crate::deployment_ports::SyncRequest;
use crate::project_ports::DeploymentStatusUpdate;

use super::DeploymentService;

/// One async lock per (project, branch) so two triggers never touch the same tree at once.
///
/// Entries nobody holds or waits on are dropped on the next acquire, so the map only
/// tracks branches with deployments in flight.
#[derive(Clone, Default)]
pub(super) struct BranchLocks {
    locks: Arc<Mutex<HashMap<(ProjectId, BranchName), Arc<tokio::sync::Mutex<()>>>>>,
}

impl BranchLocks {
    pub(super) async fn acquire(
        &self,
        project_id: ProjectId,
        branch: &BranchName,
    ) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry((project_id, branch.clone()))
                .or_default()
                .clone()
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    pub(super) fn tracked(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl DeploymentService {
    /// Deploys every config concurrently and waits for all of them to settle.
    pub(super) async fn deploy_all(
        &self,
        projects: &[Project],
        configs: Vec<DemoConfig>,
    ) -> DeploymentSummary {
        let order: Vec<DemoConfigId> = configs.iter().map(DemoConfig::id).collect();
        let mut outcomes: HashMap<DemoConfigId, DeploymentOutcome> = HashMap::new();
        let mut tasks = JoinSet::new();

        for config in configs {
            let Some(project) = projects
                .iter()
                .find(|project| project.id() == config.project_id())
                .cloned()
            else {
                outcomes.insert(
                    config.id(),
                    DeploymentOutcome::failed(config.id(), "project of demo config is not active"),
                );
                continue;
            };

            let service = self.clone();
            tasks.spawn(async move { service.deploy_config(project, config).await });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => {
                    outcomes.insert(outcome.demo_config_id, outcome);
                }
                Err(error) => warn!(error = %error, "deployment task did not complete"),
            }
        }

        let results = order
            .into_iter()
            .map(|demo_config_id| {
                outcomes.remove(&demo_config_id).unwrap_or_else(|| {
                    DeploymentOutcome::failed(demo_config_id, "deployment task panicked")
                })
            })
            .collect();

        DeploymentSummary::from_outcomes(results)
    }

    async fn deploy_config(&self, project: Project, config: DemoConfig) -> DeploymentOutcome {
        let _branch_guard = self
            .branch_locks
            .acquire(project.id(), config.branch())
            .await;
        let _permit = match self.permits.acquire().await {
            Ok(permit) => permit,
            Err(error) => {
                return DeploymentOutcome::failed(
                    config.id(),
                    format!("deployment pool closed: {error}"),
                );
            }
        };

        self.record_status(config.id(), DeploymentStatusUpdate::deploying())
            .await;

        let request = SyncRequest {
            repository_url: project.repository_url().as_str().to_owned(),
            branch: config.branch().clone(),
            project_name: project.name().as_str().to_owned(),
            demo_path: config.demo_path().clone(),
            sub_site_folders: config.sub_site_folders().to_vec(),
        };

        match self.synchronizer.sync(&request).await {
            Ok(report) => {
                self.record_status(config.id(), DeploymentStatusUpdate::succeeded(Utc::now()))
                    .await;
                info!(
                    demo_config_id = %config.id(),
                    project = project.name().as_str(),
                    branch = %config.branch(),
                    strategy = report.strategy.as_str(),
                    files = report.published_files,
                    "demo deployed"
                );
                DeploymentOutcome::succeeded(
                    config.id(),
                    format!(
                        "Deployed {} to {}",
                        config.display_name(),
                        report.published_root.display()
                    ),
                )
            }
            Err(error) => {
                let detail = error.to_string();
                self.record_status(
                    config.id(),
                    DeploymentStatusUpdate::failed(Utc::now(), detail.clone()),
                )
                .await;
                warn!(
                    demo_config_id = %config.id(),
                    project = project.name().as_str(),
                    branch = %config.branch(),
                    error = %detail,
                    "demo deployment failed"
                );
                DeploymentOutcome::failed(config.id(), detail)
            }
        }
    }

    /// Status bookkeeping never changes the sync outcome.
    async fn record_status(&self, demo_config_id: DemoConfigId, update: DeploymentStatusUpdate) {
        let status = update.status.as_str();
        if let Err(error) = self
            .projects
            .update_deployment_status(demo_config_id, update)
            .await
        {
            warn!(
                demo_config_id = %demo_config_id,
                status,
                error = %error,
                "could not record demo deployment status"
            );
        }
    }
}
