use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use demodeck_core::{AppError, AppResult, AuditId, DemoConfigId, GroupId, ProjectId, UserId};
use demodeck_domain::{
    BranchName, DemoConfig, DemoConfigInput, DeploymentAudit, DeploymentStatus, Group,
    GroupMembership, GroupProjectGrant, Project, UserAccount, UserProjectGrant,
};

use crate::access_ports::{
    AccessRepository, GrantRepository, PermissionCache, PermissionCacheEntry,
    PermissionCacheStats,
};
use crate::deployment_ports::{
    AuditListQuery, AuditStatusCounts, DeploymentAuditRepository, SiteSynchronizer, SyncReport,
    SyncRequest, SyncStrategy,
};
use crate::project_ports::{DeploymentStatusUpdate, ProjectRepository};

pub fn project(name: &str, repository_full_name: &str, is_active: bool) -> Project {
    Project::new(
        ProjectId::new(),
        name,
        format!("https://github.com/{repository_full_name}.git"),
        repository_full_name,
        is_active,
    )
    .unwrap_or_else(|_| unreachable!())
}

pub fn demo_config(project_id: ProjectId, branch: &str, demo_path: &str) -> DemoConfig {
    DemoConfig::new(DemoConfigInput {
        id: DemoConfigId::new(),
        project_id,
        branch: branch.to_owned(),
        demo_path: demo_path.to_owned(),
        sub_site_folders: None,
        display_name: None,
        deployment_status: DeploymentStatus::Pending,
        last_deployment_at: None,
        deployment_error: None,
        is_active: true,
    })
    .unwrap_or_else(|_| unreachable!())
}

pub fn inactive_demo_config(project_id: ProjectId, branch: &str) -> DemoConfig {
    DemoConfig::new(DemoConfigInput {
        id: DemoConfigId::new(),
        project_id,
        branch: branch.to_owned(),
        demo_path: "/".to_owned(),
        sub_site_folders: None,
        display_name: None,
        deployment_status: DeploymentStatus::Pending,
        last_deployment_at: None,
        deployment_error: None,
        is_active: false,
    })
    .unwrap_or_else(|_| unreachable!())
}

pub fn branch(value: &str) -> BranchName {
    BranchName::new(value).unwrap_or_else(|_| unreachable!())
}

#[derive(Default)]
pub struct FakeProjectRepository {
    pub projects: Mutex<Vec<Project>>,
    pub configs: Mutex<Vec<DemoConfig>>,
    pub status_updates: Mutex<Vec<(DemoConfigId, DeploymentStatusUpdate)>>,
    pub fail_config_query: bool,
}

impl FakeProjectRepository {
    pub fn with(projects: Vec<Project>, configs: Vec<DemoConfig>) -> Self {
        Self {
            projects: Mutex::new(projects),
            configs: Mutex::new(configs),
            ..Self::default()
        }
    }
}

#[async_trait]
impl ProjectRepository for FakeProjectRepository {
    async fn find_project(&self, project_id: ProjectId) -> AppResult<Option<Project>> {
        Ok(self
            .projects
            .lock()
            .await
            .iter()
            .find(|project| project.id() == project_id)
            .cloned())
    }

    async fn find_project_by_name(&self, name: &str) -> AppResult<Option<Project>> {
        Ok(self
            .projects
            .lock()
            .await
            .iter()
            .find(|project| project.name().as_str() == name)
            .cloned())
    }

    async fn list_active_projects(&self) -> AppResult<Vec<Project>> {
        let mut projects: Vec<_> = self
            .projects
            .lock()
            .await
            .iter()
            .filter(|project| project.is_active())
            .cloned()
            .collect();
        projects.sort_by(|left, right| left.name().as_str().cmp(right.name().as_str()));
        Ok(projects)
    }

    async fn list_active_projects_by_repository(
        &self,
        repository_full_name: &str,
    ) -> AppResult<Vec<Project>> {
        let mut projects = self.list_active_projects().await?;
        projects.retain(|project| project.repository_full_name().as_str() == repository_full_name);
        Ok(projects)
    }

    async fn list_active_demo_configs(
        &self,
        project_ids: &[ProjectId],
        branch: &BranchName,
    ) -> AppResult<Vec<DemoConfig>> {
        if self.fail_config_query {
            return Err(AppError::Internal(
                "failed to list demo configs: connection reset".to_owned(),
            ));
        }

        Ok(self
            .configs
            .lock()
            .await
            .iter()
            .filter(|config| {
                config.is_active()
                    && config.branch() == branch
                    && project_ids.contains(&config.project_id())
            })
            .cloned()
            .collect())
    }

    async fn find_demo_config(
        &self,
        demo_config_id: DemoConfigId,
    ) -> AppResult<Option<DemoConfig>> {
        Ok(self
            .configs
            .lock()
            .await
            .iter()
            .find(|config| config.id() == demo_config_id)
            .cloned())
    }

    async fn find_demo_config_by_branch(
        &self,
        project_id: ProjectId,
        branch: &BranchName,
    ) -> AppResult<Option<DemoConfig>> {
        Ok(self
            .configs
            .lock()
            .await
            .iter()
            .find(|config| config.project_id() == project_id && config.branch() == branch)
            .cloned())
    }

    async fn update_deployment_status(
        &self,
        demo_config_id: DemoConfigId,
        update: DeploymentStatusUpdate,
    ) -> AppResult<()> {
        self.status_updates
            .lock()
            .await
            .push((demo_config_id, update));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeAccessRepository {
    pub users: Mutex<Vec<UserAccount>>,
    pub groups: Mutex<Vec<Group>>,
    pub memberships: Mutex<Vec<GroupMembership>>,
    pub user_grants: Mutex<Vec<UserProjectGrant>>,
    pub group_grants: Mutex<Vec<GroupProjectGrant>>,
    pub fail_writes: bool,
}

impl FakeAccessRepository {
    pub async fn add_user(&self, username: &str, is_global_admin: bool) -> UserId {
        let user = UserAccount::new(UserId::new(), username, is_global_admin)
            .unwrap_or_else(|_| unreachable!());
        let user_id = user.id();
        self.users.lock().await.push(user);
        user_id
    }

    pub async fn add_group(&self, name: &str, is_admin_group: bool, is_active: bool) -> GroupId {
        let group = Group::new(GroupId::new(), name, is_admin_group, is_active)
            .unwrap_or_else(|_| unreachable!());
        let group_id = group.id();
        self.groups.lock().await.push(group);
        group_id
    }

    fn write_result(&self) -> AppResult<()> {
        if self.fail_writes {
            return Err(AppError::Internal(
                "failed to write grant: connection reset".to_owned(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl AccessRepository for FakeAccessRepository {
    async fn find_user(&self, user_id: UserId) -> AppResult<Option<UserAccount>> {
        Ok(self
            .users
            .lock()
            .await
            .iter()
            .find(|user| user.id() == user_id)
            .cloned())
    }

    async fn list_user_groups(&self, user_id: UserId) -> AppResult<Vec<Group>> {
        let group_ids: Vec<_> = self
            .memberships
            .lock()
            .await
            .iter()
            .filter(|membership| membership.user_id == user_id)
            .map(|membership| membership.group_id)
            .collect();

        Ok(self
            .groups
            .lock()
            .await
            .iter()
            .filter(|group| group_ids.contains(&group.id()))
            .cloned()
            .collect())
    }

    async fn list_user_project_grants(&self, user_id: UserId) -> AppResult<Vec<UserProjectGrant>> {
        Ok(self
            .user_grants
            .lock()
            .await
            .iter()
            .filter(|grant| grant.user_id == user_id)
            .copied()
            .collect())
    }

    async fn list_group_project_grants(
        &self,
        group_ids: &[GroupId],
        project_id: Option<ProjectId>,
    ) -> AppResult<Vec<GroupProjectGrant>> {
        Ok(self
            .group_grants
            .lock()
            .await
            .iter()
            .filter(|grant| {
                group_ids.contains(&grant.group_id)
                    && project_id.is_none_or(|project_id| grant.project_id == project_id)
            })
            .copied()
            .collect())
    }
}

#[async_trait]
impl GrantRepository for FakeAccessRepository {
    async fn upsert_user_project_grant(&self, grant: UserProjectGrant) -> AppResult<()> {
        self.write_result()?;
        let mut grants = self.user_grants.lock().await;
        grants.retain(|stored| {
            !(stored.user_id == grant.user_id && stored.project_id == grant.project_id)
        });
        grants.push(grant);
        Ok(())
    }

    async fn delete_user_project_grant(
        &self,
        user_id: UserId,
        project_id: ProjectId,
    ) -> AppResult<()> {
        self.write_result()?;
        self.user_grants
            .lock()
            .await
            .retain(|stored| !(stored.user_id == user_id && stored.project_id == project_id));
        Ok(())
    }

    async fn upsert_group_membership(&self, membership: GroupMembership) -> AppResult<()> {
        self.write_result()?;
        let mut memberships = self.memberships.lock().await;
        memberships.retain(|stored| {
            !(stored.user_id == membership.user_id && stored.group_id == membership.group_id)
        });
        memberships.push(membership);
        Ok(())
    }

    async fn delete_group_membership(&self, user_id: UserId, group_id: GroupId) -> AppResult<()> {
        self.write_result()?;
        self.memberships
            .lock()
            .await
            .retain(|stored| !(stored.user_id == user_id && stored.group_id == group_id));
        Ok(())
    }

    async fn upsert_group_project_grant(&self, grant: GroupProjectGrant) -> AppResult<()> {
        self.write_result()?;
        let mut grants = self.group_grants.lock().await;
        grants.retain(|stored| {
            !(stored.group_id == grant.group_id && stored.project_id == grant.project_id)
        });
        grants.push(grant);
        Ok(())
    }

    async fn delete_group_project_grant(
        &self,
        group_id: GroupId,
        project_id: ProjectId,
    ) -> AppResult<()> {
        self.write_result()?;
        self.group_grants
            .lock()
            .await
            .retain(|stored| !(stored.group_id == group_id && stored.project_id == project_id));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakePermissionCache {
    pub entries: Mutex<HashMap<(ProjectId, UserId), bool>>,
    pub hits: AtomicUsize,
    pub generation: AtomicU64,
}

#[async_trait]
impl PermissionCache for FakePermissionCache {
    async fn get(&self, project_id: ProjectId, user_id: UserId) -> AppResult<Option<bool>> {
        let value = self.entries.lock().await.get(&(project_id, user_id)).copied();
        if value.is_some() {
            self.hits.fetch_add(1, Ordering::SeqCst);
        }
        Ok(value)
    }

    async fn generation(&self) -> AppResult<u64> {
        Ok(self.generation.load(Ordering::SeqCst))
    }

    async fn set(
        &self,
        project_id: ProjectId,
        user_id: UserId,
        allowed: bool,
        generation: u64,
    ) -> AppResult<bool> {
        let mut entries = self.entries.lock().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            return Ok(false);
        }
        entries.insert((project_id, user_id), allowed);
        Ok(true)
    }

    async fn invalidate_project(&self, project_id: ProjectId) -> AppResult<()> {
        let mut entries = self.entries.lock().await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        entries.retain(|(stored_project_id, _), _| *stored_project_id != project_id);
        Ok(())
    }

    async fn invalidate_user(&self, user_id: UserId) -> AppResult<()> {
        let mut entries = self.entries.lock().await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        entries.retain(|(_, stored_user_id), _| *stored_user_id != user_id);
        Ok(())
    }

    async fn clear(&self) -> AppResult<()> {
        let mut entries = self.entries.lock().await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        entries.clear();
        Ok(())
    }

    async fn stats(&self) -> AppResult<PermissionCacheStats> {
        Ok(PermissionCacheStats {
            size: self.entries.lock().await.len(),
            capacity: 100,
            ttl_seconds: 60,
        })
    }

    async fn entries(&self) -> AppResult<Vec<PermissionCacheEntry>> {
        Ok(self
            .entries
            .lock()
            .await
            .iter()
            .map(|((project_id, user_id), allowed)| PermissionCacheEntry {
                project_id: *project_id,
                user_id: *user_id,
                allowed: *allowed,
                age_ms: 0,
            })
            .collect())
    }
}

#[derive(Default)]
pub struct FakeAuditRepository {
    pub audits: Mutex<HashMap<AuditId, DeploymentAudit>>,
    pub fail_create: bool,
}

#[async_trait]
impl DeploymentAuditRepository for FakeAuditRepository {
    async fn create(&self, audit: &DeploymentAudit) -> AppResult<()> {
        if self.fail_create {
            return Err(AppError::Internal(
                "failed to create deployment audit: pool timed out".to_owned(),
            ));
        }
        self.audits.lock().await.insert(audit.id(), audit.clone());
        Ok(())
    }

    async fn complete(&self, audit: &DeploymentAudit) -> AppResult<()> {
        let mut audits = self.audits.lock().await;
        let Some(stored) = audits.get_mut(&audit.id()) else {
            return Err(AppError::NotFound(format!("audit '{}'", audit.id())));
        };
        if stored.status().is_terminal() {
            return Err(AppError::Conflict(format!(
                "audit '{}' is already terminal",
                audit.id()
            )));
        }
        *stored = audit.clone();
        Ok(())
    }

    async fn find(&self, audit_id: AuditId) -> AppResult<Option<DeploymentAudit>> {
        Ok(self.audits.lock().await.get(&audit_id).cloned())
    }

    async fn list(&self, query: AuditListQuery) -> AppResult<(Vec<DeploymentAudit>, u64)> {
        let mut audits: Vec<_> = self
            .audits
            .lock()
            .await
            .values()
            .filter(|audit| query.status.is_none_or(|status| audit.status() == status))
            .filter(|audit| {
                query
                    .project_id
                    .is_none_or(|project_id| audit.project_id() == project_id)
            })
            .cloned()
            .collect();
        audits.sort_by_key(|audit| std::cmp::Reverse(audit.started_at()));
        let total = audits.len() as u64;
        let page = audits
            .into_iter()
            .skip(usize::try_from(query.offset()).unwrap_or(usize::MAX))
            .take(query.limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn count_by_status(
        &self,
        project_id: Option<ProjectId>,
        since: DateTime<Utc>,
    ) -> AppResult<AuditStatusCounts> {
        let audits = self.audits.lock().await;
        let window: Vec<_> = audits
            .values()
            .filter(|audit| audit.started_at() >= since)
            .filter(|audit| project_id.is_none_or(|project_id| audit.project_id() == project_id))
            .collect();

        let durations: Vec<i64> = window
            .iter()
            .filter_map(|audit| audit.processing_ms())
            .collect();
        let mut counts = AuditStatusCounts {
            total: window.len() as u64,
            avg_processing_ms: (!durations.is_empty())
                .then(|| durations.iter().sum::<i64>() as f64 / durations.len() as f64),
            ..AuditStatusCounts::default()
        };
        for audit in window {
            match audit.status() {
                demodeck_domain::AuditStatus::Pending => counts.pending += 1,
                demodeck_domain::AuditStatus::Success => counts.success += 1,
                demodeck_domain::AuditStatus::Failed => counts.failed += 1,
            }
        }
        Ok(counts)
    }
}

/// Synchronizer that fails for configured demo paths and tracks peak concurrency.
#[derive(Default)]
pub struct FakeSynchronizer {
    pub failing_paths: HashMap<String, String>,
    pub delay: Duration,
    pub running: AtomicUsize,
    pub peak: AtomicUsize,
    pub calls: Mutex<Vec<SyncRequest>>,
    pub panic_on: Option<String>,
}

#[async_trait]
impl SiteSynchronizer for FakeSynchronizer {
    async fn sync(&self, request: &SyncRequest) -> AppResult<SyncReport> {
        let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);
        self.calls.lock().await.push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.running.fetch_sub(1, Ordering::SeqCst);

        if self.panic_on.as_deref() == Some(request.demo_path.as_str()) {
            panic!("synchronizer crashed");
        }

        match self.failing_paths.get(request.demo_path.as_str()) {
            Some(error) => Err(AppError::Transport(error.clone())),
            None => Ok(SyncReport {
                strategy: SyncStrategy::FreshClone,
                published_root: std::path::PathBuf::from(format!(
                    "/srv/demos/{}/{}",
                    request.project_name, request.branch
                )),
                published_files: 3,
            }),
        }
    }
}
