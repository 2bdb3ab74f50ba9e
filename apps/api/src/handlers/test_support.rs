use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use demodeck_application::{
    AccessRepository, AccessService, ArtifactService, AuditListQuery, AuditStatusCounts,
    DeploymentAuditRepository, DeploymentService, DeploymentStatusUpdate, GrantRepository,
    GrantService, PermissionCache, ProjectRepository, SiteSynchronizer, SyncReport, SyncRequest,
    SyncStrategy,
};
use demodeck_core::{
    AppError, AppResult, AuditId, DemoConfigId, GroupId, ProjectId, UserId, UserIdentity,
};
use demodeck_domain::{
    AuditStatus, BranchName, DemoConfig, DemoConfigInput, DeploymentAudit, DeploymentStatus,
    Group, GroupMembership, GroupProjectGrant, Project, UserAccount, UserProjectGrant,
};
use demodeck_infrastructure::{FilesystemArtifactStore, InMemoryPermissionCache};
use sqlx::postgres::PgPoolOptions;
use tempfile::TempDir;
use tokio::sync::Mutex;

use crate::handlers::webhook::sign;
use crate::state::AppState;

pub const WEBHOOK_SECRET: &str = "test-webhook-secret";

/// In-memory stand-in for every Postgres repository.
#[derive(Default)]
pub struct TestStore {
    pub projects: Mutex<Vec<Project>>,
    pub configs: Mutex<Vec<DemoConfig>>,
    pub users: Mutex<Vec<UserAccount>>,
    pub groups: Mutex<Vec<Group>>,
    pub memberships: Mutex<Vec<GroupMembership>>,
    pub user_grants: Mutex<Vec<UserProjectGrant>>,
    pub group_grants: Mutex<Vec<GroupProjectGrant>>,
    pub audits: Mutex<Vec<DeploymentAudit>>,
}

impl TestStore {
    pub async fn add_project(&self, name: &str, repository_full_name: &str) -> Project {
        let project = Project::new(
            ProjectId::new(),
            name,
            format!("https://github.com/{repository_full_name}.git"),
            repository_full_name,
            true,
        )
        .unwrap_or_else(|_| unreachable!());
        self.projects.lock().await.push(project.clone());
        project
    }

    pub async fn add_demo_config(&self, project_id: ProjectId, branch: &str) -> DemoConfig {
        let config = DemoConfig::new(DemoConfigInput {
            id: DemoConfigId::new(),
            project_id,
            branch: branch.to_owned(),
            demo_path: "/".to_owned(),
            sub_site_folders: None,
            display_name: None,
            deployment_status: DeploymentStatus::Pending,
            last_deployment_at: None,
            deployment_error: None,
            is_active: true,
        })
        .unwrap_or_else(|_| unreachable!());
        self.configs.lock().await.push(config.clone());
        config
    }

    pub async fn add_user(&self, username: &str, is_global_admin: bool) -> UserIdentity {
        let account = UserAccount::new(UserId::new(), username, is_global_admin)
            .unwrap_or_else(|_| unreachable!());
        let identity = UserIdentity::new(account.id(), username, is_global_admin);
        self.users.lock().await.push(account);
        identity
    }

    pub async fn add_group(&self, name: &str) -> GroupId {
        let group =
            Group::new(GroupId::new(), name, false, true).unwrap_or_else(|_| unreachable!());
        let group_id = group.id();
        self.groups.lock().await.push(group);
        group_id
    }
}

#[async_trait]
impl ProjectRepository for TestStore {
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
        Ok(self
            .projects
            .lock()
            .await
            .iter()
            .filter(|project| project.is_active())
            .cloned()
            .collect())
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
        _demo_config_id: DemoConfigId,
        _update: DeploymentStatusUpdate,
    ) -> AppResult<()> {
        Ok(())
    }
}

#[async_trait]
impl AccessRepository for TestStore {
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
impl GrantRepository for TestStore {
    async fn upsert_user_project_grant(&self, grant: UserProjectGrant) -> AppResult<()> {
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
        self.user_grants
            .lock()
            .await
            .retain(|stored| !(stored.user_id == user_id && stored.project_id == project_id));
        Ok(())
    }

    async fn upsert_group_membership(&self, membership: GroupMembership) -> AppResult<()> {
        let mut memberships = self.memberships.lock().await;
        memberships.retain(|stored| {
            !(stored.user_id == membership.user_id && stored.group_id == membership.group_id)
        });
        memberships.push(membership);
        Ok(())
    }

    async fn delete_group_membership(&self, user_id: UserId, group_id: GroupId) -> AppResult<()> {
        self.memberships
            .lock()
            .await
            .retain(|stored| !(stored.user_id == user_id && stored.group_id == group_id));
        Ok(())
    }

    async fn upsert_group_project_grant(&self, grant: GroupProjectGrant) -> AppResult<()> {
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
        self.group_grants
            .lock()
            .await
            .retain(|stored| !(stored.group_id == group_id && stored.project_id == project_id));
        Ok(())
    }
}

#[async_trait]
impl DeploymentAuditRepository for TestStore {
    async fn create(&self, audit: &DeploymentAudit) -> AppResult<()> {
        self.audits.lock().await.push(audit.clone());
        Ok(())
    }

    async fn complete(&self, audit: &DeploymentAudit) -> AppResult<()> {
        let mut audits = self.audits.lock().await;
        let stored = audits
            .iter_mut()
            .find(|stored| stored.id() == audit.id())
            .ok_or_else(|| AppError::NotFound(format!("deployment audit '{}'", audit.id())))?;
        if stored.status() != AuditStatus::Pending {
            return Err(AppError::Conflict(format!(
                "deployment audit '{}' is already terminal",
                audit.id()
            )));
        }
        *stored = audit.clone();
        Ok(())
    }

    async fn find(&self, audit_id: AuditId) -> AppResult<Option<DeploymentAudit>> {
        Ok(self
            .audits
            .lock()
            .await
            .iter()
            .find(|audit| audit.id() == audit_id)
            .cloned())
    }

    async fn list(&self, query: AuditListQuery) -> AppResult<(Vec<DeploymentAudit>, u64)> {
        let mut matching: Vec<_> = self
            .audits
            .lock()
            .await
            .iter()
            .filter(|audit| query.status.is_none_or(|status| audit.status() == status))
            .filter(|audit| {
                query
                    .project_id
                    .is_none_or(|project_id| audit.project_id() == project_id)
            })
            .cloned()
            .collect();
        matching.sort_by_key(|audit| std::cmp::Reverse(audit.started_at()));

        let total = matching.len() as u64;
        let page = matching
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
        let mut counts = AuditStatusCounts::default();
        for audit in audits.iter().filter(|audit| {
            audit.started_at() >= since
                && project_id.is_none_or(|project_id| audit.project_id() == project_id)
        }) {
            counts.total += 1;
            match audit.status() {
                AuditStatus::Success => counts.success += 1,
                AuditStatus::Failed => counts.failed += 1,
                AuditStatus::Pending => counts.pending += 1,
            }
        }
        Ok(counts)
    }
}

/// Publishes a single `index.html` naming the branch instead of running git.
pub struct PublishingSynchronizer {
    static_root: PathBuf,
}

#[async_trait]
impl SiteSynchronizer for PublishingSynchronizer {
    async fn sync(&self, request: &SyncRequest) -> AppResult<SyncReport> {
        let published_root = self
            .static_root
            .join(&request.project_name)
            .join(request.branch.directory_name());
        tokio::fs::create_dir_all(&published_root)
            .await
            .map_err(|error| AppError::Transport(format!("failed to publish: {error}")))?;
        tokio::fs::write(
            published_root.join("index.html"),
            format!("<h1>{}</h1>", request.branch),
        )
        .await
        .map_err(|error| AppError::Transport(format!("failed to publish: {error}")))?;

        Ok(SyncReport {
            strategy: SyncStrategy::FreshClone,
            published_root,
            published_files: 1,
        })
    }
}

/// Handler state over [`TestStore`] with a temporary published root.
pub struct TestApp {
    pub state: AppState,
    pub store: Arc<TestStore>,
    pub static_root: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        let static_root = TempDir::new().unwrap_or_else(|_| unreachable!());
        let store = Arc::new(TestStore::default());
        let cache: Arc<dyn PermissionCache> =
            Arc::new(InMemoryPermissionCache::new(Duration::from_secs(60), 100));

        let access_service = AccessService::new(store.clone(), store.clone(), cache.clone());
        let artifact_service = ArtifactService::new(
            access_service.clone(),
            Arc::new(FilesystemArtifactStore::new(static_root.path().to_path_buf())),
        );
        let deployment_service = DeploymentService::new(
            store.clone(),
            store.clone(),
            Arc::new(PublishingSynchronizer {
                static_root: static_root.path().to_path_buf(),
            }),
            2,
        );
        let grant_service = GrantService::new(store.clone(), cache.clone());

        let postgres_pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/demodeck_unused")
            .unwrap_or_else(|_| unreachable!());

        let state = AppState {
            deployment_service,
            access_service,
            artifact_service,
            grant_service,
            permission_cache: cache,
            postgres_pool,
            webhook_secret: Arc::from(WEBHOOK_SECRET),
        };

        Self {
            state,
            store,
            static_root,
        }
    }

    pub fn published_root(&self) -> &Path {
        self.static_root.path()
    }
}

pub fn signed(body: &str) -> String {
    sign(WEBHOOK_SECRET, body.as_bytes())
}
