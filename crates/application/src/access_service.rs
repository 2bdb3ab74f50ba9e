use std::collections::BTreeSet;
use std::sync::Arc;

use demodeck_core::{AppError, AppResult, DemoConfigId, ProjectId, UserId, UserIdentity};
use demodeck_domain::{
    AccessSource, BranchName, DemoConfig, EffectiveAccess, Group, Project, ProjectRole,
};
use tracing::debug;

use crate::access_ports::{AccessRepository, PermissionCache};
use crate::project_ports::ProjectRepository;


/// Active demo config a principal was allowed to view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedDemo {
    /// Owning project.
    pub project: Project,
    /// Demo config being viewed.
    pub config: DemoConfig,
}

/// Resolves effective project roles from the grant graph.
#[derive(Clone)]
pub struct AccessService {
    projects: Arc<dyn ProjectRepository>,
    grants: Arc<dyn AccessRepository>,
    cache: Arc<dyn PermissionCache>,
}

impl AccessService {
    /// Creates a new access service.
    #[must_use]
    pub fn new(
        projects: Arc<dyn ProjectRepository>,
        grants: Arc<dyn AccessRepository>,
        cache: Arc<dyn PermissionCache>,
    ) -> Self {
        Self {
            projects,
            grants,
            cache,
        }
    }

    /// Computes the highest role a user holds on an active project.
    ///
    /// Unknown or inactive projects yield `None` whatever the grants say.
    pub async fn effective_role(
        &self,
        user_id: UserId,
        project_id: ProjectId,
    ) -> AppResult<Option<EffectiveAccess>> {
        let Some(project) = self.projects.find_project(project_id).await? else {
            return Ok(None);
        };
        if !project.is_active() {
            return Ok(None);
        }

        let Some(user) = self.grants.find_user(user_id).await? else {
            return Ok(None);
        };
        if user.is_global_admin() {
            return Ok(Some(EffectiveAccess {
                role: ProjectRole::Admin,
                source: AccessSource::GlobalAdmin,
            }));
        }

        let groups = self.active_groups(user_id).await?;
        if groups.iter().any(Group::is_admin_group) {
            return Ok(Some(EffectiveAccess {
                role: ProjectRole::Admin,
                source: AccessSource::AdminGroup,
            }));
        }

        let direct = self
            .grants
            .list_user_project_grants(user_id)
            .await?
            .into_iter()
            .filter(|grant| grant.project_id == project_id)
            .map(|grant| EffectiveAccess {
                role: grant.role,
                source: AccessSource::DirectGrant,
            })
            .reduce(EffectiveAccess::max);

        let group_ids: Vec<_> = groups.iter().map(Group::id).collect();
        let via_groups = if group_ids.is_empty() {
            None
        } else {
            self.grants
                .list_group_project_grants(&group_ids, Some(project_id))
                .await?
                .into_iter()
                .filter(|grant| grant.project_id == project_id)
                .map(|grant| EffectiveAccess {
                    role: grant.role,
                    source: AccessSource::GroupGrant,
                })
                .reduce(EffectiveAccess::max)
        };

        Ok(match (direct, via_groups) {
            (Some(direct), Some(via_groups)) => Some(direct.max(via_groups)),
            (direct, via_groups) => direct.or(via_groups),
        })
    }

    /// Returns whether the user holds at least `required` on the project.
    ///
    /// Viewer decisions go through the permission cache.
    pub async fn check_access(
        &self,
        user_id: UserId,
        project_id: ProjectId,
        required: ProjectRole,
    ) -> AppResult<bool> {
        let cacheable = required == ProjectRole::Viewer;
        if cacheable && let Some(allowed) = self.cache.get(project_id, user_id).await? {
            return Ok(allowed);
        }

        let generation = if cacheable {
            Some(self.cache.generation().await?)
        } else {
            None
        };
        let allowed = self
            .effective_role(user_id, project_id)
            .await?
            .is_some_and(|access| access.role.satisfies(required));

        if let Some(generation) = generation
            && !self
                .cache
                .set(project_id, user_id, allowed, generation)
                .await?
        {
            debug!(%user_id, %project_id, "skipped caching decision invalidated while computing");
        }

        debug!(%user_id, %project_id, required = required.as_str(), allowed, "resolved project access");
        Ok(allowed)
    }

    /// Returns whether the user bypasses project grants entirely.
    pub async fn is_administrator(&self, user_id: UserId) -> AppResult<bool> {
        let Some(user) = self.grants.find_user(user_id).await? else {
            return Ok(false);
        };
        if user.is_global_admin() {
            return Ok(true);
        }

        Ok(self
            .active_groups(user_id)
            .await?
            .iter()
            .any(Group::is_admin_group))
    }

    /// Authorizes viewing the demo published for `{project_name}/{branch}`.
    pub async fn authorize_demo(
        &self,
        user: &UserIdentity,
        project_name: &str,
        branch: &str,
    ) -> AppResult<AuthorizedDemo> {
        let project = self.projects.find_project_by_name(project_name).await?;
        let config = match (&project, BranchName::new(branch)) {
            (Some(project), Ok(branch)) => {
                self.projects
                    .find_demo_config_by_branch(project.id(), &branch)
                    .await?
            }
            _ => None,
        };

        let description = format!("demo '{project_name}/{branch}'");
        self.authorize_resolved(user, project, config, description)
            .await
    }

    /// Authorizes viewing the demo published by one demo config.
    pub async fn authorize_demo_config(
        &self,
        user: &UserIdentity,
        demo_config_id: DemoConfigId,
    ) -> AppResult<AuthorizedDemo> {
        let config = self.projects.find_demo_config(demo_config_id).await?;
        let project = match &config {
            Some(config) => self.projects.find_project(config.project_id()).await?,
            None => None,
        };

        let description = format!("demo config '{demo_config_id}'");
        self.authorize_resolved(user, project, config, description)
            .await
    }

    /// Lists active projects the user may view, ordered by name.
    pub async fn list_accessible_projects(&self, user_id: UserId) -> AppResult<Vec<Project>> {
        let mut projects = self.projects.list_active_projects().await?;

        if !self.is_administrator(user_id).await? {
            let mut granted: BTreeSet<ProjectId> = self
                .grants
                .list_user_project_grants(user_id)
                .await?
                .into_iter()
                .map(|grant| grant.project_id)
                .collect();

            let group_ids: Vec<_> = self
                .active_groups(user_id)
                .await?
                .iter()
                .map(Group::id)
                .collect();
            if !group_ids.is_empty() {
                granted.extend(
                    self.grants
                        .list_group_project_grants(&group_ids, None)
                        .await?
                        .into_iter()
                        .map(|grant| grant.project_id),
                );
            }

            projects.retain(|project| granted.contains(&project.id()));
        }

        projects.sort_by(|left, right| left.name().as_str().cmp(right.name().as_str()));
        Ok(projects)
    }

    async fn authorize_resolved(
        &self,
        user: &UserIdentity,
        project: Option<Project>,
        config: Option<DemoConfig>,
        description: String,
    ) -> AppResult<AuthorizedDemo> {
        let (Some(project), Some(config)) = (project, config) else {
            // Only administrators learn whether a demo exists.
            return Err(if self.is_administrator(user.user_id()).await? {
                AppError::NotFound(format!("{description} does not exist"))
            } else {
                AppError::Forbidden(format!("access to {description} is denied"))
            });
        };

        if !project.is_active() || !config.is_active() {
            return Err(AppError::Forbidden(format!("{description} is inactive")));
        }

        if !self
            .check_access(user.user_id(), project.id(), ProjectRole::Viewer)
            .await?
        {
            return Err(AppError::Forbidden(format!(
                "access to {description} is denied"
            )));
        }

        Ok(AuthorizedDemo { project, config })
    }

    async fn active_groups(&self, user_id: UserId) -> AppResult<Vec<Group>> {
        let mut groups = self.grants.list_user_groups(user_id).await?;
        groups.retain(Group::is_active);
        Ok(groups)
    }
}
