use std::sync::Arc;

use demodeck_core::{AppResult, DemoConfigId, UserIdentity};
use demodeck_domain::ArtifactPath;
use tracing::debug;

use crate::AccessService;
use crate::artifact_ports::{ArtifactFile, ArtifactStore};


/// Serves published demo files after an access check.
#[derive(Clone)]
pub struct ArtifactService {
    access: AccessService,
    store: Arc<dyn ArtifactStore>,
}

impl ArtifactService {
    /// Creates a new artifact service.
    #[must_use]
    pub fn new(access: AccessService, store: Arc<dyn ArtifactStore>) -> Self {
        Self { access, store }
    }

    /// Resolves `{project_name}/{branch}/{sub_path}` for the user.
    ///
    /// Access is decided before the path is looked at, so a denied user cannot discover
    /// which files exist.
    pub async fn fetch(
        &self,
        user: &UserIdentity,
        project_name: &str,
        branch: &str,
        sub_path: &str,
    ) -> AppResult<ArtifactFile> {
        let demo = self.access.authorize_demo(user, project_name, branch).await?;
        let path = ArtifactPath::parse(sub_path)?;
        debug!(project = project_name, branch, sub_path, "resolving demo artifact");

        self.store
            .resolve(demo.project.name().as_str(), demo.config.branch(), &path)
            .await
    }

    /// Resolves a file of the demo published by one demo config.
    pub async fn fetch_by_demo_config(
        &self,
        user: &UserIdentity,
        demo_config_id: DemoConfigId,
        sub_path: &str,
    ) -> AppResult<ArtifactFile> {
        let demo = self
            .access
            .authorize_demo_config(user, demo_config_id)
            .await?;
        let path = ArtifactPath::parse(sub_path.trim_start_matches('/'))?;

        self.store
            .resolve(demo.project.name().as_str(), demo.config.branch(), &path)
            .await
    }
}
