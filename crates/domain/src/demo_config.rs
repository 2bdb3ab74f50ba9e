use std::str::FromStr;

use chrono::{DateTime, Utc};
use demodeck_core::{AppError, AppResult, DemoConfigId, ProjectId};
use serde::{Deserialize, Serialize};

use crate::BranchName;
use crate::project::validate_directory_segment;

/// Sub-path of a working copy that gets published.
///
/// `/` publishes the whole repository. Any other value is a relative path whose
/// components are plain directory names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DemoPath(String);

impl DemoPath {
    /// Creates a validated publish sub-path. Empty input means the repository root.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim().trim_matches('/');

        if trimmed.is_empty() {
            return Ok(Self::root());
        }

        for component in trimmed.split('/') {
            if component.is_empty() {
                return Err(AppError::Validation(format!(
                    "demo path '{value}' contains an empty segment"
                )));
            }
            validate_directory_segment("demo path segment", component)?;
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the repository root path.
    #[must_use]
    pub fn root() -> Self {
        Self("/".to_owned())
    }

    /// Returns whether the whole repository is published.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Returns the path components relative to the working copy root.
    pub fn relative_components(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|component| !component.is_empty())
    }

    /// Returns the stored path value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for DemoPath {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DemoPath> for String {
    fn from(value: DemoPath) -> Self {
        value.0
    }
}

/// Parses a comma-separated sub-site folder list.
///
/// Blank entries are dropped, duplicates are kept once in first-seen order.
pub fn parse_sub_site_folders(value: &str) -> AppResult<Vec<String>> {
    let mut folders: Vec<String> = Vec::new();
    for folder in value.split(',').map(str::trim).filter(|folder| !folder.is_empty()) {
        let folder = folder.trim_matches('/');
        validate_directory_segment("sub-site folder", folder)?;
        if !folders.iter().any(|existing| existing == folder) {
            folders.push(folder.to_owned());
        }
    }

    Ok(folders)
}

/// Last known deployment state of a demo config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    /// Never deployed.
    Pending,
    /// A synchronization is running.
    Deploying,
    /// Last synchronization succeeded.
    Success,
    /// Last synchronization failed.
    Failed,
}

impl DeploymentStatus {
    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Deploying => "deploying",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    /// Parses a stored value.
    pub fn parse(value: &str) -> AppResult<Self> {
        Self::from_str(value)
    }
}

impl FromStr for DeploymentStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "deploying" => Ok(Self::Deploying),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            _ => Err(AppError::Validation(format!(
                "unknown deployment status '{value}'"
            ))),
        }
    }
}

/// Raw fields used to build a [`DemoConfig`].
#[derive(Debug, Clone)]
pub struct DemoConfigInput {
    /// Stable identifier.
    pub id: DemoConfigId,
    /// Owning project.
    pub project_id: ProjectId,
    /// Branch published by this config.
    pub branch: String,
    /// Published sub-path, `/` for the repository root.
    pub demo_path: String,
    /// Comma-separated sub-site folders.
    pub sub_site_folders: Option<String>,
    /// Optional label shown to viewers.
    pub display_name: Option<String>,
    /// Last deployment state.
    pub deployment_status: DeploymentStatus,
    /// Time of the last finished deployment.
    pub last_deployment_at: Option<DateTime<Utc>>,
    /// Error of the last failed deployment.
    pub deployment_error: Option<String>,
    /// Whether the config participates in deployments and serving.
    pub is_active: bool,
}

/// A (project, branch) deployment target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemoConfig {
    id: DemoConfigId,
    project_id: ProjectId,
    branch: BranchName,
    demo_path: DemoPath,
    sub_site_folders: Vec<String>,
    display_name: Option<String>,
    deployment_status: DeploymentStatus,
    last_deployment_at: Option<DateTime<Utc>>,
    deployment_error: Option<String>,
    is_active: bool,
}

impl DemoConfig {
    /// Creates a validated demo config.
    pub fn new(input: DemoConfigInput) -> AppResult<Self> {
        let sub_site_folders = match input.sub_site_folders.as_deref() {
            Some(value) => parse_sub_site_folders(value)?,
            None => Vec::new(),
        };

        Ok(Self {
            id: input.id,
            project_id: input.project_id,
            branch: BranchName::new(input.branch)?,
            demo_path: DemoPath::new(input.demo_path)?,
            sub_site_folders,
            display_name: input
                .display_name
                .map(|name| name.trim().to_owned())
                .filter(|name| !name.is_empty()),
            deployment_status: input.deployment_status,
            last_deployment_at: input.last_deployment_at,
            deployment_error: input.deployment_error,
            is_active: input.is_active,
        })
    }

    /// Returns the config identifier.
    #[must_use]
    pub fn id(&self) -> DemoConfigId {
        self.id
    }

    /// Returns the owning project.
    #[must_use]
    pub fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Returns the published branch.
    #[must_use]
    pub fn branch(&self) -> &BranchName {
        &self.branch
    }

    /// Returns the published sub-path.
    #[must_use]
    pub fn demo_path(&self) -> &DemoPath {
        &self.demo_path
    }

    /// Returns the configured sub-site folders.
    #[must_use]
    pub fn sub_site_folders(&self) -> &[String] {
        self.sub_site_folders.as_slice()
    }

    /// Returns the label shown to viewers, falling back to the branch name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name
            .as_deref()
            .unwrap_or_else(|| self.branch.as_str())
    }

    /// Returns the last deployment state.
    #[must_use]
    pub fn deployment_status(&self) -> DeploymentStatus {
        self.deployment_status
    }

    /// Returns the time of the last finished deployment.
    #[must_use]
    pub fn last_deployment_at(&self) -> Option<DateTime<Utc>> {
        self.last_deployment_at
    }

    /// Returns the error of the last failed deployment.
    #[must_use]
    pub fn deployment_error(&self) -> Option<&str> {
        self.deployment_error.as_deref()
    }

    /// Returns whether the config is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }
}

#[cfg(test)]
mod tests {
    use demodeck_core::{DemoConfigId, ProjectId};
    use proptest::prelude::*;

    use super::{DemoConfig, DemoConfigInput, DemoPath, DeploymentStatus, parse_sub_site_folders};

    fn input(demo_path: &str) -> DemoConfigInput {
        DemoConfigInput {
            id: DemoConfigId::new(),
            project_id: ProjectId::new(),
            branch: "main".to_owned(),
            demo_path: demo_path.to_owned(),
            sub_site_folders: Some(" docs, ,admin,docs ".to_owned()),
            display_name: Some("  ".to_owned()),
            deployment_status: DeploymentStatus::Pending,
            last_deployment_at: None,
            deployment_error: None,
            is_active: true,
        }
    }

    #[test]
    fn empty_and_slash_paths_publish_repository_root() {
        for value in ["", "/", "  "] {
            let path = DemoPath::new(value);
            assert!(path.is_ok());
            assert!(path.unwrap_or_else(|_| unreachable!()).is_root());
        }
    }

    #[test]
    fn nested_demo_path_yields_components() {
        let path = DemoPath::new("/site/beta/");
        assert!(path.is_ok());
        let path = path.unwrap_or_else(|_| unreachable!());
        assert_eq!(
            path.relative_components().collect::<Vec<_>>(),
            vec!["site", "beta"]
        );
    }

    #[test]
    fn demo_path_rejects_traversal() {
        assert!(DemoPath::new("site/../../etc").is_err());
        assert!(DemoPath::new("site//beta").is_err());
        assert!(DemoPath::new("site\\beta").is_err());
    }

    #[test]
    fn sub_site_folders_are_trimmed_and_deduplicated() {
        let folders = parse_sub_site_folders(" docs, ,admin,docs ");
        assert!(folders.is_ok());
        assert_eq!(
            folders.unwrap_or_default(),
            vec!["docs".to_owned(), "admin".to_owned()]
        );
    }

    #[test]
    fn blank_display_name_falls_back_to_branch() {
        let config = DemoConfig::new(input("/"));
        assert!(config.is_ok());
        let config = config.unwrap_or_else(|_| unreachable!());
        assert_eq!(config.display_name(), "main");
        assert_eq!(config.sub_site_folders().len(), 2);
    }

    #[test]
    fn deployment_status_round_trips_storage_value() {
        for status in [
            DeploymentStatus::Pending,
            DeploymentStatus::Deploying,
            DeploymentStatus::Success,
            DeploymentStatus::Failed,
        ] {
            assert_eq!(DeploymentStatus::parse(status.as_str()).ok(), Some(status));
        }
        assert!(DeploymentStatus::parse("queued").is_err());
    }

    proptest! {
        #[test]
        fn accepted_demo_paths_never_contain_parent_segments(value in "[a-z./]{0,24}") {
            if let Ok(path) = DemoPath::new(value) {
                prop_assert!(path.relative_components().all(|component| component != ".." && component != "."));
            }
        }
    }
}
