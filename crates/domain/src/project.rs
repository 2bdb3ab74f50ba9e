use demodeck_core::{AppError, AppResult, NonEmptyString, ProjectId};
use serde::{Deserialize, Serialize};

/// Project whose branches are published as static demos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    id: ProjectId,
    name: NonEmptyString,
    repository_url: NonEmptyString,
    repository_full_name: NonEmptyString,
    is_active: bool,
}

impl Project {
    /// Creates a validated project projection.
    ///
    /// The name is used as a directory under the published root and must be a single
    /// path segment.
    pub fn new(
        id: ProjectId,
        name: impl Into<String>,
        repository_url: impl Into<String>,
        repository_full_name: impl Into<String>,
        is_active: bool,
    ) -> AppResult<Self> {
        let name = NonEmptyString::new(name)?;
        validate_directory_segment("project name", name.as_str())?;

        Ok(Self {
            id,
            name,
            repository_url: NonEmptyString::new(repository_url)?,
            repository_full_name: NonEmptyString::new(repository_full_name)?,
            is_active,
        })
    }

    /// Returns the project identifier.
    #[must_use]
    pub fn id(&self) -> ProjectId {
        self.id
    }

    /// Returns the project name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }

    /// Returns the clone URL of the source repository.
    #[must_use]
    pub fn repository_url(&self) -> &NonEmptyString {
        &self.repository_url
    }

    /// Returns the `owner/repo` name used to match webhook payloads.
    #[must_use]
    pub fn repository_full_name(&self) -> &NonEmptyString {
        &self.repository_full_name
    }

    /// Returns whether the project is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }
}

/// Rejects values that are not one plain directory name.
pub(crate) fn validate_directory_segment(kind: &str, value: &str) -> AppResult<()> {
    if value == "."
        || value == ".."
        || value.starts_with('.')
        || value.contains(['/', '\\', '\0'])
    {
        return Err(AppError::Validation(format!(
            "{kind} '{value}' must be a single directory name"
        )));
    }

    Ok(())
}
