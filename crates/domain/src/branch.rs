use std::fmt::{Display, Formatter};

use demodeck_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Maximum accepted branch name length.
pub const BRANCH_NAME_MAX_LENGTH: usize = 100;

/// Branch used by manual triggers when the caller does not name one.
pub const DEFAULT_BRANCH: &str = "main";

/// Validated remote branch name.
///
/// Branch names are passed to git as arguments, so anything that could be parsed as
/// an option or that git refuses as a ref is rejected. Interior `/` is allowed; on
/// disk the name is addressed through [`BranchName::directory_name`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Creates a validated branch name.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();

        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "branch name must not be empty".to_owned(),
            ));
        }

        if trimmed.len() > BRANCH_NAME_MAX_LENGTH {
            return Err(AppError::Validation(format!(
                "branch name must not exceed {BRANCH_NAME_MAX_LENGTH} characters"
            )));
        }

        if trimmed.starts_with('-') {
            return Err(AppError::Validation(format!(
                "branch name '{trimmed}' must not start with '-'"
            )));
        }

        if trimmed.contains("..")
            || trimmed.contains("@{")
            || trimmed.split('/').any(|component| {
                component.is_empty() || component.starts_with('.') || component.ends_with(".lock")
            })
        {
            return Err(AppError::Validation(format!(
                "branch name '{trimmed}' is not a valid ref name"
            )));
        }

        if trimmed.chars().any(|character| {
            character.is_whitespace()
                || character.is_control()
                || matches!(character, '\\' | ':' | '~' | '^' | '?' | '*' | '[')
        }) {
            return Err(AppError::Validation(format!(
                "branch name '{trimmed}' contains a forbidden character"
            )));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Extracts a branch name from a fully qualified `refs/heads/...` ref.
    ///
    /// Returns `Ok(None)` for refs outside `refs/heads/`, such as tags.
    pub fn from_ref(git_ref: &str) -> AppResult<Option<Self>> {
        git_ref
            .strip_prefix("refs/heads/")
            .map(Self::new)
            .transpose()
    }

    /// Returns the branch name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the branch as one directory name, with `%` and `/` percent-encoded.
    ///
    /// Distinct branches map to distinct names, so `feature` and `feature/x` never
    /// share or nest a directory.
    #[must_use]
    pub fn directory_name(&self) -> String {
        let mut encoded = String::with_capacity(self.0.len());
        for character in self.0.chars() {
            match character {
                '%' => encoded.push_str("%25"),
                '/' => encoded.push_str("%2F"),
                other => encoded.push(other),
            }
        }
        encoded
    }
}

impl Display for BranchName {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

impl TryFrom<String> for BranchName {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BranchName> for String {
    fn from(value: BranchName) -> Self {
        value.0
    }
}
