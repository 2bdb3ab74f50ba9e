use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppError;

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID value.
            #[must_use]
            pub fn from_uuid(value: Uuid) -> Self {
                Self(value)
            }

            /// Returns the underlying UUID value.
            #[must_use]
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Display for $name {
            fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
                write!(formatter, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = AppError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(value.trim()).map(Self).map_err(|error| {
                    AppError::Validation(format!("invalid {} '{value}': {error}", $label))
                })
            }
        }
    };
}

uuid_identifier!(
    /// Identifier of a project whose demos are published.
    ProjectId,
    "project id"
);
uuid_identifier!(
    /// Identifier of one (project, branch) deployment target.
    DemoConfigId,
    "demo config id"
);
uuid_identifier!(
    /// Identifier of a user account.
    UserId,
    "user id"
);
uuid_identifier!(
    /// Identifier of a user group.
    GroupId,
    "group id"
);
uuid_identifier!(
    /// Identifier of one deployment audit record.
    AuditId,
    "audit id"
);
