use demodeck_core::{AppError, AppResult};

/// Requested location beneath a published root, checked lexically.
///
/// Only plain relative segments survive. The filesystem adapter still canonicalizes the
/// joined path because symlinks can escape a lexically clean path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPath {
    segments: Vec<String>,
}

impl ArtifactPath {
    /// Parses a relative URL sub-path. An empty value addresses the published root itself.
    pub fn parse(value: &str) -> AppResult<Self> {
        if value.starts_with('/') || value.contains(['\\', '\0']) {
            return Err(forbidden(value));
        }

        let mut segments = Vec::new();
        for segment in value.split('/') {
            match segment {
                "" | "." => {}
                ".." => return Err(forbidden(value)),
                _ if looks_like_drive_prefix(segment) => return Err(forbidden(value)),
                _ => segments.push(segment.to_owned()),
            }
        }

        Ok(Self { segments })
    }

    /// Returns the validated segments.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        self.segments.as_slice()
    }

    /// Returns whether the published root itself is addressed.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

fn looks_like_drive_prefix(segment: &str) -> bool {
    let mut characters = segment.chars();
    matches!(
        (characters.next(), characters.next()),
        (Some(letter), Some(':')) if letter.is_ascii_alphabetic()
    )
}

fn forbidden(value: &str) -> AppError {
    AppError::Forbidden(format!("path '{value}' escapes the published root"))
}
