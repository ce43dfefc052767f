//! Authenticated identity supplied by the identity provider.

use crate::model::issue::IssueValidationError;
use std::fmt::{Display, Formatter};

/// Stable, non-blank identity string of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
    /// Wraps a provider-issued identity, trimming surrounding whitespace.
    pub fn new(value: impl AsRef<str>) -> Result<Self, IssueValidationError> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(IssueValidationError::EmptyIdentity);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Identity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
