// ABOUTME: Validated container names.
// ABOUTME: Follows the runtime rule [a-zA-Z0-9][a-zA-Z0-9_.-]*.

use std::fmt;
use thiserror::Error;

const MAX_LEN: usize = 128;

#[derive(Debug, Error)]
pub enum ContainerNameError {
    #[error("container name cannot be empty")]
    Empty,

    #[error("container name exceeds maximum length of 128 characters")]
    TooLong,

    #[error("container name must start with a letter or digit")]
    InvalidStart,

    #[error("invalid character in container name: '{0}'")]
    InvalidChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerName(String);

impl ContainerName {
    pub fn new(value: &str) -> Result<Self, ContainerNameError> {
        let mut chars = value.chars();

        let first = chars.next().ok_or(ContainerNameError::Empty)?;
        if !first.is_ascii_alphanumeric() {
            return Err(ContainerNameError::InvalidStart);
        }

        if value.len() > MAX_LEN {
            return Err(ContainerNameError::TooLong);
        }

        if let Some(c) = chars.find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '_' | '.' | '-')) {
            return Err(ContainerNameError::InvalidChar(c));
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ContainerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
