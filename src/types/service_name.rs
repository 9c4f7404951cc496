// ABOUTME: systemd unit name validation.
// ABOUTME: Restricts service names to the characters systemctl accepts in a unit name.

use std::fmt;
use thiserror::Error;

/// systemd rejects unit names longer than this.
const MAX_LEN: usize = 255;

#[derive(Debug, Error)]
pub enum ServiceNameError {
    #[error("service name cannot be empty")]
    Empty,

    #[error("service name exceeds maximum length of {MAX_LEN} characters")]
    TooLong,

    #[error("service name cannot start with a hyphen")]
    StartsWithHyphen,

    #[error("invalid character in service name: '{0}'")]
    InvalidChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceName(String);

impl ServiceName {
    pub fn new(value: &str) -> Result<Self, ServiceNameError> {
        if value.is_empty() {
            return Err(ServiceNameError::Empty);
        }

        if value.len() > MAX_LEN {
            return Err(ServiceNameError::TooLong);
        }

        // Would be parsed as a systemctl option
        if value.starts_with('-') {
            return Err(ServiceNameError::StartsWithHyphen);
        }

        for c in value.chars() {
            if !c.is_ascii_alphanumeric() && !matches!(c, ':' | '_' | '.' | '@' | '-') {
                return Err(ServiceNameError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
