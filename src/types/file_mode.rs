// ABOUTME: chmod mode validation.
// ABOUTME: Accepts octal modes ("755", "0755") and symbolic modes ("u+rwX,go-w").

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileModeError {
    #[error("file mode cannot be empty")]
    Empty,

    #[error("octal file mode must have 3 or 4 digits: {0}")]
    OctalLength(String),

    #[error("invalid file mode: {0}")]
    Invalid(String),
}

/// A mode argument for `chmod`, either octal or symbolic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileMode(String);

impl FileMode {
    pub fn new(value: &str) -> Result<Self, FileModeError> {
        if value.is_empty() {
            return Err(FileModeError::Empty);
        }

        if value.chars().all(|c| c.is_ascii_digit()) {
            if !(3..=4).contains(&value.len()) {
                return Err(FileModeError::OctalLength(value.to_string()));
            }
            if value.chars().any(|c| c > '7') {
                return Err(FileModeError::Invalid(value.to_string()));
            }
            return Ok(Self(value.to_string()));
        }

        if !value.split(',').all(is_symbolic_clause) {
            return Err(FileModeError::Invalid(value.to_string()));
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// `[ugoa]*([-+=][rwxXst]*)+`
fn is_symbolic_clause(clause: &str) -> bool {
    let rest = clause.trim_start_matches(['u', 'g', 'o', 'a']);
    if rest.is_empty() {
        return false;
    }

    let mut chars = rest.chars().peekable();
    while let Some(op) = chars.next() {
        if !matches!(op, '+' | '-' | '=') {
            return false;
        }
        while let Some(&c) = chars.peek() {
            if !matches!(c, 'r' | 'w' | 'x' | 'X' | 's' | 't') {
                break;
            }
            chars.next();
        }
    }
    true
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
