// ABOUTME: Config values that may come from the environment, plus .env file loading.
// ABOUTME: A value is either a literal or `{ env: NAME, default: ... }`.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    Literal(String),
    FromEnv {
        #[serde(rename = "env")]
        var: String,
        #[serde(default)]
        default: Option<String>,
    },
}

impl EnvValue {
    pub fn literal(value: impl Into<String>) -> Self {
        EnvValue::Literal(value.into())
    }

    /// An env var that is set but empty counts as unset.
    pub fn resolve(&self) -> Result<String> {
        match self {
            EnvValue::Literal(s) => Ok(s.clone()),
            EnvValue::FromEnv { var, default } => match std::env::var(var) {
                Ok(val) if !val.is_empty() => Ok(val),
                _ => default
                    .clone()
                    .ok_or_else(|| Error::MissingEnvVar(var.clone())),
            },
        }
    }
}

impl fmt::Display for EnvValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvValue::Literal(s) => write!(f, "{s}"),
            EnvValue::FromEnv { var, .. } => write!(f, "${var}"),
        }
    }
}

/// Load `.env.<destination>` (if any) and then `.env` from `dir`.
///
/// Variables already present in the process environment are never
/// overwritten, so the first file to define a variable wins.
pub fn load_env_files(dir: &Path, destination: Option<&str>) {
    let mut candidates = Vec::new();
    if let Some(dest) = destination {
        candidates.push(dir.join(format!(".env.{dest}")));
    }
    candidates.push(dir.join(".env"));

    for path in candidates {
        if path.is_file() {
            match dotenv::from_path(&path) {
                Ok(()) => tracing::debug!("loaded environment from {}", path.display()),
                Err(e) => tracing::warn!("failed to load {}: {}", path.display(), e),
            }
        }
    }
}
