// ABOUTME: SSH client module for remote server connections.
// ABOUTME: Key-based authentication, known_hosts verification, exec and file upload.

mod client;
mod error;

pub use client::{CommandOutput, Session, SessionConfig, shell_quote};
pub use error::{Error, Result};
