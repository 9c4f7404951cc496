// ABOUTME: Library root for tarploy - exposes the deploy session and supporting types.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod deploy;
pub mod diagnostics;
pub mod error;
pub mod output;
pub mod ssh;
pub mod types;
