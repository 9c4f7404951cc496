// ABOUTME: Command module aggregator for the tarploy CLI.
// ABOUTME: Re-exports deploy and service control command handlers.

mod connection;
mod deploy;
mod service;

pub use deploy::deploy;
pub use service::{start, status, stop};
