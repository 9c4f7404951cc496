// ABOUTME: Validated domain types shared by config parsing and remote operations.
// ABOUTME: Values that end up interpolated into remote commands are checked here first.

mod file_mode;
mod service_name;

pub use file_mode::{FileMode, FileModeError};
pub use service_name::{ServiceName, ServiceNameError};
