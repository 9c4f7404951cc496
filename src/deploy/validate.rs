// ABOUTME: Argument checks applied before anything is sent to the remote shell.
// ABOUTME: Rejects empty values, shell metacharacters, and unsafe unpack directories.

use super::error::{DeployError, Result};
use crate::types::{FileMode, ServiceName};

/// Marker every unpack directory must contain.
pub const APPROOT_MARKER: &str = "approot";

pub(crate) fn service_name(value: &str) -> Result<ServiceName> {
    ServiceName::new(value).map_err(|e| DeployError::validation("service name", e.to_string()))
}

pub(crate) fn file_mode(value: &str) -> Result<FileMode> {
    FileMode::new(value).map_err(|e| DeployError::validation("permissions", e.to_string()))
}

pub(crate) fn non_empty(field: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(DeployError::validation(field, "value is required"));
    }
    Ok(())
}

/// A path, user or group name that is interpolated unquoted into a remote command.
pub(crate) fn shell_word(field: &'static str, value: &str) -> Result<()> {
    non_empty(field, value)?;

    if value.starts_with('-') {
        return Err(DeployError::validation(field, "cannot start with a hyphen"));
    }

    if let Some(c) = value.chars().find(|&c| is_shell_special(c)) {
        return Err(DeployError::validation(
            field,
            format!("contains disallowed character {c:?}"),
        ));
    }

    Ok(())
}

fn is_shell_special(c: char) -> bool {
    c.is_whitespace()
        || c.is_control()
        || matches!(
            c,
            ';' | '&' | '|' | '$' | '`' | '\'' | '"' | '<' | '>' | '(' | ')' | '{' | '}' | '['
                | ']' | '*' | '?' | '!' | '\\' | '#'
        )
}

/// The unpack directory has its contents recursively deleted, so it must sit
/// strictly below an `approot` directory and never be the `approot` itself.
pub(crate) fn unpack_dir(value: &str) -> Result<()> {
    shell_word("unpack directory", value)?;

    if !value.contains(APPROOT_MARKER) {
        return Err(DeployError::validation(
            "unpack directory",
            format!("must contain {APPROOT_MARKER:?}: {value}"),
        ));
    }

    // "dir/.." or "dir/." would point the purge at approot or above it
    if value.split('/').any(|segment| segment == "." || segment == "..") {
        return Err(DeployError::validation(
            "unpack directory",
            format!("must not contain \".\" or \"..\" segments: {value}"),
        ));
    }

    if value.trim_end_matches('/').ends_with(APPROOT_MARKER) {
        return Err(DeployError::validation(
            "unpack directory",
            format!("must not end with {APPROOT_MARKER:?}: {value}"),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_word_accepts_plain_paths_and_names() {
        assert!(shell_word("dir", "/srv/approot/my-app_v2.1").is_ok());
        assert!(shell_word("owner", "www-data").is_ok());
        assert!(shell_word("tarball", "/tmp/app.tar.gz").is_ok());
    }

    #[test]
    fn shell_word_rejects_metacharacters() {
        for bad in ["a b", "a;b", "$(id)", "`id`", "a|b", "a&&b", "a>b", "a*", "a\nb", "\"a\""] {
            assert!(shell_word("dir", bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn shell_word_rejects_option_lookalikes() {
        assert!(shell_word("owner", "-rf").is_err());
    }

    #[test]
    fn empty_values_are_rejected() {
        let err = non_empty("app directory", "").unwrap_err();
        assert!(matches!(err, DeployError::Validation { field: "app directory", .. }));
    }

    #[test]
    fn unpack_dir_requires_marker() {
        assert!(unpack_dir("/srv/app/current").is_err());
    }

    #[test]
    fn unpack_dir_rejects_approot_itself() {
        assert!(unpack_dir("/srv/approot").is_err());
        assert!(unpack_dir("/srv/approot/").is_err());
        assert!(unpack_dir("/srv/approot//").is_err());
        assert!(unpack_dir("/srv/my-approot").is_err());
    }

    #[test]
    fn unpack_dir_rejects_relative_segments() {
        assert!(unpack_dir("/srv/approot/..").is_err());
        assert!(unpack_dir("/srv/approot/../").is_err());
        assert!(unpack_dir("/srv/approot/.").is_err());
        assert!(unpack_dir("/srv/approot/current/../..").is_err());
        assert!(unpack_dir("/srv/approot/./current").is_err());
    }

    #[test]
    fn unpack_dir_allows_dots_inside_names() {
        assert!(unpack_dir("/srv/approot/.hidden").is_ok());
        assert!(unpack_dir("/srv/approot/app..v2").is_ok());
    }

    #[test]
    fn unpack_dir_accepts_child_of_approot() {
        assert!(unpack_dir("/srv/approot/current").is_ok());
        assert!(unpack_dir("/srv/approot/current/").is_ok());
        assert!(unpack_dir("/var/www/approot-myapp/live").is_ok());
    }
}
