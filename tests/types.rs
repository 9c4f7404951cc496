// ABOUTME: Integration tests for the validated value types.
// ABOUTME: Service names and chmod modes as seen from outside the crate.

use tarploy::types::{FileMode, FileModeError, ServiceName, ServiceNameError};

#[test]
fn common_unit_names_are_valid() {
    for name in ["myapp", "myapp.service", "getty@tty1", "api_v2", "node-app:blue"] {
        let service = ServiceName::new(name).unwrap();
        assert_eq!(service.as_str(), name);
        assert_eq!(service.to_string(), name);
    }
}

#[test]
fn service_name_rejections() {
    assert!(matches!(ServiceName::new(""), Err(ServiceNameError::Empty)));
    assert!(matches!(
        ServiceName::new("--now"),
        Err(ServiceNameError::StartsWithHyphen)
    ));
    assert!(matches!(
        ServiceName::new(&"a".repeat(256)),
        Err(ServiceNameError::TooLong)
    ));
    assert!(matches!(
        ServiceName::new("my app"),
        Err(ServiceNameError::InvalidChar(' '))
    ));
    assert!(matches!(
        ServiceName::new("app$(id)"),
        Err(ServiceNameError::InvalidChar('$'))
    ));
}

#[test]
fn octal_modes() {
    assert_eq!(FileMode::new("755").unwrap().as_str(), "755");
    assert_eq!(FileMode::new("0750").unwrap().as_str(), "0750");
    assert!(matches!(
        FileMode::new("75"),
        Err(FileModeError::OctalLength(_))
    ));
    assert!(matches!(
        FileMode::new("07555"),
        Err(FileModeError::OctalLength(_))
    ));
    assert!(matches!(FileMode::new("0789"), Err(FileModeError::Invalid(_))));
}

#[test]
fn symbolic_modes() {
    for mode in ["u+rwX", "go-w", "a=r", "u+rwx,g+rx,o-rwx", "+x", "u=rwX,g=rX,o="] {
        assert!(FileMode::new(mode).is_ok(), "{mode:?} should be accepted");
    }
}

#[test]
fn malformed_modes_are_rejected() {
    assert!(matches!(FileMode::new(""), Err(FileModeError::Empty)));
    for mode in ["u", "rwx", "u+q", "0755; rm -rf /", "u+x,", "-R"] {
        assert!(FileMode::new(mode).is_err(), "{mode:?} should be rejected");
    }
}
