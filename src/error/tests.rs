use crate::error::*;

#[test]
fn test_lock_not_found_formats_key_with_debug() {
    let error = LockerError::lock_not_found(&"orders-17");
    assert_eq!(
        error.to_string(),
        "Lock for entity \"orders-17\" is not found"
    );
}

#[test]
fn test_invalid_argument_message() {
    let error = LockerError::InvalidArgument("timeout must be positive".to_string());
    assert!(error.to_string().contains("timeout must be positive"));
    assert!(error.is_usage_error());
}

#[test]
fn test_io_error_is_not_usage_error() {
    let error = LockerError::Io(std::io::Error::other("disk gone"));
    assert!(!error.is_usage_error());
}

#[test]
fn test_exit_codes() {
    assert_eq!(
        get_exit_code(&LockerError::InvalidArgument("x".to_string())),
        2
    );
    assert_eq!(get_exit_code(&LockerError::InvalidConfig("x".to_string())), 2);
    assert_eq!(
        get_exit_code(&LockerError::LockNotFound {
            key: "1".to_string()
        }),
        3
    );
    assert_eq!(get_exit_code(&LockerError::IllegalState("x".to_string())), 3);
    assert_eq!(
        get_exit_code(&LockerError::Io(std::io::Error::other("x"))),
        1
    );
}
