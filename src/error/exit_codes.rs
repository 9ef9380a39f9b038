use crate::error::LockerError;

pub fn get_exit_code(error: &LockerError) -> i32 {
    match error {
        LockerError::InvalidArgument(_)
        | LockerError::InvalidConfig(_)
        | LockerError::Config(_) => 2,

        LockerError::LockNotFound { .. } | LockerError::IllegalState(_) => 3,

        _ => 1,
    }
}
