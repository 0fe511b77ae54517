use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::push::PushError;

/// Status kinds a transport can report, with their wire numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Code {
    Ok = 0,
    Cancelled = 1,
    Unknown = 2,
    InvalidArgument = 3,
    DeadlineExceeded = 4,
    NotFound = 5,
    AlreadyExists = 6,
    PermissionDenied = 7,
    ResourceExhausted = 8,
    FailedPrecondition = 9,
    Aborted = 10,
    OutOfRange = 11,
    Unimplemented = 12,
    Internal = 13,
    Unavailable = 14,
    DataLoss = 15,
    Unauthenticated = 16,
}

impl Code {
    /// Transient conditions worth another attempt
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Code::Unavailable | Code::ResourceExhausted | Code::DeadlineExceeded | Code::Internal
        )
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Status attached to a failed push
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    code: Code,
    message: String,
}

impl Status {
    pub fn new(code: Code, message: &str) -> Self {
        Self {
            code,
            message: message.to_owned(),
        }
    }

    pub fn code(&self) -> Code {
        self.code
    }

    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "status {:?}: {}", self.code, self.message)
    }
}

/// Normalizes a push outcome into the status label used in flush reports.
///
/// Only a handful of codes get an HTTP-like number; the rest keep their
/// numeric transport value.
pub fn status_code(error: Option<&PushError>) -> String {
    let Some(error) = error else {
        return "200".to_owned();
    };
    let Some(status) = error.status() else {
        return "Unknown".to_owned();
    };
    match status.code() {
        Code::Unavailable | Code::Internal => "500".to_owned(),
        Code::ResourceExhausted => "429".to_owned(),
        Code::DeadlineExceeded => "504".to_owned(),
        code => code.as_u8().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_error(code: Code) -> PushError {
        PushError::Status(Status::new(code, "test error"))
    }

    #[test]
    fn test_status_code() {
        assert_eq!(status_code(None), "200");
        assert_eq!(status_code(Some(&status_error(Code::InvalidArgument))), "3");
        assert_eq!(status_code(Some(&status_error(Code::Unavailable))), "500");
        assert_eq!(status_code(Some(&status_error(Code::ResourceExhausted))), "429");
        assert_eq!(status_code(Some(&status_error(Code::DeadlineExceeded))), "504");
        assert_eq!(status_code(Some(&status_error(Code::Internal))), "500");
        assert_eq!(status_code(Some(&status_error(Code::Unauthenticated))), "16");

        let transport = PushError::Transport("connection reset".to_owned());
        assert_eq!(status_code(Some(&transport)), "Unknown");
    }

    #[test]
    fn test_retryable_codes() {
        assert!(Code::Unavailable.is_retryable());
        assert!(Code::ResourceExhausted.is_retryable());
        assert!(Code::DeadlineExceeded.is_retryable());
        assert!(Code::Internal.is_retryable());
        assert!(!Code::InvalidArgument.is_retryable());
        assert!(!Code::PermissionDenied.is_retryable());
        assert!(!Code::Unknown.is_retryable());
    }
}
