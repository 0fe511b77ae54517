use std::fmt::{Display, Formatter, Result as FmtResult};

use async_trait::async_trait;

use crate::{batch::PushRequest, status::Status};

/// Transport that delivers a rendered batch to the remote log store.
///
/// Implementations own connection handling and wire encoding. A call is one
/// attempt; retries are driven by the client.
#[async_trait]
pub trait Push: Send + Sync + 'static {
    async fn push(
        &self,
        tenant_id: &str,
        request: &PushRequest,
    ) -> std::result::Result<(), PushError>;
}

/// Failure of a single push attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushError {
    /// The remote end answered with a status
    Status(Status),
    /// Anything the transport could not classify
    Transport(String),
}

impl PushError {
    pub fn status(&self) -> Option<&Status> {
        match self {
            Self::Status(status) => Some(status),
            Self::Transport(_) => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.status().is_some_and(|s| s.code().is_retryable())
    }
}

impl Display for PushError {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Self::Status(status) => write!(f, "{}", status),
            Self::Transport(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for PushError {}

impl From<Status> for PushError {
    fn from(value: Status) -> Self {
        Self::Status(value)
    }
}
