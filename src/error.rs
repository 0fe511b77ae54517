use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    time::Duration,
};

use log::SetLoggerError;
use tokio::{
    sync::mpsc::error::{SendError, TrySendError},
    task::JoinError,
};

use crate::entry::Entry;

#[derive(Debug)]
pub enum Error {
    Config(String),
    QueueFull,
    Stopped,
    SetLogger(String),
    ShutdownTimeout(Duration),
    Worker(String),
    Io(String),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Self::Config(e) => write!(f, "invalid configuration: {}", e),
            Self::QueueFull => write!(f, "entry queue is full"),
            Self::Stopped => write!(f, "client is stopped"),
            Self::SetLogger(e) => write!(f, "{}", e),
            Self::ShutdownTimeout(d) => {
                write!(f, "client did not shut down within {:?}", d)
            }
            Self::Worker(e) => write!(f, "dispatcher task failed: {}", e),
            Self::Io(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<TrySendError<Entry>> for Error {
    fn from(value: TrySendError<Entry>) -> Self {
        match value {
            TrySendError::Full(_) => Self::QueueFull,
            TrySendError::Closed(_) => Self::Stopped,
        }
    }
}

impl From<SendError<Entry>> for Error {
    fn from(_: SendError<Entry>) -> Self {
        Self::Stopped
    }
}

impl From<JoinError> for Error {
    fn from(value: JoinError) -> Self {
        Self::Worker(value.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(value: serde_yaml::Error) -> Self {
        Self::Config(value.to_string())
    }
}

impl From<SetLoggerError> for Error {
    fn from(value: SetLoggerError) -> Self {
        Self::SetLogger(value.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
