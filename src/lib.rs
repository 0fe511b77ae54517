//! Batching client for a remote log store.
//!
//! Lines are handed to a [`Client`] together with their labels. The client
//! groups them per tenant and stream, pushes a batch once it is big or old
//! enough and retries transient failures with exponential backoff. The
//! network side is left to a [`Push`] implementation.
//!
//! ```no_run
//! use std::time::SystemTime;
//!
//! use async_trait::async_trait;
//! use log_pusher::{Client, Config, LabelSet, Push, PushError, PushRequest};
//!
//! struct Discard;
//!
//! #[async_trait]
//! impl Push for Discard {
//!     async fn push(&self, _tenant_id: &str, _request: &PushRequest) -> Result<(), PushError> {
//!         Ok(())
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> log_pusher::Result<()> {
//! let client = Client::builder(Config::new("localhost:9095")).build(Discard)?;
//! client.handle(LabelSet::new().with_label("job", "demo"), SystemTime::now(), "hello")?;
//! client.stop().await?;
//! # Ok(())
//! # }
//! ```

mod backoff;
mod batch;
mod client;
mod config;
mod dispatcher;
mod entry;
mod error;
mod labels;
mod logger;
mod metrics;
mod push;
mod sender;
mod status;
#[cfg(test)]
mod test_utils;

pub use crate::batch::{Batch, PushRequest, Stream, StreamEntry};
pub use crate::client::{Client, ClientBuilder, EntrySender};
pub use crate::config::{BackoffConfig, Config, TlsConfig};
pub use crate::entry::Entry;
pub use crate::error::{Error, Result};
pub use crate::labels::{resolve_tenant, LabelSet, RESERVED_LABEL_TENANT_ID};
pub use crate::logger::{DefaultFormatter, FormatLine, JsonFormatter, ModuleLevel, PushLogger};
pub use crate::metrics::{FlushOutcome, FlushRecord, LogReporter, NoopReporter, ReportMetrics};
pub use crate::push::{Push, PushError};
pub use crate::status::{status_code, Code, Status};
