//! Client configuration
//!
//! Every field has a default, so a document only needs the server address:
//!
//! ```yaml
//! server_address: loki.example.com:9095
//! batch_wait: 2s
//! batch_size: 524288
//! tenant_id: team-a
//! external_labels:
//!   cluster: eu-1
//! backoff_config:
//!   min_backoff: 100ms
//!   max_backoff: 10s
//!   max_retries: 5
//! ```
//!
//! The connection settings (message sizes, TLS, keep-alive) are not used by
//! the batching core. They are carried for the `Push` implementation.

use std::{path::Path, time::Duration};

use serde::Deserialize;

use crate::{
    error::{Error, Result},
    labels::LabelSet,
};

pub const DEFAULT_BATCH_WAIT: Duration = Duration::from_secs(1);
pub const DEFAULT_BATCH_SIZE: usize = 1024 * 1024;
pub const DEFAULT_MIN_BACKOFF: Duration = Duration::from_millis(500);
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_MAX_RETRIES: u32 = 10;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_RECV_MSG_SIZE: usize = 64 * 1024 * 1024;
pub const DEFAULT_MAX_SEND_MSG_SIZE: usize = 16 * 1024 * 1024;
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(30);
pub const DEFAULT_KEEP_ALIVE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;
pub const DEFAULT_MAX_CONCURRENT_SENDS: usize = 4;
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote store address (host:port)
    pub server_address: String,

    /// Maximum age of a batch before it is pushed
    #[serde(with = "humantime_serde")]
    pub batch_wait: Duration,
    /// Line bytes a batch may hold before it is pushed
    pub batch_size: usize,

    pub max_recv_msg_size: usize,
    pub max_send_msg_size: usize,
    /// Upper bound for a single push attempt
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    pub tls: TlsConfig,

    #[serde(with = "humantime_serde")]
    pub keep_alive: Duration,
    #[serde(with = "humantime_serde")]
    pub keep_alive_timeout: Duration,

    pub backoff_config: BackoffConfig,

    /// Labels added to every entry; an entry's own labels take precedence
    pub external_labels: LabelSet,

    /// Tenant used when an entry carries no tenant label. Empty means
    /// single tenant.
    pub tenant_id: String,

    /// Entries buffered between `handle` and the dispatcher
    pub queue_capacity: usize,
    /// Batches being pushed at the same time
    pub max_concurrent_sends: usize,
    /// How long `Client::stop` waits for pending batches
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_address: String::new(),
            batch_wait: DEFAULT_BATCH_WAIT,
            batch_size: DEFAULT_BATCH_SIZE,
            max_recv_msg_size: DEFAULT_MAX_RECV_MSG_SIZE,
            max_send_msg_size: DEFAULT_MAX_SEND_MSG_SIZE,
            timeout: DEFAULT_TIMEOUT,
            tls: TlsConfig::default(),
            keep_alive: DEFAULT_KEEP_ALIVE,
            keep_alive_timeout: DEFAULT_KEEP_ALIVE_TIMEOUT,
            backoff_config: BackoffConfig::default(),
            external_labels: LabelSet::new(),
            tenant_id: String::new(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_concurrent_sends: DEFAULT_MAX_CONCURRENT_SENDS,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl Config {
    /// Default configuration pointing at `server_address`
    pub fn new(server_address: &str) -> Self {
        Self {
            server_address: server_address.to_owned(),
            ..Self::default()
        }
    }

    pub fn from_yaml_str(document: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(document)?;
        Ok(config)
    }

    pub fn from_yaml_file<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let document = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&document)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server_address.trim().is_empty() {
            return Err(Error::Config("server address must not be empty".to_owned()));
        }
        if self.batch_size == 0 {
            return Err(Error::Config("batch_size must be greater than zero".to_owned()));
        }
        if self.batch_wait.is_zero() {
            return Err(Error::Config("batch_wait must be greater than zero".to_owned()));
        }
        if self.timeout.is_zero() {
            return Err(Error::Config("timeout must be greater than zero".to_owned()));
        }
        if self.queue_capacity == 0 {
            return Err(Error::Config(
                "queue_capacity must be greater than zero".to_owned(),
            ));
        }
        if self.max_concurrent_sends == 0 {
            return Err(Error::Config(
                "max_concurrent_sends must be greater than zero".to_owned(),
            ));
        }
        self.backoff_config.validate()?;
        self.tls.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Delay after the first failed attempt
    #[serde(with = "humantime_serde")]
    pub min_backoff: Duration,
    #[serde(with = "humantime_serde")]
    pub max_backoff: Duration,
    /// Total attempts made for a batch before it is dropped
    pub max_retries: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            min_backoff: DEFAULT_MIN_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl BackoffConfig {
    fn validate(&self) -> Result<()> {
        if self.max_retries == 0 {
            return Err(Error::Config(
                "max_retries must be greater than zero".to_owned(),
            ));
        }
        if self.min_backoff.is_zero() {
            return Err(Error::Config(
                "min_backoff must be greater than zero".to_owned(),
            ));
        }
        if self.min_backoff > self.max_backoff {
            return Err(Error::Config(format!(
                "min_backoff ({:?}) is greater than max_backoff ({:?})",
                self.min_backoff, self.max_backoff
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    pub enabled: bool,
    /// Client certificate, requires `key_file`
    pub cert_file: Option<String>,
    pub key_file: Option<String>,
    pub ca_file: Option<String>,
    /// Name checked against the server certificate
    pub server_name: Option<String>,
    pub insecure_skip_verify: bool,
}

impl TlsConfig {
    fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        match (&self.cert_file, &self.key_file) {
            (Some(_), None) => Err(Error::Config(
                "tls.cert_file is set without tls.key_file".to_owned(),
            )),
            (None, Some(_)) => Err(Error::Config(
                "tls.key_file is set without tls.cert_file".to_owned(),
            )),
            _ => Ok(()),
        }
    }
}
