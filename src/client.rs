use std::{sync::Arc, time::SystemTime};

use tokio::{
    sync::{
        mpsc::{channel, Sender},
        oneshot,
    },
    task::JoinHandle,
    time::{timeout, Duration},
};

use crate::{
    config::Config,
    dispatcher::Dispatcher,
    entry::Entry,
    error::{Error, Result},
    labels::{resolve_tenant, LabelSet},
    metrics::{LogReporter, ReportMetrics},
    push::Push,
    sender::BatchSender,
};

/// Builds and starts a [`Client`]
pub struct ClientBuilder {
    config: Config,
    reporter: Arc<dyn ReportMetrics>,
}

impl ClientBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            reporter: Arc::new(LogReporter),
        }
    }

    /// Replaces the default reporter, which writes to the `log` facade
    pub fn with_reporter<R: ReportMetrics>(mut self, reporter: R) -> Self {
        self.reporter = Arc::new(reporter);
        self
    }

    /// Validates the configuration and spawns the dispatcher on the current
    /// `tokio` runtime.
    pub fn build<P: Push>(self, pusher: P) -> Result<Client> {
        self.config.validate()?;
        let config = self.config;

        let (entries, receiver) = channel::<Entry>(config.queue_capacity);
        let (shutdown, shutdown_receiver) = oneshot::channel();
        let sender = BatchSender::new(
            Arc::new(pusher),
            self.reporter,
            config.backoff_config.clone(),
            config.timeout,
        );
        let dispatcher = Dispatcher::new(
            receiver,
            shutdown_receiver,
            sender,
            config.batch_wait,
            config.batch_size,
            config.max_concurrent_sends,
        );
        let worker = tokio::spawn(dispatcher.run());

        let entry_sender = EntrySender {
            entries,
            tenant_id: Arc::from(config.tenant_id.as_str()),
            external_labels: Arc::new(config.external_labels.clone()),
        };
        Ok(Client {
            entry_sender,
            shutdown,
            worker,
            shutdown_timeout: config.shutdown_timeout,
        })
    }
}

/// Cloneable ingestion side of a [`Client`]
#[derive(Clone)]
pub struct EntrySender {
    entries: Sender<Entry>,
    tenant_id: Arc<str>,
    external_labels: Arc<LabelSet>,
}

impl EntrySender {
    /// Queues one line without waiting.
    ///
    /// Fails with [`Error::QueueFull`] when the queue is at capacity and with
    /// [`Error::Stopped`] once the client shuts down. Delivery failures
    /// are only visible through the reporter.
    pub fn handle(&self, labels: LabelSet, timestamp: SystemTime, line: &str) -> Result<()> {
        let entry = self.entry(labels, timestamp, line);
        self.entries.try_send(entry)?;
        Ok(())
    }

    /// Same as [`EntrySender::handle`] but waits for room in the queue
    pub async fn handle_wait(
        &self,
        labels: LabelSet,
        timestamp: SystemTime,
        line: &str,
    ) -> Result<()> {
        let entry = self.entry(labels, timestamp, line);
        self.entries.send(entry).await?;
        Ok(())
    }

    fn entry(&self, labels: LabelSet, timestamp: SystemTime, line: &str) -> Entry {
        let labels = self.external_labels.merge(&labels);
        let (tenant_id, labels) = resolve_tenant(&self.tenant_id, labels);
        Entry::new(&tenant_id, labels, timestamp, line)
    }
}

/// Batches entries per tenant and pushes them in the background.
///
/// Dropping the client also flushes what it holds, but only [`Client::stop`]
/// waits for it.
#[must_use = "method `stop` must be called before exit"]
pub struct Client {
    entry_sender: EntrySender,
    shutdown: oneshot::Sender<()>,
    worker: JoinHandle<()>,
    shutdown_timeout: Duration,
}

impl Client {
    pub fn builder(config: Config) -> ClientBuilder {
        ClientBuilder::new(config)
    }

    pub fn handle(&self, labels: LabelSet, timestamp: SystemTime, line: &str) -> Result<()> {
        self.entry_sender.handle(labels, timestamp, line)
    }

    pub async fn handle_wait(
        &self,
        labels: LabelSet,
        timestamp: SystemTime,
        line: &str,
    ) -> Result<()> {
        self.entry_sender.handle_wait(labels, timestamp, line).await
    }

    /// Handle for producers that outlive a borrow of the client
    pub fn entry_sender(&self) -> EntrySender {
        self.entry_sender.clone()
    }

    /// Stops intake and pushes every pending entry. Gives up after the
    /// configured shutdown timeout, dropping whatever is still unsent.
    pub async fn stop(self) -> Result<()> {
        let Self {
            shutdown,
            mut worker,
            shutdown_timeout,
            ..
        } = self;
        // the dispatcher may already be gone, its join result tells
        let _ = shutdown.send(());
        match timeout(shutdown_timeout, &mut worker).await {
            Ok(joined) => Ok(joined?),
            Err(_) => {
                worker.abort();
                Err(Error::ShutdownTimeout(shutdown_timeout))
            }
        }
    }
}
