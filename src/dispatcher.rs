use std::{collections::HashMap, sync::Arc, time::Duration};

use log::{debug, warn};
use tokio::{
    sync::{mpsc::Receiver, oneshot, OwnedSemaphorePermit, Semaphore},
    task::JoinSet,
    time::{interval, MissedTickBehavior},
};

use crate::{batch::Batch, entry::Entry, sender::BatchSender};

/// Lower bound for how often batch ages are checked
const MIN_TICK: Duration = Duration::from_millis(10);

/// Owns the open batch of every tenant and decides when each is flushed.
///
/// Runs as a single task: entries arrive through the queue, so the batch
/// table needs no lock. Flushed batches are pushed from separate tasks,
/// at most `max_concurrent_sends` at a time. A send slot is taken before
/// the task is spawned and intake pauses while none is free, so a slow
/// endpoint fills the queue instead of memory.
pub(crate) struct Dispatcher {
    entries: Receiver<Entry>,
    shutdown: oneshot::Receiver<()>,
    batches: HashMap<String, Batch>,
    sender: Arc<BatchSender>,
    in_flight: JoinSet<()>,
    permits: Arc<Semaphore>,
    batch_wait: Duration,
    batch_size: usize,
}

impl Dispatcher {
    pub(crate) fn new(
        entries: Receiver<Entry>,
        shutdown: oneshot::Receiver<()>,
        sender: BatchSender,
        batch_wait: Duration,
        batch_size: usize,
        max_concurrent_sends: usize,
    ) -> Self {
        Self {
            entries,
            shutdown,
            batches: HashMap::new(),
            sender: Arc::new(sender),
            in_flight: JoinSet::new(),
            permits: Arc::new(Semaphore::new(max_concurrent_sends)),
            batch_wait,
            batch_size,
        }
    }

    pub(crate) async fn run(mut self) {
        debug!("dispatcher started");
        let mut ticker = interval(tick_period(self.batch_wait));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                // A dropped client counts as a shutdown request as well
                _ = &mut self.shutdown => break,
                entry = self.entries.recv(), if self.permits.available_permits() > 0 => match entry {
                    Some(entry) => {
                        if let Some(full) = self.on_entry(entry) {
                            self.flush(full).await;
                        }
                    }
                    None => break,
                },
                _ = ticker.tick() => self.on_tick().await,
                Some(joined) = self.in_flight.join_next(), if !self.in_flight.is_empty() => {
                    log_join(joined);
                }
            }
        }

        self.drain().await;
        debug!("dispatcher stopped");
    }

    /// Adds the entry to its tenant's batch. Returns the batch it displaced
    /// when the entry did not fit.
    fn on_entry(&mut self, entry: Entry) -> Option<Batch> {
        let Some(batch) = self.batches.get_mut(entry.tenant_id()) else {
            let tenant_id = entry.tenant_id().to_owned();
            self.batches.insert(tenant_id.clone(), Batch::new(&tenant_id, [entry]));
            return None;
        };

        if !batch.is_empty() && batch.size_bytes_after(&entry) > self.batch_size {
            let tenant_id = entry.tenant_id().to_owned();
            Some(std::mem::replace(batch, Batch::new(&tenant_id, [entry])))
        } else {
            batch.add(entry);
            None
        }
    }

    /// Flushes expired batches, oldest first, as long as send slots are
    /// free. The rest stay in the table for the next tick.
    async fn on_tick(&mut self) {
        let mut expired = self
            .batches
            .iter()
            .filter(|(_, batch)| !batch.is_empty() && batch.age() >= self.batch_wait)
            .map(|(tenant_id, batch)| (batch.age(), tenant_id.clone()))
            .collect::<Vec<_>>();
        expired.sort_by(|a, b| b.0.cmp(&a.0));
        for (_, tenant_id) in expired {
            if self.permits.available_permits() == 0 {
                break;
            }
            if let Some(batch) = self.batches.remove(&tenant_id) {
                self.flush(batch).await;
            }
        }
    }

    /// Waits for a free send slot, reaping finished sends meanwhile
    async fn send_slot(&mut self) -> Option<OwnedSemaphorePermit> {
        loop {
            if let Ok(permit) = self.permits.clone().try_acquire_owned() {
                return Some(permit);
            }
            // every taken slot belongs to a task in the set
            log_join(self.in_flight.join_next().await?);
        }
    }

    async fn flush(&mut self, batch: Batch) {
        let Some(permit) = self.send_slot().await else {
            warn!(
                "no send slot, dropping batch tenant={} entries={}",
                batch.tenant_id(),
                batch.entry_count()
            );
            return;
        };
        debug!(
            "flushing batch tenant={} entries={} bytes={}",
            batch.tenant_id(),
            batch.entry_count(),
            batch.size_bytes()
        );
        let sender = self.sender.clone();
        self.in_flight.spawn(async move {
            let _permit = permit;
            // failures are reported by the sender, the batch is gone either way
            let _ = sender.send_batch(batch).await;
        });
    }

    /// Stops intake, keeps what is already queued and pushes everything
    async fn drain(&mut self) {
        self.entries.close();
        while let Some(entry) = self.entries.recv().await {
            if let Some(full) = self.on_entry(entry) {
                self.flush(full).await;
            }
        }

        let batches = std::mem::take(&mut self.batches);
        for (_, batch) in batches {
            if !batch.is_empty() {
                self.flush(batch).await;
            }
        }

        while let Some(joined) = self.in_flight.join_next().await {
            log_join(joined);
        }
    }
}

/// Ages are checked ten times per `batch_wait`, so a batch leaves at most
/// a tenth of `batch_wait` after it expired
fn tick_period(batch_wait: Duration) -> Duration {
    (batch_wait / 10).max(MIN_TICK).min(batch_wait)
}

fn log_join(joined: std::result::Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        warn!("send task failed: {}", e);
    }
}
