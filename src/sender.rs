use std::{sync::Arc, time::Duration};

use tokio::time::{timeout, Instant};

use crate::{
    backoff::Backoff,
    batch::Batch,
    config::BackoffConfig,
    metrics::{FlushOutcome, FlushRecord, ReportMetrics},
    push::{Push, PushError},
    status::{status_code, Code, Status},
};

/// Pushes batches through the transport, retrying transient failures
pub(crate) struct BatchSender {
    pusher: Arc<dyn Push>,
    reporter: Arc<dyn ReportMetrics>,
    backoff: BackoffConfig,
    timeout: Duration,
}

impl BatchSender {
    pub(crate) fn new(
        pusher: Arc<dyn Push>,
        reporter: Arc<dyn ReportMetrics>,
        backoff: BackoffConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            pusher,
            reporter,
            backoff,
            timeout,
        }
    }

    /// Delivers `batch` or gives up on it. Every attempt is reported; the
    /// error of the last attempt is returned when the batch is dropped.
    pub(crate) async fn send_batch(&self, batch: Batch) -> Result<(), PushError> {
        let tenant_id = batch.tenant_id().to_owned();
        let bytes = batch.size_bytes();
        let streams = batch.stream_count();
        let (request, entries) = batch.to_push_request();
        drop(batch);

        let mut backoff = Backoff::new(&self.backoff);
        loop {
            let start = Instant::now();
            let result = match timeout(self.timeout, self.pusher.push(&tenant_id, &request)).await
            {
                Ok(result) => result,
                Err(_) => Err(PushError::Status(Status::new(
                    Code::DeadlineExceeded,
                    "push attempt timed out",
                ))),
            };
            let duration = start.elapsed();
            let attempt = backoff.retries() + 1;

            let error = match result {
                Ok(()) => {
                    self.reporter.report(&FlushRecord {
                        tenant_id,
                        status_code: status_code(None),
                        bytes,
                        entries,
                        streams,
                        duration,
                        attempt,
                        success: true,
                        outcome: FlushOutcome::Delivered,
                    });
                    return Ok(());
                }
                Err(error) => error,
            };

            let delay = if error.is_retryable() {
                backoff.next_delay()
            } else {
                None
            };
            self.reporter.report(&FlushRecord {
                tenant_id: tenant_id.clone(),
                status_code: status_code(Some(&error)),
                bytes,
                entries,
                streams,
                duration,
                attempt,
                success: false,
                outcome: if delay.is_some() {
                    FlushOutcome::Retrying
                } else {
                    FlushOutcome::Dropped
                },
            });
            match delay {
                Some(delay) => tokio::time::sleep(delay).await,
                None => return Err(error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::{
        entry::Entry,
        labels::LabelSet,
        test_utils::{RecordingReporter, ScriptedPusher},
    };

    fn batch() -> Batch {
        let labels = LabelSet::new().with_label("job", "test");
        Batch::new(
            "tenant",
            [
                Entry::new("tenant", labels.clone(), SystemTime::now(), "line 1"),
                Entry::new("tenant", labels, SystemTime::now(), "line 2"),
            ],
        )
    }

    fn sender(
        pusher: &ScriptedPusher,
        reporter: &RecordingReporter,
        max_retries: u32,
    ) -> BatchSender {
        BatchSender::new(
            Arc::new(pusher.clone()),
            Arc::new(reporter.clone()),
            BackoffConfig {
                min_backoff: Duration::from_millis(100),
                max_backoff: Duration::from_millis(400),
                max_retries,
            },
            Duration::from_secs(1),
        )
    }

    fn unavailable() -> PushError {
        PushError::Status(Status::new(Code::Unavailable, "unavailable"))
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_success() {
        let pusher = ScriptedPusher::new();
        let reporter = RecordingReporter::default();
        sender(&pusher, &reporter, 3).send_batch(batch()).await.unwrap();

        let calls = pusher.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].tenant_id, "tenant");
        assert_eq!(calls[0].request.entry_count(), 2);

        let records = reporter.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status_code, "200");
        assert_eq!(records[0].entries, 2);
        assert_eq!(records[0].bytes, 12);
        assert_eq!(records[0].streams, 1);
        assert!(records[0].success);
        assert_eq!(records[0].outcome, FlushOutcome::Delivered);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhaustion() {
        let pusher = ScriptedPusher::failing(unavailable());
        let reporter = RecordingReporter::default();
        let result = sender(&pusher, &reporter, 5).send_batch(batch()).await;
        assert_eq!(result, Err(unavailable()));

        let calls = pusher.calls();
        assert_eq!(calls.len(), 5);
        let gaps = calls
            .windows(2)
            .map(|w| w[1].at - w[0].at)
            .collect::<Vec<_>>();
        for (gap, expected) in gaps.iter().zip([100, 200, 400, 400]) {
            assert!(*gap >= Duration::from_millis(expected), "{:?}", gaps);
            assert!(*gap < Duration::from_millis(expected + 10), "{:?}", gaps);
        }

        let records = reporter.records();
        assert_eq!(records.len(), 5);
        assert!(records.iter().all(|r| !r.success && r.status_code == "500"));
        assert!(records[..4]
            .iter()
            .all(|r| r.outcome == FlushOutcome::Retrying));
        assert_eq!(records[4].outcome, FlushOutcome::Dropped);
        assert_eq!(
            records.iter().map(|r| r.attempt).collect::<Vec<_>>(),
            [1, 2, 3, 4, 5]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failure() {
        let pusher = ScriptedPusher::new().with_script([
            Err(PushError::Status(Status::new(Code::ResourceExhausted, "slow down"))),
            Ok(()),
        ]);
        let reporter = RecordingReporter::default();
        sender(&pusher, &reporter, 5).send_batch(batch()).await.unwrap();

        assert_eq!(pusher.calls().len(), 2);
        let records = reporter.records();
        assert_eq!(records[0].status_code, "429");
        assert_eq!(records[0].outcome, FlushOutcome::Retrying);
        assert_eq!(records[1].outcome, FlushOutcome::Delivered);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_failure_is_not_retried() {
        let error = PushError::Status(Status::new(Code::InvalidArgument, "bad labels"));
        let pusher = ScriptedPusher::failing(error.clone());
        let reporter = RecordingReporter::default();
        let result = sender(&pusher, &reporter, 5).send_batch(batch()).await;
        assert_eq!(result, Err(error));

        assert_eq!(pusher.calls().len(), 1);
        let records = reporter.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status_code, "3");
        assert_eq!(records[0].outcome, FlushOutcome::Dropped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_is_not_retried() {
        let pusher = ScriptedPusher::failing(PushError::Transport("broken pipe".to_owned()));
        let reporter = RecordingReporter::default();
        assert!(sender(&pusher, &reporter, 5).send_batch(batch()).await.is_err());
        assert_eq!(pusher.calls().len(), 1);
        assert_eq!(reporter.records()[0].status_code, "Unknown");
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_timeout_is_retried_as_deadline_exceeded() {
        let pusher = ScriptedPusher::new().with_delay(Duration::from_secs(5));
        let reporter = RecordingReporter::default();
        let result = sender(&pusher, &reporter, 2).send_batch(batch()).await;
        assert!(matches!(
            result,
            Err(PushError::Status(status)) if status.code() == Code::DeadlineExceeded
        ));
        assert_eq!(pusher.calls().len(), 2);
        let records = reporter.records();
        assert!(records.iter().all(|r| r.status_code == "504"));
        assert_eq!(records[1].outcome, FlushOutcome::Dropped);
    }
}
