use std::time::Duration;

use log::{debug, error, warn};

/// What happened to a batch after one push attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// The remote store accepted the batch
    Delivered,
    /// The attempt failed and another one is scheduled
    Retrying,
    /// The attempt failed and the batch is given up
    Dropped,
}

/// One push attempt, reported whatever its result
#[derive(Debug, Clone, PartialEq)]
pub struct FlushRecord {
    pub tenant_id: String,
    pub status_code: String,
    pub bytes: usize,
    pub entries: usize,
    pub streams: usize,
    pub duration: Duration,
    /// 1-based attempt number within the batch
    pub attempt: u32,
    pub success: bool,
    pub outcome: FlushOutcome,
}

/// Sink for flush observations. Called concurrently from every send task.
pub trait ReportMetrics: Send + Sync + 'static {
    fn report(&self, record: &FlushRecord);
}

/// Writes every flush record to the `log` facade
pub struct LogReporter;

impl ReportMetrics for LogReporter {
    fn report(&self, record: &FlushRecord) {
        let tenant = if record.tenant_id.is_empty() {
            "<default>"
        } else {
            record.tenant_id.as_str()
        };
        match record.outcome {
            FlushOutcome::Delivered => debug!(
                "pushed batch tenant={} status={} entries={} bytes={} streams={} attempt={} duration={:?}",
                tenant,
                record.status_code,
                record.entries,
                record.bytes,
                record.streams,
                record.attempt,
                record.duration
            ),
            FlushOutcome::Retrying => warn!(
                "push failed, retrying tenant={} status={} entries={} attempt={} duration={:?}",
                tenant, record.status_code, record.entries, record.attempt, record.duration
            ),
            FlushOutcome::Dropped => error!(
                "push failed, dropping batch tenant={} status={} entries={} bytes={} attempt={}",
                tenant, record.status_code, record.entries, record.bytes, record.attempt
            ),
        }
    }
}

/// Discards every record
pub struct NoopReporter;

impl ReportMetrics for NoopReporter {
    fn report(&self, _record: &FlushRecord) {}
}
