//! Doubles shared by the unit tests

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use tokio::time::Instant;

use crate::{
    batch::PushRequest,
    metrics::{FlushRecord, ReportMetrics},
    push::{Push, PushError},
};

#[derive(Debug, Clone)]
pub struct PushCall {
    pub tenant_id: String,
    pub request: PushRequest,
    pub at: Instant,
}

/// Records every call and answers from a script, `Ok` once the script runs out
#[derive(Clone, Default)]
pub struct ScriptedPusher {
    calls: Arc<Mutex<Vec<PushCall>>>,
    script: Arc<Mutex<VecDeque<Result<(), PushError>>>>,
    fallback: Option<PushError>,
    delay: Option<Duration>,
}

impl ScriptedPusher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with `error`
    pub fn failing(error: PushError) -> Self {
        Self {
            fallback: Some(error),
            ..Self::default()
        }
    }

    pub fn with_script<I>(self, script: I) -> Self
    where
        I: IntoIterator<Item = Result<(), PushError>>,
    {
        self.script.lock().unwrap().extend(script);
        self
    }

    /// Every call takes `delay` before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<PushCall> {
        self.calls.lock().unwrap().clone()
    }

    /// All pushed lines of a tenant, stream by stream, in push order
    pub fn lines(&self, tenant_id: &str) -> Vec<String> {
        self.calls()
            .iter()
            .filter(|c| c.tenant_id == tenant_id)
            .flat_map(|c| c.request.streams.iter())
            .flat_map(|s| s.entries.iter().map(|e| e.line.clone()))
            .collect()
    }
}

#[async_trait]
impl Push for ScriptedPusher {
    async fn push(&self, tenant_id: &str, request: &PushRequest) -> Result<(), PushError> {
        self.calls.lock().unwrap().push(PushCall {
            tenant_id: tenant_id.to_owned(),
            request: request.clone(),
            at: Instant::now(),
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(result) = self.script.lock().unwrap().pop_front() {
            return result;
        }
        match &self.fallback {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[derive(Clone, Default)]
pub struct RecordingReporter(Arc<Mutex<Vec<FlushRecord>>>);

impl RecordingReporter {
    pub fn records(&self) -> Vec<FlushRecord> {
        self.0.lock().unwrap().clone()
    }
}

impl ReportMetrics for RecordingReporter {
    fn report(&self, record: &FlushRecord) {
        self.0.lock().unwrap().push(record.clone());
    }
}
