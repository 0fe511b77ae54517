use std::time::SystemTime;

use crate::labels::LabelSet;

/// One log line accepted by the client, bound to its tenant and stream
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    tenant_id: String,
    labels: LabelSet,
    timestamp: SystemTime,
    line: String,
}

impl Entry {
    pub fn new(tenant_id: &str, labels: LabelSet, timestamp: SystemTime, line: &str) -> Self {
        Self {
            tenant_id: tenant_id.to_owned(),
            labels,
            timestamp,
            line: line.to_owned(),
        }
    }

    pub fn tenant_id(&self) -> &str {
        self.tenant_id.as_str()
    }
    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }
    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }
    pub fn line(&self) -> &str {
        self.line.as_str()
    }
    /// Bytes this entry adds to a batch
    pub fn size(&self) -> usize {
        self.line.len()
    }

    pub(crate) fn into_parts(self) -> (LabelSet, SystemTime, String) {
        (self.labels, self.timestamp, self.line)
    }
}
