//! Import job state: one entry per bulk-import run, tracked by id with
//! mutable progress counters and a `running -> done | error` lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of an import job. `Running` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Done,
    Error,
}

/// Running totals for one job. `valid` always equals
/// `seen - skipped_no_email - duplicates` for every classified record; the
/// one record that trips the `maxRecords` cap is counted seen but never
/// classified.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobTotals {
    /// Upstream-reported pool size, when the first slice carried one.
    pub pool_total: Option<u64>,
    pub seen: u64,
    pub valid: u64,
    pub sent: u64,
    pub skipped_no_email: u64,
    pub duplicates: u64,
    pub pages_fetched: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportJob {
    pub id: Uuid,
    pub status: JobStatus,
    pub source_id: String,
    pub owner_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_list_ids: Option<Vec<String>>,
    pub totals: JobTotals,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ImportJob {
    pub fn new(
        source_id: String,
        owner_key: String,
        destination_tag: Option<String>,
        destination_list_ids: Option<Vec<String>>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            status: JobStatus::Running,
            source_id,
            owner_key,
            destination_tag,
            destination_list_ids,
            totals: JobTotals::default(),
            started_at: now,
            updated_at: now,
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status != JobStatus::Running
    }

    /// Transition `running -> done`. No-op once the job is terminal.
    pub fn mark_done(&mut self) {
        if self.status == JobStatus::Running {
            self.status = JobStatus::Done;
            self.updated_at = Utc::now();
        }
    }

    /// Transition `running -> error`, capturing the failure message.
    /// No-op once the job is terminal.
    pub fn mark_error(&mut self, message: String) {
        if self.status == JobStatus::Running {
            self.status = JobStatus::Error;
            self.error = Some(message);
            self.updated_at = Utc::now();
        }
    }
}
