//! Migration telemetry
//!
//! Records through the `metrics` facade; nothing is exported unless the
//! embedding application installs a recorder.
//!
//! # Metrics
//!
//! - `storage_migration_runs_total`: Counter of finished runs by outcome
//! - `storage_migration_conversations_total`: Counter of conversations written
//! - `storage_migration_batch_failures_total`: Counter of failed batches
//! - `storage_migration_duration_seconds`: Histogram of run duration

use crate::migration::types::MigrationResult;
use metrics::{counter, histogram, increment_counter};
use std::time::Instant;

/// Timer and counters for one migration or restore run
#[derive(Debug)]
pub struct MigrationMetrics {
    kind: &'static str,
    start: Instant,
}

impl MigrationMetrics {
    /// Start timing a run of the given kind ("migrate" or "restore")
    pub fn start(kind: &'static str) -> Self {
        Self {
            kind,
            start: Instant::now(),
        }
    }

    /// Milliseconds since the run started
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Count a batch that failed to write
    pub fn record_batch_failure(&self) {
        increment_counter!("storage_migration_batch_failures_total", "kind" => self.kind);
    }

    /// Record the outcome of a finished run
    pub fn record_result(&self, result: &MigrationResult) {
        let outcome = if result.success { "success" } else { "failure" };
        increment_counter!(
            "storage_migration_runs_total",
            "kind" => self.kind,
            "outcome" => outcome
        );
        counter!(
            "storage_migration_conversations_total",
            result.migrated_count as u64,
            "kind" => self.kind
        );
        histogram!(
            "storage_migration_duration_seconds",
            self.start.elapsed().as_secs_f64(),
            "kind" => self.kind
        );
    }
}
