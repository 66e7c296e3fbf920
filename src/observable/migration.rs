use super::{error_message, Published};
use crate::error::Result;
use crate::migration::{
    MigrationEstimate, MigrationOptions, MigrationProgress, MigrationResult, MigrationStatus,
    StorageMigration,
};
use std::sync::Arc;
use tokio::sync::watch;

/// Published state of a [`StorageMigrationHandle`]
///
/// `in_progress` covers migrate and restore runs; `loading` covers status
/// checks only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationState {
    pub status: Option<MigrationStatus>,
    pub in_progress: bool,
    pub progress: Option<MigrationProgress>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Migration engine actions with published status
pub struct StorageMigrationHandle {
    engine: Arc<StorageMigration>,
    state: Published<MigrationState>,
}

impl StorageMigrationHandle {
    /// Create the handle and run the first status check
    pub async fn mount(engine: Arc<StorageMigration>) -> Self {
        let handle = Self {
            engine,
            state: Published::new(MigrationState {
                loading: true,
                ..Default::default()
            }),
        };
        handle.check_status().await;
        handle
    }

    pub fn subscribe(&self) -> watch::Receiver<MigrationState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> MigrationState {
        self.state.snapshot()
    }

    pub async fn check_status(&self) {
        self.state.update(|state| {
            state.loading = true;
            state.error = None;
        });
        let status = self.engine.check_migration_status().await;
        self.state.update(|state| {
            state.status = Some(status);
            state.loading = false;
        });
    }

    /// Run a migration, publishing batch progress, then re-check status
    ///
    /// A failed run (errors in the result) is returned as `Ok` with its
    /// errors also published as the handle's error.
    pub async fn migrate(&self, options: MigrationOptions) -> Result<MigrationResult> {
        self.start_run();
        let outcome = self
            .engine
            .migrate_from_legacy_with_progress(options, |progress| {
                self.state.update(|state| state.progress = Some(progress));
            })
            .await;
        self.finish_run(outcome, "Migration failed").await
    }

    /// Restore a backup document, then re-check status
    pub async fn restore(&self, backup_json: &str) -> Result<MigrationResult> {
        self.start_run();
        let result = self.engine.restore_from_backup(backup_json).await;
        self.finish_run(Ok(result), "Restore failed").await
    }

    pub fn estimate(&self) -> MigrationEstimate {
        self.engine.estimate_migration_time()
    }

    pub fn create_backup(&self) -> Option<String> {
        self.engine.create_backup()
    }

    fn start_run(&self) {
        self.state.update(|state| {
            state.in_progress = true;
            state.progress = None;
            state.error = None;
        });
    }

    async fn finish_run(
        &self,
        outcome: Result<MigrationResult>,
        fallback: &str,
    ) -> Result<MigrationResult> {
        let error = match &outcome {
            Ok(result) if !result.success => Some(result.errors.join(", ")),
            Ok(_) => None,
            Err(e) => Some(error_message(e, fallback)),
        };

        if outcome.is_ok() {
            self.check_status().await;
        }
        self.state.update(|state| {
            state.in_progress = false;
            if error.is_some() {
                state.error = error;
            }
        });
        outcome
    }
}
