//! Shared application state handed to every route.
//!
//! Owns the store handle and the current cleaning report. Both are replaced
//! together by [`AppState::reload`], which is serialized so two reloads never
//! interleave their store write and report update.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{Mutex, RwLock};

use crate::ingest::{self, IngestOutcome};
use crate::models::CleaningReport;
use crate::store::ObservationStore;
use crate::Config;

// ---

#[derive(Debug, Clone)]
pub struct AppState {
    pub store: ObservationStore,
    pub config: Arc<Config>,
    report: Arc<RwLock<CleaningReport>>,
    reload_guard: Arc<Mutex<()>>,
}

impl AppState {
    // ---
    pub fn new(store: ObservationStore, config: Config, report: CleaningReport) -> Self {
        AppState {
            store,
            config: Arc::new(config),
            report: Arc::new(RwLock::new(report)),
            reload_guard: Arc::new(Mutex::new(())),
        }
    }

    /// Run the startup ingestion and build the state from its report.
    pub async fn bootstrap(store: ObservationStore, config: Config) -> Result<Self> {
        // ---
        let outcome = ingest::run(&config, &store).await?;
        Ok(AppState::new(store, config, outcome.report))
    }

    /// The report of the last successful ingestion. Waits while a reload is
    /// swapping the store, so it never describes data that is not served.
    pub async fn report(&self) -> CleaningReport {
        self.report.read().await.clone()
    }

    /// Re-ingest the configured source. On failure the current store
    /// contents and report are kept.
    pub async fn reload(&self) -> Result<IngestOutcome> {
        // ---
        let _guard = self.reload_guard.lock().await;

        let staged = ingest::stage(&self.config).await?;

        // Held across the swap: readers see the old store with the old
        // report, or the new store with the new report.
        let mut report = self.report.write().await;
        let outcome = ingest::commit(staged, &self.store).await?;
        *report = outcome.report.clone();

        Ok(outcome)
    }
}
