//! Sweep coordination.
//!
//! Fans probes out across active sites with bounded concurrency and
//! records every outcome. One site's failure never aborts a sweep.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::db::{DbError, SiteCheck, Store};
use crate::probe::Prober;

/// Monitor error types.
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("site not found")]
    NotFound,
    #[error("store error: {0}")]
    Store(DbError),
}

impl From<DbError> for MonitorError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound => MonitorError::NotFound,
            other => MonitorError::Store(other),
        }
    }
}

/// A check that was produced but could not be persisted.
#[derive(Debug, Clone, Serialize)]
pub struct RecordFailure {
    pub site_id: String,
    pub error: String,
}

/// Outcome of one full sweep.
#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub started_at: DateTime<Utc>,
    pub duration_ms: i64,
    pub probed: usize,
    pub up: usize,
    pub down: usize,
    pub record_failures: Vec<RecordFailure>,
}

struct SiteOutcome {
    site_id: String,
    success: bool,
    record_error: Option<String>,
}

/// Coordinates probe execution across the site registry.
pub struct Monitor {
    store: Arc<Store>,
    prober: Prober,
    max_concurrent: usize,
}

impl Monitor {
    pub fn new(store: Arc<Store>, prober: Prober, max_concurrent: usize) -> Self {
        Self {
            store,
            prober,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Run one sweep over all active sites.
    ///
    /// Inactive sites are neither probed nor recorded. Probe-level
    /// failures become failed checks; append failures are surfaced in
    /// the report. Returns only after every dispatched probe has
    /// completed and been handed to the store.
    pub async fn sweep(&self) -> Result<SweepReport, MonitorError> {
        let started_at = Utc::now();
        let timer = Instant::now();

        let sites = self.store.list_sites()?;
        let active: Vec<_> = sites.into_iter().filter(|s| s.active).collect();

        tracing::info!("Starting sweep of {} active sites", active.len());

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut handles = Vec::with_capacity(active.len());

        for site in active {
            let semaphore = semaphore.clone();
            let prober = self.prober.clone();
            let store = self.store.clone();

            handles.push(tokio::spawn(async move {
                // The semaphore is never closed, so acquisition cannot
                // fail; the binding holds the permit for the task.
                let _permit = semaphore.acquire_owned().await;

                let check = prober.probe(&site).await;
                let success = check.success;

                let record_error = match store.append_check(&check) {
                    Ok(()) => None,
                    Err(e) => {
                        tracing::error!("Failed to record check for {}: {}", site.name, e);
                        Some(e.to_string())
                    }
                };

                SiteOutcome {
                    site_id: site.id,
                    success,
                    record_error,
                }
            }));
        }

        let mut report = SweepReport {
            started_at,
            duration_ms: 0,
            probed: 0,
            up: 0,
            down: 0,
            record_failures: Vec::new(),
        };

        for handle in handles {
            match handle.await {
                Ok(outcome) => {
                    report.probed += 1;
                    if outcome.success {
                        report.up += 1;
                    } else {
                        report.down += 1;
                    }
                    if let Some(error) = outcome.record_error {
                        report.record_failures.push(RecordFailure {
                            site_id: outcome.site_id,
                            error,
                        });
                    }
                }
                Err(e) => {
                    tracing::error!("Sweep task failed: {}", e);
                }
            }
        }

        report.duration_ms = timer.elapsed().as_millis() as i64;
        tracing::info!(
            "Completed sweep: {} probed, {} up, {} down",
            report.probed,
            report.up,
            report.down
        );

        Ok(report)
    }

    /// Probe one site on demand, bypassing the sweep pool, and record
    /// the result. An append failure surfaces directly to the caller.
    pub async fn check_site(&self, id: &str) -> Result<SiteCheck, MonitorError> {
        let site = self.store.get_site(id)?;
        let check = self.prober.probe(&site).await;
        self.store.append_check(&check)?;
        Ok(check)
    }
}
