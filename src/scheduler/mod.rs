//! Periodic sweep trigger.
//!
//! The engine itself only exposes "run one sweep now"; this module is
//! the outer trigger that calls it on a fixed interval.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::monitor::Monitor;

/// Triggers a full sweep on a fixed interval.
///
/// Each sweep is awaited before the next tick is considered, so the
/// built-in trigger never overlaps sweeps.
pub struct SweepScheduler {
    monitor: Arc<Monitor>,
    interval: Duration,
    stop: Arc<Mutex<Option<tokio::sync::broadcast::Sender<()>>>>,
}

impl SweepScheduler {
    pub fn new(monitor: Arc<Monitor>, interval: Duration) -> Self {
        Self {
            monitor,
            interval,
            stop: Arc::new(Mutex::new(None)),
        }
    }

    /// Start the background sweep task.
    pub fn start(&self) {
        let monitor = self.monitor.clone();
        let stop = self.stop.clone();
        let period = self.interval;

        tokio::spawn(async move {
            let (tx, _) = tokio::sync::broadcast::channel(1);
            {
                let mut stop_guard = stop.lock().await;
                *stop_guard = Some(tx.clone());
            }

            let mut rx = tx.subscribe();
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = rx.recv() => break,
                    _ = interval.tick() => {
                        match monitor.sweep().await {
                            Ok(report) => tracing::info!(
                                "Scheduled sweep finished: {} probed, {} up, {} down",
                                report.probed,
                                report.up,
                                report.down
                            ),
                            Err(e) => tracing::error!("Scheduled sweep failed: {}", e),
                        }
                    }
                }
            }
        });
    }

    /// Stop the background sweep task.
    pub async fn stop(&self) {
        let stop = self.stop.lock().await;
        if let Some(tx) = stop.as_ref() {
            let _ = tx.send(());
        }
    }
}
